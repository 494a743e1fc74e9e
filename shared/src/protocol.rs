use crate::{
    AuthCredentials, AuthResponse, Comment, CreateCommentPayload, CreatePostPayload,
    ImageUpload, METHOD_OVERRIDE_FIELD, Post, PostEnvelope, PostId,
};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// HTTP Methods for API Requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// One field of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File(ImageUpload),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    pub name: String,
    pub value: FormValue,
}

impl FormPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FormValue::Text(value.into()),
        }
    }

    pub fn file(name: impl Into<String>, upload: ImageUpload) -> Self {
        Self {
            name: name.into(),
            value: FormValue::File(upload),
        }
    }
}

/// Request body as described by an endpoint, independent of the HTTP stack.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<FormPart>),
}

/// A trait that defines the request-response relationship and metadata for an API endpoint.
///
/// Paths are relative to the API base (which already ends in `/api`).
pub trait ApiRequest {
    /// The response type returned by this request.
    type Response: DeserializeOwned;
    /// The HTTP method.
    const METHOD: HttpMethod;
    /// The URL path, with parameters filled in.
    fn path(&self) -> String;
    /// The request body.
    fn body(&self) -> RequestBody {
        RequestBody::Empty
    }
}

fn credentials_body(credentials: &AuthCredentials) -> RequestBody {
    RequestBody::Json(json!({
        "email": credentials.email,
        "password": credentials.password,
    }))
}

fn comment_body(payload: &CreateCommentPayload) -> RequestBody {
    RequestBody::Json(json!({
        "name": payload.name,
        "comment": payload.comment,
    }))
}

fn post_form(payload: &CreatePostPayload, method_override: Option<HttpMethod>) -> RequestBody {
    let mut parts = Vec::with_capacity(4);
    if let Some(method) = method_override {
        parts.push(FormPart::text(METHOD_OVERRIDE_FIELD, method.as_str()));
    }
    parts.push(FormPart::text("title", payload.title.clone()));
    parts.push(FormPart::text("content", payload.content.clone()));
    if let Some(image) = &payload.image {
        parts.push(FormPart::file("image", image.clone()));
    }
    RequestBody::Multipart(parts)
}

// =========================================================
// Request Definitions
// =========================================================

/// Log in with email + password
#[derive(Debug, Clone)]
pub struct LoginRequest(pub AuthCredentials);

impl ApiRequest for LoginRequest {
    type Response = AuthResponse;
    const METHOD: HttpMethod = HttpMethod::Post;

    fn path(&self) -> String {
        "/auth/login".to_string()
    }

    fn body(&self) -> RequestBody {
        credentials_body(&self.0)
    }
}

/// Create an account; the backend answers like a login
#[derive(Debug, Clone)]
pub struct SignupRequest(pub AuthCredentials);

impl ApiRequest for SignupRequest {
    type Response = AuthResponse;
    const METHOD: HttpMethod = HttpMethod::Post;

    fn path(&self) -> String {
        "/auth/signup".to_string()
    }

    fn body(&self) -> RequestBody {
        credentials_body(&self.0)
    }
}

/// List all posts
#[derive(Debug, Clone, Copy)]
pub struct ListPostsRequest;

impl ApiRequest for ListPostsRequest {
    type Response = Vec<Post>;
    const METHOD: HttpMethod = HttpMethod::Get;

    fn path(&self) -> String {
        "/posts".to_string()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GetPostRequest {
    pub id: PostId,
}

impl ApiRequest for GetPostRequest {
    type Response = Post;
    const METHOD: HttpMethod = HttpMethod::Get;

    fn path(&self) -> String {
        format!("/posts/{}", self.id)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ListCommentsRequest {
    pub post_id: PostId,
}

impl ApiRequest for ListCommentsRequest {
    type Response = Vec<Comment>;
    const METHOD: HttpMethod = HttpMethod::Get;

    fn path(&self) -> String {
        format!("/posts/{}/comments", self.post_id)
    }
}

/// Create a post (multipart: title, content, optional image)
#[derive(Debug, Clone)]
pub struct CreatePostRequest(pub CreatePostPayload);

impl ApiRequest for CreatePostRequest {
    type Response = PostEnvelope;
    const METHOD: HttpMethod = HttpMethod::Post;

    fn path(&self) -> String {
        "/posts".to_string()
    }

    fn body(&self) -> RequestBody {
        post_form(&self.0, None)
    }
}

/// Update a post.
///
/// Multipart bodies are only parsed on POST by the backend, so this is sent as
/// POST with `_method=PUT` in the form.
#[derive(Debug, Clone)]
pub struct UpdatePostRequest {
    pub id: PostId,
    pub payload: CreatePostPayload,
}

impl ApiRequest for UpdatePostRequest {
    type Response = PostEnvelope;
    const METHOD: HttpMethod = HttpMethod::Post;

    fn path(&self) -> String {
        format!("/posts/{}", self.id)
    }

    fn body(&self) -> RequestBody {
        post_form(&self.payload, Some(HttpMethod::Put))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DeletePostRequest {
    pub id: PostId,
}

impl ApiRequest for DeletePostRequest {
    /// 响应体（204 空体或 `{"message": ...}`）一律忽略
    type Response = IgnoredAny;
    const METHOD: HttpMethod = HttpMethod::Delete;

    fn path(&self) -> String {
        format!("/posts/{}", self.id)
    }
}

#[derive(Debug, Clone)]
pub struct CreateCommentRequest {
    pub post_id: PostId,
    pub payload: CreateCommentPayload,
}

impl ApiRequest for CreateCommentRequest {
    type Response = Comment;
    const METHOD: HttpMethod = HttpMethod::Post;

    fn path(&self) -> String {
        format!("/posts/{}/comments", self.post_id)
    }

    fn body(&self) -> RequestBody {
        comment_body(&self.payload)
    }
}
