use std::rc::Rc;

use quill_shared::protocol::{
    ApiRequest, CreateCommentRequest, CreatePostRequest, DeletePostRequest, GetPostRequest,
    ListCommentsRequest, ListPostsRequest, LoginRequest, SignupRequest, UpdatePostRequest,
};
use quill_shared::{
    AuthCredentials, AuthResponse, Comment, CreateCommentPayload, CreatePostPayload, Post, PostId,
};

use crate::error::{BlogError, BlogResult};
use crate::request::{HttpClient, HttpRequest};

// =========================================================
// 凭据来源
// =========================================================

/// 每次发请求前调用，返回 `None` 时不带 Authorization 头
pub trait CredentialSource {
    fn bearer_token(&self) -> Option<String>;
}

/// 匿名请求
pub struct NoCredentials;

impl CredentialSource for NoCredentials {
    fn bearer_token(&self) -> Option<String> {
        None
    }
}

/// 固定 token（外部已获得）
pub struct StaticToken(pub String);

impl CredentialSource for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

// =========================================================
// API 客户端
// =========================================================

/// 博客后端的 HTTP 客户端
///
/// 唯一的请求分发点：拼接基础地址，附加 Bearer 凭据，
/// 把非 2xx 响应转换为 [`BlogError`]。不重试，不因 401 自动注销。
pub struct BlogApi<C: HttpClient> {
    base_url: String,
    client: C,
    credentials: Rc<dyn CredentialSource>,
}

impl<C: HttpClient> BlogApi<C> {
    pub fn new(base_url: impl Into<String>, client: C, credentials: Rc<dyn CredentialSource>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client,
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// 发送强类型请求并获取解析后的响应
    pub async fn send<R: ApiRequest>(&self, req: &R) -> BlogResult<R::Response> {
        let path = req.path();
        let mut http = HttpRequest::new(&self.url(&path), R::METHOD)
            .with_header("Accept", "application/json")
            .with_body(req.body());

        // 请求拦截：有凭据就带上
        if let Some(token) = self.credentials.bearer_token() {
            http = http.with_header("Authorization", &format!("Bearer {}", token));
        }

        tracing::debug!(method = R::METHOD.as_str(), path = %path, "dispatching request");

        let resp = self
            .client
            .send(http)
            .await
            .map_err(|e| e.in_op_with("api.send", path.clone()))?;

        if !resp.is_success() {
            tracing::debug!(status = resp.status, path = %path, "request rejected");
            return Err(BlogError::http(resp.status, resp.body).in_op_with("api.send", path));
        }

        resp.json::<R::Response>()
            .map_err(|e| e.in_op_with("api.decode", path))
    }

    // --- Auth ---

    pub async fn login(&self, credentials: AuthCredentials) -> BlogResult<AuthResponse> {
        self.send(&LoginRequest(credentials)).await
    }

    pub async fn signup(&self, credentials: AuthCredentials) -> BlogResult<AuthResponse> {
        self.send(&SignupRequest(credentials)).await
    }

    // --- Posts ---

    pub async fn list_posts(&self) -> BlogResult<Vec<Post>> {
        self.send(&ListPostsRequest).await
    }

    pub async fn get_post(&self, id: PostId) -> BlogResult<Post> {
        self.send(&GetPostRequest { id }).await
    }

    pub async fn create_post(&self, payload: CreatePostPayload) -> BlogResult<Post> {
        let envelope = self.send(&CreatePostRequest(payload)).await?;
        Ok(envelope.into_post())
    }

    pub async fn update_post(&self, id: PostId, payload: CreatePostPayload) -> BlogResult<Post> {
        let envelope = self.send(&UpdatePostRequest { id, payload }).await?;
        Ok(envelope.into_post())
    }

    /// 只看状态码，响应体丢弃
    pub async fn delete_post(&self, id: PostId) -> BlogResult<()> {
        self.send(&DeletePostRequest { id }).await.map(|_| ())
    }

    // --- Comments ---

    pub async fn list_comments(&self, post_id: PostId) -> BlogResult<Vec<Comment>> {
        self.send(&ListCommentsRequest { post_id }).await
    }

    pub async fn create_comment(
        &self,
        post_id: PostId,
        payload: CreateCommentPayload,
    ) -> BlogResult<Comment> {
        self.send(&CreateCommentRequest { post_id, payload }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BlogErrorStatus;
    use crate::request::MockHttpClient;
    use quill_shared::HttpMethod;
    use quill_shared::protocol::{FormPart, RequestBody};
    use serde_json::json;

    const BASE: &str = "http://localhost:8000/api";

    fn api_with(token: Option<&str>) -> BlogApi<MockHttpClient> {
        let credentials: Rc<dyn CredentialSource> = match token {
            Some(t) => Rc::new(StaticToken(t.to_string())),
            None => Rc::new(NoCredentials),
        };
        BlogApi::new(format!("{}/", BASE), MockHttpClient::new(), credentials)
    }

    fn post_json(id: u64) -> serde_json::Value {
        json!({
            "id": id,
            "title": "Hello World",
            "content": "This is a sufficiently long body text.",
            "author": { "id": 1, "name": "Ada" },
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-01T10:00:00Z"
        })
    }

    #[tokio::test]
    async fn attaches_bearer_token_when_present() {
        let api = api_with(Some("jwt-123"));
        api.client()
            .mock_response(HttpMethod::Get, &format!("{}/posts", BASE), 200, json!([]));

        api.list_posts().await.unwrap();

        let req = api.client().last_request().unwrap();
        assert_eq!(req.url, format!("{}/posts", BASE));
        assert_eq!(req.header("Authorization"), Some("Bearer jwt-123"));
    }

    #[tokio::test]
    async fn anonymous_requests_carry_no_authorization() {
        let api = api_with(None);
        api.client()
            .mock_response(HttpMethod::Get, &format!("{}/posts/3", BASE), 200, post_json(3));

        let post = api.get_post(3).await.unwrap();
        assert_eq!(post.id, 3);
        assert!(api.client().last_request().unwrap().header("Authorization").is_none());
    }

    #[tokio::test]
    async fn unauthorized_is_surfaced_as_plain_failure() {
        let api = api_with(Some("stale"));
        api.client().mock_response(
            HttpMethod::Delete,
            &format!("{}/posts/3", BASE),
            401,
            json!({ "message": "Unauthenticated." }),
        );

        let err = api.delete_post(3).await.unwrap_err();
        assert_eq!(err.status, BlogErrorStatus::Unauthorized);
        assert_eq!(err.http_status(), Some(401));
        // 只发一次，不重试
        assert_eq!(api.client().request_count(), 1);
    }

    #[tokio::test]
    async fn update_is_a_post_with_method_override() {
        let api = api_with(Some("t"));
        api.client()
            .mock_response(HttpMethod::Post, &format!("{}/posts/9", BASE), 200, post_json(9));

        let payload = CreatePostPayload::new("Hello World", "This is a sufficiently long body text.");
        api.update_post(9, payload).await.unwrap();

        let req = api.client().last_request().unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        let RequestBody::Multipart(parts) = req.body else {
            panic!("expected multipart body");
        };
        assert!(parts.contains(&FormPart::text("_method", "PUT")));
        assert!(parts.contains(&FormPart::text("title", "Hello World")));
    }

    #[tokio::test]
    async fn create_accepts_wrapped_response() {
        let api = api_with(Some("t"));
        api.client().mock_response(
            HttpMethod::Post,
            &format!("{}/posts", BASE),
            201,
            json!({ "post": post_json(11) }),
        );

        let post = api
            .create_post(CreatePostPayload::new("Hello World", "This is a sufficiently long body text."))
            .await
            .unwrap();
        assert_eq!(post.id, 11);
    }

    #[tokio::test]
    async fn delete_accepts_empty_204() {
        let api = api_with(Some("t"));
        api.client()
            .mock_empty(HttpMethod::Delete, &format!("{}/posts/4", BASE), 204);
        assert!(api.delete_post(4).await.is_ok());
    }

    #[tokio::test]
    async fn delete_ignores_json_confirmation_body() {
        let api = api_with(Some("t"));
        api.client().mock_response(
            HttpMethod::Delete,
            &format!("{}/posts/4", BASE),
            200,
            json!({ "message": "Post deleted" }),
        );
        assert!(api.delete_post(4).await.is_ok());
    }

    #[tokio::test]
    async fn missing_post_is_not_found() {
        let api = api_with(None);
        let err = api.get_post(404).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("api.send(/posts/404)"));
    }
}
