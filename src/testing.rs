//! 测试工具: 内存版博客后端
//!
//! 实现 [`HttpClient`]，按路径分派到内存数据，
//! 规则与真实后端一致：变更需要 Bearer 凭据，只有作者能修改/删除文章。

use std::cell::{Cell, RefCell};

use quill_shared::HttpMethod;
use quill_shared::protocol::{FormValue, RequestBody};
use serde_json::{Value, json};

use crate::error::BlogResult;
use crate::request::{HttpClient, HttpRequest, HttpResponse};

pub const FAKE_BASE: &str = "http://fake.test/api";
const TIMESTAMP: &str = "2024-05-01T10:00:00.000000Z";

struct FakeUser {
    id: u64,
    name: String,
    email: String,
    password: String,
}

#[derive(Default)]
pub struct FakeBackend {
    users: RefCell<Vec<FakeUser>>,
    posts: RefCell<Vec<Value>>,
    comments: RefCell<Vec<Value>>,
    next_id: Cell<u64>,
    /// 删除成功时的响应体，`None` 时回 204 空体
    delete_reply: RefCell<Option<Value>>,
    /// 收到的每个请求，形如 "METHOD /path"
    pub hits: RefCell<Vec<String>>,
    /// 每个请求携带的 Authorization 头
    pub auth_headers: RefCell<Vec<Option<String>>>,
}

fn respond(status: u16, body: Value) -> HttpResponse {
    HttpResponse {
        status,
        body: body.to_string(),
    }
}

fn form_text<'a>(body: &'a RequestBody, name: &str) -> Option<&'a str> {
    match body {
        RequestBody::Multipart(parts) => parts.iter().find(|p| p.name == name).and_then(|p| match &p.value {
            FormValue::Text(text) => Some(text.as_str()),
            FormValue::File(_) => None,
        }),
        _ => None,
    }
}

fn form_file_name<'a>(body: &'a RequestBody, name: &str) -> Option<&'a str> {
    match body {
        RequestBody::Multipart(parts) => parts.iter().find(|p| p.name == name).and_then(|p| match &p.value {
            FormValue::File(upload) => Some(upload.file_name.as_str()),
            FormValue::Text(_) => None,
        }),
        _ => None,
    }
}

fn json_field<'a>(body: &'a RequestBody, name: &str) -> Option<&'a str> {
    match body {
        RequestBody::Json(value) => value.get(name).and_then(Value::as_str),
        _ => None,
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    pub fn add_user(&self, name: &str, email: &str, password: &str) -> u64 {
        let id = self.next_id();
        self.users.borrow_mut().push(FakeUser {
            id,
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        });
        id
    }

    pub fn token_for(user_id: u64) -> String {
        format!("token-{}", user_id)
    }

    /// 直接插入一篇文章，返回 id
    pub fn seed_post(&self, author_id: u64, title: &str, content: &str) -> u64 {
        let author_name = self
            .users
            .borrow()
            .iter()
            .find(|u| u.id == author_id)
            .map(|u| u.name.clone())
            .unwrap_or_default();
        let id = self.next_id();
        self.posts.borrow_mut().push(json!({
            "id": id,
            "title": title,
            "content": content,
            "author": { "id": author_id, "name": author_name },
            "created_at": TIMESTAMP,
            "updated_at": TIMESTAMP,
        }));
        id
    }

    pub fn reply_to_delete_with(&self, body: Value) {
        *self.delete_reply.borrow_mut() = Some(body);
    }

    pub fn post_count(&self) -> usize {
        self.posts.borrow().len()
    }

    pub fn hit_count(&self, hit: &str) -> usize {
        self.hits.borrow().iter().filter(|h| h.as_str() == hit).count()
    }

    fn caller(&self, req: &HttpRequest) -> Option<u64> {
        let token = req.header("Authorization")?.strip_prefix("Bearer ")?;
        let id: u64 = token.strip_prefix("token-")?.parse().ok()?;
        self.users.borrow().iter().any(|u| u.id == id).then_some(id)
    }

    fn auth_response(user: &FakeUser, status: u16) -> HttpResponse {
        respond(
            status,
            json!({
                "user": { "id": user.id, "name": user.name, "email": user.email },
                "token": Self::token_for(user.id),
            }),
        )
    }

    fn route(&self, req: &HttpRequest) -> HttpResponse {
        let path = req.url.strip_prefix(FAKE_BASE).unwrap_or(&req.url).to_string();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match (req.method, segments.as_slice()) {
            (HttpMethod::Post, ["auth", "login"]) => {
                let email = json_field(&req.body, "email").unwrap_or_default();
                let password = json_field(&req.body, "password").unwrap_or_default();
                let users = self.users.borrow();
                match users.iter().find(|u| u.email == email && u.password == password) {
                    Some(user) => Self::auth_response(user, 200),
                    None => respond(401, json!({ "message": "Invalid credentials" })),
                }
            }
            (HttpMethod::Post, ["auth", "signup"]) => {
                let email = json_field(&req.body, "email").unwrap_or_default().to_string();
                let password = json_field(&req.body, "password").unwrap_or_default().to_string();
                if self.users.borrow().iter().any(|u| u.email == email) {
                    return respond(422, json!({ "message": "The email has already been taken." }));
                }
                let name = email.split('@').next().unwrap_or_default().to_string();
                let id = self.add_user(&name, &email, &password);
                let users = self.users.borrow();
                match users.iter().find(|u| u.id == id) {
                    Some(user) => Self::auth_response(user, 201),
                    None => respond(500, json!({})),
                }
            }
            (HttpMethod::Get, ["posts"]) => respond(200, Value::Array(self.posts.borrow().clone())),
            (HttpMethod::Get, ["posts", id]) => match self.find_post(id) {
                Some(post) => respond(200, post),
                None => respond(404, json!({ "message": "Not found" })),
            },
            (HttpMethod::Get, ["posts", id, "comments"]) => {
                let post_id: u64 = id.parse().unwrap_or_default();
                let comments: Vec<Value> = self
                    .comments
                    .borrow()
                    .iter()
                    .filter(|c| c["post_id"] == json!(post_id))
                    .cloned()
                    .collect();
                respond(200, Value::Array(comments))
            }
            (HttpMethod::Post, ["posts"]) => {
                let Some(user_id) = self.caller(req) else {
                    return respond(401, json!({ "message": "Unauthenticated." }));
                };
                let title = form_text(&req.body, "title").unwrap_or_default();
                let content = form_text(&req.body, "content").unwrap_or_default();
                let id = self.seed_post(user_id, title, content);
                if let Some(file) = form_file_name(&req.body, "image") {
                    self.set_post_field(id, "image_url", json!(format!("/storage/{}", file)));
                }
                match self.find_post(&id.to_string()) {
                    Some(post) => respond(201, json!({ "post": post })),
                    None => respond(500, json!({})),
                }
            }
            (HttpMethod::Post, ["posts", id]) => {
                if form_text(&req.body, "_method") != Some("PUT") {
                    return respond(405, json!({ "message": "Method not allowed" }));
                }
                let Some(post) = self.find_post(id) else {
                    return respond(404, json!({ "message": "Not found" }));
                };
                if let Some(denied) = self.check_owner(req, &post) {
                    return denied;
                }
                let post_id = post["id"].as_u64().unwrap_or_default();
                if let Some(title) = form_text(&req.body, "title") {
                    self.set_post_field(post_id, "title", json!(title));
                }
                if let Some(content) = form_text(&req.body, "content") {
                    self.set_post_field(post_id, "content", json!(content));
                }
                match self.find_post(id) {
                    Some(post) => respond(200, post),
                    None => respond(500, json!({})),
                }
            }
            (HttpMethod::Delete, ["posts", id]) => {
                let Some(post) = self.find_post(id) else {
                    return respond(404, json!({ "message": "Not found" }));
                };
                if let Some(denied) = self.check_owner(req, &post) {
                    return denied;
                }
                self.posts.borrow_mut().retain(|p| p["id"] != post["id"]);
                match self.delete_reply.borrow().clone() {
                    Some(body) => respond(200, body),
                    None => HttpResponse {
                        status: 204,
                        body: String::new(),
                    },
                }
            }
            (HttpMethod::Post, ["posts", id, "comments"]) => {
                let Some(post) = self.find_post(id) else {
                    return respond(404, json!({ "message": "Not found" }));
                };
                let comment = json!({
                    "id": self.next_id(),
                    "post_id": post["id"],
                    "name": json_field(&req.body, "name").unwrap_or_default(),
                    "comment": json_field(&req.body, "comment").unwrap_or_default(),
                    "created_at": TIMESTAMP,
                });
                self.comments.borrow_mut().push(comment.clone());
                respond(201, comment)
            }
            _ => respond(404, json!({ "message": "Not found" })),
        }
    }

    fn find_post(&self, id: &str) -> Option<Value> {
        let id: u64 = id.parse().ok()?;
        self.posts.borrow().iter().find(|p| p["id"] == json!(id)).cloned()
    }

    fn set_post_field(&self, id: u64, field: &str, value: Value) {
        if let Some(post) = self.posts.borrow_mut().iter_mut().find(|p| p["id"] == json!(id)) {
            post[field] = value;
        }
    }

    fn check_owner(&self, req: &HttpRequest, post: &Value) -> Option<HttpResponse> {
        match self.caller(req) {
            None => Some(respond(401, json!({ "message": "Unauthenticated." }))),
            Some(user_id) if post["author"]["id"] != json!(user_id) => {
                Some(respond(403, json!({ "message": "Forbidden" })))
            }
            Some(_) => None,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl HttpClient for FakeBackend {
    async fn send(&self, req: HttpRequest) -> BlogResult<HttpResponse> {
        let path = req.url.strip_prefix(FAKE_BASE).unwrap_or(&req.url).to_string();
        self.hits
            .borrow_mut()
            .push(format!("{} {}", req.method.as_str(), path));
        self.auth_headers
            .borrow_mut()
            .push(req.header("Authorization").map(str::to_string));
        Ok(self.route(&req))
    }
}
