use std::collections::HashMap;

use quill_shared::protocol::{FormValue, RequestBody};
use quill_shared::HttpMethod;
use serde::de::DeserializeOwned;

use crate::error::{BlogError, BlogResult};

#[cfg(test)]
use std::cell::RefCell;

// =========================================================
// 核心抽象层 (HTTP Interface Abstraction)
// =========================================================

/// 通用 HTTP 请求结构
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: HashMap<String, String>,
    pub body: RequestBody,
}

impl HttpRequest {
    pub fn new(url: &str, method: HttpMethod) -> Self {
        Self {
            url: url.to_string(),
            method,
            headers: HashMap::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// 通用 HTTP 响应结构
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 解析 JSON 响应体；空响应体按 `null` 处理（204 → `()`）
    pub fn json<T: DeserializeOwned>(&self) -> BlogResult<T> {
        let body = self.body.trim();
        let body = if body.is_empty() { "null" } else { body };
        serde_json::from_str(body).map_err(BlogError::from)
    }
}

/// HTTP 客户端特性 (Trait)
///
/// 运行模型是单线程协作式调度，所以使用 `?Send`。
/// 没有超时、没有重试，失败原样返回给调用方。
#[async_trait::async_trait(?Send)]
pub trait HttpClient {
    async fn send(&self, req: HttpRequest) -> BlogResult<HttpResponse>;
}

// =========================================================
// 实现层: reqwest 客户端 (Production)
// =========================================================

#[derive(Clone, Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

fn multipart_form(parts: Vec<quill_shared::protocol::FormPart>) -> BlogResult<reqwest::multipart::Form> {
    let mut form = reqwest::multipart::Form::new();
    for part in parts {
        form = match part.value {
            FormValue::Text(text) => form.text(part.name, text),
            FormValue::File(upload) => {
                let file = reqwest::multipart::Part::bytes(upload.bytes)
                    .file_name(upload.file_name)
                    .mime_str(&upload.content_type)
                    .map_err(|e| BlogError::from(e).in_op("http.multipart"))?;
                form.part(part.name, file)
            }
        };
    }
    Ok(form)
}

#[async_trait::async_trait(?Send)]
impl HttpClient for ReqwestHttpClient {
    async fn send(&self, req: HttpRequest) -> BlogResult<HttpResponse> {
        let method = match req.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &req.url);

        for (k, v) in &req.headers {
            builder = builder.header(k, v);
        }

        builder = match req.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(parts) => builder.multipart(multipart_form(parts)?),
        };

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;

        Ok(HttpResponse { status, body })
    }
}

// =========================================================
// 测试工具: MockHttpClient
// =========================================================

/// 被记录下来的请求
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: RequestBody,
}

#[cfg(test)]
impl RecordedRequest {
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct MockHttpClient {
    // ("METHOD url", (Status, Response Body))
    responses: RefCell<HashMap<String, (u16, String)>>,
    pub requests: RefCell<Vec<RecordedRequest>>,
}

#[cfg(test)]
impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(method: HttpMethod, url: &str) -> String {
        format!("{} {}", method.as_str(), url)
    }

    pub fn mock_response(&self, method: HttpMethod, url: &str, status: u16, body: serde_json::Value) {
        self.responses
            .borrow_mut()
            .insert(Self::key(method, url), (status, body.to_string()));
    }

    pub fn mock_empty(&self, method: HttpMethod, url: &str, status: u16) {
        self.responses
            .borrow_mut()
            .insert(Self::key(method, url), (status, String::new()));
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.borrow().last().cloned()
    }
}

#[cfg(test)]
#[async_trait::async_trait(?Send)]
impl HttpClient for MockHttpClient {
    async fn send(&self, req: HttpRequest) -> BlogResult<HttpResponse> {
        self.requests.borrow_mut().push(RecordedRequest {
            method: req.method,
            url: req.url.clone(),
            headers: req.headers.clone(),
            body: req.body.clone(),
        });

        let responses = self.responses.borrow();
        if let Some((status, body)) = responses.get(&Self::key(req.method, &req.url)) {
            Ok(HttpResponse {
                status: *status,
                body: body.clone(),
            })
        } else {
            Ok(HttpResponse {
                status: 404,
                body: "Not Found".to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_decodes_as_unit() {
        let resp = HttpResponse {
            status: 204,
            body: String::new(),
        };
        assert!(resp.is_success());
        assert!(resp.json::<()>().is_ok());
    }

    #[test]
    fn malformed_body_is_a_serialization_error() {
        let resp = HttpResponse {
            status: 200,
            body: "<html>".to_string(),
        };
        let err = resp.json::<Vec<u64>>().unwrap_err();
        assert_eq!(err.status, crate::error::BlogErrorStatus::Serialization);
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = HttpRequest::new("http://x/api/posts", HttpMethod::Get)
            .with_header("Authorization", "Bearer abc");
        assert_eq!(req.header("authorization"), Some("Bearer abc"));
    }

    #[tokio::test]
    async fn mock_client_records_and_defaults_to_404() {
        let client = MockHttpClient::new();
        client.mock_response(HttpMethod::Get, "http://x/api/posts", 200, serde_json::json!([]));

        let ok = client
            .send(HttpRequest::new("http://x/api/posts", HttpMethod::Get))
            .await
            .unwrap();
        assert_eq!(ok.status, 200);

        let missing = client
            .send(HttpRequest::new("http://x/api/posts", HttpMethod::Delete))
            .await
            .unwrap();
        assert_eq!(missing.status, 404);
        assert_eq!(client.request_count(), 2);
    }
}
