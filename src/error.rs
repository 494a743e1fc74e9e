use std::fmt;
use std::sync::Arc;

use quill_shared::ValidationErrors;

// =========================================================
// 错误状态枚举
// =========================================================

/// 错误状态枚举
/// 与用户可见的处理方式一一对应：行内提示 / 通用通知 / 占位页
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlogErrorStatus {
    /// 表单校验失败（客户端预校验或后端 422）
    Validation,
    /// 401 / 403：凭据缺失、无效或无权限
    Unauthorized,
    /// 404：资源不存在
    NotFound,
    /// 网络层失败（连接、DNS、超时等）
    Network,
    /// 其它非 2xx 响应
    Server,
    /// 响应体解析或请求体序列化失败
    Serialization,
    /// 本地持久化存储读写失败
    Storage,
}

impl BlogErrorStatus {
    /// 由 HTTP 状态码推导错误类型（仅用于非 2xx）
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 | 403 => BlogErrorStatus::Unauthorized,
            404 => BlogErrorStatus::NotFound,
            422 => BlogErrorStatus::Validation,
            _ => BlogErrorStatus::Server,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            BlogErrorStatus::Validation => "INVALID_INPUT",
            BlogErrorStatus::Unauthorized => "UNAUTHORIZED",
            BlogErrorStatus::NotFound => "RESOURCE_NOT_FOUND",
            BlogErrorStatus::Network => "NETWORK_ERROR",
            BlogErrorStatus::Server => "SERVER_ERROR",
            BlogErrorStatus::Serialization => "JSON_PARSE_ERROR",
            BlogErrorStatus::Storage => "LOCAL_STORAGE_ERROR",
        }
    }
}

// =========================================================
// 错误上下文追踪
// =========================================================

/// 结构化的错误追踪片段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorSpan {
    /// 操作名称，如 "api.send", "session.login"
    pub operation: String,
    /// 额外的细节信息，如路径、文章 id
    pub detail: Option<String>,
}

impl ErrorSpan {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            detail: None,
        }
    }

    pub fn with_detail(operation: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            detail: Some(detail.into()),
        }
    }
}

// =========================================================
// 核心错误类型
// =========================================================

/// 客户端统一错误
///
/// - status: 错误类型
/// - message: 错误消息（调试用，不直接展示给用户）
/// - http_status: 后端返回的状态码（如有）
/// - validation: 字段级错误（仅 Validation）
/// - source: 原始错误
/// - spans: 调用追踪
///
/// 实现 `Clone`，以便同一个进行中的请求把失败结果分发给所有等待者。
#[derive(Debug, Clone)]
pub struct BlogError {
    pub status: BlogErrorStatus,
    pub message: String,
    http_status: Option<u16>,
    validation: Option<ValidationErrors>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    spans: Vec<ErrorSpan>,
}

impl BlogError {
    pub fn new(status: BlogErrorStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            http_status: None,
            validation: None,
            source: None,
            spans: Vec::new(),
        }
    }

    // --- Convenience constructors ---

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(BlogErrorStatus::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(BlogErrorStatus::NotFound, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(BlogErrorStatus::Network, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(BlogErrorStatus::Serialization, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(BlogErrorStatus::Storage, message)
    }

    /// 非 2xx 响应
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        let mut err = Self::new(BlogErrorStatus::from_http_status(status), body);
        err.http_status = Some(status);
        err
    }

    // --- Context builders ---

    pub fn in_op(mut self, operation: impl Into<String>) -> Self {
        self.spans.push(ErrorSpan::new(operation));
        self
    }

    pub fn in_op_with(mut self, operation: impl Into<String>, detail: impl Into<String>) -> Self {
        self.spans.push(ErrorSpan::with_detail(operation, detail));
        self
    }

    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    // --- Accessors ---

    pub fn error_code(&self) -> &'static str {
        self.status.error_code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn http_status(&self) -> Option<u16> {
        self.http_status
    }

    pub fn spans(&self) -> &[ErrorSpan] {
        &self.spans
    }

    /// 字段级错误，仅客户端预校验失败时存在
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        self.validation.as_ref()
    }

    pub fn is_not_found(&self) -> bool {
        self.status == BlogErrorStatus::NotFound
    }

    /// 面向用户的提示文本
    ///
    /// 网络 / 鉴权类错误只给出通用提示，不暴露细节；
    /// 校验错误列出字段信息。
    pub fn user_message(&self) -> String {
        match (&self.status, &self.validation) {
            (BlogErrorStatus::Validation, Some(errors)) => errors.to_string(),
            (BlogErrorStatus::Validation, None) => {
                "The server rejected the submitted data.".to_string()
            }
            (BlogErrorStatus::NotFound, _) => "Not found.".to_string(),
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }
}

// =========================================================
// Display & Error trait 实现
// =========================================================

impl fmt::Display for BlogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.error_code(), self.message)?;

        if !self.spans.is_empty() {
            write!(f, " | trace: ")?;
            for (i, span) in self.spans.iter().enumerate() {
                if i > 0 {
                    write!(f, " -> ")?;
                }
                write!(f, "{}", span.operation)?;
                if let Some(detail) = &span.detail {
                    write!(f, "({})", detail)?;
                }
            }
        }
        Ok(())
    }
}

impl std::error::Error for BlogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

pub type BlogResult<T> = std::result::Result<T, BlogError>;

// =========================================================
// 类型转换实现
// =========================================================

impl From<ValidationErrors> for BlogError {
    fn from(errors: ValidationErrors) -> Self {
        let mut err = Self::new(BlogErrorStatus::Validation, errors.to_string());
        err.validation = Some(errors);
        err
    }
}

impl From<reqwest::Error> for BlogError {
    fn from(e: reqwest::Error) -> Self {
        let status = if e.is_decode() {
            BlogErrorStatus::Serialization
        } else {
            BlogErrorStatus::Network
        };
        BlogError::new(status, e.to_string()).with_source(e)
    }
}

impl From<serde_json::Error> for BlogError {
    fn from(e: serde_json::Error) -> Self {
        BlogError::serialization(e.to_string()).with_source(e)
    }
}

impl From<std::io::Error> for BlogError {
    fn from(e: std::io::Error) -> Self {
        BlogError::storage(e.to_string()).with_source(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_shared::validation::validate_comment;
    use quill_shared::CreateCommentPayload;

    #[test]
    fn http_status_mapping() {
        assert_eq!(BlogError::http(401, "").status, BlogErrorStatus::Unauthorized);
        assert_eq!(BlogError::http(403, "").status, BlogErrorStatus::Unauthorized);
        assert_eq!(BlogError::http(404, "").status, BlogErrorStatus::NotFound);
        assert_eq!(BlogError::http(422, "").status, BlogErrorStatus::Validation);
        assert_eq!(BlogError::http(500, "").status, BlogErrorStatus::Server);
        assert_eq!(BlogError::http(500, "").http_status(), Some(500));
    }

    #[test]
    fn display_includes_trace() {
        let err = BlogError::http(500, "boom")
            .in_op_with("api.send", "/posts")
            .in_op("blog.posts");
        assert_eq!(
            err.to_string(),
            "[SERVER_ERROR] boom | trace: api.send(/posts) -> blog.posts"
        );
    }

    #[test]
    fn user_message_hides_transport_details() {
        let err = BlogError::network("connection refused to 10.0.0.1:8000");
        assert!(!err.user_message().contains("10.0.0.1"));

        let err = BlogError::http(401, "token expired at 12:00");
        assert!(!err.user_message().contains("expired"));
    }

    #[test]
    fn validation_errors_survive_conversion_and_clone() {
        let errors = validate_comment(&CreateCommentPayload::new("A", "short")).unwrap_err();
        let err = BlogError::from(errors).clone();
        assert_eq!(err.status, BlogErrorStatus::Validation);
        assert_eq!(err.validation_errors().map(|v| v.errors().len()), Some(2));
        assert!(err.user_message().contains("name"));
    }
}
