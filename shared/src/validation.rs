//! 客户端表单校验
//!
//! 仅用于在发请求前给出即时反馈，后端规则才是权威；
//! 这里的阈值与后端各自维护，不保证同步。

use crate::{AuthCredentials, CreateCommentPayload, CreatePostPayload};
use thiserror::Error;

pub const TITLE_MIN_CHARS: usize = 5;
pub const CONTENT_MIN_CHARS: usize = 20;
pub const COMMENT_NAME_MIN_CHARS: usize = 2;
pub const COMMENT_BODY_MIN_CHARS: usize = 10;
pub const PASSWORD_MIN_CHARS: usize = 6;

/// 单个字段的校验失败
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// 一次表单校验收集到的全部字段错误
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("validation failed: {}", summary(.errors))]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

fn summary(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// 指定字段的错误信息（用于表单行内展示）
    pub fn for_field(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    fn check_min_chars(&mut self, field: &'static str, value: &str, min: usize) {
        if value.chars().count() < min {
            self.push(field, format!("must contain at least {} characters", min));
        }
    }
}

pub fn validate_post(payload: &CreatePostPayload) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.check_min_chars("title", &payload.title, TITLE_MIN_CHARS);
    errors.check_min_chars("content", &payload.content, CONTENT_MIN_CHARS);
    errors.into_result()
}

pub fn validate_comment(payload: &CreateCommentPayload) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.check_min_chars("name", &payload.name, COMMENT_NAME_MIN_CHARS);
    errors.check_min_chars("comment", &payload.comment, COMMENT_BODY_MIN_CHARS);
    errors.into_result()
}

pub fn validate_credentials(credentials: &AuthCredentials) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if !looks_like_email(&credentials.email) {
        errors.push("email", "invalid email address");
    }
    errors.check_min_chars("password", &credentials.password, PASSWORD_MIN_CHARS);
    errors.into_result()
}

/// 粗略的邮箱格式检查：`local@domain.tld`，无空白
fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_and_content_boundaries() {
        let ok = CreatePostPayload::new("Hello", "a".repeat(20));
        assert!(validate_post(&ok).is_ok());

        let short_title = CreatePostPayload::new("Hell", "a".repeat(20));
        let err = validate_post(&short_title).unwrap_err();
        assert!(err.for_field("title").is_some());
        assert!(err.for_field("content").is_none());

        let short_content = CreatePostPayload::new("Hello", "a".repeat(19));
        let err = validate_post(&short_content).unwrap_err();
        assert_eq!(err.errors().len(), 1);
        assert!(err.for_field("content").is_some());
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        // 5 个字符，15 个字节
        let payload = CreatePostPayload::new("éèàùç", "a".repeat(20));
        assert!(validate_post(&payload).is_ok());
        let payload = CreatePostPayload::new("文章", "a".repeat(20));
        assert!(validate_post(&payload).is_err());
    }

    #[test]
    fn comment_rules() {
        assert!(validate_comment(&CreateCommentPayload::new("Al", "Nice article indeed!")).is_ok());

        let err = validate_comment(&CreateCommentPayload::new("A", "short")).unwrap_err();
        assert_eq!(err.errors().len(), 2);
        assert!(err.for_field("name").is_some());
        assert!(err.for_field("comment").is_some());
    }

    #[test]
    fn credential_rules() {
        assert!(validate_credentials(&AuthCredentials::new("ada@example.com", "secret")).is_ok());

        let err = validate_credentials(&AuthCredentials::new("ada@", "12345")).unwrap_err();
        assert!(err.for_field("email").is_some());
        assert!(err.for_field("password").is_some());

        assert!(validate_credentials(&AuthCredentials::new("a b@x.io", "secret")).is_err());
        assert!(validate_credentials(&AuthCredentials::new("ada.example.com", "secret")).is_err());
    }

    #[test]
    fn display_lists_every_field() {
        let err = validate_comment(&CreateCommentPayload::new("A", "short")).unwrap_err();
        let text = err.to_string();
        assert!(text.starts_with("validation failed:"));
        assert!(text.contains("name:"));
        assert!(text.contains("comment:"));
    }
}
