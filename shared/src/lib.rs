use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod protocol;
pub mod timestamp;
pub mod validation;

pub use protocol::{ApiRequest, HttpMethod};
pub use validation::{FieldError, ValidationErrors};

// =========================================================
// 常量定义 (Constants)
// =========================================================

/// 持久化存储中保存凭据的键
pub const STORAGE_TOKEN_KEY: &str = "token";
/// 持久化存储中保存用户记录（JSON）的键
pub const STORAGE_USER_KEY: &str = "user";
/// multipart 表单中用于伪装 HTTP 方法的字段
pub const METHOD_OVERRIDE_FIELD: &str = "_method";

pub type PostId = u64;
pub type UserId = u64;
pub type CommentId = u64;

// =========================================================
// 领域模型 (Domain Models)
// =========================================================

/// 已认证用户
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// 登录 / 注册凭据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthCredentials {
    pub email: String,
    pub password: String,
}

impl AuthCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// `/auth/login` 与 `/auth/signup` 的响应体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

/// 当前会话：用户 + 凭据，只能整体替换
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: User,
    pub token: String,
}

impl Session {
    pub fn user_id(&self) -> UserId {
        self.user.id
    }

    pub fn display_name(&self) -> &str {
        &self.user.name
    }

    pub fn email(&self) -> &str {
        &self.user.email
    }
}

impl From<AuthResponse> for Session {
    fn from(resp: AuthResponse) -> Self {
        Self {
            user: resp.user,
            token: resp.token,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostAuthor {
    pub id: UserId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub author: PostAuthor,
    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<Comment>>,
}

impl Post {
    pub fn author_id(&self) -> UserId {
        self.author.id
    }

    pub fn author_name(&self) -> &str {
        &self.author.name
    }

    /// 作者判定（仅用于界面隐藏编辑/删除入口，真正的权限由后端校验）
    pub fn is_authored_by(&self, user: &User) -> bool {
        self.author.id == user.id
    }
}

/// 创建接口既可能直接返回文章，也可能包一层 `{ "post": ... }`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PostEnvelope {
    Wrapped { post: Post },
    Bare(Post),
}

impl PostEnvelope {
    pub fn into_post(self) -> Post {
        match self {
            PostEnvelope::Wrapped { post } => post,
            PostEnvelope::Bare(post) => post,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    /// 评论者显示名
    pub name: String,
    /// 评论正文
    pub comment: String,
    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
}

// =========================================================
// 请求载荷 (Payloads)
// =========================================================

/// 随文章一起上传的图片（multipart 二进制字段）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// 按扩展名猜测 MIME 类型，未知时退回 `application/octet-stream`
    pub fn guess_content_type(file_name: &str) -> &'static str {
        let ext = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "svg" => "image/svg+xml",
            _ => "application/octet-stream",
        }
    }
}

/// 创建 / 更新文章的表单内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePostPayload {
    pub title: String,
    pub content: String,
    pub image: Option<ImageUpload>,
}

impl CreatePostPayload {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: ImageUpload) -> Self {
        self.image = Some(image);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCommentPayload {
    pub name: String,
    pub comment: String,
}

impl CreateCommentPayload {
    pub fn new(name: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            comment: comment.into(),
        }
    }
}
