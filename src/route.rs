//! 路由定义模块 - 领域模型
//!
//! 纯粹的业务逻辑层，不依赖任何 I/O。
//! 定义了应用的所有页面路径，以及导航守卫的判定规则。

use std::fmt::Display;

use quill_shared::PostId;

/// 认证状态查询能力
///
/// 守卫只询问"是否已认证"，不直接读取存储。
pub trait AuthCheck {
    fn is_authenticated(&self) -> bool;
}

impl AuthCheck for bool {
    fn is_authenticated(&self) -> bool {
        *self
    }
}

/// 应用路由枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppRoute {
    /// 文章列表 (默认路由)
    #[default]
    Home,
    Login,
    Signup,
    /// 新建文章 (需要认证)
    NewPost,
    PostDetail(PostId),
    /// 编辑文章 (需要认证)
    EditPost(PostId),
    /// 页面未找到
    NotFound,
}

impl AppRoute {
    /// 将 URL path 解析为路由枚举
    pub fn from_path(path: &str) -> Self {
        let segments = segments(path);
        match segments.as_slice() {
            [] => Self::Home,
            ["login"] => Self::Login,
            ["signup"] => Self::Signup,
            ["posts", "new"] => Self::NewPost,
            ["posts", id] => id.parse().map(Self::PostDetail).unwrap_or(Self::NotFound),
            ["posts", id, "edit"] => id.parse().map(Self::EditPost).unwrap_or(Self::NotFound),
            _ => Self::NotFound,
        }
    }

    /// 获取路由对应的 URL path
    pub fn to_path(&self) -> String {
        match self {
            Self::Home => "/".to_string(),
            Self::Login => "/login".to_string(),
            Self::Signup => "/signup".to_string(),
            Self::NewPost => "/posts/new".to_string(),
            Self::PostDetail(id) => format!("/posts/{}", id),
            Self::EditPost(id) => format!("/posts/{}/edit", id),
            Self::NotFound => "/404".to_string(),
        }
    }

    /// 该路由是否需要认证
    pub fn requires_auth(&self) -> bool {
        is_protected_path(&self.to_path())
    }

    /// 已认证用户是否应该离开此路由（登录/注册页）
    pub fn should_redirect_when_authenticated(&self) -> bool {
        is_auth_page(&self.to_path())
    }

    /// 认证失败时的重定向目标
    pub fn auth_failure_redirect() -> Self {
        Self::Login
    }

    /// 已认证用户访问登录页时的重定向目标
    pub fn auth_success_redirect() -> Self {
        Self::Home
    }
}

impl Display for AppRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_path())
    }
}

fn segments(path: &str) -> Vec<&str> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.split('/').filter(|s| !s.is_empty()).collect()
}

// =========================================================
// 守卫
// =========================================================

/// 守卫只作用于这些路径模式
pub const GUARDED_PATTERNS: [&str; 4] = ["/login", "/signup", "/posts/new", "/posts/:id/edit"];

/// 受保护路径：恰好是新建文章页，或包含 `edit` 段
pub fn is_protected_path(path: &str) -> bool {
    let segments = segments(path);
    segments == ["posts", "new"] || segments.contains(&"edit")
}

/// 认证页：以 `/login` 或 `/signup` 开头
pub fn is_auth_page(path: &str) -> bool {
    path.starts_with("/login") || path.starts_with("/signup")
}

/// 路径是否落在守卫的匹配范围内
pub fn is_guarded(path: &str) -> bool {
    GUARDED_PATTERNS.iter().any(|pattern| matches_pattern(pattern, path))
}

fn matches_pattern(pattern: &str, path: &str) -> bool {
    let expected = segments(pattern);
    let actual = segments(path);
    expected.len() == actual.len()
        && expected
            .iter()
            .zip(actual.iter())
            .all(|(e, a)| e.starts_with(':') || e == a)
}

/// 守卫判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    RedirectToLogin,
    RedirectToHome,
}

impl GuardDecision {
    pub fn redirect_target(&self) -> Option<AppRoute> {
        match self {
            GuardDecision::Allow => None,
            GuardDecision::RedirectToLogin => Some(AppRoute::auth_failure_redirect()),
            GuardDecision::RedirectToHome => Some(AppRoute::auth_success_redirect()),
        }
    }
}

/// **核心守卫逻辑**
///
/// 只是界面层面的提示，真正的鉴权在后端；
/// 会话状态无法确认时一律按未登录处理。
pub fn guard(path: &str, auth: &dyn AuthCheck) -> GuardDecision {
    if !is_guarded(path) {
        return GuardDecision::Allow;
    }

    let is_auth = auth.is_authenticated();
    if is_protected_path(path) && !is_auth {
        return GuardDecision::RedirectToLogin;
    }
    if is_auth_page(path) && is_auth {
        return GuardDecision::RedirectToHome;
    }
    GuardDecision::Allow
}
