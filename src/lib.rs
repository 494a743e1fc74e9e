//! Quill 博客客户端
//!
//! 分层结构：
//! - `session`: 会话状态与持久化
//! - `api`: HTTP 分发与 Bearer 凭据拦截
//! - `query` / `resources`: 查询缓存与资源访问层
//! - `route` / `router`: 路由模型、导航守卫与导航服务
//! - `config`: 客户端配置

pub mod api;
pub mod config;
pub mod error;
pub mod query;
pub mod request;
pub mod resources;
pub mod route;
pub mod router;
pub mod session;
pub mod storage;

#[cfg(test)]
mod testing;

pub use api::{BlogApi, CredentialSource, NoCredentials, StaticToken};
pub use config::{ClientConfig, ConfigError};
pub use error::{BlogError, BlogErrorStatus, BlogResult};
pub use query::{QueryCache, QueryKey, QueryState};
pub use request::{HttpClient, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use resources::{Blog, Mutation};
pub use route::{AppRoute, AuthCheck, GuardDecision, guard};
pub use router::{Navigation, RouterService};
pub use session::SessionStore;
pub use storage::{FileStorage, KeyValueStore, MemoryStorage};
