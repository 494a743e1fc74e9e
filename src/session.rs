//! 会话模块
//!
//! 持有当前登录身份，并镜像到本地持久化存储。
//! 生命周期：启动时从存储加载 (`hydrate`) → 登录/注册整体替换 → 注销清空。
//! 会话对象通过参数显式传递，存储只经由这里访问。

use std::cell::RefCell;
use std::rc::Rc;

use quill_shared::validation::validate_credentials;
use quill_shared::{AuthCredentials, Post, STORAGE_TOKEN_KEY, STORAGE_USER_KEY, Session, User};

use crate::api::{BlogApi, CredentialSource};
use crate::error::{BlogError, BlogResult};
use crate::request::HttpClient;
use crate::route::AuthCheck;
use crate::storage::KeyValueStore;

pub struct SessionStore {
    storage: Rc<dyn KeyValueStore>,
    current: RefCell<Option<Session>>,
}

impl SessionStore {
    /// 从存储加载会话
    ///
    /// token 与 user 必须同时存在且 user 可解析，否则视为未登录。
    /// 永远不会失败。
    pub fn hydrate(storage: Rc<dyn KeyValueStore>) -> Self {
        let session = Self::read_persisted(storage.as_ref());
        Self {
            storage,
            current: RefCell::new(session),
        }
    }

    fn read_persisted(storage: &dyn KeyValueStore) -> Option<Session> {
        let token = storage.get(STORAGE_TOKEN_KEY).filter(|t| !t.is_empty());
        let user = storage.get(STORAGE_USER_KEY);

        match (token, user) {
            (Some(token), Some(raw_user)) => match serde_json::from_str::<User>(&raw_user) {
                Ok(user) => Some(Session { user, token }),
                Err(e) => {
                    tracing::warn!(error = %e, "stored user record unparseable, starting logged out");
                    None
                }
            },
            (None, None) => None,
            _ => {
                tracing::warn!("half-written session in storage, starting logged out");
                None
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.borrow().is_some()
    }

    pub fn current(&self) -> Option<Session> {
        self.current.borrow().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.current.borrow().as_ref().map(|s| s.user.clone())
    }

    pub fn token(&self) -> Option<String> {
        self.current.borrow().as_ref().map(|s| s.token.clone())
    }

    /// 当前用户是否是文章作者（仅用于隐藏编辑/删除入口）
    pub fn can_modify(&self, post: &Post) -> bool {
        self.current
            .borrow()
            .as_ref()
            .is_some_and(|s| post.is_authored_by(&s.user))
    }

    /// 登录
    ///
    /// 失败（校验、凭据错误、网络）时保持原有会话不变。
    pub async fn login<C: HttpClient>(
        &self,
        api: &BlogApi<C>,
        credentials: AuthCredentials,
    ) -> BlogResult<Session> {
        validate_credentials(&credentials).map_err(|e| BlogError::from(e).in_op("session.login"))?;
        let resp = api
            .login(credentials)
            .await
            .map_err(|e| e.in_op("session.login"))?;
        self.establish(resp.into())
    }

    /// 注册，成功后与登录一样建立会话
    pub async fn signup<C: HttpClient>(
        &self,
        api: &BlogApi<C>,
        credentials: AuthCredentials,
    ) -> BlogResult<Session> {
        validate_credentials(&credentials).map_err(|e| BlogError::from(e).in_op("session.signup"))?;
        let resp = api
            .signup(credentials)
            .await
            .map_err(|e| e.in_op("session.signup"))?;
        self.establish(resp.into())
    }

    /// 整体替换会话：token 与 user 在同一批次写入存储，成功后才更新内存
    ///
    /// 空 token 的响应直接拒绝，原会话与存储保持不变。
    fn establish(&self, session: Session) -> BlogResult<Session> {
        if session.token.trim().is_empty() {
            return Err(BlogError::serialization("auth response carried an empty token")
                .in_op_with("session.persist", format!("user_id={}", session.user.id)));
        }

        let user_json = serde_json::to_string(&session.user)
            .map_err(|e| BlogError::from(e).in_op("session.persist"))?;

        self.storage
            .set_all(&[
                (STORAGE_TOKEN_KEY, session.token.as_str()),
                (STORAGE_USER_KEY, user_json.as_str()),
            ])
            .map_err(|e| e.in_op("session.persist"))?;

        tracing::info!(user_id = session.user.id, "session established");
        *self.current.borrow_mut() = Some(session.clone());
        Ok(session)
    }

    /// 注销
    ///
    /// 无条件清空内存与存储，不发请求；重复调用结果相同。
    pub fn logout(&self) {
        if let Err(e) = self.storage.remove_all(&[STORAGE_TOKEN_KEY, STORAGE_USER_KEY]) {
            tracing::warn!(error = %e, "failed to clear persisted session");
        }
        if self.current.borrow_mut().take().is_some() {
            tracing::info!("logged out");
        }
    }
}

impl CredentialSource for SessionStore {
    fn bearer_token(&self) -> Option<String> {
        self.token()
    }
}

impl AuthCheck for SessionStore {
    fn is_authenticated(&self) -> bool {
        SessionStore::is_authenticated(self)
    }
}
