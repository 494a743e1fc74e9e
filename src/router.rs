//! 路由服务模块 - 导航引擎
//!
//! 维护一个历史栈，实现"请求 -> 验证(Guard) -> 处理 -> 加载"的导航流程。
//! 认证状态通过注入的 [`AuthCheck`] 获取，与会话实现解耦。

use std::cell::RefCell;
use std::rc::Rc;

use super::route::{AppRoute, AuthCheck, GuardDecision, guard};

/// 一次导航的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigation {
    /// 最终落地的路由
    pub route: AppRoute,
    /// 守卫的判定
    pub decision: GuardDecision,
}

impl Navigation {
    pub fn was_redirected(&self) -> bool {
        self.decision != GuardDecision::Allow
    }
}

/// 路由器服务
pub struct RouterService {
    history: RefCell<Vec<AppRoute>>,
    is_authenticated: Rc<dyn AuthCheck>,
}

impl RouterService {
    /// 创建路由服务，并对初始路径执行一次守卫（替换而非压栈）
    pub fn new(initial_path: &str, is_authenticated: Rc<dyn AuthCheck>) -> Self {
        let router = Self {
            history: RefCell::new(Vec::new()),
            is_authenticated,
        };
        router.navigate_to_path(initial_path, false);
        router
    }

    /// 当前路由
    pub fn current_route(&self) -> AppRoute {
        self.history.borrow().last().copied().unwrap_or_default()
    }

    pub fn history(&self) -> Vec<AppRoute> {
        self.history.borrow().clone()
    }

    /// **核心方法：导航与守卫**
    pub fn navigate(&self, path: &str) -> Navigation {
        self.navigate_to_path(path, true)
    }

    /// # Arguments
    /// * `path` - 目标路径
    /// * `use_push` - true 压入历史栈, false 替换栈顶
    fn navigate_to_path(&self, path: &str, use_push: bool) -> Navigation {
        let decision = guard(path, self.is_authenticated.as_ref());
        let route = match decision.redirect_target() {
            Some(redirect) => {
                tracing::info!(from = path, to = %redirect, ?decision, "navigation redirected");
                redirect
            }
            None => AppRoute::from_path(path),
        };

        self.record(route, use_push);
        Navigation { route, decision }
    }

    fn record(&self, route: AppRoute, use_push: bool) {
        let mut history = self.history.borrow_mut();
        if !use_push {
            history.pop();
        }
        history.push(route);
    }

    /// 后退：弹出当前页，对上一页重新执行守卫
    ///
    /// 已在第一页时返回 `None`。
    pub fn back(&self) -> Option<Navigation> {
        let previous = {
            let mut history = self.history.borrow_mut();
            if history.len() < 2 {
                return None;
            }
            history.pop();
            history.last().copied()?
        };
        Some(self.navigate_to_path(&previous.to_path(), false))
    }

    /// 认证状态变化后调用：
    /// 刚登录且停留在登录/注册页 → 首页；刚注销且停留在受保护页 → 登录页
    pub fn sync_auth_state(&self) -> Option<Navigation> {
        let route = self.current_route();
        let is_auth = self.is_authenticated.is_authenticated();

        let (redirect, decision) = if is_auth && route.should_redirect_when_authenticated() {
            (AppRoute::auth_success_redirect(), GuardDecision::RedirectToHome)
        } else if !is_auth && route.requires_auth() {
            (AppRoute::auth_failure_redirect(), GuardDecision::RedirectToLogin)
        } else {
            return None;
        };

        tracing::info!(from = %route, to = %redirect, "auth state changed, redirecting");
        self.record(redirect, true);
        Some(Navigation {
            route: redirect,
            decision,
        })
    }
}
