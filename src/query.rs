//! 查询缓存
//!
//! 进程内的键值缓存，保存每个查询键最近一次的结果、加载中/出错/过期标记，
//! 以及进行中的请求（同一个键的并发读取共享同一个请求）。
//!
//! 变更成功后按前缀失效相关键；失效会让进行中的旧请求失去写回资格，
//! 旧响应晚到也不会覆盖失效之后取回的新数据。

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture, Shared};
use quill_shared::PostId;

use crate::error::{BlogError, BlogResult};

// =========================================================
// 查询键
// =========================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Name(&'static str),
    Id(u64),
}

/// 形如 `("posts",)`、`("posts", 5)`、`("comments", 5)` 的元组键
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<KeyPart>);

impl QueryKey {
    pub fn root(name: &'static str) -> Self {
        Self(vec![KeyPart::Name(name)])
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.0.push(KeyPart::Id(id));
        self
    }

    pub fn posts() -> Self {
        Self::root("posts")
    }

    pub fn post(id: PostId) -> Self {
        Self::posts().with_id(id)
    }

    pub fn comments(post_id: PostId) -> Self {
        Self::root("comments").with_id(post_id)
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    /// 前缀匹配（包含完全相等）
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match part {
                KeyPart::Name(name) => write!(f, "{:?}", name)?,
                KeyPart::Id(id) => write!(f, "{}", id)?,
            }
        }
        if self.0.len() == 1 {
            write!(f, ",")?;
        }
        write!(f, ")")
    }
}

// =========================================================
// 缓存条目
// =========================================================

type Erased = Rc<dyn Any>;
type SharedFetch = Shared<LocalBoxFuture<'static, Result<Erased, BlogError>>>;

struct InFlight {
    id: u64,
    fut: SharedFetch,
}

#[derive(Default)]
struct CacheEntry {
    data: Option<Erased>,
    error: Option<BlogError>,
    stale: bool,
    in_flight: Option<InFlight>,
}

/// 某个键的可观察状态（用于界面的加载/出错展示）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryState {
    pub has_data: bool,
    pub is_loading: bool,
    pub is_error: bool,
    pub is_stale: bool,
}

// =========================================================
// 查询缓存
// =========================================================

#[derive(Default)]
pub struct QueryCache {
    entries: RefCell<HashMap<QueryKey, CacheEntry>>,
    next_fetch_id: Cell<u64>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取键对应的数据
    ///
    /// - 有未过期的数据：直接返回
    /// - 已有进行中的请求：等待同一个请求
    /// - 否则调用 `fetcher` 发起请求
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> BlogResult<T>
    where
        T: Clone + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = BlogResult<T>> + 'static,
    {
        let (fetch_id, fut) = {
            let mut entries = self.entries.borrow_mut();
            let entry = entries.entry(key.clone()).or_default();

            if !entry.stale {
                if let Some(value) = entry.data.as_ref().and_then(|d| d.downcast_ref::<T>()) {
                    return Ok(value.clone());
                }
            }

            match &entry.in_flight {
                Some(in_flight) => (in_flight.id, in_flight.fut.clone()),
                None => {
                    let id = self.next_fetch_id.get() + 1;
                    self.next_fetch_id.set(id);
                    tracing::debug!(key = %key, "fetching");
                    let fut = fetcher()
                        .map(|res| res.map(|v| Rc::new(v) as Erased))
                        .boxed_local()
                        .shared();
                    entry.in_flight = Some(InFlight {
                        id,
                        fut: fut.clone(),
                    });
                    (id, fut)
                }
            }
        };

        let outcome = fut.await;
        self.settle(&key, fetch_id, &outcome);

        let value = outcome?;
        value.downcast_ref::<T>().cloned().ok_or_else(|| {
            BlogError::serialization(format!("cached value for {} has an unexpected type", key))
                .in_op("query.fetch")
        })
    }

    /// 把请求结果写回条目；只有条目当前登记的请求才能写回
    fn settle(&self, key: &QueryKey, fetch_id: u64, outcome: &Result<Erased, BlogError>) {
        let mut entries = self.entries.borrow_mut();
        let Some(entry) = entries.get_mut(key) else {
            return;
        };
        let is_current = entry
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.id == fetch_id);
        if !is_current {
            return;
        }

        entry.in_flight = None;
        match outcome {
            Ok(value) => {
                entry.data = Some(value.clone());
                entry.error = None;
                entry.stale = false;
            }
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "fetch failed");
                entry.error = Some(e.clone());
            }
        }
    }

    /// 失效所有与 `prefix` 前缀匹配的键，返回受影响的条目数
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        self.invalidate_where(|key| key.starts_with(prefix))
    }

    /// 只失效完全相等的键
    pub fn invalidate_exact(&self, key: &QueryKey) -> usize {
        self.invalidate_where(|k| k == key)
    }

    fn invalidate_where(&self, matches: impl Fn(&QueryKey) -> bool) -> usize {
        let mut entries = self.entries.borrow_mut();
        let mut count = 0;
        for (key, entry) in entries.iter_mut().filter(|(k, _)| matches(k)) {
            entry.stale = true;
            // 进行中的旧请求不再有资格写回
            entry.in_flight = None;
            count += 1;
            tracing::debug!(key = %key, "invalidated");
        }
        count
    }

    /// 强制重新请求某个键
    pub async fn refetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> BlogResult<T>
    where
        T: Clone + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = BlogResult<T>> + 'static,
    {
        self.invalidate_exact(&key);
        self.fetch(key, fetcher).await
    }

    /// 最近一次成功的数据（不论是否过期）
    pub fn get_data<T: Clone + 'static>(&self, key: &QueryKey) -> Option<T> {
        self.entries
            .borrow()
            .get(key)
            .and_then(|e| e.data.as_ref())
            .and_then(|d| d.downcast_ref::<T>())
            .cloned()
    }

    /// 直接写入数据并标记为最新
    pub fn set_data<T: 'static>(&self, key: QueryKey, value: T) {
        let mut entries = self.entries.borrow_mut();
        let entry = entries.entry(key).or_default();
        entry.data = Some(Rc::new(value));
        entry.error = None;
        entry.stale = false;
    }

    pub fn state(&self, key: &QueryKey) -> QueryState {
        match self.entries.borrow().get(key) {
            Some(entry) => QueryState {
                has_data: entry.data.is_some(),
                is_loading: entry.in_flight.is_some(),
                is_error: entry.error.is_some(),
                is_stale: entry.stale,
            },
            None => QueryState::default(),
        }
    }

    /// 最近一次失败（成功后清除）
    pub fn last_error(&self, key: &QueryKey) -> Option<BlogError> {
        self.entries.borrow().get(key).and_then(|e| e.error.clone())
    }

    pub fn remove(&self, key: &QueryKey) {
        self.entries.borrow_mut().remove(key);
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}
