//! 资源访问层
//!
//! 每个读操作对应一个缓存键，每个变更对应一组失效键。
//! 变更先做客户端预校验，成功后失效相关键，下次读取自动重新请求。

use std::rc::Rc;

use quill_shared::validation::{validate_comment, validate_post};
use quill_shared::{Comment, CreateCommentPayload, CreatePostPayload, Post, PostId};

use crate::api::BlogApi;
use crate::error::{BlogError, BlogResult};
use crate::query::{QueryCache, QueryKey, QueryState};
use crate::request::HttpClient;

/// 变更操作及其失效键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    CreatePost,
    UpdatePost(PostId),
    DeletePost(PostId),
    CreateComment(PostId),
}

impl Mutation {
    /// 成功后需要失效的键（按前缀匹配）
    pub fn invalidates(&self) -> Vec<QueryKey> {
        match self {
            Mutation::CreatePost | Mutation::UpdatePost(_) | Mutation::DeletePost(_) => {
                vec![QueryKey::posts()]
            }
            Mutation::CreateComment(post_id) => {
                vec![QueryKey::post(*post_id), QueryKey::comments(*post_id)]
            }
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Mutation::CreatePost => "blog.create_post",
            Mutation::UpdatePost(_) => "blog.update_post",
            Mutation::DeletePost(_) => "blog.delete_post",
            Mutation::CreateComment(_) => "blog.add_comment",
        }
    }
}

pub struct Blog<C: HttpClient + 'static> {
    api: Rc<BlogApi<C>>,
    cache: Rc<QueryCache>,
}

impl<C: HttpClient + 'static> Clone for Blog<C> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<C: HttpClient + 'static> Blog<C> {
    pub fn new(api: Rc<BlogApi<C>>, cache: Rc<QueryCache>) -> Self {
        Self { api, cache }
    }

    pub fn api(&self) -> &BlogApi<C> {
        &self.api
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn state(&self, key: &QueryKey) -> QueryState {
        self.cache.state(key)
    }

    // =========================================================
    // 读取
    // =========================================================

    pub async fn posts(&self) -> BlogResult<Vec<Post>> {
        let api = self.api.clone();
        self.cache
            .fetch(QueryKey::posts(), move || async move { api.list_posts().await })
            .await
    }

    pub async fn post(&self, id: PostId) -> BlogResult<Post> {
        let api = self.api.clone();
        self.cache
            .fetch(QueryKey::post(id), move || async move { api.get_post(id).await })
            .await
    }

    /// 文章不存在时返回 `Ok(None)`，由调用方展示占位内容
    pub async fn find_post(&self, id: PostId) -> BlogResult<Option<Post>> {
        match self.post(id).await {
            Ok(post) => Ok(Some(post)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn comments(&self, post_id: PostId) -> BlogResult<Vec<Comment>> {
        let api = self.api.clone();
        self.cache
            .fetch(QueryKey::comments(post_id), move || async move {
                api.list_comments(post_id).await
            })
            .await
    }

    // =========================================================
    // 变更
    // =========================================================

    pub async fn create_post(&self, payload: CreatePostPayload) -> BlogResult<Post> {
        let mutation = Mutation::CreatePost;
        validate_post(&payload).map_err(|e| BlogError::from(e).in_op(mutation.name()))?;
        let post = self
            .api
            .create_post(payload)
            .await
            .map_err(|e| e.in_op(mutation.name()))?;
        self.settle(mutation);
        Ok(post)
    }

    pub async fn update_post(&self, id: PostId, payload: CreatePostPayload) -> BlogResult<Post> {
        let mutation = Mutation::UpdatePost(id);
        validate_post(&payload)
            .map_err(|e| BlogError::from(e).in_op_with(mutation.name(), id.to_string()))?;
        let post = self
            .api
            .update_post(id, payload)
            .await
            .map_err(|e| e.in_op_with(mutation.name(), id.to_string()))?;
        self.settle(mutation);
        Ok(post)
    }

    pub async fn delete_post(&self, id: PostId) -> BlogResult<()> {
        let mutation = Mutation::DeletePost(id);
        self.api
            .delete_post(id)
            .await
            .map_err(|e| e.in_op_with(mutation.name(), id.to_string()))?;
        self.settle(mutation);
        Ok(())
    }

    /// 发表评论；成功后文章与评论列表都会在下次读取时重新请求
    pub async fn add_comment(
        &self,
        post_id: PostId,
        payload: CreateCommentPayload,
    ) -> BlogResult<Comment> {
        let mutation = Mutation::CreateComment(post_id);
        validate_comment(&payload)
            .map_err(|e| BlogError::from(e).in_op_with(mutation.name(), post_id.to_string()))?;
        let comment = self
            .api
            .create_comment(post_id, payload)
            .await
            .map_err(|e| e.in_op_with(mutation.name(), post_id.to_string()))?;
        self.settle(mutation);
        Ok(comment)
    }

    fn settle(&self, mutation: Mutation) {
        for key in mutation.invalidates() {
            let count = self.cache.invalidate(&key);
            tracing::debug!(mutation = mutation.name(), key = %key, count, "mutation settled");
        }
    }
}
