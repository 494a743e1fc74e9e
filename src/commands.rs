//! 子命令处理
//!
//! 对应页面的命令先经过路由守卫；失败统一通过 [`CliError::user_message`]
//! 输出通用文案，细节只写日志。

use std::path::{Path, PathBuf};
use std::rc::Rc;

use quill::{
    AppRoute, Blog, BlogApi, BlogError, ClientConfig, FileStorage, GuardDecision, HttpClient,
    KeyValueStore, QueryCache, ReqwestHttpClient, RouterService, SessionStore, guard,
};
use quill_shared::{
    AuthCredentials, CreateCommentPayload, CreatePostPayload, ImageUpload, Post, PostId,
};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Blog(#[from] BlogError),

    #[error("{path} redirected to {target}")]
    Redirected {
        path: String,
        target: AppRoute,
        decision: GuardDecision,
    },

    #[error("post {0} not found")]
    PostNotFound(PostId),

    #[error("post {0} belongs to another user")]
    NotAuthor(PostId),

    #[error("failed to read image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    /// 展示给用户的文案，不含后端细节
    pub fn user_message(&self) -> String {
        match self {
            CliError::Blog(e) => e.user_message(),
            CliError::Redirected {
                decision: GuardDecision::RedirectToHome,
                ..
            } => "You are already logged in.".to_string(),
            CliError::Redirected { .. } => "Please log in first.".to_string(),
            CliError::PostNotFound(_) => "Post not found.".to_string(),
            CliError::NotAuthor(_) => "You can only change your own posts.".to_string(),
            CliError::Image { path, .. } => format!("Could not read image {}.", path.display()),
        }
    }
}

pub type CliResult = Result<(), CliError>;

pub struct App<C: HttpClient + 'static> {
    session: Rc<SessionStore>,
    blog: Blog<C>,
}

impl App<ReqwestHttpClient> {
    pub fn from_config(config: &ClientConfig) -> Self {
        let storage: Rc<dyn KeyValueStore> = Rc::new(FileStorage::new(&config.storage_path));
        let session = Rc::new(SessionStore::hydrate(storage));
        let api = BlogApi::new(
            config.api_base_url.clone(),
            ReqwestHttpClient::new(),
            session.clone(),
        );
        Self::new(session, Blog::new(Rc::new(api), Rc::new(QueryCache::new())))
    }
}

impl<C: HttpClient + 'static> App<C> {
    pub fn new(session: Rc<SessionStore>, blog: Blog<C>) -> Self {
        Self { session, blog }
    }

    /// 进入页面前执行守卫
    fn enter(&self, route: AppRoute) -> CliResult {
        let path = route.to_path();
        match guard(&path, &*self.session) {
            GuardDecision::Allow => Ok(()),
            decision => Err(CliError::Redirected {
                path,
                target: decision.redirect_target().unwrap_or_default(),
                decision,
            }),
        }
    }

    // =========================================================
    // 认证
    // =========================================================

    pub async fn login(&self, email: String, password: String) -> CliResult {
        self.enter(AppRoute::Login)?;
        let session = self
            .session
            .login(self.blog.api(), AuthCredentials::new(email, password))
            .await?;
        println!("Logged in as {} <{}>.", session.display_name(), session.email());
        Ok(())
    }

    pub async fn signup(&self, email: String, password: String) -> CliResult {
        self.enter(AppRoute::Signup)?;
        let session = self
            .session
            .signup(self.blog.api(), AuthCredentials::new(email, password))
            .await?;
        println!("Welcome, {}! You are now logged in.", session.display_name());
        Ok(())
    }

    pub fn logout(&self) -> CliResult {
        self.session.logout();
        println!("Logged out.");
        Ok(())
    }

    pub fn whoami(&self) -> CliResult {
        match self.session.user() {
            Some(user) => println!("{} <{}> (id {})", user.name, user.email, user.id),
            None => println!("Not logged in."),
        }
        Ok(())
    }

    // =========================================================
    // 文章
    // =========================================================

    pub async fn list_posts(&self) -> CliResult {
        self.enter(AppRoute::Home)?;
        let posts = self.blog.posts().await?;
        if posts.is_empty() {
            println!("No posts yet.");
        }
        for post in &posts {
            println!(
                "#{:<5} {}  by {} on {}",
                post.id,
                post.title,
                post.author_name(),
                post.created_at.format("%Y-%m-%d")
            );
        }
        Ok(())
    }

    pub async fn show_post(&self, id: PostId) -> CliResult {
        self.enter(AppRoute::PostDetail(id))?;
        let post = self.require_post(id).await?;
        let comments = self.blog.comments(id).await?;

        println!("{}", post.title);
        println!(
            "by {} on {}",
            post.author_name(),
            post.created_at.format("%Y-%m-%d %H:%M")
        );
        if let Some(image) = &post.image_url {
            println!("image: {}", image);
        }
        println!();
        println!("{}", post.content);
        println!();
        println!("Comments ({})", comments.len());
        for comment in &comments {
            println!("- {}: {}", comment.name, comment.comment);
        }
        if self.session.can_modify(&post) {
            println!();
            println!("You wrote this post: `quill posts edit {0}` / `quill posts delete {0}`", id);
        }
        Ok(())
    }

    pub async fn create_post(
        &self,
        title: String,
        content: String,
        image: Option<PathBuf>,
    ) -> CliResult {
        self.enter(AppRoute::NewPost)?;
        let payload = with_image(CreatePostPayload::new(title, content), image.as_deref()).await?;
        let post = self.blog.create_post(payload).await?;
        println!("Created post #{}: {}", post.id, post.title);
        Ok(())
    }

    pub async fn edit_post(
        &self,
        id: PostId,
        title: String,
        content: String,
        image: Option<PathBuf>,
    ) -> CliResult {
        self.enter(AppRoute::EditPost(id))?;
        self.require_own_post(id).await?;
        let payload = with_image(CreatePostPayload::new(title, content), image.as_deref()).await?;
        let post = self.blog.update_post(id, payload).await?;
        println!("Updated post #{}: {}", post.id, post.title);
        Ok(())
    }

    pub async fn delete_post(&self, id: PostId) -> CliResult {
        self.enter(AppRoute::EditPost(id))?;
        self.require_own_post(id).await?;
        self.blog.delete_post(id).await?;
        println!("Deleted post #{}.", id);
        Ok(())
    }

    async fn require_post(&self, id: PostId) -> Result<Post, CliError> {
        self.blog.find_post(id).await?.ok_or(CliError::PostNotFound(id))
    }

    /// 编辑/删除入口只对作者开放，最终由后端裁决
    async fn require_own_post(&self, id: PostId) -> Result<Post, CliError> {
        let post = self.require_post(id).await?;
        if !self.session.can_modify(&post) {
            return Err(CliError::NotAuthor(id));
        }
        Ok(post)
    }

    // =========================================================
    // 评论
    // =========================================================

    pub async fn comment(&self, post_id: PostId, name: String, body: String) -> CliResult {
        self.enter(AppRoute::PostDetail(post_id))?;
        self.blog
            .add_comment(post_id, CreateCommentPayload::new(name, body))
            .await?;

        let comments = self.blog.comments(post_id).await?;
        println!("Comment added. Post #{} now has {} comment(s).", post_id, comments.len());
        Ok(())
    }

    // =========================================================
    // 路由
    // =========================================================

    pub fn route(&self, path: &str) -> CliResult {
        let router = RouterService::new("/", self.session.clone());
        let nav = router.navigate(path);
        match nav.decision {
            GuardDecision::Allow => println!("{} -> allow ({:?})", path, nav.route),
            decision => println!("{} -> {:?}, now at {}", path, decision, nav.route),
        }
        Ok(())
    }
}

async fn with_image(
    payload: CreatePostPayload,
    image: Option<&Path>,
) -> Result<CreatePostPayload, CliError> {
    let Some(path) = image else {
        return Ok(payload);
    };
    let bytes = tokio::fs::read(path).await.map_err(|source| CliError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let content_type = ImageUpload::guess_content_type(&file_name);
    Ok(payload.with_image(ImageUpload::new(file_name, content_type, bytes)))
}
