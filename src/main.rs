//! `quill` 命令行入口
//!
//! 每个子命令对应博客界面的一个页面，
//! 与界面一样经过会话、路由守卫和资源层。

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use quill::ClientConfig;

use crate::commands::App;

/// 博客后端的命令行客户端
#[derive(Parser, Debug)]
#[command(name = "quill")]
struct Cli {
    /// 配置文件路径（默认 <config_dir>/quill/config.toml）
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    /// 覆盖 API 基础地址
    #[arg(long = "api-url", global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 登录并保存会话
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// 注册账号并登录
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// 清除已保存的会话
    Logout,

    /// 显示当前登录用户
    Whoami,

    /// 浏览与管理文章
    Posts {
        #[command(subcommand)]
        action: PostsAction,
    },

    /// 发表评论
    Comment {
        /// 文章 id
        post_id: u64,
        /// 显示名
        #[arg(long)]
        name: String,
        /// 评论内容
        #[arg(long)]
        body: String,
    },

    /// 查看路由守卫对某路径的裁决
    Route {
        /// 页面路径，如 /posts/new
        path: String,
    },
}

#[derive(Subcommand, Debug)]
enum PostsAction {
    /// 列出全部文章
    List,
    /// 查看文章及其评论
    Show { id: u64 },
    /// 发布新文章
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        /// 附带的图片文件
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// 编辑自己的文章
    Edit {
        id: u64,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        /// 附带的图片文件
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// 删除自己的文章
    Delete { id: u64 },
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ClientConfig::resolve(cli.config.as_deref()) {
        Ok(config) => config.with_api_url(cli.api_url),
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.log_filter);
    tracing::debug!(api = %config.api_base_url, storage = %config.storage_path.display(), "config loaded");

    let app = App::from_config(&config);
    let result = match cli.command {
        Commands::Login { email, password } => app.login(email, password).await,
        Commands::Signup { email, password } => app.signup(email, password).await,
        Commands::Logout => app.logout(),
        Commands::Whoami => app.whoami(),
        Commands::Posts { action } => match action {
            PostsAction::List => app.list_posts().await,
            PostsAction::Show { id } => app.show_post(id).await,
            PostsAction::Create {
                title,
                content,
                image,
            } => app.create_post(title, content, image).await,
            PostsAction::Edit {
                id,
                title,
                content,
                image,
            } => app.edit_post(id, title, content, image).await,
            PostsAction::Delete { id } => app.delete_post(id).await,
        },
        Commands::Comment {
            post_id,
            name,
            body,
        } => app.comment(post_id, name, body).await,
        Commands::Route { path } => app.route(&path),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}
