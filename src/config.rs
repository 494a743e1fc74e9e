//! 客户端配置
//!
//! 读取 `<config_dir>/quill/config.toml`，文件不存在时使用默认值；
//! 之后按环境变量覆盖，最后由命令行参数覆盖。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_LOG_FILTER: &str = "warn";

pub const ENV_API_URL: &str = "QUILL_API_URL";
pub const ENV_STORAGE_PATH: &str = "QUILL_STORAGE_PATH";
pub const ENV_LOG: &str = "QUILL_LOG";

const APP_DIR: &str = "quill";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// 后端 API 基础地址
    pub api_base_url: String,
    /// 会话持久化文件
    pub storage_path: PathBuf,
    /// tracing 过滤表达式，`RUST_LOG` 优先
    pub log_filter: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            storage_path: default_storage_path(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl ClientConfig {
    /// 默认配置文件路径
    pub fn default_path() -> PathBuf {
        base_dir(dirs::config_dir()).join("config.toml")
    }

    /// 从文件加载，文件不存在时返回默认值
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 加载文件并应用环境变量
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        let mut config = Self::load(&path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// 用环境变量覆盖；空值忽略
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = value(ENV_API_URL) {
            self.api_base_url = url;
        }
        if let Some(path) = value(ENV_STORAGE_PATH) {
            self.storage_path = PathBuf::from(path);
        }
        if let Some(filter) = value(ENV_LOG) {
            self.log_filter = filter;
        }
    }

    pub fn with_api_url(mut self, api_url: Option<String>) -> Self {
        if let Some(url) = api_url {
            self.api_base_url = url;
        }
        self
    }
}

fn default_storage_path() -> PathBuf {
    base_dir(dirs::data_dir()).join("storage.json")
}

fn base_dir(root: Option<PathBuf>) -> PathBuf {
    root.unwrap_or_else(|| PathBuf::from(".")).join(APP_DIR)
}
