//! 本地持久化存储
//!
//! 浏览器里的 LocalStorage 在这里抽象为 [`KeyValueStore`]：
//! 字符串键值对，读取失败一律视为"不存在"。
//! 写入接口按批提交，便于把相关的几个键一次性写入。

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{BlogError, BlogResult};

/// 键值存储操作
pub trait KeyValueStore {
    /// 获取存储的字符串值
    ///
    /// 键不存在或读取出错时返回 `None`
    fn get(&self, key: &str) -> Option<String>;

    /// 一次提交写入多个键：要么全部生效，要么全部不生效
    fn set_all(&self, entries: &[(&str, &str)]) -> BlogResult<()>;

    /// 一次提交删除多个键，不存在的键忽略
    fn remove_all(&self, keys: &[&str]) -> BlogResult<()>;

    fn set(&self, key: &str, value: &str) -> BlogResult<()> {
        self.set_all(&[(key, value)])
    }

    fn delete(&self, key: &str) -> BlogResult<()> {
        self.remove_all(&[key])
    }
}

// =========================================================
// 内存实现
// =========================================================

/// 进程内存储，用于测试和不需要持久化的场景
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set_all(&self, entries: &[(&str, &str)]) -> BlogResult<()> {
        let mut map = self.entries.borrow_mut();
        for (k, v) in entries {
            map.insert(k.to_string(), v.to_string());
        }
        Ok(())
    }

    fn remove_all(&self, keys: &[&str]) -> BlogResult<()> {
        let mut map = self.entries.borrow_mut();
        for k in keys {
            map.remove(*k);
        }
        Ok(())
    }
}

// =========================================================
// 文件实现
// =========================================================

/// 以单个 JSON 文件保存全部键值
///
/// 每次写入都是"读取 → 修改 → 写临时文件 → rename"，
/// 因此同一批写入的键在磁盘上不会出现只写了一半的状态。
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Option<BTreeMap<String, String>> {
        let content = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&content) {
            Ok(map) => Some(map),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "storage file unreadable, ignoring");
                None
            }
        }
    }

    fn commit(&self, map: &BTreeMap<String, String>) -> BlogResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| BlogError::from(e).in_op_with("storage.mkdir", parent.display().to_string()))?;
            }
        }

        let content = serde_json::to_string_pretty(map)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, content)
            .map_err(|e| BlogError::from(e).in_op_with("storage.write", tmp.display().to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            BlogError::from(e).in_op_with("storage.rename", self.path.display().to_string())
        })
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.load()?.remove(key)
    }

    fn set_all(&self, entries: &[(&str, &str)]) -> BlogResult<()> {
        let mut map = self.load().unwrap_or_default();
        for (k, v) in entries {
            map.insert(k.to_string(), v.to_string());
        }
        self.commit(&map)
    }

    fn remove_all(&self, keys: &[&str]) -> BlogResult<()> {
        let Some(mut map) = self.load() else {
            // 没有文件就没有可删的内容
            return Ok(());
        };
        let before = map.len();
        for k in keys {
            map.remove(*k);
        }
        if map.len() == before {
            return Ok(());
        }
        self.commit(&map)
    }
}
