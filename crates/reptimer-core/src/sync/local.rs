//! Local device storage: a directory of `<key>.json` files.
//!
//! The whole category list lives under one key and is rewritten after
//! every change. Missing or unreadable data loads as an empty list.

use std::path::{Path, PathBuf};

use super::Persistence;
use crate::error::PersistenceError;
use crate::model::Category;
use crate::store::Change;

pub const CATEGORIES_KEY: &str = "categories";

#[derive(Debug, Clone)]
pub struct LocalStorage {
    dir: PathBuf,
}

impl LocalStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Read the value under `key`. A missing key is `None`; any other read
    /// failure is logged and also treated as absent.
    pub fn get_item(&self, key: &str) -> Option<String> {
        let path = self.key_path(key);
        match std::fs::read_to_string(&path) {
            Ok(value) => Some(value),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "unreadable local storage key");
                None
            }
        }
    }

    /// Write `value` under `key`, replacing the previous value atomically.
    pub fn set_item(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let path = self.key_path(key);
        let io_err = |source| PersistenceError::Io {
            path: path.clone(),
            source,
        };
        std::fs::create_dir_all(&self.dir).map_err(io_err)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value).map_err(io_err)?;
        std::fs::rename(&tmp, &path).map_err(io_err)
    }

    pub fn remove_item(&self, key: &str) -> Result<(), PersistenceError> {
        let path = self.key_path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PersistenceError::Io { path, source }),
        }
    }

    pub fn load_categories(&self) -> Vec<Category> {
        let Some(raw) = self.get_item(CATEGORIES_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(categories) => categories,
            Err(e) => {
                tracing::warn!(error = %e, dir = %self.dir.display(), "discarding corrupt local categories");
                Vec::new()
            }
        }
    }

    pub fn save_categories(&self, categories: &[Category]) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(categories)?;
        self.set_item(CATEGORIES_KEY, &json)
    }
}

impl Persistence for LocalStorage {
    async fn load(&self) -> Result<Vec<Category>, PersistenceError> {
        Ok(self.load_categories())
    }

    async fn mirror(&self, _change: &Change, snapshot: &[Category]) -> Result<(), PersistenceError> {
        self.save_categories(snapshot)
    }
}
