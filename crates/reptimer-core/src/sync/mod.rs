//! Persistence synchronization.
//!
//! Mirrors every committed store [`Change`] into a durable medium: either
//! local device storage (whole-list JSON blob) or the remote record
//! service (one HTTP exchange per change). Which one is used is a
//! deployment choice made from [`Config`]; there is no offline queue,
//! retry, or reconciliation between the two.

pub mod local;
pub mod remote;

pub use local::{LocalStorage, CATEGORIES_KEY};
pub use remote::RecordClient;

use crate::config::{Config, StorageMode};
use crate::error::{CoreError, PersistenceError};
use crate::model::Category;
use crate::store::Change;

/// A durable medium the store can be mirrored into.
#[allow(async_fn_in_trait)]
pub trait Persistence {
    /// Read the persisted category list.
    async fn load(&self) -> Result<Vec<Category>, PersistenceError>;

    /// Make the medium reflect `change`. `snapshot` is the store's full
    /// state right after the change was committed.
    async fn mirror(&self, change: &Change, snapshot: &[Category]) -> Result<(), PersistenceError>;
}

/// The configured persistence medium.
pub enum Backend {
    Local(LocalStorage),
    Remote(RecordClient),
}

impl Backend {
    pub fn from_config(config: &Config) -> Result<Self, CoreError> {
        match config.storage.mode {
            StorageMode::Local => Ok(Backend::Local(LocalStorage::new(config.data_dir()?))),
            StorageMode::Remote => Ok(Backend::Remote(RecordClient::new(
                &config.remote.base_url,
                config.remote.timeout(),
            )?)),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Backend::Local(local) => format!("local storage at {}", local.dir().display()),
            Backend::Remote(remote) => format!("record service at {}", remote.base_url()),
        }
    }
}

impl Persistence for Backend {
    async fn load(&self) -> Result<Vec<Category>, PersistenceError> {
        match self {
            Backend::Local(local) => local.load().await,
            Backend::Remote(remote) => remote.load().await,
        }
    }

    async fn mirror(&self, change: &Change, snapshot: &[Category]) -> Result<(), PersistenceError> {
        match self {
            Backend::Local(local) => local.mirror(change, snapshot).await,
            Backend::Remote(remote) => remote.mirror(change, snapshot).await,
        }
    }
}
