mod models;

pub use models::*;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Errors raised while persisting the document.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to write store file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize store document: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The whole persisted document: one JSON object with a top-level array per
/// collection, rewritten wholesale on each mutation.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub drivers: Vec<Driver>,
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub driver_applications: Vec<DriverApplication>,
    #[serde(default)]
    pub managers: Vec<Manager>,
}

/// JSON document store guarded by a read-write lock.
///
/// Every mutation runs under the write lock and is flushed to disk before
/// the lock is released, so read-modify-write sequences are serialized:
/// two concurrent accepts of the same order resolve to exactly one winner.
pub struct Store {
    path: PathBuf,
    db: RwLock<Database>,
}

impl Store {
    /// Open the store at `path`. A missing or malformed document is
    /// replaced with an empty default rather than failing startup.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(db) => db,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Store document is malformed, starting empty");
                    Database::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No store document found, starting empty");
                Database::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: path.to_path_buf(),
            db: RwLock::new(db),
        })
    }

    /// Run a read-only query against the document.
    pub fn read<T>(&self, f: impl FnOnce(&Database) -> T) -> T {
        f(&self.db.read())
    }

    /// Run a mutation against the document and persist it before the write
    /// lock is released. The mutation runs on a working copy: if `f` fails,
    /// neither memory nor disk changes.
    pub fn write<T, E>(
        &self,
        f: impl FnOnce(&mut Database) -> Result<T, E>,
    ) -> Result<Result<T, E>, StoreError> {
        let mut db = self.db.write();
        let mut working = db.clone();
        let out = f(&mut working);
        if out.is_ok() {
            self.persist(&working)?;
            *db = working;
        }
        Ok(out)
    }

    fn persist(&self, db: &Database) -> Result<(), StoreError> {
        let raw = serde_json::to_string_pretty(db)?;
        // Write to a sibling temp file first so a crash mid-write cannot
        // truncate the document.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
