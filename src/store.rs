//! External task store
//!
//! Cloud-accessible commands (`|name| { ... }`) may have their body extended
//! with lines kept outside the Constfile. The store is a JSON or YAML file
//! mapping command names to definitions:
//!
//! ```json
//! { "deploy": { "body": ["$ ./notify.sh"] } }
//! ```

use crate::error::{StoreError, StoreResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Default store file name
pub const STORE_FILE_NAME: &str = "Conststore.json";

/// A command definition held by a store
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoredCommand {
    #[serde(default)]
    pub body: Vec<String>,
}

/// Lookup of command definitions by name
pub trait TaskStore: Send + Sync {
    fn lookup(&self, name: &str) -> StoreResult<StoredCommand>;
}

/// A store that never has anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStore;

impl TaskStore for NoStore {
    fn lookup(&self, _name: &str) -> StoreResult<StoredCommand> {
        Err(StoreError::Unavailable)
    }
}

/// Store backed by a file, read on every lookup
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    fn is_yaml(&self) -> bool {
        matches!(
            self.path.extension().and_then(|e| e.to_str()),
            Some("yml") | Some("yaml")
        )
    }

    fn load(&self) -> StoreResult<HashMap<String, StoredCommand>> {
        let contents = fs::read_to_string(&self.path).map_err(|e| StoreError::Read {
            path: self.path.clone(),
            error: e.to_string(),
        })?;

        let malformed = |error: String| StoreError::Malformed {
            path: self.path.clone(),
            error,
        };

        if self.is_yaml() {
            serde_yaml::from_str(&contents).map_err(|e| malformed(e.to_string()))
        } else {
            serde_json::from_str(&contents).map_err(|e| malformed(e.to_string()))
        }
    }
}

impl TaskStore for FileStore {
    fn lookup(&self, name: &str) -> StoreResult<StoredCommand> {
        self.load()?
            .remove(name)
            .ok_or_else(|| StoreError::Missing(name.to_string()))
    }
}

/// Pick the store file for a source file
///
/// Order: explicit path, `Conststore.json` next to the source, then the
/// user configuration directory.
pub fn locate_store(explicit: Option<&Path>, source_dir: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let local = source_dir.join(STORE_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    ProjectDirs::from("", "", "construct")
        .map(|dirs| dirs.config_dir().join(STORE_FILE_NAME))
        .filter(|path| path.is_file())
}
