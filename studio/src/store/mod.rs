//! Persistent store backed by a single JSON document
//!
//! The document is loaded once when the store is opened and kept in memory
//! behind a mutex. Every mutation is one serialized unit: clone the
//! document, mutate the clone, write the whole document to a temp file,
//! rename it over the store file, then publish the clone. A failed closure
//! or write leaves both the file and the in-memory copy untouched.
//!
//! Writes are synchronous. Inside a multi-threaded tokio runtime they run
//! under `block_in_place` so the worker hands its other tasks off first.

mod document;

pub use document::{ActionOrigin, ActionSets, Document};

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid store document: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    Poisoned,

    #[error("Could not determine home directory")]
    NoHomeDir,
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Handle to the JSON document store
///
/// Constructed explicitly by the process entry point and shared through an
/// `Arc`; there is no global instance.
pub struct Store {
    path: PathBuf,
    doc: Mutex<Document>,
}

impl Store {
    /// Open the store at the default location (~/.mcp-studio/store.json)
    pub fn open_default() -> Result<Self, StoreError> {
        Self::open(Self::default_path()?)
    }

    /// Open or create the store at a specific path
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
            }
        }

        let doc = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => Document::default(),
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Document::default(),
            Err(e) => return Err(StoreError::io(&path, e)),
        };

        tracing::info!(
            "Store opened at {} (revision {})",
            path.display(),
            doc.revision
        );

        Ok(Self {
            path,
            doc: Mutex::new(doc),
        })
    }

    /// Get the default store path
    pub fn default_path() -> Result<PathBuf, StoreError> {
        let home = dirs::home_dir().ok_or(StoreError::NoHomeDir)?;
        Ok(home.join(".mcp-studio").join("store.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a read-only closure against the current document
    pub fn read<T>(&self, f: impl FnOnce(&Document) -> T) -> Result<T, StoreError> {
        let doc = self.doc.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&doc))
    }

    /// Run a read-modify-write closure as one serialized unit
    ///
    /// Nothing is written when the closure fails or leaves the document
    /// unchanged.
    pub fn update<T, E>(&self, f: impl FnOnce(&mut Document) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut doc = self.doc.lock().map_err(|_| StoreError::Poisoned)?;

        let mut working = doc.clone();
        let value = f(&mut working)?;

        if working != *doc {
            working.revision = doc.revision + 1;
            off_runtime(|| self.persist(&working))?;
            *doc = working;
        }

        Ok(value)
    }

    /// Current document revision
    pub fn revision(&self) -> Result<u64, StoreError> {
        self.read(|doc| doc.revision)
    }

    fn persist(&self, doc: &Document) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(doc)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, text).map_err(|e| StoreError::io(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| StoreError::io(&self.path, e))?;
        tracing::debug!("Store written (revision {})", doc.revision);
        Ok(())
    }
}

/// Run blocking file IO without stalling a tokio worker
///
/// `block_in_place` panics on a current-thread runtime, so there the
/// closure runs inline.
fn off_runtime<T>(f: impl FnOnce() -> T) -> T {
    use tokio::runtime::{Handle, RuntimeFlavor};

    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Action, ServerRecord};
    use tempfile::{tempdir, TempDir};

    fn test_store() -> (Store, TempDir) {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("store.json")).unwrap();
        (store, dir)
    }

    fn server(id: &str) -> ServerRecord {
        ServerRecord {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            command: "node".to_string(),
            args: vec!["server.js".to_string()],
            env: Default::default(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_open_missing_file_starts_empty() {
        let (store, _dir) = test_store();
        assert_eq!(store.revision().unwrap(), 0);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_update_persists_and_reloads() {
        let (store, dir) = test_store();

        store
            .update(|doc| {
                doc.servers.insert("srv".into(), server("srv"));
                doc.action_sets_mut("srv")
                    .upsert(ActionOrigin::Custom, Action::new("search", "Search"));
                Ok::<_, StoreError>(())
            })
            .unwrap();
        assert_eq!(store.revision().unwrap(), 1);

        let reopened = Store::open(dir.path().join("store.json")).unwrap();
        assert_eq!(reopened.revision().unwrap(), 1);
        let actions = reopened.read(|doc| doc.actions("srv")).unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].name, "search");
    }

    #[test]
    fn test_failed_update_writes_nothing() {
        let (store, _dir) = test_store();

        let result: Result<(), crate::error::StudioError> = store.update(|doc| {
            doc.servers.insert("srv".into(), server("srv"));
            Err(crate::error::StudioError::validation("rejected"))
        });

        assert!(result.is_err());
        assert_eq!(store.revision().unwrap(), 0);
        assert!(store.read(|doc| doc.servers.is_empty()).unwrap());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_unchanged_update_skips_write() {
        let (store, _dir) = test_store();
        store
            .update(|doc| {
                doc.servers.insert("srv".into(), server("srv"));
                Ok::<_, StoreError>(())
            })
            .unwrap();

        store.update(|_doc| Ok::<_, StoreError>(())).unwrap();
        assert_eq!(store.revision().unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_updates_from_worker_threads() {
        let (store, dir) = test_store();
        let store = std::sync::Arc::new(store);

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store.update(|doc| {
                        doc.servers.insert(format!("srv-{}", i), server("srv"));
                        Ok::<_, StoreError>(())
                    })
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(store.revision().unwrap(), 8);
        let reopened = Store::open(dir.path().join("store.json")).unwrap();
        assert_eq!(reopened.read(|doc| doc.servers.len()).unwrap(), 8);
    }

    #[tokio::test]
    async fn test_update_on_current_thread_runtime() {
        let (store, _dir) = test_store();
        store
            .update(|doc| {
                doc.servers.insert("srv".into(), server("srv"));
                Ok::<_, StoreError>(())
            })
            .unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(Store::open(&path), Err(StoreError::Serde(_))));
    }
}
