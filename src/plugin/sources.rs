//! Source loaders: where component text comes from.
//!
//! [`FsSources`] reads from disk through tokio. [`MemorySources`] serves
//! text held in memory, such as unsaved editor buffers.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;

pub trait SourceLoader: Send + Sync {
    fn read(&self, path: &Path) -> impl Future<Output = io::Result<String>> + Send;
}

/// Reads component documents from the file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSources;

impl SourceLoader for FsSources {
    fn read(&self, path: &Path) -> impl Future<Output = io::Result<String>> + Send {
        let path = path.to_path_buf();
        async move { tokio::fs::read_to_string(path).await }
    }
}

/// Thread-safe in-memory document store. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySources {
    files: Arc<DashMap<PathBuf, String>>,
}

impl MemorySources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the text of a file.
    pub fn insert(&self, path: impl Into<PathBuf>, source: impl Into<String>) {
        self.files.insert(path.into(), source.into());
    }

    pub fn remove(&self, path: &Path) -> Option<String> {
        self.files.remove(path).map(|(_, source)| source)
    }

    pub fn get(&self, path: &Path) -> Option<String> {
        self.files.get(path).map(|r| r.value().clone())
    }
}

impl SourceLoader for MemorySources {
    fn read(&self, path: &Path) -> impl Future<Output = io::Result<String>> + Send {
        let result = self.get(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )
        });
        async move { result }
    }
}
