//! WF-012: In-memory loader for programmatically supplied documents.

use super::Loader;
use crate::core::paths;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Serves documents from a map keyed by normalized absolute path.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: HashMap<PathBuf, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a document.
    pub fn insert(&mut self, path: impl AsRef<Path>, text: impl Into<String>) {
        self.files
            .insert(paths::normalize(path.as_ref()), text.into());
    }

    /// Builder form of [`MemoryLoader::insert`].
    pub fn with_file(mut self, path: impl AsRef<Path>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }
}

#[async_trait]
impl Loader for MemoryLoader {
    async fn load(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(&paths::normalize(path))
            .cloned()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no such document: {}", path.display()),
                )
            })
    }
}
