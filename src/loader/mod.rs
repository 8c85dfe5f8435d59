//! WF-011: Loader abstraction - the "read text at path" collaborator.
//!
//! The resolver suspends only while a loader call is pending, so a loader
//! may be backed by the filesystem, memory, or anything else that can hand
//! back text for a path.

pub mod fs;
pub mod memory;

pub use fs::FsLoader;
pub use memory::MemoryLoader;

use async_trait::async_trait;
use std::path::Path;

/// Reads the text of an include, layout, or root document.
#[async_trait]
pub trait Loader: Send + Sync {
    /// Read the full text at `path`. Errors are reported by the resolver as
    /// `io` events; they never abort a document.
    async fn load(&self, path: &Path) -> std::io::Result<String>;
}
