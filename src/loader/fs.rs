//! WF-011: Filesystem loader.

use super::Loader;
use async_trait::async_trait;
use std::path::Path;

/// Reads documents from disk with non-blocking tokio file I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLoader;

#[async_trait]
impl Loader for FsLoader {
    async fn load(&self, path: &Path) -> std::io::Result<String> {
        let bytes = tokio::fs::read(path).await?;
        // Templates are text; stray invalid bytes are replaced rather than
        // failing the whole include.
        Ok(String::from_utf8(bytes)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wf011_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("part.html");
        std::fs::write(&path, "<b>hi</b>").unwrap();
        assert_eq!(FsLoader.load(&path).await.unwrap(), "<b>hi</b>");
    }

    #[tokio::test]
    async fn test_wf011_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FsLoader.load(&dir.path().join("nope.html")).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_wf011_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FsLoader.load(dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_wf011_invalid_utf8_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bin.html");
        std::fs::write(&path, [b'a', 0xFF, b'b']).unwrap();
        assert_eq!(FsLoader.load(&path).await.unwrap(), "a\u{FFFD}b");
    }
}
