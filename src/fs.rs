//! File system abstraction for testability.

use async_trait::async_trait;
use std::path::Path;

/// Abstraction over the file system operations the transfer chain relies on.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Checks if a file exists at the given path.
    async fn file_exists(&self, path: &Path) -> bool;

    /// Creates all directories in the given path.
    async fn create_dir_all(&self, path: &Path) -> std::io::Result<()>;

    /// Copies a file, overwriting the destination if it exists.
    async fn copy_file(&self, from: &Path, to: &Path) -> std::io::Result<()>;

    /// Moves a file, falling back to copy-then-remove across file systems.
    async fn move_file(&self, from: &Path, to: &Path) -> std::io::Result<()>;

    /// Removes a file.
    async fn remove_file(&self, path: &Path) -> std::io::Result<()>;
}

/// Default file system implementation using `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileSystem;

impl TokioFileSystem {
    /// Creates a new `TokioFileSystem` instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSystem for TokioFileSystem {
    async fn file_exists(&self, path: &Path) -> bool {
        tokio::fs::metadata(path).await.is_ok()
    }

    async fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::create_dir_all(path).await
    }

    async fn copy_file(&self, from: &Path, to: &Path) -> std::io::Result<()> {
        tokio::fs::copy(from, to).await.map(|_| ())
    }

    async fn move_file(&self, from: &Path, to: &Path) -> std::io::Result<()> {
        match tokio::fs::rename(from, to).await {
            Ok(()) => Ok(()),
            // Network shares usually live on another device, where rename is refused.
            Err(e) if e.kind() == std::io::ErrorKind::CrossesDevices => {
                log::debug!("rename across devices, copying {}", from.display());
                tokio::fs::copy(from, to).await?;
                tokio::fs::remove_file(from).await
            }
            Err(e) => Err(e),
        }
    }

    async fn remove_file(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::remove_file(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn tokio_fs_file_exists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.txt");
        std::fs::File::create(&path).unwrap();

        let fs = TokioFileSystem::new();
        assert!(fs.file_exists(&path).await);
        assert!(!fs.file_exists(&dir.path().join("nonexistent.txt")).await);
    }

    #[tokio::test]
    async fn tokio_fs_copy_keeps_source() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("a.txt");
        let to = dir.path().join("b.txt");
        std::fs::write(&from, b"payload").unwrap();

        let fs = TokioFileSystem::new();
        fs.copy_file(&from, &to).await.unwrap();
        assert!(from.exists());
        assert_eq!(std::fs::read(&to).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn tokio_fs_move_removes_source() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("x/y");
        let from = dir.path().join("a.txt");
        std::fs::write(&from, b"payload").unwrap();

        let fs = TokioFileSystem::new();
        fs.create_dir_all(&nested).await.unwrap();
        fs.move_file(&from, &nested.join("a.txt")).await.unwrap();
        assert!(!from.exists());
        assert!(nested.join("a.txt").exists());
    }

    #[tokio::test]
    async fn tokio_fs_remove_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.txt");
        std::fs::File::create(&path).unwrap();

        let fs = TokioFileSystem::new();
        fs.remove_file(&path).await.unwrap();
        assert!(!fs.file_exists(&path).await);
    }
}
