//! Storage and File System Abstractions
//!
//! Platform-agnostic file I/O used for transient downloads and decoded audio.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// File metadata information
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub size: u64,
    pub modified_at: Option<i64>,
    pub is_directory: bool,
}

/// File system access trait
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn stash(fs: &dyn FileSystemAccess, data: &[u8]) -> Result<()> {
///     let dir = fs.get_temp_directory().await?;
///     fs.write_file(&dir.join("download.ogg"), data.to_vec().into()).await
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Directory holding decoded audio for the lifetime of the process.
    async fn get_cache_directory(&self) -> Result<PathBuf>;

    /// Scratch directory for transient files that may be reclaimed at any time.
    async fn get_temp_directory(&self) -> Result<PathBuf>;

    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Get metadata for a file or directory
    async fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// List all entries in a directory
    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Write data to a file, creating it (and its parent) if needed
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// Delete a file
    ///
    /// A missing file is reported as an `Io` error with kind `NotFound`;
    /// callers decide whether that matters.
    async fn delete_file(&self, path: &Path) -> Result<()>;
}
