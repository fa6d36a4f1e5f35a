//! Seams between the VFS and the drivers mounted into it

use alloc::sync::Arc;

use crate::error::Error;
use crate::file::FileMetadata;

/// Byte level access to the data behind an open file
pub trait StorageDevice: Send + Sync {
    /// Returns the number of bytes read, 0 at or past the end
    fn read(&self, file: &FileMetadata, offset: u64, buf: &mut [u8]) -> Result<usize, Error>;

    fn write(&self, file: &FileMetadata, offset: u64, data: &[u8]) -> Result<usize, Error>;

    /// Called exactly once, when the last reference to `file` is dropped
    fn release(&self, _file: &FileMetadata) {}
}

/// Resolves paths below a mount point into open files
pub trait FilesystemDriver: Send + Sync {
    fn name(&self) -> &str;

    /// `path` is relative to the mount point
    fn open(self: Arc<Self>, path: &str) -> Result<FileMetadata, Error>;
}
