use alloc::string::String;
use alloc::sync::Arc;
use core::fmt;

use crate::driver::{FilesystemDriver, StorageDevice};
use crate::error::Error;
use crate::region::data::Attributes;
use crate::types::ClusterID;

/// Where a driver finds an open file's data
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Locator {
    /// Start of a cluster chain and the device byte offset of its first cluster
    Cluster { first: ClusterID, byte_offset: u64 },
    /// Driver private slot, such as a pipe buffer
    Slot(usize),
}

/// Result of a successful open, immutable and shared by every handle
/// referring to the same open.
///
/// Dropping the last reference hands the file back to its device through
/// [`StorageDevice::release`].
pub struct FileMetadata {
    name: String,
    filesystem: Arc<dyn FilesystemDriver>,
    device: Arc<dyn StorageDevice>,
    size: u64,
    locator: Locator,
    attributes: Attributes,
}

impl FileMetadata {
    pub fn new(
        name: String,
        filesystem: Arc<dyn FilesystemDriver>,
        device: Arc<dyn StorageDevice>,
        size: u64,
        locator: Locator,
        attributes: Attributes,
    ) -> Self {
        Self { name, filesystem, device, size, locator, attributes }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn filesystem(&self) -> &Arc<dyn FilesystemDriver> {
        &self.filesystem
    }

    pub fn device(&self) -> &Arc<dyn StorageDevice> {
        &self.device
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn locator(&self) -> Locator {
        self.locator
    }

    pub fn attributes(&self) -> Attributes {
        self.attributes
    }

    pub fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize, Error> {
        self.device.read(self, offset, buf)
    }

    pub fn write(&self, offset: u64, data: &[u8]) -> Result<usize, Error> {
        self.device.write(self, offset, data)
    }
}

impl fmt::Debug for FileMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileMetadata")
            .field("name", &self.name)
            .field("filesystem", &self.filesystem.name())
            .field("size", &self.size)
            .field("locator", &self.locator)
            .field("attributes", &self.attributes)
            .finish()
    }
}

impl Drop for FileMetadata {
    fn drop(&mut self) {
        trace!("Release {}", self.name);
        let device = self.device.clone();
        device.release(self);
    }
}
