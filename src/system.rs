use alloc::sync::Arc;

use crate::error::{Error, ImplementationError};
use crate::io::BlockDevice;
use crate::pipe::PipeDriver;
use crate::region::boot::FATType;
use crate::vfs::Vfs;
use crate::volume::FatDriver;

pub const PIPE_MOUNT: &str = "/pipes";

/// Storage context of one kernel instance: the VFS plus the drivers it
/// always carries.
pub struct System {
    vfs: Vfs,
    pipes: Arc<PipeDriver>,
}

impl System {
    pub fn new() -> Self {
        let vfs = Vfs::new();
        let pipes = Arc::new(PipeDriver::new());
        vfs.mount(PIPE_MOUNT, pipes.clone());
        Self { vfs, pipes }
    }

    pub fn vfs(&self) -> &Vfs {
        &self.vfs
    }

    pub fn pipes(&self) -> &Arc<PipeDriver> {
        &self.pipes
    }

    /// Probe `device` for a FAT volume and mount it at `path`.
    ///
    /// ExFAT volumes are recognised but never mounted.
    pub fn mount_device<D>(&self, path: &str, device: D) -> Result<Arc<FatDriver<D>>, Error>
    where
        D: BlockDevice + Send + 'static,
    {
        let driver = FatDriver::try_create(device)?;
        if driver.fat_type() == FATType::ExFAT {
            warn!("ExFAT volume not mounted at {}", path);
            return Err(ImplementationError::ExFAT.into());
        }
        let driver = Arc::new(driver);
        self.vfs.mount(path, driver.clone());
        Ok(driver)
    }
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use alloc::string::String;
    use alloc::vec;

    use super::System;
    use crate::error::{DataError, Error, ImplementationError, OperationError};
    use crate::image::{self, Image, Layout};
    use crate::io::MemoryDevice;
    use crate::vfs::ProcessFiles;

    #[test]
    fn test_pipe_round_trip() {
        let system = System::new();
        let vfs = system.vfs();
        let mut process = ProcessFiles::new(7);
        let fds = vfs.open(&mut process, "/pipes/log").unwrap();
        assert_eq!(vfs.write(&process, fds.process, b"through the vfs", 0).unwrap(), 15);
        let mut buf = [0u8; 32];
        let count = vfs.read(&process, fds.process, &mut buf, 0).unwrap();
        assert_eq!(&buf[..count], b"through the vfs");
        assert_eq!(system.pipes().active_pipes(), 1);
        vfs.close(&mut process, fds.process).unwrap();
        assert_eq!(system.pipes().active_pipes(), 0);
        assert_eq!(system.pipes().free_buffers(), 1);
    }

    #[test]
    fn test_mount_device() {
        let mut image = Image::new(Layout::fat12());
        image.write_root(&[image::directory(b"A          ", 3)]);
        image.chain(&[3]);
        image.write_directory(3, &[image::file(b"B       TXT", 5, 11)]);
        image.chain(&[5]);
        image.write_cluster(5, b"hello world");

        let system = System::new();
        let driver = system.mount_device("/", image.device()).unwrap();
        assert_eq!(driver.volume_label(), "TESTVOLUME");
        let mounts = system.vfs().mounts();
        assert_eq!(mounts[0], (String::from("/pipes"), String::from("pipe")));
        assert_eq!(mounts[1], (String::from("/"), String::from("fat")));

        let vfs = system.vfs();
        let mut process = ProcessFiles::new(1);
        let fds = vfs.open(&mut process, "/a/b.txt").unwrap();
        let mut buf = vec![0u8; 64];
        let count = vfs.read(&process, fds.process, &mut buf, 0).unwrap();
        assert_eq!(&buf[..count], b"hello world");
        let error = vfs.open(&mut process, "/a/c.txt").unwrap_err();
        assert_eq!(error, Error::Operation(OperationError::NotFound));
    }

    #[test]
    fn test_mount_blank_device() {
        let system = System::new();
        let device = MemoryDevice::new(vec![0u8; 64 * 512]);
        let error = system.mount_device("/", device).err().unwrap();
        assert_eq!(error, Error::Data(DataError::NotFAT));
        assert_eq!(system.vfs().mounts().len(), 1);
    }

    #[test]
    fn test_exfat_not_mounted() {
        let mut layout = Layout::fat16();
        layout.clusters = 0;
        let system = System::new();
        let error = system.mount_device("/", Image::new(layout).device()).err().unwrap();
        assert_eq!(error, Error::Implementation(ImplementationError::ExFAT));
        assert_eq!(system.vfs().mounts().len(), 1);
    }
}
