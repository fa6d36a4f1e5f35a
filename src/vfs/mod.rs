//! Mount table and two level descriptor tables.
//!
//! A process handle ([`ProcFd`]) resolves through the process' own
//! [`ProcessFiles`] to a system handle ([`SysFd`]), which resolves through
//! the system table to the shared [`FileMetadata`]. Several process handles
//! may alias one system handle, the system entry goes away with its last
//! alias.

mod handle;

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use spin::{Mutex, RwLock};

use crate::driver::FilesystemDriver;
use crate::error::{Error, InputError, OperationError};
use crate::file::FileMetadata;
pub use handle::{FileDescriptors, HandleTable, ProcFd, ProcessFiles, SysFd};

struct Mount {
    path: String,
    driver: Arc<dyn FilesystemDriver>,
}

struct OpenFile {
    file: Arc<FileMetadata>,
    aliases: usize,
}

#[derive(Default)]
pub struct Vfs {
    mounts: RwLock<Vec<Mount>>,
    files: Mutex<HandleTable<OpenFile>>,
}

impl Vfs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a mount, earlier mounts take precedence on overlapping prefixes
    pub fn mount(&self, path: &str, driver: Arc<dyn FilesystemDriver>) {
        info!("Mount {} at {}", driver.name(), path);
        self.mounts.write().push(Mount { path: path.into(), driver });
    }

    /// Remove the first mount registered at exactly `path`
    pub fn unmount(&self, path: &str) -> Result<(), Error> {
        let mut mounts = self.mounts.write();
        let index = mounts.iter().position(|m| m.path == path).ok_or(OperationError::NotFound)?;
        let mount = mounts.remove(index);
        info!("Unmount {} from {}", mount.driver.name(), path);
        Ok(())
    }

    /// Mount path and driver name, in precedence order
    pub fn mounts(&self) -> Vec<(String, String)> {
        let mounts = self.mounts.read();
        mounts.iter().map(|m| (m.path.clone(), m.driver.name().into())).collect()
    }

    /// Number of entries in the system table
    pub fn open_files(&self) -> usize {
        self.files.lock().len()
    }

    /// Open `path` on the first mount whose prefix matches and whose driver
    /// resolves the remainder.
    pub fn open(&self, process: &mut ProcessFiles, path: &str) -> Result<FileDescriptors, Error> {
        if path.len() <= 1 || !path.starts_with('/') {
            return Err(InputError::InvalidPath.into());
        }
        let candidates: Vec<_> = {
            let mounts = self.mounts.read();
            mounts
                .iter()
                .filter(|mount| path.starts_with(mount.path.as_str()))
                .map(|mount| (mount.path.len(), mount.driver.clone()))
                .collect()
        };
        for (prefix, driver) in candidates {
            let suffix = &path[prefix..];
            match driver.clone().open(suffix) {
                Ok(file) => return Ok(self.add_file(process, file)),
                Err(error) => trace!("{} on {} failed: {}", suffix, driver.name(), error),
            }
        }
        debug!("No mount resolves {}", path);
        Err(OperationError::NotFound.into())
    }

    fn add_file(&self, process: &mut ProcessFiles, file: FileMetadata) -> FileDescriptors {
        let open_file = OpenFile { file: Arc::new(file), aliases: 1 };
        let system = SysFd::from(self.files.lock().insert(open_file));
        let process_fd = ProcFd::from(process.table.insert(system));
        debug!("pid {}: {} -> {}", process.pid(), process_fd, system);
        FileDescriptors { process: process_fd, system }
    }

    /// Another process handle aliasing the same system handle
    pub fn dup(&self, process: &mut ProcessFiles, fd: ProcFd) -> Result<ProcFd, Error> {
        let system = process.resolve(fd).ok_or(OperationError::InvalidHandle)?;
        let mut files = self.files.lock();
        let entry = files.get_mut(system.into()).ok_or(OperationError::InvalidHandle)?;
        entry.aliases += 1;
        drop(files);
        Ok(ProcFd::from(process.table.insert(system)))
    }

    pub fn close(&self, process: &mut ProcessFiles, fd: ProcFd) -> Result<(), Error> {
        let system = process.resolve(fd).ok_or(OperationError::InvalidHandle)?;
        let released = {
            let mut files = self.files.lock();
            let entry = files.get_mut(system.into()).ok_or(OperationError::InvalidHandle)?;
            process.table.remove(fd.into());
            entry.aliases -= 1;
            match entry.aliases {
                0 => files.remove(system.into()),
                _ => None,
            }
        };
        debug!("pid {}: close {} ({})", process.pid(), fd, system);
        // Device release runs outside the table lock
        drop(released);
        Ok(())
    }

    /// Shared metadata behind a process handle
    pub fn file(&self, process: &ProcessFiles, fd: ProcFd) -> Result<Arc<FileMetadata>, Error> {
        let system = process.resolve(fd).ok_or(OperationError::InvalidHandle)?;
        let files = self.files.lock();
        let entry = files.get(system.into()).ok_or(OperationError::InvalidHandle)?;
        Ok(entry.file.clone())
    }

    pub fn read(&self, process: &ProcessFiles, fd: ProcFd, buf: &mut [u8], offset: u64) -> Result<usize, Error> {
        self.file(process, fd)?.read(offset, buf)
    }

    pub fn write(&self, process: &ProcessFiles, fd: ProcFd, data: &[u8], offset: u64) -> Result<usize, Error> {
        self.file(process, fd)?.write(offset, data)
    }

    /// Log the mount table and every open file
    pub fn log_state(&self) {
        for (index, mount) in self.mounts.read().iter().enumerate() {
            debug!("mount {}: {} -> {}", index, mount.path, mount.driver.name());
        }
        for (index, entry) in self.files.lock().iter() {
            debug!("file {}: {:?} ({} aliases)", index, entry.file, entry.aliases);
        }
    }
}
