//! Anonymous in-memory FIFOs exposed as files.
//!
//! Every open creates a fresh pipe, buffers of released pipes are recycled.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use heapless::Deque;
use spin::Mutex;

use crate::driver::{FilesystemDriver, StorageDevice};
use crate::error::{Error, OperationError};
use crate::file::{FileMetadata, Locator};
use crate::region::data::Attributes;
use crate::vfs::HandleTable;

/// Bytes a pipe holds before writes come up short
pub const PIPE_CAPACITY: usize = 4096;

type PipeBuffer = Box<Deque<u8, PIPE_CAPACITY>>;

#[derive(Default)]
struct Pipes {
    active: HandleTable<PipeBuffer>,
    free: Vec<PipeBuffer>,
}

#[derive(Default)]
pub struct PipeDriver {
    pipes: Mutex<Pipes>,
}

impl PipeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_pipes(&self) -> usize {
        self.pipes.lock().active.len()
    }

    pub fn free_buffers(&self) -> usize {
        self.pipes.lock().free.len()
    }

    fn slot(file: &FileMetadata) -> Result<usize, Error> {
        match file.locator() {
            Locator::Slot(slot) => Ok(slot),
            Locator::Cluster { .. } => Err(OperationError::InvalidHandle.into()),
        }
    }
}

impl FilesystemDriver for PipeDriver {
    fn name(&self) -> &str {
        "pipe"
    }

    fn open(self: Arc<Self>, path: &str) -> Result<FileMetadata, Error> {
        let slot = {
            let mut pipes = self.pipes.lock();
            let buffer = match pipes.free.pop() {
                Some(mut buffer) => {
                    buffer.clear();
                    buffer
                }
                None => Box::new(Deque::new()),
            };
            pipes.active.insert(buffer)
        };
        debug!("Pipe {} opened as slot {}", path, slot);
        let name = String::from(path.trim_start_matches('/'));
        let device: Arc<dyn StorageDevice> = self.clone();
        let size = PIPE_CAPACITY as u64;
        Ok(FileMetadata::new(name, self, device, size, Locator::Slot(slot), Attributes::default()))
    }
}

impl StorageDevice for PipeDriver {
    /// Consume up to `buf.len()` bytes, the offset is meaningless for a FIFO
    fn read(&self, file: &FileMetadata, _offset: u64, buf: &mut [u8]) -> Result<usize, Error> {
        let mut pipes = self.pipes.lock();
        let pipe = pipes.active.get_mut(Self::slot(file)?).ok_or(OperationError::InvalidHandle)?;
        let mut count = 0;
        for byte in buf.iter_mut() {
            match pipe.pop_front() {
                Some(value) => *byte = value,
                None => break,
            }
            count += 1;
        }
        Ok(count)
    }

    /// Append as much of `data` as fits
    fn write(&self, file: &FileMetadata, _offset: u64, data: &[u8]) -> Result<usize, Error> {
        let mut pipes = self.pipes.lock();
        let pipe = pipes.active.get_mut(Self::slot(file)?).ok_or(OperationError::InvalidHandle)?;
        let mut count = 0;
        for &byte in data {
            if pipe.push_back(byte).is_err() {
                break;
            }
            count += 1;
        }
        Ok(count)
    }

    fn release(&self, file: &FileMetadata) {
        let Ok(slot) = Self::slot(file) else { return };
        let mut pipes = self.pipes.lock();
        if let Some(buffer) = pipes.active.remove(slot) {
            trace!("Pipe slot {} returned to the free list", slot);
            pipes.free.push(buffer);
        }
    }
}
