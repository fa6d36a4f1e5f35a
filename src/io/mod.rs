#[cfg(feature = "std")]
pub mod std;

use alloc::vec;
use alloc::vec::Vec;
use core::fmt::Debug;
use core::ops::DerefMut;

use crate::error::{DeviceError, Error};
use crate::types::SectorID;

pub const SECTOR_SIZE: usize = 512;

/// Sector granular storage, one addressable port or image.
pub trait BlockDevice {
    type Error: Debug + Into<DeviceError>;

    /// Default to 512
    fn sector_size(&self) -> usize {
        SECTOR_SIZE
    }

    /// Caller guarantees buf.len() is a multiple of sector size
    fn read(&mut self, id: SectorID, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Caller guarantees data.len() is a multiple of sector size
    fn write(&mut self, id: SectorID, data: &[u8]) -> Result<(), Self::Error>;

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Byte granular read built on whole sector reads,
    /// `offset` need not be sector aligned.
    fn read_raw(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        let span = Span::new(offset, buf.len(), self.sector_size());
        if span.aligned() {
            self.read(span.first, buf)?;
            return Ok(buf.len());
        }
        let mut scratch = vec![0u8; span.bytes()];
        self.read(span.first, &mut scratch)?;
        buf.copy_from_slice(&scratch[span.head..span.head + buf.len()]);
        Ok(buf.len())
    }

    /// Byte granular write, partially covered sectors are read, patched and written back.
    fn write_raw(&mut self, offset: u64, data: &[u8]) -> Result<usize, Self::Error> {
        if data.is_empty() {
            return Ok(0);
        }
        let span = Span::new(offset, data.len(), self.sector_size());
        if span.aligned() {
            self.write(span.first, data)?;
            return Ok(data.len());
        }
        let mut scratch = vec![0u8; span.bytes()];
        self.read(span.first, &mut scratch)?;
        scratch[span.head..span.head + data.len()].copy_from_slice(data);
        self.write(span.first, &scratch)?;
        Ok(data.len())
    }
}

/// Byte granular device access with errors lifted into [`Error`]
pub(crate) trait RawIO {
    fn read_raw(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Error>;
    fn write_raw(&mut self, offset: u64, data: &[u8]) -> Result<usize, Error>;
    fn flush(&mut self) -> Result<(), Error>;
}

pub(crate) struct IOWrapper<G>(G);

impl<G> RawIO for IOWrapper<G>
where
    G: DerefMut,
    G::Target: BlockDevice,
{
    fn read_raw(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Error> {
        let length = buf.len();
        self.0.read_raw(offset, buf).map_err(|e| {
            warn!("Read {} bytes at {} failed: {:?}", length, offset, e);
            Error::Device(e.into())
        })
    }

    fn write_raw(&mut self, offset: u64, data: &[u8]) -> Result<usize, Error> {
        self.0.write_raw(offset, data).map_err(|e| {
            warn!("Write {} bytes at {} failed: {:?}", data.len(), offset, e);
            match e.into() {
                DeviceError::ReadFailure => Error::Device(DeviceError::WriteFailure),
                error => Error::Device(error),
            }
        })
    }

    fn flush(&mut self) -> Result<(), Error> {
        self.0.flush().map_err(|e| Error::Device(e.into()))
    }
}

/// Wrap a locked device guard
pub(crate) trait Wrap: Sized {
    fn wrap(self) -> IOWrapper<Self> {
        IOWrapper(self)
    }
}

impl<G> Wrap for G
where
    G: DerefMut,
    G::Target: BlockDevice,
{
}

/// Whole sectors covering a byte range
struct Span {
    first: SectorID,
    count: usize,
    head: usize,
    length: usize,
    sector_size: usize,
}

impl Span {
    fn new(offset: u64, length: usize, sector_size: usize) -> Self {
        let size = sector_size as u64;
        let first = offset / size;
        let last = (offset + length as u64 - 1) / size;
        let count = (last - first + 1) as usize;
        Self { first: first.into(), count, head: (offset % size) as usize, length, sector_size }
    }

    fn aligned(&self) -> bool {
        self.head == 0 && self.length % self.sector_size == 0
    }

    fn bytes(&self) -> usize {
        self.count * self.sector_size
    }
}

/// RAM backed block device, used as a ramdisk or for synthetic images.
#[derive(Clone, Debug)]
pub struct MemoryDevice {
    bytes: Vec<u8>,
    sector_size: usize,
}

impl MemoryDevice {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, sector_size: SECTOR_SIZE }
    }

    pub fn with_sector_size(bytes: Vec<u8>, sector_size: usize) -> Self {
        Self { bytes, sector_size }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.bytes
    }

    fn range(&self, id: SectorID, length: usize) -> Option<core::ops::Range<usize>> {
        let start = (u64::from(id) as usize).checked_mul(self.sector_size)?;
        let end = start.checked_add(length)?;
        if end > self.bytes.len() || length % self.sector_size != 0 {
            return None;
        }
        Some(start..end)
    }
}

impl BlockDevice for MemoryDevice {
    type Error = DeviceError;

    fn sector_size(&self) -> usize {
        self.sector_size
    }

    fn read(&mut self, id: SectorID, buf: &mut [u8]) -> Result<(), DeviceError> {
        let range = self.range(id, buf.len()).ok_or(DeviceError::ReadFailure)?;
        buf.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn write(&mut self, id: SectorID, data: &[u8]) -> Result<(), DeviceError> {
        let range = self.range(id, data.len()).ok_or(DeviceError::WriteFailure)?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }
}
