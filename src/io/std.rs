use std::fs;
use std::io::prelude::*;
use std::io::SeekFrom;
use std::path::Path;

use crate::types::SectorID;

/// Disk image or raw block device file
#[derive(Debug)]
pub struct FileDevice {
    file: fs::File,
    sector_size: usize,
}

impl FileDevice {
    pub fn open<P: AsRef<Path>>(filepath: P) -> std::io::Result<Self> {
        let file = fs::File::options().read(true).write(true).open(filepath)?;
        Ok(Self { file, sector_size: super::SECTOR_SIZE })
    }

    pub fn open_readonly<P: AsRef<Path>>(filepath: P) -> std::io::Result<Self> {
        let file = fs::File::open(filepath)?;
        Ok(Self { file, sector_size: super::SECTOR_SIZE })
    }
}

impl super::BlockDevice for FileDevice {
    type Error = std::io::Error;

    fn sector_size(&self) -> usize {
        self.sector_size
    }

    fn read(&mut self, sector: SectorID, buf: &mut [u8]) -> Result<(), Self::Error> {
        let seek = SeekFrom::Start(u64::from(sector) * self.sector_size as u64);
        self.file.seek(seek)?;
        self.file.read_exact(buf)
    }

    fn write(&mut self, sector: SectorID, data: &[u8]) -> Result<(), Self::Error> {
        let seek = SeekFrom::Start(u64::from(sector) * self.sector_size as u64);
        self.file.seek(seek)?;
        self.file.write_all(data)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.file.flush()
    }
}
