use alloc::vec;
use alloc::vec::Vec;

use super::{DirEntry, LongName};
use crate::error::{DataError, Error};
use crate::fat::Chain;
use crate::fs::DirectoryLocation;
use crate::io::BlockDevice;
use crate::region::data::{
    Attributes, LongNameEntry, ShortEntry, DELETED, END_OF_DIRECTORY, ENTRY_SIZE,
};
use crate::types::SectorID;
use crate::volume::FatDriver;

enum Cursor {
    Region { next: SectorID, end: SectorID },
    Chain { chain: Chain, sector_index: u32 },
}

/// Lazy walk over the entries of one directory.
///
/// Yields every live short entry with its long name attached and ends at the
/// end of directory marker, the end of the region or cluster chain, or after
/// the first error.
pub(crate) struct EntryIter<'a, D> {
    volume: &'a FatDriver<D>,
    cursor: Cursor,
    sector: Vec<u8>,
    index: usize,
    long_name: LongName,
    done: bool,
}

impl<'a, D: BlockDevice> EntryIter<'a, D> {
    pub(crate) fn new(volume: &'a FatDriver<D>, directory: DirectoryLocation) -> Self {
        let geometry = volume.geometry();
        let cursor = match directory {
            DirectoryLocation::Region { first, sectors } => {
                Cursor::Region { next: first, end: first + sectors }
            }
            DirectoryLocation::Chain(cluster) => {
                Cursor::Chain { chain: volume.fat().chain(cluster), sector_index: 0 }
            }
        };
        let sector_size = geometry.bytes_per_sector as usize;
        Self {
            volume,
            cursor,
            sector: vec![0u8; sector_size],
            index: sector_size / ENTRY_SIZE,
            long_name: LongName::default(),
            done: false,
        }
    }

    /// Load the next directory sector, false past the last one
    fn load(&mut self) -> Result<bool, Error> {
        let volume = self.volume;
        let geometry = volume.geometry();
        let sector = match &mut self.cursor {
            Cursor::Region { next, end } => {
                if *next >= *end {
                    return Ok(false);
                }
                let sector = *next;
                *next += 1u64;
                sector
            }
            Cursor::Chain { chain, sector_index } => {
                if *sector_index == geometry.sectors_per_cluster {
                    if !volume.advance(chain)? {
                        return Ok(false);
                    }
                    *sector_index = 0;
                }
                let cluster = chain.current();
                if !geometry.contains(cluster) {
                    warn!("Directory cluster {} outside the data region", cluster);
                    return Err(DataError::ClusterChain.into());
                }
                let sector = geometry.cluster_to_sector(cluster) + *sector_index;
                *sector_index += 1;
                sector
            }
        };
        volume.read_sector(sector, &mut self.sector)?;
        self.index = 0;
        Ok(true)
    }
}

impl<'a, D: BlockDevice> Iterator for EntryIter<'a, D> {
    type Item = Result<DirEntry, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            if self.index * ENTRY_SIZE >= self.sector.len() {
                match self.load() {
                    Ok(true) => (),
                    Ok(false) => {
                        self.done = true;
                        return None;
                    }
                    Err(error) => {
                        self.done = true;
                        return Some(Err(error));
                    }
                }
            }
            let start = self.index * ENTRY_SIZE;
            self.index += 1;
            let raw = &self.sector[start..start + ENTRY_SIZE];
            match raw[0] {
                END_OF_DIRECTORY => {
                    self.done = true;
                    return None;
                }
                DELETED => {
                    self.long_name.clear();
                    continue;
                }
                _ => (),
            }
            if Attributes::from(raw[11]).is_long_name() {
                self.long_name.push(&LongNameEntry::decode(raw));
                continue;
            }
            let short = ShortEntry::decode(raw);
            let long_name = self.long_name.take();
            return Some(Ok(DirEntry { short, long_name }));
        }
    }
}
