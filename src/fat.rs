use crate::error::{DataError, Error};
use crate::fs::Geometry;
use crate::io::RawIO;
use crate::region::boot::FATType;
use crate::region::fat::Entry;
use crate::types::ClusterID;

/// First copy of the cluster table
#[derive(Copy, Clone, Debug)]
pub(crate) struct FAT {
    fat_type: FATType,
    /// Device byte offset of the table
    offset: u64,
    /// Table length in bytes
    length: u64,
    total_clusters: u32,
}

impl FAT {
    pub fn new(geometry: &Geometry) -> Self {
        let bytes_per_sector = geometry.bytes_per_sector as u64;
        Self {
            fat_type: geometry.fat_type,
            offset: geometry.sector_offset(geometry.first_fat_sector()),
            length: geometry.fat_sectors as u64 * bytes_per_sector,
            total_clusters: geometry.total_clusters,
        }
    }

    /// Byte offset within the table, None if the entry lies outside it
    fn position(&self, cluster: ClusterID) -> Option<u64> {
        let position = self.fat_type.entry_offset(cluster);
        let width = self.fat_type.entry_width() as u64;
        match position + width <= self.length {
            true => Some(position),
            false => None,
        }
    }

    pub fn entry(&self, io: &mut dyn RawIO, cluster: ClusterID) -> Result<Entry, Error> {
        let position = self.position(cluster).ok_or(DataError::ClusterChain)?;
        let mut bytes = [0u8; 4];
        // A FAT12 entry may straddle two sectors, read_raw spans both
        io.read_raw(self.offset + position, &mut bytes[..self.fat_type.entry_width()])?;
        Ok(self.fat_type.decode_entry(cluster, u32::from_le_bytes(bytes)))
    }

    pub fn chain(&self, first: ClusterID) -> Chain {
        Chain { fat: *self, current: first, hops: 0 }
    }
}

/// Walk of one cluster chain.
///
/// Terminates on end of chain, and also on a cluster linking to itself or
/// on more hops than the volume has clusters, both of which mean a cycle.
#[derive(Clone, Debug)]
pub(crate) struct Chain {
    fat: FAT,
    current: ClusterID,
    hops: u32,
}

impl Chain {
    pub fn current(&self) -> ClusterID {
        self.current
    }

    /// Step to the successor cluster, false once the chain has ended
    pub fn advance(&mut self, io: &mut dyn RawIO) -> Result<bool, Error> {
        if self.hops >= self.fat.total_clusters {
            warn!("Cluster chain longer than {} clusters, truncated", self.fat.total_clusters);
            return Ok(false);
        }
        self.hops += 1;
        match self.fat.entry(io, self.current)? {
            Entry::Last => Ok(false),
            Entry::Next(next) if next == self.current => {
                warn!("Cluster {} links to itself, chain truncated", next);
                Ok(false)
            }
            Entry::Next(next) if next.valid() && next.offset() < self.fat.total_clusters => {
                trace!("Cluster {} -> {}", self.current, next);
                self.current = next;
                Ok(true)
            }
            entry => {
                warn!("Cluster {} has unexpected successor {:?}", self.current, entry);
                Err(DataError::ClusterChain.into())
            }
        }
    }
}
