use crate::error::DataError;
use crate::region::boot::{BootRecord, FATType};
use crate::types::{ClusterID, SectorID};

/// Quantities derived from the boot record, computed once per volume.
///
/// Sector numbers are in units of the volume's own sector size.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Geometry {
    pub fat_type: FATType,
    pub bytes_per_sector: u32,
    pub sectors_per_cluster: u32,
    pub reserved_sectors: u32,
    pub number_of_fats: u32,
    pub total_sectors: u32,
    pub fat_sectors: u32,
    pub root_dir_sectors: u32,
    pub first_data_sector: u32,
    pub total_clusters: u32,
    /// FAT32 only
    pub root_cluster: ClusterID,
}

/// Where a directory's entries live
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DirectoryLocation {
    /// FAT12/FAT16 root directory, a fixed run of sectors
    Region { first: SectorID, sectors: u32 },
    Chain(ClusterID),
}

impl Geometry {
    /// `DataError::NotFAT` when reserved sectors, FATs and root directory
    /// do not fit inside the volume.
    pub fn new(boot: &BootRecord) -> Result<Self, DataError> {
        let bpb = &boot.bpb;
        let bytes_per_sector = bpb.bytes_per_sector as u32;
        let sectors_per_cluster = bpb.sectors_per_cluster as u32;
        let root_entries = bpb.root_entries as u32;
        let root_dir_sectors = (root_entries * 32 + bytes_per_sector - 1) / bytes_per_sector;
        let fat_sectors = boot.fat_sectors();
        let total_sectors = boot.total_sectors();
        let metadata_sectors = bpb.reserved_sectors as u64
            + bpb.number_of_fats as u64 * fat_sectors as u64
            + root_dir_sectors as u64;
        if metadata_sectors > total_sectors as u64 {
            debug!("{} metadata sectors exceed {} total sectors", metadata_sectors, total_sectors);
            return Err(DataError::NotFAT);
        }
        let first_data_sector = metadata_sectors as u32;
        let data_sectors = total_sectors - first_data_sector;
        let total_clusters = data_sectors / sectors_per_cluster.max(1);
        let fat_type = FATType::from_total_clusters(total_clusters);
        let root_cluster = match fat_type {
            FATType::FAT32 | FATType::ExFAT => boot.extended32().root_cluster.into(),
            _ => ClusterID::default(),
        };
        Ok(Self {
            fat_type,
            bytes_per_sector,
            sectors_per_cluster,
            reserved_sectors: bpb.reserved_sectors as u32,
            number_of_fats: bpb.number_of_fats as u32,
            total_sectors,
            fat_sectors,
            root_dir_sectors,
            first_data_sector,
            total_clusters,
            root_cluster,
        })
    }

    pub fn cluster_size(&self) -> u32 {
        self.bytes_per_sector * self.sectors_per_cluster
    }

    pub fn total_size(&self) -> u64 {
        self.total_sectors as u64 * self.bytes_per_sector as u64
    }

    pub fn first_fat_sector(&self) -> SectorID {
        SectorID::from(self.reserved_sectors as u64)
    }

    /// Caller guarantees `cluster.valid()`
    pub fn cluster_to_sector(&self, cluster: ClusterID) -> SectorID {
        let index = cluster.offset() as u64 * self.sectors_per_cluster as u64;
        SectorID::from(self.first_data_sector as u64 + index)
    }

    /// Device byte offset of a volume sector
    pub fn sector_offset(&self, sector: SectorID) -> u64 {
        u64::from(sector) * self.bytes_per_sector as u64
    }

    pub fn cluster_offset(&self, cluster: ClusterID) -> u64 {
        self.sector_offset(self.cluster_to_sector(cluster))
    }

    /// Whether `cluster` addresses the data region
    pub fn contains(&self, cluster: ClusterID) -> bool {
        cluster.valid() && cluster.offset() < self.total_clusters
    }

    pub fn root(&self) -> DirectoryLocation {
        match self.fat_type {
            FATType::FAT12 | FATType::FAT16 => DirectoryLocation::Region {
                first: SectorID::from((self.first_data_sector - self.root_dir_sectors) as u64),
                sectors: self.root_dir_sectors,
            },
            FATType::FAT32 | FATType::ExFAT => DirectoryLocation::Chain(self.root_cluster),
        }
    }

    /// Directory starting at `cluster`, where cluster 0 (".." of a top
    /// level directory) names the root.
    pub fn directory(&self, cluster: ClusterID) -> DirectoryLocation {
        match cluster.valid() {
            true => DirectoryLocation::Chain(cluster),
            false => self.root(),
        }
    }
}
