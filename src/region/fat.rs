use super::boot::FATType;
use crate::types::ClusterID;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Entry {
    Free,
    Next(ClusterID),
    /// Cluster 1 is never allocated
    Reserved,
    BadCluster,
    Last,
}

impl FATType {
    /// Bytes fetched from the table for one entry
    pub(crate) fn entry_width(self) -> usize {
        match self {
            Self::FAT12 | Self::FAT16 => 2,
            Self::FAT32 | Self::ExFAT => 4,
        }
    }

    /// Byte offset of the entry for `cluster` from the start of the table
    pub(crate) fn entry_offset(self, cluster: ClusterID) -> u64 {
        let n = u32::from(cluster) as u64;
        match self {
            Self::FAT12 => n + n / 2,
            Self::FAT16 => n * 2,
            Self::FAT32 | Self::ExFAT => n * 4,
        }
    }

    /// Decode the little endian bytes fetched at [`entry_offset`](Self::entry_offset).
    ///
    /// FAT12 packs two entries into three bytes, odd clusters take the high 12 bits.
    pub(crate) fn decode_entry(self, cluster: ClusterID, raw: u32) -> Entry {
        let (value, bad) = match self {
            Self::FAT12 => {
                let value = match u32::from(cluster) & 1 {
                    1 => (raw & 0xFFFF) >> 4,
                    _ => raw & 0xFFF,
                };
                (value, 0xFF7)
            }
            Self::FAT16 => (raw & 0xFFFF, 0xFFF7),
            Self::FAT32 => (raw & 0x0FFF_FFFF, 0x0FFF_FFF7),
            Self::ExFAT => (raw, 0xFFFF_FFF7),
        };
        match value {
            0 => Entry::Free,
            1 => Entry::Reserved,
            v if v < bad => Entry::Next(v.into()),
            v if v == bad => Entry::BadCluster,
            _ => Entry::Last,
        }
    }
}
