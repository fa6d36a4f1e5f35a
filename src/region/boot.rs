// Boot record, sector 0 of the volume

use derive_more::Display;
use heapless::String;

use crate::endian::le;

pub(crate) const BOOT_RECORD_SIZE: usize = 512;
pub(crate) const BOOT_SIGNATURE: [u8; 2] = hex!("55 AA");

const EXTENDED_OFFSET: usize = 36;
const EXTENDED_SIZE: usize = 54;

/// FAT generation, derived from the number of data clusters only
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq)]
pub enum FATType {
    FAT12,
    FAT16,
    FAT32,
    /// Detected, never parsed
    ExFAT,
}

impl FATType {
    pub const FAT12_MAX_CLUSTERS: u32 = 4084;
    pub const FAT16_MAX_CLUSTERS: u32 = 65524;

    pub fn from_total_clusters(total_clusters: u32) -> Self {
        match total_clusters {
            0 => Self::ExFAT,
            1..=Self::FAT12_MAX_CLUSTERS => Self::FAT12,
            4085..=Self::FAT16_MAX_CLUSTERS => Self::FAT16,
            _ => Self::FAT32,
        }
    }
}

/// BIOS Parameter Block
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BiosParameterBlock {
    pub jump_code: [u8; 3],
    pub oem_id: [u8; 8],
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    /// Boot record sectors included
    pub reserved_sectors: u16,
    pub number_of_fats: u8,
    pub root_entries: u16,
    /// Zero means the count lives in `total_sectors_32`
    pub total_sectors_16: u16,
    pub media_descriptor: u8,
    /// FAT12/FAT16 only, zero on FAT32
    pub sectors_per_fat_16: u16,
    pub sectors_per_track: u16,
    pub heads: u16,
    pub hidden_sectors: u32,
    pub total_sectors_32: u32,
}

impl BiosParameterBlock {
    fn decode(bytes: &[u8]) -> Self {
        let mut jump_code = [0u8; 3];
        jump_code.copy_from_slice(&bytes[0..3]);
        let mut oem_id = [0u8; 8];
        oem_id.copy_from_slice(&bytes[3..11]);
        Self {
            jump_code,
            oem_id,
            bytes_per_sector: le(bytes, 11),
            sectors_per_cluster: le(bytes, 13),
            reserved_sectors: le(bytes, 14),
            number_of_fats: le(bytes, 16),
            root_entries: le(bytes, 17),
            total_sectors_16: le(bytes, 19),
            media_descriptor: le(bytes, 21),
            sectors_per_fat_16: le(bytes, 22),
            sectors_per_track: le(bytes, 24),
            heads: le(bytes, 26),
            hidden_sectors: le(bytes, 28),
            total_sectors_32: le(bytes, 32),
        }
    }
}

/// Extended boot record of FAT12 and FAT16
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Extended16 {
    pub drive_number: u8,
    pub boot_signature: u8,
    pub volume_id: u32,
    pub volume_label: [u8; 11],
    pub type_label: [u8; 8],
}

/// Extended boot record of FAT32
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Extended32 {
    pub sectors_per_fat: u32,
    pub flags: u16,
    pub version: u16,
    pub root_cluster: u32,
    pub fs_info_sector: u16,
    pub backup_boot_sector: u16,
    pub drive_number: u8,
    pub boot_signature: u8,
    pub volume_id: u32,
    pub volume_label: [u8; 11],
    pub type_label: [u8; 8],
}

fn array<const N: usize>(bytes: &[u8], offset: usize) -> [u8; N] {
    let mut array = [0u8; N];
    array.copy_from_slice(&bytes[offset..offset + N]);
    array
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BootRecord {
    pub bpb: BiosParameterBlock,
    extended: [u8; EXTENDED_SIZE],
    signature: [u8; 2],
}

impl BootRecord {
    /// Caller guarantees sector.len() >= 512
    pub fn decode(sector: &[u8]) -> Self {
        Self {
            bpb: BiosParameterBlock::decode(sector),
            extended: array(sector, EXTENDED_OFFSET),
            signature: array(sector, BOOT_RECORD_SIZE - 2),
        }
    }

    pub fn extended16(&self) -> Extended16 {
        let bytes = &self.extended;
        Extended16 {
            drive_number: bytes[0],
            boot_signature: bytes[2],
            volume_id: le(bytes, 3),
            volume_label: array(bytes, 7),
            type_label: array(bytes, 18),
        }
    }

    pub fn extended32(&self) -> Extended32 {
        let bytes = &self.extended;
        Extended32 {
            sectors_per_fat: le(bytes, 0),
            flags: le(bytes, 4),
            version: le(bytes, 6),
            root_cluster: le(bytes, 8),
            fs_info_sector: le(bytes, 12),
            backup_boot_sector: le(bytes, 14),
            drive_number: bytes[28],
            boot_signature: bytes[30],
            volume_id: le(bytes, 31),
            volume_label: array(bytes, 35),
            type_label: array(bytes, 46),
        }
    }

    pub fn total_sectors(&self) -> u32 {
        match self.bpb.total_sectors_16 {
            0 => self.bpb.total_sectors_32,
            sectors => sectors as u32,
        }
    }

    pub fn fat_sectors(&self) -> u32 {
        match self.bpb.sectors_per_fat_16 {
            0 => self.extended32().sectors_per_fat,
            sectors => sectors as u32,
        }
    }

    /// Confidence checks deciding whether sector 0 holds a FAT boot record.
    ///
    /// Media descriptor, FAT size, root entry count per generation,
    /// FAT32 root cluster and FAT32 version are not checked.
    pub fn is_fat(&self) -> bool {
        let bytes_per_sector = self.bpb.bytes_per_sector;
        self.signature == BOOT_SIGNATURE
            && self.total_sectors() != 0
            && (512..=4096).contains(&bytes_per_sector)
            && bytes_per_sector.is_power_of_two()
            && self.bpb.sectors_per_cluster.is_power_of_two()
            && self.bpb.number_of_fats > 0
    }

    pub fn volume_label(&self, fat_type: FATType) -> String<11> {
        let label = match fat_type {
            FATType::FAT12 | FATType::FAT16 => self.extended16().volume_label,
            FATType::FAT32 | FATType::ExFAT => self.extended32().volume_label,
        };
        let mut string = String::new();
        for &byte in label.iter().filter(|b| b.is_ascii_graphic() || **b == b' ') {
            string.push(byte as char).ok();
        }
        while string.ends_with(' ') {
            string.pop();
        }
        string
    }
}

#[cfg(test)]
mod test {
    use super::{BootRecord, FATType};
    use crate::endian::put_le;

    fn sector() -> [u8; 512] {
        let mut bytes = [0u8; 512];
        bytes[0..3].copy_from_slice(&hex!("EB 3C 90"));
        bytes[3..11].copy_from_slice(b"MSWIN4.1");
        put_le(&mut bytes, 11, 512u16);
        bytes[13] = 4;
        put_le(&mut bytes, 14, 1u16);
        bytes[16] = 2;
        put_le(&mut bytes, 17, 512u16);
        put_le(&mut bytes, 19, 20480u16);
        bytes[21] = 0xF8;
        put_le(&mut bytes, 22, 20u16);
        bytes[38] = 0x29;
        put_le(&mut bytes, 39, 0x1234_5678u32);
        bytes[43..54].copy_from_slice(b"NO NAME    ");
        bytes[54..62].copy_from_slice(b"FAT16   ");
        bytes[510..512].copy_from_slice(&hex!("55 AA"));
        bytes
    }

    #[test]
    fn test_decode_bpb() {
        let record = BootRecord::decode(&sector());
        assert!(record.is_fat());
        assert_eq!(record.bpb.bytes_per_sector, 512);
        assert_eq!(record.bpb.sectors_per_cluster, 4);
        assert_eq!(record.bpb.media_descriptor, 0xF8);
        assert_eq!(record.total_sectors(), 20480);
        assert_eq!(record.fat_sectors(), 20);
        let extended = record.extended16();
        assert_eq!(extended.volume_id, 0x1234_5678);
        assert_eq!(&extended.type_label, b"FAT16   ");
        assert_eq!(record.volume_label(FATType::FAT16).as_str(), "NO NAME");
    }

    #[test]
    fn test_fat32_fields() {
        let mut bytes = sector();
        put_le(&mut bytes, 19, 0u16);
        put_le(&mut bytes, 32, 1_000_000u32);
        put_le(&mut bytes, 22, 0u16);
        put_le(&mut bytes, 36, 7777u32);
        put_le(&mut bytes, 44, 2u32);
        bytes[71..82].copy_from_slice(b"DATA       ");
        let record = BootRecord::decode(&bytes);
        assert_eq!(record.total_sectors(), 1_000_000);
        assert_eq!(record.fat_sectors(), 7777);
        assert_eq!(record.extended32().root_cluster, 2);
        assert_eq!(record.volume_label(FATType::FAT32).as_str(), "DATA");
    }

    #[test]
    fn test_validation() {
        let cases: [(usize, u8, bool); 6] = [
            (510, 0x00, false), // bad magic
            (12, 0x03, false),  // 768 bytes per sector
            (12, 0x20, false),  // 8192 bytes per sector
            (13, 3, false),     // 3 sectors per cluster
            (13, 0, false),     // 0 sectors per cluster
            (16, 0, false),     // no FAT
        ];
        for (offset, value, valid) in cases {
            let mut bytes = sector();
            bytes[offset] = value;
            assert_eq!(BootRecord::decode(&bytes).is_fat(), valid, "offset {}", offset);
        }
        let mut bytes = sector();
        put_le(&mut bytes, 19, 0u16);
        assert!(!BootRecord::decode(&bytes).is_fat(), "zero total sectors");
        let mut bytes = sector();
        bytes[21] = 0x00;
        assert!(BootRecord::decode(&bytes).is_fat(), "media descriptor is not checked");
    }

    #[test]
    fn test_classification_thresholds() {
        assert_eq!(FATType::from_total_clusters(0), FATType::ExFAT);
        assert_eq!(FATType::from_total_clusters(1), FATType::FAT12);
        assert_eq!(FATType::from_total_clusters(4084), FATType::FAT12);
        assert_eq!(FATType::from_total_clusters(4085), FATType::FAT16);
        assert_eq!(FATType::from_total_clusters(65524), FATType::FAT16);
        assert_eq!(FATType::from_total_clusters(65525), FATType::FAT32);
    }
}
