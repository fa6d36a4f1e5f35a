//! Synthetic FAT volumes for unit tests

use alloc::vec;
use alloc::vec::Vec;

use crate::endian::{le, put_le};
use crate::io::MemoryDevice;
use crate::name::ShortName;
use crate::region::boot::FATType;
use crate::region::data::{Attributes, LongNameEntry, RawEntry, ShortEntry, ENTRY_SIZE};

#[derive(Copy, Clone, Debug)]
pub(crate) struct Layout {
    pub fat_type: FATType,
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub number_of_fats: u8,
    pub root_entries: u16,
    pub fat_sectors: u32,
    pub clusters: u32,
}

impl Layout {
    pub fn fat12() -> Self {
        Self {
            fat_type: FATType::FAT12,
            bytes_per_sector: 512,
            sectors_per_cluster: 1,
            reserved_sectors: 1,
            number_of_fats: 2,
            root_entries: 16,
            fat_sectors: 1,
            clusters: 64,
        }
    }

    pub fn fat16() -> Self {
        Self {
            fat_type: FATType::FAT16,
            bytes_per_sector: 512,
            sectors_per_cluster: 1,
            reserved_sectors: 1,
            number_of_fats: 2,
            root_entries: 32,
            fat_sectors: 17,
            clusters: 4100,
        }
    }

    pub fn fat32() -> Self {
        Self {
            fat_type: FATType::FAT32,
            bytes_per_sector: 512,
            sectors_per_cluster: 1,
            reserved_sectors: 32,
            number_of_fats: 2,
            root_entries: 0,
            fat_sectors: 520,
            clusters: 65600,
        }
    }

    fn sector_size(&self) -> usize {
        self.bytes_per_sector as usize
    }

    fn root_dir_sectors(&self) -> u32 {
        let bytes_per_sector = self.bytes_per_sector as u32;
        (self.root_entries as u32 * 32 + bytes_per_sector - 1) / bytes_per_sector
    }

    fn first_data_sector(&self) -> u32 {
        self.reserved_sectors as u32
            + self.number_of_fats as u32 * self.fat_sectors
            + self.root_dir_sectors()
    }

    fn total_sectors(&self) -> u32 {
        self.first_data_sector() + self.clusters * self.sectors_per_cluster as u32
    }

    fn cluster_offset(&self, cluster: u32) -> usize {
        let sector = self.first_data_sector() + (cluster - 2) * self.sectors_per_cluster as u32;
        sector as usize * self.sector_size()
    }

    fn end_of_chain(&self) -> u32 {
        match self.fat_type {
            FATType::FAT12 => 0xFFF,
            FATType::FAT16 => 0xFFFF,
            _ => 0x0FFF_FFFF,
        }
    }
}

pub(crate) struct Image {
    layout: Layout,
    bytes: Vec<u8>,
}

impl Image {
    pub const ROOT_CLUSTER: u32 = 2;

    pub fn new(layout: Layout) -> Self {
        let total_sectors = layout.total_sectors();
        let mut image = Self { layout, bytes: vec![0u8; total_sectors as usize * layout.sector_size()] };
        let boot = &mut image.bytes[..512];
        boot[0..3].copy_from_slice(&hex!("EB 3C 90"));
        boot[3..11].copy_from_slice(b"FATVFS  ");
        put_le(boot, 11, layout.bytes_per_sector);
        boot[13] = layout.sectors_per_cluster;
        put_le(boot, 14, layout.reserved_sectors);
        boot[16] = layout.number_of_fats;
        put_le(boot, 17, layout.root_entries);
        match u16::try_from(total_sectors) {
            Ok(sectors) => put_le(boot, 19, sectors),
            Err(_) => put_le(boot, 32, total_sectors),
        }
        boot[21] = 0xF8;
        match layout.fat_type {
            FATType::FAT32 => {
                put_le(boot, 36, layout.fat_sectors);
                put_le(boot, 44, Self::ROOT_CLUSTER);
                boot[66] = 0x29;
                boot[71..82].copy_from_slice(b"TESTVOLUME ");
            }
            _ => {
                put_le(boot, 22, layout.fat_sectors as u16);
                boot[38] = 0x29;
                boot[43..54].copy_from_slice(b"TESTVOLUME ");
            }
        }
        boot[510..512].copy_from_slice(&hex!("55 AA"));
        let end = layout.end_of_chain();
        image.set_fat(0, end & !0xFF | 0xF8);
        image.set_fat(1, end);
        if layout.fat_type == FATType::FAT32 {
            image.set_fat(Self::ROOT_CLUSTER, end);
        }
        image
    }

    /// Store `value` for `cluster` in every FAT copy
    pub fn set_fat(&mut self, cluster: u32, value: u32) {
        let layout = self.layout;
        let fat_bytes = layout.fat_sectors as usize * layout.sector_size();
        for copy in 0..layout.number_of_fats as usize {
            let table = layout.reserved_sectors as usize * layout.sector_size() + copy * fat_bytes;
            let at = table + layout.fat_type.entry_offset(cluster.into()) as usize;
            match layout.fat_type {
                FATType::FAT12 => {
                    let old: u16 = le(&self.bytes, at);
                    let value = value as u16 & 0xFFF;
                    let new = match cluster & 1 {
                        1 => (old & 0x000F) | value << 4,
                        _ => (old & 0xF000) | value,
                    };
                    put_le(&mut self.bytes, at, new);
                }
                FATType::FAT16 => put_le(&mut self.bytes, at, value as u16),
                _ => put_le(&mut self.bytes, at, value),
            }
        }
    }

    /// Link `clusters` in order and terminate the chain
    pub fn chain(&mut self, clusters: &[u32]) {
        for pair in clusters.windows(2) {
            self.set_fat(pair[0], pair[1]);
        }
        if let Some(&last) = clusters.last() {
            self.set_fat(last, self.layout.end_of_chain());
        }
    }

    /// Entries of the root directory, region or root cluster
    pub fn write_root(&mut self, entries: &[RawEntry]) {
        let offset = match self.layout.fat_type {
            FATType::FAT32 => self.layout.cluster_offset(Self::ROOT_CLUSTER),
            _ => (self.layout.first_data_sector() - self.layout.root_dir_sectors()) as usize
                * self.layout.sector_size(),
        };
        self.write_entries(offset, entries);
    }

    /// Entries at the start of `cluster`
    pub fn write_directory(&mut self, cluster: u32, entries: &[RawEntry]) {
        let offset = self.layout.cluster_offset(cluster);
        self.write_entries(offset, entries);
    }

    fn write_entries(&mut self, offset: usize, entries: &[RawEntry]) {
        for (i, entry) in entries.iter().enumerate() {
            let at = offset + i * ENTRY_SIZE;
            self.bytes[at..at + ENTRY_SIZE].copy_from_slice(entry);
        }
    }

    pub fn write_cluster(&mut self, cluster: u32, data: &[u8]) {
        let offset = self.layout.cluster_offset(cluster);
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
    }

    pub fn device(self) -> MemoryDevice {
        MemoryDevice::with_sector_size(self.bytes, self.layout.sector_size())
    }
}

fn short(name: &[u8; 11], attributes: u8, cluster: u32, size: u32) -> RawEntry {
    let entry = ShortEntry {
        name: ShortName::from(*name),
        attributes: Attributes::from(attributes),
        first_cluster: cluster.into(),
        size,
        ..Default::default()
    };
    entry.encode()
}

pub(crate) fn file(name: &[u8; 11], cluster: u32, size: u32) -> RawEntry {
    short(name, 0x20, cluster, size)
}

pub(crate) fn directory(name: &[u8; 11], cluster: u32) -> RawEntry {
    short(name, 0x10, cluster, 0)
}

pub(crate) fn volume_label(name: &[u8; 11]) -> RawEntry {
    short(name, 0x08, 0, 0)
}

/// Long name entries for `name` in on-disk order, last fragment first
pub(crate) fn long_name(name: &str) -> Vec<RawEntry> {
    let mut units: Vec<u16> = name.encode_utf16().collect();
    if units.len() % 13 != 0 {
        units.push(0);
    }
    while units.len() % 13 != 0 {
        units.push(0xFFFF);
    }
    let count = units.len() / 13;
    let mut entries = Vec::with_capacity(count);
    for (index, chunk) in units.chunks(13).enumerate().rev() {
        let mut fragment = [0u16; 13];
        fragment.copy_from_slice(chunk);
        let mut order = index as u8 + 1;
        if index + 1 == count {
            order |= 0x40;
        }
        entries.push(LongNameEntry { order, checksum: 0, units: fragment }.encode());
    }
    entries
}
