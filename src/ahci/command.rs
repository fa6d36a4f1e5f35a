//! Command list, command table and FIS layouts

use bitfield::bitfield;

use crate::endian::{le, put_le};

pub const FIS_TYPE_REG_H2D: u8 = 0x27;
pub const ATA_CMD_READ_DMA_EXT: u8 = 0x25;
pub const ATA_CMD_WRITE_DMA_EXT: u8 = 0x35;
/// Device register: LBA addressing
pub const DEVICE_LBA: u8 = 1 << 6;

pub const COMMAND_SLOTS: usize = 32;
const HEADER_SIZE: usize = 32;
const COMMAND_TABLE_SIZE: usize = 256;
const CFIS_OFFSET: usize = 0x00;
const CFIS_SIZE: usize = 64;
const PRDT_OFFSET: usize = 0x80;
const PRD_SIZE: usize = 16;
/// Largest transfer one descriptor can describe
pub const MAX_PRD_BYTES: usize = 4 << 20;

bitfield! {
    /// Command header DW0
    #[derive(Copy, Clone, Default, PartialEq, Eq)]
    pub struct HeaderFlags(u32);
    impl Debug;
    /// Command FIS length in dwords
    pub cfl, set_cfl: 4, 0;
    pub atapi, set_atapi: 5;
    pub write, set_write: 6;
    pub prefetchable, set_prefetchable: 7;
    pub clear_busy, set_clear_busy: 10;
    /// Physical region descriptor table length
    pub prdtl, set_prdtl: 31, 16;
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandHeader {
    pub flags: HeaderFlags,
    /// Bytes transferred, written back by the HBA
    pub prdbc: u32,
    /// Physical address of the command table, 128 byte aligned
    pub table: u64,
}

impl CommandHeader {
    pub fn encode(&self, bytes: &mut [u8]) {
        bytes[..HEADER_SIZE].fill(0);
        put_le(bytes, 0, self.flags.0);
        put_le(bytes, 4, self.prdbc);
        put_le(bytes, 8, self.table as u32);
        put_le(bytes, 12, (self.table >> 32) as u32);
    }

    pub fn decode(bytes: &[u8]) -> Self {
        let low: u32 = le(bytes, 8);
        let high: u32 = le(bytes, 12);
        Self {
            flags: HeaderFlags(le(bytes, 0)),
            prdbc: le(bytes, 4),
            table: (high as u64) << 32 | low as u64,
        }
    }
}

/// Register FIS, host to device
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RegisterH2D {
    pub command: u8,
    /// 48 bit sector address
    pub lba: u64,
    pub count: u16,
    pub device: u8,
}

impl RegisterH2D {
    pub const LENGTH: usize = 20;

    pub fn encode(&self, bytes: &mut [u8]) {
        let lba = self.lba.to_le_bytes();
        bytes[..Self::LENGTH].fill(0);
        bytes[0] = FIS_TYPE_REG_H2D;
        bytes[1] = 1 << 7; // command, not control
        bytes[2] = self.command;
        bytes[4..7].copy_from_slice(&lba[0..3]);
        bytes[7] = self.device;
        bytes[8..11].copy_from_slice(&lba[3..6]);
        put_le(bytes, 12, self.count);
    }
}

bitfield! {
    /// Physical region descriptor DW3
    #[derive(Copy, Clone, Default, PartialEq, Eq)]
    pub struct PrdFlags(u32);
    impl Debug;
    /// Byte count minus one, bit 0 always set
    pub byte_count, set_byte_count: 21, 0;
    pub interrupt, set_interrupt: 31;
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PrdEntry {
    /// Physical address of the data buffer, word aligned
    pub address: u64,
    pub flags: PrdFlags,
}

impl PrdEntry {
    pub fn new(address: u64, bytes: usize) -> Self {
        let mut flags = PrdFlags::default();
        flags.set_byte_count(bytes as u32 - 1);
        flags.set_interrupt(true);
        Self { address, flags }
    }

    pub fn encode(&self, bytes: &mut [u8]) {
        put_le(bytes, 0, self.address as u32);
        put_le(bytes, 4, (self.address >> 32) as u32);
        put_le(bytes, 8, 0u32);
        put_le(bytes, 12, self.flags.0);
    }

    pub fn decode(bytes: &[u8]) -> Self {
        let low: u32 = le(bytes, 0);
        let high: u32 = le(bytes, 4);
        Self { address: (high as u64) << 32 | low as u64, flags: PrdFlags(le(bytes, 12)) }
    }
}

/// 32 command headers, 1 KiB aligned
#[repr(C, align(1024))]
pub struct CommandList(pub [u8; HEADER_SIZE * COMMAND_SLOTS]);

impl CommandList {
    pub const ZERO: Self = Self([0; HEADER_SIZE * COMMAND_SLOTS]);

    pub fn slot(&self, slot: usize) -> &[u8] {
        &self.0[slot * HEADER_SIZE..(slot + 1) * HEADER_SIZE]
    }

    pub fn slot_mut(&mut self, slot: usize) -> &mut [u8] {
        &mut self.0[slot * HEADER_SIZE..(slot + 1) * HEADER_SIZE]
    }
}

/// Received FIS area, 256 byte aligned
#[repr(C, align(256))]
pub struct ReceivedFis(pub [u8; 256]);

impl ReceivedFis {
    pub const ZERO: Self = Self([0; 256]);
}

/// Command FIS, ATAPI command and PRDT, 128 byte aligned
#[repr(C, align(128))]
pub struct CommandTable(pub [u8; COMMAND_TABLE_SIZE]);

impl CommandTable {
    pub const ZERO: Self = Self([0; COMMAND_TABLE_SIZE]);

    pub fn cfis(&self) -> &[u8] {
        &self.0[CFIS_OFFSET..CFIS_OFFSET + CFIS_SIZE]
    }

    pub fn cfis_mut(&mut self) -> &mut [u8] {
        &mut self.0[CFIS_OFFSET..CFIS_OFFSET + CFIS_SIZE]
    }

    pub fn prd(&self, index: usize) -> &[u8] {
        let offset = PRDT_OFFSET + index * PRD_SIZE;
        &self.0[offset..offset + PRD_SIZE]
    }

    pub fn prd_mut(&mut self, index: usize) -> &mut [u8] {
        let offset = PRDT_OFFSET + index * PRD_SIZE;
        &mut self.0[offset..offset + PRD_SIZE]
    }
}

#[cfg(test)]
mod test {
    use super::{CommandHeader, HeaderFlags, PrdEntry, RegisterH2D, ATA_CMD_READ_DMA_EXT, DEVICE_LBA};

    #[test]
    fn test_register_fis() {
        let fis = RegisterH2D {
            command: ATA_CMD_READ_DMA_EXT,
            lba: 0x0000_A1B2_C3D4_E5F6,
            count: 0x0102,
            device: DEVICE_LBA,
        };
        let mut bytes = [0xFFu8; 64];
        fis.encode(&mut bytes);
        let expected = hex!("27 80 25 00 F6 E5 D4 40 C3 B2 A1 00 02 01 00 00 00 00 00 00");
        assert_eq!(bytes[..20], expected);
        assert_eq!(bytes[20], 0xFF);
    }

    #[test]
    fn test_prd_entry() {
        let entry = PrdEntry::new(0x1_2345_6780, 1024);
        let mut bytes = [0u8; 16];
        entry.encode(&mut bytes);
        assert_eq!(bytes, hex!("80 67 45 23 01 00 00 00 00 00 00 00 FF 03 00 80"));
        assert_eq!(PrdEntry::decode(&bytes), entry);
    }

    #[test]
    fn test_command_header() {
        let mut flags = HeaderFlags::default();
        flags.set_cfl(5);
        flags.set_write(true);
        flags.set_prdtl(1);
        let header = CommandHeader { flags, prdbc: 0, table: 0x8000_0080 };
        let mut bytes = [0u8; 32];
        header.encode(&mut bytes);
        assert_eq!(bytes[..4], hex!("45 00 01 00"));
        assert_eq!(CommandHeader::decode(&bytes), header);
    }
}
