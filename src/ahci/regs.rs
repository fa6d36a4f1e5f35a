//! AHCI port registers

use memoffset::offset_of;

/// Port register block, 0x80 bytes per port starting at ABAR + 0x100
#[allow(dead_code)]
#[repr(C)]
pub struct PortRegisterBlock {
    clb: u32,
    clbu: u32,
    fb: u32,
    fbu: u32,
    is: u32,
    ie: u32,
    cmd: u32,
    _reserved0: u32,
    tfd: u32,
    sig: u32,
    ssts: u32,
    sctl: u32,
    serr: u32,
    sact: u32,
    ci: u32,
    sntf: u32,
    fbs: u32,
    _reserved1: [u32; 11],
    _vendor: [u32; 4],
}

/// Generic host control: ports implemented bitmap
pub const HBA_PORTS_IMPLEMENTED: usize = 0x0C;
pub const HBA_PORT_BASE: usize = 0x100;
pub const HBA_PORT_SIZE: usize = core::mem::size_of::<PortRegisterBlock>();
pub const MAX_PORTS: usize = 32;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Register {
    CommandListBase,
    CommandListBaseUpper,
    FisBase,
    FisBaseUpper,
    InterruptStatus,
    InterruptEnable,
    Command,
    TaskFileData,
    Signature,
    SataStatus,
    SataError,
    SataActive,
    CommandIssue,
}

impl Register {
    pub fn offset(self) -> usize {
        match self {
            Self::CommandListBase => offset_of!(PortRegisterBlock, clb),
            Self::CommandListBaseUpper => offset_of!(PortRegisterBlock, clbu),
            Self::FisBase => offset_of!(PortRegisterBlock, fb),
            Self::FisBaseUpper => offset_of!(PortRegisterBlock, fbu),
            Self::InterruptStatus => offset_of!(PortRegisterBlock, is),
            Self::InterruptEnable => offset_of!(PortRegisterBlock, ie),
            Self::Command => offset_of!(PortRegisterBlock, cmd),
            Self::TaskFileData => offset_of!(PortRegisterBlock, tfd),
            Self::Signature => offset_of!(PortRegisterBlock, sig),
            Self::SataStatus => offset_of!(PortRegisterBlock, ssts),
            Self::SataError => offset_of!(PortRegisterBlock, serr),
            Self::SataActive => offset_of!(PortRegisterBlock, sact),
            Self::CommandIssue => offset_of!(PortRegisterBlock, ci),
        }
    }
}

// PxCMD
pub const CMD_ST: u32 = 1 << 0;
pub const CMD_FRE: u32 = 1 << 4;
pub const CMD_FR: u32 = 1 << 14;
pub const CMD_CR: u32 = 1 << 15;

// PxTFD
pub const TFD_STS_DRQ: u32 = 1 << 3;
pub const TFD_STS_BSY: u32 = 1 << 7;

// PxIS
pub const IS_TFES: u32 = 1 << 30;

// PxSSTS
pub const SSTS_DET_PRESENT: u32 = 3;
pub const SSTS_IPM_ACTIVE: u32 = 1;

// PxSIG
pub const SIG_ATA: u32 = 0x0000_0101;
pub const SIG_ATAPI: u32 = 0xEB14_0101;
pub const SIG_SEMB: u32 = 0xC33C_0101;
pub const SIG_PM: u32 = 0x9669_0101;

/// 32 bit register access for one port
pub trait PortRegisters {
    fn read(&self, register: Register) -> u32;
    fn write(&mut self, register: Register, value: u32);

    fn set_bits(&mut self, register: Register, bits: u32) {
        let value = self.read(register);
        self.write(register, value | bits)
    }

    fn clear_bits(&mut self, register: Register, bits: u32) {
        let value = self.read(register);
        self.write(register, value & !bits)
    }
}

/// Memory mapped port register block
#[derive(Debug)]
pub struct Mmio {
    base: usize,
}

impl Mmio {
    /// # Safety
    ///
    /// `base` must be the mapped address of a port register block that
    /// stays mapped, and nothing else may drive the port.
    pub unsafe fn new(base: usize) -> Self {
        Self { base }
    }
}

impl PortRegisters for Mmio {
    fn read(&self, register: Register) -> u32 {
        let address = (self.base + register.offset()) as *const u32;
        // SAFETY: upheld by `Mmio::new`
        unsafe { core::ptr::read_volatile(address) }
    }

    fn write(&mut self, register: Register, value: u32) {
        let address = (self.base + register.offset()) as *mut u32;
        // SAFETY: upheld by `Mmio::new`
        unsafe { core::ptr::write_volatile(address, value) }
    }
}
