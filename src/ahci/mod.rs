//! AHCI host bus adapter, polled single slot DMA.
//!
//! Memory handed to the HBA is assumed identity mapped, virtual addresses
//! are programmed as physical ones.

mod command;
pub mod regs;

use alloc::boxed::Box;
use core::sync::atomic::{fence, Ordering};

use displaydoc::Display;
use thiserror::Error;

pub use command::{
    CommandHeader, CommandList, CommandTable, HeaderFlags, PrdEntry, PrdFlags, ReceivedFis,
    RegisterH2D,
};
use command::{ATA_CMD_READ_DMA_EXT, ATA_CMD_WRITE_DMA_EXT, COMMAND_SLOTS, DEVICE_LBA, MAX_PRD_BYTES};
use regs::*;

use crate::error::DeviceError;
use crate::io::{BlockDevice, SECTOR_SIZE};
use crate::types::SectorID;

#[derive(Copy, Clone, Debug, Display, Error, PartialEq, Eq)]
pub enum AhciError {
    /// Port is not configured
    NotConfigured,
    /// Port stayed busy
    Busy,
    /// Command did not complete
    Timeout,
    /// Device reported a task file error
    TaskFile,
    /// Command engine did not stop
    Engine,
    /// Invalid sector count or buffer length
    InvalidParameter,
}

impl From<AhciError> for DeviceError {
    fn from(error: AhciError) -> Self {
        match error {
            AhciError::Busy | AhciError::Timeout | AhciError::Engine => Self::Timeout,
            _ => Self::ReadFailure,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeviceType {
    None,
    Sata,
    Satapi,
    Semb,
    PortMultiplier,
}

impl DeviceType {
    pub fn detect(sata_status: u32, signature: u32) -> Self {
        let det = sata_status & 0x0F;
        let ipm = (sata_status >> 8) & 0x0F;
        if det != SSTS_DET_PRESENT || ipm != SSTS_IPM_ACTIVE {
            return Self::None;
        }
        match signature {
            SIG_ATAPI => Self::Satapi,
            SIG_SEMB => Self::Semb,
            SIG_PM => Self::PortMultiplier,
            _ => Self::Sata,
        }
    }
}

/// Command slot 0 lifecycle
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum State {
    #[default]
    Idle,
    CommandBuilt,
    Issued,
    Completed,
    Faulted,
}

struct PortMemory {
    command_list: Box<CommandList>,
    received_fis: Box<ReceivedFis>,
    tables: Box<[CommandTable; COMMAND_SLOTS]>,
}

impl PortMemory {
    fn new() -> Self {
        Self {
            command_list: Box::new(CommandList::ZERO),
            received_fis: Box::new(ReceivedFis::ZERO),
            tables: Box::new([CommandTable::ZERO; COMMAND_SLOTS]),
        }
    }

    fn address<T>(value: &T) -> u64 {
        value as *const T as usize as u64
    }
}

pub struct Port<R> {
    index: u8,
    registers: R,
    memory: PortMemory,
    state: State,
    spin_limit: u32,
    configured: bool,
}

impl<R: PortRegisters> Port<R> {
    pub const DEFAULT_SPIN_LIMIT: u32 = 1_000_000;

    pub fn new(index: u8, registers: R) -> Self {
        Self {
            index,
            registers,
            memory: PortMemory::new(),
            state: State::Idle,
            spin_limit: Self::DEFAULT_SPIN_LIMIT,
            configured: false,
        }
    }

    /// Polls before a wait gives up
    pub fn with_spin_limit(mut self, spin_limit: u32) -> Self {
        self.spin_limit = spin_limit;
        self
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn registers(&self) -> &R {
        &self.registers
    }

    fn wait(&self, done: impl Fn(&R) -> bool) -> bool {
        for _ in 0..self.spin_limit {
            if done(&self.registers) {
                return true;
            }
            core::hint::spin_loop();
        }
        done(&self.registers)
    }

    fn stop(&mut self) -> Result<(), AhciError> {
        self.registers.clear_bits(Register::Command, CMD_ST);
        self.registers.clear_bits(Register::Command, CMD_FRE);
        if !self.wait(|r| r.read(Register::Command) & (CMD_FR | CMD_CR) == 0) {
            warn!("AHCI port {}: timeout stopping command engine", self.index);
            return Err(AhciError::Engine);
        }
        Ok(())
    }

    fn start(&mut self) -> Result<(), AhciError> {
        if !self.wait(|r| r.read(Register::Command) & CMD_CR == 0) {
            warn!("AHCI port {}: command list still running", self.index);
            return Err(AhciError::Engine);
        }
        self.registers.set_bits(Register::Command, CMD_FRE);
        self.registers.set_bits(Register::Command, CMD_ST);
        Ok(())
    }

    /// Stop the command engine, point the port at freshly zeroed command
    /// list, received FIS area and command tables, then restart it.
    pub fn configure(&mut self) -> Result<(), AhciError> {
        self.stop()?;
        self.memory = PortMemory::new();
        let command_list = PortMemory::address(&*self.memory.command_list);
        let received_fis = PortMemory::address(&*self.memory.received_fis);
        self.registers.write(Register::CommandListBase, command_list as u32);
        self.registers.write(Register::CommandListBaseUpper, (command_list >> 32) as u32);
        self.registers.write(Register::FisBase, received_fis as u32);
        self.registers.write(Register::FisBaseUpper, (received_fis >> 32) as u32);
        for slot in 0..COMMAND_SLOTS {
            let table = PortMemory::address(&self.memory.tables[slot]);
            let header = CommandHeader { table, ..Default::default() };
            header.encode(self.memory.command_list.slot_mut(slot));
        }
        self.start()?;
        self.configured = true;
        self.state = State::Idle;
        debug!("AHCI port {}: configured, command list at {:#x}", self.index, command_list);
        Ok(())
    }

    /// Read `count` sectors starting at `sector` into `buf`
    pub fn read(&mut self, sector: u64, count: u16, buf: &mut [u8]) -> Result<(), AhciError> {
        let address = buf.as_ptr() as usize as u64;
        self.transfer(false, sector, count, address, buf.len())
    }

    /// Write `count` sectors starting at `sector` from `data`
    pub fn write(&mut self, sector: u64, count: u16, data: &[u8]) -> Result<(), AhciError> {
        let address = data.as_ptr() as usize as u64;
        self.transfer(true, sector, count, address, data.len())
    }

    fn transfer(
        &mut self,
        write: bool,
        sector: u64,
        count: u16,
        address: u64,
        length: usize,
    ) -> Result<(), AhciError> {
        if !self.configured {
            return Err(AhciError::NotConfigured);
        }
        let bytes = count as usize * SECTOR_SIZE;
        if count == 0 || bytes > length || bytes > MAX_PRD_BYTES {
            return Err(AhciError::InvalidParameter);
        }
        if !self.wait(|r| r.read(Register::TaskFileData) & (TFD_STS_BSY | TFD_STS_DRQ) == 0) {
            warn!("AHCI port {}: device busy, command not issued", self.index);
            self.state = State::Faulted;
            return Err(AhciError::Busy);
        }
        self.registers.write(Register::InterruptStatus, u32::MAX);

        let command = if write { ATA_CMD_WRITE_DMA_EXT } else { ATA_CMD_READ_DMA_EXT };
        let table = &mut self.memory.tables[0];
        table.0.fill(0);
        RegisterH2D { command, lba: sector, count, device: DEVICE_LBA }.encode(table.cfis_mut());
        PrdEntry::new(address, bytes).encode(table.prd_mut(0));
        let mut flags = HeaderFlags::default();
        flags.set_cfl((RegisterH2D::LENGTH / 4) as u32);
        flags.set_write(write);
        flags.set_prdtl(1);
        let header = CommandHeader { flags, prdbc: 0, table: PortMemory::address(&*table) };
        header.encode(self.memory.command_list.slot_mut(0));
        self.state = State::CommandBuilt;
        trace!("AHCI port {}: command {:#x} sector {} count {}", self.index, command, sector, count);

        fence(Ordering::SeqCst);
        self.registers.write(Register::CommandIssue, 1);
        self.state = State::Issued;
        let completed = self.wait(|r| {
            r.read(Register::CommandIssue) & 1 == 0
                || r.read(Register::InterruptStatus) & IS_TFES != 0
        });
        fence(Ordering::SeqCst);
        if self.registers.read(Register::InterruptStatus) & IS_TFES != 0 {
            let tfd = self.registers.read(Register::TaskFileData);
            warn!("AHCI port {}: task file error, TFD {:#x}", self.index, tfd);
            self.state = State::Faulted;
            return Err(AhciError::TaskFile);
        }
        if !completed {
            warn!("AHCI port {}: command timeout", self.index);
            self.state = State::Faulted;
            return Err(AhciError::Timeout);
        }
        self.state = State::Completed;
        Ok(())
    }
}

const SECTORS_PER_COMMAND: usize = MAX_PRD_BYTES / SECTOR_SIZE;

impl<R: PortRegisters> BlockDevice for Port<R> {
    type Error = AhciError;

    fn read(&mut self, id: SectorID, buf: &mut [u8]) -> Result<(), AhciError> {
        let mut sector = u64::from(id);
        for chunk in buf.chunks_mut(SECTORS_PER_COMMAND * SECTOR_SIZE) {
            let count = chunk.len() / SECTOR_SIZE;
            Port::read(self, sector, count as u16, chunk)?;
            sector += count as u64;
        }
        Ok(())
    }

    fn write(&mut self, id: SectorID, data: &[u8]) -> Result<(), AhciError> {
        let mut sector = u64::from(id);
        for chunk in data.chunks(SECTORS_PER_COMMAND * SECTOR_SIZE) {
            let count = chunk.len() / SECTOR_SIZE;
            Port::write(self, sector, count as u16, chunk)?;
            sector += count as u64;
        }
        Ok(())
    }
}

/// AHCI base address register mapping
#[derive(Debug)]
pub struct Controller {
    abar: usize,
}

impl Controller {
    /// # Safety
    ///
    /// `abar` must be the mapped address of the HBA memory registers,
    /// covering every implemented port block.
    pub unsafe fn new(abar: usize) -> Self {
        Self { abar }
    }

    pub fn ports_implemented(&self) -> u32 {
        let address = (self.abar + HBA_PORTS_IMPLEMENTED) as *const u32;
        // SAFETY: upheld by `Controller::new`
        unsafe { core::ptr::read_volatile(address) }
    }

    /// Configure every implemented port with a SATA drive attached
    pub fn probe(&self, spin_limit: u32) -> heapless::Vec<Port<Mmio>, MAX_PORTS> {
        let mut ports = heapless::Vec::new();
        let implemented = self.ports_implemented();
        debug!("AHCI: ports implemented {:#010x}", implemented);
        for index in 0..MAX_PORTS {
            if implemented & (1 << index) == 0 {
                continue;
            }
            // SAFETY: port block lies within the ABAR mapping promised by `Controller::new`
            let registers = unsafe { Mmio::new(self.abar + HBA_PORT_BASE + index * HBA_PORT_SIZE) };
            let sata_status = registers.read(Register::SataStatus);
            let signature = registers.read(Register::Signature);
            let device_type = DeviceType::detect(sata_status, signature);
            debug!("AHCI: port {} {:?}", index, device_type);
            if device_type != DeviceType::Sata {
                continue;
            }
            let mut port = Port::new(index as u8, registers).with_spin_limit(spin_limit);
            if let Err(error) = port.configure() {
                warn!("AHCI: port {} not configured: {}", index, error);
                continue;
            }
            if ports.push(port).is_err() {
                warn!("AHCI: port {} dropped, port list full", index);
            }
        }
        info!("AHCI: {} SATA port(s) ready", ports.len());
        ports
    }
}
