#![doc = include_str!("../README.md")]
#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

#[macro_use]
extern crate hex_literal;
extern crate heapless;
#[macro_use]
extern crate log;

pub mod ahci;
mod directory;
pub mod driver;
mod endian;
pub mod error;
mod fat;
pub mod file;
pub(crate) mod fs;
#[cfg(test)]
mod image;
pub mod io;
mod name;
pub mod pipe;
mod region;
pub mod system;
pub mod types;
pub mod vfs;
pub mod volume;

pub use directory::DirEntry;
pub use driver::{FilesystemDriver, StorageDevice};
pub use file::{FileMetadata, Locator};
pub use fs::{DirectoryLocation, Geometry};
pub use name::ShortName;
pub use pipe::PipeDriver;
pub use region::boot::{BootRecord, FATType};
pub use region::data::{Attributes, Date, ShortEntry, Time, Timestamp};
pub use system::System;
pub use vfs::Vfs;
pub use volume::FatDriver;
