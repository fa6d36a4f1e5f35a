mod entry_iter;

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::mem;

use crate::name::ShortName;
use crate::region::data::{Attributes, LongNameEntry, ShortEntry, LONG_NAME_UNITS};
use crate::types::ClusterID;
pub(crate) use entry_iter::EntryIter;

/// Longest name a run of long name entries can carry
const MAX_SEQUENCE: u8 = 20;

/// A short entry together with the long name immediately preceding it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub short: ShortEntry,
    /// Empty when the entry has no long name
    pub long_name: String,
}

impl DirEntry {
    /// Long name if present, otherwise the dotted 8.3 name
    pub fn name(&self) -> String {
        if !self.long_name.is_empty() {
            return self.long_name.clone();
        }
        if self.is_volume_label() {
            let label: String = self.short.name.as_bytes().iter().map(|&b| b as char).collect();
            return label.trim_end().into();
        }
        self.short.name.to_string()
    }

    pub fn attributes(&self) -> Attributes {
        self.short.attributes
    }

    pub fn is_directory(&self) -> bool {
        self.short.attributes.directory()
    }

    pub fn is_volume_label(&self) -> bool {
        self.short.attributes.volume_id() && !self.short.attributes.directory()
    }

    pub fn first_cluster(&self) -> ClusterID {
        self.short.first_cluster
    }

    pub fn size(&self) -> u32 {
        self.short.size
    }

    /// Exact 8.3 match, or case insensitive long name match
    pub(crate) fn matches(&self, segment: &str, short: Option<&ShortName>) -> bool {
        if self.is_volume_label() {
            return false;
        }
        if short.is_some_and(|name| *name == self.short.name) {
            return true;
        }
        let lowercase = |s: &str| s.chars().flat_map(char::to_lowercase).collect::<Vec<_>>();
        !self.long_name.is_empty() && lowercase(&self.long_name) == lowercase(segment)
    }
}

/// UTF-16 units collected from a run of long name entries
#[derive(Debug, Default)]
pub(crate) struct LongName {
    units: Vec<u16>,
}

impl LongName {
    /// Fragments land by sequence number, whatever order they are read in
    pub fn push(&mut self, entry: &LongNameEntry) {
        let sequence = entry.sequence();
        if sequence == 0 || sequence > MAX_SEQUENCE {
            warn!("Long name entry with sequence {} ignored", sequence);
            return;
        }
        if entry.is_last() {
            self.units.clear();
        }
        let start = (sequence as usize - 1) * LONG_NAME_UNITS;
        if self.units.len() < start + LONG_NAME_UNITS {
            self.units.resize(start + LONG_NAME_UNITS, 0xFFFF);
        }
        self.units[start..start + LONG_NAME_UNITS].copy_from_slice(&entry.units);
    }

    pub fn clear(&mut self) {
        self.units.clear();
    }

    /// Decode and reset, stopping at the first NUL and skipping padding
    pub fn take(&mut self) -> String {
        let units = mem::take(&mut self.units);
        let end = units.iter().position(|&unit| unit == 0).unwrap_or(units.len());
        let units = units[..end].iter().copied().filter(|&unit| unit != 0xFFFF);
        char::decode_utf16(units).map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER)).collect()
    }
}
