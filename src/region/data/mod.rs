pub mod timestamp;

use bitfield::bitfield;

use crate::endian::{le, put_le};
use crate::name::ShortName;
use crate::types::ClusterID;
pub use timestamp::{Date, Time, Timestamp};

pub(crate) const ENTRY_SIZE: usize = 32;
/// Characters carried by one long name entry
pub(crate) const LONG_NAME_UNITS: usize = 13;

pub(crate) const END_OF_DIRECTORY: u8 = 0x00;
pub(crate) const DELETED: u8 = 0xE5;
/// First name byte 0x05 stores a literal 0xE5
const ESCAPED_E5: u8 = 0x05;
pub(crate) const LONG_NAME_ATTRIBUTES: u8 = 0x0F;

pub(crate) type RawEntry = [u8; ENTRY_SIZE];

bitfield! {
    #[derive(Copy, Clone, Default, PartialEq, Eq)]
    pub struct Attributes(u8);
    impl Debug;
    pub read_only, set_read_only: 0;
    pub hidden, set_hidden: 1;
    pub system, set_system: 2;
    pub volume_id, set_volume_id: 3;
    pub directory, set_directory: 4;
    pub archive, set_archive: 5;
}

impl Attributes {
    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn is_long_name(&self) -> bool {
        self.0 & 0x3F == LONG_NAME_ATTRIBUTES
    }
}

impl From<u8> for Attributes {
    fn from(bits: u8) -> Self {
        Self(bits)
    }
}

/// 8.3 directory entry
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ShortEntry {
    pub name: ShortName,
    pub attributes: Attributes,
    pub created: Timestamp,
    pub accessed: Date,
    pub modified: Timestamp,
    pub first_cluster: ClusterID,
    pub size: u32,
}

impl ShortEntry {
    pub(crate) fn decode(raw: &[u8]) -> Self {
        let mut name = [0u8; 11];
        name.copy_from_slice(&raw[0..11]);
        if name[0] == ESCAPED_E5 {
            name[0] = DELETED;
        }
        let cluster_high: u16 = le(raw, 20);
        let cluster_low: u16 = le(raw, 26);
        Self {
            name: ShortName::from(name),
            attributes: Attributes(raw[11]),
            created: Timestamp {
                date: Date::from(le::<u16>(raw, 16)),
                time: Time::from(le::<u16>(raw, 14)),
                centiseconds: raw[13],
            },
            accessed: Date::from(le::<u16>(raw, 18)),
            modified: Timestamp {
                date: Date::from(le::<u16>(raw, 24)),
                time: Time::from(le::<u16>(raw, 22)),
                centiseconds: 0,
            },
            first_cluster: ClusterID::from((cluster_high as u32) << 16 | cluster_low as u32),
            size: le(raw, 28),
        }
    }

    pub(crate) fn encode(&self) -> RawEntry {
        let mut raw = [0u8; ENTRY_SIZE];
        raw[0..11].copy_from_slice(self.name.as_bytes());
        if raw[0] == DELETED {
            raw[0] = ESCAPED_E5;
        }
        raw[11] = self.attributes.bits();
        raw[13] = self.created.centiseconds;
        put_le(&mut raw, 14, u16::from(self.created.time));
        put_le(&mut raw, 16, u16::from(self.created.date));
        put_le(&mut raw, 18, u16::from(self.accessed));
        let cluster = u32::from(self.first_cluster);
        put_le(&mut raw, 20, (cluster >> 16) as u16);
        put_le(&mut raw, 22, u16::from(self.modified.time));
        put_le(&mut raw, 24, u16::from(self.modified.date));
        put_le(&mut raw, 26, cluster as u16);
        put_le(&mut raw, 28, self.size);
        raw
    }
}

/// Long file name entry, a run of these precedes the 8.3 entry it names
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct LongNameEntry {
    pub order: u8,
    pub checksum: u8,
    pub units: [u16; LONG_NAME_UNITS],
}

impl LongNameEntry {
    const LAST: u8 = 0x40;
    const SPANS: [(usize, usize); 3] = [(1, 5), (14, 6), (28, 2)];

    pub fn decode(raw: &[u8]) -> Self {
        let mut units = [0u16; LONG_NAME_UNITS];
        let mut index = 0;
        for (offset, count) in Self::SPANS {
            for i in 0..count {
                units[index] = le(raw, offset + i * 2);
                index += 1;
            }
        }
        Self { order: raw[0], checksum: raw[13], units }
    }

    #[cfg(test)]
    pub fn encode(&self) -> RawEntry {
        let mut raw = [0u8; ENTRY_SIZE];
        raw[0] = self.order;
        raw[11] = LONG_NAME_ATTRIBUTES;
        raw[13] = self.checksum;
        let mut index = 0;
        for (offset, count) in Self::SPANS {
            for i in 0..count {
                put_le(&mut raw, offset + i * 2, self.units[index]);
                index += 1;
            }
        }
        raw
    }

    /// 1-based position of this fragment within the name
    pub fn sequence(&self) -> u8 {
        self.order & 0x1F
    }

    pub fn is_last(&self) -> bool {
        self.order & Self::LAST != 0
    }
}
