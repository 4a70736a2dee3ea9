//! 32-byte directory records.
//!
//! Every field the walker consumes is decoded here, so no other module
//! indexes into a raw record by hand.

use alloc::string::String;
use core::fmt;

use bitflags::bitflags;

pub const ENTRY_LEN: usize = 32;
pub const ENTRY_FREE: u8 = 0x00;
pub const ENTRY_DELETED: u8 = 0xE5;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Attributes: u8 {
        const READ_ONLY = 0x01;
        const HIDDEN    = 0x02;
        const SYSTEM    = 0x04;
        const VOLUME_ID = 0x08;
        const DIRECTORY = 0x10;
        const ARCHIVE   = 0x20;
        /// Marks a long-name slot when all four bits are set.
        const LONG_NAME = Self::READ_ONLY.bits()
            | Self::HIDDEN.bits()
            | Self::SYSTEM.bits()
            | Self::VOLUME_ID.bits();

        // The disk may set any bits
        const _ = !0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// Packed FAT date: years since 1980, month, day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatDate(pub u16);

impl FatDate {
    pub fn year(self) -> u16 {
        1980 + (self.0 >> 9)
    }
    pub fn month(self) -> u8 {
        ((self.0 >> 5) & 0x0F) as u8
    }
    pub fn day(self) -> u8 {
        (self.0 & 0x1F) as u8
    }
}

/// Packed FAT time with two-second resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatTime(pub u16);

impl FatTime {
    pub fn hour(self) -> u8 {
        (self.0 >> 11) as u8
    }
    pub fn minute(self) -> u8 {
        ((self.0 >> 5) & 0x3F) as u8
    }
    pub fn second(self) -> u8 {
        ((self.0 & 0x1F) * 2) as u8
    }
}

/// Snapshot of one on-disk directory slot.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RawEntry([u8; ENTRY_LEN]);

impl RawEntry {
    pub const fn from_bytes(bytes: [u8; ENTRY_LEN]) -> Self {
        Self(bytes)
    }

    /// Copy the first 32 bytes of `slot`.
    pub fn from_slot(slot: &[u8]) -> Self {
        let mut bytes = [0u8; ENTRY_LEN];
        bytes.copy_from_slice(&slot[..ENTRY_LEN]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ENTRY_LEN] {
        &self.0
    }

    fn u16_at(&self, off: usize) -> u16 {
        u16::from_le_bytes([self.0[off], self.0[off + 1]])
    }

    /// First byte 0x00: this slot and every later one are unused.
    pub fn is_end(&self) -> bool {
        self.0[0] == ENTRY_FREE
    }

    pub fn is_deleted(&self) -> bool {
        self.0[0] == ENTRY_DELETED
    }

    pub fn attributes(&self) -> Attributes {
        Attributes::from_bits_retain(self.0[11])
    }

    pub fn is_long_name(&self) -> bool {
        self.attributes().contains(Attributes::LONG_NAME)
    }

    pub fn is_dir(&self) -> bool {
        self.attributes().contains(Attributes::DIRECTORY)
    }

    pub fn is_hidden(&self) -> bool {
        self.attributes().contains(Attributes::HIDDEN)
    }

    pub fn is_volume_id(&self) -> bool {
        self.attributes().contains(Attributes::VOLUME_ID) && !self.is_long_name()
    }

    pub fn kind(&self) -> EntryKind {
        if self.is_dir() { EntryKind::Directory } else { EntryKind::File }
    }

    /// First cluster, high half at bytes 20-21 and low half at 26-27.
    pub fn first_cluster(&self) -> u32 {
        ((self.u16_at(20) as u32) << 16) | self.u16_at(26) as u32
    }

    pub fn size(&self) -> u32 {
        u32::from_le_bytes([self.0[28], self.0[29], self.0[30], self.0[31]])
    }

    pub fn creation_time(&self) -> FatTime {
        FatTime(self.u16_at(14))
    }

    pub fn creation_date(&self) -> FatDate {
        FatDate(self.u16_at(16))
    }

    pub fn access_date(&self) -> FatDate {
        FatDate(self.u16_at(18))
    }

    pub fn write_time(&self) -> FatTime {
        FatTime(self.u16_at(22))
    }

    pub fn write_date(&self) -> FatDate {
        FatDate(self.u16_at(24))
    }

    /// 8.3 name with padding removed, e.g. `"HELLO   TXT"` -> `"HELLO.TXT"`.
    pub fn short_name(&self) -> String {
        let base = &self.0[0..8];
        let ext = &self.0[8..11];
        let base_end = base.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
        let ext_end = ext.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);

        let mut name = String::with_capacity(12);
        name.extend(base[..base_end].iter().map(|&b| char::from(b)));
        if ext_end > 0 {
            name.push('.');
            name.extend(ext[..ext_end].iter().map(|&b| char::from(b)));
        }
        name
    }
}

impl fmt::Debug for RawEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawEntry")
            .field("name", &self.short_name())
            .field("attributes", &self.attributes())
            .field("first_cluster", &self.first_cluster())
            .field("size", &self.size())
            .finish()
    }
}

/// One logical directory entry: a short-name record and the names resolved for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub record: RawEntry,
    pub short_name: String,
    /// Reconstructed long name, or the short name when the entry has none.
    pub long_name: String,
    /// Number of long-name slots that preceded the record.
    pub long_name_slots: u8,
}

impl DirEntry {
    pub fn is_dir(&self) -> bool {
        self.record.is_dir()
    }

    pub fn has_long_name(&self) -> bool {
        self.long_name_slots > 0
    }
}
