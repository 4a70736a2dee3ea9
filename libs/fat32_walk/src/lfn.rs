//! Long (VFAT) name fragments.
//!
//! A long name is stored in reverse: the slot carrying the highest ordinal and
//! the last-entry bit comes first on disk, ordinal 1 sits right before the
//! short-name record. Each slot holds 13 UTF-16 code units in three windows.

use alloc::string::String;

use crate::entry::RawEntry;

pub const LAST_LONG_ENTRY: u8 = 0x40;
pub const ORDINAL_MASK: u8 = 0x3F;

/// Byte ranges of the character windows inside a long-name slot.
const CHAR_WINDOWS: [core::ops::Range<usize>; 3] = [1..11, 14..26, 28..32];

/// Highest byte value kept when rebuilding a name.
const MAX_KEPT_BYTE: u8 = 126;

pub fn ordinal(slot: &RawEntry) -> u8 {
    slot.as_bytes()[0] & ORDINAL_MASK
}

pub fn is_last(slot: &RawEntry) -> bool {
    slot.as_bytes()[0] & LAST_LONG_ENTRY != 0
}

/// Append the characters of one slot to `out`, stopping at `max` characters.
///
/// Only single-byte code units 1..=126 survive: the high byte of each UTF-16
/// unit, the terminator and the 0xFFFF padding are all dropped.
pub fn push_fragment(slot: &RawEntry, out: &mut String, max: usize) {
    let bytes = slot.as_bytes();
    for window in CHAR_WINDOWS {
        for &b in &bytes[window] {
            if out.len() >= max {
                return;
            }
            if b != 0 && b <= MAX_KEPT_BYTE {
                out.push(char::from(b));
            }
        }
    }
}

/// Rebuild a long name from its slots in on-disk order (highest ordinal first).
pub fn assemble(chain: &[RawEntry], max: usize) -> String {
    let mut name = String::new();
    for slot in chain.iter().rev() {
        push_fragment(slot, &mut name, max);
    }
    name
}
