// Library crate root. No_std outside of tests so the walker can run on bare metal;
// `cargo test -p fat32_walk` builds it against std on the host.
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod block_dev;
pub mod config;
pub mod cursor;
pub mod dir;
pub mod entry;
pub mod error;
pub mod fat;
pub mod geometry;
pub mod lfn;
pub mod list;
pub mod name;
pub mod stream;
pub mod volume;

#[cfg(test)]
mod testing;

pub use block_dev::BlockDev;
pub use config::{EofPolicy, Limits};
pub use cursor::{Advance, EntryCursor, LongNameFlags};
pub use dir::{DirectoryHandle, find_entry, resolve_child, resolve_parent};
pub use entry::{Attributes, DirEntry, EntryKind, FatDate, FatTime, RawEntry};
pub use error::{FatError, Result};
pub use fat::{ClusterChain, NextCluster};
pub use geometry::VolumeGeometry;
pub use list::{DirListing, EntryFields, FieldMask, list};
pub use name::is_legal;
pub use stream::{FileStream, StreamStep, open_file};
pub use volume::Fat32;
