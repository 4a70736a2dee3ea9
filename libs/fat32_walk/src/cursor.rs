//! Directory-entry cursor.
//!
//! An [`EntryCursor`] walks the 32-byte slots of one directory, in order,
//! across sector and cluster boundaries. Each call to [`EntryCursor::advance`]
//! yields at most one logical entry: deleted slots are skipped, and a long-name
//! chain is folded together with the short-name record that closes it.
//!
//! The cursor owns all of its state, so a scan can be suspended between calls
//! and resumed later as long as the volume is not modified in between.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use bitflags::bitflags;

use crate::block_dev::{BlockDev, read_sector};
use crate::config::Limits;
use crate::entry::{DirEntry, ENTRY_LEN, RawEntry};
use crate::error::{FatError, Result};
use crate::fat::ClusterChain;
use crate::geometry::VolumeGeometry;
use crate::lfn;

bitflags! {
    /// Shape of the long-name chain behind the last entry found.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LongNameFlags: u8 {
        const EXISTS            = 1 << 0;
        /// The short-name record sits in a later sector than the chain start.
        const CROSSES_SECTOR    = 1 << 1;
        /// The short-name record is the last slot of its sector.
        const LAST_SECTOR_ENTRY = 1 << 2;
        /// The short-name record sits in a later cluster than the chain start.
        const CROSSES_CLUSTER   = 1 << 3;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Found(DirEntry),
    EndOfDirectory,
}

/// Location of a slot on the volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotPos {
    pub cluster: u32,
    /// Sector index inside the cluster.
    pub sector: u32,
    /// Byte offset inside the sector.
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Scanning,
    Finished,
    Failed(FatError),
}

pub struct EntryCursor {
    pos: SlotPos,
    chain: ClusterChain,
    /// Contents of the sector at `pos`, `None` until loaded.
    sector: Option<Vec<u8>>,
    /// The slot at `pos` has been consumed and must be stepped over first.
    consumed: bool,
    state: State,
    flags: LongNameFlags,
    last_short: Option<SlotPos>,
    limits: Limits,
}

impl EntryCursor {
    /// Start a scan at the first slot of the directory at `first_cluster`.
    ///
    /// Cluster 0 is how `..` records refer to the root directory, so it is
    /// accepted and resolved to the root cluster on the first advance.
    pub fn new(first_cluster: u32) -> Self {
        Self::with_limits(first_cluster, Limits::DEFAULT)
    }

    pub fn with_limits(first_cluster: u32, limits: Limits) -> Self {
        Self {
            pos: SlotPos { cluster: first_cluster, sector: 0, offset: 0 },
            chain: ClusterChain::new(first_cluster),
            sector: None,
            consumed: false,
            state: State::Scanning,
            flags: LongNameFlags::empty(),
            last_short: None,
            limits,
        }
    }

    /// Long-name flags of the last entry found.
    pub fn flags(&self) -> LongNameFlags {
        self.flags
    }

    /// Where the short-name record of the last entry found lives.
    pub fn last_short_slot(&self) -> Option<SlotPos> {
        self.last_short
    }

    /// Scan forward to the next logical entry.
    ///
    /// Once the end of the directory or an error has been reached the cursor
    /// keeps returning that outcome.
    pub fn advance<D: BlockDev + ?Sized>(&mut self, dev: &mut D, geometry: &VolumeGeometry) -> Result<Advance> {
        match self.state {
            State::Finished => return Ok(Advance::EndOfDirectory),
            State::Failed(e) => return Err(e),
            State::Scanning => {}
        }
        let outcome = self.scan(dev, geometry);
        match &outcome {
            Ok(Advance::EndOfDirectory) => self.state = State::Finished,
            Err(e) => self.state = State::Failed(*e),
            Ok(Advance::Found(_)) => {}
        }
        outcome
    }

    fn scan<D: BlockDev + ?Sized>(&mut self, dev: &mut D, geometry: &VolumeGeometry) -> Result<Advance> {
        if self.pos.cluster < 2 {
            self.pos.cluster = geometry.root_cluster;
            self.chain = ClusterChain::new(geometry.root_cluster);
        }
        if self.consumed {
            self.consumed = false;
            if !self.step(dev, geometry)? {
                return Ok(Advance::EndOfDirectory);
            }
        }

        loop {
            let slot = self.slot(dev, geometry)?;
            if slot.is_end() {
                return Ok(Advance::EndOfDirectory);
            }
            if slot.is_deleted() {
                if !self.step(dev, geometry)? {
                    return Ok(Advance::EndOfDirectory);
                }
                continue;
            }

            let entry = if slot.is_long_name() {
                self.fold_long_name(dev, geometry, slot)?
            } else {
                self.flags = LongNameFlags::empty();
                let short_name = slot.short_name();
                DirEntry { record: slot, long_name: short_name.clone(), short_name, long_name_slots: 0 }
            };
            self.last_short = Some(self.pos);
            self.consumed = true;
            return Ok(Advance::Found(entry));
        }
    }

    /// Consume a long-name chain starting at the current slot, leaving the
    /// cursor on its short-name record.
    fn fold_long_name<D: BlockDev + ?Sized>(
        &mut self,
        dev: &mut D,
        geometry: &VolumeGeometry,
        first: RawEntry,
    ) -> Result<DirEntry> {
        if !lfn::is_last(&first) {
            log::warn!("fat32: long-name chain at {:?} does not start with its last entry", self.pos);
            return Err(FatError::CorruptFatEntry);
        }
        let count = lfn::ordinal(&first);
        if count == 0 {
            log::warn!("fat32: long-name slot at {:?} has ordinal 0", self.pos);
            return Err(FatError::CorruptFatEntry);
        }

        let start = self.pos;
        let mut chain = Vec::with_capacity(count as usize);
        chain.push(first);
        for _ in 0..count {
            if !self.step(dev, geometry)? {
                log::warn!("fat32: directory ends inside the long-name chain at {start:?}");
                return Err(FatError::CorruptFatEntry);
            }
            chain.push(self.slot(dev, geometry)?);
        }
        let record = chain.pop().ok_or(FatError::CorruptFatEntry)?;

        if record.is_long_name() || record.is_end() || record.is_deleted() {
            log::warn!("fat32: no short-name record after the long-name chain at {start:?}");
            return Err(FatError::CorruptFatEntry);
        }
        for (i, slot) in chain.iter().enumerate() {
            let expected = count - i as u8;
            if !slot.is_long_name() || lfn::ordinal(slot) != expected {
                log::warn!("fat32: long-name chain at {start:?} breaks at ordinal {expected}");
                return Err(FatError::CorruptFatEntry);
            }
        }

        let mut flags = LongNameFlags::EXISTS;
        if self.pos.cluster != start.cluster {
            flags |= LongNameFlags::CROSSES_CLUSTER | LongNameFlags::CROSSES_SECTOR;
        } else if self.pos.sector != start.sector {
            flags |= LongNameFlags::CROSSES_SECTOR;
        }
        if self.pos.offset + ENTRY_LEN == geometry.sector_len() {
            flags |= LongNameFlags::LAST_SECTOR_ENTRY;
        }
        self.flags = flags;

        let long_name: String = lfn::assemble(&chain, self.limits.long_name_max);
        log::trace!("fat32: long name {long_name:?} over {count} slots, {flags:?}");
        Ok(DirEntry { record, short_name: record.short_name(), long_name, long_name_slots: count })
    }

    /// The slot under the cursor, loading its sector if needed.
    fn slot<D: BlockDev + ?Sized>(&mut self, dev: &mut D, geometry: &VolumeGeometry) -> Result<RawEntry> {
        let off = self.pos.offset;
        if let Some(sec) = &self.sector {
            return Ok(RawEntry::from_slot(&sec[off..off + ENTRY_LEN]));
        }
        let mut sec = vec![0u8; geometry.sector_len()];
        let lba = geometry.cluster_to_lba(self.pos.cluster) + self.pos.sector as u64;
        read_sector(dev, lba, &mut sec)?;
        let slot = RawEntry::from_slot(&sec[off..off + ENTRY_LEN]);
        self.sector = Some(sec);
        Ok(slot)
    }

    /// Move to the next slot, following the cluster chain when the current
    /// cluster is used up. Returns `false` at the end of the chain.
    fn step<D: BlockDev + ?Sized>(&mut self, dev: &mut D, geometry: &VolumeGeometry) -> Result<bool> {
        self.pos.offset += ENTRY_LEN;
        if self.pos.offset < geometry.sector_len() {
            return Ok(true);
        }
        self.pos.offset = 0;
        self.pos.sector += 1;
        self.sector = None;
        if self.pos.sector < geometry.sectors_per_cluster {
            return Ok(true);
        }
        if !self.chain.advance(dev, geometry)? {
            return Ok(false);
        }
        self.pos = SlotPos { cluster: self.chain.current(), sector: 0, offset: 0 };
        Ok(true)
    }
}
