//! Cluster-chain resolver.
//!
//! The FAT is an array of 32-bit little-endian links packed into sectors right
//! after the reserved area. Only the low 28 bits are meaningful.

use alloc::vec;

use crate::block_dev::{BlockDev, read_sector};
use crate::error::{FatError, Result};
use crate::geometry::VolumeGeometry;

pub const FAT32_EOC: u32 = 0x0FFF_FFF8;
pub const FAT32_BAD: u32 = 0x0FFF_FFF7;
const FAT32_MASK: u32 = 0x0FFF_FFFF;
const FAT_ENTRY_LEN: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextCluster {
    Next(u32),
    EndOfChain,
}

/// Interpret a raw FAT link read for `current`.
pub fn classify(current: u32, raw: u32) -> Result<NextCluster> {
    let link = raw & FAT32_MASK;
    if link >= FAT32_EOC {
        return Ok(NextCluster::EndOfChain);
    }
    if link < 2 || link == FAT32_BAD {
        log::warn!("fat32: cluster {current:#x} links to unusable cluster {link:#x}");
        return Err(FatError::CorruptFatEntry);
    }
    Ok(NextCluster::Next(link))
}

/// Look up the successor of `current` in the first FAT.
pub fn next_cluster<D: BlockDev + ?Sized>(
    dev: &mut D,
    geometry: &VolumeGeometry,
    current: u32,
) -> Result<NextCluster> {
    let per_sector = geometry.bytes_per_sector / FAT_ENTRY_LEN;
    let fat_sector = geometry.reserved_sectors + current / per_sector;
    let off = (FAT_ENTRY_LEN * (current % per_sector)) as usize;

    let mut sec = vec![0u8; geometry.sector_len()];
    read_sector(dev, geometry.volume_lba(fat_sector), &mut sec)?;
    let raw = u32::from_le_bytes([sec[off], sec[off + 1], sec[off + 2], sec[off + 3]]);
    log::trace!("fat32: cluster {current:#x} -> {raw:#x}");
    classify(current, raw)
}

/// Position in a cluster chain, moved forward one link at a time.
///
/// A chain never has more links than the volume has clusters. Walking past that
/// means the FAT loops back on itself, which is reported as corruption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterChain {
    current: u32,
    links: u32,
}

impl ClusterChain {
    pub fn new(first: u32) -> Self {
        Self { current: first, links: 0 }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    /// Follow the link out of the current cluster. Returns `false` at the end
    /// of the chain.
    pub fn advance<D: BlockDev + ?Sized>(&mut self, dev: &mut D, geometry: &VolumeGeometry) -> Result<bool> {
        if self.links >= geometry.cluster_count {
            log::warn!("fat32: chain through cluster {:#x} is longer than the volume", self.current);
            return Err(FatError::CorruptFatEntry);
        }
        match next_cluster(dev, geometry, self.current)? {
            NextCluster::Next(cluster) => {
                self.current = cluster;
                self.links += 1;
                Ok(true)
            }
            NextCluster::EndOfChain => Ok(false),
        }
    }
}
