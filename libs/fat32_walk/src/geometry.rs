//! Volume geometry.
//!
//! The walker only needs a handful of numbers from the BIOS Parameter Block.
//! They are decoded once and then passed around by reference, never mutated.

use alloc::vec;

use crate::block_dev::{BlockDev, PROBE_LEN, locate_boot_sector, read_sector};
use crate::error::{FatError, Result};

/// Immutable layout of a FAT32 volume.
///
/// Sector numbers are relative to the volume. `volume_start` is the physical
/// LBA of the boot sector and is added whenever the device is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeGeometry {
    pub bytes_per_sector: u32,
    pub sectors_per_cluster: u32,
    pub reserved_sectors: u32,
    pub root_cluster: u32,
    pub first_data_sector: u32,
    /// Number of data clusters, which bounds the length of any chain.
    pub cluster_count: u32,
    pub volume_start: u64,
}

impl VolumeGeometry {
    /// Decode the BPB of a FAT32 boot sector.
    pub fn from_boot_sector(sec: &[u8], volume_start: u64) -> Result<Self> {
        if sec.len() < PROBE_LEN || sec[510] != 0x55 || sec[511] != 0xAA {
            return Err(FatError::NotFat32);
        }
        let u16_at = |off: usize| u16::from_le_bytes([sec[off], sec[off + 1]]) as u32;
        let u32_at = |off: usize| u32::from_le_bytes([sec[off], sec[off + 1], sec[off + 2], sec[off + 3]]);

        let bytes_per_sector = u16_at(11);
        let sectors_per_cluster = sec[13] as u32;
        let reserved_sectors = u16_at(14);
        let num_fats = sec[16] as u32;
        let total_sectors = match u16_at(19) {
            0 => u32_at(32),
            n => n,
        };
        let fat_size_16 = u16_at(22);
        let fat_size_32 = u32_at(36);
        let root_cluster = u32_at(44);

        // FAT12/FAT16 have fat_size_16 != 0; only FAT32 is supported.
        if fat_size_16 != 0 || fat_size_32 == 0 {
            return Err(FatError::NotFat32);
        }
        if !matches!(bytes_per_sector, 512 | 1024 | 2048 | 4096)
            || !sectors_per_cluster.is_power_of_two()
            || num_fats == 0
            || root_cluster < 2
        {
            return Err(FatError::NotFat32);
        }

        let first_data_sector = reserved_sectors + num_fats * fat_size_32;
        if total_sectors <= first_data_sector {
            return Err(FatError::NotFat32);
        }
        let cluster_count = (total_sectors - first_data_sector) / sectors_per_cluster;
        Ok(Self {
            bytes_per_sector,
            sectors_per_cluster,
            reserved_sectors,
            root_cluster,
            first_data_sector,
            cluster_count,
            volume_start,
        })
    }

    /// Locate the boot sector on `dev` and decode it.
    pub fn mount<D: BlockDev + ?Sized>(dev: &mut D) -> Result<Self> {
        let volume_start = locate_boot_sector(dev)?;
        let mut sec = vec![0u8; PROBE_LEN];
        read_sector(dev, volume_start, &mut sec)?;
        let geometry = Self::from_boot_sector(&sec, volume_start)?;
        log::debug!(
            "fat32: mounted, {} bytes/sector, {} sectors/cluster, data at {}, root cluster {}",
            geometry.bytes_per_sector,
            geometry.sectors_per_cluster,
            geometry.first_data_sector,
            geometry.root_cluster,
        );
        Ok(geometry)
    }

    pub fn sector_len(&self) -> usize {
        self.bytes_per_sector as usize
    }

    /// Physical LBA of the first sector of `cluster`. `cluster` must be >= 2.
    pub fn cluster_to_lba(&self, cluster: u32) -> u64 {
        self.volume_start
            + self.first_data_sector as u64
            + (cluster as u64 - 2) * self.sectors_per_cluster as u64
    }

    /// Physical LBA of a sector given relative to the volume.
    pub fn volume_lba(&self, sector: u32) -> u64 {
        self.volume_start + sector as u64
    }
}
