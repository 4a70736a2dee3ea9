//! Block device boundary.
//!
//! The walker never touches hardware: every sector comes through [`BlockDev`],
//! which keeps the whole crate testable against an in-memory disk.

use crate::error::{FatError, Result};

const MBR_SIGNATURE: [u8; 2] = [0x55, 0xAA];
const MBR_FIRST_PARTITION_LBA: usize = 454;

/// Bytes probed when looking for the boot sector, before the real sector size is known.
pub const PROBE_LEN: usize = 512;

pub trait BlockDev {
    /// Read the sector at `lba` into `buf`, filling `buf.len()` bytes.
    /// Returns `false` if the device could not deliver the sector.
    fn read(&mut self, lba: u64, buf: &mut [u8]) -> bool;
}

impl<D: BlockDev + ?Sized> BlockDev for &mut D {
    fn read(&mut self, lba: u64, buf: &mut [u8]) -> bool {
        (**self).read(lba, buf)
    }
}

/// Read one sector, turning a device failure into [`FatError::ReadFailure`].
pub(crate) fn read_sector<D: BlockDev + ?Sized>(dev: &mut D, lba: u64, buf: &mut [u8]) -> Result<()> {
    if dev.read(lba, buf) {
        Ok(())
    } else {
        log::warn!("fat32: sector read failed at lba {lba:#x}");
        Err(FatError::ReadFailure { lba })
    }
}

fn is_boot_sector(sec: &[u8]) -> bool {
    sec[510..512] == MBR_SIGNATURE && (sec[0] == 0xEB || sec[0] == 0xE9)
}

/// Find the physical LBA of the volume's boot sector.
///
/// A raw image carries it at LBA 0. Otherwise sector 0 must be an MBR and the
/// first partition entry points at the volume.
pub fn locate_boot_sector<D: BlockDev + ?Sized>(dev: &mut D) -> Result<u64> {
    let mut sec = [0u8; PROBE_LEN];
    read_sector(dev, 0, &mut sec)?;
    if is_boot_sector(&sec) {
        return Ok(0);
    }
    if sec[510..512] != MBR_SIGNATURE {
        return Err(FatError::NotFat32);
    }

    let off = MBR_FIRST_PARTITION_LBA;
    let lba = u32::from_le_bytes([sec[off], sec[off + 1], sec[off + 2], sec[off + 3]]) as u64;
    if lba == 0 {
        return Err(FatError::NotFat32);
    }
    read_sector(dev, lba, &mut sec)?;
    if !is_boot_sector(&sec) {
        return Err(FatError::NotFat32);
    }
    log::debug!("fat32: boot sector found through MBR at lba {lba:#x}");
    Ok(lba)
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec;

    use super::*;
    use crate::testing::{MemDisk, make_disk};

    #[test]
    fn raw_image_boot_sector_is_lba_0() {
        let mut disk = make_disk();
        assert_eq!(locate_boot_sector(&mut disk), Ok(0));
    }

    #[test]
    fn boot_sector_behind_mbr() {
        const PART_LBA: usize = 63;
        let volume = make_disk();
        let mut image = vec![0u8; PART_LBA * 512];
        image[MBR_FIRST_PARTITION_LBA..MBR_FIRST_PARTITION_LBA + 4]
            .copy_from_slice(&(PART_LBA as u32).to_le_bytes());
        image[510..512].copy_from_slice(&MBR_SIGNATURE);
        image.extend_from_slice(&volume.bytes);

        let mut disk = MemDisk::new(image);
        assert_eq!(locate_boot_sector(&mut disk), Ok(PART_LBA as u64));
    }

    #[test]
    fn blank_disk_is_not_fat32() {
        let mut disk = MemDisk::new(vec![0u8; 8 * 512]);
        assert_eq!(locate_boot_sector(&mut disk), Err(FatError::NotFat32));
    }

    #[test]
    fn mbr_with_empty_partition_table() {
        let mut image = vec![0u8; 8 * 512];
        image[510..512].copy_from_slice(&MBR_SIGNATURE);
        let mut disk = MemDisk::new(image);
        assert_eq!(locate_boot_sector(&mut disk), Err(FatError::NotFat32));
    }

    #[test]
    fn read_failure_carries_lba() {
        let mut disk = MemDisk::new(vec![0u8; 8 * 512]);
        disk.fail_at = Some(0);
        assert_eq!(locate_boot_sector(&mut disk), Err(FatError::ReadFailure { lba: 0 }));
    }
}
