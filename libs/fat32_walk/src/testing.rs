// Test fixtures shared by the unit tests: an in-memory block device, images
// formatted by `fatfs`, and byte-exact images built slot by slot.

extern crate std;
use std::io::Cursor;
use std::vec;
use std::vec::Vec;

use crate::block_dev::BlockDev;
use crate::fat::FAT32_EOC;
use crate::geometry::VolumeGeometry;

pub const SECTOR: usize = 512;

// ── Mock block device backed by Vec<u8> ──────────────────────────────────────

pub struct MemDisk {
    pub bytes: Vec<u8>,
    /// Sector whose read reports failure.
    pub fail_at: Option<u64>,
    pub reads: usize,
}

impl MemDisk {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, fail_at: None, reads: 0 }
    }

    /// Open the image with `fatfs` to populate it.
    pub fn fatfs(&mut self) -> fatfs::FileSystem<Cursor<&mut Vec<u8>>> {
        fatfs::FileSystem::new(Cursor::new(&mut self.bytes), fatfs::FsOptions::new())
            .expect("FileSystem::new failed")
    }
}

impl BlockDev for MemDisk {
    fn read(&mut self, lba: u64, buf: &mut [u8]) -> bool {
        self.reads += 1;
        if self.fail_at == Some(lba) {
            return false;
        }
        let off = lba as usize * buf.len();
        if off + buf.len() > self.bytes.len() {
            return false;
        }
        buf.copy_from_slice(&self.bytes[off..off + buf.len()]);
        true
    }
}

/// Create an in-memory FAT32 image using the `fatfs` std crate.
///
/// FAT32 needs at least 65 525 data clusters; with the `Fat32` type hint
/// `fatfs` picks 512-byte clusters, so 40 MB is comfortably above the minimum.
pub fn make_disk() -> MemDisk {
    const SIZE: usize = 40 * 1024 * 1024;
    let mut cursor = Cursor::new(vec![0u8; SIZE]);
    fatfs::format_volume(
        &mut cursor,
        fatfs::FormatVolumeOptions::new().fat_type(fatfs::FatType::Fat32),
    )
    .expect("format_volume failed");
    MemDisk::new(cursor.into_inner())
}

// ── Hand-built images ────────────────────────────────────────────────────────

pub const IMAGE_RESERVED: u32 = 4;
const IMAGE_FAT_SECTORS: u32 = 96;
const IMAGE_CLUSTERS: u32 = 64;

/// A tiny FAT32 volume laid out by hand: 4 reserved sectors, one FAT of 96
/// sectors, data region at sector 100, root directory in cluster 2.
pub struct Image {
    pub disk: MemDisk,
    pub geometry: VolumeGeometry,
}

impl Image {
    pub fn new(sectors_per_cluster: u32) -> Self {
        let data_start = IMAGE_RESERVED + IMAGE_FAT_SECTORS;
        let total = (data_start + IMAGE_CLUSTERS * sectors_per_cluster) as usize;
        let mut bytes = vec![0u8; total * SECTOR];

        let bpb = &mut bytes[..SECTOR];
        bpb[0..3].copy_from_slice(&[0xEB, 0x58, 0x90]);
        bpb[11..13].copy_from_slice(&(SECTOR as u16).to_le_bytes());
        bpb[13] = sectors_per_cluster as u8;
        bpb[14..16].copy_from_slice(&(IMAGE_RESERVED as u16).to_le_bytes());
        bpb[16] = 1;
        bpb[32..36].copy_from_slice(&(total as u32).to_le_bytes());
        bpb[36..40].copy_from_slice(&IMAGE_FAT_SECTORS.to_le_bytes());
        bpb[44..48].copy_from_slice(&2u32.to_le_bytes());
        bpb[510..512].copy_from_slice(&[0x55, 0xAA]);

        let geometry = VolumeGeometry::from_boot_sector(&bytes[..SECTOR], 0).expect("bad test BPB");
        let mut img = Self { disk: MemDisk::new(bytes), geometry };
        img.set_fat(0, 0x0FFF_FFF8);
        img.set_fat(1, 0x0FFF_FFFF);
        img.set_fat(2, 0x0FFF_FFFF);
        img
    }

    pub fn set_fat(&mut self, cluster: u32, value: u32) {
        let off = IMAGE_RESERVED as usize * SECTOR + cluster as usize * 4;
        self.disk.bytes[off..off + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Link `clusters` in order and terminate the chain.
    pub fn chain(&mut self, clusters: &[u32]) {
        for pair in clusters.windows(2) {
            self.set_fat(pair[0], pair[1]);
        }
        if let Some(&last) = clusters.last() {
            self.set_fat(last, FAT32_EOC);
        }
    }

    pub fn cluster_len(&self) -> usize {
        self.geometry.sectors_per_cluster as usize * SECTOR
    }

    pub fn cluster_mut(&mut self, cluster: u32) -> &mut [u8] {
        let off = self.geometry.cluster_to_lba(cluster) as usize * SECTOR;
        let len = self.cluster_len();
        &mut self.disk.bytes[off..off + len]
    }

    /// Chain `clusters` and lay `data` out across them.
    pub fn write_data(&mut self, clusters: &[u32], data: &[u8]) {
        self.chain(clusters);
        let len = self.cluster_len();
        assert!(data.len() <= clusters.len() * len, "data does not fit");
        for (chunk, &cluster) in data.chunks(len).zip(clusters) {
            self.cluster_mut(cluster)[..chunk.len()].copy_from_slice(chunk);
        }
    }

    /// Chain `clusters` and write `slots` back to back from the first slot.
    pub fn write_slots(&mut self, clusters: &[u32], slots: &[[u8; 32]]) {
        let bytes: Vec<u8> = slots.iter().flatten().copied().collect();
        self.write_data(clusters, &bytes);
    }
}

// ── Directory slot builders ──────────────────────────────────────────────────

pub fn short_slot(name: &[u8; 11], attr: u8, cluster: u32, size: u32) -> [u8; 32] {
    let mut slot = [0u8; 32];
    slot[0..11].copy_from_slice(name);
    slot[11] = attr;
    slot[20..22].copy_from_slice(&((cluster >> 16) as u16).to_le_bytes());
    slot[26..28].copy_from_slice(&(cluster as u16).to_le_bytes());
    slot[28..32].copy_from_slice(&size.to_le_bytes());
    slot
}

/// A deleted slot, skipped by every scan. Handy as padding.
pub fn deleted_slot() -> [u8; 32] {
    let mut slot = short_slot(b"_DELETEDTXT", 0x20, 0, 0);
    slot[0] = 0xE5;
    slot
}

pub fn padding(count: usize) -> Vec<[u8; 32]> {
    vec![deleted_slot(); count]
}

fn lfn_checksum(short: &[u8; 11]) -> u8 {
    short.iter().fold(0u8, |sum, &b| sum.rotate_right(1).wrapping_add(b))
}

const UNIT_OFFSETS: [usize; 13] = [1, 3, 5, 7, 9, 14, 16, 18, 20, 22, 24, 28, 30];

/// Long-name slots for `long` in on-disk order followed by the short record.
pub fn long_entry(long: &str, short: &[u8; 11], attr: u8, cluster: u32, size: u32) -> Vec<[u8; 32]> {
    let mut units: Vec<u16> = long.encode_utf16().collect();
    if units.len() % 13 != 0 {
        units.push(0);
        while units.len() % 13 != 0 {
            units.push(0xFFFF);
        }
    }
    let count = units.len() / 13;
    let checksum = lfn_checksum(short);

    let mut slots = Vec::with_capacity(count + 1);
    for ord in (1..=count).rev() {
        let mut slot = [0u8; 32];
        slot[0] = ord as u8 | if ord == count { 0x40 } else { 0 };
        slot[11] = 0x0F;
        slot[13] = checksum;
        for (unit, off) in units[(ord - 1) * 13..ord * 13].iter().zip(UNIT_OFFSETS) {
            slot[off..off + 2].copy_from_slice(&unit.to_le_bytes());
        }
        slots.push(slot);
    }
    slots.push(short_slot(short, attr, cluster, size));
    slots
}
