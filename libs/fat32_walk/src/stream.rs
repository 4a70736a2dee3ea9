//! Sector-by-sector file reads.

use alloc::vec;
use alloc::vec::Vec;

use crate::block_dev::{BlockDev, read_sector};
use crate::config::{EofPolicy, Limits};
use crate::dir::{DirectoryHandle, find_entry};
use crate::entry::{EntryKind, RawEntry};
use crate::error::Result;
use crate::fat::ClusterChain;
use crate::geometry::VolumeGeometry;
use crate::name::check_component;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStep {
    /// Up to one sector of file content.
    Data(Vec<u8>),
    EndOfFile,
}

/// Reads a file's cluster chain one sector at a time.
///
/// Under [`EofPolicy::ZeroTail`] a sector that ends in zero bytes is taken to
/// hold the end of the file, and everything after it is ignored.
pub struct FileStream<'a, D: ?Sized> {
    dev: &'a mut D,
    geometry: VolumeGeometry,
    policy: EofPolicy,
    chain: ClusterChain,
    sector: u32,
    /// Bytes left under [`EofPolicy::RecordedSize`].
    remaining: u32,
    done: bool,
}

impl<'a, D: BlockDev + ?Sized> FileStream<'a, D> {
    pub fn new(dev: &'a mut D, geometry: &VolumeGeometry, record: &RawEntry, policy: EofPolicy) -> Self {
        let cluster = record.first_cluster();
        Self {
            dev,
            geometry: *geometry,
            policy,
            chain: ClusterChain::new(cluster),
            sector: 0,
            remaining: record.size(),
            done: cluster < 2,
        }
    }

    /// Read the next sector's worth of content.
    pub fn next_chunk(&mut self) -> Result<StreamStep> {
        if self.done {
            return Ok(StreamStep::EndOfFile);
        }
        match self.read_chunk() {
            Ok(StreamStep::Data(data)) if data.is_empty() => {
                self.done = true;
                Ok(StreamStep::EndOfFile)
            }
            Ok(step) => {
                if step == StreamStep::EndOfFile {
                    self.done = true;
                }
                Ok(step)
            }
            Err(e) => {
                self.done = true;
                Err(e)
            }
        }
    }

    fn read_chunk(&mut self) -> Result<StreamStep> {
        if self.policy == EofPolicy::RecordedSize && self.remaining == 0 {
            return Ok(StreamStep::EndOfFile);
        }

        let mut sec = vec![0u8; self.geometry.sector_len()];
        let lba = self.geometry.cluster_to_lba(self.chain.current()) + self.sector as u64;
        read_sector(&mut *self.dev, lba, &mut sec)?;

        match self.policy {
            EofPolicy::ZeroTail => {
                let end = sec.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                if end < sec.len() {
                    log::trace!("fat32: zero tail at byte {end} of lba {lba:#x}");
                    sec.truncate(end);
                    self.done = true;
                    return Ok(StreamStep::Data(sec));
                }
            }
            EofPolicy::RecordedSize => {
                let take = (self.remaining as usize).min(sec.len());
                sec.truncate(take);
                self.remaining -= take as u32;
            }
        }

        self.sector += 1;
        if self.sector == self.geometry.sectors_per_cluster {
            self.sector = 0;
            if !self.chain.advance(&mut *self.dev, &self.geometry)? {
                self.done = true;
            }
        }
        Ok(StreamStep::Data(sec))
    }

    /// Collect the rest of the file.
    pub fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for chunk in self {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }
}

impl<D: BlockDev + ?Sized> Iterator for FileStream<'_, D> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_chunk() {
            Ok(StreamStep::Data(data)) => Some(Ok(data)),
            Ok(StreamStep::EndOfFile) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Find the file `name` in `dir` and start streaming it.
pub fn open_file<'a, D: BlockDev + ?Sized>(
    dev: &'a mut D,
    geometry: &VolumeGeometry,
    dir: &DirectoryHandle,
    name: &str,
    policy: EofPolicy,
    limits: &Limits,
) -> Result<FileStream<'a, D>> {
    check_component(dir, name, limits)?;
    let entry = find_entry(&mut *dev, geometry, dir, name, EntryKind::File, limits)?;
    log::debug!(
        "fat32: opened {name:?}, {} bytes from cluster {:#x}",
        entry.record.size(),
        entry.record.first_cluster()
    );
    Ok(FileStream::new(dev, geometry, &entry.record, policy))
}
