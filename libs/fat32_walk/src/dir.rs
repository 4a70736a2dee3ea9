//! Working directory handle and single-component navigation.

use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;

use crate::block_dev::{BlockDev, read_sector};
use crate::config::Limits;
use crate::cursor::{Advance, EntryCursor};
use crate::entry::{DirEntry, ENTRY_LEN, EntryKind, RawEntry};
use crate::error::{FatError, Result};
use crate::geometry::VolumeGeometry;
use crate::name::{check_name, check_path_len};

const ROOT_NAME: &str = "/";

/// Offset of the `..` record inside a directory's first sector.
const DOT_DOT_OFFSET: usize = 32;

/// A directory being browsed, with the names of every directory above it.
///
/// Paths are kept as stacks of segments and only joined on request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryHandle {
    cluster: u32,
    short_name: String,
    long_name: String,
    short_parents: Vec<String>,
    long_parents: Vec<String>,
}

impl DirectoryHandle {
    pub fn root(geometry: &VolumeGeometry) -> Self {
        Self::at_root(geometry.root_cluster)
    }

    pub fn at_root(root_cluster: u32) -> Self {
        Self {
            cluster: root_cluster,
            short_name: ROOT_NAME.to_string(),
            long_name: ROOT_NAME.to_string(),
            short_parents: Vec::new(),
            long_parents: Vec::new(),
        }
    }

    pub fn cluster(&self) -> u32 {
        self.cluster
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    pub fn long_name(&self) -> &str {
        &self.long_name
    }

    pub fn is_root(&self) -> bool {
        self.long_parents.is_empty()
    }

    /// Number of directories above this one.
    pub fn depth(&self) -> usize {
        self.long_parents.len()
    }

    pub fn long_path(&self) -> String {
        join(&self.long_parents, &self.long_name)
    }

    pub fn short_path(&self) -> String {
        join(&self.short_parents, &self.short_name)
    }

    /// Length of the long path of a child called `name`.
    pub fn child_path_len(&self, name: &str) -> usize {
        let base = if self.is_root() { 0 } else { self.long_path().len() };
        base + 1 + name.len()
    }

    fn descend(&mut self, cluster: u32, short_name: String, long_name: String) {
        let old_short = core::mem::replace(&mut self.short_name, short_name);
        let old_long = core::mem::replace(&mut self.long_name, long_name);
        self.short_parents.push(old_short);
        self.long_parents.push(old_long);
        self.cluster = cluster;
    }

    fn reset_to_root(&mut self, root_cluster: u32) {
        *self = Self::at_root(root_cluster);
    }
}

fn join(parents: &[String], name: &str) -> String {
    if parents.is_empty() {
        return String::from(ROOT_NAME);
    }
    let mut path = String::new();
    // parents[0] is the root, which contributes only the leading separator
    for segment in parents[1..].iter().map(String::as_str).chain([name]) {
        path.push('/');
        path.push_str(segment);
    }
    path
}

/// Scan `dir` for an entry of the given kind whose long name is exactly `name`.
///
/// Volume labels never match.
pub fn find_entry<D: BlockDev + ?Sized>(
    dev: &mut D,
    geometry: &VolumeGeometry,
    dir: &DirectoryHandle,
    name: &str,
    kind: EntryKind,
    limits: &Limits,
) -> Result<DirEntry> {
    let mut cursor = EntryCursor::with_limits(dir.cluster, *limits);
    loop {
        match cursor.advance(&mut *dev, geometry)? {
            Advance::Found(entry) => {
                if entry.record.is_volume_id() || entry.record.kind() != kind {
                    continue;
                }
                if entry.long_name == name {
                    return Ok(entry);
                }
            }
            Advance::EndOfDirectory => {
                log::debug!("fat32: {name:?} not found in {:?}", dir.long_name);
                return Err(FatError::NotFound);
            }
        }
    }
}

/// Move `handle` into its child directory `name`.
///
/// `"."` leaves the handle alone and `".."` goes up one level. On any error the
/// handle is unchanged.
pub fn resolve_child<D: BlockDev + ?Sized>(
    dev: &mut D,
    geometry: &VolumeGeometry,
    handle: &mut DirectoryHandle,
    name: &str,
    limits: &Limits,
) -> Result<()> {
    check_name(name, limits)?;
    match name {
        "." => return Ok(()),
        ".." => return resolve_parent(dev, geometry, handle),
        _ => {}
    }
    check_path_len(handle, name, limits)?;

    let entry = find_entry(dev, geometry, handle, name, EntryKind::Directory, limits)?;
    let cluster = entry.record.first_cluster();
    log::debug!("fat32: entered {name:?} at cluster {cluster:#x}");
    if cluster < 2 || cluster == geometry.root_cluster {
        // Only `..`-style records point back at the root
        handle.reset_to_root(geometry.root_cluster);
    } else {
        handle.descend(cluster, entry.short_name, String::from(name));
    }
    Ok(())
}

/// Move `handle` to its parent directory. At the root this does nothing.
pub fn resolve_parent<D: BlockDev + ?Sized>(
    dev: &mut D,
    geometry: &VolumeGeometry,
    handle: &mut DirectoryHandle,
) -> Result<()> {
    if handle.is_root() {
        return Ok(());
    }

    let parent = parent_cluster(dev, geometry, handle.cluster)?;
    match (handle.short_parents.pop(), handle.long_parents.pop()) {
        (Some(short), Some(long)) if parent >= 2 && parent != geometry.root_cluster => {
            handle.cluster = parent;
            handle.short_name = short;
            handle.long_name = long;
        }
        _ => handle.reset_to_root(geometry.root_cluster),
    }
    log::debug!("fat32: up to {:?} at cluster {:#x}", handle.long_name, handle.cluster);
    Ok(())
}

fn is_dot_dot(record: &RawEntry) -> bool {
    record.is_dir() && record.short_name() == ".."
}

/// First cluster named by the `..` record of the directory at `cluster`.
fn parent_cluster<D: BlockDev + ?Sized>(dev: &mut D, geometry: &VolumeGeometry, cluster: u32) -> Result<u32> {
    let mut sec = vec![0u8; geometry.sector_len()];
    read_sector(dev, geometry.cluster_to_lba(cluster), &mut sec)?;
    let dot_dot = RawEntry::from_slot(&sec[DOT_DOT_OFFSET..DOT_DOT_OFFSET + ENTRY_LEN]);
    if is_dot_dot(&dot_dot) {
        return Ok(dot_dot.first_cluster());
    }

    // Some formatters put long-name slots in front of `.` and `..`
    let mut cursor = EntryCursor::new(cluster);
    while let Advance::Found(entry) = cursor.advance(&mut *dev, geometry)? {
        if cursor.last_short_slot().is_some_and(|pos| pos.cluster != cluster) {
            break;
        }
        if is_dot_dot(&entry.record) {
            return Ok(entry.record.first_cluster());
        }
    }
    log::warn!("fat32: directory at cluster {cluster:#x} has no .. record");
    Err(FatError::CorruptFatEntry)
}
