//! Directory listing.

use alloc::string::String;

use bitflags::bitflags;

use crate::block_dev::BlockDev;
use crate::config::Limits;
use crate::cursor::{Advance, EntryCursor};
use crate::dir::DirectoryHandle;
use crate::entry::{DirEntry, EntryKind, FatDate, FatTime};
use crate::error::Result;
use crate::geometry::VolumeGeometry;

bitflags! {
    /// Which fields a listing fills in, plus whether hidden entries are shown.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FieldMask: u16 {
        const CREATION      = 1 << 0;
        const LAST_ACCESS   = 1 << 1;
        const LAST_MODIFIED = 1 << 2;
        const SIZE          = 1 << 3;
        const TYPE          = 1 << 4;
        const SHORT_NAME    = 1 << 5;
        const LONG_NAME     = 1 << 6;
        const CLUSTER       = 1 << 7;
        /// Include entries with the hidden attribute.
        const HIDDEN        = 1 << 8;
    }
}

/// The fields of one listed entry selected by a [`FieldMask`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFields {
    pub creation: Option<(FatDate, FatTime)>,
    pub last_access: Option<FatDate>,
    pub last_modified: Option<(FatDate, FatTime)>,
    pub size: Option<u32>,
    pub kind: Option<EntryKind>,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub first_cluster: Option<u32>,
}

impl EntryFields {
    pub fn select(entry: DirEntry, mask: FieldMask) -> Self {
        let r = entry.record;
        Self {
            creation: mask.contains(FieldMask::CREATION).then(|| (r.creation_date(), r.creation_time())),
            last_access: mask.contains(FieldMask::LAST_ACCESS).then(|| r.access_date()),
            last_modified: mask.contains(FieldMask::LAST_MODIFIED).then(|| (r.write_date(), r.write_time())),
            size: mask.contains(FieldMask::SIZE).then(|| r.size()),
            kind: mask.contains(FieldMask::TYPE).then(|| r.kind()),
            short_name: mask.contains(FieldMask::SHORT_NAME).then_some(entry.short_name),
            long_name: mask.contains(FieldMask::LONG_NAME).then_some(entry.long_name),
            first_cluster: mask.contains(FieldMask::CLUSTER).then(|| r.first_cluster()),
        }
    }
}

/// Forward-only listing of one directory.
///
/// Volume labels are never listed. After the first error the listing is
/// exhausted; start a new one to retry.
pub struct DirListing<'a, D: ?Sized> {
    dev: &'a mut D,
    geometry: VolumeGeometry,
    cursor: EntryCursor,
    mask: FieldMask,
    done: bool,
}

impl<'a, D: BlockDev + ?Sized> DirListing<'a, D> {
    pub fn new(dev: &'a mut D, geometry: &VolumeGeometry, dir: &DirectoryHandle, mask: FieldMask, limits: &Limits) -> Self {
        Self {
            dev,
            geometry: *geometry,
            cursor: EntryCursor::with_limits(dir.cluster(), *limits),
            mask,
            done: false,
        }
    }

    fn visible(&self, entry: &DirEntry) -> bool {
        if entry.record.is_volume_id() {
            return false;
        }
        self.mask.contains(FieldMask::HIDDEN) || !entry.record.is_hidden()
    }
}

impl<D: BlockDev + ?Sized> Iterator for DirListing<'_, D> {
    type Item = Result<EntryFields>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            match self.cursor.advance(&mut *self.dev, &self.geometry) {
                Ok(Advance::Found(entry)) => {
                    if self.visible(&entry) {
                        return Some(Ok(EntryFields::select(entry, self.mask)));
                    }
                }
                Ok(Advance::EndOfDirectory) => self.done = true,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

impl<D: BlockDev + ?Sized> core::iter::FusedIterator for DirListing<'_, D> {}

/// List `dir`, filling in the fields selected by `mask`.
pub fn list<'a, D: BlockDev + ?Sized>(
    dev: &'a mut D,
    geometry: &VolumeGeometry,
    dir: &DirectoryHandle,
    mask: FieldMask,
) -> DirListing<'a, D> {
    DirListing::new(dev, geometry, dir, mask, &Limits::DEFAULT)
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::io::Write;
    use std::string::String;
    use std::vec::Vec;

    use super::*;
    use crate::dir::resolve_child;
    use crate::error::FatError;
    use crate::testing::{Image, long_entry, make_disk, short_slot};

    fn long_names<D: BlockDev + ?Sized>(listing: DirListing<'_, D>) -> Vec<String> {
        listing.map(|f| f.unwrap().long_name.unwrap()).collect()
    }

    #[test]
    fn single_file_root() {
        let mut img = Image::new(1);
        img.write_slots(&[2], &[short_slot(b"FILE1   TXT", 0x20, 5, 12)]);
        let g = img.geometry;
        let root = DirectoryHandle::root(&g);

        let all: Vec<EntryFields> = list(&mut img.disk, &g, &root, FieldMask::all())
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].long_name.as_deref(), Some("FILE1.TXT"));
        assert_eq!(all[0].short_name.as_deref(), Some("FILE1.TXT"));
        assert_eq!(all[0].kind, Some(EntryKind::File));
        assert_eq!(all[0].size, Some(12));
        assert_eq!(all[0].first_cluster, Some(5));
    }

    #[test]
    fn mask_selects_fields() {
        let mut img = Image::new(1);
        let mut slot = short_slot(b"DATA    BIN", 0x20, 5, 99);
        slot[24..26].copy_from_slice(&0x5A8Eu16.to_le_bytes());
        img.write_slots(&[2], &[slot]);
        let g = img.geometry;
        let root = DirectoryHandle::root(&g);

        let only = list(&mut img.disk, &g, &root, FieldMask::SIZE | FieldMask::LAST_MODIFIED)
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(only.size, Some(99));
        assert_eq!(only.last_modified.map(|(d, _)| d), Some(FatDate(0x5A8E)));
        assert_eq!(only.long_name, None);
        assert_eq!(only.kind, None);
        assert_eq!(only.creation, None);
    }

    #[test]
    fn hidden_entries_and_labels() {
        let mut img = Image::new(1);
        img.write_slots(
            &[2],
            &[
                short_slot(b"MYVOLUME   ", 0x08, 0, 0),
                short_slot(b"SHOWN   TXT", 0x20, 0, 0),
                short_slot(b"SECRET  TXT", 0x22, 0, 0),
            ],
        );
        let g = img.geometry;
        let root = DirectoryHandle::root(&g);

        let visible = long_names(list(&mut img.disk, &g, &root, FieldMask::LONG_NAME));
        assert_eq!(visible, ["SHOWN.TXT"]);
        let everything = long_names(list(&mut img.disk, &g, &root, FieldMask::LONG_NAME | FieldMask::HIDDEN));
        assert_eq!(everything, ["SHOWN.TXT", "SECRET.TXT"]);
    }

    #[test]
    fn error_fuses_listing() {
        let mut img = Image::new(1);
        let mut slots = long_entry("broken chain", b"BROKEN~1   ", 0x20, 0, 0);
        slots[0][0] = 0x01;
        img.write_slots(&[2], &slots);
        let g = img.geometry;
        let root = DirectoryHandle::root(&g);

        let mut listing = list(&mut img.disk, &g, &root, FieldMask::LONG_NAME);
        assert_eq!(listing.next(), Some(Err(FatError::CorruptFatEntry)));
        assert_eq!(listing.next(), None);
    }

    #[test]
    fn listed_clusters_match_resolved_directories() {
        let mut disk = make_disk();
        {
            let fs = disk.fatfs();
            let root = fs.root_dir();
            for name in ["alpha directory", "BETA", "gamma with spaces"] {
                let dir = root.create_dir(name).unwrap();
                dir.create_file("inner file.txt").unwrap().write_all(name.as_bytes()).unwrap();
            }
            root.create_file("loose file.bin").unwrap().write_all(&[1, 2, 3]).unwrap();
        }
        let g = VolumeGeometry::mount(&mut disk).unwrap();
        let root = DirectoryHandle::root(&g);
        let mask = FieldMask::LONG_NAME | FieldMask::TYPE | FieldMask::CLUSTER;
        let entries: Vec<EntryFields> = list(&mut disk, &g, &root, mask).collect::<Result<_>>().unwrap();
        assert_eq!(entries.len(), 4);

        let mut dirs = 0;
        for e in entries.iter().filter(|e| e.kind == Some(EntryKind::Directory)) {
            let name = e.long_name.as_deref().unwrap();
            let mut h = DirectoryHandle::root(&g);
            resolve_child(&mut disk, &g, &mut h, name, &Limits::DEFAULT).unwrap();
            assert_eq!(Some(h.cluster()), e.first_cluster, "{name}");
            dirs += 1;
        }
        assert_eq!(dirs, 3);
    }

    #[test]
    fn fatfs_sizes_and_types() {
        let mut disk = make_disk();
        {
            let fs = disk.fatfs();
            let root = fs.root_dir();
            root.create_file("FILE1.TXT").unwrap().write_all(b"hello").unwrap();
            root.create_dir("SUBDIR").unwrap();
        }
        let g = VolumeGeometry::mount(&mut disk).unwrap();
        let root = DirectoryHandle::root(&g);
        let entries: Vec<EntryFields> = list(&mut disk, &g, &root, FieldMask::all())
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].long_name.as_deref(), Some("FILE1.TXT"));
        assert_eq!(entries[0].size, Some(5));
        assert_eq!(entries[1].kind, Some(EntryKind::Directory));
        assert_eq!(entries[1].short_name.as_deref(), Some("SUBDIR"));
    }
}
