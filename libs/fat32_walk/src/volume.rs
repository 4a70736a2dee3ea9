//! A mounted volume: device, geometry and settings kept together.

use crate::block_dev::BlockDev;
use crate::config::{EofPolicy, Limits};
use crate::dir::{self, DirectoryHandle};
use crate::entry::{DirEntry, EntryKind};
use crate::error::{FatError, Result};
use crate::geometry::VolumeGeometry;
use crate::list::{DirListing, FieldMask};
use crate::name::check_component;
use crate::stream::{self, FileStream};

pub struct Fat32<D: BlockDev> {
    dev: D,
    geometry: VolumeGeometry,
    limits: Limits,
    eof_policy: EofPolicy,
}

impl<D: BlockDev> Fat32<D> {
    pub fn new(dev: D, geometry: VolumeGeometry) -> Self {
        Self { dev, geometry, limits: Limits::DEFAULT, eof_policy: EofPolicy::default() }
    }

    /// Find the boot sector on `dev`, decode it and wrap the device.
    pub fn mount(mut dev: D) -> Result<Self> {
        let geometry = VolumeGeometry::mount(&mut dev)?;
        Ok(Self::new(dev, geometry))
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_eof_policy(mut self, policy: EofPolicy) -> Self {
        self.eof_policy = policy;
        self
    }

    pub fn geometry(&self) -> &VolumeGeometry {
        &self.geometry
    }

    pub fn root(&self) -> DirectoryHandle {
        DirectoryHandle::root(&self.geometry)
    }

    pub fn resolve_child(&mut self, handle: &mut DirectoryHandle, name: &str) -> Result<()> {
        dir::resolve_child(&mut self.dev, &self.geometry, handle, name, &self.limits)
    }

    pub fn resolve_parent(&mut self, handle: &mut DirectoryHandle) -> Result<()> {
        dir::resolve_parent(&mut self.dev, &self.geometry, handle)
    }

    /// Look up any non-label entry called `name` in `dir`, directories first.
    pub fn lookup(&mut self, dir: &DirectoryHandle, name: &str) -> Result<DirEntry> {
        check_component(dir, name, &self.limits)?;
        match dir::find_entry(&mut self.dev, &self.geometry, dir, name, EntryKind::Directory, &self.limits) {
            Err(FatError::NotFound) => {
                dir::find_entry(&mut self.dev, &self.geometry, dir, name, EntryKind::File, &self.limits)
            }
            other => other,
        }
    }

    pub fn list(&mut self, dir: &DirectoryHandle, mask: FieldMask) -> DirListing<'_, D> {
        DirListing::new(&mut self.dev, &self.geometry, dir, mask, &self.limits)
    }

    pub fn open_file(&mut self, dir: &DirectoryHandle, name: &str) -> Result<FileStream<'_, D>> {
        stream::open_file(&mut self.dev, &self.geometry, dir, name, self.eof_policy, &self.limits)
    }
}
