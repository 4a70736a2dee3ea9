//! Path component validation.

use crate::config::Limits;
use crate::dir::DirectoryHandle;
use crate::error::{FatError, Result};

const ILLEGAL_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Whether `name` may be used as a single path component.
///
/// Long-name-only characters (spaces inside, lowercase, extra dots) are fine.
pub fn is_legal(name: &str, limits: &Limits) -> bool {
    if name.is_empty() || name.chars().count() > limits.long_name_max {
        return false;
    }
    if name.starts_with(' ') || name.chars().all(|c| c == ' ') {
        return false;
    }
    !name.contains(ILLEGAL_CHARS)
}

pub fn check_name(name: &str, limits: &Limits) -> Result<()> {
    if !is_legal(name, limits) {
        log::debug!("fat32: rejected name {name:?}");
        return Err(FatError::InvalidName);
    }
    Ok(())
}

/// Fails when a child `name` would push the long path of `dir` past `limits.path_max`.
pub fn check_path_len(dir: &DirectoryHandle, name: &str, limits: &Limits) -> Result<()> {
    if dir.child_path_len(name) > limits.path_max {
        log::debug!("fat32: path below {:?} would exceed {} bytes", dir.long_name(), limits.path_max);
        return Err(FatError::InvalidName);
    }
    Ok(())
}

/// Validate `name` as the next component below `dir`.
pub fn check_component(dir: &DirectoryHandle, name: &str, limits: &Limits) -> Result<()> {
    check_name(name, limits)?;
    check_path_len(dir, name, limits)
}
