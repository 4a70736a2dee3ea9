use core::fmt;

/// Failure kinds reported by the walker.
///
/// End of directory and end of file are not errors: they are the terminal
/// variants of [`crate::Advance`] and [`crate::StreamStep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatError {
    /// A path component failed validation, or would overflow the path limit.
    InvalidName,
    /// A directory entry or FAT link breaks the on-disk chain rules.
    CorruptFatEntry,
    /// The block device reported a failed sector read.
    ReadFailure { lba: u64 },
    /// The scan reached the end of the directory without a match.
    NotFound,
    /// No FAT32 boot sector where one was expected.
    NotFat32,
}

pub type Result<T> = core::result::Result<T, FatError>;

impl fmt::Display for FatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatError::InvalidName => write!(f, "invalid name"),
            FatError::CorruptFatEntry => write!(f, "corrupt FAT entry"),
            FatError::ReadFailure { lba } => write!(f, "failed to read sector {lba:#x}"),
            FatError::NotFound => write!(f, "directory or file not found"),
            FatError::NotFat32 => write!(f, "not a FAT32 volume"),
        }
    }
}

impl core::error::Error for FatError {}
