//! Tunables shared by the walker.

/// Longest long name FAT allows (in characters).
pub const LONG_NAME_MAX: usize = 255;

/// Default bound on a joined directory path, separators included.
pub const PATH_MAX: usize = 512;

/// Size bounds applied to names and paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub long_name_max: usize,
    pub path_max: usize,
}

impl Limits {
    pub const DEFAULT: Self = Self {
        long_name_max: LONG_NAME_MAX,
        path_max: PATH_MAX,
    };
}

impl Default for Limits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// How a [`crate::FileStream`] decides a file has ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EofPolicy {
    /// A sector whose remainder is all zero bytes ends the file, even if the
    /// cluster chain continues. Files with a genuine zero tail are truncated.
    #[default]
    ZeroTail,
    /// Stop after the number of bytes recorded in the directory entry.
    RecordedSize,
}
