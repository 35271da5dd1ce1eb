// src/fs/mod.rs

//! Filesystem access used by artifact verification and manifest loading.
//!
//! Everything goes through [`FileSystem`] so the checker can be exercised
//! against [`mock::MockFileSystem`], including failure modes (permission
//! errors) that are awkward to reproduce on a real disk.

use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::Path;

pub mod mock;

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Size in bytes of the entry at `path`, from metadata only.
    ///
    /// A missing entry must surface as `io::ErrorKind::NotFound`; callers
    /// rely on that to tell "absent" apart from "could not look".
    fn size_of(&self, path: &Path) -> io::Result<u64>;

    fn is_dir(&self, path: &Path) -> bool;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn size_of(&self, path: &Path) -> io::Result<u64> {
        fs::metadata(path).map(|m| m.len())
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}
