//! Mutating filesystem operations behind a trait.
//!
//! Everything the pipeline changes on disk (renaming a document to its
//! normalized name, copying a document into the mirror, writing the JSON
//! outputs) goes through [`FileOps`]. Reads are not abstracted: listing a
//! directory or loading a CSV is the same in every mode.
//!
//! Two implementations ship:
//!
//! - [`LocalFs`] performs the operation.
//! - [`DryRunFs`] accepts every operation and does nothing, so a dry run walks
//!   exactly the same code path (and logs exactly the same diagnostics) as a
//!   live run.

use std::io;
use std::path::Path;

pub trait FileOps {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Write `contents` to `path`, creating parent directories as needed.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
}

/// Real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl FileOps for LocalFs {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::copy(from, to).map(|_| ())
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)
    }
}

/// Simulation mode: every mutation succeeds without touching the disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunFs;

impl FileOps for DryRunFs {
    fn rename(&self, _from: &Path, _to: &Path) -> io::Result<()> {
        Ok(())
    }

    fn copy(&self, _from: &Path, _to: &Path) -> io::Result<()> {
        Ok(())
    }

    fn write(&self, _path: &Path, _contents: &[u8]) -> io::Result<()> {
        Ok(())
    }
}

/// Pick the implementation for a run.
pub fn for_mode(dry_run: bool) -> Box<dyn FileOps> {
    if dry_run {
        Box::new(DryRunFs)
    } else {
        Box::new(LocalFs)
    }
}
