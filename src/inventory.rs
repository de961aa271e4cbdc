//! Destination-directory inventory and filename reconciliation.
//!
//! The destination directory (the one the website serves downloads from) is
//! the ground truth for whether an open-access document exists. It is listed
//! once per run into an [`Inventory`]; every existence check after that is a
//! map lookup, never another `stat`.
//!
//! ## Filename normalization
//!
//! Catalog file names are written by people and often contain spaces.
//! Published names replace spaces and path separators with underscores:
//!
//! ```text
//! "Reef Survey 2019.pdf"   →  "Reef_Survey_2019.pdf"
//! "Annual/Report.pdf"      →  "Annual_Report.pdf"
//! ```
//!
//! ## Reconciliation
//!
//! For an open-access row, [`Reconciler::reconcile`] looks the file up:
//!
//! 1. normalized name present → done,
//! 2. only the original name present → rename it to the normalized name,
//! 3. neither present → the row is rejected as a missing document.
//!
//! A successful rename updates the in-memory inventory so later rows naming
//! the same file see it under its new name. Renames go through
//! [`FileOps`], which is a no-op in dry-run mode; the inventory is updated
//! either way so both modes report identically. A failed rename rejects the
//! row and the run continues.

use crate::fsops::FileOps;
use crate::output::{Diagnostic, Diagnostics};
use crate::types::Rejection;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Replace spaces and path separators with underscores.
pub fn normalize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            c => c,
        })
        .collect()
}

/// Where a catalog file name was found in the inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Already present under its normalized name.
    Normalized(String),
    /// Present only under the original name; needs a rename.
    Original { original: String, normalized: String },
    Missing,
}

#[derive(Error, Debug)]
#[error("Cannot list destination directory {}: {source}", .path.display())]
pub struct ScanError {
    pub path: PathBuf,
    pub source: io::Error,
}

/// Snapshot of the file names in one directory.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    dir: PathBuf,
    files: BTreeSet<String>,
}

impl Inventory {
    /// List `dir` once. Symlinks are followed; subdirectories, dangling
    /// links and non-UTF-8 names are skipped since they can never match a
    /// catalog entry.
    pub fn scan(dir: &Path) -> Result<Self, ScanError> {
        let scan_error = |source| ScanError {
            path: dir.to_path_buf(),
            source,
        };
        let mut files = BTreeSet::new();
        for entry in std::fs::read_dir(dir).map_err(scan_error)? {
            let entry = entry.map_err(scan_error)?;
            let is_file = std::fs::metadata(entry.path()).is_ok_and(|m| m.is_file());
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                files.insert(name.to_string());
            }
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            files,
        })
    }

    /// Build an inventory from file names without touching the disk.
    pub fn from_names<I, S>(dir: &Path, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dir: dir.to_path_buf(),
            files: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains(name)
    }

    /// Find a catalog file name under its normalized or original form.
    pub fn locate(&self, filename: &str) -> Location {
        let normalized = normalize_filename(filename);
        if self.contains(&normalized) {
            Location::Normalized(normalized)
        } else if self.contains(filename) {
            Location::Original {
                original: filename.to_string(),
                normalized,
            }
        } else {
            Location::Missing
        }
    }

    /// Record a file that now exists under `name` (after a copy).
    pub fn insert(&mut self, name: &str) {
        self.files.insert(name.to_string());
    }

    fn apply_rename(&mut self, from: &str, to: &str) {
        self.files.remove(from);
        self.insert(to);
    }
}

/// Per-row filename reconciliation against an inventory.
pub struct Reconciler<'a> {
    inventory: Inventory,
    fs: &'a dyn FileOps,
    open_token: &'a str,
    renamed: usize,
}

impl<'a> Reconciler<'a> {
    /// `open_token` is the open-access value quoted in diagnostics.
    pub fn new(inventory: Inventory, fs: &'a dyn FileOps, open_token: &'a str) -> Self {
        Self {
            inventory,
            fs,
            open_token,
            renamed: 0,
        }
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Number of renames performed (or simulated) so far.
    pub fn renamed(&self) -> usize {
        self.renamed
    }

    /// Ensure `filename` exists under its normalized name and return that name.
    pub fn reconcile(
        &mut self,
        id: &str,
        filename: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<String, Rejection> {
        match self.inventory.locate(filename) {
            Location::Normalized(name) => Ok(name),
            Location::Original {
                original,
                normalized,
            } => {
                let from = self.inventory.dir.join(&original);
                let to = self.inventory.dir.join(&normalized);
                self.fs
                    .rename(&from, &to)
                    .map_err(|source| Rejection::RenameFailed { from, to, source })?;
                self.inventory.apply_rename(&original, &normalized);
                self.renamed += 1;
                diagnostics.push(Diagnostic::info(
                    Some(id),
                    format!("Renamed {} to {}", original, normalized),
                ));
                Ok(normalized)
            }
            Location::Missing => Err(Rejection::MissingDocument {
                access: self.open_token.to_string(),
                filename: filename.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsops::tests::{MockFs, RecordedOp};
    use crate::fsops::{DryRunFs, LocalFs};
    use crate::output::Level;
    use tempfile::TempDir;

    const OPEN: &str = "free to download";

    #[test]
    fn normalize_replaces_spaces_and_separators() {
        assert_eq!(normalize_filename("My Doc.pdf"), "My_Doc.pdf");
        assert_eq!(normalize_filename("a/b\\c d.pdf"), "a_b_c_d.pdf");
        assert_eq!(normalize_filename("clean.pdf"), "clean.pdf");
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize_filename("A B/C.pdf");
        assert_eq!(normalize_filename(&once), once);
    }

    #[test]
    fn scan_lists_files_only() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.pdf"), "x").unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();

        let inv = Inventory::scan(tmp.path()).unwrap();
        assert_eq!(inv.len(), 1);
        assert!(inv.contains("a.pdf"));
        assert!(!inv.contains("sub"));
    }

    #[cfg(unix)]
    #[test]
    fn scan_follows_symlinks() {
        let tmp = TempDir::new().unwrap();
        let store = tmp.path().join("store");
        let dest = tmp.path().join("dest");
        std::fs::create_dir_all(&store).unwrap();
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(store.join("real.pdf"), "pdf").unwrap();
        std::os::unix::fs::symlink(store.join("real.pdf"), dest.join("a.pdf")).unwrap();
        std::os::unix::fs::symlink(store.join("gone.pdf"), dest.join("dangling.pdf")).unwrap();
        std::os::unix::fs::symlink(&store, dest.join("linked-dir")).unwrap();

        let inv = Inventory::scan(&dest).unwrap();
        assert_eq!(inv.len(), 1);
        assert!(inv.contains("a.pdf"));
    }

    #[test]
    fn scan_missing_dir_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = Inventory::scan(&tmp.path().join("nope")).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn locate_prefers_normalized_name() {
        let inv = Inventory::from_names(Path::new("/d"), ["My Doc.pdf", "My_Doc.pdf"]);
        assert_eq!(
            inv.locate("My Doc.pdf"),
            Location::Normalized("My_Doc.pdf".into())
        );
    }

    #[test]
    fn locate_original_only() {
        let inv = Inventory::from_names(Path::new("/d"), ["My Doc.pdf"]);
        assert_eq!(
            inv.locate("My Doc.pdf"),
            Location::Original {
                original: "My Doc.pdf".into(),
                normalized: "My_Doc.pdf".into()
            }
        );
        assert_eq!(inv.locate("Other.pdf"), Location::Missing);
    }

    #[test]
    fn reconcile_found_normalized_does_not_rename() {
        let fs = MockFs::new();
        let inv = Inventory::from_names(Path::new("/d"), ["My_Doc.pdf"]);
        let mut rec = Reconciler::new(inv, &fs, OPEN);
        let mut diags = Diagnostics::new();

        let name = rec.reconcile("1", "My Doc.pdf", &mut diags).unwrap();
        assert_eq!(name, "My_Doc.pdf");
        assert!(fs.get_operations().is_empty());
        assert!(diags.entries().is_empty());
    }

    #[test]
    fn reconcile_renames_original() {
        let fs = MockFs::new();
        let inv = Inventory::from_names(Path::new("/d"), ["My Doc.pdf"]);
        let mut rec = Reconciler::new(inv, &fs, OPEN);
        let mut diags = Diagnostics::new();

        let name = rec.reconcile("1", "My Doc.pdf", &mut diags).unwrap();
        assert_eq!(name, "My_Doc.pdf");
        assert_eq!(
            fs.get_operations(),
            vec![RecordedOp::Rename {
                from: "/d/My Doc.pdf".into(),
                to: "/d/My_Doc.pdf".into()
            }]
        );
        assert_eq!(rec.renamed(), 1);
        assert!(rec.inventory().contains("My_Doc.pdf"));
        assert!(!rec.inventory().contains("My Doc.pdf"));
        assert_eq!(diags.entries()[0].to_string(), "ID 1 | Renamed My Doc.pdf to My_Doc.pdf");
    }

    #[test]
    fn second_row_for_same_file_sees_rename() {
        let fs = MockFs::new();
        let inv = Inventory::from_names(Path::new("/d"), ["My Doc.pdf"]);
        let mut rec = Reconciler::new(inv, &fs, OPEN);
        let mut diags = Diagnostics::new();

        rec.reconcile("1", "My Doc.pdf", &mut diags).unwrap();
        rec.reconcile("2", "My Doc.pdf", &mut diags).unwrap();
        assert_eq!(fs.get_operations().len(), 1);
    }

    #[test]
    fn reconcile_missing_is_rejection() {
        let fs = MockFs::new();
        let mut rec = Reconciler::new(Inventory::default(), &fs, OPEN);
        let mut diags = Diagnostics::new();

        let err = rec.reconcile("5", "gone.pdf", &mut diags).unwrap_err();
        assert!(matches!(err, Rejection::MissingDocument { .. }));
        assert_eq!(
            err.to_diagnostic("5").to_string(),
            "ID 5 | free to download document file is missing, gone.pdf"
        );
    }

    #[test]
    fn failed_rename_is_rejection_not_panic() {
        let fs = MockFs::failing_rename();
        let inv = Inventory::from_names(Path::new("/d"), ["My Doc.pdf"]);
        let mut rec = Reconciler::new(inv, &fs, OPEN);
        let mut diags = Diagnostics::new();

        let err = rec.reconcile("9", "My Doc.pdf", &mut diags).unwrap_err();
        assert!(matches!(err, Rejection::RenameFailed { .. }));
        assert_eq!(err.level(), Level::Error);
        assert!(err.to_string().contains("My Doc.pdf"));
        // Inventory unchanged: the file is still under its original name.
        assert!(rec.inventory().contains("My Doc.pdf"));
        assert_eq!(rec.renamed(), 0);
    }

    #[test]
    fn live_rename_on_disk() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("My Doc.pdf"), "pdf").unwrap();
        let inv = Inventory::scan(tmp.path()).unwrap();
        let mut rec = Reconciler::new(inv, &LocalFs, OPEN);

        rec.reconcile("1", "My Doc.pdf", &mut Diagnostics::new())
            .unwrap();
        assert!(tmp.path().join("My_Doc.pdf").exists());
        assert!(!tmp.path().join("My Doc.pdf").exists());
    }

    #[test]
    fn dry_run_rename_reports_without_touching_disk() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("My Doc.pdf"), "pdf").unwrap();
        let inv = Inventory::scan(tmp.path()).unwrap();
        let mut rec = Reconciler::new(inv, &DryRunFs, OPEN);
        let mut diags = Diagnostics::new();

        let name = rec.reconcile("1", "My Doc.pdf", &mut diags).unwrap();
        assert_eq!(name, "My_Doc.pdf");
        assert_eq!(diags.entries().len(), 1);
        assert!(tmp.path().join("My Doc.pdf").exists());
        assert!(!tmp.path().join("My_Doc.pdf").exists());
    }
}
