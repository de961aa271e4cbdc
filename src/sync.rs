//! The `sync` command: copy open-access documents into the destination
//! directory.
//!
//! Documents are authored in a source tree with arbitrary subdirectories.
//! The website serves them from one flat directory under normalized names:
//!
//! ```text
//! library-src/                         src/statics/data/
//! ├── reports/                         ├── Reef_Survey_2019.pdf
//! │   └── Reef Survey 2019.pdf   ──►   └── Creek.pdf
//! └── Creek.pdf
//! ```
//!
//! Only rows that are open-access and active are synced. Files already
//! present at the destination are left alone. A failed copy aborts the run.

use crate::access::AccessClassification;
use crate::catalog::Catalog;
use crate::config::LibraryConfig;
use crate::fsops::FileOps;
use crate::inventory::{Inventory, normalize_filename};
use crate::output::{Diagnostic, Diagnostics};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Cannot walk source directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("ID {id} | copy of {} to {} failed: {source}", .from.display(), .to.display())]
    Copy {
        id: String,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

/// Counters reported at the end of a sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub copied: usize,
    pub empty_filenames: usize,
    pub already_present: usize,
    pub missing: usize,
}

impl fmt::Display for SyncStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Files copied {} | Files with empty filename {} | Files already in dest {} | Missing files {}",
            self.copied, self.empty_filenames, self.already_present, self.missing
        )
    }
}

/// Source documents indexed by file name.
#[derive(Debug, Default)]
pub struct SourceIndex {
    files: BTreeMap<String, PathBuf>,
}

impl SourceIndex {
    /// Walk `root` and keep files whose path relative to `root` matches
    /// `pattern`. When two files share a name the first one walked wins.
    pub fn scan(root: &Path, pattern: &str, diagnostics: &mut Diagnostics) -> Result<Self, SyncError> {
        let mut files: BTreeMap<String, PathBuf> = BTreeMap::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(root) else {
                continue;
            };
            let rel = rel.to_string_lossy().replace('\\', "/");
            if !glob_match::glob_match(pattern, &rel) {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if let Some(existing) = files.get(name) {
                diagnostics.push(Diagnostic::warn(
                    None,
                    format!(
                        "Duplicate source file name {}, using {}",
                        name,
                        existing.display()
                    ),
                ));
                continue;
            }
            files.insert(name.to_string(), entry.path().to_path_buf());
        }
        Ok(Self { files })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.files.get(name).map(PathBuf::as_path)
    }
}

/// Copy every active open-access document named in `catalog` from the source
/// tree into the destination directory.
///
/// `dest` is the destination snapshot. Each copy, real or simulated, is
/// recorded in it, so an `index` run handed the same snapshot afterwards sees
/// the documents this sync provided in both modes.
pub fn sync_documents(
    config: &LibraryConfig,
    catalog: &Catalog,
    dest: &mut Inventory,
    fs: &dyn FileOps,
    diagnostics: &mut Diagnostics,
) -> Result<SyncStats, SyncError> {
    let docs = &config.docs;
    tracing::info!("Copying files from {}", docs.src_path.display());
    tracing::info!("Copying files to {}", dest.dir().display());

    let source = SourceIndex::scan(&docs.src_path, &docs.file_pattern, diagnostics)?;
    tracing::info!("{} files in {}", source.len(), docs.src_path.display());
    tracing::info!("{} files in {}", dest.len(), dest.dir().display());

    let mut stats = SyncStats::default();
    for row in &catalog.rows {
        let open = AccessClassification::parse(&row.access, &config.access_values)
            == Some(AccessClassification::OpenDownload);
        let active = row
            .status
            .as_deref()
            .is_none_or(|s| s.eq_ignore_ascii_case(&config.status_values.active));
        if !open || !active {
            continue;
        }

        let id = Some(row.id.as_str());
        let filename = row.filename.as_str();
        if filename.is_empty() {
            diagnostics.push(Diagnostic::warn(
                id,
                format!(
                    "{} is {} | {} field is empty",
                    config.labels.access, config.access_values.open, config.labels.filename
                ),
            ));
            stats.empty_filenames += 1;
            continue;
        }

        let Some(from) = source.get(filename) else {
            diagnostics.push(Diagnostic::warn(
                id,
                format!(
                    "File {} listed in catalog but not found in {}",
                    filename,
                    docs.src_path.display()
                ),
            ));
            stats.missing += 1;
            continue;
        };

        let normalized = normalize_filename(filename);
        if dest.contains(&normalized) {
            diagnostics.push(Diagnostic::info(id, "File already exists at destination"));
            stats.already_present += 1;
            continue;
        }

        let to = dest.dir().join(&normalized);
        fs.copy(from, &to).map_err(|source| SyncError::Copy {
            id: row.id.clone(),
            from: from.to_path_buf(),
            to: to.clone(),
            source,
        })?;
        dest.insert(&normalized);
        diagnostics.push(Diagnostic::info(
            id,
            format!("Copied {} to {}", from.display(), to.display()),
        ));
        stats.copied += 1;
    }

    tracing::info!("{}", stats);
    Ok(stats)
}
