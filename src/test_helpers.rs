//! Shared test utilities for the library-index test suite.
//!
//! Two kinds of helper live here: row builders for pure unit tests, and
//! [`TestLibrary`], an on-disk library in a temp directory for the tests that
//! exercise loading, renaming and copying.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let lib = TestLibrary::new();
//! lib.write_catalog(&[
//!     &["1", "Reef", "free to download", "My Doc.pdf", "", "Active"],
//! ]);
//! lib.add_dest_file("My Doc.pdf");
//!
//! let report = build_index(&lib.config(), &LocalFs).unwrap();
//! ```

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::LibraryConfig;
use crate::types::{Cell, CatalogRow};

// =========================================================================
// Rows
// =========================================================================

/// A row with only the four required columns set. Filename and published URL
/// start empty; tests fill in what they need.
pub fn row(id: &str, access: &str) -> CatalogRow {
    CatalogRow {
        id: id.to_string(),
        access: access.to_string(),
        filename: String::new(),
        published_url: String::new(),
        status: None,
        columns: vec![
            ("ID".to_string(), Cell::Text(id.to_string())),
            ("Access_Rights".to_string(), Cell::Text(access.to_string())),
            ("File_name".to_string(), Cell::Text(String::new())),
            ("URL".to_string(), Cell::Text(String::new())),
        ],
    }
}

// =========================================================================
// On-disk library
// =========================================================================

/// Catalog header used by [`TestLibrary::write_catalog`].
pub const HEADER: &[&str] = &["ID", "Title", "Access_Rights", "File_name", "URL", "Status"];

/// A throwaway library: catalog, control tables, and document directories
/// under one temp dir. The directory is removed when this is dropped.
pub struct TestLibrary {
    pub tmp: TempDir,
}

impl TestLibrary {
    /// Create the directory layout with empty `src/` and `dest/` dirs and
    /// permissive control tables (every column searchable and public, no
    /// filters).
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("src")).unwrap();
        std::fs::create_dir_all(tmp.path().join("dest")).unwrap();
        let lib = Self { tmp };
        lib.write_control("search.csv", HEADER, &["Title"]);
        lib.write_control("filter.csv", HEADER, &[]);
        lib.write_control("display.csv", HEADER, HEADER);
        lib
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    pub fn dest(&self) -> PathBuf {
        self.root().join("dest")
    }

    pub fn src(&self) -> PathBuf {
        self.root().join("src")
    }

    /// Config with every path pointing into the temp dir.
    pub fn config(&self) -> LibraryConfig {
        let mut config = LibraryConfig::default();
        config.docs.src_path = "src".into();
        config.docs.dest_path = "dest".into();
        config.files.catalog_csv = "catalog.csv".into();
        config.files.index_json = "out/library-index.json".into();
        config.files.query_config_json = "out/query-config.json".into();
        config.files.search_config_csv = "search.csv".into();
        config.files.filter_config_csv = "filter.csv".into();
        config.files.display_config_csv = "display.csv".into();
        config.resolve_paths(self.root());
        config
    }

    /// Write `catalog.csv` with the [`HEADER`] columns.
    pub fn write_catalog(&self, rows: &[&[&str]]) {
        self.write_catalog_with(HEADER, rows);
    }

    pub fn write_catalog_with(&self, header: &[&str], rows: &[&[&str]]) {
        let mut writer = csv::Writer::from_path(self.root().join("catalog.csv")).unwrap();
        writer.write_record(header).unwrap();
        for row in rows {
            writer.write_record(*row).unwrap();
        }
        writer.flush().unwrap();
    }

    /// Write a control table over `header` with `enabled` columns set to True.
    pub fn write_control(&self, name: &str, header: &[&str], enabled: &[&str]) {
        let mut writer = csv::Writer::from_path(self.root().join(name)).unwrap();
        writer.write_record(header).unwrap();
        let flags: Vec<&str> = header
            .iter()
            .enumerate()
            .map(|(i, column)| match (i, enabled.contains(column)) {
                (0, _) => "Flags",
                (_, true) => "True",
                (_, false) => "False",
            })
            .collect();
        writer.write_record(&flags).unwrap();
        writer.flush().unwrap();
    }

    pub fn add_dest_file(&self, name: &str) {
        std::fs::write(self.dest().join(name), name).unwrap();
    }

    /// Create a source document at `rel` (may include subdirectories).
    pub fn add_src_file(&self, rel: &str) {
        let path = self.src().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, rel).unwrap();
    }

    /// Names of the files currently in the destination directory, sorted.
    pub fn dest_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dest())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}
