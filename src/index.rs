//! The `index` command: catalog in, two JSON files out.
//!
//! ```text
//! catalog.csv ──► load + schema check ──► normalize ──► filter pipeline
//!                                                            │
//!   search/filter/display tables ──► column check            ▼
//!                                                     access resolver
//!   dest dir ──► inventory ─────────────────────────►  (may rename)
//!                                                            │
//!                                     library-index.json ◄───┤
//!                                     query-config.json  ◄───┘
//! ```
//!
//! Everything that can be wrong with a single row is a diagnostic and the row
//! is dropped. Everything that makes the whole run meaningless (missing or
//! malformed catalog, unknown control-table column, unreadable destination
//! directory) is an [`IndexError`].

use crate::access::AccessResolver;
use crate::catalog::{self, CatalogError};
use crate::config::LibraryConfig;
use crate::control::{self, ControlTable, ControlTableError};
use crate::emit::{self, EmitError, QueryConfig};
use crate::filter;
use crate::fsops::FileOps;
use crate::inventory::{Inventory, Reconciler, ScanError};
use crate::output::{Diagnostic, Diagnostics};
use crate::types::CatalogRow;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Catalog {}: {source}", .path.display())]
    Catalog {
        path: PathBuf,
        source: CatalogError,
    },
    #[error("Control table {}: {source}", .path.display())]
    ControlTable {
        path: PathBuf,
        source: ControlTableError,
    },
    #[error("{0}")]
    Inventory(#[from] ScanError),
    #[error("Output error: {0}")]
    Emit(#[from] EmitError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Rows in the catalog before any filtering.
    pub catalog_rows: usize,
    /// Files renamed to their normalized name.
    pub renamed: usize,
    /// Columns removed by redaction.
    pub redacted_columns: Vec<String>,
}

/// Everything one `index` run produced.
#[derive(Debug)]
pub struct IndexReport {
    pub records: Vec<CatalogRow>,
    pub query_config: QueryConfig,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: IndexStats,
    pub index_path: PathBuf,
    pub query_config_path: PathBuf,
}

/// The three control tables, checked against the catalog header.
pub struct ControlTables {
    pub search: ControlTable,
    pub filter: ControlTable,
    pub display: ControlTable,
}

pub fn load_control_tables(
    config: &LibraryConfig,
    headers: &[String],
) -> Result<ControlTables, IndexError> {
    let load = |path: &Path| {
        control::load_control_table(path, &config.labels.id)
            .and_then(|table| table.check_columns(headers).map(|()| table))
            .map_err(|source| IndexError::ControlTable {
                path: path.to_path_buf(),
                source,
            })
    };
    Ok(ControlTables {
        search: load(&config.files.search_config_csv)?,
        filter: load(&config.files.filter_config_csv)?,
        display: load(&config.files.display_config_csv)?,
    })
}

/// Run the full index pipeline against a fresh listing of the destination
/// directory. All filesystem mutation goes through `fs`.
pub fn build_index(config: &LibraryConfig, fs: &dyn FileOps) -> Result<IndexReport, IndexError> {
    let inventory = Inventory::scan(&config.docs.dest_path)?;
    build_index_with(config, inventory, fs)
}

/// Run the index pipeline against an existing destination snapshot, such as
/// the one a preceding `sync` updated.
pub fn build_index_with(
    config: &LibraryConfig,
    inventory: Inventory,
    fs: &dyn FileOps,
) -> Result<IndexReport, IndexError> {
    let catalog_path = &config.files.catalog_csv;
    let catalog = catalog::load_normalized_catalog(config).map_err(|source| {
        IndexError::Catalog {
            path: catalog_path.clone(),
            source,
        }
    })?;
    tracing::info!(
        "Loaded {} rows from {}",
        catalog.rows.len(),
        catalog_path.display()
    );
    if !catalog.has_status {
        tracing::info!(
            "No {} column, every row is treated as active",
            config.labels.status
        );
    }

    let tables = load_control_tables(config, &catalog.headers)?;
    tracing::info!("{} files in {}", inventory.len(), inventory.dir().display());

    let catalog_rows = catalog.rows.len();

    let private_columns: Vec<String> = tables
        .display
        .disabled()
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut diagnostics = Diagnostics::new();
    let rows = {
        let stages = filter::standard_pipeline(config, &inventory, private_columns.clone());
        filter::run_pipeline(&stages, catalog.rows, &mut diagnostics)
    };

    let reconciler = Reconciler::new(inventory, fs, &config.access_values.open);
    let mut resolver = AccessResolver::new(config, reconciler);
    let records = resolver.apply(rows, &mut diagnostics);
    let renamed = resolver.reconciler().renamed();

    let query_config =
        emit::build_query_config(&records, &tables.search, &tables.filter, &mut diagnostics);

    emit::write_index(fs, &config.files.index_json, &records)?;
    emit::write_query_config(fs, &config.files.query_config_json, &query_config)?;

    Ok(IndexReport {
        records,
        query_config,
        diagnostics: diagnostics.into_vec(),
        stats: IndexStats {
            catalog_rows,
            renamed,
            redacted_columns: private_columns,
        },
        index_path: config.files.index_json.clone(),
        query_config_path: config.files.query_config_json.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsops::tests::{MockFs, RecordedOp};
    use crate::fsops::{DryRunFs, LocalFs};
    use crate::output::Level;
    use crate::test_helpers::{HEADER, TestLibrary};
    use crate::types::Cell;

    fn ids(report: &IndexReport) -> Vec<&str> {
        report.records.iter().map(|r| r.id.as_str()).collect()
    }

    fn mixed_library() -> TestLibrary {
        let lib = TestLibrary::new();
        lib.write_catalog(&[
            &["1", "Reef", "free to download", "My Doc.pdf", "", "Active"],
            &["2", "Creek", "download from publisher", "", "https://pub.example/2", "Active"],
            &["3", "Bad", "bogus", "", "", "Active"],
            &["4", "Ghost", "free to download", "", "", "Active"],
            &["5", "Shelf", "request from jcu library", "", "", "Active"],
            &["6", "Old", "request from jcu library", "", "", "Deleted"],
        ]);
        lib.add_dest_file("My Doc.pdf");
        lib
    }

    #[test]
    fn end_to_end_index() {
        let lib = mixed_library();
        let config = lib.config();
        let report = build_index(&config, &LocalFs).unwrap();

        assert_eq!(ids(&report), vec!["1", "2", "5"]);
        assert_eq!(report.stats.catalog_rows, 6);
        assert_eq!(report.stats.renamed, 1);
        assert_eq!(lib.dest_files(), vec!["My_Doc.pdf"]);

        let first = &report.records[0];
        assert_eq!(
            first.get("URL"),
            Some(&Cell::Text("/statics/data/My_Doc.pdf".into()))
        );
        assert_eq!(first.get("icon"), Some(&Cell::Text("file_download".into())));
        assert_eq!(
            report.records[1].get("URL"),
            Some(&Cell::Text("https://pub.example/2".into()))
        );

        let diags = &report.diagnostics;
        assert!(diags.iter().any(|d| d.id.as_deref() == Some("3") && d.level == Level::Error));
        assert!(diags.iter().any(|d| d.id.as_deref() == Some("4") && d.level == Level::Warn));

        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&config.files.index_json).unwrap()).unwrap();
        assert_eq!(written.as_array().unwrap().len(), 3);
        assert!(config.files.query_config_json.exists());
    }

    #[test]
    fn dry_run_matches_live_diagnostics() {
        let dry_lib = mixed_library();
        let dry = build_index(&dry_lib.config(), &DryRunFs).unwrap();
        assert_eq!(dry_lib.dest_files(), vec!["My Doc.pdf"]);
        assert!(!dry_lib.config().files.index_json.exists());

        let live_lib = mixed_library();
        let live = build_index(&live_lib.config(), &LocalFs).unwrap();

        assert_eq!(ids(&dry), ids(&live));
        assert_eq!(dry.diagnostics, live.diagnostics);
        assert_eq!(dry.stats, live.stats);
    }

    /// `build` hands the snapshot sync updated to the index stage, so a
    /// simulated copy counts as present there too.
    fn sync_then_index(lib: &TestLibrary, fs: &dyn FileOps) -> (crate::sync::SyncStats, IndexReport) {
        let config = lib.config();
        let catalog = catalog::load_normalized_catalog(&config).unwrap();
        let mut dest = Inventory::scan(&config.docs.dest_path).unwrap();
        let mut diagnostics = Diagnostics::new();
        let stats =
            crate::sync::sync_documents(&config, &catalog, &mut dest, fs, &mut diagnostics)
                .unwrap();
        (stats, build_index_with(&config, dest, fs).unwrap())
    }

    fn unsynced_library() -> TestLibrary {
        let lib = TestLibrary::new();
        lib.write_catalog(&[
            &["1", "Reef", "free to download", "Reef Survey.pdf", "", "Active"],
            &["2", "Creek", "download from publisher", "", "https://pub.example/2", "Active"],
        ]);
        lib.add_src_file("reports/Reef Survey.pdf");
        lib
    }

    #[test]
    fn dry_run_build_matches_live_build() {
        let dry_lib = unsynced_library();
        let (dry_stats, dry) = sync_then_index(&dry_lib, &DryRunFs);
        assert!(dry_lib.dest_files().is_empty());
        assert!(!dry_lib.config().files.index_json.exists());

        let live_lib = unsynced_library();
        let (live_stats, live) = sync_then_index(&live_lib, &LocalFs);
        assert_eq!(live_lib.dest_files(), vec!["Reef_Survey.pdf"]);

        assert_eq!(dry_stats.copied, 1);
        assert_eq!(dry_stats.copied, live_stats.copied);
        assert_eq!(ids(&dry), vec!["1", "2"]);
        assert_eq!(ids(&dry), ids(&live));
        assert_eq!(dry.diagnostics, live.diagnostics);
        assert_eq!(dry.records, live.records);
    }

    #[test]
    fn repeated_dry_runs_are_identical() {
        let lib = mixed_library();
        let config = lib.config();
        let first = build_index(&config, &DryRunFs).unwrap();
        let second = build_index(&config, &DryRunFs).unwrap();
        assert_eq!(first.diagnostics, second.diagnostics);
        assert_eq!(first.records, second.records);
        assert_eq!(lib.dest_files(), vec!["My Doc.pdf"]);
    }

    #[test]
    fn writes_go_through_file_ops() {
        let lib = mixed_library();
        let config = lib.config();
        let fs = MockFs::new();
        build_index(&config, &fs).unwrap();

        let ops = fs.get_operations();
        assert_eq!(ops.len(), 3);
        assert!(matches!(&ops[0], RecordedOp::Rename { .. }));
        assert!(matches!(&ops[1], RecordedOp::Write { path, .. } if *path == config.files.index_json));
        assert!(matches!(&ops[2], RecordedOp::Write { path, .. } if *path == config.files.query_config_json));
    }

    #[test]
    fn failed_rename_drops_row_and_continues() {
        let lib = mixed_library();
        let fs = MockFs::failing_rename();
        let report = build_index(&lib.config(), &fs).unwrap();
        assert_eq!(ids(&report), vec!["2", "5"]);
        assert!(report.diagnostics.iter().any(|d| d.id.as_deref() == Some("1")
            && d.level == Level::Error
            && d.message.contains("Rename")));
    }

    #[test]
    fn redaction_and_query_config() {
        let lib = TestLibrary::new();
        let header = &["ID", "Title", "Access_Rights", "File_name", "URL", "Status", "State", "Notes"];
        lib.write_catalog_with(
            header,
            &[
                &["1", "A", "request from jcu library", "", "", "Active", "QLD, NSW", "secret"],
                &["2", "B", "request from jcu library", "", "", "Active", "NSW", "secret"],
            ],
        );
        lib.write_control("search.csv", header, &["Title", "Notes"]);
        lib.write_control("filter.csv", header, &["State"]);
        let public: Vec<&str> = header.iter().copied().filter(|c| *c != "Notes").collect();
        lib.write_control("display.csv", header, &public);

        let mut config = lib.config();
        config.catalog.multi_option_columns = vec!["State".into()];
        let report = build_index(&config, &DryRunFs).unwrap();

        assert!(report.records.iter().all(|r| r.get("Notes").is_none()));
        assert_eq!(report.stats.redacted_columns, vec!["Notes"]);
        assert_eq!(report.query_config.aggregations.get("State").unwrap().size, 2);
        assert_eq!(report.query_config.searchable_fields, vec!["Title", "Notes"]);
    }

    #[test]
    fn no_status_column_keeps_all_rows() {
        let lib = TestLibrary::new();
        let header = &["ID", "Title", "Access_Rights", "File_name", "URL"];
        lib.write_catalog_with(header, &[&["1", "A", "request from jcu library", "", ""]]);
        lib.write_control("search.csv", header, &[]);
        lib.write_control("filter.csv", header, &[]);
        lib.write_control("display.csv", header, header);
        let report = build_index(&lib.config(), &DryRunFs).unwrap();
        assert_eq!(ids(&report), vec!["1"]);
    }

    #[test]
    fn unknown_control_column_is_fatal() {
        let lib = TestLibrary::new();
        lib.write_catalog(&[]);
        let mut header = HEADER.to_vec();
        header.push("Habitat");
        lib.write_control("filter.csv", &header, &["Habitat"]);
        let err = build_index(&lib.config(), &DryRunFs).unwrap_err();
        assert!(matches!(
            err,
            IndexError::ControlTable { source: ControlTableError::UnknownColumn(ref c), .. } if c == "Habitat"
        ));
    }

    #[test]
    fn missing_catalog_column_is_fatal() {
        let lib = TestLibrary::new();
        lib.write_catalog_with(&["ID", "Title"], &[&["1", "A"]]);
        let err = build_index(&lib.config(), &DryRunFs).unwrap_err();
        assert!(matches!(
            err,
            IndexError::Catalog { source: CatalogError::MissingColumn(_), .. }
        ));
    }

    #[test]
    fn missing_dest_dir_is_fatal() {
        let lib = TestLibrary::new();
        lib.write_catalog(&[]);
        std::fs::remove_dir(lib.dest()).unwrap();
        let err = build_index(&lib.config(), &DryRunFs).unwrap_err();
        assert!(matches!(err, IndexError::Inventory(_)));
    }

    #[test]
    fn empty_catalog_writes_empty_array() {
        let lib = TestLibrary::new();
        lib.write_catalog(&[]);
        let config = lib.config();
        let report = build_index(&config, &LocalFs).unwrap();
        assert!(report.records.is_empty());
        assert_eq!(std::fs::read_to_string(&config.files.index_json).unwrap(), "[]");
    }
}
