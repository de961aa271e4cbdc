//! Diagnostics and CLI output formatting.
//!
//! # Diagnostics
//!
//! Every dropped or flagged row produces one [`Diagnostic`]: a level, the row
//! id (when there is one), and a human-readable reason. Diagnostics are
//! collected by a [`Diagnostics`] sink which forwards each entry to `tracing`
//! as it arrives and keeps it for the end-of-run summary. A dry run produces
//! exactly the same sequence as a live run, which is what makes the dry run
//! a faithful preview.
//!
//! ```text
//! WARN  ID 12 | free to download document file is missing, Reef Survey.pdf
//! ERROR ID 3 | Invalid Access_Rights field value 'bogus'
//! INFO  ID 40 | Renamed Creek Report.pdf to Creek_Report.pdf
//! ```
//!
//! # Summaries
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.
//!
//! ```text
//! Catalog: 212 rows
//! Published: 187 records
//! Dropped: 25 rows (3 errors, 22 warnings)
//! Renamed: 4 files
//!     library-index.json
//!     query-config.json
//! ```

use crate::index::IndexReport;
use crate::sync::SyncStats;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

/// One line of run feedback, usually about a single catalog row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: Level,
    pub id: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(level: Level, id: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            level,
            id: id.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn info(id: Option<&str>, message: impl Into<String>) -> Self {
        Self::new(Level::Info, id, message)
    }

    pub fn warn(id: Option<&str>, message: impl Into<String>) -> Self {
        Self::new(Level::Warn, id, message)
    }

    pub fn error(id: Option<&str>, message: impl Into<String>) -> Self {
        Self::new(Level::Error, id, message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "ID {} | {}", id, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Collects diagnostics and forwards each to `tracing` as it is pushed.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        emit(&diagnostic);
        self.entries.push(diagnostic);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }

    pub fn count(&self, level: Level) -> usize {
        count_level(&self.entries, level)
    }

    /// Diagnostics that name a specific row id.
    pub fn for_id<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.entries
            .iter()
            .filter(move |d| d.id.as_deref() == Some(id))
    }
}

fn count_level(entries: &[Diagnostic], level: Level) -> usize {
    entries.iter().filter(|d| d.level == level).count()
}

/// Row-level diagnostics only; column warnings carry no id.
fn count_row_level(entries: &[Diagnostic], level: Level) -> usize {
    entries
        .iter()
        .filter(|d| d.level == level && d.id.is_some())
        .count()
}

/// Forward a diagnostic to the tracing subscriber at its own level.
fn emit(diagnostic: &Diagnostic) {
    let id = diagnostic.id.as_deref().unwrap_or("-");
    match diagnostic.level {
        Level::Debug => tracing::debug!(id = id, "{}", diagnostic),
        Level::Info => tracing::info!(id = id, "{}", diagnostic),
        Level::Warn => tracing::warn!(id = id, "{}", diagnostic),
        Level::Error => tracing::error!(id = id, "{}", diagnostic),
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{} {}", n, if n == 1 { one } else { many })
}

// ============================================================================
// index
// ============================================================================

/// Format the end-of-run summary for the `index` command.
pub fn format_index_summary(report: &IndexReport, dry_run: bool) -> Vec<String> {
    let mut lines = Vec::new();
    let stats = &report.stats;
    let dropped = stats.catalog_rows - report.records.len();

    lines.push(format!("Catalog: {}", plural(stats.catalog_rows, "row", "rows")));
    lines.push(format!(
        "Published: {}",
        plural(report.records.len(), "record", "records")
    ));
    lines.push(format!(
        "Dropped: {} ({}, {})",
        plural(dropped, "row", "rows"),
        plural(
            count_row_level(&report.diagnostics, Level::Error),
            "error",
            "errors"
        ),
        plural(
            count_row_level(&report.diagnostics, Level::Warn),
            "warning",
            "warnings"
        ),
    ));
    if stats.renamed > 0 {
        lines.push(format!("Renamed: {}", plural(stats.renamed, "file", "files")));
    }
    if !stats.redacted_columns.is_empty() {
        lines.push(format!(
            "Private columns: {}",
            stats.redacted_columns.join(", ")
        ));
    }

    let aggregations = &report.query_config.aggregations;
    if !aggregations.is_empty() {
        lines.push("Filters".to_string());
        for (id, agg) in aggregations.iter() {
            lines.push(format!("    {} ({} values)", id, agg.size));
        }
    }

    if dry_run {
        lines.push("Dry run: no files were written".to_string());
    } else {
        lines.push("Wrote".to_string());
        for path in [&report.index_path, &report.query_config_path] {
            lines.push(format!("    {}", path.display()));
        }
    }
    lines
}

pub fn print_index_summary(report: &IndexReport, dry_run: bool) {
    for line in format_index_summary(report, dry_run) {
        println!("{}", line);
    }
}

// ============================================================================
// sync
// ============================================================================

/// Format the end-of-run summary for the `sync` command.
pub fn format_sync_summary(stats: &SyncStats, dry_run: bool) -> Vec<String> {
    let mut lines = vec![stats.to_string()];
    if dry_run && stats.copied > 0 {
        lines.push(format!(
            "Dry run: {} not copied",
            plural(stats.copied, "file", "files")
        ));
    }
    lines
}

pub fn print_sync_summary(stats: &SyncStats, dry_run: bool) {
    for line in format_sync_summary(stats, dry_run) {
        println!("{}", line);
    }
}
