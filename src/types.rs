//! Shared types used across the pipeline.
//!
//! A [`CatalogRow`] carries the handful of fields the pipeline reasons about as
//! typed values, next to the full ordered column list that ends up in the
//! published record. The typed fields are extracted once when the catalog is
//! loaded, so later stages never look up a column by name to make a decision.

use crate::output::{Diagnostic, Level};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::path::PathBuf;
use thiserror::Error;

/// One catalog cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    /// Tokens of a multi-option column, in cell order.
    List(Vec<String>),
}

impl Cell {
    /// Non-empty values held by the cell, flattened.
    pub fn values(&self) -> Vec<&str> {
        match self {
            Cell::Text(s) if s.is_empty() => Vec::new(),
            Cell::Text(s) => vec![s.as_str()],
            Cell::List(items) => items
                .iter()
                .map(String::as_str)
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::List(items) => items.serialize(serializer),
        }
    }
}

/// A single library document as described by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRow {
    pub id: String,
    pub access: String,
    pub filename: String,
    pub published_url: String,
    /// `None` when the catalog has no status column at all.
    pub status: Option<String>,
    /// Every column in catalog order. This is what gets published.
    pub columns: Vec<(String, Cell)>,
}

impl CatalogRow {
    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, cell)| cell)
    }

    /// Overwrite a column in place, or append it if the row doesn't have it.
    pub fn set(&mut self, column: &str, cell: Cell) {
        match self.columns.iter_mut().find(|(name, _)| name == column) {
            Some((_, existing)) => *existing = cell,
            None => self.columns.push((column.to_string(), cell)),
        }
    }

    pub fn remove(&mut self, column: &str) -> Option<Cell> {
        let pos = self.columns.iter().position(|(name, _)| name == column)?;
        Some(self.columns.remove(pos).1)
    }
}

/// Rows serialize as a JSON object of their columns, in catalog order.
impl Serialize for CatalogRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, cell) in &self.columns {
            map.serialize_entry(name, cell)?;
        }
        map.end()
    }
}

/// Why a row was left out of the published index.
///
/// Rejections are recoverable: the row is dropped, a diagnostic is logged,
/// and the run carries on with the next row.
#[derive(Error, Debug)]
pub enum Rejection {
    #[error("Invalid {label} field value '{value}'")]
    InvalidAccess { label: String, value: String },
    #[error("{access} document has no {label} value")]
    EmptyFilename { access: String, label: String },
    #[error("{access} document file is missing, {filename}")]
    MissingDocument { access: String, filename: String },
    #[error("Rename of {} to {} failed: {source}", .from.display(), .to.display())]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
    #[error("{access} document has an empty {label} value")]
    MissingPublishedUrl { access: String, label: String },
    #[error("Duplicate ID, only the first row is kept")]
    DuplicateId,
}

impl Rejection {
    pub fn level(&self) -> Level {
        match self {
            Rejection::InvalidAccess { .. }
            | Rejection::RenameFailed { .. }
            | Rejection::MissingPublishedUrl { .. } => Level::Error,
            Rejection::EmptyFilename { .. }
            | Rejection::MissingDocument { .. }
            | Rejection::DuplicateId => Level::Warn,
        }
    }

    /// Turn the rejection into the diagnostic logged for row `id`.
    pub fn to_diagnostic(&self, id: &str) -> Diagnostic {
        Diagnostic::new(self.level(), Some(id), self.to_string())
    }
}
