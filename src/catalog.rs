//! Catalog loading and row normalization.
//!
//! The catalog is the CSV export of the library spreadsheet: a header row
//! followed by one row per document. Column names come from
//! [`LabelConfig`](crate::config::LabelConfig), and the header is checked once
//! here so that a renamed or missing column fails the run at startup instead
//! of surfacing as odd output later.
//!
//! ## Normalization
//!
//! [`normalize_row`] canonicalizes a loaded row:
//!
//! - every text cell (and every typed field) is trimmed,
//! - cells of a multi-option column are split on `,` into a token list:
//!   `"A, B,C"` becomes `["A", "B", "C"]`, empty tokens are discarded.
//!
//! Normalization is idempotent. A cell that is already a list is left alone,
//! so re-normalizing a row never splits twice.

use crate::config::{LabelConfig, LibraryConfig};
use crate::types::{Cell, CatalogRow};
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Catalog is missing required column '{0}'")]
    MissingColumn(String),
    #[error("Catalog has duplicate column '{0}'")]
    DuplicateColumn(String),
}

/// A loaded catalog: header plus rows in file order.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub headers: Vec<String>,
    /// Whether the configured status column exists.
    pub has_status: bool,
    pub rows: Vec<CatalogRow>,
}

pub fn load_catalog(path: &Path, labels: &LabelConfig) -> Result<Catalog, CatalogError> {
    let reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    read_catalog(reader, labels)
}

/// Load the configured catalog and normalize every row.
pub fn load_normalized_catalog(config: &LibraryConfig) -> Result<Catalog, CatalogError> {
    let mut catalog = load_catalog(&config.files.catalog_csv, &config.labels)?;
    normalize(&mut catalog, &config.catalog.multi_option_columns);
    Ok(catalog)
}

/// Parse catalog CSV from any reader.
pub fn parse_catalog<R: io::Read>(input: R, labels: &LabelConfig) -> Result<Catalog, CatalogError> {
    let reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    read_catalog(reader, labels)
}

fn read_catalog<R: io::Read>(
    mut reader: csv::Reader<R>,
    labels: &LabelConfig,
) -> Result<Catalog, CatalogError> {
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    for (i, header) in headers.iter().enumerate() {
        if headers[..i].contains(header) {
            return Err(CatalogError::DuplicateColumn(header.clone()));
        }
    }

    let position = |label: &str| headers.iter().position(|h| h == label);
    let required = |label: &str| {
        position(label).ok_or_else(|| CatalogError::MissingColumn(label.to_string()))
    };
    let id_col = required(&labels.id)?;
    let access_col = required(&labels.access)?;
    let filename_col = required(&labels.filename)?;
    let url_col = required(&labels.published_url)?;
    let status_col = position(&labels.status);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let cell = |i: usize| record.get(i).unwrap_or("").to_string();

        rows.push(CatalogRow {
            id: cell(id_col),
            access: cell(access_col),
            filename: cell(filename_col),
            published_url: cell(url_col),
            status: status_col.map(cell),
            columns: headers
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), Cell::Text(cell(i))))
                .collect(),
        });
    }

    Ok(Catalog {
        headers,
        has_status: status_col.is_some(),
        rows,
    })
}

/// Trim every value and split the multi-option columns into token lists.
pub fn normalize_row(row: &mut CatalogRow, multi_option_columns: &[String]) {
    for field in [
        &mut row.id,
        &mut row.access,
        &mut row.filename,
        &mut row.published_url,
    ] {
        trim_in_place(field);
    }
    if let Some(status) = row.status.as_mut() {
        trim_in_place(status);
    }

    for (name, cell) in row.columns.iter_mut() {
        let Cell::Text(text) = cell else {
            continue;
        };
        if multi_option_columns.iter().any(|c| c == name) {
            *cell = Cell::List(split_tokens(text));
        } else {
            trim_in_place(text);
        }
    }
}

/// Normalize every row of a catalog.
pub fn normalize(catalog: &mut Catalog, multi_option_columns: &[String]) {
    for row in &mut catalog.rows {
        normalize_row(row, multi_option_columns);
    }
}

/// Split a comma separated cell into trimmed, non-empty tokens.
pub fn split_tokens(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn trim_in_place(s: &mut String) {
    let trimmed = s.trim();
    if trimmed.len() != s.len() {
        *s = trimmed.to_string();
    }
}
