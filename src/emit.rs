//! Document index and query configuration output.
//!
//! Two JSON files come out of the surviving rows:
//!
//! - **Document index**: a JSON array with one object per record, in row
//!   order. Object keys follow catalog column order; list cells become arrays
//!   of strings.
//! - **Query config**: what the client-side search widget needs.
//!
//! ```text
//! {
//!   "sortings":         { fixed sort definitions },
//!   "searchableFields": [ search-enabled columns ],
//!   "aggregations":     { "<field_id>": { "title": "<column>", "size": N } }
//! }
//! ```
//!
//! `size` is the number of distinct non-empty values the column takes across
//! the published records, with list cells flattened first.

use crate::control::ControlTable;
use crate::fsops::FileOps;
use crate::output::{Diagnostic, Diagnostics};
use crate::types::CatalogRow;
use serde::Serialize;
use serde::ser::SerializeMap;
use std::collections::BTreeSet;
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmitError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryConfig {
    pub sortings: serde_json::Value,
    #[serde(rename = "searchableFields")]
    pub searchable_fields: Vec<String>,
    pub aggregations: Aggregations,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Aggregation {
    pub title: String,
    pub size: usize,
}

/// Field id → aggregation, in filter-table order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregations(Vec<(String, Aggregation)>);

impl Aggregations {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, id: &str) -> Option<&Aggregation> {
        self.0.iter().find(|(k, _)| k == id).map(|(_, a)| a)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Aggregation)> {
        self.0.iter().map(|(k, a)| (k, a))
    }

    fn insert(&mut self, id: String, aggregation: Aggregation) {
        match self.0.iter_mut().find(|(k, _)| *k == id) {
            Some((_, existing)) => *existing = aggregation,
            None => self.0.push((id, aggregation)),
        }
    }
}

impl Serialize for Aggregations {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, aggregation) in &self.0 {
            map.serialize_entry(id, aggregation)?;
        }
        map.end()
    }
}

/// Replace every non-ASCII-alphanumeric character with `_`.
pub fn sanitize_field_id(column: &str) -> String {
    column
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Sort orders offered by the search widget.
pub fn default_sortings() -> serde_json::Value {
    serde_json::json!({
        "name_asc": {
            "field": "Title",
            "order": "asc",
        },
        "year_name_asc": {
            "field": ["Year", "Title"],
            "order": ["desc", "asc"],
        },
    })
}

/// Count the distinct non-empty values of `column`, or `None` when no record
/// carries the column at all.
pub fn distinct_values(rows: &[CatalogRow], column: &str) -> Option<usize> {
    let mut present = false;
    let mut values = BTreeSet::new();
    for row in rows {
        if let Some(cell) = row.get(column) {
            present = true;
            values.extend(cell.values());
        }
    }
    present.then_some(values.len())
}

pub fn build_query_config(
    rows: &[CatalogRow],
    search_table: &ControlTable,
    filter_table: &ControlTable,
    diagnostics: &mut Diagnostics,
) -> QueryConfig {
    let searchable_fields: Vec<String> = search_table
        .enabled()
        .into_iter()
        .map(str::to_string)
        .collect();
    tracing::info!("Searchable fields: {:?}", searchable_fields);

    let mut aggregations = Aggregations::default();
    for column in filter_table.enabled() {
        let field_id = sanitize_field_id(column);
        let size = distinct_values(rows, column).unwrap_or_else(|| {
            diagnostics.push(Diagnostic::warn(
                None,
                format!("Filter column '{}' is not in any published record", column),
            ));
            0
        });
        tracing::debug!(column, field_id = %field_id, size, "aggregation");
        aggregations.insert(
            field_id,
            Aggregation {
                title: column.to_string(),
                size,
            },
        );
    }

    QueryConfig {
        sortings: default_sortings(),
        searchable_fields,
        aggregations,
    }
}

/// Serialize the records as one JSON array.
pub fn write_index(
    fs: &dyn FileOps,
    path: &Path,
    records: &[CatalogRow],
) -> Result<(), EmitError> {
    let json = serde_json::to_vec(records)?;
    fs.write(path, &json)?;
    tracing::debug!("Serialized {} records for {}", records.len(), path.display());
    Ok(())
}

pub fn write_query_config(
    fs: &dyn FileOps,
    path: &Path,
    query_config: &QueryConfig,
) -> Result<(), EmitError> {
    let json = serde_json::to_vec(query_config)?;
    fs.write(path, &json)?;
    tracing::debug!("Serialized query config for {}", path.display());
    Ok(())
}
