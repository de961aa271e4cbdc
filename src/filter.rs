//! Row filter pipeline.
//!
//! Rows pass through an ordered list of [`RowFilter`] stages. Each stage takes
//! the current rows, returns the rows it keeps (in the same order), and pushes
//! one diagnostic per row it drops. Stages hold only configuration and the
//! inventory snapshot; none carries state from one call to the next.
//!
//! The standard order ([`standard_pipeline`]):
//!
//! 1. [`StatusFilter`]: keep active rows (skipped without a status column)
//! 2. [`AccessValidityFilter`]: drop unknown access values
//! 3. [`OpenAccessExistenceFilter`]: drop open-access rows whose file is not
//!    in the destination directory, in either original or normalized form
//! 4. [`PublisherLinkFilter`]: drop publisher rows without a URL
//! 5. [`DuplicateIdFilter`]: keep the first row per id
//! 6. [`Redaction`]: remove private columns
//!
//! Redaction must come last. The dropping stages read typed fields extracted
//! at load time, but placing redaction after them keeps that true even for a
//! stage that starts reading a column directly.

use crate::access::AccessClassification;
use crate::config::{AccessValues, LibraryConfig, StatusValues};
use crate::inventory::{Inventory, Location};
use crate::output::{Diagnostic, Diagnostics};
use crate::types::{CatalogRow, Rejection};
use std::collections::HashSet;

pub trait RowFilter {
    /// Short name used in debug logging.
    fn name(&self) -> &'static str;

    fn apply(&self, rows: Vec<CatalogRow>, diagnostics: &mut Diagnostics) -> Vec<CatalogRow>;
}

/// Run `stages` in order.
pub fn run_pipeline(
    stages: &[Box<dyn RowFilter + '_>],
    rows: Vec<CatalogRow>,
    diagnostics: &mut Diagnostics,
) -> Vec<CatalogRow> {
    stages.iter().fold(rows, |rows, stage| {
        let before = rows.len();
        let kept = stage.apply(rows, diagnostics);
        tracing::debug!(stage = stage.name(), before, after = kept.len(), "filter stage");
        kept
    })
}

/// The stage list used by the `index` command.
pub fn standard_pipeline<'a>(
    config: &'a LibraryConfig,
    inventory: &'a Inventory,
    private_columns: Vec<String>,
) -> Vec<Box<dyn RowFilter + 'a>> {
    vec![
        Box::new(StatusFilter {
            values: &config.status_values,
        }),
        Box::new(AccessValidityFilter {
            values: &config.access_values,
            label: &config.labels.access,
        }),
        Box::new(OpenAccessExistenceFilter {
            values: &config.access_values,
            filename_label: &config.labels.filename,
            inventory,
        }),
        Box::new(PublisherLinkFilter {
            values: &config.access_values,
            label: &config.labels.published_url,
        }),
        Box::new(DuplicateIdFilter),
        Box::new(Redaction {
            columns: private_columns,
        }),
    ]
}

/// Keep rows whose status matches the active value.
///
/// Rows loaded from a catalog without a status column have no status and are
/// all kept.
pub struct StatusFilter<'a> {
    pub values: &'a StatusValues,
}

impl RowFilter for StatusFilter<'_> {
    fn name(&self) -> &'static str {
        "status"
    }

    fn apply(&self, rows: Vec<CatalogRow>, diagnostics: &mut Diagnostics) -> Vec<CatalogRow> {
        rows.into_iter()
            .filter(|row| {
                let Some(status) = row.status.as_deref() else {
                    return true;
                };
                if status.eq_ignore_ascii_case(&self.values.active) {
                    return true;
                }
                let reason = if status.eq_ignore_ascii_case(&self.values.deleted) {
                    "Deleted from catalog".to_string()
                } else {
                    format!("Status '{}' is not {}", status, self.values.active)
                };
                diagnostics.push(Diagnostic::info(Some(&row.id), reason));
                false
            })
            .collect()
    }
}

/// Drop rows whose access value is not a known classification.
pub struct AccessValidityFilter<'a> {
    pub values: &'a AccessValues,
    pub label: &'a str,
}

impl RowFilter for AccessValidityFilter<'_> {
    fn name(&self) -> &'static str {
        "access-validity"
    }

    fn apply(&self, rows: Vec<CatalogRow>, diagnostics: &mut Diagnostics) -> Vec<CatalogRow> {
        rows.into_iter()
            .filter(|row| {
                if AccessClassification::parse(&row.access, self.values).is_some() {
                    return true;
                }
                let rejection = Rejection::InvalidAccess {
                    label: self.label.to_string(),
                    value: row.access.clone(),
                };
                diagnostics.push(rejection.to_diagnostic(&row.id));
                false
            })
            .collect()
    }
}

/// Drop open-access rows with no file in the destination listing.
///
/// This is the bulk check: one directory listing answers every row, before
/// the per-row resolver gets to rename anything.
pub struct OpenAccessExistenceFilter<'a> {
    pub values: &'a AccessValues,
    pub filename_label: &'a str,
    pub inventory: &'a Inventory,
}

impl RowFilter for OpenAccessExistenceFilter<'_> {
    fn name(&self) -> &'static str {
        "open-access-existence"
    }

    fn apply(&self, rows: Vec<CatalogRow>, diagnostics: &mut Diagnostics) -> Vec<CatalogRow> {
        rows.into_iter()
            .filter(|row| {
                if AccessClassification::parse(&row.access, self.values)
                    != Some(AccessClassification::OpenDownload)
                {
                    return true;
                }
                let rejection = if row.filename.is_empty() {
                    Rejection::EmptyFilename {
                        access: self.values.open.clone(),
                        label: self.filename_label.to_string(),
                    }
                } else if self.inventory.locate(&row.filename) == Location::Missing {
                    Rejection::MissingDocument {
                        access: self.values.open.clone(),
                        filename: row.filename.clone(),
                    }
                } else {
                    return true;
                };
                diagnostics.push(rejection.to_diagnostic(&row.id));
                false
            })
            .collect()
    }
}

/// Drop publisher-access rows with an empty published URL.
pub struct PublisherLinkFilter<'a> {
    pub values: &'a AccessValues,
    pub label: &'a str,
}

impl RowFilter for PublisherLinkFilter<'_> {
    fn name(&self) -> &'static str {
        "publisher-link"
    }

    fn apply(&self, rows: Vec<CatalogRow>, diagnostics: &mut Diagnostics) -> Vec<CatalogRow> {
        rows.into_iter()
            .filter(|row| {
                let is_publisher = AccessClassification::parse(&row.access, self.values)
                    == Some(AccessClassification::PublisherLink);
                if !is_publisher || !row.published_url.is_empty() {
                    return true;
                }
                let rejection = Rejection::MissingPublishedUrl {
                    access: self.values.publisher.clone(),
                    label: self.label.to_string(),
                };
                diagnostics.push(rejection.to_diagnostic(&row.id));
                false
            })
            .collect()
    }
}

/// Keep the first row for each id.
pub struct DuplicateIdFilter;

impl RowFilter for DuplicateIdFilter {
    fn name(&self) -> &'static str {
        "duplicate-id"
    }

    fn apply(&self, rows: Vec<CatalogRow>, diagnostics: &mut Diagnostics) -> Vec<CatalogRow> {
        let mut seen = HashSet::new();
        rows.into_iter()
            .filter(|row| {
                if seen.insert(row.id.clone()) {
                    return true;
                }
                diagnostics.push(Rejection::DuplicateId.to_diagnostic(&row.id));
                false
            })
            .collect()
    }
}

/// Remove columns that must not be published.
pub struct Redaction {
    pub columns: Vec<String>,
}

impl RowFilter for Redaction {
    fn name(&self) -> &'static str {
        "redaction"
    }

    fn apply(&self, mut rows: Vec<CatalogRow>, diagnostics: &mut Diagnostics) -> Vec<CatalogRow> {
        if self.columns.is_empty() {
            return rows;
        }
        for row in &mut rows {
            for column in &self.columns {
                row.remove(column);
            }
        }
        diagnostics.push(Diagnostic::info(
            None,
            format!("Dropped private columns: {}", self.columns.join(", ")),
        ));
        rows
    }
}
