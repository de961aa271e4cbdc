//! Access-rights resolution.
//!
//! Every catalog row declares how a reader obtains the document. That one
//! value decides both the link the website shows and which checks the row
//! must pass:
//!
//! | Classification | Requires | Display URL | Icon |
//! |---|---|---|---|
//! | [`PhysicalLibrary`](AccessClassification::PhysicalLibrary) | nothing | `urls.physical_library` | `icons.library` |
//! | [`OpenDownload`](AccessClassification::OpenDownload) | a file in the destination directory | `urls.download` + normalized name | `icons.download` |
//! | [`PublisherLink`](AccessClassification::PublisherLink) | a published URL | the published URL | `icons.webpage` |
//!
//! Any other value rejects the row.

use crate::config::{AccessValues, LibraryConfig};
use crate::inventory::Reconciler;
use crate::output::Diagnostics;
use crate::types::{Cell, CatalogRow, Rejection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessClassification {
    PhysicalLibrary,
    OpenDownload,
    PublisherLink,
}

impl AccessClassification {
    /// Match an access cell against the configured tokens, ignoring case.
    pub fn parse(value: &str, tokens: &AccessValues) -> Option<Self> {
        let value = value.trim().to_lowercase();
        let is = |token: &str| token.trim().to_lowercase() == value;
        if is(&tokens.physical_library) {
            Some(Self::PhysicalLibrary)
        } else if is(&tokens.open) {
            Some(Self::OpenDownload)
        } else if is(&tokens.publisher) {
            Some(Self::PublisherLink)
        } else {
            None
        }
    }
}

/// The link and icon a record is published with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayLink {
    pub url: String,
    pub icon: String,
}

pub struct AccessResolver<'a> {
    config: &'a LibraryConfig,
    reconciler: Reconciler<'a>,
}

impl<'a> AccessResolver<'a> {
    pub fn new(config: &'a LibraryConfig, reconciler: Reconciler<'a>) -> Self {
        Self { config, reconciler }
    }

    pub fn reconciler(&self) -> &Reconciler<'a> {
        &self.reconciler
    }

    /// Work out how a reader reaches the document in `row`.
    pub fn resolve(
        &mut self,
        row: &CatalogRow,
        diagnostics: &mut Diagnostics,
    ) -> Result<DisplayLink, Rejection> {
        let config = self.config;
        let access = &config.access_values;
        let labels = &config.labels;
        let Some(classification) = AccessClassification::parse(&row.access, access) else {
            return Err(Rejection::InvalidAccess {
                label: labels.access.clone(),
                value: row.access.clone(),
            });
        };

        match classification {
            AccessClassification::PhysicalLibrary => Ok(DisplayLink {
                url: config.urls.physical_library.clone(),
                icon: config.icons.library.clone(),
            }),
            AccessClassification::OpenDownload => {
                if row.filename.is_empty() {
                    return Err(Rejection::EmptyFilename {
                        access: access.open.clone(),
                        label: labels.filename.clone(),
                    });
                }
                let name = self
                    .reconciler
                    .reconcile(&row.id, &row.filename, diagnostics)?;
                Ok(DisplayLink {
                    url: format!("{}{}", config.urls.download, name),
                    icon: config.icons.download.clone(),
                })
            }
            AccessClassification::PublisherLink => {
                if row.published_url.is_empty() {
                    return Err(Rejection::MissingPublishedUrl {
                        access: access.publisher.clone(),
                        label: labels.published_url.clone(),
                    });
                }
                Ok(DisplayLink {
                    url: row.published_url.clone(),
                    icon: config.icons.webpage.clone(),
                })
            }
        }
    }

    /// Resolve every row, attaching the display columns. Rejected rows are
    /// dropped with a diagnostic; order is preserved.
    pub fn apply(&mut self, rows: Vec<CatalogRow>, diagnostics: &mut Diagnostics) -> Vec<CatalogRow> {
        let mut kept = Vec::with_capacity(rows.len());
        for mut row in rows {
            match self.resolve(&row, diagnostics) {
                Ok(link) => {
                    row.set(&self.config.labels.display_url, Cell::Text(link.url));
                    row.set(&self.config.labels.display_icon, Cell::Text(link.icon));
                    kept.push(row);
                }
                Err(rejection) => diagnostics.push(rejection.to_diagnostic(&row.id)),
            }
        }
        kept
    }
}
