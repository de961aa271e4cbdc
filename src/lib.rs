//! # Library Index
//!
//! Publishes a document library catalog as static assets for a website's
//! client-side search page. The catalog is a spreadsheet export; the outputs
//! are two JSON files the page loads at startup.
//!
//! # Architecture: Two Commands
//!
//! ```text
//! sync    library-src/  →  src/statics/data/     (copy open-access documents)
//! index   catalog.csv   →  library-index.json    (published records)
//!                       →  query-config.json     (search + filter config)
//! ```
//!
//! `build` runs both in order. Each command reads the same
//! `library-config.toml`.
//!
//! Inside `index` every catalog row flows through the same stages:
//!
//! ```text
//! load ──► normalize ──► filter pipeline ──► access resolver ──► emit
//!          trim, split    status, access,     display URL/icon,
//!          multi-option   file existence,     rename to
//!          columns        publisher URL,      normalized name
//!                         duplicates,
//!                         redaction
//! ```
//!
//! A row that fails a check is dropped and logged with its ID; the run goes
//! on. Only problems that make the whole run meaningless stop it.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `library-config.toml` loading, stock defaults, validation |
//! | [`catalog`] | Catalog CSV loading, schema check, row normalization |
//! | [`control`] | One-row search/filter/display control tables |
//! | [`inventory`] | Destination directory snapshot, filename normalization and rename |
//! | [`access`] | Access-rights classification and display link resolution |
//! | [`filter`] | Ordered row filter stages |
//! | [`emit`] | Document index and query config JSON |
//! | [`index`] | The `index` command pipeline |
//! | [`sync`] | The `sync` command: source tree to destination copy |
//! | [`fsops`] | Filesystem seam for rename, copy and write |
//! | [`output`] | Diagnostics and CLI summary formatting |
//! | [`types`] | Shared row, cell and rejection types |
//!
//! # Design Decisions
//!
//! ## One Directory Listing Per Run
//!
//! The destination directory is listed once into an
//! [`Inventory`](inventory::Inventory). Existence checks are map lookups and
//! renames update the map in place, so a file renamed for one row is found
//! under its new name by the next.
//!
//! ## Dry Run Through the Same Code Path
//!
//! `--dry-run` swaps the [`FileOps`](fsops::FileOps) implementation for one
//! that does nothing. Every check, counter and diagnostic runs unchanged, so a
//! dry run reports exactly what a live run would do.
//!
//! ## Typed Fields Next to Published Columns
//!
//! The fields decisions depend on (id, access, filename, published URL,
//! status) are pulled out of the row once at load time. Redaction then only
//! ever touches what gets published, never what the pipeline reasons about.

pub mod access;
pub mod catalog;
pub mod config;
pub mod control;
pub mod emit;
pub mod filter;
pub mod fsops;
pub mod index;
pub mod inventory;
pub mod output;
pub mod sync;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
