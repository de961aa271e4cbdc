//! Library configuration module.
//!
//! Handles loading, validating, and merging `library-config.toml`. Every key is
//! optional: stock defaults are the base layer and the user file only needs the
//! values it wants to override.
//!
//! ## Configuration Options
//!
//! ```toml
//! [docs]
//! file_pattern = "**/*.pdf"          # Which source files `sync` considers
//! src_path = "library-src"           # Tree the documents are copied from
//! dest_path = "src/statics/data"     # Directory the website serves downloads from
//!
//! [files]
//! catalog_csv = "outputs/library-index.csv"
//! index_json = "src/statics/library-index.json"
//! query_config_json = "src/statics/query-config.json"
//! search_config_csv = "outputs/search-config.csv"
//! filter_config_csv = "outputs/filter-config.csv"
//! display_config_csv = "outputs/doc-display-config.csv"
//!
//! [labels]                           # Catalog column names
//! id = "ID"
//! access = "Access_Rights"
//! filename = "File_name"
//! published_url = "URL"
//! status = "Status"
//! display_url = "URL"                # Column written with the resolved link
//! display_icon = "icon"              # Column written with the resolved icon
//!
//! [access_values]
//! open = "free to download"
//! physical_library = "request from jcu library"
//! publisher = "download from publisher"
//!
//! [status_values]
//! active = "Active"
//! deleted = "Deleted"
//!
//! [icons]
//! webpage = "open_in_new"
//! download = "file_download"
//! library = "local_library"
//!
//! [urls]
//! physical_library = "https://www.jcu.edu.au/library"
//! download = "/statics/data/"
//!
//! [catalog]
//! multi_option_columns = ["Catchment", "State", "Habitat_type", "Region"]
//! ```
//!
//! Relative paths are resolved against the directory holding the config file,
//! so a run behaves the same regardless of the working directory.
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file name looked up by the CLI.
pub const DEFAULT_CONFIG_FILE: &str = "library-config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Complete configuration for one library.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LibraryConfig {
    /// Document source/destination directories for `sync` and `index`.
    pub docs: DocsConfig,
    /// Input and output file locations.
    pub files: FilesConfig,
    /// Catalog column names.
    pub labels: LabelConfig,
    /// Tokens of the access-rights column.
    pub access_values: AccessValues,
    /// Tokens of the status column.
    pub status_values: StatusValues,
    /// Icon names attached to resolved records.
    pub icons: IconConfig,
    /// Fixed URLs used by the access resolver.
    pub urls: UrlConfig,
    /// Catalog shape settings.
    pub catalog: CatalogConfig,
}

impl LibraryConfig {
    /// Validate values that would otherwise produce a silently broken index.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required_labels = [
            ("labels.id", &self.labels.id),
            ("labels.access", &self.labels.access),
            ("labels.filename", &self.labels.filename),
            ("labels.published_url", &self.labels.published_url),
            ("labels.display_url", &self.labels.display_url),
            ("labels.display_icon", &self.labels.display_icon),
        ];
        for (key, value) in required_labels {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        if self.labels.display_url == self.labels.display_icon {
            return Err(ConfigError::Validation(
                "labels.display_url and labels.display_icon must differ".into(),
            ));
        }

        let tokens = [
            &self.access_values.open,
            &self.access_values.physical_library,
            &self.access_values.publisher,
        ];
        if tokens.iter().any(|t| t.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "access_values entries must not be empty".into(),
            ));
        }
        for (i, a) in tokens.iter().enumerate() {
            for b in &tokens[i + 1..] {
                if a.trim().to_lowercase() == b.trim().to_lowercase() {
                    return Err(ConfigError::Validation(format!(
                        "access_values must be distinct, '{a}' appears twice"
                    )));
                }
            }
        }

        if self.status_values.active.trim().is_empty() {
            return Err(ConfigError::Validation(
                "status_values.active must not be empty".into(),
            ));
        }
        if self.docs.file_pattern.trim().is_empty() {
            return Err(ConfigError::Validation(
                "docs.file_pattern must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Make every relative path absolute against `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let paths = [
            &mut self.docs.src_path,
            &mut self.docs.dest_path,
            &mut self.files.catalog_csv,
            &mut self.files.index_json,
            &mut self.files.query_config_json,
            &mut self.files.search_config_csv,
            &mut self.files.filter_config_csv,
            &mut self.files.display_config_csv,
        ];
        for path in paths {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

/// Where documents come from and where the website serves them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocsConfig {
    /// Glob matched against paths relative to `src_path`.
    pub file_pattern: String,
    pub src_path: PathBuf,
    pub dest_path: PathBuf,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            file_pattern: "**/*.pdf".to_string(),
            src_path: PathBuf::from("library-src"),
            dest_path: PathBuf::from("src/statics/data"),
        }
    }
}

/// Input CSV exports and generated JSON outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilesConfig {
    pub catalog_csv: PathBuf,
    pub index_json: PathBuf,
    pub query_config_json: PathBuf,
    pub search_config_csv: PathBuf,
    pub filter_config_csv: PathBuf,
    pub display_config_csv: PathBuf,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            catalog_csv: PathBuf::from("outputs/library-index.csv"),
            index_json: PathBuf::from("src/statics/library-index.json"),
            query_config_json: PathBuf::from("src/statics/query-config.json"),
            search_config_csv: PathBuf::from("outputs/search-config.csv"),
            filter_config_csv: PathBuf::from("outputs/filter-config.csv"),
            display_config_csv: PathBuf::from("outputs/doc-display-config.csv"),
        }
    }
}

/// Catalog column names. `status` may be absent from the catalog itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LabelConfig {
    pub id: String,
    pub access: String,
    pub filename: String,
    pub published_url: String,
    pub status: String,
    /// Column that receives the resolved link (may coincide with `published_url`).
    pub display_url: String,
    /// Column that receives the resolved icon name.
    pub display_icon: String,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            id: "ID".to_string(),
            access: "Access_Rights".to_string(),
            filename: "File_name".to_string(),
            published_url: "URL".to_string(),
            status: "Status".to_string(),
            display_url: "URL".to_string(),
            display_icon: "icon".to_string(),
        }
    }
}

/// Access-rights tokens. Matching is case-insensitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccessValues {
    pub open: String,
    pub physical_library: String,
    pub publisher: String,
}

impl Default for AccessValues {
    fn default() -> Self {
        Self {
            open: "free to download".to_string(),
            physical_library: "request from jcu library".to_string(),
            publisher: "download from publisher".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatusValues {
    pub active: String,
    pub deleted: String,
}

impl Default for StatusValues {
    fn default() -> Self {
        Self {
            active: "Active".to_string(),
            deleted: "Deleted".to_string(),
        }
    }
}

/// Icon names understood by the front-end (Material icon ligatures).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IconConfig {
    pub webpage: String,
    pub download: String,
    pub library: String,
}

impl Default for IconConfig {
    fn default() -> Self {
        Self {
            webpage: "open_in_new".to_string(),
            download: "file_download".to_string(),
            library: "local_library".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UrlConfig {
    /// Landing page for documents held by the physical library.
    pub physical_library: String,
    /// Public prefix the normalized file name is appended to.
    pub download: String,
}

impl Default for UrlConfig {
    fn default() -> Self {
        Self {
            physical_library: "https://www.jcu.edu.au/library".to_string(),
            download: "/statics/data/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    /// Columns whose cells hold comma separated tokens.
    pub multi_option_columns: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            multi_option_columns: ["Catchment", "State", "Habitat_type", "Region"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(LibraryConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// A missing file is an error: running against stock defaults by accident
/// would publish an index built from the wrong catalog.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Merge an overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: toml::Value,
) -> Result<LibraryConfig, ConfigError> {
    let config: LibraryConfig = merge_toml(base, overlay).try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load, merge, validate, and anchor a config file.
pub fn load_config(path: &Path) -> Result<LibraryConfig, ConfigError> {
    let overlay = load_raw_config(path)?;
    let mut config = resolve_config(stock_defaults_value(), overlay)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    config.resolve_paths(base);
    Ok(config)
}

/// Returns a fully-commented stock `library-config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Library Index Configuration
# ===========================
# All settings are optional. Values shown below are the defaults.
# Relative paths are resolved against the directory holding this file.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Documents
# ---------------------------------------------------------------------------
[docs]
# Glob (relative to src_path) selecting the documents `sync` may copy.
file_pattern = "**/*.pdf"
# Tree the open-access documents are copied from.
src_path = "library-src"
# Directory the website serves downloads from. Its listing decides whether an
# open-access document exists.
dest_path = "src/statics/data"

# ---------------------------------------------------------------------------
# Input exports and generated outputs
# ---------------------------------------------------------------------------
[files]
catalog_csv = "outputs/library-index.csv"
index_json = "src/statics/library-index.json"
query_config_json = "src/statics/query-config.json"
# One-row tables of per-column flags, exported from the catalog spreadsheet.
search_config_csv = "outputs/search-config.csv"
filter_config_csv = "outputs/filter-config.csv"
display_config_csv = "outputs/doc-display-config.csv"

# ---------------------------------------------------------------------------
# Catalog column names
# ---------------------------------------------------------------------------
[labels]
id = "ID"
access = "Access_Rights"
filename = "File_name"
published_url = "URL"
# Optional in the catalog. Without it every row counts as active.
status = "Status"
# Columns written with the resolved link and icon.
display_url = "URL"
display_icon = "icon"

# ---------------------------------------------------------------------------
# Access-rights tokens (compared case-insensitively)
# ---------------------------------------------------------------------------
[access_values]
open = "free to download"
physical_library = "request from jcu library"
publisher = "download from publisher"

[status_values]
active = "Active"
deleted = "Deleted"

# ---------------------------------------------------------------------------
# Display metadata
# ---------------------------------------------------------------------------
[icons]
webpage = "open_in_new"
download = "file_download"
library = "local_library"

[urls]
physical_library = "https://www.jcu.edu.au/library"
# Prefix for open-access downloads; the normalized file name is appended.
download = "/statics/data/"

# ---------------------------------------------------------------------------
# Catalog shape
# ---------------------------------------------------------------------------
[catalog]
# Columns holding comma separated tokens, emitted as JSON arrays.
multi_option_columns = ["Catchment", "State", "Habitat_type", "Region"]
"##
}
