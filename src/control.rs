//! One-row control tables.
//!
//! The catalog spreadsheet carries three rows of per-column flags above the
//! data: which columns are searchable, which become filters, and which are
//! shown publicly. Each is exported to its own CSV: the catalog header
//! followed by a single row of booleans.
//!
//! ```text
//! ID,Title,Year,Access_Rights,Notes
//! Search,True,True,False,False
//! ```
//!
//! The id column is the row key and never counts as a flag. Flags accept
//! `true/false`, `yes/no`, `1/0` (any case) and the raw spreadsheet tokens
//! (`Filter_yes`, `Search_no`, `FullDisplay_yes`, ...). Empty cells are `false`.

use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControlTableError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Control table has no flag row")]
    Empty,
    #[error("Invalid flag '{value}' for column '{column}'")]
    InvalidFlag { column: String, value: String },
    #[error("Control table names column '{0}' which is not in the catalog")]
    UnknownColumn(String),
}

/// Column name → flag, in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlTable {
    flags: Vec<(String, bool)>,
}

impl ControlTable {
    pub fn from_flags<I, S>(flags: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        Self {
            flags: flags.into_iter().map(|(c, f)| (c.into(), f)).collect(),
        }
    }

    /// Columns flagged `true`.
    pub fn enabled(&self) -> Vec<&str> {
        self.columns_with(true)
    }

    /// Columns flagged `false`.
    pub fn disabled(&self) -> Vec<&str> {
        self.columns_with(false)
    }

    fn columns_with(&self, flag: bool) -> Vec<&str> {
        self.flags
            .iter()
            .filter(|(_, f)| *f == flag)
            .map(|(c, _)| c.as_str())
            .collect()
    }

    /// Fail on the first column that the catalog header doesn't have.
    pub fn check_columns(&self, headers: &[String]) -> Result<(), ControlTableError> {
        match self.flags.iter().find(|(c, _)| !headers.contains(c)) {
            Some((column, _)) => Err(ControlTableError::UnknownColumn(column.clone())),
            None => Ok(()),
        }
    }
}

pub fn load_control_table(path: &Path, id_label: &str) -> Result<ControlTable, ControlTableError> {
    let reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    read_control_table(reader, id_label)
}

pub fn parse_control_table<R: io::Read>(
    input: R,
    id_label: &str,
) -> Result<ControlTable, ControlTableError> {
    let reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    read_control_table(reader, id_label)
}

fn read_control_table<R: io::Read>(
    mut reader: csv::Reader<R>,
    id_label: &str,
) -> Result<ControlTable, ControlTableError> {
    let headers = reader.headers()?.clone();
    let record = reader
        .records()
        .next()
        .ok_or(ControlTableError::Empty)??;

    let mut flags = Vec::new();
    for (i, column) in headers.iter().enumerate() {
        let column = column.trim();
        if column == id_label {
            continue;
        }
        let value = record.get(i).unwrap_or("");
        let flag = parse_flag(value).ok_or_else(|| ControlTableError::InvalidFlag {
            column: column.to_string(),
            value: value.to_string(),
        })?;
        flags.push((column.to_string(), flag));
    }
    Ok(ControlTable { flags })
}

/// Parse one flag cell. `None` for anything unrecognized.
pub fn parse_flag(value: &str) -> Option<bool> {
    let value = value.trim().to_ascii_lowercase();
    // Spreadsheet tokens look like `Filter_yes` / `FullDisplay_no`.
    if let Some(token) = TOKEN_PREFIXES.iter().find_map(|p| value.strip_prefix(p)) {
        return match token {
            "yes" => Some(true),
            "no" => Some(false),
            _ => None,
        };
    }
    match value.as_str() {
        "" | "false" | "no" | "0" => Some(false),
        "true" | "yes" | "1" => Some(true),
        _ => None,
    }
}

const TOKEN_PREFIXES: &[&str] = &["filter_", "search_", "fulldisplay_"];
