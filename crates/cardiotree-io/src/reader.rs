//! Delimited text reader with type inference and schema validation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::domain::{Column, ColumnData, ColumnRole, ColumnType, Field, Table};
use crate::schema::ColumnRoles;
use crate::LoadError;

/// Tokens treated as missing when no others are configured.
pub const DEFAULT_MISSING_TOKENS: [&str; 3] = ["", "NA", "?"];

/// Reads a delimited text file with a header row into a [`Table`].
///
/// Each column is inferred as numeric when every non-missing cell parses as
/// a finite `f64`, and as text otherwise. When [`ColumnRoles`] are supplied,
/// roles are validated against the header and inferred types before any
/// table is built.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`LoadError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`LoadError::CsvParse`] | Malformed CSV record |
/// | [`LoadError::NoColumns`] | Header row is empty |
/// | [`LoadError::EmptyDataset`] | Zero data rows after header |
/// | [`LoadError::InconsistentRowLength`] | Row has different column count than header |
/// | [`LoadError::MissingColumn`] | A configured column is not in the header |
/// | [`LoadError::SchemaMismatch`] | A numeric-role column holds text |
/// | [`LoadError::Table`] | Duplicate header names |
pub struct TableReader {
    path: PathBuf,
    roles: Option<ColumnRoles>,
    delimiter: u8,
    missing_tokens: Vec<String>,
}

impl TableReader {
    /// Create a new reader for the given file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            roles: None,
            delimiter: b',',
            missing_tokens: DEFAULT_MISSING_TOKENS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Validate columns against the given roles.
    ///
    /// Without roles, numeric columns become [`ColumnRole::Numeric`] and text
    /// columns [`ColumnRole::Categorical`].
    #[must_use]
    pub fn with_roles(mut self, roles: ColumnRoles) -> Self {
        self.roles = Some(roles);
        self
    }

    /// Set the field delimiter.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set the cell values treated as missing (compared after trimming).
    #[must_use]
    pub fn with_missing_tokens(mut self, tokens: Vec<String>) -> Self {
        self.missing_tokens = tokens;
        self
    }

    /// Read and validate the file, returning a [`Table`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Table, LoadError> {
        let file = std::fs::File::open(&self.path).map_err(|e| LoadError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) lets our own InconsistentRowLength check fire
        // instead of a low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_reader(file);

        let header: Vec<String> = rdr
            .headers()
            .map_err(|e| self.csv_error(e))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let expected_cols = header.len();
        if expected_cols == 0 || (expected_cols == 1 && header[0].is_empty()) {
            return Err(LoadError::NoColumns {
                path: self.path.clone(),
            });
        }
        debug!(expected_cols, "read header");

        let missing: HashSet<&str> = self.missing_tokens.iter().map(String::as_str).collect();
        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); expected_cols];

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;
            if record.len() != expected_cols {
                return Err(LoadError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: expected_cols,
                    got: record.len(),
                });
            }
            for (col, raw) in record.iter().enumerate() {
                let raw = raw.trim();
                let value = (!missing.contains(raw)).then(|| raw.to_string());
                cells[col].push(value);
            }
        }

        let n_rows = cells[0].len();
        if n_rows == 0 {
            return Err(LoadError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let inferred: Vec<ColumnType> = cells.iter().map(|c| infer_type(c)).collect();
        let roles = match &self.roles {
            Some(roles) => roles.resolve(&self.path, &header, &inferred, |col| {
                first_non_numeric(&cells[col])
            })?,
            None => inferred
                .iter()
                .map(|t| match t {
                    ColumnType::Numeric => ColumnRole::Numeric,
                    _ => ColumnRole::Categorical,
                })
                .collect(),
        };

        let columns: Vec<Column> = header
            .into_iter()
            .zip(cells)
            .zip(inferred.iter().zip(&roles))
            .map(|((name, values), (&column_type, &role))| {
                let data = match column_type {
                    ColumnType::Numeric => ColumnData::Numeric(
                        values
                            .iter()
                            .map(|v| v.as_deref().and_then(parse_finite))
                            .collect(),
                    ),
                    _ => ColumnData::Text(values),
                };
                Column::new(Field::new(name, role), data)
            })
            .collect();

        let table = Table::new(columns).map_err(|e| LoadError::Table {
            path: self.path.clone(),
            source: e,
        })?;

        info!(
            n_rows = table.n_rows(),
            n_cols = table.n_cols(),
            n_numeric = inferred.iter().filter(|t| **t == ColumnType::Numeric).count(),
            "table loaded"
        );

        Ok(table)
    }

    fn csv_error(&self, e: csv::Error) -> LoadError {
        LoadError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn infer_type(values: &[Option<String>]) -> ColumnType {
    if first_non_numeric(values).is_none() {
        ColumnType::Numeric
    } else {
        ColumnType::Text
    }
}

fn first_non_numeric(values: &[Option<String>]) -> Option<(usize, String)> {
    values.iter().enumerate().find_map(|(row, v)| {
        v.as_deref()
            .filter(|raw| parse_finite(raw).is_none())
            .map(|raw| (row, raw.to_string()))
    })
}
