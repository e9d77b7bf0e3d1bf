//! Error types for cardiotree-io.

use std::path::PathBuf;

use crate::domain::ColumnType;

/// Errors from building or reshaping an in-memory [`Table`](crate::Table).
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// Returned when two columns share a name.
    #[error("duplicate column name \"{name}\"")]
    DuplicateColumn {
        /// The duplicated name.
        name: String,
    },

    /// Returned when a column's length differs from the table's row count.
    #[error("column \"{column}\" has {got} rows, expected {expected}")]
    ColumnLength {
        /// Name of the offending column.
        column: String,
        /// Row count of the table.
        expected: usize,
        /// Length of the offending column.
        got: usize,
    },

    /// Returned when a named column does not exist.
    #[error("unknown column \"{name}\"")]
    UnknownColumn {
        /// The requested name.
        name: String,
    },

    /// Returned when a categorical code does not index into the level set.
    #[error("categorical code {code} at row {row} is out of range for {n_levels} levels")]
    CodeOutOfRange {
        /// Zero-based row position.
        row: usize,
        /// The offending code.
        code: u32,
        /// Number of levels.
        n_levels: usize,
    },
}

/// Errors from loading a delimited text file into a [`Table`](crate::Table).
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the header row has no columns.
    #[error("no columns in header of {path}")]
    NoColumns {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when the CSV file contains a header but zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a data row has a different number of columns than the header.
    #[error("inconsistent row length in {path}: row {row_index} has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Expected number of columns (from header).
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when a column named in the configured roles is not in the header.
    #[error("column \"{column}\" ({role}) not found in {path}")]
    MissingColumn {
        /// Path to the CSV file.
        path: PathBuf,
        /// The configured column name.
        column: String,
        /// Which role named it.
        role: &'static str,
    },

    /// Returned when a column's inferred type does not fit its role.
    #[error("column \"{column}\" in {path} is {found}, expected {expected}: row {row_index} holds \"{raw}\"")]
    SchemaMismatch {
        /// Path to the CSV file.
        path: PathBuf,
        /// The offending column.
        column: String,
        /// The type the role requires.
        expected: ColumnType,
        /// The inferred type.
        found: ColumnType,
        /// Zero-based row index of the first offending cell.
        row_index: usize,
        /// The raw text of the first offending cell.
        raw: String,
    },

    /// Returned when the parsed columns cannot form a table.
    #[error("invalid table in {path}")]
    Table {
        /// Path to the CSV file.
        path: PathBuf,
        /// Underlying table error.
        source: TableError,
    },
}

/// Errors from writing result artifacts.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// Returned when the experiment name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid experiment name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidExperimentName {
        /// The invalid name.
        name: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a result cannot be serialized to JSON.
    #[error("cannot serialize result for {path}")]
    Serialize {
        /// Destination path.
        path: PathBuf,
        /// Underlying serde error.
        source: serde_json::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
