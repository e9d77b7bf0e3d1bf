//! File loading, schema validation and result export for the cardiotree pipeline.

mod domain;
mod error;
mod reader;
mod schema;
mod writer;

pub use domain::{
    Categorical, Column, ColumnData, ColumnRole, ColumnType, ExperimentName, Field, RowId, Schema,
    SchemaField, Table,
};
pub use error::{LoadError, TableError, WriteError};
pub use reader::{DEFAULT_MISSING_TOKENS, TableReader};
pub use schema::ColumnRoles;
pub use writer::ResultWriter;
