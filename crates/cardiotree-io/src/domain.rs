//! Domain types for cardiotree-io: tables, columns and row identity.

use std::collections::HashSet;

use serde::Serialize;

use crate::TableError;

/// Stable identity of a data row.
///
/// Assigned once at load time as the zero-based position of the row in the
/// source file (header excluded) and carried unchanged through partitioning
/// and cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RowId(usize);

impl RowId {
    /// Create a row identity from a zero-based source position.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based source position.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The part a column plays in the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    /// A numeric measurement used as a feature.
    Numeric,
    /// A categorical code used as a feature.
    Categorical,
    /// The class label.
    Outcome,
    /// Carried along but never used as a feature (e.g. a record id).
    Ignored,
}

/// The storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Finite floating point values.
    Numeric,
    /// Free text values.
    Text,
    /// Codes into a fixed, ordered level set.
    Categorical,
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ColumnType::Numeric => "numeric",
            ColumnType::Text => "text",
            ColumnType::Categorical => "categorical",
        };
        f.write_str(s)
    }
}

/// Name and role of a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Field {
    name: String,
    role: ColumnRole,
}

impl Field {
    /// Create a field.
    #[must_use]
    pub fn new(name: impl Into<String>, role: ColumnRole) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }

    /// Return the column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the column role.
    #[must_use]
    pub fn role(&self) -> ColumnRole {
        self.role
    }
}

/// Categorical column storage: an ordered level set plus per-row codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Categorical {
    levels: Vec<String>,
    codes: Vec<Option<u32>>,
}

impl Categorical {
    /// Create categorical storage.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::CodeOutOfRange`] if any code is not a valid
    /// index into `levels`.
    pub fn new(levels: Vec<String>, codes: Vec<Option<u32>>) -> Result<Self, TableError> {
        if let Some((row, code)) = codes
            .iter()
            .enumerate()
            .find_map(|(row, c)| c.filter(|&c| c as usize >= levels.len()).map(|c| (row, c)))
        {
            return Err(TableError::CodeOutOfRange {
                row,
                code,
                n_levels: levels.len(),
            });
        }
        Ok(Self { levels, codes })
    }

    /// Build categorical storage from string labels, with levels sorted.
    #[must_use]
    pub fn from_labels(labels: &[Option<String>]) -> Self {
        let mut levels: Vec<String> = labels
            .iter()
            .flatten()
            .cloned()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        levels.sort();
        let codes = labels
            .iter()
            .map(|l| {
                l.as_ref()
                    .and_then(|l| levels.binary_search(l).ok())
                    .map(|i| i as u32)
            })
            .collect();
        Self { levels, codes }
    }

    /// Return the level names.
    #[must_use]
    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    /// Return the per-row codes.
    #[must_use]
    pub fn codes(&self) -> &[Option<u32>] {
        &self.codes
    }

    /// Return the level label of a row, or `None` when missing.
    #[must_use]
    pub fn label(&self, row: usize) -> Option<&str> {
        self.codes[row].map(|c| self.levels[c as usize].as_str())
    }
}

/// Typed column values. `None` marks a missing value.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Finite floating point values.
    Numeric(Vec<Option<f64>>),
    /// Free text values.
    Text(Vec<Option<String>>),
    /// Level codes.
    Categorical(Categorical),
}

impl ColumnData {
    /// Return the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
            ColumnData::Categorical(c) => c.codes.len(),
        }
    }

    /// Return `true` when the column holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the storage type.
    #[must_use]
    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnData::Numeric(_) => ColumnType::Numeric,
            ColumnData::Text(_) => ColumnType::Text,
            ColumnData::Categorical(_) => ColumnType::Categorical,
        }
    }

    /// Return `true` if the value at `row` is missing.
    #[must_use]
    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            ColumnData::Numeric(v) => v[row].is_none(),
            ColumnData::Text(v) => v[row].is_none(),
            ColumnData::Categorical(c) => c.codes[row].is_none(),
        }
    }

    /// Return the value at `row` rendered as a label, or `None` when missing.
    ///
    /// Numbers use `f64`'s `Display`, so integral values render without a
    /// fractional part (`1.0` becomes `"1"`).
    #[must_use]
    pub fn label(&self, row: usize) -> Option<String> {
        match self {
            ColumnData::Numeric(v) => v[row].map(|x| x.to_string()),
            ColumnData::Text(v) => v[row].clone(),
            ColumnData::Categorical(c) => c.label(row).map(str::to_string),
        }
    }

    /// Return the values at the given row positions, in order.
    #[must_use]
    pub fn take(&self, rows: &[usize]) -> ColumnData {
        match self {
            ColumnData::Numeric(v) => ColumnData::Numeric(rows.iter().map(|&r| v[r]).collect()),
            ColumnData::Text(v) => ColumnData::Text(rows.iter().map(|&r| v[r].clone()).collect()),
            ColumnData::Categorical(c) => ColumnData::Categorical(Categorical {
                levels: c.levels.clone(),
                codes: rows.iter().map(|&r| c.codes[r]).collect(),
            }),
        }
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    field: Field,
    data: ColumnData,
}

impl Column {
    /// Create a column from a field and its data.
    #[must_use]
    pub fn new(field: Field, data: ColumnData) -> Self {
        Self { field, data }
    }

    /// Convenience constructor for a numeric column.
    #[must_use]
    pub fn numeric(name: impl Into<String>, role: ColumnRole, values: Vec<Option<f64>>) -> Self {
        Self::new(Field::new(name, role), ColumnData::Numeric(values))
    }

    /// Convenience constructor for a text column.
    #[must_use]
    pub fn text(name: impl Into<String>, role: ColumnRole, values: Vec<Option<String>>) -> Self {
        Self::new(Field::new(name, role), ColumnData::Text(values))
    }

    /// Return the field.
    #[must_use]
    pub fn field(&self) -> &Field {
        &self.field
    }

    /// Return the column name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.field.name()
    }

    /// Return the column role.
    #[must_use]
    pub fn role(&self) -> ColumnRole {
        self.field.role()
    }

    /// Return the column data.
    #[must_use]
    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    /// Return a copy of this column with its data replaced.
    #[must_use]
    pub fn with_data(&self, data: ColumnData) -> Self {
        Self {
            field: self.field.clone(),
            data,
        }
    }

    /// Return the number of missing values.
    #[must_use]
    pub fn missing_count(&self) -> usize {
        (0..self.data.len()).filter(|&r| self.data.is_missing(r)).count()
    }

    /// Return the fraction of missing values, `0.0` for an empty column.
    #[must_use]
    pub fn missing_fraction(&self) -> f64 {
        let n = self.data.len();
        if n == 0 {
            0.0
        } else {
            self.missing_count() as f64 / n as f64
        }
    }
}

/// One entry of a table [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaField {
    /// Column name.
    pub name: String,
    /// Storage type.
    pub column_type: ColumnType,
    /// Analysis role.
    pub role: ColumnRole,
}

/// Ordered `(name, type, role)` description of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    /// Fields in column order.
    pub fields: Vec<SchemaField>,
}

impl Schema {
    /// Return the column names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// An immutable, column-oriented table with per-row identity.
///
/// Every operation returns a new table; nothing is modified in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    row_ids: Vec<RowId>,
}

impl Table {
    /// Create a table, assigning row ids `0..n` in order.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TableError::DuplicateColumn`] | Two columns share a name |
    /// | [`TableError::ColumnLength`] | Columns have different lengths |
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        let n_rows = columns.first().map_or(0, |c| c.data.len());
        Self::with_row_ids(columns, (0..n_rows).map(RowId::new).collect())
    }

    /// Create a table with explicit row ids.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TableError::DuplicateColumn`] | Two columns share a name |
    /// | [`TableError::ColumnLength`] | A column length differs from `row_ids.len()` |
    pub fn with_row_ids(columns: Vec<Column>, row_ids: Vec<RowId>) -> Result<Self, TableError> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name()) {
                return Err(TableError::DuplicateColumn {
                    name: column.name().to_string(),
                });
            }
            if column.data.len() != row_ids.len() {
                return Err(TableError::ColumnLength {
                    column: column.name().to_string(),
                    expected: row_ids.len(),
                    got: column.data.len(),
                });
            }
        }
        Ok(Self { columns, row_ids })
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.row_ids.len()
    }

    /// Return the number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Return `true` when the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row_ids.is_empty()
    }

    /// Return the columns in order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Return the row ids in order.
    #[must_use]
    pub fn row_ids(&self) -> &[RowId] {
        &self.row_ids
    }

    /// Look up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Return the column names in order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name().to_string()).collect()
    }

    /// Describe the table as an ordered schema.
    #[must_use]
    pub fn schema(&self) -> Schema {
        Schema {
            fields: self
                .columns
                .iter()
                .map(|c| SchemaField {
                    name: c.name().to_string(),
                    column_type: c.data.column_type(),
                    role: c.role(),
                })
                .collect(),
        }
    }

    /// Return `true` if any column is missing a value at `row`.
    #[must_use]
    pub fn row_has_missing(&self, row: usize) -> bool {
        self.columns.iter().any(|c| c.data.is_missing(row))
    }

    /// Return a table holding only the rows at the given positions.
    #[must_use]
    pub fn select_rows(&self, rows: &[usize]) -> Table {
        Table {
            columns: self
                .columns
                .iter()
                .map(|c| c.with_data(c.data.take(rows)))
                .collect(),
            row_ids: rows.iter().map(|&r| self.row_ids[r]).collect(),
        }
    }

    /// Return a table holding only the columns for which `keep` is true.
    #[must_use]
    pub fn retain_columns(&self, mut keep: impl FnMut(&Column) -> bool) -> Table {
        Table {
            columns: self.columns.iter().filter(|c| keep(c)).cloned().collect(),
            row_ids: self.row_ids.clone(),
        }
    }

    /// Return a table with the named column replaced.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TableError::UnknownColumn`] | No column has `column.name()` |
    /// | [`TableError::ColumnLength`] | The replacement has a different length |
    pub fn replace_column(&self, column: Column) -> Result<Table, TableError> {
        let position = self
            .columns
            .iter()
            .position(|c| c.name() == column.name())
            .ok_or_else(|| TableError::UnknownColumn {
                name: column.name().to_string(),
            })?;
        if column.data.len() != self.n_rows() {
            return Err(TableError::ColumnLength {
                column: column.name().to_string(),
                expected: self.n_rows(),
                got: column.data.len(),
            });
        }
        let mut columns = self.columns.clone();
        columns[position] = column;
        Ok(Table {
            columns,
            row_ids: self.row_ids.clone(),
        })
    }
}

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::WriteError::InvalidExperimentName`] if the name is
    /// empty or contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, crate::WriteError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(crate::WriteError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
