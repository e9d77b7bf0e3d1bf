//! Column role configuration and its resolution against a file header.

use std::path::Path;

use crate::domain::{ColumnRole, ColumnType};
use crate::LoadError;

/// Which columns play which role.
///
/// Construct via [`ColumnRoles::new`] with the outcome column, then chain
/// `with_*` methods. Columns not named here get the
/// [`ColumnRole::Numeric`] role and must hold numbers only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRoles {
    outcome: String,
    categorical: Vec<String>,
    ignored: Vec<String>,
}

impl ColumnRoles {
    /// Create a role set with the given outcome column and no categorical
    /// or ignored columns.
    #[must_use]
    pub fn new(outcome: impl Into<String>) -> Self {
        Self {
            outcome: outcome.into(),
            categorical: Vec::new(),
            ignored: Vec::new(),
        }
    }

    /// Set the categorical feature columns.
    #[must_use]
    pub fn with_categorical(mut self, categorical: Vec<String>) -> Self {
        self.categorical = categorical;
        self
    }

    /// Set the columns carried along but never used as features.
    #[must_use]
    pub fn with_ignored(mut self, ignored: Vec<String>) -> Self {
        self.ignored = ignored;
        self
    }

    /// Return the outcome column name.
    #[must_use]
    pub fn outcome(&self) -> &str {
        &self.outcome
    }

    /// Return the categorical column names.
    #[must_use]
    pub fn categorical(&self) -> &[String] {
        &self.categorical
    }

    /// Return the ignored column names.
    #[must_use]
    pub fn ignored(&self) -> &[String] {
        &self.ignored
    }

    /// Role of the named column under this configuration.
    #[must_use]
    pub fn role_of(&self, name: &str) -> ColumnRole {
        if name == self.outcome {
            ColumnRole::Outcome
        } else if self.categorical.iter().any(|c| c == name) {
            ColumnRole::Categorical
        } else if self.ignored.iter().any(|c| c == name) {
            ColumnRole::Ignored
        } else {
            ColumnRole::Numeric
        }
    }

    /// Check every configured name against the header and every inferred
    /// type against its role, returning roles in header order.
    ///
    /// `first_text` yields, for a column index, the first cell that failed
    /// to parse as a number (row index and raw text).
    pub(crate) fn resolve(
        &self,
        path: &Path,
        header: &[String],
        inferred: &[ColumnType],
        first_text: impl Fn(usize) -> Option<(usize, String)>,
    ) -> Result<Vec<ColumnRole>, LoadError> {
        let named = std::iter::once((self.outcome.as_str(), "outcome"))
            .chain(self.categorical.iter().map(|c| (c.as_str(), "categorical")))
            .chain(self.ignored.iter().map(|c| (c.as_str(), "ignored")));
        for (column, role) in named {
            if !header.iter().any(|h| h == column) {
                return Err(LoadError::MissingColumn {
                    path: path.to_path_buf(),
                    column: column.to_string(),
                    role,
                });
            }
        }

        header
            .iter()
            .zip(inferred)
            .enumerate()
            .map(|(col_index, (name, &column_type))| {
                let role = self.role_of(name);
                if role == ColumnRole::Numeric && column_type != ColumnType::Numeric {
                    let (row_index, raw) = first_text(col_index).unwrap_or_default();
                    return Err(LoadError::SchemaMismatch {
                        path: path.to_path_buf(),
                        column: name.clone(),
                        expected: ColumnType::Numeric,
                        found: column_type,
                        row_index,
                        raw,
                    });
                }
                Ok(role)
            })
            .collect()
    }
}
