//! Table to feature-matrix encoding.
//!
//! The encoding is learned once from the training table and then applied by
//! column name to any table with the same columns, so the held-out partition
//! is encoded with the training levels.

use cardiotree_io::{Categorical, Column, ColumnData, ColumnRole, ColumnType, Table};
use cardiotree_tree::FeatureKind;
use serde::Serialize;
use tracing::debug;

use crate::error::ModelError;

/// One encoded feature column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureColumn {
    /// Column name.
    pub name: String,
    /// Training levels for a categorical feature, `None` for a numeric one.
    pub levels: Option<Vec<String>>,
}

impl FeatureColumn {
    /// How the tree splits this column.
    #[must_use]
    pub fn kind(&self) -> FeatureKind {
        match &self.levels {
            None => FeatureKind::Numeric,
            Some(levels) => FeatureKind::Categorical {
                n_levels: levels.len(),
            },
        }
    }

    /// Level code of `label`; unseen labels get `n_levels`.
    fn code(&self, label: &str) -> f64 {
        let levels = self.levels.as_deref().unwrap_or_default();
        levels.iter().position(|l| l == label).unwrap_or(levels.len()) as f64
    }
}

/// Maps cleaned tables to row-major feature matrices and class labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureEncoder {
    outcome: String,
    classes: Vec<String>,
    features: Vec<FeatureColumn>,
}

impl FeatureEncoder {
    /// Learn the encoding from a cleaned training table.
    ///
    /// Numeric-role columns must hold numbers. Categorical-role columns take
    /// their levels from the table. Ignored columns are skipped. The
    /// outcome is the column with the outcome role.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::MissingOutcome`] | No column has the outcome role |
    /// | [`ModelError::OutcomeNotBinary`] | The outcome is not a two-level categorical column |
    /// | [`ModelError::FeatureType`] | A numeric-role column does not hold numbers |
    pub fn fit(table: &Table) -> Result<Self, ModelError> {
        let outcome = table
            .columns()
            .iter()
            .find(|c| c.role() == ColumnRole::Outcome)
            .ok_or(ModelError::MissingOutcome)?;
        let classes = match outcome.data() {
            ColumnData::Categorical(c) if c.levels().len() == 2 => c.levels().to_vec(),
            ColumnData::Categorical(c) => {
                return Err(ModelError::OutcomeNotBinary {
                    column: outcome.name().to_string(),
                    found: format!("{} levels", c.levels().len()),
                });
            }
            other => {
                return Err(ModelError::OutcomeNotBinary {
                    column: outcome.name().to_string(),
                    found: format!("a {} column", other.column_type()),
                });
            }
        };

        let mut features = Vec::new();
        for column in table.columns() {
            let levels = match column.role() {
                ColumnRole::Outcome | ColumnRole::Ignored => continue,
                ColumnRole::Numeric => {
                    expect_numeric(column)?;
                    None
                }
                ColumnRole::Categorical => Some(levels_of(column)),
            };
            features.push(FeatureColumn {
                name: column.name().to_string(),
                levels,
            });
        }

        debug!(
            outcome = outcome.name(),
            n_features = features.len(),
            n_categorical = features.iter().filter(|f| f.levels.is_some()).count(),
            "feature encoding learned"
        );

        Ok(Self {
            outcome: outcome.name().to_string(),
            classes,
            features,
        })
    }

    /// Return the outcome column name.
    #[must_use]
    pub fn outcome(&self) -> &str {
        &self.outcome
    }

    /// Return the class labels: `[baseline, other]`.
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Return the encoded feature columns, in table order.
    #[must_use]
    pub fn features(&self) -> &[FeatureColumn] {
        &self.features
    }

    /// Return the tree feature kinds, in feature order.
    #[must_use]
    pub fn kinds(&self) -> Vec<FeatureKind> {
        self.features.iter().map(FeatureColumn::kind).collect()
    }

    /// Encode the feature columns of `table` row-major.
    ///
    /// Categorical levels not seen at training get the code `n_levels`,
    /// which the tree routes to the larger child.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::MissingFeature`] | A training column is absent |
    /// | [`ModelError::FeatureType`] | A numeric feature does not hold numbers |
    /// | [`ModelError::MissingValue`] | A feature cell is missing |
    pub fn encode_features(&self, table: &Table) -> Result<Vec<Vec<f64>>, ModelError> {
        let mut rows = vec![Vec::with_capacity(self.features.len()); table.n_rows()];
        for feature in &self.features {
            let column = table
                .column(&feature.name)
                .ok_or_else(|| ModelError::MissingFeature {
                    column: feature.name.clone(),
                })?;
            let missing = |row: usize| ModelError::MissingValue {
                column: feature.name.clone(),
                row,
            };
            match (&feature.levels, column.data()) {
                (None, ColumnData::Numeric(values)) => {
                    for (row, value) in values.iter().enumerate() {
                        rows[row].push(value.ok_or_else(|| missing(row))?);
                    }
                }
                (None, _) => expect_numeric(column)?,
                (Some(_), data) => {
                    for (row, encoded) in rows.iter_mut().enumerate() {
                        let label = data.label(row).ok_or_else(|| missing(row))?;
                        encoded.push(feature.code(&label));
                    }
                }
            }
        }
        Ok(rows)
    }

    /// Encode the outcome column of `table` as class indices.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::MissingOutcome`] | The outcome column is absent |
    /// | [`ModelError::MissingValue`] | An outcome cell is missing |
    /// | [`ModelError::UnknownOutcomeLevel`] | An outcome level is not a training class |
    pub fn encode_labels(&self, table: &Table) -> Result<Vec<usize>, ModelError> {
        let column = table.column(&self.outcome).ok_or(ModelError::MissingOutcome)?;
        (0..table.n_rows())
            .map(|row| {
                let label = column.data().label(row).ok_or_else(|| ModelError::MissingValue {
                    column: self.outcome.clone(),
                    row,
                })?;
                self.classes
                    .iter()
                    .position(|c| *c == label)
                    .ok_or(ModelError::UnknownOutcomeLevel {
                        column: self.outcome.clone(),
                        level: label,
                        row,
                    })
            })
            .collect()
    }
}

fn expect_numeric(column: &Column) -> Result<(), ModelError> {
    match column.data() {
        ColumnData::Numeric(_) => Ok(()),
        other => Err(ModelError::FeatureType {
            column: column.name().to_string(),
            expected: ColumnType::Numeric,
            found: other.column_type(),
        }),
    }
}

fn levels_of(column: &Column) -> Vec<String> {
    match column.data() {
        ColumnData::Categorical(c) => c.levels().to_vec(),
        data => {
            let labels: Vec<Option<String>> = (0..data.len()).map(|row| data.label(row)).collect();
            Categorical::from_labels(&labels).levels().to_vec()
        }
    }
}
