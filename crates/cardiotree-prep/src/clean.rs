//! Rule-based table cleaning.
//!
//! The cleaner is a pure function from [`Table`] to [`Table`]: it recodes
//! sentinel values to missing, binarizes the outcome, prunes columns by
//! missingness (or to a fixed column set), drops incomplete rows and types
//! categorical columns. Applying it to its own output changes nothing.

use cardiotree_io::{Categorical, Column, ColumnData, ColumnRole, Field, Table};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::error::PrepError;

/// Default missing-fraction threshold above which a column is dropped.
pub const DEFAULT_MISSING_THRESHOLD: f64 = 0.30;

/// A value in a numeric column that means "not collected".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sentinel {
    /// Column holding the sentinel.
    pub column: String,
    /// The sentinel value.
    pub value: f64,
}

impl Sentinel {
    /// Create a sentinel rule.
    #[must_use]
    pub fn new(column: impl Into<String>, value: f64) -> Self {
        Self {
            column: column.into(),
            value,
        }
    }
}

/// How the cleaner decides which columns survive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnPolicy {
    /// Drop columns whose missing fraction on this table exceeds the threshold.
    Independent,
    /// Keep exactly these columns, in table order.
    Retain(Vec<String>),
}

/// Configuration for [`Cleaner`].
///
/// Construct via [`CleanConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default          |
/// |---------------------|------------------|
/// | `baseline`          | `"0"`            |
/// | `sentinels`         | none             |
/// | `missing_threshold` | 0.30             |
/// | `categorical`       | none             |
/// | `column_policy`     | `Independent`    |
#[derive(Debug, Clone, PartialEq)]
pub struct CleanConfig {
    outcome: String,
    baseline: String,
    sentinels: Vec<Sentinel>,
    missing_threshold: f64,
    categorical: Vec<String>,
    column_policy: ColumnPolicy,
}

impl CleanConfig {
    /// Create a config for the given outcome column.
    #[must_use]
    pub fn new(outcome: impl Into<String>) -> Self {
        Self {
            outcome: outcome.into(),
            baseline: "0".to_string(),
            sentinels: Vec::new(),
            missing_threshold: DEFAULT_MISSING_THRESHOLD,
            categorical: Vec::new(),
            column_policy: ColumnPolicy::Independent,
        }
    }

    /// Set the outcome level that maps to class 0.
    #[must_use]
    pub fn with_baseline(mut self, baseline: impl Into<String>) -> Self {
        self.baseline = baseline.into();
        self
    }

    /// Set the sentinel rules.
    #[must_use]
    pub fn with_sentinels(mut self, sentinels: Vec<Sentinel>) -> Self {
        self.sentinels = sentinels;
        self
    }

    /// Set the missing-fraction threshold for column pruning.
    #[must_use]
    pub fn with_missing_threshold(mut self, threshold: f64) -> Self {
        self.missing_threshold = threshold;
        self
    }

    /// Set the columns typed as categorical.
    #[must_use]
    pub fn with_categorical(mut self, categorical: Vec<String>) -> Self {
        self.categorical = categorical;
        self
    }

    /// Set the column pruning policy.
    #[must_use]
    pub fn with_column_policy(mut self, policy: ColumnPolicy) -> Self {
        self.column_policy = policy;
        self
    }

    /// Return the outcome column name.
    #[must_use]
    pub fn outcome(&self) -> &str {
        &self.outcome
    }

    /// Return the baseline outcome level.
    #[must_use]
    pub fn baseline(&self) -> &str {
        &self.baseline
    }

    /// Return the sentinel rules.
    #[must_use]
    pub fn sentinels(&self) -> &[Sentinel] {
        &self.sentinels
    }

    /// Return the missing-fraction threshold.
    #[must_use]
    pub fn missing_threshold(&self) -> f64 {
        self.missing_threshold
    }

    /// Return the categorical column names.
    #[must_use]
    pub fn categorical(&self) -> &[String] {
        &self.categorical
    }

    /// Return the column pruning policy.
    #[must_use]
    pub fn column_policy(&self) -> &ColumnPolicy {
        &self.column_policy
    }
}

/// A column removed by the pruning step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedColumn {
    /// Column name.
    pub name: String,
    /// Missing fraction after sentinel recoding.
    pub missing_fraction: f64,
}

/// What a cleaning pass did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanSummary {
    /// Rows in the input.
    pub rows_in: usize,
    /// Rows in the output.
    pub rows_out: usize,
    /// Values recoded from a sentinel to missing.
    pub sentinels_recoded: usize,
    /// Columns removed by pruning.
    pub dropped_columns: Vec<DroppedColumn>,
    /// Columns in the output, in order.
    pub kept_columns: Vec<String>,
    /// Rows per outcome class in the output: `[baseline, other]`.
    pub class_counts: [usize; 2],
}

/// Applies a [`CleanConfig`] to tables.
#[derive(Debug, Clone)]
pub struct Cleaner {
    config: CleanConfig,
}

impl Cleaner {
    /// Create a cleaner.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::InvalidThreshold`] if the missing threshold is
    /// not in [0, 1].
    pub fn new(config: CleanConfig) -> Result<Self, PrepError> {
        let t = config.missing_threshold;
        if !(0.0..=1.0).contains(&t) {
            return Err(PrepError::InvalidThreshold { threshold: t });
        }
        Ok(Self { config })
    }

    /// Return the configuration.
    #[must_use]
    pub fn config(&self) -> &CleanConfig {
        &self.config
    }

    /// Return a cleaner with the same rules that keeps exactly `columns`.
    #[must_use]
    pub fn retaining(&self, columns: Vec<String>) -> Self {
        Self {
            config: self
                .config
                .clone()
                .with_column_policy(ColumnPolicy::Retain(columns)),
        }
    }

    /// Clean `table`, returning a new table.
    ///
    /// # Errors
    ///
    /// See [`Cleaner::clean_with_summary`].
    pub fn clean(&self, table: &Table) -> Result<Table, PrepError> {
        self.clean_with_summary(table).map(|(t, _)| t)
    }

    /// Clean `table`, returning the new table and a summary of the pass.
    ///
    /// An empty result is not an error here; the model stages reject it.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`PrepError::MissingColumn`] | Outcome column, or a retained column, is absent |
    /// | [`PrepError::SentinelNotNumeric`] | A sentinel column is not numeric |
    /// | [`PrepError::OutcomePruned`] | The outcome's missing fraction exceeds the threshold |
    /// | [`PrepError::OutcomeNotRetained`] | A retain list omits the outcome |
    #[instrument(skip_all, fields(n_rows = table.n_rows(), n_cols = table.n_cols()))]
    pub fn clean_with_summary(&self, table: &Table) -> Result<(Table, CleanSummary), PrepError> {
        let rows_in = table.n_rows();
        let (table, sentinels_recoded) = self.recode_sentinels(table)?;
        let table = self.binarize_outcome(&table)?;
        let (table, dropped_columns) = self.prune_columns(&table)?;
        let table = drop_incomplete_rows(&table);
        let table = self.type_categorical(&table)?;

        let class_counts = match table.column(&self.config.outcome).map(Column::data) {
            Some(ColumnData::Categorical(c)) => {
                c.codes().iter().flatten().fold([0usize; 2], |mut acc, &code| {
                    acc[code as usize] += 1;
                    acc
                })
            }
            _ => [0; 2],
        };

        let summary = CleanSummary {
            rows_in,
            rows_out: table.n_rows(),
            sentinels_recoded,
            dropped_columns,
            kept_columns: table.column_names(),
            class_counts,
        };
        Ok((table, summary))
    }

    fn recode_sentinels(&self, table: &Table) -> Result<(Table, usize), PrepError> {
        let mut out = table.clone();
        let mut recoded = 0usize;
        for sentinel in &self.config.sentinels {
            let Some(column) = out.column(&sentinel.column) else {
                debug!(column = %sentinel.column, "sentinel column absent, skipped");
                continue;
            };
            let ColumnData::Numeric(values) = column.data() else {
                return Err(PrepError::SentinelNotNumeric {
                    column: sentinel.column.clone(),
                    found: column.data().column_type(),
                });
            };
            let mut hits = 0usize;
            let values: Vec<Option<f64>> = values
                .iter()
                .map(|v| match v {
                    Some(x) if *x == sentinel.value => {
                        hits += 1;
                        None
                    }
                    other => *other,
                })
                .collect();
            debug!(column = %sentinel.column, value = sentinel.value, hits, "sentinel recoded");
            recoded += hits;
            out = out.replace_column(column.with_data(ColumnData::Numeric(values)))?;
        }
        Ok((out, recoded))
    }

    fn binarize_outcome(&self, table: &Table) -> Result<Table, PrepError> {
        let outcome = table
            .column(&self.config.outcome)
            .ok_or_else(|| PrepError::MissingColumn {
                column: self.config.outcome.clone(),
                purpose: "outcome",
            })?;
        let baseline = &self.config.baseline;
        let codes: Vec<Option<u32>> = (0..table.n_rows())
            .map(|row| {
                outcome
                    .data()
                    .label(row)
                    .map(|label| u32::from(label != *baseline))
            })
            .collect();
        let levels = vec![baseline.clone(), format!("not {baseline}")];
        let data = ColumnData::Categorical(Categorical::new(levels, codes)?);
        let column = Column::new(Field::new(outcome.name(), ColumnRole::Outcome), data);
        Ok(table.replace_column(column)?)
    }

    fn prune_columns(&self, table: &Table) -> Result<(Table, Vec<DroppedColumn>), PrepError> {
        let outcome = &self.config.outcome;
        let threshold = self.config.missing_threshold;

        let keep: Vec<bool> = match &self.config.column_policy {
            ColumnPolicy::Independent => {
                if let Some(column) = table.column(outcome)
                    && column.missing_fraction() > threshold
                {
                    return Err(PrepError::OutcomePruned {
                        column: outcome.clone(),
                        missing_fraction: column.missing_fraction(),
                        threshold,
                    });
                }
                table
                    .columns()
                    .iter()
                    .map(|c| c.missing_fraction() <= threshold)
                    .collect()
            }
            ColumnPolicy::Retain(names) => {
                if !names.iter().any(|n| n == outcome) {
                    return Err(PrepError::OutcomeNotRetained {
                        column: outcome.clone(),
                    });
                }
                if let Some(absent) = names.iter().find(|n| table.column(n).is_none()) {
                    return Err(PrepError::MissingColumn {
                        column: absent.clone(),
                        purpose: "retained column set",
                    });
                }
                table
                    .columns()
                    .iter()
                    .map(|c| names.iter().any(|n| n == c.name()))
                    .collect()
            }
        };

        let dropped: Vec<DroppedColumn> = table
            .columns()
            .iter()
            .zip(&keep)
            .filter(|(_, k)| !**k)
            .map(|(c, _)| DroppedColumn {
                name: c.name().to_string(),
                missing_fraction: c.missing_fraction(),
            })
            .collect();
        for d in &dropped {
            debug!(column = %d.name, missing_fraction = d.missing_fraction, "column dropped");
        }

        let mut flags = keep.into_iter();
        let pruned = table.retain_columns(|_| flags.next().unwrap_or(false));
        Ok((pruned, dropped))
    }

    fn type_categorical(&self, table: &Table) -> Result<Table, PrepError> {
        let mut out = table.clone();
        for name in &self.config.categorical {
            let Some(column) = out.column(name) else {
                continue;
            };
            if matches!(column.data(), ColumnData::Categorical(_)) {
                continue;
            }
            let labels: Vec<Option<String>> =
                (0..out.n_rows()).map(|row| column.data().label(row)).collect();
            let data = ColumnData::Categorical(Categorical::from_labels(&labels));
            let typed = Column::new(Field::new(name.clone(), ColumnRole::Categorical), data);
            out = out.replace_column(typed)?;
        }
        Ok(out)
    }
}

fn drop_incomplete_rows(table: &Table) -> Table {
    let complete: Vec<usize> = (0..table.n_rows())
        .filter(|&row| !table.row_has_missing(row))
        .collect();
    let dropped = table.n_rows() - complete.len();
    if complete.is_empty() && !table.is_empty() {
        warn!(dropped, "every row has a missing value; cleaned table is empty");
    } else {
        info!(dropped, kept = complete.len(), "incomplete rows dropped");
    }
    table.select_rows(&complete)
}
