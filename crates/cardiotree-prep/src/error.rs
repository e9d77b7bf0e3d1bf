use cardiotree_io::TableError;

/// Errors from partitioning and cleaning.
#[derive(Debug, thiserror::Error)]
pub enum PrepError {
    /// Returned when the train fraction is not in the open interval (0, 1).
    #[error("train fraction must be in (0, 1), got {fraction}")]
    InvalidTrainFraction {
        /// The invalid fraction.
        fraction: f64,
    },

    /// Returned when the missingness threshold is not in [0, 1].
    #[error("missing-value threshold must be in [0, 1], got {threshold}")]
    InvalidThreshold {
        /// The invalid threshold.
        threshold: f64,
    },

    /// Returned when a column the configuration depends on is absent.
    #[error("column \"{column}\" needed for {purpose} is not in the table")]
    MissingColumn {
        /// The absent column.
        column: String,
        /// What the column is used for.
        purpose: &'static str,
    },

    /// Returned when a sentinel is configured on a column that is not numeric.
    #[error("sentinel column \"{column}\" is {found}, expected numeric")]
    SentinelNotNumeric {
        /// The configured sentinel column.
        column: String,
        /// The column's actual type.
        found: cardiotree_io::ColumnType,
    },

    /// Returned when the missingness threshold would drop the outcome column.
    #[error("outcome column \"{column}\" is {missing_fraction:.3} missing, above threshold {threshold}")]
    OutcomePruned {
        /// The outcome column.
        column: String,
        /// Its missing fraction.
        missing_fraction: f64,
        /// The configured threshold.
        threshold: f64,
    },

    /// Returned when a retained column list leaves out the outcome column.
    #[error("retained column set does not include outcome column \"{column}\"")]
    OutcomeNotRetained {
        /// The outcome column.
        column: String,
    },

    /// Returned when the underlying table cannot be reshaped.
    #[error(transparent)]
    Table(#[from] TableError),
}
