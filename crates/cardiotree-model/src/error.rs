use cardiotree_io::ColumnType;
use cardiotree_tree::TreeError;

/// Errors from feature encoding, model selection and evaluation.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Returned when the complexity grid has no candidates.
    #[error("complexity grid is empty")]
    EmptyGrid,

    /// Returned when a grid value is negative or not finite.
    #[error("complexity penalty must be finite and non-negative, got {penalty}")]
    InvalidPenalty {
        /// The invalid penalty.
        penalty: f64,
    },

    /// Returned when a grid value appears more than once.
    #[error("complexity penalty {penalty} appears more than once in the grid")]
    DuplicatePenalty {
        /// The repeated penalty.
        penalty: f64,
    },

    /// Returned when fewer than two folds are requested.
    #[error("n_folds must be at least 2, got {n_folds}")]
    InvalidFoldCount {
        /// The invalid fold count.
        n_folds: usize,
    },

    /// Returned when a stage receives a table with zero rows.
    #[error("{stage} received a table with zero rows")]
    EmptyData {
        /// The stage that received the empty table.
        stage: &'static str,
    },

    /// Returned when no column carries the outcome role.
    #[error("table has no outcome column")]
    MissingOutcome,

    /// Returned when the outcome column is not a two-level categorical column.
    #[error("outcome column \"{column}\" must be categorical with two levels, found {found}")]
    OutcomeNotBinary {
        /// The outcome column.
        column: String,
        /// What was found instead.
        found: String,
    },

    /// Returned when a table's outcome holds a level the model was not trained on.
    #[error("outcome column \"{column}\" has unknown level \"{level}\" at row {row}")]
    UnknownOutcomeLevel {
        /// The outcome column.
        column: String,
        /// The unknown level.
        level: String,
        /// Zero-based row position.
        row: usize,
    },

    /// Returned when a column the model was trained on is absent.
    #[error("feature column \"{column}\" is not in the table")]
    MissingFeature {
        /// The absent column.
        column: String,
    },

    /// Returned when a feature column has a different type than at training.
    #[error("feature column \"{column}\" is {found}, expected {expected}")]
    FeatureType {
        /// The column.
        column: String,
        /// The type seen at training.
        expected: ColumnType,
        /// The type found now.
        found: ColumnType,
    },

    /// Returned when a feature or outcome cell is missing.
    #[error("column \"{column}\" has a missing value at row {row}; clean the table first")]
    MissingValue {
        /// The column.
        column: String,
        /// Zero-based row position.
        row: usize,
    },

    /// Returned when a cross-validation fold cannot be scored.
    #[error(
        "fold {fold} is degenerate for candidate {candidate} (cp = {penalty}): its {part} rows hold {n_classes} class(es)"
    )]
    DegenerateFold {
        /// Zero-based fold index.
        fold: usize,
        /// Zero-based candidate index in the grid.
        candidate: usize,
        /// The candidate's complexity penalty.
        penalty: f64,
        /// `"held-out"` or `"training"`.
        part: &'static str,
        /// Distinct classes present in that part.
        n_classes: usize,
    },

    /// Returned when the tree library rejects its input.
    #[error(transparent)]
    Tree(#[from] TreeError),
}
