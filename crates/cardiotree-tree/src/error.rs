/// Errors from decision tree fitting, prediction and scoring.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// Returned when max_depth is zero.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The invalid max_depth value provided.
        max_depth: usize,
    },

    /// Returned when min_samples_split is less than 2.
    #[error("min_samples_split must be at least 2, got {min_samples_split}")]
    InvalidMinSamplesSplit {
        /// The invalid min_samples_split value provided.
        min_samples_split: usize,
    },

    /// Returned when min_samples_leaf is zero.
    #[error("min_samples_leaf must be at least 1, got {min_samples_leaf}")]
    InvalidMinSamplesLeaf {
        /// The invalid min_samples_leaf value provided.
        min_samples_leaf: usize,
    },

    /// Returned when the complexity penalty is negative or not finite.
    #[error("complexity penalty must be finite and non-negative, got {complexity}")]
    InvalidComplexity {
        /// The invalid penalty.
        complexity: f64,
    },

    /// Returned when the training dataset has zero samples.
    #[error("training dataset has zero samples")]
    EmptyDataset,

    /// Returned when the training dataset has zero feature columns.
    #[error("training dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when the number of labels differs from the number of samples.
    #[error("{n_labels} labels for {n_samples} samples")]
    LabelCountMismatch {
        /// Number of feature rows.
        n_samples: usize,
        /// Number of labels.
        n_labels: usize,
    },

    /// Returned when the feature kinds do not cover every column.
    #[error("{got} feature kinds for {expected} feature columns")]
    KindCountMismatch {
        /// The number of feature columns.
        expected: usize,
        /// The number of kinds provided.
        got: usize,
    },

    /// Returned when a sample has a different number of features than expected.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when a sample has a different number of features at prediction time.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the prediction input.
        got: usize,
    },

    /// Returned when a training value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when a categorical training value is not a valid level code.
    #[error(
        "value {value} at sample {sample_index}, feature {feature_index} is not a level code in [0, {n_levels})"
    )]
    InvalidCategoryCode {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
        /// The offending value.
        value: f64,
        /// Levels declared for the feature.
        n_levels: usize,
    },

    /// Returned when a class label is outside the expected range.
    #[error("label {label} at position {position} is outside [0, {n_classes})")]
    LabelOutOfRange {
        /// The offending label.
        label: usize,
        /// Its position in the input.
        position: usize,
        /// The number of classes.
        n_classes: usize,
    },
}
