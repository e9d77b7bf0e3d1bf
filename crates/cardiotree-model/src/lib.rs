//! Cross-validated tree selection and held-out evaluation.
//!
//! A [`ModelSelector`] encodes a cleaned training table, scores every
//! complexity penalty of its grid by stratified k-fold cross-validation and
//! picks one with the one-standard-error rule. The selected tree is refitted
//! on the whole table as a [`FittedModel`], which an [`Evaluator`] scores on
//! the held-out table. [`ModelReport`] collects both for display or export.

mod cv;
mod encode;
mod error;
mod evaluate;
mod model;
mod report;
mod select;

pub use cv::CandidateScore;
pub use encode::{FeatureColumn, FeatureEncoder};
pub use error::ModelError;
pub use evaluate::{Evaluation, Evaluator};
pub use model::{FittedModel, VariableImportance};
pub use report::ModelReport;
pub use select::{DEFAULT_FOLDS, DEFAULT_GRID, ModelSelector, Objective, Selection};
