use cardiotree_io::Table;
use cardiotree_tree::BinaryConfusion;
use serde::Serialize;
use tracing::{info, instrument};

use crate::error::ModelError;
use crate::model::FittedModel;

/// Scores a fitted model on a held-out table.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    model: &'a FittedModel,
}

/// Held-out performance of a fitted model.
///
/// Class 0 of `classes` is the positive class of `confusion`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    /// Rows scored.
    pub n_rows: usize,
    /// Class labels, baseline first.
    pub classes: Vec<String>,
    /// Predicted against observed counts.
    pub confusion: BinaryConfusion,
    /// `(TP + TN) / total`.
    pub accuracy: f64,
    /// `TN / (TN + FP)`.
    pub specificity: f64,
    /// `TP / (TP + FN)`.
    pub sensitivity: f64,
    /// Largest observed class proportion.
    pub no_information_rate: f64,
    /// Predicted class index per row.
    pub predictions: Vec<usize>,
}

impl<'a> Evaluator<'a> {
    /// Create an evaluator for `model`.
    #[must_use]
    pub fn new(model: &'a FittedModel) -> Self {
        Self { model }
    }

    /// Predict every row of `test` and compare with its outcome.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::EmptyData`] | `test` has no rows |
    /// | Encoding errors | `test` lacks a training column or holds missing or unknown values |
    #[instrument(skip_all, fields(n_rows = test.n_rows(), penalty = self.model.penalty()))]
    pub fn evaluate(&self, test: &Table) -> Result<Evaluation, ModelError> {
        if test.is_empty() {
            return Err(ModelError::EmptyData { stage: "evaluation" });
        }
        let truth = self.model.encoder().encode_labels(test)?;
        let predictions = self.model.predict(test)?;
        let confusion = BinaryConfusion::from_labels(&truth, &predictions)?;

        let evaluation = Evaluation {
            n_rows: test.n_rows(),
            classes: self.model.encoder().classes().to_vec(),
            confusion,
            accuracy: confusion.accuracy(),
            specificity: confusion.specificity(),
            sensitivity: confusion.sensitivity(),
            no_information_rate: confusion.no_information_rate(),
            predictions,
        };
        info!(
            accuracy = evaluation.accuracy,
            specificity = evaluation.specificity,
            no_information_rate = evaluation.no_information_rate,
            "held-out evaluation complete"
        );
        Ok(evaluation)
    }
}
