use std::fmt;

use serde::Serialize;

use crate::cv::CandidateScore;
use crate::evaluate::Evaluation;
use crate::model::VariableImportance;
use crate::select::{Objective, Selection};

/// Summary of one objective's selection and its held-out evaluation.
///
/// [`fmt::Display`] writes the human-readable form; the serialized form
/// carries the same content for export.
#[derive(Debug, Clone, Serialize)]
pub struct ModelReport {
    /// The metric the selection maximized.
    pub objective: Objective,
    /// Cross-validation scores per candidate, in grid order.
    pub candidates: Vec<CandidateScore>,
    /// Penalty with the highest mean score.
    pub best_penalty: f64,
    /// Penalty chosen by the one-SE rule.
    pub selected_penalty: f64,
    /// Lowest mean the one-SE rule accepted.
    pub threshold: f64,
    /// Leaves of the refitted tree.
    pub n_leaves: usize,
    /// Depth of the refitted tree.
    pub depth: usize,
    /// Rendered tree.
    pub tree: String,
    /// Non-zero variable importance, most important first.
    pub importance: Vec<VariableImportance>,
    /// Held-out performance.
    pub evaluation: Evaluation,
}

impl ModelReport {
    /// Assemble a report from a selection and the evaluation of its model.
    #[must_use]
    pub fn new(selection: &Selection, evaluation: Evaluation) -> Self {
        let model = &selection.model;
        Self {
            objective: selection.objective,
            candidates: selection.candidates.clone(),
            best_penalty: selection.candidates[selection.best].penalty,
            selected_penalty: model.penalty(),
            threshold: selection.threshold,
            n_leaves: model.tree().n_leaves(),
            depth: model.tree().depth(),
            tree: model.render(),
            importance: model.importance(),
            evaluation,
        }
    }
}

impl fmt::Display for ModelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== Model selected by {} ==", self.objective)?;
        writeln!(f)?;
        writeln!(f, "{:>10}  {:>8}  {:>8}  {:>8}", "cp", "mean", "sd", "se")?;
        for c in &self.candidates {
            let mark = if c.penalty == self.selected_penalty { " <" } else { "" };
            writeln!(
                f,
                "{:>10}  {:>8.4}  {:>8.4}  {:>8.4}{mark}",
                c.penalty, c.mean, c.std_dev, c.std_error
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "best cp = {}, one-SE threshold = {:.4}, selected cp = {}",
            self.best_penalty, self.threshold, self.selected_penalty
        )?;
        writeln!(f, "tree: {} leaves, depth {}", self.n_leaves, self.depth)?;
        writeln!(f)?;
        write!(f, "{}", self.tree)?;
        writeln!(f)?;

        writeln!(f, "Variable importance")?;
        if self.importance.is_empty() {
            writeln!(f, "  (none: the tree is a single leaf)")?;
        }
        for v in &self.importance {
            writeln!(f, "  {:<12} {:>6.1}", v.name, v.importance * 100.0)?;
        }
        writeln!(f)?;

        let e = &self.evaluation;
        let (positive, negative) = match e.classes.as_slice() {
            [p, n, ..] => (p.as_str(), n.as_str()),
            _ => ("0", "1"),
        };
        let width = positive.len().max(negative.len()).max("Prediction".len());
        writeln!(f, "Confusion matrix ({} held-out rows)", e.n_rows)?;
        writeln!(f, "{:<width$}  {:>8}  {:>8}", "Prediction", positive, negative)?;
        writeln!(f, "{positive:<width$}  {:>8}  {:>8}", e.confusion.tp, e.confusion.fp)?;
        writeln!(f, "{negative:<width$}  {:>8}  {:>8}", e.confusion.fn_, e.confusion.tn)?;
        writeln!(f)?;
        writeln!(f, "Accuracy    : {:.4}", e.accuracy)?;
        writeln!(f, "Specificity : {:.4}", e.specificity)?;
        writeln!(f, "Sensitivity : {:.4}", e.sensitivity)?;
        writeln!(f, "No info rate: {:.4}", e.no_information_rate)
    }
}
