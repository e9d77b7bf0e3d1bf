//! Complexity-penalty selection by cross-validation and the one-SE rule.

use std::fmt;

use cardiotree_io::Table;
use cardiotree_tree::{BinaryConfusion, DecisionTreeConfig, FeatureKind};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::cv::{CandidateScore, stratified_folds};
use crate::encode::FeatureEncoder;
use crate::error::ModelError;
use crate::model::FittedModel;

/// Default complexity grid.
pub const DEFAULT_GRID: [f64; 6] = [0.0, 1e-4, 1e-3, 1e-2, 1e-1, 1.0];

/// Default number of cross-validation folds.
pub const DEFAULT_FOLDS: usize = 5;

/// The metric a selection maximizes.
///
/// Class 0 (the outcome baseline) is the positive class, so
/// [`Objective::Specificity`] is the hit rate on the other class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// `(TP + TN) / total`.
    Accuracy,
    /// `TN / (TN + FP)`.
    Specificity,
}

impl Objective {
    /// Score a confusion table.
    #[must_use]
    pub fn score(self, confusion: &BinaryConfusion) -> f64 {
        match self {
            Objective::Accuracy => confusion.accuracy(),
            Objective::Specificity => confusion.specificity(),
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Objective::Accuracy => write!(f, "accuracy"),
            Objective::Specificity => write!(f, "specificity"),
        }
    }
}

/// Selects a complexity penalty by stratified k-fold cross-validation.
///
/// Construct via [`ModelSelector::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter | Default |
/// |-----------|---------|
/// | `seed`    | 42      |
/// | `tree`    | [`DecisionTreeConfig::new`] (its penalty is replaced per candidate) |
#[derive(Debug, Clone)]
pub struct ModelSelector {
    grid: Vec<f64>,
    n_folds: usize,
    seed: u64,
    tree: DecisionTreeConfig,
}

/// Outcome of a selection run.
#[derive(Debug, Clone)]
pub struct Selection {
    /// The maximized metric.
    pub objective: Objective,
    /// Scores per candidate, in grid order.
    pub candidates: Vec<CandidateScore>,
    /// Index of the candidate with the highest mean.
    pub best: usize,
    /// Index of the selected candidate.
    pub selected: usize,
    /// Lowest mean the one-SE rule accepts: `best.mean - best.std_error`.
    pub threshold: f64,
    /// The selected penalty refitted on the whole training table.
    pub model: FittedModel,
}

impl Selection {
    /// Return the selected candidate's scores.
    #[must_use]
    pub fn selected_score(&self) -> &CandidateScore {
        &self.candidates[self.selected]
    }
}

impl ModelSelector {
    /// Create a selector over `grid` with `n_folds` folds.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::EmptyGrid`] | `grid` is empty |
    /// | [`ModelError::InvalidPenalty`] | A value is negative or not finite |
    /// | [`ModelError::DuplicatePenalty`] | A value repeats |
    /// | [`ModelError::InvalidFoldCount`] | `n_folds` < 2 |
    pub fn new(grid: Vec<f64>, n_folds: usize) -> Result<Self, ModelError> {
        if grid.is_empty() {
            return Err(ModelError::EmptyGrid);
        }
        for (i, &penalty) in grid.iter().enumerate() {
            if !(penalty.is_finite() && penalty >= 0.0) {
                return Err(ModelError::InvalidPenalty { penalty });
            }
            if grid[..i].contains(&penalty) {
                return Err(ModelError::DuplicatePenalty { penalty });
            }
        }
        if n_folds < 2 {
            return Err(ModelError::InvalidFoldCount { n_folds });
        }
        Ok(Self {
            grid,
            n_folds,
            seed: 42,
            tree: DecisionTreeConfig::new(),
        })
    }

    /// Set the random seed for fold assignment.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the growth parameters of every fitted tree.
    #[must_use]
    pub fn with_tree_config(mut self, tree: DecisionTreeConfig) -> Self {
        self.tree = tree;
        self
    }

    /// Return the complexity grid.
    #[must_use]
    pub fn grid(&self) -> &[f64] {
        &self.grid
    }

    /// Return the number of folds.
    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Cross-validate every penalty on `train` and select one by the one-SE rule.
    ///
    /// One stratified fold assignment is shared by all candidates.
    /// Candidates are scored in parallel and reduced in grid order, so the
    /// selection and any error are the same on every run with the same seed.
    ///
    /// The best candidate has the highest mean score (ties go to the larger
    /// penalty). The selected candidate is the one with the largest penalty
    /// whose mean is at least `best.mean - best.std_error`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::EmptyData`] | `train` has no rows |
    /// | [`ModelError::DegenerateFold`] | A fold's held-out or training rows hold a single class |
    /// | Encoding errors | See [`FeatureEncoder::fit`] |
    /// | [`ModelError::Tree`] | The tree library rejects the data |
    #[instrument(
        skip_all,
        fields(objective = %objective, n_rows = train.n_rows(), n_folds = self.n_folds)
    )]
    pub fn select(&self, train: &Table, objective: Objective) -> Result<Selection, ModelError> {
        if train.is_empty() {
            return Err(ModelError::EmptyData {
                stage: "model selection",
            });
        }
        let encoder = FeatureEncoder::fit(train)?;
        let features = encoder.encode_features(train)?;
        let labels = encoder.encode_labels(train)?;
        let kinds = encoder.kinds();
        let folds = stratified_folds(&labels, self.n_folds, self.seed);

        let data = FoldData {
            features: &features,
            labels: &labels,
            kinds: &kinds,
            folds: &folds,
        };

        let scored: Vec<Result<CandidateScore, ModelError>> = self
            .grid
            .par_iter()
            .enumerate()
            .map(|(candidate, &penalty)| self.score_candidate(&data, candidate, penalty, objective))
            .collect();
        let candidates = scored.into_iter().collect::<Result<Vec<_>, _>>()?;

        let (best, selected, threshold) = one_se_choice(&candidates);
        let penalty = candidates[selected].penalty;
        info!(
            best_penalty = candidates[best].penalty,
            best_mean = candidates[best].mean,
            selected_penalty = penalty,
            selected_mean = candidates[selected].mean,
            "candidate selected"
        );

        let tree = self
            .tree
            .clone()
            .with_complexity(penalty)
            .fit(&features, &labels, &kinds)?;
        let model = FittedModel::new(encoder, tree);

        Ok(Selection {
            objective,
            candidates,
            best,
            selected,
            threshold,
            model,
        })
    }

    fn score_candidate(
        &self,
        data: &FoldData<'_>,
        candidate: usize,
        penalty: f64,
        objective: Objective,
    ) -> Result<CandidateScore, ModelError> {
        let config = self.tree.clone().with_complexity(penalty);
        let mut fold_scores = Vec::with_capacity(self.n_folds);

        for fold in 0..self.n_folds {
            let (fit_rows, held_out): (Vec<usize>, Vec<usize>) =
                (0..data.labels.len()).partition(|&i| data.folds[i] != fold);

            for (part, rows) in [("held-out", &held_out), ("training", &fit_rows)] {
                let n_classes = distinct_classes(data.labels, rows);
                if n_classes < 2 {
                    return Err(ModelError::DegenerateFold {
                        fold,
                        candidate,
                        penalty,
                        part,
                        n_classes,
                    });
                }
            }

            let fit_x: Vec<Vec<f64>> = fit_rows.iter().map(|&i| data.features[i].clone()).collect();
            let fit_y: Vec<usize> = fit_rows.iter().map(|&i| data.labels[i]).collect();
            let tree = config.fit(&fit_x, &fit_y, data.kinds)?;

            let truth: Vec<usize> = held_out.iter().map(|&i| data.labels[i]).collect();
            let predicted = held_out
                .iter()
                .map(|&i| tree.predict(&data.features[i]))
                .collect::<Result<Vec<_>, _>>()?;
            let score = objective.score(&BinaryConfusion::from_labels(&truth, &predicted)?);
            debug!(candidate, penalty, fold, score, n_leaves = tree.n_leaves(), "fold scored");
            fold_scores.push(score);
        }

        let summary = CandidateScore::new(penalty, fold_scores);
        debug!(
            candidate,
            penalty,
            mean = summary.mean,
            std_error = summary.std_error,
            "candidate scored"
        );
        Ok(summary)
    }
}

/// Encoded training data shared by every candidate.
struct FoldData<'a> {
    features: &'a [Vec<f64>],
    labels: &'a [usize],
    kinds: &'a [FeatureKind],
    folds: &'a [usize],
}

fn distinct_classes(labels: &[usize], rows: &[usize]) -> usize {
    let mut seen = [false; 2];
    for &i in rows {
        seen[labels[i].min(1)] = true;
    }
    seen.iter().filter(|&&s| s).count()
}

/// Returns `(best, selected, threshold)` indices into `candidates`.
fn one_se_choice(candidates: &[CandidateScore]) -> (usize, usize, f64) {
    let mut best = 0;
    for (i, c) in candidates.iter().enumerate() {
        let b = &candidates[best];
        if c.mean > b.mean || (c.mean == b.mean && c.penalty > b.penalty) {
            best = i;
        }
    }
    let threshold = candidates[best].mean - candidates[best].std_error;

    let mut selected = best;
    for (i, c) in candidates.iter().enumerate() {
        if c.mean >= threshold && c.penalty > candidates[selected].penalty {
            selected = i;
        }
    }
    (best, selected, threshold)
}
