//! Confusion matrices and the binary classification metrics built on them.

use serde::Serialize;

use crate::error::TreeError;

/// A confusion matrix for multi-class classification.
///
/// Entry `matrix[true_class][predicted_class]` counts how many samples
/// with true label `true_class` were predicted as `predicted_class`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    matrix: Vec<Vec<usize>>,
    n_classes: usize,
}

impl ConfusionMatrix {
    /// Build a confusion matrix from true and predicted labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::EmptyDataset`] | Zero labels provided |
    /// | [`TreeError::LabelCountMismatch`] | The two slices differ in length |
    /// | [`TreeError::LabelOutOfRange`] | A label is `>= n_classes` |
    pub fn from_labels(
        true_labels: &[usize],
        predicted: &[usize],
        n_classes: usize,
    ) -> Result<Self, TreeError> {
        if true_labels.is_empty() {
            return Err(TreeError::EmptyDataset);
        }
        if true_labels.len() != predicted.len() {
            return Err(TreeError::LabelCountMismatch {
                n_samples: true_labels.len(),
                n_labels: predicted.len(),
            });
        }
        let mut matrix = vec![vec![0usize; n_classes]; n_classes];
        for (position, (&t, &p)) in true_labels.iter().zip(predicted).enumerate() {
            if let Some(label) = [t, p].into_iter().find(|&l| l >= n_classes) {
                return Err(TreeError::LabelOutOfRange {
                    label,
                    position,
                    n_classes,
                });
            }
            matrix[t][p] += 1;
        }
        Ok(Self { matrix, n_classes })
    }

    /// Overall accuracy: proportion of correct predictions.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..self.n_classes).map(|i| self.matrix[i][i]).sum();
        ratio(correct, self.total())
    }

    /// Number of samples counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}

/// Two-class confusion counts with class 0 as the positive class.
///
/// | | predicted 0 | predicted 1 |
/// |---|---|---|
/// | **true 0** | `tp` | `fn_` |
/// | **true 1** | `fp` | `tn` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BinaryConfusion {
    /// True class 0, predicted 0.
    pub tp: usize,
    /// True class 0, predicted 1.
    #[serde(rename = "fn")]
    pub fn_: usize,
    /// True class 1, predicted 0.
    pub fp: usize,
    /// True class 1, predicted 1.
    pub tn: usize,
}

impl BinaryConfusion {
    /// Tally binary labels.
    ///
    /// # Errors
    ///
    /// See [`ConfusionMatrix::from_labels`] with `n_classes = 2`.
    pub fn from_labels(true_labels: &[usize], predicted: &[usize]) -> Result<Self, TreeError> {
        Ok(Self::from(&ConfusionMatrix::from_labels(true_labels, predicted, 2)?))
    }

    /// Number of samples counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.tp + self.fn_ + self.fp + self.tn
    }

    /// `(TP + TN) / total`.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    /// `TN / (TN + FP)`; 0.0 when no class-1 samples were seen.
    #[must_use]
    pub fn specificity(&self) -> f64 {
        ratio(self.tn, self.tn + self.fp)
    }

    /// `TP / (TP + FN)`; 0.0 when no class-0 samples were seen.
    #[must_use]
    pub fn sensitivity(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    /// No-information rate: the larger true-class proportion.
    #[must_use]
    pub fn no_information_rate(&self) -> f64 {
        ratio((self.tp + self.fn_).max(self.fp + self.tn), self.total())
    }
}

impl From<&ConfusionMatrix> for BinaryConfusion {
    /// Reads the top-left 2x2 block; cells missing from a smaller matrix
    /// count as zero.
    fn from(cm: &ConfusionMatrix) -> Self {
        let cell = |t: usize, p: usize| {
            cm.matrix
                .get(t)
                .and_then(|row| row.get(p))
                .copied()
                .unwrap_or(0)
        };
        Self {
            tp: cell(0, 0),
            fn_: cell(0, 1),
            fp: cell(1, 0),
            tn: cell(1, 1),
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}
