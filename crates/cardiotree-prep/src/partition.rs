//! Stratified, seeded train/test partitioning.

use std::collections::BTreeMap;

use cardiotree_io::Table;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::error::PrepError;

/// Default fraction of rows assigned to the training partition.
pub const DEFAULT_TRAIN_FRACTION: f64 = 0.8;

/// Stratified train/test splitter.
///
/// Construct via [`Partitioner::new`], then chain `with_seed` if desired.
///
/// # Defaults
///
/// | Parameter | Default |
/// |-----------|---------|
/// | `seed`    | 42      |
#[derive(Debug, Clone)]
pub struct Partitioner {
    train_fraction: f64,
    seed: u64,
}

/// Per-stratum split counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StratumSplit {
    /// Stratum label, `None` for rows missing the stratification value.
    pub label: Option<String>,
    /// Rows in the stratum.
    pub total: usize,
    /// Rows of the stratum assigned to train.
    pub train: usize,
}

/// A disjoint train/test pair.
#[derive(Debug, Clone)]
pub struct Partition {
    /// Training rows, in source order.
    pub train: Table,
    /// Held-out rows, in source order.
    pub test: Table,
    /// Split counts per stratum, in stratum order.
    pub strata: Vec<StratumSplit>,
}

impl Partitioner {
    /// Create a partitioner with the given train fraction.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::InvalidTrainFraction`] if `train_fraction` is not
    /// in the open interval (0, 1).
    pub fn new(train_fraction: f64) -> Result<Self, PrepError> {
        if !(train_fraction > 0.0 && train_fraction < 1.0) {
            return Err(PrepError::InvalidTrainFraction {
                fraction: train_fraction,
            });
        }
        Ok(Self {
            train_fraction,
            seed: 42,
        })
    }

    /// Set the random seed for within-stratum shuffling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the train fraction.
    #[must_use]
    pub fn train_fraction(&self) -> f64 {
        self.train_fraction
    }

    /// Split `table` into train and test, stratified on `stratify_by`.
    ///
    /// Rows are grouped by the stratification value (missing values form
    /// their own stratum). Strata are visited in sorted order; each is
    /// shuffled and its first `ceil(p * n)` rows go to train. Both outputs
    /// keep source row order.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::MissingColumn`] if `stratify_by` is not a column.
    #[instrument(skip(self, table), fields(n_rows = table.n_rows(), p = self.train_fraction))]
    pub fn split(&self, table: &Table, stratify_by: &str) -> Result<Partition, PrepError> {
        let column = table
            .column(stratify_by)
            .ok_or_else(|| PrepError::MissingColumn {
                column: stratify_by.to_string(),
                purpose: "stratification",
            })?;

        let mut strata: BTreeMap<Option<String>, Vec<usize>> = BTreeMap::new();
        for row in 0..table.n_rows() {
            strata.entry(column.data().label(row)).or_default().push(row);
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut train_rows = Vec::new();
        let mut test_rows = Vec::new();
        let mut splits = Vec::with_capacity(strata.len());

        for (label, mut rows) in strata {
            rows.shuffle(&mut rng);
            let n_train = stratum_train_size(rows.len(), self.train_fraction);
            debug!(stratum = ?label, total = rows.len(), n_train, "stratum split");
            train_rows.extend_from_slice(&rows[..n_train]);
            test_rows.extend_from_slice(&rows[n_train..]);
            splits.push(StratumSplit {
                label,
                total: rows.len(),
                train: n_train,
            });
        }

        train_rows.sort_unstable();
        test_rows.sort_unstable();

        info!(
            n_train = train_rows.len(),
            n_test = test_rows.len(),
            n_strata = splits.len(),
            "partition complete"
        );

        Ok(Partition {
            train: table.select_rows(&train_rows),
            test: table.select_rows(&test_rows),
            strata: splits,
        })
    }
}

fn stratum_train_size(n: usize, fraction: f64) -> usize {
    ((fraction * n as f64).ceil() as usize).min(n)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use cardiotree_io::{Column, ColumnRole, RowId};

    use super::*;

    fn labelled_table(labels: &[&str]) -> Table {
        Table::new(vec![
            Column::numeric(
                "x",
                ColumnRole::Numeric,
                (0..labels.len()).map(|i| Some(i as f64)).collect(),
            ),
            Column::text(
                "y",
                ColumnRole::Outcome,
                labels.iter().map(|l| Some(l.to_string())).collect(),
            ),
        ])
        .unwrap()
    }

    fn ids(t: &Table) -> Vec<RowId> {
        t.row_ids().to_vec()
    }

    #[test]
    fn invalid_fraction_rejected() {
        for p in [0.0, 1.0, -0.2, 1.5, f64::NAN] {
            assert!(
                matches!(Partitioner::new(p), Err(PrepError::InvalidTrainFraction { .. })),
                "p = {p}"
            );
        }
    }

    #[test]
    fn sizes_add_up_and_disjoint() {
        let labels: Vec<&str> = (0..37).map(|i| ["a", "b", "c"][i % 3]).collect();
        let table = labelled_table(&labels);
        for p in [0.1, 0.5, 0.8, 0.95] {
            let part = Partitioner::new(p).unwrap().split(&table, "y").unwrap();
            assert_eq!(part.train.n_rows() + part.test.n_rows(), 37);
            let train: HashSet<RowId> = ids(&part.train).into_iter().collect();
            assert!(ids(&part.test).iter().all(|id| !train.contains(id)));
        }
    }

    #[test]
    fn per_stratum_ratio_within_one_row() {
        let labels: Vec<&str> = (0..53)
            .map(|i| if i % 4 == 0 { "rare" } else { "common" })
            .collect();
        let table = labelled_table(&labels);
        let part = Partitioner::new(0.7).unwrap().split(&table, "y").unwrap();
        for s in &part.strata {
            let target = 0.7 * s.total as f64;
            assert!((s.train as f64 - target).abs() < 1.0, "{s:?}");
        }
    }

    #[test]
    fn same_seed_same_partition() {
        let labels: Vec<&str> = (0..40).map(|i| ["a", "b"][i % 2]).collect();
        let table = labelled_table(&labels);
        let a = Partitioner::new(0.8).unwrap().with_seed(7).split(&table, "y").unwrap();
        let b = Partitioner::new(0.8).unwrap().with_seed(7).split(&table, "y").unwrap();
        assert_eq!(ids(&a.train), ids(&b.train));
        assert_eq!(a.test, b.test);
    }

    #[test]
    fn different_seed_changes_membership() {
        let labels: Vec<&str> = (0..200).map(|i| ["a", "b"][i % 2]).collect();
        let table = labelled_table(&labels);
        let a = Partitioner::new(0.5).unwrap().with_seed(1).split(&table, "y").unwrap();
        let b = Partitioner::new(0.5).unwrap().with_seed(2).split(&table, "y").unwrap();
        assert_ne!(ids(&a.train), ids(&b.train));
    }

    #[test]
    fn outputs_keep_source_order() {
        let labels: Vec<&str> = (0..30).map(|i| ["a", "b", "c"][i % 3]).collect();
        let part = Partitioner::new(0.6)
            .unwrap()
            .split(&labelled_table(&labels), "y")
            .unwrap();
        assert!(part.train.row_ids().windows(2).all(|w| w[0] < w[1]));
        assert!(part.test.row_ids().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn missing_labels_form_own_stratum() {
        let table = Table::new(vec![Column::text(
            "y",
            ColumnRole::Outcome,
            vec![Some("a".into()), None, Some("a".into()), None, None],
        )])
        .unwrap();
        let part = Partitioner::new(0.5).unwrap().split(&table, "y").unwrap();
        assert_eq!(part.strata[0].label, None);
        assert_eq!(part.strata[0].total, 3);
        assert_eq!(part.strata[0].train, 2);
    }

    #[test]
    fn unknown_stratification_column() {
        let table = labelled_table(&["a", "b"]);
        let err = Partitioner::new(0.5).unwrap().split(&table, "zzz").unwrap_err();
        assert!(matches!(err, PrepError::MissingColumn { .. }));
    }
}
