//! Partition-then-clean integration tests on a deterministic synthetic table.

use std::collections::HashSet;

use cardiotree_io::{Column, ColumnRole, RowId, Table};
use cardiotree_prep::{CleanConfig, Cleaner, ColumnPolicy, Partitioner, Sentinel};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// ---------------------------------------------------------------------------
// Helper: 100 rows, 8 columns
// ---------------------------------------------------------------------------

/// Outcome levels cycle through `a, b, b, c, d` (20/40/20/20 rows).
/// `chol` is numeric with five zeros; six categorical columns each have
/// up to 10% missing values.
fn make_table() -> Table {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let n = 100;
    let outcome: Vec<Option<String>> = (0..n)
        .map(|i| Some(["a", "b", "b", "c", "d"][i % 5].to_string()))
        .collect();
    let chol: Vec<Option<f64>> = (0..n)
        .map(|i| {
            if i % 20 == 7 {
                Some(0.0)
            } else {
                Some(150.0 + rng.gen_range(0.0..150.0))
            }
        })
        .collect();

    let mut columns = vec![Column::numeric("chol", ColumnRole::Numeric, chol)];
    for (c, name) in ["sex", "cp", "fbs", "restecg", "exang", "site"].iter().enumerate() {
        let values: Vec<Option<String>> = (0..n)
            .map(|i| {
                if (i + c) % (10 + c) == 0 {
                    None
                } else {
                    Some(format!("{name}{}", rng.gen_range(0..3)))
                }
            })
            .collect();
        columns.push(Column::text(*name, ColumnRole::Categorical, values));
    }
    columns.push(Column::text("num", ColumnRole::Outcome, outcome));
    Table::new(columns).unwrap()
}

fn cleaner() -> Cleaner {
    Cleaner::new(
        CleanConfig::new("num")
            .with_baseline("a")
            .with_sentinels(vec![Sentinel::new("chol", 0.0)])
            .with_categorical(
                ["sex", "cp", "fbs", "restecg", "exang", "site"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            ),
    )
    .unwrap()
}

#[test]
fn scenario_split_is_80_20_per_stratum() {
    let table = make_table();
    assert_eq!(table.n_rows(), 100);
    assert_eq!(table.n_cols(), 8);

    let part = Partitioner::new(0.8)
        .unwrap()
        .with_seed(42)
        .split(&table, "num")
        .unwrap();

    assert_eq!(part.train.n_rows(), 80);
    assert_eq!(part.test.n_rows(), 20);

    let expected = [("a", 20), ("b", 40), ("c", 20), ("d", 20)];
    assert_eq!(part.strata.len(), 4);
    for (stratum, (label, total)) in part.strata.iter().zip(expected) {
        assert_eq!(stratum.label.as_deref(), Some(label));
        assert_eq!(stratum.total, total);
        let target = 0.8 * total as f64;
        assert!((stratum.train as f64 - target).abs() <= 1.0, "{stratum:?}");
    }

    let train: HashSet<RowId> = part.train.row_ids().iter().copied().collect();
    let test: HashSet<RowId> = part.test.row_ids().iter().copied().collect();
    assert!(train.is_disjoint(&test));
    assert_eq!(train.len() + test.len(), 100);
}

#[test]
fn test_partition_inherits_train_columns() {
    let part = Partitioner::new(0.8).unwrap().split(&make_table(), "num").unwrap();
    let cleaner = cleaner();
    let train = cleaner.clean(&part.train).unwrap();
    let test = cleaner.retaining(train.column_names()).clean(&part.test).unwrap();

    assert_eq!(train.column_names(), test.column_names());
    assert_eq!(train.n_cols(), 8);
    assert!(train.n_rows() < 80);
    assert!(test.n_rows() < 20);
    assert!((0..train.n_rows()).all(|r| !train.row_has_missing(r)));
}

#[test]
fn independent_policy_prunes_by_own_missingness() {
    // A threshold of zero drops every column with any missing value. Every
    // categorical column has gaps and `chol` gains five after recoding.
    let strict = Cleaner::new(
        cleaner()
            .config()
            .clone()
            .with_missing_threshold(0.0)
            .with_column_policy(ColumnPolicy::Independent),
    )
    .unwrap();
    let (cleaned, summary) = strict.clean_with_summary(&make_table()).unwrap();
    assert_eq!(cleaned.column_names(), vec!["num"]);
    assert_eq!(cleaned.n_rows(), 100);
    assert_eq!(summary.dropped_columns.len(), 7);
    assert_eq!(summary.class_counts, [20, 80]);
}
