//! Accuracy regression tests for cardiotree-tree.
//!
//! These tests verify that algorithmic changes do not degrade tree
//! accuracy or pruning behavior on deterministic synthetic datasets.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use cardiotree_tree::{BinaryConfusion, DecisionTreeConfig, FeatureKind, Node, SplitRule};

// ---------------------------------------------------------------------------
// Helper: deterministic synthetic binary dataset
// ---------------------------------------------------------------------------

/// Generate a 300-sample, 6-feature, 2-class dataset.
///
/// Feature 0 is numeric and informative (class * 3.0 + noise in [0, 0.5]).
/// Feature 1 is categorical with 5 levels: class 0 draws codes {0, 1},
/// class 1 draws {2, 3}; level 4 never occurs. Features 2-5 are noise.
/// `flip` is the probability that a label is flipped after generation.
fn make_classification(seed: u64, flip: f64) -> (Vec<Vec<f64>>, Vec<usize>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut features = Vec::with_capacity(300);
    let mut labels = Vec::with_capacity(300);
    for i in 0..300 {
        let class = i % 2;
        let mut row = vec![
            class as f64 * 3.0 + rng.r#gen::<f64>() * 0.5,
            (class * 2 + rng.gen_range(0..2)) as f64,
        ];
        row.extend((0..4).map(|_| rng.r#gen::<f64>()));
        features.push(row);
        labels.push(if rng.r#gen::<f64>() < flip { 1 - class } else { class });
    }
    (features, labels)
}

fn kinds() -> Vec<FeatureKind> {
    let mut kinds = vec![FeatureKind::Numeric, FeatureKind::Categorical { n_levels: 5 }];
    kinds.extend([FeatureKind::Numeric; 4]);
    kinds
}

fn accuracy(truth: &[usize], predicted: &[usize]) -> f64 {
    BinaryConfusion::from_labels(truth, predicted).unwrap().accuracy()
}

#[test]
fn training_accuracy_on_clean_data() {
    let (features, labels) = make_classification(42, 0.0);
    let tree = DecisionTreeConfig::new().fit(&features, &labels, &kinds()).unwrap();
    let predicted = tree.predict_batch(&features).unwrap();
    assert!((accuracy(&labels, &predicted) - 1.0).abs() < f64::EPSILON);
    assert_eq!(tree.n_leaves(), 2);
}

#[test]
fn held_out_accuracy_above_threshold() {
    let (train_x, train_y) = make_classification(42, 0.05);
    let (test_x, test_y) = make_classification(7, 0.05);
    let tree = DecisionTreeConfig::new().fit(&train_x, &train_y, &kinds()).unwrap();
    let acc = accuracy(&test_y, &tree.predict_batch(&test_x).unwrap());
    assert!(acc > 0.85, "held-out accuracy {acc} <= 0.85");
}

#[test]
fn top_feature_is_informative() {
    let (features, labels) = make_classification(42, 0.1);
    let tree = DecisionTreeConfig::new().fit(&features, &labels, &kinds()).unwrap();
    let importances = tree.feature_importances();
    let top = importances
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap();
    assert!(top <= 1, "top feature {top}, importances {importances:?}");
}

#[test]
fn leaves_shrink_along_penalty_grid() {
    let (features, labels) = make_classification(42, 0.2);
    let mut last = usize::MAX;
    for cp in [0.0, 0.0001, 0.001, 0.01, 0.1, 1.0] {
        let tree = DecisionTreeConfig::new()
            .with_complexity(cp)
            .fit(&features, &labels, &kinds())
            .unwrap();
        assert!(tree.n_leaves() <= last, "cp {cp}: {} leaves", tree.n_leaves());
        last = tree.n_leaves();
    }
    assert_eq!(last, 1, "cp = 1 should prune to the root");
}

#[test]
fn categorical_only_tree_routes_unseen_level() {
    let (features, labels) = make_classification(42, 0.0);
    let codes: Vec<Vec<f64>> = features.iter().map(|row| vec![row[1]]).collect();
    let tree = DecisionTreeConfig::new()
        .fit(&codes, &labels, &[FeatureKind::Categorical { n_levels: 5 }])
        .unwrap();

    let Node::Split { rule: SplitRule::Categories { left, .. }, .. } = &tree.nodes()[0] else {
        panic!("root should split on levels");
    };
    assert_eq!(left.len(), 5);
    assert_eq!(left[0], left[1]);
    assert_eq!(left[2], left[3]);
    assert_ne!(left[0], left[2]);
    assert!(tree.predict(&[4.0]).is_ok());
}

#[test]
fn deterministic_predictions() {
    let (features, labels) = make_classification(42, 0.15);
    let config = DecisionTreeConfig::new().with_complexity(0.001);
    let a = config.fit(&features, &labels, &kinds()).unwrap();
    let b = config.fit(&features, &labels, &kinds()).unwrap();
    assert_eq!(a.nodes(), b.nodes());
    assert_eq!(a.predict_batch(&features).unwrap(), b.predict_batch(&features).unwrap());
}
