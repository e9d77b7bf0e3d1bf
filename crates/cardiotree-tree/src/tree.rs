use tracing::{debug, instrument};

use crate::{
    TreeError,
    node::{FeatureKind, Node, NodeIndex, category_code},
    prune::prune,
    split::{SplitContext, SplitCriterion, find_best_split},
};

/// Configuration for a single CART decision tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
/// A tree is grown until the stopping rules below hold, then pruned back
/// with the complexity penalty.
///
/// # Defaults
///
/// | Parameter           | Default |
/// |---------------------|---------|
/// | `criterion`         | `Gini`  |
/// | `complexity`        | 0.01    |
/// | `max_depth`         | 30      |
/// | `min_samples_split` | 20      |
/// | `min_samples_leaf`  | 7       |
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) criterion: SplitCriterion,
    pub(crate) complexity: f64,
    pub(crate) max_depth: usize,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            criterion: SplitCriterion::Gini,
            complexity: 0.01,
            max_depth: 30,
            min_samples_split: 20,
            min_samples_leaf: 7,
        }
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the complexity penalty.
    ///
    /// The penalty is relative to the root's misclassification count: a
    /// split survives pruning only if it removes more than
    /// `complexity * R(root)` training errors per added leaf.
    #[must_use]
    pub fn with_complexity(mut self, complexity: f64) -> Self {
        self.complexity = complexity;
        self
    }

    /// Set the maximum tree depth (root is depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    // --- Getters ---

    /// Return the split criterion.
    #[must_use]
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    /// Return the complexity penalty.
    #[must_use]
    pub fn complexity(&self) -> f64 {
        self.complexity
    }

    /// Return the maximum depth.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Return the minimum samples required to split a node.
    #[must_use]
    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    /// Return the minimum samples required in each leaf.
    #[must_use]
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    /// Grow and prune a decision tree on the provided row-major dataset.
    ///
    /// `features[sample_idx][feature_idx]` is row-major; `kinds[feature_idx]`
    /// says how each column is split. Categorical columns hold level codes.
    /// `labels[sample_idx]` are zero-based classes.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::EmptyDataset`] | `features` is empty |
    /// | [`TreeError::ZeroFeatures`] | rows have zero feature columns |
    /// | [`TreeError::LabelCountMismatch`] | `labels.len() != features.len()` |
    /// | [`TreeError::KindCountMismatch`] | `kinds.len()` differs from the column count |
    /// | [`TreeError::FeatureCountMismatch`] | rows have inconsistent lengths |
    /// | [`TreeError::NonFiniteValue`] | any value is NaN or infinite |
    /// | [`TreeError::InvalidCategoryCode`] | a categorical value is not a code in `[0, n_levels)` |
    /// | [`TreeError::InvalidComplexity`] | the penalty is negative or not finite |
    /// | [`TreeError::InvalidMaxDepth`] | `max_depth` is 0 |
    /// | [`TreeError::InvalidMinSamplesSplit`] | `min_samples_split` < 2 |
    /// | [`TreeError::InvalidMinSamplesLeaf`] | `min_samples_leaf` < 1 |
    #[instrument(
        skip(self, features, labels, kinds),
        fields(n_samples = features.len(), cp = self.complexity)
    )]
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        kinds: &[FeatureKind],
    ) -> Result<DecisionTree, TreeError> {
        self.validate()?;
        let n_features = validate_inputs(features, labels, kinds)?;
        let n_samples = features.len();
        let n_classes = labels.iter().max().copied().unwrap_or(0) + 1;

        debug!(n_samples, n_features, n_classes, "fitting decision tree");

        let col_features: Vec<Vec<f64>> = (0..n_features)
            .map(|feat_idx| features.iter().map(|row| row[feat_idx]).collect())
            .collect();
        let ctx = SplitContext {
            features: &col_features,
            kinds,
            labels,
            n_classes,
            criterion: self.criterion,
            min_samples_leaf: self.min_samples_leaf,
        };

        let sample_indices: Vec<usize> = (0..n_samples).collect();
        let mut arena: Vec<Node> = Vec::new();
        build_tree(&ctx, self, &sample_indices, 0, &mut arena);
        let grown = arena.len();

        let alpha = self.complexity * arena[NodeIndex::ROOT.index()].misclassified() as f64;
        let nodes = prune(arena, alpha);

        debug!(grown, n_nodes = nodes.len(), "decision tree built");

        Ok(DecisionTree {
            nodes,
            kinds: kinds.to_vec(),
            n_classes,
            complexity: self.complexity,
        })
    }

    fn validate(&self) -> Result<(), TreeError> {
        if !(self.complexity.is_finite() && self.complexity >= 0.0) {
            return Err(TreeError::InvalidComplexity {
                complexity: self.complexity,
            });
        }
        if self.max_depth == 0 {
            return Err(TreeError::InvalidMaxDepth { max_depth: 0 });
        }
        if self.min_samples_split < 2 {
            return Err(TreeError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        if self.min_samples_leaf < 1 {
            return Err(TreeError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }
        Ok(())
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Check shapes and values; returns the feature count.
fn validate_inputs(
    features: &[Vec<f64>],
    labels: &[usize],
    kinds: &[FeatureKind],
) -> Result<usize, TreeError> {
    let Some(first) = features.first() else {
        return Err(TreeError::EmptyDataset);
    };
    let n_features = first.len();
    if n_features == 0 {
        return Err(TreeError::ZeroFeatures);
    }
    if labels.len() != features.len() {
        return Err(TreeError::LabelCountMismatch {
            n_samples: features.len(),
            n_labels: labels.len(),
        });
    }
    if kinds.len() != n_features {
        return Err(TreeError::KindCountMismatch {
            expected: n_features,
            got: kinds.len(),
        });
    }

    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(TreeError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        for (feature_index, (&value, kind)) in row.iter().zip(kinds).enumerate() {
            if !value.is_finite() {
                return Err(TreeError::NonFiniteValue {
                    sample_index,
                    feature_index,
                });
            }
            if let FeatureKind::Categorical { n_levels } = *kind
                && !category_code(value).is_some_and(|code| code < n_levels)
            {
                return Err(TreeError::InvalidCategoryCode {
                    sample_index,
                    feature_index,
                    value,
                    n_levels,
                });
            }
        }
    }
    Ok(n_features)
}

/// Recursively grow the arena-based decision tree.
///
/// Returns the [`NodeIndex`] of the node just created in `arena`.
fn build_tree(
    ctx: &SplitContext<'_>,
    config: &DecisionTreeConfig,
    sample_indices: &[usize],
    depth: usize,
    arena: &mut Vec<Node>,
) -> NodeIndex {
    let n_samples = sample_indices.len();

    let mut class_counts = vec![0usize; ctx.n_classes];
    for &si in sample_indices {
        class_counts[ctx.labels[si]] += 1;
    }
    let impurity = config.criterion.impurity(&class_counts, n_samples);

    let node_idx = arena.len();
    arena.push(Node::Leaf {
        class_counts: class_counts.clone(),
        impurity,
    });

    if n_samples < config.min_samples_split
        || impurity.value() == 0.0
        || depth >= config.max_depth
    {
        return NodeIndex::new(node_idx);
    }

    let Some(split) = find_best_split(ctx, sample_indices) else {
        return NodeIndex::new(node_idx);
    };

    // The leaf pushed above is a placeholder until both children exist.
    let left = build_tree(ctx, config, &split.left_indices, depth + 1, arena);
    let right = build_tree(ctx, config, &split.right_indices, depth + 1, arena);

    arena[node_idx] = Node::Split {
        feature: split.feature,
        rule: split.rule,
        left,
        right,
        impurity,
        class_counts,
        impurity_decrease: split.impurity_decrease,
    };

    NodeIndex::new(node_idx)
}

/// A fitted, pruned CART decision tree.
///
/// Stored as an arena-based `Vec<Node>` in pre-order, root first.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) kinds: Vec<FeatureKind>,
    pub(crate) n_classes: usize,
    pub(crate) complexity: f64,
}

impl DecisionTree {
    /// Predict the class label for a single sample.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, TreeError> {
        Ok(self.nodes[self.leaf_for(sample)?].prediction())
    }

    /// Predict every row of a row-major batch.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::PredictionFeatureMismatch`] for the first row of
    /// the wrong width.
    pub fn predict_batch(&self, samples: &[Vec<f64>]) -> Result<Vec<usize>, TreeError> {
        samples.iter().map(|s| self.predict(s)).collect()
    }

    /// Mean Decrease in Impurity per feature, normalized to sum to 1.0.
    ///
    /// Only splits that survived pruning contribute. All zeros when the
    /// tree is a single leaf.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0f64; self.kinds.len()];
        for node in &self.nodes {
            if let Node::Split {
                feature,
                impurity_decrease,
                ..
            } = node
            {
                totals[feature.index()] += impurity_decrease;
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }
        totals
    }

    /// Return the node arena, root first.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the node at `index`.
    #[must_use]
    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index.index()]
    }

    /// Return the feature kinds the tree was fitted with.
    #[must_use]
    pub fn kinds(&self) -> &[FeatureKind] {
        &self.kinds
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.kinds.len()
    }

    /// Return the number of classes seen in training.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return the complexity penalty the tree was pruned with.
    #[must_use]
    pub fn complexity(&self) -> f64 {
        self.complexity
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the maximum depth of the tree.
    ///
    /// A single-node tree (just a root leaf) has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0usize;
        let mut queue = std::collections::VecDeque::new();
        queue.push_back((NodeIndex::ROOT, 0usize));

        while let Some((idx, d)) = queue.pop_front() {
            match self.node(idx) {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    queue.push_back((*left, d + 1));
                    queue.push_back((*right, d + 1));
                }
            }
        }
        max_depth
    }

    /// Traverse the tree from the root and return the arena index of the leaf.
    fn leaf_for(&self, sample: &[f64]) -> Result<usize, TreeError> {
        if sample.len() != self.kinds.len() {
            return Err(TreeError::PredictionFeatureMismatch {
                expected: self.kinds.len(),
                got: sample.len(),
            });
        }
        let mut idx = NodeIndex::ROOT.index();
        loop {
            match &self.nodes[idx] {
                Node::Leaf { .. } => return Ok(idx),
                Node::Split {
                    feature,
                    rule,
                    left,
                    right,
                    ..
                } => {
                    idx = if rule.goes_left(sample[feature.index()]) {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NUMERIC_2: [FeatureKind; 2] = [FeatureKind::Numeric, FeatureKind::Numeric];

    /// Grows to purity on tiny inputs.
    fn unrestricted() -> DecisionTreeConfig {
        DecisionTreeConfig::new()
            .with_min_samples_split(2)
            .with_min_samples_leaf(1)
            .with_complexity(0.0)
    }

    fn separable() -> (Vec<Vec<f64>>, Vec<usize>) {
        let features = vec![
            vec![1.0, 0.0],
            vec![2.0, 0.0],
            vec![3.0, 0.0],
            vec![10.0, 0.0],
            vec![11.0, 0.0],
            vec![12.0, 0.0],
        ];
        (features, vec![0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn empty_dataset_error() {
        let err = DecisionTreeConfig::new().fit(&[], &[], &[]).unwrap_err();
        assert!(matches!(err, TreeError::EmptyDataset));
    }

    #[test]
    fn pure_dataset_single_leaf() {
        let features = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
        let tree = unrestricted().fit(&features, &[0, 0, 0], &NUMERIC_2).unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.predict(&[2.0, 3.0]).unwrap(), 0);
    }

    #[test]
    fn linearly_separable_correct_split() {
        let (features, labels) = separable();
        let tree = unrestricted().fit(&features, &labels, &NUMERIC_2).unwrap();
        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.predict(&[2.0, 0.0]).unwrap(), 0);
        assert_eq!(tree.predict(&[11.0, 0.0]).unwrap(), 1);
        assert_eq!(tree.feature_importances(), vec![1.0, 0.0]);
    }

    #[test]
    fn entropy_criterion_finds_same_split() {
        let (features, labels) = separable();
        let tree = unrestricted()
            .with_criterion(SplitCriterion::Entropy)
            .fit(&features, &labels, &NUMERIC_2)
            .unwrap();
        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.predict(&[3.0, 0.0]).unwrap(), 0);
        assert_eq!(tree.predict(&[10.0, 0.0]).unwrap(), 1);
    }

    #[test]
    fn default_min_split_keeps_small_data_at_root() {
        let (features, labels) = separable();
        let tree = DecisionTreeConfig::new().fit(&features, &labels, &NUMERIC_2).unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.feature_importances(), vec![0.0, 0.0]);
    }

    #[test]
    fn xor_needs_depth_two() {
        let features = vec![vec![0.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]];
        let labels = vec![0, 1, 1, 0];
        // Neither root split reduces Gini, so growth stops at the root.
        let tree = unrestricted().fit(&features, &labels, &NUMERIC_2).unwrap();
        assert_eq!(tree.depth(), 0);
    }

    #[test]
    fn max_depth_limits_tree() {
        let features: Vec<Vec<f64>> = (0..8).map(|i| vec![f64::from(i)]).collect();
        let labels = vec![0, 1, 0, 1, 0, 1, 0, 1];
        let tree = unrestricted()
            .with_max_depth(2)
            .fit(&features, &labels, &[FeatureKind::Numeric])
            .unwrap();
        assert!(tree.depth() <= 2);
    }

    #[test]
    fn categorical_feature_splits_on_levels() {
        // Level codes 0..3; levels 1 and 3 are class 1.
        let features: Vec<Vec<f64>> = (0..12).map(|i| vec![f64::from(i % 4)]).collect();
        let labels: Vec<usize> = (0..12).map(|i| i % 2).collect();
        let kinds = [FeatureKind::Categorical { n_levels: 4 }];
        let tree = unrestricted().fit(&features, &labels, &kinds).unwrap();
        assert_eq!(tree.n_leaves(), 2);
        for code in 0..4 {
            assert_eq!(tree.predict(&[f64::from(code)]).unwrap(), code as usize % 2);
        }
    }

    #[test]
    fn complexity_prunes_back_to_root() {
        let features: Vec<Vec<f64>> = (0..40).map(|i| vec![f64::from(i)]).collect();
        // One label flip per ten rows, not enough to justify splitting at cp = 1.
        let labels: Vec<usize> = (0..40).map(|i| usize::from(i >= 20 || i % 10 == 3)).collect();
        let kinds = [FeatureKind::Numeric];
        let full = unrestricted().fit(&features, &labels, &kinds).unwrap();
        let pruned = unrestricted().with_complexity(1.0).fit(&features, &labels, &kinds).unwrap();
        assert!(full.n_nodes() > 1);
        assert_eq!(pruned.n_nodes(), 1);
        assert!((pruned.complexity() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn larger_penalty_never_grows_tree() {
        let features: Vec<Vec<f64>> = (0..60)
            .map(|i| vec![f64::from(i % 17), f64::from(i % 5)])
            .collect();
        let labels: Vec<usize> = (0..60).map(|i| usize::from((i * 7) % 11 < 5)).collect();
        let mut last = usize::MAX;
        for cp in [0.0, 0.001, 0.01, 0.1, 1.0] {
            let tree = unrestricted()
                .with_complexity(cp)
                .fit(&features, &labels, &NUMERIC_2)
                .unwrap();
            assert!(tree.n_leaves() <= last, "cp {cp}");
            last = tree.n_leaves();
        }
    }

    #[test]
    fn deterministic_fit() {
        let features: Vec<Vec<f64>> = (0..50)
            .map(|i| vec![f64::from(i % 9), f64::from(i % 4)])
            .collect();
        let labels: Vec<usize> = (0..50).map(|i| usize::from(i % 3 == 0)).collect();
        let a = unrestricted().fit(&features, &labels, &NUMERIC_2).unwrap();
        let b = unrestricted().fit(&features, &labels, &NUMERIC_2).unwrap();
        assert_eq!(a.nodes(), b.nodes());
    }

    #[test]
    fn prediction_feature_mismatch() {
        let (features, labels) = separable();
        let tree = unrestricted().fit(&features, &labels, &NUMERIC_2).unwrap();
        let err = tree.predict(&[1.0]).unwrap_err();
        assert!(matches!(err, TreeError::PredictionFeatureMismatch { expected: 2, got: 1 }));
    }

    #[test]
    fn input_shape_errors() {
        let err = unrestricted()
            .fit(&[vec![1.0, 2.0], vec![3.0]], &[0, 1], &NUMERIC_2)
            .unwrap_err();
        assert!(matches!(err, TreeError::FeatureCountMismatch { .. }));

        let err = unrestricted().fit(&[vec![1.0, f64::NAN]], &[0], &NUMERIC_2).unwrap_err();
        assert!(matches!(err, TreeError::NonFiniteValue { .. }));

        let err = unrestricted().fit(&[vec![1.0, 2.0]], &[0, 1], &NUMERIC_2).unwrap_err();
        assert!(matches!(err, TreeError::LabelCountMismatch { .. }));

        let err = unrestricted().fit(&[vec![1.0, 2.0]], &[0], &[FeatureKind::Numeric]).unwrap_err();
        assert!(matches!(err, TreeError::KindCountMismatch { .. }));

        let kinds = [FeatureKind::Numeric, FeatureKind::Categorical { n_levels: 2 }];
        let err = unrestricted().fit(&[vec![1.0, 2.0]], &[0], &kinds).unwrap_err();
        assert!(matches!(err, TreeError::InvalidCategoryCode { n_levels: 2, .. }));
    }

    #[test]
    fn config_errors() {
        let (features, labels) = separable();
        for cfg in [
            unrestricted().with_complexity(-0.1),
            unrestricted().with_complexity(f64::NAN),
            unrestricted().with_max_depth(0),
            unrestricted().with_min_samples_split(1),
            unrestricted().with_min_samples_leaf(0),
        ] {
            assert!(cfg.fit(&features, &labels, &NUMERIC_2).is_err());
        }
    }
}
