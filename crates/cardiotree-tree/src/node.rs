use std::fmt;

/// Zero-based feature column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    /// Create a new feature index from a zero-based column position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based feature column index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index into a `Vec<Node>` arena, identifying a specific node in a decision tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// Create a new node index from a zero-based arena position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// The root of every tree.
    pub const ROOT: NodeIndex = NodeIndex(0);

    /// Return the zero-based arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Criterion-agnostic impurity value (Gini or Entropy).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, serde::Serialize)]
pub struct Impurity(f64);

impl Impurity {
    /// Create a new impurity value.
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw impurity value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Impurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// How a feature column is interpreted by the splitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// Ordered values; splits are thresholds.
    Numeric,
    /// Level codes `0..n_levels`; splits are level subsets.
    Categorical {
        /// Number of levels the codes index into.
        n_levels: usize,
    },
}

/// The routing test of an interior node.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitRule {
    /// Samples with `value <= threshold` go left.
    Threshold(f64),
    /// Samples whose level code has `left[code] == true` go left.
    ///
    /// Levels absent from the node's training samples are assigned to the
    /// larger child when the rule is built; codes beyond `left` follow
    /// `larger_left`.
    Categories {
        /// Per-level routing.
        left: Vec<bool>,
        /// Whether the left child received more training samples.
        larger_left: bool,
    },
}

impl SplitRule {
    /// Return `true` when `value` is routed to the left child.
    #[must_use]
    pub fn goes_left(&self, value: f64) -> bool {
        match self {
            SplitRule::Threshold(threshold) => value <= *threshold,
            SplitRule::Categories { left, larger_left } => category_code(value)
                .and_then(|code| left.get(code).copied())
                .unwrap_or(*larger_left),
        }
    }
}

/// Interpret `value` as a level code, if it is a non-negative integer.
pub(crate) fn category_code(value: f64) -> Option<usize> {
    (value >= 0.0 && value.fract() == 0.0 && value.is_finite()).then_some(value as usize)
}

/// A node in a decision tree arena.
///
/// Trees are stored as `Vec<Node>` where children are referenced by
/// [`NodeIndex`] rather than pointers. Every node keeps the class counts of
/// the training samples that reached it, so an interior node can be
/// collapsed into a leaf during pruning and rendered with its fitted value.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum Node {
    /// An interior split node.
    Split {
        /// Feature used for the split.
        feature: FeatureIndex,
        /// Routing test on that feature.
        rule: SplitRule,
        /// Index of the left child node.
        left: NodeIndex,
        /// Index of the right child node.
        right: NodeIndex,
        /// Impurity at this node before splitting.
        impurity: Impurity,
        /// Training samples per class at this node.
        class_counts: Vec<usize>,
        /// Weighted decrease in impurity from this split.
        impurity_decrease: f64,
    },
    /// A terminal leaf node.
    Leaf {
        /// Training samples per class at this leaf.
        class_counts: Vec<usize>,
        /// Impurity at this leaf.
        impurity: Impurity,
    },
}

impl Node {
    /// Return the impurity at this node (before splitting for interior nodes).
    #[must_use]
    pub fn impurity(&self) -> Impurity {
        match self {
            Node::Split { impurity, .. } | Node::Leaf { impurity, .. } => *impurity,
        }
    }

    /// Return the training class counts at this node.
    #[must_use]
    pub fn class_counts(&self) -> &[usize] {
        match self {
            Node::Split { class_counts, .. } | Node::Leaf { class_counts, .. } => class_counts,
        }
    }

    /// Return the number of training samples that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.class_counts().iter().sum()
    }

    /// Majority class; ties go to the lowest class index.
    #[must_use]
    pub fn prediction(&self) -> usize {
        let counts = self.class_counts();
        let mut best = 0;
        for (class, &count) in counts.iter().enumerate() {
            if count > counts[best] {
                best = class;
            }
        }
        best
    }

    /// Training samples at this node not in the majority class.
    #[must_use]
    pub fn misclassified(&self) -> usize {
        let counts = self.class_counts();
        self.n_samples() - counts.get(self.prediction()).copied().unwrap_or(0)
    }

    /// Class proportions at this node; all zeros for an empty node.
    #[must_use]
    pub fn distribution(&self) -> Vec<f64> {
        let n = self.n_samples();
        self.class_counts()
            .iter()
            .map(|&c| if n == 0 { 0.0 } else { c as f64 / n as f64 })
            .collect()
    }

    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// The leaf this node becomes when its subtree is pruned away.
    pub(crate) fn collapsed(&self) -> Node {
        Node::Leaf {
            class_counts: self.class_counts().to_vec(),
            impurity: self.impurity(),
        }
    }
}
