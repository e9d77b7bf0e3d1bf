//! CART classification trees: grow, prune, predict, score.
//!
//! Trees are grown greedily with Gini or entropy splits over numeric
//! thresholds and categorical level subsets, then pruned back with a
//! cost-complexity penalty. The crate also provides confusion matrices and
//! the binary metrics used to score predictions.

mod confusion;
mod error;
mod node;
mod prune;
mod split;
mod tree;

pub use confusion::{BinaryConfusion, ConfusionMatrix};
pub use error::TreeError;
pub use node::{FeatureIndex, FeatureKind, Impurity, Node, NodeIndex, SplitRule};
pub use split::SplitCriterion;
pub use tree::{DecisionTree, DecisionTreeConfig};
