//! Minimal cost-complexity pruning.
//!
//! For a penalty `alpha` per leaf, the subtree minimizing
//! `R(T) + alpha * |T|` (with `R` the training misclassification count) is
//! found bottom-up: once both children are pruned, node `t` is collapsed
//! when `(R(t) - R(T_t)) / (|T_t| - 1) <= alpha`. A zero penalty keeps the
//! grown tree.

use tracing::debug;

use crate::node::{Node, NodeIndex};

/// Prune `nodes` at penalty `alpha` and return the compacted arena.
pub(crate) fn prune(mut nodes: Vec<Node>, alpha: f64) -> Vec<Node> {
    if nodes.is_empty() || alpha <= 0.0 {
        return nodes;
    }
    let before = nodes.len();
    collapse(&mut nodes, NodeIndex::ROOT.index(), alpha);
    let pruned = compact(&nodes);
    debug!(alpha, before, after = pruned.len(), "tree pruned");
    pruned
}

/// Returns `(R(T_t), |T_t|)` for the pruned subtree rooted at `idx`.
fn collapse(nodes: &mut [Node], idx: usize, alpha: f64) -> (usize, usize) {
    let (left, right) = match &nodes[idx] {
        Node::Leaf { .. } => return (nodes[idx].misclassified(), 1),
        Node::Split { left, right, .. } => (left.index(), right.index()),
    };
    let (risk_left, leaves_left) = collapse(nodes, left, alpha);
    let (risk_right, leaves_right) = collapse(nodes, right, alpha);
    let subtree_risk = risk_left + risk_right;
    let leaves = leaves_left + leaves_right;

    let own_risk = nodes[idx].misclassified();
    let gain_per_leaf = own_risk.saturating_sub(subtree_risk) as f64 / (leaves - 1) as f64;
    if gain_per_leaf <= alpha {
        nodes[idx] = nodes[idx].collapsed();
        (own_risk, 1)
    } else {
        (subtree_risk, leaves)
    }
}

/// Copy the nodes reachable from the root into a fresh pre-order arena.
fn compact(nodes: &[Node]) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    copy_subtree(nodes, NodeIndex::ROOT.index(), &mut out);
    out
}

fn copy_subtree(src: &[Node], idx: usize, out: &mut Vec<Node>) -> NodeIndex {
    let slot = out.len();
    out.push(src[idx].clone());
    if let Node::Split { left, right, .. } = &src[idx] {
        let new_left = copy_subtree(src, left.index(), out);
        let new_right = copy_subtree(src, right.index(), out);
        if let Node::Split { left, right, .. } = &mut out[slot] {
            *left = new_left;
            *right = new_right;
        }
    }
    NodeIndex::new(slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{FeatureIndex, Impurity, SplitRule};

    fn leaf(counts: [usize; 2]) -> Node {
        Node::Leaf {
            class_counts: counts.to_vec(),
            impurity: Impurity::new(0.0),
        }
    }

    fn split(counts: [usize; 2], left: usize, right: usize) -> Node {
        Node::Split {
            feature: FeatureIndex::new(0),
            rule: SplitRule::Threshold(0.5),
            left: NodeIndex::new(left),
            right: NodeIndex::new(right),
            impurity: Impurity::new(0.0),
            class_counts: counts.to_vec(),
            impurity_decrease: 1.0,
        }
    }

    /// Root (60/40) splits into a clean left leaf and a right subtree whose
    /// split only removes two errors.
    fn arena() -> Vec<Node> {
        vec![
            split([60, 40], 1, 2),
            leaf([50, 5]),
            split([10, 35], 3, 4),
            leaf([8, 2]),
            leaf([2, 33]),
        ]
    }

    #[test]
    fn zero_penalty_keeps_tree() {
        assert_eq!(prune(arena(), 0.0), arena());
    }

    #[test]
    fn small_penalty_collapses_weak_split() {
        // Right subtree: R(t) = 10, R(T_t) = 4, gain 6 per extra leaf.
        let pruned = prune(arena(), 6.0);
        assert_eq!(pruned.len(), 3);
        assert!(pruned[2].is_leaf());
        assert_eq!(pruned[2].class_counts(), &[10, 35]);
    }

    #[test]
    fn penalty_below_gain_keeps_split() {
        assert_eq!(prune(arena(), 5.9).len(), 5);
    }

    #[test]
    fn large_penalty_leaves_root_only() {
        let pruned = prune(arena(), 40.0);
        assert_eq!(pruned.len(), 1);
        assert!(pruned[0].is_leaf());
        assert_eq!(pruned[0].prediction(), 0);
    }

    #[test]
    fn compaction_reindexes_children() {
        let nodes = vec![
            split([6, 6], 1, 4),
            split([5, 1], 2, 3),
            leaf([4, 0]),
            leaf([1, 1]),
            split([1, 5], 5, 6),
            leaf([1, 0]),
            leaf([0, 5]),
        ];
        // Left subtree gains nothing; right subtree removes its only error.
        let pruned = prune(nodes, 0.5);
        assert_eq!(pruned.len(), 5);
        let Node::Split { left, right, .. } = &pruned[0] else {
            panic!("root should still split");
        };
        assert_eq!((left.index(), right.index()), (1, 2));
        assert!(pruned[1].is_leaf());
        let Node::Split { left, right, .. } = &pruned[2] else {
            panic!("right child should still split");
        };
        assert_eq!((left.index(), right.index()), (3, 4));
    }
}
