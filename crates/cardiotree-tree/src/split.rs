use crate::node::{FeatureIndex, FeatureKind, Impurity, SplitRule};

/// Smallest impurity decrease that counts as an improvement.
const MIN_DECREASE: f64 = 1e-12;

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum SplitCriterion {
    /// Gini impurity: 1 - Σ(p_i²)
    Gini,
    /// Information entropy: -Σ(p_i · ln(p_i))
    Entropy,
}

impl SplitCriterion {
    /// Compute the impurity of a node from its class counts.
    ///
    /// Returns [`Impurity::new(0.0)`] when `n_samples` is zero (pure node).
    #[must_use]
    pub fn impurity(&self, class_counts: &[usize], n_samples: usize) -> Impurity {
        if n_samples == 0 {
            return Impurity::new(0.0);
        }
        let n = n_samples as f64;
        let value = match self {
            SplitCriterion::Gini => {
                let sum_sq: f64 = class_counts
                    .iter()
                    .map(|&c| {
                        let p = c as f64 / n;
                        p * p
                    })
                    .sum();
                1.0 - sum_sq
            }
            SplitCriterion::Entropy => -class_counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    p * p.ln()
                })
                .sum::<f64>(),
        };
        Impurity::new(value)
    }

    /// `n·I(parent) - n_l·I(left) - n_r·I(right)`.
    fn decrease(&self, parent: &[usize], left: &[usize], right: &[usize]) -> f64 {
        let n: usize = parent.iter().sum();
        let n_left: usize = left.iter().sum();
        let n_right = n - n_left;
        (n as f64) * self.impurity(parent, n).value()
            - (n_left as f64) * self.impurity(left, n_left).value()
            - (n_right as f64) * self.impurity(right, n_right).value()
    }
}

/// Result of finding the best split for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    /// Feature used for the split.
    pub(crate) feature: FeatureIndex,
    /// Routing test on that feature.
    pub(crate) rule: SplitRule,
    /// Weighted impurity decrease from this split.
    pub(crate) impurity_decrease: f64,
    /// Sample indices going to the left child.
    pub(crate) left_indices: Vec<usize>,
    /// Sample indices going to the right child.
    pub(crate) right_indices: Vec<usize>,
}

/// Shared inputs of a split search at one node.
pub(crate) struct SplitContext<'a> {
    /// Column-major features: `features[feature_idx][sample_idx]`.
    pub(crate) features: &'a [Vec<f64>],
    pub(crate) kinds: &'a [FeatureKind],
    pub(crate) labels: &'a [usize],
    pub(crate) n_classes: usize,
    pub(crate) criterion: SplitCriterion,
    pub(crate) min_samples_leaf: usize,
}

/// Find the best split of `sample_indices` over every feature.
///
/// Numeric features are scanned in sorted order with incremental class
/// counts. Categorical features order the levels present at the node by
/// their share of non-zero classes and scan prefixes of that order, which
/// finds the optimal binary partition for two classes.
///
/// Features are visited in column order and a later feature must strictly
/// beat the current best, so the result is deterministic. Returns `None`
/// when no split satisfies `min_samples_leaf` or reduces impurity.
pub(crate) fn find_best_split(
    ctx: &SplitContext<'_>,
    sample_indices: &[usize],
) -> Option<SplitResult> {
    if sample_indices.is_empty() || ctx.features.is_empty() {
        return None;
    }

    let mut parent_counts = vec![0usize; ctx.n_classes];
    for &si in sample_indices {
        parent_counts[ctx.labels[si]] += 1;
    }

    let mut best_decrease = MIN_DECREASE;
    let mut best: Option<(FeatureIndex, SplitRule)> = None;

    for (feat_idx, kind) in ctx.kinds.iter().enumerate() {
        let candidate = match kind {
            FeatureKind::Numeric => best_threshold(ctx, feat_idx, sample_indices, &parent_counts),
            FeatureKind::Categorical { n_levels } => {
                best_subset(ctx, feat_idx, *n_levels, sample_indices, &parent_counts)
            }
        };
        if let Some((decrease, rule)) = candidate
            && decrease > best_decrease
        {
            best_decrease = decrease;
            best = Some((FeatureIndex::new(feat_idx), rule));
        }
    }

    let (feature, rule) = best?;

    let column = &ctx.features[feature.index()];
    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
        .iter()
        .partition(|&&si| rule.goes_left(column[si]));

    Some(SplitResult {
        feature,
        rule,
        impurity_decrease: best_decrease,
        left_indices,
        right_indices,
    })
}

fn best_threshold(
    ctx: &SplitContext<'_>,
    feat_idx: usize,
    sample_indices: &[usize],
    parent_counts: &[usize],
) -> Option<(f64, SplitRule)> {
    let column = &ctx.features[feat_idx];
    let n_samples = sample_indices.len();

    let mut sorted: Vec<(f64, usize)> = sample_indices.iter().map(|&si| (column[si], si)).collect();
    sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut left_counts = vec![0usize; ctx.n_classes];
    let mut right_counts = parent_counts.to_vec();
    let mut best: Option<(f64, f64)> = None;

    for i in 0..(n_samples - 1) {
        let (val_i, si) = sorted[i];
        let class_i = ctx.labels[si];
        left_counts[class_i] += 1;
        right_counts[class_i] -= 1;

        let n_left = i + 1;
        let n_right = n_samples - n_left;
        let val_next = sorted[i + 1].0;
        if val_i == val_next || n_left < ctx.min_samples_leaf || n_right < ctx.min_samples_leaf {
            continue;
        }

        let decrease = ctx.criterion.decrease(parent_counts, &left_counts, &right_counts);
        if best.is_none_or(|(d, _)| decrease > d) {
            best = Some((decrease, (val_i + val_next) / 2.0));
        }
    }

    best.map(|(decrease, threshold)| (decrease, SplitRule::Threshold(threshold)))
}

fn best_subset(
    ctx: &SplitContext<'_>,
    feat_idx: usize,
    n_levels: usize,
    sample_indices: &[usize],
    parent_counts: &[usize],
) -> Option<(f64, SplitRule)> {
    let column = &ctx.features[feat_idx];
    let n_samples = sample_indices.len();

    let mut level_counts = vec![vec![0usize; ctx.n_classes]; n_levels];
    for &si in sample_indices {
        // Codes are validated against `n_levels` before growing.
        let code = column[si] as usize;
        level_counts[code][ctx.labels[si]] += 1;
    }

    let mut present: Vec<(usize, f64)> = level_counts
        .iter()
        .enumerate()
        .filter_map(|(level, counts)| {
            let n: usize = counts.iter().sum();
            (n > 0).then(|| (level, 1.0 - counts[0] as f64 / n as f64))
        })
        .collect();
    if present.len() < 2 {
        return None;
    }
    present.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

    let mut left_counts = vec![0usize; ctx.n_classes];
    let mut right_counts = parent_counts.to_vec();
    let mut best: Option<(f64, usize, usize)> = None;
    let mut n_left = 0usize;

    for (prefix_len, &(level, _)) in present.iter().enumerate().take(present.len() - 1) {
        for (class, &count) in level_counts[level].iter().enumerate() {
            left_counts[class] += count;
            right_counts[class] -= count;
            n_left += count;
        }
        let n_right = n_samples - n_left;
        if n_left < ctx.min_samples_leaf || n_right < ctx.min_samples_leaf {
            continue;
        }
        let decrease = ctx.criterion.decrease(parent_counts, &left_counts, &right_counts);
        if best.is_none_or(|(d, _, _)| decrease > d) {
            best = Some((decrease, prefix_len + 1, n_left));
        }
    }

    let (decrease, prefix_len, n_left) = best?;
    let larger_left = n_left >= n_samples - n_left;
    let mut left = vec![larger_left; n_levels];
    for (i, &(level, _)) in present.iter().enumerate() {
        left[level] = i < prefix_len;
    }
    Some((decrease, SplitRule::Categories { left, larger_left }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context<'a>(
        features: &'a [Vec<f64>],
        kinds: &'a [FeatureKind],
        labels: &'a [usize],
        min_samples_leaf: usize,
    ) -> SplitContext<'a> {
        SplitContext {
            features,
            kinds,
            labels,
            n_classes: 2,
            criterion: SplitCriterion::Gini,
            min_samples_leaf,
        }
    }

    #[test]
    fn gini_values() {
        assert!(SplitCriterion::Gini.impurity(&[10, 0], 10).value().abs() < f64::EPSILON);
        assert!((SplitCriterion::Gini.impurity(&[5, 5], 10).value() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn entropy_values() {
        assert!(SplitCriterion::Entropy.impurity(&[10, 0], 10).value().abs() < f64::EPSILON);
        let imp = SplitCriterion::Entropy.impurity(&[5, 5], 10);
        assert!((imp.value() - 2.0_f64.ln()).abs() < 1e-10);
    }

    #[test]
    fn separable_numeric_split() {
        let features = vec![vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0]];
        let labels = vec![0, 0, 0, 1, 1, 1];
        let kinds = [FeatureKind::Numeric];
        let samples: Vec<usize> = (0..6).collect();

        let split = find_best_split(&context(&features, &kinds, &labels, 1), &samples).unwrap();
        assert_eq!(split.feature.index(), 0);
        assert_eq!(split.rule, SplitRule::Threshold(6.5));
        assert_eq!(split.left_indices, vec![0, 1, 2]);
        assert_eq!(split.right_indices, vec![3, 4, 5]);
        assert!((split.impurity_decrease - 3.0).abs() < 1e-12);
    }

    #[test]
    fn constant_feature_returns_none() {
        let features = vec![vec![5.0; 4]];
        let labels = vec![0, 0, 1, 1];
        let kinds = [FeatureKind::Numeric];
        let samples: Vec<usize> = (0..4).collect();
        assert!(find_best_split(&context(&features, &kinds, &labels, 1), &samples).is_none());
    }

    #[test]
    fn min_samples_leaf_enforced() {
        let features = vec![vec![1.0, 10.0]];
        let labels = vec![0, 1];
        let kinds = [FeatureKind::Numeric];
        assert!(find_best_split(&context(&features, &kinds, &labels, 2), &[0, 1]).is_none());
    }

    #[test]
    fn categorical_groups_levels_by_class_share() {
        // Levels 0 and 2 are all class 1, level 1 and 3 all class 0.
        let features = vec![vec![0.0, 1.0, 2.0, 3.0, 0.0, 1.0, 2.0, 3.0]];
        let labels = vec![1, 0, 1, 0, 1, 0, 1, 0];
        let kinds = [FeatureKind::Categorical { n_levels: 5 }];
        let samples: Vec<usize> = (0..8).collect();

        let split = find_best_split(&context(&features, &kinds, &labels, 1), &samples).unwrap();
        let SplitRule::Categories { left, larger_left } = &split.rule else {
            panic!("expected a category split");
        };
        // Class-0 levels sort first; level 4 is unseen and follows the larger child.
        assert_eq!(left, &vec![false, true, false, true, true]);
        assert!(*larger_left);
        assert_eq!(split.left_indices, vec![1, 3, 5, 7]);
    }

    #[test]
    fn single_level_categorical_returns_none() {
        let features = vec![vec![2.0; 4]];
        let labels = vec![0, 1, 0, 1];
        let kinds = [FeatureKind::Categorical { n_levels: 3 }];
        let samples: Vec<usize> = (0..4).collect();
        assert!(find_best_split(&context(&features, &kinds, &labels, 1), &samples).is_none());
    }

    #[test]
    fn earlier_feature_wins_ties() {
        let features = vec![vec![1.0, 2.0, 3.0, 4.0], vec![1.0, 2.0, 3.0, 4.0]];
        let labels = vec![0, 0, 1, 1];
        let kinds = [FeatureKind::Numeric, FeatureKind::Numeric];
        let samples: Vec<usize> = (0..4).collect();
        let split = find_best_split(&context(&features, &kinds, &labels, 1), &samples).unwrap();
        assert_eq!(split.feature.index(), 0);
    }
}
