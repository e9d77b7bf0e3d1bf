//! Stratified k-fold assignment and per-candidate fold statistics.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

/// Assign every sample to one of `n_folds` folds, stratified by class.
///
/// Samples are grouped by class, each group is shuffled, and groups are
/// dealt round-robin across folds in class order. The fold cursor carries
/// over from one class to the next, so fold sizes differ by at most one.
pub(crate) fn stratified_folds(labels: &[usize], n_folds: usize, seed: u64) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let n_classes = labels.iter().max().map_or(0, |m| m + 1);

    let mut class_indices: Vec<Vec<usize>> = vec![vec![]; n_classes];
    for (i, &label) in labels.iter().enumerate() {
        class_indices[label].push(i);
    }

    let mut assignments = vec![0usize; labels.len()];
    let mut cursor = 0usize;
    for indices in &mut class_indices {
        indices.shuffle(&mut rng);
        for &idx in indices.iter() {
            assignments[idx] = cursor % n_folds;
            cursor += 1;
        }
    }
    assignments
}

/// Cross-validation scores of one complexity penalty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateScore {
    /// Complexity penalty.
    pub penalty: f64,
    /// Objective score per fold, in fold order.
    pub fold_scores: Vec<f64>,
    /// Mean of the fold scores.
    pub mean: f64,
    /// Sample standard deviation of the fold scores.
    pub std_dev: f64,
    /// Standard error of the mean: `std_dev / sqrt(k)`.
    pub std_error: f64,
}

impl CandidateScore {
    /// Summarize the fold scores of `penalty`.
    pub(crate) fn new(penalty: f64, fold_scores: Vec<f64>) -> Self {
        let k = fold_scores.len() as f64;
        let mean = fold_scores.iter().sum::<f64>() / k;
        let std_dev = if fold_scores.len() > 1 {
            let ss: f64 = fold_scores.iter().map(|s| (s - mean).powi(2)).sum();
            (ss / (k - 1.0)).sqrt()
        } else {
            0.0
        };
        Self {
            penalty,
            fold_scores,
            mean,
            std_dev,
            std_error: std_dev / k.sqrt(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_are_balanced_and_stratified() {
        let labels: Vec<usize> = (0..53).map(|i| usize::from(i % 3 == 0)).collect();
        let folds = stratified_folds(&labels, 5, 42);

        let mut sizes = [0usize; 5];
        let mut positives = [0usize; 5];
        for (&fold, &label) in folds.iter().zip(&labels) {
            sizes[fold] += 1;
            positives[fold] += label;
        }
        assert!(sizes.iter().max().unwrap() - sizes.iter().min().unwrap() <= 1);
        assert!(positives.iter().max().unwrap() - positives.iter().min().unwrap() <= 1);
    }

    #[test]
    fn cursor_continues_across_classes() {
        // 20 of class 0 fill folds evenly; the 3 of class 1 land in folds 0..3.
        let mut labels = vec![0usize; 20];
        labels.extend([1, 1, 1]);
        let folds = stratified_folds(&labels, 5, 7);
        let mut class1: Vec<usize> = folds[20..].to_vec();
        class1.sort_unstable();
        assert_eq!(class1, vec![0, 1, 2]);
    }

    #[test]
    fn same_seed_same_folds() {
        let labels: Vec<usize> = (0..40).map(|i| i % 2).collect();
        assert_eq!(stratified_folds(&labels, 4, 9), stratified_folds(&labels, 4, 9));
        assert_ne!(stratified_folds(&labels, 4, 9), stratified_folds(&labels, 4, 10));
    }

    #[test]
    fn candidate_statistics() {
        let score = CandidateScore::new(0.01, vec![0.8, 0.7, 0.9, 0.8]);
        assert!((score.mean - 0.8).abs() < 1e-12);
        let sd = (0.02f64 / 3.0).sqrt();
        assert!((score.std_dev - sd).abs() < 1e-12);
        assert!((score.std_error - sd / 2.0).abs() < 1e-12);
    }
}
