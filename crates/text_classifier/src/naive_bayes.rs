//! Multinomial naive Bayes over term counts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::vectorizer::SparseCounts;

/// Additive smoothing applied to every feature count.
pub const DEFAULT_ALPHA: f64 = 1.0;

/// A fitted multinomial naive Bayes classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultinomialNb {
    /// Sorted class labels
    classes: Vec<String>,

    /// Log prior per class
    class_log_prior: Vec<f64>,

    /// `feature_log_prob[class][feature]`
    feature_log_prob: Vec<Vec<f64>>,
}

impl MultinomialNb {
    /// Fits the classifier on count vectors and their labels.
    ///
    /// `samples` and `labels` must be index-aligned; `num_features` is the
    /// vocabulary size.
    #[must_use]
    pub fn fit(samples: &[SparseCounts], labels: &[String], num_features: usize, alpha: f64) -> Self {
        let mut per_class: BTreeMap<&str, (u64, Vec<f64>)> = BTreeMap::new();

        for (counts, label) in samples.iter().zip(labels) {
            let (documents, feature_counts) = per_class
                .entry(label.as_str())
                .or_insert_with(|| (0, vec![0.0; num_features]));
            *documents += 1;
            for &(feature, count) in counts {
                if let Some(slot) = feature_counts.get_mut(feature) {
                    *slot += f64::from(count);
                }
            }
        }

        let total_documents: u64 = per_class.values().map(|(documents, _)| documents).sum();

        let mut classes = Vec::with_capacity(per_class.len());
        let mut class_log_prior = Vec::with_capacity(per_class.len());
        let mut feature_log_prob = Vec::with_capacity(per_class.len());

        for (label, (documents, feature_counts)) in per_class {
            classes.push(label.to_string());
            class_log_prior.push((to_f64(documents) / to_f64(total_documents)).ln());

            let smoothed_total: f64 =
                feature_counts.iter().sum::<f64>() + alpha * to_f64(num_features as u64);
            feature_log_prob.push(
                feature_counts
                    .iter()
                    .map(|count| ((count + alpha) / smoothed_total).ln())
                    .collect(),
            );
        }

        Self {
            classes,
            class_log_prior,
            feature_log_prob,
        }
    }

    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Unnormalized log posterior of every class.
    #[must_use]
    pub fn joint_log_likelihood(&self, counts: &SparseCounts) -> Vec<f64> {
        self.class_log_prior
            .iter()
            .zip(&self.feature_log_prob)
            .map(|(prior, log_probs)| {
                prior
                    + counts
                        .iter()
                        .filter_map(|&(feature, count)| {
                            log_probs.get(feature).map(|lp| lp * f64::from(count))
                        })
                        .sum::<f64>()
            })
            .collect()
    }

    /// Class probabilities, in the order of [`Self::classes`].
    #[must_use]
    pub fn predict_proba(&self, counts: &SparseCounts) -> Vec<f64> {
        let jll = self.joint_log_likelihood(counts);
        let max = jll.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exp: Vec<f64> = jll.iter().map(|v| (v - max).exp()).collect();
        let sum: f64 = exp.iter().sum();

        exp.into_iter().map(|v| v / sum).collect()
    }

    /// Most probable class and its probability.
    #[must_use]
    pub fn predict(&self, counts: &SparseCounts) -> Option<(&str, f64)> {
        let proba = self.predict_proba(counts);
        proba
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1).then(b.0.cmp(&a.0)))
            .and_then(|(idx, p)| self.classes.get(idx).map(|label| (label.as_str(), *p)))
    }
}

#[expect(clippy::cast_precision_loss, reason = "document counts stay far below 2^52")]
fn to_f64(value: u64) -> f64 {
    value as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_priors_follow_class_frequency() {
        let samples = vec![vec![(0, 1)], vec![(0, 1)], vec![(1, 1)]];
        let model = MultinomialNb::fit(&samples, &labels(&["a", "a", "b"]), 2, DEFAULT_ALPHA);

        assert_eq!(model.classes(), ["a", "b"]);
        let proba = model.predict_proba(&Vec::new());
        assert!((proba[0] - 2.0 / 3.0).abs() < 1e-9);
        assert!((proba[1] - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_smoothed_likelihoods() {
        // class "a": feature 0 seen 3 times, feature 1 never
        let samples = vec![vec![(0, 3)]];
        let model = MultinomialNb::fit(&samples, &labels(&["a"]), 2, 1.0);

        let expected_f0 = (4.0_f64 / 5.0).ln();
        let expected_f1 = (1.0_f64 / 5.0).ln();
        let jll = model.joint_log_likelihood(&vec![(0, 1), (1, 1)]);
        assert!((jll[0] - (expected_f0 + expected_f1)).abs() < 1e-9);
    }

    #[test]
    fn test_predict_picks_matching_class() {
        let samples = vec![vec![(0, 2)], vec![(1, 2)]];
        let model = MultinomialNb::fit(&samples, &labels(&["pos", "neg"]), 2, DEFAULT_ALPHA);

        let (label, score) = model.predict(&vec![(1, 1)]).unwrap();
        assert_eq!(label, "neg");
        assert!(score > 0.5);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let samples = vec![vec![(0, 1)], vec![(1, 1)], vec![(2, 4)]];
        let model = MultinomialNb::fit(&samples, &labels(&["x", "y", "z"]), 3, DEFAULT_ALPHA);

        let total: f64 = model.predict_proba(&vec![(0, 1), (2, 1)]).iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }
}
