//! Text classification crate for the sentiment model.
//!
//! A bag-of-words [`CountVectorizer`] feeds a [`MultinomialNb`] classifier.
//! The fitted pair is stored as a single JSON artifact that the serving
//! container loads back.

mod dataset;
mod error;
mod naive_bayes;
mod vectorizer;

use serde::{Deserialize, Serialize};
use tracing::info;

pub use dataset::{Dataset, LABEL_COLUMN, TEXT_COLUMN};
pub use error::{ClassifierError, Result};
pub use naive_bayes::{DEFAULT_ALPHA, MultinomialNb};
pub use vectorizer::{CountVectorizer, SparseCounts, tokenize};

/// Version of the artifact layout written by [`TextPipeline::to_bytes`].
pub const ARTIFACT_FORMAT: u32 = 1;

/// One prediction: the most probable label and its probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub score: f64,
}

/// A fitted vectorizer + classifier pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPipeline {
    format: u32,
    vectorizer: CountVectorizer,
    classifier: MultinomialNb,
}

impl TextPipeline {
    /// Fits the vectorizer and the classifier on `dataset`.
    pub fn fit(dataset: &Dataset, alpha: f64) -> Result<Self> {
        if dataset.is_empty() {
            return Err(ClassifierError::EmptyDataset);
        }

        let vectorizer = CountVectorizer::fit(&dataset.texts);
        let samples: Vec<SparseCounts> = dataset
            .texts
            .iter()
            .map(|text| vectorizer.transform(text))
            .collect();

        let classifier =
            MultinomialNb::fit(&samples, &dataset.labels, vectorizer.num_features(), alpha);

        info!(
            documents = dataset.len(),
            vocabulary = vectorizer.num_features(),
            classes = classifier.classes().len(),
            "Fitted text pipeline"
        );

        Ok(Self {
            format: ARTIFACT_FORMAT,
            vectorizer,
            classifier,
        })
    }

    /// Predicts every text, preserving input order.
    #[must_use]
    pub fn predict<S: AsRef<str>>(&self, texts: &[S]) -> Vec<Prediction> {
        texts
            .iter()
            .map(|text| {
                let counts = self.vectorizer.transform(text.as_ref());
                self.classifier.predict(&counts).map_or_else(
                    || Prediction {
                        label: String::new(),
                        score: 0.0,
                    },
                    |(label, score)| Prediction {
                        label: label.to_string(),
                        score,
                    },
                )
            })
            .collect()
    }

    #[must_use]
    pub fn classes(&self) -> &[String] {
        self.classifier.classes()
    }

    /// Serializes the fitted pipeline.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Loads a pipeline written by [`Self::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let pipeline: Self = serde_json::from_slice(bytes)?;
        if pipeline.format != ARTIFACT_FORMAT {
            return Err(ClassifierError::UnsupportedFormat {
                found: pipeline.format,
                expected: ARTIFACT_FORMAT,
            });
        }

        Ok(Self {
            vectorizer: pipeline.vectorizer.reindexed(),
            ..pipeline
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWEETS: &str = "text,label\n\
        I love my school,positive\n\
        What a wonderful sunny day,positive\n\
        I love this teacher,positive\n\
        This exam is terrible,negative\n\
        The homework is awful and terrible,negative\n\
        I hate waiting,negative\n";

    fn fitted() -> TextPipeline {
        let dataset = Dataset::from_csv_reader(TWEETS.as_bytes()).unwrap();
        TextPipeline::fit(&dataset, DEFAULT_ALPHA).unwrap()
    }

    #[test]
    fn test_predicts_in_input_order() {
        let pipeline = fitted();
        let predictions = pipeline.predict(&["I love my school", "This exam is terrible"]);

        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0].label, "positive");
        assert_eq!(predictions[1].label, "negative");
        assert!(predictions.iter().all(|p| p.score > 0.5 && p.score <= 1.0));
    }

    #[test]
    fn test_unknown_words_fall_back_to_prior() {
        let pipeline = fitted();
        let prediction = &pipeline.predict(&["zzz qqq"])[0];
        // equal class sizes: the prior is uniform and the first class wins
        assert_eq!(prediction.label, "negative");
        assert!((prediction.score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_artifact_roundtrip_keeps_predictions() {
        let pipeline = fitted();
        let restored = TextPipeline::from_bytes(&pipeline.to_bytes().unwrap()).unwrap();

        assert_eq!(restored.classes(), pipeline.classes());
        let before = &pipeline.predict(&["awful homework"])[0];
        let after = &restored.predict(&["awful homework"])[0];
        assert_eq!(after.label, before.label);
        assert!((after.score - before.score).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_other_artifact_format() {
        let mut value: serde_json::Value =
            serde_json::from_slice(&fitted().to_bytes().unwrap()).unwrap();
        value["format"] = serde_json::json!(99);
        let err = TextPipeline::from_bytes(&serde_json::to_vec(&value).unwrap()).unwrap_err();
        assert!(matches!(err, ClassifierError::UnsupportedFormat { found: 99, .. }));
    }

    #[test]
    fn test_fit_rejects_empty_dataset() {
        let err = TextPipeline::fit(&Dataset::default(), DEFAULT_ALPHA).unwrap_err();
        assert!(matches!(err, ClassifierError::EmptyDataset));
    }
}
