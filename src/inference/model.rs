//! Local model artifact: a standard scaler followed by a linear classifier.
//!
//! The artifact is a versioned JSON document produced by the training side.
//! It is loaded and validated once, then shared read-only.
//!
//! ```json
//! {
//!   "version": "1",
//!   "scaler": { "mean": [65 floats], "scale": [65 floats] },
//!   "classifier": { "weights": [[65 floats], [65 floats]], "bias": [2 floats] }
//! }
//! ```

use crate::core::features::{FeatureVector, FEATURE_COUNT};
use crate::inference::label::Label;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Number of output classes (0 = negative, 1 = positive).
pub const CLASS_COUNT: usize = 2;

/// Feature preprocessing step.
pub trait Scaler {
    fn transform(&self, rows: &[[f64; FEATURE_COUNT]]) -> Vec<[f64; FEATURE_COUNT]>;
}

/// Per-class scoring step.
pub trait Classifier {
    fn predict(&self, rows: &[[f64; FEATURE_COUNT]]) -> Vec<[f64; CLASS_COUNT]>;
}

/// Standardizes each feature as `(x - mean) / scale`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl Scaler for StandardScaler {
    fn transform(&self, rows: &[[f64; FEATURE_COUNT]]) -> Vec<[f64; FEATURE_COUNT]> {
        rows.iter()
            .map(|row| {
                let mut out = [0.0; FEATURE_COUNT];
                for (i, value) in out.iter_mut().enumerate() {
                    *value = (row[i] - self.mean[i]) / self.scale[i];
                }
                out
            })
            .collect()
    }
}

/// One weight row and bias per class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearClassifier {
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

impl Classifier for LinearClassifier {
    fn predict(&self, rows: &[[f64; FEATURE_COUNT]]) -> Vec<[f64; CLASS_COUNT]> {
        rows.iter()
            .map(|row| {
                let mut scores = [0.0; CLASS_COUNT];
                for (class, score) in scores.iter_mut().enumerate() {
                    *score = self.bias[class]
                        + self.weights[class]
                            .iter()
                            .zip(row.iter())
                            .map(|(w, x)| w * x)
                            .sum::<f64>();
                }
                scores
            })
            .collect()
    }
}

/// Errors loading a model artifact.
#[derive(Debug)]
pub enum ModelError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(String),
    Shape {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    InvalidScale(usize),
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::Io { path, source } => {
                write!(f, "Failed to read model from {path:?}: {source}")
            }
            ModelError::Parse(e) => write!(f, "Invalid model artifact: {e}"),
            ModelError::Shape {
                field,
                expected,
                actual,
            } => write!(f, "Model field `{field}` has length {actual}, expected {expected}"),
            ModelError::InvalidScale(i) => {
                write!(f, "Scaler has a zero or non-finite scale at feature {i}")
            }
        }
    }
}

impl std::error::Error for ModelError {}

/// A validated scaler + classifier pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    pub version: String,
    pub scaler: StandardScaler,
    pub classifier: LinearClassifier,
}

impl ModelBundle {
    /// Build a bundle, checking every dimension.
    pub fn new(
        version: impl Into<String>,
        scaler: StandardScaler,
        classifier: LinearClassifier,
    ) -> Result<Self, ModelError> {
        let bundle = Self {
            version: version.into(),
            scaler,
            classifier,
        };
        bundle.validate()?;
        Ok(bundle)
    }

    /// Parse and validate a JSON artifact.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let bundle: ModelBundle =
            serde_json::from_str(json).map_err(|e| ModelError::Parse(e.to_string()))?;
        bundle.validate()?;
        Ok(bundle)
    }

    /// Load an artifact from disk.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let json = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let bundle = Self::from_json(&json)?;
        tracing::info!(path = ?path, version = %bundle.version, "loaded model artifact");
        Ok(bundle)
    }

    fn validate(&self) -> Result<(), ModelError> {
        check_len("scaler.mean", FEATURE_COUNT, self.scaler.mean.len())?;
        check_len("scaler.scale", FEATURE_COUNT, self.scaler.scale.len())?;
        check_len("classifier.weights", CLASS_COUNT, self.classifier.weights.len())?;
        check_len("classifier.bias", CLASS_COUNT, self.classifier.bias.len())?;
        for row in &self.classifier.weights {
            check_len("classifier.weights[]", FEATURE_COUNT, row.len())?;
        }
        if let Some(i) = self
            .scaler
            .scale
            .iter()
            .position(|s| *s == 0.0 || !s.is_finite())
        {
            return Err(ModelError::InvalidScale(i));
        }
        Ok(())
    }

    /// Classify a batch, one label per input in the same order.
    pub fn classify(&self, vectors: &[FeatureVector]) -> Vec<Label> {
        let rows: Vec<[f64; FEATURE_COUNT]> = vectors.iter().map(FeatureVector::values).collect();
        let scaled = self.scaler.transform(&rows);
        self.classifier
            .predict(&scaled)
            .iter()
            .map(|scores| Label::from_class(argmax(scores)))
            .collect()
    }

    /// Classify a single vector.
    pub fn classify_one(&self, vector: &FeatureVector) -> Label {
        self.classify(std::slice::from_ref(vector))[0]
    }
}

fn check_len(field: &'static str, expected: usize, actual: usize) -> Result<(), ModelError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ModelError::Shape {
            field,
            expected,
            actual,
        })
    }
}

/// Index of the highest score; ties go to the lower class.
fn argmax(scores: &[f64; CLASS_COUNT]) -> usize {
    let mut best = 0;
    for (i, score) in scores.iter().enumerate().skip(1) {
        if *score > scores[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::features::CHANNEL_COUNT;

    /// Positive when D1 (after scaling) is above zero.
    fn d1_threshold_model() -> ModelBundle {
        let mut positive = vec![0.0; FEATURE_COUNT];
        positive[1] = 1.0;
        ModelBundle::new(
            "test",
            StandardScaler {
                mean: vec![0.0; FEATURE_COUNT],
                scale: vec![1.0; FEATURE_COUNT],
            },
            LinearClassifier {
                weights: vec![vec![0.0; FEATURE_COUNT], positive],
                bias: vec![0.0, 0.0],
            },
        )
        .unwrap()
    }

    fn vector(d1: f64) -> FeatureVector {
        let mut channels = [0.0; CHANNEL_COUNT];
        channels[0] = d1;
        FeatureVector::new(30.0, channels)
    }

    #[test]
    fn test_classify_aligned_with_input() {
        let model = d1_threshold_model();
        let labels = model.classify(&[vector(1.0), vector(-1.0), vector(2.0)]);
        assert_eq!(labels, vec![Label::Positive, Label::Negative, Label::Positive]);
    }

    #[test]
    fn test_tie_goes_to_negative() {
        assert_eq!(d1_threshold_model().classify_one(&vector(0.0)), Label::Negative);
    }

    #[test]
    fn test_scaler_applied() {
        let mut model = d1_threshold_model();
        model.scaler.mean[1] = 5.0;
        model.scaler.scale[1] = 2.0;
        assert_eq!(model.classify_one(&vector(4.0)), Label::Negative);
        assert_eq!(model.classify_one(&vector(6.0)), Label::Positive);
    }

    #[test]
    fn test_json_round_trip_validates() {
        let json = serde_json::to_string(&d1_threshold_model()).unwrap();
        let model = ModelBundle::from_json(&json).unwrap();
        assert_eq!(model.version, "test");
    }

    #[test]
    fn test_shape_errors() {
        let mut model = d1_threshold_model();
        model.scaler.mean.pop();
        let json = serde_json::to_string(&model).unwrap();
        assert!(matches!(
            ModelBundle::from_json(&json),
            Err(ModelError::Shape { field: "scaler.mean", expected: 65, actual: 64 })
        ));
    }

    #[test]
    fn test_zero_scale_rejected() {
        let mut model = d1_threshold_model();
        model.scaler.scale[3] = 0.0;
        let json = serde_json::to_string(&model).unwrap();
        assert!(matches!(
            ModelBundle::from_json(&json),
            Err(ModelError::InvalidScale(3))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ModelBundle::load(Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(matches!(err, ModelError::Io { .. }));
    }
}
