//! Persisted model artifacts

use crate::features::FeatureVector;
use crate::model::gbdt::{GbdtParams, GradientBoostedClassifier};
use crate::training::metrics::ClassificationReport;
use crate::{HoopsError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a model predicts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTarget {
    /// e.g. "Nikola Jokic PTS+REB > 20.5" or "home team wins"
    pub description: String,
    pub line: Option<f64>,
    pub window: Option<usize>,
}

impl ModelTarget {
    pub fn over_under(entity: &str, expr: &str, line: f64, window: usize) -> Self {
        ModelTarget {
            description: format!("{} {} > {}", entity, expr, line),
            line: Some(line),
            window: Some(window),
        }
    }

    pub fn home_win() -> Self {
        ModelTarget {
            description: "home team wins".to_string(),
            line: None,
            window: None,
        }
    }
}

/// A fitted classifier bound to its ordered feature list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub name: String,
    pub target: ModelTarget,
    pub feature_names: Vec<String>,
    pub classifier: GradientBoostedClassifier,
    /// Mean cross-validated accuracy of the selected parameters
    pub cv_score: Option<f64>,
    /// Held-out evaluation; absent for single-class models
    pub test_report: Option<ClassificationReport>,
    pub training_rows: usize,
    pub trained_at: DateTime<Utc>,
}

impl TrainedModel {
    pub fn params(&self) -> &GbdtParams {
        self.classifier.params()
    }

    pub fn classes(&self) -> &[u8] {
        self.classifier.classes()
    }

    pub fn is_single_class(&self) -> bool {
        self.classes().len() == 1
    }

    /// Probability of the positive outcome for one feature vector.
    ///
    /// Features are taken in this model's order; any the vector lacks is a
    /// `FeatureMismatch`. A model that only saw one class in training
    /// reports that class's probability, inverted when the class is 0.
    pub fn positive_probability(&self, vector: &FeatureVector) -> Result<f64> {
        let values = vector.reorder(&self.feature_names, &self.name)?;
        if values.len() != self.classifier.n_features() {
            return Err(HoopsError::Parse(format!(
                "model {} was fitted on {} features but lists {}",
                self.name,
                self.classifier.n_features(),
                values.len()
            )));
        }

        let proba = self.classifier.predict_proba(&values);
        match (self.classes(), proba.as_slice()) {
            ([_, _], [_, p]) => Ok(*p),
            ([only], [p]) => {
                log::warn!(
                    "Model {} only trained on one class ({}); using fallback probability",
                    self.name,
                    only
                );
                Ok(if *only == 1 { *p } else { 1.0 - *p })
            }
            _ => Err(HoopsError::Parse(format!(
                "model {} has unexpected classes {:?}",
                self.name,
                self.classes()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(rows: &[Vec<f64>], labels: &[u8]) -> TrainedModel {
        let params = GbdtParams {
            n_estimators: 30,
            ..GbdtParams::default()
        };
        TrainedModel {
            name: "test_model".to_string(),
            target: ModelTarget::home_win(),
            feature_names: vec!["x".to_string(), "y".to_string()],
            classifier: GradientBoostedClassifier::fit(rows, labels, params).unwrap(),
            cv_score: None,
            test_report: None,
            training_rows: rows.len(),
            trained_at: Utc::now(),
        }
    }

    fn vector(x: f64, y: f64) -> FeatureVector {
        let mut v = FeatureVector::new();
        // Deliberately out of model order
        v.push("y", y);
        v.push("x", x);
        v
    }

    #[test]
    fn test_probability_uses_model_feature_order() {
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64, 0.0]).collect();
        let labels: Vec<u8> = (0..20).map(|i| u8::from(i >= 10)).collect();
        let m = model(&rows, &labels);
        assert!(m.positive_probability(&vector(18.0, 0.0)).unwrap() > 0.5);
        assert!(m.positive_probability(&vector(1.0, 0.0)).unwrap() < 0.5);
    }

    #[test]
    fn test_single_class_zero_is_inverted() {
        let rows: Vec<Vec<f64>> = (0..8).map(|i| vec![i as f64, 1.0]).collect();
        let m = model(&rows, &[0; 8]);
        assert!(m.is_single_class());

        let p = m.positive_probability(&vector(3.0, 1.0)).unwrap();
        let proba = m.classifier.predict_proba(&[3.0, 1.0]);
        assert_eq!(p, 1.0 - proba[0]);
        assert!(p < 0.5);
    }

    #[test]
    fn test_single_class_one_is_used_directly() {
        let rows: Vec<Vec<f64>> = (0..8).map(|i| vec![i as f64, 1.0]).collect();
        let m = model(&rows, &[1; 8]);
        let p = m.positive_probability(&vector(3.0, 1.0)).unwrap();
        assert!(p > 0.5);
    }

    #[test]
    fn test_missing_feature_is_mismatch() {
        let rows: Vec<Vec<f64>> = (0..8).map(|i| vec![i as f64, 1.0]).collect();
        let m = model(&rows, &[0, 1, 0, 1, 0, 1, 0, 1]);
        let mut v = FeatureVector::new();
        v.push("x", 1.0);
        assert!(matches!(
            m.positive_probability(&v),
            Err(HoopsError::FeatureMismatch { .. })
        ));
    }
}
