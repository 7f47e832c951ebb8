//! Gradient-boosted tree classifier with logistic loss

use crate::model::tree::{RegressionTree, TreeParams};
use crate::{HoopsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hyperparameters searched by the trainer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GbdtParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// Weight applied to positive-class rows
    pub scale_pos_weight: f64,
}

impl Default for GbdtParams {
    fn default() -> Self {
        GbdtParams {
            n_estimators: 100,
            max_depth: 3,
            learning_rate: 0.1,
            scale_pos_weight: 1.0,
        }
    }
}

impl fmt::Display for GbdtParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n_estimators={}, max_depth={}, learning_rate={}, scale_pos_weight={:.3}",
            self.n_estimators, self.max_depth, self.learning_rate, self.scale_pos_weight
        )
    }
}

/// Binary classifier over dense feature rows.
///
/// `classes` lists the labels seen in training in ascending order;
/// `predict_proba` returns one probability per entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedClassifier {
    params: GbdtParams,
    n_features: usize,
    classes: Vec<u8>,
    base_margin: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoostedClassifier {
    pub fn fit(rows: &[Vec<f64>], labels: &[u8], params: GbdtParams) -> Result<Self> {
        if rows.is_empty() {
            return Err(HoopsError::InsufficientData {
                entity: "classifier training rows".to_string(),
                available: 0,
                required: 1,
            });
        }
        if rows.len() != labels.len() {
            return Err(HoopsError::Parse(format!(
                "{} rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        let n_features = rows[0].len();
        if let Some(bad) = rows.iter().find(|r| r.len() != n_features) {
            return Err(HoopsError::Parse(format!(
                "ragged feature rows: expected {} values, found {}",
                n_features,
                bad.len()
            )));
        }

        let mut classes: Vec<u8> = labels.to_vec();
        classes.sort_unstable();
        classes.dedup();

        let weights: Vec<f64> = labels
            .iter()
            .map(|&y| if y == 1 { params.scale_pos_weight } else { 1.0 })
            .collect();
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            ..TreeParams::default()
        };
        let indices: Vec<usize> = (0..rows.len()).collect();

        let base_margin = 0.0;
        let mut margins = vec![base_margin; rows.len()];
        let mut grad = vec![0.0; rows.len()];
        let mut hess = vec![0.0; rows.len()];
        let mut trees = Vec::with_capacity(params.n_estimators);

        for _ in 0..params.n_estimators {
            for i in 0..rows.len() {
                let p = sigmoid(margins[i]);
                let y = f64::from(labels[i]);
                grad[i] = (p - y) * weights[i];
                hess[i] = (p * (1.0 - p)).max(1e-16) * weights[i];
            }

            let mut tree = RegressionTree::fit(rows, &grad, &hess, &indices, tree_params);
            tree.scale(params.learning_rate);
            for (margin, row) in margins.iter_mut().zip(rows) {
                *margin += tree.predict(row);
            }
            trees.push(tree);
        }

        Ok(GradientBoostedClassifier {
            params,
            n_features,
            classes,
            base_margin,
            trees,
        })
    }

    pub fn params(&self) -> &GbdtParams {
        &self.params
    }

    pub fn classes(&self) -> &[u8] {
        &self.classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Raw log-odds of the positive class
    pub fn margin(&self, row: &[f64]) -> f64 {
        self.base_margin + self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
    }

    /// Probability of label 1
    pub fn positive_score(&self, row: &[f64]) -> f64 {
        sigmoid(self.margin(row))
    }

    /// One probability per entry of `classes()`
    pub fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let p = self.positive_score(row);
        self.classes
            .iter()
            .map(|&c| if c == 1 { p } else { 1.0 - p })
            .collect()
    }

    pub fn predict(&self, row: &[f64], threshold: f64) -> u8 {
        u8::from(self.positive_score(row) > threshold)
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
