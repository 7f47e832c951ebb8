//! Hyperparameter grid for the boosted classifier

use crate::model::GbdtParams;
use crate::TrainingConfig;

/// Value lists searched by the trainer
#[derive(Debug, Clone, PartialEq)]
pub struct HyperparamGrid {
    pub learning_rate: Vec<f64>,
    pub max_depth: Vec<usize>,
    pub n_estimators: Vec<usize>,
}

impl Default for HyperparamGrid {
    fn default() -> Self {
        HyperparamGrid {
            learning_rate: vec![0.01, 0.1],
            max_depth: vec![3, 5],
            n_estimators: vec![50, 100],
        }
    }
}

impl HyperparamGrid {
    pub fn from_config(config: &TrainingConfig) -> Self {
        HyperparamGrid {
            learning_rate: config.learning_rate.clone(),
            max_depth: config.max_depth.clone(),
            n_estimators: config.n_estimators.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.learning_rate.len() * self.max_depth.len() * self.n_estimators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every combination, learning rate outermost and tree count innermost,
    /// all sharing the given positive-class weight
    pub fn candidates(&self, scale_pos_weight: f64) -> Vec<GbdtParams> {
        let mut out = Vec::with_capacity(self.len());
        for &learning_rate in &self.learning_rate {
            for &max_depth in &self.max_depth {
                for &n_estimators in &self.n_estimators {
                    out.push(GbdtParams {
                        n_estimators,
                        max_depth,
                        learning_rate,
                        scale_pos_weight,
                    });
                }
            }
        }
        out
    }
}
