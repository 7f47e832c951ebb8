//! Feature vectors and labeled feature tables

use crate::{HoopsError, Result};
use serde::{Deserialize, Serialize};

/// Named feature values in a fixed order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    names: Vec<String>,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn new() -> Self {
        FeatureVector {
            names: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Append a feature; a name already present keeps its first value
    pub fn push(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        if !self.names.contains(&name) {
            self.names.push(name);
            self.values.push(value);
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    pub fn is_complete(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }

    /// Values arranged in `order`. Any name in `order` that this vector
    /// lacks is a feature mismatch against `model`.
    pub fn reorder(&self, order: &[String], model: &str) -> Result<Vec<f64>> {
        let missing: Vec<String> = order
            .iter()
            .filter(|name| !self.names.contains(name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(HoopsError::FeatureMismatch {
                model: model.to_string(),
                missing,
            });
        }

        Ok(order
            .iter()
            .filter_map(|name| self.get(name))
            .collect())
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::new()
    }
}

/// Feature rows with 0/1 labels, all sharing one feature order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledTable {
    pub feature_names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<u8>,
}

impl LabeledTable {
    pub fn new(feature_names: Vec<String>) -> Self {
        LabeledTable {
            feature_names,
            rows: Vec::new(),
            labels: Vec::new(),
        }
    }

    /// Add a row whose features are in this table's order
    pub fn push(&mut self, row: Vec<f64>, label: u8) {
        debug_assert_eq!(row.len(), self.feature_names.len());
        self.rows.push(row);
        self.labels.push(label);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// (negatives, positives)
    pub fn class_counts(&self) -> (usize, usize) {
        let positives = self.labels.iter().filter(|&&l| l == 1).count();
        (self.labels.len() - positives, positives)
    }

    /// Distinct labels in ascending order
    pub fn classes(&self) -> Vec<u8> {
        let (neg, pos) = self.class_counts();
        let mut classes = Vec::new();
        if neg > 0 {
            classes.push(0);
        }
        if pos > 0 {
            classes.push(1);
        }
        classes
    }

    /// New table holding the given rows, in the given order
    pub fn subset(&self, indices: &[usize]) -> LabeledTable {
        LabeledTable {
            feature_names: self.feature_names.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}
