//! Gradient-boosted tree models
//!
//! - `tree`: second-order regression trees
//! - `gbdt`: logistic-loss boosted classifier
//! - `trained`: the persisted model artifact bound to its feature list

pub mod gbdt;
pub mod trained;
pub mod tree;

pub use gbdt::{GbdtParams, GradientBoostedClassifier};
pub use trained::{ModelTarget, TrainedModel};
pub use tree::{RegressionTree, TreeParams};
