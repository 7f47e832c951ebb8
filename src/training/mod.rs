//! Model training
//!
//! Stratified splits, the hyperparameter grid, cross-validated search and
//! evaluation metrics.

pub mod grid;
pub mod metrics;
pub mod split;
pub mod trainer;

pub use grid::HyperparamGrid;
pub use metrics::{ClassMetrics, ClassificationReport};
pub use split::{train_test_split, Split, StratifiedKFold};
pub use trainer::{CandidateScore, ModelTrainer};
