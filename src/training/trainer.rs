//! Grid-searched training of boosted classifiers

use chrono::Utc;
use rayon::prelude::*;

use crate::features::LabeledTable;
use crate::model::{GbdtParams, GradientBoostedClassifier, ModelTarget, TrainedModel};
use crate::training::grid::HyperparamGrid;
use crate::training::metrics::{accuracy, ClassificationReport};
use crate::training::split::{train_test_split, StratifiedKFold};
use crate::{HoopsError, Result, TrainingConfig};

/// Cross-validated score of one grid candidate
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    pub params: GbdtParams,
    pub cv_score: f64,
}

/// Stratified split, grid search under k-fold CV, refit and evaluation
#[derive(Debug, Clone)]
pub struct ModelTrainer {
    pub grid: HyperparamGrid,
    pub test_fraction: f64,
    pub cv_folds: usize,
    pub seed: u64,
    pub threshold: f64,
}

impl Default for ModelTrainer {
    fn default() -> Self {
        Self::new(&TrainingConfig::default())
    }
}

impl ModelTrainer {
    pub fn new(config: &TrainingConfig) -> Self {
        ModelTrainer {
            grid: HyperparamGrid::from_config(config),
            test_fraction: config.test_fraction,
            cv_folds: config.cv_folds,
            seed: config.seed,
            threshold: config.threshold,
        }
    }

    /// Fit a model for `target` on `table`
    pub fn train(&self, name: &str, target: ModelTarget, table: &LabeledTable) -> Result<TrainedModel> {
        if table.is_empty() {
            return Err(HoopsError::InsufficientData {
                entity: target.description,
                available: 0,
                required: 1,
            });
        }
        if self.grid.is_empty() {
            return Err(HoopsError::Config("training grid must not be empty".into()));
        }

        if table.classes().len() < 2 {
            return self.fit_single_class(name, target, table);
        }

        let split = train_test_split(&table.labels, self.test_fraction, self.seed);
        let train = table.subset(&split.train);
        let test = table.subset(&split.test);
        log::info!(
            "{}: {} rows, train={}, test={}",
            target.description,
            table.len(),
            train.len(),
            test.len()
        );

        let (neg, pos) = train.class_counts();
        let scale_pos_weight = neg as f64 / pos.max(1) as f64;
        log::debug!("Positive class weight {:.3} ({} neg / {} pos)", scale_pos_weight, neg, pos);

        let scores = self.search(&train, scale_pos_weight)?;
        let best = best_candidate(&scores).ok_or_else(|| {
            HoopsError::Config("training grid produced no candidates".into())
        })?;
        log::info!("Best parameters: {} (cv accuracy {:.3})", best.params, best.cv_score);

        let classifier = GradientBoostedClassifier::fit(&train.rows, &train.labels, best.params)?;

        let test_report = if test.is_empty() {
            log::warn!("{}: no rows left for a test split", target.description);
            None
        } else {
            let predicted: Vec<u8> = test
                .rows
                .iter()
                .map(|row| classifier.predict(row, self.threshold))
                .collect();
            let report = ClassificationReport::from_predictions(&test.labels, &predicted);
            log::info!("Test accuracy: {:.2}%", report.accuracy * 100.0);
            Some(report)
        };

        Ok(TrainedModel {
            name: name.to_string(),
            target,
            feature_names: table.feature_names.clone(),
            classifier,
            cv_score: Some(best.cv_score),
            test_report,
            training_rows: train.len(),
            trained_at: Utc::now(),
        })
    }

    /// Cross-validated accuracy of every grid candidate, in grid order
    pub fn search(&self, table: &LabeledTable, scale_pos_weight: f64) -> Result<Vec<CandidateScore>> {
        let candidates = self.grid.candidates(scale_pos_weight);
        let folds = StratifiedKFold::new(&table.labels, self.cv_folds, self.seed);
        log::info!(
            "Searching {} candidates with {}-fold cross-validation",
            candidates.len(),
            folds.k()
        );

        candidates
            .par_iter()
            .map(|params| {
                let cv_score = self.cross_validate(table, &folds, *params)?;
                log::debug!("  {} -> {:.4}", params, cv_score);
                Ok(CandidateScore {
                    params: *params,
                    cv_score,
                })
            })
            .collect()
    }

    fn cross_validate(&self, table: &LabeledTable, folds: &StratifiedKFold, params: GbdtParams) -> Result<f64> {
        let splits = folds.splits();
        let mut total = 0.0;
        for split in &splits {
            let train = table.subset(&split.train);
            let validation = table.subset(&split.test);
            let classifier = GradientBoostedClassifier::fit(&train.rows, &train.labels, params)?;
            let predicted: Vec<u8> = validation
                .rows
                .iter()
                .map(|row| classifier.predict(row, self.threshold))
                .collect();
            total += accuracy(&validation.labels, &predicted);
        }
        Ok(total / splits.len().max(1) as f64)
    }

    /// Only one label value present: skip search and stratification and fit
    /// the first candidate on every row with unit weight.
    fn fit_single_class(&self, name: &str, target: ModelTarget, table: &LabeledTable) -> Result<TrainedModel> {
        let params = self.grid.candidates(1.0)[0];
        log::warn!(
            "{}: training data only contains class {:?}; fitting {} without search",
            target.description,
            table.classes(),
            params
        );
        let classifier = GradientBoostedClassifier::fit(&table.rows, &table.labels, params)?;
        Ok(TrainedModel {
            name: name.to_string(),
            target,
            feature_names: table.feature_names.clone(),
            classifier,
            cv_score: None,
            test_report: None,
            training_rows: table.len(),
            trained_at: Utc::now(),
        })
    }
}

/// Highest score; ties go to the earliest candidate
fn best_candidate(scores: &[CandidateScore]) -> Option<&CandidateScore> {
    scores.iter().fold(None, |best, s| match best {
        Some(b) if b.cv_score >= s.cv_score => Some(b),
        _ => Some(s),
    })
}
