//! Model inference for predictions

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::features::{matchup_features, OverUnderFeatures};
use crate::model::TrainedModel;
use crate::{GameRecord, HoopsError, Result, TeamStats};

/// Side of an over/under line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineCall {
    Over,
    Under,
}

impl fmt::Display for LineCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineCall::Over => write!(f, "OVER"),
            LineCall::Under => write!(f, "UNDER"),
        }
    }
}

/// Probability that a player beats a line in the next game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverUnderPrediction {
    pub player: String,
    pub target: String,
    pub line: f64,
    pub probability: f64,
    pub call: LineCall,
}

impl fmt::Display for OverUnderPrediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (probability: {:.2}) for {}: {} > {}",
            self.call, self.probability, self.player, self.target, self.line
        )
    }
}

/// Predicted winner of a game between two teams
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinnerPrediction {
    pub team1: String,
    pub team2: String,
    /// Probability that `team1` wins
    pub probability: f64,
    pub winner: String,
}

/// Scores feature vectors with one trained model
pub struct Predictor {
    model: TrainedModel,
    threshold: f64,
}

impl Predictor {
    pub fn new(model: TrainedModel, threshold: f64) -> Self {
        Predictor { model, threshold }
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    /// Over/under call for the game after the most recent `window` games
    pub fn over_under(
        &self,
        features: &OverUnderFeatures,
        player: &str,
        records: &[GameRecord],
    ) -> Result<OverUnderPrediction> {
        if let Some(window) = self.model.target.window {
            if window != features.window {
                return Err(HoopsError::Config(format!(
                    "model {} uses a {}-game window, requested {}",
                    self.model.name, window, features.window
                )));
            }
        }
        if let Some(line) = self.model.target.line {
            if line != features.line {
                return Err(HoopsError::Config(format!(
                    "model {} was trained for line {}, requested {}; retrain for the new line",
                    self.model.name, line, features.line
                )));
            }
        }

        let vector = features.inference_vector(player, records)?;
        let probability = self.model.positive_probability(&vector)?;
        let call = if probability > self.threshold {
            LineCall::Over
        } else {
            LineCall::Under
        };

        Ok(OverUnderPrediction {
            player: player.to_string(),
            target: features.expr.to_string(),
            line: features.line,
            probability,
            call,
        })
    }

    /// Winner between two teams from their season averages
    pub fn winner(&self, team1: &TeamStats, team2: &TeamStats) -> Result<WinnerPrediction> {
        let vector = matchup_features(team1, team2);
        let probability = self.model.positive_probability(&vector)?;
        let winner = if probability > self.threshold {
            &team1.team_name
        } else {
            &team2.team_name
        };

        Ok(WinnerPrediction {
            team1: team1.team_name.clone(),
            team2: team2.team_name.clone(),
            probability,
            winner: winner.clone(),
        })
    }
}
