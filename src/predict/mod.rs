//! Prediction and inference
//!
//! Score trained models against fresh feature vectors and chain winner
//! predictions through a bracket.

pub mod bracket;
pub mod inference;

pub use bracket::{round_name, simulate_bracket, simulate_bracket_with, BracketResult, BracketRound};
pub use inference::{LineCall, OverUnderPrediction, Predictor, WinnerPrediction};
