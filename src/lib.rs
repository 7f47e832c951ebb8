//! NBA prediction pipeline
//!
//! Rolling-window features over player and team game logs, gradient-boosted
//! tree classifiers for over/under lines and matchup winners, and a bracket
//! simulator built on the matchup model.

pub mod data;
pub mod features;
pub mod model;
pub mod pipeline;
pub mod predict;
pub mod training;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// NBA team identifier as issued by the stats API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamId(pub i64);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Team({})", self.0)
    }
}

/// Game identifier, e.g. "0022400061"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GameId(pub String);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Home/away designation of a game record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Venue {
    Home,
    Away,
}

impl Venue {
    pub fn code(&self) -> &'static str {
        match self {
            Venue::Home => "H",
            Venue::Away => "A",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "H" => Some(Venue::Home),
            "A" => Some(Venue::Away),
            _ => None,
        }
    }
}

/// Box-score columns known to the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stat {
    Min,
    Pts,
    Reb,
    Ast,
    Stl,
    Blk,
    Tov,
    Fgm,
    Fga,
    FgPct,
    Fg3m,
    Fg3a,
    Fg3Pct,
    Ftm,
    Fta,
    FtPct,
    Oreb,
    Dreb,
    Pf,
    PlusMinus,
}

impl Stat {
    pub const COUNT: usize = 20;

    pub const ALL: [Stat; Stat::COUNT] = [
        Stat::Min,
        Stat::Pts,
        Stat::Reb,
        Stat::Ast,
        Stat::Stl,
        Stat::Blk,
        Stat::Tov,
        Stat::Fgm,
        Stat::Fga,
        Stat::FgPct,
        Stat::Fg3m,
        Stat::Fg3a,
        Stat::Fg3Pct,
        Stat::Ftm,
        Stat::Fta,
        Stat::FtPct,
        Stat::Oreb,
        Stat::Dreb,
        Stat::Pf,
        Stat::PlusMinus,
    ];

    /// Upstream column name, also used as the feature name prefix
    pub fn name(&self) -> &'static str {
        match self {
            Stat::Min => "MIN",
            Stat::Pts => "PTS",
            Stat::Reb => "REB",
            Stat::Ast => "AST",
            Stat::Stl => "STL",
            Stat::Blk => "BLK",
            Stat::Tov => "TOV",
            Stat::Fgm => "FGM",
            Stat::Fga => "FGA",
            Stat::FgPct => "FG_PCT",
            Stat::Fg3m => "FG3M",
            Stat::Fg3a => "FG3A",
            Stat::Fg3Pct => "FG3_PCT",
            Stat::Ftm => "FTM",
            Stat::Fta => "FTA",
            Stat::FtPct => "FT_PCT",
            Stat::Oreb => "OREB",
            Stat::Dreb => "DREB",
            Stat::Pf => "PF",
            Stat::PlusMinus => "PLUS_MINUS",
        }
    }

    /// SQLite column name
    pub fn column(&self) -> String {
        self.name().to_lowercase()
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_uppercase();
        Stat::ALL.iter().copied().find(|s| s.name() == upper)
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Numeric box-score line. Missing values are stored as NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxScore {
    values: [f64; Stat::COUNT],
}

impl Default for BoxScore {
    fn default() -> Self {
        BoxScore {
            values: [f64::NAN; Stat::COUNT],
        }
    }
}

impl BoxScore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from (stat, value) pairs; stats not listed stay undefined
    pub fn from_pairs(pairs: &[(Stat, f64)]) -> Self {
        let mut score = Self::default();
        for (stat, value) in pairs {
            score.set(*stat, *value);
        }
        score
    }

    pub fn get(&self, stat: Stat) -> f64 {
        self.values[stat.index()]
    }

    pub fn set(&mut self, stat: Stat, value: f64) {
        self.values[stat.index()] = value;
    }

    pub fn with(mut self, stat: Stat, value: f64) -> Self {
        self.set(stat, value);
        self
    }
}

/// One team's (or player's) line in a single game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: GameId,
    /// Only present for team game logs
    pub team_id: Option<TeamId>,
    pub team: String,
    pub opponent: String,
    pub date: NaiveDate,
    pub venue: Venue,
    pub won: Option<bool>,
    pub stats: BoxScore,
}

impl GameRecord {
    pub fn is_home(&self) -> bool {
        self.venue == Venue::Home
    }

    pub fn stat(&self, stat: Stat) -> f64 {
        self.stats.get(stat)
    }
}

/// Home and away records of one game with the outcome label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupRecord {
    pub game_id: GameId,
    pub date: NaiveDate,
    pub home: GameRecord,
    pub away: GameRecord,
    pub home_won: bool,
}

/// Season per-game averages for one team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStats {
    pub team_id: TeamId,
    pub team_name: String,
    pub games_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub pts: f64,
    pub reb: f64,
    pub ast: f64,
    pub stl: f64,
    pub blk: f64,
    pub tov: f64,
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum HoopsError {
    #[error("Insufficient data for {entity}: have {available} rows, need {required}")]
    InsufficientData {
        entity: String,
        available: usize,
        required: usize,
    },

    #[error("Missing {what}: {path}")]
    MissingArtifact { what: String, path: String },

    #[error("Model {model} expects features that could not be built: {}", .missing.join(", "))]
    FeatureMismatch { model: String, missing: Vec<String> },

    #[error("Invalid stat expression '{expr}': {reason}")]
    InvalidStatExpr { expr: String, reason: String },

    #[error("Unknown player: {0}")]
    UnknownPlayer(String),

    #[error("Unknown team: {0}")]
    UnknownTeam(String),

    #[error("Invalid matchup for game {game_id}: {reason}")]
    InvalidMatchup { game_id: GameId, reason: String },

    #[error("Invalid bracket: {0}")]
    InvalidBracket(String),

    #[error("Upstream request to {endpoint} failed: {message}")]
    Upstream { endpoint: String, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, HoopsError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub fetch: FetchConfig,
    pub features: FeatureConfig,
    pub training: TrainingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
    pub model_dir: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Seasons in "YYYY-YY" form
    pub seasons: Vec<String>,
    pub season_type: String,
    pub timeout_secs: u64,
}

impl FetchConfig {
    /// Latest configured season; team data and player lookup use it
    pub fn current_season(&self) -> Result<&str> {
        self.seasons
            .last()
            .map(String::as_str)
            .ok_or_else(|| HoopsError::Config("fetch.seasons must list at least one season".into()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Rolling window size in games
    pub window: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub test_fraction: f64,
    pub cv_folds: usize,
    pub seed: u64,
    pub n_estimators: Vec<usize>,
    pub max_depth: Vec<usize>,
    pub learning_rate: Vec<f64>,
    /// Probability above which the positive label is predicted
    pub threshold: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data: DataConfig {
                database_path: "data/hoops.db".to_string(),
                model_dir: "models".to_string(),
            },
            fetch: FetchConfig {
                seasons: vec!["2024-25".to_string()],
                season_type: "Regular Season".to_string(),
                timeout_secs: 30,
            },
            features: FeatureConfig { window: 10 },
            training: TrainingConfig::default(),
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            test_fraction: 0.2,
            cv_folds: 5,
            seed: 42,
            n_estimators: vec![50, 100],
            max_depth: vec![3, 5],
            learning_rate: vec![0.01, 0.1],
            threshold: 0.5,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            HoopsError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| HoopsError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| HoopsError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.fetch.current_season()?;
        if self.features.window == 0 {
            return Err(HoopsError::Config("features.window must be at least 1".into()));
        }
        let t = &self.training;
        if !(t.test_fraction > 0.0 && t.test_fraction < 1.0) {
            return Err(HoopsError::Config(format!(
                "training.test_fraction must be in (0, 1), got {}",
                t.test_fraction
            )));
        }
        if t.cv_folds < 2 {
            return Err(HoopsError::Config("training.cv_folds must be at least 2".into()));
        }
        if t.n_estimators.is_empty() || t.max_depth.is_empty() || t.learning_rate.is_empty() {
            return Err(HoopsError::Config("training grid must not be empty".into()));
        }
        if t.n_estimators.contains(&0) {
            return Err(HoopsError::Config("training.n_estimators values must be at least 1".into()));
        }
        if let Some(lr) = t.learning_rate.iter().find(|lr| !(lr.is_finite() && **lr > 0.0)) {
            return Err(HoopsError::Config(format!(
                "training.learning_rate values must be positive, got {}",
                lr
            )));
        }
        if !(0.0..=1.0).contains(&t.threshold) {
            return Err(HoopsError::Config(format!(
                "training.threshold must be in [0, 1], got {}",
                t.threshold
            )));
        }
        Ok(())
    }
}
