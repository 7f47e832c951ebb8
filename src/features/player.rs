//! Over/under features from a player's game log
//!
//! Every row describes the games *before* a game: the previous game's raw
//! box score plus rolling means over the `window` games preceding it. The
//! label is whether that game's target expression beat the line. The same
//! construction applied one step past the last game gives the inference
//! vector for the next game.

use crate::features::rolling::rolling_mean;
use crate::features::{FeatureVector, LabeledTable, StatExpr};
use crate::{GameRecord, HoopsError, Result, Stat};

/// Raw box-score columns used as features
pub const BASE_STATS: [Stat; 15] = [
    Stat::Min,
    Stat::Fga,
    Stat::Fg3a,
    Stat::Fta,
    Stat::Reb,
    Stat::Ast,
    Stat::Tov,
    Stat::Fgm,
    Stat::Fg3m,
    Stat::Ftm,
    Stat::FgPct,
    Stat::Fg3Pct,
    Stat::FtPct,
    Stat::Oreb,
    Stat::Dreb,
];

/// Keeps the assist/turnover ratio finite when a game has no turnovers
pub const AST_TOV_EPSILON: f64 = 1e-5;

pub const AST_TOV_FEATURE: &str = "AST_TOV_ratio_avg";

pub fn ast_tov_ratio(record: &GameRecord) -> f64 {
    record.stat(Stat::Ast) / (record.stat(Stat::Tov) + AST_TOV_EPSILON)
}

/// Feature builder for one target expression, line and window
#[derive(Debug, Clone)]
pub struct OverUnderFeatures {
    pub expr: StatExpr,
    pub line: f64,
    pub window: usize,
}

impl OverUnderFeatures {
    pub fn new(expr: StatExpr, line: f64, window: usize) -> Result<Self> {
        if window == 0 {
            return Err(HoopsError::Config("rolling window must be at least 1 game".into()));
        }
        if !line.is_finite() {
            return Err(HoopsError::Config(format!("line must be a finite number, got {}", line)));
        }
        Ok(OverUnderFeatures { expr, line, window })
    }

    /// Ordered feature names shared by training and inference
    pub fn feature_names(&self) -> Vec<String> {
        self.columns(&[]).into_iter().map(|(name, _)| name).collect()
    }

    /// 1 if the game's target expression beat the line, `None` if undefined
    pub fn label(&self, record: &GameRecord) -> Option<u8> {
        let value = self.expr.evaluate(|s| record.stat(s));
        if value.is_finite() {
            Some(u8::from(value > self.line))
        } else {
            None
        }
    }

    /// Labeled training rows. Games without `window` earlier games, and rows
    /// with any undefined feature or label, are dropped.
    pub fn training_table(&self, entity: &str, records: &[GameRecord]) -> Result<LabeledTable> {
        let games = chronological(records);
        let columns = self.columns(&games);
        let mut table = LabeledTable::new(columns.iter().map(|(n, _)| n.clone()).collect());

        for (i, game) in games.iter().enumerate() {
            let Some(label) = self.label(game) else {
                continue;
            };
            let row: Option<Vec<f64>> = columns
                .iter()
                .map(|(_, column)| column[i].filter(|v| v.is_finite()))
                .collect();
            if let Some(row) = row {
                table.push(row, label);
            }
        }

        log::debug!(
            "{}: {} games -> {} training rows (window {})",
            entity,
            games.len(),
            table.len(),
            self.window
        );

        if table.is_empty() {
            return Err(HoopsError::InsufficientData {
                entity: entity.to_string(),
                available: games.len(),
                required: self.window + 1,
            });
        }
        Ok(table)
    }

    /// Feature vector for the game after the most recent `window` games
    pub fn inference_vector(&self, entity: &str, records: &[GameRecord]) -> Result<FeatureVector> {
        let games = chronological(records);
        if games.len() < self.window {
            return Err(HoopsError::InsufficientData {
                entity: entity.to_string(),
                available: games.len(),
                required: self.window,
            });
        }

        let recent = &games[games.len() - self.window..];
        let mut vector = FeatureVector::new();
        for (name, column) in self.columns(recent) {
            vector.push(name, column[recent.len()].unwrap_or(f64::NAN));
        }

        // Training rows are finite-only, so an undefined input has no
        // branch the trees were fitted for.
        if !vector.is_complete() {
            let undefined: Vec<&str> = vector
                .names()
                .iter()
                .zip(vector.values())
                .filter(|(_, v)| !v.is_finite())
                .map(|(name, _)| name.as_str())
                .collect();
            return Err(HoopsError::InsufficientData {
                entity: format!("{} (undefined {})", entity, undefined.join(", ")),
                available: recent.iter().filter(|g| self.is_defined(g)).count(),
                required: self.window,
            });
        }
        Ok(vector)
    }

    /// Whether every stat this builder reads is present in `game`
    fn is_defined(&self, game: &GameRecord) -> bool {
        BASE_STATS
            .iter()
            .chain(self.expr.components())
            .all(|&stat| game.stat(stat).is_finite())
    }

    /// Named feature columns with `games.len() + 1` entries each; entry i
    /// describes the games before game i.
    fn columns(&self, games: &[GameRecord]) -> Vec<(String, Vec<Option<f64>>)> {
        let series = |f: &dyn Fn(&GameRecord) -> f64| -> Vec<f64> { games.iter().map(f).collect() };
        let lagged = |values: Vec<f64>| -> Vec<Option<f64>> {
            std::iter::once(None)
                .chain(values.into_iter().map(Some))
                .collect()
        };

        let mut columns: Vec<(String, Vec<Option<f64>>)> = Vec::new();
        let mut add = |name: String, column: Vec<Option<f64>>| {
            if !columns.iter().any(|(n, _)| *n == name) {
                columns.push((name, column));
            }
        };

        for stat in BASE_STATS {
            add(stat.name().to_string(), lagged(series(&|g: &GameRecord| g.stat(stat))));
        }
        for stat in BASE_STATS {
            add(
                format!("{}_avg", stat.name()),
                rolling_mean(&series(&|g: &GameRecord| g.stat(stat)), self.window),
            );
        }
        add(
            AST_TOV_FEATURE.to_string(),
            rolling_mean(&series(&ast_tov_ratio), self.window),
        );
        for &stat in self.expr.components() {
            add(
                format!("{}_avg", stat.name()),
                rolling_mean(&series(&|g: &GameRecord| g.stat(stat)), self.window),
            );
        }

        columns
    }
}

/// Ascending by date; same-day games keep fetch order
fn chronological(records: &[GameRecord]) -> Vec<GameRecord> {
    let mut games = records.to_vec();
    games.sort_by_key(|g| g.date);
    games
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BoxScore, GameId, Venue};
    use chrono::NaiveDate;

    fn game(day: u32, pts: f64, ast: f64, tov: f64) -> GameRecord {
        let mut stats = BoxScore::new();
        for stat in Stat::ALL {
            stats.set(stat, 5.0);
        }
        stats.set(Stat::Pts, pts);
        stats.set(Stat::Ast, ast);
        stats.set(Stat::Tov, tov);
        GameRecord {
            game_id: GameId(format!("g{}", day)),
            team_id: None,
            team: "DEN".to_string(),
            opponent: "LAL".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 11, 1).unwrap() + chrono::Duration::days(day as i64),
            venue: Venue::Home,
            won: Some(true),
            stats,
        }
    }

    fn builder(expr: &str, line: f64, window: usize) -> OverUnderFeatures {
        OverUnderFeatures::new(StatExpr::parse(expr).unwrap(), line, window).unwrap()
    }

    #[test]
    fn test_feature_order() {
        let names = builder("PTS+REB", 20.5, 10).feature_names();
        assert_eq!(names.len(), 15 + 15 + 1 + 1);
        assert_eq!(names[0], "MIN");
        assert_eq!(names[15], "MIN_avg");
        assert_eq!(names[30], AST_TOV_FEATURE);
        // REB_avg already present from the base stats
        assert_eq!(names[31], "PTS_avg");
    }

    #[test]
    fn test_row_count_is_n_minus_window() {
        let games: Vec<_> = (0..15).map(|d| game(d, 10.0 + d as f64, 4.0, 2.0)).collect();
        let table = builder("PTS", 15.5, 4).training_table("test", &games).unwrap();
        assert_eq!(table.len(), 15 - 4);
    }

    #[test]
    fn test_constant_series_end_to_end() {
        let games: Vec<_> = (0..12).map(|d| game(d, 20.0, 4.0, 2.0)).collect();
        let features = builder("PTS", 19.5, 10);
        let table = features.training_table("Constant Player", &games).unwrap();

        assert_eq!(table.len(), 2);
        assert!(table.labels.iter().all(|&l| l == 1));
        let pts_avg = table.feature_names.iter().position(|n| n == "PTS_avg").unwrap();
        assert!(table.rows.iter().all(|row| row[pts_avg] == 20.0));
    }

    #[test]
    fn test_rolling_features_exclude_current_game() {
        // Points climb 10, 20, 30; the row for game 3 must only see games 1-2
        let games = vec![game(0, 10.0, 1.0, 1.0), game(1, 20.0, 1.0, 1.0), game(2, 30.0, 1.0, 1.0)];
        let table = builder("PTS", 25.0, 2).training_table("test", &games).unwrap();
        assert_eq!(table.len(), 1);
        let pts_avg = table.feature_names.iter().position(|n| n == "PTS_avg").unwrap();
        assert_eq!(table.rows[0][pts_avg], 15.0);
        assert_eq!(table.labels[0], 1);
    }

    #[test]
    fn test_ratio_finite_with_zero_turnovers() {
        let games: Vec<_> = (0..4).map(|d| game(d, 20.0, 6.0, 0.0)).collect();
        let vector = builder("PTS", 19.5, 3).inference_vector("test", &games).unwrap();
        let ratio = vector.get(AST_TOV_FEATURE).unwrap();
        assert!(ratio.is_finite());
        assert!((ratio - 6.0 / AST_TOV_EPSILON).abs() < 1e-3);
    }

    #[test]
    fn test_unsorted_input_is_sorted_by_date() {
        let mut games: Vec<_> = (0..5).map(|d| game(d, d as f64, 1.0, 1.0)).collect();
        games.reverse();
        let vector = builder("PTS", 1.0, 3).inference_vector("test", &games).unwrap();
        // Last three games by date are 2, 3, 4
        assert_eq!(vector.get("PTS_avg"), Some(3.0));
    }

    #[test]
    fn test_inference_requires_full_window() {
        let games: Vec<_> = (0..9).map(|d| game(d, 20.0, 4.0, 2.0)).collect();
        let features = builder("PTS", 19.5, 10);
        assert!(matches!(
            features.inference_vector("Short History", &games),
            Err(HoopsError::InsufficientData { available: 9, required: 10, .. })
        ));

        let games: Vec<_> = (0..10).map(|d| game(d, 20.0, 4.0, 2.0)).collect();
        let vector = features.inference_vector("Full History", &games).unwrap();
        assert_eq!(vector.names(), features.feature_names().as_slice());
        assert!(vector.is_complete());
    }

    #[test]
    fn test_inference_rejects_missing_stat_in_window() {
        let mut games: Vec<_> = (0..12).map(|d| game(d, 20.0, 4.0, 2.0)).collect();
        games[11].stats.set(Stat::Fg3Pct, f64::NAN);

        match builder("PTS", 19.5, 10).inference_vector("Julius Randle", &games) {
            Err(HoopsError::InsufficientData {
                entity,
                available,
                required,
            }) => {
                assert!(entity.contains("Julius Randle"));
                assert!(entity.contains("FG3_PCT"));
                assert!(entity.contains("FG3_PCT_avg"));
                assert_eq!(available, 9);
                assert_eq!(required, 10);
            }
            other => panic!("expected insufficient data, got {:?}", other),
        }

        // Once the gap leaves the window the vector is complete again
        let later: Vec<_> = (12..22).map(|d| game(d, 20.0, 4.0, 2.0)).collect();
        games.extend(later);
        assert!(builder("PTS", 19.5, 10).inference_vector("Julius Randle", &games).is_ok());
    }

    #[test]
    fn test_inference_matches_training_construction() {
        let games: Vec<_> = (0..8).map(|d| game(d, 12.0 + d as f64, 3.0, 1.0)).collect();
        let features = builder("PTS", 15.0, 3);

        // The training row for game 7 is built from games 4..7, which is the
        // inference vector for the history ending at game 6.
        let table = features.training_table("test", &games).unwrap();
        let vector = features.inference_vector("test", &games[..7]).unwrap();
        assert_eq!(table.rows.last().unwrap().as_slice(), vector.values());
    }

    #[test]
    fn test_no_rows_is_insufficient_data() {
        let games: Vec<_> = (0..3).map(|d| game(d, 20.0, 4.0, 2.0)).collect();
        assert!(matches!(
            builder("PTS", 19.5, 10).training_table("Rookie", &games),
            Err(HoopsError::InsufficientData { .. })
        ));
    }
}
