//! End-to-end workflows: fetch, train, predict
//!
//! Ties the game store, the artifact store, feature builders, the trainer
//! and the predictor together. Models are reused from the artifact store
//! unless a refresh is requested.

use crate::data::sources::{fetch_seasons, StatsSource};
use crate::data::{pair_games, ArtifactKey, ArtifactStore, Database, PlayerInfo};
use crate::features::{matchup_table, OverUnderFeatures, StatExpr};
use crate::model::{ModelTarget, TrainedModel};
use crate::predict::{simulate_bracket, BracketResult, OverUnderPrediction, Predictor, WinnerPrediction};
use crate::training::ModelTrainer;
use crate::{Config, HoopsError, Result};

/// Counts written by a team data sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamSync {
    pub games: usize,
    pub teams: usize,
}

pub struct Pipeline<'a, S: ArtifactStore> {
    config: &'a Config,
    db: &'a Database,
    store: &'a S,
}

impl<'a, S: ArtifactStore> Pipeline<'a, S> {
    pub fn new(config: &'a Config, db: &'a Database, store: &'a S) -> Self {
        Pipeline { config, db, store }
    }

    // ==================== Data ====================

    /// Resolve a player and store their game logs for every configured
    /// season. A player already in the store is reused unless `refresh`.
    pub fn sync_player<Src: StatsSource>(&self, source: &Src, name: &str, refresh: bool) -> Result<PlayerInfo> {
        if !refresh {
            if let Some(player) = self.db.find_player(name)? {
                let games = self.db.player_game_count(player.id)?;
                if games > 0 {
                    log::info!("Using {} stored games for {}", games, player.full_name);
                    return Ok(player);
                }
            }
        }

        let season = self.config.fetch.current_season()?;
        let player = source.find_player(name, season)?;
        log::info!("Found player: {} (id {})", player.full_name, player.id);

        let games = fetch_seasons(&player.full_name, &self.config.fetch.seasons, |s| {
            source.player_games(player.id, s)
        })?;
        self.db.upsert_player(&player)?;
        let stored = self.db.replace_player_games(player.id, &games)?;
        log::info!("Stored {} games for {}", stored, player.full_name);
        Ok(player)
    }

    /// Store the current season's team game log and team averages
    pub fn sync_teams<Src: StatsSource>(&self, source: &Src, refresh: bool) -> Result<TeamSync> {
        let season = self.config.fetch.current_season()?;
        if !refresh {
            let games = self.db.get_team_games()?.len();
            let teams = self.db.get_team_stats(season)?.len();
            if games > 0 && teams > 0 {
                log::info!("Using stored team data for {} ({} rows, {} teams)", season, games, teams);
                return Ok(TeamSync { games, teams });
            }
        }

        let games = source.team_games(season)?;
        let stats = source.team_stats(season)?;
        if games.is_empty() || stats.is_empty() {
            return Err(HoopsError::InsufficientData {
                entity: format!("team data for {}", season),
                available: games.len().min(stats.len()),
                required: 1,
            });
        }

        let sync = TeamSync {
            games: self.db.replace_team_games(&games)?,
            teams: self.db.replace_team_stats(season, &stats)?,
        };
        log::info!("Stored {} team game rows and {} teams for {}", sync.games, sync.teams, season);
        Ok(sync)
    }

    pub fn stored_player(&self, name: &str) -> Result<PlayerInfo> {
        self.db
            .find_player(name)?
            .ok_or_else(|| HoopsError::UnknownPlayer(name.to_string()))
    }

    // ==================== Over/Under ====================

    /// Train (or reuse) the over/under model for a player and target
    pub fn train_over_under(
        &self,
        player: &PlayerInfo,
        expr: &StatExpr,
        line: f64,
        window: usize,
        refresh: bool,
    ) -> Result<TrainedModel> {
        let features = OverUnderFeatures::new(expr.clone(), line, window)?;
        let key = ArtifactKey::over_under_model(&player.slug(), expr)?;
        let matches_request = |m: &TrainedModel| m.target.line == Some(line) && m.target.window == Some(window);

        load_or_train(self.store, &key, refresh, matches_request, || {
            let games = self.db.get_player_games(player.id)?;
            let entity = format!("{} {}", player.full_name, expr);
            let table = features.training_table(&entity, &games)?;
            let target = ModelTarget::over_under(&player.full_name, &expr.to_string(), line, window);
            ModelTrainer::new(&self.config.training).train(key.as_str(), target, &table)
        })
    }

    /// Score the next game against a stored over/under model.
    ///
    /// The window defaults to the one the model was trained with. A model
    /// trained for another line is rejected rather than rescored.
    pub fn predict_over_under(
        &self,
        player: &PlayerInfo,
        expr: &StatExpr,
        line: f64,
        window: Option<usize>,
    ) -> Result<OverUnderPrediction> {
        let key = ArtifactKey::over_under_model(&player.slug(), expr)?;
        let model = self.load_model(&key, &format!("over/under model for {} {}", player.full_name, expr))?;

        let window = window
            .or(model.target.window)
            .unwrap_or(self.config.features.window);
        let features = OverUnderFeatures::new(expr.clone(), line, window)?;
        let games = self.db.get_recent_player_games(player.id, window)?;

        Predictor::new(model, self.config.training.threshold).over_under(&features, &player.full_name, &games)
    }

    // ==================== Winner ====================

    /// Train (or reuse) the team matchup model on the stored season
    pub fn train_winner(&self, refresh: bool) -> Result<TrainedModel> {
        let key = ArtifactKey::winner_model();
        load_or_train(self.store, &key, refresh, |_| true, || {
            let season = self.config.fetch.current_season()?;
            let matchups = pair_games(&self.db.get_team_games()?)?;
            let stats = self.db.get_team_stats(season)?;
            log::info!("{} matchups, {} teams for {}", matchups.len(), stats.len(), season);

            let table = matchup_table(&matchups, &stats)?;
            ModelTrainer::new(&self.config.training).train(key.as_str(), ModelTarget::home_win(), &table)
        })
    }

    pub fn predict_winner(&self, team1: &str, team2: &str) -> Result<WinnerPrediction> {
        let model = self.load_model(&ArtifactKey::winner_model(), "winner model")?;
        let season = self.config.fetch.current_season()?;
        let a = self.db.find_team_stats(season, team1)?;
        let b = self.db.find_team_stats(season, team2)?;
        Predictor::new(model, self.config.training.threshold).winner(&a, &b)
    }

    /// Play a bracket with the stored winner model
    pub fn bracket(&self, first_round: &[(String, String)]) -> Result<BracketResult> {
        let model = self.load_model(&ArtifactKey::winner_model(), "winner model")?;
        let predictor = Predictor::new(model, self.config.training.threshold);
        let season = self.config.fetch.current_season()?;

        simulate_bracket(first_round, |team1, team2| {
            let a = self.db.find_team_stats(season, team1)?;
            let b = self.db.find_team_stats(season, team2)?;
            Ok(predictor.winner(&a, &b)?.winner)
        })
    }

    fn load_model(&self, key: &ArtifactKey, what: &str) -> Result<TrainedModel> {
        if !self.store.exists(key) {
            return Err(HoopsError::MissingArtifact {
                what: what.to_string(),
                path: self.store.location(key),
            });
        }
        self.store.load(key)
    }
}

/// Reuse the stored model at `key` when it is present, current and no
/// refresh is requested; otherwise train and store a new one.
pub fn load_or_train<S, C, F>(store: &S, key: &ArtifactKey, refresh: bool, is_current: C, train: F) -> Result<TrainedModel>
where
    S: ArtifactStore,
    C: Fn(&TrainedModel) -> bool,
    F: FnOnce() -> Result<TrainedModel>,
{
    if !refresh && store.exists(key) {
        let model: TrainedModel = store.load(key)?;
        if is_current(&model) {
            log::info!("Model already exists: {}, skipping retrain", store.location(key));
            return Ok(model);
        }
        log::info!("Stored model {} was trained for {}; retraining", key, model.target.description);
    }

    let model = train()?;
    store.store(key, &model)?;
    log::info!("Model saved to: {}", store.location(key));
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemoryArtifactStore;
    use crate::training::HyperparamGrid;
    use crate::{BoxScore, GameId, GameRecord, Stat, TeamId, TeamStats, Venue};
    use chrono::NaiveDate;
    use std::cell::Cell;

    /// In-process stats source with a scoring player and a small league
    struct FakeSource {
        player_calls: Cell<usize>,
        fail_season: Option<&'static str>,
    }

    impl FakeSource {
        fn new() -> Self {
            FakeSource {
                player_calls: Cell::new(0),
                fail_season: None,
            }
        }
    }

    fn date(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 22).unwrap() + chrono::Duration::days(offset)
    }

    fn player_game(offset: i64, pts: f64) -> GameRecord {
        let mut stats = BoxScore::new();
        for stat in Stat::ALL {
            stats.set(stat, 3.0 + (offset % 4) as f64);
        }
        stats.set(Stat::Pts, pts);
        GameRecord {
            game_id: GameId(format!("00224{:05}", offset)),
            team_id: None,
            team: "NYK".to_string(),
            opponent: "BOS".to_string(),
            date: date(offset),
            venue: if offset % 2 == 0 { Venue::Home } else { Venue::Away },
            won: Some(offset % 3 == 0),
            stats,
        }
    }

    fn team_names() -> Vec<&'static str> {
        vec!["Atlanta Hawks", "Boston Celtics", "Chicago Bulls", "Denver Nuggets"]
    }

    impl StatsSource for FakeSource {
        fn find_player(&self, name: &str, _season: &str) -> Result<PlayerInfo> {
            if name.to_lowercase().contains("randle") {
                Ok(PlayerInfo {
                    id: 203944,
                    full_name: "Julius Randle".to_string(),
                })
            } else {
                Err(HoopsError::UnknownPlayer(name.to_string()))
            }
        }

        fn player_games(&self, _player_id: i64, season: &str) -> Result<Vec<GameRecord>> {
            self.player_calls.set(self.player_calls.get() + 1);
            if Some(season) == self.fail_season {
                return Err(HoopsError::Upstream {
                    endpoint: "playergamelog".to_string(),
                    message: "timed out".to_string(),
                });
            }
            let base = if season == "2023-24" { 0 } else { 200 };
            Ok((0..30)
                .map(|i| player_game(base + i, if i % 3 == 0 { 28.0 } else { 14.0 }))
                .collect())
        }

        fn team_games(&self, _season: &str) -> Result<Vec<GameRecord>> {
            // Three round robins; the team listed earlier in team_names() wins
            let names = team_names();
            let mut rows = Vec::new();
            let mut n = 0;
            for _ in 0..3 {
                for h in 0..names.len() {
                    for a in 0..names.len() {
                        if h == a {
                            continue;
                        }
                        n += 1;
                        let side = |t: usize, venue, won| GameRecord {
                            game_id: GameId(format!("g{}", n)),
                            team_id: Some(TeamId(t as i64)),
                            team: names[t].to_string(),
                            opponent: String::new(),
                            date: date(n),
                            venue,
                            won: Some(won),
                            stats: BoxScore::new(),
                        };
                        rows.push(side(h, Venue::Home, h < a));
                        rows.push(side(a, Venue::Away, a < h));
                    }
                }
            }
            Ok(rows)
        }

        fn team_stats(&self, _season: &str) -> Result<Vec<TeamStats>> {
            Ok(team_names()
                .iter()
                .enumerate()
                .map(|(i, name)| TeamStats {
                    team_id: TeamId(i as i64),
                    team_name: name.to_string(),
                    games_played: 18,
                    wins: 18 - 6 * i as u32,
                    losses: 6 * i as u32,
                    pts: 120.0 - 5.0 * i as f64,
                    reb: 45.0 - i as f64,
                    ast: 27.0,
                    stl: 8.0,
                    blk: 5.0,
                    tov: 12.0 + i as f64,
                })
                .collect())
        }
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.fetch.seasons = vec!["2023-24".to_string(), "2024-25".to_string()];
        config.features.window = 5;
        config.training.n_estimators = vec![10];
        config.training.max_depth = vec![2];
        config.training.learning_rate = vec![0.1];
        config.training.cv_folds = 3;
        config
    }

    #[test]
    fn test_over_under_end_to_end() {
        let config = config();
        let db = Database::in_memory().unwrap();
        let store = MemoryArtifactStore::new();
        let pipeline = Pipeline::new(&config, &db, &store);
        let source = FakeSource::new();

        let player = pipeline.sync_player(&source, "julius randle", false).unwrap();
        assert_eq!(player.full_name, "Julius Randle");
        assert_eq!(db.player_game_count(player.id).unwrap(), 60);

        let expr = StatExpr::parse("PTS").unwrap();
        let model = pipeline.train_over_under(&player, &expr, 20.5, 5, false).unwrap();
        assert_eq!(model.name, "Julius_Randle_PTS_model");
        assert_eq!(model.training_rows + model.test_report.as_ref().unwrap().total, 55);
        assert_eq!(store.len(), 1);

        let prediction = pipeline.predict_over_under(&player, &expr, 20.5, None).unwrap();
        assert!((0.0..=1.0).contains(&prediction.probability));
        assert_eq!(prediction.player, "Julius Randle");
    }

    #[test]
    fn test_stored_player_is_reused_without_refresh() {
        let config = config();
        let db = Database::in_memory().unwrap();
        let store = MemoryArtifactStore::new();
        let pipeline = Pipeline::new(&config, &db, &store);
        let source = FakeSource::new();

        pipeline.sync_player(&source, "Julius Randle", false).unwrap();
        pipeline.sync_player(&source, "julius_randle", false).unwrap();
        assert_eq!(source.player_calls.get(), 2);

        pipeline.sync_player(&source, "Julius Randle", true).unwrap();
        assert_eq!(source.player_calls.get(), 4);
    }

    #[test]
    fn test_failed_season_is_skipped() {
        let config = config();
        let db = Database::in_memory().unwrap();
        let store = MemoryArtifactStore::new();
        let pipeline = Pipeline::new(&config, &db, &store);
        let source = FakeSource {
            fail_season: Some("2023-24"),
            ..FakeSource::new()
        };

        let player = pipeline.sync_player(&source, "Randle", false).unwrap();
        assert_eq!(db.player_game_count(player.id).unwrap(), 30);
    }

    #[test]
    fn test_cached_model_is_reused_until_refresh() {
        let config = config();
        let db = Database::in_memory().unwrap();
        let store = MemoryArtifactStore::new();
        let pipeline = Pipeline::new(&config, &db, &store);
        let player = pipeline.sync_player(&FakeSource::new(), "Randle", false).unwrap();
        let expr = StatExpr::parse("PTS").unwrap();

        let first = pipeline.train_over_under(&player, &expr, 20.5, 5, false).unwrap();
        let again = pipeline.train_over_under(&player, &expr, 20.5, 5, false).unwrap();
        assert_eq!(first.trained_at, again.trained_at);

        let refreshed = pipeline.train_over_under(&player, &expr, 20.5, 5, true).unwrap();
        assert!(refreshed.trained_at >= first.trained_at);
        assert_eq!(refreshed.classifier, first.classifier);

        // A different line is a different model
        let other_line = pipeline.train_over_under(&player, &expr, 25.5, 5, false).unwrap();
        assert_eq!(other_line.target.line, Some(25.5));
    }

    #[test]
    fn test_predict_at_untrained_line_is_rejected() {
        let config = config();
        let db = Database::in_memory().unwrap();
        let store = MemoryArtifactStore::new();
        let pipeline = Pipeline::new(&config, &db, &store);
        let player = pipeline.sync_player(&FakeSource::new(), "Randle", false).unwrap();
        let expr = StatExpr::parse("PTS").unwrap();

        pipeline.train_over_under(&player, &expr, 10.5, 5, false).unwrap();
        assert!(pipeline.predict_over_under(&player, &expr, 10.5, None).is_ok());
        assert!(matches!(
            pipeline.predict_over_under(&player, &expr, 99.5, None),
            Err(HoopsError::Config(_))
        ));

        // Retraining at the new line makes it scoreable
        pipeline.train_over_under(&player, &expr, 99.5, 5, false).unwrap();
        let prediction = pipeline.predict_over_under(&player, &expr, 99.5, None).unwrap();
        assert_eq!(prediction.line, 99.5);
    }

    #[test]
    fn test_predict_without_model_is_missing_artifact() {
        let config = config();
        let db = Database::in_memory().unwrap();
        let store = MemoryArtifactStore::new();
        let pipeline = Pipeline::new(&config, &db, &store);
        let player = pipeline.sync_player(&FakeSource::new(), "Randle", false).unwrap();
        let expr = StatExpr::parse("PTS+REB").unwrap();

        match pipeline.predict_over_under(&player, &expr, 30.5, None) {
            Err(HoopsError::MissingArtifact { what, path }) => {
                assert!(what.contains("Julius Randle"));
                assert!(path.contains("Julius_Randle_PTS_REB_model"));
            }
            other => panic!("expected missing artifact, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_player_is_reported() {
        let config = config();
        let db = Database::in_memory().unwrap();
        let store = MemoryArtifactStore::new();
        let pipeline = Pipeline::new(&config, &db, &store);
        assert!(matches!(
            pipeline.sync_player(&FakeSource::new(), "Nobody Atall", false),
            Err(HoopsError::UnknownPlayer(_))
        ));
        assert!(matches!(
            pipeline.stored_player("Nobody Atall"),
            Err(HoopsError::UnknownPlayer(_))
        ));
    }

    #[test]
    fn test_winner_and_bracket() {
        let config = config();
        let db = Database::in_memory().unwrap();
        let store = MemoryArtifactStore::new();
        let pipeline = Pipeline::new(&config, &db, &store);

        let sync = pipeline.sync_teams(&FakeSource::new(), false).unwrap();
        assert_eq!(sync.teams, 4);
        assert_eq!(sync.games, 72);

        let model = pipeline.train_winner(false).unwrap();
        assert_eq!(model.name, "nba_prediction_model");
        assert_eq!(model.feature_names.len(), 6);

        let prediction = pipeline.predict_winner("Atlanta Hawks", "Denver Nuggets").unwrap();
        assert_eq!(prediction.winner, "Atlanta Hawks");

        let first_round = vec![
            ("Denver Nuggets".to_string(), "Atlanta Hawks".to_string()),
            ("Chicago Bulls".to_string(), "Boston Celtics".to_string()),
        ];
        let result = pipeline.bracket(&first_round).unwrap();
        assert_eq!(result.rounds.len(), 2);
        assert_eq!(result.champion, "Atlanta Hawks");
    }

    #[test]
    fn test_unknown_team_in_bracket() {
        let config = config();
        let db = Database::in_memory().unwrap();
        let store = MemoryArtifactStore::new();
        let pipeline = Pipeline::new(&config, &db, &store);
        pipeline.sync_teams(&FakeSource::new(), false).unwrap();
        pipeline.train_winner(false).unwrap();

        let first_round = vec![("Atlanta Hawks".to_string(), "Seattle SuperSonics".to_string())];
        assert!(matches!(
            pipeline.bracket(&first_round),
            Err(HoopsError::UnknownTeam(_))
        ));
    }

    #[test]
    fn test_grid_config_reaches_trainer() {
        let trainer = ModelTrainer::new(&config().training);
        assert_eq!(
            trainer.grid,
            HyperparamGrid {
                learning_rate: vec![0.1],
                max_depth: vec![2],
                n_estimators: vec![10],
            }
        );
    }
}
