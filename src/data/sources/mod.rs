//! Upstream stats sources

pub mod nba_stats;

pub use nba_stats::NbaStatsClient;

use crate::data::PlayerInfo;
use crate::{GameRecord, HoopsError, Result, TeamStats};

/// Trait for all stats sources
pub trait StatsSource {
    /// Resolve a (partial, case-insensitive) player name
    fn find_player(&self, name: &str, season: &str) -> Result<PlayerInfo>;

    /// One player's game log for a season
    fn player_games(&self, player_id: i64, season: &str) -> Result<Vec<GameRecord>>;

    /// Every team's game log for a season (two rows per game)
    fn team_games(&self, season: &str) -> Result<Vec<GameRecord>>;

    /// Season per-game averages for every team
    fn team_stats(&self, season: &str) -> Result<Vec<TeamStats>>;
}

/// Fetch one slice per season and concatenate the results in season order.
///
/// A failing season is logged and skipped. If nothing at all comes back the
/// aggregate is an insufficient-data error for `entity`.
pub fn fetch_seasons<T, F>(entity: &str, seasons: &[String], mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(&str) -> Result<Vec<T>>,
{
    let mut all = Vec::new();
    for season in seasons {
        match fetch(season) {
            Ok(rows) => {
                log::info!("Fetched {} rows for {} ({})", rows.len(), entity, season);
                all.extend(rows);
            }
            Err(e) => {
                log::warn!("Skipping season {} for {}: {}", season, entity, e);
            }
        }
    }

    if all.is_empty() {
        return Err(HoopsError::InsufficientData {
            entity: entity.to_string(),
            available: 0,
            required: 1,
        });
    }
    Ok(all)
}
