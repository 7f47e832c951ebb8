//! Pairing team game rows into home/away matchups

use crate::{GameId, GameRecord, HoopsError, MatchupRecord, Result, Stat};
use std::collections::BTreeMap;

/// Pair team game records sharing a game id into matchups.
///
/// Every game must have exactly one home and one away row. The home-win
/// label comes from the home row's W/L flag, or from points when missing.
/// Output is ordered by date, then game id.
pub fn pair_games(records: &[GameRecord]) -> Result<Vec<MatchupRecord>> {
    let mut by_game: BTreeMap<&GameId, Vec<&GameRecord>> = BTreeMap::new();
    for record in records {
        by_game.entry(&record.game_id).or_default().push(record);
    }

    let mut matchups = Vec::with_capacity(by_game.len());
    for (game_id, rows) in by_game {
        let homes: Vec<_> = rows.iter().filter(|r| r.is_home()).collect();
        let aways: Vec<_> = rows.iter().filter(|r| !r.is_home()).collect();

        if homes.len() != 1 || aways.len() != 1 {
            return Err(HoopsError::InvalidMatchup {
                game_id: game_id.clone(),
                reason: format!(
                    "expected one home and one away row, found {} home and {} away",
                    homes.len(),
                    aways.len()
                ),
            });
        }

        let home = (*homes[0]).clone();
        let away = (*aways[0]).clone();
        let home_won = match home.won {
            Some(won) => won,
            None => home.stat(Stat::Pts) > away.stat(Stat::Pts),
        };

        matchups.push(MatchupRecord {
            game_id: game_id.clone(),
            date: home.date,
            home,
            away,
            home_won,
        });
    }

    matchups.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.game_id.cmp(&b.game_id)));
    Ok(matchups)
}
