//! Team-vs-team differential features from season averages

use crate::features::{FeatureVector, LabeledTable};
use crate::{HoopsError, MatchupRecord, Result, TeamId, TeamStats};
use std::collections::HashMap;

/// Differential feature names, in model order
pub const MATCHUP_FEATURES: [&str; 6] = [
    "PTS_diff", "REB_diff", "AST_diff", "STL_diff", "BLK_diff", "TOV_diff",
];

/// Season-average differences `first - second`
pub fn matchup_features(first: &TeamStats, second: &TeamStats) -> FeatureVector {
    let diffs = [
        first.pts - second.pts,
        first.reb - second.reb,
        first.ast - second.ast,
        first.stl - second.stl,
        first.blk - second.blk,
        first.tov - second.tov,
    ];

    let mut vector = FeatureVector::new();
    for (name, value) in MATCHUP_FEATURES.iter().zip(diffs) {
        vector.push(*name, value);
    }
    vector
}

/// Training table of home-minus-away differentials labeled by home win.
///
/// Games whose teams have no season stats are skipped with a warning.
pub fn matchup_table(matchups: &[MatchupRecord], stats: &[TeamStats]) -> Result<LabeledTable> {
    let by_id: HashMap<TeamId, &TeamStats> = stats.iter().map(|s| (s.team_id, s)).collect();
    let lookup = |team_id: Option<TeamId>| team_id.and_then(|id| by_id.get(&id).copied());

    let mut table = LabeledTable::new(MATCHUP_FEATURES.iter().map(|s| s.to_string()).collect());
    let mut skipped = 0;

    for matchup in matchups {
        let (Some(home), Some(away)) = (lookup(matchup.home.team_id), lookup(matchup.away.team_id)) else {
            log::warn!(
                "Skipping game {} ({} vs {}): no season stats for one of the teams",
                matchup.game_id,
                matchup.home.team,
                matchup.away.team
            );
            skipped += 1;
            continue;
        };

        let vector = matchup_features(home, away);
        if vector.is_complete() {
            table.push(vector.values().to_vec(), u8::from(matchup.home_won));
        } else {
            skipped += 1;
        }
    }

    if skipped > 0 {
        log::info!("{} of {} matchups skipped", skipped, matchups.len());
    }

    if table.is_empty() {
        return Err(HoopsError::InsufficientData {
            entity: "team matchups".to_string(),
            available: matchups.len(),
            required: 1,
        });
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BoxScore, GameId, GameRecord, Venue};
    use chrono::NaiveDate;

    fn team(id: i64, name: &str, pts: f64, tov: f64) -> TeamStats {
        TeamStats {
            team_id: TeamId(id),
            team_name: name.to_string(),
            games_played: 10,
            wins: 5,
            losses: 5,
            pts,
            reb: 44.0,
            ast: 25.0,
            stl: 7.0,
            blk: 5.0,
            tov,
        }
    }

    fn side(game: &str, id: i64, venue: Venue) -> GameRecord {
        GameRecord {
            game_id: GameId(game.to_string()),
            team_id: Some(TeamId(id)),
            team: format!("T{}", id),
            opponent: String::new(),
            date: NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
            venue,
            won: None,
            stats: BoxScore::new(),
        }
    }

    fn matchup(game: &str, home: i64, away: i64, home_won: bool) -> MatchupRecord {
        MatchupRecord {
            game_id: GameId(game.to_string()),
            date: NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
            home: side(game, home, Venue::Home),
            away: side(game, away, Venue::Away),
            home_won,
        }
    }

    #[test]
    fn test_differences_are_first_minus_second() {
        let a = team(1, "Boston Celtics", 118.0, 12.0);
        let b = team(2, "New York Knicks", 112.5, 13.0);
        let v = matchup_features(&a, &b);
        assert_eq!(v.names().len(), MATCHUP_FEATURES.len());
        assert_eq!(v.get("PTS_diff"), Some(5.5));
        assert_eq!(v.get("TOV_diff"), Some(-1.0));
        assert_eq!(v.get("REB_diff"), Some(0.0));
    }

    #[test]
    fn test_table_joins_home_first_and_skips_unknown_teams() {
        let stats = vec![team(1, "A", 110.0, 12.0), team(2, "B", 100.0, 12.0)];
        let matchups = vec![
            matchup("g1", 1, 2, true),
            matchup("g2", 2, 1, false),
            matchup("g3", 1, 99, true),
        ];

        let table = matchup_table(&matchups, &stats).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0][0], 10.0);
        assert_eq!(table.rows[1][0], -10.0);
        assert_eq!(table.labels, vec![1, 0]);
    }

    #[test]
    fn test_no_joinable_matchups_is_insufficient() {
        let matchups = vec![matchup("g1", 7, 8, true)];
        assert!(matches!(
            matchup_table(&matchups, &[]),
            Err(HoopsError::InsufficientData { .. })
        ));
    }
}
