//! SQLite storage for game logs and season team stats

use crate::data::{match_player, PlayerInfo};
use crate::{BoxScore, GameId, GameRecord, HoopsError, Result, Stat, TeamId, TeamStats, Venue};
use chrono::NaiveDate;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::Path;

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        let stat_columns: String = Stat::ALL
            .iter()
            .map(|s| format!("{} REAL", s.column()))
            .collect::<Vec<_>>()
            .join(",\n                ");

        self.conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS players (
                id INTEGER PRIMARY KEY,
                full_name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS player_games (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                player_id INTEGER NOT NULL REFERENCES players(id),
                game_id TEXT NOT NULL,
                team_id INTEGER,
                team TEXT NOT NULL,
                opponent TEXT NOT NULL,
                date TEXT NOT NULL,
                venue TEXT NOT NULL,
                won INTEGER,
                {stat_columns},
                UNIQUE(player_id, game_id)
            );

            CREATE TABLE IF NOT EXISTS team_games (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                game_id TEXT NOT NULL,
                team_id INTEGER,
                team TEXT NOT NULL,
                opponent TEXT NOT NULL,
                date TEXT NOT NULL,
                venue TEXT NOT NULL,
                won INTEGER,
                {stat_columns},
                UNIQUE(game_id, team)
            );

            CREATE TABLE IF NOT EXISTS team_stats (
                season TEXT NOT NULL,
                team_id INTEGER NOT NULL,
                team_name TEXT NOT NULL,
                games_played INTEGER NOT NULL,
                wins INTEGER NOT NULL,
                losses INTEGER NOT NULL,
                pts REAL NOT NULL,
                reb REAL NOT NULL,
                ast REAL NOT NULL,
                stl REAL NOT NULL,
                blk REAL NOT NULL,
                tov REAL NOT NULL,
                PRIMARY KEY(season, team_id)
            );

            CREATE INDEX IF NOT EXISTS idx_player_games_date ON player_games(player_id, date);
            CREATE INDEX IF NOT EXISTS idx_team_games_game ON team_games(game_id);
            "#
        ))?;
        Ok(())
    }

    // ==================== Player Operations ====================

    /// Insert or rename a player
    pub fn upsert_player(&self, player: &PlayerInfo) -> Result<()> {
        self.conn.execute(
            "INSERT INTO players (id, full_name) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET full_name = excluded.full_name",
            params![player.id, player.full_name],
        )?;
        Ok(())
    }

    /// Find a stored player by full name or slug, case-insensitive, falling
    /// back to a partial name match
    pub fn find_player(&self, name: &str) -> Result<Option<PlayerInfo>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, full_name FROM players ORDER BY full_name, id")?;
        let players = stmt
            .query_map([], |row| {
                Ok(PlayerInfo {
                    id: row.get(0)?,
                    full_name: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(match_player(&players, name))
    }

    /// Replace a player's game log. Insertion order is kept as fetch order.
    pub fn replace_player_games(&self, player_id: i64, records: &[GameRecord]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM player_games WHERE player_id = ?1",
            params![player_id],
        )?;
        {
            let mut stmt = tx.prepare(&insert_sql("player_games", true))?;
            for record in records {
                let mut values = vec![rusqlite::types::Value::Integer(player_id)];
                values.extend(record_values(record));
                stmt.execute(params_from_iter(values))?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    /// Full game log for a player, chronological with ties in fetch order
    pub fn get_player_games(&self, player_id: i64) -> Result<Vec<GameRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM player_games WHERE player_id = ?1 ORDER BY date, id",
            record_columns()
        ))?;
        let records = stmt
            .query_map(params![player_id], row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Most recent games for a player (up to limit), returned chronologically
    pub fn get_recent_player_games(&self, player_id: i64, limit: usize) -> Result<Vec<GameRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM player_games WHERE player_id = ?1 ORDER BY date DESC, id DESC LIMIT ?2",
            record_columns()
        ))?;
        let mut records = stmt
            .query_map(params![player_id, limit as i64], row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        records.reverse();
        Ok(records)
    }

    pub fn player_game_count(&self, player_id: i64) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM player_games WHERE player_id = ?1",
            params![player_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    // ==================== Team Operations ====================

    /// Replace the league team game log
    pub fn replace_team_games(&self, records: &[GameRecord]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM team_games", [])?;
        {
            let mut stmt = tx.prepare(&insert_sql("team_games", false))?;
            for record in records {
                stmt.execute(params_from_iter(record_values(record)))?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    pub fn get_team_games(&self) -> Result<Vec<GameRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM team_games ORDER BY date, id",
            record_columns()
        ))?;
        let records = stmt
            .query_map([], row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Replace the season aggregates for one season
    pub fn replace_team_stats(&self, season: &str, stats: &[TeamStats]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM team_stats WHERE season = ?1", params![season])?;
        for s in stats {
            tx.execute(
                "INSERT INTO team_stats (season, team_id, team_name, games_played, wins, losses,
                                         pts, reb, ast, stl, blk, tov)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    season,
                    s.team_id.0,
                    s.team_name,
                    s.games_played,
                    s.wins,
                    s.losses,
                    s.pts,
                    s.reb,
                    s.ast,
                    s.stl,
                    s.blk,
                    s.tov
                ],
            )?;
        }
        tx.commit()?;
        Ok(stats.len())
    }

    pub fn get_team_stats(&self, season: &str) -> Result<Vec<TeamStats>> {
        let mut stmt = self.conn.prepare(
            "SELECT team_id, team_name, games_played, wins, losses, pts, reb, ast, stl, blk, tov
             FROM team_stats WHERE season = ?1 ORDER BY team_name",
        )?;
        let stats = stmt
            .query_map(params![season], |row| {
                Ok(TeamStats {
                    team_id: TeamId(row.get(0)?),
                    team_name: row.get(1)?,
                    games_played: row.get(2)?,
                    wins: row.get(3)?,
                    losses: row.get(4)?,
                    pts: row.get(5)?,
                    reb: row.get(6)?,
                    ast: row.get(7)?,
                    stl: row.get(8)?,
                    blk: row.get(9)?,
                    tov: row.get(10)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(stats)
    }

    /// Find one team's season stats by name, case-insensitive
    pub fn find_team_stats(&self, season: &str, team_name: &str) -> Result<TeamStats> {
        let wanted = team_name.trim().to_lowercase();
        self.get_team_stats(season)?
            .into_iter()
            .find(|s| s.team_name.to_lowercase() == wanted)
            .ok_or_else(|| HoopsError::UnknownTeam(format!("{} (season {})", team_name, season)))
    }

    // ==================== Statistics ====================

    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let count = |sql: &str| -> Result<usize> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as usize)
        };

        let max_date: Option<String> = self
            .conn
            .query_row("SELECT MAX(date) FROM team_games", [], |row| row.get(0))
            .optional()?
            .flatten();

        Ok(DatabaseStats {
            player_count: count("SELECT COUNT(*) FROM players")?,
            player_game_count: count("SELECT COUNT(*) FROM player_games")?,
            team_game_count: count("SELECT COUNT(*) FROM team_games")?,
            team_stats_count: count("SELECT COUNT(*) FROM team_stats")?,
            latest_team_game: max_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        })
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub player_count: usize,
    pub player_game_count: usize,
    pub team_game_count: usize,
    pub team_stats_count: usize,
    pub latest_team_game: Option<NaiveDate>,
}

fn record_columns() -> String {
    let mut columns = vec![
        "game_id", "team_id", "team", "opponent", "date", "venue", "won",
    ]
    .into_iter()
    .map(String::from)
    .collect::<Vec<_>>();
    columns.extend(Stat::ALL.iter().map(|s| s.column()));
    columns.join(", ")
}

fn insert_sql(table: &str, with_player: bool) -> String {
    let base_count = 7 + Stat::COUNT;
    let (prefix, count) = if with_player {
        ("player_id, ", base_count + 1)
    } else {
        ("", base_count)
    };
    let placeholders = (1..=count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}{}) VALUES ({})",
        table,
        prefix,
        record_columns(),
        placeholders
    )
}

fn record_values(record: &GameRecord) -> Vec<rusqlite::types::Value> {
    use rusqlite::types::Value;

    let mut values = vec![
        Value::Text(record.game_id.0.clone()),
        record.team_id.map_or(Value::Null, |id| Value::Integer(id.0)),
        Value::Text(record.team.clone()),
        Value::Text(record.opponent.clone()),
        Value::Text(record.date.format("%Y-%m-%d").to_string()),
        Value::Text(record.venue.code().to_string()),
        record.won.map_or(Value::Null, |w| Value::Integer(w as i64)),
    ];
    // NaN is stored as NULL
    values.extend(Stat::ALL.iter().map(|s| {
        let v = record.stat(*s);
        if v.is_finite() {
            Value::Real(v)
        } else {
            Value::Null
        }
    }));
    values
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<GameRecord> {
    let date_str: String = row.get(4)?;
    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let venue_str: String = row.get(5)?;
    let venue = Venue::from_code(&venue_str).unwrap_or(Venue::Away);

    let mut stats = BoxScore::new();
    for (i, stat) in Stat::ALL.iter().enumerate() {
        let value: Option<f64> = row.get(7 + i)?;
        stats.set(*stat, value.unwrap_or(f64::NAN));
    }

    Ok(GameRecord {
        game_id: GameId(row.get(0)?),
        team_id: row.get::<_, Option<i64>>(1)?.map(TeamId),
        team: row.get(2)?,
        opponent: row.get(3)?,
        date,
        venue,
        won: row.get(6)?,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_game(game_id: &str, day: u32, pts: f64) -> GameRecord {
        GameRecord {
            game_id: GameId(game_id.to_string()),
            team_id: None,
            team: "LAL".to_string(),
            opponent: "BOS".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 11, day).unwrap(),
            venue: Venue::Home,
            won: Some(true),
            stats: BoxScore::new().with(Stat::Pts, pts).with(Stat::Reb, 7.0),
        }
    }

    fn lebron() -> PlayerInfo {
        PlayerInfo {
            id: 2544,
            full_name: "LeBron James".to_string(),
        }
    }

    #[test]
    fn test_create_database() {
        let db = Database::in_memory().unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.player_count, 0);
        assert_eq!(stats.team_game_count, 0);
    }

    #[test]
    fn test_find_player_by_slug() {
        let db = Database::in_memory().unwrap();
        db.upsert_player(&lebron()).unwrap();
        let found = db.find_player("lebron_james").unwrap().unwrap();
        assert_eq!(found.id, 2544);
        assert!(db.find_player("Stephen Curry").unwrap().is_none());
    }

    #[test]
    fn test_find_player_by_partial_name() {
        let db = Database::in_memory().unwrap();
        db.upsert_player(&PlayerInfo {
            id: 1628384,
            full_name: "Julius Randle".to_string(),
        })
        .unwrap();
        db.upsert_player(&lebron()).unwrap();

        assert_eq!(db.find_player("randle").unwrap().unwrap().id, 1628384);
        assert_eq!(db.find_player("LEBRON").unwrap().unwrap().id, 2544);
        assert!(db.find_player("").unwrap().is_none());
        assert!(db.find_player("curry").unwrap().is_none());
    }

    #[test]
    fn test_player_games_ordered_by_date_then_fetch_order() {
        let db = Database::in_memory().unwrap();
        db.upsert_player(&lebron()).unwrap();
        let games = vec![
            make_game("3", 5, 30.0),
            make_game("1", 2, 20.0),
            make_game("2", 5, 25.0),
        ];
        db.replace_player_games(2544, &games).unwrap();

        let loaded = db.get_player_games(2544).unwrap();
        let ids: Vec<_> = loaded.iter().map(|g| g.game_id.0.as_str()).collect();
        assert_eq!(ids, vec!["1", "3", "2"]);
        assert!(loaded[0].stat(Stat::Ast).is_nan());
        assert_eq!(loaded[0].stat(Stat::Pts), 20.0);

        let recent = db.get_recent_player_games(2544, 2).unwrap();
        let ids: Vec<_> = recent.iter().map(|g| g.game_id.0.as_str()).collect();
        assert_eq!(ids, vec!["3", "2"]);
    }

    #[test]
    fn test_replace_player_games_clears_previous_log() {
        let db = Database::in_memory().unwrap();
        db.upsert_player(&lebron()).unwrap();
        db.replace_player_games(2544, &[make_game("1", 1, 10.0), make_game("2", 2, 12.0)])
            .unwrap();
        db.replace_player_games(2544, &[make_game("9", 3, 40.0)]).unwrap();
        assert_eq!(db.player_game_count(2544).unwrap(), 1);
    }

    #[test]
    fn test_team_stats_lookup() {
        let db = Database::in_memory().unwrap();
        let celtics = TeamStats {
            team_id: TeamId(1610612738),
            team_name: "Boston Celtics".to_string(),
            games_played: 82,
            wins: 61,
            losses: 21,
            pts: 116.3,
            reb: 45.6,
            ast: 26.9,
            stl: 7.1,
            blk: 5.0,
            tov: 11.7,
        };
        db.replace_team_stats("2024-25", &[celtics.clone()]).unwrap();

        assert_eq!(db.find_team_stats("2024-25", "boston celtics").unwrap(), celtics);
        assert!(matches!(
            db.find_team_stats("2023-24", "Boston Celtics"),
            Err(HoopsError::UnknownTeam(_))
        ));
    }
}
