//! Client for the stats.nba.com JSON endpoints
//!
//! Every endpoint answers with `resultSets`: named tables of `headers` and
//! `rowSet`. Rows are mapped by header name, case-insensitively.

use crate::data::{match_player, PlayerInfo};
use crate::{BoxScore, GameId, GameRecord, HoopsError, Result, Stat, TeamId, TeamStats, Venue};
use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

use super::StatsSource;

const DEFAULT_BASE_URL: &str = "https://stats.nba.com/stats";

/// Blocking client for the NBA stats API
pub struct NbaStatsClient {
    client: reqwest::blocking::Client,
    base_url: String,
    season_type: String,
}

impl NbaStatsClient {
    pub fn new(season_type: &str, timeout: Duration) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        // The API rejects requests that do not look like they come from nba.com
        headers.insert(
            reqwest::header::REFERER,
            reqwest::header::HeaderValue::from_static("https://www.nba.com/"),
        );
        headers.insert(
            reqwest::header::ORIGIN,
            reqwest::header::HeaderValue::from_static("https://www.nba.com"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json, text/plain, */*"),
        );

        let client = reqwest::blocking::Client::builder()
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) hoops/0.1")
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(NbaStatsClient {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            season_type: season_type.to_string(),
        })
    }

    fn get(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<StatsResponse> {
        let url = format!("{}/{}", self.base_url, endpoint);
        log::debug!("GET {} {:?}", url, query);

        let response = self.client.get(&url).query(query).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(HoopsError::Upstream {
                endpoint: endpoint.to_string(),
                message: format!("HTTP {}", status),
            });
        }
        Ok(response.json::<StatsResponse>()?)
    }
}

impl StatsSource for NbaStatsClient {
    fn find_player(&self, name: &str, season: &str) -> Result<PlayerInfo> {
        let response = self.get(
            "commonallplayers",
            &[
                ("LeagueID", "00"),
                ("Season", season),
                ("IsOnlyCurrentSeason", "0"),
            ],
        )?;
        let players = parse_players(&response)?;
        match_player(&players, name).ok_or_else(|| HoopsError::UnknownPlayer(name.to_string()))
    }

    fn player_games(&self, player_id: i64, season: &str) -> Result<Vec<GameRecord>> {
        let id = player_id.to_string();
        let response = self.get(
            "playergamelog",
            &[
                ("PlayerID", id.as_str()),
                ("Season", season),
                ("SeasonType", self.season_type.as_str()),
                ("LeagueID", "00"),
            ],
        )?;
        parse_game_log(&response, "playergamelog")
    }

    fn team_games(&self, season: &str) -> Result<Vec<GameRecord>> {
        let response = self.get(
            "leaguegamelog",
            &[
                ("Counter", "0"),
                ("Direction", "ASC"),
                ("LeagueID", "00"),
                ("PlayerOrTeam", "T"),
                ("Season", season),
                ("SeasonType", self.season_type.as_str()),
                ("Sorter", "DATE"),
            ],
        )?;
        parse_game_log(&response, "leaguegamelog")
    }

    fn team_stats(&self, season: &str) -> Result<Vec<TeamStats>> {
        let response = self.get(
            "leaguedashteamstats",
            &[
                ("Conference", ""),
                ("DateFrom", ""),
                ("DateTo", ""),
                ("Division", ""),
                ("GameScope", ""),
                ("GameSegment", ""),
                ("LastNGames", "0"),
                ("LeagueID", "00"),
                ("Location", ""),
                ("MeasureType", "Base"),
                ("Month", "0"),
                ("OpponentTeamID", "0"),
                ("Outcome", ""),
                ("PORound", "0"),
                ("PaceAdjust", "N"),
                ("PerMode", "PerGame"),
                ("Period", "0"),
                ("PlayerExperience", ""),
                ("PlayerPosition", ""),
                ("PlusMinus", "N"),
                ("Rank", "N"),
                ("Season", season),
                ("SeasonSegment", ""),
                ("SeasonType", self.season_type.as_str()),
                ("ShotClockRange", ""),
                ("StarterBench", ""),
                ("TeamID", "0"),
                ("TwoWay", "0"),
                ("VsConference", ""),
                ("VsDivision", ""),
            ],
        )?;
        parse_team_stats(&response)
    }
}

// ==================== Response Parsing ====================

#[derive(Debug, Deserialize)]
pub struct StatsResponse {
    #[serde(rename = "resultSets")]
    result_sets: Vec<ResultSet>,
}

#[derive(Debug, Deserialize)]
struct ResultSet {
    #[allow(dead_code)]
    name: String,
    headers: Vec<String>,
    #[serde(rename = "rowSet")]
    row_set: Vec<Vec<Value>>,
}

/// First result set of a response with a header lookup
struct StatsTable<'a> {
    endpoint: &'a str,
    columns: HashMap<String, usize>,
    rows: &'a [Vec<Value>],
}

impl<'a> StatsTable<'a> {
    fn first(response: &'a StatsResponse, endpoint: &'a str) -> Result<Self> {
        let set = response
            .result_sets
            .first()
            .ok_or_else(|| HoopsError::Upstream {
                endpoint: endpoint.to_string(),
                message: "response has no result sets".to_string(),
            })?;
        let columns = set
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.to_uppercase(), i))
            .collect();
        Ok(StatsTable {
            endpoint,
            columns,
            rows: &set.row_set,
        })
    }

    fn has(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    fn value<'r>(&self, row: &'r [Value], column: &str) -> Result<&'r Value> {
        let idx = *self.columns.get(column).ok_or_else(|| HoopsError::Upstream {
            endpoint: self.endpoint.to_string(),
            message: format!("missing column {}", column),
        })?;
        row.get(idx).ok_or_else(|| HoopsError::Upstream {
            endpoint: self.endpoint.to_string(),
            message: format!("short row, no value for {}", column),
        })
    }

    fn text(&self, row: &[Value], column: &str) -> Result<String> {
        match self.value(row, column)? {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(HoopsError::Parse(format!("{}: expected text, got {}", column, other))),
        }
    }

    /// Numeric value; null becomes NaN
    fn number(&self, row: &[Value], column: &str) -> Result<f64> {
        match self.value(row, column)? {
            Value::Number(n) => Ok(n.as_f64().unwrap_or(f64::NAN)),
            Value::Null => Ok(f64::NAN),
            Value::String(s) => parse_minutes(s)
                .or_else(|| s.parse::<f64>().ok())
                .ok_or_else(|| HoopsError::Parse(format!("{}: not a number: '{}'", column, s))),
            other => Err(HoopsError::Parse(format!("{}: expected number, got {}", column, other))),
        }
    }
}

/// "34:12" → 34.2 minutes
fn parse_minutes(s: &str) -> Option<f64> {
    let (m, sec) = s.split_once(':')?;
    let m: f64 = m.trim().parse().ok()?;
    let sec: f64 = sec.trim().parse().ok()?;
    Some(m + sec / 60.0)
}

/// Parse "2024-10-22" or "OCT 22, 2024"
pub fn parse_game_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%b %d, %Y") {
        return Some(date);
    }
    // Timestamps such as "2024-10-22T00:00:00"
    s.get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

fn matchup_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([A-Z0-9]{2,4})\s+(vs\.|@)\s+([A-Z0-9]{2,4})\s*$")
            .expect("matchup pattern is valid")
    })
}

/// Parse a MATCHUP cell: "LAL vs. BOS" is a home game, "LAL @ BOS" away
pub fn parse_matchup(s: &str) -> Option<(String, Venue, String)> {
    let caps = matchup_regex().captures(s)?;
    let venue = if &caps[2] == "@" {
        Venue::Away
    } else {
        Venue::Home
    };
    Some((caps[1].to_string(), venue, caps[3].to_string()))
}

fn parse_players(response: &StatsResponse) -> Result<Vec<PlayerInfo>> {
    let table = StatsTable::first(response, "commonallplayers")?;
    table
        .rows
        .iter()
        .map(|row| {
            Ok(PlayerInfo {
                id: table.number(row, "PERSON_ID")? as i64,
                full_name: table.text(row, "DISPLAY_FIRST_LAST")?,
            })
        })
        .collect()
}

/// Exact (case-insensitive) name first, otherwise the first partial match
fn parse_game_log(response: &StatsResponse, endpoint: &str) -> Result<Vec<GameRecord>> {
    let table = StatsTable::first(response, endpoint)?;
    let mut records = Vec::with_capacity(table.rows.len());

    for row in table.rows {
        let matchup = table.text(row, "MATCHUP")?;
        let (team, venue, opponent) = parse_matchup(&matchup)
            .ok_or_else(|| HoopsError::Parse(format!("unrecognised matchup '{}'", matchup)))?;

        let date_str = table.text(row, "GAME_DATE")?;
        let date = parse_game_date(&date_str)
            .ok_or_else(|| HoopsError::Parse(format!("unrecognised game date '{}'", date_str)))?;

        let won = if table.has("WL") {
            match table.value(row, "WL")? {
                Value::String(s) if s == "W" => Some(true),
                Value::String(s) if s == "L" => Some(false),
                _ => None,
            }
        } else {
            None
        };

        let team_id = if table.has("TEAM_ID") {
            Some(TeamId(table.number(row, "TEAM_ID")? as i64))
        } else {
            None
        };

        let mut stats = BoxScore::new();
        for stat in Stat::ALL {
            if table.has(stat.name()) {
                stats.set(stat, table.number(row, stat.name())?);
            }
        }

        records.push(GameRecord {
            game_id: GameId(table.text(row, "GAME_ID")?),
            team_id,
            team,
            opponent,
            date,
            venue,
            won,
            stats,
        });
    }

    Ok(records)
}

fn parse_team_stats(response: &StatsResponse) -> Result<Vec<TeamStats>> {
    let table = StatsTable::first(response, "leaguedashteamstats")?;
    table
        .rows
        .iter()
        .map(|row| {
            Ok(TeamStats {
                team_id: TeamId(table.number(row, "TEAM_ID")? as i64),
                team_name: table.text(row, "TEAM_NAME")?,
                games_played: table.number(row, "GP")? as u32,
                wins: table.number(row, "W")? as u32,
                losses: table.number(row, "L")? as u32,
                pts: table.number(row, "PTS")?,
                reb: table.number(row, "REB")?,
                ast: table.number(row, "AST")?,
                stl: table.number(row, "STL")?,
                blk: table.number(row, "BLK")?,
                tov: table.number(row, "TOV")?,
            })
        })
        .collect()
}
