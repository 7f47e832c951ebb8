//! Single-elimination bracket simulation

use serde::{Deserialize, Serialize};

use crate::{HoopsError, Result};

/// One decided game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketGame {
    pub team1: String,
    pub team2: String,
    pub winner: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketRound {
    pub name: String,
    pub games: Vec<BracketGame>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketResult {
    pub rounds: Vec<BracketRound>,
    pub champion: String,
}

/// Name of the round played between `entrants` teams
pub fn round_name(entrants: usize) -> String {
    match entrants {
        8 => "Quarterfinals".to_string(),
        4 => "Semifinals".to_string(),
        2 => "Final".to_string(),
        n => format!("Round of {}", n),
    }
}

/// Play out a bracket with the default round names
pub fn simulate_bracket<F>(first_round: &[(String, String)], pick_winner: F) -> Result<BracketResult>
where
    F: FnMut(&str, &str) -> Result<String>,
{
    simulate_bracket_with(first_round, pick_winner, round_name)
}

/// Play out a bracket: decide every pair in order, pair consecutive
/// winners, and repeat until one team remains.
///
/// The entrant count must be a power of two and at least 2, and every
/// winner must be one of the two teams it was asked about.
pub fn simulate_bracket_with<F, N>(
    first_round: &[(String, String)],
    mut pick_winner: F,
    name_round: N,
) -> Result<BracketResult>
where
    F: FnMut(&str, &str) -> Result<String>,
    N: Fn(usize) -> String,
{
    let entrants = first_round.len() * 2;
    if !entrants.is_power_of_two() || entrants < 2 {
        return Err(HoopsError::InvalidBracket(format!(
            "{} entrants; the count must be a power of two",
            entrants
        )));
    }

    let mut pairs = first_round.to_vec();
    let mut rounds = Vec::new();

    loop {
        let name = name_round(pairs.len() * 2);
        log::info!("--- {} ---", name);

        let mut games = Vec::with_capacity(pairs.len());
        for (team1, team2) in pairs {
            let winner = pick_winner(&team1, &team2)?;
            if winner != team1 && winner != team2 {
                return Err(HoopsError::InvalidBracket(format!(
                    "winner {} is not in {} vs {}",
                    winner, team1, team2
                )));
            }
            log::info!("{} vs. {} -> {} wins", team1, team2, winner);
            games.push(BracketGame {
                team1,
                team2,
                winner,
            });
        }

        let winners: Vec<String> = games.iter().map(|g| g.winner.clone()).collect();
        rounds.push(BracketRound { name, games });

        if winners.len() == 1 {
            let champion = winners[0].clone();
            return Ok(BracketResult { rounds, champion });
        }
        pairs = winners
            .chunks(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
        list.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect()
    }

    #[test]
    fn test_always_first_crowns_first_team() {
        let result = simulate_bracket(&pairs(&[("A", "B"), ("C", "D")]), |a, _| Ok(a.to_string())).unwrap();
        assert_eq!(result.champion, "A");
        assert_eq!(result.rounds.len(), 2);
        assert_eq!(result.rounds[0].name, "Semifinals");
        assert_eq!(result.rounds[1].name, "Final");
        assert_eq!(result.rounds[1].games[0].team1, "A");
        assert_eq!(result.rounds[1].games[0].team2, "C");
    }

    #[test]
    fn test_four_pairs_play_three_rounds_in_order() {
        let first = pairs(&[("A", "B"), ("C", "D"), ("E", "F"), ("G", "H")]);
        let result = simulate_bracket(&first, |_, b| Ok(b.to_string())).unwrap();
        let names: Vec<&str> = result.rounds.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Quarterfinals", "Semifinals", "Final"]);

        let semis: Vec<&str> = result.rounds[1].games.iter().map(|g| g.winner.as_str()).collect();
        assert_eq!(semis, vec!["D", "H"]);
        assert_eq!(result.champion, "H");
    }

    #[test]
    fn test_rejects_non_power_of_two() {
        let first = pairs(&[("A", "B"), ("C", "D"), ("E", "F")]);
        assert!(matches!(
            simulate_bracket(&first, |a, _| Ok(a.to_string())),
            Err(HoopsError::InvalidBracket(_))
        ));
        assert!(simulate_bracket(&[], |a, _| Ok(a.to_string())).is_err());
    }

    #[test]
    fn test_rejects_winner_outside_pair() {
        let first = pairs(&[("A", "B")]);
        assert!(matches!(
            simulate_bracket(&first, |_, _| Ok("Z".to_string())),
            Err(HoopsError::InvalidBracket(_))
        ));
    }

    #[test]
    fn test_round_names() {
        assert_eq!(round_name(16), "Round of 16");
        assert_eq!(round_name(8), "Quarterfinals");
        assert_eq!(round_name(2), "Final");
    }

    #[test]
    fn test_custom_round_names() {
        let result = simulate_bracket_with(&pairs(&[("A", "B")]), |a, _| Ok(a.to_string()), |n| format!("R{}", n)).unwrap();
        assert_eq!(result.rounds[0].name, "R2");
    }
}
