//! Target expressions for over/under lines

use crate::{HoopsError, Result, Stat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single stat or a sum of distinct stats, e.g. `PTS` or `PTS+REB+AST`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatExpr {
    Single(Stat),
    Sum(Vec<Stat>),
}

impl StatExpr {
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = |reason: String| HoopsError::InvalidStatExpr {
            expr: text.to_string(),
            reason,
        };

        let mut stats = Vec::new();
        for part in text.split('+') {
            let part = part.trim();
            if part.is_empty() {
                return Err(invalid("empty term".to_string()));
            }
            let stat = Stat::from_name(part).ok_or_else(|| invalid(format!("unknown stat '{}'", part)))?;
            if stats.contains(&stat) {
                return Err(invalid(format!("{} appears more than once", stat)));
            }
            stats.push(stat);
        }

        Ok(match stats.len() {
            1 => StatExpr::Single(stats[0]),
            _ => StatExpr::Sum(stats),
        })
    }

    /// Stats referenced by the expression, in written order
    pub fn components(&self) -> &[Stat] {
        match self {
            StatExpr::Single(stat) => std::slice::from_ref(stat),
            StatExpr::Sum(stats) => stats,
        }
    }

    /// Evaluate against a value lookup; NaN propagates
    pub fn evaluate<F: Fn(Stat) -> f64>(&self, value_of: F) -> f64 {
        self.components().iter().map(|s| value_of(*s)).sum()
    }

    /// File-safe form, e.g. "PTS_REB_AST"
    pub fn key_fragment(&self) -> String {
        self.components()
            .iter()
            .map(|s| s.name())
            .collect::<Vec<_>>()
            .join("_")
    }
}

impl fmt::Display for StatExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.components().iter().map(|s| s.name()).collect();
        f.write_str(&names.join("+"))
    }
}

impl FromStr for StatExpr {
    type Err = HoopsError;

    fn from_str(s: &str) -> Result<Self> {
        StatExpr::parse(s)
    }
}
