//! Data ingestion and storage
//!
//! Stats API sources, the SQLite game store, and the model artifact store.

pub mod artifacts;
pub mod database;
pub mod matchups;
pub mod sources;

pub use artifacts::{ArtifactKey, ArtifactStore, FileArtifactStore, MemoryArtifactStore};
pub use database::Database;
pub use matchups::pair_games;

use serde::{Deserialize, Serialize};

/// A player as listed by the stats API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: i64,
    pub full_name: String,
}

impl PlayerInfo {
    /// File-safe form of the name, e.g. "LeBron_James"
    pub fn slug(&self) -> String {
        slugify(&self.full_name)
    }
}

pub fn slugify(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Pick a player by name: an exact (case-insensitive, slug-tolerant) match
/// first, then the first listed player whose name contains `name`.
pub fn match_player(players: &[PlayerInfo], name: &str) -> Option<PlayerInfo> {
    let wanted = name.trim().replace('_', " ").to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    players
        .iter()
        .find(|p| p.full_name.to_lowercase() == wanted)
        .or_else(|| {
            players
                .iter()
                .find(|p| p.full_name.to_lowercase().contains(&wanted))
        })
        .cloned()
}
