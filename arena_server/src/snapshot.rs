//! `MatchStorage` / snapshot round-trip (spec.md §4.5, invariant 7).
//!
//! A plain serializable value capturing enough of a `Board` and `Match` to
//! restore them after a process restart. Kept as data-only types here;
//! `Board::capture`/`Board::restore` (in `board::mod`) and
//! `Match::get_match_storage`/`Match::load_board` (in `match_engine`) do
//! the actual conversion.

use crate::character::EnemyKind;
use arena_protocol::ids::{CharacterId, Coord, Direction};
use arena_protocol::messages::PlayerStatus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemSnapshot {
    Fruit(String),
    SpecialFruit,
    Rock,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub coord: Coord,
    pub frozen: bool,
    pub item: Option<ItemSnapshot>,
    pub character_id: Option<CharacterId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: CharacterId,
    pub color: String,
    pub name: String,
    pub coord: Coord,
    pub direction: Direction,
    pub alive: bool,
    pub status: PlayerStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemySnapshot {
    pub id: CharacterId,
    pub kind: EnemyKind,
    pub coord: Coord,
    pub direction: Direction,
    pub alive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    /// Only cells carrying a non-default field (item, occupant, or frozen).
    pub cells: Vec<CellSnapshot>,
    /// The level's configured fruit-spawn coordinates — not derivable from
    /// `cells` alone, since a spawn currently occupied by a player holds no
    /// fruit item and so would otherwise be indistinguishable from a
    /// never-a-fruit-spawn cell.
    pub fruit_spawns: Vec<Coord>,
    pub fruit_queue: Vec<String>,
    pub fruits_number: u32,
    pub current_round: u32,
    pub players: [PlayerSnapshot; 2],
    pub enemies: Vec<EnemySnapshot>,
    pub level: u32,
    pub map: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStorage {
    pub board: BoardSnapshot,
    pub seconds_left: u64,
    pub paused: bool,
}

impl Serialize for EnemyKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EnemyKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "troll" => Ok(EnemyKind::Troll),
            "cow" => Ok(EnemyKind::Cow),
            "log-man" => Ok(EnemyKind::LogMan),
            "squid-green" => Ok(EnemyKind::SquidGreen),
            "squid-blue" => Ok(EnemyKind::SquidBlue),
            other => Err(serde::de::Error::custom(format!("unknown enemy kind {other}"))),
        }
    }
}
