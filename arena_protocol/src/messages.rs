//! Inbound/outbound wire schema (spec.md §6).
//!
//! Every message crossing the duplex channel is framed JSON of the shape
//! `{ "type": <tag>, "payload": <string or object> }`. Outbound payloads are
//! homogeneous enough to use serde's internally-tagged representation;
//! inbound payloads are not (`movement`/`rotate` carry a bare string, the
//! rest carry an object or nothing), so inbound parsing goes through a raw
//! envelope and a manual `TryFrom`.

use crate::error::Error;
use crate::ids::{CharacterId, Coord, Direction};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RawInboundEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "default_payload")]
    pub payload: Value,
}

fn default_payload() -> Value {
    Value::Null
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Movement(Direction),
    Rotate(Direction),
    ExecPower,
    SetColor(String),
    Pause,
    Resume,
    UpdateAll,
}

fn parse_direction(payload: &Value) -> Option<Direction> {
    match payload.as_str()? {
        "up" => Some(Direction::Up),
        "down" => Some(Direction::Down),
        "left" => Some(Direction::Left),
        "right" => Some(Direction::Right),
        _ => None,
    }
}

impl TryFrom<RawInboundEnvelope> for InboundMessage {
    type Error = Error;

    fn try_from(raw: RawInboundEnvelope) -> Result<Self, Error> {
        match raw.kind.as_str() {
            "movement" => parse_direction(&raw.payload)
                .map(InboundMessage::Movement)
                .ok_or(Error::InvalidMove),
            "rotate" => parse_direction(&raw.payload)
                .map(InboundMessage::Rotate)
                .ok_or(Error::InvalidRotation),
            "exec-power" => Ok(InboundMessage::ExecPower),
            "set-color" => raw
                .payload
                .as_str()
                .map(|s| InboundMessage::SetColor(s.to_owned()))
                .ok_or(Error::InvalidMessageType),
            "pause" => Ok(InboundMessage::Pause),
            "resume" => Ok(InboundMessage::Resume),
            "update-all" => Ok(InboundMessage::UpdateAll),
            _ => Err(Error::InvalidMessageType),
        }
    }
}

impl InboundMessage {
    pub fn from_json_str(raw: &str) -> Result<Self, Error> {
        let envelope: RawInboundEnvelope =
            serde_json::from_str(raw).map_err(|_| Error::InvalidMessageType)?;
        InboundMessage::try_from(envelope)
    }
}

// ---------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterState {
    Alive,
    Dead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnemyVisibleState {
    Walking,
    Rolling,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    Waiting,
    Playing,
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemDto {
    Fruit { fruit_type: String },
    SpecialFruit,
    Rock,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellDto {
    pub coordinate: Coord,
    pub frozen: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<ItemDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_id: Option<CharacterId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshotDto {
    pub id: CharacterId,
    pub color: String,
    pub coordinates: Coord,
    pub direction: Direction,
    pub state: CharacterState,
    pub status: PlayerStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemySnapshotDto {
    pub id: CharacterId,
    pub kind: String,
    pub coordinates: Coord,
    pub direction: Direction,
    pub enemy_state: EnemyVisibleState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateMovePayload {
    pub id: CharacterId,
    pub coordinates: Coord,
    pub direction: Direction,
    pub state: CharacterState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_item_consumed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_fruits: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateEnemyPayload {
    pub enemy_id: CharacterId,
    pub coordinates: Coord,
    pub direction: Direction,
    pub enemy_state: EnemyVisibleState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTimePayload {
    pub minutes_left: u32,
    pub seconds_left: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStatePayload {
    pub id: CharacterId,
    pub state: CharacterState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateFruitsPayload {
    pub current_round: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_fruit_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateFrozenCellsPayload {
    pub cells: Vec<CellDto>,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAllPayload {
    pub cells: Vec<CellDto>,
    pub players: Vec<PlayerSnapshotDto>,
    pub enemies: Vec<EnemySnapshotDto>,
    pub current_round: u32,
    pub fruits_number: u32,
    pub seconds_left: u32,
    pub paused: bool,
    pub level: u32,
    pub map: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PausedPayload {
    pub paused: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchResult {
    Win,
    Lose,
    #[serde(rename = "end game")]
    EndGame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndPayload {
    pub result: MatchResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutPayload {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSpecialFruitPayload {
    pub coordinates: Coord,
    pub consumed_by: CharacterId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerUpdatePayload {
    pub id: CharacterId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum OutboundMessage {
    #[serde(rename = "update-move")]
    UpdateMove(UpdateMovePayload),
    #[serde(rename = "update-enemy")]
    UpdateEnemy(UpdateEnemyPayload),
    #[serde(rename = "update-time")]
    UpdateTime(UpdateTimePayload),
    #[serde(rename = "update-state")]
    UpdateState(UpdateStatePayload),
    #[serde(rename = "update-fruits")]
    UpdateFruits(UpdateFruitsPayload),
    #[serde(rename = "update-frozen-cells")]
    UpdateFrozenCells(UpdateFrozenCellsPayload),
    #[serde(rename = "update-all")]
    UpdateAll(UpdateAllPayload),
    #[serde(rename = "paused")]
    Paused(PausedPayload),
    #[serde(rename = "end")]
    End(EndPayload),
    #[serde(rename = "error")]
    Error(ErrorPayload),
    #[serde(rename = "timeout")]
    Timeout(TimeoutPayload),
    #[serde(rename = "update-special-fruit")]
    UpdateSpecialFruit(UpdateSpecialFruitPayload),
    #[serde(rename = "player-update")]
    PlayerUpdate(PlayerUpdatePayload),
}

impl OutboundMessage {
    pub fn error(err: &Error) -> Self {
        OutboundMessage::Error(ErrorPayload {
            error: err.outbound_message().to_owned(),
        })
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).expect("OutboundMessage always serializes")
    }
}
