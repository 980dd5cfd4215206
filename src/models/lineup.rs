use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use uuid::Uuid;

/// On-court position. Each confirmed lineup fills all five exactly once.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Position {
    PG,
    SG,
    SF,
    PF,
    C,
}

impl Position {
    pub const ALL: [Position; 5] = [Position::PG, Position::SG, Position::SF, Position::PF, Position::C];

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::PG => "PG",
            Position::SG => "SG",
            Position::SF => "SF",
            Position::PF => "PF",
            Position::C => "C",
        }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Position {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PG" => Ok(Position::PG),
            "SG" => Ok(Position::SG),
            "SF" => Ok(Position::SF),
            "PF" => Ok(Position::PF),
            "C" => Ok(Position::C),
            other => Err(format!("{} is not a position. Use PG, SG, SF, PF or C.", other)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LineupPlayer {
    pub player_id: Uuid,
    pub position: Position,
}

impl LineupPlayer {
    pub fn new(position: Position, player_id: Uuid) -> Self {
        Self { player_id, position }
    }
}

/// One immutable version of a team's on-court composition.
/// Substitutions create a new record rather than editing this one.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lineup {
    pub id: Uuid,
    pub game_id: Uuid,
    pub team_id: Uuid,
    pub period: u32,
    pub players: Vec<LineupPlayer>,
    pub created_at: DateTime<Utc>,
}

impl Lineup {
    pub fn assignments(&self) -> BTreeMap<Position, Uuid> {
        self.players.iter().map(|p| (p.position, p.player_id)).collect()
    }

    pub fn player_at(&self, position: Position) -> Option<Uuid> {
        self.players.iter().find(|p| p.position == position).map(|p| p.player_id)
    }

    pub fn contains_player(&self, player_id: Uuid) -> bool {
        self.players.iter().any(|p| p.player_id == player_id)
    }
}

/// Body of `POST /games/{gameId}/lineups`, and one entry of the batch body
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineupRequest {
    pub team_id: Uuid,
    pub period: u32,
    pub players: Vec<LineupPlayer>,
}

impl LineupRequest {
    pub fn from_assignments(team_id: Uuid, period: u32, assignments: &BTreeMap<Position, Uuid>) -> Self {
        Self {
            team_id,
            period,
            players: assignments
                .iter()
                .map(|(position, player_id)| LineupPlayer::new(*position, *player_id))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BatchLineupRequest {
    pub lineups: Vec<LineupRequest>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BatchLineupResponse {
    pub lineups: Vec<Lineup>,
}

/// A single position change requested by the operator
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Substitution {
    pub position: Position,
    pub player_out: Uuid,
    pub player_in: Uuid,
}

impl Substitution {
    pub fn new(position: Position, player_out: Uuid, player_in: Uuid) -> Self {
        Self { position, player_out, player_in }
    }
}
