use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

/// Largest stat change a single tap may carry, in either direction
pub const MAX_STAT_DELTA: u32 = 10;

/// Cumulative per-player counters for one game, keyed by (game_id, player_id)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlayerGameStat {
    pub game_id: Uuid,
    pub player_id: Uuid,
    pub team_id: Uuid,
    #[serde(default)]
    pub points: u32,
    #[serde(default)]
    pub rebounds: u32,
    #[serde(default)]
    pub assists: u32,
    #[serde(default)]
    pub steals: u32,
    #[serde(default)]
    pub blocks: u32,
    #[serde(default)]
    pub fouls: u32,
    #[serde(default)]
    pub field_goals_made: u32,
    #[serde(default)]
    pub field_goals_attempted: u32,
    #[serde(default)]
    pub three_pointers_made: u32,
    #[serde(default)]
    pub three_pointers_attempted: u32,
    #[serde(default)]
    pub free_throws_made: u32,
    #[serde(default)]
    pub free_throws_attempted: u32,
}

impl PlayerGameStat {
    pub fn zeroed(game_id: Uuid, player_id: Uuid, team_id: Uuid) -> Self {
        Self {
            game_id,
            player_id,
            team_id,
            ..Default::default()
        }
    }

    /// Points as implied by the made-shot counters
    pub fn derived_points(&self) -> u32 {
        let two_point_makes = self.field_goals_made.saturating_sub(self.three_pointers_made);
        two_point_makes
            .saturating_mul(2)
            .saturating_add(self.three_pointers_made.saturating_mul(3))
            .saturating_add(self.free_throws_made)
    }

    /// made <= attempted for every pair, 3PT is a subset of FG, and points match the makes
    pub fn is_consistent(&self) -> bool {
        self.field_goals_made <= self.field_goals_attempted
            && self.three_pointers_made <= self.three_pointers_attempted
            && self.free_throws_made <= self.free_throws_attempted
            && self.three_pointers_made <= self.field_goals_made
            && self.three_pointers_attempted <= self.field_goals_attempted
            && self.points == self.derived_points()
    }

    pub fn counter(&self, stat: CounterStat) -> u32 {
        match stat {
            CounterStat::Rebounds => self.rebounds,
            CounterStat::Assists => self.assists,
            CounterStat::Fouls => self.fouls,
            CounterStat::Steals => self.steals,
            CounterStat::Blocks => self.blocks,
        }
    }

    pub fn counter_mut(&mut self, stat: CounterStat) -> &mut u32 {
        match stat {
            CounterStat::Rebounds => &mut self.rebounds,
            CounterStat::Assists => &mut self.assists,
            CounterStat::Fouls => &mut self.fouls,
            CounterStat::Steals => &mut self.steals,
            CounterStat::Blocks => &mut self.blocks,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShotType {
    #[serde(rename = "2PT")]
    TwoPoint,
    #[serde(rename = "3PT")]
    ThreePoint,
    #[serde(rename = "FT")]
    FreeThrow,
}

impl ShotType {
    pub fn points(&self) -> u32 {
        match self {
            ShotType::TwoPoint => 2,
            ShotType::ThreePoint => 3,
            ShotType::FreeThrow => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShotType::TwoPoint => "2PT",
            ShotType::ThreePoint => "3PT",
            ShotType::FreeThrow => "FT",
        }
    }

    pub fn from_points(points: u32) -> Option<Self> {
        match points {
            1 => Some(ShotType::FreeThrow),
            2 => Some(ShotType::TwoPoint),
            3 => Some(ShotType::ThreePoint),
            _ => None,
        }
    }
}

impl Display for ShotType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ShotType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "2PT" | "2" => Ok(ShotType::TwoPoint),
            "3PT" | "3" => Ok(ShotType::ThreePoint),
            "FT" | "1" => Ok(ShotType::FreeThrow),
            other => Err(format!("{} is not a shot type. Use 2PT, 3PT or FT.", other)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ShotOutcome {
    Made,
    Missed,
}

impl std::str::FromStr for ShotOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "made" | "make" => Ok(ShotOutcome::Made),
            "missed" | "miss" => Ok(ShotOutcome::Missed),
            other => Err(format!("{} is not a shot outcome. Use made or missed.", other)),
        }
    }
}

/// Plain counters that carry no cross-field coupling
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CounterStat {
    Rebounds,
    Assists,
    Fouls,
    Steals,
    Blocks,
}

impl CounterStat {
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterStat::Rebounds => "rebounds",
            CounterStat::Assists => "assists",
            CounterStat::Fouls => "fouls",
            CounterStat::Steals => "steals",
            CounterStat::Blocks => "blocks",
        }
    }
}

impl Display for CounterStat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CounterStat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().trim_end_matches('s') {
            "rebound" | "reb" => Ok(CounterStat::Rebounds),
            "assist" | "ast" => Ok(CounterStat::Assists),
            "foul" => Ok(CounterStat::Fouls),
            "steal" | "stl" => Ok(CounterStat::Steals),
            "block" | "blk" => Ok(CounterStat::Blocks),
            other => Err(format!("{} is not a counter stat", other)),
        }
    }
}

/// Semantic event names understood by `POST /games/{gameId}/stats`
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    MadePoint,
    MissPoint,
    Assist,
    Rebound,
    Foul,
    Steal,
    Block,
}

impl From<CounterStat> for StatKind {
    fn from(stat: CounterStat) -> Self {
        match stat {
            CounterStat::Rebounds => StatKind::Rebound,
            CounterStat::Assists => StatKind::Assist,
            CounterStat::Fouls => StatKind::Foul,
            CounterStat::Steals => StatKind::Steal,
            CounterStat::Blocks => StatKind::Block,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StatOperation {
    Increment,
    Decrement,
}

impl StatOperation {
    pub fn for_delta(delta: i32) -> Self {
        if delta < 0 {
            StatOperation::Decrement
        } else {
            StatOperation::Increment
        }
    }

    pub fn sign(&self) -> i32 {
        match self {
            StatOperation::Increment => 1,
            StatOperation::Decrement => -1,
        }
    }
}

/// One single-unit stat event. The server aggregates these into counters.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatEventRequest {
    pub player_id: Uuid,
    pub team_id: Uuid,
    pub stat: StatKind,
    pub value: u32,
    pub operation: StatOperation,
}

impl StatEventRequest {
    pub fn shot(player_id: Uuid, team_id: Uuid, shot_type: ShotType, outcome: ShotOutcome, operation: StatOperation) -> Self {
        let stat = match outcome {
            ShotOutcome::Made => StatKind::MadePoint,
            ShotOutcome::Missed => StatKind::MissPoint,
        };
        Self {
            player_id,
            team_id,
            stat,
            value: shot_type.points(),
            operation,
        }
    }

    pub fn counter(player_id: Uuid, team_id: Uuid, stat: CounterStat, operation: StatOperation) -> Self {
        Self {
            player_id,
            team_id,
            stat: stat.into(),
            value: 1,
            operation,
        }
    }
}
