use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

pub const DEFAULT_PERIOD_LENGTH_S: u32 = 600;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Scheduled,
    Live,
    Paused,
    Final,
    Cancelled,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Scheduled => "scheduled",
            GameStatus::Live => "live",
            GameStatus::Paused => "paused",
            GameStatus::Final => "final",
            GameStatus::Cancelled => "cancelled",
        }
    }

    /// Final and cancelled games accept no further clock or stat changes
    pub fn is_terminal(&self) -> bool {
        matches!(self, GameStatus::Final | GameStatus::Cancelled)
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, GameStatus::Live | GameStatus::Paused)
    }

    /// Transitions only move forward, except the operator's pause/resume.
    /// Cancellation is reachable from every non-final state.
    pub fn can_transition_to(&self, next: GameStatus) -> bool {
        use GameStatus::*;
        match (self, next) {
            (a, b) if *a == b => true,
            (Scheduled, Live) | (Scheduled, Paused) => true,
            (Live, Paused) | (Paused, Live) => true,
            (Live, Final) | (Paused, Final) => true,
            (Scheduled, Cancelled) | (Live, Cancelled) | (Paused, Cancelled) => true,
            _ => false,
        }
    }
}

impl Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which side of the game a team plays on
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TeamSide {
    Home,
    Away,
}

impl TeamSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamSide::Home => "home",
            TeamSide::Away => "away",
        }
    }
}

impl std::str::FromStr for TeamSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "home" | "h" => Ok(TeamSide::Home),
            "away" | "a" => Ok(TeamSide::Away),
            other => Err(format!("{} is not a team side. Use `home` or `away`.", other)),
        }
    }
}

/// Game record as served by `GET /games/{id}`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: Uuid,
    pub home_team_id: Uuid,
    pub away_team_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub status: GameStatus,
    pub current_period: u32,
    pub current_clock_s: u32,
    pub clock_running: bool,
    #[serde(default)]
    pub period_length_s: Option<u32>,
    /// When the server last recorded `current_clock_s`
    #[serde(default)]
    pub clock_updated_at: Option<DateTime<Utc>>,
}

impl Game {
    pub fn team_id(&self, side: TeamSide) -> Uuid {
        match side {
            TeamSide::Home => self.home_team_id,
            TeamSide::Away => self.away_team_id,
        }
    }

    pub fn side_of(&self, team_id: Uuid) -> Option<TeamSide> {
        if team_id == self.home_team_id {
            Some(TeamSide::Home)
        } else if team_id == self.away_team_id {
            Some(TeamSide::Away)
        } else {
            None
        }
    }
}

/// Partial body for `PUT /games/{id}`
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clock_running: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_clock_s: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_period: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<GameStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions_are_monotonic() {
        assert!(GameStatus::Scheduled.can_transition_to(GameStatus::Live));
        assert!(GameStatus::Live.can_transition_to(GameStatus::Paused));
        assert!(GameStatus::Paused.can_transition_to(GameStatus::Live));
        assert!(GameStatus::Live.can_transition_to(GameStatus::Final));
        assert!(!GameStatus::Final.can_transition_to(GameStatus::Live));
        assert!(!GameStatus::Live.can_transition_to(GameStatus::Scheduled));
        assert!(!GameStatus::Final.can_transition_to(GameStatus::Cancelled));
        assert!(GameStatus::Paused.can_transition_to(GameStatus::Cancelled));
    }

    #[test]
    fn test_game_update_omits_unset_fields() {
        let update = GameUpdate {
            clock_running: Some(true),
            current_clock_s: Some(431),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({ "clockRunning": true, "currentClockS": 431 }));
    }

    #[test]
    fn test_game_deserializes_without_optional_clock_fields() {
        let json = serde_json::json!({
            "id": Uuid::new_v4(),
            "homeTeamId": Uuid::new_v4(),
            "awayTeamId": Uuid::new_v4(),
            "scheduledAt": "2026-10-18T19:30:00Z",
            "status": "scheduled",
            "currentPeriod": 1,
            "currentClockS": 600,
            "clockRunning": false
        });
        let game: Game = serde_json::from_value(json).unwrap();
        assert_eq!(game.status, GameStatus::Scheduled);
        assert_eq!(game.period_length_s, None);
        assert_eq!(game.clock_updated_at, None);
    }
}
