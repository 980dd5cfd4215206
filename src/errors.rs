use thiserror::Error;
use uuid::Uuid;

use crate::gateway::GatewayError;
use crate::models::game::GameStatus;
use crate::models::lineup::Position;
use crate::models::stats::MAX_STAT_DELTA;

/// Problems detected on the client before anything reaches the network
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Team {0} is not part of this game")]
    UnknownTeam(Uuid),

    #[error("Lineup for team {team_id} is incomplete ({filled}/5 positions filled)")]
    IncompleteLineup { team_id: Uuid, filled: usize },

    #[error("Player {player_id} is not on the roster of team {team_id}")]
    NotOnRoster { team_id: Uuid, player_id: Uuid },

    #[error("Team {0} has no confirmed lineup yet")]
    NoConfirmedLineup(Uuid),

    #[error("Substitution list is empty")]
    EmptySubstitution,

    #[error("Position {0} appears more than once in the substitution")]
    DuplicatePosition(Position),

    #[error("Player {player_id} is not at {position}")]
    PlayerNotAtPosition { position: Position, player_id: Uuid },

    #[error("Player {0} is already on court")]
    PlayerAlreadyOnCourt(Uuid),

    #[error("A substitution for team {0} is still awaiting confirmation")]
    SubstitutionPending(Uuid),

    #[error("Stat entry is closed: {0}")]
    StatEntryClosed(&'static str),

    #[error("Period has expired, advance the period before starting the clock")]
    PeriodExpired,

    #[error("Game is {0}")]
    GameOver(GameStatus),

    #[error("Game has not started yet")]
    NotStarted,

    #[error("Stat change of {0} is out of range, use at most {max} at a time", max = MAX_STAT_DELTA)]
    DeltaOutOfRange(i32),
}

/// Error surfaced by `GameSession` operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Remote rejection: {0}")]
    Remote(#[from] GatewayError),
}

impl SessionError {
    pub fn is_remote(&self) -> bool {
        matches!(self, SessionError::Remote(_))
    }
}
