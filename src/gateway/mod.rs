//! Typed request/response boundary to the remote game service.
//!
//! `RemoteGameGateway` is the only seam between the session engine and the
//! network. `HttpGameGateway` speaks the REST contract, `InMemoryGameGateway`
//! emulates the server for tests and offline demos.

mod http;
mod memory;

pub use http::HttpGameGateway;
pub use memory::InMemoryGameGateway;

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;
use uuid::Uuid;

use crate::models::common::{ApiError, Page, PageQuery};
use crate::models::game::{Game, GameUpdate};
use crate::models::lineup::{BatchLineupRequest, BatchLineupResponse, Lineup, LineupRequest};
use crate::models::player::Player;
use crate::models::stats::{PlayerGameStat, StatEventRequest};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Not found: {path}")]
    NotFound { path: String },

    #[error("Request rejected: {0}")]
    Rejected(ApiError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl GatewayError {
    /// HTTP status of a server-side rejection, if there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::NotFound { .. } => Some(404),
            GatewayError::Rejected(api_error) => Some(api_error.status),
            GatewayError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            GatewayError::NotFound { .. } => true,
            GatewayError::Rejected(api_error) => api_error.is_not_found(),
            _ => false,
        }
    }
}

/// Supplies the bearer token attached to every request
pub trait TokenSource: Send + Sync {
    fn bearer_token(&self) -> Option<SecretString>;
}

/// A token fixed at startup, typically from configuration
pub struct StaticToken(Option<SecretString>);

impl StaticToken {
    pub fn new(token: Option<SecretString>) -> Self {
        Self(token)
    }
}

impl TokenSource for StaticToken {
    fn bearer_token(&self) -> Option<SecretString> {
        self.0.clone()
    }
}

#[async_trait]
pub trait RemoteGameGateway: Send + Sync {
    /// `GET /games/{id}`
    async fn get_game(&self, game_id: Uuid) -> Result<Game, GatewayError>;

    /// `GET /teams/{teamId}/games`
    async fn list_team_games(&self, team_id: Uuid, page: PageQuery) -> Result<Page<Game>, GatewayError>;

    /// `PUT /games/{id}` with the partial fields to change
    async fn update_game(&self, game_id: Uuid, update: &GameUpdate) -> Result<Game, GatewayError>;

    /// `GET /teams/{teamId}/players`
    async fn list_team_players(&self, team_id: Uuid) -> Result<Vec<Player>, GatewayError>;

    /// `POST /games/{gameId}/lineups/batch`
    async fn create_lineups_batch(
        &self,
        game_id: Uuid,
        request: &BatchLineupRequest,
    ) -> Result<BatchLineupResponse, GatewayError>;

    /// `POST /games/{gameId}/lineups`
    async fn create_lineup(&self, game_id: Uuid, request: &LineupRequest) -> Result<Lineup, GatewayError>;

    /// `GET /games/{gameId}/lineups/current?team_id=`. A 404 is `Ok(None)`.
    async fn current_lineup(&self, game_id: Uuid, team_id: Uuid) -> Result<Option<Lineup>, GatewayError>;

    /// `GET /games/{gameId}/stats?team_id=&offset=&limit=`
    async fn list_stats(
        &self,
        game_id: Uuid,
        team_id: Uuid,
        page: PageQuery,
    ) -> Result<Page<PlayerGameStat>, GatewayError>;

    /// `POST /games/{gameId}/stats`
    async fn record_stat_event(
        &self,
        game_id: Uuid,
        event: &StatEventRequest,
    ) -> Result<PlayerGameStat, GatewayError>;
}
