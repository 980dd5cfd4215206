use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use url::Url;
use uuid::Uuid;

use super::{GatewayError, RemoteGameGateway, StaticToken, TokenSource};
use crate::config::api::ApiSettings;
use crate::models::common::{ApiError, Page, PageQuery};
use crate::models::game::{Game, GameUpdate};
use crate::models::lineup::{BatchLineupRequest, BatchLineupResponse, Lineup, LineupRequest};
use crate::models::player::Player;
use crate::models::stats::{PlayerGameStat, StatEventRequest};

/// REST client for the game service
pub struct HttpGameGateway {
    base_url: Url,
    client: Client,
    tokens: Arc<dyn TokenSource>,
}

impl HttpGameGateway {
    pub fn new(settings: &ApiSettings) -> Result<Self, GatewayError> {
        Self::with_token_source(settings, Arc::new(StaticToken::new(settings.token.clone())))
    }

    pub fn with_token_source(settings: &ApiSettings, tokens: Arc<dyn TokenSource>) -> Result<Self, GatewayError> {
        // Url::join drops the last path segment unless the base ends with a slash
        let mut base = settings.base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base)?;

        let client = Client::builder()
            .timeout(settings.timeout())
            .build()?;

        Ok(Self {
            base_url,
            client,
            tokens,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match self.tokens.bearer_token() {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder, path: &str) -> Result<T, GatewayError> {
        tracing::debug!("Calling game service: {}", path);

        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound { path: path.to_string() });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let api_error = normalize_error(status, &body);
            tracing::error!("❌ Game service returned error for {}: {}", path, api_error);
            return Err(GatewayError::Rejected(api_error));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Every error body is folded into `{status, message, data?}`, whatever the server sent
fn normalize_error(status: StatusCode, body: &str) -> ApiError {
    if let Ok(api_error) = serde_json::from_str::<ApiError>(body) {
        return api_error;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let message = value
            .get("message")
            .or_else(|| value.get("error"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| default_message(status));
        return ApiError::new(status.as_u16(), message).with_data(value);
    }

    let message = if body.trim().is_empty() {
        default_message(status)
    } else {
        body.trim().to_string()
    };
    ApiError::new(status.as_u16(), message)
}

fn default_message(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("Unknown error")
        .to_string()
}

#[async_trait]
impl RemoteGameGateway for HttpGameGateway {
    async fn get_game(&self, game_id: Uuid) -> Result<Game, GatewayError> {
        let path = format!("games/{}", game_id);
        let url = self.endpoint(&path)?;
        self.send(self.request(Method::GET, url), &path).await
    }

    async fn list_team_games(&self, team_id: Uuid, page: PageQuery) -> Result<Page<Game>, GatewayError> {
        let path = format!("teams/{}/games", team_id);
        let url = self.endpoint(&path)?;
        let builder = self.request(Method::GET, url).query(&page);
        self.send(builder, &path).await
    }

    async fn update_game(&self, game_id: Uuid, update: &GameUpdate) -> Result<Game, GatewayError> {
        let path = format!("games/{}", game_id);
        let url = self.endpoint(&path)?;
        let builder = self.request(Method::PUT, url).json(update);
        self.send(builder, &path).await
    }

    async fn list_team_players(&self, team_id: Uuid) -> Result<Vec<Player>, GatewayError> {
        let path = format!("teams/{}/players", team_id);
        let url = self.endpoint(&path)?;
        self.send(self.request(Method::GET, url), &path).await
    }

    async fn create_lineups_batch(
        &self,
        game_id: Uuid,
        request: &BatchLineupRequest,
    ) -> Result<BatchLineupResponse, GatewayError> {
        let path = format!("games/{}/lineups/batch", game_id);
        let url = self.endpoint(&path)?;
        let builder = self.request(Method::POST, url).json(request);
        self.send(builder, &path).await
    }

    async fn create_lineup(&self, game_id: Uuid, request: &LineupRequest) -> Result<Lineup, GatewayError> {
        let path = format!("games/{}/lineups", game_id);
        let url = self.endpoint(&path)?;
        let builder = self.request(Method::POST, url).json(request);
        self.send(builder, &path).await
    }

    async fn current_lineup(&self, game_id: Uuid, team_id: Uuid) -> Result<Option<Lineup>, GatewayError> {
        let path = format!("games/{}/lineups/current", game_id);
        let url = self.endpoint(&path)?;
        let builder = self
            .request(Method::GET, url)
            .query(&[("team_id", team_id.to_string())]);

        match self.send::<Lineup>(builder, &path).await {
            Ok(lineup) => Ok(Some(lineup)),
            Err(e) if e.is_not_found() => {
                tracing::debug!("No current lineup for team {} in game {}", team_id, game_id);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn list_stats(
        &self,
        game_id: Uuid,
        team_id: Uuid,
        page: PageQuery,
    ) -> Result<Page<PlayerGameStat>, GatewayError> {
        let path = format!("games/{}/stats", game_id);
        let url = self.endpoint(&path)?;
        let builder = self.request(Method::GET, url).query(&[
            ("team_id", team_id.to_string()),
            ("offset", page.offset.to_string()),
            ("limit", page.limit.to_string()),
        ]);
        self.send(builder, &path).await
    }

    async fn record_stat_event(
        &self,
        game_id: Uuid,
        event: &StatEventRequest,
    ) -> Result<PlayerGameStat, GatewayError> {
        let path = format!("games/{}/stats", game_id);
        let url = self.endpoint(&path)?;
        let builder = self.request(Method::POST, url).json(event);
        self.send(builder, &path).await
    }
}
