use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use uuid::Uuid;

use super::{GatewayError, RemoteGameGateway};
use crate::game::stat_ledger::apply_shot_delta;
use crate::models::common::{ApiError, Page, PageQuery};
use crate::models::game::{Game, GameUpdate};
use crate::models::lineup::{BatchLineupRequest, BatchLineupResponse, Lineup, LineupRequest, Position};
use crate::models::player::Player;
use crate::models::stats::{PlayerGameStat, ShotOutcome, ShotType, StatEventRequest, StatKind};

#[derive(Default)]
struct ServerState {
    games: HashMap<Uuid, Game>,
    rosters: HashMap<Uuid, Vec<Player>>,
    /// Append-only; the last lineup per (game, team) is current
    lineups: Vec<Lineup>,
    stats: HashMap<(Uuid, Uuid), PlayerGameStat>,
    stat_events: Vec<(Uuid, StatEventRequest)>,
    game_updates: Vec<(Uuid, GameUpdate)>,
    reject_next_lineup: Option<ApiError>,
    reject_next_stat_event: Option<ApiError>,
    reject_next_game_update: Option<ApiError>,
}

/// In-process stand-in for the game service.
///
/// Aggregates stat events into counters and recomputes points from made
/// shots on every write, like the real backend. Failures can be scripted
/// one call at a time, and stat events can be held to simulate a slow network.
#[derive(Clone)]
pub struct InMemoryGameGateway {
    state: Arc<Mutex<ServerState>>,
    stat_gate: Arc<watch::Sender<bool>>,
}

impl InMemoryGameGateway {
    pub fn new() -> Self {
        let (stat_gate, _) = watch::channel(false);
        Self {
            state: Arc::new(Mutex::new(ServerState::default())),
            stat_gate: Arc::new(stat_gate),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert_game(&self, game: Game) {
        self.lock().games.insert(game.id, game);
    }

    pub fn insert_roster(&self, team_id: Uuid, players: Vec<Player>) {
        self.lock().rosters.insert(team_id, players);
    }

    /// Store a stat row directly, as if another operator had recorded it
    pub fn seed_stat(&self, entry: PlayerGameStat) {
        self.lock().stats.insert((entry.game_id, entry.player_id), entry);
    }

    pub fn insert_lineup(&self, lineup: Lineup) {
        self.lock().lineups.push(lineup);
    }

    pub fn game(&self, game_id: Uuid) -> Option<Game> {
        self.lock().games.get(&game_id).cloned()
    }

    pub fn stat(&self, game_id: Uuid, player_id: Uuid) -> Option<PlayerGameStat> {
        self.lock().stats.get(&(game_id, player_id)).cloned()
    }

    pub fn lineups(&self, game_id: Uuid, team_id: Uuid) -> Vec<Lineup> {
        self.lock()
            .lineups
            .iter()
            .filter(|lineup| lineup.game_id == game_id && lineup.team_id == team_id)
            .cloned()
            .collect()
    }

    pub fn stat_events(&self) -> Vec<StatEventRequest> {
        self.lock().stat_events.iter().map(|(_, event)| event.clone()).collect()
    }

    pub fn game_updates(&self) -> Vec<GameUpdate> {
        self.lock().game_updates.iter().map(|(_, update)| update.clone()).collect()
    }

    pub fn reject_next_lineup(&self, error: ApiError) {
        self.lock().reject_next_lineup = Some(error);
    }

    pub fn reject_next_stat_event(&self, error: ApiError) {
        self.lock().reject_next_stat_event = Some(error);
    }

    pub fn reject_next_game_update(&self, error: ApiError) {
        self.lock().reject_next_game_update = Some(error);
    }

    /// Stat events wait until `release_stat_events` is called
    pub fn hold_stat_events(&self) {
        self.stat_gate.send_replace(true);
    }

    pub fn release_stat_events(&self) {
        self.stat_gate.send_replace(false);
    }

    fn validate_lineup(request: &LineupRequest) -> Result<(), ApiError> {
        let positions: HashSet<Position> = request.players.iter().map(|p| p.position).collect();
        let players: HashSet<Uuid> = request.players.iter().map(|p| p.player_id).collect();
        if request.players.len() != 5 || positions.len() != 5 || players.len() != 5 {
            return Err(ApiError::new(422, "A lineup needs five distinct players on five distinct positions"));
        }
        Ok(())
    }

    fn store_lineup(state: &mut ServerState, game_id: Uuid, request: &LineupRequest) -> Lineup {
        let lineup = Lineup {
            id: Uuid::new_v4(),
            game_id,
            team_id: request.team_id,
            period: request.period,
            players: request.players.clone(),
            created_at: Utc::now(),
        };
        state.lineups.push(lineup.clone());
        lineup
    }

    fn check_game(state: &ServerState, game_id: Uuid) -> Result<(), GatewayError> {
        if state.games.contains_key(&game_id) {
            Ok(())
        } else {
            Err(GatewayError::NotFound { path: format!("games/{}", game_id) })
        }
    }
}

impl Default for InMemoryGameGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteGameGateway for InMemoryGameGateway {
    async fn get_game(&self, game_id: Uuid) -> Result<Game, GatewayError> {
        self.lock()
            .games
            .get(&game_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound { path: format!("games/{}", game_id) })
    }

    async fn list_team_games(&self, team_id: Uuid, page: PageQuery) -> Result<Page<Game>, GatewayError> {
        let state = self.lock();
        let mut games: Vec<Game> = state
            .games
            .values()
            .filter(|game| game.home_team_id == team_id || game.away_team_id == team_id)
            .cloned()
            .collect();
        games.sort_by_key(|game| game.scheduled_at);

        let total = games.len() as u64;
        let items = games
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect();
        Ok(Page { items, total, offset: page.offset, limit: page.limit })
    }

    async fn update_game(&self, game_id: Uuid, update: &GameUpdate) -> Result<Game, GatewayError> {
        let mut state = self.lock();
        if let Some(error) = state.reject_next_game_update.take() {
            return Err(GatewayError::Rejected(error));
        }

        let game = state
            .games
            .get_mut(&game_id)
            .ok_or_else(|| GatewayError::NotFound { path: format!("games/{}", game_id) })?;

        if let Some(status) = update.status {
            if !game.status.can_transition_to(status) {
                return Err(GatewayError::Rejected(ApiError::new(
                    409,
                    format!("Cannot move game from {} to {}", game.status, status),
                )));
            }
            game.status = status;
        }
        if let Some(running) = update.clock_running {
            game.clock_running = running;
        }
        if let Some(seconds) = update.current_clock_s {
            game.current_clock_s = seconds;
        }
        if let Some(period) = update.current_period {
            game.current_period = period;
        }
        game.clock_updated_at = Some(Utc::now());

        let updated = game.clone();
        state.game_updates.push((game_id, update.clone()));
        Ok(updated)
    }

    async fn list_team_players(&self, team_id: Uuid) -> Result<Vec<Player>, GatewayError> {
        Ok(self.lock().rosters.get(&team_id).cloned().unwrap_or_default())
    }

    async fn create_lineups_batch(
        &self,
        game_id: Uuid,
        request: &BatchLineupRequest,
    ) -> Result<BatchLineupResponse, GatewayError> {
        let mut state = self.lock();
        Self::check_game(&state, game_id)?;
        if let Some(error) = state.reject_next_lineup.take() {
            return Err(GatewayError::Rejected(error));
        }
        for lineup in &request.lineups {
            Self::validate_lineup(lineup).map_err(GatewayError::Rejected)?;
        }

        let lineups = request
            .lineups
            .iter()
            .map(|lineup| Self::store_lineup(&mut state, game_id, lineup))
            .collect();
        Ok(BatchLineupResponse { lineups })
    }

    async fn create_lineup(&self, game_id: Uuid, request: &LineupRequest) -> Result<Lineup, GatewayError> {
        let mut state = self.lock();
        Self::check_game(&state, game_id)?;
        if let Some(error) = state.reject_next_lineup.take() {
            return Err(GatewayError::Rejected(error));
        }
        Self::validate_lineup(request).map_err(GatewayError::Rejected)?;
        Ok(Self::store_lineup(&mut state, game_id, request))
    }

    async fn current_lineup(&self, game_id: Uuid, team_id: Uuid) -> Result<Option<Lineup>, GatewayError> {
        Ok(self
            .lock()
            .lineups
            .iter()
            .rev()
            .find(|lineup| lineup.game_id == game_id && lineup.team_id == team_id)
            .cloned())
    }

    async fn list_stats(
        &self,
        game_id: Uuid,
        team_id: Uuid,
        page: PageQuery,
    ) -> Result<Page<PlayerGameStat>, GatewayError> {
        let state = self.lock();
        let mut entries: Vec<PlayerGameStat> = state
            .stats
            .values()
            .filter(|entry| entry.game_id == game_id && entry.team_id == team_id)
            .cloned()
            .collect();
        entries.sort_by_key(|entry| entry.player_id);

        let total = entries.len() as u64;
        let items = entries
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect();
        Ok(Page { items, total, offset: page.offset, limit: page.limit })
    }

    async fn record_stat_event(
        &self,
        game_id: Uuid,
        event: &StatEventRequest,
    ) -> Result<PlayerGameStat, GatewayError> {
        let mut gate = self.stat_gate.subscribe();
        // Sender lives as long as self, so this only returns once released
        let _ = gate.wait_for(|held| !*held).await;

        let mut state = self.lock();
        if let Some(error) = state.reject_next_stat_event.take() {
            return Err(GatewayError::Rejected(error));
        }
        let game = state
            .games
            .get(&game_id)
            .ok_or_else(|| GatewayError::NotFound { path: format!("games/{}", game_id) })?;
        if game.status.is_terminal() {
            return Err(GatewayError::Rejected(ApiError::new(409, format!("Game is {}", game.status))));
        }

        let sign = event.operation.sign();
        let entry = state
            .stats
            .entry((game_id, event.player_id))
            .or_insert_with(|| PlayerGameStat::zeroed(game_id, event.player_id, event.team_id));

        match event.stat {
            StatKind::MadePoint | StatKind::MissPoint => {
                let shot_type = ShotType::from_points(event.value).ok_or_else(|| {
                    GatewayError::Rejected(ApiError::new(422, format!("Invalid point value {}", event.value)))
                })?;
                let outcome = if event.stat == StatKind::MadePoint {
                    ShotOutcome::Made
                } else {
                    ShotOutcome::Missed
                };
                apply_shot_delta(entry, shot_type, outcome, sign);
            }
            StatKind::Assist => entry.assists = entry.assists.saturating_add_signed(sign),
            StatKind::Rebound => entry.rebounds = entry.rebounds.saturating_add_signed(sign),
            StatKind::Foul => entry.fouls = entry.fouls.saturating_add_signed(sign),
            StatKind::Steal => entry.steals = entry.steals.saturating_add_signed(sign),
            StatKind::Block => entry.blocks = entry.blocks.saturating_add_signed(sign),
        }
        entry.points = entry.derived_points();

        let updated = entry.clone();
        state.stat_events.push((game_id, event.clone()));
        Ok(updated)
    }
}
