//! Live game session: gates and sequences the clock, the lineups and the
//! stat ledger against the remote game service.
//!
//! Stat taps are applied to the local ledger first and mirrored to the server
//! as fire-and-forget semantic events. Lineup changes go the other way and are
//! only installed after the server confirms them.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::clock::{format_clock, GameClock};
use super::lineup_manager::LineupManager;
use super::lock;
use super::stat_ledger::StatLedger;
use super::ticker::ClockTicker;
use crate::config::settings::SessionSettings;
use crate::errors::{SessionError, ValidationError};
use crate::gateway::RemoteGameGateway;
use crate::models::common::PageQuery;
use crate::models::game::{Game, GameStatus, GameUpdate};
use crate::models::lineup::{Lineup, LineupPlayer, Substitution};
use crate::models::player::Player;
use crate::models::stats::{
    CounterStat, PlayerGameStat, ShotOutcome, ShotType, StatEventRequest, StatOperation, MAX_STAT_DELTA,
};
use crate::notifications::Notifier;

/// Read-only view of the game state for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scoreboard {
    pub status: GameStatus,
    pub period: u32,
    pub remaining_seconds: u32,
    pub running: bool,
    pub home_team_id: Uuid,
    pub away_team_id: Uuid,
    pub home_score: u32,
    pub away_score: u32,
}

impl Display for Scoreboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "HOME {} - {} AWAY | P{} {} {}{}",
            self.home_score,
            self.away_score,
            self.period,
            format_clock(self.remaining_seconds),
            self.status,
            if self.running { " ▶" } else { "" }
        )
    }
}

/// In-flight stat events, per player
type InFlight = Arc<Mutex<HashMap<Uuid, usize>>>;

pub struct GameSession {
    game: Game,
    settings: SessionSettings,
    gateway: Arc<dyn RemoteGameGateway>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<Mutex<GameClock>>,
    ledger: Arc<Mutex<StatLedger>>,
    lineups: LineupManager,
    players: HashMap<Uuid, Player>,
    ticker: Option<ClockTicker>,
    in_flight: InFlight,
    stat_tasks: Vec<JoinHandle<()>>,
}

impl GameSession {
    /// Build a session from a game record without touching the network.
    /// The clock is restored from the record but not started.
    pub fn new(
        game: Game,
        gateway: Arc<dyn RemoteGameGateway>,
        notifier: Arc<dyn Notifier>,
        settings: SessionSettings,
    ) -> Self {
        let period_length = settings.effective_period_length(game.period_length_s);
        let clock = GameClock::from_game(&game, period_length, Utc::now());
        let lineups = LineupManager::new(game.id, game.home_team_id, game.away_team_id);

        Self {
            game,
            settings,
            gateway,
            notifier,
            clock: Arc::new(Mutex::new(clock)),
            ledger: Arc::new(Mutex::new(StatLedger::new())),
            lineups,
            players: HashMap::new(),
            ticker: None,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            stat_tasks: Vec::new(),
        }
    }

    /// Fetch everything a session needs and resume the clock if the server
    /// says it is running.
    #[tracing::instrument(name = "Load game session", skip(gateway, notifier, settings))]
    pub async fn load(
        game_id: Uuid,
        gateway: Arc<dyn RemoteGameGateway>,
        notifier: Arc<dyn Notifier>,
        settings: SessionSettings,
    ) -> Result<Self, SessionError> {
        let game = gateway.get_game(game_id).await?;
        let mut session = Self::new(game, gateway, notifier, settings);
        let (home, away) = (session.game.home_team_id, session.game.away_team_id);

        let (home_lineup, away_lineup) = futures::join!(
            session.gateway.current_lineup(game_id, home),
            session.gateway.current_lineup(game_id, away),
        );
        let confirmed: Vec<Lineup> = [home_lineup?, away_lineup?].into_iter().flatten().collect();
        session.lineups.install_confirmed(confirmed)?;

        let (home_roster, away_roster) = futures::join!(
            session.gateway.list_team_players(home),
            session.gateway.list_team_players(away),
        );
        for (team_id, roster) in [(home, home_roster?), (away, away_roster?)] {
            session.lineups.set_roster(team_id, roster.iter().map(|player| player.id))?;
            session.players.extend(roster.into_iter().map(|player| (player.id, player)));
        }

        let synced = session.sync_stats().await?;

        let (running, expired_offline) = {
            let mut clock = lock(&session.clock);
            (clock.is_running(), clock.take_period_expired())
        };
        if running {
            session.spawn_ticker();
        } else if expired_offline {
            // The period ran out while nobody was watching; record the stop
            let update = lock(&session.clock).to_update();
            session.push_clock(update).await;
        }

        tracing::info!(
            "✅ Loaded game {} ({}), {} stat entries, clock {}",
            game_id,
            session.status(),
            synced,
            if running { "running" } else { "stopped" }
        );
        Ok(session)
    }

    // ---- clock ----

    /// True iff both teams have a confirmed lineup and the clock is running
    pub fn can_enter_stats(&self) -> bool {
        self.lineups.both_confirmed() && lock(&self.clock).is_running()
    }

    fn ensure_stats_open(&self) -> Result<(), ValidationError> {
        let clock = lock(&self.clock);
        if clock.status().is_terminal() {
            return Err(ValidationError::GameOver(clock.status()));
        }
        if !self.lineups.both_confirmed() {
            return Err(ValidationError::StatEntryClosed("both lineups must be confirmed"));
        }
        if !clock.is_running() {
            return Err(ValidationError::StatEntryClosed("the clock is stopped"));
        }
        Ok(())
    }

    fn ensure_not_over(&self) -> Result<(), ValidationError> {
        let status = lock(&self.clock).status();
        if status.is_terminal() {
            return Err(ValidationError::GameOver(status));
        }
        Ok(())
    }

    /// Start a stopped clock or stop a running one. Returns the new running state.
    pub async fn toggle_clock(&mut self) -> Result<bool, SessionError> {
        if lock(&self.clock).is_running() {
            self.stop_clock().await?;
            Ok(false)
        } else {
            self.start_clock().await?;
            Ok(true)
        }
    }

    pub async fn start_clock(&mut self) -> Result<(), SessionError> {
        self.ensure_not_over()?;
        for team_id in [self.game.home_team_id, self.game.away_team_id] {
            if !self.lineups.has_confirmed(team_id) {
                return Err(ValidationError::NoConfirmedLineup(team_id).into());
            }
        }

        let update = {
            let mut clock = lock(&self.clock);
            if clock.remaining_seconds() == 0 {
                return Err(ValidationError::PeriodExpired.into());
            }
            if !clock.start() {
                return Ok(());
            }
            clock.to_update()
        };

        self.spawn_ticker();
        tracing::info!("▶️ Clock started for game {} at {}", self.game.id, self.clock_display());
        self.push_clock(update).await;
        Ok(())
    }

    pub async fn stop_clock(&mut self) -> Result<(), SessionError> {
        let update = {
            let mut clock = lock(&self.clock);
            if !clock.stop() {
                return Ok(());
            }
            clock.to_update()
        };

        self.ticker = None;
        tracing::info!("⏸️ Clock stopped for game {} at {}", self.game.id, self.clock_display());
        self.push_clock(update).await;
        Ok(())
    }

    /// Move to the next period with a full, stopped clock. Lineups carry over.
    pub async fn advance_period(&mut self) -> Result<u32, SessionError> {
        let (update, period) = {
            let mut clock = lock(&self.clock);
            if clock.status() == GameStatus::Scheduled {
                return Err(ValidationError::NotStarted.into());
            }
            if !clock.advance_period() {
                return Err(ValidationError::GameOver(clock.status()).into());
            }
            (clock.to_update(), clock.period())
        };

        self.ticker = None;
        tracing::info!("Game {} advanced to period {}", self.game.id, period);
        self.push_clock(update).await;
        Ok(period)
    }

    fn spawn_ticker(&mut self) {
        self.ticker = Some(ClockTicker::spawn(
            self.game.id,
            self.clock.clone(),
            self.gateway.clone(),
            self.notifier.clone(),
        ));
    }

    /// Mirror a clock transition to the game record. Failures are reported
    /// but the local clock stays as the operator set it.
    async fn push_clock(&mut self, update: GameUpdate) {
        match self.gateway.update_game(self.game.id, &update).await {
            Ok(game) => self.game = game,
            Err(e) => {
                tracing::error!("Failed to push clock state for game {}: {}", self.game.id, e);
                self.notifier.error(&format!("Clock change not saved: {}", e));
            }
        }
    }

    fn clock_display(&self) -> String {
        let clock = lock(&self.clock);
        format!("P{} {}", clock.period(), format_clock(clock.remaining_seconds()))
    }

    // ---- lineups ----

    /// Stage opening assignments for one team. Returns the filled position count.
    pub fn propose_lineup(&mut self, team_id: Uuid, assignments: &[LineupPlayer]) -> Result<usize, ValidationError> {
        self.lineups.propose_initial_lineup(team_id, assignments)
    }

    /// Confirm both opening lineups in one batch call. On rejection nothing
    /// is installed and the drafts stay for a retry.
    #[tracing::instrument(name = "Commit initial lineups", skip(self, home, away), fields(game_id = %self.game.id))]
    pub async fn commit_initial_lineups(
        &mut self,
        home: &[LineupPlayer],
        away: &[LineupPlayer],
    ) -> Result<(), SessionError> {
        self.ensure_not_over()?;
        let period = lock(&self.clock).period();
        let request = self.lineups.prepare_initial_commit(home, away, period)?;

        match self.gateway.create_lineups_batch(self.game.id, &request).await {
            Ok(response) => {
                self.lineups.install_confirmed(response.lineups)?;
                tracing::info!("✅ Lineups confirmed for game {}", self.game.id);
                self.notifier.success("Lineups saved");
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Lineup commit rejected for game {}: {}", self.game.id, e);
                self.notifier.error(&format!("Lineups not saved: {}", e));
                Err(e.into())
            }
        }
    }

    /// Submit a substitution. The new lineup becomes current only after the
    /// server confirms it; both teams are then re-synced from the server.
    #[tracing::instrument(name = "Perform substitution", skip(self, subs), fields(game_id = %self.game.id))]
    pub async fn perform_substitution(
        &mut self,
        team_id: Uuid,
        subs: &[Substitution],
    ) -> Result<Lineup, SessionError> {
        self.ensure_not_over()?;
        let period = lock(&self.clock).period();
        let request = self.lineups.substitute(team_id, subs, period)?;

        let confirmed = match self.gateway.create_lineup(self.game.id, &request).await {
            Ok(lineup) => lineup,
            Err(e) => {
                self.lineups.reject_substitution(team_id)?;
                tracing::warn!("Substitution for team {} rejected: {}", team_id, e);
                self.notifier.error(&format!("Substitution not saved: {}", e));
                return Err(e.into());
            }
        };

        self.lineups.confirm_substitution(confirmed.clone())?;
        self.resync_lineups().await;

        tracing::info!("🔄 Substitution confirmed for team {} ({} change(s))", team_id, subs.len());
        self.notifier.success("Substitution saved");
        Ok(confirmed)
    }

    async fn resync_lineups(&mut self) {
        let game_id = self.game.id;
        let (home, away) = futures::join!(
            self.gateway.current_lineup(game_id, self.game.home_team_id),
            self.gateway.current_lineup(game_id, self.game.away_team_id),
        );

        for (team_id, result) in [(self.game.home_team_id, home), (self.game.away_team_id, away)] {
            match result {
                Ok(Some(lineup)) => {
                    if let Err(e) = self.lineups.sync_current(lineup) {
                        tracing::warn!("Ignoring re-synced lineup for team {}: {}", team_id, e);
                    }
                }
                Ok(None) => {
                    tracing::debug!("No current lineup on server for team {}, keeping local", team_id);
                }
                Err(e) => {
                    tracing::warn!("Lineup re-sync failed for team {}: {}", team_id, e);
                    self.notifier.error(&format!("Could not refresh lineups: {}", e));
                }
            }
        }
    }

    // ---- stats ----

    fn ensure_delta(delta: i32) -> Result<(), ValidationError> {
        if delta.unsigned_abs() > MAX_STAT_DELTA {
            return Err(ValidationError::DeltaOutOfRange(delta));
        }
        Ok(())
    }

    fn ensure_player(&self, team_id: Uuid, player_id: Uuid) -> Result<(), ValidationError> {
        if self.game.side_of(team_id).is_none() {
            return Err(ValidationError::UnknownTeam(team_id));
        }
        if !self.lineups.is_on_roster(team_id, player_id) {
            return Err(ValidationError::NotOnRoster { team_id, player_id });
        }
        Ok(())
    }

    /// Record `delta` shots (negative to undo). The ledger changes at once;
    /// one remote event per unit of `delta` follows in the background.
    pub fn record_shot(
        &mut self,
        team_id: Uuid,
        player_id: Uuid,
        shot_type: ShotType,
        outcome: ShotOutcome,
        delta: i32,
    ) -> Result<PlayerGameStat, SessionError> {
        self.ensure_stats_open()?;
        self.ensure_player(team_id, player_id)?;
        Self::ensure_delta(delta)?;

        let game_id = self.game.id;
        let entry = {
            let mut ledger = lock(&self.ledger);
            ledger.ensure_initialized(game_id, player_id, team_id);
            ledger.apply_shot(game_id, player_id, shot_type, outcome, delta)
        };

        let operation = StatOperation::for_delta(delta);
        for _ in 0..delta.unsigned_abs() {
            self.spawn_stat_event(StatEventRequest::shot(player_id, team_id, shot_type, outcome, operation));
        }

        tracing::debug!("{} {:?} x{} for player {} (team {})", shot_type.as_str(), outcome, delta, player_id, team_id);
        Ok(entry.unwrap_or_else(|| PlayerGameStat::zeroed(game_id, player_id, team_id)))
    }

    /// Record rebounds, assists, fouls, steals or blocks
    pub fn record_counter_stat(
        &mut self,
        team_id: Uuid,
        player_id: Uuid,
        stat: CounterStat,
        delta: i32,
    ) -> Result<PlayerGameStat, SessionError> {
        self.ensure_stats_open()?;
        self.ensure_player(team_id, player_id)?;
        Self::ensure_delta(delta)?;

        let game_id = self.game.id;
        let entry = {
            let mut ledger = lock(&self.ledger);
            ledger.ensure_initialized(game_id, player_id, team_id);
            ledger.apply_counter_stat(game_id, player_id, stat, delta)
        };

        let operation = StatOperation::for_delta(delta);
        for _ in 0..delta.unsigned_abs() {
            self.spawn_stat_event(StatEventRequest::counter(player_id, team_id, stat, operation));
        }

        tracing::debug!("{} x{} for player {}", stat.as_str(), delta, player_id);
        Ok(entry.unwrap_or_else(|| PlayerGameStat::zeroed(game_id, player_id, team_id)))
    }

    fn spawn_stat_event(&mut self, event: StatEventRequest) {
        self.stat_tasks.retain(|task| !task.is_finished());
        *lock(&self.in_flight).entry(event.player_id).or_insert(0) += 1;

        let game_id = self.game.id;
        let gateway = self.gateway.clone();
        let notifier = self.notifier.clone();
        let ledger = self.ledger.clone();
        let in_flight = self.in_flight.clone();

        self.stat_tasks.push(tokio::spawn(async move {
            let result = gateway.record_stat_event(game_id, &event).await;

            let settled = {
                let mut in_flight = lock(&in_flight);
                match in_flight.get_mut(&event.player_id) {
                    Some(count) if *count > 1 => {
                        *count -= 1;
                        false
                    }
                    _ => {
                        in_flight.remove(&event.player_id);
                        true
                    }
                }
            };

            match result {
                // Earlier responses are superseded by the last one for this player
                Ok(entry) if settled => lock(&ledger).reconcile(game_id, event.player_id, entry),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Stat event {:?} for player {} rejected: {}", event.stat, event.player_id, e);
                    notifier.error(&format!("Stat not saved: {}", e));
                }
            }
        }));
    }

    /// Stat events sent but not yet answered
    pub fn pending_requests(&self) -> usize {
        lock(&self.in_flight).values().sum()
    }

    /// Wait for every in-flight stat event to settle
    pub async fn flush(&mut self) {
        let tasks = std::mem::take(&mut self.stat_tasks);
        for result in futures::future::join_all(tasks).await {
            if let Err(e) = result {
                tracing::error!("Stat event task failed: {}", e);
            }
        }
    }

    /// Replace local stat entries with the server's aggregates for both teams.
    /// Returns the number of entries reconciled.
    pub async fn sync_stats(&self) -> Result<usize, SessionError> {
        let mut entries = Vec::new();
        for team_id in [self.game.home_team_id, self.game.away_team_id] {
            let mut offset = 0;
            loop {
                let query = PageQuery::new(offset, self.settings.stats_page_size);
                let page = self.gateway.list_stats(self.game.id, team_id, query).await?;
                let next = page.next_offset();
                entries.extend(page.items);
                match next {
                    Some(next) => offset = next,
                    None => break,
                }
            }
        }

        let count = entries.len();
        lock(&self.ledger).reconcile_snapshot(self.game.id, entries);
        tracing::debug!("Reconciled {} stat entries for game {}", count, self.game.id);
        Ok(count)
    }

    // ---- game record ----

    /// Re-read the game record and adopt a final or cancelled status set elsewhere
    pub async fn refresh_game(&mut self) -> Result<&Game, SessionError> {
        let game = self.gateway.get_game(self.game.id).await?;

        let local_status = lock(&self.clock).status();
        if game.status.is_terminal() && game.status != local_status {
            lock(&self.clock).set_status(game.status);
            self.ticker = None;
            tracing::info!("Game {} was marked {} remotely", game.id, game.status);
            self.notifier.error(&format!("Game is now {}", game.status));
        }

        self.game = game;
        Ok(&self.game)
    }

    /// Mark the game final: let in-flight stats settle, save the stopped
    /// clock with status final and take a last stat snapshot. The local
    /// clock only stops once the server has accepted the final state.
    #[tracing::instrument(name = "Finalize game", skip(self), fields(game_id = %self.game.id))]
    pub async fn finalize(&mut self) -> Result<(), SessionError> {
        let status = lock(&self.clock).status();
        if status.is_terminal() {
            return Err(ValidationError::GameOver(status).into());
        }
        if status == GameStatus::Scheduled {
            return Err(ValidationError::NotStarted.into());
        }
        self.flush().await;

        let mut stopped = lock(&self.clock).clone();
        stopped.stop();
        let update = GameUpdate {
            status: Some(GameStatus::Final),
            ..stopped.to_update()
        };

        let game = match self.gateway.update_game(self.game.id, &update).await {
            Ok(game) => game,
            Err(e) => {
                tracing::error!("Failed to finalize game {}: {}", self.game.id, e);
                self.notifier.error(&format!("Game not finalized: {}", e));
                return Err(e.into());
            }
        };

        self.ticker = None;
        stopped.set_status(GameStatus::Final);
        *lock(&self.clock) = stopped;
        self.game = game;

        self.sync_stats().await?;
        tracing::info!("🏁 Game {} final: {}", self.game.id, self.scoreboard());
        self.notifier.success("Game finalized");
        Ok(())
    }

    // ---- read side ----

    pub fn scoreboard(&self) -> Scoreboard {
        let (status, period, remaining_seconds, running) = {
            let clock = lock(&self.clock);
            (clock.status(), clock.period(), clock.remaining_seconds(), clock.is_running())
        };
        let ledger = lock(&self.ledger);
        Scoreboard {
            status,
            period,
            remaining_seconds,
            running,
            home_team_id: self.game.home_team_id,
            away_team_id: self.game.away_team_id,
            home_score: ledger.team_score(self.game.id, self.game.home_team_id),
            away_score: ledger.team_score(self.game.id, self.game.away_team_id),
        }
    }

    pub fn team_score(&self, team_id: Uuid) -> u32 {
        lock(&self.ledger).team_score(self.game.id, team_id)
    }

    pub fn stat(&self, player_id: Uuid) -> Option<PlayerGameStat> {
        lock(&self.ledger).get(self.game.id, player_id).cloned()
    }

    /// Box score rows of one team, highest scorer first
    pub fn team_stats(&self, team_id: Uuid) -> Vec<PlayerGameStat> {
        lock(&self.ledger)
            .team_entries(self.game.id, team_id)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn clock(&self) -> GameClock {
        lock(&self.clock).clone()
    }

    pub fn status(&self) -> GameStatus {
        lock(&self.clock).status()
    }

    pub fn is_clock_ticking(&self) -> bool {
        self.ticker.as_ref().is_some_and(|ticker| !ticker.is_finished())
    }

    pub fn lineups(&self) -> &LineupManager {
        &self.lineups
    }

    pub fn player(&self, player_id: Uuid) -> Option<&Player> {
        self.players.get(&player_id)
    }

    /// Loaded roster of one team, by jersey number
    pub fn roster(&self, team_id: Uuid) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.players.values().filter(|player| player.team_id == team_id).collect();
        players.sort_by_key(|player| (player.jersey_number.unwrap_or(u32::MAX), player.last_name.clone()));
        players
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn game_id(&self) -> Uuid {
        self.game.id
    }
}
