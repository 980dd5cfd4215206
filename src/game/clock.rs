use chrono::{DateTime, Utc};

use crate::models::game::{Game, GameStatus, GameUpdate};

/// Server-side view of the clock at some point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSnapshot {
    pub status: GameStatus,
    pub period: u32,
    pub remaining_seconds: u32,
    pub running: bool,
    /// When the snapshot was taken; only meaningful while running
    pub taken_at: Option<DateTime<Utc>>,
}

impl From<&Game> for ClockSnapshot {
    fn from(game: &Game) -> Self {
        Self {
            status: game.status,
            period: game.current_period,
            remaining_seconds: game.current_clock_s,
            running: game.clock_running,
            taken_at: game.clock_updated_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Clock is stopped, nothing changed
    Idle,
    Ticked { remaining_seconds: u32 },
    /// Reached 0:00 on this tick; the clock stopped itself
    Expired,
}

/// Game clock state. Holds no timer of its own; see `ClockTicker`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameClock {
    status: GameStatus,
    period: u32,
    remaining_seconds: u32,
    running: bool,
    period_length: u32,
    period_expired: bool,
}

impl GameClock {
    pub fn new(period_length: u32) -> Self {
        Self {
            status: GameStatus::Scheduled,
            period: 1,
            remaining_seconds: period_length,
            running: false,
            period_length,
            period_expired: false,
        }
    }

    /// Rebuild the clock from a server snapshot, charging the wall-clock time
    /// that passed since the snapshot if the clock was running.
    pub fn initialize(snapshot: &ClockSnapshot, period_length: u32, now: DateTime<Utc>) -> Self {
        let mut remaining = snapshot.remaining_seconds.min(period_length);
        let mut running = snapshot.running && !snapshot.status.is_terminal();
        let mut period_expired = false;

        if running {
            if let Some(taken_at) = snapshot.taken_at {
                let elapsed = (now - taken_at).num_seconds().max(0);
                let elapsed = u32::try_from(elapsed).unwrap_or(u32::MAX);
                remaining = remaining.saturating_sub(elapsed);
            }
            if remaining == 0 {
                running = false;
                period_expired = true;
            }
        }

        let status = match (snapshot.status, period_expired) {
            (GameStatus::Live, true) => GameStatus::Paused,
            (status, _) => status,
        };

        Self {
            status,
            period: snapshot.period.max(1),
            remaining_seconds: remaining,
            running,
            period_length,
            period_expired,
        }
    }

    pub fn from_game(game: &Game, period_length: u32, now: DateTime<Utc>) -> Self {
        Self::initialize(&ClockSnapshot::from(game), period_length, now)
    }

    /// Returns true if the clock went from stopped to running
    pub fn start(&mut self) -> bool {
        if self.running || self.remaining_seconds == 0 || self.status.is_terminal() {
            return false;
        }
        self.running = true;
        self.status = GameStatus::Live;
        true
    }

    /// Returns true if the clock went from running to stopped
    pub fn stop(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        if self.status == GameStatus::Live {
            self.status = GameStatus::Paused;
        }
        true
    }

    pub fn tick(&mut self) -> TickOutcome {
        if !self.running || self.remaining_seconds == 0 {
            return TickOutcome::Idle;
        }

        self.remaining_seconds -= 1;
        if self.remaining_seconds > 0 {
            return TickOutcome::Ticked { remaining_seconds: self.remaining_seconds };
        }

        self.running = false;
        self.period_expired = true;
        if self.status == GameStatus::Live {
            self.status = GameStatus::Paused;
        }
        TickOutcome::Expired
    }

    /// Move to the next period with a full, stopped clock.
    /// Returns false for a finished or cancelled game.
    pub fn advance_period(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.period += 1;
        self.remaining_seconds = self.period_length;
        self.running = false;
        self.period_expired = false;
        if self.status == GameStatus::Live {
            self.status = GameStatus::Paused;
        }
        true
    }

    /// Read and clear the expiry flag
    pub fn take_period_expired(&mut self) -> bool {
        std::mem::replace(&mut self.period_expired, false)
    }

    /// Apply a status decided elsewhere (e.g. final or cancelled set by another client)
    pub fn set_status(&mut self, status: GameStatus) {
        if status.is_terminal() {
            self.running = false;
        }
        self.status = status;
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn period_length(&self) -> u32 {
        self.period_length
    }

    /// The fields mirrored to `PUT /games/{id}` after a transition
    pub fn to_update(&self) -> GameUpdate {
        GameUpdate {
            clock_running: Some(self.running),
            current_clock_s: Some(self.remaining_seconds),
            current_period: Some(self.period),
            status: Some(self.status),
        }
    }
}

/// Render seconds as MM:SS
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
