use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use uuid::Uuid;

use super::clock::{GameClock, TickOutcome};
use super::lock;
use crate::gateway::RemoteGameGateway;
use crate::notifications::Notifier;

const TICK: Duration = Duration::from_secs(1);

/// One-second cadence driving a `GameClock`.
///
/// The task ends by itself once the clock stops or the period expires.
/// Dropping the ticker aborts the task, so a torn-down session never keeps
/// decrementing.
pub struct ClockTicker {
    handle: JoinHandle<()>,
}

impl ClockTicker {
    pub fn spawn(
        game_id: Uuid,
        clock: Arc<Mutex<GameClock>>,
        gateway: Arc<dyn RemoteGameGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            Self::run(game_id, clock, gateway, notifier).await;
        });
        Self { handle }
    }

    async fn run(
        game_id: Uuid,
        clock: Arc<Mutex<GameClock>>,
        gateway: Arc<dyn RemoteGameGateway>,
        notifier: Arc<dyn Notifier>,
    ) {
        let mut interval = interval_at(Instant::now() + TICK, TICK);

        loop {
            interval.tick().await;

            let (outcome, update, period) = {
                let mut clock = lock(&clock);
                let outcome = clock.tick();
                (outcome, clock.to_update(), clock.period())
            };

            match outcome {
                TickOutcome::Ticked { .. } => continue,
                TickOutcome::Idle => {
                    tracing::debug!("Clock for game {} stopped, ticker exits", game_id);
                    break;
                }
                TickOutcome::Expired => {
                    tracing::info!("⏱️ Period {} of game {} expired", period, game_id);
                    if let Err(e) = gateway.update_game(game_id, &update).await {
                        tracing::error!("Failed to push period expiry for game {}: {}", game_id, e);
                        notifier.error(&format!("Could not save end of period {}: {}", period, e));
                    }
                    break;
                }
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for ClockTicker {
    fn drop(&mut self) {
        self.cancel();
    }
}
