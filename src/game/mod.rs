pub mod clock;
pub mod lineup_manager;
pub mod session;
pub mod stat_ledger;
pub mod ticker;

pub use clock::{format_clock, ClockSnapshot, GameClock, TickOutcome};
pub use lineup_manager::LineupManager;
pub use session::{GameSession, Scoreboard};
pub use stat_ledger::StatLedger;
pub use ticker::ClockTicker;

use std::sync::{Mutex, MutexGuard};

/// Lock shared session state. A panicked holder cannot leave the clock or
/// ledger half-written, so a poisoned lock is taken over as is.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
