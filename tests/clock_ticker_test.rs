use std::time::Duration;

use courtside::errors::{SessionError, ValidationError};
use courtside::models::game::GameStatus;

mod common;
use common::game_helpers::*;

#[tokio::test(start_paused = true)]
async fn test_running_clock_counts_down_once_per_second() {
    let (_demo, session, _notifier) = live_session(600).await;

    tokio::time::sleep(Duration::from_millis(30_500)).await;

    let clock = session.clock();
    assert_eq!(clock.remaining_seconds(), 570);
    assert!(clock.is_running());
    assert!(session.is_clock_ticking());
}

#[tokio::test(start_paused = true)]
async fn test_stopping_the_clock_cancels_the_ticker() {
    let (demo, mut session, _notifier) = live_session(600).await;

    tokio::time::sleep(Duration::from_millis(5_500)).await;
    assert!(!session.toggle_clock().await.unwrap());
    assert_eq!(session.clock().remaining_seconds(), 595);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(session.clock().remaining_seconds(), 595);
    assert!(!session.is_clock_ticking());

    let game = demo.gateway.game(demo.game.id).unwrap();
    assert_eq!(game.current_clock_s, 595);
    assert_eq!(game.status, GameStatus::Paused);
    assert!(!game.clock_running);
}

#[tokio::test(start_paused = true)]
async fn test_period_expiry_stops_clock_and_saves_it() {
    let (demo, mut session, _notifier) = live_session(5).await;

    tokio::time::sleep(Duration::from_secs(8)).await;

    let clock = session.clock();
    assert_eq!(clock.remaining_seconds(), 0);
    assert!(!clock.is_running());
    assert_eq!(clock.status(), GameStatus::Paused);
    assert!(!session.can_enter_stats());
    assert!(!session.is_clock_ticking());

    let game = demo.gateway.game(demo.game.id).unwrap();
    assert_eq!(game.current_clock_s, 0);
    assert!(!game.clock_running);
    assert_eq!(game.status, GameStatus::Paused);

    // No restart at 0:00, the operator has to move on
    assert!(matches!(
        session.toggle_clock().await,
        Err(SessionError::Validation(ValidationError::PeriodExpired))
    ));

    assert_eq!(session.advance_period().await.unwrap(), 2);
    assert_eq!(session.clock().remaining_seconds(), 5);
    assert!(session.toggle_clock().await.unwrap());

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert_eq!(session.clock().remaining_seconds(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_session_leaves_no_running_ticker() {
    let (demo, session, _notifier) = live_session(3).await;
    let updates_before = demo.gateway.game_updates().len();

    drop(session);
    tokio::time::sleep(Duration::from_secs(10)).await;

    // The expiry would have been pushed if the ticker had survived
    assert_eq!(demo.gateway.game_updates().len(), updates_before);
    assert!(demo.gateway.game(demo.game.id).unwrap().clock_running);
}
