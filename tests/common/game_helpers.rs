use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use courtside::config::settings::SessionSettings;
use courtside::game::GameSession;
use courtside::gateway::InMemoryGameGateway;
use courtside::models::game::{Game, GameStatus};
use courtside::models::lineup::{LineupPlayer, Position};
use courtside::models::player::Player;

use crate::common::utils::{init_tracing, RecordingNotifier};

pub struct DemoGame {
    pub gateway: Arc<InMemoryGameGateway>,
    pub game: Game,
    /// Eight players per team, jersey numbers 1..=8
    pub home_players: Vec<Player>,
    pub away_players: Vec<Player>,
}

impl DemoGame {
    pub fn home_id(&self) -> Uuid {
        self.game.home_team_id
    }

    pub fn away_id(&self) -> Uuid {
        self.game.away_team_id
    }

    /// Starting five of the home team: players 1..=5 on PG..C
    pub fn home_lineup(&self) -> Vec<LineupPlayer> {
        starting_five(&self.home_players)
    }

    pub fn away_lineup(&self) -> Vec<LineupPlayer> {
        starting_five(&self.away_players)
    }
}

pub fn starting_five(players: &[Player]) -> Vec<LineupPlayer> {
    Position::ALL
        .iter()
        .zip(players)
        .map(|(position, player)| LineupPlayer::new(*position, player.id))
        .collect()
}

pub fn roster(team_id: Uuid, prefix: &str) -> Vec<Player> {
    (1..=8)
        .map(|number| Player {
            id: Uuid::new_v4(),
            team_id,
            first_name: format!("{}{}", prefix, number),
            last_name: "Tester".to_string(),
            jersey_number: Some(number),
        })
        .collect()
}

pub fn scheduled_game(period_length_s: u32) -> Game {
    Game {
        id: Uuid::new_v4(),
        home_team_id: Uuid::new_v4(),
        away_team_id: Uuid::new_v4(),
        scheduled_at: Utc::now() + Duration::hours(1),
        status: GameStatus::Scheduled,
        current_period: 1,
        current_clock_s: period_length_s,
        clock_running: false,
        period_length_s: Some(period_length_s),
        clock_updated_at: None,
    }
}

/// Seed an in-memory server with a game and both rosters
pub fn seed_demo_game(game: Game) -> DemoGame {
    init_tracing();

    let gateway = Arc::new(InMemoryGameGateway::new());
    let home_players = roster(game.home_team_id, "Home");
    let away_players = roster(game.away_team_id, "Away");

    gateway.insert_game(game.clone());
    gateway.insert_roster(game.home_team_id, home_players.clone());
    gateway.insert_roster(game.away_team_id, away_players.clone());

    DemoGame { gateway, game, home_players, away_players }
}

pub async fn load_session(demo: &DemoGame) -> (GameSession, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::new());
    let session = GameSession::load(
        demo.game.id,
        demo.gateway.clone(),
        notifier.clone(),
        SessionSettings::default(),
    )
    .await
    .expect("Failed to load session");
    (session, notifier)
}

/// Both lineups confirmed and the clock running
pub async fn live_session(period_length_s: u32) -> (DemoGame, GameSession, Arc<RecordingNotifier>) {
    let demo = seed_demo_game(scheduled_game(period_length_s));
    let (mut session, notifier) = load_session(&demo).await;

    session
        .commit_initial_lineups(&demo.home_lineup(), &demo.away_lineup())
        .await
        .expect("Failed to commit lineups");
    session.toggle_clock().await.expect("Failed to start clock");
    assert!(session.can_enter_stats());

    (demo, session, notifier)
}
