use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use chrono::Utc;
use secrecy::SecretString;
use serde_json::{json, Value};
use uuid::Uuid;

use courtside::config::api::ApiSettings;
use courtside::gateway::{GatewayError, HttpGameGateway, RemoteGameGateway};
use courtside::models::common::{Page, PageQuery};
use courtside::models::game::{Game, GameStatus, GameUpdate};
use courtside::models::lineup::{BatchLineupRequest, Lineup, LineupRequest, Position};
use courtside::models::stats::{PlayerGameStat, ShotOutcome, ShotType, StatEventRequest, StatOperation};

mod common;
use common::game_helpers::{roster, scheduled_game, starting_five};
use common::utils::init_tracing;

const TOKEN: &str = "test-token";

struct StubState {
    game: Game,
    home_lineup: Lineup,
    auth_headers: Mutex<Vec<Option<String>>>,
    bodies: Mutex<Vec<Value>>,
    queries: Mutex<Vec<HashMap<String, String>>>,
}

fn authorized(req: &HttpRequest, state: &StubState) -> bool {
    let header = req
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let ok = header.as_deref() == Some("Bearer test-token");
    state.auth_headers.lock().unwrap().push(header);
    ok
}

async fn get_game(req: HttpRequest, state: web::Data<StubState>) -> HttpResponse {
    if !authorized(&req, &state) {
        return HttpResponse::Unauthorized().json(json!({ "success": false, "error": "Missing token" }));
    }
    HttpResponse::Ok().json(&state.game)
}

async fn update_game(state: web::Data<StubState>, body: web::Json<Value>) -> HttpResponse {
    state.bodies.lock().unwrap().push(body.0.clone());
    let update: GameUpdate = serde_json::from_value(body.0).unwrap();
    let mut game = state.game.clone();
    if let Some(status) = update.status {
        game.status = status;
    }
    if let Some(running) = update.clock_running {
        game.clock_running = running;
    }
    HttpResponse::Ok().json(game)
}

async fn current_lineup(state: web::Data<StubState>, query: web::Query<HashMap<String, String>>) -> HttpResponse {
    if query.get("team_id") == Some(&state.game.home_team_id.to_string()) {
        HttpResponse::Ok().json(&state.home_lineup)
    } else {
        HttpResponse::NotFound().json(json!({ "status": 404, "message": "No current lineup" }))
    }
}

async fn batch_lineups() -> HttpResponse {
    HttpResponse::UnprocessableEntity().json(json!({
        "status": 422,
        "message": "Duplicate player",
        "data": { "position": "SG" }
    }))
}

async fn list_stats(state: web::Data<StubState>, query: web::Query<HashMap<String, String>>) -> HttpResponse {
    state.queries.lock().unwrap().push(query.0.clone());
    let team_id: Uuid = query["team_id"].parse().unwrap();
    let mut row = PlayerGameStat::zeroed(state.game.id, Uuid::new_v4(), team_id);
    row.rebounds = 7;
    HttpResponse::Ok().json(Page {
        items: vec![row],
        total: 26,
        offset: query["offset"].parse().unwrap(),
        limit: query["limit"].parse().unwrap(),
    })
}

async fn record_stat(state: web::Data<StubState>, body: web::Json<Value>) -> HttpResponse {
    state.bodies.lock().unwrap().push(body.0.clone());
    let event: StatEventRequest = serde_json::from_value(body.0).unwrap();
    let mut row = PlayerGameStat::zeroed(state.game.id, event.player_id, event.team_id);
    row.field_goals_made = 1;
    row.field_goals_attempted = 1;
    row.three_pointers_made = 1;
    row.three_pointers_attempted = 1;
    row.points = event.value;
    HttpResponse::Ok().json(row)
}

async fn team_games() -> HttpResponse {
    HttpResponse::InternalServerError().body("database exploded")
}

async fn spawn_stub() -> (String, Arc<StubState>) {
    init_tracing();

    let game = scheduled_game(600);
    let players = roster(game.home_team_id, "Home");
    let home_lineup = Lineup {
        id: Uuid::new_v4(),
        game_id: game.id,
        team_id: game.home_team_id,
        period: 1,
        players: starting_five(&players),
        created_at: Utc::now(),
    };
    let state = Arc::new(StubState {
        game,
        home_lineup,
        auth_headers: Mutex::new(Vec::new()),
        bodies: Mutex::new(Vec::new()),
        queries: Mutex::new(Vec::new()),
    });

    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let data = web::Data::from(state.clone());

    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .service(
                web::resource("/api/v1/games/{id}")
                    .route(web::get().to(get_game))
                    .route(web::put().to(update_game)),
            )
            .route("/api/v1/games/{id}/lineups/current", web::get().to(current_lineup))
            .route("/api/v1/games/{id}/lineups/batch", web::post().to(batch_lineups))
            .service(
                web::resource("/api/v1/games/{id}/stats")
                    .route(web::get().to(list_stats))
                    .route(web::post().to(record_stat)),
            )
            .route("/api/v1/teams/{id}/games", web::get().to(team_games))
    })
    .workers(1)
    .listen(listener)
    .expect("Failed to bind address")
    .run();
    let _ = tokio::spawn(server);

    (format!("http://127.0.0.1:{}/api/v1/", port), state)
}

fn gateway(base_url: &str, token: Option<&str>) -> HttpGameGateway {
    let token = token.map(|t| SecretString::new(t.to_string().into_boxed_str()));
    HttpGameGateway::new(&ApiSettings::new(base_url, token)).expect("Failed to build gateway")
}

#[tokio::test]
async fn test_get_game_sends_bearer_token() {
    let (base_url, state) = spawn_stub().await;
    let gateway = gateway(&base_url, Some(TOKEN));

    let game = gateway.get_game(state.game.id).await.expect("Failed to fetch game");
    assert_eq!(game, state.game);
    assert_eq!(
        state.auth_headers.lock().unwrap().as_slice(),
        &[Some(format!("Bearer {}", TOKEN))]
    );
}

#[tokio::test]
async fn test_error_bodies_are_normalized() {
    let (base_url, state) = spawn_stub().await;

    // Unauthenticated: `{success, error}` body
    let anonymous = gateway(&base_url, None);
    match anonymous.get_game(state.game.id).await {
        Err(GatewayError::Rejected(api_error)) => {
            assert_eq!(api_error.status, 401);
            assert_eq!(api_error.message, "Missing token");
        }
        other => panic!("Expected a rejection, got {:?}", other),
    }

    let gateway = gateway(&base_url, Some(TOKEN));

    // Server envelope passes through untouched
    let request = BatchLineupRequest {
        lineups: vec![LineupRequest {
            team_id: state.game.home_team_id,
            period: 1,
            players: state.home_lineup.players.clone(),
        }],
    };
    match gateway.create_lineups_batch(state.game.id, &request).await {
        Err(GatewayError::Rejected(api_error)) => {
            assert_eq!(api_error.status, 422);
            assert_eq!(api_error.message, "Duplicate player");
            assert_eq!(api_error.data, Some(json!({ "position": "SG" })));
        }
        other => panic!("Expected a rejection, got {:?}", other),
    }

    // Plain text body
    let error = gateway
        .list_team_games(state.game.home_team_id, PageQuery::new(0, 10))
        .await
        .unwrap_err();
    assert_eq!(error.status(), Some(500));
    assert!(error.to_string().contains("database exploded"));
}

#[tokio::test]
async fn test_missing_current_lineup_is_not_an_error() {
    let (base_url, state) = spawn_stub().await;
    let gateway = gateway(&base_url, Some(TOKEN));

    let home = gateway
        .current_lineup(state.game.id, state.game.home_team_id)
        .await
        .unwrap()
        .expect("Home lineup should exist");
    assert_eq!(home.id, state.home_lineup.id);
    assert_eq!(home.player_at(Position::PG), state.home_lineup.player_at(Position::PG));

    let away = gateway
        .current_lineup(state.game.id, state.game.away_team_id)
        .await
        .unwrap();
    assert!(away.is_none());
}

#[tokio::test]
async fn test_stat_event_wire_format() {
    let (base_url, state) = spawn_stub().await;
    let gateway = gateway(&base_url, Some(TOKEN));
    let player_id = state.home_lineup.players[0].player_id;

    let event = StatEventRequest::shot(
        player_id,
        state.game.home_team_id,
        ShotType::ThreePoint,
        ShotOutcome::Made,
        StatOperation::Increment,
    );
    let entry = gateway.record_stat_event(state.game.id, &event).await.unwrap();
    assert_eq!(entry.player_id, player_id);
    assert_eq!(entry.points, 3);

    let bodies = state.bodies.lock().unwrap();
    assert_eq!(
        bodies[0],
        json!({
            "playerId": player_id,
            "teamId": state.game.home_team_id,
            "stat": "made_point",
            "value": 3,
            "operation": "increment"
        })
    );
}

#[tokio::test]
async fn test_list_stats_sends_pagination_query() {
    let (base_url, state) = spawn_stub().await;
    let gateway = gateway(&base_url, Some(TOKEN));

    let page = gateway
        .list_stats(state.game.id, state.game.away_team_id, PageQuery::new(25, 25))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].rebounds, 7);
    assert_eq!(page.total, 26);
    assert_eq!(page.next_offset(), None);

    let queries = state.queries.lock().unwrap();
    assert_eq!(queries[0]["team_id"], state.game.away_team_id.to_string());
    assert_eq!(queries[0]["offset"], "25");
    assert_eq!(queries[0]["limit"], "25");
}

#[tokio::test]
async fn test_update_game_sends_only_changed_fields() {
    let (base_url, state) = spawn_stub().await;
    let gateway = gateway(&base_url, Some(TOKEN));

    let update = GameUpdate {
        clock_running: Some(true),
        status: Some(GameStatus::Live),
        ..Default::default()
    };
    let game = gateway.update_game(state.game.id, &update).await.unwrap();
    assert_eq!(game.status, GameStatus::Live);
    assert!(game.clock_running);

    let bodies = state.bodies.lock().unwrap();
    assert_eq!(bodies[0], json!({ "clockRunning": true, "status": "live" }));
}

#[tokio::test]
async fn test_unreachable_server_is_a_network_error() {
    init_tracing();
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let gateway = gateway(&format!("http://127.0.0.1:{}/api/v1", port), Some(TOKEN));

    let error = gateway.get_game(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(error, GatewayError::Network(_)));
}
