use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use courtside::config::settings::get_config;
use courtside::console::{execute, render_status, Command, Flow};
use courtside::game::GameSession;
use courtside::gateway::{HttpGameGateway, RemoteGameGateway};
use courtside::notifications::ConsoleNotifier;
use courtside::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Panic if we can't read the config
    let config = get_config().expect("Failed to read the config.");

    // Console output owns stdout
    let subscriber = get_subscriber(
        "courtside".into(),
        config.application.log_level.clone(),
        std::io::stderr,
    );
    init_subscriber(subscriber);

    let game_id = match std::env::args().nth(1).map(|arg| arg.parse::<Uuid>()) {
        Some(Ok(game_id)) => game_id,
        _ => {
            eprintln!("Usage: courtside <game-id>");
            std::process::exit(2);
        }
    };

    let gateway: Arc<dyn RemoteGameGateway> = match HttpGameGateway::new(&config.api) {
        Ok(gateway) => Arc::new(gateway),
        Err(e) => {
            tracing::error!("❌ Failed to create the API client: {}", e);
            std::process::exit(1);
        }
    };

    let mut session = match GameSession::load(
        game_id,
        gateway.clone(),
        Arc::new(ConsoleNotifier),
        config.session.clone(),
    )
    .await
    {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("❌ Failed to load game {}: {}", game_id, e);
            eprintln!("Could not load game {}: {}", game_id, e);
            std::process::exit(1);
        }
    };

    println!("{}", render_status(&session));
    println!("Type `help` for commands.");

    let reconcile_enabled = config.session.reconcile_interval_s > 0;
    let reconcile_every = Duration::from_secs(config.session.reconcile_interval_s.max(1));
    let mut reconcile = tokio::time::interval_at(tokio::time::Instant::now() + reconcile_every, reconcile_every);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line? {
                    Some(line) => line,
                    None => break,
                };
                if line.trim().is_empty() {
                    continue;
                }
                let command = match line.parse::<Command>() {
                    Ok(command) => command,
                    Err(e) => {
                        println!("{}", e);
                        continue;
                    }
                };
                match execute(&mut session, &gateway, command).await {
                    Ok((Flow::Quit, output)) => {
                        println!("{}", output);
                        break;
                    }
                    Ok((Flow::Continue, output)) => println!("{}", output),
                    Err(e) => println!("⚠️ {}", e),
                }
            }
            _ = reconcile.tick(), if reconcile_enabled => {
                if let Err(e) = session.sync_stats().await {
                    tracing::warn!("Background stat sync failed: {}", e);
                }
            }
        }
    }

    session.flush().await;
    tracing::info!("Console for game {} closed", game_id);
    Ok(())
}
