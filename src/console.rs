//! Line-oriented operator console on top of `GameSession`.

use std::str::FromStr;
use std::sync::Arc;

use uuid::Uuid;

use crate::game::session::GameSession;
use crate::gateway::RemoteGameGateway;
use crate::models::common::PageQuery;
use crate::models::game::TeamSide;
use crate::models::lineup::{LineupPlayer, Position, Substitution};
use crate::models::stats::{CounterStat, ShotOutcome, ShotType, MAX_STAT_DELTA};

pub const HELP: &str = "\
status                                   scoreboard and lineups
draft <home|away> <POS>=<player> ...     stage opening assignments
commit                                   confirm both opening lineups
clock                                    start or stop the clock
period                                   advance to the next period
shot <home|away> <player> <2PT|3PT|FT> <made|missed> [delta]
stat <home|away> <player> <reb|ast|foul|stl|blk> [delta]
sub <home|away> <POS> <out> <in> [<POS> <out> <in> ...]
sync                                     reconcile stats with the server
refresh                                  re-read the game record
final                                    mark the game final
games <home|away> [offset]               list the team's games
help | quit
players are given by id or jersey number (7 or #7)";

const GAMES_PAGE_SIZE: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Status,
    Draft { side: TeamSide, assignments: Vec<(Position, String)> },
    Commit,
    Clock,
    Period,
    Shot { side: TeamSide, player: String, shot_type: ShotType, outcome: ShotOutcome, delta: i32 },
    Stat { side: TeamSide, player: String, stat: CounterStat, delta: i32 },
    Sub { side: TeamSide, changes: Vec<(Position, String, String)> },
    Sync,
    Refresh,
    Final,
    Games { side: TeamSide, offset: u64 },
    Help,
    Quit,
}

fn parse_delta(token: Option<&&str>) -> Result<i32, String> {
    match token {
        None => Ok(1),
        Some(token) => match token.parse::<i32>() {
            Ok(0) => Err("delta must not be 0".to_string()),
            Ok(delta) if delta.unsigned_abs() > MAX_STAT_DELTA => {
                Err(format!("delta must be between -{0} and {0}", MAX_STAT_DELTA))
            }
            Ok(delta) => Ok(delta),
            Err(_) => Err(format!("{} is not a whole number", token)),
        },
    }
}

fn required<'a>(args: &[&'a str], index: usize, what: &str) -> Result<&'a str, String> {
    args.get(index).copied().ok_or_else(|| format!("missing {}", what))
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (name, args) = match tokens.split_first() {
            Some((name, args)) => (name.to_lowercase(), args),
            None => return Err("empty command".to_string()),
        };

        let command = match name.as_str() {
            "status" | "s" => Command::Status,
            "commit" => Command::Commit,
            "clock" | "c" => Command::Clock,
            "period" => Command::Period,
            "sync" => Command::Sync,
            "refresh" => Command::Refresh,
            "final" => Command::Final,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            "draft" => {
                let side = required(args, 0, "team side")?.parse::<TeamSide>()?;
                let assignments = args[1..]
                    .iter()
                    .map(|pair| {
                        let (position, player) = pair
                            .split_once('=')
                            .ok_or_else(|| format!("{} is not POS=player", pair))?;
                        Ok((position.parse::<Position>()?, player.to_string()))
                    })
                    .collect::<Result<Vec<_>, String>>()?;
                if assignments.is_empty() {
                    return Err("draft needs at least one POS=player".to_string());
                }
                Command::Draft { side, assignments }
            }
            "shot" => Command::Shot {
                side: required(args, 0, "team side")?.parse::<TeamSide>()?,
                player: required(args, 1, "player")?.to_string(),
                shot_type: required(args, 2, "shot type")?.parse::<ShotType>()?,
                outcome: required(args, 3, "outcome")?.parse::<ShotOutcome>()?,
                delta: parse_delta(args.get(4))?,
            },
            "stat" => Command::Stat {
                side: required(args, 0, "team side")?.parse::<TeamSide>()?,
                player: required(args, 1, "player")?.to_string(),
                stat: required(args, 2, "stat")?.parse::<CounterStat>()?,
                delta: parse_delta(args.get(3))?,
            },
            "sub" => {
                let side = required(args, 0, "team side")?.parse::<TeamSide>()?;
                let rest = &args[1..];
                if rest.is_empty() || rest.len() % 3 != 0 {
                    return Err("sub needs groups of <POS> <out> <in>".to_string());
                }
                let changes = rest
                    .chunks(3)
                    .map(|group| Ok((group[0].parse::<Position>()?, group[1].to_string(), group[2].to_string())))
                    .collect::<Result<Vec<_>, String>>()?;
                Command::Sub { side, changes }
            }
            "games" => Command::Games {
                side: required(args, 0, "team side")?.parse::<TeamSide>()?,
                offset: match args.get(1) {
                    Some(token) => token.parse().map_err(|_| format!("{} is not an offset", token))?,
                    None => 0,
                },
            },
            other => return Err(format!("unknown command `{}`, try `help`", other)),
        };
        Ok(command)
    }
}

/// Whether the console loop should keep reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Look a player up by id, or by jersey number within the team's roster
pub fn resolve_player(session: &GameSession, team_id: Uuid, token: &str) -> Result<Uuid, String> {
    if let Ok(player_id) = token.parse::<Uuid>() {
        return Ok(player_id);
    }
    let number: u32 = token
        .trim_start_matches('#')
        .parse()
        .map_err(|_| format!("{} is neither a player id nor a jersey number", token))?;
    session
        .roster(team_id)
        .into_iter()
        .find(|player| player.jersey_number == Some(number))
        .map(|player| player.id)
        .ok_or_else(|| format!("no #{} on the {} roster", number, team_label(session, team_id)))
}

fn team_label(session: &GameSession, team_id: Uuid) -> &'static str {
    session.game().side_of(team_id).map(|side| side.as_str()).unwrap_or("unknown")
}

fn player_label(session: &GameSession, player_id: Uuid) -> String {
    session
        .player(player_id)
        .map(|player| player.display_name())
        .unwrap_or_else(|| player_id.to_string())
}

/// Render scoreboard, lineups and pending work as console text
pub fn render_status(session: &GameSession) -> String {
    let mut out = format!("{}\n", session.scoreboard());
    for side in [TeamSide::Home, TeamSide::Away] {
        let team_id = session.game().team_id(side);
        let lineups = session.lineups();
        out.push_str(&format!("{}:\n", side.as_str()));
        match lineups.on_court(team_id) {
            Some(on_court) => {
                for (position, player_id) in on_court {
                    let points = session.stat(player_id).map(|entry| entry.points).unwrap_or(0);
                    out.push_str(&format!("  {:<2} {} ({} pts)\n", position, player_label(session, player_id), points));
                }
            }
            None => {
                let filled = lineups.filled_count(team_id);
                out.push_str(&format!("  no confirmed lineup ({}/5 drafted)\n", filled));
            }
        }
        if lineups.pending(team_id).is_some() {
            out.push_str("  substitution awaiting confirmation\n");
        }
    }
    let pending = session.pending_requests();
    if pending > 0 {
        out.push_str(&format!("{} stat event(s) in flight\n", pending));
    }
    out
}

/// Run one command against the session. Returns the text to show.
pub async fn execute(
    session: &mut GameSession,
    gateway: &Arc<dyn RemoteGameGateway>,
    command: Command,
) -> Result<(Flow, String), String> {
    let output = match command {
        Command::Status => render_status(session),
        Command::Help => HELP.to_string(),
        Command::Quit => return Ok((Flow::Quit, "bye".to_string())),
        Command::Draft { side, assignments } => {
            let team_id = session.game().team_id(side);
            let players = assignments
                .iter()
                .map(|(position, token)| Ok(LineupPlayer::new(*position, resolve_player(session, team_id, token)?)))
                .collect::<Result<Vec<_>, String>>()?;
            let filled = session.propose_lineup(team_id, &players).map_err(|e| e.to_string())?;
            format!("{} draft: {}/5 positions filled", side.as_str(), filled)
        }
        Command::Commit => {
            session.commit_initial_lineups(&[], &[]).await.map_err(|e| e.to_string())?;
            "lineups confirmed".to_string()
        }
        Command::Clock => {
            let running = session.toggle_clock().await.map_err(|e| e.to_string())?;
            format!("clock {}", if running { "started" } else { "stopped" })
        }
        Command::Period => {
            let period = session.advance_period().await.map_err(|e| e.to_string())?;
            format!("period {}", period)
        }
        Command::Shot { side, player, shot_type, outcome, delta } => {
            let team_id = session.game().team_id(side);
            let player_id = resolve_player(session, team_id, &player)?;
            let entry = session
                .record_shot(team_id, player_id, shot_type, outcome, delta)
                .map_err(|e| e.to_string())?;
            format!(
                "{}: {} pts, FG {}/{}, 3P {}/{}, FT {}/{}",
                player_label(session, player_id),
                entry.points,
                entry.field_goals_made,
                entry.field_goals_attempted,
                entry.three_pointers_made,
                entry.three_pointers_attempted,
                entry.free_throws_made,
                entry.free_throws_attempted
            )
        }
        Command::Stat { side, player, stat, delta } => {
            let team_id = session.game().team_id(side);
            let player_id = resolve_player(session, team_id, &player)?;
            let entry = session
                .record_counter_stat(team_id, player_id, stat, delta)
                .map_err(|e| e.to_string())?;
            format!("{}: {} {}", player_label(session, player_id), entry.counter(stat), stat)
        }
        Command::Sub { side, changes } => {
            let team_id = session.game().team_id(side);
            let subs = changes
                .iter()
                .map(|(position, out, into)| {
                    Ok(Substitution::new(
                        *position,
                        resolve_player(session, team_id, out)?,
                        resolve_player(session, team_id, into)?,
                    ))
                })
                .collect::<Result<Vec<_>, String>>()?;
            let lineup = session
                .perform_substitution(team_id, &subs)
                .await
                .map_err(|e| e.to_string())?;
            format!("{} lineup updated for period {}", side.as_str(), lineup.period)
        }
        Command::Sync => {
            let count = session.sync_stats().await.map_err(|e| e.to_string())?;
            format!("{} stat entries reconciled\n{}", count, session.scoreboard())
        }
        Command::Refresh => {
            let status = session.refresh_game().await.map_err(|e| e.to_string())?.status;
            format!("game is {}", status)
        }
        Command::Final => {
            session.finalize().await.map_err(|e| e.to_string())?;
            format!("final: {}", session.scoreboard())
        }
        Command::Games { side, offset } => {
            let team_id = session.game().team_id(side);
            let page = gateway
                .list_team_games(team_id, PageQuery::new(offset, GAMES_PAGE_SIZE))
                .await
                .map_err(|e| e.to_string())?;
            let mut out = format!("{} games ({} total)\n", side.as_str(), page.total);
            for game in &page.items {
                out.push_str(&format!(
                    "  {} {} {}\n",
                    game.scheduled_at.format("%Y-%m-%d %H:%M"),
                    game.status,
                    game.id
                ));
            }
            if let Some(next) = page.next_offset() {
                out.push_str(&format!("  more: games {} {}\n", side.as_str(), next));
            }
            out
        }
    };
    Ok((Flow::Continue, output))
}
