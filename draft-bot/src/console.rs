// Line-oriented console transport: a stand-in for the chat platform.
//
// Reads commands from stdin and relays them to the engine loop through the
// same command channel a chat front-end would use. One command per line,
// prefixed with the acting user:
//
//   <user> register <team name> <ABR>
//   <user> start
//   <user> want <item query>
//   <user> clear
//   <user> search <fragment>
//   <user> status
//   quit
//
// Parsing and reply formatting are pure functions so they can be tested
// without driving stdin.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::info;

use crate::app::{Ack, Command, CommandKind};
use crate::engine::DraftPhase;
use crate::error::CommandError;

/// What a single input line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Command { user_id: String, kind: CommandKind },
    Quit,
    Empty,
    Invalid(String),
}

/// Parse one input line.
pub fn parse_line(line: &str) -> ParsedLine {
    let line = line.trim();
    if line.is_empty() {
        return ParsedLine::Empty;
    }
    if line.eq_ignore_ascii_case("quit") {
        return ParsedLine::Quit;
    }

    let Some((user, rest)) = line.split_once(char::is_whitespace) else {
        return ParsedLine::Invalid(format!(
            "expected '<user> <command>', got '{line}'"
        ));
    };
    let user_id = user.to_string();
    let rest = rest.trim();
    let (verb, args) = match rest.split_once(char::is_whitespace) {
        Some((verb, args)) => (verb, args.trim()),
        None => (rest, ""),
    };

    let kind = match verb.to_lowercase().as_str() {
        "register" => {
            if args.is_empty() {
                return ParsedLine::Invalid("usage: <user> register <team name> <ABR>".into());
            }
            CommandKind::Register {
                display_name: user_id.clone(),
                user_id: user_id.clone(),
                team_spec: args.to_string(),
            }
        }
        "start" => CommandKind::StartDraft {
            user_id: user_id.clone(),
        },
        "want" => {
            if args.is_empty() {
                return ParsedLine::Invalid("usage: <user> want <item>".into());
            }
            CommandKind::Want {
                user_id: user_id.clone(),
                query: args.to_string(),
            }
        }
        "clear" => CommandKind::Clear {
            user_id: user_id.clone(),
        },
        "search" => {
            if args.is_empty() {
                return ParsedLine::Invalid("usage: <user> search <fragment>".into());
            }
            CommandKind::Search {
                fragment: args.to_string(),
            }
        }
        "status" => CommandKind::Status,
        other => {
            return ParsedLine::Invalid(format!("unknown command '{other}'"));
        }
    };

    ParsedLine::Command { user_id, kind }
}

/// Render a successful acknowledgement for the console.
pub fn format_ack(ack: &Ack) -> String {
    match ack {
        Ack::Registered {
            team_name,
            abbreviation,
        } => match abbreviation {
            Some(abbr) => format!(
                "Your team, The {team_name} ({abbr}), has been registered. Happy drafting!"
            ),
            None => format!("Your team, The {team_name}, has been registered. Happy drafting!"),
        },
        Ack::Started { order } => {
            let listed: Vec<String> = order
                .iter()
                .enumerate()
                .map(|(i, name)| format!("{}. {name}", i + 1))
                .collect();
            format!("The draft has started! Order: {}", listed.join(", "))
        }
        Ack::WantList(list) => {
            if list.is_empty() {
                "Your want list is empty.".to_string()
            } else {
                format!("Your want list: {}", list.join(", "))
            }
        }
        Ack::Cleared => "Your want list has been cleared.".to_string(),
        Ack::Matches(matches) => {
            if matches.is_empty() {
                "No matches.".to_string()
            } else {
                format!("Matches: {}", matches.join(", "))
            }
        }
        Ack::Status(status) => match status.phase {
            DraftPhase::NotStarted => "The draft hasn't started yet.".to_string(),
            DraftPhase::InProgress => format!(
                "Round {}, pick {}: The {} are on the clock ({}/{} picks made).",
                status.round,
                status.pick_in_round,
                status.current_team.as_deref().unwrap_or("?"),
                status.picks_committed,
                status.total_picks
            ),
            DraftPhase::Finished => format!(
                "The draft is over ({} picks made).",
                status.picks_committed
            ),
        },
    }
}

/// Render a command failure for the console.
pub fn format_error(err: &CommandError) -> String {
    format!("ERROR: {err}")
}

/// Read commands from stdin until EOF or `quit`, relaying each to the engine
/// loop and printing its reply.
pub async fn run(cmd_tx: mpsc::Sender<Command>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            ParsedLine::Empty => {}
            ParsedLine::Quit => {
                info!("Quit requested from console");
                break;
            }
            ParsedLine::Invalid(message) => println!("ERROR: {message}"),
            ParsedLine::Command { kind, .. } => {
                let (reply, reply_rx) = oneshot::channel();
                if cmd_tx.send(Command { kind, reply }).await.is_err() {
                    // Engine loop is gone; nothing more to serve.
                    break;
                }
                match reply_rx.await {
                    Ok(Ok(ack)) => println!("{}", format_ack(&ack)),
                    Ok(Err(err)) => println!("{}", format_error(&err)),
                    Err(_) => break,
                }
            }
        }
    }

    Ok(())
}
