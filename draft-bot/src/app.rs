// The single-writer engine loop.
//
// Commands from the transport and scheduler ticks interleave as whole units
// of work over one exclusively-owned DraftEngine, so no handler can ever
// observe a partially applied pick. Notifications go out after the mutating
// section commits, on detached tasks, so delivery latency never blocks the
// next unit of work.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use crate::engine::{DraftEngine, StatusView, TickOutcome};
use crate::error::{CommandError, TickError};
use crate::notify::Notifier;

// ---------------------------------------------------------------------------
// Command protocol
// ---------------------------------------------------------------------------

/// A command relayed from the transport, carrying its reply channel.
#[derive(Debug)]
pub struct Command {
    pub kind: CommandKind,
    pub reply: oneshot::Sender<Result<Ack, CommandError>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    Register {
        user_id: String,
        display_name: String,
        team_spec: String,
    },
    StartDraft {
        user_id: String,
    },
    Want {
        user_id: String,
        query: String,
    },
    Clear {
        user_id: String,
    },
    Search {
        fragment: String,
    },
    Status,
}

/// Successful command acknowledgements.
#[derive(Debug, Clone, PartialEq)]
pub enum Ack {
    Registered {
        team_name: String,
        abbreviation: Option<String>,
    },
    Started {
        order: Vec<String>,
    },
    WantList(Vec<String>),
    Cleared,
    Matches(Vec<String>),
    Status(StatusView),
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

/// Run the engine loop until the command channel closes.
///
/// Listens on the command channel and a fixed-period tick interval with
/// `tokio::select!`; each arm runs to completion before the next is polled.
/// A consistency violation from the tick latches `halted`: automatic picking
/// stops for operator intervention while commands keep being served.
pub async fn run(
    mut engine: DraftEngine,
    mut cmd_rx: mpsc::Receiver<Command>,
    notifier: Arc<dyn Notifier>,
    channel: String,
    tick_period: Duration,
) -> anyhow::Result<()> {
    info!("Engine loop started (tick every {tick_period:?})");

    let mut ticker = tokio::time::interval(tick_period);
    // The first tick completes immediately; consume it so the first real
    // evaluation happens after one full period.
    ticker.tick().await;

    let mut halted = false;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(cmd) => handle_command(&mut engine, cmd, &notifier, &channel),
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            _ = ticker.tick() => {
                if halted {
                    continue;
                }
                match engine.tick() {
                    Ok(outcome) => dispatch_outcome(outcome, &notifier, &channel),
                    Err(TickError::Consistency(msg)) => {
                        error!("Consistency violation, halting automatic picks: {msg}");
                        halted = true;
                    }
                    Err(TickError::Persistence(e)) => {
                        warn!("Tick failed to persist, will retry next tick: {e:#}");
                    }
                }
            }
        }
    }

    Ok(())
}

/// Apply one command to the engine and answer on its reply channel. The
/// engine call is the critical section; the start broadcast goes out only
/// after it has committed.
fn handle_command(
    engine: &mut DraftEngine,
    cmd: Command,
    notifier: &Arc<dyn Notifier>,
    channel: &str,
) {
    let result = match cmd.kind {
        CommandKind::Register {
            user_id,
            display_name,
            team_spec,
        } => engine
            .register(&user_id, &display_name, &team_spec)
            .map(|p| Ack::Registered {
                team_name: p.team_name,
                abbreviation: p.team_abbreviation,
            }),

        CommandKind::StartDraft { user_id } => {
            info!("Start requested by {user_id}");
            engine.start_draft().map(|order| {
                let notifier = Arc::clone(notifier);
                let channel = channel.to_string();
                let announced = order.clone();
                tokio::spawn(async move {
                    notifier.broadcast_draft_started(&channel, &announced).await;
                });
                Ack::Started { order }
            })
        }

        CommandKind::Want { user_id, query } => {
            engine.want(&user_id, &query).map(Ack::WantList)
        }

        CommandKind::Clear { user_id } => {
            engine.clear_want_list(&user_id).map(|()| Ack::Cleared)
        }

        CommandKind::Search { fragment } => Ok(Ack::Matches(engine.search(&fragment))),

        CommandKind::Status => Ok(Ack::Status(engine.status())),
    };

    // The requester may have gone away; that is their problem, not ours.
    let _ = cmd.reply.send(result);
}

/// Turn a tick outcome into outbound notifications, each on a detached task.
fn dispatch_outcome(outcome: TickOutcome, notifier: &Arc<dyn Notifier>, channel: &str) {
    match outcome {
        TickOutcome::Idle | TickOutcome::Finished => {}

        TickOutcome::Waiting {
            drafter,
            round,
            pick_in_round,
            first_notice,
        } => {
            if first_notice {
                let notifier = Arc::clone(notifier);
                tokio::spawn(async move {
                    notifier.notify_turn(&drafter, round, pick_in_round).await;
                });
            }
        }

        TickOutcome::Picked {
            team_name,
            item_name,
            round,
            pick_in_round,
            ..
        } => {
            let notifier = Arc::clone(notifier);
            let channel = channel.to_string();
            tokio::spawn(async move {
                notifier
                    .broadcast_pick(&channel, round, pick_in_round, &team_name, &item_name)
                    .await;
            });
        }
    }
}
