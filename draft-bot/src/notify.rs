// Outbound notification seam between the engine loop and the chat platform.
//
// Notifications are side effects dispatched after a mutating operation has
// committed; a delivery failure must never roll back or block draft state,
// so every method is infallible from the caller's point of view and
// implementations handle their own errors.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Delivery surface for turn reminders and public announcements.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Direct-message the idle drafter that they are on the clock.
    async fn notify_turn(&self, participant_id: &str, round: u64, pick_in_round: u64);

    /// Announce a committed pick on the public channel.
    async fn broadcast_pick(
        &self,
        channel: &str,
        round: u64,
        pick_in_round: u64,
        team_name: &str,
        item_name: &str,
    );

    /// Announce the frozen pick order when the draft starts.
    async fn broadcast_draft_started(&self, channel: &str, ordered_team_names: &[String]);
}

/// Notifier that writes announcements to the log. Stands in for a chat
/// transport in console deployments.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_turn(&self, participant_id: &str, round: u64, pick_in_round: u64) {
        info!(
            "[dm -> {participant_id}] You're on the clock! Round {}, pick {}. \
             Add something to your want list.",
            round + 1,
            pick_in_round
        );
    }

    async fn broadcast_pick(
        &self,
        channel: &str,
        round: u64,
        pick_in_round: u64,
        team_name: &str,
        item_name: &str,
    ) {
        info!(
            "[{channel}] Round {} pick {}: The {team_name} take {item_name}!",
            round + 1,
            pick_in_round
        );
    }

    async fn broadcast_draft_started(&self, channel: &str, ordered_team_names: &[String]) {
        info!(
            "[{channel}] The draft has started! Order: {}",
            ordered_team_names.join(", ")
        );
    }
}

/// A recorded outbound notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Turn {
        participant_id: String,
        round: u64,
        pick_in_round: u64,
    },
    Pick {
        channel: String,
        round: u64,
        pick_in_round: u64,
        team_name: String,
        item_name: String,
    },
    DraftStarted {
        channel: String,
        ordered_team_names: Vec<String>,
    },
}

/// Notifier that forwards every call onto an unbounded channel. Bridges the
/// engine loop to an out-of-process transport task, and doubles as the
/// observation point in tests.
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelNotifier { tx }, rx)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify_turn(&self, participant_id: &str, round: u64, pick_in_round: u64) {
        if self
            .tx
            .send(Notification::Turn {
                participant_id: participant_id.to_string(),
                round,
                pick_in_round,
            })
            .is_err()
        {
            warn!("notification receiver dropped, discarding turn reminder");
        }
    }

    async fn broadcast_pick(
        &self,
        channel: &str,
        round: u64,
        pick_in_round: u64,
        team_name: &str,
        item_name: &str,
    ) {
        if self
            .tx
            .send(Notification::Pick {
                channel: channel.to_string(),
                round,
                pick_in_round,
                team_name: team_name.to_string(),
                item_name: item_name.to_string(),
            })
            .is_err()
        {
            warn!("notification receiver dropped, discarding pick broadcast");
        }
    }

    async fn broadcast_draft_started(&self, channel: &str, ordered_team_names: &[String]) {
        if self
            .tx
            .send(Notification::DraftStarted {
                channel: channel.to_string(),
                ordered_team_names: ordered_team_names.to_vec(),
            })
            .is_err()
        {
            warn!("notification receiver dropped, discarding start broadcast");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_notifier_forwards_calls_in_order() {
        let (notifier, mut rx) = ChannelNotifier::new();

        notifier.notify_turn("alice", 0, 1).await;
        notifier
            .broadcast_pick("#draft", 0, 1, "Mudcats", "Ashen Drake")
            .await;

        assert_eq!(
            rx.recv().await.unwrap(),
            Notification::Turn {
                participant_id: "alice".into(),
                round: 0,
                pick_in_round: 1,
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            Notification::Pick {
                channel: "#draft".into(),
                round: 0,
                pick_in_round: 1,
                team_name: "Mudcats".into(),
                item_name: "Ashen Drake".into(),
            }
        );
    }

    #[tokio::test]
    async fn dropped_receiver_is_not_an_error() {
        let (notifier, rx) = ChannelNotifier::new();
        drop(rx);
        // Must not panic or block.
        notifier.notify_turn("alice", 0, 1).await;
        notifier.broadcast_draft_started("#draft", &["Mudcats".into()]).await;
    }
}
