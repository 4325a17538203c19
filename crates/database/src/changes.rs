//! In-process change notifications for alert rows.
//!
//! Subscribers are told *that* a user's alerts changed, not *what* changed;
//! they re-query.

use serde::Serialize;
use tokio::sync::broadcast;

/// Buffered events per subscriber before it starts lagging.
const CHANNEL_CAPACITY: usize = 256;

/// What happened to a user's alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Inserted,
    Updated,
}

/// A change to the alerts of one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertChange {
    pub target_user_id: String,
    pub kind: ChangeKind,
}

/// Broadcast hub for alert changes.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<AlertChange>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publish a change. Having no subscribers is not an error.
    pub fn publish(&self, target_user_id: &str, kind: ChangeKind) {
        let receivers = self
            .sender
            .send(AlertChange {
                target_user_id: target_user_id.to_string(),
                kind,
            })
            .unwrap_or(0);
        tracing::trace!(target_user_id, ?kind, receivers, "Published alert change");
    }

    /// Open a subscription. Dropping the receiver closes it.
    pub fn subscribe(&self) -> broadcast::Receiver<AlertChange> {
        self.sender.subscribe()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
