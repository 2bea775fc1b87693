pub mod ws;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::model::ChatMessage;

/// One committed row, pushed to every subscriber of the owning event.
/// Serialized as a tagged JSON frame on the websocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Change {
    #[serde(rename_all = "camelCase")]
    Response {
        event_id: String,
        time_slot_id: String,
        user_name: String,
        is_available: bool,
    },
    #[serde(rename_all = "camelCase")]
    Message {
        event_id: String,
        message: ChatMessage,
    },
    /// The subscriber missed committed changes and must refetch a snapshot.
    #[serde(rename_all = "camelCase")]
    Resync { event_id: String },
}

impl Change {
    pub fn event_id(&self) -> &str {
        match self {
            Change::Response { event_id, .. }
            | Change::Message { event_id, .. }
            | Change::Resync { event_id } => event_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Idle,
    Subscribing,
    Live,
    Unsubscribed,
    Error,
}

/// Per-event subscription over the global broadcast channel.
///
/// Filters to one event id, delivers in commit order, never hands out an
/// already-applied row twice, and turns a lagged receiver into an explicit
/// `Resync` instead of a silent gap.
pub struct EventFeed {
    event_id: String,
    state: FeedState,
    rx: Option<broadcast::Receiver<Change>>,
    seen_messages: HashSet<String>,
    applied_responses: HashMap<(String, String), bool>,
}

impl EventFeed {
    pub fn new(event_id: impl Into<String>) -> Self {
        EventFeed {
            event_id: event_id.into(),
            state: FeedState::Idle,
            rx: None,
            seen_messages: HashSet::new(),
            applied_responses: HashMap::new(),
        }
    }

    pub fn subscribe(tx: &broadcast::Sender<Change>, event_id: impl Into<String>) -> Self {
        let mut feed = EventFeed::new(event_id);
        feed.attach(tx);
        feed
    }

    pub fn attach(&mut self, tx: &broadcast::Sender<Change>) {
        if self.state != FeedState::Idle {
            return;
        }
        self.state = FeedState::Subscribing;
        self.rx = Some(tx.subscribe());
        self.state = FeedState::Live;
    }

    pub fn state(&self) -> FeedState {
        self.state
    }

    /// Next applicable change; `None` once unsubscribed or the channel is gone
    /// (check `state()` to tell which).
    pub async fn next(&mut self) -> Option<Change> {
        loop {
            let rx = self.rx.as_mut()?;
            match rx.recv().await {
                Ok(change) => {
                    if change.event_id() != self.event_id || self.already_applied(&change) {
                        continue;
                    }
                    self.mark_applied(&change);
                    return Some(change);
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    // Whatever we skipped is unrecoverable here; the consumer
                    // refetches a snapshot and dedup starts over.
                    self.seen_messages.clear();
                    self.applied_responses.clear();
                    return Some(Change::Resync {
                        event_id: self.event_id.clone(),
                    });
                }
                Err(broadcast::error::RecvError::Closed) => {
                    self.state = FeedState::Error;
                    self.rx = None;
                    return None;
                }
            }
        }
    }

    /// Idempotent; nothing is delivered after this returns.
    pub fn unsubscribe(&mut self) {
        self.rx = None;
        self.seen_messages.clear();
        self.applied_responses.clear();
        self.state = FeedState::Unsubscribed;
    }

    fn already_applied(&self, change: &Change) -> bool {
        match change {
            Change::Response {
                time_slot_id,
                user_name,
                is_available,
                ..
            } => {
                self.applied_responses
                    .get(&(time_slot_id.clone(), user_name.clone()))
                    == Some(is_available)
            }
            Change::Message { message, .. } => self.seen_messages.contains(&message.id),
            Change::Resync { .. } => false,
        }
    }

    fn mark_applied(&mut self, change: &Change) {
        match change {
            Change::Response {
                time_slot_id,
                user_name,
                is_available,
                ..
            } => {
                self.applied_responses
                    .insert((time_slot_id.clone(), user_name.clone()), *is_available);
            }
            Change::Message { message, .. } => {
                self.seen_messages.insert(message.id.clone());
            }
            Change::Resync { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(event_id: &str, slot_id: &str, user_name: &str, is_available: bool) -> Change {
        Change::Response {
            event_id: event_id.to_owned(),
            time_slot_id: slot_id.to_owned(),
            user_name: user_name.to_owned(),
            is_available,
        }
    }

    fn message(event_id: &str, id: &str) -> Change {
        Change::Message {
            event_id: event_id.to_owned(),
            message: ChatMessage {
                id: id.to_owned(),
                event_id: event_id.to_owned(),
                user_name: "Alice".to_owned(),
                text: "hi".to_owned(),
                created_at: 0,
            },
        }
    }

    #[test]
    fn subscribe_walks_the_state_machine() {
        let (tx, _rx) = broadcast::channel(8);

        let mut feed = EventFeed::new("e1");
        assert_eq!(feed.state(), FeedState::Idle);
        feed.attach(&tx);
        assert_eq!(feed.state(), FeedState::Live);
        feed.unsubscribe();
        assert_eq!(feed.state(), FeedState::Unsubscribed);
    }

    #[tokio::test]
    async fn other_events_are_filtered_out() {
        let (tx, _rx) = broadcast::channel(8);
        let mut feed = EventFeed::subscribe(&tx, "e1");

        tx.send(response("e2", "s1", "Alice", true)).unwrap();
        tx.send(message("e1", "m1")).unwrap();

        let change = feed.next().await.unwrap();
        assert!(matches!(change, Change::Message { .. }));
        assert_eq!(change.event_id(), "e1");
    }

    #[tokio::test]
    async fn already_applied_rows_are_not_redelivered() {
        let (tx, _rx) = broadcast::channel(16);
        let mut feed = EventFeed::subscribe(&tx, "e1");

        tx.send(response("e1", "s1", "Alice", true)).unwrap();
        tx.send(response("e1", "s1", "Alice", true)).unwrap(); // duplicate
        tx.send(message("e1", "m1")).unwrap();
        tx.send(message("e1", "m1")).unwrap(); // duplicate
        tx.send(response("e1", "s1", "Alice", false)).unwrap(); // changed value

        assert!(matches!(
            feed.next().await.unwrap(),
            Change::Response {
                is_available: true,
                ..
            }
        ));
        assert!(matches!(feed.next().await.unwrap(), Change::Message { .. }));
        assert!(matches!(
            feed.next().await.unwrap(),
            Change::Response {
                is_available: false,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn lag_surfaces_a_resync_not_a_silent_gap() {
        let (tx, _rx) = broadcast::channel(1);
        let mut feed = EventFeed::subscribe(&tx, "e1");

        for i in 0..4 {
            tx.send(message("e1", &format!("m{i}"))).unwrap();
        }

        assert!(matches!(
            feed.next().await.unwrap(),
            Change::Resync { .. }
        ));
        // The survivor of the backlog still arrives afterwards.
        assert!(matches!(feed.next().await.unwrap(), Change::Message { .. }));
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent_and_final() {
        let (tx, _rx) = broadcast::channel(8);
        let mut feed = EventFeed::subscribe(&tx, "e1");

        feed.unsubscribe();
        feed.unsubscribe();
        assert_eq!(feed.state(), FeedState::Unsubscribed);

        tx.send(message("e1", "m1")).unwrap();
        assert!(feed.next().await.is_none());
    }

    #[tokio::test]
    async fn closed_channel_lands_in_error_state() {
        let (tx, _rx) = broadcast::channel(8);
        drop(_rx);
        let mut feed = EventFeed::subscribe(&tx, "e1");
        drop(tx);

        assert!(feed.next().await.is_none());
        assert_eq!(feed.state(), FeedState::Error);
    }
}
