//! # Event Hub
//!
//! Fan-out of state-change notifications to all currently connected
//! observers (WebSocket client actors).
//!
//! ## Delivery Semantics:
//! - **At-least-once** to every observer registered at publish time
//! - **Per-observer ordering**: each observer receives events in publication
//!   order, because delivery goes through the actor's mailbox (FIFO)
//! - **Silent drops**: an observer that disconnects mid-broadcast simply
//!   misses the event; `do_send` to a dead mailbox is a no-op and the
//!   transport layer reports the connection loss separately
//!
//! The hub holds only a `Recipient` handle per connection — the WebSocket
//! actor owns the connection lifecycle and is responsible for registering
//! itself on start and unregistering on stop.

use crate::audio::library::AudioFileMeta;
use crate::playback::types::PlaybackState;
use actix::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

/// A pre-serialized event pushed into a client actor's mailbox.
#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct PushEvent(pub String);

/// Everything observers can be notified about.
///
/// Serialized with a `type` tag so clients can dispatch on
/// `{"type": "state_changed", ...}` style messages.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The playback state changed; carries the full new snapshot.
    StateChanged { state: PlaybackState },

    /// A new audio file entered the library; observers can refresh their view.
    AudioUploaded { file: AudioFileMeta },

    /// An accepted announcement later failed (synthesis or playback start).
    AnnouncementFailed { reason: String },
}

/// Registry of connected observers keyed by connection identity.
pub struct EventHub {
    observers: RwLock<HashMap<Uuid, Recipient<PushEvent>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a newly connected observer.
    pub fn register(&self, id: Uuid, recipient: Recipient<PushEvent>) {
        let mut observers = self.observers.write().unwrap();
        observers.insert(id, recipient);
        debug!("Observer {} registered ({} connected)", id, observers.len());
    }

    /// Remove an observer on disconnect. Unknown ids are ignored.
    pub fn unregister(&self, id: Uuid) {
        let mut observers = self.observers.write().unwrap();
        if observers.remove(&id).is_some() {
            debug!("Observer {} unregistered ({} connected)", id, observers.len());
        }
    }

    /// Number of currently connected observers.
    pub fn observer_count(&self) -> usize {
        self.observers.read().unwrap().len()
    }

    /// Broadcast an event to every connected observer.
    ///
    /// The event is serialized once and the same payload is pushed to each
    /// mailbox. Observers whose mailbox is gone are dropped silently.
    pub fn publish(&self, event: &Event) {
        let payload = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(err) => {
                warn!("Failed to serialize event, dropping broadcast: {}", err);
                return;
            }
        };

        let observers = self.observers.read().unwrap();
        debug!(
            "Broadcasting {} bytes to {} observer(s)",
            payload.len(),
            observers.len()
        );

        for recipient in observers.values() {
            recipient.do_send(PushEvent(payload.clone()));
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}
