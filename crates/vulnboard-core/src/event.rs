//! Registry lifecycle events over tokio::broadcast
//!
//! The registry publishes from whichever thread did the work (including the
//! moka eviction listener). Consumers either `recv().await` or, from sync code,
//! `drain` whatever has arrived.

use std::fmt;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::debug;

/// Events buffered per subscriber before the oldest are dropped
pub const EVENT_CAPACITY: usize = 256;

pub type EventReceiver = broadcast::Receiver<RegistryEvent>;

/// Lifecycle events emitted by the project registry; each carries the
/// project name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    ProjectCreated(String),
    ProjectOpened(String),
    ProjectClosed(String),
    /// Snapshot written to disk
    ProjectSaved(String),
    /// Written back and dropped from memory; still on disk
    ProjectEvicted(String),
    ProjectRemoved(String),
}

impl RegistryEvent {
    pub fn project(&self) -> &str {
        match self {
            RegistryEvent::ProjectCreated(name)
            | RegistryEvent::ProjectOpened(name)
            | RegistryEvent::ProjectClosed(name)
            | RegistryEvent::ProjectSaved(name)
            | RegistryEvent::ProjectEvicted(name)
            | RegistryEvent::ProjectRemoved(name) => name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RegistryEvent::ProjectCreated(_) => "created",
            RegistryEvent::ProjectOpened(_) => "opened",
            RegistryEvent::ProjectClosed(_) => "closed",
            RegistryEvent::ProjectSaved(_) => "saved",
            RegistryEvent::ProjectEvicted(_) => "evicted",
            RegistryEvent::ProjectRemoved(_) => "removed",
        }
    }
}

impl fmt::Display for RegistryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "project {} {}", self.project(), self.kind())
    }
}

/// Cloneable publishing handle; clones share one channel
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<RegistryEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to current subscribers; returns how many received it
    pub fn publish(&self, event: RegistryEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                debug!(%event, "No event subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_CAPACITY)
    }
}

/// Take every event already queued on `rx` without blocking. Events lost to
/// a lagging receiver are skipped.
pub fn drain(rx: &mut EventReceiver) -> Vec<RegistryEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Lagged(skipped)) => {
                debug!(skipped, "Event receiver lagged");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => return events,
        }
    }
}
