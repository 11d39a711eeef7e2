//! Session event stream
//!
//! Fans every session output out to any number of subscribers as
//! timestamped, JSON-serializable events.

use crate::application::ports::{PresentationSink, SessionOutput};
use crate::domain::call::CallEvent;
use crate::domain::presentation::PresentationState;
use crate::domain::shared::events::DomainEvent;
use crate::domain::shared::value_objects::{CallId, SipUri};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Presentation {
        state: PresentationState,
        timestamp: i64,
    },
    Call {
        event: CallEvent,
        call_id: CallId,
        timestamp: i64,
    },
    IncomingCall {
        call_id: CallId,
        remote: SipUri,
        timestamp: i64,
    },
    ReturnToDialer {
        transfer: bool,
        timestamp: i64,
    },
    SessionEnded {
        timestamp: i64,
    },
}

impl SessionEvent {
    pub fn from_output(output: SessionOutput) -> Self {
        let timestamp = chrono::Utc::now().timestamp();
        match output {
            SessionOutput::Presentation(state) => SessionEvent::Presentation { state, timestamp },
            SessionOutput::Call(event) => SessionEvent::Call {
                call_id: *event.call_id(),
                timestamp: event.occurred_at().timestamp(),
                event,
            },
            SessionOutput::IncomingCall { call_id, remote } => SessionEvent::IncomingCall {
                call_id,
                remote,
                timestamp,
            },
            SessionOutput::ReturnToDialer { transfer } => {
                SessionEvent::ReturnToDialer { transfer, timestamp }
            }
            SessionOutput::SessionEnded => SessionEvent::SessionEnded { timestamp },
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Event broadcaster
pub struct EventBroadcaster {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventBroadcaster {
    /// Create new event broadcaster with specified capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Broadcast an event
    pub fn broadcast(&self, event: SessionEvent) {
        if self.tx.receiver_count() == 0 {
            debug!("No subscribers, dropping event");
            return;
        }
        if let Err(e) = self.tx.send(event) {
            warn!("Failed to broadcast event: {}", e);
        }
    }

    /// Get number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl PresentationSink for EventBroadcaster {
    fn emit(&self, output: SessionOutput) {
        self.broadcast(SessionEvent::from_output(output));
    }
}
