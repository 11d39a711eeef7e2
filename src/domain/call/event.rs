//! Call leg domain events

use crate::domain::call::value_object::CallState;
use crate::domain::shared::events::{DomainEvent, EventMetadata};
use crate::domain::shared::value_objects::{CallId, SipUri};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Base struct for all call events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEventBase {
    pub metadata: EventMetadata,
    pub call_id: CallId,
}

impl CallEventBase {
    fn new(event_type: &str, call_id: CallId) -> Self {
        Self {
            metadata: EventMetadata::new(event_type),
            call_id,
        }
    }
}

/// Leg appeared in the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegCreated {
    pub base: CallEventBase,
    pub remote: SipUri,
    pub state: CallState,
}

/// Leg moved between lifecycle states
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChanged {
    pub base: CallEventBase,
    pub from: CallState,
    pub to: CallState,
    pub message: String,
}

/// Leg was flagged as a conference member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConferenceJoined {
    pub base: CallEventBase,
}

/// Leg lost its conference membership
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConferenceLeft {
    pub base: CallEventBase,
}

/// Leg was removed from the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegTerminated {
    pub base: CallEventBase,
    pub duration_seconds: Option<i64>,
}

/// Union of all call events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallEvent {
    LegCreated(LegCreated),
    StateChanged(StateChanged),
    ConferenceJoined(ConferenceJoined),
    ConferenceLeft(ConferenceLeft),
    LegTerminated(LegTerminated),
}

impl CallEvent {
    pub fn leg_created(call_id: CallId, remote: SipUri, state: CallState) -> Self {
        CallEvent::LegCreated(LegCreated {
            base: CallEventBase::new("call.leg_created", call_id),
            remote,
            state,
        })
    }

    pub fn state_changed(call_id: CallId, from: CallState, to: CallState, message: &str) -> Self {
        CallEvent::StateChanged(StateChanged {
            base: CallEventBase::new("call.state_changed", call_id),
            from,
            to,
            message: message.to_string(),
        })
    }

    pub fn conference_joined(call_id: CallId) -> Self {
        CallEvent::ConferenceJoined(ConferenceJoined {
            base: CallEventBase::new("call.conference_joined", call_id),
        })
    }

    pub fn conference_left(call_id: CallId) -> Self {
        CallEvent::ConferenceLeft(ConferenceLeft {
            base: CallEventBase::new("call.conference_left", call_id),
        })
    }

    pub fn leg_terminated(call_id: CallId, duration_seconds: Option<i64>) -> Self {
        CallEvent::LegTerminated(LegTerminated {
            base: CallEventBase::new("call.leg_terminated", call_id),
            duration_seconds,
        })
    }

    fn base(&self) -> &CallEventBase {
        match self {
            CallEvent::LegCreated(e) => &e.base,
            CallEvent::StateChanged(e) => &e.base,
            CallEvent::ConferenceJoined(e) => &e.base,
            CallEvent::ConferenceLeft(e) => &e.base,
            CallEvent::LegTerminated(e) => &e.base,
        }
    }

    pub fn call_id(&self) -> &CallId {
        &self.base().call_id
    }
}

impl DomainEvent for CallEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CallEvent::LegCreated(_) => "call.leg_created",
            CallEvent::StateChanged(_) => "call.state_changed",
            CallEvent::ConferenceJoined(_) => "call.conference_joined",
            CallEvent::ConferenceLeft(_) => "call.conference_left",
            CallEvent::LegTerminated(_) => "call.leg_terminated",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.base().metadata.occurred_at
    }
}
