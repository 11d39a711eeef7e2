//! Call leg aggregate

use crate::domain::call::event::CallEvent;
use crate::domain::call::value_object::{CallParams, CallState};
use crate::domain::shared::error::{DomainError, Result};
use crate::domain::shared::value_objects::{CallId, SipUri};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One signaling leg as seen by the session.
///
/// Signaling is the source of truth for the lifecycle state, so `apply_state`
/// accepts unexpected transitions and only logs them. The only hard rule is
/// that a terminated leg never comes back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    id: CallId,
    remote: SipUri,
    state: CallState,
    conference_member: bool,
    params: CallParams,
    created_at: DateTime<Utc>,
    /// First time media started flowing
    established_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    events: Vec<CallEvent>,
}

impl Call {
    pub fn new(id: CallId, remote: SipUri, state: CallState) -> Self {
        let mut call = Self {
            id,
            remote: remote.clone(),
            state,
            conference_member: false,
            params: CallParams::default(),
            created_at: Utc::now(),
            established_at: None,
            events: Vec::new(),
        };

        if state.is_running() {
            call.established_at = Some(call.created_at);
        }

        call.record_event(CallEvent::leg_created(id, remote, state));
        call
    }

    /// Move the leg to a new lifecycle state, returning the previous one.
    pub fn apply_state(&mut self, new_state: CallState, message: &str) -> Result<CallState> {
        if !self.state.is_active() {
            return Err(DomainError::InvalidStateTransition(format!(
                "Call {} is already terminated",
                self.id
            )));
        }

        let previous = self.state;
        if previous == new_state {
            return Ok(previous);
        }

        if !previous.can_transition_to(&new_state) {
            warn!(
                "Call {} unexpected transition {} -> {}, following signaling",
                self.id, previous, new_state
            );
        }

        self.state = new_state;
        if new_state.is_running() && self.established_at.is_none() {
            self.established_at = Some(Utc::now());
        }
        if !new_state.is_active() {
            self.conference_member = false;
        }

        self.record_event(CallEvent::state_changed(self.id, previous, new_state, message));
        Ok(previous)
    }

    /// Flag or unflag conference membership. Returns true if it changed.
    pub fn set_conference_member(&mut self, member: bool) -> bool {
        if self.conference_member == member {
            return false;
        }

        self.conference_member = member;
        let event = if member {
            CallEvent::conference_joined(self.id)
        } else {
            CallEvent::conference_left(self.id)
        };
        self.record_event(event);
        true
    }

    /// Put the flag back after a refused conference change, without an event
    pub(crate) fn revert_conference_member(&mut self, member: bool) {
        self.conference_member = member;
    }

    pub fn update_params(&mut self, params: CallParams) {
        self.params = params;
    }

    /// Seconds since media first flowed, as of `now`
    pub fn duration_at(&self, now: DateTime<Utc>) -> Option<i64> {
        self.established_at
            .map(|established| (now - established).num_seconds().max(0))
    }

    pub fn duration(&self) -> Option<i64> {
        self.duration_at(Utc::now())
    }

    fn record_event(&mut self, event: CallEvent) {
        self.events.push(event);
    }

    /// Take all pending events
    pub fn take_events(&mut self) -> Vec<CallEvent> {
        std::mem::take(&mut self.events)
    }

    // Getters
    pub fn id(&self) -> &CallId {
        &self.id
    }

    pub fn remote(&self) -> &SipUri {
        &self.remote
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn is_conference_member(&self) -> bool {
        self.conference_member
    }

    pub fn params(&self) -> &CallParams {
        &self.params
    }

    pub fn established_at(&self) -> Option<&DateTime<Utc>> {
        self.established_at.as_ref()
    }
}
