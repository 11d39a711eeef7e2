//! Session registry - the authoritative collection of call legs
//!
//! Insertion order is display order. The current call, if any, always refers
//! to a leg in the collection. Once the last leg is removed the session is
//! terminal and further mutation is refused.

use crate::domain::call::{Call, CallEvent, CallState};
use crate::domain::shared::error::{DomainError, Result};
use crate::domain::shared::value_objects::CallId;
use tracing::{debug, info};

/// Result of removing a leg
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegRemoval {
    /// Other legs remain
    Remaining(usize),
    /// That was the last leg; the session is over
    SessionEnded,
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    calls: Vec<Call>,
    current: Option<CallId>,
    terminated: bool,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_leg_created(&mut self, call: Call) -> Result<()> {
        self.ensure_live()?;

        if self.contains(call.id()) {
            return Err(DomainError::AlreadyExists(format!("call {}", call.id())));
        }

        info!("Call {} added ({} -> {})", call.id(), call.remote(), call.state());
        self.calls.push(call);
        Ok(())
    }

    /// Remove a leg. Returns the removed leg and whether the session ended.
    pub fn on_leg_removed(&mut self, id: &CallId) -> Result<(Call, LegRemoval)> {
        self.ensure_live()?;

        let index = self
            .calls
            .iter()
            .position(|call| call.id() == id)
            .ok_or(DomainError::CallNotFound(*id))?;
        let call = self.calls.remove(index);

        if self.current.as_ref() == Some(id) {
            self.current = None;
        }

        if self.calls.is_empty() {
            self.terminated = true;
            info!("Last call {} removed, session terminated", id);
            return Ok((call, LegRemoval::SessionEnded));
        }

        debug!("Call {} removed, {} remaining", id, self.calls.len());
        Ok((call, LegRemoval::Remaining(self.calls.len())))
    }

    pub fn set_current(&mut self, id: Option<CallId>) -> Result<()> {
        self.ensure_live()?;

        if let Some(id) = &id {
            if !self.contains(id) {
                return Err(DomainError::CallNotFound(*id));
            }
        }

        if self.current != id {
            debug!("Current call changed: {:?} -> {:?}", self.current, id);
        }
        self.current = id;
        Ok(())
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn count(&self) -> usize {
        self.calls.len()
    }

    pub fn current(&self) -> Option<&Call> {
        self.current.as_ref().and_then(|id| self.get(id))
    }

    pub fn get(&self, id: &CallId) -> Option<&Call> {
        self.calls.iter().find(|call| call.id() == id)
    }

    pub fn get_mut(&mut self, id: &CallId) -> Option<&mut Call> {
        self.calls.iter_mut().find(|call| call.id() == id)
    }

    pub fn calls_mut(&mut self) -> impl Iterator<Item = &mut Call> {
        self.calls.iter_mut()
    }

    pub fn contains(&self, id: &CallId) -> bool {
        self.get(id).is_some()
    }

    pub fn first(&self) -> Option<&Call> {
        self.calls.first()
    }

    pub fn count_in_state(&self, state: CallState) -> usize {
        self.calls.iter().filter(|call| call.state() == state).count()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Drain pending domain events from every leg, in display order
    pub fn take_events(&mut self) -> Vec<CallEvent> {
        self.calls.iter_mut().flat_map(|call| call.take_events()).collect()
    }

    fn ensure_live(&self) -> Result<()> {
        if self.terminated {
            return Err(DomainError::SessionTerminated);
        }
        Ok(())
    }
}
