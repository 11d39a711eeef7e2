//! Conference coordinator
//!
//! Conference size is never stored: it is the number of legs flagged as
//! members in the registry. A conference is running iff it has more than one
//! member, and every mutation ends by enforcing that a lone member is never
//! left flagged.

use crate::domain::command::SignalingCommand;
use crate::domain::registry::SessionRegistry;
use crate::domain::shared::error::{DomainError, Result};
use crate::domain::shared::value_objects::CallId;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Derived conference snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConferenceState {
    pub size: usize,
    pub running: bool,
    /// Local party is mixed into the conference (header shows "pause")
    pub local_joined: bool,
}

/// Membership as it was before a change, so a refused change can be undone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipSnapshot {
    local_joined: bool,
    members: Vec<CallId>,
}

#[derive(Debug, Default)]
pub struct ConferenceCoordinator {
    local_joined: bool,
}

impl ConferenceCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, registry: &SessionRegistry) -> ConferenceState {
        let size = registry
            .calls()
            .iter()
            .filter(|call| call.is_conference_member())
            .count();
        let running = size > 1;

        ConferenceState {
            size,
            running,
            local_joined: running && self.local_joined,
        }
    }

    pub fn snapshot(&self, registry: &SessionRegistry) -> MembershipSnapshot {
        MembershipSnapshot {
            local_joined: self.local_joined,
            members: registry
                .calls()
                .iter()
                .filter(|call| call.is_conference_member())
                .map(|call| *call.id())
                .collect(),
        }
    }

    /// Undo membership changes the engine refused. Legs that left the
    /// registry in the meantime are skipped. Pending join/leave events from
    /// the undone change are discarded by the caller.
    pub fn restore(&mut self, registry: &mut SessionRegistry, snapshot: &MembershipSnapshot) {
        for call in registry.calls_mut() {
            let member = snapshot.members.contains(call.id());
            call.revert_conference_member(member);
        }
        self.local_joined = snapshot.local_joined;
        debug!(
            "Conference membership restored ({} members)",
            snapshot.members.len()
        );
    }

    /// Merge every established leg into the conference.
    pub fn add_all_to_conference(
        &mut self,
        registry: &mut SessionRegistry,
    ) -> Result<Vec<SignalingCommand>> {
        let eligible: Vec<CallId> = registry
            .calls()
            .iter()
            .filter(|call| call.state().is_established())
            .map(|call| *call.id())
            .collect();

        if eligible.len() < 2 {
            return Err(DomainError::NotAllowed(format!(
                "conference needs at least two established calls, have {}",
                eligible.len()
            )));
        }

        for id in &eligible {
            if let Some(call) = registry.get_mut(id) {
                call.set_conference_member(true);
            }
        }
        self.local_joined = true;
        info!("Merged {} calls into conference", eligible.len());

        let mut commands = vec![SignalingCommand::AddAllToConference];
        commands.extend(self.enforce(registry));
        Ok(commands)
    }

    /// Take one leg out of the conference.
    pub fn remove_from_conference(
        &mut self,
        registry: &mut SessionRegistry,
        id: &CallId,
    ) -> Result<Vec<SignalingCommand>> {
        let call = registry.get_mut(id).ok_or(DomainError::CallNotFound(*id))?;

        if !call.set_conference_member(false) {
            return Err(DomainError::NotAllowed(format!(
                "call {} is not in the conference",
                id
            )));
        }
        info!("Call {} removed from conference", id);

        let mut commands = vec![SignalingCommand::RemoveFromConference { call_id: *id }];
        commands.extend(self.enforce(registry));
        Ok(commands)
    }

    /// Local party rejoins a running conference. Other members are untouched.
    pub fn enter_conference(&mut self, registry: &SessionRegistry) -> Result<Vec<SignalingCommand>> {
        if !self.state(registry).running {
            return Err(DomainError::NotAllowed("no conference is running".to_string()));
        }
        if self.local_joined {
            return Ok(Vec::new());
        }

        self.local_joined = true;
        info!("Entered conference");
        Ok(vec![SignalingCommand::EnterConference])
    }

    /// Local party steps out of the conference. Other members stay merged.
    pub fn leave_conference(&mut self) -> Vec<SignalingCommand> {
        if !self.local_joined {
            return Vec::new();
        }

        self.local_joined = false;
        info!("Left conference");
        vec![SignalingCommand::LeaveConference]
    }

    /// Header toggle: leave if joined, enter otherwise.
    pub fn toggle_local_participation(
        &mut self,
        registry: &SessionRegistry,
    ) -> Result<Vec<SignalingCommand>> {
        if !self.state(registry).running {
            return Err(DomainError::NotAllowed("no conference is running".to_string()));
        }

        if self.local_joined {
            Ok(self.leave_conference())
        } else {
            self.enter_conference(registry)
        }
    }

    /// Auto-leave: a conference with at most one member is dissolved.
    pub fn enforce(&mut self, registry: &mut SessionRegistry) -> Vec<SignalingCommand> {
        if self.state(registry).running {
            return Vec::new();
        }

        let mut changed = false;
        for call in registry.calls_mut() {
            if call.set_conference_member(false) {
                debug!("Call {} is the last conference member, unflagging", call.id());
                changed = true;
            }
        }
        if self.local_joined {
            self.local_joined = false;
            changed = true;
        }

        if changed {
            info!("Conference dissolved, leaving");
            vec![SignalingCommand::LeaveConference]
        } else {
            Vec::new()
        }
    }
}
