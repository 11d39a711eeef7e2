//! Call value objects

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a single call leg.
///
/// This is the session's own vocabulary; signaling engine states are
/// translated into it at the boundary (see `infrastructure::signaling`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallState {
    /// Outgoing call created, nothing sent yet
    OutgoingInit,
    /// Outgoing call in progress
    OutgoingProgress,
    /// Remote party is being alerted
    OutgoingRinging,
    /// Incoming call waiting to be answered
    IncomingReceived,
    /// Media is flowing
    StreamsRunning,
    /// Local pause requested, not yet confirmed
    Pausing,
    /// Paused locally
    Paused,
    /// Paused by the remote party
    PausedByRemote,
    /// Remote party proposed new parameters; must be acknowledged
    CallUpdatedByRemote,
    /// Leg is gone
    Terminated,
}

impl CallState {
    /// Check if state transition is expected
    pub fn can_transition_to(&self, new_state: &CallState) -> bool {
        use CallState::*;

        if self == new_state {
            return !matches!(self, Terminated);
        }

        match (self, new_state) {
            // Can't transition from Terminated
            (Terminated, _) => false,

            // Any live state may terminate
            (_, Terminated) => true,

            // From outgoing setup
            (OutgoingInit, OutgoingProgress | OutgoingRinging | StreamsRunning) => true,
            (OutgoingProgress, OutgoingRinging | StreamsRunning) => true,
            (OutgoingRinging, StreamsRunning) => true,

            // From IncomingReceived
            (IncomingReceived, StreamsRunning) => true,

            // From StreamsRunning
            (StreamsRunning, Pausing | Paused | PausedByRemote | CallUpdatedByRemote) => true,

            // From the paused family
            (Pausing, Paused | StreamsRunning) => true,
            (Paused, StreamsRunning | CallUpdatedByRemote) => true,
            (PausedByRemote, StreamsRunning | Pausing | Paused | CallUpdatedByRemote) => true,

            // From CallUpdatedByRemote
            (CallUpdatedByRemote, StreamsRunning | Paused | PausedByRemote) => true,

            // All other transitions are unexpected
            _ => false,
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, CallState::Terminated)
    }

    /// Media flowing, the leg can be paused or conferenced
    pub fn is_running(&self) -> bool {
        matches!(self, CallState::StreamsRunning)
    }

    /// Any of the paused states, local or remote
    pub fn is_paused(&self) -> bool {
        matches!(
            self,
            CallState::Pausing | CallState::Paused | CallState::PausedByRemote
        )
    }

    /// Outgoing call still being set up
    pub fn is_outgoing_in_progress(&self) -> bool {
        matches!(
            self,
            CallState::OutgoingInit | CallState::OutgoingProgress | CallState::OutgoingRinging
        )
    }

    /// The leg has been answered at some point and is still alive
    pub fn is_established(&self) -> bool {
        matches!(
            self,
            CallState::StreamsRunning
                | CallState::Pausing
                | CallState::Paused
                | CallState::PausedByRemote
                | CallState::CallUpdatedByRemote
        )
    }

    /// Get state name
    pub fn name(&self) -> &'static str {
        match self {
            CallState::OutgoingInit => "OutgoingInit",
            CallState::OutgoingProgress => "OutgoingProgress",
            CallState::OutgoingRinging => "OutgoingRinging",
            CallState::IncomingReceived => "IncomingReceived",
            CallState::StreamsRunning => "StreamsRunning",
            CallState::Pausing => "Pausing",
            CallState::Paused => "Paused",
            CallState::PausedByRemote => "PausedByRemote",
            CallState::CallUpdatedByRemote => "CallUpdatedByRemote",
            CallState::Terminated => "Terminated",
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Negotiated parameters of a call leg, as last reported by signaling.
///
/// Echoed back verbatim when acknowledging a remote update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallParams {
    pub audio_codec: Option<String>,
    pub video_enabled: bool,
    pub low_bandwidth: bool,
    pub media_encryption: Option<String>,
}
