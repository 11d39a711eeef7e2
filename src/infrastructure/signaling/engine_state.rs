//! Engine call-state vocabulary
//!
//! The signaling engine reports a richer set of states than the session
//! tracks. Early-media variants collapse onto their ringing counterparts,
//! and every end-of-life state becomes `Terminated`. States that carry no
//! lifecycle change (re-INVITE bookkeeping, transfer notifications) map to
//! `None`.

use crate::application::input::CallStateNotification;
use crate::domain::call::{CallParams, CallState};
use crate::domain::shared::value_objects::{CallId, SipUri};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineCallState {
    Idle,
    IncomingReceived,
    IncomingEarlyMedia,
    OutgoingInit,
    OutgoingProgress,
    OutgoingRinging,
    OutgoingEarlyMedia,
    Connected,
    StreamsRunning,
    Pausing,
    Paused,
    Resuming,
    PausedByRemote,
    Refered,
    Updating,
    UpdatedByRemote,
    EarlyUpdating,
    EarlyUpdatedByRemote,
    Error,
    CallEnd,
    Released,
}

impl EngineCallState {
    pub fn to_session_state(self) -> Option<CallState> {
        match self {
            EngineCallState::IncomingReceived | EngineCallState::IncomingEarlyMedia => {
                Some(CallState::IncomingReceived)
            }
            EngineCallState::OutgoingInit => Some(CallState::OutgoingInit),
            EngineCallState::OutgoingProgress => Some(CallState::OutgoingProgress),
            EngineCallState::OutgoingRinging | EngineCallState::OutgoingEarlyMedia => {
                Some(CallState::OutgoingRinging)
            }
            EngineCallState::StreamsRunning => Some(CallState::StreamsRunning),
            EngineCallState::Pausing => Some(CallState::Pausing),
            EngineCallState::Paused => Some(CallState::Paused),
            EngineCallState::PausedByRemote => Some(CallState::PausedByRemote),
            EngineCallState::UpdatedByRemote => Some(CallState::CallUpdatedByRemote),
            EngineCallState::Error | EngineCallState::CallEnd | EngineCallState::Released => {
                Some(CallState::Terminated)
            }
            EngineCallState::Idle
            | EngineCallState::Connected
            | EngineCallState::Resuming
            | EngineCallState::Refered
            | EngineCallState::Updating
            | EngineCallState::EarlyUpdating
            | EngineCallState::EarlyUpdatedByRemote => None,
        }
    }

    pub fn is_end_of_life(self) -> bool {
        matches!(
            self,
            EngineCallState::Error | EngineCallState::CallEnd | EngineCallState::Released
        )
    }
}

/// Raw notification as delivered by the engine callback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineNotification {
    pub call_id: CallId,
    pub remote: SipUri,
    pub state: EngineCallState,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub params: CallParams,
    #[serde(default)]
    pub current_call: Option<CallId>,
}

impl EngineNotification {
    pub fn translate(self) -> CallStateNotification {
        CallStateNotification {
            call_id: self.call_id,
            remote: self.remote,
            state: self.state.to_session_state(),
            message: self.message,
            params: self.params,
            current_call: self.current_call,
        }
    }
}
