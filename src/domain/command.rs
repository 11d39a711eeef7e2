//! Commands the session issues to the signaling engine

use crate::domain::audio_route::AudioRoute;
use crate::domain::call::CallParams;
use crate::domain::shared::value_objects::CallId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum SignalingCommand {
    MuteMic { muted: bool },
    PauseCall { call_id: CallId },
    ResumeCall { call_id: CallId },
    TerminateCall { call_id: CallId },
    TerminateConference,
    TerminateAll,
    AddAllToConference,
    RemoveFromConference { call_id: CallId },
    EnterConference,
    LeaveConference,
    AcceptCallUpdate { call_id: CallId, params: CallParams },
    RouteAudio { route: AudioRoute },
}

impl SignalingCommand {
    /// Stable label, used for logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            SignalingCommand::MuteMic { .. } => "mute_mic",
            SignalingCommand::PauseCall { .. } => "pause_call",
            SignalingCommand::ResumeCall { .. } => "resume_call",
            SignalingCommand::TerminateCall { .. } => "terminate_call",
            SignalingCommand::TerminateConference => "terminate_conference",
            SignalingCommand::TerminateAll => "terminate_all",
            SignalingCommand::AddAllToConference => "add_all_to_conference",
            SignalingCommand::RemoveFromConference { .. } => "remove_from_conference",
            SignalingCommand::EnterConference => "enter_conference",
            SignalingCommand::LeaveConference => "leave_conference",
            SignalingCommand::AcceptCallUpdate { .. } => "accept_call_update",
            SignalingCommand::RouteAudio { .. } => "route_audio",
        }
    }
}

impl fmt::Display for SignalingCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalingCommand::MuteMic { muted } => write!(f, "mute_mic({})", muted),
            SignalingCommand::PauseCall { call_id }
            | SignalingCommand::ResumeCall { call_id }
            | SignalingCommand::TerminateCall { call_id }
            | SignalingCommand::RemoveFromConference { call_id }
            | SignalingCommand::AcceptCallUpdate { call_id, .. } => {
                write!(f, "{}({})", self.name(), call_id)
            }
            SignalingCommand::RouteAudio { route } => write!(f, "route_audio({})", route),
            _ => f.write_str(self.name()),
        }
    }
}
