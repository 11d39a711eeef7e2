//! Inputs funnelled through the session's single control context

use crate::domain::audio_route::AudioRoute;
use crate::domain::call::{CallParams, CallState};
use crate::domain::shared::value_objects::{CallId, SipUri};

/// Call-state notification, already translated into the session vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub struct CallStateNotification {
    pub call_id: CallId,
    pub remote: SipUri,
    /// `None` when the engine state carries no lifecycle change for the session
    pub state: Option<CallState>,
    pub message: String,
    pub params: CallParams,
    /// The engine's focused call after this transition
    pub current_call: Option<CallId>,
}

impl CallStateNotification {
    pub fn new(call_id: CallId, remote: SipUri, state: CallState) -> Self {
        Self {
            call_id,
            remote,
            state: Some(state),
            message: String::new(),
            params: CallParams::default(),
            current_call: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_params(mut self, params: CallParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_current(mut self, current_call: Option<CallId>) -> Self {
        self.current_call = current_call;
        self
    }
}

/// User actions from the call screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    ToggleMute,
    ToggleSpeaker,
    SelectRoute(AudioRoute),
    /// Toggle pause on the given leg, or the first leg when `None`
    PauseOrResume(Option<CallId>),
    Pause(CallId),
    Resume(CallId),
    HangUp,
    /// Merge every established leg into a conference
    EnterConference,
    /// Conference header: local party leaves or rejoins
    LeaveConferenceToggle,
    RemoveFromConference(CallId),
    AddCall,
    Transfer,
    /// Tap on the screen: show controls and restart the hide countdown
    ShowControls,
}

impl UserCommand {
    pub fn name(&self) -> &'static str {
        match self {
            UserCommand::ToggleMute => "toggle_mute",
            UserCommand::ToggleSpeaker => "toggle_speaker",
            UserCommand::SelectRoute(_) => "select_route",
            UserCommand::PauseOrResume(_) => "pause_or_resume",
            UserCommand::Pause(_) => "pause",
            UserCommand::Resume(_) => "resume",
            UserCommand::HangUp => "hang_up",
            UserCommand::EnterConference => "enter_conference",
            UserCommand::LeaveConferenceToggle => "leave_conference_toggle",
            UserCommand::RemoveFromConference(_) => "remove_from_conference",
            UserCommand::AddCall => "add_call",
            UserCommand::Transfer => "transfer",
            UserCommand::ShowControls => "show_controls",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionInput {
    CallState(CallStateNotification),
    BluetoothAvailability(bool),
    User(UserCommand),
    /// Deferred hide fired; stale generations are ignored
    ControlsTimeout { generation: u64 },
}

impl SessionInput {
    pub fn name(&self) -> &'static str {
        match self {
            SessionInput::CallState(_) => "call_state",
            SessionInput::BluetoothAvailability(_) => "bluetooth_availability",
            SessionInput::User(command) => command.name(),
            SessionInput::ControlsTimeout { .. } => "controls_timeout",
        }
    }
}
