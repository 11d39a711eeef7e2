//! Presentation state
//!
//! `reduce` derives the complete snapshot of what the in-call screen should
//! show from the session state. It is recomputed from scratch after every
//! processed event and has no side effects, so calling it twice is harmless.

use crate::domain::audio_route::{AudioRoute, AudioRoutePolicy};
use crate::domain::call::{Call, CallState};
use crate::domain::conference::ConferenceState;
use crate::domain::registry::SessionRegistry;
use crate::domain::shared::value_objects::CallId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Static capabilities of the device/account, from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub max_calls: usize,
    pub transfer_allowed: bool,
    pub options_disabled: bool,
    pub speaker_supported: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            max_calls: 4,
            transfer_allowed: true,
            options_disabled: false,
            speaker_supported: true,
        }
    }
}

/// Enablement of one control. `active` is the toggle highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Control {
    pub enabled: bool,
    pub visible: bool,
    pub active: bool,
}

impl Control {
    fn shown(enabled: bool) -> Self {
        Self {
            enabled,
            visible: true,
            active: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatusIcon {
    Paused,
    Ringing,
    RemoveFromConference,
    Play,
}

/// One row of the call list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRow {
    pub index: usize,
    pub call_id: CallId,
    pub remote: String,
    pub label: String,
    pub state: CallState,
    pub status_icon: CallStatusIcon,
    pub duration_seconds: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConferenceHeader {
    pub size: usize,
    pub local_joined: bool,
}

/// Route selection menu, shown instead of the speaker button when a headset exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RouteMenu {
    pub visible: bool,
    pub speaker_on: bool,
    pub earpiece_on: bool,
    pub bluetooth_on: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PresentationState {
    pub terminal: bool,
    pub controls_visible: bool,
    /// No focused call: controls are pinned visible
    pub audio_view: bool,
    /// `active` means the microphone is muted
    pub mute: Control,
    pub speaker: Control,
    pub route_menu: RouteMenu,
    pub add_call: Control,
    pub transfer: Control,
    pub options: Control,
    pub pause: Control,
    pub conference: Control,
    pub dialer: Control,
    pub hang_up: Control,
    pub conference_header: Option<ConferenceHeader>,
    pub calls: Vec<CallRow>,
}

/// View-local inputs that are not telephony state
#[derive(Debug, Clone, Copy)]
pub struct ViewContext {
    pub controls_visible: bool,
    pub now: DateTime<Utc>,
}

pub fn reduce(
    registry: &SessionRegistry,
    conference: &ConferenceState,
    route: &AudioRoutePolicy,
    muted: bool,
    capabilities: &Capabilities,
    view: &ViewContext,
) -> PresentationState {
    let count = registry.count();
    let actions_enabled = registry
        .calls()
        .iter()
        .any(|call| call.state().is_established());
    let bluetooth_available = route.is_bluetooth_available();
    let active_route = route.active();

    let mute = Control {
        active: muted,
        ..Control::shown(actions_enabled)
    };

    let speaker = Control {
        enabled: actions_enabled && capabilities.speaker_supported,
        visible: !bluetooth_available,
        active: active_route == AudioRoute::Speaker,
    };

    let route_menu = RouteMenu {
        visible: bluetooth_available,
        speaker_on: active_route == AudioRoute::Speaker,
        earpiece_on: active_route == AudioRoute::Earpiece,
        bluetooth_on: active_route == AudioRoute::Bluetooth,
    };

    let add_call = Control::shown(actions_enabled && count < capabilities.max_calls);
    let transfer = Control::shown(
        actions_enabled && capabilities.transfer_allowed && registry.current().is_some(),
    );
    let options = Control::shown(
        actions_enabled
            && !capabilities.options_disabled
            && (add_call.enabled || transfer.enabled),
    );

    let multiple_calls = count > 1;
    let conference_control = Control {
        enabled: actions_enabled,
        visible: multiple_calls,
        active: false,
    };
    let pause = Control {
        enabled: actions_enabled,
        visible: !multiple_calls,
        active: registry.count_in_state(CallState::Paused) == 1 && !conference.running,
    };

    let conference_header = conference.running.then(|| ConferenceHeader {
        size: conference.size,
        local_joined: conference.local_joined,
    });

    let offset = usize::from(conference_header.is_some());
    let calls = registry
        .calls()
        .iter()
        .enumerate()
        .map(|(index, call)| call_row(call, index + offset, conference, view.now))
        .collect();

    let audio_view = registry.current().is_none();

    PresentationState {
        terminal: registry.is_terminated(),
        controls_visible: view.controls_visible || audio_view,
        audio_view,
        mute,
        speaker,
        route_menu,
        add_call,
        transfer,
        options,
        pause,
        conference: conference_control,
        dialer: Control::shown(actions_enabled),
        hang_up: Control::shown(count > 0),
        conference_header,
        calls,
    }
}

fn call_row(call: &Call, index: usize, conference: &ConferenceState, now: DateTime<Utc>) -> CallRow {
    let state = call.state();
    let status_icon = if state.is_paused() {
        CallStatusIcon::Paused
    } else if state.is_outgoing_in_progress() {
        CallStatusIcon::Ringing
    } else if conference.running && call.is_conference_member() {
        CallStatusIcon::RemoveFromConference
    } else {
        CallStatusIcon::Play
    };

    CallRow {
        index,
        call_id: *call.id(),
        remote: call.remote().to_string(),
        label: call.remote().display_label(),
        state,
        status_icon,
        duration_seconds: call.duration_at(now),
    }
}
