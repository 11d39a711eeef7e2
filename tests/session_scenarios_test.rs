//! Session scenario integration tests
//!
//! Drive a full controller with the recording engine and check the commands
//! it issues and the presentation it publishes.

use incall::application::{
    spawn_session, CallStateNotification, Outcome, PresentationSink, SessionController,
    SessionInput, SessionOutput, UserCommand,
};
use incall::domain::call::{CallEvent, CallState};
use incall::domain::presentation::{CallStatusIcon, PresentationState};
use incall::domain::shared::value_objects::{CallId, SipUri};
use incall::domain::{AudioRoute, Capabilities, DomainError, SignalingCommand};
use incall::infrastructure::signaling::{EngineCallState, EngineNotification, RecordingEngine};
use incall::interface::{EventBroadcaster, SessionEvent};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

#[derive(Default)]
struct Outputs {
    items: Mutex<Vec<SessionOutput>>,
}

impl Outputs {
    fn presentation(&self) -> PresentationState {
        self.items
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|output| match output {
                SessionOutput::Presentation(state) => Some(state.clone()),
                _ => None,
            })
            .expect("no presentation published")
    }

    fn conference_events(&self) -> usize {
        self.items
            .lock()
            .unwrap()
            .iter()
            .filter(|output| {
                matches!(
                    output,
                    SessionOutput::Call(CallEvent::ConferenceJoined(_))
                        | SessionOutput::Call(CallEvent::ConferenceLeft(_))
                )
            })
            .count()
    }

    fn session_ended_count(&self) -> usize {
        self.items
            .lock()
            .unwrap()
            .iter()
            .filter(|output| **output == SessionOutput::SessionEnded)
            .count()
    }
}

impl PresentationSink for Outputs {
    fn emit(&self, output: SessionOutput) {
        self.items.lock().unwrap().push(output);
    }
}

struct Harness {
    controller: SessionController,
    engine: Arc<RecordingEngine>,
    outputs: Arc<Outputs>,
}

impl Harness {
    fn new() -> Self {
        let engine = Arc::new(RecordingEngine::new());
        let outputs = Arc::new(Outputs::default());
        let controller = SessionController::new(
            engine.clone(),
            outputs.clone(),
            Capabilities::default(),
            AudioRoute::Earpiece,
            Some(Duration::from_secs(60)),
        );
        Self {
            controller,
            engine,
            outputs,
        }
    }

    async fn state(&mut self, id: CallId, user: &str, state: CallState) -> Outcome {
        self.state_with_current(id, user, state, Some(id)).await
    }

    async fn state_with_current(
        &mut self,
        id: CallId,
        user: &str,
        state: CallState,
        current: Option<CallId>,
    ) -> Outcome {
        let remote = SipUri::parse(&format!("sip:{}@example.com", user)).unwrap();
        self.controller
            .handle(SessionInput::CallState(
                CallStateNotification::new(id, remote, state).with_current(current),
            ))
            .await
    }

    async fn user(&mut self, command: UserCommand) -> Outcome {
        self.controller.handle(SessionInput::User(command)).await
    }

    async fn bluetooth(&mut self, available: bool) -> Outcome {
        self.controller
            .handle(SessionInput::BluetoothAvailability(available))
            .await
    }

    /// Two running legs, B focused, route commands discarded
    async fn two_running_legs() -> (Self, CallId, CallId) {
        let mut harness = Self::new();
        let (a, b) = (CallId::new(), CallId::new());
        harness.state(a, "alice", CallState::StreamsRunning).await;
        harness.state(b, "bob", CallState::StreamsRunning).await;
        harness.engine.take_commands().await;
        (harness, a, b)
    }
}

#[tokio::test]
async fn test_add_all_with_two_legs_starts_conference() {
    let (mut harness, _, _) = Harness::two_running_legs().await;

    assert_eq!(
        harness.user(UserCommand::EnterConference).await,
        Outcome::Applied
    );
    assert_eq!(
        harness.engine.take_commands().await,
        vec![SignalingCommand::AddAllToConference]
    );

    let conference = harness.controller.conference_state();
    assert_eq!(conference.size, 2);
    assert!(conference.running);
    assert!(conference.local_joined);

    let state = harness.outputs.presentation();
    let header = state.conference_header.unwrap();
    assert_eq!(header.size, 2);
    assert_eq!(state.calls[0].index, 1);
    assert_eq!(state.calls[1].index, 2);
}

#[tokio::test]
async fn test_removing_member_dissolves_two_party_conference() {
    let (mut harness, a, b) = Harness::two_running_legs().await;
    harness.user(UserCommand::EnterConference).await;
    harness.engine.take_commands().await;

    assert_eq!(
        harness.user(UserCommand::RemoveFromConference(b)).await,
        Outcome::Applied
    );
    assert_eq!(
        harness.engine.take_commands().await,
        vec![
            SignalingCommand::RemoveFromConference { call_id: b },
            SignalingCommand::LeaveConference,
        ]
    );

    let conference = harness.controller.conference_state();
    assert_eq!(conference.size, 0);
    assert!(!conference.running);
    assert!(!harness.controller.registry().get(&a).unwrap().is_conference_member());

    let state = harness.outputs.presentation();
    assert!(state.conference_header.is_none());
    assert_eq!(state.calls[0].call_id, a);
    assert_eq!(state.calls[0].status_icon, CallStatusIcon::Play);
    assert_eq!(state.calls[0].index, 0);
}

#[tokio::test]
async fn test_member_hang_up_dissolves_conference() {
    let (mut harness, a, b) = Harness::two_running_legs().await;
    harness.user(UserCommand::EnterConference).await;
    harness.engine.take_commands().await;

    harness.state_with_current(b, "bob", CallState::Terminated, None).await;
    assert_eq!(
        harness.engine.take_commands().await,
        vec![SignalingCommand::LeaveConference]
    );
    assert_eq!(harness.controller.registry().count(), 1);
    assert!(!harness.controller.registry().get(&a).unwrap().is_conference_member());
}

#[tokio::test]
async fn test_add_all_needs_two_established_legs() {
    let mut harness = Harness::new();
    let (a, b) = (CallId::new(), CallId::new());
    harness.state(a, "alice", CallState::StreamsRunning).await;
    harness.state(b, "bob", CallState::OutgoingRinging).await;
    harness.engine.take_commands().await;

    let outcome = harness.user(UserCommand::EnterConference).await;
    assert!(matches!(outcome, Outcome::Rejected(DomainError::NotAllowed(_))));
    assert!(harness.engine.commands().await.is_empty());
    assert!(harness.outputs.presentation().conference_header.is_none());
}

#[tokio::test]
async fn test_bluetooth_flapping_keeps_explicit_earpiece() {
    let mut harness = Harness::new();
    harness.state(CallId::new(), "alice", CallState::StreamsRunning).await;
    harness.engine.take_commands().await;

    harness.bluetooth(true).await;
    assert_eq!(harness.controller.route().active(), AudioRoute::Bluetooth);

    harness.user(UserCommand::SelectRoute(AudioRoute::Earpiece)).await;
    harness.bluetooth(false).await;
    harness.bluetooth(true).await;
    harness.bluetooth(false).await;
    harness.bluetooth(true).await;

    assert_eq!(harness.controller.route().active(), AudioRoute::Earpiece);
    assert_eq!(
        harness.engine.take_commands().await,
        vec![
            SignalingCommand::RouteAudio {
                route: AudioRoute::Bluetooth
            },
            SignalingCommand::RouteAudio {
                route: AudioRoute::Earpiece
            },
        ]
    );

    let state = harness.outputs.presentation();
    assert!(state.route_menu.visible);
    assert!(state.route_menu.earpiece_on);
    assert!(!state.speaker.visible);
}

#[tokio::test]
async fn test_bluetooth_select_rejected_while_unavailable() {
    let mut harness = Harness::new();
    harness.state(CallId::new(), "alice", CallState::StreamsRunning).await;
    harness.engine.take_commands().await;

    let outcome = harness
        .user(UserCommand::SelectRoute(AudioRoute::Bluetooth))
        .await;
    assert_eq!(
        outcome,
        Outcome::Rejected(DomainError::RouteUnavailable(AudioRoute::Bluetooth))
    );
    assert_eq!(harness.controller.route().active(), AudioRoute::Earpiece);
    assert!(harness.engine.commands().await.is_empty());
}

#[tokio::test]
async fn test_last_leg_gone_ends_session_once() {
    let mut harness = Harness::new();
    let a = CallId::new();
    harness.state(a, "alice", CallState::StreamsRunning).await;
    harness.user(UserCommand::ShowControls).await;
    assert!(harness.controller.controls().is_pending());

    let outcome = harness
        .state_with_current(a, "alice", CallState::Terminated, None)
        .await;
    assert_eq!(outcome, Outcome::SessionEnded);
    assert_eq!(harness.controller.controls().cancellations(), 1);
    assert!(!harness.controller.controls().is_pending());
    assert_eq!(harness.outputs.session_ended_count(), 1);
    assert!(harness.outputs.presentation().terminal);

    // Nothing reopens the session
    let late = harness.user(UserCommand::ToggleMute).await;
    assert_eq!(late, Outcome::Rejected(DomainError::SessionTerminated));
    harness.controller.shutdown();
    assert_eq!(harness.controller.controls().cancellations(), 1);
    assert_eq!(harness.outputs.session_ended_count(), 1);
}

#[tokio::test]
async fn test_pause_and_resume_are_idempotent() {
    let mut harness = Harness::new();
    let a = CallId::new();
    harness.state(a, "alice", CallState::StreamsRunning).await;
    harness.engine.take_commands().await;

    harness.user(UserCommand::Pause(a)).await;
    assert_eq!(
        harness.engine.take_commands().await,
        vec![SignalingCommand::PauseCall { call_id: a }]
    );
    // No optimistic update: the leg stays running until signaling says otherwise
    assert_eq!(
        harness.controller.registry().get(&a).unwrap().state(),
        CallState::StreamsRunning
    );

    harness.state(a, "alice", CallState::Paused).await;
    harness.user(UserCommand::Pause(a)).await;
    assert!(harness.engine.take_commands().await.is_empty());
    assert!(harness.outputs.presentation().pause.active);

    harness.user(UserCommand::PauseOrResume(None)).await;
    assert_eq!(
        harness.engine.take_commands().await,
        vec![SignalingCommand::ResumeCall { call_id: a }]
    );

    harness.state(a, "alice", CallState::StreamsRunning).await;
    harness.engine.take_commands().await;
    harness.user(UserCommand::Resume(a)).await;
    assert!(harness.engine.take_commands().await.is_empty());
}

#[tokio::test]
async fn test_remote_pause_cannot_be_resumed_locally() {
    let mut harness = Harness::new();
    let a = CallId::new();
    harness.state(a, "alice", CallState::StreamsRunning).await;
    harness.state(a, "alice", CallState::PausedByRemote).await;
    harness.engine.take_commands().await;

    assert_eq!(harness.user(UserCommand::Resume(a)).await, Outcome::Applied);
    assert!(harness.engine.commands().await.is_empty());
    assert!(!harness.outputs.presentation().pause.active);
}

#[tokio::test]
async fn test_hang_up_in_conference_without_focus() {
    let (mut harness, a, b) = Harness::two_running_legs().await;
    harness.user(UserCommand::EnterConference).await;
    harness.state_with_current(a, "alice", CallState::StreamsRunning, None).await;
    harness.engine.take_commands().await;

    harness.user(UserCommand::HangUp).await;
    assert_eq!(
        harness.engine.take_commands().await,
        vec![SignalingCommand::TerminateConference]
    );
    assert!(harness.controller.registry().contains(&b));
}

#[tokio::test]
async fn test_leave_and_rejoin_conference() {
    let (mut harness, _, _) = Harness::two_running_legs().await;
    harness.user(UserCommand::EnterConference).await;
    harness.engine.take_commands().await;

    harness.user(UserCommand::LeaveConferenceToggle).await;
    assert!(!harness.controller.conference_state().local_joined);
    assert!(harness.controller.conference_state().running);
    harness.user(UserCommand::LeaveConferenceToggle).await;
    assert!(harness.controller.conference_state().local_joined);

    assert_eq!(
        harness.engine.take_commands().await,
        vec![
            SignalingCommand::LeaveConference,
            SignalingCommand::EnterConference
        ]
    );
}

#[tokio::test]
async fn test_failed_update_acknowledgement_rolls_back() {
    let mut harness = Harness::new();
    let a = CallId::new();
    harness.state(a, "alice", CallState::StreamsRunning).await;
    harness.engine.fail_on("accept_call_update").await;

    let outcome = harness.state(a, "alice", CallState::CallUpdatedByRemote).await;
    assert_eq!(outcome, Outcome::Applied);
    assert_eq!(
        harness.controller.registry().get(&a).unwrap().state(),
        CallState::StreamsRunning
    );
}

#[tokio::test]
async fn test_mute_follows_engine() {
    let mut harness = Harness::new();
    harness.state(CallId::new(), "alice", CallState::StreamsRunning).await;

    harness.user(UserCommand::ToggleMute).await;
    assert!(harness.controller.is_muted());
    assert!(harness.outputs.presentation().mute.active);

    harness.user(UserCommand::ToggleMute).await;
    assert!(!harness.controller.is_muted());
}

#[tokio::test]
async fn test_spawned_session_runs_to_completion() {
    let engine = Arc::new(RecordingEngine::new());
    let broadcaster = Arc::new(EventBroadcaster::new(64));
    let mut events = broadcaster.subscribe();
    let controller = SessionController::new(
        engine.clone(),
        broadcaster.clone(),
        Capabilities::default(),
        AudioRoute::Speaker,
        None,
    );
    let (session, task) = spawn_session(controller, 8);

    let a = CallId::new();
    let remote = SipUri::parse("sip:alice@example.com").unwrap();
    let engine_notification = |state| EngineNotification {
        call_id: a,
        remote: remote.clone(),
        state,
        message: String::new(),
        params: Default::default(),
        current_call: Some(a),
    };

    assert_ok!(
        session
            .notify_call_state(engine_notification(EngineCallState::IncomingReceived).translate())
            .await
    );
    assert_ok!(
        session
            .notify_call_state(engine_notification(EngineCallState::StreamsRunning).translate())
            .await
    );
    assert_ok!(session.command(UserCommand::ToggleSpeaker).await);
    assert_ok!(
        session
            .notify_call_state(engine_notification(EngineCallState::CallEnd).translate())
            .await
    );

    let controller = task.await.unwrap();
    assert!(controller.is_terminated());
    assert!(session.is_closed());
    assert_err!(session.command(UserCommand::HangUp).await);

    assert_eq!(
        engine.commands().await,
        vec![
            SignalingCommand::RouteAudio {
                route: AudioRoute::Speaker
            },
            SignalingCommand::RouteAudio {
                route: AudioRoute::Earpiece
            },
        ]
    );

    let mut saw_incoming = false;
    let mut saw_end = false;
    while let Ok(event) = events.try_recv() {
        match event {
            SessionEvent::IncomingCall { call_id, .. } => saw_incoming = call_id == a,
            SessionEvent::SessionEnded { .. } => saw_end = true,
            _ => {}
        }
    }
    assert!(saw_incoming);
    assert!(saw_end);
}

fn refused(outcome: &Outcome) -> bool {
    matches!(outcome, Outcome::Rejected(DomainError::Signaling(_)))
}

#[tokio::test]
async fn test_refused_speaker_toggle_keeps_route() {
    let mut harness = Harness::new();
    harness.state(CallId::new(), "alice", CallState::StreamsRunning).await;
    harness.engine.fail_on("route_audio").await;

    let outcome = harness.user(UserCommand::ToggleSpeaker).await;
    assert!(refused(&outcome));
    assert_eq!(harness.controller.route().active(), AudioRoute::Earpiece);
    assert!(!harness.outputs.presentation().speaker.active);

    harness.engine.recover("route_audio").await;
    assert_eq!(
        harness.user(UserCommand::ToggleSpeaker).await,
        Outcome::Applied
    );
    assert_eq!(harness.controller.route().active(), AudioRoute::Speaker);
}

#[tokio::test]
async fn test_refused_route_selection_keeps_auto_bluetooth() {
    let mut harness = Harness::new();
    harness.state(CallId::new(), "alice", CallState::StreamsRunning).await;
    harness.bluetooth(true).await;
    harness.engine.fail_on("route_audio").await;

    let outcome = harness
        .user(UserCommand::SelectRoute(AudioRoute::Speaker))
        .await;
    assert!(refused(&outcome));
    assert_eq!(harness.controller.route().active(), AudioRoute::Bluetooth);
    assert!(harness.outputs.presentation().route_menu.bluetooth_on);

    // The refused choice does not count as explicit: the headset is
    // picked up again after it flaps
    harness.engine.recover("route_audio").await;
    harness.bluetooth(false).await;
    harness.bluetooth(true).await;
    assert_eq!(harness.controller.route().active(), AudioRoute::Bluetooth);
}

#[tokio::test]
async fn test_refused_headset_switch_keeps_route() {
    let mut harness = Harness::new();
    harness.state(CallId::new(), "alice", CallState::StreamsRunning).await;
    harness.engine.fail_on("route_audio").await;

    assert_eq!(harness.bluetooth(true).await, Outcome::Applied);
    assert_eq!(harness.controller.route().active(), AudioRoute::Earpiece);
    assert!(harness.controller.route().is_bluetooth_available());

    let state = harness.outputs.presentation();
    assert!(state.route_menu.visible);
    assert!(state.route_menu.earpiece_on);
}

#[tokio::test]
async fn test_refused_merge_leaves_no_conference() {
    let (mut harness, a, b) = Harness::two_running_legs().await;
    harness.engine.fail_on("add_all_to_conference").await;

    let outcome = harness.user(UserCommand::EnterConference).await;
    assert!(refused(&outcome));

    let conference = harness.controller.conference_state();
    assert_eq!(conference.size, 0);
    assert!(!conference.running);
    assert!(!conference.local_joined);
    for id in [a, b] {
        assert!(!harness.controller.registry().get(&id).unwrap().is_conference_member());
    }
    assert!(harness.outputs.presentation().conference_header.is_none());
    assert_eq!(harness.outputs.conference_events(), 0);
}

#[tokio::test]
async fn test_refused_removal_keeps_conference() {
    let (mut harness, a, b) = Harness::two_running_legs().await;
    harness.user(UserCommand::EnterConference).await;
    harness.engine.fail_on("remove_from_conference").await;
    harness.engine.take_commands().await;
    let joined = harness.outputs.conference_events();

    let outcome = harness.user(UserCommand::RemoveFromConference(b)).await;
    assert!(refused(&outcome));

    let conference = harness.controller.conference_state();
    assert_eq!(conference.size, 2);
    assert!(conference.local_joined);
    assert!(harness.controller.registry().get(&a).unwrap().is_conference_member());
    assert!(harness.controller.registry().get(&b).unwrap().is_conference_member());
    assert_eq!(harness.outputs.presentation().conference_header.unwrap().size, 2);
    assert_eq!(harness.outputs.conference_events(), joined);
    // Nothing reached the engine, so no auto-leave was sent either
    assert!(harness.engine.commands().await.is_empty());
}

#[tokio::test]
async fn test_refused_pause_of_member_keeps_conference() {
    let (mut harness, a, _) = Harness::two_running_legs().await;
    harness.user(UserCommand::EnterConference).await;
    harness.engine.fail_on("remove_from_conference").await;

    let outcome = harness.user(UserCommand::Pause(a)).await;
    assert!(refused(&outcome));
    assert!(harness.controller.registry().get(&a).unwrap().is_conference_member());
    assert!(harness.controller.conference_state().running);
}

#[tokio::test]
async fn test_refused_auto_leave_still_dissolves_locally() {
    let (mut harness, a, b) = Harness::two_running_legs().await;
    harness.user(UserCommand::EnterConference).await;
    harness.engine.fail_on("leave_conference").await;
    harness.engine.take_commands().await;

    assert_eq!(
        harness.user(UserCommand::RemoveFromConference(b)).await,
        Outcome::Applied
    );
    assert_eq!(
        harness.engine.take_commands().await,
        vec![SignalingCommand::RemoveFromConference { call_id: b }]
    );
    assert!(!harness.controller.conference_state().running);
    assert!(!harness.controller.registry().get(&a).unwrap().is_conference_member());
}

#[tokio::test]
async fn test_refused_leave_toggle_keeps_local_party_joined() {
    let (mut harness, _, _) = Harness::two_running_legs().await;
    harness.user(UserCommand::EnterConference).await;
    harness.engine.fail_on("leave_conference").await;

    let outcome = harness.user(UserCommand::LeaveConferenceToggle).await;
    assert!(refused(&outcome));
    assert!(harness.controller.conference_state().local_joined);
    assert!(harness.outputs.presentation().conference_header.unwrap().local_joined);
}
