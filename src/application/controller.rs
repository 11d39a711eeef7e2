//! Session controller
//!
//! Owns every piece of mutable session state (registry, conference, route,
//! mute, controls visibility) and applies one input at a time. After each
//! input, processed or rejected, the full presentation snapshot is
//! recomputed and published.

use crate::application::controls::ControlsTimer;
use crate::application::input::{CallStateNotification, SessionInput, UserCommand};
use crate::application::ports::{PresentationSink, SessionOutput, SignalingEngine};
use crate::domain::audio_route::{AudioRoute, AudioRoutePolicy};
use crate::domain::call::{Call, CallEvent, CallState};
use crate::domain::command::SignalingCommand;
use crate::domain::conference::{ConferenceCoordinator, ConferenceState, MembershipSnapshot};
use crate::domain::presentation::{reduce, Capabilities, PresentationState, ViewContext};
use crate::domain::registry::{LegRemoval, SessionRegistry};
use crate::domain::shared::error::{DomainError, Result};
use crate::domain::shared::events::DomainEvent;
use crate::domain::shared::value_objects::CallId;
use chrono::Utc;
use metrics::{counter, gauge};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// What happened to one input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// Documented no-op; state is unchanged
    Rejected(DomainError),
    /// The last leg is gone; no further input is accepted
    SessionEnded,
}

pub struct SessionController {
    registry: SessionRegistry,
    conference: ConferenceCoordinator,
    route: AudioRoutePolicy,
    muted: bool,
    capabilities: Capabilities,
    controls: ControlsTimer,
    engine: Arc<dyn SignalingEngine>,
    sink: Arc<dyn PresentationSink>,
}

impl SessionController {
    pub fn new(
        engine: Arc<dyn SignalingEngine>,
        sink: Arc<dyn PresentationSink>,
        capabilities: Capabilities,
        initial_route: AudioRoute,
        controls_hide_delay: Option<Duration>,
    ) -> Self {
        Self {
            registry: SessionRegistry::new(),
            conference: ConferenceCoordinator::new(),
            route: AudioRoutePolicy::new(initial_route),
            muted: false,
            capabilities,
            controls: ControlsTimer::new(controls_hide_delay),
            engine,
            sink,
        }
    }

    /// Deferred timeouts are posted back through this sender
    pub fn attach_scheduler(&mut self, notifier: mpsc::WeakSender<SessionInput>) {
        self.controls.attach(notifier);
    }

    pub async fn handle(&mut self, input: SessionInput) -> Outcome {
        if self.registry.is_terminated() {
            warn!("Session already terminated, dropping {}", input.name());
            return Outcome::Rejected(DomainError::SessionTerminated);
        }

        let name = input.name();
        let result = match input {
            SessionInput::CallState(notification) => self.on_call_state(notification).await,
            SessionInput::BluetoothAvailability(available) => {
                self.on_bluetooth_availability(available).await
            }
            SessionInput::User(command) => {
                counter!("incall_commands_total", "command" => name).increment(1);
                self.on_user_command(command).await
            }
            SessionInput::ControlsTimeout { generation } => {
                self.controls.on_timeout(generation);
                Ok(())
            }
        };

        self.flush_call_events();
        gauge!("incall_active_legs").set(self.registry.count() as f64);

        if self.registry.is_terminated() {
            self.teardown();
            return Outcome::SessionEnded;
        }

        if self.registry.current().is_none() {
            self.controls.pin_visible();
        }
        self.publish();

        match result {
            Ok(()) => Outcome::Applied,
            Err(e) => {
                warn!("Rejected {}: {}", name, e);
                counter!("incall_commands_rejected_total", "command" => name).increment(1);
                Outcome::Rejected(e)
            }
        }
    }

    async fn on_call_state(&mut self, notification: CallStateNotification) -> Result<()> {
        let CallStateNotification {
            call_id,
            remote,
            state,
            message,
            params,
            current_call,
        } = notification;

        let Some(new_state) = state else {
            debug!("Call {} bookkeeping notification: {}", call_id, message);
            self.sync_current(current_call);
            return Ok(());
        };
        counter!("incall_notifications_total", "state" => new_state.name()).increment(1);

        let previous = if !self.registry.contains(&call_id) {
            if new_state == CallState::Terminated {
                debug!("Ignoring termination of unknown call {}", call_id);
                return Ok(());
            }
            let mut call = Call::new(call_id, remote.clone(), new_state);
            call.update_params(params);
            self.registry.on_leg_created(call)?;
            None
        } else if new_state == CallState::Terminated {
            self.remove_leg(&call_id, &message).await?;
            if !self.registry.is_terminated() {
                self.sync_current(current_call);
            }
            return Ok(());
        } else {
            let call = self
                .registry
                .get_mut(&call_id)
                .ok_or(DomainError::CallNotFound(call_id))?;
            call.update_params(params);
            let previous = call.apply_state(new_state, &message)?;
            if previous == new_state {
                self.sync_current(current_call);
                return Ok(());
            }
            Some(previous)
        };

        self.sync_current(current_call);

        match new_state {
            CallState::IncomingReceived => {
                info!("Incoming call {} from {}", call_id, remote);
                self.sink.emit(SessionOutput::IncomingCall { call_id, remote });
            }
            CallState::StreamsRunning => {
                let route = self.route.active();
                if let Err(e) = self.execute(SignalingCommand::RouteAudio { route }).await {
                    error!("Failed to route call {} audio to {}: {}", call_id, route, e);
                }
                self.muted = self.engine.is_mic_muted().await;
            }
            CallState::CallUpdatedByRemote => self.accept_call_update(&call_id, previous).await,
            _ => {}
        }

        Ok(())
    }

    async fn remove_leg(&mut self, call_id: &CallId, message: &str) -> Result<()> {
        if let Some(call) = self.registry.get_mut(call_id) {
            call.apply_state(CallState::Terminated, message)?;
        }

        let (mut call, removal) = self.registry.on_leg_removed(call_id)?;
        for event in call.take_events() {
            self.sink.emit(SessionOutput::Call(event));
        }
        self.sink
            .emit(SessionOutput::Call(CallEvent::leg_terminated(*call_id, call.duration())));
        info!("Call {} terminated: {}", call_id, message);

        if let LegRemoval::Remaining(_) = removal {
            let commands = self.conference.enforce(&mut self.registry);
            self.execute_follow_ups(commands).await;
        }
        Ok(())
    }

    /// Acknowledge a remote update with the leg's current parameters. On
    /// failure the leg goes back to the state it had before the update.
    async fn accept_call_update(&mut self, call_id: &CallId, previous: Option<CallState>) {
        let Some(call) = self.registry.get(call_id) else {
            return;
        };
        let command = SignalingCommand::AcceptCallUpdate {
            call_id: *call_id,
            params: call.params().clone(),
        };

        if let Err(e) = self.engine.execute(command).await {
            error!("Failed to accept update for call {}: {}", call_id, e);
            let restore = previous.unwrap_or(CallState::StreamsRunning);
            if let Some(call) = self.registry.get_mut(call_id) {
                if let Err(e) = call.apply_state(restore, "update not acknowledged") {
                    warn!("Call {} could not be restored: {}", call_id, e);
                }
            }
        }
    }

    /// Availability is a reported fact and is always recorded. Only the
    /// route switch it triggers is undone if the media path refuses it.
    async fn on_bluetooth_availability(&mut self, available: bool) -> Result<()> {
        let before = self.route.clone();
        if let Some(route) = self.route.set_bluetooth_available(available) {
            if let Err(e) = self.commit_route(&before, route).await {
                error!("Failed to follow headset change to {}: {}", route, e);
            }
        }
        Ok(())
    }

    async fn on_user_command(&mut self, command: UserCommand) -> Result<()> {
        match command {
            UserCommand::ToggleMute => {
                let muted = !self.muted;
                self.execute(SignalingCommand::MuteMic { muted }).await?;
                self.muted = muted;
                info!("Microphone {}", if muted { "muted" } else { "unmuted" });
                Ok(())
            }
            UserCommand::ToggleSpeaker => {
                let before = self.route.clone();
                let route = self.route.toggle_speaker();
                self.commit_route(&before, route).await
            }
            UserCommand::SelectRoute(route) => {
                let before = self.route.clone();
                let route = self.route.select_route(route)?;
                self.commit_route(&before, route).await
            }
            UserCommand::PauseOrResume(target) => {
                let call_id = match target {
                    Some(id) => id,
                    None => *self
                        .registry
                        .first()
                        .ok_or_else(|| DomainError::NotAllowed("no call to pause".to_string()))?
                        .id(),
                };
                let state = self
                    .registry
                    .get(&call_id)
                    .ok_or(DomainError::CallNotFound(call_id))?
                    .state();

                if state.is_running() {
                    self.pause(&call_id).await
                } else if state == CallState::Paused {
                    self.resume(&call_id).await
                } else {
                    debug!("Call {} in {} cannot toggle pause", call_id, state);
                    Ok(())
                }
            }
            UserCommand::Pause(call_id) => self.pause(&call_id).await,
            UserCommand::Resume(call_id) => self.resume(&call_id).await,
            UserCommand::HangUp => {
                let command = if let Some(call) = self.registry.current() {
                    SignalingCommand::TerminateCall { call_id: *call.id() }
                } else if self.conference_state().local_joined {
                    SignalingCommand::TerminateConference
                } else {
                    SignalingCommand::TerminateAll
                };
                info!("Hang up: {}", command);
                self.execute(command).await
            }
            UserCommand::EnterConference => {
                let before = self.conference_checkpoint();
                let commands = self.conference.add_all_to_conference(&mut self.registry)?;
                self.commit_conference(&before, commands).await
            }
            UserCommand::LeaveConferenceToggle => {
                let before = self.conference_checkpoint();
                let commands = self.conference.toggle_local_participation(&self.registry)?;
                self.commit_conference(&before, commands).await
            }
            UserCommand::RemoveFromConference(call_id) => {
                let before = self.conference_checkpoint();
                let commands = self
                    .conference
                    .remove_from_conference(&mut self.registry, &call_id)?;
                self.commit_conference(&before, commands).await
            }
            UserCommand::AddCall => {
                if !self.presentation().add_call.enabled {
                    return Err(DomainError::NotAllowed("cannot add a call now".to_string()));
                }
                self.sink.emit(SessionOutput::ReturnToDialer { transfer: false });
                Ok(())
            }
            UserCommand::Transfer => {
                if !self.presentation().transfer.enabled {
                    return Err(DomainError::NotAllowed("cannot transfer now".to_string()));
                }
                self.sink.emit(SessionOutput::ReturnToDialer { transfer: true });
                Ok(())
            }
            UserCommand::ShowControls => {
                self.controls.show();
                Ok(())
            }
        }
    }

    /// Conference members are taken out of the conference; plain legs are
    /// paused. Already paused legs are left alone.
    async fn pause(&mut self, call_id: &CallId) -> Result<()> {
        let call = self
            .registry
            .get(call_id)
            .ok_or(DomainError::CallNotFound(*call_id))?;
        let (member, state) = (call.is_conference_member(), call.state());

        if member {
            let before = self.conference_checkpoint();
            let commands = self
                .conference
                .remove_from_conference(&mut self.registry, call_id)?;
            return self.commit_conference(&before, commands).await;
        }

        if state.is_paused() {
            debug!("Call {} already {}, pause is a no-op", call_id, state);
            return Ok(());
        }
        if !state.is_running() {
            return Err(DomainError::NotAllowed(format!(
                "call {} cannot be paused in {}",
                call_id, state
            )));
        }

        info!("Pausing call {}", call_id);
        self.execute(SignalingCommand::PauseCall { call_id: *call_id }).await
    }

    /// Only a locally paused leg can be resumed; anything else is a no-op.
    async fn resume(&mut self, call_id: &CallId) -> Result<()> {
        let state = self
            .registry
            .get(call_id)
            .ok_or(DomainError::CallNotFound(*call_id))?
            .state();

        if state != CallState::Paused {
            debug!("Call {} in {}, resume is a no-op", call_id, state);
            return Ok(());
        }

        info!("Resuming call {}", call_id);
        self.execute(SignalingCommand::ResumeCall { call_id: *call_id }).await
    }

    fn sync_current(&mut self, current: Option<CallId>) {
        if let Err(e) = self.registry.set_current(current) {
            debug!("Ignoring current call update: {}", e);
        }
    }

    async fn execute(&self, command: SignalingCommand) -> Result<()> {
        debug!("Signaling command: {}", command);
        self.engine.execute(command).await.map_err(|e| match e {
            DomainError::Signaling(_) => e,
            other => DomainError::Signaling(other.to_string()),
        })
    }

    /// Send the route the policy moved to. If the media path refuses it the
    /// policy goes back to `before`.
    async fn commit_route(&mut self, before: &AudioRoutePolicy, route: AudioRoute) -> Result<()> {
        if let Err(e) = self.execute(SignalingCommand::RouteAudio { route }).await {
            self.route.revert_to(before);
            return Err(e);
        }
        Ok(())
    }

    /// Flush pending leg events so a later restore only discards the events
    /// of the change being attempted.
    fn conference_checkpoint(&mut self) -> MembershipSnapshot {
        self.flush_call_events();
        self.conference.snapshot(&self.registry)
    }

    /// The first command is the change itself: if it is refused, membership
    /// goes back to `before`. Anything after it is the auto-leave, which the
    /// local state keeps even if the engine refuses it.
    async fn commit_conference(
        &mut self,
        before: &MembershipSnapshot,
        commands: Vec<SignalingCommand>,
    ) -> Result<()> {
        let mut commands = commands.into_iter();
        if let Some(change) = commands.next() {
            if let Err(e) = self.execute(change).await {
                self.conference.restore(&mut self.registry, before);
                let discarded = self.registry.take_events();
                debug!("Dropped {} events of the refused change", discarded.len());
                return Err(e);
            }
        }
        self.execute_follow_ups(commands.collect()).await;
        Ok(())
    }

    async fn execute_follow_ups(&self, commands: Vec<SignalingCommand>) {
        for command in commands {
            let name = command.name();
            if let Err(e) = self.execute(command).await {
                error!("Engine refused {}: {}", name, e);
            }
        }
    }

    fn flush_call_events(&mut self) {
        for event in self.registry.take_events() {
            debug!("Call {} event {}", event.call_id(), event.event_type());
            self.sink.emit(SessionOutput::Call(event));
        }
    }

    fn publish(&self) {
        self.sink.emit(SessionOutput::Presentation(self.presentation()));
    }

    fn teardown(&mut self) {
        self.controls.teardown();
        counter!("incall_sessions_ended_total").increment(1);
        info!("Session ended");
        self.publish();
        self.sink.emit(SessionOutput::SessionEnded);
    }

    /// Release session resources when the input stream closes early.
    pub fn shutdown(&mut self) {
        if self.controls.teardown() {
            debug!("Pending controls hide cancelled on shutdown");
        }
    }

    pub fn presentation(&self) -> PresentationState {
        reduce(
            &self.registry,
            &self.conference_state(),
            &self.route,
            self.muted,
            &self.capabilities,
            &ViewContext {
                controls_visible: self.controls.is_visible(),
                now: Utc::now(),
            },
        )
    }

    pub fn conference_state(&self) -> ConferenceState {
        self.conference.state(&self.registry)
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn route(&self) -> &AudioRoutePolicy {
        &self.route
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn controls(&self) -> &ControlsTimer {
        &self.controls
    }

    pub fn is_terminated(&self) -> bool {
        self.registry.is_terminated()
    }
}
