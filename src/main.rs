use incall::application::{spawn_session, SessionController, UserCommand};
use incall::config::Config;
use incall::domain::call::CallState;
use incall::domain::shared::value_objects::{CallId, SipUri};
use incall::infrastructure::signaling::{
    EngineCallState, EngineNotification, RecordingEngine, SignalingBridge,
};
use incall::infrastructure::telemetry::{describe_metrics, init_tracing};
use incall::interface::{EventBroadcaster, SessionEvent};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Optional config file as the only argument
    let path = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::load(path.as_deref())?;

    init_tracing(&config.logging)?;
    describe_metrics();

    info!("Starting in-call session demo");
    info!("Configuration loaded: {:?}", config);

    demo_session(&config).await?;

    info!("In-call session demo complete");
    Ok(())
}

fn notification(
    call_id: CallId,
    remote: &SipUri,
    state: EngineCallState,
    current: Option<CallId>,
) -> EngineNotification {
    EngineNotification {
        call_id,
        remote: remote.clone(),
        state,
        message: format!("{:?}", state),
        params: Default::default(),
        current_call: current,
    }
}

/// Two calls, merged into a conference, one dropped, then hang up.
async fn demo_session(config: &Config) -> anyhow::Result<()> {
    info!("=== Session Demo ===");

    let engine = Arc::new(RecordingEngine::new());
    let broadcaster = Arc::new(EventBroadcaster::new(config.events.capacity));
    let mut events = broadcaster.subscribe();

    let printer = tokio::spawn(async move {
        let mut ended = false;
        while !ended {
            match events.recv().await {
                Ok(event) => {
                    ended = matches!(event, SessionEvent::SessionEnded { .. });
                    match event.to_json() {
                        Ok(json) => println!("{}", json),
                        Err(e) => warn!("Failed to serialize event: {}", e),
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Event printer lagged, skipped {} events", skipped);
                }
                Err(_) => break,
            }
        }
    });

    let controller = SessionController::new(
        engine.clone(),
        broadcaster.clone(),
        config.capabilities(),
        config.audio.initial_route,
        config.controls_hide_delay(),
    );
    let (session, task) = spawn_session(controller, config.session.command_queue_depth);
    let bridge = SignalingBridge::new(session.clone());

    let alice = SipUri::parse("sip:alice@example.com").map_err(|e| anyhow::anyhow!(e))?;
    let bob = SipUri::parse("sip:bob@example.com").map_err(|e| anyhow::anyhow!(e))?;
    let (a, b) = (CallId::new(), CallId::new());

    // First call: outgoing, answered
    for state in [
        EngineCallState::OutgoingInit,
        EngineCallState::OutgoingProgress,
        EngineCallState::OutgoingEarlyMedia,
        EngineCallState::Connected,
        EngineCallState::StreamsRunning,
    ] {
        bridge
            .on_call_state_changed(notification(a, &alice, state, Some(a)))
            .await?;
    }
    info!("Call {} with {} is {}", a, alice, CallState::StreamsRunning);

    // Park the first call and place a second one
    session.command(UserCommand::Pause(a)).await?;
    bridge
        .on_call_state_changed(notification(a, &alice, EngineCallState::Paused, None))
        .await?;
    session.command(UserCommand::AddCall).await?;
    for state in [
        EngineCallState::OutgoingInit,
        EngineCallState::OutgoingRinging,
        EngineCallState::StreamsRunning,
    ] {
        bridge
            .on_call_state_changed(notification(b, &bob, state, Some(b)))
            .await?;
    }

    // Headset arrives: audio follows it
    bridge.on_bluetooth_changed(true).await?;

    // Merge both calls, then drop Bob: the conference dissolves
    session.command(UserCommand::EnterConference).await?;
    session.command(UserCommand::RemoveFromConference(b)).await?;

    // Both legs end
    bridge
        .on_call_state_changed(notification(b, &bob, EngineCallState::CallEnd, None))
        .await?;
    session.command(UserCommand::HangUp).await?;
    bridge
        .on_call_state_changed(notification(a, &alice, EngineCallState::Released, None))
        .await?;

    let controller = task.await?;
    info!(
        "Session terminated: {}, legs left: {}",
        controller.is_terminated(),
        controller.registry().count()
    );
    printer.await?;

    for command in engine.take_commands().await {
        info!("Engine command: {}", command);
    }

    info!("=== Session Demo Complete ===");
    Ok(())
}
