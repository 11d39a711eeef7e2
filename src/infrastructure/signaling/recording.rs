//! In-memory signaling engine
//!
//! Records every command it is asked to run and tracks the microphone
//! state. Used by the demo binary and the integration tests in place of a
//! real SIP stack.

use crate::application::ports::SignalingEngine;
use crate::domain::command::SignalingCommand;
use crate::domain::shared::error::{DomainError, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct EngineState {
    commands: Vec<SignalingCommand>,
    mic_muted: bool,
    failing: HashSet<&'static str>,
}

#[derive(Debug, Default)]
pub struct RecordingEngine {
    state: Mutex<EngineState>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every command with this name fail, e.g. `"accept_call_update"`
    pub async fn fail_on(&self, command: &'static str) {
        self.state.lock().await.failing.insert(command);
    }

    pub async fn recover(&self, command: &'static str) {
        self.state.lock().await.failing.remove(command);
    }

    pub async fn set_mic_muted(&self, muted: bool) {
        self.state.lock().await.mic_muted = muted;
    }

    pub async fn commands(&self) -> Vec<SignalingCommand> {
        self.state.lock().await.commands.clone()
    }

    pub async fn take_commands(&self) -> Vec<SignalingCommand> {
        std::mem::take(&mut self.state.lock().await.commands)
    }
}

#[async_trait]
impl SignalingEngine for RecordingEngine {
    async fn execute(&self, command: SignalingCommand) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.failing.contains(command.name()) {
            warn!("Engine refused {}", command);
            return Err(DomainError::Signaling(format!(
                "engine refused {}",
                command.name()
            )));
        }

        if let SignalingCommand::MuteMic { muted } = &command {
            state.mic_muted = *muted;
        }
        debug!("Engine executed {}", command);
        state.commands.push(command);
        Ok(())
    }

    async fn is_mic_muted(&self) -> bool {
        self.state.lock().await.mic_muted
    }
}
