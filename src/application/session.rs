//! Session runner
//!
//! Every input (signaling notifications, headset changes, user commands and
//! deferred timeouts) goes through one bounded queue and is handled by a
//! single task, so the controller never sees two inputs at once.

use crate::application::controller::{Outcome, SessionController};
use crate::application::input::{CallStateNotification, SessionInput, UserCommand};
use crate::domain::shared::error::{DomainError, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Cloneable entry point into a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionInput>,
}

impl SessionHandle {
    /// Queue an input. Fails with `SessionTerminated` once the session task is gone.
    pub async fn send(&self, input: SessionInput) -> Result<()> {
        self.tx
            .send(input)
            .await
            .map_err(|_| DomainError::SessionTerminated)
    }

    pub async fn notify_call_state(&self, notification: CallStateNotification) -> Result<()> {
        self.send(SessionInput::CallState(notification)).await
    }

    pub async fn notify_bluetooth(&self, available: bool) -> Result<()> {
        self.send(SessionInput::BluetoothAvailability(available)).await
    }

    pub async fn command(&self, command: UserCommand) -> Result<()> {
        self.send(SessionInput::User(command)).await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Start the session task. The join handle yields the controller back once
/// the session has ended or every handle was dropped.
pub fn spawn_session(
    mut controller: SessionController,
    queue_depth: usize,
) -> (SessionHandle, JoinHandle<SessionController>) {
    let (tx, mut rx) = mpsc::channel(queue_depth.max(1));
    controller.attach_scheduler(tx.downgrade());

    let task = tokio::spawn(async move {
        info!("Session started");
        while let Some(input) = rx.recv().await {
            let name = input.name();
            match controller.handle(input).await {
                Outcome::SessionEnded => break,
                Outcome::Rejected(e) => debug!("Input {} rejected: {}", name, e),
                Outcome::Applied => {}
            }
        }

        rx.close();
        controller.shutdown();
        info!("Session task stopped");
        controller
    });

    (SessionHandle { tx }, task)
}
