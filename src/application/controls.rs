//! Deferred "hide controls" task owned by the session lifecycle

use crate::application::input::SessionInput;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Controls visibility plus the one pending hide countdown.
///
/// The countdown task only holds a weak sender, so it never keeps a dead
/// session's channel open. Teardown aborts it; cancelling twice is a no-op.
pub struct ControlsTimer {
    visible: bool,
    delay: Option<Duration>,
    generation: u64,
    task: Option<JoinHandle<()>>,
    notifier: Option<mpsc::WeakSender<SessionInput>>,
    cancellations: u64,
}

impl ControlsTimer {
    pub fn new(delay: Option<Duration>) -> Self {
        Self {
            visible: true,
            delay,
            generation: 0,
            task: None,
            notifier: None,
            cancellations: 0,
        }
    }

    pub fn attach(&mut self, notifier: mpsc::WeakSender<SessionInput>) {
        self.notifier = Some(notifier);
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_pending(&self) -> bool {
        self.task.is_some()
    }

    /// Number of pending countdowns that were actually aborted
    pub fn cancellations(&self) -> u64 {
        self.cancellations
    }

    /// Show controls and restart the countdown. Needs a Tokio runtime when a
    /// delay is configured.
    pub fn show(&mut self) {
        self.visible = true;
        let Some(delay) = self.delay else {
            return;
        };

        self.cancel();
        self.generation += 1;
        let generation = self.generation;
        let notifier = self.notifier.clone();

        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(tx) = notifier.and_then(|weak| weak.upgrade()) {
                let _ = tx.send(SessionInput::ControlsTimeout { generation }).await;
            }
        }));
        debug!("Controls hide scheduled in {:?} (generation {})", delay, generation);
    }

    /// Pin controls visible and drop any countdown
    pub fn pin_visible(&mut self) {
        self.visible = true;
        self.cancel();
    }

    /// Countdown elapsed. Returns true if controls were hidden.
    pub fn on_timeout(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.task.is_none() {
            debug!("Ignoring stale controls timeout (generation {})", generation);
            return false;
        }

        self.task = None;
        self.visible = false;
        true
    }

    /// Abort the pending countdown, if any. Returns true if one was aborted.
    pub fn cancel(&mut self) -> bool {
        match self.task.take() {
            Some(handle) => {
                handle.abort();
                self.cancellations += 1;
                debug!("Controls hide cancelled (generation {})", self.generation);
                true
            }
            None => false,
        }
    }

    /// Final cancel on session teardown; later calls do nothing.
    pub fn teardown(&mut self) -> bool {
        self.notifier = None;
        self.delay = None;
        self.cancel()
    }
}
