//! Engine callback adapter
//!
//! Receives raw engine callbacks on whatever thread the engine uses and
//! forwards them, translated, into the session queue.

use crate::application::session::SessionHandle;
use crate::domain::shared::error::Result;
use crate::infrastructure::signaling::engine_state::EngineNotification;
use tracing::{debug, info};

pub struct SignalingBridge {
    session: SessionHandle,
}

impl SignalingBridge {
    pub fn new(session: SessionHandle) -> Self {
        Self { session }
    }

    pub async fn on_call_state_changed(&self, notification: EngineNotification) -> Result<()> {
        if notification.state.is_end_of_life() {
            info!(
                "Engine call {} ended ({:?}): {}",
                notification.call_id, notification.state, notification.message
            );
        } else {
            debug!(
                "Engine call {} reported {:?}",
                notification.call_id, notification.state
            );
        }
        self.session
            .notify_call_state(notification.translate())
            .await
    }

    pub async fn on_bluetooth_changed(&self, available: bool) -> Result<()> {
        debug!("Bluetooth headset {}", if available { "connected" } else { "disconnected" });
        self.session.notify_bluetooth(available).await
    }
}
