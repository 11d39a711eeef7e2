//! Ports to the collaborators on either side of the session

use crate::domain::call::CallEvent;
use crate::domain::command::SignalingCommand;
use crate::domain::presentation::PresentationState;
use crate::domain::shared::error::Result;
use crate::domain::shared::value_objects::{CallId, SipUri};
use async_trait::async_trait;

/// Command sink and ground-truth source owned by the signaling engine.
///
/// Implementations must not block; they queue work for the engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignalingEngine: Send + Sync {
    /// Issue one command. Errors are reported as `DomainError::Signaling`.
    async fn execute(&self, command: SignalingCommand) -> Result<()>;

    /// Current microphone mute state as the engine sees it
    async fn is_mic_muted(&self) -> bool;
}

/// Everything the session hands to the presentation side
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutput {
    /// Full snapshot after each processed input
    Presentation(PresentationState),
    /// Per-leg domain event
    Call(CallEvent),
    /// A new incoming leg should be shown by the incoming-call screen
    IncomingCall { call_id: CallId, remote: SipUri },
    /// Leave the call screen for the dialer, optionally in transfer mode
    ReturnToDialer { transfer: bool },
    /// Last leg is gone; the call screen must close
    SessionEnded,
}

pub trait PresentationSink: Send + Sync {
    fn emit(&self, output: SessionOutput);
}
