//! Domain errors

use crate::domain::audio_route::AudioRoute;
use crate::domain::shared::value_objects::CallId;
use thiserror::Error;

/// Domain result type
pub type Result<T> = std::result::Result<T, DomainError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Call not found: {0}")]
    CallNotFound(CallId),

    #[error("Entity already exists: {0}")]
    AlreadyExists(String),

    #[error("Audio route unavailable: {0}")]
    RouteUnavailable(AudioRoute),

    #[error("Session already terminated")]
    SessionTerminated,

    #[error("Not allowed: {0}")]
    NotAllowed(String),

    #[error("Signaling error: {0}")]
    Signaling(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
