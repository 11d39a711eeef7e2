//! Domain layer - Session decision logic
//!
//! Everything here is synchronous and in-memory:
//! - Call legs and their lifecycle vocabulary
//! - The session registry (source of truth for legs and focus)
//! - Conference membership rules
//! - Audio route selection
//! - The pure presentation reducer

pub mod audio_route;
pub mod call;
pub mod command;
pub mod conference;
pub mod presentation;
pub mod registry;
pub mod shared;

// Re-export commonly used types
pub use audio_route::{AudioRoute, AudioRoutePolicy};
pub use command::SignalingCommand;
pub use conference::{ConferenceCoordinator, ConferenceState, MembershipSnapshot};
pub use presentation::{reduce, Capabilities, PresentationState};
pub use registry::{LegRemoval, SessionRegistry};
pub use shared::{DomainError, Result};
