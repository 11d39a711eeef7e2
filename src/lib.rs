//! incall - in-call session orchestration
//!
//! Tracks the call legs of one telephony session, coordinates conference
//! membership and audio routing, and derives the full in-call screen state
//! after every event. Organized in DDD layers like the rest of the stack:
//! pure domain types, an application layer that serializes inputs, adapters
//! in infrastructure, and an outward event stream in interface.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interface;

// Re-export commonly used types
pub use domain::shared::error::{DomainError, Result};
