//! Infrastructure layer
//!
//! Adapters to the signaling engine plus logging and metrics setup.

pub mod signaling;
pub mod telemetry;
