//! Signaling engine adapters

pub mod bridge;
pub mod engine_state;
pub mod recording;

pub use bridge::SignalingBridge;
pub use engine_state::{EngineCallState, EngineNotification};
pub use recording::RecordingEngine;
