//! Interface layer - outward event stream

pub mod events;

pub use events::{EventBroadcaster, SessionEvent};
