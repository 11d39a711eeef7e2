//! Application layer
//!
//! Serializes every session input through one control context and drives
//! the domain types: registry, conference, audio route and presentation.

pub mod controller;
pub mod controls;
pub mod input;
pub mod ports;
pub mod session;

pub use controller::{Outcome, SessionController};
pub use controls::ControlsTimer;
pub use input::{CallStateNotification, SessionInput, UserCommand};
pub use ports::{PresentationSink, SessionOutput, SignalingEngine};
pub use session::{spawn_session, SessionHandle};
