//! Call bounded context - lifecycle of individual call legs

pub mod aggregate;
pub mod event;
pub mod value_object;

pub use aggregate::Call;
pub use event::CallEvent;
pub use value_object::{CallParams, CallState};
