//! Shared kernel - Common types used across the session components

pub mod error;
pub mod events;
pub mod value_objects;

pub use error::{DomainError, Result};
pub use value_objects::*;
