//! Audio route policy
//!
//! Chooses between earpiece, loudspeaker and a Bluetooth headset. Exactly one
//! route is active at any time and Bluetooth is never active while the
//! headset is unavailable.

use crate::domain::shared::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Physical audio path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioRoute {
    #[default]
    Earpiece,
    Speaker,
    Bluetooth,
}

impl fmt::Display for AudioRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioRoute::Earpiece => f.write_str("earpiece"),
            AudioRoute::Speaker => f.write_str("speaker"),
            AudioRoute::Bluetooth => f.write_str("bluetooth"),
        }
    }
}

/// Route selection state for one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioRoutePolicy {
    active: AudioRoute,
    bluetooth_available: bool,
    /// Set by the first user route command; disables automatic Bluetooth selection
    explicit_choice: bool,
}

impl AudioRoutePolicy {
    /// Headset availability is unknown at start, so Bluetooth is coerced to earpiece.
    pub fn new(initial: AudioRoute) -> Self {
        let active = match initial {
            AudioRoute::Bluetooth => AudioRoute::Earpiece,
            other => other,
        };

        Self {
            active,
            bluetooth_available: false,
            explicit_choice: false,
        }
    }

    pub fn active(&self) -> AudioRoute {
        self.active
    }

    pub fn is_bluetooth_available(&self) -> bool {
        self.bluetooth_available
    }

    pub fn is_speaker_enabled(&self) -> bool {
        self.active == AudioRoute::Speaker
    }

    /// Apply a headset availability report. Returns the new route if it changed.
    pub fn set_bluetooth_available(&mut self, available: bool) -> Option<AudioRoute> {
        self.bluetooth_available = available;

        if available {
            if !self.explicit_choice && self.active != AudioRoute::Bluetooth {
                info!("Bluetooth headset available, routing audio to it");
                return self.switch_to(AudioRoute::Bluetooth);
            }
            debug!("Bluetooth headset available, keeping {}", self.active);
            None
        } else if self.active == AudioRoute::Bluetooth {
            info!("Bluetooth headset lost, falling back to earpiece");
            self.switch_to(AudioRoute::Earpiece)
        } else {
            None
        }
    }

    /// Speaker on/off. Turning it off always lands on the earpiece.
    pub fn toggle_speaker(&mut self) -> AudioRoute {
        self.explicit_choice = true;
        let target = if self.active == AudioRoute::Speaker {
            debug!("Toggle speaker off, routing back to earpiece");
            AudioRoute::Earpiece
        } else {
            AudioRoute::Speaker
        };
        self.switch_to(target);
        self.active
    }

    /// Explicit route selection. Bluetooth is rejected while unavailable and
    /// leaves the current route untouched.
    pub fn select_route(&mut self, route: AudioRoute) -> Result<AudioRoute> {
        if route == AudioRoute::Bluetooth && !self.bluetooth_available {
            return Err(DomainError::RouteUnavailable(route));
        }

        self.explicit_choice = true;
        self.switch_to(route);
        Ok(self.active)
    }

    /// Undo a route change the media path refused. Route and user intent go
    /// back to `previous`; headset availability stays as last reported, so a
    /// Bluetooth route that is no longer available lands on the earpiece.
    pub fn revert_to(&mut self, previous: &AudioRoutePolicy) {
        self.explicit_choice = previous.explicit_choice;
        self.active = match previous.active {
            AudioRoute::Bluetooth if !self.bluetooth_available => AudioRoute::Earpiece,
            route => route,
        };
        debug!("Audio route reverted to {}", self.active);
    }

    fn switch_to(&mut self, route: AudioRoute) -> Option<AudioRoute> {
        if self.active == route {
            return None;
        }
        self.active = route;
        Some(route)
    }
}

impl Default for AudioRoutePolicy {
    fn default() -> Self {
        Self::new(AudioRoute::Earpiece)
    }
}
