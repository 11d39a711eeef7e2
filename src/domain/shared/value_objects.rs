//! Shared value objects used across the session

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Call leg identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(Uuid);

impl CallId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Remote party address (SIP URI), serialized as its string form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SipUri {
    secure: bool,
    user: Option<String>,
    host: String,
    port: Option<u16>,
}

impl SipUri {
    pub fn new(user: Option<String>, host: String, port: Option<u16>) -> Self {
        Self {
            secure: false,
            user,
            host,
            port,
        }
    }

    /// Parse `sip:` / `sips:` URIs, with or without a user part.
    /// URI parameters and headers after `;` or `?` are dropped.
    pub fn parse(uri: &str) -> Result<Self, String> {
        let uri = uri.trim();
        let (secure, rest) = if let Some(rest) = uri.strip_prefix("sips:") {
            (true, rest)
        } else if let Some(rest) = uri.strip_prefix("sip:") {
            (false, rest)
        } else {
            return Err("URI must start with 'sip:' or 'sips:'".to_string());
        };

        let rest = rest.split(|c| c == ';' || c == '?').next().unwrap_or_default();

        let (user, host_port) = match rest.rsplit_once('@') {
            Some((user, host_port)) if !user.is_empty() => (Some(user.to_string()), host_port),
            Some(_) => return Err("Empty user part in SIP URI".to_string()),
            None => (None, rest),
        };

        let (host, port) = match host_port.split_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| format!("Invalid port in SIP URI: {}", port))?;
                (host, Some(port))
            }
            None => (host_port, None),
        };

        if host.is_empty() {
            return Err("Missing host in SIP URI".to_string());
        }

        Ok(Self {
            secure,
            user,
            host: host.to_string(),
            port,
        })
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// Short label for a call row when no contact is known: the user part,
    /// falling back to the full URI.
    pub fn display_label(&self) -> String {
        match &self.user {
            Some(user) => user.clone(),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for SipUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = if self.secure { "sips" } else { "sip" };
        write!(f, "{}:", scheme)?;
        if let Some(user) = &self.user {
            write!(f, "{}@", user)?;
        }
        write!(f, "{}", self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for SipUri {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SipUri> for String {
    fn from(uri: SipUri) -> Self {
        uri.to_string()
    }
}
