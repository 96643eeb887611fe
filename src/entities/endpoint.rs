use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TransferError};

pub const DEFAULT_HOST: &str = "192.168.1.1";
pub const DEFAULT_PORT: u16 = 49000;

/// Destination of a transfer.
///
/// No validation happens here beyond the port type: an unreachable host or a
/// closed port is only discovered by the connection attempt itself.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Builds an endpoint from the raw text a user typed into an editor.
    ///
    /// The host is trimmed and taken as is. The port must be a decimal
    /// integer in `1..=65535`.
    pub fn from_text(host: &str, port: &str) -> Result<Self> {
        Ok(Self::new(host.trim(), Self::parse_port(port)?))
    }

    pub fn parse_port(text: &str) -> Result<u16> {
        match text.trim().parse::<u16>() {
            Ok(0) | Err(_) => Err(TransferError::InvalidPort(text.to_string())),
            Ok(port) => Ok(port),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
