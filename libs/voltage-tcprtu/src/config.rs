//! Transport configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default exchange timeout applied when none is configured
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Connection parameters for one RTU-over-TCP peer
///
/// A zero `timeout_ms` is replaced with [`DEFAULT_TIMEOUT_MS`] on first
/// connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Peer address as `host:port`
    pub address: String,
    /// Connect timeout and per-exchange deadline
    #[serde(default)]
    pub timeout_ms: u64,
}

impl TransportConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            timeout_ms: 0,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
