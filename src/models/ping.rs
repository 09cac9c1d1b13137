//! Server health check result.

use serde::Serialize;
use std::time::Duration;

/// Value reported by the server version header when it is absent.
pub const UNKNOWN_VERSION: &str = "unknown";

/// Answer to a ping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pong {
    pub version: String,
    /// Round trip as measured by the client
    pub response_time: Duration,
}

impl Pong {
    /// True when the server identified itself with a version.
    pub fn is_good(&self) -> bool {
        !self.version.is_empty() && !self.version.eq_ignore_ascii_case(UNKNOWN_VERSION)
    }
}
