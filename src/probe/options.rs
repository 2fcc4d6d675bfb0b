use std::time::Duration;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;
pub const SMTP_PORT: u16 = 25;

/// Configuration knobs for [`probe`](crate::probe::probe).
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    pub port: u16,
    /// Budget for the whole transaction, connect included.
    pub timeout_ms: u64,
    /// Fixed envelope sender used in `MAIL FROM`.
    pub mail_from: String,
    /// Suffix appended to the random EHLO label.
    pub identity_domain: String,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            port: SMTP_PORT,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            mail_from: "probe@example.com".to_string(),
            identity_domain: "example.com".to_string(),
        }
    }
}

impl ProbeOptions {
    /// A zero timeout is bumped to one millisecond so a deadline always exists.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }
}
