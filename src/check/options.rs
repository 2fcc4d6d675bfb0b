#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

use crate::dns::ResolutionMode;
use crate::probe::{DEFAULT_TIMEOUT_MS, ProbeOptions, SMTP_PORT};

/// Configuration knobs for [`check`](crate::check::check).
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOptions {
    pub timeout_ms: u64,
    pub port: u16,
    pub mail_from: String,
    pub identity_domain: String,
    pub mode: ResolutionMode,
}

impl Default for CheckOptions {
    fn default() -> Self {
        let probe = ProbeOptions::default();
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            port: SMTP_PORT,
            mail_from: probe.mail_from,
            identity_domain: probe.identity_domain,
            mode: ResolutionMode::default(),
        }
    }
}

impl CheckOptions {
    pub fn probe_options(&self) -> ProbeOptions {
        ProbeOptions {
            port: self.port,
            timeout_ms: self.timeout_ms,
            mail_from: self.mail_from.clone(),
            identity_domain: self.identity_domain.clone(),
        }
    }
}
