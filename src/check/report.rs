#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

use crate::classify::{CheckName, CheckOutcome};
use crate::dns::{AddressRecord, MxRecord, Resolution};
use crate::probe::{ProbeResult, TranscriptEntry};

/// `result` is true only when the check ran and passed.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckState {
    pub result: bool,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub error: Option<String>,
}

impl CheckState {
    fn passed() -> Self {
        Self {
            result: true,
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            result: false,
            error: Some(error.into()),
        }
    }
}

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checks {
    pub syntax_valid: CheckState,
    pub resolve_record: CheckState,
    pub is_connected: CheckState,
    pub banner_check: CheckState,
    pub valid_hostname: CheckState,
    pub r_dns_mismatch: CheckState,
    pub support_tls: CheckState,
    pub open_relay: CheckState,
}

impl Checks {
    pub fn get(&self, check: CheckName) -> &CheckState {
        match check {
            CheckName::SyntaxValid => &self.syntax_valid,
            CheckName::ResolveRecord => &self.resolve_record,
            CheckName::IsConnected => &self.is_connected,
            CheckName::BannerCheck => &self.banner_check,
            CheckName::ValidHostname => &self.valid_hostname,
            CheckName::RDnsMismatch => &self.r_dns_mismatch,
            CheckName::SupportTls => &self.support_tls,
            CheckName::OpenRelay => &self.open_relay,
        }
    }

    fn slot(&mut self, check: CheckName) -> &mut CheckState {
        match check {
            CheckName::SyntaxValid => &mut self.syntax_valid,
            CheckName::ResolveRecord => &mut self.resolve_record,
            CheckName::IsConnected => &mut self.is_connected,
            CheckName::BannerCheck => &mut self.banner_check,
            CheckName::ValidHostname => &mut self.valid_hostname,
            CheckName::RDnsMismatch => &mut self.r_dns_mismatch,
            CheckName::SupportTls => &mut self.support_tls,
            CheckName::OpenRelay => &mut self.open_relay,
        }
    }

    /// Copy of `self` with `outcome` recorded in its slot.
    pub fn with(mut self, outcome: CheckOutcome) -> Self {
        *self.slot(outcome.check) = match outcome.detail {
            Some(detail) if !outcome.passed => CheckState::failed(detail),
            _ => CheckState {
                result: outcome.passed,
                error: None,
            },
        };
        self
    }

    fn with_passed(mut self, check: CheckName) -> Self {
        *self.slot(check) = CheckState::passed();
        self
    }

    fn with_failed(mut self, check: CheckName, error: impl Into<String>) -> Self {
        *self.slot(check) = CheckState::failed(error);
        self
    }

    /// Every check in report order.
    pub fn iter(&self) -> impl Iterator<Item = (CheckName, &CheckState)> {
        CheckName::ALL.into_iter().map(|check| (check, self.get(check)))
    }
}

/// Outcome of one [`check`](crate::check::check) call.
///
/// Stages that never ran leave their fields empty and their checks at
/// `result: false`.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub value: String,
    pub host_name: Option<String>,
    pub smtp_banner: Option<String>,
    pub connection_time_ms: Option<u64>,
    pub transaction_time_ms: Option<u64>,
    pub checks: Checks,
    pub a_records: Vec<AddressRecord>,
    pub mx_records: Vec<MxRecord>,
    pub smtp_messages: Vec<TranscriptEntry>,
    pub errors: Vec<String>,
}

impl CheckReport {
    fn empty(value: &str) -> Self {
        Self {
            value: value.to_string(),
            host_name: None,
            smtp_banner: None,
            connection_time_ms: None,
            transaction_time_ms: None,
            checks: Checks::default(),
            a_records: Vec::new(),
            mx_records: Vec::new(),
            smtp_messages: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// The value is neither an IPv4 address, a domain nor an e-mail address.
    pub(crate) fn rejected(value: &str, error: &dyn std::error::Error) -> Self {
        let message = error.to_string();
        Self {
            checks: Checks::default().with_failed(CheckName::SyntaxValid, message.clone()),
            errors: vec![message],
            ..Self::empty(value)
        }
    }

    /// Syntax was fine but the DNS chain broke.
    pub(crate) fn unresolved(value: &str, error: &dyn std::error::Error) -> Self {
        let message = error.to_string();
        Self {
            checks: Checks::default()
                .with_passed(CheckName::SyntaxValid)
                .with_failed(CheckName::ResolveRecord, message.clone()),
            errors: vec![message],
            ..Self::empty(value)
        }
    }

    /// Records resolved but the SMTP exchange did not finish.
    pub(crate) fn unreachable(
        value: &str,
        resolution: Resolution,
        error: &dyn std::error::Error,
    ) -> Self {
        let message = error.to_string();
        Self {
            checks: Checks::default()
                .with_passed(CheckName::SyntaxValid)
                .with_passed(CheckName::ResolveRecord)
                .with_failed(CheckName::IsConnected, message.clone()),
            errors: vec![message],
            ..Self::resolved(value, resolution)
        }
    }

    pub(crate) fn completed(
        value: &str,
        resolution: Resolution,
        probe: ProbeResult,
        outcomes: Vec<CheckOutcome>,
    ) -> Self {
        let checks = outcomes.into_iter().fold(
            Checks::default()
                .with_passed(CheckName::SyntaxValid)
                .with_passed(CheckName::ResolveRecord)
                .with_passed(CheckName::IsConnected),
            Checks::with,
        );
        let smtp_banner = probe
            .transcript
            .first()
            .filter(|entry| entry.is_greeting())
            .map(|entry| entry.raw.trim_end().to_string());
        Self {
            smtp_banner,
            connection_time_ms: Some(probe.connection_latency_ms),
            transaction_time_ms: Some(probe.total_transaction_ms),
            checks,
            smtp_messages: probe.transcript,
            ..Self::resolved(value, resolution)
        }
    }

    fn resolved(value: &str, resolution: Resolution) -> Self {
        Self {
            host_name: Some(resolution.host_name),
            a_records: resolution.records,
            mx_records: resolution.mx_records,
            ..Self::empty(value)
        }
    }

    /// No stage short-circuited.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}
