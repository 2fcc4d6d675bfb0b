use std::fmt;

use thiserror::Error;
use trust_dns_resolver::error::ResolveError;

/// DNS record kinds the resolution layer depends on.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    A,
    Ptr,
    Mx,
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::A => "A",
            Self::Ptr => "PTR",
            Self::Mx => "MX",
        })
    }
}

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("domain, e-mail or IP-address pattern is invalid: '{input}'")]
    PatternInvalid { input: String },
    #[error("domain IDNA conversion failed")]
    IdnaConversion {
        #[source]
        source: idna::Errors,
    },
    #[error("cannot get {record} record for {name}")]
    DnsLookupFailed {
        record: RecordType,
        name: String,
        #[source]
        source: Option<ResolveError>,
    },
}

impl ResolutionError {
    pub(crate) fn pattern_invalid(input: impl Into<String>) -> Self {
        Self::PatternInvalid {
            input: input.into(),
        }
    }

    pub(crate) fn idna(source: idna::Errors) -> Self {
        Self::IdnaConversion { source }
    }

    pub(crate) fn lookup(record: RecordType, name: impl Into<String>, source: ResolveError) -> Self {
        Self::DnsLookupFailed {
            record,
            name: name.into(),
            source: Some(source),
        }
    }

    pub(crate) fn empty(record: RecordType, name: impl Into<String>) -> Self {
        Self::DnsLookupFailed {
            record,
            name: name.into(),
            source: None,
        }
    }

    /// Record type whose lookup broke the chain, if that is what failed.
    pub fn failed_record(&self) -> Option<RecordType> {
        match self {
            Self::DnsLookupFailed { record, .. } => Some(*record),
            _ => None,
        }
    }
}
