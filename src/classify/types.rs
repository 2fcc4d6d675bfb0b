use std::fmt;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckName {
    SyntaxValid,
    ResolveRecord,
    IsConnected,
    BannerCheck,
    ValidHostname,
    RDnsMismatch,
    SupportTls,
    OpenRelay,
}

impl CheckName {
    pub const ALL: [CheckName; 8] = [
        Self::SyntaxValid,
        Self::ResolveRecord,
        Self::IsConnected,
        Self::BannerCheck,
        Self::ValidHostname,
        Self::RDnsMismatch,
        Self::SupportTls,
        Self::OpenRelay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SyntaxValid => "syntaxValid",
            Self::ResolveRecord => "resolveRecord",
            Self::IsConnected => "isConnected",
            Self::BannerCheck => "bannerCheck",
            Self::ValidHostname => "validHostname",
            Self::RDnsMismatch => "rDnsMismatch",
            Self::SupportTls => "supportTls",
            Self::OpenRelay => "openRelay",
        }
    }
}

impl fmt::Display for CheckName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict of one rule. `detail` explains a failure.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub check: CheckName,
    pub passed: bool,
    pub detail: Option<String>,
}

impl CheckOutcome {
    pub fn pass(check: CheckName) -> Self {
        Self {
            check,
            passed: true,
            detail: None,
        }
    }

    pub fn fail(check: CheckName, detail: impl Into<String>) -> Self {
        Self {
            check,
            passed: false,
            detail: Some(detail.into()),
        }
    }

    /// `pass` when `passed`, otherwise `fail` with the lazily built detail.
    pub fn from_bool<F>(check: CheckName, passed: bool, detail: F) -> Self
    where
        F: FnOnce() -> String,
    {
        if passed {
            Self::pass(check)
        } else {
            Self::fail(check, detail())
        }
    }
}
