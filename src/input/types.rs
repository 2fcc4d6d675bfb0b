use std::fmt;
use std::net::Ipv4Addr;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

/// Shape of a probed value once recognised.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    Ip(Ipv4Addr),
    Domain(String),
    Email { local: String, domain: String },
}

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedInput {
    pub original: String,
    pub normalized: String,
    pub kind: InputKind,
}

impl ClassifiedInput {
    /// Domain carried by the input, if any (the part after `@` for e-mails).
    pub fn domain(&self) -> Option<&str> {
        match &self.kind {
            InputKind::Ip(_) => None,
            InputKind::Domain(domain) | InputKind::Email { domain, .. } => Some(domain),
        }
    }

    pub fn ip(&self) -> Option<Ipv4Addr> {
        match self.kind {
            InputKind::Ip(ip) => Some(ip),
            _ => None,
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ip(ip) => write!(f, "ip {ip}"),
            Self::Domain(domain) => write!(f, "domain {domain}"),
            Self::Email { local, domain } => write!(f, "email {local}@{domain}"),
        }
    }
}
