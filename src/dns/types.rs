use std::fmt;
use std::net::Ipv4Addr;

use crate::probe::ProbeTarget;

/// One forward address and the PTR name that address resolves back to.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRecord {
    #[cfg_attr(feature = "with-serde", serde(rename = "value"))]
    pub address: Ipv4Addr,
    #[cfg_attr(feature = "with-serde", serde(rename = "rDns"))]
    pub reverse_name: String,
}

impl AddressRecord {
    pub fn new(address: Ipv4Addr, reverse_name: impl Into<String>) -> Self {
        Self {
            address,
            reverse_name: reverse_name.into(),
        }
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxRecord {
    pub preference: u16,
    pub exchange: String,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub resolved_ip: Option<Ipv4Addr>,
}

impl MxRecord {
    pub fn new(preference: u16, exchange: impl Into<String>) -> Self {
        Self {
            preference,
            exchange: exchange.into(),
            resolved_ip: None,
        }
    }
}

/// How a domain (or e-mail) input is turned into something to connect to.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolutionMode {
    /// Connect to the host itself (A records of the domain).
    #[default]
    Host,
    /// Connect to the preferred MX exchange of the domain.
    Mx,
}

/// The value rDNS comparisons are made against.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Address(Ipv4Addr),
    Host(String),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(ip) => write!(f, "{ip}"),
            Self::Host(host) => f.write_str(host),
        }
    }
}

/// Output of the resolution layer, consumed read-only by the probe and the
/// classifier.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub subject: Subject,
    pub target: ProbeTarget,
    pub host_name: String,
    pub records: Vec<AddressRecord>,
    pub mx_records: Vec<MxRecord>,
}

impl Resolution {
    pub fn reverse_names(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.reverse_name.as_str())
    }

    pub fn has_reverse_name(&self, name: &str) -> bool {
        self.reverse_names().any(|candidate| candidate == name)
    }
}
