#![forbid(unsafe_code)]
//! smtpcheck_lib: DNS + SMTP reachability probe for a domain, e-mail address
//! or IPv4 host.

pub mod check;
pub mod classify;
pub mod dns;
pub mod input;
pub mod probe;

pub use check::{CheckError, CheckOptions, CheckReport, CheckState, Checks, check, check_with_resolver};
pub use classify::{CheckName, CheckOutcome, classify};
pub use dns::{
    AddressRecord, DnsLookup, MxRecord, RecordType, Resolution, ResolutionError, ResolutionMode,
    resolve, resolve_mx,
};
pub use input::{ClassifiedInput, InputKind, classify_input};
pub use probe::{ProbeError, ProbeOptions, ProbeResult, ProbeTarget, TranscriptEntry, probe};
