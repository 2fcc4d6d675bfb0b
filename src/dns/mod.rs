//! DNS side of a check: turns a classified input into a connectable
//! [`ProbeTarget`] plus the A/PTR pairs used for rDNS comparisons.
//!
//! All queries go through the [`DnsLookup`] trait; the system resolver
//! implements it, tests substitute a stub.

mod error;
mod resolver;
mod types;

pub use error::{RecordType, ResolutionError};
pub use resolver::DnsLookup;
pub use types::{AddressRecord, MxRecord, Resolution, ResolutionMode, Subject};

use std::net::Ipv4Addr;
use std::thread;

use tracing::{debug, warn};

use crate::input::{ClassifiedInput, InputKind};
use crate::probe::{ProbeTarget, TargetKind};

/// Resolve `input` into a [`Resolution`].
///
/// IP inputs always follow the PTR → A → PTR chain; `mode` only affects
/// domain and e-mail inputs.
pub fn resolve<R>(
    input: &ClassifiedInput,
    resolver: &R,
    mode: ResolutionMode,
) -> Result<Resolution, ResolutionError>
where
    R: DnsLookup + Sync,
{
    match (&input.kind, mode) {
        (InputKind::Ip(ip), _) => resolve_ip(resolver, *ip),
        (InputKind::Domain(domain) | InputKind::Email { domain, .. }, ResolutionMode::Host) => {
            resolve_domain(resolver, domain)
        }
        (InputKind::Domain(domain) | InputKind::Email { domain, .. }, ResolutionMode::Mx) => {
            resolve_via_mx(resolver, domain)
        }
    }
}

/// PTR(ip) → first name → A(name) → PTR(each address).
pub fn resolve_ip<R>(resolver: &R, ip: Ipv4Addr) -> Result<Resolution, ResolutionError>
where
    R: DnsLookup + Sync,
{
    let host_name = first_ptr(resolver, ip)?;
    let addresses = forward(resolver, &host_name)?;
    let records = reverse_all(resolver, &addresses)?;
    debug!(%ip, host = %host_name, records = records.len(), "resolved IP input");

    Ok(Resolution {
        subject: Subject::Address(ip),
        target: ProbeTarget {
            host: ip.to_string(),
            resolved_address: Some(ip),
            kind: TargetKind::Ip,
        },
        host_name,
        records,
        mx_records: Vec::new(),
    })
}

/// A(domain) → PTR(each address).
pub fn resolve_domain<R>(resolver: &R, domain: &str) -> Result<Resolution, ResolutionError>
where
    R: DnsLookup + Sync,
{
    let addresses = forward(resolver, domain)?;
    let records = reverse_all(resolver, &addresses)?;
    debug!(domain, records = records.len(), "resolved domain input");

    Ok(Resolution {
        subject: Subject::Host(domain.to_string()),
        target: ProbeTarget {
            host: domain.to_string(),
            resolved_address: addresses.first().copied(),
            kind: TargetKind::Domain,
        },
        host_name: domain.to_string(),
        records,
        mx_records: Vec::new(),
    })
}

/// MX records of `domain`, ascending by preference (ties keep answer order),
/// each enriched with its first A record when that lookup succeeds.
///
/// No MX records is an empty list, not an error.
pub fn resolve_mx<R: DnsLookup>(
    resolver: &R,
    domain: &str,
) -> Result<Vec<MxRecord>, ResolutionError> {
    let mut records = resolver
        .lookup_mx(domain)
        .map_err(|err| ResolutionError::lookup(RecordType::Mx, domain, err))?;
    records.sort_by_key(|record| record.preference);

    for record in &mut records {
        match resolver.lookup_ipv4(&record.exchange) {
            Ok(addresses) => record.resolved_ip = addresses.first().copied(),
            Err(err) => {
                debug!(exchange = %record.exchange, error = %err, "MX exchange has no usable A record");
            }
        }
    }
    Ok(records)
}

fn resolve_via_mx<R>(resolver: &R, domain: &str) -> Result<Resolution, ResolutionError>
where
    R: DnsLookup + Sync,
{
    let mx_records = resolve_mx(resolver, domain)?;
    let Some(primary) = mx_records.first() else {
        warn!(domain, "no MX records");
        return Err(ResolutionError::empty(RecordType::Mx, domain));
    };

    let exchange = primary.exchange.clone();
    let addresses = match primary.resolved_ip {
        Some(ip) => vec![ip],
        None => forward(resolver, &exchange)?,
    };
    let records = reverse_all(resolver, &addresses)?;
    debug!(domain, %exchange, records = records.len(), "resolved MX target");

    Ok(Resolution {
        subject: Subject::Host(exchange.clone()),
        target: ProbeTarget {
            host: exchange.clone(),
            resolved_address: addresses.first().copied(),
            kind: TargetKind::MxBacked,
        },
        host_name: exchange,
        records,
        mx_records,
    })
}

fn first_ptr<R: DnsLookup>(resolver: &R, ip: Ipv4Addr) -> Result<String, ResolutionError> {
    let names = resolver
        .lookup_ptr(ip)
        .map_err(|err| ResolutionError::lookup(RecordType::Ptr, ip.to_string(), err))?;
    names
        .into_iter()
        .next()
        .ok_or_else(|| ResolutionError::empty(RecordType::Ptr, ip.to_string()))
}

fn forward<R: DnsLookup>(resolver: &R, host: &str) -> Result<Vec<Ipv4Addr>, ResolutionError> {
    let addresses = resolver
        .lookup_ipv4(host)
        .map_err(|err| ResolutionError::lookup(RecordType::A, host, err))?;
    if addresses.is_empty() {
        return Err(ResolutionError::empty(RecordType::A, host));
    }
    Ok(addresses)
}

/// Most PTR lookups in flight at once.
pub(crate) const PTR_BATCH: usize = 8;

/// PTR lookups for every address, issued concurrently in batches of
/// [`PTR_BATCH`]. Each record pairs an address with the answer of its own
/// lookup; output order follows `addresses`.
fn reverse_all<R>(resolver: &R, addresses: &[Ipv4Addr]) -> Result<Vec<AddressRecord>, ResolutionError>
where
    R: DnsLookup + Sync,
{
    let mut records = Vec::with_capacity(addresses.len());
    for batch in addresses.chunks(PTR_BATCH) {
        records.extend(reverse_batch(resolver, batch)?);
    }
    Ok(records)
}

fn reverse_batch<R>(resolver: &R, batch: &[Ipv4Addr]) -> Result<Vec<AddressRecord>, ResolutionError>
where
    R: DnsLookup + Sync,
{
    thread::scope(|scope| {
        let handles: Vec<_> = batch
            .iter()
            .map(|&address| {
                scope.spawn(move || {
                    first_ptr(resolver, address).map(|name| AddressRecord::new(address, name))
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            })
            .collect()
    })
}
