use std::net::{IpAddr, Ipv4Addr};

use trust_dns_resolver::{
    Resolver,
    error::{ResolveError, ResolveErrorKind},
};

use super::MxRecord;

/// DNS queries the resolution layer needs.
///
/// "No records" answers are reported as `Ok(vec![])`; any other failure is
/// passed through as the resolver's error.
pub trait DnsLookup {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveError>;
    fn lookup_ipv4(&self, host: &str) -> Result<Vec<Ipv4Addr>, ResolveError>;
    fn lookup_ptr(&self, address: Ipv4Addr) -> Result<Vec<String>, ResolveError>;
}

impl DnsLookup for Resolver {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveError> {
        let lookup = match Resolver::mx_lookup(self, domain) {
            Ok(lookup) => lookup,
            Err(err) if is_no_records(&err) => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        let mut records = Vec::new();
        for mx in lookup.iter() {
            let exchange = normalize_exchange(mx.exchange().to_utf8());
            records.push(MxRecord::new(mx.preference(), exchange));
        }
        Ok(records)
    }

    fn lookup_ipv4(&self, host: &str) -> Result<Vec<Ipv4Addr>, ResolveError> {
        let lookup = match Resolver::ipv4_lookup(self, host) {
            Ok(lookup) => lookup,
            Err(err) if is_no_records(&err) => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        Ok(lookup.iter().map(|a| Ipv4Addr::from(*a)).collect())
    }

    fn lookup_ptr(&self, address: Ipv4Addr) -> Result<Vec<String>, ResolveError> {
        let lookup = match Resolver::reverse_lookup(self, IpAddr::V4(address)) {
            Ok(lookup) => lookup,
            Err(err) if is_no_records(&err) => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        Ok(lookup
            .iter()
            .map(|ptr| normalize_ptr(&ptr.to_string()))
            .collect())
    }
}

fn is_no_records(err: &ResolveError) -> bool {
    matches!(err.kind(), ResolveErrorKind::NoRecordsFound { .. })
}

pub(crate) fn normalize_exchange(exchange: String) -> String {
    let trimmed = exchange.trim_end_matches('.');
    trimmed.to_ascii_lowercase()
}

/// PTR names keep their case; only the root dot goes.
pub(crate) fn normalize_ptr(name: &str) -> String {
    name.trim_end_matches('.').to_string()
}
