//! Recognises the value handed to [`check`](crate::check): an IPv4 literal,
//! a domain name or an e-mail address.

mod types;

pub use types::{ClassifiedInput, InputKind};

use std::net::Ipv4Addr;
use std::sync::LazyLock;

use regex::Regex;

use crate::dns::ResolutionError;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(?:[^<>()\[\]\\.,:\s@"]+(?:\.[^<>()\[\]\\.,:\s@"]+)*|".+")@(\[[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\]|(?:[a-z0-9-]+\.)+[a-z]{2,})$"#,
    )
    .unwrap_or_else(|err| panic!("email pattern: {err}"))
});

static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9_-]+\.[.a-z0-9_-]+$").unwrap_or_else(|err| panic!("domain pattern: {err}"))
});

/// Classify `raw` after trimming and lower-casing it.
///
/// IPv4 literals win over the domain pattern (a dotted quad is also a
/// syntactically valid domain). An e-mail address yields its domain; a
/// bracketed IPv4 literal (`user@[192.0.2.1]`) yields the address.
///
/// Internationalised domains are converted to their ASCII form before the
/// patterns are applied.
pub fn classify_input(raw: &str) -> Result<ClassifiedInput, ResolutionError> {
    let normalized = raw.trim().to_lowercase();
    let invalid = || ResolutionError::pattern_invalid(raw);

    if normalized.is_empty() {
        return Err(invalid());
    }

    if let Ok(ip) = normalized.parse::<Ipv4Addr>() {
        return Ok(ClassifiedInput {
            original: raw.to_string(),
            normalized,
            kind: InputKind::Ip(ip),
        });
    }

    let ascii = ascii_form(&normalized).map_err(|_| invalid())?;

    if let Some(captures) = EMAIL_RE.captures(&ascii) {
        let domain_part = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        let local = ascii
            .rsplit_once('@')
            .map(|(local, _)| local.to_string())
            .unwrap_or_default();

        let literal = domain_part
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'));
        let kind = match literal {
            Some(ip) => InputKind::Ip(ip.parse().map_err(|_| invalid())?),
            None => InputKind::Email {
                local,
                domain: to_ascii_domain(domain_part)?,
            },
        };
        return Ok(ClassifiedInput {
            original: raw.to_string(),
            normalized,
            kind,
        });
    }

    if DOMAIN_RE.is_match(&ascii) {
        let domain = to_ascii_domain(&ascii)?;
        return Ok(ClassifiedInput {
            original: raw.to_string(),
            normalized,
            kind: InputKind::Domain(domain),
        });
    }

    Err(invalid())
}

/// `value` with its domain part (everything after the last `@`, or the whole
/// value) in IDNA ASCII form. Pure ASCII values are returned as they are.
fn ascii_form(value: &str) -> Result<String, ResolutionError> {
    if value.is_ascii() {
        return Ok(value.to_string());
    }
    match value.rsplit_once('@') {
        Some((local, domain)) => Ok(format!("{local}@{}", to_ascii_domain(domain)?)),
        None => to_ascii_domain(value),
    }
}

fn to_ascii_domain(domain: &str) -> Result<String, ResolutionError> {
    let trimmed = domain.trim_end_matches('.');
    idna::domain_to_ascii(trimmed).map_err(ResolutionError::idna)
}
