//! Turns a completed probe transcript and its resolution records into
//! [`CheckOutcome`]s. Pure: no I/O, no shared state.

mod types;

pub use types::{CheckName, CheckOutcome};

use std::sync::LazyLock;

use regex::Regex;

use crate::dns::{Resolution, Subject};
use crate::probe::{ProbeResult, StepKind, TranscriptEntry};

const STARTTLS_MARKER: &str = "250-STARTTLS";
const RELAY_ACCEPTED: u16 = 250;

static EHLO_HOST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^250[- ](\S+)").unwrap_or_else(|err| panic!("ehlo pattern: {err}"))
});

/// Evaluate every transcript rule. Each rule stands alone: missing data makes
/// that rule fail with a detail, never the others.
///
/// A transcript shorter than greeting + three replies means the probe did not
/// finish, and no rule is evaluated.
pub fn classify(probe: &ProbeResult, resolution: &Resolution) -> Vec<CheckOutcome> {
    if !probe.is_complete() {
        return Vec::new();
    }
    vec![
        rdns_mismatch(resolution),
        banner_check(probe, resolution),
        valid_hostname(probe, resolution),
        support_tls(probe),
        open_relay(probe),
    ]
}

/// IP subject: some forward address equals it. Host subject: some PTR name
/// equals it, exact and case-sensitive.
pub fn rdns_mismatch(resolution: &Resolution) -> CheckOutcome {
    let check = CheckName::RDnsMismatch;
    match &resolution.subject {
        Subject::Address(ip) => CheckOutcome::from_bool(
            check,
            resolution.records.iter().any(|r| r.address == *ip),
            || {
                format!(
                    "{ip} not among forward addresses of {}: [{}]",
                    resolution.host_name,
                    join(resolution.records.iter().map(|r| r.address.to_string()))
                )
            },
        ),
        Subject::Host(host) => CheckOutcome::from_bool(check, resolution.has_reverse_name(host), || {
            format!(
                "{host} does not match rDNS [{}]",
                join(resolution.reverse_names().map(str::to_string))
            )
        }),
    }
}

pub fn banner_check(probe: &ProbeResult, resolution: &Resolution) -> CheckOutcome {
    let check = CheckName::BannerCheck;
    match probe.banner_host.as_deref() {
        None => CheckOutcome::fail(check, "greeting carries no host name"),
        Some(banner) => CheckOutcome::from_bool(check, resolution.has_reverse_name(banner), || {
            format!(
                "banner host {banner} does not match rDNS [{}]",
                join(resolution.reverse_names().map(str::to_string))
            )
        }),
    }
}

pub fn valid_hostname(probe: &ProbeResult, resolution: &Resolution) -> CheckOutcome {
    let check = CheckName::ValidHostname;
    let Some(ehlo) = probe.reply_to(StepKind::Ehlo) else {
        return CheckOutcome::fail(check, "no EHLO reply recorded");
    };
    let Some(hostname) = ehlo_hostname(ehlo) else {
        return CheckOutcome::fail(
            check,
            format!("EHLO reply does not advertise a hostname: '{}'", first_line(ehlo)),
        );
    };
    CheckOutcome::from_bool(check, resolution.has_reverse_name(hostname), || {
        format!(
            "EHLO hostname {hostname} does not match rDNS [{}]",
            join(resolution.reverse_names().map(str::to_string))
        )
    })
}

pub fn support_tls(probe: &ProbeResult) -> CheckOutcome {
    let check = CheckName::SupportTls;
    let Some(ehlo) = probe.reply_to(StepKind::Ehlo) else {
        return CheckOutcome::fail(check, "no EHLO reply recorded");
    };
    let advertised = ehlo.raw.contains(STARTTLS_MARKER)
        || ehlo.lines.iter().any(|line| {
            line.get(4..)
                .and_then(|text| text.split_whitespace().next())
                .is_some_and(|keyword| keyword.eq_ignore_ascii_case("STARTTLS"))
        });
    CheckOutcome::from_bool(check, advertised, || {
        "STARTTLS not advertised in EHLO reply".to_string()
    })
}

/// Passed means the relay is closed: the foreign recipient was not accepted.
pub fn open_relay(probe: &ProbeResult) -> CheckOutcome {
    let check = CheckName::OpenRelay;
    let Some(rcpt) = probe.reply_to(StepKind::RcptTo) else {
        return CheckOutcome::fail(check, "no RCPT TO reply recorded");
    };
    CheckOutcome::from_bool(check, rcpt.status != RELAY_ACCEPTED, || {
        format!(
            "open relay risk: '{}' accepted with {}",
            rcpt.command, rcpt.status
        )
    })
}

fn ehlo_hostname(entry: &TranscriptEntry) -> Option<&str> {
    let line = entry.lines.first()?;
    EHLO_HOST_RE
        .captures(line)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}

fn first_line(entry: &TranscriptEntry) -> &str {
    entry.lines.first().map(String::as_str).unwrap_or_default()
}

fn join(items: impl Iterator<Item = String>) -> String {
    items.collect::<Vec<_>>().join(", ")
}
