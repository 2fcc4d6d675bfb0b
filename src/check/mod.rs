//! End-to-end check of one value: classify the input, resolve it, probe the
//! SMTP server and classify the transcript.
//!
//! Each stage hands an immutable value to the next. The first failing stage
//! ends the pipeline and the report is built from what was gathered so far.

mod error;
mod options;
mod report;

pub use error::CheckError;
pub use options::CheckOptions;
pub use report::{CheckReport, CheckState, Checks};

use rand::Rng;
use tracing::{debug, info, warn};
use trust_dns_resolver::Resolver;

use crate::classify::classify;
use crate::dns::{DnsLookup, resolve};
use crate::input::classify_input;
use crate::probe::probe_with_rng;

/// Check `value` using the system resolver configuration.
///
/// Only a resolver that cannot be built is an error; every other failure is
/// recorded in the returned report.
pub fn check(value: &str, options: &CheckOptions) -> Result<CheckReport, CheckError> {
    let resolver = Resolver::from_system_conf().map_err(CheckError::resolver_init)?;
    Ok(check_with_resolver(
        value,
        options,
        &resolver,
        &mut rand::thread_rng(),
    ))
}

pub fn check_with_resolver<D, R>(
    value: &str,
    options: &CheckOptions,
    resolver: &D,
    rng: &mut R,
) -> CheckReport
where
    D: DnsLookup + Sync,
    R: Rng + ?Sized,
{
    let input = match classify_input(value) {
        Ok(input) => input,
        Err(err) => {
            warn!(value, error = %err, "input rejected");
            return CheckReport::rejected(value, &err);
        }
    };
    debug!(value, kind = %input.kind, "input classified");

    let resolution = match resolve(&input, resolver, options.mode) {
        Ok(resolution) => resolution,
        Err(err) => {
            warn!(value, error = %err, "resolution failed");
            return CheckReport::unresolved(value, &err);
        }
    };

    let probe = match probe_with_rng(&resolution.target, &options.probe_options(), rng) {
        Ok(probe) => probe,
        Err(err) => {
            warn!(value, host = %resolution.target.host, error = %err, "probe failed");
            return CheckReport::unreachable(value, resolution, &err);
        }
    };

    let outcomes = classify(&probe, &resolution);
    let failed = outcomes.iter().filter(|outcome| !outcome.passed).count();
    info!(value, host = %resolution.target.host, failed, "check complete");
    CheckReport::completed(value, resolution, probe, outcomes)
}

#[cfg(test)]
mod tests;
