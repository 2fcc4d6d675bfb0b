#[cfg(any(feature = "with-serde", feature = "with-csv"))]
use anyhow::Context;
use anyhow::{Result, bail};

use crate::args::Cli;
use smtpcheck_lib::{CheckReport, CheckState};

pub fn write_reports(reports: &[CheckReport], cli: &Cli) -> Result<()> {
    match cli.format.as_str() {
        "human" => write_human(reports),
        "json" => write_json(reports, cli),
        "ndjson" => write_ndjson(reports, cli),
        "csv" => write_csv(reports, cli),
        other => bail!("unknown --format '{other}', use: human|json|ndjson|csv"),
    }
}

pub fn any_incomplete(reports: &[CheckReport]) -> bool {
    reports.iter().any(|report| !report.is_complete())
}

fn write_human(reports: &[CheckReport]) -> Result<()> {
    for report in reports {
        println!("{}", render_human(report));
    }
    Ok(())
}

pub fn render_human(report: &CheckReport) -> String {
    let mut lines = Vec::new();
    if report.is_complete() {
        lines.push(format!("[OK]     {}", report.value));
    } else {
        lines.push(format!(
            "[FAILED] {} :: {}",
            report.value,
            report.errors.join("; ")
        ));
    }
    if let Some(host) = &report.host_name {
        lines.push(format!("         host: {host}"));
    }
    if let Some(banner) = &report.smtp_banner {
        lines.push(format!("         banner: {banner}"));
    }
    if let (Some(connect), Some(transaction)) =
        (report.connection_time_ms, report.transaction_time_ms)
    {
        lines.push(format!(
            "         time: connect {connect} ms, transaction {transaction} ms"
        ));
    }
    for (check, state) in report.checks.iter() {
        lines.push(format!(
            "         {:<14} {}",
            check.as_str(),
            state_label(state, report.is_complete())
        ));
    }
    lines.join("\n")
}

fn state_label(state: &CheckState, complete: bool) -> String {
    match (&state.error, state.result) {
        (_, true) => "pass".to_string(),
        (Some(error), false) => format!("FAIL ({error})"),
        (None, false) if complete => "FAIL".to_string(),
        (None, false) => "not run".to_string(),
    }
}

#[cfg(feature = "with-serde")]
fn write_json(reports: &[CheckReport], cli: &Cli) -> Result<()> {
    let s = serde_json::to_string_pretty(reports)?;
    if let Some(path) = &cli.out {
        write_all_atomically(path, s.as_bytes())?;
    } else {
        println!("{s}");
    }
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn write_json(_: &[CheckReport], _: &Cli) -> Result<()> {
    bail!("format=json requires the 'with-serde' feature")
}

#[cfg(feature = "with-serde")]
fn write_ndjson(reports: &[CheckReport], cli: &Cli) -> Result<()> {
    if let Some(path) = &cli.out {
        let mut buf = Vec::new();
        for report in reports {
            let line = serde_json::to_string(report)?;
            buf.extend_from_slice(line.as_bytes());
            buf.push(b'\n');
        }
        write_all_atomically(path, &buf)?;
    } else {
        for report in reports {
            println!("{}", serde_json::to_string(report)?);
        }
    }
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn write_ndjson(_: &[CheckReport], _: &Cli) -> Result<()> {
    bail!("format=ndjson requires the 'with-serde' feature")
}

#[cfg(feature = "with-csv")]
fn write_csv(reports: &[CheckReport], cli: &Cli) -> Result<()> {
    if let Some(path) = &cli.out {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        for report in reports {
            wtr.write_record(csv_record(report))?;
        }
        let data = wtr.into_inner()?;
        write_all_atomically(path, &data)?;
    } else {
        let mut wtr = csv::Writer::from_writer(std::io::stdout());
        for report in reports {
            wtr.write_record(csv_record(report))?;
        }
        wtr.flush()?;
    }
    Ok(())
}

#[cfg(not(feature = "with-csv"))]
fn write_csv(_: &[CheckReport], _: &Cli) -> Result<()> {
    bail!("format=csv requires the 'with-csv' feature")
}

/// value, host, one column per check, connect ms, transaction ms, errors.
#[cfg(feature = "with-csv")]
fn csv_record(report: &CheckReport) -> Vec<String> {
    let mut record = vec![
        report.value.clone(),
        report.host_name.clone().unwrap_or_default(),
    ];
    record.extend(
        report
            .checks
            .iter()
            .map(|(_, state)| state.result.to_string()),
    );
    record.push(opt_ms(report.connection_time_ms));
    record.push(opt_ms(report.transaction_time_ms));
    record.push(report.errors.join("|"));
    record
}

#[cfg(feature = "with-csv")]
fn opt_ms(ms: Option<u64>) -> String {
    ms.map(|ms| ms.to_string()).unwrap_or_default()
}

#[cfg(any(feature = "with-serde", feature = "with-csv"))]
fn write_all_atomically(path: &str, bytes: &[u8]) -> Result<()> {
    use std::io::Write;

    let tmp = format!("{path}.tmp");
    {
        let mut f = std::fs::File::create(&tmp).with_context(|| format!("create {tmp}"))?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp, path).with_context(|| format!("rename {tmp} -> {path}"))?;
    Ok(())
}
