mod args;
mod output;

use std::io::{self, BufRead};

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use trust_dns_resolver::Resolver;

use args::{Cli, Commands};
use smtpcheck_lib::{CheckReport, check, check_with_resolver};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let options = cli.check_options();
    let mut reports: Vec<CheckReport> = Vec::new();

    if cli.stdin {
        let resolver = Resolver::from_system_conf().context("initialise DNS resolver")?;
        let mut rng = rand::thread_rng();
        for line in io::stdin().lock().lines() {
            let line = line.context("read stdin")?;
            let value = line.trim();
            if value.is_empty() {
                continue;
            }
            reports.push(check_with_resolver(value, &options, &resolver, &mut rng));
        }
    } else if let Some(Commands::Check { value }) = &cli.cmd {
        reports.push(check(value, &options)?);
    } else {
        Cli::clap_command().print_help()?;
        println!();
        return Ok(());
    }

    output::write_reports(&reports, &cli)?;

    // exit codes: 0 complete, 2 short-circuited, 1 fatal
    if output::any_incomplete(&reports) {
        std::process::exit(2);
    }
    Ok(())
}

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("smtpcheck_lib={}", cli.log_level())));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}
