use clap::{ArgAction, Parser, Subcommand};
use smtpcheck_lib::probe::{DEFAULT_TIMEOUT_MS, SMTP_PORT};
use smtpcheck_lib::{CheckOptions, ResolutionMode};

#[derive(Parser)]
#[command(name = "smtpcheck-cli", version, about = "Probe an SMTP server without sending mail")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Option<Commands>,

    /// read values from stdin (one per line)
    #[arg(long)]
    pub stdin: bool,

    /// write the report to a file (json/ndjson/csv)
    #[arg(long)]
    pub out: Option<String>,

    /// format: human|json|ndjson|csv
    #[arg(long, default_value = "human")]
    pub format: String,

    /// budget for the whole SMTP transaction, in milliseconds
    #[arg(long = "timeout", default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,

    #[arg(long, default_value_t = SMTP_PORT)]
    pub port: u16,

    /// envelope sender used in MAIL FROM
    #[arg(long = "from")]
    pub mail_from: Option<String>,

    /// domain appended to the random EHLO label
    #[arg(long = "helo-domain")]
    pub helo_domain: Option<String>,

    /// probe the preferred MX exchange instead of the host itself
    #[arg(long)]
    pub mx: bool,

    /// more log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check a single domain, e-mail address or IPv4 address
    Check { value: String },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn clap_command() -> clap::Command {
        <Self as clap::CommandFactory>::command()
    }

    pub fn check_options(&self) -> CheckOptions {
        let mut options = CheckOptions {
            timeout_ms: self.timeout_ms,
            port: self.port,
            mode: if self.mx {
                ResolutionMode::Mx
            } else {
                ResolutionMode::Host
            },
            ..CheckOptions::default()
        };
        if let Some(from) = &self.mail_from {
            options.mail_from = from.clone();
        }
        if let Some(domain) = &self.helo_domain {
            options.identity_domain = domain.clone();
        }
        options
    }

    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_onto_check_options() {
        let cli = <Cli as Parser>::parse_from([
            "smtpcheck-cli",
            "--timeout",
            "2500",
            "--port",
            "2525",
            "--from",
            "bounce@example.org",
            "--mx",
            "-vv",
            "check",
            "example.org",
        ]);
        let options = cli.check_options();
        assert_eq!(options.timeout_ms, 2_500);
        assert_eq!(options.port, 2525);
        assert_eq!(options.mail_from, "bounce@example.org");
        assert_eq!(options.identity_domain, "example.com");
        assert_eq!(options.mode, ResolutionMode::Mx);
        assert_eq!(cli.log_level(), "debug");
        assert!(matches!(cli.cmd, Some(Commands::Check { ref value }) if value == "example.org"));
    }

    #[test]
    fn defaults_follow_library() {
        let cli = <Cli as Parser>::parse_from(["smtpcheck-cli", "--stdin"]);
        assert_eq!(cli.check_options(), CheckOptions::default());
        assert_eq!(cli.log_level(), "warn");
    }

    #[test]
    fn command_definition_is_consistent() {
        Cli::clap_command().debug_assert();
    }
}
