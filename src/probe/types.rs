use std::fmt;
use std::net::Ipv4Addr;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

/// Label used for the unsolicited greeting in the transcript.
pub const CONNECT_LABEL: &str = "CONNECT";

/// Reporting convention: the summed per-step latency is scaled by this factor
/// to give `total_transaction_ms`. It is not a measurement.
pub const TRANSACTION_TIME_MULTIPLIER: u64 = 5;

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Ip,
    Domain,
    MxBacked,
}

/// Host the probe connects to.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub host: String,
    pub resolved_address: Option<Ipv4Addr>,
    pub kind: TargetKind,
}

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Ehlo,
    MailFrom,
    RcptTo,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ehlo => "EHLO",
            Self::MailFrom => "MAIL FROM",
            Self::RcptTo => "RCPT TO",
        })
    }
}

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandStep {
    pub command: String,
    pub kind: StepKind,
}

/// The three commands of one probe, in sending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandScript {
    pub ehlo: CommandStep,
    pub mail_from: CommandStep,
    pub rcpt_to: CommandStep,
}

impl CommandScript {
    pub fn step(&self, kind: StepKind) -> &CommandStep {
        match kind {
            StepKind::Ehlo => &self.ehlo,
            StepKind::MailFrom => &self.mail_from,
            StepKind::RcptTo => &self.rcpt_to,
        }
    }

    pub fn steps(&self) -> [&CommandStep; 3] {
        [&self.ehlo, &self.mail_from, &self.rcpt_to]
    }
}

/// A complete (possibly multi-line) SMTP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    pub code: u16,
    /// Full reply lines, status code included, CRLF stripped.
    pub lines: Vec<String>,
}

impl SmtpReply {
    /// The reply as received on the wire.
    pub fn raw(&self) -> String {
        let mut raw = String::new();
        for line in &self.lines {
            raw.push_str(line);
            raw.push_str("\r\n");
        }
        raw
    }

    /// Text after the status code and separator of the first line.
    pub fn first_text(&self) -> &str {
        self.lines
            .first()
            .and_then(|line| line.get(4..))
            .unwrap_or_default()
    }
}

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    /// `CONNECT` for the greeting, otherwise the literal command sent.
    pub command: String,
    #[cfg_attr(feature = "with-serde", serde(rename = "response"))]
    pub raw: String,
    pub lines: Vec<String>,
    pub status: u16,
    #[cfg_attr(feature = "with-serde", serde(rename = "time"))]
    pub elapsed_ms: u64,
}

impl TranscriptEntry {
    pub(crate) fn new(command: impl Into<String>, reply: SmtpReply, elapsed_ms: u64) -> Self {
        Self {
            command: command.into(),
            raw: reply.raw(),
            status: reply.code,
            lines: reply.lines,
            elapsed_ms,
        }
    }

    pub fn is_greeting(&self) -> bool {
        self.command == CONNECT_LABEL
    }
}

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub transcript: Vec<TranscriptEntry>,
    pub connection_latency_ms: u64,
    pub total_transaction_ms: u64,
    pub banner_host: Option<String>,
}

impl ProbeResult {
    /// Greeting plus one reply per command.
    pub const COMPLETE_LEN: usize = 4;

    pub fn is_complete(&self) -> bool {
        self.transcript.len() == Self::COMPLETE_LEN
    }

    /// Reply recorded for the command of the given kind.
    pub fn reply_to(&self, kind: StepKind) -> Option<&TranscriptEntry> {
        let index = match kind {
            StepKind::Ehlo => 1,
            StepKind::MailFrom => 2,
            StepKind::RcptTo => 3,
        };
        self.transcript.get(index)
    }
}

/// First whitespace-delimited token after the greeting's status code.
pub(crate) fn banner_host(greeting: &SmtpReply) -> Option<String> {
    greeting
        .first_text()
        .split_whitespace()
        .next()
        .map(str::to_string)
}
