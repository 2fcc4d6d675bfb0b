//! SMTP probe engine.
//!
//! [`probe`] opens one connection to the target, waits for the greeting and
//! then sends `EHLO`, `MAIL FROM` and `RCPT TO`, each only after the previous
//! reply is complete. The transcript, per-step latency and banner host are
//! returned as a [`ProbeResult`]. A single deadline covers the whole exchange;
//! nothing is retried.

mod error;
mod identity;
mod options;
mod session;
mod types;

pub use error::ProbeError;
pub use identity::{LABEL_LEN, ProbeIdentity, RELAY_LOCAL_PART, random_label};
pub use options::{DEFAULT_TIMEOUT_MS, ProbeOptions, SMTP_PORT};
pub use types::{
    CONNECT_LABEL, CommandScript, CommandStep, ProbeResult, ProbeTarget, SmtpReply, StepKind,
    TRANSACTION_TIME_MULTIPLIER, TargetKind, TranscriptEntry,
};

use std::net::{SocketAddr, SocketAddrV4, ToSocketAddrs};
use std::time::Instant;

use rand::Rng;
use tracing::{debug, info, warn};

use session::SmtpSession;
use types::banner_host;

/// Probe `target` with a thread-local random identity.
pub fn probe(target: &ProbeTarget, options: &ProbeOptions) -> Result<ProbeResult, ProbeError> {
    probe_with_rng(target, options, &mut rand::thread_rng())
}

/// Same as [`probe`], drawing the EHLO label from `rng`.
pub fn probe_with_rng<R: Rng + ?Sized>(
    target: &ProbeTarget,
    options: &ProbeOptions,
    rng: &mut R,
) -> Result<ProbeResult, ProbeError> {
    let identity = ProbeIdentity::generate(rng, &options.identity_domain, &options.mail_from);
    ProbeRun::new(target, options, identity.script()).run()
}

/// Where the exchange stands. Every state after `Connecting` owns the open
/// session; a failure drops it, which closes the socket.
enum ProbeState {
    Connecting,
    AwaitingGreeting(SmtpSession),
    Ehlo(SmtpSession),
    MailFrom(SmtpSession),
    RcptTo(SmtpSession),
    Closing(SmtpSession),
    Done,
}

impl ProbeState {
    fn name(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::AwaitingGreeting(_) => "awaiting-greeting",
            Self::Ehlo(_) => "ehlo",
            Self::MailFrom(_) => "mail-from",
            Self::RcptTo(_) => "rcpt-to",
            Self::Closing(_) => "closing",
            Self::Done => "done",
        }
    }
}

struct ProbeRun<'a> {
    target: &'a ProbeTarget,
    options: &'a ProbeOptions,
    script: CommandScript,
    started: Instant,
    transcript: Vec<TranscriptEntry>,
    banner_host: Option<String>,
}

impl<'a> ProbeRun<'a> {
    fn new(target: &'a ProbeTarget, options: &'a ProbeOptions, script: CommandScript) -> Self {
        Self {
            target,
            options,
            script,
            started: Instant::now(),
            transcript: Vec::with_capacity(ProbeResult::COMPLETE_LEN),
            banner_host: None,
        }
    }

    fn run(mut self) -> Result<ProbeResult, ProbeError> {
        let mut state = ProbeState::Connecting;
        loop {
            let from = state.name();
            state = match self.advance(state) {
                Ok(ProbeState::Done) => break,
                Ok(next) => next,
                Err(err) => {
                    warn!(host = %self.target.host, state = from, error = %err, "probe failed");
                    return Err(err);
                }
            };
            debug!(host = %self.target.host, from, to = state.name(), "probe state");
        }
        Ok(self.finish())
    }

    fn advance(&mut self, state: ProbeState) -> Result<ProbeState, ProbeError> {
        Ok(match state {
            ProbeState::Connecting => ProbeState::AwaitingGreeting(self.connect()?),
            ProbeState::AwaitingGreeting(mut session) => {
                self.greeting(&mut session)?;
                ProbeState::Ehlo(session)
            }
            ProbeState::Ehlo(mut session) => {
                self.exchange(&mut session, StepKind::Ehlo)?;
                ProbeState::MailFrom(session)
            }
            ProbeState::MailFrom(mut session) => {
                self.exchange(&mut session, StepKind::MailFrom)?;
                ProbeState::RcptTo(session)
            }
            ProbeState::RcptTo(mut session) => {
                self.exchange(&mut session, StepKind::RcptTo)?;
                ProbeState::Closing(session)
            }
            ProbeState::Closing(session) => {
                session.quit();
                ProbeState::Done
            }
            ProbeState::Done => ProbeState::Done,
        })
    }

    fn connect(&self) -> Result<SmtpSession, ProbeError> {
        let addrs = self.socket_addrs()?;
        SmtpSession::connect(
            &self.target.host,
            &addrs,
            self.started,
            self.options.timeout(),
        )
    }

    fn socket_addrs(&self) -> Result<Vec<SocketAddr>, ProbeError> {
        let port = self.options.port;
        if let Some(ip) = self.target.resolved_address {
            return Ok(vec![SocketAddr::V4(SocketAddrV4::new(ip, port))]);
        }
        let addrs = (self.target.host.as_str(), port)
            .to_socket_addrs()
            .map_err(|err| ProbeError::connect(&self.target.host, err))?;
        // IPv4 only
        Ok(addrs.filter(SocketAddr::is_ipv4).collect())
    }

    fn greeting(&mut self, session: &mut SmtpSession) -> Result<(), ProbeError> {
        let reply = session.read_reply(CONNECT_LABEL)?;
        if reply.code != 220 {
            debug!(host = %self.target.host, code = reply.code, "unexpected greeting code");
        }
        self.banner_host = banner_host(&reply);
        let elapsed = elapsed_ms(self.started);
        self.transcript
            .push(TranscriptEntry::new(CONNECT_LABEL, reply, elapsed));
        Ok(())
    }

    fn exchange(&mut self, session: &mut SmtpSession, kind: StepKind) -> Result<(), ProbeError> {
        let command = self.script.step(kind).command.clone();
        let sent = Instant::now();
        session.send_command(&command)?;
        let reply = session.read_reply(&kind.to_string())?;
        let elapsed = elapsed_ms(sent);
        debug!(host = %self.target.host, %kind, code = reply.code, elapsed, "reply");
        self.transcript
            .push(TranscriptEntry::new(command, reply, elapsed));
        Ok(())
    }

    fn finish(self) -> ProbeResult {
        let connection_latency_ms = self
            .transcript
            .first()
            .map(|entry| entry.elapsed_ms)
            .unwrap_or_default();
        let total_transaction_ms = transaction_time(&self.transcript);
        info!(
            host = %self.target.host,
            connection_latency_ms,
            total_transaction_ms,
            "probe complete"
        );
        ProbeResult {
            transcript: self.transcript,
            connection_latency_ms,
            total_transaction_ms,
            banner_host: self.banner_host,
        }
    }
}

/// Sum of the per-step latencies scaled by [`TRANSACTION_TIME_MULTIPLIER`].
pub fn transaction_time(transcript: &[TranscriptEntry]) -> u64 {
    transcript
        .iter()
        .map(|entry| entry.elapsed_ms)
        .sum::<u64>()
        .saturating_mul(TRANSACTION_TIME_MULTIPLIER)
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
pub(crate) mod tests;
