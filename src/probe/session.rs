use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use super::error::ProbeError;
use super::types::SmtpReply;

/// Longest reply line accepted, CRLF included (RFC 5321 4.5.3.1.5).
pub(crate) const MAX_REPLY_LINE: usize = 512;

/// One SMTP connection bound to a single transaction deadline.
pub(crate) struct SmtpSession {
    host: String,
    stream: TcpStream,
    reader: BufReader<TcpStream>,
    deadline: Instant,
    timeout: Duration,
}

impl SmtpSession {
    /// Connect to the first reachable address. The deadline starts at
    /// `started` and also bounds the connect itself.
    pub(crate) fn connect(
        host: &str,
        addrs: &[SocketAddr],
        started: Instant,
        timeout: Duration,
    ) -> Result<Self, ProbeError> {
        let deadline = started + timeout;
        let mut last_err = None;
        for addr in addrs {
            let remaining = remaining(deadline).ok_or_else(|| timed_out(host, timeout))?;
            match TcpStream::connect_timeout(addr, remaining) {
                Ok(stream) => {
                    debug!(host, %addr, "connected");
                    let reader =
                        BufReader::new(stream.try_clone().map_err(|source| ProbeError::Io { source })?);
                    return Ok(Self {
                        host: host.to_string(),
                        stream,
                        reader,
                        deadline,
                        timeout,
                    });
                }
                Err(err) if is_timeout(&err) => return Err(timed_out(host, timeout)),
                Err(err) => {
                    debug!(host, %addr, error = %err, "connect failed");
                    last_err = Some(err);
                }
            }
        }
        let source = last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "no socket address available",
            )
        });
        Err(ProbeError::connect(host, source))
    }

    pub(crate) fn send_command(&mut self, command: &str) -> Result<(), ProbeError> {
        let remaining = self.remaining_or_abort()?;
        self.stream
            .set_write_timeout(Some(remaining))
            .map_err(|source| ProbeError::Io { source })?;

        let mut line = command.as_bytes().to_vec();
        line.extend_from_slice(b"\r\n");
        trace!(host = %self.host, command, "C:");
        let written = self.stream.write_all(&line).and_then(|()| self.stream.flush());
        written.map_err(|err| self.io_failure(err))
    }

    /// Read one complete reply: continuation lines (`NNN-`) up to the final
    /// line (`NNN ` or bare `NNN`).
    pub(crate) fn read_reply(&mut self, stage: &str) -> Result<SmtpReply, ProbeError> {
        let mut code = None;
        let mut lines = Vec::new();
        loop {
            let remaining = self.remaining_or_abort()?;
            self.stream
                .set_read_timeout(Some(remaining))
                .map_err(|source| ProbeError::Io { source })?;

            let Some(raw) = self.read_line()? else {
                return Err(ProbeError::Closed {
                    host: self.host.clone(),
                    stage: stage.to_string(),
                });
            };
            trace!(host = %self.host, line = %raw, "S:");

            let parsed_code = parse_code(&raw)?;
            if let Some(existing) = code {
                if existing != parsed_code {
                    return Err(ProbeError::malformed(format!(
                        "inconsistent reply codes: {existing} vs {parsed_code}"
                    )));
                }
            } else {
                code = Some(parsed_code);
            }
            let continuation = raw.as_bytes().get(3).copied() == Some(b'-');
            lines.push(raw);
            if !continuation {
                break;
            }
        }
        let code = code.ok_or_else(|| ProbeError::malformed("reply missing status code"))?;
        Ok(SmtpReply { code, lines })
    }

    /// One reply line without its line ending, or `None` at EOF. Bytes
    /// outside UTF-8 are replaced rather than rejected.
    fn read_line(&mut self) -> Result<Option<String>, ProbeError> {
        let mut buf = Vec::new();
        let limit = MAX_REPLY_LINE as u64 + 1;
        let read = (&mut self.reader).take(limit).read_until(b'\n', &mut buf);
        match read {
            Ok(0) => return Ok(None),
            Ok(_) => {}
            Err(err) => return Err(self.io_failure(err)),
        }
        if buf.len() > MAX_REPLY_LINE {
            return Err(ProbeError::malformed(format!(
                "reply line longer than {MAX_REPLY_LINE} octets"
            )));
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    /// Send `QUIT` and close without waiting for the reply.
    pub(crate) fn quit(mut self) {
        if let Err(err) = self.send_command("QUIT") {
            debug!(host = %self.host, error = %err, "QUIT not delivered");
        }
        self.close();
    }

    pub(crate) fn close(&self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }

    fn remaining_or_abort(&self) -> Result<Duration, ProbeError> {
        match remaining(self.deadline) {
            Some(remaining) => Ok(remaining),
            None => {
                self.close();
                Err(timed_out(&self.host, self.timeout))
            }
        }
    }

    fn io_failure(&self, err: io::Error) -> ProbeError {
        if is_timeout(&err) {
            self.close();
            timed_out(&self.host, self.timeout)
        } else {
            ProbeError::Io { source: err }
        }
    }
}

fn parse_code(line: &str) -> Result<u16, ProbeError> {
    let digits = line
        .get(..3)
        .filter(|code| code.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| ProbeError::malformed(format!("invalid SMTP reply: '{line}'")))?;
    digits
        .parse()
        .map_err(|_| ProbeError::malformed(format!("invalid SMTP status code: '{digits}'")))
}

fn remaining(deadline: Instant) -> Option<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    (!left.is_zero()).then_some(left)
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

fn timed_out(host: &str, timeout: Duration) -> ProbeError {
    ProbeError::Timeout {
        host: host.to_string(),
        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_code;

    #[test]
    fn parses_three_digit_codes() {
        assert_eq!(parse_code("250-mail.example.com").expect("code"), 250);
        assert_eq!(parse_code("354").expect("code"), 354);
    }

    #[test]
    fn rejects_short_or_non_numeric_lines() {
        assert!(parse_code("25").is_err());
        assert!(parse_code("hello").is_err());
        assert!(parse_code("2x0 nope").is_err());
    }
}
