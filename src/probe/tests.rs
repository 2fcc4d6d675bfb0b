use std::io::{self, BufRead, BufReader, Write};
use std::net::{Ipv4Addr, TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use rand::{SeedableRng, rngs::StdRng};

use super::*;

pub(crate) const GREETING: &str = "220 mail.example.com ESMTP\r\n";

/// Replies sent, in order, after each client line; the greeting goes first.
pub(crate) fn relay_denied_script() -> Vec<&'static str> {
    vec![
        "250-mail.example.com\r\n250 SIZE 10240000\r\n",
        "250 OK\r\n",
        "550 Relay denied\r\n",
    ]
}

/// Single-connection SMTP server on loopback. The handle yields every line the
/// client sent, `QUIT` included.
pub(crate) fn spawn_fake_server<G>(
    greeting: G,
    replies: Vec<&'static str>,
) -> (u16, thread::JoinHandle<Vec<String>>)
where
    G: AsRef<[u8]> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake server");
    let port = listener.local_addr().expect("addr").port();
    let (ready_tx, ready_rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        ready_tx.send(()).ok();
        let mut received = Vec::new();
        if let Ok((mut stream, _)) = listener.accept() {
            let _ = serve(&mut stream, greeting.as_ref(), &replies, &mut received);
        }
        received
    });
    ready_rx.recv().expect("server ready");
    (port, handle)
}

fn serve(
    stream: &mut TcpStream,
    greeting: &[u8],
    replies: &[&str],
    received: &mut Vec<String>,
) -> io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    stream.write_all(greeting)?;
    stream.flush()?;
    for reply in replies {
        received.push(read_command(&mut reader)?);
        stream.write_all(reply.as_bytes())?;
        stream.flush()?;
    }
    // QUIT (unanswered on purpose)
    received.push(read_command(&mut reader)?);
    Ok(())
}

fn read_command(reader: &mut BufReader<TcpStream>) -> io::Result<String> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(line.trim_end().to_string())
}

pub(crate) fn loopback_target() -> ProbeTarget {
    ProbeTarget {
        host: "127.0.0.1".into(),
        resolved_address: Some(Ipv4Addr::LOCALHOST),
        kind: TargetKind::Ip,
    }
}

pub(crate) fn options_for(port: u16, timeout_ms: u64) -> ProbeOptions {
    ProbeOptions {
        port,
        timeout_ms,
        ..ProbeOptions::default()
    }
}

fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("addr").port()
}

#[test]
fn scripted_exchange_records_four_entries() {
    let (port, handle) = spawn_fake_server(GREETING, relay_denied_script());
    let mut rng = StdRng::seed_from_u64(1);
    let result = probe_with_rng(&loopback_target(), &options_for(port, 5_000), &mut rng)
        .expect("probe succeeds");
    let received = handle.join().expect("server thread");

    assert!(result.is_complete());
    let labels: Vec<_> = result.transcript.iter().map(|e| e.command.as_str()).collect();
    let statuses: Vec<_> = result.transcript.iter().map(|e| e.status).collect();
    assert_eq!(statuses, vec![220, 250, 250, 550]);
    assert_eq!(labels[0], CONNECT_LABEL);
    assert!(result.transcript[0].is_greeting());
    let sent: Vec<&str> = received[..3].iter().map(String::as_str).collect();
    assert_eq!(&labels[1..], sent.as_slice());
    assert_eq!(labels[2], "MAIL FROM: <probe@example.com>");
    assert_eq!(received.last().map(String::as_str), Some("QUIT"));

    assert_eq!(result.banner_host.as_deref(), Some("mail.example.com"));

    let ehlo = result.reply_to(StepKind::Ehlo).expect("EHLO reply");
    assert_eq!(ehlo.lines, vec!["250-mail.example.com", "250 SIZE 10240000"]);
    assert_eq!(ehlo.raw, "250-mail.example.com\r\n250 SIZE 10240000\r\n");
}

#[test]
fn timing_follows_reporting_convention() {
    let (port, handle) = spawn_fake_server(GREETING, relay_denied_script());
    let result = probe(&loopback_target(), &options_for(port, 5_000)).expect("probe succeeds");
    handle.join().expect("server thread");

    let sum: u64 = result.transcript.iter().map(|e| e.elapsed_ms).sum();
    assert_eq!(result.total_transaction_ms, sum * 5);
    assert_eq!(result.connection_latency_ms, result.transcript[0].elapsed_ms);
}

#[test]
fn identity_comes_from_injected_rng() {
    let (port, handle) = spawn_fake_server(GREETING, relay_denied_script());
    let options = options_for(port, 5_000);
    let expected = ProbeIdentity::generate(
        &mut StdRng::seed_from_u64(99),
        &options.identity_domain,
        &options.mail_from,
    );
    probe_with_rng(&loopback_target(), &options, &mut StdRng::seed_from_u64(99))
        .expect("probe succeeds");
    let received = handle.join().expect("server thread");

    assert_eq!(received[0], expected.script().ehlo.command);
    assert_eq!(
        received[2],
        format!("RCPT TO: <notrelay@{}>", expected.helo_host)
    );
}

#[test]
fn silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    let handle = thread::spawn(move || {
        if let Ok((stream, _)) = listener.accept() {
            thread::sleep(Duration::from_millis(1_000));
            drop(stream);
        }
    });

    let err = probe(&loopback_target(), &options_for(port, 200)).expect_err("must time out");
    assert!(err.is_timeout(), "{err:?}");
    assert_eq!(err.to_string(), "Unable to connect 127.0.0.1 after 0.2 seconds.");
    handle.join().expect("server thread");
}

#[test]
fn refused_connection_is_connect_error_every_time() {
    let port = closed_port();
    for _ in 0..2 {
        let err = probe(&loopback_target(), &options_for(port, 2_000)).expect_err("refused");
        assert!(matches!(err, ProbeError::Connect { .. }), "{err:?}");
    }
}

#[test]
fn server_hanging_up_after_greeting_is_reported() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    let handle = thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let _ = stream.write_all(GREETING.as_bytes());
            let mut line = String::new();
            let _ = BufReader::new(&stream).read_line(&mut line);
        }
    });

    let err = probe(&loopback_target(), &options_for(port, 2_000)).expect_err("closed");
    assert!(
        matches!(err, ProbeError::Closed { ref stage, .. } if stage == "EHLO"),
        "{err:?}"
    );
    handle.join().expect("server thread");
}

#[test]
fn garbage_reply_is_malformed() {
    let (port, handle) = spawn_fake_server(GREETING, vec!["hello there\r\n"]);
    let err = probe(&loopback_target(), &options_for(port, 2_000)).expect_err("malformed");
    assert!(matches!(err, ProbeError::MalformedReply(_)), "{err:?}");
    handle.join().expect("server thread");
}

#[test]
fn latin1_greeting_does_not_abort_exchange() {
    let greeting: &'static [u8] = b"220 mail.example.com ESMTP Bienvenue \xe9t\xe9\r\n";
    let (port, handle) = spawn_fake_server(greeting, relay_denied_script());
    let result = probe(&loopback_target(), &options_for(port, 5_000)).expect("probe succeeds");
    handle.join().expect("server thread");

    assert!(result.is_complete());
    assert_eq!(result.transcript[0].status, 220);
    assert_eq!(result.banner_host.as_deref(), Some("mail.example.com"));
    assert!(result.transcript[0].raw.contains('\u{FFFD}'));
}

#[test]
fn reply_line_at_length_limit_is_accepted() {
    // "220 " + text + CRLF fills the limit exactly
    let text = "a".repeat(session::MAX_REPLY_LINE - 6);
    let greeting = format!("220 {text}\r\n").into_bytes();
    assert_eq!(greeting.len(), session::MAX_REPLY_LINE);
    let (port, handle) = spawn_fake_server(greeting, relay_denied_script());
    let result = probe(&loopback_target(), &options_for(port, 5_000)).expect("probe succeeds");
    handle.join().expect("server thread");
    assert!(result.is_complete());
}

#[test]
fn overlong_reply_line_is_malformed() {
    let greeting = format!("220 {}\r\n", "a".repeat(600)).into_bytes();
    let (port, handle) = spawn_fake_server(greeting, Vec::new());
    let err = probe(&loopback_target(), &options_for(port, 5_000)).expect_err("too long");
    assert!(matches!(err, ProbeError::MalformedReply(_)), "{err:?}");
    handle.join().expect("server thread");
}

#[test]
fn transaction_time_scales_sum() {
    let entry = |elapsed_ms| TranscriptEntry {
        command: "X".into(),
        raw: String::new(),
        lines: Vec::new(),
        status: 250,
        elapsed_ms,
    };
    let transcript = vec![entry(10), entry(3), entry(4), entry(1)];
    assert_eq!(transaction_time(&transcript), 90);
}

#[test]
fn banner_host_is_first_token_after_code() {
    let reply = SmtpReply {
        code: 220,
        lines: vec!["220 mx.example.net ESMTP Postfix".into()],
    };
    assert_eq!(types::banner_host(&reply).as_deref(), Some("mx.example.net"));

    let bare = SmtpReply {
        code: 220,
        lines: vec!["220".into()],
    };
    assert_eq!(types::banner_host(&bare), None);
}
