use std::net::{Ipv4Addr, TcpListener};
use std::thread;
use std::time::Duration;

use rand::{SeedableRng, rngs::StdRng};

use super::*;
use crate::classify::CheckName;
use crate::dns::tests::StubResolver;
use crate::probe::tests::{GREETING, relay_denied_script, spawn_fake_server};

const HOST: &str = "mail.example.com";

fn loopback_dns() -> StubResolver {
    StubResolver::new()
        .with_a(HOST, &[Ipv4Addr::LOCALHOST])
        .with_ptr(Ipv4Addr::LOCALHOST, &[HOST])
}

fn options(port: u16, timeout_ms: u64) -> CheckOptions {
    CheckOptions {
        port,
        timeout_ms,
        ..CheckOptions::default()
    }
}

fn run(value: &str, resolver: &StubResolver, options: &CheckOptions) -> CheckReport {
    check_with_resolver(value, options, resolver, &mut StdRng::seed_from_u64(7))
}

#[test]
fn defaults_match_probe_defaults() {
    let options = CheckOptions::default();
    assert_eq!(options.timeout_ms, 15_000);
    assert_eq!(options.port, 25);
    assert_eq!(options.probe_options(), crate::probe::ProbeOptions::default());
}

#[test]
fn relay_denied_server_passes_everything_but_tls() {
    let (port, handle) = spawn_fake_server(GREETING, relay_denied_script());
    let report = run(HOST, &loopback_dns(), &options(port, 5_000));
    handle.join().expect("server thread");

    assert!(report.is_complete(), "{:?}", report.errors);
    for (check, state) in report.checks.iter() {
        let expected = check != CheckName::SupportTls;
        assert_eq!(state.result, expected, "{check}: {state:?}");
    }
    assert_eq!(report.host_name.as_deref(), Some(HOST));
    assert_eq!(
        report.smtp_banner.as_deref(),
        Some("220 mail.example.com ESMTP")
    );
    assert_eq!(report.smtp_messages.len(), 4);
    assert_eq!(report.a_records.len(), 1);
    assert_eq!(report.a_records[0].reverse_name, HOST);
    assert!(report.connection_time_ms.is_some());
    assert!(report.transaction_time_ms.is_some());
}

#[test]
fn accepting_server_is_flagged_as_open_relay() {
    let (port, handle) = spawn_fake_server(
        GREETING,
        vec![
            "250-mail.example.com\r\n250-STARTTLS\r\n250 8BITMIME\r\n",
            "250 OK\r\n",
            "250 Accepted\r\n",
        ],
    );
    let report = run(HOST, &loopback_dns(), &options(port, 5_000));
    handle.join().expect("server thread");

    assert!(report.checks.support_tls.result);
    let relay = &report.checks.open_relay;
    assert!(!relay.result);
    assert!(
        relay.error.as_deref().is_some_and(|e| e.contains("open relay risk")),
        "{relay:?}"
    );
    // a failed rule is not a short-circuit
    assert!(report.is_complete());
}

#[test]
fn invalid_value_stops_before_dns() {
    let stub = loopback_dns().with_broken("not a value");
    let report = run("not a value", &stub, &CheckOptions::default());

    assert!(!report.checks.syntax_valid.result);
    assert_eq!(
        report.errors,
        vec!["domain, e-mail or IP-address pattern is invalid: 'not a value'".to_string()]
    );
    assert!(report.checks.iter().all(|(_, state)| !state.result));
    assert!(report.a_records.is_empty());
}

#[test]
fn dns_failure_leaves_downstream_checks_unset() {
    let report = run("nowhere.example.com", &StubResolver::new(), &CheckOptions::default());

    assert!(report.checks.syntax_valid.result);
    assert_eq!(
        report.checks.resolve_record.error.as_deref(),
        Some("cannot get A record for nowhere.example.com")
    );
    assert_eq!(report.checks.is_connected, CheckState::default());
    assert_eq!(report.checks.open_relay, CheckState::default());
    assert!(report.smtp_messages.is_empty());
    assert!(!report.is_complete());
}

#[test]
fn refused_connection_marks_not_connected() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr").port()
    };
    let report = run(HOST, &loopback_dns(), &options(port, 2_000));

    assert!(report.checks.resolve_record.result);
    assert!(!report.checks.is_connected.result);
    assert!(report.checks.is_connected.error.is_some());
    assert_eq!(report.host_name.as_deref(), Some(HOST));
    assert_eq!(report.a_records.len(), 1);
    assert!(!report.checks.banner_check.result);
}

#[test]
fn silent_server_reports_timeout_message() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    let handle = thread::spawn(move || {
        if let Ok((stream, _)) = listener.accept() {
            thread::sleep(Duration::from_millis(800));
            drop(stream);
        }
    });

    let report = run(HOST, &loopback_dns(), &options(port, 150));
    handle.join().expect("server thread");

    assert!(!report.checks.is_connected.result);
    assert_eq!(
        report.errors,
        vec!["Unable to connect mail.example.com after 0.15 seconds.".to_string()]
    );
}

#[cfg(feature = "with-serde")]
#[test]
fn report_serializes_with_camel_case_keys() {
    let report = run("nowhere.example.com", &StubResolver::new(), &CheckOptions::default());
    let json = serde_json::to_value(&report).expect("serialize");

    for key in [
        "value",
        "hostName",
        "smtpBanner",
        "connectionTimeMs",
        "transactionTimeMs",
        "checks",
        "aRecords",
        "mxRecords",
        "smtpMessages",
        "errors",
    ] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
    let checks = &json["checks"];
    for check in CheckName::ALL {
        assert!(checks.get(check.as_str()).is_some(), "missing {check}");
    }
    assert_eq!(checks["isConnected"], serde_json::json!({ "result": false }));
    assert_eq!(checks["syntaxValid"]["result"], serde_json::json!(true));
}
