use rand::{Rng, distributions::Alphanumeric};

use super::types::{CommandScript, CommandStep, StepKind};

pub const LABEL_LEN: usize = 7;
pub const RELAY_LOCAL_PART: &str = "notrelay";

/// Client identity announced during one probe. The generated host doubles as
/// the recipient domain, so `RCPT TO` never names a real mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeIdentity {
    pub helo_host: String,
    pub mail_from: String,
}

impl ProbeIdentity {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, domain: &str, mail_from: &str) -> Self {
        Self {
            helo_host: format!("{}.{}", random_label(rng, LABEL_LEN), domain),
            mail_from: mail_from.to_string(),
        }
    }

    pub fn recipient(&self) -> String {
        format!("{RELAY_LOCAL_PART}@{}", self.helo_host)
    }

    pub fn script(&self) -> CommandScript {
        CommandScript {
            ehlo: CommandStep {
                command: format!("EHLO {}", self.helo_host),
                kind: StepKind::Ehlo,
            },
            mail_from: CommandStep {
                command: format!("MAIL FROM: <{}>", self.mail_from),
                kind: StepKind::MailFrom,
            },
            rcpt_to: CommandStep {
                command: format!("RCPT TO: <{}>", self.recipient()),
                kind: StepKind::RcptTo,
            },
        }
    }
}

/// Lowercase alphanumeric label of `len` characters.
pub fn random_label<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(|byte| char::from(byte).to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn script_uses_identity_everywhere() {
        let identity = ProbeIdentity {
            helo_host: "abc1234.example.com".into(),
            mail_from: "probe@example.com".into(),
        };
        let script = identity.script();
        assert_eq!(script.ehlo.command, "EHLO abc1234.example.com");
        assert_eq!(script.mail_from.command, "MAIL FROM: <probe@example.com>");
        assert_eq!(
            script.rcpt_to.command,
            "RCPT TO: <notrelay@abc1234.example.com>"
        );
        let kinds: Vec<_> = script.steps().iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![StepKind::Ehlo, StepKind::MailFrom, StepKind::RcptTo]
        );
    }

    #[test]
    fn seeded_rng_is_deterministic() {
        let a = ProbeIdentity::generate(&mut StdRng::seed_from_u64(42), "example.com", "p@x.io");
        let b = ProbeIdentity::generate(&mut StdRng::seed_from_u64(42), "example.com", "p@x.io");
        assert_eq!(a, b);
    }

    #[test]
    fn successive_identities_differ() {
        let mut rng = StdRng::seed_from_u64(7);
        let a = ProbeIdentity::generate(&mut rng, "example.com", "p@x.io");
        let b = ProbeIdentity::generate(&mut rng, "example.com", "p@x.io");
        assert_ne!(a.helo_host, b.helo_host);
    }

    proptest! {
        #[test]
        fn label_is_seven_lowercase_alphanumerics(seed in any::<u64>()) {
            let identity = ProbeIdentity::generate(&mut StdRng::seed_from_u64(seed), "example.com", "p@x.io");
            let (label, domain) = identity.helo_host.split_once('.').expect("dot");
            prop_assert_eq!(domain, "example.com");
            prop_assert_eq!(label.len(), LABEL_LEN);
            prop_assert!(label.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        }
    }
}
