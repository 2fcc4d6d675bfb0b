use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Unable to connect {host}: {source}")]
    Connect {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Unable to connect {host} after {} seconds.", *timeout_ms as f64 / 1000.0)]
    Timeout { host: String, timeout_ms: u64 },
    #[error("connection closed by {host} while waiting for the {stage} reply")]
    Closed { host: String, stage: String },
    #[error("malformed SMTP reply: {0}")]
    MalformedReply(String),
    #[error("I/O error: {source}")]
    Io {
        #[source]
        source: std::io::Error,
    },
}

impl ProbeError {
    pub(crate) fn connect(host: impl Into<String>, source: std::io::Error) -> Self {
        Self::Connect {
            host: host.into(),
            source,
        }
    }

    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedReply(detail.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
