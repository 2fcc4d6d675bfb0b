use thiserror::Error;

/// Failures that prevent a check from producing any report at all. Everything
/// else ends up inside the [`CheckReport`](crate::check::CheckReport).
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("resolver initialization failed: {source}")]
    ResolverInit {
        #[source]
        source: std::io::Error,
    },
}

impl CheckError {
    pub(crate) fn resolver_init(source: std::io::Error) -> Self {
        Self::ResolverInit { source }
    }
}
