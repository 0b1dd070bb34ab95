use thiserror::Error;

/// Core error type for docflow.
/// Internally, modules can use `anyhow::Result<T>` for convenience,
/// but public boundaries should expose `CoreResult<T>` with this error.
#[derive(Debug, Error)]
pub enum DocflowError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("rate limited by upstream app {app}")]
    RateLimited {
        app: String,
        retry_after: Option<u64>,
    },

    #[error("upstream unavailable: {app}")]
    UpstreamUnavailable { app: String },

    #[error("upstream error from {app}: {code} {message}")]
    UpstreamError {
        app: String,
        code: String,
        message: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type CoreResult<T> = std::result::Result<T, DocflowError>;
