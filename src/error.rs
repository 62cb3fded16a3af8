use thiserror::Error;

/// Failures surfaced by the external collaborators. The simulator itself
/// never fails; recoverable anomalies clamp to deterministic defaults.
#[derive(Debug, Error)]
pub enum Error {
    #[error("network failure: {0}")]
    NetworkFailure(#[source] reqwest::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("unauthorised (status {0})")]
    Unauthorised(u16),
    #[error("static data missing: {0}")]
    StaticDataMissing(String),
    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
