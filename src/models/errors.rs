use thiserror::Error;

/// Errors surfaced by the read path.
///
/// Client-side failures (bad filter, bad address) are distinct from a missing
/// entity, which is distinct from infrastructure failures. The permission rule
/// source failing is its own variant because it must fail the request rather
/// than silently grant or deny access.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("missing required identifier: {0}")]
    MissingRequiredIdentifier(&'static str),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid hex value: {0}")]
    InvalidHex(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission rule source unavailable: {0}")]
    RuleSourceUnavailable(String),

    #[error("failed to decode stored row: {0}")]
    Decode(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl QueryError {
    /// True for errors caused by the request itself, which a caller should
    /// never retry.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingRequiredIdentifier(_) | Self::InvalidAddress(_) | Self::InvalidHex(_)
        )
    }
}
