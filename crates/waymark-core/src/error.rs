use thiserror::Error;

use waymark_store::StoreError;

/// Typed failures returned by every core operation. The transport
/// collaborator is responsible for mapping these to protocol status codes;
/// the core never retries and never converts them back into panics.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A referenced pin, media item, user, or blob does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Privacy or friend-authorization violation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Duplicate friend request, self-friend-request, or duplicate account.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unsupported media content type or otherwise malformed request data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Delegated from the identity provider.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Store failure other than a missing record.
    #[error("Store error: {0}")]
    Store(StoreError),

    /// Blob storage failure other than a missing blob.
    #[error("Blob storage error: {0}")]
    BlobStorage(String),
}

impl From<StoreError> for CoreError {
    fn from(e: StoreError) -> Self {
        CoreError::Store(e)
    }
}

impl CoreError {
    /// Adapt a store lookup failure, naming the missing entity. Any store
    /// error other than `NotFound` passes through unchanged.
    pub(crate) fn missing(what: &'static str) -> impl FnOnce(StoreError) -> CoreError {
        move |e| match e {
            StoreError::NotFound => CoreError::NotFound(format!("{what} not found")),
            other => CoreError::Store(other),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CoreError>;
