pub mod payment;
pub mod repository;

/// Failure surfaced by the external order store.
///
/// A 4xx status means the request itself is bad (unknown order, malformed
/// payload) and must never be retried; everything else is transient.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("order store returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("order store timed out")]
    Timeout,

    #[error("order store unreachable: {0}")]
    Network(String),
}

impl StoreError {
    pub fn not_found(message: impl Into<String>) -> Self {
        StoreError::Status {
            status: 404,
            message: message.into(),
        }
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, StoreError::Status { status, .. } if (400u16..500).contains(status))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
