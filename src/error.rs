//! Error types.

use thiserror::Error;

/// Result alias for update operations.
pub type Result<T> = std::result::Result<T, UpdateError>;

/// Errors returned by update operations.
///
/// A status code returned by the server (including rejections such as
/// `REFUSED`) is not an error; see [`crate::Rcode`].
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The records span more than one zone or class, or the zone cut for a
    /// record has no usable authoritative servers.
    #[error("not a single zone: {name}: {reason}")]
    NotZone {
        /// Owner name of the record that could not be grouped.
        name: String,
        /// Why grouping stopped.
        reason: String,
    },

    /// The update message could not be encoded within its buffer.
    #[error("encode error: {0}")]
    Encode(String),

    /// A transaction-owned resource could not be created.
    #[error("allocation failed: {0}")]
    Allocation(String),

    /// Transmission, the wait for a response, or response verification
    /// failed.
    #[error("send failed: {0}")]
    Send(#[source] std::io::Error),

    /// Configuration file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A domain name could not be parsed.
    #[error("invalid domain name: {0}")]
    InvalidName(String),

    /// Invalid configuration values.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A transaction key could not be parsed or used.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

impl From<domain::base::name::FromStrError> for UpdateError {
    fn from(err: domain::base::name::FromStrError) -> Self {
        Self::InvalidName(err.to_string())
    }
}

impl UpdateError {
    pub(crate) fn not_zone(name: impl ToString, reason: impl Into<String>) -> Self {
        Self::NotZone {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for a [`NotZone`](Self::NotZone) rejection.
    #[must_use]
    pub const fn is_not_zone(&self) -> bool {
        matches!(self, Self::NotZone { .. })
    }

    /// Returns `true` if the transport failed before a response arrived.
    #[must_use]
    pub const fn is_send(&self) -> bool {
        matches!(self, Self::Send(_))
    }

    /// Returns `true` if the underlying send error is a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Send(e) if matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            )
        )
    }
}
