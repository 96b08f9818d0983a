use std::borrow::Cow;
use thiserror::Error;

/// Failure modes of a snapshot operation.
///
/// Every variant converges on the same [`crate::IngestionResult`] shape at
/// the public boundary; this enum exists so internal code can branch on the
/// failure class before flattening it to a message.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Socket or handshake level failure.
    #[error("transport error: {details}")]
    Transport { details: Cow<'static, str> },

    /// Broker-level ERROR frame.
    #[error("protocol error: {details}")]
    Protocol { details: Cow<'static, str> },

    /// The snapshot window elapsed with no data.
    #[error("Snapshot timeout - no data received")]
    Timeout,

    /// Invalid or incomplete connection configuration.
    #[error("configuration error: {details}")]
    Config { details: Cow<'static, str> },

    /// The caller cancelled an in-flight snapshot.
    #[error("Snapshot cancelled")]
    Cancelled,
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;
