use std::borrow::Cow;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StompError {
    /// Socket or WebSocket handshake failure.
    #[error("transport error: {details}")]
    Transport { details: Cow<'static, str> },

    /// Broker rejected us with an ERROR frame.
    #[error("protocol error: {details}")]
    Protocol { details: Cow<'static, str> },

    /// Malformed frame on the wire.
    #[error("frame error: {details}")]
    Frame { details: Cow<'static, str> },

    /// An operation exceeded its deadline.
    #[error("timeout during {action}")]
    Timeout { action: Cow<'static, str> },
}

pub type StompResult<T> = Result<T, StompError>;
