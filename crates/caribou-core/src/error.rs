//! Error types for the caribou channel layer.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. Validation failures, streaming state
//! violations, and hardware transport faults are all captured here. Only the
//! outermost plugin boundary translates these into whatever convention its
//! host expects.

use crate::types::Channel;

/// The error type for all caribou operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A requested value lies outside the validated domain of the channel
    /// (frequency, gain, or sample rate).
    ///
    /// Frequency requests are never clamped; they fail with this variant.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// A valid-looking request that the current hardware generation does
    /// not implement (e.g. a sample rate other than 4 MSPS).
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// A streaming session is already active (or starting/stopping) on the
    /// channel.
    #[error("{0} is already streaming")]
    AlreadyStreaming(Channel),

    /// The operation requires an active streaming session on the channel.
    #[error("{0} is not streaming")]
    NotStreaming(Channel),

    /// The hardware transport reported a fault.
    ///
    /// Non-recoverable for the in-flight operation but not fatal to the
    /// controller; see [`Error::is_fatal`].
    #[error("hardware transport failure: {0}")]
    Transport(String),

    /// A sensor key that does not exist for the channel/direction pair.
    #[error("unknown sensor key: {0}")]
    UnknownKey(String),

    /// A frequency or gain element name that the channel does not expose.
    #[error("unknown name: {0}")]
    UnknownName(String),

    /// An invalid parameter was passed (builder settings, block sizes).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The hardware returned a value outside the chip's code set.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Timed out waiting for exclusive access to the shared transport.
    #[error("timeout waiting for transport")]
    Timeout,

    /// No connection to the hardware has been established, or it was closed.
    #[error("not connected")]
    NotConnected,

    /// The connection to the hardware was lost unexpectedly.
    ///
    /// A streaming session that hits this terminates and notifies its
    /// callback with a terminal event.
    #[error("connection lost")]
    ConnectionLost,

    /// A sample stream was closed unexpectedly.
    #[error("stream closed")]
    StreamClosed,
}

impl Error {
    /// Whether this error means the hardware link is gone.
    ///
    /// Fatal errors end a streaming session; everything else only drops the
    /// block being acquired.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ConnectionLost | Error::NotConnected)
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
