//! Error types for protocol encoding and decoding.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while converting wire payloads.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Payload could not be decoded into the expected shape.
    #[error("failed to decode {what}: {source}")]
    Decode {
        /// Name of the payload being decoded.
        what: &'static str,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Value could not be encoded.
    #[error("failed to encode {what}: {source}")]
    Encode {
        /// Name of the payload being encoded.
        what: &'static str,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl ProtocolError {
    pub(crate) fn decode(what: &'static str, source: serde_json::Error) -> Self {
        Self::Decode { what, source }
    }

    pub(crate) fn encode(what: &'static str, source: serde_json::Error) -> Self {
        Self::Encode { what, source }
    }
}
