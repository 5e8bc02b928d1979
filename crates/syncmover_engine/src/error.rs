//! Error types for the mover.

use syncmover_protocol::ProtocolError;
use thiserror::Error;

/// Result type for mover operations.
pub type MoverResult<T> = Result<T, MoverError>;

/// Errors that can abort a convergence pass.
///
/// None of these are fatal: the scheduler retries the whole pass. Some,
/// however, never clear without someone changing the cluster, see
/// [`MoverError::requires_operator`].
#[derive(Error, Debug)]
pub enum MoverError {
    /// Network or transport error talking to the daemon.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The daemon rejected the API key.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The daemon answered with a non-success status.
    #[error("daemon returned HTTP {status}: {body}")]
    Daemon {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// Encoding or decoding a daemon payload failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The caller-provisioned data volume claim does not exist.
    #[error("data volume claim {namespace}/{name} not found")]
    MissingVolume {
        /// Namespace searched.
        namespace: String,
        /// Claim name.
        name: String,
    },

    /// The cluster resource layer failed.
    #[error("cluster error on {kind} {name}: {message}")]
    Cluster {
        /// Resource kind.
        kind: &'static str,
        /// Resource name.
        name: String,
        /// Error message.
        message: String,
    },

    /// The credential secret exists but holds no usable key.
    #[error("credential secret {0} has no usable api key")]
    InvalidCredential(String),

    /// Mover configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The pass context was cancelled.
    #[error("pass cancelled")]
    Cancelled,

    /// The pass context deadline passed.
    #[error("pass deadline exceeded")]
    DeadlineExceeded,
}

impl MoverError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a cluster error.
    pub fn cluster(
        kind: &'static str,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Cluster {
            kind,
            name: name.into(),
            message: message.into(),
        }
    }

    /// Returns true if retrying the pass can clear this error on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            MoverError::Transport { retryable, .. } => *retryable,
            MoverError::Daemon { .. }
            | MoverError::Protocol(_)
            | MoverError::Cluster { .. }
            | MoverError::Cancelled
            | MoverError::DeadlineExceeded => true,
            MoverError::AuthenticationFailed(_)
            | MoverError::MissingVolume { .. }
            | MoverError::InvalidCredential(_)
            | MoverError::InvalidConfig(_) => false,
        }
    }

    /// Returns true if the error will persist until an operator acts.
    pub fn requires_operator(&self) -> bool {
        matches!(
            self,
            MoverError::MissingVolume { .. } | MoverError::InvalidConfig(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(MoverError::transport_retryable("connection refused").is_retryable());
        assert!(!MoverError::transport_fatal("bad url").is_retryable());
        assert!(MoverError::Daemon {
            status: 500,
            body: "boom".into()
        }
        .is_retryable());
        assert!(MoverError::cluster("Job", "syncthing", "timeout").is_retryable());
        assert!(!MoverError::AuthenticationFailed("401".into()).is_retryable());
    }

    #[test]
    fn operator_errors() {
        let err = MoverError::MissingVolume {
            namespace: "ns".into(),
            name: "data".into(),
        };
        assert!(err.requires_operator());
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "data volume claim ns/data not found");

        assert!(!MoverError::transport_retryable("eof").requires_operator());
        assert!(!MoverError::Cancelled.requires_operator());
    }
}
