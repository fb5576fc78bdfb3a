use crate::BackendType;
use thiserror::Error;

/// Why a write or read did not reach the store.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// No credential source produced credentials.
    #[error("backend={backend}: no credential source succeeded")]
    ChainExhausted {
        /// Backend of the failed call.
        backend: BackendType,
    },
    /// The request could not be built or signed.
    #[error("backend={backend}: failed to sign request: {}", source.display_with_context())]
    Signing {
        /// Backend of the failed call.
        backend: BackendType,
        /// Underlying error.
        #[source]
        source: logship_core::Error,
    },
    /// Every attempt failed.
    #[error("backend={backend}: delivery failed: {}", source.display_with_context())]
    Delivery {
        /// Backend of the failed call.
        backend: BackendType,
        /// Error of the last attempt.
        #[source]
        source: logship_core::Error,
    },
    /// The backend is not configured for this operation.
    #[error("backend={backend}: {operation} is not supported")]
    Unsupported {
        /// Backend of the failed call.
        backend: BackendType,
        /// The operation that was asked for.
        operation: &'static str,
    },
    /// An injected collaborator failed.
    #[error("backend={backend}: collaborator failed: {source}")]
    Collaborator {
        /// Backend of the failed call.
        backend: BackendType,
        /// Error returned by the collaborator.
        #[source]
        source: anyhow::Error,
    },
}

impl DeliveryError {
    /// Backend the error belongs to.
    pub fn backend(&self) -> BackendType {
        match self {
            DeliveryError::ChainExhausted { backend }
            | DeliveryError::Signing { backend, .. }
            | DeliveryError::Delivery { backend, .. }
            | DeliveryError::Unsupported { backend, .. }
            | DeliveryError::Collaborator { backend, .. } => *backend,
        }
    }

    /// Classify an error returned while signing or sending.
    ///
    /// A `RequestInvalid` error never left the process, everything else
    /// failed on the wire.
    pub(crate) fn from_core(backend: BackendType, err: logship_core::Error) -> Self {
        match err.kind() {
            logship_core::ErrorKind::RequestInvalid => DeliveryError::Signing {
                backend,
                source: err,
            },
            _ => DeliveryError::Delivery {
                backend,
                source: err,
            },
        }
    }
}
