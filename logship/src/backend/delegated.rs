use super::Backend;
use crate::{BackendType, DeliveryError, LogPayload, StorageTarget};
use async_trait::async_trait;
use bytes::Bytes;
use logship_core::Context;
use std::fmt::Debug;
use std::sync::Arc;

/// LogSink is a store reached through a client owned by the host process,
/// such as the control plane API or a document database driver.
///
/// Sinks authenticate on their own; paths already carry the target base path.
#[async_trait]
pub trait LogSink: Debug + Send + Sync + 'static {
    /// Store `body` at `path`.
    async fn write(&self, path: &str, body: Bytes) -> anyhow::Result<()>;

    /// Read the object at `path`.
    async fn read(&self, path: &str) -> anyhow::Result<Bytes>;
}

/// DelegatedBackend hands payloads to a [`LogSink`].
///
/// Without a sink every call fails with [`DeliveryError::Unsupported`].
#[derive(Debug, Clone)]
pub struct DelegatedBackend {
    backend_type: BackendType,
    sink: Option<Arc<dyn LogSink>>,
}

impl DelegatedBackend {
    /// Create a backend that has no sink yet.
    pub fn unconfigured(backend_type: BackendType) -> Self {
        Self {
            backend_type,
            sink: None,
        }
    }

    /// Create a backend delegating to `sink`.
    pub fn new(backend_type: BackendType, sink: impl LogSink) -> Self {
        Self {
            backend_type,
            sink: Some(Arc::new(sink)),
        }
    }

    fn sink(&self, operation: &'static str) -> Result<&Arc<dyn LogSink>, DeliveryError> {
        self.sink.as_ref().ok_or(DeliveryError::Unsupported {
            backend: self.backend_type,
            operation,
        })
    }
}

#[async_trait]
impl Backend for DelegatedBackend {
    fn backend_type(&self) -> BackendType {
        self.backend_type
    }

    async fn put(
        &self,
        _: &Context,
        target: &StorageTarget,
        payload: &LogPayload,
    ) -> Result<(), DeliveryError> {
        self.sink("put")?
            .write(&target.object_key(&payload.file_path), payload.body.clone())
            .await
            .map_err(|source| DeliveryError::Collaborator {
                backend: self.backend_type,
                source,
            })
    }

    async fn get(
        &self,
        _: &Context,
        target: &StorageTarget,
        path: &str,
    ) -> Result<Bytes, DeliveryError> {
        self.sink("get")?
            .read(&target.object_key(path))
            .await
            .map_err(|source| DeliveryError::Collaborator {
                backend: self.backend_type,
                source,
            })
    }
}
