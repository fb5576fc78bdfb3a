use crate::backend::{
    AzureBackend, Backend, DelegatedBackend, GcsBackend, LogSink, S3Backend, S3Endpoint,
};
use crate::{BackendType, DeliveryError, LogPayload, LogStoreConfig, StorageTarget};
use bytes::Bytes;
use log::{debug, error};
use logship_aws_v4::{Credential, CredentialResolver};
use logship_core::{CacheSelector, Context};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// StorageDispatcher routes every write and read to the adapter registered
/// for the target's [`BackendType`].
///
/// ```no_run
/// use logship::{default_context, LogPayload, LogStoreConfig, StorageDispatcher};
///
/// # async fn example() -> logship_core::Result<()> {
/// let ctx = default_context();
/// let config = LogStoreConfig::from_env(&ctx)?;
/// let target = config.target();
/// let dispatcher = StorageDispatcher::from_config(ctx, config);
///
/// dispatcher
///     .put_and_forget(&target, &LogPayload::new("30/org-1/log-1.json", "{}"))
///     .await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct StorageDispatcher {
    ctx: Context,
    backends: HashMap<BackendType, Arc<dyn Backend>>,
    dropped_writes: AtomicU64,
}

impl StorageDispatcher {
    /// Create a dispatcher without any backend.
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            backends: HashMap::new(),
            dropped_writes: AtomicU64::new(0),
        }
    }

    /// Create a dispatcher with every backend registered from `config`.
    pub fn from_config(ctx: Context, config: LogStoreConfig) -> Self {
        Self::from_config_with_caches(ctx, config, CacheSelector::new())
    }

    /// Like [`StorageDispatcher::from_config`], caching credentials in `caches`.
    pub fn from_config_with_caches(
        ctx: Context,
        config: LogStoreConfig,
        caches: CacheSelector<Credential>,
    ) -> Self {
        let resolver = Arc::new(
            CredentialResolver::new(caches, config.use_local_cache).with_retry(config.retry),
        );
        let custom = S3Endpoint::Custom(config.endpoint.clone().unwrap_or_default());
        let gcs = GcsBackend::new(
            ctx.clone(),
            config.gcs_service_account.as_deref(),
            config.retry,
        );
        let azure = AzureBackend::new(ctx.clone(), &config);
        let config = Arc::new(config);

        let mut dispatcher = Self::new(ctx)
            .with_backend(S3Backend::new_static(
                BackendType::S3,
                S3Endpoint::Aws,
                config.clone(),
            ))
            .with_backend(S3Backend::new_assumed(
                BackendType::S3Assume,
                S3Endpoint::Aws,
                config.clone(),
                resolver,
            ))
            .with_backend(S3Backend::new_static(
                BackendType::Gcs,
                S3Endpoint::Gcs,
                config.clone(),
            ))
            .with_backend(gcs)
            .with_backend(azure)
            .with_backend(S3Backend::new_static(
                BackendType::Wasabi,
                S3Endpoint::Wasabi,
                config.clone(),
            ))
            .with_backend(DelegatedBackend::unconfigured(BackendType::ControlPlane))
            .with_backend(DelegatedBackend::unconfigured(BackendType::DocumentStore));

        if config.endpoint.is_some() {
            dispatcher = dispatcher
                .with_backend(S3Backend::new_static(
                    BackendType::NetApp,
                    custom.clone(),
                    config.clone(),
                ))
                .with_backend(S3Backend::new_static(
                    BackendType::CustomS3,
                    custom,
                    config,
                ));
        }
        dispatcher
    }

    /// Register `backend`, replacing the one of the same type.
    pub fn with_backend(mut self, backend: impl Backend) -> Self {
        self.backends
            .insert(backend.backend_type(), Arc::new(backend));
        self
    }

    /// Route control plane writes to `sink`.
    pub fn with_control_plane(self, sink: impl LogSink) -> Self {
        self.with_backend(DelegatedBackend::new(BackendType::ControlPlane, sink))
    }

    /// Route document store writes to `sink`.
    pub fn with_document_store(self, sink: impl LogSink) -> Self {
        self.with_backend(DelegatedBackend::new(BackendType::DocumentStore, sink))
    }

    fn backend(
        &self,
        target: &StorageTarget,
        operation: &'static str,
    ) -> Result<&Arc<dyn Backend>, DeliveryError> {
        self.backends
            .get(&target.backend_type)
            .ok_or(DeliveryError::Unsupported {
                backend: target.backend_type,
                operation,
            })
    }

    /// Store `payload` under `target`.
    pub async fn put(
        &self,
        target: &StorageTarget,
        payload: &LogPayload,
    ) -> Result<(), DeliveryError> {
        debug!(
            "backend={}: put {} ({} bytes)",
            target.backend_type,
            payload.file_path,
            payload.body.len()
        );
        self.backend(target, "put")?
            .put(&self.ctx, target, payload)
            .await
    }

    /// Store `payload`, logging and counting a failure instead of returning it.
    ///
    /// This is the boundary between the request path and delivery: it never
    /// fails and never panics on a delivery error.
    pub async fn put_and_forget(&self, target: &StorageTarget, payload: &LogPayload) {
        if let Err(err) = self.put(target, payload).await {
            self.dropped_writes.fetch_add(1, Ordering::Relaxed);
            error!("dropped log {}: {err}", payload.file_path);
        }
    }

    /// Read the object at `path` under `target`.
    pub async fn get(&self, target: &StorageTarget, path: &str) -> Result<Bytes, DeliveryError> {
        self.backend(target, "get")?
            .get(&self.ctx, target, path)
            .await
    }

    /// Build a URL that reads `path` for `expires_in`.
    pub async fn presign_get(
        &self,
        target: &StorageTarget,
        path: &str,
        expires_in: Duration,
    ) -> Result<String, DeliveryError> {
        self.backend(target, "presign_get")?
            .presign_get(&self.ctx, target, path, expires_in)
            .await
    }

    /// Number of writes dropped by [`StorageDispatcher::put_and_forget`].
    pub fn dropped_writes(&self) -> u64 {
        self.dropped_writes.load(Ordering::Relaxed)
    }
}
