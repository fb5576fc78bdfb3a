use super::{encode_key, send_with_retry, Backend};
use crate::{BackendType, DeliveryError, LogPayload, StorageTarget};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::request::Parts;
use http::{HeaderValue, Method};
use logship_core::{Context, Result, RetryPolicy, Signer};
use logship_google::{
    DefaultCredentialProvider, ImpersonatedCredentialProvider, RequestSigner, Token,
};

const GCS_ENDPOINT: &str = "https://storage.googleapis.com";

/// GcsBackend writes to Google Cloud Storage with the workload identity of
/// the host, optionally impersonating a service account.
#[derive(Debug)]
pub struct GcsBackend {
    signer: Signer<Token>,
    endpoint: String,
    retry: RetryPolicy,
}

impl GcsBackend {
    /// Create a backend using the default token chain.
    ///
    /// With `service_account` the workload token is exchanged for a token of
    /// that account before every expiry.
    pub fn new(ctx: Context, service_account: Option<&str>, retry: RetryPolicy) -> Self {
        let signer = match service_account {
            Some(sa) => Signer::new(
                ctx,
                ImpersonatedCredentialProvider::new(DefaultCredentialProvider::new(), sa),
                RequestSigner::new(),
            ),
            None => Signer::new(ctx, DefaultCredentialProvider::new(), RequestSigner::new()),
        };

        Self::with_signer(signer, retry)
    }

    /// Create a backend with a prepared signer.
    pub fn with_signer(signer: Signer<Token>, retry: RetryPolicy) -> Self {
        Self {
            signer,
            endpoint: GCS_ENDPOINT.to_string(),
            retry,
        }
    }

    /// Set the storage endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn parts(&self, method: Method, target: &StorageTarget, path: &str) -> Result<Parts> {
        let url = format!(
            "{}/{}/{}",
            self.endpoint.trim_end_matches('/'),
            target.bucket,
            encode_key(&target.object_key(path))
        );
        let (parts, _) = http::Request::builder()
            .method(method)
            .uri(url)
            .body(())?
            .into_parts();
        Ok(parts)
    }

    async fn sign(&self, mut parts: Parts) -> std::result::Result<Parts, DeliveryError> {
        match self.signer.credential().await {
            Ok(Some(_)) => {}
            Ok(None) => {
                return Err(DeliveryError::ChainExhausted {
                    backend: BackendType::GcsAssume,
                })
            }
            Err(err) => return Err(DeliveryError::from_core(BackendType::GcsAssume, err)),
        }

        self.signer
            .sign(&mut parts, None)
            .await
            .map_err(|source| DeliveryError::Signing {
                backend: BackendType::GcsAssume,
                source,
            })?;
        Ok(parts)
    }
}

#[async_trait]
impl Backend for GcsBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::GcsAssume
    }

    async fn put(
        &self,
        ctx: &Context,
        target: &StorageTarget,
        payload: &LogPayload,
    ) -> std::result::Result<(), DeliveryError> {
        let mut parts = self
            .parts(Method::PUT, target, &payload.file_path)
            .map_err(|source| DeliveryError::Signing {
                backend: BackendType::GcsAssume,
                source,
            })?;
        parts
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        parts
            .headers
            .insert(CONTENT_LENGTH, HeaderValue::from(payload.body.len()));

        let parts = self.sign(parts).await?;
        send_with_retry(
            ctx,
            &self.retry,
            BackendType::GcsAssume,
            parts,
            payload.body.clone(),
        )
        .await
        .map(|_| ())
    }

    async fn get(
        &self,
        ctx: &Context,
        target: &StorageTarget,
        path: &str,
    ) -> std::result::Result<Bytes, DeliveryError> {
        let parts = self
            .parts(Method::GET, target, path)
            .map_err(|source| DeliveryError::Signing {
                backend: BackendType::GcsAssume,
                source,
            })?;

        let parts = self.sign(parts).await?;
        send_with_retry(ctx, &self.retry, BackendType::GcsAssume, parts, Bytes::new()).await
    }
}
