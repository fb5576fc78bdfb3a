//! Adapters that deliver payloads to a single kind of store.

use crate::{BackendType, DeliveryError, LogPayload, StorageTarget};
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode, Uri};
use log::debug;
use logship_core::{Context, Error, RetryPolicy};
use std::fmt::Debug;
use std::time::Duration;

mod s3;
pub use s3::{S3Backend, S3Endpoint};

mod gcs;
pub use gcs::GcsBackend;

mod azure;
pub use azure::AzureBackend;

mod delegated;
pub use delegated::{DelegatedBackend, LogSink};

/// Backend writes and reads payloads for one [`BackendType`].
///
/// Implementations resolve credentials, sign and send, returning a typed
/// error instead of logging it. Logging happens once, at the dispatcher.
#[async_trait]
pub trait Backend: Debug + Send + Sync + 'static {
    /// The backend type this adapter serves.
    fn backend_type(&self) -> BackendType;

    /// Store `payload` under `target`.
    async fn put(
        &self,
        ctx: &Context,
        target: &StorageTarget,
        payload: &LogPayload,
    ) -> Result<(), DeliveryError>;

    /// Read the object at `path` under `target`.
    async fn get(
        &self,
        ctx: &Context,
        target: &StorageTarget,
        path: &str,
    ) -> Result<Bytes, DeliveryError>;

    /// Build a URL that reads `path` without further credentials.
    async fn presign_get(
        &self,
        _: &Context,
        _: &StorageTarget,
        _: &str,
        _: Duration,
    ) -> Result<String, DeliveryError> {
        Err(DeliveryError::Unsupported {
            backend: self.backend_type(),
            operation: "presign_get",
        })
    }
}

/// Send a signed request through `retry`.
///
/// Server errors, throttling and transport failures are retried; any other
/// status ends the loop and is reported as is.
pub(crate) async fn send_with_retry(
    ctx: &Context,
    retry: &RetryPolicy,
    backend: BackendType,
    parts: http::request::Parts,
    body: Bytes,
) -> Result<Bytes, DeliveryError> {
    let method: Method = parts.method;
    let uri: Uri = parts.uri;
    let headers: HeaderMap = parts.headers;

    let resp = retry
        .retry_until(
            || {
                let req = build_request(&method, &uri, &headers, body.clone());
                async move {
                    ctx.http_send(req?).await.map_err(|e| {
                        Error::unexpected("failed to send request")
                            .with_source(e)
                            .set_retryable(true)
                    })
                }
            },
            |resp| !is_retryable_status(resp.status()),
            |resp| {
                Error::unexpected("retries exhausted")
                    .with_context(format!("status: {}", resp.status()))
                    .with_context(format!("body: {}", String::from_utf8_lossy(resp.body())))
                    .set_retryable(true)
            },
        )
        .await
        .map_err(|e| DeliveryError::from_core(backend, e.with_context(format!("uri: {uri}"))))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(DeliveryError::Delivery {
            backend,
            source: Error::unexpected("store rejected request")
                .with_context(format!("method: {method}"))
                .with_context(format!("uri: {uri}"))
                .with_context(format!("status: {status}"))
                .with_context(format!("body: {}", String::from_utf8_lossy(resp.body()))),
        });
    }

    debug!("{backend}: {method} {uri} returned {status}");
    Ok(resp.into_body())
}

fn build_request(
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: Bytes,
) -> logship_core::Result<http::Request<Bytes>> {
    let mut req = http::Request::builder()
        .method(method.clone())
        .uri(uri.clone())
        .body(body)?;
    *req.headers_mut() = headers.clone();
    Ok(req)
}

fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Percent encode an object key for use as a URL path.
pub(crate) fn encode_key(key: &str) -> String {
    percent_encoding::utf8_percent_encode(key, &logship_aws_v4::constants::AWS_URI_ENCODE_SET)
        .to_string()
}
