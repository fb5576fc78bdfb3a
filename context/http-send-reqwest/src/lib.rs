//! Reqwest-based HTTP client implementation for logship.
//!
//! ```no_run
//! use logship_core::{Context, OsEnv};
//! use logship_http_send_reqwest::ReqwestHttpSend;
//!
//! let ctx = Context::new()
//!     .with_http_send(ReqwestHttpSend::default())
//!     .with_env(OsEnv);
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::BodyExt;
use logship_core::{Error, HttpSend, Result};
use reqwest::{Client, Request};

/// Reqwest-based implementation of the `HttpSend` trait.
///
/// Connect and timeout failures are marked retryable, everything else is not.
#[derive(Debug, Default)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn map_reqwest_error(err: reqwest::Error, message: &str) -> Error {
    let retryable = err.is_connect() || err.is_timeout() || err.is_request();
    Error::unexpected(message)
        .with_source(err)
        .set_retryable(retryable)
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let uri = req.uri().to_string();
        let req = Request::try_from(req).map_err(|e| {
            Error::request_invalid("failed to convert http request")
                .with_context(format!("uri: {uri}"))
                .with_source(e)
        })?;

        let resp: http::Response<_> = self
            .client
            .execute(req)
            .await
            .map_err(|e| map_reqwest_error(e, "failed to send http request"))?
            .into();

        let (parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body)
            .await
            .map(|buf| buf.to_bytes())
            .map_err(|e| map_reqwest_error(e, "failed to read http response body"))?;
        Ok(http::Response::from_parts(parts, bs))
    }
}
