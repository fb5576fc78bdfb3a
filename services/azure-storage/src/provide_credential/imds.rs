use crate::constants::*;
use crate::Credential;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::TimeDelta;
use logship_core::time::{now, parse_rfc3339, DateTime};
use logship_core::{Context, Error, ProvideCredential, Result};
use serde::Deserialize;

/// ImdsCredentialProvider loads a storage access token for the managed
/// identity of the current VM or container.
///
/// A user assigned identity is selected by `AZURE_OBJECT_ID`,
/// `AZURE_CLIENT_ID` or `AZURE_MSI_RES_ID`, in that order.
#[derive(Debug, Default, Clone)]
pub struct ImdsCredentialProvider {
    endpoint: Option<String>,
}

impl ImdsCredentialProvider {
    /// Create a new IMDS provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the token endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

#[async_trait]
impl ProvideCredential for ImdsCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let endpoint = self
            .endpoint
            .clone()
            .or_else(|| ctx.env_var_non_empty(AZURE_IMDS_ENDPOINT))
            .unwrap_or_else(|| DEFAULT_IMDS_ENDPOINT.to_string());

        let url = {
            let mut query = form_urlencoded::Serializer::new(String::new());
            query
                .append_pair("api-version", "2018-02-01")
                .append_pair("resource", STORAGE_RESOURCE);
            if let Some(object_id) = ctx.env_var_non_empty(AZURE_OBJECT_ID) {
                query.append_pair("object_id", &object_id);
            } else if let Some(client_id) = ctx.env_var_non_empty(AZURE_CLIENT_ID) {
                query.append_pair("client_id", &client_id);
            } else if let Some(msi_res_id) = ctx.env_var_non_empty(AZURE_MSI_RES_ID) {
                query.append_pair("msi_res_id", &msi_res_id);
            }
            format!("{endpoint}?{}", query.finish())
        };

        let mut req = http::Request::get(&url).header("Metadata", "true");
        if let Some(secret) = ctx.env_var_non_empty(AZURE_MSI_SECRET) {
            req = req.header("X-IDENTITY-HEADER", secret);
        }
        let req = req.body(Bytes::new()).map_err(|e| {
            Error::request_invalid("failed to build managed identity request").with_source(e)
        })?;

        let resp = ctx.http_send(req).await.map_err(|e| {
            Error::unexpected("failed to connect to azure instance metadata")
                .with_source(e)
                .with_context(format!("endpoint: {endpoint}"))
                .set_retryable(true)
        })?;

        if !resp.status().is_success() {
            return Err(Error::unexpected("managed identity token request failed")
                .with_context(format!("status: {}", resp.status()))
                .with_context(format!("body: {}", String::from_utf8_lossy(resp.body()))));
        }

        let token: TokenResponse = serde_json::from_slice(resp.body()).map_err(|e| {
            Error::unexpected("failed to parse managed identity token response").with_source(e)
        })?;

        let expires_on = parse_expires_on(&token.expires_on)?;
        Ok(Some(Credential::with_bearer_token(
            &token.access_token,
            Some(expires_on),
        )))
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_on: String,
}

/// `expires_on` is epoch seconds, some hosts return RFC3339 instead.
/// Missing values get ten minutes.
fn parse_expires_on(value: &str) -> Result<DateTime> {
    if value.is_empty() {
        return Ok(now() + TimeDelta::minutes(10));
    }
    if let Ok(secs) = value.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0).ok_or_else(|| {
            Error::unexpected("managed identity expires_on out of range")
                .with_context(format!("expires_on: {value}"))
        });
    }
    parse_rfc3339(value)
}
