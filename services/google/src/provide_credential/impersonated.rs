use crate::constants::*;
use crate::Token;
use bytes::Bytes;
use log::debug;
use logship_core::time::parse_rfc3339;
use logship_core::{Context, Error, ProvideCredential, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MAX_LIFETIME: Duration = Duration::from_secs(3600);

#[derive(Serialize)]
struct ImpersonationRequest<'a> {
    lifetime: String,
    scope: Vec<&'a str>,
    delegates: &'a [String],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImpersonationResponse {
    access_token: String,
    expire_time: String,
}

/// ImpersonatedCredentialProvider exchanges the token of a source identity
/// for a token of `service_account` through `generateAccessToken`.
///
/// This is the Google counterpart of assuming a role: the source identity
/// needs `roles/iam.serviceAccountTokenCreator` on the target account.
#[derive(Debug)]
pub struct ImpersonatedCredentialProvider {
    source: Box<dyn ProvideCredential<Credential = Token>>,
    service_account: String,
    scope: Option<String>,
    delegates: Vec<String>,
    endpoint: String,
}

impl ImpersonatedCredentialProvider {
    /// Impersonate `service_account` with tokens from `source`.
    pub fn new(
        source: impl ProvideCredential<Credential = Token>,
        service_account: impl Into<String>,
    ) -> Self {
        Self {
            source: Box::new(source),
            service_account: service_account.into(),
            scope: None,
            delegates: Vec::new(),
            endpoint: IAM_CREDENTIALS_ENDPOINT.to_string(),
        }
    }

    /// Set the OAuth2 scope.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Set the delegation chain.
    pub fn with_delegates(mut self, delegates: Vec<String>) -> Self {
        self.delegates = delegates;
        self
    }

    /// Set the IAM credentials endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait::async_trait]
impl ProvideCredential for ImpersonatedCredentialProvider {
    type Credential = Token;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let Some(source) = self.source.provide_credential(ctx).await? else {
            debug!("no source token to impersonate {}", self.service_account);
            return Ok(None);
        };

        let scope = self
            .scope
            .clone()
            .or_else(|| ctx.env_var_non_empty(GOOGLE_SCOPE))
            .unwrap_or_else(|| DEFAULT_SCOPE.to_string());
        let body = serde_json::to_vec(&ImpersonationRequest {
            lifetime: format!("{}s", MAX_LIFETIME.as_secs()),
            scope: vec![scope.as_str()],
            delegates: &self.delegates,
        })
        .map_err(|e| Error::unexpected("failed to encode impersonation request").with_source(e))?;

        let url = format!(
            "{}/v1/projects/-/serviceAccounts/{}:generateAccessToken",
            self.endpoint.trim_end_matches('/'),
            self.service_account
        );
        let req = http::Request::post(&url)
            .header(http::header::CONTENT_TYPE, "application/json")
            .header(
                http::header::AUTHORIZATION,
                format!("Bearer {}", source.access_token),
            )
            .body(Bytes::from(body))
            .map_err(|e| {
                Error::request_invalid("failed to build impersonation request").with_source(e)
            })?;

        let resp = ctx.http_send(req).await.map_err(|e| {
            Error::unexpected("failed to call generateAccessToken")
                .with_source(e)
                .set_retryable(true)
        })?;

        let status = resp.status();
        if !status.is_success() {
            let err = match status.as_u16() {
                401 | 403 => Error::credential_denied("service account impersonation denied"),
                _ => Error::unexpected("generateAccessToken failed")
                    .set_retryable(status.is_server_error()),
            };
            return Err(err
                .with_context(format!("status: {status}"))
                .with_context(format!("service_account: {}", self.service_account))
                .with_context(format!("body: {}", String::from_utf8_lossy(resp.body()))));
        }

        let token: ImpersonationResponse = serde_json::from_slice(resp.body()).map_err(|e| {
            Error::unexpected("failed to parse generateAccessToken response").with_source(e)
        })?;

        Ok(Some(Token::new(
            token.access_token,
            Some(parse_rfc3339(&token.expire_time)?),
        )))
    }
}
