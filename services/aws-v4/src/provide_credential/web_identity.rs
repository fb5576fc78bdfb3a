use crate::constants::*;
use crate::credential::CredentialSource;
use crate::provide_credential::cached::CacheKey;
use crate::provide_credential::utils::{parse_sts_error, sts_endpoint, StsCredentials};
use crate::{Config, Credential};
use async_trait::async_trait;
use bytes::Bytes;
use logship_core::{Context, Error, ProvideCredential, Result, RetryPolicy};
use serde::Deserialize;

/// WebIdentityCredentialProvider exchanges a projected service account token
/// for credentials via `AssumeRoleWithWebIdentity`.
///
/// This covers IRSA on EKS as well as any other OIDC federation that exposes
/// `AWS_ROLE_ARN` and `AWS_WEB_IDENTITY_TOKEN_FILE`. The resulting credential
/// records the role it acts as.
#[derive(Debug, Default, Clone)]
pub struct WebIdentityCredentialProvider {
    role_arn: Option<String>,
    token_file: Option<String>,
    retry: RetryPolicy,
}

impl WebIdentityCredentialProvider {
    /// Create a provider that reads its inputs from the environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the role arn instead of reading `AWS_ROLE_ARN`.
    pub fn with_role_arn(mut self, role_arn: impl Into<String>) -> Self {
        self.role_arn = Some(role_arn.into());
        self
    }

    /// Set the token file instead of reading `AWS_WEB_IDENTITY_TOKEN_FILE`.
    pub fn with_token_file(mut self, token_file: impl Into<String>) -> Self {
        self.token_file = Some(token_file.into());
        self
    }

    /// Replace the retry policy used for the STS call.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn inputs(&self, ctx: &Context) -> Option<(String, String)> {
        let role_arn = self
            .role_arn
            .clone()
            .or_else(|| ctx.env_var_non_empty(AWS_ROLE_ARN))?;
        let token_file = self
            .token_file
            .clone()
            .or_else(|| ctx.env_var_non_empty(AWS_WEB_IDENTITY_TOKEN_FILE))?;
        Some((role_arn, token_file))
    }
}

impl CacheKey for WebIdentityCredentialProvider {
    fn cache_key(&self, ctx: &Context) -> Option<String> {
        let (role_arn, token_file) = self.inputs(ctx)?;
        let region = Config::from_env(ctx).resolve_region(None);
        Some(format!(
            "assumed-web-identity-{token_file}-role-{role_arn}-region-{region}"
        ))
    }
}

#[async_trait]
impl ProvideCredential for WebIdentityCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let Some((role_arn, token_file)) = self.inputs(ctx) else {
            log::debug!("web identity role arn or token file not set, skipping");
            return Ok(None);
        };

        let token = ctx.file_read_as_string(&token_file).await.map_err(|e| {
            Error::config_invalid("failed to read web identity token file")
                .with_source(e)
                .with_context(format!("file: {token_file}"))
                .with_context("hint: check if the token file exists and is readable")
        })?;

        let config = Config::from_env(ctx);
        let region = config.resolve_region(None);
        let endpoint = sts_endpoint(&region, config.use_regional_sts_endpoint);

        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("Action", "AssumeRoleWithWebIdentity")
            .append_pair("RoleArn", &role_arn)
            .append_pair("WebIdentityToken", token.trim())
            .append_pair("Version", "2011-06-15")
            .append_pair("RoleSessionName", &config.role_session_name)
            .finish();
        let url = format!("https://{endpoint}/?{query}");

        let resp = self
            .retry
            .retry_until(
                || send(ctx, &url),
                |resp| resp.status() == http::StatusCode::OK,
                |resp| {
                    let request_id = resp
                        .headers()
                        .get("x-amzn-requestid")
                        .and_then(|v| v.to_str().ok())
                        .map(|s| s.to_string());
                    parse_sts_error(
                        "AssumeRoleWithWebIdentity",
                        resp.status(),
                        resp.body(),
                        request_id.as_deref(),
                    )
                },
            )
            .await
            .map_err(|e| {
                e.with_context(format!("role_arn: {role_arn}"))
                    .with_context(format!("token_file: {token_file}"))
                    .with_context(format!("endpoint: https://{endpoint}"))
            })?;

        let body = resp.into_body();
        let resp: AssumeRoleWithWebIdentityResponse =
            quick_xml::de::from_str(&body).map_err(|e| {
                Error::unexpected("failed to parse STS AssumeRoleWithWebIdentity response")
                    .with_source(e)
                    .with_context(format!("response_length: {}", body.len()))
                    .with_context(format!("role_arn: {role_arn}"))
            })?;

        let cred = resp
            .result
            .credentials
            .into_credential("AssumeRoleWithWebIdentity")?;
        Ok(Some(Credential {
            region: Some(region),
            role_arn: Some(role_arn),
            source: Some(CredentialSource::WebIdentity),
            ..cred
        }))
    }
}

async fn send(ctx: &Context, url: &str) -> Result<http::Response<String>> {
    let req = http::Request::get(url)
        .header(
            http::header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        )
        .body(Bytes::new())
        .map_err(|e| {
            Error::request_invalid("failed to build STS AssumeRoleWithWebIdentity request")
                .with_source(e)
        })?;

    ctx.http_send_as_string(req).await.map_err(|e| {
        Error::unexpected("failed to send AssumeRoleWithWebIdentity request to STS")
            .with_source(e)
            .set_retryable(true)
    })
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct AssumeRoleWithWebIdentityResponse {
    #[serde(rename = "AssumeRoleWithWebIdentityResult")]
    result: AssumeRoleWithWebIdentityResult,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct AssumeRoleWithWebIdentityResult {
    credentials: StsCredentials,
}
