use crate::constants::*;
use crate::credential::CredentialSource;
use crate::provide_credential::cached::CacheKey;
use crate::provide_credential::utils::{parse_imds_error, ContainerCredentials};
use crate::{Config, Credential};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::TimeDelta;
use http::header::CONTENT_LENGTH;
use http::Method;
use logship_core::time::{now, DateTime};
use logship_core::{Context, Error, ProvideCredential, Result, RetryPolicy};
use std::sync::{Arc, Mutex};

/// IMDSv2CredentialProvider loads the instance profile credentials of an EC2
/// instance.
///
/// The session token is requested with a six hour ttl and reused until ten
/// minutes before it expires. Set `AWS_EC2_METADATA_DISABLED=true` to skip
/// this source.
#[derive(Debug, Clone)]
pub struct IMDSv2CredentialProvider {
    endpoint: Option<String>,
    token: Arc<Mutex<(String, DateTime)>>,
    retry: RetryPolicy,
}

impl Default for IMDSv2CredentialProvider {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: Arc::new(Mutex::new((String::new(), DateTime::default()))),
            retry: RetryPolicy::default(),
        }
    }
}

impl IMDSv2CredentialProvider {
    /// Create a new `IMDSv2CredentialProvider` instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint for the metadata service.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Replace the retry policy used for metadata calls.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self, config: &Config) -> String {
        self.endpoint
            .clone()
            .or_else(|| config.ec2_metadata_endpoint.clone())
            .unwrap_or_else(|| IMDS_ENDPOINT.to_string())
    }

    async fn load_ec2_metadata_token(&self, ctx: &Context, endpoint: &str) -> Result<String> {
        {
            let (token, expires_in) = self.token.lock().expect("lock poisoned").clone();
            if expires_in > now() {
                return Ok(token);
            }
        }

        let url = format!("{endpoint}/latest/api/token");
        let resp = self
            .retry
            .retry_until(
                || async {
                    let req = http::Request::builder()
                        .uri(&url)
                        .method(Method::PUT)
                        .header(CONTENT_LENGTH, "0")
                        // 21600s (6h) is recommended by AWS.
                        .header("x-aws-ec2-metadata-token-ttl-seconds", "21600")
                        .body(Bytes::new())
                        .map_err(|e| {
                            Error::request_invalid("failed to build IMDS token request")
                                .with_source(e)
                                .with_context(format!("url: {url}"))
                        })?;
                    ctx.http_send_as_string(req).await.map_err(|e| {
                        Error::unexpected("failed to connect to IMDS")
                            .with_source(e)
                            .with_context(format!("endpoint: {endpoint}"))
                            .with_context("hint: check if running on EC2 instance")
                            .set_retryable(true)
                    })
                },
                |resp| resp.status() == http::StatusCode::OK,
                |resp| parse_imds_error("fetch_imds_token", resp.status(), resp.body()),
            )
            .await?;

        let ec2_token = resp.into_body();
        // Refresh 10 minutes before the token expires.
        let expires_in = now() + TimeDelta::seconds(21600) - TimeDelta::seconds(600);

        {
            *self.token.lock().expect("lock poisoned") = (ec2_token.clone(), expires_in);
        }

        Ok(ec2_token)
    }

    async fn get(&self, ctx: &Context, url: &str, token: &str, operation: &str) -> Result<String> {
        let resp = self
            .retry
            .retry_until(
                || async {
                    let req = http::Request::builder()
                        .uri(url)
                        .method(Method::GET)
                        .header("x-aws-ec2-metadata-token", token)
                        .body(Bytes::new())
                        .map_err(|e| {
                            Error::request_invalid(format!(
                                "failed to build IMDS {operation} request"
                            ))
                            .with_source(e)
                            .with_context(format!("url: {url}"))
                        })?;
                    ctx.http_send_as_string(req).await.map_err(|e| {
                        Error::unexpected(format!("failed to {operation} from IMDS"))
                            .with_source(e)
                            .set_retryable(true)
                    })
                },
                |resp| resp.status() == http::StatusCode::OK,
                |resp| parse_imds_error(operation, resp.status(), resp.body()),
            )
            .await?;
        Ok(resp.into_body())
    }
}

impl CacheKey for IMDSv2CredentialProvider {
    fn cache_key(&self, _: &Context) -> Option<String> {
        Some(CACHE_KEY_IMDS.to_string())
    }
}

#[async_trait]
impl ProvideCredential for IMDSv2CredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let config = Config::from_env(ctx);
        if config.ec2_metadata_disabled {
            log::debug!("IMDS disabled by {AWS_EC2_METADATA_DISABLED}, skipping");
            return Ok(None);
        }

        let endpoint = self.endpoint(&config);
        let token = self.load_ec2_metadata_token(ctx, &endpoint).await?;

        // List all credentials that node has.
        let url = format!("{endpoint}/latest/meta-data/iam/security-credentials/");
        let profile_name = self
            .get(ctx, &url, &token, "list_instance_profiles")
            .await?;
        let profile_name = profile_name.lines().next().unwrap_or_default().trim();
        if profile_name.is_empty() {
            return Err(
                Error::config_invalid("no IAM role attached to EC2 instance")
                    .with_context("hint: attach an IAM role to your EC2 instance"),
            );
        }

        // Get the credentials via role_name.
        let url = format!("{endpoint}/latest/meta-data/iam/security-credentials/{profile_name}");
        let content = self.get(ctx, &url, &token, "fetch_credentials").await?;

        let cred = ContainerCredentials::parse("imds", &content)
            .map_err(|e| e.with_context(format!("profile: {profile_name}")))?
            .into_credential()?;
        Ok(Some(Credential {
            region: Some(config.resolve_region(None)),
            source: Some(CredentialSource::Imds),
            ..cred
        }))
    }
}
