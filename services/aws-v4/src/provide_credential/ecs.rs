use crate::constants::*;
use crate::credential::CredentialSource;
use crate::provide_credential::cached::CacheKey;
use crate::provide_credential::utils::ContainerCredentials;
use crate::{Config, Credential};
use async_trait::async_trait;
use bytes::Bytes;
use logship_core::{Context, Error, ProvideCredential, Result, RetryPolicy};

/// EcsCredentialProvider loads the task role credentials of an ECS task.
///
/// Active when `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI` is set; the uri is
/// resolved against `http://169.254.170.2`.
#[derive(Debug, Default, Clone)]
pub struct EcsCredentialProvider {
    retry: RetryPolicy,
}

impl EcsCredentialProvider {
    /// Create a new `EcsCredentialProvider` instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the retry policy used for the metadata call.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl CacheKey for EcsCredentialProvider {
    fn cache_key(&self, ctx: &Context) -> Option<String> {
        let relative = ctx.env_var_non_empty(AWS_CONTAINER_CREDENTIALS_RELATIVE_URI)?;
        Some(format!("assumed-ecs-{relative}"))
    }
}

#[async_trait]
impl ProvideCredential for EcsCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let Some(relative) = ctx.env_var_non_empty(AWS_CONTAINER_CREDENTIALS_RELATIVE_URI) else {
            log::debug!("container credentials relative uri not set, skipping ecs");
            return Ok(None);
        };

        let url = format!("{ECS_CREDENTIALS_ENDPOINT}{relative}");
        let resp = self
            .retry
            .retry_until(
                || async {
                    let req = http::Request::get(&url).body(Bytes::new()).map_err(|e| {
                        Error::request_invalid("failed to build ECS metadata request")
                            .with_source(e)
                    })?;
                    ctx.http_send_as_string(req).await.map_err(|e| {
                        Error::unexpected("failed to reach ECS task metadata endpoint")
                            .with_source(e)
                            .set_retryable(true)
                    })
                },
                |resp| resp.status() == http::StatusCode::OK,
                |resp| {
                    Error::unexpected(format!(
                        "request to ECS task metadata endpoint failed: status={}",
                        resp.status()
                    ))
                    .with_context(format!("body: {}", resp.body().trim()))
                    .set_retryable(resp.status().is_server_error())
                },
            )
            .await
            .map_err(|e| e.with_context(format!("url: {url}")))?;

        let cred = ContainerCredentials::parse("ecs", resp.body())?.into_credential()?;
        Ok(Some(Credential {
            region: Some(Config::from_env(ctx).resolve_region(None)),
            source: Some(CredentialSource::Ecs),
            ..cred
        }))
    }
}
