use crate::constants::*;
use crate::credential::CredentialSource;
use crate::provide_credential::cached::CacheKey;
use crate::provide_credential::utils::ContainerCredentials;
use crate::{Config, Credential};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::AUTHORIZATION;
use logship_core::{Context, Error, ProvideCredential, Result, RetryPolicy};

/// PodIdentityCredentialProvider loads credentials from the EKS Pod Identity
/// agent.
///
/// Active when `AWS_CONTAINER_CREDENTIALS_FULL_URI` is set. The authorization
/// token is read from `AWS_CONTAINER_AUTHORIZATION_TOKEN_FILE` on every call
/// since the agent rotates it, falling back to
/// `AWS_CONTAINER_AUTHORIZATION_TOKEN`.
#[derive(Debug, Default, Clone)]
pub struct PodIdentityCredentialProvider {
    retry: RetryPolicy,
}

impl PodIdentityCredentialProvider {
    /// Create a new provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the retry policy used for the agent call.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn authorization_token(&self, ctx: &Context) -> Result<Option<String>> {
        if let Some(path) = ctx.env_var_non_empty(AWS_CONTAINER_AUTHORIZATION_TOKEN_FILE) {
            let token = ctx.file_read_as_string(&path).await.map_err(|e| {
                Error::config_invalid("failed to read pod identity token file")
                    .with_source(e)
                    .with_context(format!("file: {path}"))
            })?;
            return Ok(Some(token.trim().to_string()));
        }

        Ok(ctx.env_var_non_empty(AWS_CONTAINER_AUTHORIZATION_TOKEN))
    }
}

impl CacheKey for PodIdentityCredentialProvider {
    fn cache_key(&self, ctx: &Context) -> Option<String> {
        let uri = ctx.env_var_non_empty(AWS_CONTAINER_CREDENTIALS_FULL_URI)?;
        Some(format!("assumed-pod-identity-{uri}"))
    }
}

#[async_trait]
impl ProvideCredential for PodIdentityCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let Some(url) = ctx.env_var_non_empty(AWS_CONTAINER_CREDENTIALS_FULL_URI) else {
            log::debug!("container credentials full uri not set, skipping pod identity");
            return Ok(None);
        };

        let token = self.authorization_token(ctx).await?;
        let resp = self
            .retry
            .retry_until(
                || async {
                    let mut req = http::Request::get(&url);
                    if let Some(token) = &token {
                        req = req.header(AUTHORIZATION, token);
                    }
                    let req = req.body(Bytes::new()).map_err(|e| {
                        Error::request_invalid("failed to build pod identity request")
                            .with_source(e)
                    })?;
                    ctx.http_send_as_string(req).await.map_err(|e| {
                        Error::unexpected("failed to reach pod identity agent")
                            .with_source(e)
                            .set_retryable(true)
                    })
                },
                |resp| resp.status() == http::StatusCode::OK,
                |resp| {
                    Error::unexpected(format!(
                        "pod identity agent returned status {}",
                        resp.status()
                    ))
                    .with_context(format!("body: {}", resp.body().trim()))
                    .set_retryable(resp.status().is_server_error())
                },
            )
            .await
            .map_err(|e| e.with_context(format!("url: {url}")))?;

        let cred = ContainerCredentials::parse("pod identity", resp.body())?.into_credential()?;
        Ok(Some(Credential {
            region: Some(Config::from_env(ctx).resolve_region(None)),
            source: Some(CredentialSource::PodIdentity),
            ..cred
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logship_core::StaticEnv;
    use std::collections::HashMap;

    #[test]
    fn test_cache_key_follows_full_uri() {
        let ctx = Context::new().with_env(StaticEnv {
            home_dir: None,
            envs: HashMap::from([
                (
                    AWS_CONTAINER_CREDENTIALS_FULL_URI.to_string(),
                    "http://169.254.170.23/v1/credentials".to_string(),
                ),
                (
                    AWS_CONTAINER_AUTHORIZATION_TOKEN.to_string(),
                    "rotating".to_string(),
                ),
            ]),
        });

        assert_eq!(
            PodIdentityCredentialProvider::new()
                .cache_key(&ctx)
                .as_deref(),
            Some("assumed-pod-identity-http://169.254.170.23/v1/credentials")
        );
    }

    #[tokio::test]
    async fn test_env_token_without_token_file() {
        let ctx = Context::new().with_env(StaticEnv {
            home_dir: None,
            envs: HashMap::from([(
                AWS_CONTAINER_AUTHORIZATION_TOKEN.to_string(),
                "env-token".to_string(),
            )]),
        });

        let token = PodIdentityCredentialProvider::new()
            .authorization_token(&ctx)
            .await
            .unwrap();
        assert_eq!(token.as_deref(), Some("env-token"));
    }
}
