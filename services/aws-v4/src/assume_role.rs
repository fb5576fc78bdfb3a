use crate::constants::*;
use crate::credential::CredentialSource;
use crate::provide_credential::utils::{parse_sts_error, sts_endpoint, StsCredentials};
use crate::{Config, Credential, RequestSigner};
use bytes::Bytes;
use http::StatusCode;
use log::{debug, warn};
use logship_core::{
    CacheSelector, Context, Error, Result, RetryPolicy, SignRequest, SigningCredential,
};
use serde::Deserialize;
use std::time::Duration;

/// Role to assume through STS `AssumeRole`.
#[derive(Debug, Clone, Copy)]
pub struct AssumeRoleRequest<'a> {
    /// Arn of the role to assume.
    pub role_arn: &'a str,
    /// External id required by the role's trust policy.
    pub external_id: Option<&'a str>,
    /// Explicit region; falls back to the environment, then `us-east-1`.
    pub region: Option<&'a str>,
}

impl<'a> AssumeRoleRequest<'a> {
    /// Assume `role_arn` without external id in the default region.
    pub fn new(role_arn: &'a str) -> Self {
        Self {
            role_arn,
            external_id: None,
            region: None,
        }
    }

    /// Set the external id.
    pub fn with_external_id(mut self, external_id: Option<&'a str>) -> Self {
        self.external_id = external_id;
        self
    }

    /// Set the region.
    pub fn with_region(mut self, region: Option<&'a str>) -> Self {
        self.region = region;
        self
    }

    /// Cache key: `assumed-sts-{roleArn}/{externalId}/{region}`.
    pub fn cache_key(&self, region: &str) -> String {
        format!(
            "assumed-sts-{}/{}/{}",
            self.role_arn,
            self.external_id.unwrap_or_default(),
            region
        )
    }
}

/// RoleAssumptionService exchanges a key pair for the credentials of another
/// role through a SigV4 signed STS `AssumeRole` call.
///
/// Calls go through [`RetryPolicy`] and successful results are cached for five
/// minutes under the role, external id and region. Failures are logged and
/// surface as `None`.
#[derive(Debug, Clone)]
pub struct RoleAssumptionService {
    caches: CacheSelector<Credential>,
    use_local_cache: bool,
    retry: RetryPolicy,
    ttl: Duration,
}

impl Default for RoleAssumptionService {
    fn default() -> Self {
        Self::new(CacheSelector::new())
    }
}

impl RoleAssumptionService {
    /// Create a service caching into `caches`.
    pub fn new(caches: CacheSelector<Credential>) -> Self {
        Self {
            caches,
            use_local_cache: true,
            retry: RetryPolicy::default(),
            ttl: CREDENTIAL_CACHE_TTL,
        }
    }

    /// Use the shared cache instead of the process local one.
    pub fn with_local_cache(mut self, use_local_cache: bool) -> Self {
        self.use_local_cache = use_local_cache;
        self
    }

    /// Replace the retry policy used for STS calls.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Assume `req.role_arn` with `base` credentials.
    ///
    /// Returns `None` when STS refuses or cannot be reached; the reason is
    /// logged.
    pub async fn assume_role(
        &self,
        ctx: &Context,
        req: AssumeRoleRequest<'_>,
        base: &Credential,
    ) -> Option<Credential> {
        match self.try_assume_role(ctx, req, base).await {
            Ok(cred) => Some(cred),
            Err(err) => {
                warn!(
                    "failed to assume role {}: {}",
                    req.role_arn,
                    err.display_with_context()
                );
                None
            }
        }
    }

    /// Same as [`RoleAssumptionService::assume_role`] but keeps the error.
    pub async fn try_assume_role(
        &self,
        ctx: &Context,
        req: AssumeRoleRequest<'_>,
        base: &Credential,
    ) -> Result<Credential> {
        let config = Config::from_env(ctx);
        let region = config.resolve_region(req.region);
        let key = req.cache_key(&region);
        let cache = self.caches.select(self.use_local_cache);

        if let Some(cred) = cache.get(&key).await {
            if cred.is_valid() {
                debug!("assume role cache hit: {key}");
                return Ok(cred);
            }
        }

        let endpoint = sts_endpoint(&region, config.use_regional_sts_endpoint);
        let url = {
            let mut query = form_urlencoded::Serializer::new(String::new());
            query
                .append_pair("Action", "AssumeRole")
                .append_pair("RoleArn", req.role_arn)
                .append_pair("RoleSessionName", &config.role_session_name)
                .append_pair("DurationSeconds", "3600")
                .append_pair("Version", "2011-06-15");
            if let Some(external_id) = req.external_id {
                query.append_pair("ExternalId", external_id);
            }
            format!("https://{endpoint}/?{}", query.finish())
        };

        let signer = RequestSigner::new("sts", &region);
        let resp = self
            .retry
            .retry_until(
                || self.send(ctx, &url, &signer, base),
                |resp| resp.status() == StatusCode::OK,
                |resp| {
                    let request_id = resp
                        .headers()
                        .get("x-amzn-requestid")
                        .and_then(|v| v.to_str().ok())
                        .map(|v| v.to_string());
                    parse_sts_error(
                        "AssumeRole",
                        resp.status(),
                        resp.body(),
                        request_id.as_deref(),
                    )
                },
            )
            .await
            .map_err(|e| {
                e.with_context(format!("role_arn: {}", req.role_arn))
                    .with_context(format!("endpoint: https://{endpoint}"))
            })?;

        let body = resp.into_body();
        let parsed: AssumeRoleResponse = quick_xml::de::from_str(&body).map_err(|e| {
            Error::unexpected("failed to parse STS AssumeRole response")
                .with_source(e)
                .with_context(format!("response_length: {}", body.len()))
                .with_context(format!("role_arn: {}", req.role_arn))
        })?;

        let cred = parsed.result.credentials.into_credential("AssumeRole")?;
        let cred = Credential {
            region: Some(region),
            role_arn: Some(req.role_arn.to_string()),
            source: Some(CredentialSource::AssumeRole),
            ..cred
        };

        cache.set(&key, cred.clone(), self.ttl).await;
        Ok(cred)
    }

    async fn send(
        &self,
        ctx: &Context,
        url: &str,
        signer: &RequestSigner,
        base: &Credential,
    ) -> Result<http::Response<String>> {
        let req = http::Request::get(url)
            .header(
                http::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .header(X_AMZ_CONTENT_SHA_256, EMPTY_STRING_SHA256)
            .body(Bytes::new())
            .map_err(|e| {
                Error::request_invalid("failed to build STS AssumeRole request").with_source(e)
            })?;

        let (mut parts, body) = req.into_parts();
        signer
            .sign_request(ctx, &mut parts, Some(base), None)
            .await?;
        let req = http::Request::from_parts(parts, body);

        ctx.http_send_as_string(req).await.map_err(|e| {
            Error::unexpected("failed to send AssumeRole request to STS")
                .with_source(e)
                .set_retryable(true)
        })
    }
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct AssumeRoleResponse {
    #[serde(rename = "AssumeRoleResult")]
    result: AssumeRoleResult,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct AssumeRoleResult {
    credentials: StsCredentials,
}
