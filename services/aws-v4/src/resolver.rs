use crate::assume_role::{AssumeRoleRequest, RoleAssumptionService};
use crate::credential::CredentialSource;
use crate::provide_credential::DefaultCredentialProvider;
use crate::{Config, Credential};
use log::{debug, warn};
use logship_core::{CacheSelector, Context, ProvideCredential, RetryPolicy};

/// Inputs of a single credential resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveRequest {
    /// Role the caller wants to act as.
    pub role_arn: Option<String>,
    /// External id for `role_arn`.
    pub external_id: Option<String>,
    /// Explicit region.
    pub region: Option<String>,
    /// Explicit access key id, used only together with `secret_access_key`.
    pub access_key_id: Option<String>,
    /// Explicit secret access key.
    pub secret_access_key: Option<String>,
    /// Session token of temporary explicit keys.
    pub session_token: Option<String>,
}

impl ResolveRequest {
    /// Create an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target role.
    pub fn with_role_arn(mut self, role_arn: impl Into<String>) -> Self {
        self.role_arn = Some(role_arn.into());
        self
    }

    /// Set the external id.
    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    /// Set the region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set explicit keys.
    pub fn with_keys(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    /// Set the session token sent with explicit keys.
    pub fn with_session_token(mut self, session_token: impl Into<String>) -> Self {
        self.session_token = Some(session_token.into());
        self
    }

    fn explicit_keys(&self) -> Option<Credential> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(ak), Some(sk)) if !ak.is_empty() && !sk.is_empty() => {
                let cred = Credential::new(ak, sk).with_source(CredentialSource::Explicit);
                Some(
                    match self.session_token.as_deref().filter(|v| !v.is_empty()) {
                        Some(token) => cred.with_session_token(token),
                        None => cred,
                    },
                )
            }
            _ => None,
        }
    }
}

/// CredentialResolver produces the credentials for one outbound call.
///
/// Precedence, first success wins:
///
/// 1. explicit keys from the request skip straight to role assumption
/// 2. a source role declared by `AWS_ASSUME_ROLE_SOURCE_ARN` is assumed with
///    the `AWS_ASSUME_ROLE_*` key pair; failing that hop fails the resolution
/// 3. the `AWS_ASSUME_ROLE_*` key pair on its own
/// 4. the [`DefaultCredentialProvider`] chain
///
/// With a target role the key pair is then exchanged through
/// [`RoleAssumptionService`], unless it already acts as that role.
#[derive(Debug)]
pub struct CredentialResolver {
    chain: Box<dyn ProvideCredential<Credential = Credential>>,
    roles: RoleAssumptionService,
    caches: CacheSelector<Credential>,
    use_local_cache: bool,
    default_chain: bool,
}

impl Default for CredentialResolver {
    fn default() -> Self {
        Self::new(CacheSelector::new(), true)
    }
}

impl CredentialResolver {
    /// Create a resolver caching network sources and assumed roles in `caches`.
    pub fn new(caches: CacheSelector<Credential>, use_local_cache: bool) -> Self {
        Self {
            chain: Box::new(DefaultCredentialProvider::new(
                caches.select(use_local_cache),
            )),
            roles: RoleAssumptionService::new(caches.clone()).with_local_cache(use_local_cache),
            caches,
            use_local_cache,
            default_chain: true,
        }
    }

    /// Replace the base credential chain.
    pub fn with_chain(mut self, chain: impl ProvideCredential<Credential = Credential>) -> Self {
        self.chain = Box::new(chain);
        self.default_chain = false;
        self
    }

    /// Replace the retry policy used for STS and metadata calls.
    ///
    /// A chain set by [`CredentialResolver::with_chain`] keeps its own policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.roles = self.roles.with_retry(retry);
        if self.default_chain {
            self.chain = Box::new(DefaultCredentialProvider::with_retry(
                self.caches.select(self.use_local_cache),
                retry,
            ));
        }
        self
    }

    /// The role assumption service this resolver delegates to.
    pub fn role_assumption(&self) -> &RoleAssumptionService {
        &self.roles
    }

    /// Resolve credentials, returning `None` when no source succeeded.
    pub async fn resolve(&self, ctx: &Context, req: &ResolveRequest) -> Option<Credential> {
        let config = Config::from_env(ctx);
        let explicit_region = req.region.as_deref().filter(|v| !v.is_empty());
        let region = config.resolve_region(explicit_region);

        let base = match req.explicit_keys() {
            Some(cred) => cred,
            None => self.base_credential(ctx, &config).await?,
        };

        let Some(role_arn) = req.role_arn.as_deref().filter(|v| !v.is_empty()) else {
            return Some(with_region(base, explicit_region, region));
        };

        if base.role_arn.as_deref() == Some(role_arn) {
            debug!(
                "credential from {:?} already acts as {role_arn}",
                base.source
            );
            return Some(with_region(base, explicit_region, region));
        }

        let assume = AssumeRoleRequest::new(role_arn)
            .with_external_id(req.external_id.as_deref())
            .with_region(Some(region.as_str()));
        self.roles.assume_role(ctx, assume, &base).await
    }

    async fn base_credential(&self, ctx: &Context, config: &Config) -> Option<Credential> {
        let env_keys = config.assume_role_keys().map(|(ak, sk)| {
            Credential::new(ak, sk).with_source(CredentialSource::AssumeRoleEnvironment)
        });

        if let (Some(source_role), Some(keys)) = (&config.source_role_arn, &env_keys) {
            let assume = AssumeRoleRequest::new(source_role)
                .with_external_id(config.source_external_id.as_deref());
            return match self.roles.assume_role(ctx, assume, keys).await {
                Some(cred) => Some(cred),
                None => {
                    warn!("source role {source_role} could not be assumed, giving up");
                    None
                }
            };
        }

        if env_keys.is_some() {
            return env_keys;
        }

        match self.chain.provide_credential(ctx).await {
            Ok(Some(cred)) => Some(cred),
            Ok(None) => {
                warn!("no credential source produced credentials");
                None
            }
            Err(err) => {
                warn!("credential chain failed: {}", err.display_with_context());
                None
            }
        }
    }
}

/// An explicit region always wins, otherwise a region the source reported is
/// kept before the resolved default.
fn with_region(cred: Credential, explicit: Option<&str>, resolved: String) -> Credential {
    let region = match (explicit, &cred.region) {
        (Some(_), _) | (None, None) => resolved,
        (None, Some(region)) => region.clone(),
    };
    Credential {
        region: Some(region),
        ..cred
    }
}
