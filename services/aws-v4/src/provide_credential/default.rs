use crate::provide_credential::{
    CachedCredentialProvider, EcsCredentialProvider, EnvCredentialProvider,
    IMDSv2CredentialProvider, PodIdentityCredentialProvider, ProfileCredentialProvider,
    WebIdentityCredentialProvider,
};
use crate::Credential;
use async_trait::async_trait;
use logship_core::{
    Context, CredentialCache, MemoryCache, ProvideCredential, ProvideCredentialChain, Result,
    RetryPolicy,
};
use std::sync::Arc;

/// DefaultCredentialProvider walks the base credential sources in a fixed order.
///
/// 1. environment variables
/// 2. shared credentials file
/// 3. config file
/// 4. web identity (IRSA)
/// 5. EKS Pod Identity
/// 6. ECS task role
/// 7. EC2 instance metadata (IMDSv2)
///
/// Every network source is cached on its own key.
#[derive(Debug)]
pub struct DefaultCredentialProvider {
    chain: ProvideCredentialChain<Credential>,
}

impl Default for DefaultCredentialProvider {
    fn default() -> Self {
        Self::new(Arc::new(MemoryCache::new()))
    }
}

impl DefaultCredentialProvider {
    /// Create the default chain, caching network sources in `cache`.
    pub fn new(cache: Arc<dyn CredentialCache<Credential>>) -> Self {
        Self::with_retry(cache, RetryPolicy::default())
    }

    /// Like [`DefaultCredentialProvider::new`], sending every network call
    /// through `retry`.
    pub fn with_retry(cache: Arc<dyn CredentialCache<Credential>>, retry: RetryPolicy) -> Self {
        let chain = ProvideCredentialChain::new()
            .push(EnvCredentialProvider::new())
            .push(ProfileCredentialProvider::shared_credentials())
            .push(ProfileCredentialProvider::config())
            .push(CachedCredentialProvider::new(
                WebIdentityCredentialProvider::new().with_retry(retry),
                cache.clone(),
            ))
            .push(CachedCredentialProvider::new(
                PodIdentityCredentialProvider::new().with_retry(retry),
                cache.clone(),
            ))
            .push(CachedCredentialProvider::new(
                EcsCredentialProvider::new().with_retry(retry),
                cache.clone(),
            ))
            .push(CachedCredentialProvider::new(
                IMDSv2CredentialProvider::new().with_retry(retry),
                cache,
            ));

        Self { chain }
    }

    /// Create with a custom credential chain.
    pub fn with_chain(chain: ProvideCredentialChain<Credential>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl ProvideCredential for DefaultCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        self.chain.provide_credential(ctx).await
    }
}
