use crate::constants::CREDENTIAL_CACHE_TTL;
use crate::Credential;
use async_trait::async_trait;
use log::debug;
use logship_core::{Context, CredentialCache, ProvideCredential, Result, SigningCredential};
use std::fmt::{self, Debug};
use std::sync::Arc;
use std::time::Duration;

/// A credential source whose output can be cached under a stable key.
pub trait CacheKey {
    /// Key identifying the inputs of this source.
    ///
    /// Returns `None` when the source's precondition is absent, in which case
    /// the cache is bypassed and the source decides how to skip.
    fn cache_key(&self, ctx: &Context) -> Option<String>;
}

/// CachedCredentialProvider stores the output of a network credential source
/// for a fixed ttl.
///
/// Entries that are no longer valid for signing are treated as misses even
/// when the cache still holds them.
pub struct CachedCredentialProvider<P> {
    inner: P,
    cache: Arc<dyn CredentialCache<Credential>>,
    ttl: Duration,
}

impl<P> CachedCredentialProvider<P> {
    /// Wrap `inner` with `cache`.
    pub fn new(inner: P, cache: Arc<dyn CredentialCache<Credential>>) -> Self {
        Self {
            inner,
            cache,
            ttl: CREDENTIAL_CACHE_TTL,
        }
    }

    /// Override the ttl of new entries.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

impl<P: Debug> Debug for CachedCredentialProvider<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedCredentialProvider")
            .field("inner", &self.inner)
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[async_trait]
impl<P> ProvideCredential for CachedCredentialProvider<P>
where
    P: ProvideCredential<Credential = Credential> + CacheKey,
{
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let Some(key) = self.inner.cache_key(ctx) else {
            return self.inner.provide_credential(ctx).await;
        };

        if let Some(cred) = self.cache.get(&key).await {
            if cred.is_valid() {
                debug!("credential cache hit: {key}");
                return Ok(Some(cred));
            }
        }

        let cred = self.inner.provide_credential(ctx).await?;
        if let Some(cred) = &cred {
            self.cache.set(&key, cred.clone(), self.ttl).await;
        }
        Ok(cred)
    }
}
