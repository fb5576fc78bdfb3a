use crate::constants::GOOGLE_OAUTH_ACCESS_TOKEN;
use crate::Token;
use async_trait::async_trait;
use logship_core::{Context, ProvideCredential, Result};

/// EnvCredentialProvider reads an access token from `GOOGLE_OAUTH_ACCESS_TOKEN`.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentialProvider;

impl EnvCredentialProvider {
    /// Create a new env provider.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProvideCredential for EnvCredentialProvider {
    type Credential = Token;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        Ok(ctx
            .env_var_non_empty(GOOGLE_OAUTH_ACCESS_TOKEN)
            .map(|token| Token::new(token, None)))
    }
}
