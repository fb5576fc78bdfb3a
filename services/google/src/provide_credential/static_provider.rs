use crate::Token;
use async_trait::async_trait;
use logship_core::{Context, ProvideCredential, Result};

/// StaticCredentialProvider always returns the token it was built with.
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider {
    token: Token,
}

impl StaticCredentialProvider {
    /// Provide `access_token` without expiry.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            token: Token::new(access_token, None),
        }
    }
}

#[async_trait]
impl ProvideCredential for StaticCredentialProvider {
    type Credential = Token;

    async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
        Ok(Some(self.token.clone()))
    }
}
