use crate::constants::*;
use crate::Credential;
use async_trait::async_trait;
use logship_core::{Context, ProvideCredential, Result};

/// EnvCredentialProvider loads a shared key from `AZURE_STORAGE_ACCOUNT_NAME`
/// and `AZURE_STORAGE_ACCOUNT_KEY`.
#[derive(Clone, Debug, Default)]
pub struct EnvCredentialProvider;

impl EnvCredentialProvider {
    /// Create a new env provider.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProvideCredential for EnvCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let account_name = ctx.env_var_non_empty(AZURE_STORAGE_ACCOUNT_NAME);
        let account_key = ctx.env_var_non_empty(AZURE_STORAGE_ACCOUNT_KEY);

        match (account_name, account_key) {
            (Some(name), Some(key)) => Ok(Some(Credential::with_shared_key(&name, &key))),
            _ => {
                log::debug!("azure storage account key not set in env, skipping");
                Ok(None)
            }
        }
    }
}
