use super::{encode_key, send_with_retry, Backend};
use crate::config::{AzureAuthMode, LogStoreConfig};
use crate::{BackendType, DeliveryError, LogPayload, StorageTarget};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::request::Parts;
use http::{HeaderValue, Method};
use logship_azure_storage::constants::{AZURE_STORAGE_ACCOUNT_NAME, X_MS_BLOB_TYPE};
use logship_azure_storage::{
    ClientSecretCredentialProvider, Credential, DefaultCredentialProvider,
    EnvCredentialProvider, ImdsCredentialProvider, RequestSigner, StaticCredentialProvider,
};
use logship_core::{Context, Error, ProvideCredentialChain, Result, RetryPolicy, Signer};

/// AzureBackend writes block blobs to Azure Blob Storage.
///
/// In [`AzureAuthMode::Auto`] credentials come from the first source that
/// yields one: an Entra ID client secret, then the account shared key, then
/// the managed identity. The other modes use their single source.
#[derive(Debug)]
pub struct AzureBackend {
    signer: Signer<Credential>,
    account_name: Option<String>,
    endpoint: Option<String>,
    retry: RetryPolicy,
}

impl AzureBackend {
    /// Create a backend from the log store config.
    pub fn new(ctx: Context, config: &LogStoreConfig) -> Self {
        let shared_key = match (&config.azure_account_name, &config.azure_account_key) {
            (Some(name), Some(key)) => Some(StaticCredentialProvider::new_shared_key(name, key)),
            _ => None,
        };

        let chain = match config.azure_auth_mode {
            AzureAuthMode::Auto => {
                let chain =
                    ProvideCredentialChain::new().push(ClientSecretCredentialProvider::new());
                let chain = match shared_key {
                    Some(provider) => chain.push(provider),
                    None => chain.push(EnvCredentialProvider::new()),
                };
                chain.push(ImdsCredentialProvider::new())
            }
            AzureAuthMode::SharedKey => match shared_key {
                Some(provider) => ProvideCredentialChain::new().push(provider),
                None => ProvideCredentialChain::new().push(EnvCredentialProvider::new()),
            },
            AzureAuthMode::Entra => {
                ProvideCredentialChain::new().push(ClientSecretCredentialProvider::new())
            }
            AzureAuthMode::ManagedIdentity => {
                ProvideCredentialChain::new().push(ImdsCredentialProvider::new())
            }
        };

        let account_name = config
            .azure_account_name
            .clone()
            .or_else(|| ctx.env_var_non_empty(AZURE_STORAGE_ACCOUNT_NAME));

        Self {
            signer: Signer::new(
                ctx,
                DefaultCredentialProvider::with_chain(chain),
                RequestSigner::new(),
            ),
            account_name,
            endpoint: config.endpoint.clone(),
            retry: config.retry,
        }
    }

    /// Create a backend with a prepared signer.
    pub fn with_signer(
        signer: Signer<Credential>,
        account_name: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            signer,
            account_name: Some(account_name.into()),
            endpoint: None,
            retry,
        }
    }

    /// Set the blob endpoint, `https://{account}.blob.core.windows.net` by default.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    fn parts(&self, method: Method, target: &StorageTarget, path: &str) -> Result<Parts> {
        let endpoint = match (&self.endpoint, &self.account_name) {
            (Some(endpoint), _) => endpoint.trim_end_matches('/').to_string(),
            (None, Some(account)) => format!("https://{account}.blob.core.windows.net"),
            (None, None) => {
                return Err(Error::config_invalid("azure storage account is not configured")
                    .with_context(format!("hint: set {AZURE_STORAGE_ACCOUNT_NAME}")))
            }
        };
        let url = format!(
            "{endpoint}/{}/{}",
            target.bucket,
            encode_key(&target.object_key(path))
        );

        let (parts, _) = http::Request::builder()
            .method(method)
            .uri(url)
            .body(())?
            .into_parts();
        Ok(parts)
    }

    async fn sign(&self, mut parts: Parts) -> std::result::Result<Parts, DeliveryError> {
        match self.signer.credential().await {
            Ok(Some(_)) => {}
            Ok(None) => {
                return Err(DeliveryError::ChainExhausted {
                    backend: BackendType::Azure,
                })
            }
            Err(err) => return Err(DeliveryError::from_core(BackendType::Azure, err)),
        }

        self.signer
            .sign(&mut parts, None)
            .await
            .map_err(|source| DeliveryError::Signing {
                backend: BackendType::Azure,
                source,
            })?;
        Ok(parts)
    }
}

#[async_trait]
impl Backend for AzureBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Azure
    }

    async fn put(
        &self,
        ctx: &Context,
        target: &StorageTarget,
        payload: &LogPayload,
    ) -> std::result::Result<(), DeliveryError> {
        let mut parts = self
            .parts(Method::PUT, target, &payload.file_path)
            .map_err(|source| DeliveryError::Signing {
                backend: BackendType::Azure,
                source,
            })?;
        let headers = &mut parts.headers;
        headers.insert(X_MS_BLOB_TYPE, HeaderValue::from_static("BlockBlob"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(payload.body.len()));

        let parts = self.sign(parts).await?;
        send_with_retry(
            ctx,
            &self.retry,
            BackendType::Azure,
            parts,
            payload.body.clone(),
        )
        .await
        .map(|_| ())
    }

    async fn get(
        &self,
        ctx: &Context,
        target: &StorageTarget,
        path: &str,
    ) -> std::result::Result<Bytes, DeliveryError> {
        let parts = self
            .parts(Method::GET, target, path)
            .map_err(|source| DeliveryError::Signing {
                backend: BackendType::Azure,
                source,
            })?;

        let parts = self.sign(parts).await?;
        send_with_retry(ctx, &self.retry, BackendType::Azure, parts, Bytes::new()).await
    }
}
