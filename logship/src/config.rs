use crate::path::PathFormat;
use crate::{BackendType, CredentialsOverride, StorageTarget};
use logship_core::utils::Redact;
use logship_core::{Context, Result, RetryPolicy};
use std::fmt::{self, Debug};
use std::time::Duration;

// Env values read by the log store.
pub const LOG_STORE: &str = "LOG_STORE";
pub const LOG_STORE_BUCKET: &str = "LOG_STORE_BUCKET";
pub const LOG_STORE_REGION: &str = "LOG_STORE_REGION";
pub const LOG_STORE_BASE_PATH: &str = "LOG_STORE_BASE_PATH";
pub const LOG_STORE_ENDPOINT: &str = "LOG_STORE_ENDPOINT";
pub const LOG_STORE_ACCESS_KEY_ID: &str = "LOG_STORE_ACCESS_KEY_ID";
pub const LOG_STORE_SECRET_ACCESS_KEY: &str = "LOG_STORE_SECRET_ACCESS_KEY";
pub const LOG_STORE_SESSION_TOKEN: &str = "LOG_STORE_SESSION_TOKEN";
pub const LOG_STORE_ROLE_ARN: &str = "LOG_STORE_ROLE_ARN";
pub const LOG_STORE_EXTERNAL_ID: &str = "LOG_STORE_EXTERNAL_ID";
pub const LOG_STORE_USE_LOCAL_CACHE: &str = "LOG_STORE_USE_LOCAL_CACHE";
pub const LOG_STORE_SSE: &str = "LOG_STORE_SSE";
pub const LOG_STORE_SSE_KMS_KEY_ID: &str = "LOG_STORE_SSE_KMS_KEY_ID";
pub const LOG_STORE_OBJECT_LOCK_ENABLED: &str = "LOG_STORE_OBJECT_LOCK_ENABLED";
pub const LOG_STORE_OBJECT_LOCK_MODE: &str = "LOG_STORE_OBJECT_LOCK_MODE";
pub const LOG_STORE_OBJECT_LOCK_RETENTION_DAYS: &str = "LOG_STORE_OBJECT_LOCK_RETENTION_DAYS";
pub const LOG_STORE_AZURE_ACCOUNT_NAME: &str = "LOG_STORE_AZURE_ACCOUNT_NAME";
pub const LOG_STORE_AZURE_ACCOUNT_KEY: &str = "LOG_STORE_AZURE_ACCOUNT_KEY";
pub const LOG_STORE_AZURE_AUTH_MODE: &str = "LOG_STORE_AZURE_AUTH_MODE";
pub const LOG_STORE_GCS_SERVICE_ACCOUNT: &str = "LOG_STORE_GCS_SERVICE_ACCOUNT";
pub const LOG_STORE_PATH_FORMAT: &str = "LOG_STORE_PATH_FORMAT";
pub const LOG_STORE_MAX_RETRIES: &str = "LOG_STORE_MAX_RETRIES";
pub const LOG_STORE_RETRY_BASE_DELAY_MS: &str = "LOG_STORE_RETRY_BASE_DELAY_MS";

/// Server side encryption applied to S3 writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerSideEncryption {
    /// `AES256`
    S3Managed,
    /// `aws:kms` with an optional key id.
    Kms {
        /// KMS key id, the bucket default key when absent.
        key_id: Option<String>,
    },
}

/// S3 object lock retention applied to every write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLock {
    /// `GOVERNANCE` or `COMPLIANCE`.
    pub mode: String,
    /// Days the object is retained after the write.
    pub retention_days: u32,
}

/// How Azure requests are authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AzureAuthMode {
    /// Entra ID client secret, then shared key, then managed identity.
    #[default]
    Auto,
    /// Account shared key only.
    SharedKey,
    /// Entra ID client secret only.
    Entra,
    /// Managed identity only.
    ManagedIdentity,
}

/// LogStoreConfig carries the settings of the log store.
#[derive(Clone)]
pub struct LogStoreConfig {
    /// `LOG_STORE`, `s3` when unset.
    pub backend_type: BackendType,
    /// `LOG_STORE_BUCKET`, the bucket or container.
    pub bucket: String,
    /// `LOG_STORE_REGION`
    pub region: Option<String>,
    /// `LOG_STORE_BASE_PATH`
    pub base_path: Option<String>,
    /// `LOG_STORE_ENDPOINT`, required by NetApp and custom S3 stores.
    pub endpoint: Option<String>,

    /// `LOG_STORE_ACCESS_KEY_ID`
    pub access_key_id: Option<String>,
    /// `LOG_STORE_SECRET_ACCESS_KEY`
    pub secret_access_key: Option<String>,
    /// `LOG_STORE_SESSION_TOKEN`, set when the keys are temporary.
    pub session_token: Option<String>,
    /// `LOG_STORE_ROLE_ARN`
    pub role_arn: Option<String>,
    /// `LOG_STORE_EXTERNAL_ID`
    pub external_id: Option<String>,
    /// `LOG_STORE_USE_LOCAL_CACHE`, `true` unless set to `false`.
    pub use_local_cache: bool,

    /// `LOG_STORE_SSE` and `LOG_STORE_SSE_KMS_KEY_ID`
    pub server_side_encryption: Option<ServerSideEncryption>,
    /// `LOG_STORE_OBJECT_LOCK_*`
    pub object_lock: Option<ObjectLock>,

    /// `LOG_STORE_AZURE_ACCOUNT_NAME`
    pub azure_account_name: Option<String>,
    /// `LOG_STORE_AZURE_ACCOUNT_KEY`
    pub azure_account_key: Option<String>,
    /// `LOG_STORE_AZURE_AUTH_MODE`
    pub azure_auth_mode: AzureAuthMode,

    /// `LOG_STORE_GCS_SERVICE_ACCOUNT`, impersonated by `gcs_assume`.
    pub gcs_service_account: Option<String>,

    /// `LOG_STORE_PATH_FORMAT`, `v1` when unset.
    pub path_format: PathFormat,
    /// `LOG_STORE_MAX_RETRIES` and `LOG_STORE_RETRY_BASE_DELAY_MS`
    pub retry: RetryPolicy,
}

impl Default for LogStoreConfig {
    fn default() -> Self {
        Self {
            backend_type: BackendType::S3,
            bucket: String::new(),
            region: None,
            base_path: None,
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            role_arn: None,
            external_id: None,
            use_local_cache: true,
            server_side_encryption: None,
            object_lock: None,
            azure_account_name: None,
            azure_account_key: None,
            azure_auth_mode: AzureAuthMode::default(),
            gcs_service_account: None,
            path_format: PathFormat::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl Debug for LogStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogStoreConfig")
            .field("backend_type", &self.backend_type)
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("base_path", &self.base_path)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("session_token", &Redact::from(&self.session_token))
            .field("role_arn", &self.role_arn)
            .field("external_id", &self.external_id)
            .field("use_local_cache", &self.use_local_cache)
            .field("server_side_encryption", &self.server_side_encryption)
            .field("object_lock", &self.object_lock)
            .field("azure_account_name", &self.azure_account_name)
            .field("azure_account_key", &Redact::from(&self.azure_account_key))
            .field("azure_auth_mode", &self.azure_auth_mode)
            .field("gcs_service_account", &self.gcs_service_account)
            .field("path_format", &self.path_format)
            .field("retry", &self.retry)
            .finish()
    }
}

impl LogStoreConfig {
    /// Load config from the context environment.
    ///
    /// Unknown store names, path formats and auth modes are rejected.
    pub fn from_env(ctx: &Context) -> Result<Self> {
        let var = |key: &str| ctx.env_var_non_empty(key);
        let flag = |key: &str| var(key).is_some_and(|v| v.eq_ignore_ascii_case("true"));

        let backend_type = match var(LOG_STORE) {
            Some(v) => v.parse()?,
            None => BackendType::S3,
        };

        let server_side_encryption = match var(LOG_STORE_SSE).as_deref() {
            None => None,
            Some("AES256") => Some(ServerSideEncryption::S3Managed),
            Some("aws:kms") => Some(ServerSideEncryption::Kms {
                key_id: var(LOG_STORE_SSE_KMS_KEY_ID),
            }),
            Some(other) => {
                return Err(logship_core::Error::config_invalid(format!(
                    "unknown server side encryption: {other}"
                ))
                .with_context("hint: expected AES256 or aws:kms"))
            }
        };

        let object_lock = if flag(LOG_STORE_OBJECT_LOCK_ENABLED) {
            Some(ObjectLock {
                mode: var(LOG_STORE_OBJECT_LOCK_MODE)
                    .map(|v| v.to_ascii_uppercase())
                    .unwrap_or_else(|| "GOVERNANCE".to_string()),
                retention_days: parse_number(ctx, LOG_STORE_OBJECT_LOCK_RETENTION_DAYS, 30)?,
            })
        } else {
            None
        };

        let azure_auth_mode = match var(LOG_STORE_AZURE_AUTH_MODE).as_deref() {
            None | Some("auto") => AzureAuthMode::Auto,
            Some("shared_key") => AzureAuthMode::SharedKey,
            Some("entra") => AzureAuthMode::Entra,
            Some("managed_identity") => AzureAuthMode::ManagedIdentity,
            Some(other) => {
                return Err(logship_core::Error::config_invalid(format!(
                    "unknown azure auth mode: {other}"
                ))
                .with_context("hint: expected auto, shared_key, entra or managed_identity"))
            }
        };

        let path_format = match var(LOG_STORE_PATH_FORMAT) {
            Some(v) => v.parse()?,
            None => PathFormat::default(),
        };

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy::new(
            parse_number(ctx, LOG_STORE_MAX_RETRIES, defaults.max_retries())?,
            Duration::from_millis(parse_number(
                ctx,
                LOG_STORE_RETRY_BASE_DELAY_MS,
                defaults.base_delay().as_millis() as u64,
            )?),
        );

        Ok(Self {
            backend_type,
            bucket: var(LOG_STORE_BUCKET).unwrap_or_default(),
            region: var(LOG_STORE_REGION),
            base_path: var(LOG_STORE_BASE_PATH),
            endpoint: var(LOG_STORE_ENDPOINT),
            access_key_id: var(LOG_STORE_ACCESS_KEY_ID),
            secret_access_key: var(LOG_STORE_SECRET_ACCESS_KEY),
            session_token: var(LOG_STORE_SESSION_TOKEN),
            role_arn: var(LOG_STORE_ROLE_ARN),
            external_id: var(LOG_STORE_EXTERNAL_ID),
            use_local_cache: var(LOG_STORE_USE_LOCAL_CACHE)
                .map_or(true, |v| !v.eq_ignore_ascii_case("false")),
            server_side_encryption,
            object_lock,
            azure_account_name: var(LOG_STORE_AZURE_ACCOUNT_NAME),
            azure_account_key: var(LOG_STORE_AZURE_ACCOUNT_KEY),
            azure_auth_mode,
            gcs_service_account: var(LOG_STORE_GCS_SERVICE_ACCOUNT),
            path_format,
            retry,
        })
    }

    /// The target every write goes to unless the caller picks another one.
    pub fn target(&self) -> StorageTarget {
        StorageTarget {
            backend_type: self.backend_type,
            bucket: self.bucket.clone(),
            region: self.region.clone(),
            base_path: self.base_path.clone(),
            credentials_override: None,
        }
    }

    /// Keys and role to use for `target`, its override winning field by field.
    ///
    /// The session token belongs to the key pair: an override that brings its
    /// own access key id never inherits the configured token.
    pub(crate) fn credentials_for(&self, target: &StorageTarget) -> CredentialsOverride {
        let over = target.credentials_override.clone().unwrap_or_default();
        let session_token = match &over.access_key_id {
            Some(_) => over.session_token,
            None => over.session_token.or_else(|| self.session_token.clone()),
        };
        CredentialsOverride {
            session_token,
            access_key_id: over.access_key_id.or_else(|| self.access_key_id.clone()),
            secret_access_key: over
                .secret_access_key
                .or_else(|| self.secret_access_key.clone()),
            role_arn: over.role_arn.or_else(|| self.role_arn.clone()),
            external_id: over.external_id.or_else(|| self.external_id.clone()),
        }
    }
}

fn parse_number<T: std::str::FromStr>(ctx: &Context, key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match ctx.env_var_non_empty(key) {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|e: T::Err| {
            logship_core::Error::config_invalid(format!("{key} is not a valid number: {e}"))
                .with_context(format!("value: {v}"))
        }),
    }
}
