use bytes::Bytes;
use logship_core::utils::Redact;
use logship_core::Error;
use std::fmt::{self, Debug, Display};
use std::str::FromStr;

/// Storage backends a log can be delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendType {
    /// Amazon S3 with static keys.
    S3,
    /// Amazon S3 through an assumed role.
    S3Assume,
    /// Google Cloud Storage through its S3 interoperability API.
    Gcs,
    /// Google Cloud Storage with a workload identity bearer token.
    GcsAssume,
    /// Azure Blob Storage.
    Azure,
    /// Wasabi.
    Wasabi,
    /// NetApp StorageGRID.
    NetApp,
    /// Any other S3 compatible endpoint.
    CustomS3,
    /// The gateway control plane.
    ControlPlane,
    /// A document database.
    DocumentStore,
}

impl BackendType {
    /// Every backend, in registration order.
    pub const ALL: [BackendType; 10] = [
        BackendType::S3,
        BackendType::S3Assume,
        BackendType::Gcs,
        BackendType::GcsAssume,
        BackendType::Azure,
        BackendType::Wasabi,
        BackendType::NetApp,
        BackendType::CustomS3,
        BackendType::ControlPlane,
        BackendType::DocumentStore,
    ];

    /// The name used in configuration and log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendType::S3 => "s3",
            BackendType::S3Assume => "s3_assume",
            BackendType::Gcs => "gcs",
            BackendType::GcsAssume => "gcs_assume",
            BackendType::Azure => "azure",
            BackendType::Wasabi => "wasabi",
            BackendType::NetApp => "netapp",
            BackendType::CustomS3 => "custom_s3",
            BackendType::ControlPlane => "control_plane",
            BackendType::DocumentStore => "document_store",
        }
    }
}

impl Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        BackendType::ALL
            .into_iter()
            .find(|v| v.as_str() == normalized)
            .ok_or_else(|| {
                Error::config_invalid(format!("unknown log store: {s}"))
                    .with_context("hint: expected one of s3, s3_assume, gcs, gcs_assume, azure, wasabi, netapp, custom_s3, control_plane, document_store")
            })
    }
}

/// Keys or role that replace the configured ones for a single target.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialsOverride {
    /// Access key id.
    pub access_key_id: Option<String>,
    /// Secret access key.
    pub secret_access_key: Option<String>,
    /// Session token of temporary keys.
    pub session_token: Option<String>,
    /// Role to assume.
    pub role_arn: Option<String>,
    /// External id for `role_arn`.
    pub external_id: Option<String>,
}

impl Debug for CredentialsOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsOverride")
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("session_token", &Redact::from(&self.session_token))
            .field("role_arn", &self.role_arn)
            .field("external_id", &self.external_id)
            .finish()
    }
}

/// Where a single write goes. Resolved once per write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageTarget {
    /// Backend handling the write.
    pub backend_type: BackendType,
    /// Bucket, or container for Azure.
    pub bucket: String,
    /// Region of the bucket.
    pub region: Option<String>,
    /// Prefix prepended to every object key.
    pub base_path: Option<String>,
    /// Per target credentials.
    pub credentials_override: Option<CredentialsOverride>,
}

impl StorageTarget {
    /// Create a target for `bucket` on `backend_type`.
    pub fn new(backend_type: BackendType, bucket: impl Into<String>) -> Self {
        Self {
            backend_type,
            bucket: bucket.into(),
            region: None,
            base_path: None,
            credentials_override: None,
        }
    }

    /// Set the region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set the base path.
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    /// Set per target credentials.
    pub fn with_credentials(mut self, credentials: CredentialsOverride) -> Self {
        self.credentials_override = Some(credentials);
        self
    }

    /// Full object key of `path` under this target.
    pub fn object_key(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        match self.base_path.as_deref().map(|v| v.trim_matches('/')) {
            Some(base) if !base.is_empty() => format!("{base}/{path}"),
            _ => path.to_string(),
        }
    }
}

/// An opaque log record and where it should be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPayload {
    /// Object key relative to the target base path.
    pub file_path: String,
    /// Serialized record.
    pub body: Bytes,
}

impl LogPayload {
    /// Create a payload.
    pub fn new(file_path: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            file_path: file_path.into(),
            body: body.into(),
        }
    }
}
