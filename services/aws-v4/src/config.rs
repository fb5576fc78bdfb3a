use crate::constants::*;
use logship_core::Context;

/// Config carries the AWS settings read from the environment.
///
/// Every field is optional: a credential source whose inputs are absent is
/// skipped rather than failed.
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// `AWS_REGION`, falling back to `AWS_DEFAULT_REGION`.
    pub region: Option<String>,
    /// `AWS_ASSUME_ROLE_REGION`, takes precedence over `region`.
    pub assume_role_region: Option<String>,

    /// `AWS_ASSUME_ROLE_ACCESS_KEY_ID`
    pub assume_role_access_key_id: Option<String>,
    /// `AWS_ASSUME_ROLE_SECRET_ACCESS_KEY`
    pub assume_role_secret_access_key: Option<String>,
    /// `AWS_ASSUME_ROLE_SOURCE_ARN`, the first hop of a role chain.
    pub source_role_arn: Option<String>,
    /// `AWS_ASSUME_ROLE_SOURCE_EXTERNAL_ID`
    pub source_external_id: Option<String>,

    /// `AWS_ROLE_SESSION_NAME`, `logship` when unset.
    pub role_session_name: String,
    /// `AWS_STS_REGIONAL_ENDPOINTS=regional`
    pub use_regional_sts_endpoint: bool,

    /// `AWS_PROFILE`, `default` when unset.
    pub profile: String,
    /// `AWS_CONFIG_FILE`, `~/.aws/config` when unset.
    pub config_file: String,
    /// `AWS_SHARED_CREDENTIALS_FILE`, `~/.aws/credentials` when unset.
    pub shared_credentials_file: String,

    /// `AWS_EC2_METADATA_DISABLED=true`
    pub ec2_metadata_disabled: bool,
    /// `AWS_EC2_METADATA_SERVICE_ENDPOINT`
    pub ec2_metadata_endpoint: Option<String>,
}

impl Config {
    /// Load config from the context environment.
    pub fn from_env(ctx: &Context) -> Self {
        Self {
            region: ctx
                .env_var_non_empty(AWS_REGION)
                .or_else(|| ctx.env_var_non_empty(AWS_DEFAULT_REGION)),
            assume_role_region: ctx.env_var_non_empty(AWS_ASSUME_ROLE_REGION),

            assume_role_access_key_id: ctx.env_var_non_empty(AWS_ASSUME_ROLE_ACCESS_KEY_ID),
            assume_role_secret_access_key: ctx.env_var_non_empty(AWS_ASSUME_ROLE_SECRET_ACCESS_KEY),
            source_role_arn: ctx.env_var_non_empty(AWS_ASSUME_ROLE_SOURCE_ARN),
            source_external_id: ctx.env_var_non_empty(AWS_ASSUME_ROLE_SOURCE_EXTERNAL_ID),

            role_session_name: ctx
                .env_var_non_empty(AWS_ROLE_SESSION_NAME)
                .unwrap_or_else(|| DEFAULT_ROLE_SESSION_NAME.to_string()),
            use_regional_sts_endpoint: ctx
                .env_var(AWS_STS_REGIONAL_ENDPOINTS)
                .is_some_and(|v| v == "regional"),

            profile: ctx
                .env_var_non_empty(AWS_PROFILE)
                .unwrap_or_else(|| "default".to_string()),
            config_file: ctx
                .env_var_non_empty(AWS_CONFIG_FILE)
                .unwrap_or_else(|| "~/.aws/config".to_string()),
            shared_credentials_file: ctx
                .env_var_non_empty(AWS_SHARED_CREDENTIALS_FILE)
                .unwrap_or_else(|| "~/.aws/credentials".to_string()),

            ec2_metadata_disabled: ctx
                .env_var(AWS_EC2_METADATA_DISABLED)
                .is_some_and(|v| v.eq_ignore_ascii_case("true")),
            ec2_metadata_endpoint: ctx.env_var_non_empty(AWS_EC2_METADATA_SERVICE_ENDPOINT),
        }
    }

    /// Resolve the region for a call.
    ///
    /// Order: `explicit`, `AWS_ASSUME_ROLE_REGION`, `AWS_REGION` /
    /// `AWS_DEFAULT_REGION`, then `us-east-1`.
    pub fn resolve_region(&self, explicit: Option<&str>) -> String {
        explicit
            .filter(|v| !v.is_empty())
            .or(self.assume_role_region.as_deref())
            .or(self.region.as_deref())
            .unwrap_or(DEFAULT_REGION)
            .to_string()
    }

    /// Key pair declared through `AWS_ASSUME_ROLE_ACCESS_KEY_ID` and
    /// `AWS_ASSUME_ROLE_SECRET_ACCESS_KEY`, only when both are set.
    pub fn assume_role_keys(&self) -> Option<(&str, &str)> {
        match (
            &self.assume_role_access_key_id,
            &self.assume_role_secret_access_key,
        ) {
            (Some(ak), Some(sk)) => Some((ak, sk)),
            _ => None,
        }
    }
}
