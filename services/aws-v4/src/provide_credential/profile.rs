use crate::credential::CredentialSource;
use crate::{Config, Credential};
use async_trait::async_trait;
use ini::Ini;
use log::debug;
use logship_core::{Context, Error, ProvideCredential, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProfileFile {
    SharedCredentials,
    Config,
}

/// ProfileCredentialProvider loads static keys from one of the AWS profile files.
///
/// - `shared_credentials()` reads `AWS_SHARED_CREDENTIALS_FILE` (default
///   `~/.aws/credentials`) and looks up section `[{profile}]`.
/// - `config()` reads `AWS_CONFIG_FILE` (default `~/.aws/config`) and looks up
///   `[default]` or `[profile {profile}]`.
///
/// The profile is `AWS_PROFILE`, falling back to `default`. A `role_arn` and
/// `region` found next to the keys are recorded on the credential.
#[derive(Debug, Clone)]
pub struct ProfileCredentialProvider {
    file: ProfileFile,
    profile: Option<String>,
    path: Option<String>,
}

impl ProfileCredentialProvider {
    /// Read the shared credentials file.
    pub fn shared_credentials() -> Self {
        Self {
            file: ProfileFile::SharedCredentials,
            profile: None,
            path: None,
        }
    }

    /// Read the config file.
    pub fn config() -> Self {
        Self {
            file: ProfileFile::Config,
            profile: None,
            path: None,
        }
    }

    /// Use this profile instead of `AWS_PROFILE`.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Read this file instead of the env configured one.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

#[async_trait]
impl ProvideCredential for ProfileCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let config = Config::from_env(ctx);
        let profile = self.profile.as_deref().unwrap_or(&config.profile);
        let path = match (&self.path, self.file) {
            (Some(path), _) => path.as_str(),
            (None, ProfileFile::SharedCredentials) => config.shared_credentials_file.as_str(),
            (None, ProfileFile::Config) => config.config_file.as_str(),
        };

        let Some(expanded_path) = ctx.expand_home_dir(path) else {
            debug!("failed to expand homedir for path: {path}");
            return Ok(None);
        };

        let content = match ctx.file_read_as_string(&expanded_path).await {
            Ok(content) => content,
            Err(err) => {
                debug!(
                    "failed to read profile file {expanded_path}: {}",
                    err.display_with_context()
                );
                return Ok(None);
            }
        };

        let conf = Ini::load_from_str(&content).map_err(|e| {
            Error::config_invalid("failed to parse profile file")
                .with_source(e)
                .with_context(format!("file: {expanded_path}"))
        })?;

        let section = match (self.file, profile) {
            (ProfileFile::Config, p) if p != "default" => format!("profile {p}"),
            (_, p) => p.to_string(),
        };

        let Some(props) = conf.section(Some(section.as_str())) else {
            debug!("section [{section}] not found in {expanded_path}");
            return Ok(None);
        };

        match (
            props.get("aws_access_key_id"),
            props.get("aws_secret_access_key"),
        ) {
            (Some(ak), Some(sk)) => Ok(Some(Credential {
                access_key_id: ak.to_string(),
                secret_access_key: sk.to_string(),
                session_token: props.get("aws_session_token").map(|s| s.to_string()),
                region: props.get("region").map(|s| s.to_string()),
                role_arn: props.get("role_arn").map(|s| s.to_string()),
                source: Some(match self.file {
                    ProfileFile::SharedCredentials => CredentialSource::SharedCredentialsFile,
                    ProfileFile::Config => CredentialSource::ConfigFile,
                }),
                ..Default::default()
            })),
            _ => {
                debug!("section [{section}] in {expanded_path} carries no key pair");
                Ok(None)
            }
        }
    }
}
