// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use logship_core::time::{now, DateTime};
use logship_core::utils::Redact;
use logship_core::SigningCredential;
use std::fmt::{self, Debug, Display, Formatter};

/// Where a credential was resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialSource {
    /// Keys handed in by the caller.
    Explicit,
    /// `AWS_ACCESS_KEY_ID` and friends.
    Environment,
    /// `AWS_ASSUME_ROLE_ACCESS_KEY_ID` and friends.
    AssumeRoleEnvironment,
    /// Shared credentials file, `~/.aws/credentials` by default.
    SharedCredentialsFile,
    /// Config file, `~/.aws/config` by default.
    ConfigFile,
    /// `AssumeRoleWithWebIdentity`, which covers IRSA.
    WebIdentity,
    /// EKS Pod Identity agent.
    PodIdentity,
    /// ECS task role endpoint.
    Ecs,
    /// EC2 instance metadata service.
    Imds,
    /// STS `AssumeRole`.
    AssumeRole,
}

impl Display for CredentialSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            CredentialSource::Explicit => "explicit",
            CredentialSource::Environment => "environment",
            CredentialSource::AssumeRoleEnvironment => "assume_role_environment",
            CredentialSource::SharedCredentialsFile => "shared_credentials_file",
            CredentialSource::ConfigFile => "config_file",
            CredentialSource::WebIdentity => "web_identity",
            CredentialSource::PodIdentity => "pod_identity",
            CredentialSource::Ecs => "ecs",
            CredentialSource::Imds => "imds",
            CredentialSource::AssumeRole => "assume_role",
        };
        f.write_str(s)
    }
}

/// Credential that holds the access_key and secret_key.
///
/// A credential is never mutated once it has been cached; adjustments such as
/// filling in the region produce a new value.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Access key id for aws services.
    pub access_key_id: String,
    /// Secret access key for aws services.
    pub secret_access_key: String,
    /// Session token for aws services.
    pub session_token: Option<String>,
    /// Expiration time for this credential.
    pub expires_in: Option<DateTime>,
    /// Region the credential was resolved for.
    pub region: Option<String>,
    /// Role this credential acts as, if known.
    pub role_arn: Option<String>,
    /// Source that produced this credential.
    pub source: Option<CredentialSource>,
}

impl Credential {
    /// Create a long lived credential from a key pair.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            ..Default::default()
        }
    }

    /// Set the session token.
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Set the region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set the role arn.
    pub fn with_role_arn(mut self, role_arn: impl Into<String>) -> Self {
        self.role_arn = Some(role_arn.into());
        self
    }

    /// Set the source.
    pub fn with_source(mut self, source: CredentialSource) -> Self {
        self.source = Some(source);
        self
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("session_token", &Redact::from(&self.session_token))
            .field("expires_in", &self.expires_in)
            .field("region", &self.region)
            .field("role_arn", &self.role_arn)
            .field("source", &self.source)
            .finish()
    }
}

impl SigningCredential for Credential {
    fn is_valid(&self) -> bool {
        if self.access_key_id.is_empty() || self.secret_access_key.is_empty() {
            return false;
        }
        // Take 120s as buffer to avoid edge cases.
        if let Some(valid) = self
            .expires_in
            .map(|v| v > now() + chrono::TimeDelta::minutes(2))
        {
            return valid;
        }

        true
    }
}
