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

use crate::constants::*;
use crate::Token;
use bytes::Bytes;
use chrono::TimeDelta;
use log::debug;
use logship_core::time::now;
use logship_core::{Context, Error, ProvideCredential, Result};
use serde::Deserialize;

#[derive(Deserialize)]
struct VmMetadataTokenResponse {
    access_token: String,
    expires_in: i64,
}

/// VmMetadataCredentialProvider loads the token of the service account bound
/// to the current GCE instance or GKE workload identity.
///
/// A non 200 answer means the metadata server is absent and yields `None`.
#[derive(Debug, Clone, Default)]
pub struct VmMetadataCredentialProvider {
    scope: Option<String>,
    endpoint: Option<String>,
}

impl VmMetadataCredentialProvider {
    /// Create a new VmMetadataCredentialProvider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the OAuth2 scope.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Set the metadata host.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

#[async_trait::async_trait]
impl ProvideCredential for VmMetadataCredentialProvider {
    type Credential = Token;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let scope = self
            .scope
            .clone()
            .or_else(|| ctx.env_var_non_empty(GOOGLE_SCOPE))
            .unwrap_or_else(|| DEFAULT_SCOPE.to_string());
        let metadata_host = self
            .endpoint
            .clone()
            .or_else(|| ctx.env_var_non_empty(GCE_METADATA_HOST))
            .unwrap_or_else(|| DEFAULT_METADATA_HOST.to_string());

        let url = format!(
            "http://{metadata_host}/computeMetadata/v1/instance/service-accounts/default/token?scopes={scope}"
        );
        debug!("loading token from VM metadata service: {metadata_host}");

        let req = http::Request::get(&url)
            .header("Metadata-Flavor", "Google")
            .body(Bytes::new())
            .map_err(|e| {
                Error::request_invalid("failed to build VM metadata request").with_source(e)
            })?;

        let resp = ctx.http_send(req).await.map_err(|e| {
            Error::unexpected("failed to connect to VM metadata service")
                .with_source(e)
                .with_context(format!("host: {metadata_host}"))
                .set_retryable(true)
        })?;

        if resp.status() != http::StatusCode::OK {
            debug!(
                "VM metadata service returned {}, skipping",
                resp.status()
            );
            return Ok(None);
        }

        let token: VmMetadataTokenResponse = serde_json::from_slice(resp.body()).map_err(|e| {
            Error::unexpected("failed to parse VM metadata response").with_source(e)
        })?;

        Ok(Some(Token::new(
            token.access_token,
            Some(now() + TimeDelta::seconds(token.expires_in)),
        )))
    }
}
