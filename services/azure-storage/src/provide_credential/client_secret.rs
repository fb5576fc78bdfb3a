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
use crate::Credential;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::TimeDelta;
use logship_core::time::now;
use logship_core::{Context, Error, ProvideCredential, Result};
use serde::Deserialize;

/// ClientSecretCredentialProvider exchanges an Entra ID application secret
/// for a storage access token with the client credentials grant.
///
/// Reads `AZURE_TENANT_ID`, `AZURE_CLIENT_ID` and `AZURE_CLIENT_SECRET`,
/// and `AZURE_AUTHORITY_HOST` when set.
#[derive(Debug, Default, Clone)]
pub struct ClientSecretCredentialProvider {
    tenant_id: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

impl ClientSecretCredentialProvider {
    /// Create a new client secret provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tenant id instead of reading it from env.
    pub fn with_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Set the client id instead of reading it from env.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set the client secret instead of reading it from env.
    pub fn with_client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }
}

#[async_trait]
impl ProvideCredential for ClientSecretCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let pick = |value: &Option<String>, key: &str| {
            value
                .clone()
                .filter(|v| !v.is_empty())
                .or_else(|| ctx.env_var_non_empty(key))
        };
        let (Some(tenant_id), Some(client_id), Some(client_secret)) = (
            pick(&self.tenant_id, AZURE_TENANT_ID),
            pick(&self.client_id, AZURE_CLIENT_ID),
            pick(&self.client_secret, AZURE_CLIENT_SECRET),
        ) else {
            log::debug!("azure client secret not fully configured, skipping");
            return Ok(None);
        };

        let authority_host = ctx
            .env_var_non_empty(AZURE_AUTHORITY_HOST)
            .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string());
        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            authority_host.trim_end_matches('/'),
            tenant_id
        );

        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("scope", STORAGE_SCOPE)
            .append_pair("client_id", &client_id)
            .append_pair("client_secret", &client_secret)
            .append_pair("grant_type", "client_credentials")
            .finish();

        let req = http::Request::post(&url)
            .header(
                http::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(Bytes::from(body))
            .map_err(|e| {
                Error::request_invalid("failed to build client secret token request").with_source(e)
            })?;

        let resp = ctx.http_send(req).await.map_err(|e| {
            Error::unexpected("failed to request token from Entra ID")
                .with_source(e)
                .with_context(format!("tenant_id: {tenant_id}"))
                .set_retryable(true)
        })?;

        let status = resp.status();
        if !status.is_success() {
            let err = if status.is_client_error() {
                Error::credential_denied("Entra ID rejected the client secret")
            } else {
                Error::unexpected("Entra ID token request failed").set_retryable(true)
            };
            return Err(err
                .with_context(format!("status: {status}"))
                .with_context(format!("body: {}", String::from_utf8_lossy(resp.body())))
                .with_context(format!("client_id: {client_id}")));
        }

        let token: TokenResponse = serde_json::from_slice(resp.body()).map_err(|e| {
            Error::unexpected("failed to parse Entra ID token response").with_source(e)
        })?;

        let expires_in = now() + TimeDelta::seconds(token.expires_in);
        Ok(Some(Credential::with_bearer_token(
            &token.access_token,
            Some(expires_in),
        )))
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}
