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

use super::{encode_key, send_with_retry, Backend};
use crate::config::{LogStoreConfig, ObjectLock, ServerSideEncryption};
use crate::{BackendType, DeliveryError, LogPayload, StorageTarget};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::TimeDelta;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::request::Parts;
use http::{HeaderValue, Method};
use log::debug;
use logship_aws_v4::constants::{
    X_AMZ_OBJECT_LOCK_MODE, X_AMZ_OBJECT_LOCK_RETAIN_UNTIL_DATE, X_AMZ_SERVER_SIDE_ENCRYPTION,
    X_AMZ_SERVER_SIDE_ENCRYPTION_AWS_KMS_KEY_ID,
};
use logship_aws_v4::{Credential, CredentialResolver, RequestSigner, ResolveRequest};
use logship_core::hash::base64_encode;
use logship_core::time::{format_rfc3339, now};
use logship_core::{Context, Error, Result};
use md5::{Digest, Md5};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_REGION: &str = "us-east-1";

/// Where an S3 compatible store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum S3Endpoint {
    /// `https://{bucket}.s3.{region}.amazonaws.com`
    Aws,
    /// `https://storage.googleapis.com/{bucket}` with HMAC keys.
    Gcs,
    /// `https://s3.{region}.wasabisys.com/{bucket}`
    Wasabi,
    /// `{endpoint}/{bucket}`, path style.
    Custom(String),
}

impl S3Endpoint {
    fn url(&self, bucket: &str, region: &str, key: &str) -> String {
        let key = encode_key(key);
        match self {
            S3Endpoint::Aws => format!("https://{bucket}.s3.{region}.amazonaws.com/{key}"),
            S3Endpoint::Gcs => format!("https://storage.googleapis.com/{bucket}/{key}"),
            S3Endpoint::Wasabi => format!("https://s3.{region}.wasabisys.com/{bucket}/{key}"),
            S3Endpoint::Custom(endpoint) => {
                format!("{}/{bucket}/{key}", endpoint.trim_end_matches('/'))
            }
        }
    }
}

#[derive(Debug)]
enum KeySource {
    Static,
    Resolver(Arc<CredentialResolver>),
}

/// S3Backend talks to Amazon S3 and every store speaking its API.
///
/// Requests are signed with SigV4 for service `s3`. Static flavors sign
/// with the configured keys; the assumed role flavor asks a
/// [`CredentialResolver`] for credentials of the configured role.
#[derive(Debug)]
pub struct S3Backend {
    backend_type: BackendType,
    endpoint: S3Endpoint,
    keys: KeySource,
    config: Arc<LogStoreConfig>,
}

impl S3Backend {
    /// Create a backend signing with the configured static keys.
    pub fn new_static(
        backend_type: BackendType,
        endpoint: S3Endpoint,
        config: Arc<LogStoreConfig>,
    ) -> Self {
        Self {
            backend_type,
            endpoint,
            keys: KeySource::Static,
            config,
        }
    }

    /// Create a backend signing with credentials from `resolver`.
    pub fn new_assumed(
        backend_type: BackendType,
        endpoint: S3Endpoint,
        config: Arc<LogStoreConfig>,
        resolver: Arc<CredentialResolver>,
    ) -> Self {
        Self {
            backend_type,
            endpoint,
            keys: KeySource::Resolver(resolver),
            config,
        }
    }

    /// Credentials and signing region for `target`.
    async fn credential(
        &self,
        ctx: &Context,
        target: &StorageTarget,
    ) -> std::result::Result<(Credential, String), DeliveryError> {
        let creds = self.config.credentials_for(target);
        let region = target.region.clone().or_else(|| self.config.region.clone());

        let cred = match &self.keys {
            KeySource::Static => match (creds.access_key_id, creds.secret_access_key) {
                (Some(ak), Some(sk)) => match creds.session_token {
                    Some(token) => Credential::new(ak, sk).with_session_token(token),
                    None => Credential::new(ak, sk),
                },
                _ => {
                    debug!("{}: no static keys configured", self.backend_type);
                    return Err(DeliveryError::ChainExhausted {
                        backend: self.backend_type,
                    });
                }
            },
            KeySource::Resolver(resolver) => {
                let req = ResolveRequest {
                    role_arn: creds.role_arn,
                    external_id: creds.external_id,
                    region: region.clone(),
                    access_key_id: creds.access_key_id,
                    secret_access_key: creds.secret_access_key,
                    session_token: creds.session_token,
                };
                resolver
                    .resolve(ctx, &req)
                    .await
                    .ok_or(DeliveryError::ChainExhausted {
                        backend: self.backend_type,
                    })?
            }
        };

        let region = match self.endpoint {
            S3Endpoint::Gcs => "auto".to_string(),
            _ => region
                .or_else(|| cred.region.clone())
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
        };
        Ok((cred, region))
    }

    fn parts(
        &self,
        method: Method,
        target: &StorageTarget,
        region: &str,
        path: &str,
    ) -> Result<Parts> {
        let url = self
            .endpoint
            .url(&target.bucket, region, &target.object_key(path));
        let (parts, _) = http::Request::builder()
            .method(method)
            .uri(url)
            .body(())?
            .into_parts();
        Ok(parts)
    }

    fn put_parts(
        &self,
        target: &StorageTarget,
        region: &str,
        payload: &LogPayload,
    ) -> Result<Parts> {
        let mut parts = self.parts(Method::PUT, target, region, &payload.file_path)?;
        let headers = &mut parts.headers;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(payload.body.len()));

        match &self.config.server_side_encryption {
            None => {}
            Some(ServerSideEncryption::S3Managed) => {
                headers.insert(
                    X_AMZ_SERVER_SIDE_ENCRYPTION,
                    HeaderValue::from_static("AES256"),
                );
            }
            Some(ServerSideEncryption::Kms { key_id }) => {
                headers.insert(
                    X_AMZ_SERVER_SIDE_ENCRYPTION,
                    HeaderValue::from_static("aws:kms"),
                );
                if let Some(key_id) = key_id {
                    headers.insert(
                        X_AMZ_SERVER_SIDE_ENCRYPTION_AWS_KMS_KEY_ID,
                        key_id.parse()?,
                    );
                }
            }
        }

        if let Some(lock) = &self.config.object_lock {
            apply_object_lock(headers, lock, &payload.body)?;
        }

        Ok(parts)
    }

    fn sign(&self, parts: &mut Parts, body: &[u8], cred: &Credential, region: &str) -> Result<()> {
        RequestSigner::new("s3", region).sign_with_body(parts, body, cred)
    }
}

/// Object lock requires `Content-MD5` on every write that carries a retention.
fn apply_object_lock(headers: &mut http::HeaderMap, lock: &ObjectLock, body: &[u8]) -> Result<()> {
    let retain_until = now()
        .checked_add_signed(TimeDelta::days(i64::from(lock.retention_days)))
        .ok_or_else(|| {
            Error::config_invalid("object lock retention overflows")
                .with_context(format!("retention_days: {}", lock.retention_days))
        })?;

    headers.insert("content-md5", base64_encode(&Md5::digest(body)).parse()?);
    headers.insert(X_AMZ_OBJECT_LOCK_MODE, lock.mode.parse()?);
    headers.insert(
        X_AMZ_OBJECT_LOCK_RETAIN_UNTIL_DATE,
        format_rfc3339(retain_until).parse()?,
    );
    Ok(())
}

#[async_trait]
impl Backend for S3Backend {
    fn backend_type(&self) -> BackendType {
        self.backend_type
    }

    async fn put(
        &self,
        ctx: &Context,
        target: &StorageTarget,
        payload: &LogPayload,
    ) -> std::result::Result<(), DeliveryError> {
        let (cred, region) = self.credential(ctx, target).await?;

        let parts = self
            .put_parts(target, &region, payload)
            .and_then(|mut parts| {
                self.sign(&mut parts, &payload.body, &cred, &region)?;
                Ok(parts)
            })
            .map_err(|source| DeliveryError::Signing {
                backend: self.backend_type,
                source,
            })?;

        send_with_retry(
            ctx,
            &self.config.retry,
            self.backend_type,
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
        let (cred, region) = self.credential(ctx, target).await?;

        let parts = self
            .parts(Method::GET, target, &region, path)
            .and_then(|mut parts| {
                self.sign(&mut parts, &[], &cred, &region)?;
                Ok(parts)
            })
            .map_err(|source| DeliveryError::Signing {
                backend: self.backend_type,
                source,
            })?;

        send_with_retry(ctx, &self.config.retry, self.backend_type, parts, Bytes::new()).await
    }

    async fn presign_get(
        &self,
        ctx: &Context,
        target: &StorageTarget,
        path: &str,
        expires_in: Duration,
    ) -> std::result::Result<String, DeliveryError> {
        let (cred, region) = self.credential(ctx, target).await?;

        let parts = self
            .parts(Method::GET, target, &region, path)
            .and_then(|mut parts| {
                RequestSigner::new("s3", &region).sign_at(
                    &mut parts,
                    &cred,
                    Some(expires_in),
                    now(),
                )?;
                Ok(parts)
            })
            .map_err(|source| DeliveryError::Signing {
                backend: self.backend_type,
                source,
            })?;

        Ok(parts.uri.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(S3Endpoint::Aws, "https://logs.s3.eu-west-1.amazonaws.com/30/org-1/log-1.json")]
    #[test_case(S3Endpoint::Gcs, "https://storage.googleapis.com/logs/30/org-1/log-1.json")]
    #[test_case(S3Endpoint::Wasabi, "https://s3.eu-west-1.wasabisys.com/logs/30/org-1/log-1.json")]
    #[test_case(S3Endpoint::Custom("https://grid.example.com:8082/".to_string()), "https://grid.example.com:8082/logs/30/org-1/log-1.json")]
    fn test_endpoint_url(endpoint: S3Endpoint, expected: &str) {
        assert_eq!(endpoint.url("logs", "eu-west-1", "30/org-1/log-1.json"), expected);
    }

    #[test]
    fn test_object_lock_headers() {
        let mut headers = http::HeaderMap::new();
        let lock = ObjectLock {
            mode: "GOVERNANCE".to_string(),
            retention_days: 30,
        };
        apply_object_lock(&mut headers, &lock, b"hello").unwrap();

        // base64(md5("hello"))
        assert_eq!(headers["content-md5"], "XUFAKrxLKna5cZ2REBfFkg==");
        assert_eq!(headers["x-amz-object-lock-mode"], "GOVERNANCE");

        let retain_until = headers["x-amz-object-lock-retain-until-date"]
            .to_str()
            .unwrap();
        let retain_until = logship_core::time::parse_rfc3339(retain_until).unwrap();
        let days = (retain_until - now()).num_days();
        assert!((29..=30).contains(&days), "{days}");
    }
}
