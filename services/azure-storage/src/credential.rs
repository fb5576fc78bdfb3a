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
use std::fmt::{Debug, Formatter};

/// Credential for Azure Blob Storage.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Storage account shared key.
    SharedKey {
        /// Azure storage account name.
        account_name: String,
        /// Base64 encoded account key.
        account_key: String,
    },
    /// Entra ID or managed identity access token.
    BearerToken {
        /// Access token.
        token: String,
        /// Expiration time for this credential.
        expires_in: Option<DateTime>,
    },
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::SharedKey {
                account_name,
                account_key,
            } => f
                .debug_struct("Credential::SharedKey")
                .field("account_name", account_name)
                .field("account_key", &Redact::from(account_key))
                .finish(),
            Credential::BearerToken { token, expires_in } => f
                .debug_struct("Credential::BearerToken")
                .field("token", &Redact::from(token))
                .field("expires_in", expires_in)
                .finish(),
        }
    }
}

impl SigningCredential for Credential {
    fn is_valid(&self) -> bool {
        match self {
            Credential::SharedKey {
                account_name,
                account_key,
            } => !account_name.is_empty() && !account_key.is_empty(),
            Credential::BearerToken { token, expires_in } => {
                if token.is_empty() {
                    return false;
                }
                // Take 20s as buffer to avoid edge cases.
                match expires_in {
                    Some(expires) => *expires > now() + chrono::TimeDelta::seconds(20),
                    None => true,
                }
            }
        }
    }
}

impl Credential {
    /// Create a shared key credential.
    pub fn with_shared_key(account_name: &str, account_key: &str) -> Self {
        Self::SharedKey {
            account_name: account_name.to_string(),
            account_key: account_key.to_string(),
        }
    }

    /// Create a bearer token credential.
    pub fn with_bearer_token(token: &str, expires_in: Option<DateTime>) -> Self {
        Self::BearerToken {
            token: token.to_string(),
            expires_in,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn test_bearer_token_expiry() {
        assert!(Credential::with_bearer_token("t", None).is_valid());
        assert!(Credential::with_bearer_token("t", Some(now() + TimeDelta::minutes(5))).is_valid());
        let expiring = Credential::with_bearer_token("t", Some(now() + TimeDelta::seconds(10)));
        assert!(!expiring.is_valid());
        assert!(!Credential::with_bearer_token("", None).is_valid());
    }

    #[test]
    fn test_debug_redacts_key() {
        let cred = Credential::with_shared_key("logs", "c2VjcmV0LWFjY291bnQta2V5");
        let output = format!("{cred:?}");
        assert!(output.contains("logs"));
        assert!(!output.contains("c2VjcmV0LWFjY291bnQta2V5"));
    }
}
