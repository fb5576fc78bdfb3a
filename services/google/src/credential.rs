use logship_core::time::{now, DateTime};
use logship_core::utils::Redact;
use logship_core::SigningCredential;
use std::fmt::{self, Debug};

/// OAuth2 access token for Google Cloud Storage.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Token {
    /// The access token.
    pub access_token: String,
    /// Expiration time of the token.
    pub expires_at: Option<DateTime>,
}

impl Token {
    /// Create a token.
    pub fn new(access_token: impl Into<String>, expires_at: Option<DateTime>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
        }
    }
}

impl Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &Redact::from(&self.access_token))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl SigningCredential for Token {
    fn is_valid(&self) -> bool {
        if self.access_token.is_empty() {
            return false;
        }

        // Refresh two minutes ahead.
        match self.expires_at {
            Some(expires_at) => now() < expires_at - chrono::TimeDelta::minutes(2),
            None => true,
        }
    }
}
