use crate::constants::GOOG_QUERY_ENCODE_SET;
use crate::Token;
use async_trait::async_trait;
use http::header;
use http::request::Parts;
use http::HeaderValue;
use logship_core::{Context, Error, Result, SignRequest, SigningRequest};
use percent_encoding::utf8_percent_encode;
use std::time::Duration;

/// RequestSigner authorizes Google Cloud Storage requests with a bearer token.
///
/// Requests can't be presigned with an access token alone.
#[derive(Debug, Default, Clone)]
pub struct RequestSigner;

impl RequestSigner {
    /// Create a new signer.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SignRequest for RequestSigner {
    type Credential = Token;

    async fn sign_request(
        &self,
        _: &Context,
        req: &mut Parts,
        credential: Option<&Self::Credential>,
        expires_in: Option<Duration>,
    ) -> Result<()> {
        let Some(token) = credential else {
            return Err(Error::request_invalid("credential is required"));
        };
        if expires_in.is_some() {
            return Err(Error::request_invalid(
                "access tokens can't be used to presign requests",
            ));
        }

        let mut ctx = SigningRequest::build(req)?;

        let mut value: HeaderValue = format!("Bearer {}", token.access_token).parse()?;
        value.set_sensitive(true);
        ctx.headers.insert(header::AUTHORIZATION, value);

        for (_, v) in ctx.query.iter_mut() {
            *v = utf8_percent_encode(v, &GOOG_QUERY_ENCODE_SET).to_string();
        }

        ctx.apply(req)
    }
}
