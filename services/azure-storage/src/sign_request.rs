use crate::constants::*;
use crate::Credential;
use async_trait::async_trait;
use http::header::{self, HeaderName};
use http::request::Parts;
use http::HeaderValue;
use log::debug;
use logship_core::hash::{base64_decode, base64_hmac_sha256};
use logship_core::time::{format_http_date, now, DateTime};
use logship_core::{Context, Error, Result, SignRequest, SigningRequest};
use percent_encoding::percent_encode;
use std::fmt::Write;
use std::time::Duration;

/// RequestSigner implements Azure Storage Shared Key and Bearer authorization.
///
/// - [Authorize with Shared Key](https://learn.microsoft.com/en-us/rest/api/storageservices/authorize-with-shared-key)
/// - [Authorize with Microsoft Entra ID](https://learn.microsoft.com/en-us/rest/api/storageservices/authorize-with-azure-active-directory)
///
/// `x-ms-date` is always set and `x-ms-version` is added when the caller did
/// not choose one. Presigning is not supported.
#[derive(Debug, Default, Clone)]
pub struct RequestSigner {
    time: Option<DateTime>,
}

impl RequestSigner {
    /// Create a new signer.
    pub fn new() -> Self {
        Self { time: None }
    }

    /// Specify the signing time.
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }
}

#[async_trait]
impl SignRequest for RequestSigner {
    type Credential = Credential;

    async fn sign_request(
        &self,
        _: &Context,
        req: &mut Parts,
        credential: Option<&Self::Credential>,
        expires_in: Option<Duration>,
    ) -> Result<()> {
        let Some(cred) = credential else {
            return Err(Error::request_invalid("credential is required"));
        };
        if expires_in.is_some() {
            return Err(Error::request_invalid(
                "azure storage requests can't be presigned",
            ));
        }

        let now_time = self.time.unwrap_or_else(now);
        let mut ctx = SigningRequest::build(req)?;

        ctx.headers
            .insert(X_MS_DATE, format_http_date(now_time).parse()?);
        if !ctx.headers.contains_key(X_MS_VERSION) {
            ctx.headers
                .insert(X_MS_VERSION, HeaderValue::from_static(STORAGE_VERSION));
        }

        let authorization = match cred {
            Credential::BearerToken { token, .. } => format!("Bearer {token}"),
            Credential::SharedKey {
                account_name,
                account_key,
            } => {
                let string_to_sign = string_to_sign(&ctx, account_name)?;
                let key = base64_decode(account_key).map_err(|e| {
                    Error::config_invalid("account key is not valid base64")
                        .with_source(e)
                        .with_context(format!("account_name: {account_name}"))
                })?;
                let signature = base64_hmac_sha256(&key, string_to_sign.as_bytes());
                format!("SharedKey {account_name}:{signature}")
            }
        };

        let mut value: HeaderValue = authorization.parse()?;
        value.set_sensitive(true);
        ctx.headers.insert(header::AUTHORIZATION, value);

        for (_, v) in ctx.query.iter_mut() {
            *v = percent_encode(v.as_bytes(), &AZURE_QUERY_ENCODE_SET).to_string();
        }

        ctx.apply(req)
    }
}

/// Construct string to sign
///
/// ## Format
///
/// ```text
/// VERB + "\n" +
/// Content-Encoding + "\n" +
/// Content-Language + "\n" +
/// Content-Length + "\n" +
/// Content-MD5 + "\n" +
/// Content-Type + "\n" +
/// Date + "\n" +
/// If-Modified-Since + "\n" +
/// If-Match + "\n" +
/// If-None-Match + "\n" +
/// If-Unmodified-Since + "\n" +
/// Range + "\n" +
/// CanonicalizedHeaders +
/// CanonicalizedResource;
/// ```
///
/// A zero `Content-Length` is written as an empty line.
fn string_to_sign(ctx: &SigningRequest, account_name: &str) -> Result<String> {
    let content_md5 = HeaderName::from_static(CONTENT_MD5);
    let mut s = String::with_capacity(128);

    writeln!(&mut s, "{}", ctx.method.as_str())?;
    writeln!(
        &mut s,
        "{}",
        ctx.header_get_or_default(&header::CONTENT_ENCODING)?
    )?;
    writeln!(
        &mut s,
        "{}",
        ctx.header_get_or_default(&header::CONTENT_LANGUAGE)?
    )?;
    let content_length = ctx.header_get_or_default(&header::CONTENT_LENGTH)?;
    writeln!(
        &mut s,
        "{}",
        if content_length == "0" {
            ""
        } else {
            content_length
        }
    )?;
    for name in [
        &content_md5,
        &header::CONTENT_TYPE,
        &header::DATE,
        &header::IF_MODIFIED_SINCE,
        &header::IF_MATCH,
        &header::IF_NONE_MATCH,
        &header::IF_UNMODIFIED_SINCE,
        &header::RANGE,
    ] {
        writeln!(&mut s, "{}", ctx.header_get_or_default(name)?)?;
    }
    writeln!(&mut s, "{}", canonicalize_header(ctx)?)?;
    write!(&mut s, "{}", canonicalize_resource(ctx, account_name))?;

    debug!("string to sign: {}", &s);

    Ok(s)
}

/// ## Reference
///
/// - [Constructing the canonicalized headers string](https://learn.microsoft.com/en-us/rest/api/storageservices/authorize-with-shared-key#constructing-the-canonicalized-headers-string)
fn canonicalize_header(ctx: &SigningRequest) -> Result<String> {
    Ok(SigningRequest::header_to_string(
        ctx.header_to_vec_with_prefix("x-ms-")?,
        ":",
        "\n",
    ))
}

/// ## Reference
///
/// - [Constructing the canonicalized resource string](https://learn.microsoft.com/en-us/rest/api/storageservices/authorize-with-shared-key#constructing-the-canonicalized-resource-string)
fn canonicalize_resource(ctx: &SigningRequest, account_name: &str) -> String {
    if ctx.query.is_empty() {
        return format!("/{}{}", account_name, ctx.path);
    }

    let query = ctx
        .query
        .iter()
        .map(|(k, v)| (k.to_lowercase(), v.clone()))
        .collect();

    format!(
        "/{}{}\n{}",
        account_name,
        ctx.path,
        SigningRequest::query_to_percent_decoded_string(query, ":", "\n")
    )
}
