use crate::Credential;
use http::StatusCode;
use logship_core::time::parse_rfc3339;
use logship_core::{Error, Result};
use serde::Deserialize;

/// Get the sts endpoint.
///
/// The returning format may look like `sts.{region}.amazonaws.com`
///
/// # Notes
///
/// AWS could have different sts endpoint based on it's region.
/// We can check them by region name.
///
/// ref: https://github.com/awslabs/aws-sdk-rust/blob/31cfae2cf23be0c68a47357070dea1aee9227e3a/sdk/sts/src/aws_endpoint.rs
pub fn sts_endpoint(region: &str, use_regional: bool) -> String {
    let suffix = if region.starts_with("cn-") {
        "amazonaws.com.cn"
    } else {
        "amazonaws.com"
    };

    if use_regional {
        format!("sts.{region}.{suffix}")
    } else {
        format!("sts.{suffix}")
    }
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct StsErrorResponse {
    error: StsError,
    request_id: String,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct StsError {
    code: String,
    message: String,
}

/// Turn a non-200 STS response into a typed error.
///
/// Throttling and 5xx responses are retryable, `AccessDenied` maps to
/// [`logship_core::ErrorKind::CredentialDenied`].
pub fn parse_sts_error(
    operation: &str,
    status: StatusCode,
    body: &str,
    request_id: Option<&str>,
) -> Error {
    let parsed: Option<StsErrorResponse> = quick_xml::de::from_str(body).ok();
    let (code, message, body_request_id) = match parsed {
        Some(resp) if !resp.error.code.is_empty() => {
            (resp.error.code, resp.error.message, Some(resp.request_id))
        }
        _ => (String::new(), body.trim().to_string(), None),
    };

    let mut err = match code.as_str() {
        "AccessDenied" | "ExpiredTokenException" | "InvalidClientTokenId" => {
            Error::credential_denied(format!("{operation} denied: {message}"))
        }
        "MalformedPolicyDocument" | "PackedPolicyTooLarge" | "ValidationError" => {
            Error::config_invalid(format!("{operation} rejected: {message}"))
        }
        "RegionDisabledException" => {
            Error::config_invalid(format!("{operation} region disabled: {message}"))
        }
        "Throttling" | "ThrottlingException" | "RequestLimitExceeded" => {
            Error::unexpected(format!("{operation} throttled: {message}")).set_retryable(true)
        }
        _ => Error::unexpected(format!(
            "{operation} failed with status {status}: {message}"
        ))
        .set_retryable(status.is_server_error()),
    };

    if !code.is_empty() {
        err = err.with_context(format!("error_code: {code}"));
    }
    if let Some(id) = request_id
        .map(str::to_string)
        .or(body_request_id)
        .filter(|v| !v.is_empty())
    {
        err = err.with_context(format!("request_id: {id}"));
    }
    err.with_context(format!("status: {status}"))
}

/// Turn a non-200 instance metadata response into a typed error.
pub fn parse_imds_error(operation: &str, status: StatusCode, body: &str) -> Error {
    let err = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::credential_denied(format!("{operation}: metadata access denied"))
        }
        StatusCode::NOT_FOUND => {
            Error::config_invalid(format!("{operation}: metadata resource not found"))
        }
        s if s.is_server_error() => {
            Error::unexpected(format!("{operation}: metadata service error")).set_retryable(true)
        }
        _ => Error::unexpected(format!("{operation}: unexpected metadata response")),
    };

    err.with_context(format!("status: {status}"))
        .with_context(format!("body: {}", body.trim()))
}

/// Credentials block shared by every STS response.
#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct StsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: String,
}

impl StsCredentials {
    pub fn into_credential(self, operation: &str) -> Result<Credential> {
        let expires_in = parse_rfc3339(&self.expiration).map_err(|e| {
            Error::unexpected(format!("failed to parse {operation} credential expiration"))
                .with_source(e)
                .with_context(format!("expiration_value: {}", self.expiration))
        })?;

        Ok(Credential {
            access_key_id: self.access_key_id,
            secret_access_key: self.secret_access_key,
            session_token: Some(self.session_token.trim().to_string()),
            expires_in: Some(expires_in),
            ..Default::default()
        })
    }
}

/// Credentials document served by IMDS, ECS and the Pod Identity agent.
#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ContainerCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub token: String,
    pub expiration: String,
    pub code: String,
    pub message: String,
}

impl ContainerCredentials {
    pub fn parse(operation: &str, content: &str) -> Result<Self> {
        let creds: Self = serde_json::from_str(content).map_err(|e| {
            Error::unexpected(format!("failed to parse {operation} response"))
                .with_source(e)
                .with_context(format!("response_length: {}", content.len()))
        })?;

        match creds.code.as_str() {
            "" | "Success" => Ok(creds),
            "AssumeRoleUnauthorizedAccess" => Err(Error::credential_denied(format!(
                "{operation}: not authorized to assume role: {}",
                creds.message
            ))
            .with_context(format!("error_code: {}", creds.code))),
            code => Err(Error::unexpected(format!(
                "{operation}: [{code}] {}",
                creds.message
            ))),
        }
    }

    pub fn into_credential(self) -> Result<Credential> {
        if self.access_key_id.is_empty() || self.secret_access_key.is_empty() {
            return Err(Error::credential_invalid(
                "credential document has no access key id or secret access key",
            ));
        }

        let expires_in = parse_rfc3339(&self.expiration).map_err(|e| {
            Error::unexpected("failed to parse credential expiration")
                .with_source(e)
                .with_context(format!("expiration_value: {}", self.expiration))
        })?;

        Ok(Credential {
            access_key_id: self.access_key_id,
            secret_access_key: self.secret_access_key,
            session_token: Some(self.token),
            expires_in: Some(expires_in),
            ..Default::default()
        })
    }
}
