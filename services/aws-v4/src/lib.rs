//! AWS SigV4 signing and credential resolution for logship.
//!
//! ## Overview
//!
//! - [`RequestSigner`] signs any SigV4 service (`s3`, `sts`, ...)
//! - the `*CredentialProvider` types are independent credential sources
//! - [`CredentialResolver`] walks them in order and chains role assumption
//!   through [`RoleAssumptionService`]
//!
//! ## Example
//!
//! ```no_run
//! use logship_aws_v4::{CredentialResolver, RequestSigner, ResolveRequest};
//! use logship_core::{Context, OsEnv};
//!
//! # async fn example() -> logship_core::Result<()> {
//! let ctx = Context::new().with_env(OsEnv);
//! let resolver = CredentialResolver::default();
//!
//! let req = ResolveRequest::new().with_role_arn("arn:aws:iam::123456789012:role/log-writer");
//! if let Some(cred) = resolver.resolve(&ctx, &req).await {
//!     let signer = RequestSigner::new("s3", cred.region.as_deref().unwrap_or("us-east-1"));
//!     let (mut parts, body) = http::Request::put("https://logs.s3.amazonaws.com/a.json")
//!         .body(b"{}".to_vec())?
//!         .into_parts();
//!     signer.sign_with_body(&mut parts, &body, &cred)?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod constants;
pub use constants::EMPTY_STRING_SHA256;

mod config;
pub use config::Config;

mod credential;
pub use credential::{Credential, CredentialSource};

mod sign_request;
pub use sign_request::RequestSigner;

mod provide_credential;
pub use provide_credential::*;

mod assume_role;
pub use assume_role::{AssumeRoleRequest, RoleAssumptionService};

mod resolver;
pub use resolver::{CredentialResolver, ResolveRequest};
