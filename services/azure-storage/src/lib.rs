//! Azure Blob Storage signing for logship.
//!
//! Requests are authorized with a storage account shared key or with a
//! bearer token obtained from Entra ID (client secret) or from the managed
//! identity endpoint.
//!
//! ```no_run
//! use logship_azure_storage::{DefaultCredentialProvider, RequestSigner};
//! use logship_core::{Context, OsEnv, Signer};
//!
//! # async fn example() -> logship_core::Result<()> {
//! let ctx = Context::new().with_env(OsEnv);
//! let signer = Signer::new(ctx, DefaultCredentialProvider::new(), RequestSigner::new());
//!
//! let (mut parts, _) = http::Request::put("https://logs.blob.core.windows.net/audit/log.json")
//!     .header("x-ms-blob-type", "BlockBlob")
//!     .body(())?
//!     .into_parts();
//! signer.sign(&mut parts, None).await?;
//! # Ok(())
//! # }
//! ```

pub mod constants;

mod credential;
pub use credential::Credential;

mod sign_request;
pub use sign_request::RequestSigner;

mod provide_credential;
pub use provide_credential::*;
