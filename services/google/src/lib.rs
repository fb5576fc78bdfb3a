//! Google Cloud Storage signing for logship.
//!
//! GCS is reached with OAuth2 bearer tokens: the token of the workload
//! identity bound to the current VM or pod, optionally exchanged for the
//! token of another service account through
//! [`ImpersonatedCredentialProvider`].

pub mod constants;

mod credential;
pub use credential::Token;

mod sign_request;
pub use sign_request::RequestSigner;

mod provide_credential;
pub use provide_credential::*;
