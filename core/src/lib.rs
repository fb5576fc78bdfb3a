//! Core components for resolving credentials and delivering signed requests.
//!
//! This crate provides the foundational types and traits shared by every
//! logship service crate.
//!
//! ## Overview
//!
//! - **Context**: holds implementations for file reading, HTTP sending and environment access
//! - **Traits**: [`ProvideCredential`] loads credentials, [`SignRequest`] signs requests
//! - **Chain**: [`ProvideCredentialChain`] walks independent credential sources in order
//! - **Signer**: coordinates credential loading and request signing
//! - **Cache**: [`CredentialCache`] with ttl semantics and the in-process [`MemoryCache`]
//! - **Retry**: [`RetryPolicy`], the only retry mechanism used for outbound calls
//!
//! ## Example
//!
//! ```no_run
//! use async_trait::async_trait;
//! use logship_core::{Context, ProvideCredential, Result, SignRequest, Signer, SigningCredential};
//! use std::time::Duration;
//!
//! #[derive(Clone, Debug)]
//! struct MyCredential {
//!     key: String,
//! }
//!
//! impl SigningCredential for MyCredential {
//!     fn is_valid(&self) -> bool {
//!         !self.key.is_empty()
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct MyLoader;
//!
//! #[async_trait]
//! impl ProvideCredential for MyLoader {
//!     type Credential = MyCredential;
//!
//!     async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
//!         Ok(Some(MyCredential {
//!             key: "my-key".to_string(),
//!         }))
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct MyBuilder;
//!
//! #[async_trait]
//! impl SignRequest for MyBuilder {
//!     type Credential = MyCredential;
//!
//!     async fn sign_request(
//!         &self,
//!         _: &Context,
//!         req: &mut http::request::Parts,
//!         cred: Option<&Self::Credential>,
//!         _: Option<Duration>,
//!     ) -> Result<()> {
//!         if let Some(cred) = cred {
//!             req.headers.insert("x-api-key", cred.key.parse()?);
//!         }
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> Result<()> {
//! let signer = Signer::new(Context::new(), MyLoader, MyBuilder);
//!
//! let (mut parts, _) = http::Request::get("https://example.com")
//!     .body(())?
//!     .into_parts();
//! signer.sign(&mut parts, None).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Utilities
//!
//! - [`hash`]: hashing and hmac helpers
//! - [`time`]: time formatting helpers
//! - [`utils`]: data redaction

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod context;
pub use context::{Context, Env, FileRead, HttpSend, NoopEnv, NoopFileRead, NoopHttpSend};
pub use context::{OsEnv, StaticEnv};
mod error;
pub use error::{Error, ErrorKind, Result};

mod api;
pub use api::{ProvideCredential, SignRequest, SigningCredential};
mod chain;
pub use chain::ProvideCredentialChain;
mod request;
pub use request::SigningRequest;
mod signer;
pub use signer::Signer;
mod cache;
pub use cache::{CacheSelector, CredentialCache, MemoryCache};
mod retry;
pub use retry::RetryPolicy;
