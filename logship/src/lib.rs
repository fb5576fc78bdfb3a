//! Credential resolution and signed delivery of gateway logs to object stores.
//!
//! A [`StorageDispatcher`] owns one adapter per [`BackendType`]. Each adapter
//! resolves credentials, signs the request for its store and sends it
//! through a [`logship_core::RetryPolicy`].
//!
//! ```no_run
//! use logship::{default_context, LogPayload, LogStoreConfig, ObjectKey, StorageDispatcher};
//!
//! # async fn example() -> logship_core::Result<()> {
//! let ctx = default_context();
//! let config = LogStoreConfig::from_env(&ctx)?;
//! let key = ObjectKey::new(30, "org-1", "log-1").format(config.path_format);
//! let target = config.target();
//!
//! let dispatcher = StorageDispatcher::from_config(ctx, config);
//! dispatcher
//!     .put_and_forget(&target, &LogPayload::new(key, r#"{"status":200}"#))
//!     .await;
//! # Ok(())
//! # }
//! ```

pub use logship_core::*;

pub mod aws {
    //! AWS credentials and SigV4.
    pub use logship_aws_v4::*;
}

pub mod azure {
    //! Azure Storage credentials and signing.
    pub use logship_azure_storage::*;
}

pub mod google {
    //! Google Cloud Storage tokens and signing.
    pub use logship_google::*;
}

mod context;
pub use context::default_context;

pub mod config;
pub use config::LogStoreConfig;

mod error;
pub use error::DeliveryError;

mod path;
pub use path::{ObjectKey, PathFormat};

mod target;
pub use target::{BackendType, CredentialsOverride, LogPayload, StorageTarget};

pub mod backend;
pub use backend::{Backend, LogSink};

mod dispatcher;
pub use dispatcher::StorageDispatcher;
