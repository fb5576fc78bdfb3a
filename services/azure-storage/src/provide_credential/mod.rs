mod env;
pub use env::EnvCredentialProvider;

mod static_provider;
pub use static_provider::StaticCredentialProvider;

mod client_secret;
pub use client_secret::ClientSecretCredentialProvider;

mod imds;
pub use imds::ImdsCredentialProvider;

mod default;
pub use default::DefaultCredentialProvider;
