mod static_provider;
pub use static_provider::StaticCredentialProvider;

mod env;
pub use env::EnvCredentialProvider;

mod vm_metadata;
pub use vm_metadata::VmMetadataCredentialProvider;

mod impersonated;
pub use impersonated::ImpersonatedCredentialProvider;

mod default;
pub use default::DefaultCredentialProvider;
