mod cached;
pub use cached::{CacheKey, CachedCredentialProvider};

mod default;
pub use default::DefaultCredentialProvider;

mod ecs;
pub use ecs::EcsCredentialProvider;

mod env;
pub use env::EnvCredentialProvider;

mod imds;
pub use imds::IMDSv2CredentialProvider;

mod pod_identity;
pub use pod_identity::PodIdentityCredentialProvider;

mod profile;
pub use profile::ProfileCredentialProvider;

mod web_identity;
pub use web_identity::WebIdentityCredentialProvider;

pub(crate) mod utils;
