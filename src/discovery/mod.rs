pub mod adapter;
pub mod error;
pub mod types;

pub use adapter::DiscoveryAdapter;
pub use error::{DiscoveryError, Result};
pub use types::{DiscoverySnapshot, ServiceRecord, DEFAULT_DOMAIN, DEFAULT_SERVICE_TYPE};
