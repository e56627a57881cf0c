//! # Briefcast Core
//!
//! Shared foundation for the Briefcast pipeline: configuration,
//! the error taxonomy, common value types, and the bounded retry policy
//! used by the generation stages.

pub mod config;
pub mod error;
pub mod retry;
pub mod types;

pub use config::{BriefcastConfig, TenantProfile, TenantsFile};
pub use error::{BriefcastError, PlatformError, PlatformErrorKind, Result};
pub use retry::RetryPolicy;
