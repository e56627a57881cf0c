//! # Briefcast Publish
//!
//! Outbound platform clients and the coordinator that fans one artifact
//! out to every enabled platform. Failures are isolated per platform: a
//! rejected post on one never prevents an attempt on another, and never
//! rolls back a post that already went out.

pub mod coordinator;
pub mod linkedin;
pub mod oauth1;
pub mod x;

use std::path::Path;

use async_trait::async_trait;

use briefcast_core::error::PlatformError;
use briefcast_core::types::{Platform, PostReceipt};

pub use coordinator::{PublishCoordinator, classify_outcome};
pub use linkedin::LinkedInPublisher;
pub use x::XPublisher;

/// A single platform's publish capability.
///
/// Image-capable platforms implement the stage-then-reference upload
/// internally; a failed staging step must fall back to a text-only post
/// on the same platform before an error is surfaced.
#[async_trait]
pub trait PublishClient: Send + Sync {
    fn platform(&self) -> Platform;

    async fn publish(
        &self,
        text: &str,
        image: Option<&Path>,
    ) -> std::result::Result<PostReceipt, PlatformError>;
}
