//! # Briefcast Sources
//!
//! Content source clients plus the concurrent fetch stage: every
//! configured source is queried in parallel with its own timeout, failed
//! sources are dropped, and the union is deduplicated by URL.

pub mod hackernews;
pub mod rss;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use briefcast_core::Result;
use briefcast_core::types::Story;

pub use hackernews::HackerNewsSource;
pub use rss::RssSource;

/// A content source client. One fetch call returns that source's current
/// candidate stories; failures are per-source and never fatal to the
/// stage as long as another source delivers.
#[async_trait]
pub trait ContentSource: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch(&self) -> Result<Vec<Story>>;
}

/// Max sources queried in flight at once.
const MAX_CONCURRENT_SOURCES: usize = 8;

/// Query all sources concurrently, each bounded by `timeout`. A source
/// that errors or times out is skipped. Results keep source order, then
/// get URL-deduplicated (first occurrence wins; URL-less items are all
/// retained).
async fn fetch_one(source: Arc<dyn ContentSource>, timeout: Duration) -> Vec<Story> {
    match tokio::time::timeout(timeout, source.fetch()).await {
        Ok(Ok(stories)) => {
            tracing::info!("Fetched {} stories from {}", stories.len(), source.name());
            stories
        }
        Ok(Err(e)) => {
            tracing::warn!("Source {} failed: {e}", source.name());
            Vec::new()
        }
        Err(_) => {
            tracing::warn!("Source {} timed out after {timeout:?}", source.name());
            Vec::new()
        }
    }
}

pub async fn fetch_all(sources: &[Arc<dyn ContentSource>], timeout: Duration) -> Vec<Story> {
    let source_futures: Vec<_> = sources
        .iter()
        .cloned()
        .map(|source| fetch_one(source, timeout))
        .collect();
    let results: Vec<Vec<Story>> = futures::stream::iter(source_futures)
        // buffered (not buffer_unordered) keeps source order stable so
        // downstream "first in fetch order" fallbacks are deterministic.
        .buffered(MAX_CONCURRENT_SOURCES)
        .collect()
        .await;

    let merged: Vec<Story> = results.into_iter().flatten().collect();
    let unique = dedup_by_url(merged);
    tracing::info!("Total unique stories: {}", unique.len());
    unique
}

/// First-occurrence-wins URL dedup. Stories without a URL are never
/// deduplicated against each other.
pub fn dedup_by_url(stories: Vec<Story>) -> Vec<Story> {
    let mut seen = std::collections::HashSet::new();
    let mut unique = Vec::with_capacity(stories.len());
    for story in stories {
        match story.url.as_deref() {
            Some(url) if !url.is_empty() => {
                if seen.insert(url.to_string()) {
                    unique.push(story);
                }
            }
            _ => unique.push(story),
        }
    }
    unique
}
