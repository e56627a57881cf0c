//! HackerNews source — top-story id list, then per-item fetches.

use async_trait::async_trait;
use futures::StreamExt;

use briefcast_core::Result;
use briefcast_core::config::SourcesConfig;
use briefcast_core::types::Story;

use crate::ContentSource;

/// Concurrent per-item fetches in flight.
const ITEM_CONCURRENCY: usize = 10;

pub struct HackerNewsSource {
    top_stories_url: String,
    item_url: String,
    max_stories: usize,
    min_score: u32,
    client: reqwest::Client,
}

impl HackerNewsSource {
    pub fn new(config: &SourcesConfig) -> Self {
        Self {
            top_stories_url: config.hn_top_stories_url.clone(),
            item_url: config.hn_item_url.clone(),
            max_stories: config.max_hn_stories,
            min_score: config.min_hn_score,
            client: reqwest::Client::new(),
        }
    }

    async fn fetch_item(&self, id: u64) -> Option<Story> {
        let url = self.item_url.replace("{id}", &id.to_string());
        let item: serde_json::Value = match self.client.get(&url).send().await {
            Ok(resp) => match resp.error_for_status() {
                Ok(resp) => resp.json().await.ok()?,
                Err(e) => {
                    tracing::debug!("HN item {id} returned error status: {e}");
                    return None;
                }
            },
            Err(e) => {
                tracing::debug!("Failed to fetch HN item {id}: {e}");
                return None;
            }
        };

        let score = item["score"].as_u64().unwrap_or(0) as u32;
        if item["type"].as_str() != Some("story") || score < self.min_score {
            return None;
        }

        Some(Story {
            title: item["title"].as_str().unwrap_or_default().to_string(),
            url: item["url"].as_str().map(String::from),
            score: Some(score),
            summary: None,
            source: "hackernews".into(),
        })
    }
}

#[async_trait]
impl ContentSource for HackerNewsSource {
    fn name(&self) -> &str {
        "hackernews"
    }

    async fn fetch(&self) -> Result<Vec<Story>> {
        let ids: Vec<u64> = self
            .client
            .get(&self.top_stories_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let stories: Vec<Story> = futures::stream::iter(ids.into_iter().take(self.max_stories))
            .map(|id| self.fetch_item(id))
            .buffer_unordered(ITEM_CONCURRENCY)
            .filter_map(|item| async move { item })
            .collect()
            .await;

        tracing::info!(
            "Fetched {} HackerNews stories (score >= {})",
            stories.len(),
            self.min_score
        );
        Ok(stories)
    }
}
