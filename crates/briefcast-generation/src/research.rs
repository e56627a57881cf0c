//! Deep research client. Degrades to the story's own summary — a failed
//! or missing research call never aborts a run.

use async_trait::async_trait;

use briefcast_core::types::Story;

use crate::client::ChatClient;
use crate::{ResearchClient, prompts};

pub struct SonarResearchClient {
    chat: Option<ChatClient>,
}

impl SonarResearchClient {
    /// `chat` is None when the tenant has no research credential; the
    /// client then always falls back to the story's own text.
    pub fn new(chat: Option<ChatClient>) -> Self {
        Self { chat }
    }
}

fn fallback_text(story: &Story) -> String {
    story
        .summary
        .clone()
        .unwrap_or_else(|| story.title.clone())
}

#[async_trait]
impl ResearchClient for SonarResearchClient {
    async fn research(&self, story: &Story) -> String {
        let Some(chat) = &self.chat else {
            tracing::warn!("No research credential configured, using story summary");
            return fallback_text(story);
        };

        match chat.chat(None, &prompts::research_query(story)).await {
            Ok(text) => {
                tracing::info!("Deep research complete ({} chars)", text.len());
                text
            }
            Err(e) => {
                tracing::warn!("Research failed, using story summary: {e}");
                fallback_text(story)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_credential_falls_back_to_summary() {
        let client = SonarResearchClient::new(None);
        let story = Story {
            title: "Title".into(),
            url: None,
            score: None,
            summary: Some("The summary.".into()),
            source: "test".into(),
        };
        assert_eq!(client.research(&story).await, "The summary.");
    }

    #[tokio::test]
    async fn test_no_credential_no_summary_uses_title() {
        let client = SonarResearchClient::new(None);
        let story = Story {
            title: "Just a title".into(),
            url: None,
            score: None,
            summary: None,
            source: "test".into(),
        };
        assert_eq!(client.research(&story).await, "Just a title");
    }
}
