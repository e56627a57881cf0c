//! # Briefcast Generation
//!
//! The generation-side capability contracts and their HTTP
//! implementations: story selection, draft generation with a chart
//! specification, length refinement, and deep research. A single
//! [`client::ChatClient`] handles both message-API dialects in use
//! (Anthropic-style for generation, OpenAI-style for research);
//! the structured-output parsing lives in [`generate`].

pub mod client;
pub mod generate;
pub mod prompts;
pub mod research;

use async_trait::async_trait;

use briefcast_core::Result;
use briefcast_core::types::{Draft, Story};

pub use client::{ChatClient, Dialect};
pub use generate::ChatGenerationClient;
pub use research::SonarResearchClient;

/// Which way a refine call should push the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefineDirection {
    /// Text exceeded the hard ceiling; ask for a trim.
    Trim,
    /// Text fell below the hard floor; ask for an expansion.
    Expand,
}

/// Select-best / generate / refine operations against a generation model.
///
/// `select_best` and `generate` surface malformed structured output as
/// [`BriefcastError::Parse`](briefcast_core::BriefcastError::Parse); the
/// caller owns the retry policy and fallbacks. `refine` is best-effort,
/// single attempt.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Pick the index of the best candidate, biased away from
    /// `recent_titles` (soft exclusion hint, at most the recency window).
    async fn select_best(&self, stories: &[Story], recent_titles: &[String]) -> Result<usize>;

    /// Produce the full draft (text, optional platform variant, chart
    /// specification) for the selected story.
    async fn generate(&self, story: &Story, research: &str) -> Result<Draft>;

    /// One refinement pass over the text in the given direction.
    async fn refine(&self, text: &str, direction: RefineDirection) -> Result<String>;
}

/// Supplementary research for a selected story. Infallible by contract:
/// any failure degrades to the story's own summary or title.
#[async_trait]
pub trait ResearchClient: Send + Sync {
    async fn research(&self, story: &Story) -> String;
}
