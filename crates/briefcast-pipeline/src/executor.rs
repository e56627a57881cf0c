//! The pipeline state machine. Stages run strictly in order with no
//! backward transitions; degradation rules decide which failures abort
//! the run and which merely shrink it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use briefcast_core::error::{BriefcastError, Result};
use briefcast_core::retry::RetryPolicy;
use briefcast_core::types::{
    ContentArtifact, PipelineRun, PublishAttempt, RunOutcome, RunOverrides, Story, TenantId,
    truncate_chars,
};
use briefcast_chart::ChartRenderer;
use briefcast_generation::{GenerationClient, RefineDirection, ResearchClient};
use briefcast_history::HistoryStore;
use briefcast_publish::{PublishCoordinator, classify_outcome};
use briefcast_sources::ContentSource;

/// Hard ceiling on the primary text; one trim call, then deterministic
/// truncation.
const HARD_CEILING: usize = 2500;
/// Truncation target leaves room for the ellipsis marker.
const TRUNCATE_TO: usize = 2497;
/// Hard floor; one expansion call, result accepted regardless.
const HARD_FLOOR: usize = 400;
/// Titles fed back into selection as the exclusion hint.
const RECENCY_WINDOW: usize = 10;
/// Error text recorded on a failed run.
const MAX_ERROR_CHARS: usize = 500;

/// Everything a finished execution produced. The run row and attempt
/// rows are already committed to history by the time this is returned.
pub struct RunReport {
    pub run: PipelineRun,
    /// Present when the pipeline got far enough to build an artifact —
    /// used by preview flows to show the draft.
    pub artifact: Option<ContentArtifact>,
    pub attempts: Vec<PublishAttempt>,
}

pub struct PipelineExecutor {
    sources: Vec<Arc<dyn ContentSource>>,
    generator: Arc<dyn GenerationClient>,
    researcher: Arc<dyn ResearchClient>,
    renderer: Arc<dyn ChartRenderer>,
    coordinator: PublishCoordinator,
    history: Arc<HistoryStore>,
    retry: RetryPolicy,
    fetch_timeout: Duration,
}

impl PipelineExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sources: Vec<Arc<dyn ContentSource>>,
        generator: Arc<dyn GenerationClient>,
        researcher: Arc<dyn ResearchClient>,
        renderer: Arc<dyn ChartRenderer>,
        coordinator: PublishCoordinator,
        history: Arc<HistoryStore>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            sources,
            generator,
            researcher,
            renderer,
            coordinator,
            history,
            retry: RetryPolicy::generation(),
            fetch_timeout,
        }
    }

    /// Run the full pipeline once for one tenant. Never returns an error:
    /// any abort is caught here, logged, and committed as a Failed run so
    /// the orchestrator process survives every tenant-level failure.
    pub async fn run(&self, tenant: &TenantId, overrides: &RunOverrides) -> RunReport {
        let run_id = PipelineRun::new_id();
        let started_at = Utc::now();
        tracing::info!("Pipeline run {run_id} starting for tenant {tenant}");

        let report = match self.execute(&run_id, tenant, overrides).await {
            Ok((artifact, attempts)) => {
                let outcome = classify_outcome(&attempts);
                let run = PipelineRun {
                    id: run_id,
                    tenant: tenant.clone(),
                    started_at,
                    finished_at: Utc::now(),
                    outcome,
                    story_title: Some(artifact.story_title.clone()),
                    story_url: artifact.story_url.clone(),
                    error: None,
                };
                RunReport {
                    run,
                    artifact: Some(artifact),
                    attempts,
                }
            }
            Err(e) => {
                tracing::error!("Pipeline run failed for tenant {tenant}: {e}");
                let run = PipelineRun {
                    id: run_id,
                    tenant: tenant.clone(),
                    started_at,
                    finished_at: Utc::now(),
                    outcome: RunOutcome::Failed,
                    story_title: None,
                    story_url: None,
                    error: Some(truncate_chars(&e.to_string(), MAX_ERROR_CHARS)),
                };
                RunReport {
                    run,
                    artifact: None,
                    attempts: Vec::new(),
                }
            }
        };

        // Commit. A history write failure is logged, not raised — the
        // post already went out and must not look rolled back.
        if let Err(e) = self.history.record_run(&report.run) {
            tracing::error!("Failed to record run {}: {e}", report.run.id);
        }
        for attempt in &report.attempts {
            if let Err(e) = self.history.record_attempt(attempt) {
                tracing::error!("Failed to record attempt {}: {e}", attempt.id);
            }
        }

        tracing::info!(
            "Pipeline run {} finished: {:?}",
            report.run.id,
            report.run.outcome
        );
        report
    }

    async fn execute(
        &self,
        run_id: &str,
        tenant: &TenantId,
        overrides: &RunOverrides,
    ) -> Result<(ContentArtifact, Vec<PublishAttempt>)> {
        // Fetch
        let stories = briefcast_sources::fetch_all(&self.sources, self.fetch_timeout).await;
        if stories.is_empty() {
            return Err(BriefcastError::NoContentAvailable);
        }

        // Select, biased away from recently covered topics.
        let recent = self
            .history
            .recent_titles(tenant, RECENCY_WINDOW)
            .unwrap_or_else(|e| {
                tracing::warn!("Recency window unavailable: {e}");
                Vec::new()
            });
        let story = self.select(&stories, &recent).await;

        // Research (degrades to the story's own text).
        let research = self.researcher.research(&story).await;

        // Generate
        let draft = self
            .retry
            .run("generate", |_| {
                let story = &story;
                let research = &research;
                async move { self.generator.generate(story, research).await }
            })
            .await
            .map_err(|e| BriefcastError::GenerationFailed(e.to_string()))?;

        // Refine
        let text = self.refine(draft.text).await;

        // Render — mandatory attempt, never fatal.
        let chart_path = briefcast_chart::render_chart(self.renderer.as_ref(), &draft.chart).await;

        let mut artifact = ContentArtifact {
            text,
            linkedin_text: draft.linkedin_text,
            chart: draft.chart,
            chart_path,
            story_title: story.title.clone(),
            story_url: story.url.clone(),
        };
        if let Some(text) = &overrides.text {
            artifact.text = text.clone();
        }

        // Publish
        let attempts = if overrides.dry_run {
            tracing::info!("Dry run — skipping publish for tenant {tenant}");
            Vec::new()
        } else {
            self.coordinator.publish_all(run_id, &artifact).await
        };

        Ok((artifact, attempts))
    }

    /// Select with one retry, then the deterministic fallback: the
    /// highest-scored candidate if any carries a score, else the first
    /// in fetch order.
    async fn select(&self, stories: &[Story], recent: &[String]) -> Story {
        let picked = self
            .retry
            .run("select", |_| async move {
                self.generator.select_best(stories, recent).await
            })
            .await;

        match picked {
            Ok(index) => match stories.get(index) {
                Some(story) => story.clone(),
                None => fallback_select(stories).clone(),
            },
            Err(e) => {
                tracing::warn!("Select failed, using fallback: {e}");
                fallback_select(stories).clone()
            }
        }
    }

    /// Length enforcement. The [800, 2000] band is a soft target; only
    /// the 2500 ceiling and 400 floor trigger corrections.
    async fn refine(&self, text: String) -> String {
        let len = text.chars().count();
        if len > HARD_CEILING {
            tracing::warn!("Post is {len} chars, trimming");
            let refined = match self.generator.refine(&text, RefineDirection::Trim).await {
                Ok(refined) => refined,
                Err(e) => {
                    tracing::warn!("Trim call failed: {e}");
                    text
                }
            };
            if refined.chars().count() > HARD_CEILING {
                let mut truncated = truncate_chars(&refined, TRUNCATE_TO);
                truncated.push_str("...");
                truncated
            } else {
                refined
            }
        } else if len < HARD_FLOOR {
            tracing::warn!("Post is only {len} chars, expanding");
            // One expansion attempt; accepted whatever comes back.
            match self.generator.refine(&text, RefineDirection::Expand).await {
                Ok(refined) => refined,
                Err(e) => {
                    tracing::warn!("Expand call failed: {e}");
                    text
                }
            }
        } else {
            text
        }
    }
}

fn fallback_select(stories: &[Story]) -> &Story {
    stories
        .iter()
        .filter(|s| s.score.is_some())
        .max_by_key(|s| s.score)
        .unwrap_or(&stories[0])
}
