//! Shared value types — the data model flowing through the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Opaque tenant identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Typed composite key for a schedule entry: one tenant, one slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    pub tenant: TenantId,
    pub slot: usize,
}

impl SlotKey {
    pub fn new(tenant: TenantId, slot: usize) -> Self {
        Self { tenant, slot }
    }
}

/// A candidate story fetched from a content source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    pub title: String,
    pub url: Option<String>,
    /// Popularity score where the source provides one (e.g. HN points).
    pub score: Option<u32>,
    pub summary: Option<String>,
    /// Source tag, e.g. "hackernews" or "techcrunch-venture".
    pub source: String,
}

/// Chart shape requested by the generation model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Bar,
    Line,
    Comparison,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPoint {
    pub label: String,
    pub value: f64,
}

/// Chart specification produced by the Generate stage.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChartSpec {
    #[serde(default)]
    pub kind: ChartKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub points: Vec<DataPoint>,
}

/// Raw output of the Generate stage, before refinement and rendering.
#[derive(Debug, Clone)]
pub struct Draft {
    pub text: String,
    /// Optional platform-specific variant (longer LinkedIn commentary).
    pub linkedin_text: Option<String>,
    pub chart: ChartSpec,
}

/// The in-memory bundle handed to the publish stage. Transient — its
/// identifying fields are copied into PipelineRun/PublishAttempt rows.
#[derive(Debug, Clone)]
pub struct ContentArtifact {
    pub text: String,
    pub linkedin_text: Option<String>,
    pub chart: ChartSpec,
    pub chart_path: Option<PathBuf>,
    pub story_title: String,
    pub story_url: Option<String>,
}

/// A publish destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    X,
    LinkedIn,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::X => "x",
            Platform::LinkedIn => "linkedin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "x" | "twitter" => Some(Platform::X),
            "linkedin" => Some(Platform::LinkedIn),
            _ => None,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one full pipeline execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// Every configured platform attempt succeeded.
    Completed,
    /// At least one platform succeeded and at least one failed.
    PartiallyCompleted,
    /// Aborted before Publish, or every platform attempt failed.
    Failed,
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Completed => "completed",
            RunOutcome::PartiallyCompleted => "partial",
            RunOutcome::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(RunOutcome::Completed),
            "partial" => Some(RunOutcome::PartiallyCompleted),
            "failed" => Some(RunOutcome::Failed),
            _ => None,
        }
    }
}

/// One end-to-end pipeline execution, immutable once finished.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: String,
    pub tenant: TenantId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: RunOutcome,
    pub story_title: Option<String>,
    pub story_url: Option<String>,
    pub error: Option<String>,
}

impl PipelineRun {
    pub fn new_id() -> String {
        format!("run-{}", uuid::Uuid::new_v4())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptStatus {
    Success,
    Failed,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::Success => "success",
            AttemptStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(AttemptStatus::Success),
            "failed" => Some(AttemptStatus::Failed),
            _ => None,
        }
    }
}

/// One platform-specific publish outcome within a run. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishAttempt {
    pub id: String,
    pub run_id: String,
    pub platform: Platform,
    pub status: AttemptStatus,
    pub post_id: Option<String>,
    pub error: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

impl PublishAttempt {
    pub fn new_id() -> String {
        format!("att-{}", uuid::Uuid::new_v4())
    }
}

/// Receipt returned by a successful platform publish.
#[derive(Debug, Clone)]
pub struct PostReceipt {
    pub post_id: String,
}

/// Caller-supplied overrides for an on-demand run ("post now" / preview).
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    /// Replaces the generated text right before the Publish stage.
    pub text: Option<String>,
    /// Skip publishing entirely; the run still renders its chart.
    pub dry_run: bool,
}

/// Truncate to at most `max` characters on a char boundary.
/// Avoids slicing panics on multi-byte text.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    s.chars().take(max).collect()
}
