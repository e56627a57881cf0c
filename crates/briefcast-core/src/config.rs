//! Briefcast configuration system.
//!
//! Two TOML files under `~/.briefcast/`: `config.toml` (process-wide
//! settings) and `tenants.toml` (per-tenant credential references and
//! schedule defaults). Credentials are referenced here, never validated —
//! the platforms reject bad ones at publish time.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{BriefcastError, Result};
use crate::types::Platform;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BriefcastConfig {
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub research: ResearchConfig,
    #[serde(default)]
    pub charts: ChartsConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub publish: PublishConfig,
}

impl BriefcastConfig {
    /// Load config from the default path (~/.briefcast/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BriefcastError::config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| BriefcastError::config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| BriefcastError::config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Briefcast home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".briefcast")
    }
}

/// Content source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_hn_top_stories_url")]
    pub hn_top_stories_url: String,
    /// Item URL template; `{id}` is replaced per story.
    #[serde(default = "default_hn_item_url")]
    pub hn_item_url: String,
    #[serde(default = "default_max_hn_stories")]
    pub max_hn_stories: usize,
    #[serde(default = "default_min_hn_score")]
    pub min_hn_score: u32,
    #[serde(default = "default_rss_feeds")]
    pub rss_feeds: Vec<RssFeedConfig>,
    /// Per-source fetch timeout in seconds.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RssFeedConfig {
    pub name: String,
    pub url: String,
}

fn default_hn_top_stories_url() -> String {
    "https://hacker-news.firebaseio.com/v0/topstories.json".into()
}
fn default_hn_item_url() -> String {
    "https://hacker-news.firebaseio.com/v0/item/{id}.json".into()
}
fn default_max_hn_stories() -> usize {
    30
}
fn default_min_hn_score() -> u32 {
    50
}
fn default_rss_feeds() -> Vec<RssFeedConfig> {
    vec![
        RssFeedConfig {
            name: "techcrunch-venture".into(),
            url: "https://techcrunch.com/category/venture/feed/".into(),
        },
        RssFeedConfig {
            name: "techcrunch-startups".into(),
            url: "https://techcrunch.com/category/startups/feed/".into(),
        },
    ]
}
fn default_fetch_timeout_secs() -> u64 {
    10
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            hn_top_stories_url: default_hn_top_stories_url(),
            hn_item_url: default_hn_item_url(),
            max_hn_stories: default_max_hn_stories(),
            min_hn_score: default_min_hn_score(),
            rss_feeds: default_rss_feeds(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

/// Generation model configuration (select / generate / refine calls).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default = "default_generation_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_call_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_generation_endpoint() -> String {
    "https://api.anthropic.com/v1/messages".into()
}
fn default_generation_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn default_generation_max_tokens() -> u32 {
    2000
}
fn default_call_timeout_secs() -> u64 {
    60
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_generation_endpoint(),
            model: default_generation_model(),
            max_tokens: default_generation_max_tokens(),
            timeout_secs: default_call_timeout_secs(),
        }
    }
}

/// Deep research configuration (OpenAI-style chat completions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    #[serde(default = "default_research_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_research_model")]
    pub model: String,
    #[serde(default = "default_call_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_research_endpoint() -> String {
    "https://api.perplexity.ai/chat/completions".into()
}
fn default_research_model() -> String {
    "sonar-pro".into()
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_research_endpoint(),
            model: default_research_model(),
            timeout_secs: default_call_timeout_secs(),
        }
    }
}

/// Chart rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartsConfig {
    /// External render service endpoint (Chart.js config in, PNG out).
    #[serde(default = "default_render_url")]
    pub render_url: String,
    #[serde(default = "default_charts_dir")]
    pub output_dir: String,
    #[serde(default = "default_render_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_render_url() -> String {
    "https://quickchart.io/chart".into()
}
fn default_charts_dir() -> String {
    "~/.briefcast/charts".into()
}
fn default_render_timeout_secs() -> u64 {
    30
}

impl Default for ChartsConfig {
    fn default() -> Self {
        Self {
            render_url: default_render_url(),
            output_dir: default_charts_dir(),
            timeout_secs: default_render_timeout_secs(),
        }
    }
}

/// Scheduler engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between due-trigger checks.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
}

fn default_tick_secs() -> u64 {
    30
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
        }
    }
}

/// History store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_db")]
    pub db_path: String,
}

fn default_history_db() -> String {
    "~/.briefcast/history.db".into()
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            db_path: default_history_db(),
        }
    }
}

/// Publishing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default = "default_publish_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_publish_timeout_secs() -> u64 {
    30
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_publish_timeout_secs(),
        }
    }
}

// ─────────────────────────────────────────────────────────────
// Tenant profiles
// ─────────────────────────────────────────────────────────────

/// One tenant's credential references, enabled platforms, and schedule
/// defaults. Loaded from `tenants.toml` (`[[tenant]]` array).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantProfile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// API key for the generation endpoint.
    #[serde(default)]
    pub generation_api_key: String,
    /// API key for the research endpoint. Empty = research skipped.
    #[serde(default)]
    pub research_api_key: String,
    #[serde(default)]
    pub x: Option<XCredentials>,
    #[serde(default)]
    pub linkedin: Option<LinkedInCredentials>,
    /// "HH:MM" strings, interpreted in `timezone`.
    #[serde(default = "default_schedule_times")]
    pub schedule_times: Vec<String>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_schedule_times() -> Vec<String> {
    vec!["09:00".into()]
}
fn default_timezone() -> String {
    "America/Los_Angeles".into()
}

/// OAuth 1.0a user-context credentials for X.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// LinkedIn member posting credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedInCredentials {
    pub access_token: String,
    pub person_urn: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl TenantProfile {
    /// Platforms this tenant has credentials for and has not disabled.
    pub fn enabled_platforms(&self) -> Vec<Platform> {
        let mut platforms = Vec::new();
        if self.x.as_ref().is_some_and(|c| c.enabled) {
            platforms.push(Platform::X);
        }
        if self.linkedin.as_ref().is_some_and(|c| c.enabled) {
            platforms.push(Platform::LinkedIn);
        }
        platforms
    }

    /// Whether the tenant can be started at all (agent prerequisite).
    pub fn has_prerequisites(&self) -> bool {
        !self.generation_api_key.is_empty() && !self.enabled_platforms().is_empty()
    }
}

/// The tenants file (`[[tenant]]` array of profiles).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TenantsFile {
    #[serde(default, rename = "tenant")]
    pub tenants: Vec<TenantProfile>,
}

impl TenantsFile {
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BriefcastError::config(format!("Failed to read tenants file: {e}")))?;
        let file: Self = toml::from_str(&content)
            .map_err(|e| BriefcastError::config(format!("Failed to parse tenants file: {e}")))?;
        Ok(file)
    }

    pub fn default_path() -> PathBuf {
        BriefcastConfig::home_dir().join("tenants.toml")
    }

    pub fn get(&self, id: &str) -> Option<&TenantProfile> {
        self.tenants.iter().find(|t| t.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BriefcastConfig::default();
        assert_eq!(config.sources.min_hn_score, 50);
        assert_eq!(config.sources.max_hn_stories, 30);
        assert_eq!(config.sources.rss_feeds.len(), 2);
        assert_eq!(config.sources.fetch_timeout_secs, 10);
        assert_eq!(config.scheduler.tick_secs, 30);
    }

    #[test]
    fn test_parse_tenants_toml() {
        let toml_str = r#"
[[tenant]]
id = "acme"
generation_api_key = "sk-test"
schedule_times = ["09:00", "18:00"]
timezone = "Europe/Berlin"

[tenant.x]
api_key = "k"
api_secret = "s"
access_token = "t"
access_token_secret = "ts"

[[tenant]]
id = "empty"
"#;
        let file: TenantsFile = toml::from_str(toml_str).unwrap();
        assert_eq!(file.tenants.len(), 2);

        let acme = file.get("acme").unwrap();
        assert_eq!(acme.schedule_times, vec!["09:00", "18:00"]);
        assert_eq!(acme.enabled_platforms(), vec![Platform::X]);
        assert!(acme.has_prerequisites());

        let empty = file.get("empty").unwrap();
        assert!(empty.enabled_platforms().is_empty());
        assert!(!empty.has_prerequisites());
    }

    #[test]
    fn test_disabled_platform_excluded() {
        let toml_str = r#"
[[tenant]]
id = "t"
generation_api_key = "sk"

[tenant.linkedin]
access_token = "tok"
person_urn = "urn123"
enabled = false
"#;
        let file: TenantsFile = toml::from_str(toml_str).unwrap();
        let t = file.get("t").unwrap();
        assert!(t.enabled_platforms().is_empty());
        assert!(!t.has_prerequisites());
    }
}
