//! Orchestrator facade — the surface the CLI (and anything else) talks
//! to: schedule management, agent control with prerequisite checks,
//! history queries, and on-demand runs. Owns the per-tenant execution
//! lock so a manual "post now" and a scheduled fire for the same tenant
//! serialize instead of double-posting.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};

use briefcast_core::config::BriefcastConfig;
use briefcast_core::config::TenantsFile;
use briefcast_core::error::{BriefcastError, Result};
use briefcast_core::types::{PipelineRun, PublishAttempt, RunOverrides, SlotKey, TenantId};
use briefcast_chart::QuickChartRenderer;
use briefcast_generation::{ChatClient, ChatGenerationClient, Dialect, SonarResearchClient};
use briefcast_history::HistoryStore;
use briefcast_publish::{LinkedInPublisher, PublishClient, PublishCoordinator, XPublisher};
use briefcast_scheduler::{AgentRuntime, ScheduleRegistry};
use briefcast_sources::{ContentSource, HackerNewsSource, RssSource};

use crate::executor::{PipelineExecutor, RunReport};

pub struct Orchestrator {
    config: BriefcastConfig,
    tenants: TenantsFile,
    registry: Arc<ScheduleRegistry>,
    runtime: Arc<AgentRuntime>,
    history: Arc<HistoryStore>,
    /// One execution lock per tenant: at most one concurrent run each.
    locks: Mutex<HashMap<TenantId, Arc<tokio::sync::Mutex<()>>>>,
}

impl Orchestrator {
    pub fn new(
        config: BriefcastConfig,
        tenants: TenantsFile,
        registry: Arc<ScheduleRegistry>,
        runtime: Arc<AgentRuntime>,
        history: Arc<HistoryStore>,
    ) -> Self {
        Self {
            config,
            tenants,
            registry,
            runtime,
            history,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &BriefcastConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ScheduleRegistry> {
        &self.registry
    }

    pub fn runtime(&self) -> &Arc<AgentRuntime> {
        &self.runtime
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    fn profile(&self, tenant: &TenantId) -> Result<&briefcast_core::TenantProfile> {
        self.tenants
            .get(tenant.as_str())
            .ok_or_else(|| BriefcastError::Config(format!("Unknown tenant: {tenant}")))
    }

    // ── agent control ─────────────────────────────────────────

    /// Start a tenant's agent. The prerequisite check lives here, not in
    /// the runtime itself: a generation credential and at least one
    /// enabled platform are required.
    pub fn start_agent(&self, tenant: &TenantId) -> Result<()> {
        let profile = self.profile(tenant)?;
        if profile.generation_api_key.is_empty() {
            return Err(BriefcastError::MissingPrerequisite(format!(
                "tenant {tenant} has no generation credential"
            )));
        }
        if profile.enabled_platforms().is_empty() {
            return Err(BriefcastError::MissingPrerequisite(format!(
                "tenant {tenant} has no enabled publish platform"
            )));
        }

        // Install the profile's default schedule unless one was set
        // explicitly via set_schedule.
        if self.registry.entry_count(tenant) == 0 && !profile.schedule_times.is_empty() {
            self.registry
                .upsert(tenant, &profile.schedule_times, &profile.timezone)?;
        }

        self.runtime.start(tenant);
        Ok(())
    }

    /// Pause a tenant. Triggers stay installed; only membership flips.
    /// An execution already past the gate runs to completion.
    pub fn stop_agent(&self, tenant: &TenantId) {
        self.runtime.stop(tenant);
    }

    pub fn is_agent_active(&self, tenant: &TenantId) -> bool {
        self.runtime.is_active(tenant)
    }

    /// Start every tenant that can run: prerequisites met and at least
    /// one schedule time. Called on serve boot.
    pub fn start_all_eligible(&self) -> usize {
        let mut started = 0;
        for profile in &self.tenants.tenants {
            let tenant = TenantId::new(profile.id.clone());
            if profile.has_prerequisites() && !profile.schedule_times.is_empty() {
                match self.start_agent(&tenant) {
                    Ok(()) => started += 1,
                    Err(e) => tracing::warn!("Cannot start agent for tenant {tenant}: {e}"),
                }
            }
        }
        started
    }

    // ── schedule management ───────────────────────────────────

    pub fn set_schedule(&self, tenant: &TenantId, times: &[String], timezone: &str) -> Result<()> {
        self.registry.upsert(tenant, times, timezone)
    }

    pub fn clear_schedule(&self, tenant: &TenantId) {
        self.registry.remove(tenant);
    }

    pub fn next_fire(&self, tenant: &TenantId) -> Option<DateTime<Utc>> {
        self.registry.next_fire_time(tenant)
    }

    // ── history queries ───────────────────────────────────────

    pub fn recent_runs(&self, tenant: &TenantId, limit: usize) -> Result<Vec<PipelineRun>> {
        self.history.runs_by_tenant(tenant, limit)
    }

    pub fn attempts(&self, run_id: &str) -> Result<Vec<PublishAttempt>> {
        self.history.attempts_by_run(run_id)
    }

    // ── execution ─────────────────────────────────────────────

    /// Entry point for the scheduler engine's fire callback.
    pub async fn run_scheduled(&self, key: SlotKey) {
        tracing::info!("Running scheduled pipeline for {:?}", key);
        match self.run_now(&key.tenant, RunOverrides::default()).await {
            Ok(report) => {
                tracing::info!(
                    "Scheduled run for {} finished: {:?}",
                    key.tenant,
                    report.run.outcome
                );
            }
            Err(e) => {
                // Reachable only for setup errors (unknown tenant,
                // missing profile); pipeline failures are recorded runs.
                tracing::error!("Scheduled run for {} could not start: {e}", key.tenant);
            }
        }
    }

    /// Run the pipeline once for a tenant, outside or inside the
    /// schedule. Serialized per tenant via the execution lock.
    pub async fn run_now(&self, tenant: &TenantId, overrides: RunOverrides) -> Result<RunReport> {
        let profile = self.profile(tenant)?;
        let executor = self.build_executor(profile)?;

        let lock = self.tenant_lock(tenant);
        let _guard = lock.lock().await;
        Ok(executor.run(tenant, &overrides).await)
    }

    fn tenant_lock(&self, tenant: &TenantId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().expect("lock table poisoned");
        locks
            .entry(tenant.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Assemble the concrete clients for one tenant's run.
    fn build_executor(&self, profile: &briefcast_core::TenantProfile) -> Result<PipelineExecutor> {
        let sources_cfg = &self.config.sources;
        let mut sources: Vec<Arc<dyn ContentSource>> =
            vec![Arc::new(HackerNewsSource::new(sources_cfg))];
        for feed in &sources_cfg.rss_feeds {
            sources.push(Arc::new(RssSource::new(
                feed.name.as_str(),
                feed.url.as_str(),
            )));
        }

        let generation_cfg = &self.config.generation;
        let generator = ChatGenerationClient::new(ChatClient::new(
            generation_cfg.endpoint.as_str(),
            profile.generation_api_key.as_str(),
            generation_cfg.model.as_str(),
            generation_cfg.max_tokens,
            Duration::from_secs(generation_cfg.timeout_secs),
            Dialect::AnthropicMessages,
        ));

        let research_cfg = &self.config.research;
        let research_chat = (!profile.research_api_key.is_empty()).then(|| {
            ChatClient::new(
                research_cfg.endpoint.as_str(),
                profile.research_api_key.as_str(),
                research_cfg.model.as_str(),
                generation_cfg.max_tokens,
                Duration::from_secs(research_cfg.timeout_secs),
                Dialect::OpenAiChat,
            )
        });
        let researcher = SonarResearchClient::new(research_chat);

        let renderer = QuickChartRenderer::new(&self.config.charts);

        let publish_timeout = Duration::from_secs(self.config.publish.timeout_secs);
        let mut publishers: Vec<Arc<dyn PublishClient>> = Vec::new();
        if let Some(creds) = profile.x.as_ref().filter(|c| c.enabled) {
            publishers.push(Arc::new(XPublisher::new(creds, publish_timeout)));
        }
        if let Some(creds) = profile.linkedin.as_ref().filter(|c| c.enabled) {
            publishers.push(Arc::new(LinkedInPublisher::new(creds, publish_timeout)));
        }

        Ok(PipelineExecutor::new(
            sources,
            Arc::new(generator),
            Arc::new(researcher),
            Arc::new(renderer),
            PublishCoordinator::new(publishers),
            self.history.clone(),
            Duration::from_secs(sources_cfg.fetch_timeout_secs),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use briefcast_core::config::{TenantProfile, XCredentials};
    use briefcast_scheduler::{FixedClock, SystemClock};
    use chrono::TimeZone;

    fn profile(id: &str, with_creds: bool) -> TenantProfile {
        TenantProfile {
            id: id.into(),
            name: String::new(),
            generation_api_key: if with_creds { "sk-test".into() } else { String::new() },
            research_api_key: String::new(),
            x: with_creds.then(|| XCredentials {
                api_key: "k".into(),
                api_secret: "s".into(),
                access_token: "t".into(),
                access_token_secret: "ts".into(),
                enabled: true,
            }),
            linkedin: None,
            schedule_times: vec!["09:00".into()],
            timezone: "UTC".into(),
        }
    }

    fn orchestrator(profiles: Vec<TenantProfile>) -> (Orchestrator, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let history = Arc::new(HistoryStore::open(&dir.path().join("history.db")).unwrap());
        let clock = Arc::new(SystemClock);
        let orch = Orchestrator::new(
            BriefcastConfig::default(),
            TenantsFile { tenants: profiles },
            Arc::new(ScheduleRegistry::new(clock)),
            Arc::new(AgentRuntime::new()),
            history,
        );
        (orch, dir)
    }

    #[test]
    fn test_start_agent_requires_credentials() {
        let (orch, _dir) = orchestrator(vec![profile("bare", false)]);
        let result = orch.start_agent(&TenantId::new("bare"));
        assert!(matches!(
            result,
            Err(BriefcastError::MissingPrerequisite(_))
        ));
        assert!(!orch.is_agent_active(&TenantId::new("bare")));
    }

    #[test]
    fn test_start_agent_unknown_tenant() {
        let (orch, _dir) = orchestrator(vec![]);
        assert!(orch.start_agent(&TenantId::new("ghost")).is_err());
    }

    #[test]
    fn test_start_installs_default_schedule() {
        let (orch, _dir) = orchestrator(vec![profile("acme", true)]);
        let tenant = TenantId::new("acme");

        orch.start_agent(&tenant).unwrap();
        assert!(orch.is_agent_active(&tenant));
        assert!(orch.next_fire(&tenant).is_some());
    }

    #[test]
    fn test_explicit_schedule_survives_start() {
        let (orch, _dir) = orchestrator(vec![profile("acme", true)]);
        let tenant = TenantId::new("acme");

        orch.set_schedule(&tenant, &["22:15".to_string()], "UTC")
            .unwrap();
        orch.start_agent(&tenant).unwrap();

        // start_agent must not clobber the explicit 22:15 schedule with
        // the profile default.
        let entries = orch.registry().entries_for(&tenant);
        assert_eq!(entries.len(), 1);
        assert_eq!((entries[0].hour, entries[0].minute), (22, 15));
    }

    #[test]
    fn test_stop_keeps_triggers_installed() {
        let (orch, _dir) = orchestrator(vec![profile("acme", true)]);
        let tenant = TenantId::new("acme");
        orch.start_agent(&tenant).unwrap();
        orch.stop_agent(&tenant);

        assert!(!orch.is_agent_active(&tenant));
        // Pausing flips membership only; the schedule survives.
        assert!(orch.next_fire(&tenant).is_some());
    }

    #[test]
    fn test_start_all_eligible_skips_bare_tenants() {
        let (orch, _dir) = orchestrator(vec![profile("a", true), profile("b", false)]);
        assert_eq!(orch.start_all_eligible(), 1);
        assert!(orch.is_agent_active(&TenantId::new("a")));
        assert!(!orch.is_agent_active(&TenantId::new("b")));
    }

    #[tokio::test]
    async fn test_tenant_lock_serializes_runs() {
        let (orch, _dir) = orchestrator(vec![profile("acme", true)]);
        let tenant = TenantId::new("acme");

        let lock = orch.tenant_lock(&tenant);
        let guard = lock.lock().await;

        // The same tenant's lock is contended while a run is in flight.
        let lock2 = orch.tenant_lock(&tenant);
        assert!(lock2.try_lock().is_err());

        // A different tenant is unaffected.
        let other = orch.tenant_lock(&TenantId::new("other"));
        assert!(other.try_lock().is_ok());

        drop(guard);
        assert!(lock2.try_lock().is_ok());
    }

    #[test]
    fn test_gate_skips_stopped_tenant() {
        // Registry + runtime + engine wired the way serve does it.
        let clock = Arc::new(FixedClock::new(
            chrono::Utc.with_ymd_and_hms(2026, 3, 2, 8, 59, 0).unwrap(),
        ));
        let registry = Arc::new(ScheduleRegistry::new(clock.clone()));
        let runtime = Arc::new(AgentRuntime::new());
        let engine = briefcast_scheduler::SchedulerEngine::new(
            registry.clone(),
            runtime.clone(),
            clock.clone(),
        );

        let tenant = TenantId::new("acme");
        registry
            .upsert(&tenant, &["09:00".to_string()], "UTC")
            .unwrap();
        clock.set(chrono::Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap());
        assert!(engine.tick().is_empty());
    }
}
