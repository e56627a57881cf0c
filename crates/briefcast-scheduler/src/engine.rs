//! Scheduler engine — the tick loop that checks and fires due triggers.
//! Firing spawns the pipeline callback and never waits on it, so one
//! tenant's slow run cannot delay another tenant's trigger.

use std::sync::Arc;

use briefcast_core::types::SlotKey;

use crate::clock::Clock;
use crate::registry::ScheduleRegistry;
use crate::runtime::AgentRuntime;

pub struct SchedulerEngine {
    registry: Arc<ScheduleRegistry>,
    runtime: Arc<AgentRuntime>,
    clock: Arc<dyn Clock>,
}

impl SchedulerEngine {
    pub fn new(
        registry: Arc<ScheduleRegistry>,
        runtime: Arc<AgentRuntime>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            runtime,
            clock,
        }
    }

    /// One check: collect due triggers and gate them on the active set.
    /// Returns the slot keys that should execute now.
    pub fn tick(&self) -> Vec<SlotKey> {
        let now = self.clock.now();
        self.registry
            .take_due(now)
            .into_iter()
            .filter(|key| {
                if self.runtime.is_active(&key.tenant) {
                    tracing::info!("Trigger fired: {:?}", key);
                    true
                } else {
                    tracing::info!(
                        "Agent for tenant {} is stopped, skipping trigger",
                        key.tenant
                    );
                    false
                }
            })
            .collect()
    }
}

/// Run the scheduler loop. Each fired trigger spawns `on_fire` as its own
/// task; per-tenant serialization is the callback's concern (the
/// orchestrator holds a per-tenant execution lock).
pub async fn spawn_scheduler<F, Fut>(engine: Arc<SchedulerEngine>, tick_secs: u64, on_fire: F)
where
    F: Fn(SlotKey) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    tracing::info!("Scheduler started (check every {tick_secs}s)");
    let on_fire = Arc::new(on_fire);
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(tick_secs));

    loop {
        interval.tick().await;
        for key in engine.tick() {
            let on_fire = on_fire.clone();
            tokio::spawn(async move {
                on_fire(key).await;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use briefcast_core::types::TenantId;
    use chrono::TimeZone;

    fn setup() -> (Arc<ScheduleRegistry>, Arc<AgentRuntime>, Arc<FixedClock>, SchedulerEngine) {
        let clock = Arc::new(FixedClock::new(
            chrono::Utc.with_ymd_and_hms(2026, 3, 2, 8, 59, 0).unwrap(),
        ));
        let registry = Arc::new(ScheduleRegistry::new(clock.clone()));
        let runtime = Arc::new(AgentRuntime::new());
        let engine = SchedulerEngine::new(registry.clone(), runtime.clone(), clock.clone());
        (registry, runtime, clock, engine)
    }

    #[test]
    fn test_inactive_tenant_gated() {
        let (registry, runtime, clock, engine) = setup();
        let tenant = TenantId::new("t1");
        registry
            .upsert(&tenant, &["09:00".to_string()], "UTC")
            .unwrap();

        clock.set(chrono::Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap());
        // Not started: trigger consumed, nothing fires.
        assert!(engine.tick().is_empty());

        // Next day, started: fires.
        runtime.start(&tenant);
        clock.set(chrono::Utc.with_ymd_and_hms(2026, 3, 3, 9, 0, 0).unwrap());
        let fired = engine.tick();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].tenant, tenant);
    }

    #[test]
    fn test_one_tenant_fire_does_not_gate_another() {
        let (registry, runtime, clock, engine) = setup();
        let t1 = TenantId::new("t1");
        let t2 = TenantId::new("t2");
        registry.upsert(&t1, &["09:00".to_string()], "UTC").unwrap();
        registry.upsert(&t2, &["09:00".to_string()], "UTC").unwrap();
        runtime.start(&t1);
        runtime.start(&t2);

        clock.set(chrono::Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap());
        let fired = engine.tick();
        assert_eq!(fired.len(), 2);
    }
}
