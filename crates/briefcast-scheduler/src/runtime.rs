//! Active-agent membership — which tenants are currently running,
//! independent of their schedule configuration. Pausing a tenant flips
//! membership only; its triggers stay installed.

use std::collections::HashSet;
use std::sync::RwLock;

use briefcast_core::types::TenantId;

/// Process-wide active set. Created at orchestrator startup, torn down
/// with it. Writes serialize behind the lock; reads are concurrent.
pub struct AgentRuntime {
    active: RwLock<HashSet<TenantId>>,
}

impl AgentRuntime {
    pub fn new() -> Self {
        Self {
            active: RwLock::new(HashSet::new()),
        }
    }

    /// Add membership. Credential prerequisites are the caller's job.
    pub fn start(&self, tenant: &TenantId) {
        let inserted = self
            .active
            .write()
            .expect("runtime lock poisoned")
            .insert(tenant.clone());
        if inserted {
            tracing::info!("Agent started for tenant {tenant}");
        }
    }

    /// Remove membership. Does not cancel an execution already running.
    pub fn stop(&self, tenant: &TenantId) {
        let removed = self
            .active
            .write()
            .expect("runtime lock poisoned")
            .remove(tenant);
        if removed {
            tracing::info!("Agent stopped for tenant {tenant}");
        }
    }

    pub fn is_active(&self, tenant: &TenantId) -> bool {
        self.active
            .read()
            .expect("runtime lock poisoned")
            .contains(tenant)
    }

    pub fn active_tenants(&self) -> Vec<TenantId> {
        let mut tenants: Vec<TenantId> = self
            .active
            .read()
            .expect("runtime lock poisoned")
            .iter()
            .cloned()
            .collect();
        tenants.sort();
        tenants
    }
}

impl Default for AgentRuntime {
    fn default() -> Self {
        Self::new()
    }
}
