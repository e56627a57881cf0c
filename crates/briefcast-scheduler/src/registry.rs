//! Schedule registry — the set of recurring triggers, keyed by
//! (tenant, slot), with next-fire times computed by calendar arithmetic
//! in each entry's own timezone.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use briefcast_core::error::{BriefcastError, Result};
use briefcast_core::types::{SlotKey, TenantId};

use crate::clock::Clock;
use crate::store::ScheduleStore;

/// One recurring trigger: a wall-clock time of day in a timezone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub key: SlotKey,
    pub hour: u32,
    pub minute: u32,
    pub timezone: Tz,
    /// Derived — recomputed after each fire and on load, never persisted.
    #[serde(skip)]
    pub next_fire: Option<DateTime<Utc>>,
}

impl ScheduleEntry {
    /// Next occurrence of this entry's wall-clock time strictly after
    /// `after`. DST-ambiguous local times resolve to the earliest
    /// mapping; local times skipped by a DST gap roll to the next day.
    pub fn next_fire_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local_after = after.with_timezone(&self.timezone);
        let mut date: NaiveDate = local_after.date_naive();

        // A few days of slack covers any DST gap.
        for _ in 0..4 {
            if let Some(naive) = date.and_hms_opt(self.hour, self.minute, 0) {
                if let Some(dt) = self
                    .timezone
                    .from_local_datetime(&naive)
                    .earliest()
                {
                    let utc = dt.with_timezone(&Utc);
                    if utc > after {
                        return Some(utc);
                    }
                }
            }
            date = date.succ_opt()?;
        }
        None
    }
}

/// Strict 24-hour "HH:MM" parsing.
pub fn parse_hhmm(s: &str) -> Result<(u32, u32)> {
    let invalid = || BriefcastError::InvalidTimeFormat(s.to_string());
    let (h, m) = s.split_once(':').ok_or_else(invalid)?;
    let hour: u32 = h.trim().parse().map_err(|_| invalid())?;
    let minute: u32 = m.trim().parse().map_err(|_| invalid())?;
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    Ok((hour, minute))
}

/// The process-wide trigger set. Writes serialize behind the lock;
/// reads are concurrent.
pub struct ScheduleRegistry {
    entries: RwLock<BTreeMap<SlotKey, ScheduleEntry>>,
    clock: Arc<dyn Clock>,
    store: Option<ScheduleStore>,
}

impl ScheduleRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            clock,
            store: None,
        }
    }

    /// Create with persistence; existing entries load immediately and get
    /// fresh next-fire times.
    pub fn with_store(clock: Arc<dyn Clock>, store: ScheduleStore) -> Self {
        let now = clock.now();
        let mut entries = BTreeMap::new();
        for mut entry in store.load() {
            entry.next_fire = entry.next_fire_after(now);
            entries.insert(entry.key.clone(), entry);
        }
        Self {
            entries: RwLock::new(entries),
            clock,
            store: Some(store),
        }
    }

    /// Atomically replace a tenant's entire schedule. Parsing is
    /// all-or-nothing: one bad time string leaves the old set untouched.
    pub fn upsert(&self, tenant: &TenantId, times: &[String], timezone: &str) -> Result<()> {
        let tz: Tz = timezone
            .parse()
            .map_err(|_| BriefcastError::Scheduler(format!("Unknown timezone: {timezone}")))?;

        let mut parsed = Vec::with_capacity(times.len());
        for time in times {
            parsed.push(parse_hhmm(time)?);
        }

        let now = self.clock.now();
        let mut entries = self.entries.write().expect("registry lock poisoned");
        entries.retain(|key, _| key.tenant != *tenant);
        for (slot, (hour, minute)) in parsed.into_iter().enumerate() {
            let key = SlotKey::new(tenant.clone(), slot);
            let mut entry = ScheduleEntry {
                key: key.clone(),
                hour,
                minute,
                timezone: tz,
                next_fire: None,
            };
            entry.next_fire = entry.next_fire_after(now);
            tracing::info!(
                "Scheduled {key:?} at {hour:02}:{minute:02} ({tz}), next fire {:?}",
                entry.next_fire
            );
            entries.insert(key, entry);
        }
        self.save(&entries);
        Ok(())
    }

    /// Delete all of a tenant's entries. Idempotent.
    pub fn remove(&self, tenant: &TenantId) {
        let mut entries = self.entries.write().expect("registry lock poisoned");
        entries.retain(|key, _| key.tenant != *tenant);
        self.save(&entries);
    }

    /// Soonest next fire across the tenant's entries.
    pub fn next_fire_time(&self, tenant: &TenantId) -> Option<DateTime<Utc>> {
        self.entries
            .read()
            .expect("registry lock poisoned")
            .values()
            .filter(|e| e.key.tenant == *tenant)
            .filter_map(|e| e.next_fire)
            .min()
    }

    /// Collect entries due at `now` and recompute their next fire.
    /// An in-flight trigger is unaffected by a concurrent upsert: once
    /// taken, it runs to completion with the old definition.
    pub fn take_due(&self, now: DateTime<Utc>) -> Vec<SlotKey> {
        let mut due = Vec::new();
        let mut entries = self.entries.write().expect("registry lock poisoned");
        for entry in entries.values_mut() {
            if entry.next_fire.is_some_and(|t| t <= now) {
                due.push(entry.key.clone());
                entry.next_fire = entry.next_fire_after(now);
            }
        }
        due
    }

    /// Snapshot of a tenant's entries, slot order.
    pub fn entries_for(&self, tenant: &TenantId) -> Vec<ScheduleEntry> {
        self.entries
            .read()
            .expect("registry lock poisoned")
            .values()
            .filter(|e| e.key.tenant == *tenant)
            .cloned()
            .collect()
    }

    pub fn entry_count(&self, tenant: &TenantId) -> usize {
        self.entries
            .read()
            .expect("registry lock poisoned")
            .keys()
            .filter(|k| k.tenant == *tenant)
            .count()
    }

    fn save(&self, entries: &BTreeMap<SlotKey, ScheduleEntry>) {
        if let Some(store) = &self.store {
            let all: Vec<&ScheduleEntry> = entries.values().collect();
            if let Err(e) = store.save(&all) {
                tracing::warn!("Failed to save schedules: {e}");
            }
        }
    }

    /// Make time-of-day windows visible for status displays.
    pub fn describe(&self, tenant: &TenantId) -> Vec<String> {
        self.entries_for(tenant)
            .iter()
            .map(|e| format!("{:02}:{:02} {}", e.hour, e.minute, e.timezone))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;

    fn fixed(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn registry_at(now: DateTime<Utc>) -> (ScheduleRegistry, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(now));
        (ScheduleRegistry::new(clock.clone()), clock)
    }

    #[test]
    fn test_parse_hhmm() {
        assert_eq!(parse_hhmm("09:00").unwrap(), (9, 0));
        assert_eq!(parse_hhmm("23:59").unwrap(), (23, 59));
        assert!(parse_hhmm("24:00").is_err());
        assert!(parse_hhmm("12:60").is_err());
        assert!(parse_hhmm("noon").is_err());
        assert!(parse_hhmm("12").is_err());
    }

    #[test]
    fn test_upsert_idempotent() {
        let (registry, _) = registry_at(fixed(2026, 3, 2, 12, 0));
        let tenant = TenantId::new("t1");
        let times = vec!["09:00".to_string(), "18:00".to_string()];

        registry.upsert(&tenant, &times, "UTC").unwrap();
        registry.upsert(&tenant, &times, "UTC").unwrap();
        assert_eq!(registry.entry_count(&tenant), 2);
    }

    #[test]
    fn test_upsert_atomic_on_bad_time() {
        let (registry, _) = registry_at(fixed(2026, 3, 2, 12, 0));
        let tenant = TenantId::new("t1");
        registry
            .upsert(&tenant, &["09:00".to_string()], "UTC")
            .unwrap();

        let result = registry.upsert(
            &tenant,
            &["10:00".to_string(), "25:99".to_string()],
            "UTC",
        );
        assert!(matches!(result, Err(BriefcastError::InvalidTimeFormat(_))));
        // Old set survives a rejected update.
        assert_eq!(registry.entry_count(&tenant), 1);
        let entries = registry.entries_for(&tenant);
        assert_eq!((entries[0].hour, entries[0].minute), (9, 0));
    }

    #[test]
    fn test_next_fire_same_day_and_rollover() {
        let (registry, _) = registry_at(fixed(2026, 3, 2, 12, 0));
        let tenant = TenantId::new("t1");
        registry
            .upsert(&tenant, &["18:00".to_string()], "UTC")
            .unwrap();
        assert_eq!(
            registry.next_fire_time(&tenant).unwrap(),
            fixed(2026, 3, 2, 18, 0)
        );

        // A time already past today rolls to tomorrow.
        registry
            .upsert(&tenant, &["09:00".to_string()], "UTC")
            .unwrap();
        assert_eq!(
            registry.next_fire_time(&tenant).unwrap(),
            fixed(2026, 3, 3, 9, 0)
        );
    }

    #[test]
    fn test_next_fire_respects_timezone() {
        // 2026-03-02 12:00 UTC is 04:00 in Los Angeles (PST, UTC-8).
        let (registry, _) = registry_at(fixed(2026, 3, 2, 12, 0));
        let tenant = TenantId::new("t1");
        registry
            .upsert(&tenant, &["09:00".to_string()], "America/Los_Angeles")
            .unwrap();
        // 09:00 PST = 17:00 UTC, still ahead today.
        assert_eq!(
            registry.next_fire_time(&tenant).unwrap(),
            fixed(2026, 3, 2, 17, 0)
        );
    }

    #[test]
    fn test_soonest_across_entries() {
        let (registry, _) = registry_at(fixed(2026, 3, 2, 12, 0));
        let tenant = TenantId::new("t1");
        registry
            .upsert(
                &tenant,
                &["20:00".to_string(), "14:30".to_string()],
                "UTC",
            )
            .unwrap();
        assert_eq!(
            registry.next_fire_time(&tenant).unwrap(),
            fixed(2026, 3, 2, 14, 30)
        );
    }

    #[test]
    fn test_take_due_recomputes() {
        let (registry, clock) = registry_at(fixed(2026, 3, 2, 8, 59));
        let tenant = TenantId::new("t1");
        registry
            .upsert(&tenant, &["09:00".to_string()], "UTC")
            .unwrap();

        assert!(registry.take_due(clock.now()).is_empty());

        clock.set(fixed(2026, 3, 2, 9, 0));
        let due = registry.take_due(clock.now());
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].tenant, tenant);

        // Recomputed to tomorrow; not due again this tick.
        assert!(registry.take_due(clock.now()).is_empty());
        assert_eq!(
            registry.next_fire_time(&tenant).unwrap(),
            fixed(2026, 3, 3, 9, 0)
        );
    }

    #[test]
    fn test_remove_idempotent() {
        let (registry, _) = registry_at(fixed(2026, 3, 2, 12, 0));
        let tenant = TenantId::new("t1");
        registry
            .upsert(&tenant, &["09:00".to_string()], "UTC")
            .unwrap();
        registry.remove(&tenant);
        registry.remove(&tenant);
        assert_eq!(registry.entry_count(&tenant), 0);
        assert!(registry.next_fire_time(&tenant).is_none());
    }

    #[test]
    fn test_unknown_timezone_rejected() {
        let (registry, _) = registry_at(fixed(2026, 3, 2, 12, 0));
        let result = registry.upsert(
            &TenantId::new("t1"),
            &["09:00".to_string()],
            "Mars/Olympus_Mons",
        );
        assert!(matches!(result, Err(BriefcastError::Scheduler(_))));
    }

    #[test]
    fn test_dst_gap_rolls_forward() {
        // US spring-forward 2026: March 8, 02:00-03:00 does not exist in
        // Los Angeles. A 02:30 trigger evaluated just before the gap must
        // land on a later valid day rather than fire twice or vanish.
        let entry = ScheduleEntry {
            key: SlotKey::new(TenantId::new("t"), 0),
            hour: 2,
            minute: 30,
            timezone: chrono_tz::America::Los_Angeles,
            next_fire: None,
        };
        // 2026-03-08 09:00 UTC = 01:00 PST, just before the jump.
        let after = fixed(2026, 3, 8, 9, 0);
        let next = entry.next_fire_after(after).unwrap();
        // 02:30 local does not exist on March 8; next valid is March 9
        // 02:30 PDT = 09:30 UTC.
        assert_eq!(next, fixed(2026, 3, 9, 9, 30));
    }
}
