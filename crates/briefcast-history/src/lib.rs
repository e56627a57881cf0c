//! # Briefcast History
//!
//! Append-only SQLite log of pipeline runs and publish attempts,
//! queryable by tenant. Feeds the recency window used to keep story
//! selection away from recently covered topics, and the history queries
//! surfaced by the CLI.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};

use briefcast_core::error::{BriefcastError, Result};
use briefcast_core::types::{
    AttemptStatus, PipelineRun, Platform, PublishAttempt, RunOutcome, TenantId,
};

pub struct HistoryStore {
    conn: Mutex<Connection>,
}

/// Shared SELECT column list for run queries.
const RUN_SELECT: &str =
    "SELECT id, tenant_id, started_at, finished_at, outcome, story_title, story_url, error FROM runs";

fn row_to_run(row: &rusqlite::Row) -> rusqlite::Result<PipelineRun> {
    Ok(PipelineRun {
        id: row.get(0)?,
        tenant: TenantId::new(row.get::<_, String>(1)?),
        started_at: parse_ts(&row.get::<_, String>(2)?),
        finished_at: parse_ts(&row.get::<_, String>(3)?),
        outcome: RunOutcome::parse(&row.get::<_, String>(4)?).unwrap_or(RunOutcome::Failed),
        story_title: row.get(5)?,
        story_url: row.get(6)?,
        error: row.get(7)?,
    })
}

fn row_to_attempt(row: &rusqlite::Row) -> rusqlite::Result<PublishAttempt> {
    Ok(PublishAttempt {
        id: row.get(0)?,
        run_id: row.get(1)?,
        platform: Platform::parse(&row.get::<_, String>(2)?).unwrap_or(Platform::X),
        status: AttemptStatus::parse(&row.get::<_, String>(3)?).unwrap_or(AttemptStatus::Failed),
        post_id: row.get(4)?,
        error: row.get(5)?,
        attempted_at: parse_ts(&row.get::<_, String>(6)?),
    })
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_default()
}

impl HistoryStore {
    /// Open or create the history database.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .map_err(|e| BriefcastError::history(format!("DB open error: {e}")))?;

        // WAL allows concurrent readers while one tenant execution commits.
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(|e| BriefcastError::history(format!("DB pragma error: {e}")))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        self.lock()?
            .execute_batch(
                "
            CREATE TABLE IF NOT EXISTS runs (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                started_at TEXT NOT NULL,
                finished_at TEXT NOT NULL,
                outcome TEXT NOT NULL,
                story_title TEXT,
                story_url TEXT,
                error TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_runs_tenant_time
                ON runs(tenant_id, finished_at);

            CREATE TABLE IF NOT EXISTS publish_attempts (
                id TEXT PRIMARY KEY,
                run_id TEXT NOT NULL,
                platform TEXT NOT NULL,
                status TEXT NOT NULL,
                post_id TEXT,
                error TEXT,
                attempted_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_attempts_run
                ON publish_attempts(run_id);
            ",
            )
            .map_err(|e| BriefcastError::history(format!("DB migrate error: {e}")))?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| BriefcastError::history(format!("DB lock poisoned: {e}")))
    }

    /// Append one finished run. Idempotent on run id.
    pub fn record_run(&self, run: &PipelineRun) -> Result<()> {
        self.lock()?
            .execute(
                "INSERT OR REPLACE INTO runs
                 (id, tenant_id, started_at, finished_at, outcome, story_title, story_url, error)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    run.id,
                    run.tenant.as_str(),
                    run.started_at.to_rfc3339(),
                    run.finished_at.to_rfc3339(),
                    run.outcome.as_str(),
                    run.story_title,
                    run.story_url,
                    run.error,
                ],
            )
            .map_err(|e| BriefcastError::history(format!("record_run: {e}")))?;
        Ok(())
    }

    /// Append one publish attempt.
    pub fn record_attempt(&self, attempt: &PublishAttempt) -> Result<()> {
        self.lock()?
            .execute(
                "INSERT OR REPLACE INTO publish_attempts
                 (id, run_id, platform, status, post_id, error, attempted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    attempt.id,
                    attempt.run_id,
                    attempt.platform.as_str(),
                    attempt.status.as_str(),
                    attempt.post_id,
                    attempt.error,
                    attempt.attempted_at.to_rfc3339(),
                ],
            )
            .map_err(|e| BriefcastError::history(format!("record_attempt: {e}")))?;
        Ok(())
    }

    /// Titles of the tenant's most recent successful runs, most recent
    /// first, never more than `limit` regardless of total history size.
    pub fn recent_titles(&self, tenant: &TenantId, limit: usize) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT story_title FROM runs
                 WHERE tenant_id = ?1 AND outcome != 'failed' AND story_title IS NOT NULL
                 ORDER BY finished_at DESC LIMIT ?2",
            )
            .map_err(|e| BriefcastError::history(format!("recent_titles: {e}")))?;
        let rows = stmt
            .query_map(params![tenant.as_str(), limit as i64], |row| row.get(0))
            .map_err(|e| BriefcastError::history(format!("recent_titles: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Recent runs for a tenant, most recent first.
    pub fn runs_by_tenant(&self, tenant: &TenantId, limit: usize) -> Result<Vec<PipelineRun>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "{RUN_SELECT} WHERE tenant_id = ?1 ORDER BY finished_at DESC LIMIT ?2"
            ))
            .map_err(|e| BriefcastError::history(format!("runs_by_tenant: {e}")))?;
        let rows = stmt
            .query_map(params![tenant.as_str(), limit as i64], row_to_run)
            .map_err(|e| BriefcastError::history(format!("runs_by_tenant: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// All attempts recorded for one run.
    pub fn attempts_by_run(&self, run_id: &str) -> Result<Vec<PublishAttempt>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, run_id, platform, status, post_id, error, attempted_at
                 FROM publish_attempts WHERE run_id = ?1 ORDER BY attempted_at",
            )
            .map_err(|e| BriefcastError::history(format!("attempts_by_run: {e}")))?;
        let rows = stmt
            .query_map(params![run_id], row_to_attempt)
            .map_err(|e| BriefcastError::history(format!("attempts_by_run: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Total runs recorded (all tenants).
    pub fn run_count(&self) -> usize {
        self.lock()
            .ok()
            .and_then(|conn| {
                conn.query_row("SELECT COUNT(*) FROM runs", [], |r| r.get::<_, i64>(0))
                    .ok()
            })
            .unwrap_or(0) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn store() -> (HistoryStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::open(&dir.path().join("history.db")).unwrap();
        (store, dir)
    }

    fn run(tenant: &str, n: i64, outcome: RunOutcome, title: Option<&str>) -> PipelineRun {
        let at = Utc::now() + Duration::seconds(n);
        PipelineRun {
            id: format!("run-{tenant}-{n}"),
            tenant: TenantId::new(tenant),
            started_at: at,
            finished_at: at,
            outcome,
            story_title: title.map(String::from),
            story_url: None,
            error: None,
        }
    }

    #[test]
    fn test_recent_titles_capped_and_ordered() {
        let (store, _dir) = store();
        for i in 0..25 {
            store
                .record_run(&run("t1", i, RunOutcome::Completed, Some(&format!("title {i}"))))
                .unwrap();
        }

        let titles = store.recent_titles(&TenantId::new("t1"), 10).unwrap();
        assert_eq!(titles.len(), 10);
        assert_eq!(titles[0], "title 24");
        assert_eq!(titles[9], "title 15");
    }

    #[test]
    fn test_recent_titles_skip_failed_runs() {
        let (store, _dir) = store();
        store
            .record_run(&run("t1", 1, RunOutcome::Completed, Some("good")))
            .unwrap();
        store
            .record_run(&run("t1", 2, RunOutcome::Failed, Some("bad")))
            .unwrap();
        store
            .record_run(&run("t1", 3, RunOutcome::PartiallyCompleted, Some("partial")))
            .unwrap();

        let titles = store.recent_titles(&TenantId::new("t1"), 10).unwrap();
        assert_eq!(titles, vec!["partial", "good"]);
    }

    #[test]
    fn test_tenant_isolation() {
        let (store, _dir) = store();
        store
            .record_run(&run("t1", 1, RunOutcome::Completed, Some("t1 story")))
            .unwrap();
        store
            .record_run(&run("t2", 1, RunOutcome::Completed, Some("t2 story")))
            .unwrap();

        let t1_runs = store.runs_by_tenant(&TenantId::new("t1"), 10).unwrap();
        assert_eq!(t1_runs.len(), 1);
        assert_eq!(t1_runs[0].story_title.as_deref(), Some("t1 story"));
    }

    #[test]
    fn test_attempts_by_run_roundtrip() {
        let (store, _dir) = store();
        let attempt = PublishAttempt {
            id: "att-1".into(),
            run_id: "run-9".into(),
            platform: Platform::LinkedIn,
            status: AttemptStatus::Failed,
            post_id: None,
            error: Some("auth: bad token".into()),
            attempted_at: Utc::now(),
        };
        store.record_attempt(&attempt).unwrap();

        let attempts = store.attempts_by_run("run-9").unwrap();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].platform, Platform::LinkedIn);
        assert_eq!(attempts[0].status, AttemptStatus::Failed);
        assert_eq!(attempts[0].error.as_deref(), Some("auth: bad token"));
    }

    #[test]
    fn test_record_run_idempotent() {
        let (store, _dir) = store();
        let r = run("t1", 1, RunOutcome::Completed, Some("once"));
        store.record_run(&r).unwrap();
        store.record_run(&r).unwrap();
        assert_eq!(store.run_count(), 1);
    }
}
