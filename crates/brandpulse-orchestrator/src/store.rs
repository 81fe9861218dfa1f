//! SQLite-backed persistence for configurations, job history, and alerts.
//!
//! One connection behind a mutex, WAL mode, rfc3339 timestamps. Jobs are
//! append-only: terminal updates are guarded by `status = 'running'` so a
//! finalized row can never be mutated again.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, NaiveTime, Utc};
use rusqlite::{params, Connection};

use brandpulse_core::error::{BrandPulseError, Result};
use brandpulse_core::types::{AlertKind, AlertPriority};

use crate::model::{Alert, AutomationConfig, AutomationType, Frequency, Job, JobStatus};

/// Orchestrator database — configurations, jobs, alerts.
pub struct OrchestratorDb {
    conn: Mutex<Connection>,
}

impl OrchestratorDb {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| BrandPulseError::Database(format!("DB open: {e}")))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    /// In-memory database for tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| BrandPulseError::Database(format!("DB open: {e}")))?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.lock()?
            .execute_batch(
                "
            -- User-defined recurring task definitions
            CREATE TABLE IF NOT EXISTS automation_configs (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                brand_id TEXT,
                automation_type TEXT NOT NULL,
                frequency TEXT NOT NULL,
                schedule_time TEXT,              -- 'HH:MM' anchor
                enabled INTEGER NOT NULL DEFAULT 1,
                last_run TEXT,
                next_run TEXT,
                created_at TEXT NOT NULL
            );

            -- Execution history, one row per attempt
            CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY,
                config_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                brand_id TEXT,
                job_type TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'running',
                started_at TEXT NOT NULL,
                completed_at TEXT,
                duration_ms INTEGER,
                result TEXT,                     -- JSON payload
                error TEXT
            );

            -- Derivative notifications from alert evaluation
            CREATE TABLE IF NOT EXISTS alerts (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                brand_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                priority TEXT NOT NULL DEFAULT 'normal',
                message TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_configs_due
                ON automation_configs(enabled, next_run);
            CREATE INDEX IF NOT EXISTS idx_jobs_config
                ON jobs(config_id, started_at);
            CREATE INDEX IF NOT EXISTS idx_alerts_user_brand
                ON alerts(user_id, brand_id, created_at);
         ",
            )
            .map_err(|e| BrandPulseError::Database(format!("Migration: {e}")))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| BrandPulseError::Database(format!("Lock: {e}")))
    }

    // ─── Automation configurations ────────────────────────────

    /// Insert a new configuration.
    pub fn insert_config(&self, config: &AutomationConfig) -> Result<()> {
        self.lock()?
            .execute(
                "INSERT INTO automation_configs
                 (id, user_id, brand_id, automation_type, frequency, schedule_time,
                  enabled, last_run, next_run, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    config.id,
                    config.user_id,
                    config.brand_id,
                    config.automation_type.as_str(),
                    config.frequency.as_str(),
                    config.schedule_time.map(|t| t.format("%H:%M").to_string()),
                    config.enabled as i32,
                    config.last_run.map(|t| t.to_rfc3339()),
                    config.next_run.map(|t| t.to_rfc3339()),
                    config.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| BrandPulseError::Database(format!("Insert config: {e}")))?;
        Ok(())
    }

    /// All configurations that are enabled and due at `now`.
    pub fn due_configs(&self, now: DateTime<Utc>) -> Result<Vec<AutomationConfig>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, brand_id, automation_type, frequency, schedule_time,
                        enabled, last_run, next_run, created_at
                 FROM automation_configs
                 WHERE enabled = 1 AND next_run IS NOT NULL AND next_run <= ?1
                 ORDER BY next_run",
            )
            .map_err(|e| BrandPulseError::Database(format!("Due configs: {e}")))?;
        let rows = stmt
            .query_map([now.to_rfc3339()], config_from_row)
            .map_err(|e| BrandPulseError::Database(format!("Due configs: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// All configurations, newest first (consumed by the management UI).
    pub fn list_configs(&self) -> Result<Vec<AutomationConfig>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, brand_id, automation_type, frequency, schedule_time,
                        enabled, last_run, next_run, created_at
                 FROM automation_configs ORDER BY created_at DESC",
            )
            .map_err(|e| BrandPulseError::Database(format!("List configs: {e}")))?;
        let rows = stmt
            .query_map([], config_from_row)
            .map_err(|e| BrandPulseError::Database(format!("List configs: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Advance a configuration's schedule after an attempt, success or not.
    pub fn update_schedule(
        &self,
        config_id: &str,
        last_run: DateTime<Utc>,
        next_run: DateTime<Utc>,
    ) -> Result<()> {
        self.lock()?
            .execute(
                "UPDATE automation_configs SET last_run = ?2, next_run = ?3 WHERE id = ?1",
                params![config_id, last_run.to_rfc3339(), next_run.to_rfc3339()],
            )
            .map_err(|e| BrandPulseError::Database(format!("Update schedule: {e}")))?;
        Ok(())
    }

    /// Soft-disable / re-enable a configuration.
    pub fn set_enabled(&self, config_id: &str, enabled: bool) -> Result<()> {
        self.lock()?
            .execute(
                "UPDATE automation_configs SET enabled = ?2 WHERE id = ?1",
                params![config_id, enabled as i32],
            )
            .map_err(|e| BrandPulseError::Database(format!("Set enabled: {e}")))?;
        Ok(())
    }

    /// Hard-delete a configuration.
    pub fn delete_config(&self, config_id: &str) -> Result<()> {
        self.lock()?
            .execute("DELETE FROM automation_configs WHERE id = ?1", [config_id])
            .map_err(|e| BrandPulseError::Database(format!("Delete config: {e}")))?;
        Ok(())
    }

    // ─── Jobs ─────────────────────────────────────────────────

    /// Record a job in `running` state.
    pub fn create_job(&self, job: &Job) -> Result<()> {
        self.lock()?
            .execute(
                "INSERT INTO jobs
                 (id, config_id, user_id, brand_id, job_type, status, started_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    job.id,
                    job.config_id,
                    job.user_id,
                    job.brand_id,
                    job.job_type.as_str(),
                    job.status.as_str(),
                    job.started_at.to_rfc3339(),
                ],
            )
            .map_err(|e| BrandPulseError::Database(format!("Create job: {e}")))?;
        Ok(())
    }

    /// Finalize a running job as completed. Returns false if the job was
    /// not in `running` state (terminal rows are never touched).
    pub fn complete_job(
        &self,
        job_id: &str,
        result: &serde_json::Value,
        duration_ms: i64,
    ) -> Result<bool> {
        let changed = self
            .lock()?
            .execute(
                "UPDATE jobs SET status = 'completed', completed_at = ?2,
                        duration_ms = ?3, result = ?4
                 WHERE id = ?1 AND status = 'running'",
                params![
                    job_id,
                    Utc::now().to_rfc3339(),
                    duration_ms,
                    result.to_string(),
                ],
            )
            .map_err(|e| BrandPulseError::Database(format!("Complete job: {e}")))?;
        Ok(changed == 1)
    }

    /// Finalize a running job as failed. Returns false if the job was not
    /// in `running` state.
    pub fn fail_job(&self, job_id: &str, error: &str, duration_ms: i64) -> Result<bool> {
        let changed = self
            .lock()?
            .execute(
                "UPDATE jobs SET status = 'failed', completed_at = ?2,
                        duration_ms = ?3, error = ?4
                 WHERE id = ?1 AND status = 'running'",
                params![job_id, Utc::now().to_rfc3339(), duration_ms, error],
            )
            .map_err(|e| BrandPulseError::Database(format!("Fail job: {e}")))?;
        Ok(changed == 1)
    }

    /// Fetch one job by id.
    pub fn get_job(&self, job_id: &str) -> Result<Option<Job>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, config_id, user_id, brand_id, job_type, status,
                        started_at, completed_at, duration_ms, result, error
                 FROM jobs WHERE id = ?1",
            )
            .map_err(|e| BrandPulseError::Database(format!("Get job: {e}")))?;
        let mut rows = stmt
            .query_map([job_id], job_from_row)
            .map_err(|e| BrandPulseError::Database(format!("Get job: {e}")))?;
        Ok(rows.next().and_then(|r| r.ok()))
    }

    /// Most recent jobs, newest first (consumed by the history UI).
    pub fn recent_jobs(&self, limit: usize) -> Result<Vec<Job>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, config_id, user_id, brand_id, job_type, status,
                        started_at, completed_at, duration_ms, result, error
                 FROM jobs ORDER BY started_at DESC LIMIT ?1",
            )
            .map_err(|e| BrandPulseError::Database(format!("Recent jobs: {e}")))?;
        let rows = stmt
            .query_map([limit as i64], job_from_row)
            .map_err(|e| BrandPulseError::Database(format!("Recent jobs: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    // ─── Alerts ───────────────────────────────────────────────

    /// Insert a new alert record.
    pub fn insert_alert(&self, alert: &Alert) -> Result<()> {
        self.lock()?
            .execute(
                "INSERT INTO alerts (id, user_id, brand_id, kind, priority, message, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    alert.id,
                    alert.user_id,
                    alert.brand_id,
                    alert.kind.as_str(),
                    alert.priority.as_str(),
                    alert.message,
                    alert.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| BrandPulseError::Database(format!("Insert alert: {e}")))?;
        Ok(())
    }

    /// Whether an alert exists for (user, brand) created after `since`.
    pub fn recent_alert_exists(
        &self,
        user_id: &str,
        brand_id: &str,
        since: DateTime<Utc>,
    ) -> Result<bool> {
        let count: i64 = self
            .lock()?
            .query_row(
                "SELECT COUNT(*) FROM alerts
                 WHERE user_id = ?1 AND brand_id = ?2 AND created_at > ?3",
                params![user_id, brand_id, since.to_rfc3339()],
                |row| row.get(0),
            )
            .map_err(|e| BrandPulseError::Database(format!("Recent alert: {e}")))?;
        Ok(count > 0)
    }

    /// Most recent alerts, newest first.
    pub fn recent_alerts(&self, limit: usize) -> Result<Vec<Alert>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, brand_id, kind, priority, message, created_at
                 FROM alerts ORDER BY created_at DESC LIMIT ?1",
            )
            .map_err(|e| BrandPulseError::Database(format!("Recent alerts: {e}")))?;
        let rows = stmt
            .query_map([limit as i64], alert_from_row)
            .map_err(|e| BrandPulseError::Database(format!("Recent alerts: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }
}

// ─── Row mapping ──────────────────────────────────────────────

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_opt_ts(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|d| d.with_timezone(&Utc))
}

fn bad_row(what: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        format!("unrecognized {what}").into(),
    )
}

fn config_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AutomationConfig> {
    let automation_type: String = row.get(3)?;
    let frequency: String = row.get(4)?;
    let schedule_time: Option<String> = row.get(5)?;
    let last_run: Option<String> = row.get(7)?;
    let next_run: Option<String> = row.get(8)?;
    let created_at: String = row.get(9)?;

    Ok(AutomationConfig {
        id: row.get(0)?,
        user_id: row.get(1)?,
        brand_id: row.get(2)?,
        automation_type: AutomationType::parse(&automation_type)
            .ok_or_else(|| bad_row("automation type"))?,
        frequency: Frequency::parse(&frequency).ok_or_else(|| bad_row("frequency"))?,
        schedule_time: schedule_time
            .and_then(|s| NaiveTime::parse_from_str(&s, "%H:%M").ok()),
        enabled: row.get::<_, i32>(6)? != 0,
        last_run: parse_opt_ts(last_run),
        next_run: parse_opt_ts(next_run),
        created_at: parse_ts(&created_at),
    })
}

fn job_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Job> {
    let job_type: String = row.get(4)?;
    let status: String = row.get(5)?;
    let started_at: String = row.get(6)?;
    let completed_at: Option<String> = row.get(7)?;
    let result: Option<String> = row.get(9)?;

    Ok(Job {
        id: row.get(0)?,
        config_id: row.get(1)?,
        user_id: row.get(2)?,
        brand_id: row.get(3)?,
        job_type: AutomationType::parse(&job_type).ok_or_else(|| bad_row("job type"))?,
        status: JobStatus::parse(&status).ok_or_else(|| bad_row("job status"))?,
        started_at: parse_ts(&started_at),
        completed_at: parse_opt_ts(completed_at),
        duration_ms: row.get(8)?,
        result: result.and_then(|s| serde_json::from_str(&s).ok()),
        error: row.get(10)?,
    })
}

fn alert_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Alert> {
    let kind: String = row.get(3)?;
    let priority: String = row.get(4)?;
    let created_at: String = row.get(6)?;

    Ok(Alert {
        id: row.get(0)?,
        user_id: row.get(1)?,
        brand_id: row.get(2)?,
        kind: AlertKind::parse(&kind).ok_or_else(|| bad_row("alert kind"))?,
        priority: AlertPriority::parse(&priority).ok_or_else(|| bad_row("alert priority"))?,
        message: row.get(5)?,
        created_at: parse_ts(&created_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn fixture_config(now: DateTime<Utc>) -> AutomationConfig {
        AutomationConfig::new(
            "user-1",
            Some("brand-1"),
            AutomationType::MentionCollection,
            Frequency::Daily,
            NaiveTime::from_hms_opt(9, 0, 0),
            now,
        )
    }

    #[test]
    fn test_open_and_migrate() {
        let db = OrchestratorDb::in_memory().unwrap();
        assert!(db.list_configs().unwrap().is_empty());
        assert!(db.recent_jobs(10).unwrap().is_empty());
        assert!(db.recent_alerts(10).unwrap().is_empty());
    }

    #[test]
    fn test_config_roundtrip() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let db = OrchestratorDb::in_memory().unwrap();
        let config = fixture_config(now);
        db.insert_config(&config).unwrap();

        let loaded = db.list_configs().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, config.id);
        assert_eq!(loaded[0].automation_type, AutomationType::MentionCollection);
        assert_eq!(loaded[0].frequency, Frequency::Daily);
        assert_eq!(loaded[0].schedule_time, NaiveTime::from_hms_opt(9, 0, 0));
        assert_eq!(loaded[0].next_run, config.next_run);
        assert!(loaded[0].enabled);
    }

    #[test]
    fn test_due_selection() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 9, 5, 0).unwrap();
        let db = OrchestratorDb::in_memory().unwrap();

        let mut due = fixture_config(now);
        due.next_run = Some(now - Duration::minutes(5));
        db.insert_config(&due).unwrap();

        let mut future = fixture_config(now);
        future.next_run = Some(now + Duration::hours(1));
        db.insert_config(&future).unwrap();

        let mut disabled = fixture_config(now);
        disabled.next_run = Some(now - Duration::minutes(5));
        disabled.enabled = false;
        db.insert_config(&disabled).unwrap();

        let selected = db.due_configs(now).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, due.id);
    }

    #[test]
    fn test_due_boundary_is_inclusive() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let db = OrchestratorDb::in_memory().unwrap();
        let mut config = fixture_config(now);
        config.next_run = Some(now);
        db.insert_config(&config).unwrap();
        assert_eq!(db.due_configs(now).unwrap().len(), 1);
    }

    #[test]
    fn test_update_schedule() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 9, 5, 0).unwrap();
        let db = OrchestratorDb::in_memory().unwrap();
        let mut config = fixture_config(now);
        config.next_run = Some(now);
        db.insert_config(&config).unwrap();

        let next = Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap();
        db.update_schedule(&config.id, now, next).unwrap();

        let loaded = db.list_configs().unwrap();
        assert_eq!(loaded[0].last_run, Some(now));
        assert_eq!(loaded[0].next_run, Some(next));
        assert!(db.due_configs(now).unwrap().is_empty());
    }

    #[test]
    fn test_set_enabled_and_delete() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 9, 5, 0).unwrap();
        let db = OrchestratorDb::in_memory().unwrap();
        let mut config = fixture_config(now);
        config.next_run = Some(now);
        db.insert_config(&config).unwrap();

        db.set_enabled(&config.id, false).unwrap();
        assert!(db.due_configs(now).unwrap().is_empty());

        db.set_enabled(&config.id, true).unwrap();
        assert_eq!(db.due_configs(now).unwrap().len(), 1);

        db.delete_config(&config.id).unwrap();
        assert!(db.list_configs().unwrap().is_empty());
    }

    #[test]
    fn test_job_completion_is_terminal() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let db = OrchestratorDb::in_memory().unwrap();
        let config = fixture_config(now);
        let job = Job::start(&config, now);
        db.create_job(&job).unwrap();

        let result = serde_json::json!({"mentions_ingested": 12});
        assert!(db.complete_job(&job.id, &result, 850).unwrap());

        let stored = db.get_job(&job.id).unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.duration_ms, Some(850));
        assert_eq!(stored.result, Some(result));
        assert!(stored.error.is_none());

        // Terminal rows are never mutated again.
        assert!(!db.fail_job(&job.id, "late failure", 1).unwrap());
        assert!(!db.complete_job(&job.id, &serde_json::json!({}), 1).unwrap());
        let unchanged = db.get_job(&job.id).unwrap().unwrap();
        assert_eq!(unchanged.status, JobStatus::Completed);
        assert_eq!(unchanged.duration_ms, Some(850));
    }

    #[test]
    fn test_job_failure_records_error() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let db = OrchestratorDb::in_memory().unwrap();
        let config = fixture_config(now);
        let job = Job::start(&config, now);
        db.create_job(&job).unwrap();

        assert!(db.fail_job(&job.id, "Service error: timeout", 6200).unwrap());
        let stored = db.get_job(&job.id).unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.error.as_deref(), Some("Service error: timeout"));
        assert!(stored.result.is_none());
    }

    #[test]
    fn test_recent_alert_window() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let db = OrchestratorDb::in_memory().unwrap();

        let candidate = brandpulse_core::types::AlertCandidate {
            brand_id: "brand-1".into(),
            kind: AlertKind::ScoreDecrease,
            priority: AlertPriority::High,
            message: "GEO score dropped 12%".into(),
        };
        let alert = Alert::from_candidate("user-1", &candidate, now - Duration::minutes(30));
        db.insert_alert(&alert).unwrap();

        // Inside the one-hour window.
        assert!(db
            .recent_alert_exists("user-1", "brand-1", now - Duration::hours(1))
            .unwrap());
        // Other brand or user: no match.
        assert!(!db
            .recent_alert_exists("user-1", "brand-2", now - Duration::hours(1))
            .unwrap());
        assert!(!db
            .recent_alert_exists("user-2", "brand-1", now - Duration::hours(1))
            .unwrap());
        // Window that excludes the alert.
        assert!(!db
            .recent_alert_exists("user-1", "brand-1", now - Duration::minutes(10))
            .unwrap());
    }
}
