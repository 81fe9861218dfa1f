//! Data model — automation configurations, jobs, and alerts.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use brandpulse_core::types::{AlertCandidate, AlertKind, AlertPriority};

use crate::recurrence::compute_next_run;

/// The closed set of automation task kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationType {
    MentionCollection,
    SeoAnalysis,
    GeoMetrics,
    WeeklyReport,
    AlertEvaluation,
}

impl AutomationType {
    pub const ALL: [AutomationType; 5] = [
        AutomationType::MentionCollection,
        AutomationType::SeoAnalysis,
        AutomationType::GeoMetrics,
        AutomationType::WeeklyReport,
        AutomationType::AlertEvaluation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AutomationType::MentionCollection => "mention_collection",
            AutomationType::SeoAnalysis => "seo_analysis",
            AutomationType::GeoMetrics => "geo_metrics",
            AutomationType::WeeklyReport => "weekly_report",
            AutomationType::AlertEvaluation => "alert_evaluation",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mention_collection" => Some(AutomationType::MentionCollection),
            "seo_analysis" => Some(AutomationType::SeoAnalysis),
            "geo_metrics" => Some(AutomationType::GeoMetrics),
            "weekly_report" => Some(AutomationType::WeeklyReport),
            "alert_evaluation" => Some(AutomationType::AlertEvaluation),
            _ => None,
        }
    }
}

/// How often a configuration recurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Hourly => "hourly",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "hourly" => Some(Frequency::Hourly),
            "daily" => Some(Frequency::Daily),
            "weekly" => Some(Frequency::Weekly),
            "monthly" => Some(Frequency::Monthly),
            _ => None,
        }
    }
}

/// A user-defined recurring task definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationConfig {
    pub id: String,
    pub user_id: String,
    pub brand_id: Option<String>,
    pub automation_type: AutomationType,
    pub frequency: Frequency,
    /// Optional HH:MM anchor aligning daily/weekly/monthly runs.
    pub schedule_time: Option<NaiveTime>,
    pub enabled: bool,
    pub last_run: Option<DateTime<Utc>>,
    /// Sole admission criterion for the scheduler.
    pub next_run: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AutomationConfig {
    /// Create a new enabled configuration with its first due time computed
    /// from `now`.
    pub fn new(
        user_id: &str,
        brand_id: Option<&str>,
        automation_type: AutomationType,
        frequency: Frequency,
        schedule_time: Option<NaiveTime>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            brand_id: brand_id.map(|b| b.to_string()),
            automation_type,
            frequency,
            schedule_time,
            enabled: true,
            last_run: None,
            next_run: Some(compute_next_run(frequency, schedule_time, now)),
            created_at: now,
        }
    }

    /// Check if this configuration is due at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }
        match self.next_run {
            Some(next) => next <= now,
            None => false,
        }
    }
}

/// Job status — `Running` is the initial state, the other two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(JobStatus::Running),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

/// One recorded execution attempt of a configuration. Append-only history:
/// a job transitions to a terminal state exactly once and is never mutated
/// afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub config_id: String,
    pub user_id: String,
    pub brand_id: Option<String>,
    pub job_type: AutomationType,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    /// Task payload, present only when completed.
    pub result: Option<serde_json::Value>,
    /// Failure description, present only when failed.
    pub error: Option<String>,
}

impl Job {
    /// Create a job in `running` state for a configuration, immediately
    /// before dispatch.
    pub fn start(config: &AutomationConfig, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            config_id: config.id.clone(),
            user_id: config.user_id.clone(),
            brand_id: config.brand_id.clone(),
            job_type: config.automation_type,
            status: JobStatus::Running,
            started_at: now,
            completed_at: None,
            duration_ms: None,
            result: None,
            error: None,
        }
    }
}

/// A derivative notification record created by the alert-evaluation task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub user_id: String,
    pub brand_id: String,
    pub kind: AlertKind,
    pub priority: AlertPriority,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    /// Materialize a persisted alert from an evaluation candidate.
    pub fn from_candidate(user_id: &str, candidate: &AlertCandidate, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            brand_id: candidate.brand_id.clone(),
            kind: candidate.kind,
            priority: candidate.priority,
            message: candidate.message.clone(),
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_automation_type_roundtrip() {
        for t in AutomationType::ALL {
            assert_eq!(AutomationType::parse(t.as_str()), Some(t));
        }
        assert_eq!(AutomationType::parse("unknown"), None);
    }

    #[test]
    fn test_frequency_roundtrip() {
        for f in [
            Frequency::Hourly,
            Frequency::Daily,
            Frequency::Weekly,
            Frequency::Monthly,
        ] {
            assert_eq!(Frequency::parse(f.as_str()), Some(f));
        }
    }

    #[test]
    fn test_is_due() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 9, 5, 0).unwrap();
        let mut config = AutomationConfig::new(
            "u1",
            Some("b1"),
            AutomationType::MentionCollection,
            Frequency::Daily,
            None,
            now,
        );
        // Fresh config is scheduled in the future.
        assert!(!config.is_due(now));

        config.next_run = Some(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap());
        assert!(config.is_due(now));

        config.enabled = false;
        assert!(!config.is_due(now));
    }

    #[test]
    fn test_job_starts_running() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let config = AutomationConfig::new(
            "u1",
            None,
            AutomationType::AlertEvaluation,
            Frequency::Hourly,
            None,
            now,
        );
        let job = Job::start(&config, now);
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.job_type, AutomationType::AlertEvaluation);
        assert_eq!(job.config_id, config.id);
        assert!(job.result.is_none());
        assert!(job.error.is_none());
    }
}
