//! Alert deduplication — suppresses repeat alerts for the same subject.
//!
//! The check is advisory (read-then-write, not transactional): two passes
//! racing within the window can rarely both create an alert, which is an
//! accepted failure mode.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use brandpulse_core::error::Result;

use crate::store::OrchestratorDb;

/// Suppresses a new alert for a (user, brand) pair when one was already
/// created within the recency window.
pub struct AlertDeduplicator {
    db: Arc<OrchestratorDb>,
    window: Duration,
}

impl AlertDeduplicator {
    pub fn new(db: Arc<OrchestratorDb>, window_secs: u64) -> Self {
        Self {
            db,
            window: Duration::seconds(window_secs as i64),
        }
    }

    /// True when an alert for this (user, brand) already exists within the
    /// window ending at `now` — the caller must then skip both the alert
    /// row and its notification.
    pub fn should_suppress(
        &self,
        user_id: &str,
        brand_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        self.db
            .recent_alert_exists(user_id, brand_id, now - self.window)
    }
}
