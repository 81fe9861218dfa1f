//! Collaborator trait seams.
//!
//! The orchestrator core never talks to the backend services directly — it
//! only sees these traits. `brandpulse-services` provides the HTTP-backed
//! implementations; tests substitute stubs.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{AlertCandidate, GeoScore, MentionBatch, ReportReceipt};

/// Pulls fresh brand mentions from the language-model monitoring backend.
#[async_trait]
pub trait MentionCollector: Send + Sync {
    async fn collect(&self, brand_id: &str) -> Result<MentionBatch>;
}

/// Refreshes search-engine metrics for a brand. The backend upserts; the
/// only orchestration-relevant output is the acknowledgement.
#[async_trait]
pub trait SeoAnalyzer: Send + Sync {
    async fn refresh(&self, brand_id: &str) -> Result<()>;
}

/// Computes the GEO visibility score for a (brand, user) pair.
#[async_trait]
pub trait GeoScorer: Send + Sync {
    async fn compute(&self, brand_id: &str, user_id: &str) -> Result<GeoScore>;
}

/// Renders and delivers the weekly summary report for a user.
#[async_trait]
pub trait ReportSender: Send + Sync {
    async fn deliver(&self, user_id: &str) -> Result<ReportReceipt>;
}

/// Evaluates alerting conditions for a user and returns raw candidates.
/// Candidates are not persisted by the service — deduplication and Alert
/// creation happen on the orchestrator side.
#[async_trait]
pub trait AlertEvaluator: Send + Sync {
    async fn evaluate(&self, user_id: &str) -> Result<Vec<AlertCandidate>>;
}

/// Sends a user-facing notification (e-mail or in-app, backend's choice).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: &str, subject: &str, body: &str) -> Result<()>;
}

/// The full set of collaborator handles injected into the orchestrator at
/// construction time.
#[derive(Clone)]
pub struct Collaborators {
    pub mentions: Arc<dyn MentionCollector>,
    pub seo: Arc<dyn SeoAnalyzer>,
    pub geo: Arc<dyn GeoScorer>,
    pub reports: Arc<dyn ReportSender>,
    pub alerts: Arc<dyn AlertEvaluator>,
    pub notifier: Arc<dyn Notifier>,
}
