//! Task dispatch — maps each automation type to its runner.
//!
//! Adapters are deliberately thin: translate the collaborator's typed
//! response into the generic JSON result and let failures propagate
//! untouched so the retry executor sees them. The alert-evaluation runner
//! is the one exception — it owns the dedup-then-persist-then-notify
//! wiring around the evaluation service.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use brandpulse_core::error::{BrandPulseError, Result};
use brandpulse_core::traits::{
    AlertEvaluator, Collaborators, GeoScorer, MentionCollector, Notifier, ReportSender,
    SeoAnalyzer,
};
use brandpulse_core::types::AlertKind;

use crate::alerts::AlertDeduplicator;
use crate::model::{Alert, AutomationConfig, AutomationType};
use crate::store::OrchestratorDb;

/// One automation task kind's execution contract.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn execute(&self, config: &AutomationConfig) -> Result<serde_json::Value>;
}

/// Closed mapping from automation type to runner.
pub struct DispatchTable {
    runners: HashMap<AutomationType, Box<dyn TaskRunner>>,
}

impl DispatchTable {
    /// Build the table from the injected collaborator set. Every
    /// `AutomationType` gets exactly one runner.
    pub fn new(
        collaborators: Collaborators,
        db: Arc<OrchestratorDb>,
        alert_window_secs: u64,
    ) -> Self {
        let mut runners: HashMap<AutomationType, Box<dyn TaskRunner>> = HashMap::new();
        runners.insert(
            AutomationType::MentionCollection,
            Box::new(MentionCollectionRunner {
                collector: collaborators.mentions,
            }),
        );
        runners.insert(
            AutomationType::SeoAnalysis,
            Box::new(SeoAnalysisRunner {
                analyzer: collaborators.seo,
            }),
        );
        runners.insert(
            AutomationType::GeoMetrics,
            Box::new(GeoMetricsRunner {
                scorer: collaborators.geo,
            }),
        );
        runners.insert(
            AutomationType::WeeklyReport,
            Box::new(WeeklyReportRunner {
                sender: collaborators.reports,
            }),
        );
        runners.insert(
            AutomationType::AlertEvaluation,
            Box::new(AlertEvaluationRunner {
                evaluator: collaborators.alerts,
                notifier: collaborators.notifier,
                dedup: AlertDeduplicator::new(db.clone(), alert_window_secs),
                db,
            }),
        );
        Self { runners }
    }

    /// Execute the runner registered for this configuration's type.
    pub async fn execute(&self, config: &AutomationConfig) -> Result<serde_json::Value> {
        let runner = self.runners.get(&config.automation_type).ok_or_else(|| {
            BrandPulseError::Task(format!(
                "no runner registered for {}",
                config.automation_type.as_str()
            ))
        })?;
        runner.execute(config).await
    }
}

fn require_brand(config: &AutomationConfig) -> Result<&str> {
    config.brand_id.as_deref().ok_or_else(|| {
        BrandPulseError::Task(format!("configuration {} has no target brand", config.id))
    })
}

// ─── Per-type runners ─────────────────────────────────────────

struct MentionCollectionRunner {
    collector: Arc<dyn MentionCollector>,
}

#[async_trait]
impl TaskRunner for MentionCollectionRunner {
    async fn execute(&self, config: &AutomationConfig) -> Result<serde_json::Value> {
        let brand = require_brand(config)?;
        let batch = self.collector.collect(brand).await?;
        Ok(json!({ "mentions_ingested": batch.ingested }))
    }
}

struct SeoAnalysisRunner {
    analyzer: Arc<dyn SeoAnalyzer>,
}

#[async_trait]
impl TaskRunner for SeoAnalysisRunner {
    async fn execute(&self, config: &AutomationConfig) -> Result<serde_json::Value> {
        let brand = require_brand(config)?;
        self.analyzer.refresh(brand).await?;
        Ok(json!({ "acknowledged": true }))
    }
}

struct GeoMetricsRunner {
    scorer: Arc<dyn GeoScorer>,
}

#[async_trait]
impl TaskRunner for GeoMetricsRunner {
    async fn execute(&self, config: &AutomationConfig) -> Result<serde_json::Value> {
        let brand = require_brand(config)?;
        let score = self.scorer.compute(brand, &config.user_id).await?;
        Ok(json!({ "score": score.score }))
    }
}

struct WeeklyReportRunner {
    sender: Arc<dyn ReportSender>,
}

#[async_trait]
impl TaskRunner for WeeklyReportRunner {
    async fn execute(&self, config: &AutomationConfig) -> Result<serde_json::Value> {
        let receipt = self.sender.deliver(&config.user_id).await?;
        Ok(json!({ "delivery_reference": receipt.reference }))
    }
}

struct AlertEvaluationRunner {
    evaluator: Arc<dyn AlertEvaluator>,
    notifier: Arc<dyn Notifier>,
    dedup: AlertDeduplicator,
    db: Arc<OrchestratorDb>,
}

#[async_trait]
impl TaskRunner for AlertEvaluationRunner {
    async fn execute(&self, config: &AutomationConfig) -> Result<serde_json::Value> {
        let candidates = self.evaluator.evaluate(&config.user_id).await?;
        let now = Utc::now();

        let mut created = 0u32;
        let mut notified = 0u32;
        let mut suppressed = 0u32;

        for candidate in &candidates {
            if self
                .dedup
                .should_suppress(&config.user_id, &candidate.brand_id, now)?
            {
                tracing::debug!(
                    "🔕 Alert for brand {} suppressed (recent duplicate)",
                    candidate.brand_id
                );
                suppressed += 1;
                continue;
            }

            let alert = Alert::from_candidate(&config.user_id, candidate, now);
            self.db.insert_alert(&alert)?;
            created += 1;

            let subject = match candidate.kind {
                AlertKind::ScoreDecrease => "Brand visibility dropped",
                AlertKind::ScoreIncrease => "Brand visibility improved",
            };
            match self
                .notifier
                .notify(&config.user_id, subject, &candidate.message)
                .await
            {
                Ok(()) => notified += 1,
                Err(e) => {
                    tracing::warn!("⚠️ Notification for brand {} failed: {e}", candidate.brand_id)
                }
            }
        }

        Ok(json!({
            "alerts_created": created,
            "notifications_sent": notified,
            "suppressed": suppressed,
        }))
    }
}
