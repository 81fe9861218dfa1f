//! Domain value types shared across the collaborator boundary.

use serde::{Deserialize, Serialize};

/// Result of one mention-collection pass for a brand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentionBatch {
    /// Number of mentions ingested by the backend.
    pub ingested: u32,
}

/// A computed GEO visibility score for a (brand, user) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoScore {
    pub score: f64,
}

/// Acknowledgement of a delivered weekly report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportReceipt {
    /// Backend delivery reference (message id or similar).
    pub reference: String,
}

/// Kind of alert raised by the evaluation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    ScoreDecrease,
    ScoreIncrease,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::ScoreDecrease => "score_decrease",
            AlertKind::ScoreIncrease => "score_increase",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "score_decrease" => Some(AlertKind::ScoreDecrease),
            "score_increase" => Some(AlertKind::ScoreIncrease),
            _ => None,
        }
    }
}

/// Alert priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertPriority {
    Low,
    Normal,
    High,
    Urgent,
}

impl AlertPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertPriority::Low => "low",
            AlertPriority::Normal => "normal",
            AlertPriority::High => "high",
            AlertPriority::Urgent => "urgent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(AlertPriority::Low),
            "normal" => Some(AlertPriority::Normal),
            "high" => Some(AlertPriority::High),
            "urgent" => Some(AlertPriority::Urgent),
            _ => None,
        }
    }
}

/// A qualifying condition found by the alert-evaluation service.
///
/// Candidates are raw findings — whether each one becomes a persisted Alert
/// (and a notification) is decided by the orchestrator's deduplicator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertCandidate {
    pub brand_id: String,
    pub kind: AlertKind,
    pub priority: AlertPriority,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_kind_roundtrip() {
        for kind in [AlertKind::ScoreDecrease, AlertKind::ScoreIncrease] {
            assert_eq!(AlertKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(AlertKind::parse("bogus"), None);
    }

    #[test]
    fn test_priority_roundtrip() {
        for p in [
            AlertPriority::Low,
            AlertPriority::Normal,
            AlertPriority::High,
            AlertPriority::Urgent,
        ] {
            assert_eq!(AlertPriority::parse(p.as_str()), Some(p));
        }
    }
}
