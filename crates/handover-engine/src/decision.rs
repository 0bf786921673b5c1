//! Handover decisions and execution results

use crate::Urgency;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionAction {
    NoAction,
    ExecuteHandover,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionType {
    D2Emergency,
    A4Opportunity,
    A5QualityDriven,
}

impl DecisionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionType::D2Emergency => "d2_emergency",
            DecisionType::A4Opportunity => "a4_opportunity",
            DecisionType::A5QualityDriven => "a5_quality_driven",
        }
    }
}

impl fmt::Display for DecisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which decision method produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DecisionMethod {
    #[default]
    RuleBased,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoverDecision {
    pub action: DecisionAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_type: Option<DecisionType>,
    #[serde(default)]
    pub method: DecisionMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_satellite: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_satellite: Option<String>,
    pub urgency: Urgency,
    pub expected_interruption_ms: f64,
    pub confidence: f64,
    pub reason: String,
    /// Also the decision id used to correlate results
    pub timestamp: DateTime<Utc>,
}

impl HandoverDecision {
    pub fn no_action(
        timestamp: DateTime<Utc>,
        serving: Option<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            action: DecisionAction::NoAction,
            decision_type: None,
            method: DecisionMethod::RuleBased,
            source_satellite: serving,
            target_satellite: None,
            urgency: Urgency::Low,
            expected_interruption_ms: 0.0,
            confidence: 0.0,
            reason: reason.into(),
            timestamp,
        }
    }

    pub fn is_execute(&self) -> bool {
        self.action == DecisionAction::ExecuteHandover
    }

    pub fn id(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Outcome reported after a decision was carried out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoverResult {
    pub success: bool,
    /// Measured service interruption, whole milliseconds
    pub interruption_ms: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    pub completion_time: DateTime<Utc>,
}

impl HandoverResult {
    pub fn succeeded(interruption_ms: u32, completion_time: DateTime<Utc>) -> Self {
        Self {
            success: true,
            interruption_ms,
            error_reason: None,
            completion_time,
        }
    }

    pub fn failed(reason: impl Into<String>, completion_time: DateTime<Utc>) -> Self {
        Self {
            success: false,
            interruption_ms: 0,
            error_reason: Some(reason.into()),
            completion_time,
        }
    }
}

/// Why an event did not become a decision. Not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum SuppressionReason {
    HandoverInProgress,
    Cooldown { target: String, remaining_s: f64 },
    NoTarget,
    LosTooFar { time_to_los_s: f64 },
    InsufficientGain { gain_db: f64 },
    UnknownEventType,
}

impl fmt::Display for SuppressionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuppressionReason::HandoverInProgress => write!(f, "handover already in progress"),
            SuppressionReason::Cooldown { target, remaining_s } => {
                write!(f, "{} in cooldown for {:.1}s", target, remaining_s)
            }
            SuppressionReason::NoTarget => write!(f, "event names no target"),
            SuppressionReason::LosTooFar { time_to_los_s } => {
                write!(f, "loss of signal in {:.0}s, not yet urgent", time_to_los_s)
            }
            SuppressionReason::InsufficientGain { gain_db } => {
                write!(f, "gain {:.1} dB too small", gain_db)
            }
            SuppressionReason::UnknownEventType => write!(f, "unknown event type"),
        }
    }
}
