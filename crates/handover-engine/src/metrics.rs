//! Handover performance metrics
//!
//! Tracks decision latency and reported outcomes, and rolls them up into
//! KPIs and a letter grade.

use crate::decision::{DecisionType, HandoverDecision, HandoverResult};
use crate::Urgency;
use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, warn};

pub const MAX_RECORDS: usize = 10_000;
pub const CLEANUP_INTERVAL: usize = 1_000;

/// Availability is capped at five nines
const AVAILABILITY_CAP_PCT: f64 = 99.999;

// ============================================================================
// KPI types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerformanceGrade {
    #[serde(rename = "A+")]
    APlus,
    A,
    B,
    C,
    D,
    /// No handover has reported a result yet
    Insufficient,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeKpis {
    pub decisions: u64,
    pub completed: u64,
    pub successful: u64,
    pub success_rate_pct: f64,
    pub avg_interruption_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoverKpis {
    pub total_decisions: u64,
    pub completed_handovers: u64,
    pub successful_handovers: u64,
    pub failed_handovers: u64,
    pub success_rate_pct: f64,
    pub avg_interruption_ms: f64,
    pub avg_decision_latency_ms: f64,
    pub service_availability_pct: f64,
    pub performance_grade: PerformanceGrade,
    pub per_type: BTreeMap<DecisionType, TypeKpis>,
    /// Decisions per UTC hour of day
    pub hourly_activity: BTreeMap<u32, u64>,
}

pub fn performance_grade(
    success_rate_pct: f64,
    avg_latency_ms: f64,
    avg_interruption_ms: f64,
) -> PerformanceGrade {
    if success_rate_pct >= 99.0 && avg_latency_ms <= 10.0 && avg_interruption_ms <= 50.0 {
        PerformanceGrade::APlus
    } else if success_rate_pct >= 95.0 && avg_latency_ms <= 20.0 && avg_interruption_ms <= 100.0 {
        PerformanceGrade::A
    } else if success_rate_pct >= 90.0 && avg_latency_ms <= 50.0 && avg_interruption_ms <= 200.0 {
        PerformanceGrade::B
    } else if success_rate_pct >= 80.0 {
        PerformanceGrade::C
    } else {
        PerformanceGrade::D
    }
}

// ============================================================================
// Recorder
// ============================================================================

#[derive(Debug, Clone)]
struct DecisionRecord {
    decision_id: DateTime<Utc>,
    decision_type: Option<DecisionType>,
    urgency: Urgency,
    latency_ms: f64,
    result: Option<HandoverResult>,
}

#[derive(Debug)]
pub struct HandoverMetrics {
    records: VecDeque<DecisionRecord>,
    max_records: usize,
    since_cleanup: usize,
    hourly: BTreeMap<u32, u64>,
}

impl Default for HandoverMetrics {
    fn default() -> Self {
        Self::with_max_records(MAX_RECORDS)
    }
}

impl HandoverMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_records(max_records: usize) -> Self {
        Self {
            records: VecDeque::new(),
            max_records: max_records.max(1),
            since_cleanup: 0,
            hourly: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record_decision(&mut self, decision: &HandoverDecision, latency_ms: f64) {
        self.records.push_back(DecisionRecord {
            decision_id: decision.id(),
            decision_type: decision.decision_type,
            urgency: decision.urgency,
            latency_ms: if latency_ms.is_finite() { latency_ms.max(0.0) } else { 0.0 },
            result: None,
        });
        *self.hourly.entry(decision.timestamp.hour()).or_insert(0) += 1;

        self.since_cleanup += 1;
        if self.since_cleanup >= CLEANUP_INTERVAL {
            self.since_cleanup = 0;
            self.cleanup_old_records(self.max_records);
        }
    }

    /// Attach an outcome to the decision with timestamp `decision_id`.
    /// Returns false when no such decision is retained.
    pub fn record_result(&mut self, decision_id: DateTime<Utc>, result: HandoverResult) -> bool {
        match self.records.iter_mut().rev().find(|r| r.decision_id == decision_id) {
            Some(record) => {
                if record.result.is_some() {
                    debug!("Overwriting result for decision {}", decision_id);
                }
                record.result = Some(result);
                true
            }
            None => {
                warn!("Result for unknown decision {}", decision_id);
                false
            }
        }
    }

    /// Keep only the newest `max_records` decisions. Returns how many were
    /// dropped.
    pub fn cleanup_old_records(&mut self, max_records: usize) -> usize {
        let excess = self.records.len().saturating_sub(max_records);
        if excess > 0 {
            self.records.drain(..excess);
            debug!("Pruned {} metric records", excess);
        }
        excess
    }

    pub fn reset(&mut self) {
        self.records.clear();
        self.hourly.clear();
        self.since_cleanup = 0;
    }

    /// Decisions still waiting for a result, newest last
    pub fn pending(&self) -> impl Iterator<Item = (DateTime<Utc>, Urgency)> + '_ {
        self.records
            .iter()
            .filter(|r| r.result.is_none())
            .map(|r| (r.decision_id, r.urgency))
    }

    pub fn kpis(&self) -> HandoverKpis {
        let total = self.records.len() as u64;
        let completed: Vec<&HandoverResult> = self
            .records
            .iter()
            .filter_map(|r| r.result.as_ref())
            .collect();

        let mut per_type: BTreeMap<DecisionType, TypeKpis> = BTreeMap::new();
        for record in &self.records {
            let Some(t) = record.decision_type else { continue };
            let entry = per_type.entry(t).or_default();
            entry.decisions += 1;
            if let Some(result) = &record.result {
                entry.completed += 1;
                if result.success {
                    entry.successful += 1;
                    entry.avg_interruption_ms += f64::from(result.interruption_ms);
                }
            }
        }
        for stats in per_type.values_mut() {
            if stats.successful > 0 {
                stats.avg_interruption_ms /= stats.successful as f64;
            }
            if stats.completed > 0 {
                stats.success_rate_pct = stats.successful as f64 / stats.completed as f64 * 100.0;
            }
        }

        if completed.is_empty() {
            return HandoverKpis {
                total_decisions: total,
                completed_handovers: 0,
                successful_handovers: 0,
                failed_handovers: 0,
                success_rate_pct: 0.0,
                avg_interruption_ms: 0.0,
                avg_decision_latency_ms: 0.0,
                service_availability_pct: 0.0,
                performance_grade: PerformanceGrade::Insufficient,
                per_type,
                hourly_activity: self.hourly.clone(),
            };
        }

        let successful: Vec<&&HandoverResult> = completed.iter().filter(|r| r.success).collect();
        let success_rate = successful.len() as f64 / completed.len() as f64 * 100.0;

        let avg_interruption = if successful.is_empty() {
            0.0
        } else {
            let total_ms: f64 = successful.iter().map(|r| f64::from(r.interruption_ms)).sum();
            total_ms / successful.len() as f64
        };

        let avg_latency = self.records.iter().map(|r| r.latency_ms).sum::<f64>() / total as f64;

        HandoverKpis {
            total_decisions: total,
            completed_handovers: completed.len() as u64,
            successful_handovers: successful.len() as u64,
            failed_handovers: (completed.len() - successful.len()) as u64,
            success_rate_pct: success_rate,
            avg_interruption_ms: avg_interruption,
            avg_decision_latency_ms: avg_latency,
            service_availability_pct: success_rate.min(AVAILABILITY_CAP_PCT),
            performance_grade: performance_grade(success_rate, avg_latency, avg_interruption),
            per_type,
            hourly_activity: self.hourly.clone(),
        }
    }
}
