//! Rule-based handover engine
//!
//! State machine over one UE's serving link:
//!
//! ```text
//! Idle ──event accepted──▶ InProgress ──reset / deadline passed──▶ Idle
//!                              │
//!                              └──D2 accepted──▶ InProgress (preempted)
//! ```
//!
//! At most one decision comes out of each event batch. D2 outranks
//! everything, bypasses cooldown and may preempt a handover in flight.

use crate::decision::{
    DecisionAction, DecisionMethod, DecisionType, HandoverDecision, SuppressionReason,
};
use crate::event::{EventType, HandoverEvent};
use crate::{HandoverError, Result, SatelliteState, Urgency};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::{debug, info, warn};

pub const HANDOVER_COOLDOWN_S: f64 = 30.0;
pub const MIN_SIGNAL_IMPROVEMENT_DB: f64 = 3.0;
pub const D2_LOS_THRESHOLD_S: f64 = 30.0;
pub const IN_PROGRESS_TIMEOUT_MS: f64 = 5000.0;
pub const DECISION_HISTORY_LIMIT: usize = 100;

const D2_INTERRUPTION_MS: f64 = 50.0;
const A4_INTERRUPTION_MS: f64 = 80.0;
const A5_INTERRUPTION_MS: f64 = 100.0;

const D2_CONFIDENCE: f64 = 0.95;
const A4_CONFIDENCE: f64 = 0.8;
const A5_CONFIDENCE: f64 = 0.7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds a target stays excluded after a decision naming it
    pub handover_cooldown_s: f64,
    pub min_signal_improvement_db: f64,
    /// D2 only executes when loss of signal is closer than this
    pub d2_los_threshold_s: f64,
    /// Floor for how long a decision may stay in progress
    pub in_progress_timeout_ms: f64,
    pub history_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            handover_cooldown_s: HANDOVER_COOLDOWN_S,
            min_signal_improvement_db: MIN_SIGNAL_IMPROVEMENT_DB,
            d2_los_threshold_s: D2_LOS_THRESHOLD_S,
            in_progress_timeout_ms: IN_PROGRESS_TIMEOUT_MS,
            history_limit: DECISION_HISTORY_LIMIT,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.handover_cooldown_s >= 0.0) {
            return Err(HandoverError::InvalidConfig(format!(
                "handover_cooldown_s must be non-negative, got {}",
                self.handover_cooldown_s
            )));
        }
        if !(self.in_progress_timeout_ms > 0.0) {
            return Err(HandoverError::InvalidConfig(format!(
                "in_progress_timeout_ms must be positive, got {}",
                self.in_progress_timeout_ms
            )));
        }
        if self.history_limit == 0 {
            return Err(HandoverError::InvalidConfig(
                "history_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// A handover that has been decided but not yet reported complete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InProgress {
    pub decision_timestamp: DateTime<Utc>,
    pub target_satellite: Option<String>,
    pub deadline: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineState {
    pub current_serving_satellite_id: Option<String>,
    pub in_progress: Option<InProgress>,
    /// Target id → timestamp of the last decision naming it
    pub cooldown_registry: HashMap<String, DateTime<Utc>>,
    pub decision_history: VecDeque<HandoverDecision>,
}

impl EngineState {
    pub fn handover_in_progress(&self) -> bool {
        self.in_progress.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineMode {
    Idle,
    InProgress,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub mode: EngineMode,
    pub current_serving_satellite_id: Option<String>,
    pub in_progress: Option<InProgress>,
    pub cooldown_entries: usize,
    pub history_len: usize,
    pub decisions_total: u64,
    pub decisions_by_type: BTreeMap<DecisionType, u64>,
    pub decisions_by_method: BTreeMap<DecisionMethod, u64>,
    pub events_suppressed: u64,
    pub stale_expirations: u64,
}

#[derive(Debug)]
pub struct RuleBasedHandoverEngine {
    config: EngineConfig,
    state: EngineState,
    decisions_by_type: BTreeMap<DecisionType, u64>,
    decisions_by_method: BTreeMap<DecisionMethod, u64>,
    events_suppressed: u64,
    stale_expirations: u64,
}

impl Default for RuleBasedHandoverEngine {
    fn default() -> Self {
        Self::with_config(EngineConfig::default())
    }
}

impl RuleBasedHandoverEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            state: EngineState::default(),
            decisions_by_type: BTreeMap::new(),
            decisions_by_method: BTreeMap::new(),
            events_suppressed: 0,
            stale_expirations: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn current_serving(&self) -> Option<&str> {
        self.state.current_serving_satellite_id.as_deref()
    }

    /// Adopt the first (highest) satellite of a snapshot as serving if none
    /// is set yet
    pub fn observe_serving(&mut self, snapshot: &[SatelliteState]) -> Option<&str> {
        if self.state.current_serving_satellite_id.is_none() {
            if let Some(first) = snapshot.first() {
                info!(
                    "Serving satellite acquired: {} (el {:.1}°)",
                    first.satellite_id,
                    first.elevation_deg()
                );
                self.state.current_serving_satellite_id = Some(first.satellite_id.clone());
            }
        }
        self.current_serving()
    }

    pub fn set_serving(&mut self, satellite_id: impl Into<String>) {
        self.state.current_serving_satellite_id = Some(satellite_id.into());
    }

    pub fn reset_handover_progress(&mut self) {
        if let Some(p) = self.state.in_progress.take() {
            debug!("Handover {} cleared", p.decision_timestamp);
        }
    }

    /// Clear an in-progress handover whose deadline passed before `now`
    pub fn expire_stale(&mut self, now: DateTime<Utc>) -> bool {
        let expired = matches!(&self.state.in_progress, Some(p) if now > p.deadline);
        if expired {
            if let Some(p) = self.state.in_progress.take() {
                warn!(
                    decided_at = %p.decision_timestamp,
                    deadline = %p.deadline,
                    target = ?p.target_satellite,
                    "Handover never reported complete, clearing in-progress state"
                );
            }
            self.stale_expirations += 1;
        }
        expired
    }

    /// Seconds of cooldown left for `target` at `now`
    pub fn cooldown_remaining(&self, target: &str, now: DateTime<Utc>) -> Option<f64> {
        let last = self.state.cooldown_registry.get(target)?;
        let elapsed_s = (now - *last).num_milliseconds() as f64 / 1000.0;
        let cooldown_s = self.config.handover_cooldown_s;
        (elapsed_s < cooldown_s).then(|| cooldown_s - elapsed_s)
    }

    pub fn process_event(&mut self, event: &HandoverEvent) -> Option<HandoverDecision> {
        self.expire_stale(event.timestamp);

        if event.event_type == EventType::Unknown {
            warn!(
                serving = %event.serving_satellite.id,
                timestamp = %event.timestamp,
                "Ignoring event of unknown type"
            );
            self.events_suppressed += 1;
            return None;
        }

        if self.state.handover_in_progress() && event.event_type != EventType::D2 {
            self.suppress(event, SuppressionReason::HandoverInProgress);
            return None;
        }

        match self.evaluate(event) {
            Ok(decision) => {
                self.accept(&decision);
                Some(decision)
            }
            Err(reason) => {
                self.suppress(event, reason);
                None
            }
        }
    }

    /// Rank a batch and return the first decision it yields
    pub fn process_events(&mut self, events: &[HandoverEvent]) -> Option<HandoverDecision> {
        let mut ranked: Vec<&HandoverEvent> = events.iter().collect();
        ranked.sort_by(|a, b| {
            priority_key(b)
                .cmp(&priority_key(a))
                .then_with(|| b.gain_db().total_cmp(&a.gain_db()))
        });

        ranked.into_iter().find_map(|event| self.process_event(event))
    }

    pub fn current_status(&self) -> EngineStatus {
        EngineStatus {
            mode: if self.state.handover_in_progress() {
                EngineMode::InProgress
            } else {
                EngineMode::Idle
            },
            current_serving_satellite_id: self.state.current_serving_satellite_id.clone(),
            in_progress: self.state.in_progress.clone(),
            cooldown_entries: self.state.cooldown_registry.len(),
            history_len: self.state.decision_history.len(),
            decisions_total: self.decisions_by_type.values().sum(),
            decisions_by_type: self.decisions_by_type.clone(),
            decisions_by_method: self.decisions_by_method.clone(),
            events_suppressed: self.events_suppressed,
            stale_expirations: self.stale_expirations,
        }
    }

    fn evaluate(
        &self,
        event: &HandoverEvent,
    ) -> std::result::Result<HandoverDecision, SuppressionReason> {
        let target = event.target().ok_or(SuppressionReason::NoTarget)?;
        let source = event.serving_satellite.id.clone();

        match event.event_type {
            EventType::D2 => {
                let ttl = event.time_to_los_seconds.unwrap_or(0.0);
                if ttl >= self.config.d2_los_threshold_s {
                    return Err(SuppressionReason::LosTooFar { time_to_los_s: ttl });
                }

                let reason = format!(
                    "D2: serving {} at {:.0} km, {:.0}s to loss of signal, switching to {}",
                    source,
                    event.serving_distance_km.unwrap_or(0.0),
                    ttl,
                    target.id
                );
                Ok(self.decision(
                    event,
                    DecisionType::D2Emergency,
                    Urgency::Critical,
                    D2_INTERRUPTION_MS,
                    D2_CONFIDENCE,
                    reason,
                ))
            }
            EventType::A4 => {
                let advantage = event.quality_advantage_db.unwrap_or(f64::NEG_INFINITY);
                if !(advantage >= self.config.min_signal_improvement_db) {
                    return Err(SuppressionReason::InsufficientGain { gain_db: advantage });
                }
                self.check_cooldown(&target.id, event.timestamp)?;

                let reason = format!(
                    "A4: {} is {:.1} dB stronger than {}",
                    target.id, advantage, source
                );
                Ok(self.decision(
                    event,
                    DecisionType::A4Opportunity,
                    Urgency::Medium,
                    A4_INTERRUPTION_MS,
                    A4_CONFIDENCE,
                    reason,
                ))
            }
            EventType::A5 => {
                let gain = event.handover_gain_db.unwrap_or(f64::NEG_INFINITY);
                let enough_gain = gain >= self.config.min_signal_improvement_db;
                if event.urgency != Urgency::High && !enough_gain {
                    return Err(SuppressionReason::InsufficientGain { gain_db: gain });
                }
                self.check_cooldown(&target.id, event.timestamp)?;

                let reason = format!(
                    "A5: serving {} degraded, {} offers {:.1} dB gain",
                    source, target.id, gain
                );
                Ok(self.decision(
                    event,
                    DecisionType::A5QualityDriven,
                    event.urgency,
                    A5_INTERRUPTION_MS,
                    A5_CONFIDENCE,
                    reason,
                ))
            }
            EventType::Unknown => Err(SuppressionReason::UnknownEventType),
        }
    }

    fn check_cooldown(
        &self,
        target: &str,
        now: DateTime<Utc>,
    ) -> std::result::Result<(), SuppressionReason> {
        match self.cooldown_remaining(target, now) {
            Some(remaining_s) => Err(SuppressionReason::Cooldown {
                target: target.to_string(),
                remaining_s,
            }),
            None => Ok(()),
        }
    }

    fn decision(
        &self,
        event: &HandoverEvent,
        decision_type: DecisionType,
        urgency: Urgency,
        expected_interruption_ms: f64,
        confidence: f64,
        reason: String,
    ) -> HandoverDecision {
        HandoverDecision {
            action: DecisionAction::ExecuteHandover,
            decision_type: Some(decision_type),
            method: DecisionMethod::RuleBased,
            source_satellite: Some(event.serving_satellite.id.clone()),
            target_satellite: event.target().map(|t| t.id.clone()),
            urgency,
            expected_interruption_ms,
            confidence,
            reason,
            timestamp: event.timestamp,
        }
    }

    fn accept(&mut self, decision: &HandoverDecision) {
        let now = decision.timestamp;

        if let Some(previous) = &self.state.in_progress {
            info!(
                "Preempting handover decided at {} with {:?}",
                previous.decision_timestamp, decision.decision_type
            );
        }

        let hold_ms =
            (2.0 * decision.expected_interruption_ms).max(self.config.in_progress_timeout_ms);
        self.state.in_progress = Some(InProgress {
            decision_timestamp: now,
            target_satellite: decision.target_satellite.clone(),
            deadline: now + Duration::milliseconds(hold_ms.round() as i64),
        });

        let cooldown_ms = (self.config.handover_cooldown_s * 1000.0) as i64;
        self.state
            .cooldown_registry
            .retain(|_, last| (now - *last).num_milliseconds() < cooldown_ms);

        if let Some(target) = &decision.target_satellite {
            self.state.cooldown_registry.insert(target.clone(), now);
            self.state.current_serving_satellite_id = Some(target.clone());
        }

        self.state.decision_history.push_back(decision.clone());
        while self.state.decision_history.len() > self.config.history_limit {
            self.state.decision_history.pop_front();
        }

        if let Some(t) = decision.decision_type {
            *self.decisions_by_type.entry(t).or_insert(0) += 1;
        }
        *self.decisions_by_method.entry(decision.method).or_insert(0) += 1;

        info!(
            decision_type = ?decision.decision_type,
            source = ?decision.source_satellite,
            target = ?decision.target_satellite,
            urgency = ?decision.urgency,
            "Handover decided: {}",
            decision.reason
        );
    }

    fn suppress(&mut self, event: &HandoverEvent, reason: SuppressionReason) {
        self.events_suppressed += 1;
        debug!(
            event_type = ?event.event_type,
            target = ?event.target().map(|t| t.id.as_str()),
            "Event suppressed: {}",
            reason
        );
    }
}

/// D2 first, then urgency, then A5 before A4
fn priority_key(event: &HandoverEvent) -> (bool, Urgency, u8) {
    let type_rank = match event.event_type {
        EventType::D2 => 3,
        EventType::A5 => 2,
        EventType::A4 => 1,
        EventType::Unknown => 0,
    };
    (event.event_type == EventType::D2, event.urgency, type_rank)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ObserverFrame;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn sat(id: &str, elevation: f64, range: f64, rsrp: f64) -> SatelliteState {
        SatelliteState::new(
            id,
            ObserverFrame {
                elevation_deg: elevation,
                azimuth_deg: 90.0,
                range_km: range,
            },
            Some(rsrp),
        )
    }

    fn a4(at: DateTime<Utc>, target: &str, advantage: f64) -> HandoverEvent {
        let serving = sat("SERV", 20.0, 1000.0, -110.0);
        let candidate = sat(target, 40.0, 700.0, -110.0 + advantage);
        HandoverEvent::a4(at, &serving, &candidate, advantage)
    }

    fn a5(at: DateTime<Utc>, target: &str, gain: f64, urgency: Urgency) -> HandoverEvent {
        let serving = sat("SERV", 7.0, 1400.0, -120.0);
        let candidate = sat(target, 40.0, 700.0, -120.0 + gain);
        HandoverEvent::a5(at, &serving, &candidate, gain, urgency)
    }

    fn d2(at: DateTime<Utc>, target: &str, ttl: f64) -> HandoverEvent {
        let serving = sat("SERV", 5.2, 1900.0, -118.0);
        let target = sat(target, 50.0, 650.0, -95.0);
        HandoverEvent::d2(at, &serving, &target, ttl, Urgency::High)
    }

    #[test]
    fn test_d2_emergency_decision() {
        let mut engine = RuleBasedHandoverEngine::default();
        let d = engine.process_event(&d2(t(0), "RESCUE", 12.0)).unwrap();

        assert_eq!(d.action, DecisionAction::ExecuteHandover);
        assert_eq!(d.decision_type, Some(DecisionType::D2Emergency));
        assert_eq!(d.urgency, Urgency::Critical);
        assert_eq!(d.expected_interruption_ms, 50.0);
        assert_eq!(d.confidence, 0.95);
        assert_eq!(d.target_satellite.as_deref(), Some("RESCUE"));
        assert!(engine.state().handover_in_progress());
        assert_eq!(engine.current_serving(), Some("RESCUE"));
    }

    #[test]
    fn test_d2_not_urgent_yet() {
        let mut engine = RuleBasedHandoverEngine::default();
        assert!(engine.process_event(&d2(t(0), "RESCUE", 30.0)).is_none());
        assert!(!engine.state().handover_in_progress());
    }

    #[test]
    fn test_a4_needs_min_improvement() {
        let mut engine = RuleBasedHandoverEngine::default();
        assert!(engine.process_event(&a4(t(0), "X", 2.5)).is_none());

        let d = engine.process_event(&a4(t(1), "X", 3.0)).unwrap();
        assert_eq!(d.decision_type, Some(DecisionType::A4Opportunity));
        assert_eq!(d.urgency, Urgency::Medium);
        assert_eq!(d.expected_interruption_ms, 80.0);
        assert_eq!(d.confidence, 0.8);
    }

    #[test]
    fn test_a5_high_urgency_overrides_gain() {
        let mut engine = RuleBasedHandoverEngine::default();
        assert!(engine.process_event(&a5(t(0), "Y", 1.0, Urgency::Low)).is_none());

        let d = engine.process_event(&a5(t(1), "Y", 1.0, Urgency::High)).unwrap();
        assert_eq!(d.decision_type, Some(DecisionType::A5QualityDriven));
        assert_eq!(d.urgency, Urgency::High);
        assert_eq!(d.expected_interruption_ms, 100.0);
        assert_eq!(d.confidence, 0.7);
    }

    #[test]
    fn test_cooldown_blocks_then_releases() {
        let mut engine = RuleBasedHandoverEngine::default();
        assert!(engine.process_event(&a4(t(0), "X", 10.0)).is_some());
        engine.reset_handover_progress();

        assert!(engine.process_event(&a4(t(10), "X", 10.0)).is_none());
        assert!(engine.cooldown_remaining("X", t(10)).unwrap() > 19.9);

        assert!(engine.process_event(&a4(t(31), "X", 10.0)).is_some());
    }

    #[test]
    fn test_d2_bypasses_cooldown() {
        let mut engine = RuleBasedHandoverEngine::default();
        assert!(engine.process_event(&a4(t(0), "X", 10.0)).is_some());
        engine.reset_handover_progress();

        assert!(engine.process_event(&d2(t(5), "X", 0.0)).is_some());
    }

    #[test]
    fn test_in_progress_ignores_non_d2() {
        let mut engine = RuleBasedHandoverEngine::default();
        assert!(engine.process_event(&a4(t(0), "X", 10.0)).is_some());

        assert!(engine.process_event(&a4(t(1), "Y", 10.0)).is_none());
        assert!(engine.process_event(&a5(t(1), "Y", 20.0, Urgency::Critical)).is_none());

        let d = engine.process_event(&d2(t(2), "Z", 5.0)).unwrap();
        assert_eq!(d.target_satellite.as_deref(), Some("Z"));
        assert_eq!(engine.state().in_progress.as_ref().unwrap().decision_timestamp, t(2));
    }

    #[test]
    fn test_stuck_handover_expires() {
        let mut engine = RuleBasedHandoverEngine::default();
        assert!(engine.process_event(&a4(t(0), "X", 10.0)).is_some());

        let deadline = engine.state().in_progress.as_ref().unwrap().deadline;
        assert_eq!(deadline, t(5));

        assert!(engine.process_event(&a4(t(3), "Y", 10.0)).is_none());
        assert!(engine.process_event(&a4(t(6), "Y", 10.0)).is_some());
        assert_eq!(engine.current_status().stale_expirations, 1);
    }

    #[test]
    fn test_long_interruption_extends_deadline() {
        let config = EngineConfig {
            in_progress_timeout_ms: 100.0,
            ..Default::default()
        };
        let mut engine = RuleBasedHandoverEngine::new(config).unwrap();
        assert!(engine.process_event(&a5(t(0), "Y", 9.0, Urgency::Normal)).is_some());

        let p = engine.state().in_progress.clone().unwrap();
        assert_eq!(p.deadline, t(0) + Duration::milliseconds(200));
        assert!(!engine.expire_stale(t(0) + Duration::milliseconds(150)));
        assert!(engine.expire_stale(t(1)));
    }

    #[test]
    fn test_unknown_event_ignored() {
        let mut engine = RuleBasedHandoverEngine::default();
        let mut event = a4(t(0), "X", 10.0);
        event.event_type = EventType::Unknown;
        assert!(engine.process_event(&event).is_none());
        assert_eq!(engine.current_status().events_suppressed, 1);
    }

    #[test]
    fn test_history_is_bounded() {
        let config = EngineConfig {
            history_limit: 3,
            handover_cooldown_s: 0.0,
            ..Default::default()
        };
        let mut engine = RuleBasedHandoverEngine::new(config).unwrap();
        for i in 0..5 {
            assert!(engine.process_event(&a4(t(i * 10), "X", 10.0)).is_some());
        }
        let status = engine.current_status();
        assert_eq!(status.history_len, 3);
        assert_eq!(status.decisions_total, 5);
        assert_eq!(status.decisions_by_method.get(&DecisionMethod::RuleBased), Some(&5));
        assert_eq!(engine.state().decision_history.front().unwrap().timestamp, t(20));
    }

    #[test]
    fn test_batch_prefers_d2() {
        let mut engine = RuleBasedHandoverEngine::default();
        let batch = vec![
            a4(t(0), "A", 20.0),
            a5(t(0), "B", 6.0, Urgency::Normal),
            d2(t(0), "C", 0.0),
        ];

        let d = engine.process_events(&batch).unwrap();
        assert_eq!(d.decision_type, Some(DecisionType::D2Emergency));
        assert_eq!(engine.current_status().decisions_total, 1);
    }

    #[test]
    fn test_batch_ranks_by_urgency_then_type_then_gain() {
        let mut engine = RuleBasedHandoverEngine::default();
        let batch = vec![a4(t(0), "A", 15.0), a5(t(0), "B", 8.0, Urgency::High)];
        assert_eq!(engine.process_events(&batch).unwrap().target_satellite.as_deref(), Some("B"));

        let mut engine = RuleBasedHandoverEngine::default();
        let batch = vec![a4(t(0), "A", 4.0), a4(t(0), "B", 9.0)];
        assert_eq!(engine.process_events(&batch).unwrap().target_satellite.as_deref(), Some("B"));
    }

    #[test]
    fn test_batch_falls_through_cooldown() {
        let mut engine = RuleBasedHandoverEngine::default();
        assert!(engine.process_event(&a4(t(0), "A", 10.0)).is_some());
        engine.reset_handover_progress();

        let batch = vec![a4(t(5), "A", 12.0), a4(t(5), "B", 6.0)];
        assert_eq!(engine.process_events(&batch).unwrap().target_satellite.as_deref(), Some("B"));
    }

    #[test]
    fn test_observe_serving_only_once() {
        let mut engine = RuleBasedHandoverEngine::default();
        assert_eq!(engine.observe_serving(&[]), None);

        let snapshot = vec![sat("HIGH", 60.0, 600.0, -90.0), sat("LOW", 10.0, 1500.0, -115.0)];
        assert_eq!(engine.observe_serving(&snapshot), Some("HIGH"));

        let later = vec![sat("OTHER", 70.0, 560.0, -88.0)];
        assert_eq!(engine.observe_serving(&later), Some("HIGH"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            history_limit: 0,
            ..Default::default()
        };
        assert!(RuleBasedHandoverEngine::new(config).is_err());
    }
}
