//! Per-tick handover pipeline
//!
//! [`HandoverService`] owns the engine and metrics behind one mutex, so
//! decisions and results are applied in the order they arrive.

use crate::config::SceneConfig;
use crate::data_access::HandoverDataAccess;
use crate::decision::{HandoverDecision, HandoverResult};
use crate::detector::{DetectorConfig, EventDetector};
use crate::engine::{EngineConfig, EngineStatus, RuleBasedHandoverEngine};
use crate::event::HandoverEvent;
use crate::metrics::{HandoverKpis, HandoverMetrics};
use crate::phase::{self, HandoverPhase, ItuCompliance, PhaseThresholds};
use crate::{Environment, HandoverError, Result, SatelliteState, Urgency};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

/// Everything one tick produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickOutcome {
    pub timestamp: DateTime<Utc>,
    pub serving: Option<SatelliteState>,
    pub phase: HandoverPhase,
    /// How close the serving link is to the critical floor
    pub elevation_urgency: Urgency,
    pub itu_compliance: ItuCompliance,
    pub events: Vec<HandoverEvent>,
    pub decision: HandoverDecision,
}

struct ServiceState {
    engine: RuleBasedHandoverEngine,
    metrics: HandoverMetrics,
    /// Newest tick applied to the engine
    last_tick: Option<DateTime<Utc>>,
}

pub struct HandoverService<D: HandoverDataAccess> {
    data: D,
    thresholds: PhaseThresholds,
    detector: EventDetector,
    inner: Mutex<ServiceState>,
}

impl<D: HandoverDataAccess> HandoverService<D> {
    pub fn new(
        data: D,
        scene: &SceneConfig,
        environment: Option<Environment>,
        engine_config: EngineConfig,
        detector_config: DetectorConfig,
        enhanced_rf: bool,
    ) -> Result<Self> {
        scene.validate()?;
        let thresholds = scene.thresholds(environment)?;

        let detector_config = DetectorConfig {
            critical_elevation_deg: thresholds.critical_deg,
            ..detector_config
        };

        Ok(Self {
            data,
            thresholds,
            detector: EventDetector::new(detector_config).with_enhanced_rf(enhanced_rf),
            inner: Mutex::new(ServiceState {
                engine: RuleBasedHandoverEngine::new(engine_config)?,
                metrics: HandoverMetrics::new(),
                last_tick: None,
            }),
        })
    }

    /// Default engine and detector settings
    pub fn with_defaults(
        data: D,
        scene: &SceneConfig,
        environment: Option<Environment>,
    ) -> Result<Self> {
        Self::new(
            data,
            scene,
            environment,
            EngineConfig::default(),
            DetectorConfig::default(),
            false,
        )
    }

    pub fn thresholds(&self) -> &PhaseThresholds {
        &self.thresholds
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    /// Run the pipeline for one tick. Fails only when no snapshot exists.
    pub fn evaluate_tick(&self, timestamp: DateTime<Utc>) -> Result<TickOutcome> {
        let snapshot = self.data.get_visible_satellites(timestamp)?;
        self.evaluate_snapshot(timestamp, &snapshot)
    }

    /// Run the pipeline on a snapshot the caller already fetched.
    /// `snapshot` must be ordered highest elevation first.
    pub fn evaluate_snapshot(
        &self,
        timestamp: DateTime<Utc>,
        snapshot: &[SatelliteState],
    ) -> Result<TickOutcome> {
        let Some(best) = snapshot.first() else {
            return Err(HandoverError::DataUnavailable(format!(
                "empty snapshot at {}",
                timestamp
            )));
        };

        let mut inner = self.inner.lock();
        let ServiceState {
            engine,
            metrics,
            last_tick,
        } = &mut *inner;

        if let Some(last) = *last_tick {
            if timestamp < last {
                warn!("Tick {} is older than {}, not applied", timestamp, last);
                let serving = engine.current_serving();
                return Ok(self.passive_outcome(timestamp, serving, snapshot, last));
            }
        }
        *last_tick = Some(timestamp);

        engine.expire_stale(timestamp);
        let serving_id = engine.observe_serving(snapshot).map(str::to_owned);

        let Some(serving) = serving_id
            .as_deref()
            .and_then(|id| snapshot.iter().find(|s| s.satellite_id == id))
            .cloned()
        else {
            // Serving satellite is no longer in view
            let lost = serving_id.unwrap_or_default();
            let reacquired = best.satellite_id.clone();
            warn!("Serving satellite {} lost, reacquiring {}", lost, reacquired);
            engine.reset_handover_progress();
            engine.set_serving(reacquired.clone());

            return Ok(TickOutcome {
                timestamp,
                serving: None,
                phase: HandoverPhase::Disconnected,
                elevation_urgency: Urgency::Critical,
                itu_compliance: ItuCompliance::BelowMinimum,
                events: Vec::new(),
                decision: HandoverDecision::no_action(
                    timestamp,
                    Some(reacquired.clone()),
                    format!("serving {} lost, reacquired {}", lost, reacquired),
                ),
            });
        };

        let phase = phase::classify(serving.elevation_deg(), &self.thresholds);
        let candidates: Vec<SatelliteState> = snapshot
            .iter()
            .filter(|s| s.satellite_id != serving.satellite_id)
            .cloned()
            .collect();

        let events = self.detector.detect(timestamp, &serving, &candidates);

        let started = Instant::now();
        let decision = engine.process_events(&events);
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        let decision = match decision {
            Some(d) => {
                metrics.record_decision(&d, latency_ms);
                d
            }
            None => HandoverDecision::no_action(
                timestamp,
                Some(serving.satellite_id.clone()),
                if events.is_empty() {
                    format!("{:?}: no events", phase)
                } else {
                    format!("{:?}: {} events, none accepted", phase, events.len())
                },
            ),
        };

        debug!(
            serving = %serving.satellite_id,
            elevation = serving.elevation_deg(),
            ?phase,
            events = events.len(),
            action = ?decision.action,
            "Tick evaluated"
        );

        Ok(TickOutcome {
            timestamp,
            elevation_urgency: phase::elevation_urgency(serving.elevation_deg(), &self.thresholds),
            itu_compliance: phase::itu_compliance(serving.elevation_deg(), &self.thresholds),
            serving: Some(serving),
            phase,
            events,
            decision,
        })
    }

    /// Outcome for a tick that arrived after a later one was applied.
    /// Reports the geometry but leaves engine and metrics untouched.
    fn passive_outcome(
        &self,
        timestamp: DateTime<Utc>,
        serving_id: Option<&str>,
        snapshot: &[SatelliteState],
        last_tick: DateTime<Utc>,
    ) -> TickOutcome {
        let serving = serving_id.and_then(|id| snapshot.iter().find(|s| s.satellite_id == id));
        let elevation = serving.map_or(f64::NAN, |s| s.elevation_deg());

        TickOutcome {
            timestamp,
            serving: serving.cloned(),
            phase: phase::classify(elevation, &self.thresholds),
            elevation_urgency: phase::elevation_urgency(elevation, &self.thresholds),
            itu_compliance: phase::itu_compliance(elevation, &self.thresholds),
            events: Vec::new(),
            decision: HandoverDecision::no_action(
                timestamp,
                serving_id.map(str::to_owned),
                format!("stale tick, {} already applied", last_tick),
            ),
        }
    }

    /// Report the outcome of the decision made at `decision_id` and release
    /// the engine for the next handover
    pub fn record_result(&self, decision_id: DateTime<Utc>, result: HandoverResult) -> bool {
        let mut inner = self.inner.lock();
        let matches_in_progress = inner
            .engine
            .state()
            .in_progress
            .as_ref()
            .is_some_and(|p| p.decision_timestamp == decision_id);
        if matches_in_progress {
            inner.engine.reset_handover_progress();
        }
        inner.metrics.record_result(decision_id, result)
    }

    pub fn reset_handover_progress(&self) {
        self.inner.lock().engine.reset_handover_progress();
    }

    pub fn kpis(&self) -> HandoverKpis {
        self.inner.lock().metrics.kpis()
    }

    pub fn engine_status(&self) -> EngineStatus {
        self.inner.lock().engine.current_status()
    }

    /// Decisions awaiting a result, oldest first
    pub fn pending_decisions(&self) -> Vec<DateTime<Utc>> {
        self.inner.lock().metrics.pending().map(|(id, _)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{DecisionAction, DecisionType};
    use crate::ObserverFrame;
    use chrono::{Duration, TimeZone};
    use std::collections::BTreeMap;

    /// Scripted snapshots keyed by seconds from start
    struct Scripted(BTreeMap<i64, Vec<SatelliteState>>);

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    impl HandoverDataAccess for Scripted {
        fn get_visible_satellites(&self, timestamp: DateTime<Utc>) -> Result<Vec<SatelliteState>> {
            let key = (timestamp - start()).num_seconds();
            self.0
                .get(&key)
                .cloned()
                .ok_or_else(|| HandoverError::DataUnavailable(timestamp.to_string()))
        }
    }

    fn sat(id: &str, elevation: f64, range: f64, rsrp: f64) -> SatelliteState {
        SatelliteState::new(
            id,
            ObserverFrame {
                elevation_deg: elevation,
                azimuth_deg: 200.0,
                range_km: range,
            },
            Some(rsrp),
        )
    }

    fn service(script: Vec<(i64, Vec<SatelliteState>)>) -> HandoverService<Scripted> {
        HandoverService::with_defaults(
            Scripted(script.into_iter().collect()),
            &SceneConfig::default(),
            Some(Environment::Open),
        )
        .unwrap()
    }

    #[test]
    fn test_no_data_is_error() {
        let svc = service(vec![]);
        assert!(matches!(svc.evaluate_tick(start()), Err(HandoverError::DataUnavailable(_))));
    }

    #[test]
    fn test_a4_decision_recorded() {
        let svc = service(vec![(
            0,
            vec![sat("SERV", 30.0, 900.0, -113.0), sat("NEXT", 25.0, 1000.0, -100.0)],
        )]);

        let out = svc.evaluate_tick(start()).unwrap();
        assert_eq!(out.phase, HandoverPhase::Monitoring);
        assert_eq!(out.decision.action, DecisionAction::ExecuteHandover);
        assert_eq!(out.decision.decision_type, Some(DecisionType::A4Opportunity));
        assert_eq!(svc.pending_decisions(), vec![start()]);

        assert!(svc.record_result(out.decision.id(), HandoverResult::succeeded(75, start())));
        let kpis = svc.kpis();
        assert_eq!(kpis.successful_handovers, 1);
        assert_eq!(svc.engine_status().current_serving_satellite_id.as_deref(), Some("NEXT"));
        assert!(svc.engine_status().in_progress.is_none());
    }

    #[test]
    fn test_quiet_tick_is_no_action() {
        let svc = service(vec![(0, vec![sat("ONLY", 12.0, 1100.0, -105.0)])]);
        let out = svc.evaluate_tick(start()).unwrap();

        assert_eq!(out.phase, HandoverPhase::PreHandover);
        assert_eq!(out.itu_compliance, ItuCompliance::Standard);
        assert_eq!(out.elevation_urgency, Urgency::Low);
        assert_eq!(out.decision.action, DecisionAction::NoAction);
        assert!(out.events.is_empty());
        assert_eq!(svc.kpis().total_decisions, 0);
    }

    #[test]
    fn test_serving_lost_reacquires() {
        let svc = service(vec![
            (0, vec![sat("FIRST", 40.0, 700.0, -95.0)]),
            (10, vec![sat("SECOND", 35.0, 750.0, -96.0)]),
        ]);

        svc.evaluate_tick(start()).unwrap();
        let out = svc.evaluate_tick(start() + Duration::seconds(10)).unwrap();

        assert_eq!(out.phase, HandoverPhase::Disconnected);
        assert_eq!(out.decision.action, DecisionAction::NoAction);
        assert_eq!(svc.engine_status().current_serving_satellite_id.as_deref(), Some("SECOND"));
    }

    #[test]
    fn test_stale_tick_not_applied() {
        let svc = service(vec![
            (0, vec![sat("SERV", 30.0, 900.0, -113.0), sat("NEXT", 25.0, 1000.0, -100.0)]),
            (10, vec![sat("SERV", 29.0, 920.0, -113.5)]),
        ]);

        svc.evaluate_tick(start() + Duration::seconds(10)).unwrap();
        let late = svc.evaluate_tick(start()).unwrap();

        // The A4 opportunity at t=0 arrived too late to act on
        assert_eq!(late.decision.action, DecisionAction::NoAction);
        assert!(late.events.is_empty());
        assert_eq!(late.phase, HandoverPhase::Monitoring);
        assert_eq!(late.serving.as_ref().unwrap().satellite_id, "SERV");
        assert_eq!(svc.kpis().total_decisions, 0);
        assert_eq!(svc.engine_status().current_serving_satellite_id.as_deref(), Some("SERV"));
    }

    #[test]
    fn test_evaluate_snapshot_matches_tick() {
        let snapshot = vec![sat("SERV", 30.0, 900.0, -113.0), sat("NEXT", 25.0, 1000.0, -100.0)];
        let svc = service(vec![]);

        let out = svc.evaluate_snapshot(start(), &snapshot).unwrap();
        assert_eq!(out.decision.decision_type, Some(DecisionType::A4Opportunity));
        assert!(matches!(
            svc.evaluate_snapshot(start(), &[]),
            Err(HandoverError::DataUnavailable(_))
        ));
    }
}
