//! End-to-end pipeline tests

use chrono::{DateTime, Duration, TimeZone, Utc};
use handover_engine::data_access::{load_samples, HandoverDataAccess, SampleTable, SnapshotBuilder};
use handover_engine::decision::{DecisionAction, DecisionType};
use handover_engine::{
    Environment, HandoverError, HandoverEvent, HandoverPhase, HandoverResult, HandoverService,
    ObserverFrame, RuleBasedHandoverEngine, SatelliteState, SceneConfig,
};
use link_budget::LinkBudgetEstimator;
use std::collections::BTreeMap;
use std::io::Write;
use tempfile::NamedTempFile;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
}

/// Snapshots keyed by seconds from `start()`
struct Script(BTreeMap<i64, Vec<SatelliteState>>);

impl HandoverDataAccess for Script {
    fn get_visible_satellites(
        &self,
        timestamp: DateTime<Utc>,
    ) -> handover_engine::Result<Vec<SatelliteState>> {
        self.0
            .get(&(timestamp - start()).num_seconds())
            .cloned()
            .ok_or_else(|| HandoverError::DataUnavailable(timestamp.to_string()))
    }
}

fn lone_satellite(elevation: f64) -> Vec<SatelliteState> {
    vec![SatelliteState::new(
        "STARLINK-30042",
        ObserverFrame {
            elevation_deg: elevation,
            azimuth_deg: 310.0,
            range_km: 1400.0,
        },
        Some(-104.0),
    )]
}

#[test]
fn setting_satellite_without_candidates_makes_no_decision() {
    let script = Script(
        [(0, lone_satellite(12.0)), (30, lone_satellite(8.0)), (60, lone_satellite(4.0))]
            .into_iter()
            .collect(),
    );
    let service =
        HandoverService::with_defaults(script, &SceneConfig::default(), Some(Environment::Open))
            .unwrap();

    let phases: Vec<HandoverPhase> = [0, 30, 60]
        .iter()
        .map(|s| {
            let out = service.evaluate_tick(start() + Duration::seconds(*s)).unwrap();
            assert_eq!(out.decision.action, DecisionAction::NoAction);
            assert!(out.events.is_empty());
            out.phase
        })
        .collect();

    assert_eq!(
        phases,
        vec![HandoverPhase::PreHandover, HandoverPhase::Execution, HandoverPhase::Critical]
    );
    assert_eq!(service.kpis().total_decisions, 0);
    assert_eq!(service.engine_status().decisions_total, 0);
}

#[test]
fn setting_satellite_triggers_d2_emergency_from_orbit_samples() {
    // Observer on the equator at the prime meridian; OLD starts overhead
    // and is near the horizon 60 s later when NEW rises overhead.
    let json = r#"[
        {"satellite_id": "OLD", "timestamp": "2025-06-01T08:00:00Z",
         "eci_position": {"x": 6921.0, "y": 0.0, "z": 0.0}},
        {"satellite_id": "OLD", "timestamp": "2025-06-01T08:01:00Z",
         "eci_position": {"x": 6471.0, "y": 1897.0, "z": 0.0}},
        {"satellite_id": "NEW", "timestamp": "2025-06-01T08:01:00Z",
         "eci_position": {"x": 6921.0, "y": 0.0, "z": 0.0}},
        {"satellite_id": "BROKEN", "timestamp": "2025-06-01T08:01:00Z"}
    ]"#;
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();

    let scene = SceneConfig {
        observer_lat: Some(0.0),
        observer_lon: Some(0.0),
        observer_alt_km: Some(0.0),
        ..SceneConfig::default()
    };
    let builder = SnapshotBuilder::new(
        scene.observer().unwrap(),
        Environment::Open,
        LinkBudgetEstimator::deterministic(),
    );
    let table = SampleTable::new(load_samples(file.path()).unwrap(), builder);
    let ticks = table.timestamps();
    assert_eq!(ticks.len(), 2);

    let service = HandoverService::with_defaults(table, &scene, Some(Environment::Open)).unwrap();

    let first = service.evaluate_tick(ticks[0]).unwrap();
    assert_eq!(first.phase, HandoverPhase::Monitoring);
    assert_eq!(first.serving.as_ref().unwrap().satellite_id, "OLD");

    let second = service.evaluate_tick(ticks[1]).unwrap();
    assert_eq!(second.phase, HandoverPhase::Critical);
    assert!(second.events.iter().any(|e| e.event_type == handover_engine::EventType::A4));

    let decision = second.decision;
    assert_eq!(decision.decision_type, Some(DecisionType::D2Emergency));
    assert_eq!(decision.source_satellite.as_deref(), Some("OLD"));
    assert_eq!(decision.target_satellite.as_deref(), Some("NEW"));
    assert_eq!(decision.expected_interruption_ms, 50.0);

    assert!(service.record_result(decision.id(), HandoverResult::succeeded(48, ticks[1])));
    let kpis = service.kpis();
    assert_eq!(kpis.successful_handovers, 1);
    assert_eq!(kpis.per_type[&DecisionType::D2Emergency].decisions, 1);
    assert_eq!(
        service.engine_status().current_serving_satellite_id.as_deref(),
        Some("NEW")
    );
}

#[test]
fn json_events_respect_cooldown() {
    let event = |secs: u32| -> HandoverEvent {
        let json = format!(
            r#"{{"type": "A4", "timestamp": "2025-06-01T08:00:{:02}Z",
                "serving_satellite": {{"id": "SERV", "rsrp_dbm": -112.0}},
                "candidate_satellite": {{"id": "X", "rsrp_dbm": -100.0}},
                "quality_advantage_db": 12.0, "urgency": "medium"}}"#,
            secs
        );
        serde_json::from_str(&json).unwrap()
    };

    let mut engine = RuleBasedHandoverEngine::default();
    let first = engine.process_event(&event(0)).unwrap();
    assert_eq!(first.decision_type, Some(DecisionType::A4Opportunity));
    engine.reset_handover_progress();

    assert!(engine.process_event(&event(10)).is_none());
    assert!(engine.process_event(&event(31)).is_some());
}

#[test]
fn unknown_event_types_are_ignored() {
    let json = r#"{"type": "D1", "timestamp": "2025-06-01T08:00:00Z",
                   "serving_satellite": {"id": "SERV"},
                   "recommended_target": {"id": "X"}}"#;
    let event: HandoverEvent = serde_json::from_str(json).unwrap();

    let mut engine = RuleBasedHandoverEngine::default();
    assert!(engine.process_events(&[event]).is_none());
    assert!(!engine.state().handover_in_progress());
}
