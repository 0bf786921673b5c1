//! Handover measurement events

use crate::{SatelliteState, Urgency};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    D2,
    A4,
    A5,
    /// Any event type this engine does not understand
    #[serde(other)]
    Unknown,
}

/// Snapshot of a satellite as referenced by an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatelliteRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation_deg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azimuth_deg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsrp_dbm: Option<f64>,
    /// Fields this engine does not read, carried through unchanged
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl SatelliteRef {
    pub fn id_only(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            elevation_deg: None,
            azimuth_deg: None,
            range_km: None,
            rsrp_dbm: None,
            extra: BTreeMap::new(),
        }
    }
}

impl From<&SatelliteState> for SatelliteRef {
    fn from(s: &SatelliteState) -> Self {
        Self {
            id: s.satellite_id.clone(),
            elevation_deg: Some(s.frame.elevation_deg),
            azimuth_deg: Some(s.frame.azimuth_deg),
            range_km: Some(s.frame.range_km),
            rsrp_dbm: s.rsrp_dbm,
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoverEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub serving_satellite: SatelliteRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_satellite: Option<SatelliteRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_target: Option<SatelliteRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_los_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_advantage_db: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handover_gain_db: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serving_distance_km: Option<f64>,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl HandoverEvent {
    pub fn d2(
        timestamp: DateTime<Utc>,
        serving: &SatelliteState,
        target: &SatelliteState,
        time_to_los_seconds: f64,
        urgency: Urgency,
    ) -> Self {
        Self {
            event_type: EventType::D2,
            timestamp,
            serving_satellite: serving.into(),
            candidate_satellite: None,
            recommended_target: Some(target.into()),
            time_to_los_seconds: Some(time_to_los_seconds),
            quality_advantage_db: None,
            handover_gain_db: None,
            serving_distance_km: Some(serving.frame.range_km),
            urgency,
            extra: BTreeMap::new(),
        }
    }

    pub fn a4(
        timestamp: DateTime<Utc>,
        serving: &SatelliteState,
        candidate: &SatelliteState,
        quality_advantage_db: f64,
    ) -> Self {
        Self {
            event_type: EventType::A4,
            timestamp,
            serving_satellite: serving.into(),
            candidate_satellite: Some(candidate.into()),
            recommended_target: None,
            time_to_los_seconds: None,
            quality_advantage_db: Some(quality_advantage_db),
            handover_gain_db: None,
            serving_distance_km: None,
            urgency: Urgency::Medium,
            extra: BTreeMap::new(),
        }
    }

    pub fn a5(
        timestamp: DateTime<Utc>,
        serving: &SatelliteState,
        candidate: &SatelliteState,
        handover_gain_db: f64,
        urgency: Urgency,
    ) -> Self {
        Self {
            event_type: EventType::A5,
            timestamp,
            serving_satellite: serving.into(),
            candidate_satellite: Some(candidate.into()),
            recommended_target: None,
            time_to_los_seconds: None,
            quality_advantage_db: None,
            handover_gain_db: Some(handover_gain_db),
            serving_distance_km: None,
            urgency,
            extra: BTreeMap::new(),
        }
    }

    /// Satellite this event proposes handing over to
    pub fn target(&self) -> Option<&SatelliteRef> {
        self.recommended_target
            .as_ref()
            .or(self.candidate_satellite.as_ref())
    }

    /// Gain used when ranking events of equal priority
    pub fn gain_db(&self) -> f64 {
        self.handover_gain_db
            .or(self.quality_advantage_db)
            .filter(|g| g.is_finite())
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_type_deserializes() {
        let json = r#"{
            "type": "A3",
            "timestamp": "2025-06-01T00:00:00Z",
            "serving_satellite": {"id": "STARLINK-1007"}
        }"#;

        let event: HandoverEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event_type, EventType::Unknown);
        assert_eq!(event.urgency, Urgency::Low);
    }

    #[test]
    fn test_wire_shape() {
        let json = r#"{
            "type": "A4",
            "timestamp": "2025-06-01T00:00:10Z",
            "serving_satellite": {"id": "SAT-A", "rsrp_dbm": -112.0},
            "candidate_satellite": {"id": "SAT-B", "rsrp_dbm": -100.0},
            "quality_advantage_db": 12.0,
            "urgency": "medium"
        }"#;

        let event: HandoverEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.target().map(|t| t.id.as_str()), Some("SAT-B"));
        assert_eq!(event.gain_db(), 12.0);

        let back = serde_json::to_value(&event).unwrap();
        assert_eq!(back["type"], "A4");
        assert_eq!(back["urgency"], "medium");
        assert!(back.get("recommended_target").is_none());
    }

    #[test]
    fn test_unread_fields_round_trip() {
        let json = r#"{
            "type": "D2",
            "timestamp": "2025-06-01T00:00:20Z",
            "serving_satellite": {"id": "S", "constellation": "starlink",
                                  "distance_to_ue_km": 1600.0},
            "recommended_target": {"id": "T", "elevation": 42.5, "handover_gain_km": 450.0},
            "time_to_los_seconds": 12.0,
            "urgency": "high",
            "trigger_condition": "Ml1 > Thresh1"
        }"#;

        let event: HandoverEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.serving_satellite.extra["constellation"], "starlink");
        assert_eq!(event.extra["trigger_condition"], "Ml1 > Thresh1");

        let back = serde_json::to_value(&event).unwrap();
        let original: Value = serde_json::from_str(json).unwrap();
        assert_eq!(back, original);
    }
}
