//! LEO NTN Handover Decision Pipeline
//!
//! Turns per-tick satellite geometry into handover decisions:
//!
//! ```text
//! OrbitSample → look angles → RSRP → {phase, D2/A4/A5 events}
//!             → rule engine → HandoverDecision → metrics
//! ```
//!
//! # Measurement events (3GPP TS 38.331 NTN)
//!
//! | Event | Trigger | Engine action |
//! |-------|---------|---------------|
//! | D2    | serving too far, a closer candidate exists | emergency handover, bypasses cooldown |
//! | A4    | neighbour RSRP above absolute threshold | opportunistic handover |
//! | A5    | serving below T1 and neighbour above T2 | quality-driven handover |
//!
//! Geometry lives in `orbital-mechanics`, RF estimation in `link-budget`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod config;
pub mod data_access;
pub mod decision;
pub mod detector;
pub mod engine;
pub mod event;
pub mod metrics;
pub mod phase;
pub mod service;

pub use config::SceneConfig;
pub use data_access::{HandoverDataAccess, SampleTable, SnapshotBuilder};
pub use decision::{DecisionAction, DecisionType, HandoverDecision, HandoverResult};
pub use detector::{DetectorConfig, EventDetector};
pub use engine::{EngineConfig, EngineState, RuleBasedHandoverEngine};
pub use event::{EventType, HandoverEvent, SatelliteRef};
pub use link_budget::Environment;
pub use metrics::{HandoverKpis, HandoverMetrics, PerformanceGrade};
pub use orbital_mechanics::{ObserverFrame, ObserverSite, OrbitSample};
pub use phase::{HandoverPhase, PhaseThresholds};
pub use service::HandoverService;

#[derive(Error, Debug)]
pub enum HandoverError {
    #[error("No satellite data available: {0}")]
    DataUnavailable(String),

    #[error("Scene config not found: {0}")]
    ConfigNotFound(String),

    #[error("Invalid measurement for {satellite_id}: {reason}")]
    InvalidMeasurement { satellite_id: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    LinkBudget(#[from] link_budget::LinkBudgetError),

    #[error(transparent)]
    Orbital(#[from] orbital_mechanics::OrbitalError),
}

pub type Result<T> = std::result::Result<T, HandoverError>;

/// Urgency attached to events and decisions, ordered low to critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[default]
    Low,
    Normal,
    Medium,
    High,
    Critical,
}

/// Received power outside this window is a measurement fault.
/// The lower edge leaves room below the link-budget floor for Doppler loss.
pub const MIN_PLAUSIBLE_RSRP_DBM: f64 = -160.0;
pub const MAX_PLAUSIBLE_RSRP_DBM: f64 = 0.0;

/// One satellite as seen from the UE at one tick
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SatelliteState {
    pub satellite_id: String,
    pub frame: ObserverFrame,
    /// Absent when the link budget could not be evaluated
    #[serde(default)]
    pub rsrp_dbm: Option<f64>,
    #[serde(default)]
    pub range_rate_km_s: Option<f64>,
    /// Measurement object offset (Ofn)
    #[serde(default)]
    pub offset_mo_db: f64,
    /// Cell individual offset (Ocn)
    #[serde(default)]
    pub cell_offset_db: f64,
}

impl SatelliteState {
    pub fn new(
        satellite_id: impl Into<String>,
        frame: ObserverFrame,
        rsrp_dbm: Option<f64>,
    ) -> Self {
        Self {
            satellite_id: satellite_id.into(),
            frame,
            rsrp_dbm,
            range_rate_km_s: None,
            offset_mo_db: 0.0,
            cell_offset_db: 0.0,
        }
    }

    pub fn elevation_deg(&self) -> f64 {
        self.frame.elevation_deg
    }

    pub fn range_km(&self) -> f64 {
        self.frame.range_km
    }

    /// Geometry is finite and physically possible
    pub fn check_frame(&self) -> Result<()> {
        let f = &self.frame;
        if !f.elevation_deg.is_finite() || !f.azimuth_deg.is_finite() || !f.range_km.is_finite() {
            return Err(self.invalid("non-finite frame".to_string()));
        }
        if !(-90.0..=90.0).contains(&f.elevation_deg) {
            return Err(self.invalid(format!("elevation {}°", f.elevation_deg)));
        }
        if !(0.0..360.0).contains(&f.azimuth_deg) {
            return Err(self.invalid(format!("azimuth {}°", f.azimuth_deg)));
        }
        if f.range_km <= 0.0 {
            return Err(self.invalid(format!("range {} km", f.range_km)));
        }
        Ok(())
    }

    /// Measured RSRP, if present and within physical bounds
    pub fn check_rsrp(&self) -> Result<f64> {
        let rsrp = self
            .rsrp_dbm
            .ok_or_else(|| self.invalid("no RSRP".to_string()))?;
        if !(MIN_PLAUSIBLE_RSRP_DBM..=MAX_PLAUSIBLE_RSRP_DBM).contains(&rsrp) {
            return Err(self.invalid(format!("RSRP {} dBm", rsrp)));
        }
        Ok(rsrp)
    }

    fn invalid(&self, reason: String) -> HandoverError {
        HandoverError::InvalidMeasurement {
            satellite_id: self.satellite_id.clone(),
            reason,
        }
    }

    /// RSRP including measurement and cell offsets
    pub fn offset_rsrp(&self) -> Option<f64> {
        self.check_rsrp()
            .ok()
            .map(|r| r + self.offset_mo_db + self.cell_offset_db)
    }
}
