//! D2/A4/A5 measurement event detection
//!
//! Evaluates the serving satellite against every candidate at one tick:
//! - D2: serving beyond `thresh1` km while a candidate is within `thresh2` km
//! - A4: candidate RSRP above an absolute threshold
//! - A5: serving below `thresh1` dBm while a candidate is above `thresh2` dBm
//!
//! The detector reports every triggered event. Precedence between them is
//! the engine's job.

use crate::event::HandoverEvent;
use crate::{SatelliteState, Urgency};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// D2 distance thresholds (km)
pub const D2_THRESH1_KM: f64 = 1500.0;
pub const D2_THRESH2_KM: f64 = 1200.0;
pub const D2_HYSTERESIS_KM: f64 = 50.0;

/// A4/A5 RSRP thresholds (dBm)
pub const A4_THRESHOLD_DBM: f64 = -110.0;
pub const A5_THRESH1_DBM: f64 = -115.0;
pub const A5_THRESH2_DBM: f64 = -105.0;
pub const RSRP_HYSTERESIS_DB: f64 = 3.0;

/// Minimum A5 gain, plain and with enhanced RF modelling
pub const A5_MIN_GAIN_DB: f64 = 3.0;
pub const A5_ENHANCED_MIN_GAIN_DB: f64 = 5.0;

/// Seconds of visibility assumed per degree above the critical elevation
const SECONDS_PER_DEGREE: f64 = 60.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub d2_thresh1_km: f64,
    pub d2_thresh2_km: f64,
    pub d2_hysteresis_km: f64,
    pub a4_threshold_dbm: f64,
    pub a5_thresh1_dbm: f64,
    pub a5_thresh2_dbm: f64,
    pub rsrp_hysteresis_db: f64,
    pub a5_min_gain_db: f64,
    pub a5_enhanced_min_gain_db: f64,
    /// Elevation at which the serving link is considered lost
    pub critical_elevation_deg: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            d2_thresh1_km: D2_THRESH1_KM,
            d2_thresh2_km: D2_THRESH2_KM,
            d2_hysteresis_km: D2_HYSTERESIS_KM,
            a4_threshold_dbm: A4_THRESHOLD_DBM,
            a5_thresh1_dbm: A5_THRESH1_DBM,
            a5_thresh2_dbm: A5_THRESH2_DBM,
            rsrp_hysteresis_db: RSRP_HYSTERESIS_DB,
            a5_min_gain_db: A5_MIN_GAIN_DB,
            a5_enhanced_min_gain_db: A5_ENHANCED_MIN_GAIN_DB,
            critical_elevation_deg: 5.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventDetector {
    config: DetectorConfig,
    enhanced_rf: bool,
}

impl EventDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            enhanced_rf: false,
        }
    }

    /// Require the larger A5 gain (set when Doppler compensation is active)
    pub fn with_enhanced_rf(mut self, enhanced: bool) -> Self {
        self.enhanced_rf = enhanced;
        self
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn min_a5_gain_db(&self) -> f64 {
        if self.enhanced_rf {
            self.config.a5_enhanced_min_gain_db
        } else {
            self.config.a5_min_gain_db
        }
    }

    /// All events triggered at `tick`, D2 first, then A4s, then A5s
    pub fn detect(
        &self,
        tick: DateTime<Utc>,
        serving: &SatelliteState,
        candidates: &[SatelliteState],
    ) -> Vec<HandoverEvent> {
        if let Err(e) = serving.check_frame() {
            debug!("Serving satellite unusable: {}", e);
            return Vec::new();
        }

        let usable: Vec<&SatelliteState> = candidates
            .iter()
            .filter(|c| c.satellite_id != serving.satellite_id)
            .filter(|c| match c.check_frame().and_then(|()| c.check_rsrp()) {
                Ok(_) if c.frame.elevation_deg > 0.0 => true,
                Ok(_) => {
                    debug!("Skipping {}: below horizon", c.satellite_id);
                    false
                }
                Err(e) => {
                    debug!("Skipping candidate: {}", e);
                    false
                }
            })
            .collect();

        let mut events = Vec::new();

        if let Some(event) = self.detect_d2(tick, serving, &usable) {
            events.push(event);
        }

        // D2 is geometric, so a serving link without RSRP still gets it
        match serving.check_rsrp() {
            Ok(serving_rsrp) => {
                events.extend(self.detect_a4(tick, serving, serving_rsrp, &usable));
                events.extend(self.detect_a5(tick, serving, serving_rsrp, &usable));
            }
            Err(e) => debug!("Skipping A4/A5: {}", e),
        }

        events
    }

    fn detect_d2(
        &self,
        tick: DateTime<Utc>,
        serving: &SatelliteState,
        candidates: &[&SatelliteState],
    ) -> Option<HandoverEvent> {
        let c = &self.config;
        if serving.range_km() - c.d2_hysteresis_km <= c.d2_thresh1_km {
            return None;
        }

        // Lowest range wins; exact ties go to the lowest satellite id
        let target = candidates
            .iter()
            .filter(|cand| cand.range_km() + c.d2_hysteresis_km < c.d2_thresh2_km)
            .min_by(|a, b| {
                a.range_km()
                    .partial_cmp(&b.range_km())
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| a.satellite_id.cmp(&b.satellite_id))
            })?;

        let time_to_los =
            ((serving.elevation_deg() - c.critical_elevation_deg) * SECONDS_PER_DEGREE).max(0.0);
        let urgency = distance_urgency(serving.range_km());

        debug!(
            serving = %serving.satellite_id,
            target = %target.satellite_id,
            serving_km = serving.range_km(),
            target_km = target.range_km(),
            "D2 triggered"
        );

        Some(HandoverEvent::d2(tick, serving, target, time_to_los, urgency))
    }

    fn detect_a4(
        &self,
        tick: DateTime<Utc>,
        serving: &SatelliteState,
        serving_rsrp: f64,
        candidates: &[&SatelliteState],
    ) -> Vec<HandoverEvent> {
        let c = &self.config;
        candidates
            .iter()
            .filter_map(|cand| {
                let rsrp = cand.check_rsrp().ok()?;
                let measured = cand.offset_rsrp()?;
                if measured - c.rsrp_hysteresis_db > c.a4_threshold_dbm {
                    Some(HandoverEvent::a4(tick, serving, cand, rsrp - serving_rsrp))
                } else {
                    None
                }
            })
            .collect()
    }

    fn detect_a5(
        &self,
        tick: DateTime<Utc>,
        serving: &SatelliteState,
        serving_rsrp: f64,
        candidates: &[&SatelliteState],
    ) -> Vec<HandoverEvent> {
        let c = &self.config;
        if serving_rsrp + c.rsrp_hysteresis_db >= c.a5_thresh1_dbm {
            return Vec::new();
        }

        let min_gain = self.min_a5_gain_db();

        candidates
            .iter()
            .filter_map(|cand| {
                let rsrp = cand.check_rsrp().ok()?;
                let measured = cand.offset_rsrp()?;
                if measured - c.rsrp_hysteresis_db <= c.a5_thresh2_dbm {
                    return None;
                }

                let gain = rsrp - serving_rsrp;
                if gain < min_gain {
                    debug!(
                        candidate = %cand.satellite_id,
                        gain_db = gain,
                        min_gain_db = min_gain,
                        "A5 suppressed, gain too small"
                    );
                    return None;
                }

                let urgency = a5_urgency(serving.elevation_deg(), gain);
                Some(HandoverEvent::a5(tick, serving, cand, gain, urgency))
            })
            .collect()
    }
}

/// D2 urgency from the serving satellite distance
pub fn distance_urgency(serving_range_km: f64) -> Urgency {
    if serving_range_km > 2000.0 {
        Urgency::Critical
    } else if serving_range_km > 1800.0 {
        Urgency::High
    } else if serving_range_km > 1500.0 {
        Urgency::Medium
    } else {
        Urgency::Low
    }
}

/// A5 urgency from serving elevation and handover gain
pub fn a5_urgency(serving_elevation_deg: f64, gain_db: f64) -> Urgency {
    if serving_elevation_deg < 5.0 && gain_db > 10.0 {
        Urgency::Critical
    } else if serving_elevation_deg < 8.0 && gain_db > 7.0 {
        Urgency::High
    } else if gain_db > 5.0 {
        Urgency::Normal
    } else {
        Urgency::Low
    }
}
