//! Doppler compensation capability.
//!
//! LEO satellites move at ~7.5 km/s, so the carrier arrives shifted by
//! hundreds of kHz at Ka-band. A compensating receiver pre-corrects most
//! of that shift; whatever it misses lands outside the receiver passband
//! and costs signal power. Compensation is a capability: the default
//! [`NoCompensation`] leaves RSRP untouched.

use serde::{Deserialize, Serialize};
use tracing::debug;

const SPEED_OF_LIGHT_KM_S: f64 = 299_792.458;
const RECEIVER_BANDWIDTH_HZ: f64 = 10e6;
const MAX_FREQUENCY_LOSS_DB: f64 = 15.0;
/// Tracking-loop confidence assumed when no loop state is modelled
const DEFAULT_TRACKING_CONFIDENCE: f64 = 0.8;

/// Doppler shift in Hz for a line-of-sight range rate (positive = receding)
pub fn doppler_shift_hz(range_rate_km_s: f64, carrier_freq_hz: f64) -> f64 {
    -carrier_freq_hz * (range_rate_km_s / SPEED_OF_LIGHT_KM_S)
}

/// Power lost to a residual frequency offset
pub fn frequency_offset_loss_db(offset_hz: f64) -> f64 {
    let ratio = offset_hz.abs() / RECEIVER_BANDWIDTH_HZ;

    if ratio < 0.01 {
        0.0
    } else if ratio < 0.05 {
        3.0 * ratio
    } else {
        (3.0 + 8.0 * (ratio - 0.05)).min(MAX_FREQUENCY_LOSS_DB)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DopplerAdjustment {
    pub doppler_offset_hz: f64,
    pub residual_offset_hz: f64,
    pub compensation_accuracy: f64,
    pub frequency_loss_db: f64,
    pub corrected_rsrp_dbm: f64,
}

pub trait DopplerCompensation: Send + Sync {
    /// RSRP after Doppler effects. `range_rate_km_s` is `None` when the
    /// geometry carried no velocity; implementations then return the
    /// input unchanged.
    fn adjust_rsrp(
        &self,
        rsrp_dbm: f64,
        elevation_deg: f64,
        range_rate_km_s: Option<f64>,
        frequency_ghz: f64,
    ) -> f64;

    /// Enhanced RF modelling demands a larger A5 handover gain
    fn is_enhanced(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoCompensation;

impl DopplerCompensation for NoCompensation {
    fn adjust_rsrp(
        &self,
        rsrp_dbm: f64,
        _elevation_deg: f64,
        _range_rate_km_s: Option<f64>,
        _frequency_ghz: f64,
    ) -> f64 {
        rsrp_dbm
    }
}

/// Two-stage compensator model: a coarse pre-correction from geometry
/// leaves `offset * (1 - accuracy)` uncorrected, where accuracy depends on
/// signal quality and elevation.
#[derive(Debug, Clone, Copy)]
pub struct ResidualDopplerCompensator {
    pub tracking_confidence: f64,
}

impl Default for ResidualDopplerCompensator {
    fn default() -> Self {
        Self {
            tracking_confidence: DEFAULT_TRACKING_CONFIDENCE,
        }
    }
}

impl ResidualDopplerCompensator {
    pub fn accuracy(&self, rsrp_dbm: f64, elevation_deg: f64) -> f64 {
        let signal = if rsrp_dbm > -100.0 {
            0.95
        } else if rsrp_dbm > -110.0 {
            0.85
        } else if rsrp_dbm > -120.0 {
            0.7
        } else {
            0.5
        };

        let geometry = if elevation_deg > 45.0 {
            0.95
        } else if elevation_deg > 30.0 {
            0.85
        } else if elevation_deg > 15.0 {
            0.75
        } else {
            0.6
        };

        ((signal + self.tracking_confidence.clamp(0.0, 1.0) + geometry) / 3.0).min(1.0)
    }

    pub fn compensate(
        &self,
        rsrp_dbm: f64,
        elevation_deg: f64,
        range_rate_km_s: f64,
        frequency_ghz: f64,
    ) -> DopplerAdjustment {
        let doppler = doppler_shift_hz(range_rate_km_s, frequency_ghz * 1e9);
        let accuracy = self.accuracy(rsrp_dbm, elevation_deg);
        let residual = doppler * (1.0 - accuracy);
        let loss = frequency_offset_loss_db(residual);

        debug!(
            doppler_hz = doppler,
            residual_hz = residual,
            loss_db = loss,
            "Doppler residual"
        );

        DopplerAdjustment {
            doppler_offset_hz: doppler,
            residual_offset_hz: residual,
            compensation_accuracy: accuracy,
            frequency_loss_db: loss,
            corrected_rsrp_dbm: rsrp_dbm - loss,
        }
    }
}

impl DopplerCompensation for ResidualDopplerCompensator {
    fn adjust_rsrp(
        &self,
        rsrp_dbm: f64,
        elevation_deg: f64,
        range_rate_km_s: Option<f64>,
        frequency_ghz: f64,
    ) -> f64 {
        match range_rate_km_s {
            Some(rate) if rate.is_finite() => {
                self.compensate(rsrp_dbm, elevation_deg, rate, frequency_ghz)
                    .corrected_rsrp_dbm
            }
            _ => rsrp_dbm,
        }
    }

    fn is_enhanced(&self) -> bool {
        true
    }
}
