//! LEO Link Budget Calculator
//!
//! Estimates downlink RSRP for a Ka-band LEO satellite as seen by a UE.
//! Accounts for:
//! - Free space path loss
//! - Elevation-dependent atmospheric loss, scaled by environment
//! - Optional fast/shadow fading from an injected random source
//! - Optional Doppler residual loss (see [`doppler`])

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod doppler;
pub mod environment;
pub mod fading;

pub use doppler::{DopplerCompensation, NoCompensation, ResidualDopplerCompensator};
pub use environment::Environment;
pub use fading::{NoFading, RandomSource, SeededGaussian};

/// RSRP reported for a satellite that is not visible or has no usable range
pub const RSRP_FLOOR_DBM: f64 = -140.0;

const DEFAULT_TX_POWER_DBM: f64 = 43.0; // 20W EIRP-equivalent feed
const DEFAULT_RX_GAIN_DBI: f64 = 25.0; // UE phased array
const DEFAULT_FREQUENCY_GHZ: f64 = 28.0; // Ka-band downlink
const LOW_ELEVATION_CUTOFF_DEG: f64 = 5.0;
const LOW_ELEVATION_LOSS_DB: f64 = 10.0;
const ZENITH_ATMOSPHERIC_LOSS_DB: f64 = 0.5;

#[derive(Error, Debug)]
pub enum LinkBudgetError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unknown environment: {0}")]
    UnknownEnvironment(String),
}

pub type Result<T> = std::result::Result<T, LinkBudgetError>;

/// Radio parameters of the link
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkBudgetConfig {
    pub tx_power_dbm: f64,
    pub rx_gain_dbi: f64,
    pub frequency_ghz: f64,
    pub fast_fading_sigma_db: f64,
    pub shadow_fading_sigma_db: f64,
}

impl Default for LinkBudgetConfig {
    fn default() -> Self {
        Self {
            tx_power_dbm: DEFAULT_TX_POWER_DBM,
            rx_gain_dbi: DEFAULT_RX_GAIN_DBI,
            frequency_ghz: DEFAULT_FREQUENCY_GHZ,
            fast_fading_sigma_db: 2.0,
            shadow_fading_sigma_db: 4.0,
        }
    }
}

impl LinkBudgetConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.frequency_ghz > 0.0) {
            return Err(LinkBudgetError::InvalidParameter(format!(
                "frequency_ghz must be positive, got {}",
                self.frequency_ghz
            )));
        }
        if self.fast_fading_sigma_db < 0.0 || self.shadow_fading_sigma_db < 0.0 {
            return Err(LinkBudgetError::InvalidParameter(
                "fading sigma must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Free space path loss in dB (range in km, frequency in GHz)
pub fn free_space_path_loss(range_km: f64, frequency_ghz: f64) -> f64 {
    32.45 + 20.0 * range_km.log10() + 20.0 * frequency_ghz.log10()
}

/// Atmospheric loss in dB, scaled by the environment
pub fn atmospheric_loss(elevation_deg: f64, environment: Environment) -> f64 {
    let base = if elevation_deg >= LOW_ELEVATION_CUTOFF_DEG {
        ZENITH_ATMOSPHERIC_LOSS_DB / elevation_deg.to_radians().sin()
    } else {
        LOW_ELEVATION_LOSS_DB
    };

    base * environment.atmospheric_factor()
}

/// Slant range for a satellite at `sat_alt_km` seen at `elevation_deg`
/// over a spherical Earth
pub fn estimate_slant_range(elevation_deg: f64, sat_alt_km: f64) -> f64 {
    let earth_r = 6371.0;
    let sat_r = earth_r + sat_alt_km;
    let sin_el = elevation_deg.to_radians().sin();

    let range =
        -earth_r * sin_el + ((earth_r * sin_el).powi(2) + sat_r.powi(2) - earth_r.powi(2)).sqrt();

    range.max(sat_alt_km)
}

/// Detailed link budget breakdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkBudgetBreakdown {
    pub tx_power_dbm: f64,
    pub rx_gain_dbi: f64,
    pub fspl_db: f64,
    pub atmospheric_loss_db: f64,
    pub fast_fading_db: f64,
    pub shadow_fading_db: f64,
    pub rsrp_dbm: f64,
}

impl LinkBudgetBreakdown {
    fn floor(config: &LinkBudgetConfig) -> Self {
        Self {
            tx_power_dbm: config.tx_power_dbm,
            rx_gain_dbi: config.rx_gain_dbi,
            fspl_db: 0.0,
            atmospheric_loss_db: 0.0,
            fast_fading_db: 0.0,
            shadow_fading_db: 0.0,
            rsrp_dbm: RSRP_FLOOR_DBM,
        }
    }
}

/// RSRP estimator with an injected fading source.
///
/// The fading source is consumed on every estimate, so two estimators
/// seeded identically produce identical sequences.
pub struct LinkBudgetEstimator {
    config: LinkBudgetConfig,
    fading: Box<dyn RandomSource>,
}

impl LinkBudgetEstimator {
    pub fn new(config: LinkBudgetConfig, fading: Box<dyn RandomSource>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, fading })
    }

    /// Deterministic estimator: default radio, no fading
    pub fn deterministic() -> Self {
        Self {
            config: LinkBudgetConfig::default(),
            fading: Box::new(NoFading),
        }
    }

    pub fn config(&self) -> &LinkBudgetConfig {
        &self.config
    }

    pub fn estimate_rsrp(
        &mut self,
        elevation_deg: f64,
        range_km: f64,
        frequency_ghz: f64,
        environment: Environment,
    ) -> f64 {
        self.breakdown(elevation_deg, range_km, frequency_ghz, environment).rsrp_dbm
    }

    /// RSRP at the configured carrier frequency
    pub fn estimate(&mut self, elevation_deg: f64, range_km: f64, environment: Environment) -> f64 {
        let frequency_ghz = self.config.frequency_ghz;
        self.estimate_rsrp(elevation_deg, range_km, frequency_ghz, environment)
    }

    pub fn breakdown(
        &mut self,
        elevation_deg: f64,
        range_km: f64,
        frequency_ghz: f64,
        environment: Environment,
    ) -> LinkBudgetBreakdown {
        if !(elevation_deg > 0.0) || !(range_km > 0.0) || !(frequency_ghz > 0.0) {
            return LinkBudgetBreakdown::floor(&self.config);
        }

        let fspl = free_space_path_loss(range_km, frequency_ghz);
        let atm_loss = atmospheric_loss(elevation_deg, environment);
        let fast = self.fading.gaussian(self.config.fast_fading_sigma_db);
        let shadow = self.fading.gaussian(self.config.shadow_fading_sigma_db);

        let rsrp =
            self.config.tx_power_dbm + self.config.rx_gain_dbi - fspl - atm_loss + fast + shadow;

        LinkBudgetBreakdown {
            tx_power_dbm: self.config.tx_power_dbm,
            rx_gain_dbi: self.config.rx_gain_dbi,
            fspl_db: fspl,
            atmospheric_loss_db: atm_loss,
            fast_fading_db: fast,
            shadow_fading_db: shadow,
            rsrp_dbm: if rsrp.is_finite() { rsrp } else { RSRP_FLOOR_DBM },
        }
    }
}

impl std::fmt::Debug for LinkBudgetEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkBudgetEstimator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
