//! Orbital Mechanics Library
//!
//! Observer-relative geometry for LEO handover simulation: converts ECI
//! satellite position samples into elevation/azimuth/range look angles
//! for a ground observer. Propagation happens upstream; this crate only
//! consumes already-computed samples.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrbitalError {
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),
}

pub type Result<T> = std::result::Result<T, OrbitalError>;

/// ECI position in km
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EciPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl EciPosition {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// ECI velocity in km/s
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EciVelocity {
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
}

/// One precomputed position of one satellite. Produced upstream by the
/// propagator and consumed once per evaluation tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrbitSample {
    pub satellite_id: String,
    pub timestamp: DateTime<Utc>,
    pub eci_position: EciPosition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eci_velocity: Option<EciVelocity>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeodeticPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_km: f64,
}

/// Look angles from the observer to a satellite.
///
/// `elevation_deg` is always within [-90, 90] and `azimuth_deg` within
/// [0, 360). A failed transform yields [`ObserverFrame::SENTINEL`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ObserverFrame {
    pub elevation_deg: f64,
    pub azimuth_deg: f64,
    pub range_km: f64,
}

impl ObserverFrame {
    pub const SENTINEL: ObserverFrame = ObserverFrame {
        elevation_deg: -90.0,
        azimuth_deg: 0.0,
        range_km: 0.0,
    };

    pub fn is_visible(&self) -> bool {
        self.elevation_deg > 0.0
    }

    pub fn is_sentinel(&self) -> bool {
        *self == Self::SENTINEL
    }
}

/// A ground observer (UE) location.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ObserverSite {
    pub position: GeodeticPosition,
    /// Rotate the observer into the inertial frame by GMST before
    /// differencing. Off by default: samples are treated as Earth-fixed.
    #[serde(default)]
    pub earth_rotation: bool,
}

impl ObserverSite {
    pub fn new(latitude: f64, longitude: f64, altitude_km: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) || !latitude.is_finite() {
            return Err(OrbitalError::InvalidCoordinates(format!(
                "latitude {} outside [-90, 90]",
                latitude
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) || !longitude.is_finite() {
            return Err(OrbitalError::InvalidCoordinates(format!(
                "longitude {} outside [-180, 180]",
                longitude
            )));
        }
        if !altitude_km.is_finite() {
            return Err(OrbitalError::InvalidCoordinates(format!(
                "altitude {} is not finite",
                altitude_km
            )));
        }

        Ok(Self {
            position: GeodeticPosition {
                latitude,
                longitude,
                altitude_km,
            },
            earth_rotation: false,
        })
    }

    /// National Taipei University, the default research site
    pub fn ntpu() -> Self {
        Self {
            position: GeodeticPosition {
                latitude: 24.9442,
                longitude: 121.3711,
                altitude_km: 0.05,
            },
            earth_rotation: false,
        }
    }

    pub fn with_earth_rotation(mut self) -> Self {
        self.earth_rotation = true;
        self
    }

    fn sidereal_angle(&self, time: DateTime<Utc>) -> f64 {
        if self.earth_rotation {
            sidereal::gmst_rad(time)
        } else {
            0.0
        }
    }

    /// Look angles to `eci` at `time`
    pub fn look_at(&self, eci: &EciPosition, time: DateTime<Utc>) -> ObserverFrame {
        transforms::eci_to_observer_at(
            eci,
            self.position.latitude,
            self.position.longitude,
            self.position.altitude_km,
            self.sidereal_angle(time),
        )
    }

    /// Line-of-sight range rate in km/s (positive = receding).
    /// `None` when the sample carries no velocity.
    pub fn range_rate(&self, sample: &OrbitSample) -> Option<f64> {
        let velocity = sample.eci_velocity?;
        let theta = self.sidereal_angle(sample.timestamp);
        transforms::range_rate(
            &sample.eci_position,
            &velocity,
            self.position.latitude,
            self.position.longitude,
            self.position.altitude_km,
            theta,
            self.earth_rotation,
        )
    }
}

impl Default for ObserverSite {
    fn default() -> Self {
        Self::ntpu()
    }
}

pub mod transforms {
    use super::*;
    use nalgebra::{Matrix3, Vector3};

    /// Spherical Earth radius used for the observer position
    pub const EARTH_RADIUS_KM: f64 = 6371.0;
    pub const EARTH_ROTATION_RATE_RAD_S: f64 = 7.2921159e-5;

    /// Observer position for a spherical Earth, rotated by `theta_rad`
    /// about the polar axis (0 = Earth-fixed).
    pub fn observer_position(
        lat_deg: f64,
        lon_deg: f64,
        alt_km: f64,
        theta_rad: f64,
    ) -> Vector3<f64> {
        let lat = lat_deg.to_radians();
        let lon = lon_deg.to_radians() + theta_rad;
        let r = EARTH_RADIUS_KM + alt_km;

        Vector3::new(
            r * lat.cos() * lon.cos(),
            r * lat.cos() * lon.sin(),
            r * lat.sin(),
        )
    }

    /// Rotation taking a relative vector into East-North-Up
    pub fn enu_rotation(lat_rad: f64, lon_rad: f64) -> Matrix3<f64> {
        let (sin_lat, cos_lat) = lat_rad.sin_cos();
        let (sin_lon, cos_lon) = lon_rad.sin_cos();

        Matrix3::new(
            -sin_lon,
            cos_lon,
            0.0,
            -sin_lat * cos_lon,
            -sin_lat * sin_lon,
            cos_lat,
            cos_lat * cos_lon,
            cos_lat * sin_lon,
            sin_lat,
        )
    }

    /// Convert an ECI position into observer look angles.
    ///
    /// Treats the sample as Earth-fixed. Returns the sentinel frame on
    /// non-finite input or when the satellite coincides with the observer.
    pub fn eci_to_observer(
        eci: &EciPosition,
        lat_deg: f64,
        lon_deg: f64,
        alt_km: f64,
    ) -> ObserverFrame {
        eci_to_observer_at(eci, lat_deg, lon_deg, alt_km, 0.0)
    }

    /// Same as [`eci_to_observer`] with the observer rotated by the
    /// sidereal angle `theta_rad`.
    pub fn eci_to_observer_at(
        eci: &EciPosition,
        lat_deg: f64,
        lon_deg: f64,
        alt_km: f64,
        theta_rad: f64,
    ) -> ObserverFrame {
        if !eci.is_finite() || !lat_deg.is_finite() || !lon_deg.is_finite() || !alt_km.is_finite() {
            return ObserverFrame::SENTINEL;
        }

        let observer = observer_position(lat_deg, lon_deg, alt_km, theta_rad);
        let d = Vector3::new(eci.x, eci.y, eci.z) - observer;

        let range_km = d.norm();
        if !range_km.is_finite() || range_km == 0.0 {
            return ObserverFrame::SENTINEL;
        }

        let enu = enu_rotation(lat_deg.to_radians(), lon_deg.to_radians() + theta_rad) * d;
        let (east, north, up) = (enu.x, enu.y, enu.z);

        let horizontal = (east * east + north * north).sqrt();
        let elevation_deg = up.atan2(horizontal).to_degrees();

        let mut azimuth_deg = east.atan2(north).to_degrees().rem_euclid(360.0);
        // rem_euclid rounds tiny negatives up to exactly 360
        if azimuth_deg >= 360.0 {
            azimuth_deg = 0.0;
        }

        if !elevation_deg.is_finite() || !azimuth_deg.is_finite() {
            return ObserverFrame::SENTINEL;
        }

        ObserverFrame {
            elevation_deg: elevation_deg.clamp(-90.0, 90.0),
            azimuth_deg,
            range_km,
        }
    }

    /// Range rate (km/s) of a satellite relative to the observer
    pub fn range_rate(
        eci: &EciPosition,
        velocity: &EciVelocity,
        lat_deg: f64,
        lon_deg: f64,
        alt_km: f64,
        theta_rad: f64,
        earth_rotation: bool,
    ) -> Option<f64> {
        let observer = observer_position(lat_deg, lon_deg, alt_km, theta_rad);
        let d = Vector3::new(eci.x, eci.y, eci.z) - observer;
        let range = d.norm();
        if !range.is_finite() || range == 0.0 {
            return None;
        }

        let observer_velocity = if earth_rotation {
            Vector3::new(0.0, 0.0, EARTH_ROTATION_RATE_RAD_S).cross(&observer)
        } else {
            Vector3::zeros()
        };
        let relative = Vector3::new(velocity.vx, velocity.vy, velocity.vz) - observer_velocity;

        let rate = d.dot(&relative) / range;
        rate.is_finite().then_some(rate)
    }
}

pub mod sidereal {
    use super::*;
    use std::f64::consts::PI;

    /// Greenwich Mean Sidereal Time in radians, normalized to [0, 2π)
    pub fn gmst_rad(time: DateTime<Utc>) -> f64 {
        let unix_seconds = time.timestamp() as f64 + time.timestamp_subsec_nanos() as f64 * 1e-9;

        // Julian centuries from J2000.0
        let jd = unix_seconds / 86400.0 + 2440587.5;
        let t = (jd - 2451545.0) / 36525.0;

        let gmst_sec = 67310.54841 + (876600.0 * 3600.0 + 8640184.812866) * t + 0.093104 * t * t
            - 6.2e-6 * t * t * t;

        ((gmst_sec / 240.0) * (PI / 180.0)).rem_euclid(2.0 * PI)
    }
}
