//! Per-tick satellite snapshots
//!
//! [`HandoverDataAccess`] is the seam to whatever holds propagated orbit
//! data. [`SampleTable`] is the in-memory implementation used by the
//! simulator: it keeps precomputed samples per satellite and turns the
//! nearest one into a [`SatelliteState`] through a [`SnapshotBuilder`].

use crate::{Environment, HandoverError, ObserverSite, OrbitSample, Result, SatelliteState};
use chrono::{DateTime, Duration, Utc};
use link_budget::{DopplerCompensation, LinkBudgetEstimator, NoCompensation};
use orbital_mechanics::{EciPosition, EciVelocity};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

/// Samples further than this from the requested tick are ignored
pub const DEFAULT_MAX_STALENESS_S: i64 = 30;

pub trait HandoverDataAccess: Send + Sync {
    /// Visible satellites at `timestamp`, highest elevation first
    fn get_visible_satellites(&self, timestamp: DateTime<Utc>) -> Result<Vec<SatelliteState>>;
}

/// OrbitSample → look angles → RSRP
pub struct SnapshotBuilder {
    site: ObserverSite,
    environment: Environment,
    estimator: LinkBudgetEstimator,
    doppler: Box<dyn DopplerCompensation>,
    offset_mo_db: f64,
    cell_offset_db: f64,
}

impl SnapshotBuilder {
    pub fn new(
        site: ObserverSite,
        environment: Environment,
        estimator: LinkBudgetEstimator,
    ) -> Self {
        Self {
            site,
            environment,
            estimator,
            doppler: Box::new(NoCompensation),
            offset_mo_db: 0.0,
            cell_offset_db: 0.0,
        }
    }

    pub fn with_doppler(mut self, doppler: Box<dyn DopplerCompensation>) -> Self {
        self.doppler = doppler;
        self
    }

    /// Measurement object and cell offsets applied to every satellite
    pub fn with_offsets(mut self, offset_mo_db: f64, cell_offset_db: f64) -> Self {
        self.offset_mo_db = offset_mo_db;
        self.cell_offset_db = cell_offset_db;
        self
    }

    pub fn doppler_enhanced(&self) -> bool {
        self.doppler.is_enhanced()
    }

    pub fn site(&self) -> &ObserverSite {
        &self.site
    }

    pub fn build(&mut self, sample: &OrbitSample) -> SatelliteState {
        let frame = self.site.look_at(&sample.eci_position, sample.timestamp);
        let range_rate = self.site.range_rate(sample);

        let base = self
            .estimator
            .estimate(frame.elevation_deg, frame.range_km, self.environment);
        let rsrp = if frame.is_visible() {
            let frequency_ghz = self.estimator.config().frequency_ghz;
            self.doppler
                .adjust_rsrp(base, frame.elevation_deg, range_rate, frequency_ghz)
        } else {
            base
        };

        SatelliteState {
            satellite_id: sample.satellite_id.clone(),
            frame,
            rsrp_dbm: rsrp.is_finite().then_some(rsrp),
            range_rate_km_s: range_rate,
            offset_mo_db: self.offset_mo_db,
            cell_offset_db: self.cell_offset_db,
        }
    }
}

/// Precomputed orbit samples indexed by satellite
pub struct SampleTable {
    tracks: BTreeMap<String, Vec<OrbitSample>>,
    builder: Mutex<SnapshotBuilder>,
    max_staleness: Duration,
}

impl SampleTable {
    pub fn new(samples: Vec<OrbitSample>, builder: SnapshotBuilder) -> Self {
        let mut tracks: BTreeMap<String, Vec<OrbitSample>> = BTreeMap::new();
        for sample in samples {
            tracks.entry(sample.satellite_id.clone()).or_default().push(sample);
        }
        for track in tracks.values_mut() {
            track.sort_by_key(|s| s.timestamp);
        }

        Self {
            tracks,
            builder: Mutex::new(builder),
            max_staleness: Duration::seconds(DEFAULT_MAX_STALENESS_S),
        }
    }

    pub fn with_max_staleness(mut self, max_staleness: Duration) -> Self {
        self.max_staleness = max_staleness;
        self
    }

    pub fn satellite_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn doppler_enhanced(&self) -> bool {
        self.builder.lock().doppler_enhanced()
    }

    /// Every distinct sample time, ascending
    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        let mut times: Vec<DateTime<Utc>> = self
            .tracks
            .values()
            .flat_map(|t| t.iter().map(|s| s.timestamp))
            .collect();
        times.sort();
        times.dedup();
        times
    }

    fn nearest<'a>(
        &self,
        track: &'a [OrbitSample],
        timestamp: DateTime<Utc>,
    ) -> Option<&'a OrbitSample> {
        let idx = track.partition_point(|s| s.timestamp < timestamp);
        let before = idx.checked_sub(1).and_then(|i| track.get(i));
        let after = track.get(idx);

        let best = match (before, after) {
            (Some(b), Some(a)) => {
                if (timestamp - b.timestamp) <= (a.timestamp - timestamp) {
                    b
                } else {
                    a
                }
            }
            (Some(b), None) => b,
            (None, Some(a)) => a,
            (None, None) => return None,
        };

        let gap_ms = (best.timestamp - timestamp).num_milliseconds().abs();
        (gap_ms <= self.max_staleness.num_milliseconds()).then_some(best)
    }
}

impl HandoverDataAccess for SampleTable {
    fn get_visible_satellites(&self, timestamp: DateTime<Utc>) -> Result<Vec<SatelliteState>> {
        let mut builder = self.builder.lock();

        let mut visible: Vec<SatelliteState> = self
            .tracks
            .values()
            .filter_map(|track| self.nearest(track, timestamp))
            .map(|sample| builder.build(sample))
            .filter(|s| s.frame.is_visible() && !s.frame.is_sentinel())
            .collect();

        if visible.is_empty() {
            return Err(HandoverError::DataUnavailable(format!(
                "no visible satellites at {}",
                timestamp
            )));
        }

        visible.sort_by(|a, b| {
            b.elevation_deg()
                .total_cmp(&a.elevation_deg())
                .then_with(|| a.satellite_id.cmp(&b.satellite_id))
        });

        debug!("{} satellites visible at {}", visible.len(), timestamp);
        Ok(visible)
    }
}

/// Keep ids printable and bounded
fn sanitize_id(id: String) -> String {
    id.chars()
        .filter(|c| c.is_alphanumeric() || " -_.()".contains(*c))
        .take(128)
        .collect()
}

#[derive(Debug, Deserialize)]
struct RawOrbitSample {
    satellite_id: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    eci_position: Option<EciPosition>,
    eci_velocity: Option<EciVelocity>,
}

/// Load orbit samples from a JSON array, skipping incomplete rows
pub fn load_samples(path: impl AsRef<Path>) -> Result<Vec<OrbitSample>> {
    let path = path.as_ref();
    info!("Loading orbit samples from {:?}", path);

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let rows: Vec<RawOrbitSample> = serde_json::from_reader(reader)?;

    let mut samples = Vec::with_capacity(rows.len());
    let mut skipped = 0;

    for row in rows {
        let (Some(id), Some(timestamp), Some(position)) =
            (row.satellite_id, row.timestamp, row.eci_position)
        else {
            skipped += 1;
            continue;
        };
        if !position.is_finite() {
            skipped += 1;
            continue;
        }

        let satellite_id = sanitize_id(id);
        if satellite_id.is_empty() {
            skipped += 1;
            continue;
        }

        samples.push(OrbitSample {
            satellite_id,
            timestamp,
            eci_position: position,
            eci_velocity: row.eci_velocity,
        });
    }

    info!("Loaded {} orbit samples ({} skipped)", samples.len(), skipped);
    Ok(samples)
}
