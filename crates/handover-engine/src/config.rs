//! Scene configuration loading
//!
//! A scene fixes the observer location and elevation thresholds for one
//! research site. Scenes are read from a JSON array:
//!
//! ```json
//! [{"scene_id": "ntpu", "pre_handover_threshold": 15.0, "execution_threshold": 10.0,
//!   "critical_threshold": 5.0, "environment_factor": 1.1,
//!   "observer_lat": 24.9442, "observer_lon": 121.3711, "observer_alt_km": 0.05}]
//! ```

use crate::phase::PhaseThresholds;
use crate::{Environment, HandoverError, ObserverSite, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{info, warn};

pub const DEFAULT_SCENE_ID: &str = "ntpu";
pub const DEFAULT_ENVIRONMENT_FACTOR: f64 = 1.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    pub scene_id: String,
    pub pre_handover_threshold: f64,
    pub execution_threshold: f64,
    pub critical_threshold: f64,
    pub environment_factor: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observer_lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observer_lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observer_alt_km: Option<f64>,
}

impl SceneConfig {
    /// Default thresholds for `scene_id`, observer at the NTPU site
    pub fn defaults(scene_id: impl Into<String>) -> Self {
        let t = PhaseThresholds::default();
        Self {
            scene_id: scene_id.into(),
            pre_handover_threshold: t.pre_handover_deg,
            execution_threshold: t.execution_deg,
            critical_threshold: t.critical_deg,
            environment_factor: DEFAULT_ENVIRONMENT_FACTOR,
            observer_lat: None,
            observer_lon: None,
            observer_alt_km: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.base_thresholds()?;
        if !(self.environment_factor > 0.0) || !self.environment_factor.is_finite() {
            return Err(HandoverError::InvalidConfig(format!(
                "scene {}: environment_factor must be positive, got {}",
                self.scene_id, self.environment_factor
            )));
        }
        self.thresholds(None)?;
        self.observer()?;
        Ok(())
    }

    /// Thresholds as written, before any environment scaling
    pub fn base_thresholds(&self) -> Result<PhaseThresholds> {
        PhaseThresholds::new(
            self.pre_handover_threshold,
            self.execution_threshold,
            self.critical_threshold,
        )
    }

    /// Effective thresholds. An explicit environment overrides the scene's
    /// own environment factor.
    pub fn thresholds(&self, environment: Option<Environment>) -> Result<PhaseThresholds> {
        let factor = environment
            .map(|e| e.threshold_factor())
            .unwrap_or(self.environment_factor);
        self.base_thresholds()?.scaled(factor)
    }

    pub fn observer(&self) -> Result<ObserverSite> {
        let ntpu = ObserverSite::ntpu().position;
        let site = ObserverSite::new(
            self.observer_lat.unwrap_or(ntpu.latitude),
            self.observer_lon.unwrap_or(ntpu.longitude),
            self.observer_alt_km.unwrap_or(ntpu.altitude_km),
        )?;
        Ok(site)
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self::defaults(DEFAULT_SCENE_ID)
    }
}

/// Load and validate every scene in a file
pub fn load_scenes(path: impl AsRef<Path>) -> Result<Vec<SceneConfig>> {
    let path = path.as_ref();
    info!("Loading scene configs from {:?}", path);

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let scenes: Vec<SceneConfig> = serde_json::from_reader(reader)?;

    for scene in &scenes {
        scene.validate()?;
    }

    info!("Loaded {} scenes", scenes.len());
    Ok(scenes)
}

/// Look up one scene. Errors with `ConfigNotFound` if the scene is absent.
pub fn load_scene(path: impl AsRef<Path>, scene_id: &str) -> Result<SceneConfig> {
    load_scenes(path)?
        .into_iter()
        .find(|s| s.scene_id == scene_id)
        .ok_or_else(|| HandoverError::ConfigNotFound(scene_id.to_string()))
}

/// Resolve a scene, falling back to defaults when the file or the scene
/// is missing. Invalid configs are still errors.
pub fn resolve_scene(path: Option<&Path>, scene_id: &str) -> Result<SceneConfig> {
    let Some(path) = path else {
        warn!("No scene file given, using defaults for {}", scene_id);
        return Ok(SceneConfig::defaults(scene_id));
    };

    match load_scene(path, scene_id) {
        Ok(scene) => Ok(scene),
        Err(HandoverError::ConfigNotFound(id)) => {
            warn!("Scene {} not found in {:?}, using defaults", id, path);
            Ok(SceneConfig::defaults(scene_id))
        }
        Err(HandoverError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Scene file {:?} not found, using defaults", path);
            Ok(SceneConfig::defaults(scene_id))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_scene() {
        let file = write(
            r#"[
            {"scene_id": "ntpu", "pre_handover_threshold": 15.0, "execution_threshold": 10.0,
             "critical_threshold": 5.0, "environment_factor": 1.1},
            {"scene_id": "alps", "pre_handover_threshold": 20.0, "execution_threshold": 12.0,
             "critical_threshold": 6.0, "environment_factor": 1.3,
             "observer_lat": 46.5, "observer_lon": 8.0, "observer_alt_km": 1.2}
        ]"#,
        );

        let scene = load_scene(file.path(), "alps").unwrap();
        assert_eq!(scene.critical_threshold, 6.0);

        let site = scene.observer().unwrap();
        assert_eq!(site.position.latitude, 46.5);

        let t = scene.thresholds(None).unwrap();
        assert!((t.pre_handover_deg - 26.0).abs() < 1e-9);
        assert_eq!(t.critical_deg, 6.0);
    }

    #[test]
    fn test_environment_overrides_scene_factor() {
        let scene = SceneConfig::default();
        let t = scene.thresholds(Some(Environment::Open)).unwrap();
        assert_eq!(t, PhaseThresholds::default());

        let t = scene.thresholds(None).unwrap();
        assert!((t.pre_handover_deg - 16.5).abs() < 1e-9);
    }

    #[test]
    fn test_missing_scene_falls_back() {
        let file = write(r#"[]"#);
        assert!(matches!(
            load_scene(file.path(), "nowhere"),
            Err(HandoverError::ConfigNotFound(_))
        ));

        let scene = resolve_scene(Some(file.path()), "nowhere").unwrap();
        assert_eq!(scene.scene_id, "nowhere");
        assert_eq!(scene.environment_factor, 1.1);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let scene = resolve_scene(Some(Path::new("/nonexistent/scenes.json")), "ntpu").unwrap();
        assert_eq!(scene, SceneConfig::default());
        assert_eq!(resolve_scene(None, "ntpu").unwrap(), SceneConfig::default());
    }

    #[test]
    fn test_invalid_ordering_is_error() {
        let file = write(
            r#"[{"scene_id": "bad", "pre_handover_threshold": 8.0, "execution_threshold": 10.0,
                 "critical_threshold": 5.0, "environment_factor": 1.0}]"#,
        );
        assert!(matches!(
            resolve_scene(Some(file.path()), "bad"),
            Err(HandoverError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_invalid_observer_is_error() {
        let mut scene = SceneConfig::default();
        scene.observer_lat = Some(123.0);
        assert!(scene.validate().is_err());
    }
}
