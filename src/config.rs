//! Runtime configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::dijkstra::{ShortestPathEngine, DEFAULT_MAX_ITERATIONS};
use crate::error::ConfigError;
use crate::nearest::{NearestNodeLocator, DEFAULT_MAX_SNAP_DISTANCE_KM};
use crate::osrm::OsrmConfig;
use crate::pickup::PickupConfig;
use crate::service::{default_pickup_points, PickupPoint};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub max_snap_distance_km: f64,
    pub max_iterations: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            max_snap_distance_km: DEFAULT_MAX_SNAP_DISTANCE_KM,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl RoutingConfig {
    pub fn locator(&self) -> NearestNodeLocator {
        NearestNodeLocator::new(self.max_snap_distance_km)
    }

    pub fn engine(&self) -> ShortestPathEngine {
        ShortestPathEngine::new(self.max_iterations)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Road graph asset produced by the offline tooling.
    pub graph_path: PathBuf,
    /// External routing service. `None` runs offline.
    pub osrm: Option<OsrmConfig>,
    pub routing: RoutingConfig,
    pub pickup: PickupConfig,
    pub pickup_points: Vec<PickupPoint>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            graph_path: PathBuf::from("osm/road_graph.json"),
            osrm: None,
            routing: RoutingConfig::default(),
            pickup: PickupConfig::default(),
            pickup_points: default_pickup_points(),
        }
    }
}

impl TrackerConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    #[must_use]
    pub fn with_graph_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.graph_path = path.into();
        self
    }

    #[must_use]
    pub fn with_osrm(mut self, osrm: OsrmConfig) -> Self {
        self.osrm = Some(osrm);
        self
    }

    #[must_use]
    pub fn with_pickup(mut self, pickup: PickupConfig) -> Self {
        self.pickup = pickup;
        self
    }

    #[must_use]
    pub fn with_pickup_points(mut self, points: Vec<PickupPoint>) -> Self {
        self.pickup_points = points;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config: TrackerConfig = serde_json::from_str("{}").expect("should deserialise");
        assert_eq!(config, TrackerConfig::default());
        assert!(config.osrm.is_none());
        assert_eq!(config.routing.max_snap_distance_km, 1.0);
        assert_eq!(config.routing.max_iterations, 20_000);
        assert_eq!(config.pickup_points.len(), 4);
    }

    #[test]
    fn test_partial_sections() {
        let config: TrackerConfig = serde_json::from_str(
            r#"{
                "graph_path": "data/graph.json",
                "osrm": { "base_url": "http://router.project-osrm.org" },
                "pickup": { "wait_secs": 5 },
                "pickup_points": [ { "name": "Gate", "lat": 27.67, "lng": 85.32 } ]
            }"#,
        )
        .expect("should deserialise");

        assert_eq!(config.graph_path, PathBuf::from("data/graph.json"));
        let osrm = config.osrm.expect("osrm configured");
        assert_eq!(osrm.base_url, "http://router.project-osrm.org");
        assert_eq!(osrm.timeout_secs, 10);
        assert_eq!(config.pickup.wait, Duration::from_secs(5));
        assert_eq!(config.pickup.arrival_threshold_km, 0.1);
        assert_eq!(config.pickup_points[0].name, "Gate");
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "routing": {{ "max_iterations": 50 }} }}"#).expect("write");

        let config = TrackerConfig::from_json_file(file.path()).expect("should load");
        assert_eq!(config.routing.max_iterations, 50);
        assert_eq!(config.routing.max_snap_distance_km, 1.0);
    }

    #[test]
    fn test_missing_file() {
        let err = TrackerConfig::from_json_file("/nonexistent/tracker.json").expect_err("missing");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "not json").expect("write");
        let err = TrackerConfig::from_json_file(file.path()).expect_err("invalid");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
