//! Snap arbitrary coordinates to the closest graph node.
//!
//! A linear scan over every node. The graph is small and static, so no
//! spatial index is kept.

use crate::error::RouteError;
use crate::geo::Coordinate;
use crate::graph::{Graph, NodeIndex};

/// Default snapping tolerance in kilometers.
pub const DEFAULT_MAX_SNAP_DISTANCE_KM: f64 = 1.0;

/// A successful snap: the node and how far it is from the query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snap {
    pub node: NodeIndex,
    pub distance_km: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct NearestNodeLocator {
    /// Nodes further than this from the query never match.
    pub max_distance_km: f64,
}

impl Default for NearestNodeLocator {
    fn default() -> Self {
        Self {
            max_distance_km: DEFAULT_MAX_SNAP_DISTANCE_KM,
        }
    }
}

impl NearestNodeLocator {
    pub fn new(max_distance_km: f64) -> Self {
        Self { max_distance_km }
    }

    /// Closest node to `coord`, if it lies within `max_distance_km`.
    ///
    /// Ties keep the lowest index.
    pub fn find_nearest_node(&self, graph: &Graph, coord: Coordinate) -> Result<Snap, RouteError> {
        let mut best: Option<Snap> = None;
        for (idx, node) in graph.nodes() {
            let distance_km = coord.distance_km(&node.coordinate());
            if best.is_none_or(|b| distance_km < b.distance_km) {
                best = Some(Snap {
                    node: idx,
                    distance_km,
                });
            }
        }

        match best {
            Some(snap) if snap.distance_km <= self.max_distance_km => Ok(snap),
            _ => Err(RouteError::NotFound {
                lat: coord.lat,
                lng: coord.lng,
                max_distance_km: self.max_distance_km,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphAsset;

    fn sample_graph() -> Graph {
        Graph::from_asset(
            GraphAsset::new()
                .with_node("A", 0.0, 0.0)
                .with_node("B", 0.0, 0.001)
                .with_node("C", 0.0, 0.002),
        )
    }

    #[test]
    fn test_snaps_to_closest() {
        let graph = sample_graph();
        let snap = NearestNodeLocator::default()
            .find_nearest_node(&graph, Coordinate::new(0.0, 0.0011))
            .expect("B is within range");
        assert_eq!(graph.node(snap.node).id, "B");
        assert!(snap.distance_km < 0.02);
    }

    #[test]
    fn test_exact_node_has_zero_distance() {
        let graph = sample_graph();
        let snap = NearestNodeLocator::default()
            .find_nearest_node(&graph, Coordinate::new(0.0, 0.002))
            .expect("C is a node");
        assert_eq!(graph.node(snap.node).id, "C");
        assert_eq!(snap.distance_km, 0.0);
    }

    #[test]
    fn test_out_of_range_is_not_found() {
        // (0.5, 0.5) lies far outside the default tolerance
        let graph = Graph::from_asset(GraphAsset::new().with_node("far", 0.5, 0.518));
        let locator = NearestNodeLocator::default();
        let nearest = graph.node(NodeIndex(0)).coordinate();
        let gap = Coordinate::new(0.5, 0.5).distance_km(&nearest);
        assert!(gap > 1.9 && gap < 2.1, "fixture should be ~2 km away, got {}", gap);

        let err = locator
            .find_nearest_node(&graph, Coordinate::new(0.5, 0.5))
            .expect_err("2 km is beyond 1 km tolerance");
        assert!(matches!(err, RouteError::NotFound { .. }));
    }

    #[test]
    fn test_custom_tolerance() {
        let graph = Graph::from_asset(GraphAsset::new().with_node("far", 0.5, 0.518));
        let snap = NearestNodeLocator::new(2.5).find_nearest_node(&graph, Coordinate::new(0.5, 0.5));
        assert!(snap.is_ok());
    }

    #[test]
    fn test_empty_graph_is_not_found() {
        let graph = Graph::from_asset(GraphAsset::new());
        assert!(NearestNodeLocator::default()
            .find_nearest_node(&graph, Coordinate::new(0.0, 0.0))
            .is_err());
    }
}
