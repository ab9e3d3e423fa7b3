//! Route results from the three routing tiers.
//!
//! Each tier produces its own variant; consumers go through the shared
//! projection ([`RouteResult::distance_km`], [`RouteResult::polyline`],
//! [`RouteResult::is_road_route`], [`RouteResult::algorithm`]) and never need
//! to branch on which tier answered.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;
use crate::graph::NodeIndex;
use crate::polyline::Polyline;

/// Which tier produced a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RouteAlgorithm {
    #[serde(rename = "external")]
    External,
    #[serde(rename = "internal-graph")]
    InternalGraph,
    #[serde(rename = "straight-line")]
    StraightLine,
}

impl RouteAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteAlgorithm::External => "external",
            RouteAlgorithm::InternalGraph => "internal-graph",
            RouteAlgorithm::StraightLine => "straight-line",
        }
    }
}

impl fmt::Display for RouteAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Road route returned by the external routing service.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalRoute {
    pub distance_km: f64,
    pub polyline: Polyline,
    /// Provider's travel time estimate, when it reports one.
    pub duration_secs: Option<f64>,
}

/// Road route found by searching the internal graph.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphRoute {
    pub distance_km: f64,
    pub polyline: Polyline,
    pub nodes: Vec<NodeIndex>,
}

/// Direct great-circle segment between the query coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct StraightLineRoute {
    pub distance_km: f64,
    pub polyline: Polyline,
}

impl StraightLineRoute {
    pub fn between(start: Coordinate, end: Coordinate) -> Self {
        Self {
            distance_km: start.distance_km(&end),
            polyline: Polyline::straight(start, end),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouteResult {
    External(ExternalRoute),
    Graph(GraphRoute),
    StraightLine(StraightLineRoute),
}

/// Normalized, serialisable view of any [`RouteResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    pub distance_km: f64,
    pub polyline: Vec<(f64, f64)>,
    pub is_road_route: bool,
    pub algorithm: RouteAlgorithm,
}

impl RouteResult {
    pub fn distance_km(&self) -> f64 {
        match self {
            RouteResult::External(route) => route.distance_km,
            RouteResult::Graph(route) => route.distance_km,
            RouteResult::StraightLine(route) => route.distance_km,
        }
    }

    pub fn polyline(&self) -> &Polyline {
        match self {
            RouteResult::External(route) => &route.polyline,
            RouteResult::Graph(route) => &route.polyline,
            RouteResult::StraightLine(route) => &route.polyline,
        }
    }

    pub fn is_road_route(&self) -> bool {
        !matches!(self, RouteResult::StraightLine(_))
    }

    pub fn algorithm(&self) -> RouteAlgorithm {
        match self {
            RouteResult::External(_) => RouteAlgorithm::External,
            RouteResult::Graph(_) => RouteAlgorithm::InternalGraph,
            RouteResult::StraightLine(_) => RouteAlgorithm::StraightLine,
        }
    }

    pub fn summary(&self) -> RouteSummary {
        RouteSummary {
            distance_km: self.distance_km(),
            polyline: self.polyline().points().to_vec(),
            is_road_route: self.is_road_route(),
            algorithm: self.algorithm(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_line_projection() {
        let start = Coordinate::new(0.0, 0.0);
        let end = Coordinate::new(0.0, 0.001);
        let route = RouteResult::StraightLine(StraightLineRoute::between(start, end));

        assert!(!route.is_road_route());
        assert_eq!(route.algorithm(), RouteAlgorithm::StraightLine);
        assert_eq!(route.polyline().len(), 2);
        assert!((route.distance_km() - start.distance_km(&end)).abs() < 1e-12);
    }

    #[test]
    fn test_road_variants_are_road_routes() {
        let external = RouteResult::External(ExternalRoute {
            distance_km: 1.2,
            polyline: Polyline::new(vec![(0.0, 0.0), (0.0, 0.01)]),
            duration_secs: Some(120.0),
        });
        let graph = RouteResult::Graph(GraphRoute {
            distance_km: 1.1,
            polyline: Polyline::new(vec![(0.0, 0.0), (0.0, 0.01)]),
            nodes: vec![NodeIndex(0), NodeIndex(1)],
        });

        assert!(external.is_road_route());
        assert!(graph.is_road_route());
        assert_eq!(external.algorithm(), RouteAlgorithm::External);
        assert_eq!(graph.algorithm(), RouteAlgorithm::InternalGraph);
    }

    #[test]
    fn test_summary_serialises_camel_case() {
        let route = RouteResult::StraightLine(StraightLineRoute::between(
            Coordinate::new(1.0, 2.0),
            Coordinate::new(1.0, 2.0),
        ));
        let json = serde_json::to_value(route.summary()).expect("should serialise");

        assert_eq!(json["distanceKm"], 0.0);
        assert_eq!(json["isRoadRoute"], false);
        assert_eq!(json["algorithm"], "straight-line");
        assert_eq!(json["polyline"][0][0], 1.0);
    }

    #[test]
    fn test_algorithm_display() {
        assert_eq!(RouteAlgorithm::InternalGraph.to_string(), "internal-graph");
    }
}
