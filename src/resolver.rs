//! Three-tier route resolution.
//!
//! 1. External routing service.
//! 2. Internal graph: snap both ends, then Dijkstra.
//! 3. Straight line between the query coordinates.
//!
//! Every call yields a well-formed [`RouteResult`]; failures in one tier are
//! logged and the next tier is tried.

use std::sync::Arc;

use tracing::{debug, info};

use crate::dijkstra::ShortestPathEngine;
use crate::error::RouteError;
use crate::geo::Coordinate;
use crate::graph::Graph;
use crate::nearest::NearestNodeLocator;
use crate::polyline::Polyline;
use crate::route::{GraphRoute, RouteResult, StraightLineRoute};
use crate::traits::RouteProvider;

pub struct RouteResolver<P> {
    graph: Arc<Graph>,
    provider: P,
    locator: NearestNodeLocator,
    engine: ShortestPathEngine,
}

impl<P: RouteProvider> RouteResolver<P> {
    pub fn new(graph: Arc<Graph>, provider: P) -> Self {
        Self {
            graph,
            provider,
            locator: NearestNodeLocator::default(),
            engine: ShortestPathEngine::default(),
        }
    }

    #[must_use]
    pub fn with_locator(mut self, locator: NearestNodeLocator) -> Self {
        self.locator = locator;
        self
    }

    #[must_use]
    pub fn with_engine(mut self, engine: ShortestPathEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Best currently available route from `start` to `end`.
    pub fn resolve_route(&self, start: Coordinate, end: Coordinate) -> RouteResult {
        if let Some(route) = self.provider.request_route(start, end) {
            info!(distance_km = route.distance_km, "route via external provider");
            return RouteResult::External(route);
        }
        debug!("external provider unavailable, trying internal graph");
        self.resolve_internal(start, end)
    }

    /// Tiers 2 and 3 only: no network access.
    pub fn resolve_internal(&self, start: Coordinate, end: Coordinate) -> RouteResult {
        match self.graph_route(start, end) {
            Ok(route) => {
                info!(
                    distance_km = route.distance_km,
                    nodes = route.nodes.len(),
                    "route via internal graph"
                );
                RouteResult::Graph(route)
            }
            Err(err) => {
                info!(reason = %err, "falling back to straight line");
                RouteResult::StraightLine(StraightLineRoute::between(start, end))
            }
        }
    }

    fn graph_route(&self, start: Coordinate, end: Coordinate) -> Result<GraphRoute, RouteError> {
        let from = self.locator.find_nearest_node(&self.graph, start)?;
        let to = self.locator.find_nearest_node(&self.graph, end)?;
        let path = self.engine.search(&self.graph, from.node, to.node)?;

        let points = path
            .path
            .iter()
            .map(|&idx| self.graph.node(idx).coordinate().as_tuple())
            .collect();

        Ok(GraphRoute {
            distance_km: path.distance_km,
            polyline: Polyline::new(points),
            nodes: path.path,
        })
    }
}
