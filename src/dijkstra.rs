//! Single-source Dijkstra over the road graph.
//!
//! Costs are haversine kilometers. The search stops as soon as the target is
//! extracted from the frontier, and the number of frontier pops is bounded so
//! a malformed graph cannot stall a request.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;
use tracing::debug;

use crate::error::RouteError;
use crate::graph::{Graph, NodeIndex};

/// Default bound on frontier pops per search.
pub const DEFAULT_MAX_ITERATIONS: usize = 20_000;

/// Outcome of a shortest-path query.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortestPath {
    /// Nodes from start to end inclusive. Empty when `found` is false.
    pub path: Vec<NodeIndex>,
    pub distance_km: f64,
    pub found: bool,
}

impl ShortestPath {
    pub fn not_found() -> Self {
        Self {
            path: Vec::new(),
            distance_km: f64::INFINITY,
            found: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ShortestPathEngine {
    pub max_iterations: usize,
}

impl Default for ShortestPathEngine {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

// Frontier entry: (tentative distance, insertion sequence, node). The sequence
// number makes equal distances pop in insertion order.
type FrontierEntry = Reverse<(OrderedFloat<f64>, u64, NodeIndex)>;

impl ShortestPathEngine {
    pub fn new(max_iterations: usize) -> Self {
        Self { max_iterations }
    }

    /// Shortest path from `start` to `end`, with every failure folded into
    /// `found = false`.
    pub fn shortest_path(&self, graph: &Graph, start: NodeIndex, end: NodeIndex) -> ShortestPath {
        self.search(graph, start, end)
            .unwrap_or_else(|_| ShortestPath::not_found())
    }

    /// Shortest path from `start` to `end`.
    ///
    /// Returns [`RouteError::NodeDisconnected`] if either endpoint has no
    /// adjacency entries or is not a node of `graph`, and [`RouteError::NoPath`] if the frontier is
    /// exhausted or the iteration bound is hit first. A successful result
    /// always starts at `start` and ends at `end`.
    pub fn search(
        &self,
        graph: &Graph,
        start: NodeIndex,
        end: NodeIndex,
    ) -> Result<ShortestPath, RouteError> {
        for node in [start, end] {
            if !graph.contains(node) {
                return Err(RouteError::NodeDisconnected {
                    node: node.to_string(),
                });
            }
        }

        if start == end {
            return Ok(ShortestPath {
                path: vec![start],
                distance_km: 0.0,
                found: true,
            });
        }

        for node in [start, end] {
            if graph.degree(node) == 0 {
                return Err(RouteError::NodeDisconnected {
                    node: graph.node(node).id.clone(),
                });
            }
        }

        let n = graph.node_count();
        let mut dist = vec![f64::INFINITY; n];
        let mut prev: Vec<Option<NodeIndex>> = vec![None; n];
        let mut visited = vec![false; n];

        dist[start.index()] = 0.0;
        let mut sequence = 0u64;
        let mut frontier: BinaryHeap<FrontierEntry> = BinaryHeap::new();
        frontier.push(Reverse((OrderedFloat(0.0), sequence, start)));

        let mut iterations = 0;
        while iterations < self.max_iterations {
            let Some(Reverse((OrderedFloat(cost), _, node))) = frontier.pop() else {
                break;
            };
            iterations += 1;

            if visited[node.index()] {
                continue;
            }
            visited[node.index()] = true;

            if node == end {
                break;
            }

            for neighbor in graph.neighbors(node) {
                let next = neighbor.node.index();
                if visited[next] {
                    continue;
                }
                let candidate = cost + neighbor.weight_km;
                if candidate < dist[next] {
                    dist[next] = candidate;
                    prev[next] = Some(node);
                    sequence += 1;
                    frontier.push(Reverse((OrderedFloat(candidate), sequence, neighbor.node)));
                }
            }
        }

        debug!(
            from = %graph.node(start).id,
            to = %graph.node(end).id,
            iterations,
            "dijkstra finished"
        );

        let path = reconstruct(&prev, end);
        if !visited[end.index()] || path.first() != Some(&start) {
            return Err(RouteError::NoPath {
                from: graph.node(start).id.clone(),
                to: graph.node(end).id.clone(),
                iterations,
            });
        }

        Ok(ShortestPath {
            path,
            distance_km: dist[end.index()],
            found: true,
        })
    }
}

fn reconstruct(prev: &[Option<NodeIndex>], end: NodeIndex) -> Vec<NodeIndex> {
    let mut path = vec![end];
    let mut current = end;
    while let Some(p) = prev[current.index()] {
        path.push(p);
        current = p;
    }
    path.reverse();
    path
}
