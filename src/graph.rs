//! Immutable road graph and its loader.
//!
//! # Asset format
//!
//! The graph is read once at startup from a JSON document of shape
//!
//! ```text
//! { "nodes": { "<id>": { "lat": f64, "lon": f64 }, ... },
//!   "edges": [ { "from": "<id>", "to": "<id>" }, ... ] }
//! ```
//!
//! produced by offline tooling. Node ids are opaque strings.
//!
//! # Data layout
//!
//! Ids are interned to dense [`NodeIndex`] values in lexicographic id order, so
//! loading the same asset always yields the same indices. Adjacency is a
//! `Vec` of neighbor lists indexed by `NodeIndex`; every edge in the asset
//! becomes a symmetric pair of entries weighted by haversine distance. Edges
//! whose endpoints are missing are dropped here, never at query time.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::LoadError;
use crate::geo::{haversine_km, Coordinate};

// ── Asset (on-disk shape) ─────────────────────────────────────────────────────

/// A node as stored in the asset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssetNode {
    pub lat: f64,
    pub lon: f64,
}

/// An undirected edge as stored in the asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetEdge {
    pub from: String,
    pub to: String,
}

/// Deserialised road graph asset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphAsset {
    pub nodes: BTreeMap<String, AssetNode>,
    #[serde(default)]
    pub edges: Vec<AssetEdge>,
}

impl GraphAsset {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_node(mut self, id: impl Into<String>, lat: f64, lon: f64) -> Self {
        self.nodes.insert(id.into(), AssetNode { lat, lon });
        self
    }

    #[must_use]
    pub fn with_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push(AssetEdge {
            from: from.into(),
            to: to.into(),
        });
        self
    }
}

// ── Graph ─────────────────────────────────────────────────────────────────────

/// Dense index of a node inside a loaded [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A road node. Immutable after load.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
}

impl Node {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}

/// One adjacency entry: the neighbor and the edge weight in kilometers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub node: NodeIndex,
    pub weight_km: f64,
}

/// Counts gathered while building the graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    /// Nodes in the asset.
    pub nodes: usize,
    /// Asset edges kept (each contributes two adjacency entries).
    pub edges: usize,
    /// Asset edges dropped because an endpoint was missing.
    pub dropped_edges: usize,
    /// Nodes with at least one adjacency entry.
    pub connected_nodes: usize,
    /// Connected components among `connected_nodes`.
    pub components: usize,
    /// Node count of the largest component.
    pub largest_component: usize,
}

/// Read-only road graph. Rebuilt, never mutated, when the asset changes.
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
    index: HashMap<String, NodeIndex>,
    adjacency: Vec<Vec<Neighbor>>,
    stats: GraphStats,
}

impl Graph {
    /// Load and validate the asset at `path`.
    ///
    /// Missing files and malformed JSON are fatal.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| LoadError::Missing {
            path: path.to_path_buf(),
            source,
        })?;
        let asset: GraphAsset =
            serde_json::from_str(&raw).map_err(|source| LoadError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;

        let graph = Self::from_asset(asset);
        info!(
            path = %path.display(),
            nodes = graph.stats.nodes,
            edges = graph.stats.edges,
            dropped_edges = graph.stats.dropped_edges,
            components = graph.stats.components,
            "loaded road graph"
        );
        Ok(graph)
    }

    /// Build the adjacency structure from an already-parsed asset.
    pub fn from_asset(asset: GraphAsset) -> Self {
        let mut nodes = Vec::with_capacity(asset.nodes.len());
        let mut index = HashMap::with_capacity(asset.nodes.len());
        for (id, node) in asset.nodes {
            let idx = NodeIndex(nodes.len() as u32);
            index.insert(id.clone(), idx);
            nodes.push(Node {
                id,
                lat: node.lat,
                lon: node.lon,
            });
        }

        let mut adjacency = vec![Vec::new(); nodes.len()];
        let mut kept = 0;
        let mut dropped = 0;
        for edge in &asset.edges {
            let (Some(&from), Some(&to)) = (index.get(&edge.from), index.get(&edge.to)) else {
                dropped += 1;
                continue;
            };
            let weight_km = haversine_km(
                nodes[from.index()].coordinate().as_tuple(),
                nodes[to.index()].coordinate().as_tuple(),
            );
            adjacency[from.index()].push(Neighbor { node: to, weight_km });
            adjacency[to.index()].push(Neighbor {
                node: from,
                weight_km,
            });
            kept += 1;
        }

        if dropped > 0 {
            warn!(dropped, "dropped edges referencing missing nodes");
        }

        let mut graph = Self {
            nodes,
            index,
            adjacency,
            stats: GraphStats::default(),
        };
        graph.stats = graph.compute_stats(kept, dropped);
        graph
    }

    fn compute_stats(&self, edges: usize, dropped_edges: usize) -> GraphStats {
        let mut seen = vec![false; self.nodes.len()];
        let mut queue = VecDeque::new();
        let mut components = 0;
        let mut largest_component = 0;

        for start in 0..self.nodes.len() {
            if seen[start] || self.adjacency[start].is_empty() {
                continue;
            }
            components += 1;
            seen[start] = true;
            queue.push_back(start);
            let mut size = 0;
            while let Some(current) = queue.pop_front() {
                size += 1;
                for neighbor in &self.adjacency[current] {
                    let next = neighbor.node.index();
                    if !seen[next] {
                        seen[next] = true;
                        queue.push_back(next);
                    }
                }
            }
            largest_component = largest_component.max(size);
        }

        GraphStats {
            nodes: self.nodes.len(),
            edges,
            dropped_edges,
            connected_nodes: self.adjacency.iter().filter(|n| !n.is_empty()).count(),
            components,
            largest_component,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of undirected edges kept at load.
    pub fn edge_count(&self) -> usize {
        self.stats.edges
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn stats(&self) -> GraphStats {
        self.stats
    }

    pub fn node(&self, idx: NodeIndex) -> &Node {
        &self.nodes[idx.index()]
    }

    /// Node at `idx`, or `None` for an index this graph never issued.
    pub fn get(&self, idx: NodeIndex) -> Option<&Node> {
        self.nodes.get(idx.index())
    }

    pub fn contains(&self, idx: NodeIndex) -> bool {
        idx.index() < self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &Node)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeIndex(i as u32), node))
    }

    /// Resolve an asset id to its index.
    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    #[inline]
    pub fn neighbors(&self, idx: NodeIndex) -> &[Neighbor] {
        &self.adjacency[idx.index()]
    }

    #[inline]
    pub fn degree(&self, idx: NodeIndex) -> usize {
        self.adjacency.get(idx.index()).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_asset() -> GraphAsset {
        GraphAsset::new()
            .with_node("A", 0.0, 0.0)
            .with_node("B", 0.0, 0.001)
            .with_node("C", 0.0, 0.002)
            .with_edge("A", "B")
            .with_edge("B", "C")
    }

    #[test]
    fn test_edges_are_symmetric() {
        let graph = Graph::from_asset(line_asset());
        let a = graph.index_of("A").unwrap();
        let b = graph.index_of("B").unwrap();

        assert_eq!(graph.neighbors(a).len(), 1);
        assert_eq!(graph.neighbors(b).len(), 2);
        let ab = graph.neighbors(a)[0];
        let ba = graph.neighbors(b).iter().find(|n| n.node == a).unwrap();
        assert_eq!(ab.node, b);
        assert_eq!(ab.weight_km, ba.weight_km);
    }

    #[test]
    fn test_weight_is_haversine() {
        let graph = Graph::from_asset(line_asset());
        let a = graph.index_of("A").unwrap();
        let expected = haversine_km((0.0, 0.0), (0.0, 0.001));
        assert!((graph.neighbors(a)[0].weight_km - expected).abs() < 1e-12);
    }

    #[test]
    fn test_dangling_edges_dropped_and_counted() {
        let asset = line_asset()
            .with_edge("A", "missing")
            .with_edge("ghost", "C")
            .with_edge("ghost", "missing");
        let graph = Graph::from_asset(asset);

        let stats = graph.stats();
        assert_eq!(stats.edges, 2);
        assert_eq!(stats.dropped_edges, 3);
        let a = graph.index_of("A").unwrap();
        assert_eq!(graph.degree(a), 1);
    }

    #[test]
    fn test_stats_count_components() {
        let asset = line_asset()
            .with_node("D", 1.0, 1.0)
            .with_node("E", 1.0, 1.001)
            .with_node("F", 2.0, 2.0)
            .with_edge("D", "E");
        let graph = Graph::from_asset(asset);

        let stats = graph.stats();
        assert_eq!(stats.nodes, 6);
        assert_eq!(stats.connected_nodes, 5);
        assert_eq!(stats.components, 2);
        assert_eq!(stats.largest_component, 3);
    }

    #[test]
    fn test_indices_follow_id_order() {
        let asset = GraphAsset::new()
            .with_node("z", 0.0, 0.0)
            .with_node("a", 1.0, 1.0);
        let graph = Graph::from_asset(asset);
        assert_eq!(graph.index_of("a"), Some(NodeIndex(0)));
        assert_eq!(graph.index_of("z"), Some(NodeIndex(1)));
        assert_eq!(graph.node(NodeIndex(1)).id, "z");
    }

    #[test]
    fn test_parse_asset_json() {
        let json = r#"{
            "nodes": {
                "n1": { "lat": 27.67, "lon": 85.32 },
                "n2": { "lat": 27.68, "lon": 85.33 }
            },
            "edges": [ { "from": "n1", "to": "n2" } ]
        }"#;
        let asset: GraphAsset = serde_json::from_str(json).expect("should deserialise");
        let graph = Graph::from_asset(asset);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_empty_graph() {
        let graph = Graph::from_asset(GraphAsset::new());
        assert!(graph.is_empty());
        assert_eq!(graph.stats().components, 0);
    }
}
