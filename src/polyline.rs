//! Route geometry.
//!
//! Points are `(latitude, longitude)` tuples. Providers that speak another
//! ordering (GeoJSON is `[lng, lat]`) convert at the boundary.

use serde::{Deserialize, Serialize};

use crate::geo::{haversine_km, Coordinate};

/// Ordered vertices of a route, start first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<(f64, f64)>,
}

impl Polyline {
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    /// Two-point polyline from `start` to `end`.
    pub fn straight(start: Coordinate, end: Coordinate) -> Self {
        Self::new(vec![start.as_tuple(), end.as_tuple()])
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<Coordinate> {
        self.points.first().copied().map(Coordinate::from)
    }

    pub fn last(&self) -> Option<Coordinate> {
        self.points.last().copied().map(Coordinate::from)
    }

    /// Sum of the haversine lengths of consecutive segments.
    pub fn length_km(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| haversine_km(pair[0], pair[1]))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_point_order() {
        let vertices = vec![(27.67, 85.32), (27.68, 85.33), (27.69, 85.34)];
        let line = Polyline::new(vertices.clone());
        assert_eq!(line.points(), vertices.as_slice());
        assert_eq!(line.len(), 3);
        assert_eq!(line.first(), Some(Coordinate::new(27.67, 85.32)));
        assert_eq!(line.last(), Some(Coordinate::new(27.69, 85.34)));
    }

    #[test]
    fn test_straight_has_both_endpoints() {
        let start = Coordinate::new(27.67, 85.32);
        let end = Coordinate::new(27.69, 85.31);
        let line = Polyline::straight(start, end);
        assert_eq!(line.first(), Some(start));
        assert_eq!(line.last(), Some(end));
        assert!((line.length_km() - start.distance_km(&end)).abs() < 1e-12);
    }

    #[test]
    fn test_no_points() {
        let line = Polyline::new(Vec::new());
        assert!(line.is_empty());
        assert!(line.last().is_none());
        assert_eq!(line.length_km(), 0.0);
    }

    #[test]
    fn test_length_sums_segments() {
        let line = Polyline::new(vec![(0.0, 0.0), (0.0, 0.001), (0.0, 0.002)]);
        let expected = haversine_km((0.0, 0.0), (0.0, 0.001)) * 2.0;
        assert!((line.length_km() - expected).abs() < 1e-9);
    }
}
