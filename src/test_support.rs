//! Test utilities for route providers.
//!
//! Deterministic stand-ins for the external routing service that never touch
//! the network.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::geo::Coordinate;
use crate::polyline::Polyline;
use crate::route::ExternalRoute;
use crate::traits::RouteProvider;

/// Provider that always fails, as if the routing service were unreachable.
#[derive(Debug, Default)]
pub struct FailingRouteProvider {
    calls: AtomicUsize,
}

impl FailingRouteProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests seen so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RouteProvider for FailingRouteProvider {
    fn request_route(&self, _start: Coordinate, _end: Coordinate) -> Option<ExternalRoute> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        None
    }
}

/// Provider that answers every request with a straight two-point road route
/// scaled by `detour_factor`.
#[derive(Debug)]
pub struct StubRouteProvider {
    detour_factor: f64,
    calls: AtomicUsize,
}

impl StubRouteProvider {
    pub fn new(detour_factor: f64) -> Self {
        Self {
            detour_factor,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RouteProvider for StubRouteProvider {
    fn request_route(&self, start: Coordinate, end: Coordinate) -> Option<ExternalRoute> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Some(ExternalRoute {
            distance_km: start.distance_km(&end) * self.detour_factor,
            polyline: Polyline::straight(start, end),
            duration_secs: None,
        })
    }
}
