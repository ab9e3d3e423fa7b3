//! Core traits for the routing core.
//!
//! The external routing service sits behind [`RouteProvider`] so the resolver
//! can be driven by OSRM in production and by stubs in tests.

use crate::geo::Coordinate;
use crate::route::ExternalRoute;

/// Road routes from a third-party routing service.
///
/// Implementations must never panic or propagate failures: timeouts, HTTP
/// errors and empty responses all become `None` so the caller can fall
/// through to the next routing tier.
pub trait RouteProvider: Send + Sync {
    fn request_route(&self, start: Coordinate, end: Coordinate) -> Option<ExternalRoute>;
}

/// `None` means offline: the external tier is skipped.
impl<P: RouteProvider> RouteProvider for Option<P> {
    fn request_route(&self, start: Coordinate, end: Coordinate) -> Option<ExternalRoute> {
        self.as_ref()?.request_route(start, end)
    }
}

impl<P: RouteProvider + ?Sized> RouteProvider for Box<P> {
    fn request_route(&self, start: Coordinate, end: Coordinate) -> Option<ExternalRoute> {
        (**self).request_route(start, end)
    }
}
