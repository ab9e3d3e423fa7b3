//! pickup-tracker core
//!
//! Road routing toward fixed pickup waypoints plus a live vehicle position
//! relay and the per-pickup progress state machine built on top of them.

pub mod config;
pub mod dijkstra;
pub mod error;
pub mod geo;
pub mod graph;
pub mod nearest;
pub mod osrm;
pub mod pickup;
pub mod polyline;
pub mod relay;
pub mod resolver;
pub mod route;
pub mod service;
pub mod timer;
pub mod traits;

#[doc(hidden)]
pub mod test_support;

pub use config::TrackerConfig;
pub use error::{
    ConfigError, ExternalProviderError, LoadError, PickupError, RouteError, ServiceError, StartupError,
};
pub use geo::{haversine_km, Coordinate};
pub use graph::{Graph, GraphStats, NodeIndex};
pub use pickup::{PickupLifecycle, PickupStatus};
pub use relay::{LocationRelay, VehiclePosition};
pub use resolver::RouteResolver;
pub use route::{RouteAlgorithm, RouteResult};
pub use service::PickupService;
