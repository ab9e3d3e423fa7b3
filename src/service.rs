//! Request/response surface over the routing core, the relay and the pickup
//! lifecycle.
//!
//! Transport-independent: each handler takes plain parameters and returns a
//! serialisable response. Position validation happens here, at the edge;
//! components below assume well-formed coordinates.

use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::TrackerConfig;
use crate::error::{PickupError, ServiceError, StartupError};
use crate::geo::Coordinate;
use crate::graph::Graph;
use crate::osrm::OsrmClient;
use crate::pickup::{PickupLifecycle, PickupProgress, PickupStatus};
use crate::relay::{LocationRelay, Observer, PositionAck, VehiclePosition};
use crate::resolver::RouteResolver;
use crate::route::{RouteAlgorithm, RouteSummary};
use crate::traits::RouteProvider;

/// A fixed waypoint the vehicle may be routed toward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickupPoint {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl PickupPoint {
    pub fn new(name: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lng,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

pub fn default_pickup_points() -> Vec<PickupPoint> {
    vec![
        PickupPoint::new("Child 1 - School Gate", 27.6703017, 85.322441),
        PickupPoint::new("Child 2 - Park Area", 27.6902319, 85.3194997),
        PickupPoint::new("Child 3 - Main Road", 27.6976729, 85.325825),
        PickupPoint::new("Child 4 - Community Center", 27.6947084, 85.3401176),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupPointsResponse {
    pub pickup_points: Vec<PickupPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadRouteRequest {
    pub driver_lat: f64,
    pub driver_lng: f64,
    pub target_lat: f64,
    pub target_lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadRouteResponse {
    #[serde(flatten)]
    pub route: RouteSummary,
    pub message: String,
}

/// One waypoint with its routed distance from the vehicle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedPickup {
    pub index: usize,
    pub point: PickupPoint,
    pub distance_km: f64,
    pub algorithm: RouteAlgorithm,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearestPickupResponse {
    pub nearest_pickup: RankedPickup,
    /// Every waypoint, nearest first.
    pub all_pickups: Vec<RankedPickup>,
    pub driver_location: Coordinate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearestPointResponse {
    pub nearest_index: usize,
    pub distance_km: f64,
    pub point: PickupPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverLocationResponse {
    pub driver_location: Option<VehiclePosition>,
}

/// Result of an inbound vehicle position: the sender's acknowledgement plus
/// the pickup progress it produced, if a pickup is en route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionUpdate {
    pub ack: PositionAck,
    pub progress: Option<PickupProgress>,
}

pub struct PickupService<P> {
    resolver: RouteResolver<P>,
    relay: LocationRelay,
    lifecycle: PickupLifecycle,
    pickup_points: Vec<PickupPoint>,
}

impl PickupService<Option<OsrmClient>> {
    /// Load the graph and build every component from `config`.
    ///
    /// The only fatal path: a missing or malformed graph asset aborts here.
    pub fn from_config(config: &TrackerConfig) -> Result<Self, StartupError> {
        let graph = Arc::new(Graph::load(&config.graph_path)?);
        let provider = config.osrm.clone().map(OsrmClient::new).transpose()?;
        let resolver = RouteResolver::new(graph, provider)
            .with_locator(config.routing.locator())
            .with_engine(config.routing.engine());

        Ok(Self::new(
            resolver,
            PickupLifecycle::new(config.pickup),
            config.pickup_points.clone(),
        ))
    }
}

impl<P: RouteProvider> PickupService<P> {
    pub fn new(
        resolver: RouteResolver<P>,
        lifecycle: PickupLifecycle,
        pickup_points: Vec<PickupPoint>,
    ) -> Self {
        Self {
            resolver,
            relay: LocationRelay::new(),
            lifecycle,
            pickup_points,
        }
    }

    pub fn resolver(&self) -> &RouteResolver<P> {
        &self.resolver
    }

    pub fn relay(&self) -> &LocationRelay {
        &self.relay
    }

    pub fn lifecycle(&self) -> &PickupLifecycle {
        &self.lifecycle
    }

    /// `GET pickup-points`
    pub fn pickup_points(&self) -> PickupPointsResponse {
        PickupPointsResponse {
            pickup_points: self.pickup_points.clone(),
        }
    }

    /// `GET driver-location`
    pub fn driver_location(&self) -> DriverLocationResponse {
        DriverLocationResponse {
            driver_location: self.relay.current_position(),
        }
    }

    /// `GET road-route`
    pub fn road_route(&self, request: RoadRouteRequest) -> Result<RoadRouteResponse, ServiceError> {
        let start = validated(request.driver_lat, request.driver_lng)?;
        let end = validated(request.target_lat, request.target_lng)?;

        let route = self.resolver.resolve_route(start, end);
        let message = if route.is_road_route() {
            format!("Road route found using {}", route.algorithm())
        } else {
            "Direct route (road path not available)".to_string()
        };
        Ok(RoadRouteResponse {
            route: route.summary(),
            message,
        })
    }

    /// `GET nearest-pickup`
    pub fn nearest_pickup(
        &self,
        driver_lat: f64,
        driver_lng: f64,
    ) -> Result<NearestPickupResponse, ServiceError> {
        let driver = validated(driver_lat, driver_lng)?;
        let all_pickups = self.rank_pickups(driver);
        let nearest_pickup = all_pickups
            .first()
            .cloned()
            .ok_or(ServiceError::NoPickupPoints)?;

        info!(
            name = %nearest_pickup.point.name,
            distance_km = nearest_pickup.distance_km,
            "nearest pickup"
        );
        Ok(NearestPickupResponse {
            nearest_pickup,
            all_pickups,
            driver_location: driver,
        })
    }

    /// `GET nearest-point`: nearest waypoint to the last-known position.
    pub fn nearest_point(&self) -> Result<NearestPointResponse, ServiceError> {
        let position = self
            .relay
            .current_position()
            .ok_or(ServiceError::NoVehiclePosition)?;
        let nearest = self
            .rank_pickups(position.coordinate())
            .into_iter()
            .next()
            .ok_or(ServiceError::NoPickupPoints)?;

        Ok(NearestPointResponse {
            nearest_index: nearest.index,
            distance_km: nearest.distance_km,
            point: nearest.point,
        })
    }

    /// Inbound "vehicle position" event.
    pub fn on_vehicle_position(&self, lat: f64, lng: f64) -> Result<PositionUpdate, ServiceError> {
        let coord = validated(lat, lng)?;
        let ack = self.relay.on_vehicle_position(coord);
        let progress = self.lifecycle.on_position(coord);
        Ok(PositionUpdate { ack, progress })
    }

    /// A new observer joins the broadcast.
    pub fn connect_observer(&self) -> Observer {
        self.relay.connect_observer()
    }

    /// Route from the last-known position to waypoint `index` and start the
    /// pickup cycle toward it.
    pub fn start_pickup(&self, index: usize) -> Result<RouteSummary, ServiceError> {
        let point = self
            .pickup_points
            .get(index)
            .ok_or(ServiceError::UnknownPickupPoint(index))?;
        let position = self
            .relay
            .current_position()
            .ok_or(ServiceError::NoVehiclePosition)?;
        // Reject before a possibly slow external route request; `start`
        // re-checks under its own lock.
        let status = self.lifecycle.status();
        if status != PickupStatus::Idle {
            return Err(PickupError::InvalidOperation {
                operation: "start a pickup",
                status,
            }
            .into());
        }

        let target = point.coordinate();
        let route = self.resolver.resolve_route(position.coordinate(), target);
        let summary = route.summary();
        self.lifecycle.start(target, route)?;
        info!(name = %point.name, algorithm = %summary.algorithm, "pickup started");
        Ok(summary)
    }

    /// Distance to every waypoint over the internal tiers, nearest first.
    fn rank_pickups(&self, from: Coordinate) -> Vec<RankedPickup> {
        let mut ranked: Vec<RankedPickup> = self
            .pickup_points
            .par_iter()
            .enumerate()
            .map(|(index, point)| {
                let route = self.resolver.resolve_internal(from, point.coordinate());
                RankedPickup {
                    index,
                    point: point.clone(),
                    distance_km: route.distance_km(),
                    algorithm: route.algorithm(),
                }
            })
            .collect();
        ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        ranked
    }
}

fn validated(lat: f64, lng: f64) -> Result<Coordinate, ServiceError> {
    let coord = Coordinate::new(lat, lng);
    if coord.is_valid() {
        Ok(coord)
    } else {
        Err(ServiceError::InvalidCoordinates { lat, lng })
    }
}
