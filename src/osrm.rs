//! OSRM HTTP adapter for road routes.
//!
//! Uses the Route service with GeoJSON geometries:
//! `{base_url}/route/v1/{profile}/{lng},{lat};{lng},{lat}?overview=full&geometries=geojson`.
//! Distances come back in meters and coordinates as `[lng, lat]`; both are
//! converted before leaving this module.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ExternalProviderError;
use crate::geo::Coordinate;
use crate::polyline::Polyline;
use crate::route::ExternalRoute;
use crate::traits::RouteProvider;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "driving".to_string(),
            timeout_secs: 10,
        }
    }
}

impl OsrmConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    #[must_use]
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OsrmConfig {
        &self.config
    }

    fn route_url(&self, start: Coordinate, end: Coordinate) -> String {
        format!(
            "{}/route/v1/{}/{:.7},{:.7};{:.7},{:.7}?overview=full&geometries=geojson",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile,
            start.lng,
            start.lat,
            end.lng,
            end.lat
        )
    }

    /// Fetch a route, keeping the failure reason.
    pub fn fetch_route(
        &self,
        start: Coordinate,
        end: Coordinate,
    ) -> Result<ExternalRoute, ExternalProviderError> {
        let url = self.route_url(start, end);
        debug!(%url, "requesting OSRM route");

        let body = self
            .client
            .get(&url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .map_err(|err| self.convert_reqwest_error(&err, &url))?
            .json::<OsrmRouteResponse>()
            .map_err(|err| ExternalProviderError::Parse {
                message: err.to_string(),
            })?;

        convert_response(body)
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &str) -> ExternalProviderError {
        if error.is_timeout() {
            return ExternalProviderError::Timeout {
                url: url.to_owned(),
                timeout_secs: self.config.timeout_secs,
            };
        }

        if let Some(status) = error.status() {
            return ExternalProviderError::Http {
                url: url.to_owned(),
                status: status.as_u16(),
            };
        }

        ExternalProviderError::Network {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }
}

impl RouteProvider for OsrmClient {
    fn request_route(&self, start: Coordinate, end: Coordinate) -> Option<ExternalRoute> {
        match self.fetch_route(start, end) {
            Ok(route) => Some(route),
            Err(err) => {
                warn!(error = %err, "OSRM route unavailable");
                None
            }
        }
    }
}

/// Turn a decoded OSRM response into a route in kilometers and `(lat, lng)`.
fn convert_response(response: OsrmRouteResponse) -> Result<ExternalRoute, ExternalProviderError> {
    if response.code != "Ok" {
        return Err(ExternalProviderError::Service {
            code: response.code,
            message: response.message.unwrap_or_default(),
        });
    }

    let route = response
        .routes
        .and_then(|routes| routes.into_iter().next())
        .ok_or(ExternalProviderError::NoRoute)?;

    if !route.distance.is_finite() || route.distance < 0.0 {
        return Err(ExternalProviderError::Parse {
            message: format!("invalid route distance {}", route.distance),
        });
    }

    let points: Vec<(f64, f64)> = route
        .geometry
        .coordinates
        .into_iter()
        .map(|[lng, lat]| (lat, lng))
        .collect();
    if points.is_empty() {
        return Err(ExternalProviderError::NoRoute);
    }

    Ok(ExternalRoute {
        distance_km: route.distance / 1000.0,
        polyline: Polyline::new(points),
        duration_secs: route.duration.filter(|secs| secs.is_finite() && *secs >= 0.0),
    })
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    message: Option<String>,
    routes: Option<Vec<OsrmRoute>>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    /// Meters.
    distance: f64,
    /// Seconds.
    duration: Option<f64>,
    geometry: OsrmGeometry,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}
