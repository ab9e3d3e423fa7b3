//! Error types for the routing core, the pickup state machine and the
//! service surface.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::pickup::PickupStatus;

/// The road graph asset could not be loaded. Fatal at startup.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("graph asset {path} could not be read: {source}")]
    Missing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("graph asset {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Recoverable failures inside the internal graph tier.
///
/// These never reach callers of [`crate::resolver::RouteResolver::resolve_route`];
/// each one is a signal to fall through to the next tier.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    #[error("no graph node within {max_distance_km} km of ({lat}, {lng})")]
    NotFound {
        lat: f64,
        lng: f64,
        max_distance_km: f64,
    },

    #[error("node {node} has no road connections")]
    NodeDisconnected { node: String },

    #[error("no road path from {from} to {to} after {iterations} iterations")]
    NoPath {
        from: String,
        to: String,
        iterations: usize,
    },
}

/// Failures talking to the external routing service.
///
/// Only ever logged: [`crate::traits::RouteProvider::request_route`] maps every
/// one of these to `None`.
#[derive(Debug, Error)]
pub enum ExternalProviderError {
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("request to {url} failed with HTTP {status}")]
    Http { url: String, status: u16 },

    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("could not parse routing response: {message}")]
    Parse { message: String },

    #[error("routing service returned {code}: {message}")]
    Service { code: String, message: String },

    #[error("routing service returned no usable route")]
    NoRoute,
}

/// Rejected pickup lifecycle operations. State is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PickupError {
    #[error("cannot {operation} while pickup is {status:?}")]
    InvalidOperation {
        operation: &'static str,
        status: PickupStatus,
    },
}

/// Errors surfaced by [`crate::service::PickupService`] request handlers.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid coordinates ({lat}, {lng})")]
    InvalidCoordinates { lat: f64, lng: f64 },

    #[error("unknown pickup point {0}")]
    UnknownPickupPoint(usize),

    #[error("no pickup points configured")]
    NoPickupPoints,

    #[error("vehicle location not available")]
    NoVehiclePosition,

    #[error(transparent)]
    Pickup(#[from] PickupError),
}

/// Configuration file could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {path} could not be read: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("config file {path} is invalid: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures building a [`crate::service::PickupService`] from configuration.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
