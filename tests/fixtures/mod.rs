//! Test fixtures for pickup-tracker.
//!
//! Provides:
//! - Real Kathmandu pickup locations (the default waypoint set)
//! - A synthetic street grid covering them, in memory or on disk

pub mod kathmandu;

pub use kathmandu::*;
