//! Kathmandu / Lalitpur pickup locations and a street grid around them.

#![allow(dead_code)]

use std::io::Write;

use pickup_tracker::graph::GraphAsset;
use pickup_tracker::service::PickupPoint;
use pickup_tracker::Coordinate;
use tempfile::NamedTempFile;

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }

    pub fn pickup_point(&self) -> PickupPoint {
        PickupPoint::new(self.name, self.lat, self.lng)
    }
}

pub const PICKUPS: &[Location] = &[
    Location::new("Child 1 - School Gate", 27.6703017, 85.322441),
    Location::new("Child 2 - Park Area", 27.6902319, 85.3194997),
    Location::new("Child 3 - Main Road", 27.6976729, 85.325825),
    Location::new("Child 4 - Community Center", 27.6947084, 85.3401176),
];

/// Inside the grid, south-west of Child 1.
pub const DEPOT: Location = Location::new("Bus Depot", 27.6660, 85.3160);

/// Well outside the grid (Bhaktapur).
pub const OUTSIDE: Location = Location::new("Bhaktapur Durbar Square", 27.6722, 85.4280);

pub const GRID_SOUTH: f64 = 27.660;
pub const GRID_WEST: f64 = 85.310;
pub const GRID_STEP: f64 = 0.0025;
pub const GRID_ROWS: usize = 18;
pub const GRID_COLS: usize = 16;

pub fn grid_id(row: usize, col: usize) -> String {
    format!("r{row}c{col}")
}

/// Rectangular street grid with 4-neighbor connectivity.
pub fn grid_asset() -> GraphAsset {
    let mut asset = GraphAsset::new();
    for row in 0..GRID_ROWS {
        for col in 0..GRID_COLS {
            asset = asset.with_node(
                grid_id(row, col),
                GRID_SOUTH + row as f64 * GRID_STEP,
                GRID_WEST + col as f64 * GRID_STEP,
            );
            if col > 0 {
                asset = asset.with_edge(grid_id(row, col - 1), grid_id(row, col));
            }
            if row > 0 {
                asset = asset.with_edge(grid_id(row - 1, col), grid_id(row, col));
            }
        }
    }
    asset
}

/// Write `asset` as JSON to a temp file that lives as long as the handle.
pub fn write_asset(asset: &GraphAsset) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp graph file");
    let json = serde_json::to_string(asset).expect("serialise graph asset");
    file.write_all(json.as_bytes()).expect("write graph asset");
    file
}
