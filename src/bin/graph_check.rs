//! CLI entrypoint for road graph asset diagnostics.
#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::process;

use clap::Parser;
use pickup_tracker::nearest::{NearestNodeLocator, DEFAULT_MAX_SNAP_DISTANCE_KM};
use pickup_tracker::service::default_pickup_points;
use pickup_tracker::{Coordinate, Graph, LoadError};

#[derive(Debug, Parser)]
#[command(
    name = "graph-check",
    about = "Validate a road graph asset and report its connectivity"
)]
struct Arguments {
    /// Road graph JSON asset.
    graph: PathBuf,

    /// Snapping tolerance in kilometers.
    #[arg(long, default_value_t = DEFAULT_MAX_SNAP_DISTANCE_KM)]
    max_snap_km: f64,

    /// Also snap the default pickup points and report their nodes.
    #[arg(long)]
    pickup_points: bool,

    /// Extra coordinate to snap, as `lat,lng`. May be repeated.
    #[arg(long = "snap", value_parser = parse_coordinate)]
    snaps: Vec<Coordinate>,
}

fn main() {
    let arguments = Arguments::parse();
    if let Err(error) = run(arguments) {
        eprintln!("graph-check: {error}");
        process::exit(1);
    }
}

fn run(arguments: Arguments) -> Result<(), LoadError> {
    let graph = Graph::load(&arguments.graph)?;
    let stats = graph.stats();
    println!("nodes:             {}", stats.nodes);
    println!("edges:             {}", stats.edges);
    println!("dropped edges:     {}", stats.dropped_edges);
    println!("connected nodes:   {}", stats.connected_nodes);
    println!("components:        {}", stats.components);
    println!("largest component: {}", stats.largest_component);
    if stats.components > 1 {
        println!("warning: graph is not connected; routes across components fall back to straight lines");
    }

    let locator = NearestNodeLocator::new(arguments.max_snap_km);
    let mut targets: Vec<(String, Coordinate)> = Vec::new();
    if arguments.pickup_points {
        targets.extend(
            default_pickup_points()
                .into_iter()
                .map(|point| (point.name.clone(), point.coordinate())),
        );
    }
    targets.extend(
        arguments
            .snaps
            .into_iter()
            .map(|coord| (format!("{},{}", coord.lat, coord.lng), coord)),
    );

    for (label, coord) in targets {
        match locator.find_nearest_node(&graph, coord) {
            Ok(snap) => {
                let node = graph.node(snap.node);
                println!(
                    "{label}: node {} at {:.3} km, degree {}",
                    node.id,
                    snap.distance_km,
                    graph.degree(snap.node)
                );
            }
            Err(err) => println!("{label}: {err}"),
        }
    }
    Ok(())
}

fn parse_coordinate(raw: &str) -> Result<Coordinate, String> {
    let (lat, lng) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected `lat,lng`, got `{raw}`"))?;
    let coord = Coordinate::new(
        lat.trim().parse().map_err(|err| format!("bad latitude: {err}"))?,
        lng.trim().parse().map_err(|err| format!("bad longitude: {err}"))?,
    );
    if coord.is_valid() {
        Ok(coord)
    } else {
        Err(format!("coordinate out of range: `{raw}`"))
    }
}
