//! Headless runner: loads the demo yard, runs it, prints snapshots, verifies
//! determinism.
//!
//! Run with: `cargo run --package idleworks-data --example headless_runner`
//! Set `RUST_LOG=idleworks_core=debug` to see agent transitions.

use std::path::Path;

use idleworks_core::fixed::fixed64_to_f64;
use idleworks_data::load_scene;
use tracing_subscriber::EnvFilter;

const SECONDS: f64 = 60.0;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let path = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/data/demo_yard.ron"));

    // Run 1
    let mut scene = load_scene(path).unwrap_or_else(|e| panic!("failed to load demo yard: {e}"));
    let steps = scene.ticks_for(SECONDS);
    scene.engine.run_steps(steps);
    let hash1 = scene.engine.state_hash();

    println!("After {SECONDS}s ({steps} ticks): state hash = {hash1:#018x}");

    let mut sources: Vec<_> = scene.names.sources.iter().collect();
    sources.sort();
    for (name, &id) in sources {
        if let Some(snap) = scene.engine.snapshot_source(id) {
            println!("  source  [{name:>8}] {}/{}", snap.count, snap.capacity);
        }
    }
    for (name, &id) in &scene.names.stations {
        if let Some(snap) = scene.engine.snapshot_station(id) {
            println!(
                "  station [{name:>8}] state={:?}, progress={:.2}, input={}/{}",
                snap.state,
                fixed64_to_f64(snap.progress),
                snap.input_count,
                snap.input_capacity
            );
        }
    }
    for (name, &id) in &scene.names.agents {
        if let Some(snap) = scene.engine.snapshot_agent(id) {
            println!(
                "  agent   [{name:>8}] state={:?}, holding={}",
                snap.state, snap.inventory_count
            );
        }
    }
    for (name, &id) in &scene.names.projects {
        if let Some(snap) = scene.engine.snapshot_project(id) {
            println!(
                "  project [{name:>8}] {}/{} parts, complete={}",
                snap.next_index, snap.slot_count, snap.complete
            );
        }
    }

    // Run 2: determinism check
    let mut again = load_scene(path).unwrap_or_else(|e| panic!("failed to load demo yard (run 2): {e}"));
    again.engine.run_steps(steps);
    let hash2 = again.engine.state_hash();

    if hash1 == hash2 {
        println!("Determinism: PASS (hashes match)");
    } else {
        println!("Determinism: FAIL! hash1={hash1:#018x} != hash2={hash2:#018x}");
        std::process::exit(1);
    }
}
