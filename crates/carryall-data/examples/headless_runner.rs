//! Headless host loop for a carryall scene.
//!
//! Walks the `player` anchor across the loose items, reporting overlaps by
//! distance, then carries the backpack to every station, waits for them to
//! finish and sells whatever they produced.
//!
//! ```text
//! RUST_LOG=debug cargo run -p carryall-data --example headless_runner -- scenes/smelter.ron
//! ```

use carryall_core::fixed::f64_to_fixed64;
use carryall_core::id::PlatformSide;
use carryall_core::vec3::Vec3;
use carryall_data::{load_scene, DataLoadError, Scene};
use std::path::PathBuf;

const STEP: f64 = 1.0 / 30.0;
const REACH: f64 = 0.75;
const WALK_SPEED: f64 = 2.0;

fn distance(a: Vec3, b: Vec3) -> f64 {
    let [ax, _, az] = a.to_f64();
    let [bx, _, bz] = b.to_f64();
    ((ax - bx).powi(2) + (az - bz).powi(2)).sqrt()
}

/// Move the player toward `target` at walking speed, reporting every loose
/// item in reach to every collector. Returns once the player arrives.
fn walk_to(scene: &mut Scene, target: Vec3) -> Result<(), DataLoadError> {
    let player = scene.anchors["player"];
    loop {
        let Some(here) = scene.engine.anchors().get(player) else {
            return Ok(());
        };
        let [hx, hy, hz] = here.to_f64();
        let [tx, _, tz] = target.to_f64();
        let remaining = distance(here, target);
        let next = if remaining <= WALK_SPEED * STEP {
            Vec3::from_f64(tx, hy, tz)
        } else {
            let k = WALK_SPEED * STEP / remaining;
            Vec3::from_f64(hx + (tx - hx) * k, hy, hz + (tz - hz) * k)
        };
        scene.engine.set_anchor_position(player, next)?;

        let collectors: Vec<_> = scene.collectors.values().copied().collect();
        for &item in &scene.items {
            let Some(position) = scene.engine.world_position(item) else {
                continue;
            };
            if distance(position, next) <= REACH {
                for &collector in &collectors {
                    scene.engine.report_overlap(collector, item)?;
                }
            }
        }
        scene.engine.tick(f64_to_fixed64(STEP));

        if remaining <= WALK_SPEED * STEP {
            return Ok(());
        }
    }
}

fn wait(scene: &mut Scene, seconds: f64) {
    for _ in 0..(seconds / STEP).round() as usize {
        scene.engine.tick(f64_to_fixed64(STEP));
    }
}

fn main() -> Result<(), DataLoadError> {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenes/smelter.ron"));
    let mut scene = load_scene(&path)?;
    log::info!("loaded {}", path.display());

    // Sweep over every loose item.
    let pickups: Vec<Vec3> = scene
        .items
        .iter()
        .filter_map(|&item| scene.engine.world_position(item))
        .collect();
    for target in pickups {
        walk_to(&mut scene, target)?;
    }
    wait(&mut scene, 1.0);

    // Visit each station and let it work.
    let mut stations: Vec<_> = scene.stations.iter().map(|(n, &id)| (n.clone(), id)).collect();
    stations.sort();
    for (name, station) in stations {
        let Some(root) = scene
            .engine
            .station(station)
            .map(|s| s.platform(PlatformSide::Input).root)
        else {
            continue;
        };
        let Some(target) = scene.engine.anchors().get(root) else {
            continue;
        };
        walk_to(&mut scene, target)?;
        scene.engine.station_triggered(station)?;
        log::info!("triggered {name}");

        // Keep the output platform clear so production never stalls.
        for _ in 0..60 {
            wait(&mut scene, 0.5);
            let sold = scene.engine.release_output(station, u32::MAX)?;
            for item in sold {
                scene.engine.destroy_item(item)?;
            }
        }
    }

    println!(
        "tick {} | balance {} | items left {} | hash {:016x}",
        scene.engine.tick_count(),
        scene.engine.balance(),
        scene.engine.items().len(),
        scene.engine.state_hash()
    );
    Ok(())
}
