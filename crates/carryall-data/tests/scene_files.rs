//! Loads the bundled scene files and runs them end to end.

use carryall_core::event::EventKind;
use carryall_core::station::StationPhase;
use carryall_core::test_utils::{fixed, STEP};
use carryall_data::{load_scene, load_scene_str, DataLoadError, Format, Scene};
use std::path::{Path, PathBuf};

fn scene_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("scenes").join(name)
}

/// Report every loose item to the `hands` collector each step.
fn collect_all(scene: &mut Scene, seconds: f64) {
    let hands = scene.collectors["hands"];
    let steps = (seconds / STEP).round() as usize;
    for _ in 0..steps {
        for &item in &scene.items {
            if scene.engine.item(item).is_some() {
                scene.engine.report_overlap(hands, item).unwrap();
            }
        }
        scene.engine.tick(fixed(STEP));
    }
}

fn run(scene: &mut Scene, seconds: f64) {
    let steps = (seconds / STEP).round() as usize;
    for _ in 0..steps {
        scene.engine.tick(fixed(STEP));
    }
}

#[test]
fn ron_scene_smelts_everything() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut scene = load_scene(&scene_path("smelter.ron")).unwrap();
    assert_eq!(scene.items.len(), 8);

    collect_all(&mut scene, 3.0);
    let backpack = scene.stacks["backpack"];
    assert_eq!(scene.engine.stack(backpack).unwrap().count(), 8);

    let smelter = scene.stations["smelter"];
    assert!(scene.engine.station_triggered(smelter).unwrap());
    run(&mut scene, 20.0);

    let engine = &scene.engine;
    let station = engine.station(smelter).unwrap();
    assert!(engine.stack(backpack).unwrap().is_empty());
    assert_eq!(station.input_count(), 0);
    assert_eq!(station.output_count(), 2);
    assert_eq!(station.phase(), StationPhase::Idle);
    assert_eq!(engine.balance(), 20);
    assert_eq!(engine.items().len(), 2);
    for (_, item) in engine.items().iter() {
        assert_eq!(scene.kind_name(item.kind), Some("ingot"));
    }
}

#[test]
fn toml_scene_times_out_on_full_output() {
    let mut scene = load_scene(&scene_path("smelter.toml")).unwrap();
    assert_eq!(scene.engine.balance(), 5);
    assert_eq!(scene.engine.stack(scene.stacks["backpack"]).unwrap().capacity(), 12);

    collect_all(&mut scene, 3.0);
    let smelter = scene.stations["smelter"];
    scene.engine.station_triggered(smelter).unwrap();
    run(&mut scene, 20.0);

    let engine = &scene.engine;
    assert_eq!(engine.balance(), 15);
    assert_eq!(engine.station(smelter).unwrap().output_count(), 1);
    assert_eq!(engine.events().total_emitted(EventKind::BatchConsumed), 2);
    assert_eq!(engine.events().total_emitted(EventKind::OutputTimedOut), 1);
}

#[test]
fn json_scene_from_string() {
    let content = r#"{
        "item_kinds": ["ore"],
        "anchors": [{ "name": "player", "position": [0.0, 1.0, 0.0] }],
        "stacks": [{ "name": "backpack", "anchor": "player", "config": { "capacity": -4 } }],
        "items": [{ "kind": "ore", "position": [1.0, 0.0, 0.0] }]
    }"#;
    let scene = load_scene_str(content, Format::Json, Path::new("inline.json")).unwrap();
    // Negative capacity clamps to zero.
    assert_eq!(scene.engine.stack(scene.stacks["backpack"]).unwrap().capacity(), 0);
    assert_eq!(scene.items.len(), 1);
    assert!(scene.collectors.is_empty());
}

#[test]
fn missing_file_is_io_error() {
    assert!(matches!(
        load_scene(&scene_path("does_not_exist.ron")),
        Err(DataLoadError::Io(_))
    ));
}
