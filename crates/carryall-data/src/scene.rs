//! Scene files: a named description of anchors, stacks, collectors, stations
//! and loose items, resolved into a ready-to-run [`Engine`].
//!
//! Everything is referenced by name in the file. Names are resolved in
//! declaration order, so a stack must name an anchor declared above it, a
//! collector a stack, and so on. Item kinds get ids in the order they are
//! listed.

use crate::loader::{
    check_duplicate, config_error, deserialize_file, deserialize_str, resolve_name, DataLoadError,
    Format,
};
use carryall_core::config::{vec3, CollectorConfig, StackConfig, StationConfig};
use carryall_core::engine::Engine;
use carryall_core::id::{AnchorId, CollectorId, ItemId, ItemKindId, StackId, StationId};
use carryall_core::item::CarriableItem;
use carryall_core::station::Platform;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

// ===========================================================================
// On-disk schema
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SceneData {
    #[serde(default)]
    pub starting_balance: i64,
    pub item_kinds: Vec<String>,
    #[serde(default)]
    pub anchors: Vec<AnchorData>,
    #[serde(default)]
    pub stacks: Vec<StackData>,
    #[serde(default)]
    pub collectors: Vec<CollectorData>,
    #[serde(default)]
    pub stations: Vec<StationData>,
    #[serde(default)]
    pub items: Vec<ItemData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnchorData {
    pub name: String,
    pub position: [f64; 3],
}

#[derive(Debug, Clone, Deserialize)]
pub struct StackData {
    pub name: String,
    pub anchor: String,
    #[serde(default)]
    pub config: StackConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorData {
    pub name: String,
    pub stack: String,
    #[serde(default)]
    pub config: CollectorConfig,
}

/// A station. `produces` names the output item kind and overrides
/// `config.produced_kind`.
#[derive(Debug, Clone, Deserialize)]
pub struct StationData {
    pub name: String,
    pub source: String,
    pub input_anchor: String,
    pub output_anchor: String,
    pub produces: String,
    #[serde(default)]
    pub config: StationConfig,
}

/// A row of `count` loose items starting at `position`, each offset by
/// `step` from the previous one.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemData {
    pub kind: String,
    pub position: [f64; 3],
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub step: [f64; 3],
}

fn default_count() -> u32 {
    1
}

// ===========================================================================
// Built scene
// ===========================================================================

/// An engine plus the name tables used to build it.
#[derive(Debug)]
pub struct Scene {
    pub engine: Engine,
    pub item_kinds: HashMap<String, ItemKindId>,
    pub anchors: HashMap<String, AnchorId>,
    pub stacks: HashMap<String, StackId>,
    pub collectors: HashMap<String, CollectorId>,
    pub stations: HashMap<String, StationId>,
    /// Loose items in declaration order.
    pub items: Vec<ItemId>,
}

impl Scene {
    pub fn kind_name(&self, kind: ItemKindId) -> Option<&str> {
        self.item_kinds
            .iter()
            .find(|(_, id)| **id == kind)
            .map(|(name, _)| name.as_str())
    }
}

/// Load and build a scene file. The format is chosen by extension.
pub fn load_scene(path: &Path) -> Result<Scene, DataLoadError> {
    let data: SceneData = deserialize_file(path)?;
    build_scene(&data, path)
}

/// Parse and build a scene held in memory. `file` only labels errors.
pub fn load_scene_str(content: &str, format: Format, file: &Path) -> Result<Scene, DataLoadError> {
    let data: SceneData = deserialize_str(content, format, file)?;
    build_scene(&data, file)
}

/// Resolve every name in `data` and build the engine.
pub fn build_scene(data: &SceneData, file: &Path) -> Result<Scene, DataLoadError> {
    let to_config = config_error(file);
    let mut engine = Engine::with_balance(data.starting_balance);

    let mut item_kinds = HashMap::new();
    for (index, name) in data.item_kinds.iter().enumerate() {
        check_duplicate(&item_kinds, name, file)?;
        item_kinds.insert(name.clone(), ItemKindId(index as u32));
    }

    let mut anchors = HashMap::new();
    for anchor in &data.anchors {
        check_duplicate(&anchors, &anchor.name, file)?;
        let position = vec3("position", anchor.position).map_err(&to_config)?;
        anchors.insert(anchor.name.clone(), engine.add_anchor(position));
    }

    let mut stacks = HashMap::new();
    for stack in &data.stacks {
        check_duplicate(&stacks, &stack.name, file)?;
        let anchor = resolve_name(&anchors, &stack.anchor, file, "anchor")?;
        let settings = stack.config.to_settings().map_err(&to_config)?;
        stacks.insert(stack.name.clone(), engine.add_stack(settings, anchor)?);
    }

    let mut collectors = HashMap::new();
    for collector in &data.collectors {
        check_duplicate(&collectors, &collector.name, file)?;
        let stack = resolve_name(&stacks, &collector.stack, file, "stack")?;
        let settings = collector.config.to_settings().map_err(&to_config)?;
        collectors.insert(collector.name.clone(), engine.add_collector(settings, stack)?);
    }

    let mut stations = HashMap::new();
    for station in &data.stations {
        check_duplicate(&stations, &station.name, file)?;
        let source = resolve_name(&stacks, &station.source, file, "stack")?;
        let input_root = resolve_name(&anchors, &station.input_anchor, file, "anchor")?;
        let output_root = resolve_name(&anchors, &station.output_anchor, file, "anchor")?;
        let mut settings = station.config.to_settings().map_err(&to_config)?;
        settings.produced_kind = resolve_name(&item_kinds, &station.produces, file, "item kind")?;
        let input_grid = station.config.input.to_grid().map_err(&to_config)?;
        let output_grid = station.config.output.to_grid().map_err(&to_config)?;
        let input = Platform::new(input_grid, input_root);
        let output = Platform::new(output_grid, output_root);
        stations.insert(
            station.name.clone(),
            engine.add_station(settings, source, input, output)?,
        );
    }

    let mut items = Vec::new();
    for row in &data.items {
        let kind = resolve_name(&item_kinds, &row.kind, file, "item kind")?;
        let origin = vec3("position", row.position).map_err(&to_config)?;
        let step = vec3("step", row.step).map_err(&to_config)?;
        let mut position = origin;
        for _ in 0..row.count {
            items.push(engine.spawn_item(CarriableItem::new(kind, position)));
            position += step;
        }
    }

    log::info!(
        "built scene from {}: {} stacks, {} collectors, {} stations, {} items",
        file.display(),
        stacks.len(),
        collectors.len(),
        stations.len(),
        items.len()
    );

    Ok(Scene {
        engine,
        item_kinds,
        anchors,
        stacks,
        collectors,
        stations,
        items,
    })
}
