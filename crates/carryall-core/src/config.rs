//! Plain-number configuration for stacks, collectors and stations.
//!
//! These structs are what scene files deserialize into. Defaults match the
//! tuning of the original game. Converting to runtime settings validates
//! them: non-finite numbers are rejected, everything else is clamped into
//! range (negative capacity becomes 0, batch and production sizes become at
//! least 1, grid counts at least 1, negative durations 0).

use crate::collector::CollectorSettings;
use crate::fixed::{f64_to_fixed64, Fixed64};
use crate::grid::{Axis, FillOrder, GridContainer, GridError, MAX_COUNT};
use crate::id::ItemKindId;
use crate::stack::StackSettings;
use crate::station::StationSettings;
use crate::tween::Easing;
use crate::vec3::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be a finite number, got {value}")]
    NonFinite { field: &'static str, value: f64 },
    #[error(transparent)]
    Grid(#[from] GridError),
}

fn finite(field: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::NonFinite { field, value })
    }
}

fn duration(field: &'static str, value: f64) -> Result<Fixed64, ConfigError> {
    let value = finite(field, value)?;
    if value < 0.0 {
        log::warn!("{field} = {value} is negative; using 0");
    }
    Ok(f64_to_fixed64(value.max(0.0)))
}

fn count(field: &'static str, value: i64, min: u32) -> u32 {
    let clamped = value.clamp(min as i64, MAX_COUNT as i64) as u32;
    if clamped as i64 != value {
        log::warn!("{field} = {value} is out of range; using {clamped}");
    }
    clamped
}

/// Convert a plain `[x, y, z]` triple, rejecting non-finite components.
pub fn vec3(field: &'static str, v: [f64; 3]) -> Result<Vec3, ConfigError> {
    Ok(Vec3::new(
        f64_to_fixed64(finite(field, v[0])?),
        f64_to_fixed64(finite(field, v[1])?),
        f64_to_fixed64(finite(field, v[2])?),
    ))
}

// ---------------------------------------------------------------------------
// Stack
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    pub capacity: i64,
    pub vertical_spacing: f64,
    /// Uniform scale of carried items.
    pub carried_scale: f64,
    pub scale_duration: f64,
    pub easing: Easing,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            capacity: 20,
            vertical_spacing: 0.15,
            carried_scale: 0.75,
            scale_duration: 0.2,
            easing: Easing::EaseInOut,
        }
    }
}

impl StackConfig {
    pub fn to_settings(&self) -> Result<StackSettings, ConfigError> {
        let scale = f64_to_fixed64(finite("carried_scale", self.carried_scale)?);
        Ok(StackSettings {
            capacity: count("capacity", self.capacity, 0),
            vertical_spacing: f64_to_fixed64(finite("vertical_spacing", self.vertical_spacing)?),
            carried_scale: Vec3::splat(scale),
            scale_duration: duration("scale_duration", self.scale_duration)?,
            easing: self.easing,
        })
    }
}

// ---------------------------------------------------------------------------
// Collector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub pickup_interval: f64,
    pub pile_scale_out_duration: f64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            pickup_interval: 0.08,
            pile_scale_out_duration: 0.15,
        }
    }
}

impl CollectorConfig {
    pub fn to_settings(&self) -> Result<CollectorSettings, ConfigError> {
        Ok(CollectorSettings {
            pickup_interval: duration("pickup_interval", self.pickup_interval)?,
            pile_scale_out_duration: duration(
                "pile_scale_out_duration",
                self.pile_scale_out_duration,
            )?,
        })
    }
}

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub count_x: i64,
    pub count_y: i64,
    pub count_z: i64,
    pub spacing: [f64; 3],
    pub fastest: Axis,
    pub middle: Axis,
    pub slowest: Axis,
    pub center_offset: [f64; 3],
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            count_x: 3,
            count_y: 1,
            count_z: 3,
            spacing: [0.35, 0.20, 0.35],
            fastest: Axis::X,
            middle: Axis::Z,
            slowest: Axis::Y,
            center_offset: [0.0; 3],
        }
    }
}

impl GridConfig {
    pub fn to_grid(&self) -> Result<GridContainer, ConfigError> {
        let order = FillOrder::new(self.fastest, self.middle, self.slowest)?;
        Ok(GridContainer::new(
            [
                count("count_x", self.count_x, 1),
                count("count_y", self.count_y, 1),
                count("count_z", self.count_z, 1),
            ],
            vec3("spacing", self.spacing)?,
            order,
            vec3("center_offset", self.center_offset)?,
        ))
    }
}

// ---------------------------------------------------------------------------
// Station
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    pub batch_size: i64,
    pub process_time: f64,
    pub produced_per_batch: i64,
    pub produced_kind: u32,
    pub scale_duration: f64,
    pub easing: Easing,
    pub block_until_output_space: bool,
    /// 0 waits forever.
    pub output_wait_timeout: f64,
    pub money_per_batch: i64,
    pub auto_start_processing: bool,
    pub move_duration: f64,
    pub move_arc: f64,
    pub input: GridConfig,
    pub output: GridConfig,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            batch_size: 4,
            process_time: 2.0,
            produced_per_batch: 1,
            produced_kind: 0,
            scale_duration: 0.2,
            easing: Easing::EaseInOut,
            block_until_output_space: true,
            output_wait_timeout: 0.0,
            money_per_batch: 10,
            auto_start_processing: true,
            move_duration: 0.18,
            move_arc: 0.15,
            input: GridConfig::default(),
            output: GridConfig::default(),
        }
    }
}

impl StationConfig {
    pub fn to_settings(&self) -> Result<StationSettings, ConfigError> {
        Ok(StationSettings {
            batch_size: count("batch_size", self.batch_size, 1),
            process_time: duration("process_time", self.process_time)?,
            produced_per_batch: count("produced_per_batch", self.produced_per_batch, 1),
            produced_kind: ItemKindId(self.produced_kind),
            scale_duration: duration("scale_duration", self.scale_duration)?,
            easing: self.easing,
            block_until_output_space: self.block_until_output_space,
            output_wait_timeout: duration("output_wait_timeout", self.output_wait_timeout)?,
            money_per_batch: self.money_per_batch,
            auto_start_processing: self.auto_start_processing,
            move_duration: duration("move_duration", self.move_duration)?,
            move_arc: duration("move_arc", self.move_arc)?,
        })
    }
}
