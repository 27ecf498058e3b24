//! Binary snapshots of the engine via `bitcode` with a versioned header.
//!
//! Every task (pickups, drains, processing loops) is plain data, so a
//! snapshot taken mid-transition resumes exactly where it stopped. The
//! event bus holds closures and is not part of a snapshot; listeners must be
//! registered again after [`Engine::deserialize`].

use crate::bank::MoneyBank;
use crate::collector::Collector;
use crate::engine::Engine;
use crate::event::EventBus;
use crate::id::{CollectorId, StackId, StationId};
use crate::item::{Anchors, ItemArena};
use crate::sim::SimState;
use crate::stack::ItemStack;
use crate::station::ProcessingStation;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a carryall engine snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0xCA77_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Snapshot header
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Tick count at the time the snapshot was taken.
    pub tick: u64,
}

impl SnapshotHeader {
    pub fn new(tick: u64) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            tick,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

/// Decode only to read the header. bitcode has no partial decode, so the
/// whole payload is parsed.
pub fn read_snapshot_header(data: &[u8]) -> Result<SnapshotHeader, DeserializeError> {
    let snapshot: EngineSnapshot =
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
    Ok(snapshot.header)
}

// ---------------------------------------------------------------------------
// Serializable engine state
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct EngineSnapshot {
    header: SnapshotHeader,
    items: ItemArena,
    anchors: Anchors,
    stacks: SlotMap<StackId, ItemStack>,
    collectors: SlotMap<CollectorId, Collector>,
    stations: SlotMap<StationId, ProcessingStation>,
    bank: MoneyBank,
    sim_state: SimState,
    paused: bool,
    last_state_hash: u64,
}

impl Engine {
    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        let snapshot = EngineSnapshot {
            header: SnapshotHeader::new(self.sim_state.tick),
            items: self.items.clone(),
            anchors: self.anchors.clone(),
            stacks: self.stacks.clone(),
            collectors: self.collectors.clone(),
            stations: self.stations.clone(),
            bank: self.bank.clone(),
            sim_state: self.sim_state.clone(),
            paused: self.paused,
            last_state_hash: self.last_state_hash,
        };
        bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Rebuild an engine from a snapshot. The event bus starts empty.
    pub fn deserialize(data: &[u8]) -> Result<Self, DeserializeError> {
        let snapshot: EngineSnapshot =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        snapshot.header.validate()?;

        Ok(Engine {
            items: snapshot.items,
            anchors: snapshot.anchors,
            stacks: snapshot.stacks,
            collectors: snapshot.collectors,
            stations: snapshot.stations,
            bank: snapshot.bank,
            sim_state: snapshot.sim_state,
            paused: snapshot.paused,
            last_state_hash: snapshot.last_state_hash,
            event_bus: EventBus::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::test_utils::*;
    use crate::vec3::Vec3;

    #[test]
    fn mid_pickup_snapshot_resumes_identically() {
        let mut rig = PickupRig::new(4);
        let items: Vec<_> = (0..3)
            .map(|i| rig.engine.spawn_item(loose_item(Vec3::from_f64(i as f64, 0.0, 0.0))))
            .collect();
        rig.collect_for(&items, 0.25);
        assert!(!rig.engine.collector(rig.collector).unwrap().in_flight().is_empty());

        let bytes = rig.engine.serialize().unwrap();
        let mut restored = Engine::deserialize(&bytes).unwrap();
        assert_eq!(restored.state_hash(), rig.engine.state_hash());
        assert_eq!(restored.compute_state_hash(), rig.engine.compute_state_hash());

        for _ in 0..20 {
            for &item in &items {
                rig.engine.report_overlap(rig.collector, item).unwrap();
                restored.report_overlap(rig.collector, item).unwrap();
            }
            rig.engine.tick(fixed(STEP));
            restored.tick(fixed(STEP));
        }
        assert_eq!(restored.state_hash(), rig.engine.state_hash());
        assert_eq!(restored.stack(rig.stack).unwrap().count(), 3);
    }

    #[test]
    fn event_bus_is_not_restored() {
        let mut rig = PickupRig::new(2);
        let item = rig.engine.spawn_item(loose_item(Vec3::ZERO));
        rig.collect_for(&[item], 1.0);
        assert_eq!(rig.engine.events().buffered_count(EventKind::PickupCommitted), 1);

        let restored = Engine::deserialize(&rig.engine.serialize().unwrap()).unwrap();
        assert_eq!(restored.events().buffered_count(EventKind::PickupCommitted), 0);
        assert_eq!(restored.stack(rig.stack).unwrap().items(), &[item]);
    }

    #[test]
    fn header_carries_tick() {
        let mut engine = Engine::new();
        run(&mut engine, 0.5);
        let header = read_snapshot_header(&engine.serialize().unwrap()).unwrap();
        assert_eq!(header.tick, 10);
        assert!(header.validate().is_ok());
    }

    #[test]
    fn bad_magic_and_version_rejected() {
        let mut header = SnapshotHeader::new(0);
        header.magic = 0xDEAD_BEEF;
        assert!(matches!(header.validate(), Err(DeserializeError::InvalidMagic(0xDEAD_BEEF))));

        let mut header = SnapshotHeader::new(0);
        header.version = FORMAT_VERSION + 1;
        assert!(matches!(header.validate(), Err(DeserializeError::FutureVersion(_))));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(
            Engine::deserialize(&[1, 2, 3]),
            Err(DeserializeError::Decode(_))
        ));
    }
}
