//! Simulation clock, the per-tick context handed to collectors and
//! stations, and the state hash used to compare runs.

use crate::bank::MoneyBank;
use crate::event::{Event, EventBus};
use crate::fixed::{Fixed64, Seconds, Ticks};
use crate::id::{StackId, StationId};
use crate::item::{Anchors, ItemArena};
use crate::stack::ItemStack;
use slotmap::SlotMap;

// ---------------------------------------------------------------------------
// Simulation state
// ---------------------------------------------------------------------------

/// Mutable clock state tracked by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SimState {
    /// Incremented by 1 for each `tick()` call.
    pub tick: Ticks,
    /// Total simulated seconds.
    pub elapsed: Seconds,
}

impl SimState {
    pub fn new() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Tick context
// ---------------------------------------------------------------------------

/// Borrowed engine state a collector or station may touch during a tick.
/// Every mutation through it is instantaneous; only the owning task's own
/// state machine spans ticks.
pub struct TickContext<'a> {
    pub items: &'a mut ItemArena,
    pub anchors: &'a Anchors,
    pub stacks: &'a mut SlotMap<StackId, ItemStack>,
    pub events: &'a mut EventBus,
    pub bank: &'a mut MoneyBank,
    pub tick: Ticks,
}

impl TickContext<'_> {
    /// Credit a station's reward to the bank and announce both the delta and
    /// the new balance.
    pub fn credit(&mut self, station: StationId, amount: i64) {
        let balance = self.bank.add(amount);
        self.events.emit(Event::MoneyAdded {
            station,
            amount,
            tick: self.tick,
        });
        self.events.emit(Event::BalanceChanged {
            balance,
            tick: self.tick,
        });
    }
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// A deterministic FNV-1a (64-bit) hash of observable state. Not
/// cryptographic; used to check that two runs stayed in lockstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_fixed64(&mut self, v: Fixed64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}
