//! State Replication
//!
//! Periodic ordered snapshots of authoritative fields, owner to observers.
//! Snapshots are best-effort and most-recent-wins: a dropped snapshot is
//! superseded by the next one, with no gap recovery.
//!
//! The snapshot field order is a wire contract. `(firing, health, using_ultra)`
//! is written and read in exactly that order; reordering the fields breaks
//! compatibility with every deployed peer.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::game::state::PlayerState;

/// Simulation ticks between outbound snapshots (10 Hz at a 60 Hz tick rate).
pub const SNAPSHOT_INTERVAL_TICKS: u32 = 6;

// =============================================================================
// SNAPSHOTS
// =============================================================================

/// Authoritative player fields, replicated in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Firing intent.
    pub firing: bool,
    /// Health in [0, 1].
    pub health: f32,
    /// Ultra intent.
    pub using_ultra: bool,
}

impl PlayerSnapshot {
    /// Capture the replicated fields from an owned player.
    pub fn capture(player: &PlayerState) -> Self {
        Self {
            firing: player.firing,
            health: player.health(),
            using_ultra: player.using_ultra,
        }
    }

    /// Overwrite a non-owning mirror with this snapshot.
    ///
    /// An owner receiving its own echoed snapshot ignores it: authoritative
    /// state has exactly one writer.
    pub fn apply(self, mirror: &mut PlayerState) {
        if mirror.authority.is_owner() {
            debug!(player = %mirror.id.short(), "ignoring snapshot for locally owned player");
            return;
        }
        mirror.firing = self.firing;
        mirror.set_health_mirror(self.health);
        mirror.using_ultra = self.using_ultra;
    }

    /// Serialize in wire order.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize in wire order.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

/// Replicated pickup state: observers learn the spawn time so their local
/// expiry tracks the owner's.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PickupSnapshot {
    /// Owner's creation timestamp.
    pub spawned_at: f32,
}

impl PickupSnapshot {
    /// Serialize in wire order.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize in wire order.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

// =============================================================================
// OUTBOUND CADENCE
// =============================================================================

/// Owner-side snapshot pacing: one outbound snapshot per replication tick.
#[derive(Debug)]
pub struct ReplicationChannel {
    interval_ticks: u32,
    ticks_since_send: u32,
}

impl ReplicationChannel {
    /// Channel that emits every `interval_ticks` simulation ticks. The first
    /// poll emits immediately.
    pub fn new(interval_ticks: u32) -> Self {
        Self {
            interval_ticks,
            ticks_since_send: interval_ticks,
        }
    }

    /// Advance one tick; returns the snapshot to send when due.
    pub fn poll(&mut self, player: &PlayerState) -> Option<PlayerSnapshot> {
        self.ticks_since_send += 1;
        if self.ticks_since_send < self.interval_ticks {
            return None;
        }
        self.ticks_since_send = 0;
        Some(PlayerSnapshot::capture(player))
    }
}

impl Default for ReplicationChannel {
    fn default() -> Self {
        Self::new(SNAPSHOT_INTERVAL_TICKS)
    }
}

// =============================================================================
// TESTS
// =============================================================================
