//! Pickups
//!
//! Health packs and speed boosts: spawned by one peer, consumed at most once
//! network-wide, expired by time-to-live. Health pack consumption is resolved
//! by the overlapping player's owner (see `game::damage`); speed boost
//! consumption is resolved by the pickup's owner, which grants the buff to
//! every peer over an RPC before destroying itself.

use crate::core::vec2::Vec2;
use crate::game::events::CombatEvent;
use crate::game::lifetime::{poll_expiry, ExpiryAction, Lifetime};
use crate::game::state::{Authority, PlayerId};
use crate::network::replication::PickupSnapshot;
use crate::network::runtime::{DestroyLedger, NetHandle, NetworkRuntime, PrefabId, RpcCall, RpcTarget};

/// Seconds a pickup stays on the field before expiring.
pub const PICKUP_TTL_SECS: f32 = 10.0;

/// Additive speed bonus granted by a speed pickup.
pub const SPEED_BOOST_DELTA: f32 = 1.5;

/// Seconds the speed bonus lasts.
pub const SPEED_BOOST_SECS: f32 = 5.0;

/// Kind of pickup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PickupKind {
    /// Restores health on contact.
    HealthPack,
    /// Grants a timed movement speed bonus.
    SpeedBoost,
}

impl PickupKind {
    /// Networked prefab for this kind.
    pub fn prefab(self) -> PrefabId {
        match self {
            PickupKind::HealthPack => PrefabId::HealthPack,
            PickupKind::SpeedBoost => PrefabId::SpeedBoost,
        }
    }
}

/// State of one pickup entity on this peer.
#[derive(Clone, Debug)]
pub struct PickupState {
    /// Network handle.
    pub handle: NetHandle,
    /// What it grants.
    pub kind: PickupKind,
    /// Who owns it.
    pub authority: Authority,
    /// Creation time plus time-to-live.
    pub lifetime: Lifetime,
    /// Consumption already honored; later overlaps are ignored.
    pub consumed: bool,
    /// Non-owner expiry: presentation disabled while waiting for the owner's
    /// destroy to arrive.
    pub hidden: bool,
}

impl PickupState {
    /// Track an existing pickup entity.
    pub fn new(handle: NetHandle, kind: PickupKind, authority: Authority, now: f32) -> Self {
        Self {
            handle,
            kind,
            authority,
            lifetime: Lifetime::new(now, PICKUP_TTL_SECS),
            consumed: false,
            hidden: false,
        }
    }

    /// Whether the pickup still reacts to overlaps.
    pub fn active(&self) -> bool {
        !self.consumed && !self.hidden
    }

    /// Adopt the owner's replicated spawn time so local expiry tracks the
    /// owner's. Owners keep their own timestamp.
    pub fn apply_snapshot(&mut self, snapshot: PickupSnapshot) {
        if self.authority.is_owner() {
            return;
        }
        self.lifetime.spawned_at = snapshot.spawned_at;
    }

    /// Capture the replicated spawn time (owner side).
    pub fn snapshot(&self) -> PickupSnapshot {
        PickupSnapshot {
            spawned_at: self.lifetime.spawned_at,
        }
    }
}

/// Spawn a pickup owned by the local peer.
pub fn spawn_pickup(
    kind: PickupKind,
    position: Vec2,
    now: f32,
    net: &mut dyn NetworkRuntime,
) -> PickupState {
    let handle = net.instantiate(kind.prefab(), position, 0.0, 0);
    PickupState::new(handle, kind, Authority::Local, now)
}

/// Per-tick lifetime poll for one pickup.
pub fn pickup_tick(
    pickup: &mut PickupState,
    now: f32,
    net: &mut dyn NetworkRuntime,
    destroys: &mut DestroyLedger,
) {
    if !pickup.active() {
        return;
    }
    match poll_expiry(&pickup.lifetime, pickup.authority, now) {
        ExpiryAction::Keep => {}
        ExpiryAction::DestroyNetworkWide => {
            if destroys.destroy(net, pickup.handle) {
                pickup.consumed = true;
            }
        }
        ExpiryAction::HideLocal => {
            pickup.hidden = true;
        }
    }
}

/// Owner-side resolution of a player entity overlapping a speed pickup.
///
/// Grants the buff to every peer with an `ApplySpeedBuff` RPC, then destroys
/// the pickup network-wide. Exactly one consumption is honored even if more
/// overlap events arrive before removal propagates.
pub fn resolve_speed_pickup_overlap(
    pickup: &mut PickupState,
    player: PlayerId,
    net: &mut dyn NetworkRuntime,
    destroys: &mut DestroyLedger,
    events: &mut Vec<CombatEvent>,
) {
    if pickup.kind != PickupKind::SpeedBoost {
        return;
    }
    if !pickup.authority.is_owner() || !pickup.active() {
        return;
    }
    if !destroys.destroy(net, pickup.handle) {
        return;
    }
    pickup.consumed = true;

    net.invoke(
        RpcTarget::All,
        RpcCall::ApplySpeedBuff {
            player,
            delta: SPEED_BOOST_DELTA,
            duration_secs: SPEED_BOOST_SECS,
        },
    );
    events.push(CombatEvent::SpeedBoostConsumed {
        player,
        pickup: pickup.handle,
    });
}

// =============================================================================
// TESTS
// =============================================================================
