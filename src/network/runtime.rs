//! Remote Object Runtime Interface
//!
//! The core is layered over a generic networked-object runtime provided by an
//! external collaborator: instantiate an entity network-wide, destroy it
//! network-wide, and invoke named procedures on every peer holding it.
//! Transport concerns (reliability, ordering of the underlying channel, NAT)
//! live below this interface.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::vec2::Vec2;
use crate::game::state::PlayerId;

// =============================================================================
// HANDLES AND PREFABS
// =============================================================================

/// Handle to a networked entity, unique across the session.
///
/// The high 32 bits are the allocating peer's index, the low 32 bits a local
/// counter, so peers can allocate without coordination.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NetHandle(pub u64);

impl NetHandle {
    /// Compose a handle from a peer index and local counter.
    pub fn compose(peer_index: u32, counter: u32) -> Self {
        Self(((peer_index as u64) << 32) | counter as u64)
    }
}

impl fmt::Debug for NetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NetHandle({:#x})", self.0)
    }
}

impl fmt::Display for NetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Networked prefab identifiers understood by every peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrefabId {
    /// Fire element projectile
    FireBall,
    /// Electric element projectile
    ElectricArc,
    /// Ice element projectile
    IceCrystal,
    /// Stone element projectile
    StoneCharge,
    /// Rancher element projectile
    RancherSword,
    /// Electric ultra area effect
    ElectricField,
    /// Health restore pickup
    HealthPack,
    /// Speed boost pickup
    SpeedBoost,
}

impl PrefabId {
    /// Asset name used by the presentation collaborator.
    pub fn as_str(self) -> &'static str {
        match self {
            PrefabId::FireBall => "FireBall",
            PrefabId::ElectricArc => "ElectricArc",
            PrefabId::IceCrystal => "IceCrystal",
            PrefabId::StoneCharge => "StoneCharge",
            PrefabId::RancherSword => "RancherSword",
            PrefabId::ElectricField => "ElectricField",
            PrefabId::HealthPack => "HealthPack",
            PrefabId::SpeedBoost => "SpeedBoost",
        }
    }
}

// =============================================================================
// REMOTE PROCEDURES
// =============================================================================

/// Delivery target for a remote procedure call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcTarget {
    /// Every peer currently in the session.
    All,
    /// Every peer, and replayed in call order to peers that join later.
    AllBuffered,
}

/// The closed set of remote procedures peers invoke on each other.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum RpcCall {
    /// Parent an electric field to its owner's transform on every peer.
    /// Sent buffered so late joiners fix up the relationship too.
    SetFieldParent {
        /// The spawned field entity.
        field: NetHandle,
        /// The player to parent it to.
        owner: PlayerId,
    },

    /// Grant a timed speed bonus to a player on every peer.
    ApplySpeedBuff {
        /// Recipient player.
        player: PlayerId,
        /// Additive speed bonus.
        delta: f32,
        /// Bonus duration in seconds.
        duration_secs: f32,
    },

    /// Credit damage to whichever peer owns the given bullet tag.
    CreditDamage {
        /// Collider tag of the bullet that landed the hit.
        shooter_tag: String,
        /// Damage amount to credit.
        amount: f32,
    },
}

// =============================================================================
// RUNTIME TRAIT
// =============================================================================

/// Remote-object runtime the core drives.
///
/// `destroy` must be safe to call more than once for the same handle; the
/// implementations in this crate absorb duplicates, and `DestroyLedger` lets
/// callers gate local effects on the first request as well.
pub trait NetworkRuntime {
    /// Create a networked entity owned by the caller.
    fn instantiate(
        &mut self,
        prefab: PrefabId,
        position: Vec2,
        rotation_deg: f32,
        group: u8,
    ) -> NetHandle;

    /// Remove an entity network-wide. Duplicate and late requests are no-ops.
    fn destroy(&mut self, handle: NetHandle);

    /// Invoke a named procedure on every peer holding the entity.
    fn invoke(&mut self, target: RpcTarget, call: RpcCall);
}

// =============================================================================
// DESTROY LEDGER
// =============================================================================

/// Tracks destroy requests already issued locally, so a duplicate overlap in
/// the same tick cannot double-apply a consumption before removal propagates.
#[derive(Debug, Default)]
pub struct DestroyLedger {
    issued: BTreeSet<NetHandle>,
}

impl DestroyLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a destroy for `handle` unless one was already issued.
    /// Returns true on the first request, false for duplicates.
    pub fn destroy(&mut self, net: &mut dyn NetworkRuntime, handle: NetHandle) -> bool {
        if !self.issued.insert(handle) {
            return false;
        }
        net.destroy(handle);
        true
    }

    /// Whether a destroy was already issued for `handle`.
    pub fn already_issued(&self, handle: NetHandle) -> bool {
        self.issued.contains(&handle)
    }
}

// =============================================================================
// TEST RUNTIME
// =============================================================================


#[cfg(test)]
mod tests {
    use super::testing::RecordingRuntime;
    use super::*;

    #[test]
    fn test_handle_compose() {
        let handle = NetHandle::compose(3, 7);
        assert_eq!(handle.0, (3u64 << 32) | 7);
    }

    #[test]
    fn test_prefab_asset_names() {
        assert_eq!(PrefabId::FireBall.as_str(), "FireBall");
        assert_eq!(PrefabId::RancherSword.as_str(), "RancherSword");
        assert_eq!(PrefabId::ElectricField.as_str(), "ElectricField");
        assert_eq!(PrefabId::SpeedBoost.as_str(), "SpeedBoost");
    }

    #[test]
    fn test_destroy_ledger_absorbs_duplicates() {
        let mut net = RecordingRuntime::new();
        let mut ledger = DestroyLedger::new();
        let handle = NetHandle::compose(1, 1);

        assert!(ledger.destroy(&mut net, handle));
        assert!(!ledger.destroy(&mut net, handle));
        assert!(!ledger.destroy(&mut net, handle));

        // Exactly one destroy reached the runtime
        assert_eq!(net.destroyed(), vec![handle]);
        assert!(ledger.already_issued(handle));
    }

    #[test]
    fn test_rpc_call_serde_roundtrip() {
        let call = RpcCall::SetFieldParent {
            field: NetHandle::compose(2, 5),
            owner: PlayerId::new([9; 16]),
        };
        let json = serde_json::to_string(&call).unwrap();
        let parsed: RpcCall = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, call);
    }
}
