//! Entity Mirrors
//!
//! A peer's read-only view of entities owned elsewhere. Mirrors change only
//! from inbound spawn/destroy notices and remote procedure calls; local
//! gameplay never mutates them directly.

use std::collections::BTreeMap;

use tracing::debug;

use crate::core::vec2::Vec2;
use crate::game::state::PlayerId;
use crate::network::runtime::{NetHandle, PrefabId, RpcCall};

/// Local mirror of a remotely owned entity.
#[derive(Clone, Debug)]
pub struct MirrorEntity {
    /// Network handle.
    pub handle: NetHandle,
    /// What was spawned.
    pub prefab: PrefabId,
    /// Owning peer.
    pub owner: PlayerId,
    /// Last replicated position.
    pub position: Vec2,
    /// Last replicated rotation.
    pub rotation_deg: f32,
    /// Transform parent fixed up by a `SetFieldParent` call, if any.
    pub parent: Option<PlayerId>,
    /// Presentation disabled (local TTL expiry on a non-owner).
    pub hidden: bool,
}

/// All mirrored entities held by one peer.
#[derive(Debug, Default)]
pub struct MirrorWorld {
    entities: BTreeMap<NetHandle, MirrorEntity>,
}

impl MirrorWorld {
    /// Create an empty mirror set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a spawn notice.
    pub fn on_spawn(
        &mut self,
        handle: NetHandle,
        prefab: PrefabId,
        owner: PlayerId,
        position: Vec2,
        rotation_deg: f32,
    ) {
        self.entities.insert(
            handle,
            MirrorEntity {
                handle,
                prefab,
                owner,
                position,
                rotation_deg,
                parent: None,
                hidden: false,
            },
        );
    }

    /// Record a destroy notice. Duplicate or late notices for entities this
    /// peer never held are absorbed.
    pub fn on_destroy(&mut self, handle: NetHandle) {
        if self.entities.remove(&handle).is_none() {
            debug!(%handle, "destroy for unknown entity absorbed");
        }
    }

    /// Apply an inbound remote procedure call. Only entity-targeted calls are
    /// handled here; player-targeted calls are routed to the player driver.
    ///
    /// A parenting call whose entity is unknown (creation lost or reordered)
    /// leaves the entity unparented; that inconsistency window is accepted,
    /// not an error.
    pub fn apply_rpc(&mut self, call: &RpcCall) {
        if let RpcCall::SetFieldParent { field, owner } = call {
            match self.entities.get_mut(field) {
                Some(entity) => entity.parent = Some(*owner),
                None => {
                    debug!(field = %field, "parenting call before creation; leaving unparented");
                }
            }
        }
    }

    /// Disable local presentation of an entity (non-owner TTL expiry).
    pub fn hide(&mut self, handle: NetHandle) {
        if let Some(entity) = self.entities.get_mut(&handle) {
            entity.hidden = true;
        }
    }

    /// Look up a mirror.
    pub fn get(&self, handle: NetHandle) -> Option<&MirrorEntity> {
        self.entities.get(&handle)
    }

    /// Number of mirrored entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether no entities are mirrored.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate mirrors in handle order.
    pub fn iter(&self) -> impl Iterator<Item = &MirrorEntity> {
        self.entities.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn(world: &mut MirrorWorld, handle: NetHandle, owner: PlayerId) {
        world.on_spawn(handle, PrefabId::ElectricField, owner, Vec2::ZERO, 0.0);
    }

    #[test]
    fn test_parent_fixup_applies_to_known_entity() {
        let mut world = MirrorWorld::new();
        let owner = PlayerId::new([1; 16]);
        let field = NetHandle::compose(1, 1);
        spawn(&mut world, field, owner);

        world.apply_rpc(&RpcCall::SetFieldParent { field, owner });

        assert_eq!(world.get(field).unwrap().parent, Some(owner));
    }

    #[test]
    fn test_parenting_before_creation_is_absorbed() {
        let mut world = MirrorWorld::new();
        let owner = PlayerId::new([1; 16]);
        let field = NetHandle::compose(1, 1);

        // No spawn recorded yet: the call is dropped, not an error.
        world.apply_rpc(&RpcCall::SetFieldParent { field, owner });
        assert!(world.is_empty());

        // The entity arriving later stays unparented until another call.
        spawn(&mut world, field, owner);
        assert_eq!(world.get(field).unwrap().parent, None);
    }

    #[test]
    fn test_duplicate_destroy_absorbed() {
        let mut world = MirrorWorld::new();
        let handle = NetHandle::compose(1, 2);
        spawn(&mut world, handle, PlayerId::new([1; 16]));

        world.on_destroy(handle);
        world.on_destroy(handle); // duplicate: no-op
        world.on_destroy(NetHandle::compose(9, 9)); // never held: no-op

        assert!(world.is_empty());
    }

    #[test]
    fn test_hide_disables_presentation_only() {
        let mut world = MirrorWorld::new();
        let handle = NetHandle::compose(1, 3);
        spawn(&mut world, handle, PlayerId::new([1; 16]));

        world.hide(handle);

        let entity = world.get(handle).unwrap();
        assert!(entity.hidden);
        assert_eq!(world.len(), 1); // still held until the owner's destroy
    }

    #[test]
    fn test_player_rpcs_do_not_touch_mirrors() {
        let mut world = MirrorWorld::new();
        world.apply_rpc(&RpcCall::ApplySpeedBuff {
            player: PlayerId::new([1; 16]),
            delta: 1.5,
            duration_secs: 5.0,
        });
        assert!(world.is_empty());
    }
}
