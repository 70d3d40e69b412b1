//! Element Abilities
//!
//! Per-element primary shot and ultra, behind a common capability interface.
//! Adding an element is one enum variant plus one dispatch-table entry.

use std::collections::BTreeMap;

use crate::core::vec2::Vec2;
use crate::game::state::{Element, SessionContext};
use crate::network::runtime::{NetHandle, NetworkRuntime, PrefabId, RpcCall, RpcTarget};

/// Impulse magnitude applied to spawned projectiles.
pub const BULLET_SPEED: f32 = 150.0;

/// Distance in front of the owner a primary shot spawns at.
pub const SPAWN_OFFSET: f32 = 2.0 / 3.0;

/// Projectiles in the radial-burst ultra.
pub const ULTRA_BURST_COUNT: u32 = 12;

/// Angular step between radial-burst projectiles, degrees.
pub const ULTRA_BURST_STEP_DEG: f32 = 30.0;

/// A projectile or area effect spawned through the network runtime.
///
/// The impulse is handed to the physics collaborator; area effects carry a
/// zero impulse. `collider_tag` carries the owner's bullet tag so damage
/// resolution can exclude self-hits.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectileSpawn {
    /// Network handle of the spawned entity.
    pub handle: NetHandle,
    /// What was spawned.
    pub prefab: PrefabId,
    /// Spawn position.
    pub position: Vec2,
    /// Body rotation in degrees.
    pub rotation_deg: f32,
    /// Impulse for the physics collaborator to apply.
    pub impulse: Vec2,
    /// Owner tag stamped on the collider.
    pub collider_tag: String,
}

// =============================================================================
// ABILITY INTERFACE
// =============================================================================

/// One element's fire and ultra behavior.
pub trait ElementAbility {
    /// Projectile prefab for the primary shot.
    fn projectile(&self) -> PrefabId;

    /// Primary shot: one projectile along the aim vector.
    ///
    /// A zero-magnitude aim vector is a recoverable no-op; no spawn happens
    /// this tick.
    fn fire(
        &self,
        ctx: &SessionContext,
        origin: Vec2,
        aim: Vec2,
        net: &mut dyn NetworkRuntime,
    ) -> Vec<ProjectileSpawn> {
        primary_shot(self.projectile(), ctx, origin, aim, net)
    }

    /// Ultra ability. Elements without one yet no-op rather than fail.
    fn ultra(
        &self,
        ctx: &SessionContext,
        origin: Vec2,
        aim: Vec2,
        net: &mut dyn NetworkRuntime,
    ) -> Vec<ProjectileSpawn>;
}

/// Shared primary-shot behavior: aim-aligned spawn offset and impulse.
fn primary_shot(
    prefab: PrefabId,
    ctx: &SessionContext,
    origin: Vec2,
    aim: Vec2,
    net: &mut dyn NetworkRuntime,
) -> Vec<ProjectileSpawn> {
    if aim.length_squared() == 0.0 {
        // Nothing to aim along; skip the shot rather than divide by zero.
        return Vec::new();
    }

    let rotation_deg = aim.angle_deg() - 90.0;
    let direction = aim.normalize();
    let position = origin + direction.scale(SPAWN_OFFSET);

    let handle = net.instantiate(prefab, position, rotation_deg, 0);

    vec![ProjectileSpawn {
        handle,
        prefab,
        position,
        rotation_deg,
        impulse: direction.scale(BULLET_SPEED),
        collider_tag: ctx.bullet_tag.clone(),
    }]
}

// =============================================================================
// ELEMENT IMPLEMENTATIONS
// =============================================================================

/// Fire: radial burst ultra.
struct FireAbility;

impl ElementAbility for FireAbility {
    fn projectile(&self) -> PrefabId {
        PrefabId::FireBall
    }

    fn ultra(
        &self,
        ctx: &SessionContext,
        origin: Vec2,
        _aim: Vec2,
        net: &mut dyn NetworkRuntime,
    ) -> Vec<ProjectileSpawn> {
        let mut spawns = Vec::with_capacity(ULTRA_BURST_COUNT as usize);
        for step in 0..ULTRA_BURST_COUNT {
            let rotation_deg = step as f32 * ULTRA_BURST_STEP_DEG;
            let direction = Vec2::from_heading_deg(rotation_deg);
            let handle = net.instantiate(self.projectile(), origin, rotation_deg, 0);
            spawns.push(ProjectileSpawn {
                handle,
                prefab: self.projectile(),
                position: origin,
                rotation_deg,
                impulse: direction.scale(BULLET_SPEED),
                collider_tag: ctx.bullet_tag.clone(),
            });
        }
        spawns
    }
}

/// Electric: area-field ultra, re-parented to the owner via a buffered RPC.
///
/// Creation and parenting are two separate network operations on purpose:
/// every peer learns of the field before its spatial relationship is fixed.
struct ElectricAbility;

impl ElementAbility for ElectricAbility {
    fn projectile(&self) -> PrefabId {
        PrefabId::ElectricArc
    }

    fn ultra(
        &self,
        ctx: &SessionContext,
        origin: Vec2,
        _aim: Vec2,
        net: &mut dyn NetworkRuntime,
    ) -> Vec<ProjectileSpawn> {
        let handle = net.instantiate(PrefabId::ElectricField, origin, 0.0, 0);
        net.invoke(
            RpcTarget::AllBuffered,
            RpcCall::SetFieldParent {
                field: handle,
                owner: ctx.local_player,
            },
        );
        vec![ProjectileSpawn {
            handle,
            prefab: PrefabId::ElectricField,
            position: origin,
            rotation_deg: 0.0,
            impulse: Vec2::ZERO,
            collider_tag: ctx.bullet_tag.clone(),
        }]
    }
}

/// Elements whose ultra is still pending: primary shot only.
struct BasicAbility {
    projectile: PrefabId,
}

impl ElementAbility for BasicAbility {
    fn projectile(&self) -> PrefabId {
        self.projectile
    }

    fn ultra(
        &self,
        _ctx: &SessionContext,
        _origin: Vec2,
        _aim: Vec2,
        _net: &mut dyn NetworkRuntime,
    ) -> Vec<ProjectileSpawn> {
        Vec::new()
    }
}

// =============================================================================
// DISPATCHER
// =============================================================================

/// Dispatch table from element to ability behavior.
pub struct AbilityDispatcher {
    table: BTreeMap<Element, Box<dyn ElementAbility>>,
}

impl AbilityDispatcher {
    /// Build the table with every element's behavior.
    pub fn new() -> Self {
        let mut table: BTreeMap<Element, Box<dyn ElementAbility>> = BTreeMap::new();
        table.insert(Element::Fire, Box::new(FireAbility));
        table.insert(Element::Electric, Box::new(ElectricAbility));
        table.insert(
            Element::Rancher,
            Box::new(BasicAbility {
                projectile: PrefabId::RancherSword,
            }),
        );
        table.insert(
            Element::Ice,
            Box::new(BasicAbility {
                projectile: PrefabId::IceCrystal,
            }),
        );
        table.insert(
            Element::Stone,
            Box::new(BasicAbility {
                projectile: PrefabId::StoneCharge,
            }),
        );
        Self { table }
    }

    /// Behavior for an element. A missing entry falls back to Fire.
    pub fn ability(&self, element: Element) -> &dyn ElementAbility {
        self.table
            .get(&element)
            .or_else(|| self.table.get(&Element::Fire))
            .expect("dispatch table always contains the Fire fallback")
            .as_ref()
    }

    /// Dispatch the primary shot.
    pub fn fire(
        &self,
        element: Element,
        ctx: &SessionContext,
        origin: Vec2,
        aim: Vec2,
        net: &mut dyn NetworkRuntime,
    ) -> Vec<ProjectileSpawn> {
        self.ability(element).fire(ctx, origin, aim, net)
    }

    /// Dispatch the ultra.
    pub fn ultra(
        &self,
        element: Element,
        ctx: &SessionContext,
        origin: Vec2,
        aim: Vec2,
        net: &mut dyn NetworkRuntime,
    ) -> Vec<ProjectileSpawn> {
        self.ability(element).ultra(ctx, origin, aim, net)
    }
}

impl Default for AbilityDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================
