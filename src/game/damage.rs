//! Collision Damage Resolution
//!
//! Turns overlap events from the physics collaborator into health deltas,
//! damage accounting and idempotent destroy requests. Only the owning peer of
//! the overlapping player processes damage; every other peer ignores the
//! callback and waits for the next snapshot.

use crate::game::events::CombatEvent;
use crate::game::state::{Element, PlayerState, SessionContext, FIRE_COOLDOWN_SECS};
use crate::network::runtime::{DestroyLedger, NetHandle, NetworkRuntime, RpcCall, RpcTarget};

/// Damage from a foreign bullet.
pub const BULLET_DAMAGE: f32 = 0.1;

/// Damage from running into an obstacle.
pub const OBSTACLE_DAMAGE: f32 = 0.05;

/// Damage on entering a foreign electric field.
pub const FIELD_ENTER_DAMAGE: f32 = 0.05;

/// Damage per rate-limited tick inside a foreign electric field.
pub const FIELD_STAY_DAMAGE: f32 = 0.01;

/// Health restored by a health pack (clamped at full health).
pub const HEALTH_PACK_RESTORE: f32 = 0.5;

// =============================================================================
// OVERLAP EVENTS
// =============================================================================

/// Overlap phase reported by the physics collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlapKind {
    /// First tick of contact.
    Enter,
    /// Continued contact, reported every tick.
    Stay,
}

/// Gameplay tag on the other collider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceTag {
    /// A projectile.
    Bullet,
    /// Static level geometry.
    Obstacle,
    /// Health restore pickup.
    HealthPack,
    /// Electric ultra area effect.
    ElectricField,
    /// A player entity (used by pickup-side resolution).
    Element,
}

impl SurfaceTag {
    /// Parse the collaborator's tag string. Unknown tags yield None and the
    /// event is ignored.
    pub fn parse(tag: &str) -> Option<SurfaceTag> {
        match tag {
            "Bullet" => Some(SurfaceTag::Bullet),
            "Obstacle" => Some(SurfaceTag::Obstacle),
            "HealthPack" => Some(SurfaceTag::HealthPack),
            "ElectricField" => Some(SurfaceTag::ElectricField),
            "Element" => Some(SurfaceTag::Element),
            _ => None,
        }
    }
}

/// One overlap callback from the physics collaborator.
#[derive(Clone, Debug)]
pub struct OverlapEvent {
    /// Enter or stay.
    pub kind: OverlapKind,
    /// Tag on the other collider.
    pub tag: SurfaceTag,
    /// Name of the other collider; bullet and field colliders carry their
    /// owner's bullet tag here.
    pub collider_name: String,
    /// Network handle of the other entity, when it is networked.
    pub handle: Option<NetHandle>,
}

impl OverlapEvent {
    /// Convenience constructor for an enter event.
    pub fn enter(tag: SurfaceTag, collider_name: &str, handle: Option<NetHandle>) -> Self {
        Self {
            kind: OverlapKind::Enter,
            tag,
            collider_name: collider_name.to_string(),
            handle,
        }
    }

    /// Convenience constructor for a stay event.
    pub fn stay(tag: SurfaceTag, collider_name: &str, handle: Option<NetHandle>) -> Self {
        Self {
            kind: OverlapKind::Stay,
            tag,
            collider_name: collider_name.to_string(),
            handle,
        }
    }

    fn is_foreign(&self, ctx: &SessionContext) -> bool {
        !self.collider_name.contains(&ctx.bullet_tag)
    }
}

// =============================================================================
// RESOLUTION
// =============================================================================

/// Resolve one overlap event against the local player.
///
/// Non-owners return immediately: authoritative fields on mirrors change only
/// through snapshots.
pub fn resolve_overlap(
    player: &mut PlayerState,
    ctx: &SessionContext,
    event: &OverlapEvent,
    now: f32,
    net: &mut dyn NetworkRuntime,
    destroys: &mut DestroyLedger,
    events: &mut Vec<CombatEvent>,
) {
    if !player.authority.is_owner() {
        return;
    }

    match event.kind {
        OverlapKind::Enter => resolve_enter(player, ctx, event, net, destroys, events),
        OverlapKind::Stay => resolve_stay(player, ctx, event, now, events),
    }
}

fn resolve_enter(
    player: &mut PlayerState,
    ctx: &SessionContext,
    event: &OverlapEvent,
    net: &mut dyn NetworkRuntime,
    destroys: &mut DestroyLedger,
    events: &mut Vec<CombatEvent>,
) {
    match event.tag {
        SurfaceTag::Bullet => {
            if !event.is_foreign(ctx) {
                return;
            }
            if let Some(handle) = event.handle {
                destroys.destroy(net, handle);
            }
            player.apply_health_delta(-BULLET_DAMAGE);
            player.add_damage_taken(BULLET_DAMAGE);
            net.invoke(
                RpcTarget::All,
                RpcCall::CreditDamage {
                    shooter_tag: event.collider_name.clone(),
                    amount: BULLET_DAMAGE,
                },
            );
            events.push(CombatEvent::BulletHit {
                player: player.id,
                amount: BULLET_DAMAGE,
            });
        }

        SurfaceTag::Obstacle => {
            // An active electric field shields its owner from obstacles.
            if player.using_ultra && player.element == Element::Electric {
                return;
            }
            player.apply_health_delta(-OBSTACLE_DAMAGE);
            player.add_damage_taken(OBSTACLE_DAMAGE);
            events.push(CombatEvent::ObstacleHit {
                player: player.id,
                amount: OBSTACLE_DAMAGE,
            });
        }

        SurfaceTag::HealthPack => {
            // Consumption is gated on the first destroy request so a second
            // overlap before removal propagates cannot heal twice.
            let Some(handle) = event.handle else {
                return;
            };
            if !destroys.destroy(net, handle) {
                return;
            }
            player.apply_health_delta(HEALTH_PACK_RESTORE);
            events.push(CombatEvent::HealthPackConsumed {
                player: player.id,
                restored: HEALTH_PACK_RESTORE,
            });
        }

        SurfaceTag::ElectricField => {
            if !event.is_foreign(ctx) {
                return;
            }
            player.apply_health_delta(-FIELD_ENTER_DAMAGE);
            events.push(CombatEvent::FieldDamage {
                player: player.id,
                amount: FIELD_ENTER_DAMAGE,
                continuous: false,
            });
        }

        SurfaceTag::Element => {}
    }
}

fn resolve_stay(
    player: &mut PlayerState,
    ctx: &SessionContext,
    event: &OverlapEvent,
    now: f32,
    events: &mut Vec<CombatEvent>,
) {
    // One shared timestamp gates all stay damage, on the same interval as the
    // fire cooldown. Any gated stay event consumes the window, whatever its
    // tag.
    if now <= player.next_continuous_damage_time {
        return;
    }
    player.next_continuous_damage_time = now + FIRE_COOLDOWN_SECS;

    if event.tag == SurfaceTag::ElectricField && event.is_foreign(ctx) {
        player.apply_health_delta(-FIELD_STAY_DAMAGE);
        events.push(CombatEvent::FieldDamage {
            player: player.id,
            amount: FIELD_STAY_DAMAGE,
            continuous: true,
        });
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vec2::Vec2;
    use crate::game::state::{Authority, PlayerId};
    use crate::network::runtime::testing::RecordingRuntime;

    const EPS: f32 = 1e-6;

    fn owner_player() -> (PlayerState, SessionContext) {
        let id = PlayerId::new([1; 16]);
        let ctx = SessionContext::new(id, "ash", Element::Fire);
        let player = PlayerState::new(id, Element::Fire, Authority::Local, Vec2::ZERO);
        (player, ctx)
    }

    fn resolve(
        player: &mut PlayerState,
        ctx: &SessionContext,
        event: &OverlapEvent,
        now: f32,
        net: &mut RecordingRuntime,
        destroys: &mut DestroyLedger,
    ) -> Vec<CombatEvent> {
        let mut events = Vec::new();
        resolve_overlap(player, ctx, event, now, net, destroys, &mut events);
        events
    }

    #[test]
    fn test_foreign_bullet_damages_and_destroys() {
        let (mut player, ctx) = owner_player();
        let mut net = RecordingRuntime::new();
        let mut destroys = DestroyLedger::new();
        let bullet = NetHandle::compose(2, 1);

        let event = OverlapEvent::enter(SurfaceTag::Bullet, "gary_Bullet", Some(bullet));
        let events = resolve(&mut player, &ctx, &event, 0.0, &mut net, &mut destroys);

        assert!((player.health() - 0.9).abs() < EPS);
        assert!((player.damage_taken() - BULLET_DAMAGE).abs() < EPS);
        assert_eq!(net.destroyed(), vec![bullet]);
        assert_eq!(events.len(), 1);

        // Shooter credit goes out as an RPC
        let invoked = net.invoked();
        assert_eq!(invoked.len(), 1);
        assert_eq!(
            invoked[0].1,
            RpcCall::CreditDamage {
                shooter_tag: "gary_Bullet".to_string(),
                amount: BULLET_DAMAGE,
            }
        );
    }

    #[test]
    fn test_own_bullet_is_ignored() {
        let (mut player, ctx) = owner_player();
        let mut net = RecordingRuntime::new();
        let mut destroys = DestroyLedger::new();

        let event = OverlapEvent::enter(
            SurfaceTag::Bullet,
            "ash_Bullet",
            Some(NetHandle::compose(1, 1)),
        );
        let events = resolve(&mut player, &ctx, &event, 0.0, &mut net, &mut destroys);

        assert_eq!(player.health(), 1.0);
        assert!(net.ops.is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn test_non_owner_ignores_overlaps() {
        // Scenario: a non-owner receives a bullet overlap -> no mutation.
        let id = PlayerId::new([1; 16]);
        let ctx = SessionContext::new(id, "ash", Element::Fire);
        let mut mirror = PlayerState::new(id, Element::Fire, Authority::Remote, Vec2::ZERO);
        let mut net = RecordingRuntime::new();
        let mut destroys = DestroyLedger::new();

        let event = OverlapEvent::enter(
            SurfaceTag::Bullet,
            "gary_Bullet",
            Some(NetHandle::compose(2, 1)),
        );
        let events = resolve(&mut mirror, &ctx, &event, 0.0, &mut net, &mut destroys);

        assert_eq!(mirror.health(), 1.0);
        assert_eq!(mirror.damage_taken(), 0.0);
        assert!(net.ops.is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn test_bullet_hit_clamps_at_zero() {
        // Scenario: health 0.05 takes a 0.1 hit -> exactly 0, depleted.
        let (mut player, ctx) = owner_player();
        player.apply_health_delta(-0.95);
        let mut net = RecordingRuntime::new();
        let mut destroys = DestroyLedger::new();

        let event = OverlapEvent::enter(
            SurfaceTag::Bullet,
            "gary_Bullet",
            Some(NetHandle::compose(2, 1)),
        );
        resolve(&mut player, &ctx, &event, 0.0, &mut net, &mut destroys);

        assert_eq!(player.health(), 0.0);
        assert!(player.depleted());
        // The counter still records the full hit
        assert!((player.damage_taken() - BULLET_DAMAGE).abs() < EPS);
    }

    #[test]
    fn test_obstacle_damage_and_electric_ultra_shield() {
        let (mut player, ctx) = owner_player();
        let mut net = RecordingRuntime::new();
        let mut destroys = DestroyLedger::new();

        let event = OverlapEvent::enter(SurfaceTag::Obstacle, "Wall", None);
        resolve(&mut player, &ctx, &event, 0.0, &mut net, &mut destroys);
        assert!((player.health() - 0.95).abs() < EPS);

        // An electric player running their ultra shrugs obstacles off
        let id = PlayerId::new([2; 16]);
        let e_ctx = SessionContext::new(id, "zap", Element::Electric);
        let mut electric = PlayerState::new(id, Element::Electric, Authority::Local, Vec2::ZERO);
        electric.using_ultra = true;
        resolve(&mut electric, &e_ctx, &event, 0.0, &mut net, &mut destroys);
        assert_eq!(electric.health(), 1.0);
    }

    #[test]
    fn test_health_pack_consumed_exactly_once() {
        // Scenario: health 0.9, two pack overlaps in one tick -> health 1.0
        // (not 1.4 and not double-consumed), one destroy issued.
        let (mut player, ctx) = owner_player();
        player.apply_health_delta(-0.1);
        let mut net = RecordingRuntime::new();
        let mut destroys = DestroyLedger::new();
        let pack = NetHandle::compose(3, 1);

        let event = OverlapEvent::enter(SurfaceTag::HealthPack, "HealthPack", Some(pack));
        let first = resolve(&mut player, &ctx, &event, 0.0, &mut net, &mut destroys);
        let second = resolve(&mut player, &ctx, &event, 0.0, &mut net, &mut destroys);

        assert_eq!(player.health(), 1.0);
        assert_eq!(net.destroyed(), vec![pack]);
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }

    #[test]
    fn test_health_pack_heal_is_clamped() {
        let (mut player, ctx) = owner_player();
        player.apply_health_delta(-0.2); // 0.8
        let mut net = RecordingRuntime::new();
        let mut destroys = DestroyLedger::new();

        let event = OverlapEvent::enter(
            SurfaceTag::HealthPack,
            "HealthPack",
            Some(NetHandle::compose(3, 2)),
        );
        resolve(&mut player, &ctx, &event, 0.0, &mut net, &mut destroys);

        assert_eq!(player.health(), 1.0);
    }

    #[test]
    fn test_field_enter_damage_skips_damage_taken_counter() {
        let (mut player, ctx) = owner_player();
        let mut net = RecordingRuntime::new();
        let mut destroys = DestroyLedger::new();

        let event = OverlapEvent::enter(SurfaceTag::ElectricField, "zap_Bullet", None);
        resolve(&mut player, &ctx, &event, 0.0, &mut net, &mut destroys);

        assert!((player.health() - 0.95).abs() < EPS);
        assert_eq!(player.damage_taken(), 0.0);
    }

    #[test]
    fn test_stay_damage_rate_limited() {
        let (mut player, ctx) = owner_player();
        let mut net = RecordingRuntime::new();
        let mut destroys = DestroyLedger::new();
        let event = OverlapEvent::stay(SurfaceTag::ElectricField, "zap_Bullet", None);

        // First stay applies and arms the gate
        resolve(&mut player, &ctx, &event, 0.1, &mut net, &mut destroys);
        assert!((player.health() - 0.99).abs() < EPS);

        // Within the window: ignored
        resolve(&mut player, &ctx, &event, 0.5, &mut net, &mut destroys);
        resolve(&mut player, &ctx, &event, 1.0, &mut net, &mut destroys);
        assert!((player.health() - 0.99).abs() < EPS);

        // After the window: applies again
        resolve(&mut player, &ctx, &event, 1.2, &mut net, &mut destroys);
        assert!((player.health() - 0.98).abs() < EPS);
    }

    #[test]
    fn test_any_gated_stay_event_consumes_the_window() {
        // The rate limiter is shared across all stay sources: a non-damaging
        // stay event still consumes the window.
        let (mut player, ctx) = owner_player();
        let mut net = RecordingRuntime::new();
        let mut destroys = DestroyLedger::new();

        let obstacle_stay = OverlapEvent::stay(SurfaceTag::Obstacle, "Wall", None);
        resolve(&mut player, &ctx, &obstacle_stay, 0.1, &mut net, &mut destroys);
        assert_eq!(player.health(), 1.0);

        // A field stay right after is inside the consumed window
        let field_stay = OverlapEvent::stay(SurfaceTag::ElectricField, "zap_Bullet", None);
        resolve(&mut player, &ctx, &field_stay, 0.5, &mut net, &mut destroys);
        assert_eq!(player.health(), 1.0);
    }

    #[test]
    fn test_own_field_stay_is_harmless() {
        let (mut player, ctx) = owner_player();
        let mut net = RecordingRuntime::new();
        let mut destroys = DestroyLedger::new();

        let event = OverlapEvent::stay(SurfaceTag::ElectricField, "ash_Bullet", None);
        resolve(&mut player, &ctx, &event, 0.1, &mut net, &mut destroys);
        assert_eq!(player.health(), 1.0);
    }

    #[test]
    fn test_surface_tag_parse() {
        assert_eq!(SurfaceTag::parse("Bullet"), Some(SurfaceTag::Bullet));
        assert_eq!(SurfaceTag::parse("HealthPack"), Some(SurfaceTag::HealthPack));
        assert_eq!(SurfaceTag::parse("Decoration"), None);
    }
}
