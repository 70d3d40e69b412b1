//! Owner-Side Tick Orchestration
//!
//! One `PlayerDriver` per locally owned player. Each tick it translates the
//! input sample, dispatches cooldown-cleared fire/ultra intents, and paces the
//! outbound snapshot. Overlap callbacks and inbound RPCs are routed through it
//! as they arrive. Everything is polled; nothing blocks.

use tracing::info;

use crate::core::clock::Clock;
use crate::core::vec2::Vec2;
use crate::game::ability::{AbilityDispatcher, ProjectileSpawn};
use crate::game::damage::{resolve_overlap, OverlapEvent};
use crate::game::events::{CombatEvent, CombatObserver, ObserverRegistry};
use crate::game::input::{arm_fire_cooldown, fire_ready, translate_sample, InputSample};
use crate::game::state::{Authority, PlayerState, SessionContext};
use crate::network::replication::{PlayerSnapshot, ReplicationChannel};
use crate::network::runtime::{DestroyLedger, NetworkRuntime, RpcCall};

/// What one tick produced.
#[derive(Debug, Default)]
pub struct TickOutcome {
    /// Events raised this tick (already delivered to observers).
    pub events: Vec<CombatEvent>,
    /// Projectiles/effects spawned this tick, for the physics collaborator.
    pub spawned: Vec<ProjectileSpawn>,
    /// Outbound snapshot, when the replication tick came due.
    pub snapshot: Option<PlayerSnapshot>,
    /// Health reached zero; the game-flow collaborator should remove this
    /// player from the session.
    pub left_session: bool,
}

/// Drives one locally owned player through the per-tick pipeline.
pub struct PlayerDriver {
    /// The owned player state.
    pub state: PlayerState,
    ctx: SessionContext,
    dispatcher: AbilityDispatcher,
    observers: ObserverRegistry,
    replication: ReplicationChannel,
    destroys: DestroyLedger,
}

impl PlayerDriver {
    /// Create the driver for the local player.
    pub fn new(ctx: SessionContext, position: Vec2) -> Self {
        let state = PlayerState::new(ctx.local_player, ctx.element, Authority::Local, position);
        Self {
            state,
            ctx,
            dispatcher: AbilityDispatcher::new(),
            observers: ObserverRegistry::new(),
            replication: ReplicationChannel::default(),
            destroys: DestroyLedger::new(),
        }
    }

    /// The session identity this driver was built with.
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Register a combat observer (UI, score, audio).
    pub fn attach_observer(&mut self, name: &str, observer: Box<dyn CombatObserver>) {
        self.observers.attach(name, observer);
    }

    /// Register an optional observer; a missing one is skipped with a warning.
    pub fn attach_optional_observer(
        &mut self,
        name: &str,
        observer: Option<Box<dyn CombatObserver>>,
    ) {
        self.observers.attach_optional(name, observer);
    }

    /// Run one owner-side tick.
    pub fn tick(
        &mut self,
        sample: &InputSample,
        clock: &dyn Clock,
        net: &mut dyn NetworkRuntime,
    ) -> TickOutcome {
        let mut out = TickOutcome::default();

        // Conservative: a driver that somehow lost authority mutates nothing.
        if !self.state.authority.is_owner() {
            return out;
        }

        let now = clock.now();

        if self.state.depleted() {
            info!(player = %self.state.id.short(), "health depleted, leaving session");
            out.left_session = true;
            out.events.push(CombatEvent::PlayerDepleted {
                player: self.state.id,
            });
            self.observers.dispatch(&out.events);
            return out;
        }

        translate_sample(&mut self.state, sample);

        if self.state.firing && fire_ready(&self.state, now) {
            let spawns = self.dispatcher.fire(
                self.state.element,
                &self.ctx,
                self.state.position,
                sample.aim,
                net,
            );
            arm_fire_cooldown(&mut self.state, now);
            if !spawns.is_empty() {
                out.events.push(CombatEvent::ShotFired {
                    player: self.state.id,
                    projectiles: spawns.len() as u32,
                });
            }
            out.spawned.extend(spawns);
        }

        // Ultra re-fires every tick the release latch holds; it has no
        // cooldown of its own.
        if self.state.using_ultra {
            let spawns = self.dispatcher.ultra(
                self.state.element,
                &self.ctx,
                self.state.position,
                sample.aim,
                net,
            );
            out.events.push(CombatEvent::UltraUsed {
                player: self.state.id,
                element: self.state.element,
            });
            out.spawned.extend(spawns);
        }

        out.snapshot = self.replication.poll(&self.state);

        self.observers.dispatch(&out.events);
        out
    }

    /// Route an overlap callback from the physics collaborator.
    pub fn on_overlap(
        &mut self,
        event: &OverlapEvent,
        clock: &dyn Clock,
        net: &mut dyn NetworkRuntime,
    ) -> Vec<CombatEvent> {
        let mut events = Vec::new();
        resolve_overlap(
            &mut self.state,
            &self.ctx,
            event,
            clock.now(),
            net,
            &mut self.destroys,
            &mut events,
        );
        self.observers.dispatch(&events);
        events
    }

    /// Route an inbound remote procedure call addressed at players.
    pub fn on_rpc(&mut self, call: &RpcCall, now: f32) {
        match call {
            RpcCall::ApplySpeedBuff {
                player,
                delta,
                duration_secs,
            } => {
                if *player == self.state.id {
                    self.state.apply_speed_buff(*delta, *duration_secs, now);
                }
            }
            RpcCall::CreditDamage {
                shooter_tag,
                amount,
            } => {
                if *shooter_tag == self.ctx.bullet_tag {
                    self.state.add_damage_dealt(*amount);
                }
            }
            // Entity parenting is the mirror world's concern.
            RpcCall::SetFieldParent { .. } => {}
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
