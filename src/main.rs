//! Element Arena Relay / Demo
//!
//! `element-arena-relay relay [addr]` runs the WebSocket relay server.
//! Without arguments, runs a two-peer loopback session exercising the combat
//! core end to end: firing, an electric-field ultra with its buffered
//! reparent call, cross-peer damage, pickups and a late joiner.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;
use std::sync::Arc;

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use element_arena::game::damage::{OverlapEvent, SurfaceTag};
use element_arena::game::pickup::{pickup_tick, spawn_pickup, PickupKind, PickupState};
use element_arena::network::loopback::{LoopbackHub, LoopbackPeer, NetNotice};
use element_arena::network::mirror::MirrorWorld;
use element_arena::network::relay::{RelayConfig, RelayServer};
use element_arena::network::runtime::{DestroyLedger, NetHandle, PrefabId};
use element_arena::{
    Authority, Clock, Element, InputSample, PlayerDriver, PlayerId, PlayerState, SessionContext,
    TickClock, Vec2, TICK_RATE, VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    info!("Element Arena v{}", VERSION);

    match std::env::args().nth(1).as_deref() {
        Some("relay") => {
            let mut config = RelayConfig::default();
            if let Some(addr) = std::env::args().nth(2) {
                config.bind_addr = addr.parse()?;
            }
            info!("Starting relay on {}", config.bind_addr);
            Arc::new(RelayServer::new(config)).run().await?;
        }
        _ => demo_session(),
    }

    Ok(())
}

/// One peer's side of the demo session.
struct DemoPeer {
    driver: PlayerDriver,
    net: LoopbackPeer,
    mirrors: MirrorWorld,
    /// Mirror of the other player's replicated state.
    remote_player: Option<PlayerState>,
    /// Session roster: player id to display name, for collider tags.
    roster: BTreeMap<PlayerId, String>,
    destroys: DestroyLedger,
    /// Bullets observed in flight, with the tick they will "hit" on.
    inbound_bullets: VecDeque<(u64, NetHandle, String)>,
    pickups: Vec<PickupState>,
    /// Removed from the session by the game-flow layer.
    left: bool,
}

impl DemoPeer {
    fn new(hub: &Rc<RefCell<LoopbackHub>>, ctx: SessionContext) -> Self {
        let net = LoopbackPeer::join(hub, ctx.local_player);
        Self {
            driver: PlayerDriver::new(ctx, Vec2::ZERO),
            net,
            mirrors: MirrorWorld::new(),
            remote_player: None,
            roster: BTreeMap::new(),
            destroys: DestroyLedger::new(),
            inbound_bullets: VecDeque::new(),
            pickups: Vec::new(),
            left: false,
        }
    }

    fn collider_tag(&self, owner: PlayerId) -> String {
        let name = self
            .roster
            .get(&owner)
            .cloned()
            .unwrap_or_else(|| owner.short());
        format!("{name}_Bullet")
    }

    /// Apply everything the hub delivered since last tick.
    fn drain_notices(&mut self, clock: &TickClock) {
        for notice in self.net.drain() {
            match notice {
                NetNotice::Spawned {
                    handle,
                    prefab,
                    owner,
                    position,
                    rotation_deg,
                } => {
                    self.mirrors
                        .on_spawn(handle, prefab, owner, position, rotation_deg);
                    match prefab {
                        // Crude stand-in for physics: a foreign bullet "hits"
                        // half a second after it appears.
                        PrefabId::FireBall | PrefabId::ElectricArc => {
                            let tag = self.collider_tag(owner);
                            self.inbound_bullets.push_back((clock.tick() + 30, handle, tag));
                        }
                        PrefabId::HealthPack => {
                            self.pickups.push(PickupState::new(
                                handle,
                                PickupKind::HealthPack,
                                Authority::Remote,
                                clock.now(),
                            ));
                        }
                        PrefabId::SpeedBoost => {
                            self.pickups.push(PickupState::new(
                                handle,
                                PickupKind::SpeedBoost,
                                Authority::Remote,
                                clock.now(),
                            ));
                        }
                        _ => {}
                    }
                }
                NetNotice::Destroyed { handle } => {
                    self.mirrors.on_destroy(handle);
                    self.pickups.retain(|p| p.handle != handle);
                    self.inbound_bullets.retain(|(_, h, _)| *h != handle);
                }
                NetNotice::Rpc { caller: _, call } => {
                    self.mirrors.apply_rpc(&call);
                    self.driver.on_rpc(&call, clock.now());
                }
            }
        }
    }
}

/// Run a scripted two-peer session over the loopback hub.
fn demo_session() {
    info!("=== Loopback Demo Session ===");
    info!("Tick rate: {} Hz", TICK_RATE);

    let hub = LoopbackHub::shared();
    let ash_id = PlayerId::random();
    let gary_id = PlayerId::random();

    let mut ash = DemoPeer::new(&hub, SessionContext::new(ash_id, "ash", Element::Fire));
    let mut gary = DemoPeer::new(&hub, SessionContext::new(gary_id, "gary", Element::Electric));

    for peer in [&mut ash, &mut gary] {
        peer.roster.insert(ash_id, "ash".to_string());
        peer.roster.insert(gary_id, "gary".to_string());
    }
    ash.remote_player = Some(PlayerState::new(
        gary_id,
        Element::Electric,
        Authority::Remote,
        Vec2::ZERO,
    ));
    gary.remote_player = Some(PlayerState::new(
        ash_id,
        Element::Fire,
        Authority::Remote,
        Vec2::ZERO,
    ));

    let mut clock = TickClock::new(TICK_RATE);

    for _ in 0..780 {
        let tick = clock.tick();

        // Ash holds the stick right the whole match; the fire cooldown paces
        // the actual shots. Gary releases the ultra button once.
        let ash_sample = InputSample::aiming(Vec2::new(1.0, 0.0));
        let gary_sample = InputSample {
            aim: Vec2::ZERO,
            ultra_released: tick == 120,
        };

        if !ash.left {
            let out = ash.driver.tick(&ash_sample, &clock, &mut ash.net);
            for event in &out.events {
                info!(?event, tick, "combat event");
            }
            if out.left_session {
                info!("ash left the session");
                ash.left = true;
            }
            if let (Some(snapshot), Some(mirror)) = (out.snapshot, gary.remote_player.as_mut()) {
                snapshot.apply(mirror);
            }
        }
        if !gary.left {
            let out = gary.driver.tick(&gary_sample, &clock, &mut gary.net);
            for event in &out.events {
                info!(?event, tick, "combat event");
            }
            if out.left_session {
                info!("gary left the session");
                gary.left = true;
            }
            if let (Some(snapshot), Some(mirror)) = (out.snapshot, ash.remote_player.as_mut()) {
                snapshot.apply(mirror);
            }
        }

        // Owner-side pickup management on ash's peer.
        if tick == 60 {
            let pack = spawn_pickup(
                PickupKind::HealthPack,
                Vec2::new(3.0, 0.0),
                clock.now(),
                &mut ash.net,
            );
            info!(handle = %pack.handle, "spawned health pack");
            ash.pickups.push(pack);
        }
        if tick == 120 {
            let boost = spawn_pickup(
                PickupKind::SpeedBoost,
                Vec2::new(-3.0, 0.0),
                clock.now(),
                &mut ash.net,
            );
            info!(handle = %boost.handle, "spawned speed boost");
            ash.pickups.push(boost);
        }
        for pickup in ash.pickups.iter_mut() {
            pickup_tick(pickup, clock.now(), &mut ash.net, &mut ash.destroys);
        }
        for pickup in gary.pickups.iter_mut() {
            pickup_tick(pickup, clock.now(), &mut gary.net, &mut gary.destroys);
        }

        // Deliver hub traffic.
        ash.drain_notices(&clock);
        gary.drain_notices(&clock);

        // Fake physics: due bullets overlap gary's player.
        if !gary.left {
            while let Some((due, handle, tag)) = gary.inbound_bullets.front().cloned() {
                if due > tick {
                    break;
                }
                gary.inbound_bullets.pop_front();
                let event = OverlapEvent::enter(SurfaceTag::Bullet, &tag, Some(handle));
                gary.driver.on_overlap(&event, &clock, &mut gary.net);
            }
        }

        clock.advance();
    }

    info!("=== Session Results ===");
    info!(
        "ash:  health {:.2}, dealt {:.2}, taken {:.2}",
        ash.driver.state.health(),
        ash.driver.state.damage_dealt(),
        ash.driver.state.damage_taken()
    );
    info!(
        "gary: health {:.2}, dealt {:.2}, taken {:.2}, left={}",
        gary.driver.state.health(),
        gary.driver.state.damage_dealt(),
        gary.driver.state.damage_taken(),
        gary.left
    );
    if let Some(mirror) = ash.remote_player.as_ref() {
        info!(
            "ash's mirror of gary: health {:.2} (snapshots only)",
            mirror.health()
        );
    }
    info!(
        "mirrored entities: ash {}, gary {}",
        ash.mirrors.len(),
        gary.mirrors.len()
    );

    // A late joiner receives live entities plus the buffered reparent call.
    let late_id = PlayerId::random();
    let late = LoopbackPeer::join(&hub, late_id);
    let replay = late.drain();
    let buffered = replay
        .iter()
        .filter(|n| matches!(n, NetNotice::Rpc { .. }))
        .count();
    info!(
        "late joiner replay: {} notices, {} buffered calls",
        replay.len(),
        buffered
    );
}
