//! # Element Arena Combat Core
//!
//! Entity ownership, ability dispatch, damage resolution and state
//! replication for a real-time multiplayer arena shooter. Each peer simulates
//! the entities it owns and mirrors everyone else's over a generic
//! remote-object runtime.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ELEMENT ARENA CORE                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                                │
//! │  ├── vec2.rs     - 2D float vector                           │
//! │  └── clock.rs    - Injectable clock sources                  │
//! │                                                              │
//! │  game/           - Owner-side simulation                     │
//! │  ├── state.rs    - Player state, elements, ownership         │
//! │  ├── input.rs    - Fire/ultra intent translation             │
//! │  ├── ability.rs  - Per-element ability dispatch              │
//! │  ├── damage.rs   - Overlap events to health deltas           │
//! │  ├── pickup.rs   - Health packs and speed boosts             │
//! │  ├── lifetime.rs - Time-to-live expiry                       │
//! │  ├── events.rs   - Combat events and observers               │
//! │  └── tick.rs     - Per-tick owner pipeline                   │
//! │                                                              │
//! │  network/        - Replication                               │
//! │  ├── runtime.rs  - Remote-object runtime interface           │
//! │  ├── replication.rs - Ordered snapshots                      │
//! │  ├── mirror.rs   - Remote entity mirrors                     │
//! │  ├── loopback.rs - In-process multi-peer hub                 │
//! │  ├── protocol.rs - Relay wire messages                       │
//! │  └── relay.rs    - WebSocket relay server                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Authority Model
//!
//! Single writer per entity: only the owning peer mutates authoritative
//! fields (health, firing, ultra intent, damage counters). Every other peer
//! holds a read-only mirror updated solely through inbound snapshots, and
//! ignores local overlap and input processing for entities it does not own.
//! Snapshots are best-effort and most-recent-wins; buffered remote procedure
//! calls are ordered and replayed to late joiners.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use crate::core::clock::{Clock, ManualClock, TickClock};
pub use crate::core::vec2::Vec2;
pub use game::ability::{AbilityDispatcher, ProjectileSpawn};
pub use game::events::{CombatEvent, CombatObserver};
pub use game::input::InputSample;
pub use game::state::{Authority, Element, PlayerId, PlayerState, SessionContext};
pub use game::tick::{PlayerDriver, TickOutcome};
pub use network::replication::PlayerSnapshot;
pub use network::runtime::{NetHandle, NetworkRuntime, PrefabId, RpcCall, RpcTarget};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;
