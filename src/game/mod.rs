//! Combat Core
//!
//! Owner-side simulation of the entities this peer controls.
//!
//! ## Module Structure
//!
//! - `state`: player state, element identity, ownership, session context
//! - `input`: input sampling and fire/ultra intent translation
//! - `ability`: per-element fire and ultra dispatch
//! - `damage`: overlap events to health deltas and destroy requests
//! - `pickup`: health packs and speed boosts
//! - `lifetime`: time-to-live expiry without duplicate destroys
//! - `events`: typed combat events and observer registration
//! - `tick`: the per-tick owner pipeline

pub mod ability;
pub mod damage;
pub mod events;
pub mod input;
pub mod lifetime;
pub mod pickup;
pub mod state;
pub mod tick;

// Re-export key types
pub use ability::{AbilityDispatcher, ElementAbility, ProjectileSpawn};
pub use damage::{OverlapEvent, OverlapKind, SurfaceTag};
pub use events::{CombatEvent, CombatObserver, ObserverRegistry};
pub use input::InputSample;
pub use state::{Authority, Element, PlayerId, PlayerState, SessionContext};
pub use tick::{PlayerDriver, TickOutcome};
