//! Combat Events and Observers
//!
//! Typed notifications from the combat core to its UI/score/audio observers.
//! Observers register explicitly; a missing optional observer is a logged
//! warning, never an error.

use std::collections::BTreeMap;

use tracing::warn;

use crate::game::state::{Element, PlayerId};
use crate::network::runtime::NetHandle;

/// A gameplay event raised by the combat core.
#[derive(Clone, Debug, PartialEq)]
pub enum CombatEvent {
    /// A foreign bullet hit the player.
    BulletHit {
        /// Player that was hit.
        player: PlayerId,
        /// Damage applied.
        amount: f32,
    },

    /// The player ran into an obstacle.
    ObstacleHit {
        /// Player that collided.
        player: PlayerId,
        /// Damage applied.
        amount: f32,
    },

    /// A foreign electric field damaged the player.
    FieldDamage {
        /// Player that was damaged.
        player: PlayerId,
        /// Damage applied.
        amount: f32,
        /// True for rate-limited stay damage, false for the entry tick.
        continuous: bool,
    },

    /// The player consumed a health pack.
    HealthPackConsumed {
        /// Player that healed.
        player: PlayerId,
        /// Health restored before clamping.
        restored: f32,
    },

    /// A speed pickup was consumed.
    SpeedBoostConsumed {
        /// Player that received the boost.
        player: PlayerId,
        /// The consumed pickup entity.
        pickup: NetHandle,
    },

    /// The player fired their primary shot.
    ShotFired {
        /// Firing player.
        player: PlayerId,
        /// Projectiles spawned by the shot.
        projectiles: u32,
    },

    /// The player triggered their ultra.
    UltraUsed {
        /// Triggering player.
        player: PlayerId,
        /// Their element.
        element: Element,
    },

    /// Health reached zero; the game-flow collaborator removes the player
    /// from the session.
    PlayerDepleted {
        /// Depleted player.
        player: PlayerId,
    },
}

/// Receives combat events, e.g. the health bar, score panel or audio player.
pub trait CombatObserver {
    /// Called once per event, in emission order.
    fn on_combat_event(&mut self, event: &CombatEvent);
}

/// Explicit observer registration for a player's combat events.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Vec<(String, Box<dyn CombatObserver>)>,
}

impl ObserverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer under a name (for logs).
    pub fn attach(&mut self, name: &str, observer: Box<dyn CombatObserver>) {
        self.observers.push((name.to_string(), observer));
    }

    /// Register an optional observer. A missing one degrades gracefully: the
    /// feature is skipped with a warning.
    pub fn attach_optional(&mut self, name: &str, observer: Option<Box<dyn CombatObserver>>) {
        match observer {
            Some(observer) => self.attach(name, observer),
            None => warn!("missing {name} observer; feature skipped"),
        }
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether no observers are registered.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Deliver events to every observer in registration order.
    pub fn dispatch(&mut self, events: &[CombatEvent]) {
        for event in events {
            for (_, observer) in self.observers.iter_mut() {
                observer.on_combat_event(event);
            }
        }
    }
}

/// Score tally observer: accumulates damage totals per player for the score
/// panel.
#[derive(Debug, Default)]
pub struct ScoreTally {
    damage_by_player: BTreeMap<PlayerId, f32>,
}

impl ScoreTally {
    /// Create an empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulated damage for a player.
    pub fn damage(&self, player: &PlayerId) -> f32 {
        self.damage_by_player.get(player).copied().unwrap_or(0.0)
    }
}

impl CombatObserver for ScoreTally {
    fn on_combat_event(&mut self, event: &CombatEvent) {
        let (player, amount) = match event {
            CombatEvent::BulletHit { player, amount } => (*player, *amount),
            CombatEvent::ObstacleHit { player, amount } => (*player, *amount),
            CombatEvent::FieldDamage { player, amount, .. } => (*player, *amount),
            _ => return,
        };
        *self.damage_by_player.entry(player).or_insert(0.0) += amount;
    }
}
