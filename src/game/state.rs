//! Player State and Session Identity
//!
//! Authoritative player fields, element identity and the ownership flag that
//! gates every mutation. Uses BTreeMap-friendly ordered IDs.

use serde::{Deserialize, Serialize};

use crate::core::vec2::Vec2;

/// Seconds between primary shots. The continuous-damage rate limiter reuses
/// this same interval (see `game::damage`).
pub const FIRE_COOLDOWN_SECS: f32 = 1.0;

// =============================================================================
// PLAYER ID
// =============================================================================

/// Unique player identifier (UUID as bytes).
///
/// Implements Ord for deterministic BTreeMap ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub struct PlayerId(pub [u8; 16]);

impl PlayerId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Create a fresh random identifier.
    pub fn random() -> Self {
        Self(*uuid::Uuid::new_v4().as_bytes())
    }

    /// Create from UUID string.
    pub fn from_uuid_str(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s).ok().map(|u| Self(*u.as_bytes()))
    }

    /// Convert to UUID string.
    pub fn to_uuid_string(&self) -> String {
        uuid::Uuid::from_bytes(self.0).to_string()
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Short hex form for logs.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

// =============================================================================
// ELEMENT
// =============================================================================

/// Player element. Determines the projectile prefab and the ultra behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
#[derive(Default)]
pub enum Element {
    /// Fireball primary, radial-burst ultra
    #[default]
    Fire = 0,
    /// Electric arc primary, area-field ultra
    Electric = 1,
    /// Sword primary, ultra pending
    Rancher = 2,
    /// Ice crystal primary, ultra pending
    Ice = 3,
    /// Stone charge primary, ultra pending
    Stone = 4,
}

impl Element {
    /// All elements, in dispatch-table order.
    pub const ALL: [Element; 5] = [
        Element::Fire,
        Element::Electric,
        Element::Rancher,
        Element::Ice,
        Element::Stone,
    ];

    /// Parse an element selection string. Unrecognized names fall back to
    /// Fire, the default ability.
    pub fn parse(name: &str) -> Element {
        match name {
            "FireElement" => Element::Fire,
            "ElectricElement" => Element::Electric,
            "RancherElement" => Element::Rancher,
            "IceElement" => Element::Ice,
            "StoneElement" => Element::Stone,
            _ => Element::Fire,
        }
    }

    /// Selection string for this element.
    pub fn as_str(self) -> &'static str {
        match self {
            Element::Fire => "FireElement",
            Element::Electric => "ElectricElement",
            Element::Rancher => "RancherElement",
            Element::Ice => "IceElement",
            Element::Stone => "StoneElement",
        }
    }
}

// =============================================================================
// OWNERSHIP
// =============================================================================

/// Which peer may mutate an entity's canonical state.
///
/// Every component consults this before writing. The default is `Remote`:
/// absence of ownership information is treated as "not owner".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Default)]
pub enum Authority {
    /// This peer created the entity and owns its state.
    Local,
    /// Another peer owns the entity; local copy is a read-only mirror.
    #[default]
    Remote,
}

impl Authority {
    /// True when the local peer owns the entity.
    #[inline]
    pub fn is_owner(self) -> bool {
        matches!(self, Authority::Local)
    }
}

// =============================================================================
// SESSION CONTEXT
// =============================================================================

/// Identity of the local participant, fixed at session join.
///
/// Carried explicitly into the input translator and ability dispatcher so no
/// component reaches for process-wide "local player" state.
#[derive(Clone, Debug)]
pub struct SessionContext {
    /// The local player's entity ID.
    pub local_player: PlayerId,
    /// Display name, unique within the session.
    pub display_name: String,
    /// Chosen element.
    pub element: Element,
    /// Collider tag stamped on every projectile this player fires.
    /// Damage resolution skips colliders carrying the victim's own tag.
    pub bullet_tag: String,
}

impl SessionContext {
    /// Create the context for a joining player.
    pub fn new(local_player: PlayerId, display_name: &str, element: Element) -> Self {
        Self {
            local_player,
            display_name: display_name.to_string(),
            element,
            bullet_tag: format!("{}_Bullet", display_name),
        }
    }
}

// =============================================================================
// PLAYER STATE
// =============================================================================

/// State of one player entity.
///
/// Health and the damage counters are private: health is clamped to [0, 1] on
/// every write and the counters only ever increase. On non-owning peers the
/// replicated fields change only through snapshot application.
#[derive(Clone, Debug)]
pub struct PlayerState {
    /// Unique player ID
    pub id: PlayerId,

    /// Who may mutate this state
    pub authority: Authority,

    /// Element identity
    pub element: Element,

    /// Current position (updated by the movement collaborator)
    pub position: Vec2,

    /// Firing intent, replicated
    pub firing: bool,

    /// Ultra intent, replicated
    pub using_ultra: bool,

    /// Earliest time the next primary shot is permitted
    pub next_shot_time: f32,

    /// Shared rate limiter for all continuous (stay) damage
    pub next_continuous_damage_time: f32,

    /// Movement speed bonus from a speed pickup
    pub speed_bonus: f32,

    /// Time the speed bonus lapses
    pub speed_buff_until: f32,

    /// Current health, clamped to [0, 1]
    health: f32,

    /// Total damage dealt to others, non-decreasing
    damage_dealt: f32,

    /// Total damage taken, non-decreasing
    damage_taken: f32,
}

impl PlayerState {
    /// Create a player at full health.
    pub fn new(id: PlayerId, element: Element, authority: Authority, position: Vec2) -> Self {
        Self {
            id,
            authority,
            element,
            position,
            firing: false,
            using_ultra: false,
            next_shot_time: 0.0,
            next_continuous_damage_time: 0.0,
            speed_bonus: 0.0,
            speed_buff_until: 0.0,
            health: 1.0,
            damage_dealt: 0.0,
            damage_taken: 0.0,
        }
    }

    /// Current health in [0, 1].
    #[inline]
    pub fn health(&self) -> f32 {
        self.health
    }

    /// True once health reaches zero; the surrounding game-flow collaborator
    /// removes the player from the session.
    #[inline]
    pub fn depleted(&self) -> bool {
        self.health <= 0.0
    }

    /// Apply a health delta, clamping to [0, 1]. Overflow and underflow are
    /// absorbed silently.
    pub fn apply_health_delta(&mut self, delta: f32) {
        self.health = (self.health + delta).clamp(0.0, 1.0);
    }

    /// Overwrite health from an inbound snapshot. Clamped like every other
    /// health write.
    pub(crate) fn set_health_mirror(&mut self, health: f32) {
        self.health = health.clamp(0.0, 1.0);
    }

    /// Total damage dealt to other players.
    #[inline]
    pub fn damage_dealt(&self) -> f32 {
        self.damage_dealt
    }

    /// Total damage taken from other players.
    #[inline]
    pub fn damage_taken(&self) -> f32 {
        self.damage_taken
    }

    /// Credit damage dealt. Negative amounts are ignored to keep the counter
    /// monotonic.
    pub fn add_damage_dealt(&mut self, amount: f32) {
        if amount > 0.0 {
            self.damage_dealt += amount;
        }
    }

    /// Record damage taken. Negative amounts are ignored to keep the counter
    /// monotonic.
    pub fn add_damage_taken(&mut self, amount: f32) {
        if amount > 0.0 {
            self.damage_taken += amount;
        }
    }

    /// Apply a speed buff delivered over the network.
    pub fn apply_speed_buff(&mut self, delta: f32, duration_secs: f32, now: f32) {
        self.speed_bonus = delta;
        self.speed_buff_until = now + duration_secs;
    }

    /// Movement speed multiplier at the given time.
    pub fn speed_multiplier(&self, now: f32) -> f32 {
        if now < self.speed_buff_until {
            1.0 + self.speed_bonus
        } else {
            1.0
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
