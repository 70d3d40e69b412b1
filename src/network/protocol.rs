//! Relay Protocol Messages
//!
//! Wire format between peers and the relay over WebSocket. Messages are
//! serialized as JSON for debugging ease; the snapshot payload itself keeps
//! its fixed binary field order (see `network::replication`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::vec2::Vec2;
use crate::game::state::{Element, PlayerId};
use crate::network::replication::PlayerSnapshot;
use crate::network::runtime::{NetHandle, PrefabId, RpcCall, RpcTarget};

// =============================================================================
// PEER -> RELAY MESSAGES
// =============================================================================

/// Messages sent from a peer to the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeerMessage {
    /// Join the session.
    Join(JoinRequest),

    /// Periodic snapshot of the peer's owned player.
    Snapshot {
        /// Sender's simulation tick.
        tick: u32,
        /// The replicated triple.
        snapshot: PlayerSnapshot,
    },

    /// A networked entity was created by this peer.
    Spawn {
        /// Peer-allocated handle.
        handle: NetHandle,
        /// What was spawned.
        prefab: PrefabId,
        /// Spawn position.
        position: Vec2,
        /// Spawn rotation.
        rotation_deg: f32,
        /// Interest group.
        group: u8,
    },

    /// Remove an entity network-wide.
    Destroy {
        /// Entity to remove.
        handle: NetHandle,
    },

    /// Invoke a remote procedure on every peer.
    Rpc {
        /// Delivery target.
        target: RpcTarget,
        /// The call.
        call: RpcCall,
    },

    /// Leaving the session.
    Leave,
}

/// Session join request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Joining player's identifier.
    pub player_id: PlayerId,
    /// Display name, unique within the session.
    pub display_name: String,
    /// Chosen element.
    pub element: Element,
}

// =============================================================================
// RELAY -> PEER MESSAGES
// =============================================================================

/// Messages sent from the relay to a peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayMessage {
    /// Join accepted.
    Welcome {
        /// Index used for collision-free handle allocation.
        peer_index: u32,
        /// Relay wall-clock time at join.
        server_time: DateTime<Utc>,
        /// Relay version.
        version: String,
    },

    /// Another peer joined the session.
    PeerJoined {
        /// Their identifier.
        player_id: PlayerId,
        /// Their display name.
        display_name: String,
        /// Their element.
        element: Element,
    },

    /// A peer left the session.
    PeerLeft {
        /// Their identifier.
        player_id: PlayerId,
    },

    /// Snapshot from another peer's owned player.
    Snapshot {
        /// Owner of the replicated state.
        player_id: PlayerId,
        /// Owner's simulation tick.
        tick: u32,
        /// The replicated triple.
        snapshot: PlayerSnapshot,
    },

    /// An entity was created.
    Spawned {
        /// Entity handle.
        handle: NetHandle,
        /// What was spawned.
        prefab: PrefabId,
        /// Creating peer.
        owner: PlayerId,
        /// Spawn position.
        position: Vec2,
        /// Spawn rotation.
        rotation_deg: f32,
    },

    /// An entity was removed network-wide.
    Destroyed {
        /// Removed entity handle.
        handle: NetHandle,
    },

    /// A remote procedure call.
    Rpc {
        /// Invoking peer.
        caller: PlayerId,
        /// The call.
        call: RpcCall,
    },

    /// Protocol error.
    Error {
        /// Human-readable message.
        message: String,
    },
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl PeerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl RelayMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
