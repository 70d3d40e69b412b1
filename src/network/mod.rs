//! Networking
//!
//! The remote-object runtime interface the combat core drives, plus the
//! replication channel, per-peer entity mirrors, and two realizations of the
//! delivery contract: an in-process loopback hub and a WebSocket relay.
//!
//! - `runtime`: instantiate/destroy/invoke interface and handle types
//! - `replication`: ordered snapshots and outbound cadence
//! - `mirror`: read-only views of remotely owned entities
//! - `loopback`: in-process multi-peer hub for tests and demos
//! - `protocol`: relay wire messages
//! - `relay`: the WebSocket relay server

pub mod loopback;
pub mod mirror;
pub mod protocol;
pub mod relay;
pub mod replication;
pub mod runtime;

// Re-export key types
pub use loopback::{LoopbackHub, LoopbackPeer, NetNotice};
pub use mirror::{MirrorEntity, MirrorWorld};
pub use replication::{PickupSnapshot, PlayerSnapshot, ReplicationChannel};
pub use runtime::{DestroyLedger, NetHandle, NetworkRuntime, PrefabId, RpcCall, RpcTarget};
