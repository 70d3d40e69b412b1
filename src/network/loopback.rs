//! Loopback Hub
//!
//! An in-process realization of the remote-object runtime for N peers: entity
//! registry, spawn/destroy fan-out, duplicate-destroy absorption and a
//! buffered-RPC journal replayed in call order to late joiners. Backs the
//! cross-peer tests and the demo binary; the relay server provides the same
//! contract over WebSockets.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use tracing::debug;

use crate::core::vec2::Vec2;
use crate::game::state::PlayerId;
use crate::network::runtime::{NetHandle, NetworkRuntime, PrefabId, RpcCall, RpcTarget};

/// A delivery from the hub to one peer.
#[derive(Clone, Debug, PartialEq)]
pub enum NetNotice {
    /// An entity was created by another peer.
    Spawned {
        /// New entity handle.
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
    /// A remote procedure call on every peer.
    Rpc {
        /// Invoking peer.
        caller: PlayerId,
        /// The call.
        call: RpcCall,
    },
}

#[derive(Debug)]
struct EntityRecord {
    prefab: PrefabId,
    owner: PlayerId,
    position: Vec2,
    rotation_deg: f32,
}

/// The shared in-process session state.
#[derive(Debug, Default)]
pub struct LoopbackHub {
    mailboxes: BTreeMap<PlayerId, VecDeque<NetNotice>>,
    entities: BTreeMap<NetHandle, EntityRecord>,
    buffered: Vec<(PlayerId, RpcCall)>,
    peer_indices: BTreeMap<PlayerId, u32>,
    counters: BTreeMap<PlayerId, u32>,
}

impl LoopbackHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared hub for handing to peers.
    pub fn shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Register a peer. Existing entities and the buffered-RPC history are
    /// replayed into its mailbox, in that order.
    pub fn join(&mut self, peer: PlayerId) {
        let index = self.peer_indices.len() as u32;
        self.peer_indices.entry(peer).or_insert(index);

        let mut mailbox = VecDeque::new();
        for (handle, record) in &self.entities {
            mailbox.push_back(NetNotice::Spawned {
                handle: *handle,
                prefab: record.prefab,
                owner: record.owner,
                position: record.position,
                rotation_deg: record.rotation_deg,
            });
        }
        for (caller, call) in &self.buffered {
            mailbox.push_back(NetNotice::Rpc {
                caller: *caller,
                call: call.clone(),
            });
        }
        self.mailboxes.insert(peer, mailbox);
    }

    /// Take every pending notice for a peer.
    pub fn drain(&mut self, peer: PlayerId) -> Vec<NetNotice> {
        self.mailboxes
            .get_mut(&peer)
            .map(|mailbox| mailbox.drain(..).collect())
            .unwrap_or_default()
    }

    /// Entities currently alive in the session.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    fn deliver(&mut self, notice: NetNotice, skip: Option<PlayerId>) {
        for (peer, mailbox) in self.mailboxes.iter_mut() {
            if Some(*peer) == skip {
                continue;
            }
            mailbox.push_back(notice.clone());
        }
    }

    fn instantiate_as(
        &mut self,
        caller: PlayerId,
        prefab: PrefabId,
        position: Vec2,
        rotation_deg: f32,
    ) -> NetHandle {
        let index = *self.peer_indices.get(&caller).unwrap_or(&u32::MAX);
        let counter = self.counters.entry(caller).or_insert(0);
        *counter += 1;
        let handle = NetHandle::compose(index, *counter);

        self.entities.insert(
            handle,
            EntityRecord {
                prefab,
                owner: caller,
                position,
                rotation_deg,
            },
        );
        // The creator already holds the entity locally.
        self.deliver(
            NetNotice::Spawned {
                handle,
                prefab,
                owner: caller,
                position,
                rotation_deg,
            },
            Some(caller),
        );
        handle
    }

    fn destroy_as(&mut self, caller: PlayerId, handle: NetHandle) {
        if self.entities.remove(&handle).is_none() {
            debug!(peer = %caller.short(), %handle, "duplicate destroy absorbed");
            return;
        }
        // Removal reaches every peer, the destroyer included.
        self.deliver(NetNotice::Destroyed { handle }, None);
    }

    fn invoke_as(&mut self, caller: PlayerId, target: RpcTarget, call: RpcCall) {
        if target == RpcTarget::AllBuffered {
            self.buffered.push((caller, call.clone()));
        }
        self.deliver(NetNotice::Rpc { caller, call }, None);
    }
}

/// One peer's handle on the hub; implements the remote-object runtime.
#[derive(Clone)]
pub struct LoopbackPeer {
    hub: Rc<RefCell<LoopbackHub>>,
    id: PlayerId,
}

impl LoopbackPeer {
    /// Join the hub as `id` and return the peer runtime.
    pub fn join(hub: &Rc<RefCell<LoopbackHub>>, id: PlayerId) -> Self {
        hub.borrow_mut().join(id);
        Self {
            hub: Rc::clone(hub),
            id,
        }
    }

    /// This peer's identity.
    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// Take every pending inbound notice.
    pub fn drain(&self) -> Vec<NetNotice> {
        self.hub.borrow_mut().drain(self.id)
    }
}

impl NetworkRuntime for LoopbackPeer {
    fn instantiate(
        &mut self,
        prefab: PrefabId,
        position: Vec2,
        rotation_deg: f32,
        _group: u8,
    ) -> NetHandle {
        self.hub
            .borrow_mut()
            .instantiate_as(self.id, prefab, position, rotation_deg)
    }

    fn destroy(&mut self, handle: NetHandle) {
        self.hub.borrow_mut().destroy_as(self.id, handle);
    }

    fn invoke(&mut self, target: RpcTarget, call: RpcCall) {
        self.hub.borrow_mut().invoke_as(self.id, target, call);
    }
}

// =============================================================================
// TESTS
// =============================================================================
