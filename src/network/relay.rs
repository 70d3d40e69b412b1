//! WebSocket Relay Server
//!
//! Async relay implementing the delivery contract the combat core assumes:
//! snapshots and spawn/destroy notices fan out to every other peer, destroys
//! are absorbed after the first request, and buffered remote procedure calls
//! are journaled and replayed in call order to peers that join later.
//!
//! The relay never inspects gameplay semantics; it only routes and journals.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::core::vec2::Vec2;
use crate::game::state::{Element, PlayerId};
use crate::network::protocol::{PeerMessage, RelayMessage};
use crate::network::runtime::{NetHandle, PrefabId, RpcCall, RpcTarget};

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent peers.
    pub max_peers: usize,
    /// Version string reported in Welcome.
    pub version: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".parse().expect("valid default bind address"),
            max_peers: 16,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Relay errors.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// A connected, joined peer.
struct ConnectedPeer {
    player_id: PlayerId,
    display_name: String,
    element: Element,
    #[allow(dead_code)]
    peer_index: u32,
    #[allow(dead_code)]
    joined_at: DateTime<Utc>,
    sender: mpsc::Sender<RelayMessage>,
}

/// One journaled buffered call.
struct BufferedRpc {
    caller: PlayerId,
    call: RpcCall,
    buffered_at: DateTime<Utc>,
}

/// A live networked entity, replayed to late joiners.
struct LiveEntity {
    prefab: PrefabId,
    owner: PlayerId,
    position: Vec2,
    rotation_deg: f32,
}

type PeerMap = Arc<RwLock<BTreeMap<SocketAddr, ConnectedPeer>>>;
type Journal = Arc<RwLock<Vec<BufferedRpc>>>;
type Entities = Arc<RwLock<BTreeMap<NetHandle, LiveEntity>>>;

/// The relay server.
pub struct RelayServer {
    config: RelayConfig,
    peers: PeerMap,
    journal: Journal,
    entities: Entities,
    next_peer_index: AtomicU32,
    shutdown_tx: broadcast::Sender<()>,
}

impl RelayServer {
    /// Create a relay with the given configuration.
    pub fn new(config: RelayConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            peers: Arc::new(RwLock::new(BTreeMap::new())),
            journal: Arc::new(RwLock::new(Vec::new())),
            entities: Arc::new(RwLock::new(BTreeMap::new())),
            next_peer_index: AtomicU32::new(0),
            shutdown_tx,
        }
    }

    /// Signal the accept loop to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Bind the configured address and serve.
    pub async fn run(self: Arc<Self>) -> Result<(), RelayError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("Relay listening on {}", self.config.bind_addr);
        self.serve(listener).await
    }

    /// Serve connections from an existing listener.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<(), RelayError> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let peer_count = self.peers.read().await.len();
                            if peer_count >= self.config.max_peers {
                                warn!("Peer limit reached, rejecting {}", addr);
                                continue;
                            }
                            debug!("New connection from {}", addr);
                            self.clone().handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Relay shutting down");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Handle one WebSocket connection on its own task.
    fn handle_connection(self: Arc<Self>, stream: TcpStream, addr: SocketAddr) {
        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<RelayMessage>(64);

            // Outbound pump: serialize queued messages onto the socket.
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            let mut shutdown_rx = self.shutdown_tx.subscribe();

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                match PeerMessage::from_json(&text) {
                                    Ok(peer_msg) => {
                                        self.handle_peer_message(addr, peer_msg, &msg_tx).await;
                                    }
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        let _ = msg_tx.send(RelayMessage::Error {
                                            message: "Invalid message format".to_string(),
                                        }).await;
                                    }
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Peer {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }

            sender_task.abort();
            self.remove_peer(addr).await;
        });
    }

    /// Route one message from a peer.
    async fn handle_peer_message(
        &self,
        addr: SocketAddr,
        msg: PeerMessage,
        msg_tx: &mpsc::Sender<RelayMessage>,
    ) {
        match msg {
            PeerMessage::Join(join) => {
                let peer_index = self.next_peer_index.fetch_add(1, Ordering::Relaxed);
                info!(
                    "Peer {} joined as {} ({})",
                    addr,
                    join.display_name,
                    join.player_id.short()
                );

                let _ = msg_tx
                    .send(RelayMessage::Welcome {
                        peer_index,
                        server_time: Utc::now(),
                        version: self.config.version.clone(),
                    })
                    .await;

                // Hold the journal and peer map exclusively while replaying
                // so racing joins and buffered calls are neither missed nor
                // duplicated.
                let journal = self.journal.write().await;
                let mut peers = self.peers.write().await;

                for peer in peers.values() {
                    let _ = msg_tx
                        .send(RelayMessage::PeerJoined {
                            player_id: peer.player_id,
                            display_name: peer.display_name.clone(),
                            element: peer.element,
                        })
                        .await;
                }
                {
                    let entities = self.entities.read().await;
                    for (handle, entity) in entities.iter() {
                        let _ = msg_tx
                            .send(RelayMessage::Spawned {
                                handle: *handle,
                                prefab: entity.prefab,
                                owner: entity.owner,
                                position: entity.position,
                                rotation_deg: entity.rotation_deg,
                            })
                            .await;
                    }
                }
                for entry in journal.iter() {
                    let _ = msg_tx
                        .send(RelayMessage::Rpc {
                            caller: entry.caller,
                            call: entry.call.clone(),
                        })
                        .await;
                }

                peers.insert(
                    addr,
                    ConnectedPeer {
                        player_id: join.player_id,
                        display_name: join.display_name.clone(),
                        element: join.element,
                        peer_index,
                        joined_at: Utc::now(),
                        sender: msg_tx.clone(),
                    },
                );
                drop(peers);
                drop(journal);

                self.broadcast_except(
                    addr,
                    RelayMessage::PeerJoined {
                        player_id: join.player_id,
                        display_name: join.display_name,
                        element: join.element,
                    },
                )
                .await;
            }

            PeerMessage::Snapshot { tick, snapshot } => {
                let Some(player_id) = self.player_at(addr).await else {
                    return;
                };
                self.broadcast_except(
                    addr,
                    RelayMessage::Snapshot {
                        player_id,
                        tick,
                        snapshot,
                    },
                )
                .await;
            }

            PeerMessage::Spawn {
                handle,
                prefab,
                position,
                rotation_deg,
                group: _,
            } => {
                let Some(owner) = self.player_at(addr).await else {
                    return;
                };
                self.entities.write().await.insert(
                    handle,
                    LiveEntity {
                        prefab,
                        owner,
                        position,
                        rotation_deg,
                    },
                );
                self.broadcast_except(
                    addr,
                    RelayMessage::Spawned {
                        handle,
                        prefab,
                        owner,
                        position,
                        rotation_deg,
                    },
                )
                .await;
            }

            PeerMessage::Destroy { handle } => {
                // Destroy once: duplicates and lates are absorbed here.
                if self.entities.write().await.remove(&handle).is_none() {
                    debug!(%handle, "duplicate destroy absorbed");
                    return;
                }
                self.broadcast_all(RelayMessage::Destroyed { handle }).await;
            }

            PeerMessage::Rpc { target, call } => {
                let Some(caller) = self.player_at(addr).await else {
                    return;
                };
                if target == RpcTarget::AllBuffered {
                    self.journal.write().await.push(BufferedRpc {
                        caller,
                        call: call.clone(),
                        buffered_at: Utc::now(),
                    });
                }
                self.broadcast_all(RelayMessage::Rpc { caller, call }).await;
            }

            PeerMessage::Leave => {
                self.remove_peer(addr).await;
            }
        }
    }

    async fn player_at(&self, addr: SocketAddr) -> Option<PlayerId> {
        self.peers.read().await.get(&addr).map(|p| p.player_id)
    }

    async fn broadcast_all(&self, msg: RelayMessage) {
        let peers = self.peers.read().await;
        for peer in peers.values() {
            let _ = peer.sender.send(msg.clone()).await;
        }
    }

    async fn broadcast_except(&self, skip: SocketAddr, msg: RelayMessage) {
        let peers = self.peers.read().await;
        for (peer_addr, peer) in peers.iter() {
            if *peer_addr == skip {
                continue;
            }
            let _ = peer.sender.send(msg.clone()).await;
        }
    }

    async fn remove_peer(&self, addr: SocketAddr) {
        let removed = self.peers.write().await.remove(&addr);
        if let Some(peer) = removed {
            info!("Peer {} ({}) left", addr, peer.display_name);
            self.broadcast_all(RelayMessage::PeerLeft {
                player_id: peer.player_id,
            })
            .await;
        }
    }

    /// Buffered calls journaled so far (diagnostics).
    pub async fn journal_len(&self) -> usize {
        self.journal.read().await.len()
    }

    /// Oldest journal entry timestamp (diagnostics).
    pub async fn journal_head_time(&self) -> Option<DateTime<Utc>> {
        self.journal.read().await.first().map(|e| e.buffered_at)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::protocol::JoinRequest;
    use futures_util::stream::{SplitSink, SplitStream};
    use tokio::net::TcpStream;
    use tokio::time::{timeout, Duration};
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

    type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
    type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

    async fn start_relay() -> (SocketAddr, Arc<RelayServer>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(RelayServer::new(RelayConfig {
            bind_addr: addr,
            ..RelayConfig::default()
        }));
        let serving = Arc::clone(&server);
        tokio::spawn(async move {
            let _ = serving.serve(listener).await;
        });
        (addr, server)
    }

    async fn connect(addr: SocketAddr) -> (WsSink, WsSource) {
        let (ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();
        ws.split()
    }

    async fn send(sink: &mut WsSink, msg: PeerMessage) {
        sink.send(Message::Text(msg.to_json().unwrap()))
            .await
            .unwrap();
    }

    async fn next_msg(source: &mut WsSource) -> RelayMessage {
        loop {
            let msg = timeout(Duration::from_secs(5), source.next())
                .await
                .expect("timed out waiting for relay message")
                .expect("relay closed the stream")
                .expect("websocket error");
            if let Message::Text(text) = msg {
                return RelayMessage::from_json(&text).unwrap();
            }
        }
    }

    fn join(name: &str, id: u8, element: Element) -> PeerMessage {
        PeerMessage::Join(JoinRequest {
            player_id: PlayerId::new([id; 16]),
            display_name: name.to_string(),
            element,
        })
    }

    /// Round-trip an RPC echo so the relay is known to have finished
    /// registering this peer before the test proceeds.
    async fn sync(tx: &mut WsSink, rx: &mut WsSource, tag: &str) {
        send(
            tx,
            PeerMessage::Rpc {
                target: RpcTarget::All,
                call: RpcCall::CreditDamage {
                    shooter_tag: tag.to_string(),
                    amount: 0.0,
                },
            },
        )
        .await;
        loop {
            if let RelayMessage::Rpc {
                call: RpcCall::CreditDamage { shooter_tag, .. },
                ..
            } = next_msg(rx).await
            {
                if shooter_tag == tag {
                    return;
                }
            }
        }
    }

    #[tokio::test]
    async fn test_buffered_rpc_replayed_to_late_joiner() {
        let (addr, server) = start_relay().await;

        // Peer A joins and raises an electric field.
        let (mut a_tx, mut a_rx) = connect(addr).await;
        send(&mut a_tx, join("ash", 1, Element::Electric)).await;
        assert!(matches!(next_msg(&mut a_rx).await, RelayMessage::Welcome { .. }));

        let field = NetHandle::compose(0, 1);
        send(
            &mut a_tx,
            PeerMessage::Spawn {
                handle: field,
                prefab: PrefabId::ElectricField,
                position: Vec2::new(1.0, 1.0),
                rotation_deg: 0.0,
                group: 0,
            },
        )
        .await;
        send(
            &mut a_tx,
            PeerMessage::Rpc {
                target: RpcTarget::AllBuffered,
                call: RpcCall::SetFieldParent {
                    field,
                    owner: PlayerId::new([1; 16]),
                },
            },
        )
        .await;
        // Unbuffered call: must NOT be replayed later.
        send(
            &mut a_tx,
            PeerMessage::Rpc {
                target: RpcTarget::All,
                call: RpcCall::CreditDamage {
                    shooter_tag: "ash_Bullet".to_string(),
                    amount: 0.1,
                },
            },
        )
        .await;

        // RPCs echo to the caller; seeing both confirms the relay processed
        // everything above before B joins.
        assert!(matches!(next_msg(&mut a_rx).await, RelayMessage::Rpc { .. }));
        assert!(matches!(next_msg(&mut a_rx).await, RelayMessage::Rpc { .. }));

        // Only the buffered call was journaled.
        assert_eq!(server.journal_len().await, 1);
        assert!(server.journal_head_time().await.is_some());

        // Peer B joins late: welcome, roster, live entity, then the buffered
        // history.
        let (mut b_tx, mut b_rx) = connect(addr).await;
        send(&mut b_tx, join("gary", 2, Element::Fire)).await;

        assert!(matches!(next_msg(&mut b_rx).await, RelayMessage::Welcome { .. }));
        match next_msg(&mut b_rx).await {
            RelayMessage::PeerJoined { display_name, .. } => assert_eq!(display_name, "ash"),
            other => panic!("expected roster replay, got {other:?}"),
        }
        match next_msg(&mut b_rx).await {
            RelayMessage::Spawned { handle, prefab, .. } => {
                assert_eq!(handle, field);
                assert_eq!(prefab, PrefabId::ElectricField);
            }
            other => panic!("expected spawned, got {other:?}"),
        }
        match next_msg(&mut b_rx).await {
            RelayMessage::Rpc {
                call: RpcCall::SetFieldParent { field: f, .. },
                ..
            } => assert_eq!(f, field),
            other => panic!("expected buffered parent rpc, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_duplicate_destroy_produces_one_removal() {
        let (addr, _server) = start_relay().await;

        let (mut a_tx, mut a_rx) = connect(addr).await;
        send(&mut a_tx, join("ash", 1, Element::Fire)).await;
        assert!(matches!(next_msg(&mut a_rx).await, RelayMessage::Welcome { .. }));
        sync(&mut a_tx, &mut a_rx, "sync_a").await;

        let (mut b_tx, mut b_rx) = connect(addr).await;
        send(&mut b_tx, join("gary", 2, Element::Fire)).await;
        assert!(matches!(next_msg(&mut b_rx).await, RelayMessage::Welcome { .. }));
        // B gets the roster; A learns of B joining.
        assert!(matches!(next_msg(&mut b_rx).await, RelayMessage::PeerJoined { .. }));
        assert!(matches!(next_msg(&mut a_rx).await, RelayMessage::PeerJoined { .. }));

        let pack = NetHandle::compose(0, 7);
        send(
            &mut a_tx,
            PeerMessage::Spawn {
                handle: pack,
                prefab: PrefabId::HealthPack,
                position: Vec2::ZERO,
                rotation_deg: 0.0,
                group: 0,
            },
        )
        .await;
        // Two destroys for the same handle, then a sentinel RPC.
        send(&mut a_tx, PeerMessage::Destroy { handle: pack }).await;
        send(&mut a_tx, PeerMessage::Destroy { handle: pack }).await;
        send(
            &mut a_tx,
            PeerMessage::Rpc {
                target: RpcTarget::All,
                call: RpcCall::CreditDamage {
                    shooter_tag: "ash_Bullet".to_string(),
                    amount: 0.1,
                },
            },
        )
        .await;

        // B sees: spawn, exactly one destroy, then the sentinel.
        assert!(matches!(next_msg(&mut b_rx).await, RelayMessage::Spawned { .. }));
        assert!(matches!(next_msg(&mut b_rx).await, RelayMessage::Destroyed { .. }));
        match next_msg(&mut b_rx).await {
            RelayMessage::Rpc { .. } => {}
            other => panic!("expected sentinel rpc after single destroy, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_snapshot_fans_out_to_other_peers() {
        let (addr, server) = start_relay().await;

        let (mut a_tx, mut a_rx) = connect(addr).await;
        send(&mut a_tx, join("ash", 1, Element::Fire)).await;
        assert!(matches!(next_msg(&mut a_rx).await, RelayMessage::Welcome { .. }));
        sync(&mut a_tx, &mut a_rx, "sync_a").await;

        let (mut b_tx, mut b_rx) = connect(addr).await;
        send(&mut b_tx, join("gary", 2, Element::Fire)).await;
        assert!(matches!(next_msg(&mut b_rx).await, RelayMessage::Welcome { .. }));
        assert!(matches!(next_msg(&mut b_rx).await, RelayMessage::PeerJoined { .. }));
        sync(&mut b_tx, &mut b_rx, "sync_b").await;

        send(
            &mut a_tx,
            PeerMessage::Snapshot {
                tick: 42,
                snapshot: crate::network::replication::PlayerSnapshot {
                    firing: true,
                    health: 0.7,
                    using_ultra: false,
                },
            },
        )
        .await;

        match next_msg(&mut b_rx).await {
            RelayMessage::Snapshot {
                player_id,
                tick,
                snapshot,
            } => {
                assert_eq!(player_id, PlayerId::new([1; 16]));
                assert_eq!(tick, 42);
                assert!(snapshot.firing);
                assert!((snapshot.health - 0.7).abs() < 1e-6);
            }
            other => panic!("expected snapshot, got {other:?}"),
        }

        server.shutdown();
    }
}
