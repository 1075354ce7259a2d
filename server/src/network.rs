//! Server network layer handling UDP communications and game loop coordination

use crate::client_manager::ClientManager;
use crate::game::{GameConfig, GameState};
use bincode::{deserialize, serialize, serialized_size};
use log::{debug, error, info, warn};
use shared::{MutationRequest, Packet, Update, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

/// Largest datagram either side sends or expects to receive.
pub const MAX_PACKET_SIZE: usize = 8192;

/// Room left for updates once a `Replicate` packet's own fields are encoded.
const REPLICATE_BUDGET: usize = MAX_PACKET_SIZE - 64;

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    ClientTimeout {
        client_id: u32,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// Messages sent from game loop to network tasks
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    BroadcastPacket {
        packet: Packet,
        exclude: Option<u32>,
    },
}

/// Milliseconds since the Unix epoch, saturating instead of failing.
pub fn timestamp_millis() -> u64 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis();
    millis.min(u64::MAX as u128) as u64
}

/// Packs updates into as many `Replicate` packets as it takes for each to fit a
/// datagram. Order is kept, so weapons still arrive ahead of the inventories naming them.
pub fn replicate_packets(tick: u32, updates: Vec<Update>) -> Vec<Packet> {
    let timestamp = timestamp_millis();
    let mut packets = Vec::new();
    let mut batch = Vec::new();
    let mut batch_size = 0;

    for update in updates {
        let size = match serialized_size(&update) {
            Ok(size) => size as usize,
            Err(e) => {
                error!("Failed to size update for {:?}: {}", update.entity, e);
                continue;
            }
        };
        if size > REPLICATE_BUDGET {
            warn!(
                "Update for {:?} is {} bytes, more than one datagram holds",
                update.entity, size
            );
        }

        if !batch.is_empty() && batch_size + size > REPLICATE_BUDGET {
            packets.push(Packet::Replicate {
                tick,
                timestamp,
                updates: std::mem::take(&mut batch),
            });
            batch_size = 0;
        }
        batch_size += size;
        batch.push(update);
    }

    if !batch.is_empty() {
        packets.push(Packet::Replicate {
            tick,
            timestamp,
            updates: batch,
        });
    }
    packets
}

/// Authoritative server: owns the world, applies forwarded requests and
/// replicates the outcome every tick.
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    game_state: GameState,
    tick_duration: Duration,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        tick_duration: Duration,
        max_clients: usize,
        config: GameConfig,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(max_clients))),
            game_state: GameState::new(config),
            tick_duration,
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Spawns task that continuously listens for incoming packets
    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; MAX_PACKET_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    async fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet, exclude } => {
                        let client_addrs = {
                            let clients_guard = clients.read().await;
                            clients_guard.get_client_addrs()
                        };

                        for (client_id, addr) in client_addrs {
                            if Some(client_id) == exclude {
                                continue;
                            }

                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to client {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that monitors client timeouts
    async fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts()
                };

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn broadcast_packet(&self, packet: Packet, exclude: Option<u32>) {
        if let Err(e) = self.game_tx.send(GameMessage::BroadcastPacket { packet, exclude }) {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    async fn client_for(&self, addr: SocketAddr) -> Option<u32> {
        let clients = self.clients.read().await;
        clients.find_client_by_addr(addr)
    }

    /// Processes incoming packets
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect { client_version } => {
                info!(
                    "Client connecting from {} (version: {})",
                    addr, client_version
                );

                if client_version != PROTOCOL_VERSION {
                    warn!(
                        "Refusing {}: protocol {} != {}",
                        addr, client_version, PROTOCOL_VERSION
                    );
                    self.send_packet(
                        Packet::Disconnected {
                            reason: "Protocol version mismatch".to_string(),
                        },
                        addr,
                    );
                    return;
                }

                // Remove existing connection if present
                if let Some(existing_id) = self.client_for(addr).await {
                    info!("Removing existing client {} from {}", existing_id, addr);
                    self.clients.write().await.remove_client(&existing_id);
                    self.game_state.remove_player(&existing_id);
                }

                let client_id = self.clients.write().await.add_client(addr);
                let Some(client_id) = client_id else {
                    self.send_packet(
                        Packet::Disconnected {
                            reason: "Server full".to_string(),
                        },
                        addr,
                    );
                    return;
                };

                if let Err(e) = self.game_state.add_player(client_id) {
                    error!("Failed to spawn player {}: {}", client_id, e);
                }

                self.send_packet(Packet::Connected { client_id }, addr);
                // The newcomer gets everything; the others pick the new player up
                // from this tick's updates.
                let snapshot = self.game_state.snapshot();
                for packet in replicate_packets(self.game_state.tick, snapshot) {
                    self.send_packet(packet, addr);
                }
            }

            Packet::Request {
                sequence,
                timestamp,
                mutation,
            } => match self.client_for(addr).await {
                Some(client_id) => {
                    let request = MutationRequest {
                        sequence,
                        timestamp,
                        mutation,
                    };
                    if !self.clients.write().await.add_request(client_id, request) {
                        debug!("Dropped duplicate request {} from {}", sequence, client_id);
                    }
                }
                None => warn!("Request from unknown address {}", addr),
            },

            Packet::Heartbeat => {
                if let Some(client_id) = self.client_for(addr).await {
                    self.clients.write().await.touch(client_id);
                }
            }

            Packet::Disconnect => {
                if let Some(client_id) = self.client_for(addr).await {
                    self.clients.write().await.remove_client(&client_id);
                    self.game_state.remove_player(&client_id);
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    /// Applies queued requests in chronological order, answering failures
    async fn process_requests(&mut self) {
        let all_requests = {
            let clients = self.clients.read().await;
            clients.get_chronological_requests()
        };

        for (client_id, request) in all_requests {
            if let Err(e) = self.game_state.handle_request(client_id, request.mutation) {
                warn!(
                    "Rejected request {} from client {}: {}",
                    request.sequence, client_id, e
                );
                let addr = self.clients.read().await.client_addr(client_id);
                if let Some(addr) = addr {
                    self.send_packet(
                        Packet::Rejected {
                            sequence: request.sequence,
                            reason: e.to_string(),
                        },
                        addr,
                    );
                }
            }

            let mut clients = self.clients.write().await;
            clients.mark_request_processed(client_id, request.sequence);
        }

        let mut clients = self.clients.write().await;
        clients.cleanup_processed_requests();
    }

    /// Advances the simulation one tick and broadcasts hits and state changes
    async fn run_tick(&mut self) {
        self.process_requests().await;
        let hits = self.game_state.update();

        let tick = self.game_state.tick;
        for record in hits {
            self.broadcast_packet(
                Packet::Hit {
                    tick,
                    weapon: record.weapon,
                    attacker: record.attacker,
                    event: record.hit,
                },
                None,
            );
        }

        let updates = self.game_state.take_updates();
        if updates.is_empty() || self.clients.read().await.is_empty() {
            return;
        }

        for packet in replicate_packets(tick, updates) {
            self.broadcast_packet(packet, None);
        }
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;

        let mut tick_interval = interval(self.tick_duration);
        let mut last_tick = Instant::now();

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            self.game_state.remove_player(&client_id);
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_tick).as_secs_f32();
                    last_tick = now;

                    self.run_tick().await;

                    if self.game_state.tick % 60 == 0 {
                        let client_count = self.clients.read().await.len();
                        if client_count > 0 {
                            debug!(
                                "Tick {}: {} clients, {} weapons, {:.1}Hz",
                                self.game_state.tick,
                                client_count,
                                self.game_state.world.weapons().count(),
                                1.0 / dt
                            );
                        }
                    }
                },
            }
        }

        Ok(())
    }
}
