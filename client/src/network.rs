use crate::game::{ClientGameState, HitNotice};
use crate::input::{parse_command, InputEvent, InputManager};
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{Packet, RequestOutcome, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;
use tokio::time::{interval, sleep};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// Headless observer client. Commands come from stdin, state comes from the server.
pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    game_state: ClientGameState,
    input_manager: InputManager,
    ping_ms: u64,
    fake_ping_ms: u64,
}

impl Client {
    pub async fn new(
        server_addr: &str,
        fake_ping_ms: u64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = server_addr.parse()?;

        Ok(Client {
            socket,
            server_addr,
            game_state: ClientGameState::new(),
            input_manager: InputManager::new(),
            ping_ms: 0,
            fake_ping_ms,
        })
    }

    pub fn game_state(&self) -> &ClientGameState {
        &self.game_state
    }

    pub fn ping_ms(&self) -> u64 {
        self.ping_ms
    }

    pub fn is_connected(&self) -> bool {
        self.game_state.client_id().is_some()
    }

    pub async fn connect(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Connecting to server...");

        let packet = Packet::Connect {
            client_version: PROTOCOL_VERSION,
        };
        self.send_packet(&packet).await?;

        Ok(())
    }

    async fn send_packet(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        if self.fake_ping_ms > 0 {
            sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
        }

        let data = serialize(packet)?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    pub fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::Connected { client_id } => {
                info!("Connected! Character ID: {}", client_id);
                self.game_state.on_connected(client_id);
            }

            Packet::Replicate {
                tick,
                timestamp,
                updates,
            } => {
                let now = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or(Duration::from_secs(0))
                    .as_millis() as u64;

                if timestamp > 0 {
                    self.ping_ms = now.saturating_sub(timestamp);
                }

                let count = updates.len();
                let applied = self.game_state.apply_replicate(tick, updates);
                debug!("Tick {}: applied {}/{} updates", tick, applied, count);
            }

            Packet::Hit {
                tick,
                weapon,
                attacker,
                event,
            } => {
                // The server ended our swing; the next attack command starts a new one.
                if attacker.is_some() && attacker == self.game_state.client_id() {
                    debug!("Our swing landed on {}", event.target);
                    self.input_manager.reset();
                }
                self.game_state.record_hit(HitNotice {
                    tick,
                    weapon,
                    attacker,
                    event,
                });
            }

            Packet::Rejected { sequence, reason } => {
                warn!("Request {} rejected: {}", sequence, reason);
            }

            Packet::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.game_state.on_disconnected();
                self.input_manager.reset();
            }

            _ => {
                warn!("Unexpected packet type");
            }
        }
    }

    /// Sends every mutation the gate forwarded since the last flush.
    async fn flush_requests(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        for mutation in self.game_state.take_requests() {
            let request = self.input_manager.next_request(mutation);
            let packet = Packet::Request {
                sequence: request.sequence,
                timestamp: request.timestamp,
                mutation: request.mutation,
            };
            self.send_packet(&packet).await?;
        }
        Ok(())
    }

    /// Handles one typed command. Returns `false` once the player asked to quit.
    pub async fn handle_line(&mut self, line: &str) -> Result<bool, Box<dyn std::error::Error>> {
        if line.trim().is_empty() {
            return Ok(true);
        }

        let event = match parse_command(line) {
            Ok(event) => event,
            Err(e) => {
                warn!("{}", e);
                return Ok(true);
            }
        };

        match &event {
            InputEvent::Quit => return Ok(false),
            InputEvent::Status => {
                println!("{} | ping {}ms", self.game_state.status_line(), self.ping_ms);
                return Ok(true);
            }
            InputEvent::Axis { name, value } => debug!("Axis {} = {}", name, value),
            InputEvent::Jump => debug!("Jump"),
            _ => {}
        }

        let Some(character) = self.game_state.client_id() else {
            warn!("Not connected yet");
            return Ok(true);
        };

        let Some(mutation) = self
            .input_manager
            .to_mutation(&event, character, &self.game_state)
        else {
            return Ok(true);
        };

        match self.game_state.request(mutation) {
            Ok(RequestOutcome::Forwarded) => self.flush_requests().await?,
            Ok(outcome) => debug!("{:?}: {:?}", mutation, outcome),
            Err(e) => warn!("{}", e),
        }

        Ok(true)
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.connect().await?;

        let mut heartbeat_interval = interval(HEARTBEAT_INTERVAL);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut buffer = [0u8; 8192];

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, _)) => {
                            if self.fake_ping_ms > 0 {
                                sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
                            }

                            match deserialize::<Packet>(&buffer[0..len]) {
                                Ok(packet) => self.handle_packet(packet),
                                Err(e) => warn!("Failed to deserialize packet: {}", e),
                            }
                        },
                        Err(e) => error!("Error receiving packet: {}", e),
                    }
                },

                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            if !self.handle_line(&line).await? {
                                break;
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            error!("Error reading input: {}", e);
                            break;
                        }
                    }
                },

                _ = heartbeat_interval.tick() => {
                    if self.is_connected() {
                        if let Err(e) = self.send_packet(&Packet::Heartbeat).await {
                            error!("Error sending heartbeat: {}", e);
                        }
                    }
                },
            }
        }

        if self.is_connected() {
            let _ = self.send_packet(&Packet::Disconnect).await;
        }

        Ok(())
    }
}
