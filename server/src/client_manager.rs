//! Connected observers and the mutation requests they forward to the server
//!
//! This module handles the server-side bookkeeping of every observer:
//! - Connection lifecycle (connect, disconnect, timeout)
//! - Buffering forwarded requests until the next tick applies them
//! - Ordering requests across clients so the authority applies them deterministically
//!
//! A client's id doubles as the id of the character it controls.

use log::info;
use shared::MutationRequest;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Silence after which a client is considered gone.
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// A connected observer and its unapplied requests
#[derive(Debug)]
pub struct Client {
    /// Unique client identifier assigned by the server
    pub id: u32,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
    /// Highest request sequence number the authority has applied or rejected
    pub last_processed_request: u32,
    /// Requests waiting for the next tick, in sequence order
    pub pending_requests: Vec<MutationRequest>,
}

impl Client {
    pub fn new(id: u32, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
            last_processed_request: 0,
            pending_requests: Vec::new(),
        }
    }

    /// Buffers a request, keeping the queue sorted by sequence.
    ///
    /// Requests that were already processed are dropped, which absorbs
    /// duplicated datagrams.
    pub fn add_request(&mut self, request: MutationRequest) -> bool {
        self.touch();
        if request.sequence <= self.last_processed_request
            || self
                .pending_requests
                .iter()
                .any(|r| r.sequence == request.sequence)
        {
            return false;
        }
        self.pending_requests.push(request);
        self.pending_requests.sort_by_key(|r| r.sequence);
        true
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// All connected clients, capped at `max_clients`.
pub struct ClientManager {
    clients: HashMap<u32, Client>,
    next_client_id: u32,
    max_clients: usize,
}

impl ClientManager {
    /// Client ids start at 1 and are never reused.
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Registers a connection. Returns `None` when the server is full.
    pub fn add_client(&mut self, addr: SocketAddr) -> Option<u32> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.clients.insert(client_id, Client::new(client_id, addr));

        Some(client_id)
    }

    pub fn remove_client(&mut self, client_id: &u32) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!("Client {} disconnected", client.id);
            true
        } else {
            false
        }
    }

    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    pub fn client_addr(&self, client_id: u32) -> Option<SocketAddr> {
        self.clients.get(&client_id).map(|c| c.addr)
    }

    /// Refreshes a client's activity timestamp. Returns false for unknown ids.
    pub fn touch(&mut self, client_id: u32) -> bool {
        match self.clients.get_mut(&client_id) {
            Some(client) => {
                client.touch();
                true
            }
            None => false,
        }
    }

    /// Returns false if the client is unknown or the request is a duplicate.
    pub fn add_request(&mut self, client_id: u32, request: MutationRequest) -> bool {
        match self.clients.get_mut(&client_id) {
            Some(client) => client.add_request(request),
            None => false,
        }
    }

    /// Every pending request across all clients, ordered by client timestamp.
    ///
    /// Ties are broken by client id, then sequence, so the order never depends on
    /// hash map iteration.
    pub fn get_chronological_requests(&self) -> Vec<(u32, MutationRequest)> {
        let mut all_requests: Vec<(u32, MutationRequest)> = self
            .clients
            .iter()
            .flat_map(|(client_id, client)| {
                client
                    .pending_requests
                    .iter()
                    .filter(|r| r.sequence > client.last_processed_request)
                    .map(move |r| (*client_id, r.clone()))
            })
            .collect();

        all_requests.sort_by_key(|(client_id, r)| (r.timestamp, *client_id, r.sequence));
        all_requests
    }

    pub fn mark_request_processed(&mut self, client_id: u32, sequence: u32) {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.last_processed_request = client.last_processed_request.max(sequence);
        }
    }

    pub fn cleanup_processed_requests(&mut self) {
        for client in self.clients.values_mut() {
            let last = client.last_processed_request;
            client.pending_requests.retain(|r| r.sequence > last);
        }
    }

    pub fn get_last_processed_requests(&self) -> HashMap<u32, u32> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.last_processed_request))
            .collect()
    }

    /// Removes clients silent for longer than [`CLIENT_TIMEOUT`] and returns their ids.
    pub fn check_timeouts(&mut self) -> Vec<u32> {
        let timed_out: Vec<u32> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(CLIENT_TIMEOUT))
            .map(|(id, _)| *id)
            .collect();

        for client_id in &timed_out {
            self.remove_client(client_id);
        }

        timed_out
    }

    pub fn get_client_addrs(&self) -> Vec<(u32, SocketAddr)> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
