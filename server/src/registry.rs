//! Connection tracking for the session server.
//!
//! This module owns the listening socket and every accepted stream:
//! - Non-blocking accept with monotonically assigned client IDs
//! - Per-connection line framing (read accumulation and write buffering)
//! - Opportunistic detection of closed peers
//! - Broadcast that keeps going past a failing connection
//!
//! The registry never removes a connection on its own while draining; it
//! reports closed IDs and leaves removal to the caller, after the pass.

use log::{debug, error, info, warn};
use shared::{LineFramer, SessionError};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};

/// An accepted client stream and its framing state.
pub struct Connection {
    /// Unique client identifier assigned by the server
    pub id: u32,
    /// Remote address, for logging
    pub addr: SocketAddr,
    framer: LineFramer<TcpStream>,
}

impl Connection {
    fn new(id: u32, addr: SocketAddr, stream: TcpStream) -> Self {
        Self {
            id,
            addr,
            framer: LineFramer::new(stream),
        }
    }

    pub fn send(&mut self, line: &str) {
        self.framer.write(line);
    }

    pub fn is_closed(&self) -> bool {
        self.framer.is_closed()
    }

    /// Shuts the socket down. Safe to call on an already closed stream.
    fn close(&self) {
        if let Err(e) = self.framer.get_ref().shutdown(Shutdown::Both) {
            debug!("Shutdown of client {} ignored: {}", self.id, e);
        }
    }
}

/// Lines received during one drain pass.
#[derive(Debug, Default)]
pub struct ReceivePass {
    /// `(client_id, line)` in client ID order, then arrival order.
    pub lines: Vec<(u32, String)>,
    /// Connections found closed during the pass.
    pub closed: Vec<u32>,
}

/// Owns the listener and every live connection.
pub struct ConnectionRegistry {
    listener: Option<TcpListener>,
    /// Live connections indexed by their ID
    connections: BTreeMap<u32, Connection>,
    /// Next ID handed out; IDs are not reused while the registry lives
    next_client_id: u32,
    max_clients: usize,
}

impl ConnectionRegistry {
    /// Creates an idle registry. Client IDs start at 1; 0 is the host.
    pub fn new(max_clients: usize) -> Self {
        Self {
            listener: None,
            connections: BTreeMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Binds a non-blocking listener and returns the bound address.
    pub fn start(&mut self, addr: &str) -> Result<SocketAddr, SessionError> {
        if self.listener.is_some() {
            return Err(SessionError::AlreadyRunning);
        }

        let bind_error = |source| SessionError::Bind {
            addr: addr.to_string(),
            source,
        };
        let listener = TcpListener::bind(addr).map_err(bind_error)?;
        listener.set_nonblocking(true).map_err(bind_error)?;
        let local = listener.local_addr().map_err(bind_error)?;

        info!("Server listening on {}", local);
        self.listener = Some(listener);
        Ok(local)
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// Accepts every pending connection without blocking.
    ///
    /// Returns the IDs assigned in this call, in order.
    pub fn poll_accept(&mut self) -> Vec<u32> {
        let mut accepted = Vec::new();
        let Some(listener) = self.listener.as_ref() else {
            return accepted;
        };

        loop {
            match listener.accept() {
                Ok((stream, addr)) => {
                    if self.connections.len() >= self.max_clients {
                        warn!("Rejecting {}: server full", addr);
                        let _ = stream.shutdown(Shutdown::Both);
                        continue;
                    }

                    if let Err(e) = stream.set_nonblocking(true) {
                        error!("Failed to configure stream from {}: {}", addr, e);
                        continue;
                    }
                    if let Err(e) = stream.set_nodelay(true) {
                        debug!("TCP_NODELAY not set for {}: {}", addr, e);
                    }

                    let client_id = self.next_client_id;
                    self.next_client_id += 1;

                    info!("Client {} connected from {}", client_id, addr);
                    self.connections
                        .insert(client_id, Connection::new(client_id, addr, stream));
                    accepted.push(client_id);
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("Accept failed: {}", e);
                    break;
                }
            }
        }

        accepted
    }

    /// Drains every live connection once.
    ///
    /// The connection map is not modified here; closed peers are reported in
    /// [`ReceivePass::closed`] for the caller to remove afterwards.
    pub fn drain_all(&mut self) -> ReceivePass {
        let mut pass = ReceivePass::default();

        for (id, connection) in self.connections.iter_mut() {
            for line in connection.framer.drain() {
                pass.lines.push((*id, line));
            }
            if connection.is_closed() {
                pass.closed.push(*id);
            }
        }

        pass
    }

    /// Closes and forgets a connection. Returns false if it was already gone.
    pub fn remove(&mut self, client_id: u32) -> bool {
        match self.connections.remove(&client_id) {
            Some(connection) => {
                connection.close();
                info!("Client {} removed", client_id);
                true
            }
            None => false,
        }
    }

    /// Writes `line` to every live connection.
    pub fn broadcast(&mut self, line: &str) {
        for connection in self.connections.values_mut() {
            connection.send(line);
        }
    }

    /// Writes `line` to one connection. Returns false for an unknown ID.
    pub fn send_to(&mut self, client_id: u32, line: &str) -> bool {
        match self.connections.get_mut(&client_id) {
            Some(connection) => {
                connection.send(line);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, client_id: u32) -> bool {
        self.connections.contains_key(&client_id)
    }

    /// Live connection IDs in ascending order.
    pub fn ids(&self) -> Vec<u32> {
        self.connections.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Closes every connection and the listener.
    pub fn stop(&mut self) {
        for connection in self.connections.values() {
            connection.close();
        }
        self.connections.clear();

        if self.listener.take().is_some() {
            info!("Server stopped");
        }
    }
}

impl Drop for ConnectionRegistry {
    fn drop(&mut self) {
        self.stop();
    }
}
