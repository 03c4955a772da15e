//! Server session: the single owner of connections, lobby and simulation.
//!
//! The hosting process calls [`ServerSession::update`] once per frame. Each
//! call runs, in order: accept polling, receive polling, the periodic roster
//! broadcast and, while active, the fixed-tick simulation. Nothing here
//! blocks and nothing is shared across threads; host-side consumers observe
//! the session through [`SessionEvent`] channels.

use crate::config::{SessionConfig, SimulationConfig};
use crate::lobby::{LobbyOutcome, LobbySessionManager, SessionPhase};
use crate::registry::ConnectionRegistry;
use crate::simulation::AuthoritativeSimulator;
use log::{debug, info, warn};
use shared::protocol::{format_line, split_line, Command};
use shared::{RoomSnapshot, SessionError, StateSnapshot, HOST_PARTICIPANT_ID};
use std::net::SocketAddr;
use tokio::sync::mpsc;

/// Notifications delivered to host-side subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ClientConnected { client_id: u32 },
    ClientRemoved { client_id: u32 },
    /// Roster as just broadcast.
    Room(RoomSnapshot),
    /// The session entered active play.
    Started,
    /// Snapshot as just broadcast, echoed locally for the host.
    State(StateSnapshot),
    /// A command neither the lobby nor the simulator understood.
    Gameplay {
        from: u32,
        command: String,
        payload: String,
    },
}

pub struct ServerSession {
    config: SessionConfig,
    registry: ConnectionRegistry,
    lobby: LobbySessionManager,
    simulator: AuthoritativeSimulator,
    subscribers: Vec<mpsc::UnboundedSender<SessionEvent>>,
}

impl ServerSession {
    pub fn new(config: SessionConfig, sim_config: SimulationConfig) -> Self {
        Self::with_simulator(config, AuthoritativeSimulator::new(sim_config))
    }

    /// Uses a pre-built simulator, e.g. one with a fixed spawn seed.
    pub fn with_simulator(config: SessionConfig, simulator: AuthoritativeSimulator) -> Self {
        Self {
            registry: ConnectionRegistry::new(config.max_clients),
            lobby: LobbySessionManager::new(config.room_broadcast_interval),
            simulator,
            config,
            subscribers: Vec::new(),
        }
    }

    /// Starts listening on the configured address.
    ///
    /// The lobby starts empty apart from the host participant, if enabled.
    pub fn start(&mut self) -> Result<SocketAddr, SessionError> {
        let addr = self.registry.start(&self.config.bind_address())?;

        self.lobby.reset();
        self.simulator.reset();
        if self.config.include_host_in_room {
            self.lobby.add_host(&self.config.host_name);
        }

        info!("Session hosted on {}", addr);
        Ok(addr)
    }

    pub fn is_running(&self) -> bool {
        self.registry.is_listening()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.registry.local_addr()
    }

    pub fn phase(&self) -> SessionPhase {
        self.lobby.phase()
    }

    pub fn lobby(&self) -> &LobbySessionManager {
        &self.lobby
    }

    pub fn simulator(&self) -> &AuthoritativeSimulator {
        &self.simulator
    }

    pub fn client_count(&self) -> usize {
        self.registry.len()
    }

    /// Participant IDs in ascending order, host included when listed.
    pub fn participant_ids(&self) -> Vec<u32> {
        self.lobby.participant_ids()
    }

    /// Registers a new event subscriber.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Runs one frame of `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        if !self.is_running() {
            return;
        }

        self.poll_accept();
        self.poll_receive();

        if self.lobby.tick_room_timer(dt) {
            self.broadcast_room();
        }

        if self.lobby.is_active() {
            for report in self.simulator.advance(dt) {
                self.broadcast_state(report.snapshot);
            }
        }
    }

    /// Accepts pending connections and registers their participants.
    pub fn poll_accept(&mut self) {
        let accepted = self.registry.poll_accept();
        if accepted.is_empty() {
            return;
        }

        for client_id in accepted {
            self.lobby.add_participant(client_id);
            self.emit(SessionEvent::ClientConnected { client_id });
        }
        self.broadcast_room();
    }

    /// Drains every connection and dispatches the received lines.
    ///
    /// Leaves and dead connections are removed only after the whole pass,
    /// followed by a single roster broadcast.
    pub fn poll_receive(&mut self) {
        let pass = self.registry.drain_all();
        let mut removals = Vec::new();

        for (from, line) in pass.lines {
            let (command, payload) = split_line(&line);
            self.dispatch(from, command, payload, &mut removals);
        }

        removals.extend(pass.closed);
        self.apply_removals(removals);
    }

    /// Feeds a command as if `from` had sent it.
    ///
    /// Used by the host for its own input and fire, which never touch a socket.
    pub fn inject_command(&mut self, from: u32, command: &str, payload: &str) {
        let mut removals = Vec::new();
        self.dispatch(from, command, payload, &mut removals);
        self.apply_removals(removals);
    }

    fn dispatch(&mut self, from: u32, command: &str, payload: &str, removals: &mut Vec<u32>) {
        if command.is_empty() {
            return;
        }

        match self.lobby.handle_command(from, command, payload) {
            LobbyOutcome::RosterChanged => self.broadcast_room(),
            LobbyOutcome::LeaveRequested(id) => {
                info!("LEAVE from {}", id);
                removals.push(id);
            }
            LobbyOutcome::Started => self.begin_active(),
            LobbyOutcome::Ignored => {}
            LobbyOutcome::Forward => {
                if self.lobby.is_active() && self.simulator.handle_command(from, command, payload)
                {
                    return;
                }
                if matches!(
                    Command::parse(command),
                    Some(Command::Input | Command::InputWorld | Command::Fire)
                ) {
                    debug!("{} from {} has no actor; dropped", command, from);
                    return;
                }
                self.emit(SessionEvent::Gameplay {
                    from,
                    command: command.to_string(),
                    payload: payload.to_string(),
                });
            }
        }
    }

    fn apply_removals(&mut self, mut removals: Vec<u32>) {
        if removals.is_empty() {
            return;
        }
        removals.sort_unstable();
        removals.dedup();

        let mut changed = false;
        for client_id in removals {
            // The host has no connection and cannot be removed.
            if client_id == HOST_PARTICIPANT_ID {
                continue;
            }
            let had_connection = self.registry.remove(client_id);
            let had_participant = self.lobby.remove_participant(client_id);
            if had_connection || had_participant {
                changed = true;
                self.emit(SessionEvent::ClientRemoved { client_id });
            }
        }

        if changed {
            self.broadcast_room();
        }
    }

    fn begin_active(&mut self) {
        info!("Broadcasting START");
        self.registry.broadcast(Command::Start.as_str());
        self.simulator.spawn_initial(&self.lobby.participant_ids());
        self.emit(SessionEvent::Started);
    }

    /// Sends the current roster to every client and to subscribers.
    pub fn broadcast_room(&mut self) {
        let roster = self.lobby.roster();
        self.registry.broadcast(&roster.to_line());
        self.emit(SessionEvent::Room(roster));
    }

    fn broadcast_state(&mut self, snapshot: StateSnapshot) {
        self.registry.broadcast(&snapshot.to_line());
        self.emit(SessionEvent::State(snapshot));
    }

    /// Broadcasts an arbitrary line. `STATE` lines are echoed to subscribers.
    pub fn broadcast_line(&mut self, line: &str) {
        self.registry.broadcast(line);

        let (command, payload) = split_line(line);
        if Command::parse(command) == Some(Command::State) {
            match StateSnapshot::from_json(payload) {
                Ok(snapshot) => self.emit(SessionEvent::State(snapshot)),
                Err(e) => warn!("Broadcast STATE not echoed: {}", e),
            }
        }
    }

    /// Sends a command to one client. Returns false for an unknown ID.
    pub fn send_to(&mut self, client_id: u32, command: &str, payload: &str) -> bool {
        self.registry
            .send_to(client_id, &format_line(command, payload))
    }

    pub fn host_set_name(&mut self, name: &str) -> bool {
        if !self.lobby.set_name(HOST_PARTICIPANT_ID, name) {
            return false;
        }
        self.broadcast_room();
        true
    }

    pub fn host_set_ready(&mut self, ready: bool) -> bool {
        if !self.lobby.set_ready(HOST_PARTICIPANT_ID, ready) {
            return false;
        }
        self.broadcast_room();
        true
    }

    /// Starts the match from the host side. Returns false if not running or
    /// already active.
    pub fn host_start(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        if !self.lobby.start() {
            debug!("Host START ignored: already active");
            return false;
        }
        self.begin_active();
        true
    }

    /// Closes every connection and forgets all participants and actors.
    pub fn stop(&mut self) -> Result<(), SessionError> {
        if !self.is_running() {
            return Err(SessionError::NotRunning);
        }
        self.registry.stop();
        self.lobby.reset();
        self.simulator.reset();
        info!("Session stopped");
        Ok(())
    }

    fn emit(&mut self, event: SessionEvent) {
        for subscriber in &self.subscribers {
            // A closed receiver is pruned below.
            let _ = subscriber.send(event.clone());
        }
        self.subscribers.retain(|tx| !tx.is_closed());
    }
}
