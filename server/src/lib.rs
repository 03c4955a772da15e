//! # Session Server Library
//!
//! Authoritative host side of a lobby-based multiplayer session over TCP.
//! Clients connect, gather in a lobby, and once the match starts send only
//! their intent; the server owns every position, shot and hit point.
//!
//! ## Core Responsibilities
//!
//! ### Connection Management
//! Non-blocking accept, stable client IDs starting at 1, newline framing per
//! stream and opportunistic detection of dead peers.
//!
//! ### Lobby
//! Tracks participant names and ready flags, reacts to `JOIN`, `READY`,
//! `LEAVE` and `START`, and keeps every client's roster current with `ROOM`
//! broadcasts.
//!
//! ### Authoritative Simulation
//! A fixed-tick loop integrates the latest input of every actor, resolves
//! hitscan shots, applies damage, respawns, and broadcasts `STATE`.
//!
//! ## Architecture Design
//!
//! ### Single-Owner Poll Loop
//! One [`session::ServerSession`] owns everything and is driven by one call to
//! `update` per frame. There are no locks and no background tasks in the
//! library; the binary decides how frames are paced.
//!
//! ### Deferred Removal
//! Leaves and disconnects found while receiving are applied after the pass,
//! so one client's removal never disturbs the lines of another.
//!
//! ## Module Organization
//!
//! - `registry`: listener, connections, framing per stream
//! - `lobby`: participants and the lobby/active phase
//! - `physics`: rays, hitboxes and hitscan queries
//! - `simulation`: the fixed-tick authoritative simulator
//! - `config`: session and simulation tunables
//! - `session`: the frame loop, host operations and events
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::{SessionConfig, SimulationConfig};
//! use server::session::ServerSession;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = ServerSession::new(SessionConfig::default(), SimulationConfig::default());
//!     session.start()?;
//!
//!     let mut frames = tokio::time::interval(Duration::from_millis(16));
//!     loop {
//!         frames.tick().await;
//!         session.update(0.016);
//!     }
//! }
//! ```

pub mod config;
pub mod lobby;
pub mod physics;
pub mod registry;
pub mod session;
pub mod simulation;
