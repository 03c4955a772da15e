//! # Session Client Library
//!
//! Client side of a lobby-based multiplayer session. A client connects over
//! TCP, joins the lobby under a display name, and once the host starts the
//! match streams its input to the server. It never simulates anything
//! itself: every position and hit point comes from the host's `STATE`
//! broadcasts.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! [`network::SessionClient`] owns the stream:
//! - Connect with timeout and announce with `JOIN`
//! - Bounded-rate input sending and a local fire throttle
//! - Decoding of `ROOM`, `START` and `STATE` into [`network::ClientEvent`]s
//! - Detection of a host that went away
//!
//! ### Input Module (`input`)
//! [`input::InputSampler`] turns mouse deltas and movement axes into the
//! world-space sample the server expects.
//!
//! ### Game Module (`game`)
//! [`game::WorldView`] mirrors the last roster and snapshot for presentation
//! code and reports damage and respawns between snapshots.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::game::WorldView;
//! use client::input::InputSampler;
//! use client::network::{ClientConfig, SessionClient};
//!
//! let mut client = SessionClient::new(ClientConfig::default());
//! client.connect("127.0.0.1:7777")?;
//! let mut events = client.subscribe();
//! let mut sampler = InputSampler::default();
//! let mut view = WorldView::new();
//!
//! loop {
//!     sampler.look(0.5, 0.0);
//!     sampler.set_axes(0.0, 1.0);
//!     client.set_input(sampler.sample(false));
//!     client.update(1.0 / 60.0);
//!
//!     while let Ok(event) = events.try_recv() {
//!         view.apply(&event);
//!     }
//!     std::thread::sleep(std::time::Duration::from_millis(16));
//! }
//! # Ok::<(), shared::SessionError>(())
//! ```

pub mod game;
pub mod input;
pub mod network;
