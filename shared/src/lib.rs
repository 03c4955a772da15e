//! Types and wire helpers shared by the session server and its clients.
//!
//! Everything that both ends of a connection must agree on lives here: the
//! newline framing, the command vocabulary, the ROOM/STATE snapshot formats
//! and the input sample encoding.

pub mod error;
pub mod framing;
pub mod input;
pub mod math;
pub mod protocol;

pub use error::{PayloadError, SessionError};
pub use framing::LineFramer;
pub use input::{InputSample, Movement};
pub use math::Vec3;
pub use protocol::{ActorSnapshot, Command, RoomSnapshot, RosterEntry, StateSnapshot};

pub const DEFAULT_PORT: u16 = 7777;
pub const HOST_PARTICIPANT_ID: u32 = 0;

pub const TICK_RATE: f32 = 20.0;
pub const MOVE_SPEED: f32 = 4.5;
pub const MAX_HP: i32 = 100;
pub const FIRE_DAMAGE: i32 = 25;
pub const FIRE_COOLDOWN: f32 = 0.12;
pub const EYE_HEIGHT: f32 = 1.6;
pub const MAX_FIRE_DISTANCE: f32 = 100.0;

pub const ROOM_BROADCAST_INTERVAL: f32 = 0.5;
pub const INPUT_SEND_RATE: f32 = 20.0;

/// Placeholder display name given to a participant before it sends `JOIN`.
pub fn default_participant_name(id: u32) -> String {
    format!("Player{}", id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_participant_name() {
        assert_eq!(default_participant_name(3), "Player3");
        assert_eq!(default_participant_name(HOST_PARTICIPANT_ID), "Player0");
    }

    #[test]
    fn test_tick_interval_matches_rate() {
        let dt = 1.0 / TICK_RATE;
        assert!((dt - 0.05).abs() < 1e-6);
    }
}
