//! Command vocabulary and snapshot payloads of the line protocol.
//!
//! Each line is `COMMAND` or `COMMAND|payload`. Lobby snapshots (`ROOM`) and
//! world snapshots (`STATE`) carry JSON payloads; input payloads are plain
//! comma-separated numbers (see [`crate::input`]).

use crate::error::PayloadError;
use crate::math::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Commands the session layer itself understands.
///
/// Anything else travels through as an opaque `(command, payload)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Join,
    Ready,
    Leave,
    Start,
    Room,
    /// Legacy input variant: local movement axes, rotated on the server.
    Input,
    /// Canonical input variant: world-space movement direction.
    InputWorld,
    Fire,
    State,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Join => "JOIN",
            Command::Ready => "READY",
            Command::Leave => "LEAVE",
            Command::Start => "START",
            Command::Room => "ROOM",
            Command::Input => "INPUT",
            Command::InputWorld => "INPUTW",
            Command::Fire => "FIRE",
            Command::State => "STATE",
        }
    }

    pub fn parse(command: &str) -> Option<Command> {
        match command {
            "JOIN" => Some(Command::Join),
            "READY" => Some(Command::Ready),
            "LEAVE" => Some(Command::Leave),
            "START" => Some(Command::Start),
            "ROOM" => Some(Command::Room),
            "INPUT" => Some(Command::Input),
            "INPUTW" => Some(Command::InputWorld),
            "FIRE" => Some(Command::Fire),
            "STATE" => Some(Command::State),
            _ => None,
        }
    }
}

/// Splits a line at its first `|` into `(command, payload)`.
pub fn split_line(line: &str) -> (&str, &str) {
    line.split_once('|').unwrap_or((line, ""))
}

/// Builds `COMMAND` or `COMMAND|payload`.
pub fn format_line(command: &str, payload: &str) -> String {
    if payload.is_empty() {
        command.to_string()
    } else {
        format!("{}|{}", command, payload)
    }
}

/// Parses a numeric field; anything unparsable or non-finite reads as zero.
pub fn parse_f32_or_zero(field: &str) -> f32 {
    field
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// One participant as listed in a `ROOM` broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: u32,
    pub name: String,
    pub ready: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub players: Vec<RosterEntry>,
}

impl RoomSnapshot {
    pub fn to_json(&self) -> String {
        // Only plain strings, bools and integers: serialization cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| "{\"players\":[]}".to_string())
    }

    pub fn to_line(&self) -> String {
        format_line(Command::Room.as_str(), &self.to_json())
    }

    pub fn from_json(payload: &str) -> Result<Self, PayloadError> {
        Ok(serde_json::from_str(payload)?)
    }

    pub fn get(&self, id: u32) -> Option<&RosterEntry> {
        self.players.iter().find(|p| p.id == id)
    }
}

/// One actor as listed in a `STATE` broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActorSnapshot {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub yaw: f32,
    pub hp: i32,
}

impl ActorSnapshot {
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub players: Vec<ActorSnapshot>,
}

impl StateSnapshot {
    /// Positions carry 3 decimals, yaw 1 decimal, independent of locale.
    pub fn to_json(&self) -> String {
        let mut json = String::from("{\"players\":[");
        for (i, p) in self.players.iter().enumerate() {
            if i > 0 {
                json.push(',');
            }
            let _ = write!(
                json,
                "{{\"id\":{},\"x\":{:.3},\"y\":{:.3},\"z\":{:.3},\"yaw\":{:.1},\"hp\":{}}}",
                p.id,
                finite_or_zero(p.x),
                finite_or_zero(p.y),
                finite_or_zero(p.z),
                finite_or_zero(p.yaw),
                p.hp
            );
        }
        json.push_str("]}");
        json
    }

    pub fn to_line(&self) -> String {
        format_line(Command::State.as_str(), &self.to_json())
    }

    pub fn from_json(payload: &str) -> Result<Self, PayloadError> {
        Ok(serde_json::from_str(payload)?)
    }

    pub fn get(&self, id: u32) -> Option<&ActorSnapshot> {
        self.players.iter().find(|p| p.id == id)
    }
}

fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_command_names() {
        let all = [
            Command::Join,
            Command::Ready,
            Command::Leave,
            Command::Start,
            Command::Room,
            Command::Input,
            Command::InputWorld,
            Command::Fire,
            Command::State,
        ];
        for command in all {
            assert_eq!(Command::parse(command.as_str()), Some(command));
        }
        assert_eq!(Command::parse("EMOTE"), None);
        assert_eq!(Command::parse("join"), None);
    }

    #[test]
    fn test_split_line() {
        assert_eq!(split_line("JOIN|Alice"), ("JOIN", "Alice"));
        assert_eq!(split_line("LEAVE"), ("LEAVE", ""));
        assert_eq!(split_line("FIRE|"), ("FIRE", ""));
        assert_eq!(split_line("SAY|a|b"), ("SAY", "a|b"));
    }

    #[test]
    fn test_format_line() {
        assert_eq!(format_line("START", ""), "START");
        assert_eq!(format_line("READY", "1"), "READY|1");
    }

    #[test]
    fn test_parse_f32_or_zero() {
        assert_eq!(parse_f32_or_zero("1.5"), 1.5);
        assert_eq!(parse_f32_or_zero(" -0.25 "), -0.25);
        assert_eq!(parse_f32_or_zero("abc"), 0.0);
        assert_eq!(parse_f32_or_zero(""), 0.0);
        assert_eq!(parse_f32_or_zero("NaN"), 0.0);
        assert_eq!(parse_f32_or_zero("inf"), 0.0);
        // Comma decimal separators are not accepted.
        assert_eq!(parse_f32_or_zero("1,5"), 0.0);
    }

    #[test]
    fn test_room_json_layout() {
        let room = RoomSnapshot {
            players: vec![
                RosterEntry {
                    id: 0,
                    name: "Host".to_string(),
                    ready: false,
                },
                RosterEntry {
                    id: 1,
                    name: "Al\"ice\\".to_string(),
                    ready: true,
                },
            ],
        };

        assert_eq!(
            room.to_line(),
            r#"ROOM|{"players":[{"id":0,"name":"Host","ready":false},{"id":1,"name":"Al\"ice\\","ready":true}]}"#
        );
        assert_eq!(RoomSnapshot::from_json(&room.to_json()).unwrap(), room);
    }

    #[test]
    fn test_state_json_precision() {
        let state = StateSnapshot {
            players: vec![ActorSnapshot {
                id: 2,
                x: 1.23456,
                y: 0.0,
                z: -7.5,
                yaw: 359.96,
                hp: 75,
            }],
        };

        assert_eq!(
            state.to_json(),
            r#"{"players":[{"id":2,"x":1.235,"y":0.000,"z":-7.500,"yaw":360.0,"hp":75}]}"#
        );
    }

    #[test]
    fn test_state_decode_matches_encode() {
        let state = StateSnapshot {
            players: vec![
                ActorSnapshot {
                    id: 1,
                    x: 10.0004,
                    y: 1.5,
                    z: -3.333,
                    yaw: 45.04,
                    hp: 100,
                },
                ActorSnapshot {
                    id: 4,
                    x: -0.5,
                    y: 0.0,
                    z: 12.25,
                    yaw: -90.0,
                    hp: 0,
                },
            ],
        };

        let decoded = StateSnapshot::from_json(&state.to_json()).unwrap();
        assert_eq!(decoded.players.len(), 2);
        for (a, b) in state.players.iter().zip(decoded.players.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.hp, b.hp);
            assert_approx_eq!(a.x, b.x, 0.0006);
            assert_approx_eq!(a.y, b.y, 0.0006);
            assert_approx_eq!(a.z, b.z, 0.0006);
            assert_approx_eq!(a.yaw, b.yaw, 0.06);
        }
    }

    #[test]
    fn test_state_never_emits_invalid_numbers() {
        let state = StateSnapshot {
            players: vec![ActorSnapshot {
                id: 1,
                x: f32::NAN,
                y: f32::INFINITY,
                z: 0.0,
                yaw: 0.0,
                hp: 10,
            }],
        };
        assert!(StateSnapshot::from_json(&state.to_json()).is_ok());
    }

    #[test]
    fn test_empty_snapshots() {
        assert_eq!(StateSnapshot::default().to_json(), r#"{"players":[]}"#);
        assert_eq!(RoomSnapshot::default().to_line(), r#"ROOM|{"players":[]}"#);
    }

    #[test]
    fn test_malformed_snapshot_is_an_error() {
        assert!(StateSnapshot::from_json("{\"players\":[{\"id\":1}]}").is_err());
        assert!(RoomSnapshot::from_json("not json").is_err());
    }
}
