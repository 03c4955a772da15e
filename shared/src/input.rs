//! Input samples sent by clients.
//!
//! Two payload variants exist on the wire:
//!
//! - `INPUTW|wx,wz,yaw,pitch[,fire]` carries a movement direction the client
//!   already rotated into world space. This is the canonical variant.
//! - `INPUT|mx,my,yaw,pitch[,fire]` carries raw local axes that the server
//!   rotates by yaw. Kept for older clients.
//!
//! Both decode into one [`InputSample`]. A sample replaces the previous one
//! wholesale; there is no sequencing.

use crate::error::PayloadError;
use crate::math::Vec3;
use crate::protocol::{format_line, parse_f32_or_zero, Command};

/// Movement below this squared length is left as-is instead of normalized.
const MIN_NORMALIZE_SQR: f32 = 0.0001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Movement {
    /// Strafe (`x`, A/D) and forward (`y`, W/S) axes in `[-1, 1]`.
    Local { x: f32, y: f32 },
    /// Horizontal world-space direction, already normalized by the client.
    World { x: f32, z: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputSample {
    pub movement: Movement,
    /// Degrees around the vertical axis.
    pub yaw: f32,
    /// Degrees, positive looks down.
    pub pitch: f32,
    pub fire: bool,
}

impl Default for InputSample {
    fn default() -> Self {
        Self {
            movement: Movement::World { x: 0.0, z: 0.0 },
            yaw: 0.0,
            pitch: 0.0,
            fire: false,
        }
    }
}

impl InputSample {
    pub fn command(&self) -> Command {
        match self.movement {
            Movement::Local { .. } => Command::Input,
            Movement::World { .. } => Command::InputWorld,
        }
    }

    /// Comma-separated payload with fixed decimals (3 for movement, 1 for angles).
    pub fn encode_payload(&self) -> String {
        match self.movement {
            Movement::Local { x, y } => format!(
                "{:.3},{:.3},{:.1},{:.1},{}",
                x,
                y,
                self.yaw,
                self.pitch,
                if self.fire { 1 } else { 0 }
            ),
            Movement::World { x, z } => {
                let mut payload = format!("{:.3},{:.3},{:.1},{:.1}", x, z, self.yaw, self.pitch);
                if self.fire {
                    payload.push_str(",1");
                }
                payload
            }
        }
    }

    pub fn to_line(&self) -> String {
        format_line(self.command().as_str(), &self.encode_payload())
    }

    /// Decodes an `INPUT` or `INPUTW` payload.
    ///
    /// Returns `None` for any other command. Too few fields is an error; a
    /// field that fails to parse reads as zero.
    pub fn decode(command: Command, payload: &str) -> Option<Result<Self, PayloadError>> {
        let local = match command {
            Command::Input => true,
            Command::InputWorld => false,
            _ => return None,
        };

        let parts: Vec<&str> = payload.split(',').collect();
        if parts.len() < 4 {
            return Some(Err(PayloadError::MissingFields {
                expected: 4,
                found: parts.len(),
            }));
        }

        let a = parse_f32_or_zero(parts[0]);
        let b = parse_f32_or_zero(parts[1]);
        let movement = if local {
            Movement::Local { x: a, y: b }
        } else {
            Movement::World { x: a, z: b }
        };
        let fire = parts
            .get(4)
            .map(|f| f.trim().parse::<i32>().unwrap_or(0) == 1)
            .unwrap_or(false);

        Some(Ok(Self {
            movement,
            yaw: parse_f32_or_zero(parts[2]),
            pitch: parse_f32_or_zero(parts[3]),
            fire,
        }))
    }

    /// Horizontal movement direction in world space.
    ///
    /// Local axes are rotated by the sample's yaw and normalized so diagonal
    /// movement is not faster; world directions are taken as sent.
    pub fn movement_direction(&self) -> Vec3 {
        match self.movement {
            Movement::Local { x, y } => {
                let wish = Vec3::right_from_yaw(self.yaw)
                    .scale(x)
                    .add(&Vec3::forward_from_yaw(self.yaw).scale(y));
                if wish.sqr_magnitude() > MIN_NORMALIZE_SQR {
                    wish.normalize()
                } else {
                    wish
                }
            }
            Movement::World { x, z } => Vec3::new(x, 0.0, z),
        }
    }

    /// Builds the canonical world-space sample from local axes and a yaw.
    pub fn world_from_axes(axis_x: f32, axis_y: f32, yaw: f32, pitch: f32) -> Self {
        let local = Self {
            movement: Movement::Local {
                x: axis_x,
                y: axis_y,
            },
            yaw,
            pitch,
            fire: false,
        };
        let dir = local.movement_direction();
        Self {
            movement: Movement::World { x: dir.x, z: dir.z },
            ..local
        }
    }
}
