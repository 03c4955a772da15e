//! Turns raw device values into the input sample sent to the server

use shared::{InputSample, Movement};

pub const DEFAULT_MOUSE_SENSITIVITY: f32 = 3.0;
pub const DEFAULT_PITCH_LIMIT: f32 = 80.0;

/// Accumulates look deltas and movement axes between sends
#[derive(Debug, Clone)]
pub struct InputSampler {
    yaw: f32,
    pitch: f32,
    axis_x: f32,
    axis_y: f32,
    sensitivity: f32,
    pitch_limit: f32,
    legacy: bool,
}

impl InputSampler {
    pub fn new(sensitivity: f32, pitch_limit: f32) -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            axis_x: 0.0,
            axis_y: 0.0,
            sensitivity,
            pitch_limit: pitch_limit.abs(),
            legacy: false,
        }
    }

    /// Produce `INPUT` samples with local axes instead of `INPUTW`
    pub fn set_legacy(&mut self, legacy: bool) {
        self.legacy = legacy;
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Applies a mouse delta. Moving the mouse up looks up, which is negative pitch.
    pub fn look(&mut self, delta_x: f32, delta_y: f32) {
        self.yaw = (self.yaw + delta_x * self.sensitivity).rem_euclid(360.0);
        self.pitch = (self.pitch - delta_y * self.sensitivity)
            .clamp(-self.pitch_limit, self.pitch_limit);
    }

    /// Sets the absolute view angles, e.g. after a respawn.
    pub fn set_view(&mut self, yaw: f32, pitch: f32) {
        self.yaw = yaw.rem_euclid(360.0);
        self.pitch = pitch.clamp(-self.pitch_limit, self.pitch_limit);
    }

    /// Strafe (`x`) and forward (`y`) axes, each clamped to [-1, 1]
    pub fn set_axes(&mut self, x: f32, y: f32) {
        self.axis_x = x.clamp(-1.0, 1.0);
        self.axis_y = y.clamp(-1.0, 1.0);
    }

    pub fn sample(&self, fire: bool) -> InputSample {
        let mut sample = if self.legacy {
            InputSample {
                movement: Movement::Local {
                    x: self.axis_x,
                    y: self.axis_y,
                },
                yaw: self.yaw,
                pitch: self.pitch,
                fire: false,
            }
        } else {
            InputSample::world_from_axes(self.axis_x, self.axis_y, self.yaw, self.pitch)
        };
        sample.fire = fire;
        sample
    }
}

impl Default for InputSampler {
    fn default() -> Self {
        Self::new(DEFAULT_MOUSE_SENSITIVITY, DEFAULT_PITCH_LIMIT)
    }
}
