use serde::{Deserialize, Serialize};

///Represents a vector in 3D world space.
/// Y is up, Z is forward at yaw 0, X is right at yaw 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const UP: Vec3 = Vec3 {
        x: 0.0,
        y: 1.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Vec3 { x, y, z }
    }

    ///Returns the squared magnitude of the vector.
    pub fn sqr_magnitude(&self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    ///Returns the magnitude of the vector.
    pub fn magnitude(&self) -> f32 {
        self.sqr_magnitude().sqrt()
    }

    ///Returns the normalized vector, or zero for a zero-length vector.
    pub fn normalize(&self) -> Vec3 {
        let mag = self.magnitude();
        if mag == 0.0 {
            Vec3::ZERO
        } else {
            self.scale(1.0 / mag)
        }
    }

    ///Returns the scaled vector.
    pub fn scale(&self, scalar: f32) -> Vec3 {
        Vec3 {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
        }
    }

    ///Returns the sum of two vectors.
    pub fn add(&self, other: &Vec3) -> Vec3 {
        Vec3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }

    ///Returns the difference of two vectors.
    pub fn sub(&self, other: &Vec3) -> Vec3 {
        Vec3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }

    pub fn dot(&self, other: &Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Horizontal unit vector a body with the given yaw (degrees) faces.
    pub fn forward_from_yaw(yaw_deg: f32) -> Vec3 {
        let yaw = yaw_deg.to_radians();
        Vec3::new(yaw.sin(), 0.0, yaw.cos())
    }

    /// Horizontal unit vector to the right of a body with the given yaw.
    pub fn right_from_yaw(yaw_deg: f32) -> Vec3 {
        let yaw = yaw_deg.to_radians();
        Vec3::new(yaw.cos(), 0.0, -yaw.sin())
    }

    /// Look direction for yaw/pitch in degrees. Positive pitch looks down.
    pub fn look_direction(yaw_deg: f32, pitch_deg: f32) -> Vec3 {
        let yaw = yaw_deg.to_radians();
        let pitch = pitch_deg.to_radians();
        let horizontal = pitch.cos();
        Vec3::new(yaw.sin() * horizontal, -pitch.sin(), yaw.cos() * horizontal)
    }
}
