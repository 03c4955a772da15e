//! Tunables for the session server.
//!
//! The binary fills these from command-line arguments; tests build them
//! directly and override single fields.

use shared::{
    Vec3, DEFAULT_PORT, EYE_HEIGHT, FIRE_COOLDOWN, FIRE_DAMAGE, MAX_FIRE_DISTANCE, MAX_HP,
    MOVE_SPEED, ROOM_BROADCAST_INTERVAL, TICK_RATE,
};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Address the listener binds to.
    pub host: String,
    pub port: u16,
    /// Seconds between unsolicited `ROOM` broadcasts.
    pub room_broadcast_interval: f32,
    /// List the hosting process as participant 0.
    pub include_host_in_room: bool,
    pub host_name: String,
    /// Connections beyond this are closed right after accept.
    pub max_clients: usize,
}

impl SessionConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            room_broadcast_interval: ROOM_BROADCAST_INTERVAL,
            include_host_in_room: true,
            host_name: "Host".to_string(),
            max_clients: 16,
        }
    }
}

/// How a respawning actor picks its spawn point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnSelection {
    RoundRobin,
    Random,
}

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Simulation steps per second.
    pub tick_rate: f32,
    /// Metres per second.
    pub move_speed: f32,
    /// Minimum seconds between two resolved shots of one actor.
    pub fire_cooldown: f32,
    pub fire_damage: i32,
    pub max_fire_distance: f32,
    pub max_hp: i32,
    /// Ray origin height above an actor's position.
    pub eye_height: f32,
    pub hitbox_width: f32,
    pub hitbox_height: f32,
    pub spawn_points: Vec<Vec3>,
    pub spawn_selection: SpawnSelection,
}

impl SimulationConfig {
    pub fn tick_interval(&self) -> f32 {
        1.0 / self.tick_rate
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_rate: TICK_RATE,
            move_speed: MOVE_SPEED,
            fire_cooldown: FIRE_COOLDOWN,
            fire_damage: FIRE_DAMAGE,
            max_fire_distance: MAX_FIRE_DISTANCE,
            max_hp: MAX_HP,
            eye_height: EYE_HEIGHT,
            hitbox_width: 0.8,
            hitbox_height: 1.8,
            spawn_points: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(10.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, 10.0),
                Vec3::new(10.0, 0.0, 10.0),
            ],
            spawn_selection: SpawnSelection::RoundRobin,
        }
    }
}

/// Parses `x,y,z` into a spawn point.
pub fn parse_spawn_point(text: &str) -> Result<Vec3, String> {
    let parts: Vec<&str> = text.split(',').collect();
    if parts.len() != 3 {
        return Err(format!("expected x,y,z but got '{}'", text));
    }

    let mut coords = [0.0f32; 3];
    for (slot, part) in coords.iter_mut().zip(parts.iter()) {
        *slot = part
            .trim()
            .parse::<f32>()
            .map_err(|e| format!("invalid coordinate '{}': {}", part, e))?;
    }
    Ok(Vec3::new(coords[0], coords[1], coords[2]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let session = SessionConfig::default();
        assert_eq!(session.bind_address(), "0.0.0.0:7777");
        assert_eq!(session.room_broadcast_interval, 0.5);
        assert!(session.include_host_in_room);

        let sim = SimulationConfig::default();
        assert!((sim.tick_interval() - 0.05).abs() < 1e-6);
        assert_eq!(sim.fire_cooldown, 0.12);
        assert_eq!(sim.max_hp, 100);
        assert!(!sim.spawn_points.is_empty());
    }

    #[test]
    fn test_parse_spawn_point() {
        assert_eq!(
            parse_spawn_point("1.5, 0,-2").unwrap(),
            Vec3::new(1.5, 0.0, -2.0)
        );
        assert!(parse_spawn_point("1,2").is_err());
        assert!(parse_spawn_point("a,b,c").is_err());
    }
}
