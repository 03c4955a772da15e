//! Authoritative fixed-tick simulation.
//!
//! Clients only send intent (latest movement sample, fire requests). Every
//! tick the server integrates positions, resolves hitscan shots, applies
//! damage and respawns, and produces the `STATE` snapshot everyone renders.
//!
//! Real frame time feeds an accumulator; one step runs per full tick interval
//! accumulated, so the step size stays constant however uneven the frames are.

use crate::config::{SimulationConfig, SpawnSelection};
use crate::physics::{hitscan, Aabb, Ray};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::protocol::Command;
use shared::{ActorSnapshot, InputSample, StateSnapshot, Vec3};
use std::collections::BTreeMap;

/// Slack for comparing elapsed simulation time against the fire cooldown.
const COOLDOWN_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct SimulatedActor {
    pub id: u32,
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub hp: i32,
    /// Latest sample received; replaced wholesale, never queued.
    pub input: Option<InputSample>,
    /// Simulation time of the last resolved shot.
    pub last_fire: Option<f64>,
    fire_pending: bool,
}

impl SimulatedActor {
    pub fn new(id: u32, position: Vec3, hp: i32) -> Self {
        Self {
            id,
            position,
            yaw: 0.0,
            pitch: 0.0,
            hp,
            input: None,
            last_fire: None,
            fire_pending: false,
        }
    }

    pub fn fire_pending(&self) -> bool {
        self.fire_pending
    }

    /// Applies damage, clamped at zero. Returns true when this hit killed.
    ///
    /// Non-positive amounts are ignored.
    pub fn take_damage(&mut self, amount: i32) -> bool {
        if amount <= 0 || self.hp <= 0 {
            return false;
        }
        self.hp = (self.hp - amount).max(0);
        self.hp == 0
    }

    pub fn snapshot(&self) -> ActorSnapshot {
        ActorSnapshot {
            id: self.id,
            x: self.position.x,
            y: self.position.y,
            z: self.position.z,
            yaw: self.yaw,
            hp: self.hp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitReport {
    pub shooter: u32,
    pub target: u32,
    pub damage: i32,
    pub remaining_hp: i32,
}

/// Everything one simulation step produced.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub tick: u64,
    /// Shots that passed the cooldown check, hit or not.
    pub shots: Vec<u32>,
    pub hits: Vec<HitReport>,
    pub respawns: Vec<u32>,
    pub snapshot: StateSnapshot,
}

pub struct AuthoritativeSimulator {
    config: SimulationConfig,
    actors: BTreeMap<u32, SimulatedActor>,
    accumulator: f64,
    tick: u64,
    sim_time: f64,
    spawn_cursor: usize,
    rng: StdRng,
}

impl AuthoritativeSimulator {
    pub fn new(config: SimulationConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic spawn selection for tests and replays.
    pub fn with_seed(config: SimulationConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: SimulationConfig, rng: StdRng) -> Self {
        Self {
            config,
            actors: BTreeMap::new(),
            accumulator: 0.0,
            tick: 0,
            sim_time: 0.0,
            spawn_cursor: 0,
            rng,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Creates one actor per participant, spread over the spawn points.
    ///
    /// Only called on the lobby to active transition; anyone joining later
    /// never gets an actor.
    pub fn spawn_initial(&mut self, participant_ids: &[u32]) {
        self.reset();

        for (i, id) in participant_ids.iter().enumerate() {
            let position = self.spawn_point_at(i);
            info!(
                "Spawned actor {} at ({:.2}, {:.2}, {:.2})",
                id, position.x, position.y, position.z
            );
            self.actors
                .insert(*id, SimulatedActor::new(*id, position, self.config.max_hp));
        }
    }

    pub fn actor(&self, id: u32) -> Option<&SimulatedActor> {
        self.actors.get(&id)
    }

    pub fn actors(&self) -> impl Iterator<Item = &SimulatedActor> {
        self.actors.values()
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Seconds of simulated time elapsed.
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    /// Frame time not yet consumed by a full tick.
    pub fn pending_time(&self) -> f64 {
        self.accumulator
    }

    /// Handles a gameplay command. Returns false for commands the simulator
    /// does not understand, so the caller can pass them on.
    pub fn handle_command(&mut self, from: u32, command: &str, payload: &str) -> bool {
        let Some(command) = Command::parse(command) else {
            return false;
        };

        match command {
            Command::Input | Command::InputWorld => {
                match InputSample::decode(command, payload) {
                    Some(Ok(sample)) => {
                        self.apply_input(from, sample);
                    }
                    Some(Err(e)) => debug!("Ignoring {} from {}: {}", command.as_str(), from, e),
                    None => {}
                }
                true
            }
            Command::Fire => {
                self.request_fire(from);
                true
            }
            _ => false,
        }
    }

    /// Stores the latest sample for an actor. Unknown IDs are ignored.
    pub fn apply_input(&mut self, from: u32, sample: InputSample) -> bool {
        match self.actors.get_mut(&from) {
            Some(actor) => {
                if sample.fire {
                    actor.fire_pending = true;
                }
                actor.input = Some(sample);
                true
            }
            None => false,
        }
    }

    /// Marks a shot to be resolved on the next tick.
    pub fn request_fire(&mut self, from: u32) -> bool {
        match self.actors.get_mut(&from) {
            Some(actor) => {
                actor.fire_pending = true;
                true
            }
            None => false,
        }
    }

    /// Feeds frame time and runs every full tick it covers.
    pub fn advance(&mut self, frame_dt: f32) -> Vec<TickReport> {
        let tick_dt = self.config.tick_interval() as f64;
        let mut reports = Vec::new();
        if tick_dt <= 0.0 || !frame_dt.is_finite() || frame_dt <= 0.0 {
            return reports;
        }

        self.accumulator += frame_dt as f64;
        while self.accumulator >= tick_dt {
            reports.push(self.step(tick_dt as f32));
            self.accumulator -= tick_dt;
        }

        reports
    }

    /// Runs one simulation step of `dt` seconds.
    pub fn step(&mut self, dt: f32) -> TickReport {
        self.tick += 1;
        self.sim_time += dt as f64;

        let speed = self.config.move_speed;
        for actor in self.actors.values_mut() {
            let Some(input) = actor.input else {
                continue;
            };

            let direction = input.movement_direction();
            actor.position = actor.position.add(&direction.scale(speed * dt));
            actor.yaw = input.yaw;
            actor.pitch = input.pitch;
        }

        let mut report = TickReport {
            tick: self.tick,
            shots: Vec::new(),
            hits: Vec::new(),
            respawns: Vec::new(),
            snapshot: StateSnapshot::default(),
        };
        self.resolve_fire(&mut report);
        report.snapshot = self.snapshot();

        report
    }

    fn resolve_fire(&mut self, report: &mut TickReport) {
        let shooters: Vec<u32> = self
            .actors
            .values()
            .filter(|a| a.fire_pending)
            .map(|a| a.id)
            .collect();

        for shooter_id in shooters {
            let now = self.sim_time;
            let cooldown = self.config.fire_cooldown as f64;

            let Some(shooter) = self.actors.get_mut(&shooter_id) else {
                continue;
            };
            shooter.fire_pending = false;

            let ready = shooter
                .last_fire
                .map_or(true, |last| now - last + COOLDOWN_EPSILON >= cooldown);
            if !ready {
                debug!("Actor {} fired during cooldown", shooter_id);
                continue;
            }
            shooter.last_fire = Some(now);

            let origin = shooter.position.add(&Vec3::UP.scale(self.config.eye_height));
            let ray = Ray::new(origin, Vec3::look_direction(shooter.yaw, shooter.pitch));
            report.shots.push(shooter_id);

            let (width, height) = (self.config.hitbox_width, self.config.hitbox_height);
            let targets: Vec<(u32, Aabb)> = self
                .actors
                .values()
                .map(|a| (a.id, Aabb::standing(a.position, width, height)))
                .collect();

            let Some(hit) = hitscan(&ray, self.config.max_fire_distance, targets, shooter_id)
            else {
                continue;
            };

            let damage = self.config.fire_damage;
            let Some(target) = self.actors.get_mut(&hit.target) else {
                continue;
            };
            let killed = target.take_damage(damage);
            report.hits.push(HitReport {
                shooter: shooter_id,
                target: hit.target,
                damage,
                remaining_hp: target.hp,
            });
            debug!(
                "Actor {} hit {} at {:.2}m, hp {}",
                shooter_id, hit.target, hit.distance, target.hp
            );

            if killed {
                self.respawn(hit.target);
                report.respawns.push(hit.target);
            }
        }
    }

    fn respawn(&mut self, id: u32) {
        let position = self.next_spawn_point();
        let max_hp = self.config.max_hp;
        if let Some(actor) = self.actors.get_mut(&id) {
            actor.position = position;
            actor.yaw = 0.0;
            actor.pitch = 0.0;
            actor.hp = max_hp;
            actor.input = None;
            actor.fire_pending = false;
            info!(
                "Actor {} respawned at ({:.2}, {:.2}, {:.2})",
                id, position.x, position.y, position.z
            );
        }
    }

    fn spawn_point_at(&self, index: usize) -> Vec3 {
        let points = &self.config.spawn_points;
        if points.is_empty() {
            return Vec3::ZERO;
        }
        points[index % points.len()]
    }

    fn next_spawn_point(&mut self) -> Vec3 {
        let count = self.config.spawn_points.len();
        if count == 0 {
            return Vec3::ZERO;
        }

        let index = match self.config.spawn_selection {
            SpawnSelection::RoundRobin => {
                let index = self.spawn_cursor % count;
                self.spawn_cursor = (self.spawn_cursor + 1) % count;
                index
            }
            SpawnSelection::Random => self.rng.gen_range(0..count),
        };
        self.config.spawn_points[index]
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            players: self.actors.values().map(SimulatedActor::snapshot).collect(),
        }
    }

    /// Drops every actor and rewinds the clock.
    pub fn reset(&mut self) {
        self.actors.clear();
        self.accumulator = 0.0;
        self.tick = 0;
        self.sim_time = 0.0;
        self.spawn_cursor = 0;
    }
}
