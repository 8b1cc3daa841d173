//! Core types for the smart rockets genetic-algorithm simulation.

use rand::{SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Sub};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

pub mod agent;
pub mod genome;
pub mod population;
pub mod simulation;

pub use agent::{ARRIVAL_RADIUS, Agent, AgentSnapshot, AgentStatus};
pub use genome::Genome;
pub use population::Population;
pub use simulation::{GenerationSink, NullSink, Simulation, TickEvents};

/// Plain 2D vector used for positions, velocities and genome forces.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Construct a new vector.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean length.
    #[must_use]
    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    /// Euclidean distance between two points.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (other - self).length()
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned rectangle anchored at its top-left corner.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Half-open containment: the left/top edges are inside, the right/bottom edges are not.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x
            && point.x < self.x + self.width
            && point.y >= self.y
            && point.y < self.y + self.height
    }

    /// Strict containment: every edge counts as outside.
    #[must_use]
    pub fn contains_interior(&self, point: Vec2) -> bool {
        point.x > self.x
            && point.x < self.x + self.width
            && point.y > self.y
            && point.y < self.y + self.height
    }

    /// Returns the same rectangle moved so its corner sits at `(x, y)`.
    #[must_use]
    pub const fn moved_to(self, x: f32, y: f32) -> Self {
        Self { x, y, ..self }
    }
}

/// Per-tick view of the world an agent moves through.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Environment {
    pub target: Vec2,
    pub obstacle: Rect,
    pub bounds: Rect,
}

impl Environment {
    /// Copy of this environment with a different obstacle.
    #[must_use]
    pub const fn with_obstacle(self, obstacle: Rect) -> Self {
        Self { obstacle, ..self }
    }
}

/// Obstacle rectangle shared with an input collaborator.
///
/// One writer moves the rectangle; the run loop takes a single [`snapshot`](Self::snapshot)
/// per tick so every agent in that tick sees the same position.
#[derive(Debug, Clone, Default)]
pub struct SharedObstacle {
    inner: Arc<RwLock<Rect>>,
}

impl SharedObstacle {
    #[must_use]
    pub fn new(rect: Rect) -> Self {
        Self {
            inner: Arc::new(RwLock::new(rect)),
        }
    }

    /// Current obstacle rectangle.
    #[must_use]
    pub fn snapshot(&self) -> Rect {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move the obstacle's corner to `(x, y)`, keeping its size.
    pub fn move_to(&self, x: f32, y: f32) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = guard.moved_to(x, y);
    }

    /// Shift the obstacle by `delta`.
    pub fn translate(&self, delta: Vec2) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.x += delta.x;
        guard.y += delta.y;
    }
}

/// Generation counter (monotonic across reproductions).
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct Generation(pub u32);

impl Generation {
    /// Advances to the next generation.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Record emitted once per completed lifespan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GenerationSummary {
    pub generation: Generation,
    pub max_fitness: f32,
    pub avg_fitness: f32,
    /// Agents that reached the target.
    pub completed: usize,
    /// Agents that hit the obstacle or left the world.
    pub crashed: usize,
    /// Number of entries in the mating pool built for this generation.
    pub mating_pool_size: usize,
}

/// Errors raised by the simulation core.
#[derive(Debug, Error, PartialEq)]
pub enum SimulationError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// Reproduction was requested before a mating pool was built.
    #[error("mating pool is empty; evaluate the population before reproducing")]
    EmptyMatingPool,
}

/// Static configuration for a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    /// Width of the world in world units.
    pub world_width: f32,
    /// Height of the world in world units.
    pub world_height: f32,
    /// Number of agents per generation.
    pub population_size: usize,
    /// Steps per generation; also the genome length.
    pub lifespan: usize,
    /// Per-gene probability of replacement during reproduction.
    pub mutation_rate: f32,
    /// Spawn point for every agent.
    pub start: Vec2,
    /// Point the agents are trying to reach.
    pub target: Vec2,
    /// Initial obstacle rectangle.
    pub obstacle: Rect,
    /// Optional RNG seed for reproducible runs.
    pub rng_seed: Option<u64>,
    /// Maximum number of generation summaries retained in-memory.
    pub history_capacity: usize,
    /// High watermark for queued telemetry summaries.
    pub telemetry_capacity: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            world_width: 800.0,
            world_height: 600.0,
            population_size: 150,
            lifespan: 300,
            mutation_rate: 0.02,
            start: Vec2::new(400.0, 590.0),
            target: Vec2::new(400.0, 50.0),
            obstacle: Rect::new(300.0, 300.0, 200.0, 20.0),
            rng_seed: None,
            history_capacity: 256,
            telemetry_capacity: 64,
        }
    }
}

impl SimConfig {
    /// Checks every parameter, failing on the first invalid one.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !(self.world_width.is_finite() && self.world_height.is_finite())
            || self.world_width <= 0.0
            || self.world_height <= 0.0
        {
            return Err(SimulationError::InvalidConfig(
                "world dimensions must be positive and finite",
            ));
        }
        if self.population_size == 0 {
            return Err(SimulationError::InvalidConfig(
                "population_size must be non-zero",
            ));
        }
        if self.lifespan == 0 {
            return Err(SimulationError::InvalidConfig("lifespan must be non-zero"));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(SimulationError::InvalidConfig(
                "mutation_rate must be within [0, 1]",
            ));
        }
        if !self.bounds().contains_interior(self.start) {
            return Err(SimulationError::InvalidConfig(
                "start must lie inside the world bounds",
            ));
        }
        if !(self.target.x.is_finite() && self.target.y.is_finite()) {
            return Err(SimulationError::InvalidConfig("target must be finite"));
        }
        if self.obstacle.width < 0.0 || self.obstacle.height < 0.0 {
            return Err(SimulationError::InvalidConfig(
                "obstacle size must be non-negative",
            ));
        }
        if self.history_capacity == 0 {
            return Err(SimulationError::InvalidConfig(
                "history_capacity must be non-zero",
            ));
        }
        if self.telemetry_capacity == 0 {
            return Err(SimulationError::InvalidConfig(
                "telemetry_capacity must be non-zero",
            ));
        }
        Ok(())
    }

    /// World bounds as a rectangle anchored at the origin.
    #[must_use]
    pub const fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.world_width, self.world_height)
    }

    /// Environment built from the configured target, obstacle and bounds.
    #[must_use]
    pub const fn environment(&self) -> Environment {
        Environment {
            target: self.target,
            obstacle: self.obstacle,
            bounds: self.bounds(),
        }
    }

    /// Returns the configured RNG, generating a seed from entropy if absent.
    pub(crate) fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(SimConfig::default().validate(), Ok(()));
    }

    #[test]
    fn validation_rejects_degenerate_runs() {
        let cases = [
            (
                SimConfig {
                    lifespan: 0,
                    ..SimConfig::default()
                },
                "lifespan must be non-zero",
            ),
            (
                SimConfig {
                    population_size: 0,
                    ..SimConfig::default()
                },
                "population_size must be non-zero",
            ),
            (
                SimConfig {
                    mutation_rate: 1.5,
                    ..SimConfig::default()
                },
                "mutation_rate must be within [0, 1]",
            ),
            (
                SimConfig {
                    mutation_rate: -0.1,
                    ..SimConfig::default()
                },
                "mutation_rate must be within [0, 1]",
            ),
            (
                SimConfig {
                    start: Vec2::new(900.0, 10.0),
                    ..SimConfig::default()
                },
                "start must lie inside the world bounds",
            ),
            (
                SimConfig {
                    world_width: f32::NAN,
                    ..SimConfig::default()
                },
                "world dimensions must be positive and finite",
            ),
        ];
        for (config, message) in cases {
            assert_eq!(
                config.validate(),
                Err(SimulationError::InvalidConfig(message))
            );
        }
    }

    #[test]
    fn partial_json_config_keeps_defaults() {
        let config: SimConfig =
            serde_json::from_str(r#"{ "lifespan": 40, "rng_seed": 7 }"#).expect("config");
        assert_eq!(config.lifespan, 40);
        assert_eq!(config.rng_seed, Some(7));
        assert_eq!(config.population_size, SimConfig::default().population_size);
    }

    #[test]
    fn rect_edges_follow_half_open_rule() {
        let rect = Rect::new(10.0, 10.0, 5.0, 5.0);
        assert!(rect.contains(Vec2::new(10.0, 10.0)));
        assert!(!rect.contains(Vec2::new(15.0, 12.0)));
        assert!(!rect.contains_interior(Vec2::new(10.0, 12.0)));
        assert!(rect.contains_interior(Vec2::new(12.0, 12.0)));
    }

    #[test]
    fn shared_obstacle_snapshots_latest_write() {
        let obstacle = SharedObstacle::new(Rect::new(0.0, 0.0, 4.0, 2.0));
        let writer = obstacle.clone();
        writer.move_to(10.0, 20.0);
        writer.translate(Vec2::new(1.0, -1.0));
        assert_eq!(obstacle.snapshot(), Rect::new(11.0, 19.0, 4.0, 2.0));
    }
}
