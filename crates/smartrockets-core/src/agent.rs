//! Point-mass agents driven by a genome of per-step forces.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::{Environment, Genome, Vec2};

/// Distance at which an agent counts as having reached the target.
pub const ARRIVAL_RADIUS: f32 = 10.0;

/// Lifecycle state of an agent within one generation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum AgentStatus {
    #[default]
    Active,
    Completed,
    Crashed,
}

impl AgentStatus {
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Read-only view handed to presentation layers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AgentSnapshot {
    pub position: Vec2,
    pub status: AgentStatus,
}

/// A simulated rocket: physical state plus the genome steering it.
#[derive(Debug, Clone)]
pub struct Agent {
    position: Vec2,
    velocity: Vec2,
    acceleration: Vec2,
    genome: Genome,
    frozen_step: Option<usize>,
    status: AgentStatus,
    fitness: f32,
}

impl Agent {
    /// Fresh agent at rest at `start`.
    #[must_use]
    pub fn new(start: Vec2, genome: Genome) -> Self {
        Self {
            position: start,
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            genome,
            frozen_step: None,
            status: AgentStatus::Active,
            fitness: 0.0,
        }
    }

    /// Fresh agent with a randomly sampled genome of `lifespan` genes.
    #[must_use]
    pub fn random(start: Vec2, lifespan: usize, rng: &mut dyn RngCore) -> Self {
        Self::new(start, Genome::random(lifespan, rng))
    }

    /// Advance one step. Terminal agents are left untouched.
    pub fn update(&mut self, step: usize, env: &Environment) {
        if !self.status.is_active() {
            return;
        }
        if let Some(force) = self.genome.gene(step) {
            self.acceleration += force;
        }
        self.velocity += self.acceleration;
        self.position += self.velocity;
        self.acceleration = Vec2::ZERO;

        if self.position.distance(env.target) < ARRIVAL_RADIUS {
            self.status = AgentStatus::Completed;
            self.position = env.target;
            self.frozen_step = Some(step);
        } else if env.obstacle.contains(self.position)
            || !env.bounds.contains_interior(self.position)
        {
            self.status = AgentStatus::Crashed;
            self.frozen_step = Some(step);
        }
    }

    /// Score the agent against `target`, storing and returning the result.
    ///
    /// Closer is better; arriving adds a bonus that grows the earlier the agent froze,
    /// crashing divides the score by ten. The result is always strictly positive.
    pub fn calc_fitness(&mut self, target: Vec2) -> f32 {
        let distance = self.position.distance(target);
        let mut fitness = 1.0 / (distance + 1.0);
        match self.status {
            AgentStatus::Completed => {
                let lifespan = self.genome.len() as f32;
                let frozen = self.frozen_step.unwrap_or_default() as f32;
                fitness *= 10.0 + (lifespan - frozen) / 10.0;
            }
            AgentStatus::Crashed => fitness /= 10.0,
            AgentStatus::Active => {}
        }
        self.fitness = fitness;
        fitness
    }

    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    #[must_use]
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    #[must_use]
    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    /// Step at which the agent stopped updating, if it has.
    #[must_use]
    pub fn frozen_step(&self) -> Option<usize> {
        self.frozen_step
    }

    #[must_use]
    pub fn status(&self) -> AgentStatus {
        self.status
    }

    /// Fitness from the most recent evaluation; zero before the first one.
    #[must_use]
    pub fn fitness(&self) -> f32 {
        self.fitness
    }

    #[must_use]
    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            position: self.position,
            status: self.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Rect;

    fn open_field() -> Environment {
        Environment {
            target: Vec2::new(50.0, 10.0),
            obstacle: Rect::new(0.0, 0.0, 0.0, 0.0),
            bounds: Rect::new(0.0, 0.0, 100.0, 100.0),
        }
    }

    fn parked(position: Vec2, status: AgentStatus, frozen_step: Option<usize>) -> Agent {
        let mut agent = Agent::new(position, Genome::constant(Vec2::ZERO, 100));
        agent.status = status;
        agent.frozen_step = frozen_step;
        agent
    }

    #[test]
    fn integrates_force_into_velocity_and_position() {
        let mut agent = Agent::new(Vec2::new(50.0, 50.0), Genome::constant(Vec2::new(1.0, 0.0), 5));
        let env = open_field();
        agent.update(0, &env);
        agent.update(1, &env);
        assert_eq!(agent.velocity(), Vec2::new(2.0, 0.0));
        assert_eq!(agent.position(), Vec2::new(53.0, 50.0));
        assert_eq!(agent.status(), AgentStatus::Active);
    }

    #[test]
    fn coasts_once_genome_is_exhausted() {
        let mut agent = Agent::new(Vec2::new(50.0, 50.0), Genome::constant(Vec2::new(1.0, 0.0), 1));
        let env = open_field();
        agent.update(0, &env);
        agent.update(1, &env);
        agent.update(2, &env);
        assert_eq!(agent.velocity(), Vec2::new(1.0, 0.0));
        assert_eq!(agent.position(), Vec2::new(53.0, 50.0));
    }

    #[test]
    fn arrives_on_first_tick_when_spawned_near_target() {
        let env = open_field();
        let mut agent = Agent::new(Vec2::new(50.0, 15.0), Genome::constant(Vec2::ZERO, 10));
        agent.update(0, &env);
        assert_eq!(agent.status(), AgentStatus::Completed);
        assert_eq!(agent.frozen_step(), Some(0));
        assert_eq!(agent.position(), env.target);
    }

    #[test]
    fn crashes_into_obstacle_and_stays_frozen() {
        let env = Environment {
            target: Vec2::new(90.0, 10.0),
            obstacle: Rect::new(40.0, 50.0, 20.0, 10.0),
            bounds: Rect::new(0.0, 0.0, 100.0, 100.0),
        };
        let mut agent = Agent::new(Vec2::new(50.0, 90.0), Genome::constant(Vec2::new(0.0, -1.0), 20));
        for step in 0..7 {
            agent.update(step, &env);
            assert_eq!(agent.status(), AgentStatus::Active, "step {step}");
        }
        agent.update(7, &env);
        assert_eq!(agent.status(), AgentStatus::Crashed);
        assert_eq!(agent.frozen_step(), Some(7));
        assert_eq!(agent.position(), Vec2::new(50.0, 54.0));

        let (position, velocity) = (agent.position(), agent.velocity());
        for step in 8..20 {
            agent.update(step, &env);
        }
        assert_eq!(agent.status(), AgentStatus::Crashed);
        assert_eq!(agent.frozen_step(), Some(7));
        assert_eq!(agent.position(), position);
        assert_eq!(agent.velocity(), velocity);
    }

    #[test]
    fn completed_agent_stays_parked_on_target() {
        let env = open_field();
        let mut agent = Agent::new(Vec2::new(50.0, 25.0), Genome::constant(Vec2::new(0.0, -3.0), 10));
        agent.update(0, &env);
        assert_eq!(agent.status(), AgentStatus::Active);
        agent.update(1, &env);
        assert_eq!(agent.status(), AgentStatus::Completed);
        assert_eq!(agent.frozen_step(), Some(1));
        assert_eq!(agent.position(), env.target);

        let velocity = agent.velocity();
        for step in 2..10 {
            agent.update(step, &env);
        }
        assert_eq!(agent.status(), AgentStatus::Completed);
        assert_eq!(agent.frozen_step(), Some(1));
        assert_eq!(agent.position(), env.target);
        assert_eq!(agent.velocity(), velocity);
    }

    #[test]
    fn leaving_bounds_is_a_crash() {
        let env = open_field();
        let mut agent = Agent::new(Vec2::new(98.0, 50.0), Genome::constant(Vec2::new(3.0, 0.0), 4));
        agent.update(0, &env);
        assert_eq!(agent.status(), AgentStatus::Crashed);
        assert_eq!(agent.frozen_step(), Some(0));
    }

    #[test]
    fn arrival_wins_over_boundary_crash() {
        let env = Environment {
            target: Vec2::new(2.0, 50.0),
            ..open_field()
        };
        let mut agent = Agent::new(Vec2::new(4.0, 50.0), Genome::constant(Vec2::new(-4.5, 0.0), 4));
        agent.update(0, &env);
        assert_eq!(agent.status(), AgentStatus::Completed);
    }

    #[test]
    fn fitness_decreases_with_distance() {
        let target = Vec2::new(0.0, 0.0);
        let mut near = parked(Vec2::new(3.0, 4.0), AgentStatus::Active, None);
        let mut far = parked(Vec2::new(30.0, 40.0), AgentStatus::Active, None);
        let near_fitness = near.calc_fitness(target);
        assert!((near_fitness - 1.0 / 6.0).abs() < 1e-6);
        assert!(near_fitness > far.calc_fitness(target));
    }

    #[test]
    fn earlier_arrival_scores_higher() {
        let target = Vec2::new(10.0, 10.0);
        let mut early = parked(target, AgentStatus::Completed, Some(20));
        let mut late = parked(target, AgentStatus::Completed, Some(80));
        let early_fitness = early.calc_fitness(target);
        assert!((early_fitness - 18.0).abs() < 1e-5);
        assert!(early_fitness > late.calc_fitness(target));
    }

    #[test]
    fn crash_is_penalized() {
        let target = Vec2::new(0.0, 0.0);
        let position = Vec2::new(6.0, 8.0);
        let mut crashed = parked(position, AgentStatus::Crashed, Some(3));
        let mut active = parked(position, AgentStatus::Active, None);
        let crashed_fitness = crashed.calc_fitness(target);
        assert!(crashed_fitness > 0.0);
        assert!(crashed_fitness < active.calc_fitness(target));
        assert_eq!(crashed.fitness(), crashed_fitness);
    }
}
