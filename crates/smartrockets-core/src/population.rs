//! Fitness-proportionate selection and reproduction over a fixed-size population.

use rand::{Rng, RngCore};
use tracing::{debug, warn};

use crate::{
    Agent, AgentStatus, Generation, GenerationSummary, Genome, SimConfig, SimulationError, Vec2,
};

/// Pool entries granted to the fittest agent; everyone else scales against it.
pub const POOL_RESOLUTION: f32 = 100.0;

/// Number of mating-pool entries earned by `fitness` relative to `max_fitness`.
#[must_use]
pub fn pool_share(fitness: f32, max_fitness: f32) -> usize {
    (fitness / max_fitness * POOL_RESOLUTION).floor() as usize
}

/// Fixed-size set of agents for the current generation plus its mating pool.
#[derive(Debug, Clone)]
pub struct Population {
    agents: Vec<Agent>,
    /// Indices into `agents`, repeated in proportion to fitness.
    mating_pool: Vec<usize>,
    generation: Generation,
    max_fitness: f32,
    avg_fitness: f32,
    start: Vec2,
    lifespan: usize,
    mutation_rate: f32,
}

impl Population {
    /// Seed a generation-zero population with random genomes.
    pub fn new(config: &SimConfig, rng: &mut dyn RngCore) -> Result<Self, SimulationError> {
        config.validate()?;
        let agents = (0..config.population_size)
            .map(|_| Agent::random(config.start, config.lifespan, rng))
            .collect();
        Ok(Self::from_parts(config, agents))
    }

    /// Build a population from explicit agents.
    ///
    /// Every genome must match the configured lifespan and the agent count must match
    /// the configured population size.
    pub fn with_agents(config: &SimConfig, agents: Vec<Agent>) -> Result<Self, SimulationError> {
        config.validate()?;
        if agents.len() != config.population_size {
            return Err(SimulationError::InvalidConfig(
                "agent count must equal population_size",
            ));
        }
        if agents
            .iter()
            .any(|agent| agent.genome().len() != config.lifespan)
        {
            return Err(SimulationError::InvalidConfig(
                "every genome must have lifespan genes",
            ));
        }
        Ok(Self::from_parts(config, agents))
    }

    fn from_parts(config: &SimConfig, agents: Vec<Agent>) -> Self {
        Self {
            agents,
            mating_pool: Vec::new(),
            generation: Generation::default(),
            max_fitness: 0.0,
            avg_fitness: 0.0,
            start: config.start,
            lifespan: config.lifespan,
            mutation_rate: config.mutation_rate,
        }
    }

    /// Score every agent and rebuild the mating pool.
    pub fn evaluate(&mut self, target: Vec2) -> GenerationSummary {
        let mut max_fitness = 0.0_f32;
        let mut total_fitness = 0.0_f32;
        for agent in &mut self.agents {
            let fitness = agent.calc_fitness(target);
            total_fitness += fitness;
            max_fitness = max_fitness.max(fitness);
        }
        self.max_fitness = max_fitness;
        self.avg_fitness = total_fitness / self.agents.len() as f32;

        self.mating_pool.clear();
        if max_fitness.is_finite() && max_fitness > 0.0 {
            for (index, agent) in self.agents.iter().enumerate() {
                let share = pool_share(agent.fitness(), max_fitness);
                self.mating_pool.extend(std::iter::repeat_n(index, share));
            }
        }
        if self.mating_pool.is_empty() {
            warn!(
                generation = self.generation.0,
                max_fitness, "degenerate fitness; falling back to uniform mating pool"
            );
            self.mating_pool.extend(0..self.agents.len());
        }

        let summary = GenerationSummary {
            generation: self.generation,
            max_fitness: self.max_fitness,
            avg_fitness: self.avg_fitness,
            completed: self.count_status(AgentStatus::Completed),
            crashed: self.count_status(AgentStatus::Crashed),
            mating_pool_size: self.mating_pool.len(),
        };
        debug!(?summary, "evaluated population");
        summary
    }

    /// Replace every agent with a child bred from the mating pool.
    pub fn reproduce(&mut self, rng: &mut dyn RngCore) -> Result<(), SimulationError> {
        if self.mating_pool.is_empty() {
            return Err(SimulationError::EmptyMatingPool);
        }
        let mut children = Vec::with_capacity(self.agents.len());
        for _ in 0..self.agents.len() {
            let parent_a = self.pick_parent(rng);
            let parent_b = self.pick_parent(rng);
            let mid = rng.random_range(0..self.lifespan);
            let mut genome = parent_a.crossover(parent_b, mid);
            genome.mutate(self.mutation_rate, rng);
            children.push(Agent::new(self.start, genome));
        }
        self.agents = children;
        self.mating_pool.clear();
        self.generation = self.generation.next();
        Ok(())
    }

    fn pick_parent(&self, rng: &mut dyn RngCore) -> &Genome {
        let slot = rng.random_range(0..self.mating_pool.len());
        self.agents[self.mating_pool[slot]].genome()
    }

    fn count_status(&self, status: AgentStatus) -> usize {
        self.agents
            .iter()
            .filter(|agent| agent.status() == status)
            .count()
    }

    #[must_use]
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Mutable access for the driver's per-step physics updates.
    pub(crate) fn agents_mut(&mut self) -> &mut [Agent] {
        &mut self.agents
    }

    /// Agent indices making up the current mating pool.
    #[must_use]
    pub fn mating_pool(&self) -> &[usize] {
        &self.mating_pool
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    #[must_use]
    pub fn max_fitness(&self) -> f32 {
        self.max_fitness
    }

    #[must_use]
    pub fn avg_fitness(&self) -> f32 {
        self.avg_fitness
    }
}
