//! Fixed-cadence driver advancing a population through its lifespan.

use rand::rngs::SmallRng;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

use crate::{
    AgentSnapshot, Environment, Generation, GenerationSummary, Population, SimConfig,
    SimulationError,
};

/// Receives one summary per completed generation.
pub trait GenerationSink: Send {
    fn on_generation(&mut self, summary: &GenerationSummary);
}

/// Sink that discards every summary.
#[derive(Debug, Default)]
pub struct NullSink;

impl GenerationSink for NullSink {
    fn on_generation(&mut self, _summary: &GenerationSummary) {}
}

/// Outcome of a single [`Simulation::tick`].
#[derive(Debug, Clone, PartialEq)]
pub struct TickEvents {
    /// Step index the agents were updated with.
    pub step: usize,
    /// Generation the updated agents belong to.
    pub generation: Generation,
    /// Agent positions and statuses right after this step, before any rollover.
    pub frame: Vec<AgentSnapshot>,
    /// Present when this tick closed out the lifespan.
    pub rolled_over: Option<GenerationSummary>,
}

/// Owns the population, the RNG and the step counter for one run.
pub struct Simulation {
    config: SimConfig,
    rng: SmallRng,
    population: Population,
    step: usize,
    history: VecDeque<GenerationSummary>,
    sink: Box<dyn GenerationSink>,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("config", &self.config)
            .field("step", &self.step)
            .field("generation", &self.population.generation())
            .field("agent_count", &self.population.len())
            .finish()
    }
}

impl Simulation {
    /// Instantiate a run that discards generation summaries.
    pub fn new(config: SimConfig) -> Result<Self, SimulationError> {
        Self::with_sink(config, Box::new(NullSink))
    }

    /// Instantiate a run that forwards generation summaries to `sink`.
    pub fn with_sink(
        config: SimConfig,
        sink: Box<dyn GenerationSink>,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        let mut rng = config.seeded_rng();
        let population = Population::new(&config, &mut rng)?;
        let history_capacity = config.history_capacity;
        info!(
            population = config.population_size,
            lifespan = config.lifespan,
            mutation_rate = config.mutation_rate,
            seed = ?config.rng_seed,
            "simulation initialized"
        );
        Ok(Self {
            config,
            rng,
            population,
            step: 0,
            history: VecDeque::with_capacity(history_capacity),
            sink,
        })
    }

    /// Advance every agent by one step using a single environment snapshot.
    ///
    /// When the step counter reaches the lifespan the population is evaluated, the
    /// summary is recorded and emitted, and the next generation is bred. The returned
    /// frame is captured before that rollover, so terminal states of the final step
    /// are always visible.
    pub fn tick(&mut self, env: &Environment) -> Result<TickEvents, SimulationError> {
        let step = self.step;
        for agent in self.population.agents_mut() {
            agent.update(step, env);
        }
        self.step += 1;

        let mut events = TickEvents {
            step,
            generation: self.population.generation(),
            frame: self.snapshot(),
            rolled_over: None,
        };
        if self.step >= self.config.lifespan {
            events.rolled_over = Some(self.stage_rollover(env)?);
        }
        Ok(events)
    }

    fn stage_rollover(
        &mut self,
        env: &Environment,
    ) -> Result<GenerationSummary, SimulationError> {
        let summary = self.population.evaluate(env.target);
        info!(
            generation = summary.generation.0,
            max_fitness = summary.max_fitness,
            avg_fitness = summary.avg_fitness,
            completed = summary.completed,
            crashed = summary.crashed,
            "generation complete"
        );
        if self.history.len() == self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(summary);
        self.sink.on_generation(&summary);
        self.population.reproduce(&mut self.rng)?;
        self.step = 0;
        Ok(summary)
    }

    /// Tick until the current generation rolls over.
    pub fn run_generation(
        &mut self,
        env: &Environment,
    ) -> Result<GenerationSummary, SimulationError> {
        loop {
            if let Some(summary) = self.tick(env)?.rolled_over {
                return Ok(summary);
            }
        }
    }

    /// Tick with a fresh environment per step until `stop` is raised or
    /// `max_generations` have completed. Returns the number of completed generations.
    pub fn run<F>(
        &mut self,
        mut environment: F,
        stop: &AtomicBool,
        max_generations: Option<u32>,
    ) -> Result<u32, SimulationError>
    where
        F: FnMut() -> Environment,
    {
        let mut completed = 0;
        while !stop.load(Ordering::Relaxed) {
            if max_generations.is_some_and(|max| completed >= max) {
                break;
            }
            let env = environment();
            if self.tick(&env)?.rolled_over.is_some() {
                completed += 1;
            }
        }
        Ok(completed)
    }

    /// Positions and statuses of the current agents, in population order.
    ///
    /// Right after a rollover this is the fresh generation; use [`TickEvents::frame`]
    /// for the final step of the previous one.
    #[must_use]
    pub fn snapshot(&self) -> Vec<AgentSnapshot> {
        self.population
            .agents()
            .iter()
            .map(|agent| agent.snapshot())
            .collect()
    }

    /// Consume the simulation, releasing its sink.
    pub fn shutdown(self) {
        info!(
            generation = self.population.generation().0,
            step = self.step,
            "simulation shut down"
        );
    }

    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    #[must_use]
    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Current step within the lifespan.
    #[must_use]
    pub const fn step(&self) -> usize {
        self.step
    }

    #[must_use]
    pub fn generation(&self) -> Generation {
        self.population.generation()
    }

    /// Iterate over retained generation summaries, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &GenerationSummary> {
        self.history.iter()
    }
}
