use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use smartrockets_app::{
    ChannelSink, ObstacleDrift, TelemetryConsumer, create_telemetry_bus, load_config,
};
use smartrockets_core::{SharedObstacle, SimConfig, Simulation};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "smartrockets",
    version,
    about = "Evolve rocket thrust sequences toward a target with a genetic algorithm"
)]
struct Cli {
    /// JSON configuration file; unspecified fields use defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// RNG seed for a reproducible run.
    #[arg(long, env = "SMARTROCKETS_SEED")]
    seed: Option<u64>,

    /// Number of generations to evolve before exiting.
    #[arg(long, default_value_t = 10)]
    generations: u32,

    /// Override the number of rockets per generation.
    #[arg(long)]
    population: Option<usize>,

    /// Override the lifespan (steps per generation).
    #[arg(long)]
    lifespan: Option<usize>,

    /// Override the per-gene mutation probability.
    #[arg(long)]
    mutation_rate: Option<f32>,

    /// Slide the obstacle sideways by this many units per drift interval; 0 keeps it still.
    #[arg(long, default_value_t = 0.0)]
    obstacle_drift: f32,

    /// Write one JSON line per generation summary to this file.
    ///
    /// Summaries travel through a queue bounded by `telemetry_capacity`; if the writer
    /// falls that far behind, newer summaries are skipped and a warning is logged.
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

impl Cli {
    fn resolve_config(&self) -> Result<SimConfig> {
        let mut config = load_config(self.config.as_deref())?;
        if let Some(seed) = self.seed {
            config.rng_seed = Some(seed);
        }
        if let Some(population) = self.population {
            config.population_size = population;
        }
        if let Some(lifespan) = self.lifespan {
            config.lifespan = lifespan;
        }
        if let Some(rate) = self.mutation_rate {
            config.mutation_rate = rate;
        }
        config.validate().context("rejected configuration")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    info!("Starting smart rockets simulation");

    let (tx, rx) = create_telemetry_bus(config.telemetry_capacity);
    let consumer = TelemetryConsumer::spawn(rx, cli.summary_out.as_deref())?;

    let stop = Arc::new(AtomicBool::new(false));
    let obstacle = SharedObstacle::new(config.obstacle);
    let drift = if cli.obstacle_drift != 0.0 {
        Some(ObstacleDrift::spawn(
            obstacle.clone(),
            cli.obstacle_drift,
            config.bounds(),
            Arc::clone(&stop),
        )?)
    } else {
        None
    };

    let base = config.environment();
    let mut simulation = Simulation::with_sink(config, Box::new(ChannelSink::new(tx)))?;
    let completed = simulation.run(
        || base.with_obstacle(obstacle.snapshot()),
        &stop,
        Some(cli.generations),
    )?;

    stop.store(true, Ordering::Relaxed);
    if let Some(drift) = drift {
        drift.join()?;
    }
    simulation.shutdown();

    let summaries = consumer.finish()?;
    if summaries.len() < completed as usize {
        warn!(
            completed,
            received = summaries.len(),
            "some generation summaries were dropped"
        );
    }
    if let Some(best) = summaries
        .iter()
        .max_by(|a, b| a.max_fitness.total_cmp(&b.max_fitness))
    {
        info!(
            generation = best.generation.0,
            max_fitness = best.max_fitness,
            completed = best.completed,
            "best generation",
        );
    } else {
        warn!("run finished without any generation summaries");
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
