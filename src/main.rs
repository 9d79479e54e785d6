//! CLI entry point: random runs with replications, or deterministic replay.

use clap::{Parser, Subcommand};
use dock_sim::config::{self, SimConfig};
use dock_sim::{
    DockParams, DockSimulation, DockStats, EventSink, JsonlSink, LogSink, RandomParams, RandomSource,
    ReplaySchedule, ReplaySource, ReplicationSummary, RunSummary, TrainCsvSink, TrainSource,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Optional per-run outputs, attached to a single run only.
type Outputs = (
    Option<LogSink>,
    (Option<JsonlSink<BufWriter<File>>>, Option<TrainCsvSink<BufWriter<File>>>),
);

#[derive(Parser, Debug)]
#[command(name = "dock-sim", about = "Discrete-event simulation of a train unloading dock with crew hog-outs.")]
struct Cli {
    /// Path to a TOML config file (overrides defaults)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write every train event as JSON lines
    #[arg(long, global = true)]
    events_out: Option<PathBuf>,

    /// Write one CSV row per departed train
    #[arg(long, global = true)]
    trains_csv: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pseudo-random arrivals, unloading and crew times
    Random {
        /// Mean hours between arrivals
        #[arg(long)]
        mean_gap: Option<f64>,
        /// Last hour a train may arrive
        #[arg(long)]
        horizon: Option<f64>,
        /// Independent runs, summarised with a confidence interval
        #[arg(short = 'n', long)]
        replications: Option<u32>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Replay a fixed schedule and replacement crew list
    Replay {
        /// Lines of `arrival unloading crew_budget`
        schedule: PathBuf,
        /// One replacement crew travel time per line
        crews: PathBuf,
    },
}

fn log_level(cli: &Cli) -> tracing::Level {
    if cli.quiet {
        return tracing::Level::WARN;
    }
    match cli.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    }
}

fn create(path: &Path) -> Result<BufWriter<File>, BoxError> {
    let file = File::create(path).map_err(|e| {
        tracing::error!("Failed to create '{}': {}", path.display(), e);
        e
    })?;
    Ok(BufWriter::new(file))
}

fn open_outputs(cli: &Cli, narrate: bool) -> Result<Outputs, BoxError> {
    let events = match &cli.events_out {
        Some(path) => Some(JsonlSink::new(create(path)?)),
        None => None,
    };
    let trains = match &cli.trains_csv {
        Some(path) => Some(TrainCsvSink::new(create(path)?)),
        None => None,
    };
    Ok((narrate.then_some(LogSink), (events, trains)))
}

fn run_once(
    params: DockParams,
    source: impl TrainSource + 'static,
    config: &SimConfig,
    outputs: Outputs,
) -> Result<RunSummary, BoxError> {
    let mut sim = DockSimulation::new(params, source, (DockStats::new(&config.stats), outputs));
    let report = sim.run()?;
    if report.in_flight > 0 {
        tracing::warn!("{} trains still in the yard at end of run", report.in_flight);
    }
    let (stats, mut outputs) = sim.into_sink();
    outputs.finish()?;
    Ok(stats.summary())
}

fn run_random(cli: &Cli, config: &SimConfig) -> Result<(), BoxError> {
    let seed = match config.simulation.seed {
        Some(seed) => seed,
        None => {
            let seed = rand::random();
            tracing::info!("No seed configured, using {}", seed);
            seed
        }
    };
    let params = DockParams::from_config(config);
    let replications = config.simulation.replications;

    if replications == 1 {
        let source = RandomSource::new(RandomParams::from_config(config), seed);
        let summary = run_once(params, source, config, open_outputs(cli, true)?)?;
        println!("{}", summary);
        return Ok(());
    }

    let mut averages = Vec::with_capacity(replications as usize);
    for i in 0..replications {
        let source = RandomSource::new(RandomParams::from_config(config), seed.wrapping_add(u64::from(i)));
        let outputs = if i == 0 { open_outputs(cli, false)? } else { (None, (None, None)) };
        let summary = run_once(params, source, config, outputs)?;
        tracing::debug!(
            "Replication {}: {} trains, average time-in-system {:?}",
            i,
            summary.trains_served,
            summary.avg_time_in_system
        );
        averages.push(summary.avg_time_in_system);
    }
    println!("{}", ReplicationSummary::from_runs(&averages, config.stats.confidence_t));
    Ok(())
}

fn run_replay(cli: &Cli, config: &SimConfig, schedule: &Path, crews: &Path) -> Result<(), BoxError> {
    let schedule = ReplaySchedule::load(schedule, crews)?;
    let params = DockParams {
        horizon: None,
        shift_length: config.crew.shift_length,
    };
    let summary = run_once(params, ReplaySource::new(schedule), config, open_outputs(cli, true)?)?;
    println!("{}", summary);
    Ok(())
}

fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(log_level(&cli))
        .with_target(false)
        .without_time()
        .init();

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            config::load_config(&path.to_string_lossy())?
        }
        None => SimConfig::default(),
    };

    if let Commands::Random {
        mean_gap,
        horizon,
        replications,
        seed,
    } = &cli.command
    {
        if let Some(v) = mean_gap {
            config.arrivals.mean_gap = *v;
        }
        if let Some(v) = horizon {
            config.simulation.horizon = *v;
        }
        if let Some(v) = replications {
            config.simulation.replications = *v;
        }
        if seed.is_some() {
            config.simulation.seed = *seed;
        }
    }
    config.validate().map_err(|e| {
        tracing::error!("{}", e);
        e
    })?;

    match &cli.command {
        Commands::Random { .. } => run_random(&cli, &config),
        Commands::Replay { schedule, crews } => run_replay(&cli, &config, schedule, crews),
    }
}
