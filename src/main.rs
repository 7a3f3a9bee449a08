//! WiFi Motion Tracker CLI
//!
//! Detects motion near a wireless link from its signal quality.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use wifi_motion_tracker::{
    config::{Config, DetectorConfig},
    pipeline::{run_replay, Consumer, FanoutOptions, OverflowPolicy, Pipeline},
    sinks::{ConsolePrinter, EventLog, SampleLog},
    source::{self, ReplaySource, SignalSource},
    stats::{PersistedStats, RunStats},
    VERSION,
};

#[derive(Parser)]
#[command(name = "wifi-motion")]
#[command(version = VERSION)]
#[command(about = "Detect motion from WiFi signal quality fluctuations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample the wireless link and report motion until Ctrl+C
    Start {
        /// Wireless interface to read (first connected interface by default)
        #[arg(long)]
        interface: Option<String>,

        /// Append every sample to this file
        #[arg(long)]
        csv: Option<PathBuf>,

        #[command(flatten)]
        outputs: OutputArgs,

        #[command(flatten)]
        detector: DetectorArgs,
    },

    /// Re-run detection over a recorded sample log
    Replay {
        /// Sample log (timestamp,signal,...) to replay
        input: PathBuf,

        #[command(flatten)]
        outputs: OutputArgs,

        #[command(flatten)]
        detector: DetectorArgs,
    },

    /// Show configuration and cumulative statistics
    Status,

    /// Show configuration
    Config,
}

#[derive(Args)]
struct OutputArgs {
    /// Append every closed motion event to this file
    #[arg(long)]
    events_csv: Option<PathBuf>,

    /// Don't print a line per sample
    #[arg(long)]
    quiet: bool,
}

/// Detector overrides; unset flags keep the configured values.
#[derive(Args)]
struct DetectorArgs {
    /// Seconds between samples
    #[arg(long)]
    interval: Option<f64>,

    /// Short window size in samples
    #[arg(long)]
    window: Option<usize>,

    /// Standard deviation that counts as activity
    #[arg(long)]
    threshold: Option<f64>,

    /// Seconds of sustained activity before an event opens
    #[arg(long)]
    min_duration: Option<f64>,
}

impl DetectorArgs {
    fn apply(&self, config: &mut DetectorConfig) {
        if let Some(interval) = self.interval {
            config.sample_interval_secs = interval;
        }
        if let Some(window) = self.window {
            config.window_size = window;
        }
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(min_duration) = self.min_duration {
            config.min_duration_secs = min_duration;
        }
    }
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Start {
            interface,
            csv,
            outputs,
            detector,
        } => cmd_start(interface, csv, &outputs, &detector),
        Commands::Replay {
            input,
            outputs,
            detector,
        } => cmd_replay(&input, &outputs, &detector),
        Commands::Status => cmd_status(),
        Commands::Config => cmd_config(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(detector: &DetectorArgs) -> anyhow::Result<Config> {
    let mut config = Config::load().context("loading configuration")?;
    detector.apply(&mut config.detector);
    config.detector.validate()?;
    Ok(config)
}

fn build_consumers(
    config: &Config,
    outputs: &OutputArgs,
) -> anyhow::Result<Vec<Box<dyn Consumer>>> {
    let mut consumers: Vec<Box<dyn Consumer>> = Vec::new();

    if !outputs.quiet {
        consumers.push(Box::new(ConsolePrinter));
    }
    if let Some(ref path) = config.sample_log {
        let log = SampleLog::open(path)
            .with_context(|| format!("opening sample log {}", path.display()))?;
        consumers.push(Box::new(log));
    }
    if let Some(ref path) = config.event_log {
        let log = EventLog::open(path)
            .with_context(|| format!("opening event log {}", path.display()))?;
        consumers.push(Box::new(log));
    }

    Ok(consumers)
}

fn cmd_start(
    interface: Option<String>,
    csv: Option<PathBuf>,
    outputs: &OutputArgs,
    detector: &DetectorArgs,
) -> anyhow::Result<()> {
    let mut config = load_config(detector)?;
    if interface.is_some() {
        config.interface = interface;
    }
    if csv.is_some() {
        config.sample_log = csv;
    }
    if outputs.events_csv.is_some() {
        config.event_log = outputs.events_csv.clone();
    }
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    let source = source::default_source(config.interface.clone());

    println!("WiFi Motion Tracker v{VERSION}");
    println!();
    println!("  Source: {}", source.describe());
    println!(
        "  Interval: {}s, window: {}, threshold: {}",
        config.detector.sample_interval_secs, config.detector.window_size, config.detector.threshold
    );
    println!(
        "  Events open after {} consecutive active samples",
        config.detector.min_samples()
    );
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let stats = Arc::new(RunStats::with_persistence(config.stats_path()));
    let consumers = build_consumers(&config, outputs)?;
    let options = FanoutOptions {
        queue_capacity: config.queue_capacity,
        policy: OverflowPolicy::DropOldest,
    };

    let pipeline = Pipeline::spawn(&config.detector, source, consumers, options, stats.clone())?;

    let cancel = pipeline.cancel_handle();
    ctrlc::set_handler(move || cancel.cancel()).context("setting Ctrl+C handler")?;

    pipeline.wait();

    println!();
    if let Err(e) = stats.save() {
        eprintln!("Warning: Could not save run statistics: {e}");
    }
    println!("{}", stats.summary());
    Ok(())
}

fn cmd_replay(
    input: &Path,
    outputs: &OutputArgs,
    detector: &DetectorArgs,
) -> anyhow::Result<()> {
    let mut config = load_config(detector)?;
    config.sample_log = None;
    config.event_log = outputs.events_csv.clone();

    let source = ReplaySource::from_sample_log(input)?;
    if source.remaining() == 0 {
        bail!("{} contains no samples", input.display());
    }
    println!("Replaying {}", source.describe());

    let stats = Arc::new(RunStats::new());
    let consumers = build_consumers(&config, outputs)?;
    run_replay(
        &config.detector,
        source,
        consumers,
        config.queue_capacity,
        stats.clone(),
    )?;

    println!();
    println!("{}", stats.summary());
    Ok(())
}

fn cmd_status() -> anyhow::Result<()> {
    let config = Config::load()?;
    let detector = &config.detector;

    println!("WiFi Motion Tracker Status");
    println!("==========================");
    println!();
    println!("Configuration:");
    println!("  Interface: {}", config.interface.as_deref().unwrap_or("(first)"));
    println!("  Sample interval: {}s", detector.sample_interval_secs);
    println!(
        "  Windows: short {}, long {}",
        detector.window_size,
        detector.long_capacity()
    );
    println!(
        "  Threshold: {} (releases below {})",
        detector.threshold,
        detector.threshold * detector.down_ratio
    );
    println!("  Minimum event duration: {}s", detector.min_duration_secs);
    println!();

    let stats_path = config.stats_path();
    if stats_path.exists() {
        let totals = PersistedStats::read(&stats_path)
            .with_context(|| format!("reading {}", stats_path.display()))?;
        println!("Cumulative Statistics:");
        println!("  Sessions: {}", totals.sessions);
        println!("  Samples: {}", totals.samples);
        println!("  Acquisition failures: {}", totals.source_errors);
        println!("  Motion events: {}", totals.events);
        println!("  Dropped records: {}", totals.dropped_records);
        if let Some(updated) = totals.last_updated {
            println!("  Last session: {}", updated.format("%Y-%m-%d %H:%M:%S UTC"));
        }
    } else {
        println!("No previous session data found.");
    }
    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    let config = Config::load()?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
