//! Perfwatch - in-process memory monitor CLI
//!
//! Runs the monitor against the current process, or against simulated heap
//! figures, and prints reports.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use perfwatch::monitor::dashboard::render_dashboard;
use perfwatch::{
    HeapProbe, ManualProbe, MemoryEvent, MemoryOptimizer, MonitorConfig, ProbeKind, ReportPoller,
};

#[derive(Parser)]
#[command(name = "perfwatch")]
#[command(about = "In-process memory monitor with leak heuristics", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Heap probe, overriding the configured one
    #[arg(short, long, global = true, value_enum)]
    probe: Option<ProbeArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProbeArg {
    Unavailable,
    Process,
}

impl From<ProbeArg> for ProbeKind {
    fn from(arg: ProbeArg) -> Self {
        match arg {
            ProbeArg::Unavailable => ProbeKind::Unavailable,
            ProbeArg::Process => ProbeKind::Process,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show one heap reading
    Status,

    /// Run monitoring ticks and print the report
    Report {
        /// Print JSON instead of the text dashboard
        #[arg(long)]
        json: bool,

        #[arg(short, long, default_value = "1")]
        ticks: usize,
    },

    /// Start the monitoring loop until Ctrl+C
    Daemon {
        /// Sampling interval in seconds (overrides config)
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Show the live text dashboard
    Dashboard {
        /// Stop after this many refreshes
        #[arg(long)]
        polls: Option<usize>,

        /// Refresh period in seconds
        #[arg(short, long, default_value = "1")]
        every: u64,
    },

    /// Drive one tick with simulated heap usage
    Simulate {
        /// Heap usage as a percentage of the limit
        #[arg(long)]
        percent: f64,
    },

    /// Show configuration
    Config {
        /// Write the effective configuration to this path
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

fn load_config(cli: &Cli) -> Result<MonitorConfig, Box<dyn std::error::Error>> {
    let path = cli.config.clone().unwrap_or_else(MonitorConfig::default_path);
    let mut config = MonitorConfig::load_or_default(&path)?;
    if let Some(probe) = cli.probe {
        config.probe = probe.into();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let mut config = load_config(&cli)?;

    match cli.command {
        Commands::Status => {
            let probe = perfwatch::create_probe(config.probe);
            match probe.sample() {
                Some(snapshot) => {
                    println!("Heap Status ({} probe):", probe.name());
                    println!("  Used:   {:>10.1} MB", snapshot.used_mb());
                    println!("  Total:  {:>10.1} MB", snapshot.total as f64 / (1024.0 * 1024.0));
                    println!("  Limit:  {:>10.1} MB", snapshot.limit_mb());
                    println!("  Load:   {:>10.1}%", snapshot.percentage());
                    println!(
                        "  Band:   {:>10}",
                        perfwatch::PressureBand::classify(snapshot.percentage(), &config).to_string()
                    );
                }
                None => println!("Heap figures unavailable ({} probe)", probe.name()),
            }
        }

        Commands::Report { json, ticks } => {
            let optimizer = MemoryOptimizer::new(config)?;
            for _ in 0..ticks.max(1) {
                optimizer.tick();
            }
            let report = optimizer.report();
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", render_dashboard(&report));
            }
        }

        Commands::Daemon { interval } => {
            if let Some(secs) = interval {
                config.sample_interval_secs = secs;
            }
            let optimizer = MemoryOptimizer::new(config)?;
            let mut events = optimizer.subscribe();

            info!(
                "Starting memory monitor daemon (probe: {}, interval: {}s)",
                optimizer.probe_name(),
                optimizer.config().sample_interval_secs
            );
            optimizer.start()?;

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        info!("Shutdown requested");
                        break;
                    }
                    event = events.recv() => {
                        match event {
                            Ok(MemoryEvent::MemoryWarning { sample }) => {
                                error!(
                                    "Memory warning: {:.1}% of limit in use ({:.1} MB)",
                                    sample.percentage(),
                                    sample.snapshot().used_mb()
                                );
                            }
                            Err(RecvError::Lagged(missed)) => {
                                warn!("Missed {} memory warnings", missed);
                            }
                            Err(RecvError::Closed) => break,
                        }
                    }
                }
            }

            optimizer.cleanup();
            info!("Memory monitor stopped");
        }

        Commands::Dashboard { polls, every } => {
            println!("Starting memory dashboard (Ctrl+C to exit)...\n");

            let optimizer = MemoryOptimizer::new(config)?;
            optimizer.start()?;
            let mut poller = ReportPoller::spawn(optimizer.clone(), Duration::from_secs(every.max(1)))?;

            let mut shown = 0usize;
            loop {
                // Clear screen
                print!("\x1B[2J\x1B[1;1H");
                println!("{}", render_dashboard(&poller.latest()));
                shown += 1;
                if polls.is_some_and(|limit| shown >= limit) {
                    break;
                }

                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    changed = poller.changed() => {
                        if let Err(e) = changed {
                            warn!("Dashboard stopped: {}", e);
                            break;
                        }
                    }
                }
            }

            poller.stop();
            optimizer.cleanup();
        }

        Commands::Simulate { percent } => {
            let probe = Arc::new(ManualProbe::at_percentage(percent));
            let optimizer = MemoryOptimizer::builder(config)
                .probe(Arc::clone(&probe) as Arc<dyn HeapProbe>)
                .build()?;
            let mut events = optimizer.subscribe();

            let summary = optimizer.tick();
            println!("Tick summary:");
            println!("{}", serde_json::to_string_pretty(&summary)?);
            if events.try_recv().is_ok() {
                println!("\nMemory warning broadcast to subscribers");
            }
            println!("{}", render_dashboard(&optimizer.report()));
        }

        Commands::Config { save } => {
            config.validate()?;
            println!("Current Configuration:");
            println!("{}", toml::to_string_pretty(&config)?);
            if let Some(path) = save {
                config.save(&path)?;
                println!("Saved to {}", path.display());
            }
        }
    }

    Ok(())
}
