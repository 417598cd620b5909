use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chaos::config::Config;
use chaos::orchestrator::{Mode, Orchestrator, TransitionReport};
use chaos::platform::{Capabilities, SystemPlatform};
use chaos::status::{self, StatusReceiver, StatusSender};
use chaos::telemetry::{CounterProbe, Telemetry, TelemetrySample};
use chaos::util::{self, Interrupt, Tool, ToolAvailability, ToolStatus};
use chaos::workload::{ProcessLauncher, WorkloadMonitor};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::task::JoinHandle;

/// Temporarily tune the system for a game and put everything back afterwards
#[derive(Parser)]
#[command(name = "chaos")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Data directory for config and logs (defaults to ~/.chaos)
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Print status updates and results as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Boost, run a game, and restore the system when it exits
    Launch {
        /// Path to the game executable
        exe: PathBuf,

        /// Name shown in status messages (defaults to the file name)
        #[arg(long)]
        label: Option<String>,
    },
    /// Boost now and restore on Ctrl-C
    Boost,
    /// Apply a standing mode: competitive, graphics, balanced, network or color
    Mode { mode: Mode },
    /// Delete temporary files
    Clean,
    /// Show CPU, memory and GPU load
    Stats {
        /// Keep sampling until Ctrl-C
        #[arg(long)]
        watch: bool,

        /// Seconds between samples when watching
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },
    /// Check that the required system tools are available
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    util::init_data_dir(cli.data_dir.clone());

    // Initialize logging to file (~/.chaos/logs/chaos.log)
    fs::create_dir_all(util::logs_dir())?;

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(util::log_file_path())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .init();

    let config = Config::load();
    let (status_tx, status_rx) = status::channel();
    let printer = spawn_printer(status_rx, cli.json);

    let result = run(cli.command, config, status_tx, cli.json).await;

    // Every sender is gone once `run` returns, so the printer drains and stops
    let _ = printer.await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "Command failed");
    }
    result
}

async fn run(command: Commands, config: Config, status: StatusSender, json: bool) -> Result<()> {
    let capabilities = Capabilities::from_platform(SystemPlatform::new(config.tool_paths.clone()));

    match command {
        Commands::Launch { exe, label } => {
            let label = label.unwrap_or_else(|| default_label(&exe));
            let orchestrator = Arc::new(Orchestrator::new(capabilities, config, status));
            let monitor = WorkloadMonitor::new(orchestrator, Arc::new(ProcessLauncher::new()));

            let mut interrupt = Interrupt::ctrl_c().await;
            let mut handle = monitor.launch(&exe, &label).await?;
            drop(monitor);

            // An interrupt during the boost resolves at once and kills the workload
            let exit = tokio::select! {
                exit = handle.wait() => exit?,
                _ = interrupt.requested() => {
                    tracing::info!(label = %handle.label(), "Interrupted, terminating workload");
                    handle.kill();
                    handle.wait().await?
                }
            };
            print_json(&exit, json)?;
        }
        Commands::Boost => {
            let orchestrator = Orchestrator::new(capabilities, config, status);
            let mut interrupt = Interrupt::ctrl_c().await;
            let report = orchestrator.boost().await?;
            print_report(&report, json)?;
            if !interrupt.is_requested() && !json {
                println!("System boosted. Press Ctrl-C to restore.");
            }

            interrupt.requested().await;
            let report = orchestrator.restore().await;
            print_report(&report, json)?;
        }
        Commands::Mode { mode } => {
            let orchestrator = Orchestrator::new(capabilities, config, status);
            let report = orchestrator.apply_mode(mode).await;
            print_report(&report, json)?;
        }
        Commands::Clean => {
            let orchestrator = Orchestrator::new(capabilities, config, status);
            let report = orchestrator.clean().await;
            print_report(&report, json)?;
        }
        Commands::Stats { watch, interval } => {
            let every = interval
                .map(Duration::from_secs)
                .unwrap_or(config.telemetry.interval)
                .max(Duration::from_millis(100));
            let telemetry = Telemetry::new(
                CounterProbe::new(config.tool_paths.clone()),
                config.telemetry.settle,
            );

            if !watch {
                print_sample(&telemetry.sample().await, json)?;
                return Ok(());
            }

            let mut interrupt = Interrupt::ctrl_c().await;
            let mut ticker = tokio::time::interval(every);
            loop {
                tokio::select! {
                    _ = ticker.tick() => print_sample(&telemetry.sample().await, json)?,
                    _ = interrupt.requested() => break,
                }
            }
        }
        Commands::Doctor => {
            let availability = ToolAvailability::detect(&config.tool_paths);
            let active = capabilities.power.active().await;
            doctor(&availability, active, json)?;
        }
    }

    Ok(())
}

fn default_label(exe: &Path) -> String {
    exe.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "game".to_string())
}

fn spawn_printer(mut rx: StatusReceiver, json: bool) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            if json {
                match serde_json::to_string(&update) {
                    Ok(line) => println!("{line}"),
                    Err(e) => tracing::warn!(error = %e, "Failed to serialize status update"),
                }
            } else {
                let at = update.at.with_timezone(&chrono::Local);
                println!("[{}] {}", at.format("%H:%M:%S"), update);
            }
        }
    })
}

fn print_json<T: Serialize>(value: &T, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(value)?);
    }
    Ok(())
}

/// Status events already narrate each step; only JSON output needs the report
fn print_report(report: &TransitionReport, json: bool) -> Result<()> {
    print_json(report, json)
}

fn print_sample(sample: &TelemetrySample, json: bool) -> Result<()> {
    if json {
        return print_json(sample, json);
    }
    println!(
        "CPU: {:.1}% | RAM: {:.1}/{:.1} GB | GPU: {:.1}%",
        sample.cpu_percent, sample.memory.used_gb, sample.memory.total_gb, sample.gpu_percent
    );
    Ok(())
}

fn doctor(
    availability: &ToolAvailability,
    active: Result<chaos::platform::SchemeId, chaos::platform::PrimitiveError>,
    json: bool,
) -> Result<()> {
    if json {
        let tools: serde_json::Map<String, serde_json::Value> = Tool::all()
            .iter()
            .map(|tool| {
                let path = availability.status(*tool).path().map(|p| p.display().to_string());
                (tool.binary_name().to_string(), serde_json::json!(path))
            })
            .collect();
        let report = serde_json::json!({
            "tools": tools,
            "active_scheme": active.as_ref().ok().map(|s| s.as_str()),
            "config": util::config_path(),
        });
        println!("{}", serde_json::to_string(&report)?);
        return Ok(());
    }

    for tool in Tool::all() {
        match availability.status(*tool) {
            ToolStatus::Available(path) => {
                println!("  ok       {:<9} {}", tool.binary_name(), path.display())
            }
            ToolStatus::NotFound => {
                println!("  missing  {:<9} {}", tool.binary_name(), tool.description())
            }
            ToolStatus::ConfiguredPathInvalid(path) => println!(
                "  invalid  {:<9} configured path {} is not executable",
                tool.binary_name(),
                path.display()
            ),
        }
    }

    match active {
        Ok(scheme) => println!("Active power plan: {} ({scheme})", scheme.label()),
        Err(e) => println!("Active power plan: unknown ({e})"),
    }
    println!("Config file: {}", util::config_path().display());

    let missing = availability.missing_required_tools();
    if !missing.is_empty() {
        let names: Vec<_> = missing.iter().map(Tool::binary_name).collect();
        anyhow::bail!("required tools missing: {}", names.join(", "));
    }
    Ok(())
}
