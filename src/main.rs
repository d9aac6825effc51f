use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;

mod cli;
mod config;
mod simulation;

use cli::Cli;
use cli::commands::Commands;
use config::Config;
use simulation::SimulationReport;

fn setup_logging(level: Option<&str>) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("loadcycle")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("loadcycle.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // RUST_LOG wins over the configured level
    let env = env_logger::Env::default().default_filter_or(level.unwrap_or("info"));
    env_logger::Builder::from_env(env)
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        None => handle_run_command(config.clone(), cli.is_verbose()),
        Some(Commands::Run {
            cycles,
            delay_ms,
            pause_ms,
            ignore_cancel,
        }) => {
            let mut config = config.clone();
            if let Some(cycles) = cycles {
                config.simulation.cycles = *cycles;
            }
            if let Some(delay_ms) = delay_ms {
                config.simulation.load_delay_ms = *delay_ms;
            }
            if let Some(pause_ms) = pause_ms {
                config.simulation.pause_ms = *pause_ms;
            }
            if *ignore_cancel {
                config.simulation.honor_cancel = false;
            }
            handle_run_command(config, cli.is_verbose())
        }
        Some(Commands::Config) => handle_config_command(config),
    }
}

fn handle_run_command(config: Config, verbose: bool) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    let sim = &config.simulation;
    info!("Running simulation: {:?}", sim);
    println!(
        "{} {} cycles, {}ms loads, {}ms pauses",
        "Simulating:".cyan(),
        sim.cycles,
        sim.load_delay_ms,
        sim.pause_ms
    );

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    let report = runtime.block_on(simulation::run(sim, config.loader.clone()))?;

    print_report(&report, verbose);

    if report.leaked() > 0 {
        eyre::bail!("{} buffers were never released", report.leaked());
    }
    Ok(())
}

fn print_report(report: &SimulationReport, verbose: bool) {
    let stats = &report.stats;
    println!("{}", "Loader".bold());
    println!("  Loads started: {}", stats.loads_started);
    println!("  Delivered:     {} ({} re-delivered)", stats.delivered, stats.redelivered);
    println!("  Canceled:      {}", stats.canceled);
    println!("  Released:      {}", stats.released);

    if verbose {
        let host = &report.host;
        println!("{}", "Host".bold());
        println!("  Data:     {}", host.data);
        println!("  Errors:   {}", host.errors);
        println!("  Empty:    {}", host.empty);
        println!("  Stale:    {}", host.stale);
        println!("  Canceled: {}", host.canceled);
    }

    println!("{}", "Buffers".bold());
    println!("  Created:  {}", report.buffers_created);
    println!("  Released: {}", report.buffers_released);

    if report.leaked() == 0 {
        println!("{}", "No leaks".green());
    } else {
        println!("{} {}", "Leaked:".red(), report.leaked());
    }
}

fn handle_config_command(config: &Config) -> Result<()> {
    let yaml = serde_yaml::to_string(config).context("Failed to serialize config")?;
    print!("{}", yaml);
    Ok(())
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging at the configured level
    setup_logging(config.log_level.as_deref()).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).context("Application failed")?;

    Ok(())
}
