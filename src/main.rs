use anyhow::{Context, Result};
use bikemart::pipeline::log_report;
use bikemart::Pipeline;
use bikemart_config::{BikemartConfig, YearRange};
use bikemart_core::RunReport;
use bikemart_writer::MartReader;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bikemart")]
#[command(version)]
#[command(about = "Build pre-aggregated data marts from bike-share trip files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Directory holding one sub-directory of trip files per year
    #[arg(long, value_name = "DIR", global = true)]
    base_dir: Option<PathBuf>,

    /// Mart output directory
    #[arg(short, long, value_name = "DIR", global = true)]
    output: Option<PathBuf>,

    /// Years to process: 2021 or 2020..=2025
    #[arg(short, long, value_name = "YEARS", global = true)]
    years: Option<YearRange>,

    /// Parallel file workers: 1 is sequential, 0 is one per CPU
    #[arg(short, long, value_name = "N", global = true)]
    workers: Option<usize>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the per-year daily-hourly and monthly marts
    BuildTime,
    /// Build the station and route marts
    BuildFlows,
    /// Build the distance/time marts
    BuildDistance,
    /// Build every mart
    BuildAll,
    /// Print mart rows as JSON lines
    Show {
        #[command(subcommand)]
        view: ShowCommand,
    },
}

#[derive(Subcommand)]
enum ShowCommand {
    /// Monthly totals
    Monthly,
    /// Hourly totals of one day
    Daily {
        #[arg(long)]
        month: u8,
        #[arg(long)]
        day: u8,
    },
    /// Mean rentals per hour over one month
    Hourly {
        #[arg(long)]
        month: u8,
    },
    /// Station summary
    Stations,
    /// Route summary
    Routes,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => BikemartConfig::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => BikemartConfig::load().context("Failed to load configuration")?,
    };
    apply_cli_overrides(&mut config, &cli);

    bikemart::init_tracing(&config.logging);
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Commands::BuildTime => run_build(config, |p| p.build_time_marts()),
        Commands::BuildFlows => run_build(config, |p| p.build_flow_marts()),
        Commands::BuildDistance => run_build(config, |p| p.build_distance_marts()),
        Commands::BuildAll => run_build(config, |p| p.build_all()),
        Commands::Show { view } => run_show(&config, view),
    }
}

fn apply_cli_overrides(config: &mut BikemartConfig, cli: &Cli) {
    if let Some(dir) = &cli.base_dir {
        config.input.base_dir = dir.clone();
    }
    if let Some(dir) = &cli.output {
        config.output.dir = dir.clone();
    }
    if let Some(years) = cli.years {
        config.years = years;
    }
    if let Some(workers) = cli.workers {
        config.parallel.workers = workers;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
}

fn run_build(
    config: BikemartConfig,
    build: impl FnOnce(&Pipeline) -> Result<RunReport>,
) -> Result<()> {
    let pipeline = Pipeline::new(config)?;
    let report = build(&pipeline)?;
    log_report(&report);

    let json = serde_json::to_string_pretty(&report).context("Failed to encode run report")?;
    writeln!(io::stdout().lock(), "{json}").context("Failed to print run report")?;
    Ok(())
}

fn run_show(config: &BikemartConfig, view: ShowCommand) -> Result<()> {
    let reader = MartReader::new(&config.output.dir);
    let years = config.years.years();

    match view {
        ShowCommand::Monthly => print_rows(&reader.load_monthly(&years)?),
        ShowCommand::Daily { month, day } => print_rows(&reader.load_daily(&years, month, day)?),
        ShowCommand::Hourly { month } => {
            print_rows(&reader.load_hourly_for_month(&years, month)?)
        }
        ShowCommand::Stations => print_rows(&reader.load_station_summary()?),
        ShowCommand::Routes => print_rows(&reader.load_route_summary()?),
    }
}

fn print_rows<T: Serialize>(rows: &[T]) -> Result<()> {
    let mut out = io::stdout().lock();
    for row in rows {
        serde_json::to_writer(&mut out, row).context("Failed to encode row")?;
        writeln!(out)?;
    }
    Ok(())
}
