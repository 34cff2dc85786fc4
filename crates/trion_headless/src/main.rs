//! Headless Trion scenario runner.
//!
//! # Usage
//!
//! ```bash
//! # Play a scenario
//! cargo run -p trion_headless -- run --scenario scenarios/asteroid_split.ron
//!
//! # List the catalog
//! cargo run -p trion_headless -- catalog
//!
//! # Price a loadout against an attribute
//! cargo run -p trion_headless -- cost --loadout assets/loadouts/shooter.ron --attr 4
//! ```
//!
//! Logs go to stderr and honour `RUST_LOG`; `--verbose` raises the default
//! level to DEBUG.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use trion_core::capacity::CapacityModel;
use trion_core::loadout::Loadout;
use trion_headless::data_loader::{load_catalog, load_config};
use trion_headless::runner::{catalog_rows, CapacityReport, CostReport, ScenarioRunner};
use trion_headless::scenario::Scenario;

#[derive(Parser)]
#[command(name = "trion_headless")]
#[command(about = "Headless Trion scenario runner")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a scenario and print the step report
    Run {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: PathBuf,

        /// Catalog file or directory (defaults to the data directory)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Tuning table
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the capacity breakdown of an attribute
    Capacity {
        /// Trion attribute
        #[arg(short, long, allow_negative_numbers = true)]
        attr: i32,

        /// Tuning table
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List catalog entries
    Catalog {
        /// Catalog file or directory
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Price a loadout and check it against an attribute
    Cost {
        /// Loadout RON file
        #[arg(short, long)]
        loadout: PathBuf,

        /// Trion attribute
        #[arg(short, long, allow_negative_numbers = true)]
        attr: i32,

        /// Catalog file or directory
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Tuning table
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries reports
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let result = match cli.command {
        Commands::Run {
            scenario,
            catalog,
            config,
            json,
        } => cmd_run(&scenario, catalog.as_deref(), config.as_deref(), json),
        Commands::Capacity { attr, config, json } => cmd_capacity(attr, config.as_deref(), json),
        Commands::Catalog { catalog, json } => cmd_catalog(catalog.as_deref(), json),
        Commands::Cost {
            loadout,
            attr,
            catalog,
            config,
            json,
        } => cmd_cost(&loadout, attr, catalog.as_deref(), config.as_deref(), json),
    };

    match result {
        Ok(code) => code,
        Err(message) => {
            tracing::error!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{text}");
    Ok(())
}

fn cmd_run(
    scenario_path: &Path,
    catalog: Option<&Path>,
    config: Option<&Path>,
    json: bool,
) -> Result<ExitCode, String> {
    let scenario = Scenario::load(scenario_path).map_err(|e| e.to_string())?;
    let catalog = load_catalog(catalog).map_err(|e| e.to_string())?;
    let config = load_config(config).map_err(|e| e.to_string())?;

    let report = ScenarioRunner::new(config, Arc::new(catalog))
        .run(&scenario)
        .map_err(|e| e.to_string())?;

    if json {
        print_json(&report)?;
    } else {
        println!("{report}");
    }

    if report.failed_steps() > 0 {
        tracing::warn!(failed = report.failed_steps(), "Some steps were rejected");
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_capacity(attr: i32, config: Option<&Path>, json: bool) -> Result<ExitCode, String> {
    let config = load_config(config).map_err(|e| e.to_string())?;
    let report = CapacityReport::new(&CapacityModel::new(config.capacity), attr);
    if json {
        print_json(&report)?;
    } else {
        println!("{report}");
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_catalog(catalog: Option<&Path>, json: bool) -> Result<ExitCode, String> {
    let catalog = load_catalog(catalog).map_err(|e| e.to_string())?;
    let rows = catalog_rows(&catalog);
    if json {
        print_json(&rows)?;
        return Ok(ExitCode::SUCCESS);
    }

    println!(
        "{:<12} {:<14} {:<20} {:>4} {:>4} {:>4} {:>5}",
        "ID", "NAME", "CATEGORY", "SET", "ACT", "DMG", "RANGE"
    );
    for row in rows {
        println!(
            "{:<12} {:<14} {:<20} {:>4} {:>4} {:>4} {:>5}",
            row.id,
            row.name,
            format!("{:?}", row.category),
            row.set_cost,
            row.activation_cost,
            row.damage,
            row.range
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_cost(
    loadout_path: &Path,
    attr: i32,
    catalog: Option<&Path>,
    config: Option<&Path>,
    json: bool,
) -> Result<ExitCode, String> {
    let text = std::fs::read_to_string(loadout_path)
        .map_err(|e| format!("Failed to read {}: {e}", loadout_path.display()))?;
    let loadout = Loadout::from_ron(&text).map_err(|e| e.to_string())?;
    let catalog = load_catalog(catalog).map_err(|e| e.to_string())?;
    let config = load_config(config).map_err(|e| e.to_string())?;

    let report = CostReport::new(
        Arc::new(catalog),
        &CapacityModel::new(config.capacity),
        &loadout,
        attr,
    )
    .map_err(|e| e.to_string())?;

    if json {
        print_json(&report)?;
    } else {
        println!("{report}");
    }

    Ok(if report.affordable {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}
