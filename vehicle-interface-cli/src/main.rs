//! Vehicle Interface CLI Application
//!
//! Replays a synthetic drive through the vehicle-interface library: stock
//! bus traffic is generated for the chosen vehicle, every control cycle is
//! stepped at 100 Hz simulated time, and the frames the interface would send
//! are summarized or printed as JSON lines.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use vehicle_interface::{CarInterface, CarVariant, InterfaceConfig};

mod config;
mod report;
mod scenario;

use config::ScenarioConfig;
use report::Reporter;
use scenario::{Scenario, CYCLE_HZ};

/// Vehicle Interface - Run a lateral control scenario against a vehicle catalog
#[derive(Parser, Debug)]
#[command(name = "vehicle-interface-cli")]
#[command(about = "Simulate the Subaru lateral control interface", long_about = None)]
#[command(version)]
struct Args {
    /// Path to scenario file (scenario.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Path to DBC file (overrides the scenario and the bundled catalog)
    #[arg(long, value_name = "FILE")]
    dbc: Option<PathBuf>,

    /// Vehicle variant: IMPREZA, OUTBACK or LEGACY
    #[arg(long, value_name = "VARIANT")]
    variant: Option<CarVariant>,

    /// Number of control cycles to run
    #[arg(long, value_name = "COUNT")]
    cycles: Option<u64>,

    /// Print one JSON line per output frame instead of a summary
    #[arg(long)]
    json: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    log::info!("Vehicle Interface CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using vehicle-interface library v{}", vehicle_interface::VERSION);

    let scenario_config = resolve_scenario(&args)?;
    run(scenario_config, args.json)
}

/// Scenario from the file, or defaults, with command line overrides applied
fn resolve_scenario(args: &Args) -> Result<ScenarioConfig> {
    let mut scenario_config = match &args.config {
        Some(path) => {
            log::info!("Loading scenario from: {:?}", path);
            config::load_config(path)?
        }
        None => ScenarioConfig::for_variant(args.variant.unwrap_or(CarVariant::Impreza)),
    };

    if let Some(variant) = args.variant {
        scenario_config.vehicle.variant = variant;
    }
    if let Some(dbc) = &args.dbc {
        scenario_config.vehicle.dbc = Some(dbc.clone());
    }
    if let Some(cycles) = args.cycles {
        scenario_config.run.cycles = cycles;
    }
    scenario_config.validate()?;

    log::debug!("Scenario: {:?}", scenario_config);
    Ok(scenario_config)
}

fn run(scenario_config: ScenarioConfig, json: bool) -> Result<()> {
    let variant = scenario_config.vehicle.variant;
    let mut interface_config = InterfaceConfig::new(variant);
    if let Some(dbc) = &scenario_config.vehicle.dbc {
        interface_config = interface_config.with_dbc_path(dbc);
    }

    let dbc_file = interface_config.dbc_file();
    let mut interface = CarInterface::new(&interface_config)
        .with_context(|| format!("Failed to build interface for {} from {:?}", variant, dbc_file))?;

    let stats = interface.database_stats();
    log::info!("Signal database: {} messages, {} signals", stats.num_messages, stats.num_signals);

    let scenario = Scenario::new(scenario_config, interface.packer().clone());
    let mut reporter = Reporter::new(interface.database().clone(), json);

    for cycle in 0..scenario.cycles() {
        let now_ns = Scenario::time_ns(cycle);
        let received = scenario.traffic(cycle)?;
        let request = scenario.request(cycle);

        let output = interface
            .step(&received, now_ns, cycle, &request)
            .with_context(|| format!("Control cycle {} failed", cycle))?;

        reporter.record_cycle(cycle, cycle as f64 / CYCLE_HZ, output.state, &output.can_sends)?;
    }

    reporter.print_summary(&scenario.variant().to_string());
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
