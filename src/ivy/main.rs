// cargo run --bin ivy --release -- plan --terminals naps.geojson --routes ducts.geojson --id-property nap_id

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Instant;
use strandplan::config::PlannerConfig;
use strandplan::discovery::DiscoveryReport;
use strandplan::export;
use strandplan::loader;
use strandplan::network::{RouteNetwork, Terminal};
use strandplan::planner::Planner;
use tracing::{info, warn};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    cmd: Command,

    /// Log more detail (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(clap::Args, Debug)]
struct Inputs {
    /// GeoJSON FeatureCollection of terminal points
    #[arg(long, env = "IVY_TERMINALS")]
    terminals: PathBuf,

    /// GeoJSON FeatureCollection of route LineStrings / MultiLineStrings
    #[arg(long, env = "IVY_ROUTES")]
    routes: PathBuf,

    /// Feature property holding the terminal name
    #[arg(long, env = "IVY_ID_PROPERTY", default_value = "id")]
    id_property: String,

    /// JSON planner settings; omitted fields keep their defaults
    #[arg(long, env = "IVY_CONFIG")]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, env = "IVY_OUTPUT", default_value = "ivy_output")]
    output: PathBuf,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Discover paths between terminal pairs and write paths.geojson
    Paths {
        #[command(flatten)]
        inputs: Inputs,
    },
    /// Discover paths, build the terminal graph and partition it into groups
    Plan {
        #[command(flatten)]
        inputs: Inputs,
    },
}

struct Loaded {
    config: PlannerConfig,
    network: RouteNetwork,
    terminals: Vec<Terminal>,
}

fn load(inputs: &Inputs) -> Result<Loaded> {
    let config = match &inputs.config {
        Some(path) => PlannerConfig::load(path)?,
        None => PlannerConfig::default(),
    };
    let network = loader::load_routes(&inputs.routes)?;
    let terminals = loader::load_terminals(&inputs.terminals, &inputs.id_property)?;
    Ok(Loaded {
        config,
        network,
        terminals,
    })
}

fn log_failures(report: &DiscoveryReport) {
    for failure in &report.failures {
        warn!(
            from = %failure.source,
            to = %failure.target,
            reason = %failure.reason,
            "no path between terminals"
        );
    }
}

fn report_written(files: &[PathBuf], output: &Path) {
    for file in files {
        info!(path = %file.display(), "written");
    }
    println!("Done! Wrote {} file(s) to {:?}", files.len(), output);
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let level = match args.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let start = Instant::now();

    match args.cmd {
        Command::Paths { inputs } => {
            let Loaded {
                config,
                network,
                terminals,
            } = load(&inputs)?;
            let planner = Planner::new(&network, &config)?;
            let (_, report) = planner.discover(&terminals);
            log_failures(&report);

            let written = export::write_paths(&inputs.output, &report)?;
            report_written(&[written], &inputs.output);
        }
        Command::Plan { inputs } => {
            let Loaded {
                config,
                network,
                terminals,
            } = load(&inputs)?;
            let planner = Planner::new(&network, &config)?;
            let outcome = planner.plan(&terminals)?;
            log_failures(&outcome.report);

            let written = export::write_plan(
                &inputs.output,
                &outcome.report,
                &outcome.graph,
                &outcome.groups,
                &outcome.terminals,
            )?;
            report_written(&written, &inputs.output);
        }
    }

    info!(elapsed_ms = start.elapsed().as_millis() as u64, "ivy finished");
    Ok(())
}
