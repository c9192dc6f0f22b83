use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use truck_route_sim::adapters::inbound::{FileJournal, InMemoryJournal};
use truck_route_sim::adapters::outbound::{
    init_file_logger, init_tracing_logger, snapshot_name, FilesystemNetworkSource,
    FilesystemTrajectoryStore,
};
use truck_route_sim::application::{SimulationPorts, SimulationService, SimulationSettings};
use truck_route_sim::common::EventStore;
use truck_route_sim::domains::simulation::Trajectory;
use truck_route_sim::domains::DynLogger;
use truck_route_sim::Config;

const USAGE: &str = "usage: truck-route-sim [--config <file>] <command>

commands:
  simulate <destination>            drive to a destination and check the run
  check <destination> <file.json>   check a stored trajectory against the reference
  build-references                  recompute every destination's reference
  import-network [file.geojson]     rebuild the road network snapshot
  destinations                      list known destinations";

#[tokio::main]
async fn main() -> Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let config_path = match args.iter().position(|a| a == "--config") {
        Some(i) => {
            if i + 1 >= args.len() {
                bail!("--config needs a path\n\n{}", USAGE);
            }
            let path = args.remove(i + 1);
            args.remove(i);
            path
        }
        None => "config.toml".to_string(),
    };

    let config = Config::load(&config_path)?;

    // `log` belongs to fast_log when a log file is configured; tracing gets its own subscriber
    let logger: DynLogger = match &config.storage.log_file {
        Some(path) => match init_file_logger(path) {
            Ok(l) => l,
            Err(e) => {
                eprintln!("{}", e);
                init_tracing_logger()
            }
        },
        None => init_tracing_logger(),
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Configuration loaded from {}", config_path);

    let Some(command) = args.first().cloned() else {
        bail!("{}", USAGE);
    };

    if command == "destinations" {
        let registry = config.registry()?;
        for d in registry.iter() {
            println!("{}\t{}\t{}", d.category, d.point, d.name);
        }
        return Ok(());
    }

    let source = FilesystemNetworkSource::new(Some(config.storage.data_dir.clone()));
    if command == "import-network" {
        let geojson = args.get(1).unwrap_or(&config.network.geojson);
        let network = source.build_network(geojson, &config.network_options())?;
        let name = snapshot_name(geojson);
        source.save_network(&name, &network)?;
        info!(
            "Saved {} ({} nodes, {} edges)",
            name,
            network.node_count(),
            network.edge_count()
        );
        return Ok(());
    }

    let service = build_service(&config, &source, logger)?;
    match (command.as_str(), &args[1..]) {
        ("simulate", [name]) => {
            let report = service.simulate(name).await.map_err(|e| {
                error!("Simulation for {} failed: {}", name, e);
                e
            })?;
            println!("{}", serde_json::to_string(&report.compliant)?);
        }
        ("check", [name, file]) => {
            let raw = tokio::fs::read_to_string(file)
                .await
                .with_context(|| format!("reading {}", file))?;
            let candidate: Trajectory = serde_json::from_str(&raw)?;
            let compliant = service.check(name, &candidate).await?;
            println!("{}", serde_json::to_string(&compliant)?);
        }
        ("build-references", []) => {
            for summary in service.build_references().await? {
                info!(
                    "{}: {} samples, {:.0}s",
                    summary.destination, summary.sample_count, summary.travel_time_s
                );
            }
        }
        _ => bail!("{}", USAGE),
    }

    Ok(())
}

fn build_service(config: &Config, source: &FilesystemNetworkSource, logger: DynLogger) -> Result<SimulationService> {
    let network = source.load_or_build(&config.network.geojson, &config.network_options())?;
    let store = Arc::new(FilesystemTrajectoryStore::new(config.storage.data_dir.clone()));
    let journal: Arc<dyn EventStore> = match &config.storage.journal_dir {
        Some(dir) => Arc::new(FileJournal::new(dir.clone())),
        None => Arc::new(InMemoryJournal::new()),
    };

    let settings = SimulationSettings {
        interval: config.sampling_interval()?,
        tolerance_km: config.simulation.tolerance_km,
    };
    let ports = SimulationPorts {
        provider: Arc::new(network),
        references: store.clone(),
        sink: store,
        journal,
    };
    Ok(SimulationService::new(config.registry()?, settings, ports, logger)
        .with_selector(Arc::new(config.diversion_policy()?)))
}
