use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::adapters::outbound::NetworkOptions;
use crate::common::{DomainResult, GeoPoint};
use crate::domains::simulation::{
    Destination, DestinationRegistry, DiversionPolicy, SamplingInterval, DEFAULT_TOLERANCE_KM,
};

/// Prefix for environment overrides, eg. `TRUCKSIM__SIMULATION__TOLERANCE_KM=1.5`.
pub const ENV_PREFIX: &str = "TRUCKSIM";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub depot: GeoPoint,
    pub destinations: Vec<Destination>,
    pub simulation: SimulationConfig,
    pub diversion: DiversionConfig,
    pub network: NetworkConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub speed_kmh: f64,
    pub interval_s: f64,
    pub tolerance_km: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiversionConfig {
    pub probability: f64,
    pub special_point: GeoPoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// GeoJSON file under `<data_dir>/geojson`.
    pub geojson: String,
    /// Radius around the depot; roads outside are dropped.
    pub scope_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    /// Run journal directory; the journal stays in memory when unset.
    pub journal_dir: Option<PathBuf>,
    pub log_file: Option<String>,
}

impl Config {
    /// Parse and validate a TOML file. Missing keys fall back to the
    /// defaults; environment overrides are not applied.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, then the TOML file at `path` if it exists, then
    /// `TRUCKSIM__`-prefixed environment variables.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            .add_source(config::File::from(path).format(config::FileFormat::Toml).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("loading configuration from {}", path.display()))?;
        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every derived value can actually be built.
    pub fn validate(&self) -> Result<()> {
        self.registry().context("invalid destinations")?;
        self.diversion_policy().context("invalid diversion")?;
        self.sampling_interval().context("invalid simulation interval")?;
        let speed = self.simulation.speed_kmh;
        if !speed.is_finite() || speed <= 0.0 {
            anyhow::bail!("speed_kmh must be a positive number, got {}", speed);
        }
        let tolerance = self.simulation.tolerance_km;
        if !tolerance.is_finite() || tolerance < 0.0 {
            anyhow::bail!("tolerance_km must be a non-negative number, got {}", tolerance);
        }
        let scope = self.network.scope_m;
        if !scope.is_finite() || scope <= 0.0 {
            anyhow::bail!("network.scope_m must be a positive number, got {}", scope);
        }
        Ok(())
    }

    pub fn registry(&self) -> DomainResult<DestinationRegistry> {
        DestinationRegistry::new(self.depot, self.destinations.clone())
    }

    pub fn diversion_policy(&self) -> DomainResult<DiversionPolicy> {
        DiversionPolicy::new(self.diversion.probability, self.diversion.special_point)
    }

    pub fn sampling_interval(&self) -> DomainResult<SamplingInterval> {
        SamplingInterval::from_secs(self.simulation.interval_s)
    }

    pub fn speed_mps(&self) -> f64 {
        self.simulation.speed_kmh / 3.6
    }

    pub fn network_options(&self) -> NetworkOptions {
        NetworkOptions {
            speed_mps: self.speed_mps(),
            scope: Some((self.depot, self.network.scope_m)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let registry = DestinationRegistry::default_registry();
        Self {
            depot: registry.depot(),
            destinations: registry.iter().cloned().collect(),
            simulation: SimulationConfig::default(),
            diversion: DiversionConfig::default(),
            network: NetworkConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            speed_kmh: 50.0,
            interval_s: 5.0,
            tolerance_km: DEFAULT_TOLERANCE_KM,
        }
    }
}

impl Default for DiversionConfig {
    fn default() -> Self {
        Self {
            probability: DiversionPolicy::DEFAULT_PROBABILITY,
            special_point: DiversionPolicy::DEFAULT_SPECIAL_POINT,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            geojson: "streets.geojson".to_string(),
            scope_m: 15_000.0,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("resources"),
            journal_dir: None,
            log_file: None,
        }
    }
}
