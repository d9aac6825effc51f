use eyre::{Context, Result};
use loadcycle::LoaderConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub loader: LoaderConfig,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Start/stop cycles the simulated host goes through
    pub cycles: u32,
    /// How long one load takes
    pub load_delay_ms: u64,
    /// How long the host stays started per cycle
    pub pause_ms: u64,
    /// Whether the worker stops early when canceled
    pub honor_cancel: bool,
    /// Probability that a load reports an error instead of data
    pub error_rate: f64,
    /// Signal a content change every N cycles (0 disables)
    pub content_change_every: u32,
    /// Size of each loaded buffer
    pub payload_bytes: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            cycles: 20,
            load_delay_ms: 30,
            pause_ms: 20,
            honor_cancel: true,
            error_rate: 0.1,
            content_change_every: 3,
            payload_bytes: 4096,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            loader: LoaderConfig::default().with_name("simulation"),
            simulation: SimulationConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.loader.validate()?;
        if self.simulation.cycles == 0 {
            eyre::bail!("simulation.cycles must be > 0");
        }
        if !(0.0..=1.0).contains(&self.simulation.error_rate) {
            eyre::bail!("simulation.error_rate must be between 0 and 1");
        }
        Ok(())
    }
}
