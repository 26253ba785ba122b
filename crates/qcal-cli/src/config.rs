//! Configuration for the qcal CLI.
//!
//! Supports loading configuration from:
//! 1. A YAML file (`--config`, or `~/.qcal/config.yaml` if present)
//! 2. Environment variables (with QCAL_ prefix)
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line flags
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use qcal_adapter_sim::{QutritDevice, SimulatorBackend};

/// Complete CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Calibration store file
    #[serde(default = "default_store")]
    pub store: PathBuf,

    /// Default shots per program
    #[serde(default = "default_shots")]
    pub shots: u32,

    /// Log level used when no -v flag is given
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Simulated device
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

/// Simulated device settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Number of qutrits on the line
    #[serde(default = "default_num_qubits")]
    pub num_qubits: u32,

    /// Seed for shot noise; counts are expectation values when absent
    #[serde(default)]
    pub shot_noise_seed: Option<u64>,

    /// Hidden device parameters per qubit
    #[serde(default)]
    pub devices: BTreeMap<u32, QutritDevice>,
}

// Default value functions
fn default_store() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".qcal"))
        .unwrap_or_else(|| PathBuf::from(".qcal"))
        .join("store.json")
}

fn default_shots() -> u32 {
    1024
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_num_qubits() -> u32 {
    5
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            num_qubits: default_num_qubits(),
            shot_noise_seed: None,
            devices: BTreeMap::new(),
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        CalibrationConfig {
            store: default_store(),
            shots: default_shots(),
            log_level: default_log_level(),
            simulator: SimulatorConfig::default(),
        }
    }
}

impl CalibrationConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let config: CalibrationConfig = serde_yaml_ng::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with the following precedence:
    /// 1. Load from the given file, else from `~/.qcal/config.yaml` if it exists
    /// 2. Apply environment variable overrides
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => match default_config_file().filter(|p| p.exists()) {
                Some(path) => Self::from_file(path)?,
                None => CalibrationConfig::default(),
            },
        };

        config = config.merge_env(|name| std::env::var(name).ok());

        config.validate()?;
        Ok(config)
    }

    /// Merge environment variables into this configuration.
    ///
    /// Only variables that are set override the file-loaded (or default)
    /// values.
    fn merge_env(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = var("QCAL_STORE") {
            self.store = PathBuf::from(v);
        }
        if let Some(v) = var("QCAL_SHOTS") {
            if let Ok(val) = v.parse() {
                self.shots = val;
            }
        }
        if let Some(v) = var("QCAL_LOG_LEVEL") {
            self.log_level = v;
        }
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shots == 0 {
            return Err(ConfigError::ValidationError(
                "shots must be greater than 0".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {other}"
                )));
            }
        }

        if self.simulator.num_qubits == 0 {
            return Err(ConfigError::ValidationError(
                "simulator.num_qubits must be greater than 0".to_string(),
            ));
        }

        if let Some(q) = self
            .simulator
            .devices
            .keys()
            .find(|q| **q >= self.simulator.num_qubits)
        {
            return Err(ConfigError::ValidationError(format!(
                "device for qubit {q} but the simulator has {} qubits",
                self.simulator.num_qubits
            )));
        }

        Ok(())
    }

    /// Build the simulator described by this configuration.
    pub fn simulator_backend(&self, num_qubits: Option<u32>) -> SimulatorBackend {
        let mut backend = SimulatorBackend::new(num_qubits.unwrap_or(self.simulator.num_qubits));
        for (qubit, device) in &self.simulator.devices {
            backend = backend.with_device(*qubit, device.clone());
        }
        if let Some(seed) = self.simulator.shot_noise_seed {
            backend = backend.with_shot_noise(seed);
        }
        backend
    }
}

/// `~/.qcal/config.yaml`.
fn default_config_file() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".qcal").join("config.yaml"))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
