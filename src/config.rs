//! # Simulation Configuration
//!
//! Run parameters for the dock simulation, loaded from TOML. Every section
//! and field is optional; missing values fall back to the defaults below.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [simulation]
//! horizon = 72000.0
//! replications = 30
//! seed = 42
//!
//! [arrivals]
//! mean_gap = 10.0
//!
//! [crew]
//! min_initial = 6.0
//! max_initial = 11.0
//! shift_length = 12.0
//!
//! [stats]
//! pre_entry_wait = "dock"
//! ```
//!
//! All durations are in hours of simulated time.

// src/config.rs - Single configuration file
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration struct for a simulation run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SimConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub arrivals: ArrivalConfig,
    #[serde(default)]
    pub unloading: RangeConfig,
    #[serde(default)]
    pub crew: CrewConfig,
    #[serde(default = "default_replacement")]
    pub replacement: RangeConfig,
    #[serde(default)]
    pub stats: StatsConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            arrivals: ArrivalConfig::default(),
            unloading: RangeConfig::default(),
            crew: CrewConfig::default(),
            replacement: default_replacement(),
            stats: StatsConfig::default(),
        }
    }
}

/// Run length and replication settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// No new trains arrive after this time; trains already present drain.
    #[serde(default = "default_horizon")]
    pub horizon: f64,
    #[serde(default = "default_replications")]
    pub replications: u32,
    /// Base seed; replication `i` uses `seed + i`. Random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            horizon: default_horizon(),
            replications: default_replications(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ArrivalConfig {
    #[serde(default = "default_mean_gap")]
    pub mean_gap: f64,
}

impl Default for ArrivalConfig {
    fn default() -> Self {
        Self {
            mean_gap: default_mean_gap(),
        }
    }
}

/// Inclusive uniform range. Both bounds are required when the section is present.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RangeConfig {
    pub min: f64,
    pub max: f64,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            min: default_unload_min(),
            max: default_unload_max(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CrewConfig {
    #[serde(default = "default_crew_min")]
    pub min_initial: f64,
    #[serde(default = "default_crew_max")]
    pub max_initial: f64,
    /// Hours a crew may work; also the period between hog-outs.
    #[serde(default = "default_shift_length")]
    pub shift_length: f64,
}

impl Default for CrewConfig {
    fn default() -> Self {
        Self {
            min_initial: default_crew_min(),
            max_initial: default_crew_max(),
            shift_length: default_shift_length(),
        }
    }
}

/// How the wait of a train that reached the dock without its crew is counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PreEntryWait {
    /// The train stays in the queue until its crew arrives and it enters.
    #[default]
    Queue,
    /// The train leaves the queue as soon as the dock is handed to it.
    Dock,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StatsConfig {
    #[serde(default)]
    pub pre_entry_wait: PreEntryWait,
    /// Student-t quantile for the replication confidence interval.
    #[serde(default = "default_confidence_t")]
    pub confidence_t: f64,
    /// Number of hog-out histogram buckets; the last one collects the tail.
    #[serde(default = "default_histogram_buckets")]
    pub histogram_buckets: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            pre_entry_wait: PreEntryWait::default(),
            confidence_t: default_confidence_t(),
            histogram_buckets: default_histogram_buckets(),
        }
    }
}

impl SimConfig {
    /// Validate value ranges before a run starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));
        if !(self.simulation.horizon > 0.0) {
            return invalid("simulation.horizon must be > 0".to_string());
        }
        if self.simulation.replications == 0 {
            return invalid("simulation.replications must be at least 1".to_string());
        }
        if !(self.arrivals.mean_gap > 0.0) {
            return invalid("arrivals.mean_gap must be > 0".to_string());
        }
        for (name, min, max) in [
            ("unloading", self.unloading.min, self.unloading.max),
            ("crew", self.crew.min_initial, self.crew.max_initial),
            ("replacement", self.replacement.min, self.replacement.max),
        ] {
            if !(min >= 0.0) || !(max >= min) || !max.is_finite() {
                return invalid(format!("{} range [{}, {}] is not a valid range", name, min, max));
            }
        }
        if !(self.crew.shift_length > self.replacement.max) {
            return invalid(format!(
                "crew.shift_length ({}) must exceed replacement.max ({})",
                self.crew.shift_length, self.replacement.max
            ));
        }
        if self.stats.histogram_buckets == 0 {
            return invalid("stats.histogram_buckets must be at least 1".to_string());
        }
        Ok(())
    }
}

// Default value functions
fn default_horizon() -> f64 { 72000.0 }
fn default_replications() -> u32 { 1 }
fn default_mean_gap() -> f64 { 10.0 }
fn default_unload_min() -> f64 { 3.5 }
fn default_unload_max() -> f64 { 4.5 }
fn default_crew_min() -> f64 { 6.0 }
fn default_crew_max() -> f64 { 11.0 }
fn default_shift_length() -> f64 { 12.0 }
fn default_replacement() -> RangeConfig { RangeConfig { min: 2.5, max: 3.5 } }
fn default_confidence_t() -> f64 { 2.678 }
fn default_histogram_buckets() -> usize { 6 }

/// Load configuration from a TOML file at the given path.
pub fn load_config(path: &str) -> Result<SimConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::error!("Failed to parse config TOML: {}", e);
                Err(ConfigError::Toml(e))
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path, e);
            Err(ConfigError::Io(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_values() {
        let config = SimConfig::default();
        assert_eq!(config.simulation.horizon, 72000.0);
        assert_eq!(config.simulation.replications, 1);
        assert_eq!(config.arrivals.mean_gap, 10.0);
        assert_eq!(config.unloading, RangeConfig { min: 3.5, max: 4.5 });
        assert_eq!(config.crew.shift_length, 12.0);
        assert_eq!(config.stats.pre_entry_wait, PreEntryWait::Queue);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_matches_defaults() {
        let config: SimConfig = toml::from_str("").unwrap();
        assert_eq!(config, SimConfig::default());
        assert_eq!(config.replacement, RangeConfig { min: 2.5, max: 3.5 });
    }

    #[test]
    fn test_load_config_success() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("dock.toml");
        let mut file = File::create(&file_path).unwrap();
        writeln!(
            file,
            "[simulation]\nhorizon = 500.0\nseed = 9\n\n[stats]\npre_entry_wait = 'dock'"
        )
        .unwrap();
        file.flush().unwrap();
        let config = load_config(file_path.to_str().unwrap()).unwrap();
        assert_eq!(config.simulation.horizon, 500.0);
        assert_eq!(config.simulation.seed, Some(9));
        assert_eq!(config.stats.pre_entry_wait, PreEntryWait::Dock);
        // Defaults for missing fields
        assert_eq!(config.arrivals.mean_gap, 10.0);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent_file.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("bad.toml");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "not a valid toml").unwrap();
        file.flush().unwrap();
        let result = load_config(file_path.to_str().unwrap());
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_validate_rejects_bad_ranges() {
        let mut config = SimConfig::default();
        config.unloading = RangeConfig { min: 5.0, max: 4.0 };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = SimConfig::default();
        config.crew.shift_length = 3.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = SimConfig::default();
        config.arrivals.mean_gap = 0.0;
        assert!(config.validate().is_err());
    }
}
