//! Application configuration.

use std::path::{Path, PathBuf};

use citypulse_telemetry_model::zone::{ZoneBound, ZoneTable, DEFAULT_FALLBACK_ZONE};
use serde::{Deserialize, Serialize};

use crate::error::{CitypulseError, CitypulseResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Stage and runner settings.
    pub pipeline: PipelineDefaults,

    /// Thresholds used by the query layer to raise alerts.
    pub alerts: AlertThresholds,

    /// Analytics export settings.
    pub export: ExportDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Settings consumed by the processing stages and the local runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineDefaults {
    /// Ordered zone bounds; the first containing zone wins.
    pub zones: Vec<ZoneBound>,

    /// Zone name used when no bound contains a point.
    pub fallback_zone: String,

    /// Seed for ambient-noise sampling. `None` draws from OS entropy.
    pub noise_seed: Option<u64>,

    /// Number of partition workers for the grouping stages.
    pub workers: usize,
}

/// Alert thresholds, grouped by domain.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AlertThresholds {
    pub traffic: TrafficThresholds,
    pub pollution: PollutionThresholds,
    pub noise: NoiseThresholds,
}

/// Average-speed thresholds (km/h).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficThresholds {
    /// Below this the zone is considered jammed.
    pub speed_low: f64,
    /// Below this the zone is considered slow.
    pub speed_medium: f64,
}

/// Pollutant thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PollutionThresholds {
    pub co2_high: f64,
    pub co_high: f64,
    pub nox_high: f64,
    pub pmx_high: f64,
}

/// Ambient noise thresholds (dB).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseThresholds {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

/// Analytics export parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportDefaults {
    /// Rows per written batch.
    pub batch_size: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "citypulse_processing_core=trace,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path. Logs go to stderr when unset.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineDefaults::default(),
            alerts: AlertThresholds::default(),
            export: ExportDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for PipelineDefaults {
    fn default() -> Self {
        Self {
            zones: ZoneTable::casablanca().bounds().to_vec(),
            fallback_zone: DEFAULT_FALLBACK_ZONE.to_string(),
            noise_seed: None,
            workers: 1,
        }
    }
}

impl PipelineDefaults {
    /// Build the zone lookup table described by this configuration.
    pub fn zone_table(&self) -> ZoneTable {
        ZoneTable::new(self.zones.clone(), self.fallback_zone.clone())
    }
}

impl Default for TrafficThresholds {
    fn default() -> Self {
        Self {
            speed_low: 20.0,
            speed_medium: 40.0,
        }
    }
}

impl Default for PollutionThresholds {
    fn default() -> Self {
        Self {
            co2_high: 1000.0,
            co_high: 50.0,
            nox_high: 1.0,
            pmx_high: 100.0,
        }
    }
}

impl Default for NoiseThresholds {
    fn default() -> Self {
        Self {
            low: 55.0,
            medium: 70.0,
            high: 85.0,
        }
    }
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self { batch_size: 500 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path. Missing or invalid files are errors.
    pub fn load_from(path: &Path) -> CitypulseResult<Self> {
        if !path.exists() {
            return Err(CitypulseError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| CitypulseError::config(format!("{}: {e}", path.display())))?;
        config.check()?;
        Ok(config)
    }

    /// Save config to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    fn check(&self) -> CitypulseResult<()> {
        for zone in &self.pipeline.zones {
            if zone.x_min > zone.x_max || zone.y_min > zone.y_max {
                return Err(CitypulseError::config(format!(
                    "zone '{}' has inverted bounds",
                    zone.name
                )));
            }
        }
        if self.export.batch_size == 0 {
            return Err(CitypulseError::config("export.batch_size must be positive"));
        }
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("citypulse").join("config.json")
}
