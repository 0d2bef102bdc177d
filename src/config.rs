use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackendType {
    Jsonl,
    Sqlite,
}

impl BackendType {
    /// `--backend jsonl|sqlite` from the command line, JSONL when absent
    pub fn from_args(args: &[String]) -> Self {
        if let Some(idx) = args.iter().position(|x| x == "--backend") {
            match args.get(idx + 1).map(|s| s.as_str()) {
                Some("sqlite") => return BackendType::Sqlite,
                Some("jsonl") => return BackendType::Jsonl,
                other => log::warn!("Unknown backend {:?}, defaulting to JSONL", other),
            }
        }
        BackendType::Jsonl
    }
}

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    MissingVariable(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(var) => write!(f, "Missing environment variable: {}", var),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

pub const DEFAULT_SOURCE_LABEL: &str = "hbhereco";
pub const DEFAULT_INPUT_PATH: &str = "data/rechits.jsonl";
pub const DEFAULT_JSONL_OUTPUT: &str = "output/timing_maps";
pub const DEFAULT_SQLITE_OUTPUT: &str = "output/timing_maps.db";

/// Job configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct TimingConfig {
    /// Collection label of the rechits to read
    pub source_label: String,
    /// When set, events from any other run are skipped
    pub target_run_number: Option<u32>,
    /// Minimum (exclusive) energy for a hit to enter the timing maps
    pub energy_threshold: f64,
    /// Value axis of the timing profiles
    pub time_range_low: f64,
    pub time_range_high: f64,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub backend: BackendType,
    /// Pulse-shape capture above this energy; disabled when unset
    pub diagnostic_energy: Option<f64>,
}

impl TimingConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `HBHE_SOURCE_LABEL` (default: hbhereco)
    /// - `HBHE_TARGET_RUN` (optional)
    /// - `HBHE_ENERGY_THRESHOLD` (required)
    /// - `HBHE_TIME_LOW` (required)
    /// - `HBHE_TIME_HIGH` (required)
    /// - `HBHE_INPUT_PATH` (default: data/rechits.jsonl)
    /// - `HBHE_OUTPUT_PATH` (default: output/timing_maps, or output/timing_maps.db for SQLite)
    /// - `HBHE_DIAGNOSTIC_ENERGY` (optional)
    pub fn from_env(backend: BackendType) -> Result<Self, ConfigError> {
        Self::from_lookup(backend, |key| env::var(key).ok())
    }

    pub fn from_lookup<F>(backend: BackendType, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required_f64 = |key: &str| -> Result<f64, ConfigError> {
            let raw = lookup(key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))?;
            parse_f64(key, &raw)
        };

        let energy_threshold = required_f64("HBHE_ENERGY_THRESHOLD")?;
        let time_range_low = required_f64("HBHE_TIME_LOW")?;
        let time_range_high = required_f64("HBHE_TIME_HIGH")?;

        if time_range_low >= time_range_high {
            return Err(ConfigError::InvalidValue(format!(
                "HBHE_TIME_LOW ({}) must be below HBHE_TIME_HIGH ({})",
                time_range_low, time_range_high
            )));
        }

        let target_run_number = match lookup("HBHE_TARGET_RUN") {
            Some(raw) => Some(raw.trim().parse::<u32>().map_err(|_| {
                ConfigError::InvalidValue(format!("HBHE_TARGET_RUN must be a run number, got '{}'", raw))
            })?),
            None => None,
        };

        let diagnostic_energy = match lookup("HBHE_DIAGNOSTIC_ENERGY") {
            Some(raw) => Some(parse_f64("HBHE_DIAGNOSTIC_ENERGY", &raw)?),
            None => None,
        };

        let default_output = match backend {
            BackendType::Jsonl => DEFAULT_JSONL_OUTPUT,
            BackendType::Sqlite => DEFAULT_SQLITE_OUTPUT,
        };

        Ok(Self {
            source_label: lookup("HBHE_SOURCE_LABEL").unwrap_or_else(|| DEFAULT_SOURCE_LABEL.to_string()),
            target_run_number,
            energy_threshold,
            time_range_low,
            time_range_high,
            input_path: lookup("HBHE_INPUT_PATH")
                .unwrap_or_else(|| DEFAULT_INPUT_PATH.to_string())
                .into(),
            output_path: lookup("HBHE_OUTPUT_PATH")
                .unwrap_or_else(|| default_output.to_string())
                .into(),
            backend,
            diagnostic_energy,
        })
    }
}

fn parse_f64(key: &str, raw: &str) -> Result<f64, ConfigError> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ConfigError::InvalidValue(format!(
            "{} must be a finite number, got '{}'",
            key, raw
        ))),
    }
}
