//! Configuration management.
//!
//! Settings are read from a TOML file through the `config` crate. The
//! scanner section carries the piezo's serial id and its two range
//! tables; all of them are required, a missing value is a load-time
//! error rather than a silent default.

use crate::core::AxisRange;
use crate::error::ScanError;
use ::config::Config;
use serde::Deserialize;
use std::path::Path;

/// Top-level application settings.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Default log level, overridable via `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Composite scanner configuration.
    pub scanner: ScannerSettings,
}

/// Configuration for the composite scanner.
#[derive(Debug, Deserialize, Clone)]
pub struct ScannerSettings {
    /// USB serial id of the piezo controller.
    pub piezo_serial: String,
    /// Caller-visible depth travel, meters, `[low, high]`.
    pub piezo_position_range: AxisRange,
    /// Safe write window in the actuator's native scale, `[low, high]`.
    /// Writes whose converted value falls outside are dropped.
    pub piezo_voltage_range: AxisRange,
    /// Actuator-native value corresponding to z = 0. The stage travels
    /// 0..100 in native units; centering the caller range at zero puts
    /// this at the physical midpoint.
    #[serde(default = "default_depth_offset")]
    pub depth_offset: f64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_depth_offset() -> f64 {
    50.0
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_path(path: &Path) -> Result<Self, ScanError> {
        let s = Config::builder()
            .add_source(::config::File::from(path))
            .build()
            .map_err(ScanError::Config)?;

        s.try_deserialize().map_err(ScanError::Config)
    }
}
