//! Composite 3-axis confocal scanner control.
//!
//! This crate fuses two lab devices into one logical scanning instrument:
//! a fast, clock-driven 2-axis galvo scanner (xy raster plus photon
//! counting) and a slow, point-addressed piezo objective stage (z). The
//! imaging engine above talks to a single
//! [`hardware::capabilities::ConfocalScanner`] contract and never sees
//! that the underlying axes differ in control model, units, or timing.
//!
//! The real logic lives in [`scanner::composite::CompositeScanController`]:
//! scan-path classification, unit conversion at the depth seam, range
//! clamping, and per-pixel count assembly. Both devices are consumed
//! through capability traits; their transports stay outside this crate.

pub mod config;
pub mod core;
pub mod error;
pub mod hardware;
pub mod logging;
pub mod scanner;

pub use crate::config::{ScannerSettings, Settings};
pub use crate::core::{AxisRange, PixelCounts, ScanClassification, ScanPath};
pub use crate::error::{ScanError, ScanResult};
pub use crate::hardware::capabilities::{
    ConfocalScanner, DepthActuator, LateralScanner, ScannerWiring,
};
pub use crate::scanner::composite::CompositeScanController;
