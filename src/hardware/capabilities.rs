//! Hardware capability traits for the composite scanner.
//!
//! Fine-grained contracts that devices implement for the functionality
//! they actually support. The composite controller is written purely
//! against these traits, so device transports (NI-DAQ clocking for the
//! galvo, the GCS connection for the piezo) stay outside this crate.
//!
//! Each capability trait:
//! - Is async (uses `#[async_trait]`)
//! - Is thread-safe (requires `Send + Sync`)
//! - Uses `anyhow::Result` so device errors propagate unchanged

use crate::core::{AxisRange, PixelCounts, ScanPath};
use crate::error::ScanResult;
use anyhow::Result;
use async_trait::async_trait;

/// Optional channel wiring handed through to the galvo's scanner setup.
///
/// Every field is optional; `None` keeps the device's configured default,
/// mirroring the underlying hardware API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannerWiring {
    /// Physical counting devices.
    pub counter_channels: Option<Vec<String>>,
    /// Physical channels the photons are counted from.
    pub photon_sources: Option<Vec<String>>,
    /// Clock channel driving the counter.
    pub clock_channel: Option<String>,
    /// Analog output channels steering the mirrors.
    pub scanner_ao_channels: Option<Vec<String>>,
}

/// Capability: 2-axis clock-driven raster scanner with photon counting.
///
/// # Contract
/// - Positions are in meters; ranges are `[x, y]` ordered
/// - `scan_line` blocks for the whole clocked acquisition and returns
///   counts shaped `k` pixels by `m` channels, `m` matching
///   `count_channels`
/// - Single-sample clocked acquisitions are rejected by the hardware;
///   callers needing one pixel must submit a 2-sample line
#[async_trait]
pub trait LateralScanner: Send + Sync {
    /// Physical scan range per axis, `[x, y]`.
    async fn position_range(&self) -> Result<[AxisRange; 2]>;

    /// Set the physical scan range per axis, `[x, y]`.
    async fn set_position_range(&self, ranges: [AxisRange; 2]) -> Result<()>;

    /// Set the analog output voltage range per axis, `[x, y]`.
    async fn set_voltage_range(&self, ranges: [AxisRange; 2]) -> Result<()>;

    /// Current mirror position `(x, y)`, meters.
    async fn scanner_position(&self) -> Result<(f64, f64)>;

    /// Move the mirrors to `(x, y)`, meters.
    async fn set_position(&self, x: f64, y: f64) -> Result<()>;

    /// Scan a clocked line and return photon-count rates per pixel.
    async fn scan_line(&self, path: &[(f64, f64)], pixel_clock: bool) -> Result<PixelCounts>;

    /// Ordered photon-count channel identifiers.
    async fn count_channels(&self) -> Result<Vec<String>>;

    /// Configure the hardware clock that times the acquisition.
    async fn set_up_clock(&self, frequency: Option<f64>, channel: Option<&str>) -> Result<()>;

    /// Configure counters and analog outputs against the running clock.
    async fn set_up_scanner(&self, wiring: ScannerWiring) -> Result<()>;

    /// Close the scanner and release its analog output task.
    async fn close(&self) -> Result<()>;

    /// Close the clock task.
    async fn close_clock(&self) -> Result<()>;

    /// Reset the device so other programs can access it.
    async fn reset(&self) -> Result<()>;
}

/// Capability: 1-axis position/voltage-addressable stage.
///
/// # Contract
/// - `connect` must succeed before any other call
/// - Values are in the device's native scale (the objective piezo travels
///   0..100)
/// - `write_raw` is an open-loop analog write; disable the servo first or
///   the feedback loop fights the command
#[async_trait]
pub trait DepthActuator: Send + Sync {
    /// Open the connection to the controller with the given serial id.
    async fn connect(&self, serial: &str) -> Result<()>;

    /// Close the connection so other programs can access the device.
    async fn disconnect(&self) -> Result<()>;

    /// Number of axes the controller exposes.
    async fn axis_count(&self) -> Result<usize>;

    /// Enable or disable closed-loop servo control on one axis.
    async fn set_servo_enabled(&self, axis: u8, enabled: bool) -> Result<()>;

    /// Write a raw open-loop value to one axis.
    async fn write_raw(&self, axis: u8, value: f64) -> Result<()>;

    /// Read the axis position in the device's native scale.
    async fn read_raw(&self, axis: u8) -> Result<f64>;
}

/// The 3-axis scanner contract consumed by the imaging engine.
///
/// Implemented by [`crate::CompositeScanController`]. Positions at this
/// boundary are meters on all three axes; voltage ranges use each
/// device's native scale. Range tuples are ordered `[x, y, z]`.
#[async_trait]
pub trait ConfocalScanner: Send + Sync {
    /// Scan axis names, fixed `["x", "y", "z"]`.
    fn axes(&self) -> Vec<String>;

    /// Physical range per axis, `[x, y, z]`.
    async fn position_range(&self) -> ScanResult<[AxisRange; 3]>;

    /// Set the physical range per axis, `[x, y, z]`.
    async fn set_position_range(&self, ranges: [AxisRange; 3]) -> ScanResult<()>;

    /// Set the voltage range per axis, `[x, y, z]`.
    async fn set_voltage_range(&self, ranges: [AxisRange; 3]) -> ScanResult<()>;

    /// Ordered photon-count channel identifiers.
    async fn count_channels(&self) -> ScanResult<Vec<String>>;

    /// Configure the acquisition clock.
    async fn set_up_clock(&self, frequency: Option<f64>, channel: Option<&str>) -> ScanResult<()>;

    /// Configure counters and analog outputs.
    async fn set_up_scanner(&self, wiring: ScannerWiring) -> ScanResult<()>;

    /// Move all three axes to `(x, y, z)`, meters.
    async fn set_position(&self, x: f64, y: f64, z: f64) -> ScanResult<()>;

    /// Current position `(x, y, z)`, meters, re-read from hardware.
    async fn position(&self) -> ScanResult<(f64, f64, f64)>;

    /// Scan a line and return the counts on that line.
    async fn scan_line(&self, path: &ScanPath, pixel_clock: bool) -> ScanResult<PixelCounts>;

    /// Close the scanner.
    async fn close(&self) -> ScanResult<()>;

    /// Close the scanner clock.
    async fn close_clock(&self) -> ScanResult<()>;

    /// Release both devices, best effort.
    async fn reset(&self) -> ScanResult<()>;
}
