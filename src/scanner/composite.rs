//! Composite scan controller.
//!
//! Fuses the 2-axis galvo raster scanner and the 1-axis piezo objective
//! stage into one logical 3-axis confocal scanner. Every positioning or
//! scanning call enters here, gets split by axis group, converted and
//! clamped, and forwarded: the lateral portion to the galvo, the depth
//! portion straight to the piezo. Photon counts always come from the
//! galvo; the piezo never produces counts.
//!
//! The controller performs no internal threading, queueing, or buffering:
//! each call is a strictly sequential exchange with the two devices, and
//! the depth-scan loop awaits every piezo write before starting the paired
//! acquisition. Callers that need concurrent access must serialize around
//! the whole controller; interleaved per-axis writes would move the galvo
//! mid-line during a depth scan.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::ScannerSettings;
use crate::core::{AxisRange, PixelCounts, ScanClassification, ScanPath};
use crate::error::{ScanError, ScanResult};
use crate::hardware::capabilities::{
    ConfocalScanner, DepthActuator, LateralScanner, ScannerWiring,
};
use crate::scanner::units::DepthConversion;

/// Piezo axis addressed by the controller. Single-axis device.
const DEPTH_AXIS: u8 = 0;

/// Samples per lateral acquisition during a depth scan. The galvo rejects
/// single-sample clocked acquisitions, so each depth step scans a 2-sample
/// line at the held position and keeps the first sample.
const DEPTH_STEP_SAMPLES: usize = 2;

/// The composite 3-axis scanner.
///
/// Owns the coordination logic exclusively; the two device handles are
/// supplied at construction and released by [`reset`](ConfocalScanner::reset).
/// The depth range fields are the only mutable configuration state and are
/// written solely through the documented range setters.
pub struct CompositeScanController {
    galvo: Arc<dyn LateralScanner>,
    piezo: Arc<dyn DepthActuator>,
    piezo_serial: String,
    conversion: DepthConversion,
    depth_position_range: RwLock<AxisRange>,
    depth_voltage_range: RwLock<AxisRange>,
}

impl CompositeScanController {
    /// Build a controller over already-constructed device handles.
    pub fn new(
        galvo: Arc<dyn LateralScanner>,
        piezo: Arc<dyn DepthActuator>,
        settings: &ScannerSettings,
    ) -> Self {
        Self {
            galvo,
            piezo,
            piezo_serial: settings.piezo_serial.clone(),
            conversion: DepthConversion::new(settings.depth_offset),
            depth_position_range: RwLock::new(settings.piezo_position_range),
            depth_voltage_range: RwLock::new(settings.piezo_voltage_range),
        }
    }

    /// Connect the piezo and verify both collaborators respond.
    ///
    /// Fails fast with [`ScanError::HardwareUnavailable`] if either device
    /// is unreachable; connecting lab hardware is not retried here.
    pub async fn activate(&self) -> ScanResult<()> {
        self.piezo.connect(&self.piezo_serial).await.map_err(|err| {
            ScanError::HardwareUnavailable(format!("piezo '{}': {err:#}", self.piezo_serial))
        })?;

        let axes = self
            .piezo
            .axis_count()
            .await
            .map_err(|err| ScanError::HardwareUnavailable(format!("piezo axes: {err:#}")))?;
        if axes == 0 {
            return Err(ScanError::HardwareUnavailable(
                "piezo reports no axes".to_string(),
            ));
        }

        self.galvo
            .count_channels()
            .await
            .map_err(|err| ScanError::HardwareUnavailable(format!("galvo: {err:#}")))?;

        info!(piezo = %self.piezo_serial, "composite scanner activated");
        Ok(())
    }

    /// Release both devices. Alias for [`reset`](ConfocalScanner::reset).
    pub async fn deactivate(&self) -> ScanResult<()> {
        self.reset().await
    }

    /// Write one depth position: convert, clamp, open the loop, write.
    ///
    /// An out-of-range value is dropped without error: a stale position is
    /// preferred over an out-of-range actuator command. The skip is logged
    /// at `warn` level.
    async fn write_depth(&self, z: f64) -> ScanResult<()> {
        let value = self.conversion.to_actuator(z);
        let range = *self.depth_voltage_range.read().await;
        if !range.contains(value) {
            warn!(
                value,
                low = range.low(),
                high = range.high(),
                "depth write outside voltage range, skipping"
            );
            return Ok(());
        }

        // The servo must be off before the raw value lands, otherwise the
        // feedback loop fights the open-loop command.
        self.piezo.set_servo_enabled(DEPTH_AXIS, false).await?;
        self.piezo.write_raw(DEPTH_AXIS, value).await?;
        debug!(z_m = z, value, "depth write");
        Ok(())
    }

    /// Step the piezo once per sample, acquiring a 2-sample lateral line at
    /// the held `(x, y)` after each write and keeping the first sample.
    ///
    /// The count is only valid once the stage has settled at the new depth,
    /// so each write completes before its acquisition begins; steps never
    /// overlap.
    async fn depth_scan(&self, path: &ScanPath, pixel_clock: bool) -> ScanResult<PixelCounts> {
        let held = (path.x()[0], path.y()[0]);
        let step_path = [held; DEPTH_STEP_SAMPLES];

        let mut counts = Vec::with_capacity(path.len());
        for (index, &z) in path.z().iter().enumerate() {
            self.write_depth(z).await?;

            let line = self.galvo.scan_line(&step_path, pixel_clock).await?;
            let first = line.into_iter().next().ok_or_else(|| {
                ScanError::Instrument(anyhow::anyhow!(
                    "galvo returned an empty line at depth index {index}"
                ))
            })?;
            counts.push(first);
        }
        Ok(counts)
    }
}

#[async_trait]
impl ConfocalScanner for CompositeScanController {
    fn axes(&self) -> Vec<String> {
        vec!["x".to_string(), "y".to_string(), "z".to_string()]
    }

    async fn position_range(&self) -> ScanResult<[AxisRange; 3]> {
        let [x, y] = self.galvo.position_range().await?;
        Ok([x, y, *self.depth_position_range.read().await])
    }

    async fn set_position_range(&self, ranges: [AxisRange; 3]) -> ScanResult<()> {
        let [x, y, z] = ranges;
        self.galvo.set_position_range([x, y]).await?;
        *self.depth_position_range.write().await = z;
        Ok(())
    }

    async fn set_voltage_range(&self, ranges: [AxisRange; 3]) -> ScanResult<()> {
        let [x, y, z] = ranges;
        self.galvo.set_voltage_range([x, y]).await?;
        *self.depth_voltage_range.write().await = z;
        Ok(())
    }

    async fn count_channels(&self) -> ScanResult<Vec<String>> {
        Ok(self.galvo.count_channels().await?)
    }

    async fn set_up_clock(&self, frequency: Option<f64>, channel: Option<&str>) -> ScanResult<()> {
        Ok(self.galvo.set_up_clock(frequency, channel).await?)
    }

    async fn set_up_scanner(&self, wiring: ScannerWiring) -> ScanResult<()> {
        Ok(self.galvo.set_up_scanner(wiring).await?)
    }

    async fn set_position(&self, x: f64, y: f64, z: f64) -> ScanResult<()> {
        // The galvo's result is this call's status even when the depth
        // write is clamped away; a depth hardware failure still surfaces.
        let lateral = self.galvo.set_position(x, y).await;
        self.write_depth(z).await?;
        Ok(lateral?)
    }

    async fn position(&self) -> ScanResult<(f64, f64, f64)> {
        let (x, y) = self.galvo.scanner_position().await?;
        let reading = self.piezo.read_raw(DEPTH_AXIS).await?;
        Ok((x, y, self.conversion.to_meters(reading)))
    }

    async fn scan_line(&self, path: &ScanPath, pixel_clock: bool) -> ScanResult<PixelCounts> {
        match path.classify() {
            ScanClassification::Lateral => {
                Ok(self.galvo.scan_line(&path.lateral(), pixel_clock).await?)
            }
            ScanClassification::Depth => self.depth_scan(path, pixel_clock).await,
            ScanClassification::Unsupported => Err(ScanError::UnsupportedScanGeometry),
        }
    }

    async fn close(&self) -> ScanResult<()> {
        Ok(self.galvo.close().await?)
    }

    async fn close_clock(&self) -> ScanResult<()> {
        Ok(self.galvo.close_clock().await?)
    }

    async fn reset(&self) -> ScanResult<()> {
        // Best effort: the piezo is disconnected even if the galvo reset
        // fails, and the combined result reports every failure.
        let mut failures = Vec::new();
        if let Err(err) = self.galvo.reset().await {
            failures.push(ScanError::Instrument(err));
        }
        if let Err(err) = self.piezo.disconnect().await {
            failures.push(ScanError::Instrument(err));
        }

        if failures.is_empty() {
            info!("composite scanner reset");
            Ok(())
        } else {
            Err(ScanError::ShutdownFailed(failures))
        }
    }
}
