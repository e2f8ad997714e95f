//! Mock hardware implementations.
//!
//! Simulated devices for exercising the composite controller without lab
//! hardware. Both mocks record every call into a shared [`EventLog`] so
//! tests can assert cross-device ordering, e.g. that a depth write lands
//! before the paired lateral acquisition starts.

use crate::core::{AxisRange, PixelCounts};
use crate::hardware::capabilities::{DepthActuator, LateralScanner, ScannerWiring};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

/// One recorded hardware call.
#[derive(Debug, Clone, PartialEq)]
pub enum HardwareEvent {
    /// Galvo mirror move.
    GalvoSetPosition {
        /// Target x, meters.
        x: f64,
        /// Target y, meters.
        y: f64,
    },
    /// Clocked line acquisition.
    GalvoScanLine {
        /// Number of samples in the submitted path.
        samples: usize,
        /// Whether a pixel clock was requested.
        pixel_clock: bool,
    },
    /// Acquisition clock configured.
    GalvoSetUpClock {
        /// Requested clock frequency, Hz.
        frequency: Option<f64>,
        /// Requested clock channel.
        channel: Option<String>,
    },
    /// Counters and analog outputs configured.
    GalvoSetUpScanner {
        /// Requested channel wiring.
        wiring: ScannerWiring,
    },
    /// Galvo reset.
    GalvoReset,
    /// Galvo close.
    GalvoClose,
    /// Galvo clock close.
    GalvoCloseClock,
    /// Piezo connection opened.
    PiezoConnect,
    /// Piezo connection closed.
    PiezoDisconnect,
    /// Servo loop toggled.
    PiezoServo {
        /// New servo state.
        enabled: bool,
    },
    /// Raw open-loop write.
    PiezoWrite {
        /// Written value, native units.
        value: f64,
    },
    /// Raw position read.
    PiezoRead,
}

/// Shared, ordered record of calls across both mock devices.
pub type EventLog = Arc<Mutex<Vec<HardwareEvent>>>;

/// Create an empty event log to share between mocks.
pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

fn record(log: &EventLog, event: HardwareEvent) {
    if let Ok(mut log) = log.lock() {
        log.push(event);
    }
}

// =============================================================================
// MockGalvo - Simulated 2-Axis Raster Scanner
// =============================================================================

/// Mock galvo scanner with deterministic canned counts.
///
/// `scan_line` for call number `c` returns, for pixel `j` and channel
/// `ch`, the value `c * 100 + j * 10 + ch`. Samples within one line are
/// therefore distinguishable, which lets tests verify that the depth-scan
/// path keeps only the first sample of each 2-sample acquisition.
pub struct MockGalvo {
    position: RwLock<(f64, f64)>,
    position_range: RwLock<[AxisRange; 2]>,
    voltage_range: RwLock<[AxisRange; 2]>,
    channels: Vec<String>,
    scan_calls: RwLock<u64>,
    fail_reset: bool,
    log: EventLog,
}

impl MockGalvo {
    /// New mock galvo recording into `log`.
    pub fn new(log: EventLog) -> Self {
        Self {
            position: RwLock::new((0.0, 0.0)),
            position_range: RwLock::new([AxisRange::symmetric(175e-6); 2]),
            voltage_range: RwLock::new([AxisRange::symmetric(10.0); 2]),
            channels: vec!["apd0".to_string(), "apd1".to_string()],
            scan_calls: RwLock::new(0),
            fail_reset: false,
            log,
        }
    }

    /// Make `reset` fail, for best-effort cleanup tests.
    pub fn with_failing_reset(mut self) -> Self {
        self.fail_reset = true;
        self
    }

    /// Number of line scans issued so far.
    pub async fn scan_calls(&self) -> u64 {
        *self.scan_calls.read().await
    }

    /// Currently configured analog voltage range, `[x, y]`.
    pub async fn voltage_range(&self) -> [AxisRange; 2] {
        *self.voltage_range.read().await
    }
}

#[async_trait]
impl LateralScanner for MockGalvo {
    async fn position_range(&self) -> Result<[AxisRange; 2]> {
        Ok(*self.position_range.read().await)
    }

    async fn set_position_range(&self, ranges: [AxisRange; 2]) -> Result<()> {
        *self.position_range.write().await = ranges;
        Ok(())
    }

    async fn set_voltage_range(&self, ranges: [AxisRange; 2]) -> Result<()> {
        *self.voltage_range.write().await = ranges;
        Ok(())
    }

    async fn scanner_position(&self) -> Result<(f64, f64)> {
        Ok(*self.position.read().await)
    }

    async fn set_position(&self, x: f64, y: f64) -> Result<()> {
        record(&self.log, HardwareEvent::GalvoSetPosition { x, y });
        *self.position.write().await = (x, y);
        Ok(())
    }

    async fn scan_line(&self, path: &[(f64, f64)], pixel_clock: bool) -> Result<PixelCounts> {
        if path.is_empty() {
            bail!("galvo rejects an empty line");
        }
        if path.len() < 2 {
            bail!("galvo rejects single-sample clocked acquisitions");
        }
        record(
            &self.log,
            HardwareEvent::GalvoScanLine {
                samples: path.len(),
                pixel_clock,
            },
        );

        let mut calls = self.scan_calls.write().await;
        let call = *calls;
        *calls += 1;

        if let Some(&(x, y)) = path.last() {
            *self.position.write().await = (x, y);
        }

        let counts = (0..path.len())
            .map(|pixel| {
                (0..self.channels.len())
                    .map(|channel| (call * 100 + pixel as u64 * 10 + channel as u64) as f64)
                    .collect()
            })
            .collect();
        Ok(counts)
    }

    async fn count_channels(&self) -> Result<Vec<String>> {
        Ok(self.channels.clone())
    }

    async fn set_up_clock(&self, frequency: Option<f64>, channel: Option<&str>) -> Result<()> {
        record(
            &self.log,
            HardwareEvent::GalvoSetUpClock {
                frequency,
                channel: channel.map(str::to_string),
            },
        );
        Ok(())
    }

    async fn set_up_scanner(&self, wiring: ScannerWiring) -> Result<()> {
        record(&self.log, HardwareEvent::GalvoSetUpScanner { wiring });
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        record(&self.log, HardwareEvent::GalvoClose);
        Ok(())
    }

    async fn close_clock(&self) -> Result<()> {
        record(&self.log, HardwareEvent::GalvoCloseClock);
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        record(&self.log, HardwareEvent::GalvoReset);
        if self.fail_reset {
            bail!("galvo reset failed");
        }
        Ok(())
    }
}

// =============================================================================
// MockPiezo - Simulated 1-Axis Objective Stage
// =============================================================================

/// Mock piezo stage.
///
/// Rejects raw writes while disconnected or while the servo loop is
/// engaged, pinning the controller's disable-then-write sequencing.
/// `read_raw` returns the last written value, so written positions read
/// back exactly.
pub struct MockPiezo {
    connected: RwLock<bool>,
    servo_enabled: RwLock<bool>,
    last_written: RwLock<Option<f64>>,
    resting_value: f64,
    axis_count: usize,
    fail_connect: bool,
    log: EventLog,
}

impl MockPiezo {
    /// New mock piezo recording into `log`. Starts disconnected with the
    /// servo engaged, resting at mid-travel (50.0 native units).
    pub fn new(log: EventLog) -> Self {
        Self {
            connected: RwLock::new(false),
            servo_enabled: RwLock::new(true),
            last_written: RwLock::new(None),
            resting_value: 50.0,
            axis_count: 1,
            fail_connect: false,
            log,
        }
    }

    /// Make `connect` fail, for activation fail-fast tests.
    pub fn with_failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Report `count` axes instead of one.
    pub fn with_axis_count(mut self, count: usize) -> Self {
        self.axis_count = count;
        self
    }

    /// Last value accepted by `write_raw`, if any.
    pub async fn last_written(&self) -> Option<f64> {
        *self.last_written.read().await
    }

    /// Whether the connection is currently open.
    pub async fn is_connected(&self) -> bool {
        *self.connected.read().await
    }
}

#[async_trait]
impl DepthActuator for MockPiezo {
    async fn connect(&self, serial: &str) -> Result<()> {
        if self.fail_connect {
            bail!("no controller with serial '{serial}' found");
        }
        record(&self.log, HardwareEvent::PiezoConnect);
        *self.connected.write().await = true;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        record(&self.log, HardwareEvent::PiezoDisconnect);
        *self.connected.write().await = false;
        Ok(())
    }

    async fn axis_count(&self) -> Result<usize> {
        if !*self.connected.read().await {
            bail!("piezo is not connected");
        }
        Ok(self.axis_count)
    }

    async fn set_servo_enabled(&self, axis: u8, enabled: bool) -> Result<()> {
        self.check_axis(axis).await?;
        record(&self.log, HardwareEvent::PiezoServo { enabled });
        *self.servo_enabled.write().await = enabled;
        Ok(())
    }

    async fn write_raw(&self, axis: u8, value: f64) -> Result<()> {
        self.check_axis(axis).await?;
        if *self.servo_enabled.read().await {
            bail!("raw write rejected while servo is enabled");
        }
        record(&self.log, HardwareEvent::PiezoWrite { value });
        *self.last_written.write().await = Some(value);
        Ok(())
    }

    async fn read_raw(&self, axis: u8) -> Result<f64> {
        self.check_axis(axis).await?;
        record(&self.log, HardwareEvent::PiezoRead);
        Ok(self.last_written.read().await.unwrap_or(self.resting_value))
    }
}

impl MockPiezo {
    async fn check_axis(&self, axis: u8) -> Result<()> {
        if !*self.connected.read().await {
            bail!("piezo is not connected");
        }
        if usize::from(axis) >= self.axis_count {
            bail!("axis {axis} out of range ({} axes)", self.axis_count);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn galvo_counts_are_shaped_k_by_m() {
        let galvo = MockGalvo::new(event_log());
        let counts = galvo
            .scan_line(&[(0.0, 0.0), (1e-6, 0.0), (2e-6, 0.0)], false)
            .await
            .unwrap();
        assert_eq!(counts.len(), 3);
        assert!(counts.iter().all(|pixel| pixel.len() == 2));
        // First call, pixel 1, channel 0.
        assert_eq!(counts[1][0], 10.0);
    }

    #[tokio::test]
    async fn galvo_rejects_single_sample_lines() {
        let galvo = MockGalvo::new(event_log());
        assert!(galvo.scan_line(&[(0.0, 0.0)], false).await.is_err());
    }

    #[tokio::test]
    async fn piezo_requires_connection() {
        let piezo = MockPiezo::new(event_log());
        assert!(piezo.write_raw(0, 10.0).await.is_err());
        assert!(piezo.axis_count().await.is_err());
    }

    #[tokio::test]
    async fn piezo_rejects_write_with_servo_engaged() {
        let piezo = MockPiezo::new(event_log());
        piezo.connect("test").await.unwrap();
        assert!(piezo.write_raw(0, 10.0).await.is_err());

        piezo.set_servo_enabled(0, false).await.unwrap();
        piezo.write_raw(0, 10.0).await.unwrap();
        assert_eq!(piezo.last_written().await, Some(10.0));
        assert_eq!(piezo.read_raw(0).await.unwrap(), 10.0);
    }

    #[tokio::test]
    async fn piezo_reads_resting_value_before_first_write() {
        let piezo = MockPiezo::new(event_log());
        piezo.connect("test").await.unwrap();
        assert_eq!(piezo.read_raw(0).await.unwrap(), 50.0);
    }
}
