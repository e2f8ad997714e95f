//! Integration tests for the composite scanner against mock hardware.
//!
//! These pin the externally observable properties of the scanner contract:
//! classification dispatch, depth-scan sequencing, range clamping, and
//! best-effort cleanup.

use std::sync::Arc;

use confocal_scan::hardware::mock::{event_log, EventLog, HardwareEvent, MockGalvo, MockPiezo};
use confocal_scan::{
    AxisRange, CompositeScanController, ConfocalScanner, LateralScanner, ScanError, ScanPath,
    ScannerSettings, ScannerWiring,
};

fn settings() -> ScannerSettings {
    ScannerSettings {
        piezo_serial: "0118018724".to_string(),
        piezo_position_range: AxisRange::symmetric(50e-6),
        piezo_voltage_range: AxisRange::new(0.0, 100.0).unwrap(),
        depth_offset: 50.0,
    }
}

struct Harness {
    controller: CompositeScanController,
    galvo: Arc<MockGalvo>,
    piezo: Arc<MockPiezo>,
    log: EventLog,
}

impl Harness {
    fn new() -> Self {
        Self::with_galvo_failing_reset(false)
    }

    fn with_galvo_failing_reset(fail: bool) -> Self {
        let log = event_log();
        let mut galvo = MockGalvo::new(log.clone());
        if fail {
            galvo = galvo.with_failing_reset();
        }
        let galvo = Arc::new(galvo);
        let piezo = Arc::new(MockPiezo::new(log.clone()));
        let controller = CompositeScanController::new(galvo.clone(), piezo.clone(), &settings());
        Self {
            controller,
            galvo,
            piezo,
            log,
        }
    }

    async fn activated() -> Self {
        let harness = Self::new();
        harness.controller.activate().await.unwrap();
        harness.clear_log();
        harness
    }

    fn clear_log(&self) {
        self.log.lock().unwrap().clear();
    }

    fn events(&self) -> Vec<HardwareEvent> {
        self.log.lock().unwrap().clone()
    }
}

#[tokio::test]
async fn lateral_scan_passes_through_to_the_galvo() {
    let harness = Harness::activated().await;

    let path = ScanPath::new(
        vec![0.0, 1e-6, 2e-6, 3e-6],
        vec![5e-6; 4],
        vec![10e-6; 4],
    )
    .unwrap();
    let counts = harness.controller.scan_line(&path, true).await.unwrap();

    assert_eq!(counts.len(), 4);
    assert!(counts.iter().all(|pixel| pixel.len() == 2));
    assert_eq!(
        harness.events(),
        vec![HardwareEvent::GalvoScanLine {
            samples: 4,
            pixel_clock: true
        }]
    );
}

#[tokio::test]
async fn depth_scan_interleaves_writes_and_acquisitions_in_order() {
    let harness = Harness::activated().await;

    // Depth values 10, 20, 30 native units: z = native - 50, in microns.
    let path = ScanPath::new(
        vec![1e-6; 3],
        vec![2e-6; 3],
        vec![-40e-6, -30e-6, -20e-6],
    )
    .unwrap();
    let counts = harness.controller.scan_line(&path, false).await.unwrap();

    assert_eq!(counts.len(), 3);
    // First sample of each 2-sample acquisition: calls 0, 1, 2 of the mock.
    assert_eq!(counts[0], vec![0.0, 1.0]);
    assert_eq!(counts[1], vec![100.0, 101.0]);
    assert_eq!(counts[2], vec![200.0, 201.0]);

    let expected: Vec<HardwareEvent> = [10.0, 20.0, 30.0]
        .into_iter()
        .flat_map(|value| {
            [
                HardwareEvent::PiezoServo { enabled: false },
                HardwareEvent::PiezoWrite { value },
                HardwareEvent::GalvoScanLine {
                    samples: 2,
                    pixel_clock: false,
                },
            ]
        })
        .collect();
    assert_eq!(harness.events(), expected);
}

#[tokio::test]
async fn depth_scan_holds_the_lateral_position() {
    let harness = Harness::activated().await;

    let path = ScanPath::new(vec![3e-6; 2], vec![-4e-6; 2], vec![0.0, 5e-6]).unwrap();
    harness.controller.scan_line(&path, false).await.unwrap();

    // The galvo ends each 2-sample line at the held point.
    let (x, y) = harness.galvo.scanner_position().await.unwrap();
    assert_eq!((x, y), (3e-6, -4e-6));
}

#[tokio::test]
async fn mixed_geometry_is_rejected_before_any_hardware_call() {
    let harness = Harness::activated().await;

    let path = ScanPath::new(vec![0.0, 1e-6], vec![0.0; 2], vec![0.0, 1e-6]).unwrap();
    let err = harness.controller.scan_line(&path, false).await.unwrap_err();

    assert!(matches!(err, ScanError::UnsupportedScanGeometry));
    assert!(harness.events().is_empty());
}

#[tokio::test]
async fn malformed_paths_never_reach_hardware() {
    let empty = ScanPath::new(vec![], vec![], vec![]).unwrap_err();
    assert!(matches!(empty, ScanError::MalformedScanPath(_)));

    let mismatched = ScanPath::new(vec![0.0, 1.0], vec![0.0], vec![0.0, 1.0]).unwrap_err();
    assert!(matches!(mismatched, ScanError::MalformedScanPath(_)));

    // A path cannot be constructed, so the controller cannot be reached;
    // the harness log stays empty by construction.
    let harness = Harness::activated().await;
    assert!(harness.events().is_empty());
}

#[tokio::test]
async fn clamped_depth_write_still_returns_the_lateral_status() {
    let harness = Harness::activated().await;

    // 55 um maps to 105 native units, 5 above the configured max.
    let result = harness.controller.set_position(1e-6, 1e-6, 55e-6).await;
    assert!(result.is_ok());
    assert_eq!(harness.piezo.last_written().await, None);

    let events = harness.events();
    assert_eq!(events, vec![HardwareEvent::GalvoSetPosition { x: 1e-6, y: 1e-6 }]);
}

#[tokio::test]
async fn depth_scan_skips_clamped_steps_but_still_acquires() {
    let harness = Harness::activated().await;

    // Middle step maps to 105 native units and is dropped; the scan still
    // returns three pixels.
    let path = ScanPath::new(vec![0.0; 3], vec![0.0; 3], vec![0.0, 55e-6, 10e-6]).unwrap();
    let counts = harness.controller.scan_line(&path, false).await.unwrap();

    assert_eq!(counts.len(), 3);
    let writes: Vec<f64> = harness
        .events()
        .into_iter()
        .filter_map(|e| match e {
            HardwareEvent::PiezoWrite { value } => Some(value),
            _ => None,
        })
        .collect();
    assert_eq!(writes, vec![50.0, 60.0]);
    assert_eq!(harness.galvo.scan_calls().await, 3);
}

#[tokio::test]
async fn reset_is_best_effort_and_reports_failure() {
    let harness = Harness::with_galvo_failing_reset(true);
    harness.controller.activate().await.unwrap();
    assert!(harness.piezo.is_connected().await);
    harness.clear_log();

    let err = harness.controller.reset().await.unwrap_err();
    match err {
        ScanError::ShutdownFailed(failures) => assert_eq!(failures.len(), 1),
        other => panic!("expected ShutdownFailed, got {other:?}"),
    }

    // The piezo disconnect was still attempted and completed.
    assert!(!harness.piezo.is_connected().await);
    assert_eq!(
        harness.events(),
        vec![HardwareEvent::GalvoReset, HardwareEvent::PiezoDisconnect]
    );
}

#[tokio::test]
async fn reset_succeeds_when_both_devices_release() {
    let harness = Harness::activated().await;
    harness.controller.reset().await.unwrap();
    assert!(!harness.piezo.is_connected().await);
}

#[tokio::test]
async fn close_calls_pass_through_to_the_galvo() {
    let harness = Harness::activated().await;

    harness.controller.close().await.unwrap();
    harness.controller.close_clock().await.unwrap();

    assert_eq!(
        harness.events(),
        vec![HardwareEvent::GalvoClose, HardwareEvent::GalvoCloseClock]
    );
}

#[tokio::test]
async fn clock_and_scanner_setup_reach_the_galvo_unchanged() {
    let harness = Harness::activated().await;

    harness
        .controller
        .set_up_clock(Some(50e3), Some("/Dev1/Ctr0"))
        .await
        .unwrap();

    let wiring = ScannerWiring {
        counter_channels: Some(vec!["/Dev1/Ctr1".to_string()]),
        photon_sources: Some(vec!["/Dev1/PFI0".to_string(), "/Dev1/PFI1".to_string()]),
        clock_channel: Some("/Dev1/Ctr0InternalOutput".to_string()),
        scanner_ao_channels: Some(vec!["/Dev1/ao0".to_string(), "/Dev1/ao1".to_string()]),
    };
    harness
        .controller
        .set_up_scanner(wiring.clone())
        .await
        .unwrap();

    assert_eq!(
        harness.events(),
        vec![
            HardwareEvent::GalvoSetUpClock {
                frequency: Some(50e3),
                channel: Some("/Dev1/Ctr0".to_string()),
            },
            HardwareEvent::GalvoSetUpScanner { wiring },
        ]
    );
}

#[tokio::test]
async fn count_channels_come_from_the_galvo() {
    let harness = Harness::activated().await;
    let channels = harness.controller.count_channels().await.unwrap();
    assert_eq!(channels, vec!["apd0", "apd1"]);
}
