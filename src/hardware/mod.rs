//! Hardware capability contracts and simulated devices.

pub mod capabilities;
pub mod mock;

pub use capabilities::{ConfocalScanner, DepthActuator, LateralScanner, ScannerWiring};
