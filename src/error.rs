//! Custom error types for the scanner stack.
//!
//! `ScanError` is the single error type exposed by the composite
//! controller. Collaborator failures (galvo or piezo) arrive as
//! `anyhow::Error` from the capability traits and pass through the
//! `Instrument` variant unchanged; the controller only adds its own
//! classification and validation layer on top.

use thiserror::Error;

/// Convenience alias for results using the scanner error type.
pub type ScanResult<T> = std::result::Result<T, ScanError>;

/// Errors surfaced by the composite scanner.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Semantic error in configuration or constructed values, such as an
    /// inverted axis range.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// A collaborator handle is missing or disconnected. Fatal; connecting
    /// to lab hardware is not retried by this layer.
    #[error("Hardware unavailable: {0}")]
    HardwareUnavailable(String),

    /// The depth coordinate varies while a lateral coordinate also varies.
    /// No hardware is touched.
    #[error("Unsupported scan geometry: depth varies while a lateral axis also varies")]
    UnsupportedScanGeometry,

    /// Empty scan path or mismatched coordinate-sequence lengths.
    #[error("Malformed scan path: {0}")]
    MalformedScanPath(String),

    /// Failure reported by the galvo or piezo, propagated unchanged.
    #[error(transparent)]
    Instrument(#[from] anyhow::Error),

    /// Best-effort cleanup completed but one or more steps failed.
    #[error("Shutdown failed with errors")]
    ShutdownFailed(Vec<ScanError>),
}
