//! Error types for botlink_core

use crate::drivers::DriverError;
use crate::link::mailbox::TransportError;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-level error taxonomy
///
/// Parse errors never reach this type: a malformed command is logged and
/// dropped by the control loop. Driver errors are the only unrecoverable
/// failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Motor or sensor failure reported by the driver layer
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Mailbox failure
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML (de)serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The maneuver task panicked or was aborted
    #[error("Maneuver task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Lifecycle transition attempted from the wrong state
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),
}
