//! Keyboard adapter error types

use keystation_transport::TransportError;
use thiserror::Error;

/// Errors from keyboard operations
#[derive(Error, Debug)]
pub enum KeystationError {
    /// No matching USB device is attached
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Device present but could not be opened or claimed
    #[error("Permission denied: {0}")]
    DevicePermission(String),

    /// `open()` called while already open
    #[error("Keyboard is already open")]
    AlreadyOpen,

    /// `open()` called after `close()`
    #[error("Keyboard was closed and cannot be reopened")]
    Closed,

    /// Any other transport layer error
    #[error("Transport error: {0}")]
    Transport(TransportError),

    /// Reader thread could not be started
    #[error("Failed to spawn reader thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// Config file could not be read or written
    #[error("Config error: {0}")]
    Config(String),
}

impl From<TransportError> for KeystationError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::DeviceNotFound(msg) => KeystationError::DeviceNotFound(msg),
            TransportError::PermissionDenied(msg) => KeystationError::DevicePermission(msg),
            other => KeystationError::Transport(other),
        }
    }
}
