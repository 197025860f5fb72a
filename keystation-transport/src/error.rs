//! Transport error types

use thiserror::Error;

/// Errors that can occur during transport operations
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Device disconnected")]
    Disconnected,

    #[error("Communication timeout")]
    Timeout,

    // Descriptor lookup
    #[error("No MIDI streaming interface on device")]
    NoMidiInterface,

    #[error("No input endpoint on MIDI streaming interface")]
    NoInputEndpoint,

    // Generic libusb failure
    #[error("USB error: {0}")]
    Usb(String),
}

impl From<rusb::Error> for TransportError {
    fn from(e: rusb::Error) -> Self {
        match e {
            // Busy: another driver or process holds the interface
            rusb::Error::Access | rusb::Error::Busy => {
                TransportError::PermissionDenied(e.to_string())
            }
            rusb::Error::NoDevice => TransportError::Disconnected,
            rusb::Error::Timeout => TransportError::Timeout,
            rusb::Error::NotFound => TransportError::DeviceNotFound(e.to_string()),
            other => TransportError::Usb(other.to_string()),
        }
    }
}

impl TransportError {
    /// Whether the reader loop should give up on the device
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Disconnected | Self::DeviceNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_maps_to_permission_denied() {
        let err = TransportError::from(rusb::Error::Access);
        assert!(matches!(err, TransportError::PermissionDenied(_)));
    }

    #[test]
    fn test_busy_maps_to_permission_denied() {
        let err = TransportError::from(rusb::Error::Busy);
        assert!(matches!(err, TransportError::PermissionDenied(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_no_device_is_disconnect() {
        let err = TransportError::from(rusb::Error::NoDevice);
        assert!(matches!(err, TransportError::Disconnected));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_timeout_and_other_errors() {
        assert!(matches!(
            TransportError::from(rusb::Error::Timeout),
            TransportError::Timeout
        ));
        let err = TransportError::from(rusb::Error::Pipe);
        assert!(matches!(err, TransportError::Usb(_)));
        assert!(!err.is_fatal());
    }
}
