// M-Audio Keystation32 driver - shared library
// Device adapter, callback registry, and configuration

pub mod callbacks;
pub mod config;
pub mod error;
pub mod keystation;

pub use callbacks::{ButtonCallback, CallbackId, CallbackRegistry, KeyCallback};
pub use config::KeystationConfig;
pub use error::KeystationError;
pub use keystation::{AdapterState, Keystation32};

// Re-export event types so callers don't need the transport crate
pub use keystation_transport::{
    ButtonEvent, KeyEvent, MidiEvent, TimestampedEvent, TransportDeviceInfo,
};
