//! USB-MIDI transport for the M-Audio Keystation32
//!
//! This crate owns everything that touches the USB bus:
//!
//! - Discovery of the keyboard by vendor/product identity
//! - Claiming the MIDI streaming interface (detaching the kernel driver)
//! - Decoding USB-MIDI event packets into key and button events
//! - The background reader loop that feeds decoded events to a sink

pub mod device_registry;
pub mod error;
pub mod event_parser;
pub mod reader;
pub mod types;

mod discovery;
mod usb;

pub use device_registry::{is_supported, PRODUCT_ID, VENDOR_ID};
pub use error::TransportError;
pub use event_parser::{parse_midi_packet, parse_usb_midi, MalformedRead};
pub use reader::{run_event_reader_loop, EventReaderConfig, ReaderExit};
pub use types::{
    ButtonEvent, EndpointKind, KeyEvent, ListedDevice, MidiEvent, TimestampedEvent,
    TransportDeviceInfo,
};

pub use discovery::{list_devices, DeviceDiscovery, UsbDiscovery};
pub use usb::{OpenOptions, UsbMidiTransport};

use std::time::Duration;

/// A claimed device input - the backend implements this
///
/// The handle is owned by exactly one reader at a time; methods take
/// `&mut self` accordingly.
pub trait Transport: Send {
    /// Blocking read of raw USB-MIDI packets
    ///
    /// Returns the number of bytes written into `buf`, or
    /// [`TransportError::Timeout`] if nothing arrived within `timeout`.
    fn read_packets(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError>;

    /// Get device information
    fn device_info(&self) -> &TransportDeviceInfo;

    /// Release the device
    fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Type alias for a boxed transport
pub type BoxedTransport = Box<dyn Transport>;
