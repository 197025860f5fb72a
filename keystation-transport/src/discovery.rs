//! Device discovery for the Keystation32

use tracing::debug;

use crate::device_registry;
use crate::error::TransportError;
use crate::types::ListedDevice;
use crate::usb::{OpenOptions, UsbMidiTransport};
use crate::BoxedTransport;

/// Device discovery abstraction
pub trait DeviceDiscovery: Send + Sync {
    /// List USB devices currently attached
    fn list_devices(&self) -> Result<Vec<ListedDevice>, TransportError>;

    /// Find and claim the device with the given identity
    fn open_device(
        &self,
        vid: u16,
        pid: u16,
        options: &OpenOptions,
    ) -> Result<BoxedTransport, TransportError>;
}

/// Discovery backed by libusb
#[derive(Debug, Default, Clone, Copy)]
pub struct UsbDiscovery;

impl UsbDiscovery {
    pub fn new() -> Self {
        Self
    }
}

impl DeviceDiscovery for UsbDiscovery {
    fn list_devices(&self) -> Result<Vec<ListedDevice>, TransportError> {
        let mut devices = Vec::new();

        for device in rusb::devices()?.iter() {
            let desc = match device.device_descriptor() {
                Ok(desc) => desc,
                Err(e) => {
                    debug!(
                        "Skipping device on bus {} address {}: {}",
                        device.bus_number(),
                        device.address(),
                        e
                    );
                    continue;
                }
            };

            devices.push(ListedDevice {
                bus: device.bus_number(),
                address: device.address(),
                vid: desc.vendor_id(),
                pid: desc.product_id(),
                supported: device_registry::is_supported(desc.vendor_id(), desc.product_id()),
            });
        }

        Ok(devices)
    }

    fn open_device(
        &self,
        vid: u16,
        pid: u16,
        options: &OpenOptions,
    ) -> Result<BoxedTransport, TransportError> {
        let device = rusb::devices()?
            .iter()
            .find(|device| {
                device
                    .device_descriptor()
                    .map(|desc| desc.vendor_id() == vid && desc.product_id() == pid)
                    .unwrap_or(false)
            })
            .ok_or_else(|| {
                TransportError::DeviceNotFound(format!("no USB device {vid:04x}:{pid:04x}"))
            })?;

        debug!(
            "Found {:04x}:{:04x} on bus {} address {}",
            vid,
            pid,
            device.bus_number(),
            device.address()
        );

        let transport = UsbMidiTransport::open(&device, options)?;
        Ok(Box::new(transport))
    }
}

/// List attached USB devices
pub fn list_devices() -> Result<Vec<ListedDevice>, TransportError> {
    UsbDiscovery::new().list_devices()
}
