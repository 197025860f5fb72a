//! USB-MIDI transport over libusb

use std::time::Duration;

use rusb::{Device, DeviceHandle, Direction, GlobalContext, TransferType, UsbContext};
use tracing::{debug, info, warn};

use crate::device_registry::{SUBCLASS_MIDI_STREAMING, USB_CLASS_AUDIO};
use crate::error::TransportError;
use crate::types::{EndpointKind, TransportDeviceInfo};
use crate::Transport;

/// Options applied when claiming the device
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Take the interface away from the kernel's snd-usb-audio driver
    pub detach_kernel_driver: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            detach_kernel_driver: true,
        }
    }
}

/// Location of the MIDI input within the active configuration
struct MidiInput {
    interface: u8,
    setting: u8,
    endpoint: u8,
    kind: EndpointKind,
    max_packet_size: u16,
}

/// Interface operations needed to undo a claim
pub(crate) trait InterfaceControl {
    fn release_interface(&mut self, interface: u8) -> rusb::Result<()>;
    fn attach_kernel_driver(&mut self, interface: u8) -> rusb::Result<()>;
}

impl<T: UsbContext> InterfaceControl for DeviceHandle<T> {
    fn release_interface(&mut self, interface: u8) -> rusb::Result<()> {
        DeviceHandle::<T>::release_interface(self, interface)
    }

    fn attach_kernel_driver(&mut self, interface: u8) -> rusb::Result<()> {
        DeviceHandle::<T>::attach_kernel_driver(self, interface)
    }
}

/// Ownership of one interface: what we claimed and what we detached
///
/// Dropping it releases the interface and re-attaches the kernel driver,
/// so every early return during setup leaves the device as we found it.
pub(crate) struct InterfaceClaim<H: InterfaceControl> {
    handle: H,
    interface: u8,
    claimed: bool,
    reattach_kernel_driver: bool,
}

impl<H: InterfaceControl> InterfaceClaim<H> {
    pub(crate) fn new(handle: H, interface: u8) -> Self {
        Self {
            handle,
            interface,
            claimed: false,
            reattach_kernel_driver: false,
        }
    }

    pub(crate) fn handle(&self) -> &H {
        &self.handle
    }

    pub(crate) fn handle_mut(&mut self) -> &mut H {
        &mut self.handle
    }

    /// Kernel driver was detached and must be given back
    pub(crate) fn mark_detached(&mut self) {
        self.reattach_kernel_driver = true;
    }

    /// Interface is claimed and must be released
    pub(crate) fn mark_claimed(&mut self) {
        self.claimed = true;
    }

    /// Release the interface and hand it back to the OS; later calls are no-ops
    pub(crate) fn release(&mut self) -> Result<(), TransportError> {
        if self.claimed {
            self.claimed = false;
            self.handle.release_interface(self.interface)?;
            debug!("Released interface {}", self.interface);
        }
        if self.reattach_kernel_driver {
            self.reattach_kernel_driver = false;
            self.handle.attach_kernel_driver(self.interface)?;
            debug!("Re-attached kernel driver to interface {}", self.interface);
        }
        Ok(())
    }
}

impl<H: InterfaceControl> Drop for InterfaceClaim<H> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("Failed to release USB interface {}: {}", self.interface, e);
        }
    }
}

/// Errors while taking the interface from its current owner
///
/// Busy and unsupported-detach both mean something else holds the device.
fn claim_error(e: rusb::Error) -> TransportError {
    match e {
        rusb::Error::NotSupported => {
            TransportError::PermissionDenied(format!("cannot detach kernel driver: {e}"))
        }
        other => other.into(),
    }
}

/// Claimed USB-MIDI streaming interface of one device
///
/// The interface is released (and the kernel driver re-attached if we
/// detached it) on [`Transport::close`] or drop.
pub struct UsbMidiTransport {
    claim: InterfaceClaim<DeviceHandle<GlobalContext>>,
    info: TransportDeviceInfo,
}

impl UsbMidiTransport {
    /// Open, configure and claim a device found during enumeration
    pub fn open(
        device: &Device<GlobalContext>,
        options: &OpenOptions,
    ) -> Result<Self, TransportError> {
        let desc = device.device_descriptor()?;
        let mut handle = device.open()?;

        // Use the active configuration, or activate the first one
        let config = match device.active_config_descriptor() {
            Ok(config) => config,
            Err(e) => {
                debug!("No active configuration ({}), selecting the first", e);
                let config = device.config_descriptor(0)?;
                handle.set_active_configuration(config.number())?;
                config
            }
        };

        let input = find_midi_input(&config)?;
        debug!(
            "MIDI streaming interface {} alt {} endpoint 0x{:02X} ({:?}, {} bytes)",
            input.interface, input.setting, input.endpoint, input.kind, input.max_packet_size
        );

        let product_name = handle.read_product_string_ascii(&desc).ok();
        let info = TransportDeviceInfo {
            vid: desc.vendor_id(),
            pid: desc.product_id(),
            bus: device.bus_number(),
            address: device.address(),
            interface: input.interface,
            endpoint: input.endpoint,
            endpoint_kind: input.kind,
            max_packet_size: input.max_packet_size,
            product_name,
        };

        // From here on, dropping `claim` undoes whatever was done
        let mut claim = InterfaceClaim::new(handle, input.interface);

        if options.detach_kernel_driver
            && rusb::supports_detach_kernel_driver()
            && claim
                .handle()
                .kernel_driver_active(input.interface)
                .map_err(claim_error)?
        {
            debug!("Detaching kernel driver from interface {}", input.interface);
            claim
                .handle_mut()
                .detach_kernel_driver(input.interface)
                .map_err(claim_error)?;
            claim.mark_detached();
        }

        claim
            .handle_mut()
            .claim_interface(input.interface)
            .map_err(claim_error)?;
        claim.mark_claimed();

        if input.setting != 0 {
            claim
                .handle_mut()
                .set_alternate_setting(input.interface, input.setting)?;
        }

        info!(
            "Opened {} ({:04x}:{:04x}) on bus {} address {}",
            info.product_name.as_deref().unwrap_or("Unknown"),
            info.vid,
            info.pid,
            info.bus,
            info.address
        );

        Ok(Self { claim, info })
    }
}

/// Find the first IN endpoint of a MIDI streaming interface
fn find_midi_input(config: &rusb::ConfigDescriptor) -> Result<MidiInput, TransportError> {
    let mut found_interface = false;

    for interface in config.interfaces() {
        for iface_desc in interface.descriptors() {
            if iface_desc.class_code() != USB_CLASS_AUDIO
                || iface_desc.sub_class_code() != SUBCLASS_MIDI_STREAMING
            {
                continue;
            }
            found_interface = true;

            let endpoint = iface_desc.endpoint_descriptors().find(|ep| {
                ep.direction() == Direction::In
                    && matches!(ep.transfer_type(), TransferType::Bulk | TransferType::Interrupt)
            });

            if let Some(ep) = endpoint {
                let kind = match ep.transfer_type() {
                    TransferType::Interrupt => EndpointKind::Interrupt,
                    _ => EndpointKind::Bulk,
                };
                return Ok(MidiInput {
                    interface: iface_desc.interface_number(),
                    setting: iface_desc.setting_number(),
                    endpoint: ep.address(),
                    kind,
                    max_packet_size: ep.max_packet_size(),
                });
            }
        }
    }

    if found_interface {
        Err(TransportError::NoInputEndpoint)
    } else {
        Err(TransportError::NoMidiInterface)
    }
}

impl Transport for UsbMidiTransport {
    fn read_packets(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError> {
        let handle = self.claim.handle();
        let len = match self.info.endpoint_kind {
            EndpointKind::Interrupt => handle.read_interrupt(self.info.endpoint, buf, timeout)?,
            EndpointKind::Bulk => handle.read_bulk(self.info.endpoint, buf, timeout)?,
        };
        Ok(len)
    }

    fn device_info(&self) -> &TransportDeviceInfo {
        &self.info
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.claim.release()
    }
}
