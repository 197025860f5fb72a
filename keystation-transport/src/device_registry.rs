//! Device registry - known USB identities and USB-MIDI class constants

/// M-Audio vendor ID
pub const VENDOR_ID: u16 = 0x0A4D;

/// Keystation32 product ID
pub const PRODUCT_ID: u16 = 0x129D;

/// Known (VID, PID) pairs this driver understands
pub const SUPPORTED_DEVICES: &[(u16, u16, &str)] = &[(VENDOR_ID, PRODUCT_ID, "M-Audio Keystation32")];

/// USB audio device class
pub const USB_CLASS_AUDIO: u8 = 0x01;

/// Audio subclass for MIDI streaming interfaces
pub const SUBCLASS_MIDI_STREAMING: u8 = 0x03;

/// Size of one USB-MIDI event packet
pub const MIDI_PACKET_SIZE: usize = 4;

/// Check if a VID/PID pair is a supported keyboard
#[inline]
pub fn is_supported(vid: u16, pid: u16) -> bool {
    SUPPORTED_DEVICES
        .iter()
        .any(|&(v, p, _)| v == vid && p == pid)
}

/// Display name for a supported VID/PID pair
pub fn device_name(vid: u16, pid: u16) -> Option<&'static str> {
    SUPPORTED_DEVICES
        .iter()
        .find(|&&(v, p, _)| v == vid && p == pid)
        .map(|&(_, _, name)| name)
}
