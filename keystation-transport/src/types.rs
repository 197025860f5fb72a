//! Common types for transport layer

/// How the device's input endpoint transfers data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    /// Interrupt endpoint
    Interrupt,
    /// Bulk endpoint (what most class-compliant MIDI devices expose)
    Bulk,
}

/// Device identification information
#[derive(Debug, Clone)]
pub struct TransportDeviceInfo {
    /// USB Vendor ID
    pub vid: u16,
    /// USB Product ID
    pub pid: u16,
    /// Bus number the device sits on
    pub bus: u8,
    /// Address on the bus
    pub address: u8,
    /// MIDI streaming interface number
    pub interface: u8,
    /// Input endpoint address
    pub endpoint: u8,
    /// Transfer type of the input endpoint
    pub endpoint_kind: EndpointKind,
    /// Maximum packet size of the input endpoint
    pub max_packet_size: u16,
    /// Product name if available
    pub product_name: Option<String>,
}

/// A key on the keyboard went down or up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    /// MIDI note number (0-127)
    pub note: u8,
    /// Velocity (0-127), 0 for a release
    pub velocity: u8,
}

impl KeyEvent {
    /// Whether this is a key release
    pub fn is_release(&self) -> bool {
        self.velocity == 0
    }
}

/// A button (control change) on the keyboard was pressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ButtonEvent {
    /// Controller number identifying the button
    pub button: u8,
    /// Controller value sent with it
    pub value: u8,
}

/// Decoded USB-MIDI event packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiEvent {
    /// Note on / note off
    Key(KeyEvent),
    /// Control change
    Button(ButtonEvent),
    /// Anything this driver does not handle
    Unknown([u8; 4]),
}

/// Event with timestamp for tracking timing
#[derive(Debug, Clone)]
pub struct TimestampedEvent {
    /// Seconds since the device was opened
    pub timestamp: f64,
    /// The decoded event
    pub event: MidiEvent,
}

impl TimestampedEvent {
    pub fn new(timestamp: f64, event: MidiEvent) -> Self {
        Self { timestamp, event }
    }
}

/// A USB device seen during enumeration
#[derive(Debug, Clone)]
pub struct ListedDevice {
    pub bus: u8,
    pub address: u8,
    pub vid: u16,
    pub pid: u16,
    /// Whether this driver can open it
    pub supported: bool,
}
