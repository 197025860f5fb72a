//! USB-MIDI event packet parsing
//!
//! A class-compliant MIDI device delivers input as a stream of 4-byte event
//! packets on its streaming endpoint:
//!
//! ```text
//! [cable << 4 | CIN, status, data1, data2]
//! ```
//!
//! The Code Index Number (CIN) classifies the packet; the status byte carries
//! the MIDI message type in its high nibble and the channel in its low nibble.

use crate::device_registry::MIDI_PACKET_SIZE;
use crate::types::{ButtonEvent, KeyEvent, MidiEvent};

/// Code Index Numbers (low nibble of the first packet byte)
pub mod cin {
    /// Note off
    pub const NOTE_OFF: u8 = 0x08;
    /// Note on
    pub const NOTE_ON: u8 = 0x09;
    /// Control change
    pub const CONTROL_CHANGE: u8 = 0x0B;
}

/// MIDI status nibbles (high nibble of the status byte)
pub mod status {
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;
    pub const CONTROL_CHANGE: u8 = 0xB0;
}

/// Data bytes are 7-bit
const DATA_MASK: u8 = 0x7F;

/// Read length was not a whole number of event packets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MalformedRead {
    /// Number of bytes actually read
    pub len: usize,
}

/// Decode a single 4-byte event packet
///
/// Cable number and MIDI channel are ignored.
pub fn parse_midi_packet(packet: [u8; 4]) -> MidiEvent {
    let code_index = packet[0] & 0x0F;
    let kind = packet[1] & 0xF0;
    let data1 = packet[2] & DATA_MASK;
    let data2 = packet[3] & DATA_MASK;

    match (code_index, kind) {
        (cin::NOTE_ON, status::NOTE_ON) => MidiEvent::Key(KeyEvent {
            note: data1,
            velocity: data2,
        }),
        // Explicit note off reads as a release
        (cin::NOTE_OFF, status::NOTE_OFF) => MidiEvent::Key(KeyEvent {
            note: data1,
            velocity: 0,
        }),
        (cin::CONTROL_CHANGE, status::CONTROL_CHANGE) => MidiEvent::Button(ButtonEvent {
            button: data1,
            value: data2,
        }),
        _ => MidiEvent::Unknown(packet),
    }
}

/// Decode one USB read into its event packets
///
/// Reads that are not a multiple of the packet size are rejected whole.
pub fn parse_usb_midi(data: &[u8]) -> Result<Vec<MidiEvent>, MalformedRead> {
    if data.len() % MIDI_PACKET_SIZE != 0 {
        return Err(MalformedRead { len: data.len() });
    }

    Ok(data
        .chunks_exact(MIDI_PACKET_SIZE)
        .map(|chunk| parse_midi_packet([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
