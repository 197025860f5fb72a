//! Background event reader loop
//!
//! Reads USB-MIDI packets from a claimed transport and hands each decoded,
//! timestamped event to a sink. The loop runs until the shutdown flag is set
//! or the device goes away.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, error, trace, warn};

use crate::error::TransportError;
use crate::event_parser::{parse_usb_midi, MalformedRead};
use crate::types::TimestampedEvent;
use crate::Transport;

/// Fallback read size when the endpoint reports no packet size
const DEFAULT_READ_SIZE: usize = 64;

/// Configuration for the event reader loop
#[derive(Debug, Clone)]
pub struct EventReaderConfig {
    /// Read timeout (bounds how long a shutdown request goes unnoticed when idle)
    pub read_timeout: Duration,
    /// Sleep duration on error before retrying
    pub error_sleep: Duration,
    /// Name prefix for debug logging
    pub name: &'static str,
}

impl Default for EventReaderConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(100),
            error_sleep: Duration::from_millis(100),
            name: "MIDI",
        }
    }
}

/// Why the reader loop returned
#[derive(Debug)]
pub enum ReaderExit {
    /// Shutdown flag was set
    Shutdown,
    /// The transport failed in a way that cannot recover
    Failed(TransportError),
}

/// Read events until shutdown
///
/// Timeouts are silent. Fatal transport errors end the loop; anything else
/// is logged and retried after `error_sleep`.
pub fn run_event_reader_loop<F>(
    transport: &mut dyn Transport,
    shutdown: &AtomicBool,
    config: &EventReaderConfig,
    mut sink: F,
) -> ReaderExit
where
    F: FnMut(TimestampedEvent),
{
    debug!("{} event reader started", config.name);
    let read_size = match transport.device_info().max_packet_size as usize {
        0 => DEFAULT_READ_SIZE,
        n => n,
    };
    let mut buf = vec![0u8; read_size];
    let start_time = Instant::now();

    while !shutdown.load(Ordering::Acquire) {
        match transport.read_packets(&mut buf, config.read_timeout) {
            Ok(0) | Err(TransportError::Timeout) => {}
            Ok(len) => {
                let timestamp = start_time.elapsed().as_secs_f64();
                trace!(
                    "{} read {} bytes at {:.3}s: {:02X?}",
                    config.name,
                    len,
                    timestamp,
                    &buf[..len]
                );

                match parse_usb_midi(&buf[..len]) {
                    Ok(events) => {
                        for event in events {
                            if shutdown.load(Ordering::Acquire) {
                                break;
                            }
                            sink(TimestampedEvent::new(timestamp, event));
                        }
                    }
                    Err(MalformedRead { len }) => {
                        warn!("{} received {} bytes, not whole packets", config.name, len);
                    }
                }
            }
            Err(e) if e.is_fatal() => {
                error!("{} event reader stopping: {}", config.name, e);
                return ReaderExit::Failed(e);
            }
            Err(e) => {
                warn!("{} event reader error: {}", config.name, e);
                std::thread::sleep(config.error_sleep);
            }
        }
    }

    debug!("{} event reader exiting", config.name);
    ReaderExit::Shutdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EndpointKind, MidiEvent, TransportDeviceInfo};
    use std::collections::VecDeque;

    /// Replays canned reads, then reports disconnect
    struct ScriptedTransport {
        info: TransportDeviceInfo,
        reads: VecDeque<Result<Vec<u8>, TransportError>>,
    }

    impl ScriptedTransport {
        fn new(reads: Vec<Result<Vec<u8>, TransportError>>) -> Self {
            Self {
                info: TransportDeviceInfo {
                    vid: 0x0A4D,
                    pid: 0x129D,
                    bus: 1,
                    address: 2,
                    interface: 1,
                    endpoint: 0x81,
                    endpoint_kind: EndpointKind::Bulk,
                    max_packet_size: 64,
                    product_name: None,
                },
                reads: reads.into(),
            }
        }
    }

    impl Transport for ScriptedTransport {
        fn read_packets(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize, TransportError> {
            match self.reads.pop_front() {
                Some(Ok(data)) => {
                    buf[..data.len()].copy_from_slice(&data);
                    Ok(data.len())
                }
                Some(Err(e)) => Err(e),
                None => Err(TransportError::Disconnected),
            }
        }

        fn device_info(&self) -> &TransportDeviceInfo {
            &self.info
        }
    }

    fn fast_config() -> EventReaderConfig {
        EventReaderConfig {
            read_timeout: Duration::from_millis(1),
            error_sleep: Duration::from_millis(1),
            name: "test",
        }
    }

    #[test]
    fn test_events_delivered_in_wire_order() {
        let mut transport = ScriptedTransport::new(vec![
            Ok(vec![0x09, 0x90, 60, 100, 0x0B, 0xB0, 3, 127]),
            Err(TransportError::Timeout),
            Ok(vec![0x09, 0x90, 60, 0]),
        ]);
        let shutdown = AtomicBool::new(false);
        let mut seen = Vec::new();

        let exit = run_event_reader_loop(&mut transport, &shutdown, &fast_config(), |ev| {
            seen.push(ev.event)
        });

        assert!(matches!(exit, ReaderExit::Failed(TransportError::Disconnected)));
        assert_eq!(seen.len(), 3);
        assert!(matches!(seen[0], MidiEvent::Key(k) if k.note == 60 && k.velocity == 100));
        assert!(matches!(seen[1], MidiEvent::Button(b) if b.button == 3));
        assert!(matches!(seen[2], MidiEvent::Key(k) if k.is_release()));
    }

    #[test]
    fn test_malformed_read_dropped_and_loop_continues() {
        let mut transport = ScriptedTransport::new(vec![
            Ok(vec![0x09, 0x90, 60]),
            Err(TransportError::Usb("pipe".into())),
            Ok(vec![0x0B, 0xB0, 7, 1]),
        ]);
        let shutdown = AtomicBool::new(false);
        let mut seen = Vec::new();

        run_event_reader_loop(&mut transport, &shutdown, &fast_config(), |ev| {
            seen.push(ev.event)
        });

        assert_eq!(seen.len(), 1);
        assert!(matches!(seen[0], MidiEvent::Button(b) if b.button == 7));
    }

    #[test]
    fn test_shutdown_flag_stops_loop() {
        let mut transport = ScriptedTransport::new(vec![Ok(vec![0x09, 0x90, 60, 100])]);
        let shutdown = AtomicBool::new(true);
        let mut calls = 0;

        let exit = run_event_reader_loop(&mut transport, &shutdown, &fast_config(), |_| calls += 1);

        assert!(matches!(exit, ReaderExit::Shutdown));
        assert_eq!(calls, 0);
    }
}
