//! M-Audio Keystation32 adapter
//!
//! Owns the device lifecycle and a background reader thread that turns
//! USB-MIDI packets into key and button callbacks.
//!
//! ```no_run
//! use keystation::Keystation32;
//!
//! let keyboard = Keystation32::new();
//! keyboard.add_button_callback(|button| println!("button {}", button.button));
//! keyboard.add_key_callback(|note, velocity| println!("note {note} at {velocity}"));
//! keyboard.open()?;
//! // ... wait for input
//! keyboard.close()?;
//! # Ok::<(), keystation::KeystationError>(())
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use keystation_transport::{
    run_event_reader_loop, ButtonEvent, DeviceDiscovery, ReaderExit, TimestampedEvent,
    TransportDeviceInfo, UsbDiscovery,
};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::callbacks::{dispatch, CallbackId, CallbackRegistry};
use crate::config::KeystationConfig;
use crate::error::KeystationError;

/// Broadcast channel capacity for decoded events
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Where the adapter is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    /// Constructed, never opened (or the last open failed)
    Idle,
    /// Device claimed, reader thread started
    Open,
    /// Closed for good
    Closed,
}

/// Resources held while the device is open
struct Session {
    info: TransportDeviceInfo,
    shutdown: Arc<AtomicBool>,
    listening: Arc<AtomicBool>,
    event_tx: broadcast::Sender<TimestampedEvent>,
    worker: JoinHandle<()>,
}

enum Lifecycle {
    Idle,
    Open(Session),
    Closed,
}

/// Interface to an M-Audio Keystation32 keyboard
///
/// Callbacks can be added at any time, before or after [`open`](Self::open).
/// They run on the reader thread, in registration order, in the order events
/// arrive from the device.
pub struct Keystation32 {
    config: KeystationConfig,
    discovery: Box<dyn DeviceDiscovery>,
    registry: Arc<Mutex<CallbackRegistry>>,
    lifecycle: Mutex<Lifecycle>,
}

impl Default for Keystation32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Keystation32 {
    /// Create an adapter for the default Keystation32 identity
    pub fn new() -> Self {
        Self::from_config(KeystationConfig::default())
    }

    /// Create an adapter for a different vendor/product pair
    pub fn with_ids(vendor_id: u16, product_id: u16) -> Self {
        Self::from_config(KeystationConfig::with_ids(vendor_id, product_id))
    }

    /// Create an adapter from a loaded config
    pub fn from_config(config: KeystationConfig) -> Self {
        Self::with_discovery(config, UsbDiscovery::new())
    }

    /// Create an adapter that finds its device through `discovery`
    pub fn with_discovery<D>(config: KeystationConfig, discovery: D) -> Self
    where
        D: DeviceDiscovery + 'static,
    {
        Self {
            config,
            discovery: Box::new(discovery),
            registry: Arc::new(Mutex::new(CallbackRegistry::new())),
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    /// Get the config this adapter was built with
    pub fn config(&self) -> &KeystationConfig {
        &self.config
    }

    // === Callbacks ===

    /// Add a callback to call when a button on the keyboard is pressed
    ///
    /// `event.button` is the button id (the controller number the device
    /// sends for that button); `event.value` is the byte sent with it.
    pub fn add_button_callback<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(ButtonEvent) + Send + Sync + 'static,
    {
        self.registry.lock().add_button(Arc::new(callback))
    }

    /// Add a callback to call with `(note, velocity)` when a key is pressed
    /// or released (velocity 0)
    pub fn add_key_callback<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(u8, u8) + Send + Sync + 'static,
    {
        self.registry.lock().add_key(Arc::new(callback))
    }

    /// Remove a button callback, returning whether it was registered
    pub fn remove_button_callback(&self, id: CallbackId) -> bool {
        self.registry.lock().remove_button(id)
    }

    /// Remove a key callback, returning whether it was registered
    pub fn remove_key_callback(&self, id: CallbackId) -> bool {
        self.registry.lock().remove_key(id)
    }

    // === Lifecycle ===

    /// Open the connection to the keyboard and start listening
    ///
    /// # Errors
    /// - [`KeystationError::DeviceNotFound`] if no matching device is attached
    /// - [`KeystationError::DevicePermission`] if it cannot be claimed
    /// - [`KeystationError::AlreadyOpen`] / [`KeystationError::Closed`] on
    ///   an invalid transition
    pub fn open(&self) -> Result<(), KeystationError> {
        let mut lifecycle = self.lifecycle.lock();
        match *lifecycle {
            Lifecycle::Idle => {}
            Lifecycle::Open(_) => return Err(KeystationError::AlreadyOpen),
            Lifecycle::Closed => return Err(KeystationError::Closed),
        }

        let mut transport = self.discovery.open_device(
            self.config.vendor_id,
            self.config.product_id,
            &self.config.open_options(),
        )?;
        let info = transport.device_info().clone();

        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let shutdown = Arc::new(AtomicBool::new(false));
        let listening = Arc::new(AtomicBool::new(true));

        let worker = {
            let registry = Arc::clone(&self.registry);
            let tx = event_tx.clone();
            let shutdown = Arc::clone(&shutdown);
            let listening = Arc::clone(&listening);
            let reader_config = self.config.reader_config();

            thread::Builder::new()
                .name("keystation-reader".into())
                .spawn(move || {
                    let exit = run_event_reader_loop(
                        transport.as_mut(),
                        &shutdown,
                        &reader_config,
                        |event| {
                            dispatch(&registry, &event.event, &shutdown);
                            // Ignored when nobody subscribed
                            let _ = tx.send(event);
                        },
                    );
                    if let ReaderExit::Failed(e) = exit {
                        error!("Keyboard stopped delivering events: {}", e);
                    }
                    listening.store(false, Ordering::Release);

                    if let Err(e) = transport.close() {
                        warn!("Error releasing keyboard: {}", e);
                    }
                })?
        };

        info!(
            "Listening to {:04x}:{:04x} (interface {}, endpoint 0x{:02X})",
            info.vid, info.pid, info.interface, info.endpoint
        );

        *lifecycle = Lifecycle::Open(Session {
            info,
            shutdown,
            listening,
            event_tx,
            worker,
        });
        Ok(())
    }

    /// Stop listening and release the keyboard
    ///
    /// Once this returns no callback runs again. Closing twice, or closing a
    /// keyboard that was never opened, is fine; afterwards the adapter cannot
    /// be reopened.
    pub fn close(&self) -> Result<(), KeystationError> {
        // Lock released before joining so callbacks can still query state
        let session = match std::mem::replace(&mut *self.lifecycle.lock(), Lifecycle::Closed) {
            Lifecycle::Open(session) => session,
            Lifecycle::Idle | Lifecycle::Closed => return Ok(()),
        };

        session.shutdown.store(true, Ordering::Release);

        if session.worker.thread().id() == thread::current().id() {
            // Called from inside a callback; the loop exits once it returns
            debug!("close() called from reader thread, not joining");
        } else if session.worker.join().is_err() {
            warn!("Keyboard reader thread panicked");
        }

        info!("Closed {:04x}:{:04x}", session.info.vid, session.info.pid);
        Ok(())
    }

    /// Current lifecycle state
    pub fn state(&self) -> AdapterState {
        match *self.lifecycle.lock() {
            Lifecycle::Idle => AdapterState::Idle,
            Lifecycle::Open(_) => AdapterState::Open,
            Lifecycle::Closed => AdapterState::Closed,
        }
    }

    /// Whether the reader thread is still receiving from the device
    ///
    /// Goes false without `close()` if the device is unplugged.
    pub fn is_listening(&self) -> bool {
        match &*self.lifecycle.lock() {
            Lifecycle::Open(session) => session.listening.load(Ordering::Acquire),
            _ => false,
        }
    }

    /// Info about the open device
    pub fn device_info(&self) -> Option<TransportDeviceInfo> {
        match &*self.lifecycle.lock() {
            Lifecycle::Open(session) => Some(session.info.clone()),
            _ => None,
        }
    }

    /// Subscribe to every decoded event, including unhandled ones
    ///
    /// Returns `None` unless the keyboard is open.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<TimestampedEvent>> {
        match &*self.lifecycle.lock() {
            Lifecycle::Open(session) => Some(session.event_tx.subscribe()),
            _ => None,
        }
    }
}

impl Drop for Keystation32 {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Error closing keyboard on drop: {}", e);
        }
    }
}
