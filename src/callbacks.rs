//! Callback registry for key and button events
//!
//! Two ordered lists of callbacks. Registration order is firing order.
//! Dispatch snapshots the list under the lock and invokes the callbacks
//! after releasing it, so a callback may register or remove callbacks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use keystation_transport::{ButtonEvent, MidiEvent};
use parking_lot::Mutex;
use tracing::trace;

/// Callback invoked for every button press
pub type ButtonCallback = Arc<dyn Fn(ButtonEvent) + Send + Sync>;

/// Callback invoked for every key event with `(note, velocity)`
pub type KeyCallback = Arc<dyn Fn(u8, u8) + Send + Sync>;

/// Handle returned by registration, used to remove a callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

#[derive(Default)]
pub struct CallbackRegistry {
    next_id: u64,
    buttons: Vec<(CallbackId, ButtonCallback)>,
    keys: Vec<(CallbackId, KeyCallback)>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> CallbackId {
        let id = CallbackId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn add_button(&mut self, callback: ButtonCallback) -> CallbackId {
        let id = self.allocate_id();
        self.buttons.push((id, callback));
        id
    }

    pub fn add_key(&mut self, callback: KeyCallback) -> CallbackId {
        let id = self.allocate_id();
        self.keys.push((id, callback));
        id
    }

    /// Remove a button callback; `false` if `id` is not registered
    pub fn remove_button(&mut self, id: CallbackId) -> bool {
        let before = self.buttons.len();
        self.buttons.retain(|(existing, _)| *existing != id);
        self.buttons.len() != before
    }

    /// Remove a key callback; `false` if `id` is not registered
    pub fn remove_key(&mut self, id: CallbackId) -> bool {
        let before = self.keys.len();
        self.keys.retain(|(existing, _)| *existing != id);
        self.keys.len() != before
    }

    pub fn button_count(&self) -> usize {
        self.buttons.len()
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    fn button_snapshot(&self) -> Vec<ButtonCallback> {
        self.buttons.iter().map(|(_, cb)| Arc::clone(cb)).collect()
    }

    fn key_snapshot(&self) -> Vec<KeyCallback> {
        self.keys.iter().map(|(_, cb)| Arc::clone(cb)).collect()
    }
}

/// Invoke every callback registered for `event`, in registration order
///
/// Stops as soon as `shutdown` is set, so a callback that closes the
/// adapter is the last one to run. Unknown events are dropped.
pub fn dispatch(registry: &Mutex<CallbackRegistry>, event: &MidiEvent, shutdown: &AtomicBool) {
    match *event {
        MidiEvent::Key(key) => {
            let callbacks = registry.lock().key_snapshot();
            for callback in callbacks {
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                callback(key.note, key.velocity);
            }
        }
        MidiEvent::Button(button) => {
            let callbacks = registry.lock().button_snapshot();
            for callback in callbacks {
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                callback(button);
            }
        }
        MidiEvent::Unknown(packet) => {
            trace!("Dropping unhandled packet {:02X?}", packet);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystation_transport::KeyEvent;

    static RUNNING: AtomicBool = AtomicBool::new(false);

    #[test]
    fn test_key_callbacks_fire_in_registration_order() {
        let registry = Mutex::new(CallbackRegistry::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let log = Arc::clone(&log);
            registry
                .lock()
                .add_key(Arc::new(move |note, vel| log.lock().push((tag, note, vel))));
        }

        dispatch(
            &registry,
            &MidiEvent::Key(KeyEvent {
                note: 60,
                velocity: 100,
            }),
            &RUNNING,
        );

        assert_eq!(
            *log.lock(),
            vec![("first", 60, 100), ("second", 60, 100), ("third", 60, 100)]
        );
    }

    #[test]
    fn test_duplicate_registration_fires_twice() {
        let registry = Mutex::new(CallbackRegistry::new());
        let count = Arc::new(Mutex::new(0));
        let cb: ButtonCallback = {
            let count = Arc::clone(&count);
            Arc::new(move |_| *count.lock() += 1)
        };
        registry.lock().add_button(Arc::clone(&cb));
        registry.lock().add_button(cb);

        dispatch(
            &registry,
            &MidiEvent::Button(ButtonEvent {
                button: 3,
                value: 127,
            }),
            &RUNNING,
        );

        assert_eq!(*count.lock(), 2);
    }

    #[test]
    fn test_remove_by_id() {
        let mut registry = CallbackRegistry::new();
        let a = registry.add_key(Arc::new(|_, _| {}));
        let b = registry.add_key(Arc::new(|_, _| {}));
        let c = registry.add_button(Arc::new(|_| {}));
        assert_ne!(a, b);

        assert!(registry.remove_key(a));
        assert!(!registry.remove_key(a));
        // Button id does not remove from the key list
        assert!(!registry.remove_key(c));
        assert_eq!(registry.key_count(), 1);
        assert!(registry.remove_button(c));
        assert_eq!(registry.button_count(), 0);
    }

    #[test]
    fn test_event_types_routed_separately() {
        let registry = Mutex::new(CallbackRegistry::new());
        let keys = Arc::new(Mutex::new(0));
        let buttons = Arc::new(Mutex::new(0));
        {
            let keys = Arc::clone(&keys);
            registry.lock().add_key(Arc::new(move |_, _| *keys.lock() += 1));
        }
        {
            let buttons = Arc::clone(&buttons);
            registry
                .lock()
                .add_button(Arc::new(move |_| *buttons.lock() += 1));
        }

        dispatch(
            &registry,
            &MidiEvent::Button(ButtonEvent {
                button: 1,
                value: 0,
            }),
            &RUNNING,
        );
        dispatch(
            &registry,
            &MidiEvent::Unknown([0x0E, 0xE0, 0, 0x40]),
            &RUNNING,
        );

        assert_eq!(*keys.lock(), 0);
        assert_eq!(*buttons.lock(), 1);
    }

    #[test]
    fn test_callback_may_register_during_dispatch() {
        let registry = Arc::new(Mutex::new(CallbackRegistry::new()));
        {
            let inner = Arc::clone(&registry);
            registry.lock().add_button(Arc::new(move |_| {
                inner.lock().add_button(Arc::new(|_| {}));
            }));
        }

        dispatch(
            &registry,
            &MidiEvent::Button(ButtonEvent {
                button: 1,
                value: 1,
            }),
            &RUNNING,
        );

        assert_eq!(registry.lock().button_count(), 2);
    }

    #[test]
    fn test_shutdown_during_dispatch_skips_remaining_callbacks() {
        let registry = Arc::new(Mutex::new(CallbackRegistry::new()));
        let shutdown = Arc::new(AtomicBool::new(false));
        let log = Arc::new(Mutex::new(Vec::new()));
        {
            let log = Arc::clone(&log);
            registry.lock().add_key(Arc::new(move |_, _| log.lock().push("first")));
        }
        {
            let log = Arc::clone(&log);
            let shutdown = Arc::clone(&shutdown);
            registry.lock().add_key(Arc::new(move |_, _| {
                log.lock().push("closing");
                shutdown.store(true, Ordering::SeqCst);
            }));
        }
        {
            let log = Arc::clone(&log);
            registry.lock().add_key(Arc::new(move |_, _| log.lock().push("after close")));
        }

        dispatch(
            &registry,
            &MidiEvent::Key(KeyEvent {
                note: 60,
                velocity: 100,
            }),
            &shutdown,
        );

        assert_eq!(*log.lock(), vec!["first", "closing"]);
    }
}
