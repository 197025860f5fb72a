//! Listen command: print key and button presses.

use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::Context;
use keystation::{Keystation32, KeystationConfig, KeystationError};
use tracing::{info, warn};

use super::{setup_interrupt_handler, CommandResult};

/// How often the main thread checks for interrupt and disconnect
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Format a key callback the way the listen command prints it
pub fn describe_key(note: u8, velocity: u8) -> String {
    let action = if velocity == 0 { "Released" } else { "Pressed" };
    format!("{action} note {note} at velocity {velocity}")
}

/// Open the keyboard and print events until Ctrl-C
pub fn listen(config: KeystationConfig) -> CommandResult {
    let running = setup_interrupt_handler();

    let keyboard = Keystation32::from_config(config);
    keyboard.add_button_callback(|button| {
        println!("Button {} (value {})", button.button, button.value);
    });
    keyboard.add_key_callback(|note, velocity| {
        println!("{}", describe_key(note, velocity));
    });

    match keyboard.open() {
        Ok(()) => {}
        Err(KeystationError::DevicePermission(msg)) => {
            anyhow::bail!(
                "cannot claim the keyboard ({msg}); check udev rules or run with sufficient privileges"
            );
        }
        Err(e) => return Err(e).context("failed to open keyboard"),
    }

    if let Some(info) = keyboard.device_info() {
        println!(
            "Listening to {} ({:04x}:{:04x}). Press Ctrl-C to stop.",
            info.product_name.as_deref().unwrap_or("keyboard"),
            info.vid,
            info.pid
        );
    }

    while running.load(Ordering::SeqCst) {
        if !keyboard.is_listening() {
            warn!("Keyboard disconnected");
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    info!("Shutting down");
    keyboard.close()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_key() {
        assert_eq!(describe_key(60, 100), "Pressed note 60 at velocity 100");
        assert_eq!(describe_key(60, 0), "Released note 60 at velocity 0");
    }
}
