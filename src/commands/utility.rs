//! Utility command handlers.

use keystation_transport::{device_registry, list_devices};

use super::CommandResult;

/// List attached USB devices, marking supported keyboards
pub fn list() -> CommandResult {
    let devices = list_devices()?;

    println!("USB devices:");
    for device in &devices {
        let marker = match device_registry::device_name(device.vid, device.pid) {
            Some(name) => format!("  <- {name}"),
            None => String::new(),
        };
        println!(
            "  Bus {:03} Device {:03} ID {:04x}:{:04x}{}",
            device.bus, device.address, device.vid, device.pid, marker
        );
    }

    if !devices.iter().any(|d| d.supported) {
        println!("\nNo supported keyboard found.");
    }
    Ok(())
}
