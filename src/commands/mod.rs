//! Command handlers for the CLI application.
//!
//! - `listen`: open the keyboard and print events
//! - `utility`: device listing

pub mod listen;
pub mod utility;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Result type for command handlers
pub type CommandResult = anyhow::Result<()>;

/// Set up Ctrl-C / SIGTERM handling, returns a flag that goes false on signal
pub fn setup_interrupt_handler() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::SeqCst);
    })
    .ok();

    running
}
