//! Command handlers for the CLI application.
//!
//! - `catalog`: read-only commands (list, info)
//! - `run`: drive one animation session from the terminal

pub mod catalog;
pub mod run;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anim_driver::{DriverConfig, Registry};

/// Build a registry for the configured directory and scan it
pub fn scanned_registry(config: &DriverConfig) -> Registry {
    let mut registry =
        Registry::new(config.animations_dir()).with_timeout(config.info_timeout());
    registry.scan();
    registry
}

/// Setup Ctrl+C handler and return the running flag
pub fn setup_interrupt_handler() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    if let Err(e) = ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::SeqCst);
    }) {
        eprintln!("Warning: Could not set Ctrl+C handler: {e}");
    }

    running
}
