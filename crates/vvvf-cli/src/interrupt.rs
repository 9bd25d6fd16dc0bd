//! Ctrl-C handling for long-running commands.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};

/// Sets `flag` when the process receives Ctrl-C.
///
/// The signal is awaited on a background thread with its own runtime, so the
/// caller keeps working synchronously and polls the flag.
pub fn cancel_on_ctrl_c(flag: Arc<AtomicBool>) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    std::thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            rt.block_on(async move {
                if let Ok(()) = tokio::signal::ctrl_c().await {
                    eprintln!("\nCancelling...");
                    flag.store(true, Ordering::Relaxed);
                }
            })
        })
        .context("Failed to spawn Ctrl-C watcher")?;
    Ok(())
}
