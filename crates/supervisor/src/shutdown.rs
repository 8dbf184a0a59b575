//! Graceful-then-forced shutdown signal handling.
//!
//! Grounded on
//! `examples/hoffmang9-WesoForge/crates/client/src/shutdown.rs`'s
//! `ShutdownController`/`spawn_ctrl_c_handler`: the first signal requests a
//! graceful stop, a second escalates to immediate. This implementation adds
//! a `SIGTERM` listener on Unix (spec.md §4.1 lists both SIGINT and
//! SIGTERM) and drives worker task abortion directly via `AbortHandle`
//! rather than a supervisor-side event loop, since the runner has no other
//! reason to poll a channel.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::AbortHandle;

/// Per-child join timeout after the first shutdown signal (spec.md §4.1).
pub const CHILD_JOIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub struct ShutdownController {
    /// Shared with every `WorkerActor`; checked before each claim and
    /// before each sleep (spec.md §5).
    flag: Arc<std::sync::atomic::AtomicBool>,
    forced: AtomicU8,
}

impl ShutdownController {
    pub fn new(flag: Arc<std::sync::atomic::AtomicBool>) -> Self {
        Self { flag, forced: AtomicU8::new(0) }
    }

    pub fn flag(&self) -> Arc<std::sync::atomic::AtomicBool> {
        self.flag.clone()
    }

    /// Records one signal occurrence; returns the new count. `1` means
    /// "first signal, request graceful stop"; `>1` means escalate.
    fn bump(&self) -> u8 {
        self.flag.store(true, Ordering::SeqCst);
        self.forced.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Waits for SIGINT (all platforms) or SIGTERM (Unix only).
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Spawns the background signal-handling task. On the first SIGINT/SIGTERM
/// it flips `controller`'s shared flag and schedules an abort of
/// `abort_handles` after [`CHILD_JOIN_TIMEOUT`] if they haven't finished by
/// then. On a second signal it aborts immediately.
pub fn spawn_signal_handler(controller: Arc<ShutdownController>, abort_handles: Vec<AbortHandle>) {
    tokio::spawn(async move {
        loop {
            wait_for_signal().await;
            let n = controller.bump();
            if n == 1 {
                tracing::info!("shutdown requested, waiting up to {:?} for in-flight claims", CHILD_JOIN_TIMEOUT);
                let handles = abort_handles.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(CHILD_JOIN_TIMEOUT).await;
                    for h in &handles {
                        h.abort();
                    }
                });
            } else {
                tracing::warn!("second shutdown signal received, aborting workers immediately");
                for h in &abort_handles {
                    h.abort();
                }
                return;
            }
        }
    });
}
