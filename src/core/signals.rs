//! Cancellation: a shared flag the shred loop polls between files, optionally
//! wired to SIGINT/SIGTERM through `signal-hook`.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable cancellation flag.
///
/// Uses `Ordering::Relaxed`: the session only needs to observe the flag
/// eventually, between files, not in lockstep with other memory.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Register SIGINT and SIGTERM to set this token.
    ///
    /// Registration is best-effort; failures are reported on stderr and the
    /// token keeps working for programmatic cancellation.
    #[cfg(feature = "signals")]
    pub fn register_os_signals(&self) -> &Self {
        use signal_hook::consts::{SIGINT, SIGTERM};

        if let Err(e) = signal_hook::flag::register(SIGTERM, Arc::clone(&self.flag)) {
            eprintln!("[FSH-SIGNAL] failed to register SIGTERM: {e}");
        }
        if let Err(e) = signal_hook::flag::register(SIGINT, Arc::clone(&self.flag)) {
            eprintln!("[FSH-SIGNAL] failed to register SIGINT: {e}");
        }
        self
    }
}

/// Create a token already wired to SIGINT/SIGTERM.
#[cfg(feature = "signals")]
pub fn register_os_signals() -> CancellationToken {
    let token = CancellationToken::new();
    token.register_os_signals();
    token
}
