//! Cooperative shutdown
//!
//! Each role loop polls a [`ShutdownToken`] once per iteration. The process
//! signal handler does nothing but cancel the token it was registered with;
//! a blocked receive is released by its own timeout, not by the signal.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    cancelled: Arc<AtomicBool>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown; idempotent
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

static SIGNAL_TOKEN: OnceLock<ShutdownToken> = OnceLock::new();

extern "C" fn on_signal(_sig: libc::c_int) {
    // Only an atomic load and store happen here.
    if let Some(token) = SIGNAL_TOKEN.get() {
        token.cancel();
    }
}

/// Cancel `token` on SIGINT or SIGTERM
///
/// Can be called once per process.
pub fn install_signal_handler(token: &ShutdownToken) -> io::Result<()> {
    SIGNAL_TOKEN.set(token.clone()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            "signal handler already installed",
        )
    })?;

    for signal in [libc::SIGINT, libc::SIGTERM] {
        let handler = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
        // SAFETY: `on_signal` only touches an initialized OnceLock and an atomic.
        let previous = unsafe { libc::signal(signal, handler) };
        if previous == libc::SIG_ERR {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_starts_live() {
        assert!(!ShutdownToken::new().is_cancelled());
    }

    #[test]
    fn test_cancel_is_shared_across_clones() {
        let token = ShutdownToken::new();
        let observer = token.clone();
        token.cancel();
        token.cancel();
        assert!(observer.is_cancelled());
    }
}
