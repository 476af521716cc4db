// src/poller/shutdown.rs

use core::time::Duration;
use std::sync::{Arc, Condvar, Mutex, PoisonError};

#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    #[error("signal handler already installed")]
    AlreadyInstalled,

    #[error("failed to install signal handler")]
    Handler(#[source] ctrlc::Error),
}

impl From<ctrlc::Error> for ShutdownError {
    fn from(e: ctrlc::Error) -> Self {
        match e {
            ctrlc::Error::MultipleHandlers => ShutdownError::AlreadyInstalled,
            other => ShutdownError::Handler(other),
        }
    }
}

/// A one-way latch telling the poll loop to stop.
///
/// Clones share the latch. Once requested it stays requested, and anyone
/// blocked in [`wait_timeout`](Self::wait_timeout) wakes immediately.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        let (requested, cvar) = &*self.inner;
        let mut requested = requested.lock().unwrap_or_else(PoisonError::into_inner);
        if !*requested {
            *requested = true;
            log::info!("shutdown requested");
        }
        cvar.notify_all();
    }

    pub fn is_requested(&self) -> bool {
        let (requested, _) = &*self.inner;
        *requested.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks for up to `timeout`, returning early on a request.
    ///
    /// Returns `true` if shutdown has been requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (requested, cvar) = &*self.inner;
        let guard = requested.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = cvar
            .wait_timeout_while(guard, timeout, |requested| !*requested)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }

    /// Routes SIGINT and SIGTERM to [`request`](Self::request).
    ///
    /// May be called once per process.
    pub fn install_os_handler(&self) -> Result<(), ShutdownError> {
        let signal = self.clone();
        ctrlc::set_handler(move || signal.request())?;
        Ok(())
    }
}
