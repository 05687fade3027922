//! Process-wide initialization.
//!
//! Sessions may only be created and used between [`initialize`] and
//! [`shutdown`]. Both calls are idempotent. Initializing again after a
//! shutdown is allowed.

use std::sync::atomic::{AtomicU8, Ordering};

use tracing::debug;

const UNINITIALIZED: u8 = 0;
const READY: u8 = 1;
const SHUT_DOWN: u8 = 2;

/// Initialization state of the library.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    state: AtomicU8,
}

impl Lifecycle {
    pub(crate) const fn new() -> Self {
        Self {
            state: AtomicU8::new(UNINITIALIZED),
        }
    }

    pub(crate) fn initialize(&self) {
        if self.state.swap(READY, Ordering::AcqRel) != READY {
            debug!("cas-client initialized");
        }
    }

    pub(crate) fn shutdown(&self) {
        if self
            .state
            .compare_exchange(READY, SHUT_DOWN, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            debug!("cas-client shut down");
        }
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.state.load(Ordering::Acquire) == READY
    }
}

static LIFECYCLE: Lifecycle = Lifecycle::new();

/// Initializes the library. Must be called before any session is created.
///
/// Calling it again while initialized has no effect.
///
/// # Examples
///
/// ```
/// cas_client::initialize();
/// assert!(cas_client::is_initialized());
/// ```
pub fn initialize() {
    LIFECYCLE.initialize();
}

/// Shuts the library down. Existing sessions refuse further calls.
///
/// Calling it when not initialized has no effect.
pub fn shutdown() {
    LIFECYCLE.shutdown();
}

/// Returns `true` between [`initialize`] and [`shutdown`].
pub fn is_initialized() -> bool {
    LIFECYCLE.is_ready()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uninitialized() {
        let lifecycle = Lifecycle::new();
        assert!(!lifecycle.is_ready());
    }

    #[test]
    fn initialize_and_shutdown_are_idempotent() {
        let lifecycle = Lifecycle::new();
        lifecycle.initialize();
        lifecycle.initialize();
        assert!(lifecycle.is_ready());

        lifecycle.shutdown();
        lifecycle.shutdown();
        assert!(!lifecycle.is_ready());
    }

    #[test]
    fn shutdown_before_initialize_is_noop() {
        let lifecycle = Lifecycle::new();
        lifecycle.shutdown();
        lifecycle.initialize();
        assert!(lifecycle.is_ready());
    }

    #[test]
    fn reinitialize_after_shutdown() {
        let lifecycle = Lifecycle::new();
        lifecycle.initialize();
        lifecycle.shutdown();
        lifecycle.initialize();
        assert!(lifecycle.is_ready());
    }
}
