//! Wait options and cancellation for asynchronous verification.
//!
//! Blocking verification suspends on the ledger's append notification; a
//! cancellation token wakes those waiters through registered wakers. The
//! registration is a scoped guard, so every exit path (success, timeout,
//! cancellation, panic) removes the waker and leaves nothing behind.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Default timeout for blocking verification (5 seconds)
pub const DEFAULT_VERIFY_TIMEOUT_MS: u64 = 5_000;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for blocking verification waits
#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// Timeout in milliseconds; `None` waits until woken or cancelled
    pub timeout_ms: Option<u64>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: Some(DEFAULT_VERIFY_TIMEOUT_MS),
        }
    }
}

impl WaitOptions {
    /// Create wait options with the default timeout
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Remove the deadline; the wait ends only on success or cancellation
    #[must_use]
    pub const fn unbounded(mut self) -> Self {
        self.timeout_ms = None;
        self
    }

    /// Get the timeout as a Duration, if one is configured
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

// =============================================================================
// CANCELLATION TOKEN
// =============================================================================

/// Waker callback invoked when a token is cancelled
pub type Waker = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct TokenInner {
    cancelled: AtomicBool,
    wakers: Mutex<HashMap<u64, Waker>>,
    next_waker_id: AtomicU64,
}

/// Cloneable cancellation token for blocking verification.
///
/// `cancel()` is idempotent and wakes every registered waiter promptly.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl CancellationToken {
    /// Create a fresh, uncancelled token
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the token has been cancelled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Cancel the token and wake all registered waiters
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        let wakers: Vec<Waker> = self
            .inner
            .wakers
            .lock()
            .map(|w| w.values().cloned().collect())
            .unwrap_or_default();
        for waker in wakers {
            waker();
        }
    }

    /// Register a waker; the guard removes it on drop.
    ///
    /// If the token is already cancelled the waker fires immediately.
    #[must_use]
    pub fn register(&self, waker: Waker) -> WakerGuard {
        let id = self.inner.next_waker_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut wakers) = self.inner.wakers.lock() {
            wakers.insert(id, waker.clone());
        }
        if self.is_cancelled() {
            waker();
        }
        WakerGuard {
            inner: self.inner.clone(),
            id,
        }
    }

    #[cfg(test)]
    fn waker_count(&self) -> usize {
        self.inner.wakers.lock().map(|w| w.len()).unwrap_or(0)
    }
}

/// Scoped waker registration; unregisters on drop
pub struct WakerGuard {
    inner: Arc<TokenInner>,
    id: u64,
}

impl std::fmt::Debug for WakerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WakerGuard").field("id", &self.id).finish()
    }
}

impl Drop for WakerGuard {
    fn drop(&mut self) {
        if let Ok(mut wakers) = self.inner.wakers.lock() {
            wakers.remove(&self.id);
        }
    }
}
