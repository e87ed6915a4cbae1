//! Interaction ledger.
//!
//! Append-only, thread-safe log of interactions with monotonically
//! increasing, gapless indices. Appending is the only mutation of the log
//! itself; verification marks are kept alongside and are monotonic. Every
//! successful append broadcasts a change notification, which is what the
//! blocking verification path suspends on.

use crate::interaction::{Interaction, InteractionKind};
use crate::result::{FingirError, FingirResult};
use crate::value::{ArgValue, NamedArg};
use crate::wait::{CancellationToken, WaitOptions};
use std::collections::BTreeSet;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Instant;
use tracing::debug;

#[derive(Debug, Default)]
struct LedgerState {
    interactions: Vec<Interaction>,
    verified: BTreeSet<u64>,
    next_index: u64,
}

#[derive(Debug, Default)]
struct LedgerInner {
    state: Mutex<LedgerState>,
    appended: Condvar,
}

/// Thread-safe interaction ledger, cheap to clone and share.
///
/// Each mock engine owns exactly one ledger; clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct InteractionLedger {
    inner: Arc<LedgerInner>,
}

impl InteractionLedger {
    /// Create an empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_state(&self) -> MutexGuard<'_, LedgerState> {
        // A poisoned lock still holds consistent data: the only writes are
        // single push/insert operations
        self.inner
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Append an interaction and return its assigned index.
    ///
    /// Indices are assigned under the ledger lock, so concurrent appenders
    /// always receive a gapless increasing sequence. The append notification
    /// fires after the entry is visible.
    pub fn append(
        &self,
        kind: InteractionKind,
        member_name: impl Into<String>,
        arguments: Vec<NamedArg>,
        result_value: Option<ArgValue>,
    ) -> u64 {
        let member_name = member_name.into();
        let index = {
            let mut state = self.lock_state();
            let index = state.next_index;
            state.next_index += 1;
            state.interactions.push(Interaction {
                index,
                kind,
                member_name: member_name.clone(),
                arguments,
                result_value,
            });
            index
        };
        debug!(index, member = %member_name, kind = %kind, "interaction appended");
        self.inner.appended.notify_all();
        index
    }

    /// Ordered snapshot of every recorded interaction
    #[must_use]
    pub fn all(&self) -> Vec<Interaction> {
        self.lock_state().interactions.clone()
    }

    /// Number of recorded interactions
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_state().interactions.len()
    }

    /// Whether nothing has been recorded yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mark interactions verified. Monotonic and idempotent.
    pub fn mark_verified(&self, indices: &[u64]) {
        let mut state = self.lock_state();
        for &index in indices {
            state.verified.insert(index);
        }
    }

    /// Whether a specific interaction has been verified
    #[must_use]
    pub fn is_verified(&self, index: u64) -> bool {
        self.lock_state().verified.contains(&index)
    }

    /// Interactions never included in a successful verification, ascending
    /// by index
    #[must_use]
    pub fn unverified(&self) -> Vec<Interaction> {
        let state = self.lock_state();
        state
            .interactions
            .iter()
            .filter(|i| !state.verified.contains(&i.index))
            .cloned()
            .collect()
    }

    /// Drop all entries and verification marks; indices restart at zero
    pub fn clear(&self) {
        let mut state = self.lock_state();
        state.interactions.clear();
        state.verified.clear();
        state.next_index = 0;
    }

    /// Block until `predicate` holds over the recorded interactions.
    ///
    /// The predicate is evaluated immediately (fast path), then re-evaluated
    /// on every append notification. The wait ends when the predicate holds,
    /// the configured timeout elapses (`Timeout`), or the token is cancelled
    /// (`Cancelled`). The cancellation waker is registered through a scoped
    /// guard, so no listener outlives the wait on any exit path.
    pub fn wait_for<F>(
        &self,
        predicate: F,
        options: &WaitOptions,
        cancel: Option<&CancellationToken>,
    ) -> FingirResult<()>
    where
        F: Fn(&[Interaction]) -> bool,
    {
        let deadline = options.timeout().map(|d| Instant::now() + d);

        // Cancellation wakes the condvar all waiters sleep on
        let _waker_guard = cancel.map(|token| {
            let inner = self.inner.clone();
            token.register(Arc::new(move || {
                // Touch the lock so a waiter between check and sleep still
                // observes the wake
                drop(
                    inner
                        .state
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner),
                );
                inner.appended.notify_all();
            }))
        });

        let mut state = self.lock_state();
        loop {
            if predicate(&state.interactions) {
                return Ok(());
            }
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(FingirError::Cancelled);
            }
            match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(FingirError::Timeout {
                            ms: options.timeout_ms.unwrap_or(0),
                        });
                    }
                    let (guard, _timed_out) = self
                        .inner
                        .appended
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(|e| e.into_inner());
                    state = guard;
                }
                None => {
                    state = self
                        .inner
                        .appended
                        .wait(state)
                        .unwrap_or_else(std::sync::PoisonError::into_inner);
                }
            }
        }
    }
}
