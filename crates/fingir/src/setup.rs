//! Setups and the setup registry.
//!
//! A setup describes how matching interactions are satisfied: which member
//! and argument shapes it governs, the value sequence consumed by get-style
//! accesses, and the callback chains fired on get/set. The registry resolves
//! a setup for each interaction by scanning candidates in reverse
//! registration order, so the most recently registered matching setup wins
//! regardless of specificity.

use crate::interaction::{InteractionKind, MemberTarget};
use crate::matcher::{Matcher, MatcherList};
use crate::result::{FingirError, FingirResult};
use crate::sequencer::{CallbackChain, ChainLink, SequenceOutcome, ValueSequence, ValueUnit};
use crate::value::{ArgValue, NamedArg};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Which accessibility scope a setup governs.
///
/// One implementation serves both scopes; the flag is just another
/// resolution filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Accessibility {
    /// Publicly accessible member
    #[default]
    Public,
    /// Protected member, reached through a scoped adapter
    Protected,
}

#[derive(Debug, Default)]
struct SetupState {
    sequence: ValueSequence,
    on_get: CallbackChain,
    on_set: CallbackChain,
    /// Backing store for stubbed properties; `Some` once initialized
    initial_value: Option<ArgValue>,
    /// Configured ref/out-style values by parameter position
    out_values: Vec<(usize, ArgValue)>,
}

/// A registered configuration describing how matching interactions are
/// satisfied.
#[derive(Debug)]
pub struct Setup {
    member_name: String,
    target: MemberTarget,
    matchers: MatcherList,
    /// Optional filter over the assigned value of set-style accesses
    value_matcher: Option<Matcher>,
    accessibility: Accessibility,
    usage_count: AtomicU64,
    state: Mutex<SetupState>,
}

impl Setup {
    /// Create a setup for a member
    #[must_use]
    pub fn new(
        member_name: impl Into<String>,
        target: MemberTarget,
        matchers: MatcherList,
    ) -> Self {
        Self {
            member_name: member_name.into(),
            target,
            matchers,
            value_matcher: None,
            accessibility: Accessibility::Public,
            usage_count: AtomicU64::new(0),
            state: Mutex::new(SetupState::default()),
        }
    }

    /// Filter set-style accesses by their assigned value
    #[must_use]
    pub fn with_value_matcher(mut self, matcher: Matcher) -> Self {
        self.value_matcher = Some(matcher);
        self
    }

    /// Restrict the setup to an accessibility scope
    #[must_use]
    pub fn with_accessibility(mut self, accessibility: Accessibility) -> Self {
        self.accessibility = accessibility;
        self
    }

    /// Qualified member name
    #[must_use]
    pub fn member_name(&self) -> &str {
        &self.member_name
    }

    /// Member category this setup governs
    #[must_use]
    pub fn target(&self) -> MemberTarget {
        self.target
    }

    /// Number of parameter positions the setup expects
    #[must_use]
    pub fn arity(&self) -> usize {
        self.matchers.arity()
    }

    /// How many interactions this setup has matched so far
    #[must_use]
    pub fn usage_count(&self) -> u64 {
        self.usage_count.load(Ordering::SeqCst)
    }

    /// Render the matcher list for diagnostics
    #[must_use]
    pub fn describe(&self) -> String {
        format!("{}{}", self.member_name, self.matchers.describe())
    }

    fn lock_state(&self) -> MutexGuard<'_, SetupState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Whether this setup governs the given access.
    ///
    /// Checks member category, accessibility scope, the assigned-value
    /// filter for set-style accesses, and then the per-position matchers.
    /// Keys of multi-key indexers are compared per position; an access
    /// whose argument count differs from the matcher count never matches.
    #[must_use]
    pub fn governs(
        &self,
        kind: InteractionKind,
        scope: Accessibility,
        args: &[NamedArg],
        assigned: Option<&ArgValue>,
    ) -> bool {
        if kind.target() != self.target || scope != self.accessibility {
            return false;
        }
        if let Some(value_matcher) = &self.value_matcher {
            match assigned {
                Some(value) if value_matcher.accepts(value) => {}
                _ => return false,
            }
        }
        self.matchers.matches_all(args)
    }

    // -------------------------------------------------------------------------
    // Configuration
    // -------------------------------------------------------------------------

    /// Install a pre-built value sequence.
    ///
    /// This is the adapter-facing bulk form of `registerSetup`; it refuses
    /// to replace a sequence that already holds units.
    pub fn install_sequence(&self, units: Vec<ValueUnit>) -> FingirResult<()> {
        let mut state = self.lock_state();
        if !state.sequence.is_empty() {
            return Err(FingirError::AlreadyInitialized {
                member: self.member_name.clone(),
            });
        }
        for unit in units {
            state.sequence.push(unit);
        }
        Ok(())
    }

    /// Initialize the property backing value. Fails on a second call.
    pub fn set_initial_value(&self, value: ArgValue) -> FingirResult<()> {
        let mut state = self.lock_state();
        if state.initial_value.is_some() {
            return Err(FingirError::AlreadyInitialized {
                member: self.member_name.clone(),
            });
        }
        state.initial_value = Some(value);
        Ok(())
    }

    /// Append a value unit to the sequence
    pub fn add_unit(&self, unit: ValueUnit) {
        self.lock_state().sequence.push(unit);
    }

    /// Append a link to the on-get chain
    pub fn add_get_link(&self, link: ChainLink) {
        self.lock_state().on_get.push(link);
    }

    /// Append a link to the on-set chain
    pub fn add_set_link(&self, link: ChainLink) {
        self.lock_state().on_set.push(link);
    }

    /// Configure a ref/out-style value for a parameter position
    pub fn add_out_value(&self, position: usize, value: ArgValue) {
        self.lock_state().out_values.push((position, value));
    }

    pub(crate) fn update_last_unit(&self, update: impl FnOnce(&mut ValueUnit)) {
        if let Some(unit) = self.lock_state().sequence.last_unit_mut() {
            update(unit);
        }
    }

    pub(crate) fn update_last_get_link(&self, update: impl FnOnce(&mut ChainLink)) {
        if let Some(link) = self.lock_state().on_get.last_link_mut() {
            update(link);
        }
    }

    pub(crate) fn update_last_set_link(&self, update: impl FnOnce(&mut ChainLink)) {
        if let Some(link) = self.lock_state().on_set.last_link_mut() {
            update(link);
        }
    }

    // -------------------------------------------------------------------------
    // Consumption
    // -------------------------------------------------------------------------

    /// Satisfy a get-style access: fire the on-get chain, then pull the next
    /// value from the sequence. Falls back to the property backing value
    /// when the sequence has nothing to offer.
    pub fn consume_get(&self, args: &[NamedArg]) -> SequenceOutcome {
        let usage = self.usage_count.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock_state();
        state.on_get.fire(usage, args);
        match state.sequence.next(usage, args) {
            SequenceOutcome::Unmatched => state
                .initial_value
                .clone()
                .map_or(SequenceOutcome::Unmatched, SequenceOutcome::Value),
            outcome => outcome,
        }
    }

    /// Satisfy a set-style access: fire the on-set chain and update the
    /// property backing value if one was initialized.
    pub fn consume_set(&self, args: &[NamedArg], assigned: Option<&ArgValue>) {
        let usage = self.usage_count.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock_state();
        state.on_set.fire(usage, args);
        if state.initial_value.is_some() {
            if let Some(value) = assigned {
                state.initial_value = Some(value.clone());
            }
        }
    }

    /// Snapshot of configured ref/out values, by parameter position
    #[must_use]
    pub fn out_values(&self) -> Vec<(usize, ArgValue)> {
        self.lock_state().out_values.clone()
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Per-member ordered collection of setups.
///
/// Registration order is preserved per bucket; resolution scans it in
/// reverse, so a broader setup registered later shadows a narrower earlier
/// one for all future accesses.
#[derive(Debug, Default)]
pub struct SetupRegistry {
    buckets: Mutex<HashMap<String, Vec<Arc<Setup>>>>,
}

impl SetupRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_buckets(&self) -> MutexGuard<'_, HashMap<String, Vec<Arc<Setup>>>> {
        self.buckets
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Register a setup and return the shared handle
    pub fn register(&self, setup: Setup) -> Arc<Setup> {
        let setup = Arc::new(setup);
        self.lock_buckets()
            .entry(setup.member_name().to_string())
            .or_default()
            .push(setup.clone());
        debug!(member = setup.member_name(), "setup registered");
        setup
    }

    /// Resolve the setup governing an access, if any.
    ///
    /// Candidates are filtered by member name, member category, scope, and
    /// matcher arity, then scanned most-recent-first; the first full match
    /// wins. Ties break by recency, not specificity.
    #[must_use]
    pub fn resolve(
        &self,
        kind: InteractionKind,
        scope: Accessibility,
        member_name: &str,
        args: &[NamedArg],
        assigned: Option<&ArgValue>,
    ) -> Option<Arc<Setup>> {
        let buckets = self.lock_buckets();
        let resolved = buckets.get(member_name).and_then(|bucket| {
            bucket
                .iter()
                .rev()
                .find(|setup| setup.governs(kind, scope, args, assigned))
                .cloned()
        });
        match &resolved {
            Some(setup) => debug!(
                member = member_name,
                setup = %setup.describe(),
                "setup resolved"
            ),
            None => debug!(member = member_name, kind = %kind, "no setup resolved"),
        }
        resolved
    }

    /// All setups registered for a member, in registration order
    #[must_use]
    pub fn all_for(&self, member_name: &str) -> Vec<Arc<Setup>> {
        self.lock_buckets()
            .get(member_name)
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of registered setups
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_buckets().values().map(Vec::len).sum()
    }

    /// Whether no setups are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every registered setup
    pub fn clear(&self) {
        self.lock_buckets().clear();
    }
}
