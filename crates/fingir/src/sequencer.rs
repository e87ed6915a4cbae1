//! Callback sequencing.
//!
//! A setup owns two independent sub-protocols: a value/exception sequence
//! consumed by get-style accesses ("returns"/"raises"), and side-effect
//! callback chains fired on get/set accesses. Both share the same repeat
//! vocabulary: `Once` (default), `Times(n)` ("for n"), `Capped(n)`
//! ("only n"), and `Forever`.

use crate::result::FingirError;
use crate::value::{ArgValue, NamedArg};
use std::fmt;
use std::sync::Arc;

/// Value producer factory invoked with the access's arguments
pub type ValueFactory = Arc<dyn Fn(&[NamedArg]) -> ArgValue + Send + Sync>;

/// Error producer factory for raising units
pub type ErrorFactory = Arc<dyn Fn(&[NamedArg]) -> FingirError + Send + Sync>;

/// Activation predicate over (setup usage count, access arguments)
pub type ActivationPredicate = Arc<dyn Fn(u64, &[NamedArg]) -> bool + Send + Sync>;

/// Side-effect action run by a callback chain link
pub type ChainAction = Arc<dyn Fn(&[NamedArg]) + Send + Sync>;

// =============================================================================
// REPEAT VOCABULARY
// =============================================================================

/// How often a unit or chain link serves before the sequencer moves on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    /// Serve exactly once, then advance (default)
    Once,
    /// Serve n consecutive accesses, then advance ("for n")
    Times(u32),
    /// At most n serves across the unit's lifetime, then skip permanently
    /// ("only n")
    Capped(u32),
    /// Pin the sequencer here; never advance
    Forever,
}

impl Default for Repeat {
    fn default() -> Self {
        Self::Once
    }
}

// =============================================================================
// VALUE SEQUENCE
// =============================================================================

/// What a value unit produces when it serves
#[derive(Clone)]
pub enum Producer {
    /// A fixed value
    Const(ArgValue),
    /// A value computed from the access arguments
    Factory(ValueFactory),
    /// An error surfaced to the caller
    Raising(ErrorFactory),
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Const(v) => write!(f, "Const({v})"),
            Self::Factory(_) => write!(f, "Factory(..)"),
            Self::Raising(_) => write!(f, "Raising(..)"),
        }
    }
}

/// One link in a value/exception usage sequence
#[derive(Clone)]
pub struct ValueUnit {
    producer: Producer,
    repeat: Repeat,
    when: Option<ActivationPredicate>,
}

impl fmt::Debug for ValueUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueUnit")
            .field("producer", &self.producer)
            .field("repeat", &self.repeat)
            .field("conditional", &self.when.is_some())
            .finish()
    }
}

impl ValueUnit {
    /// Create a unit producing a fixed value
    #[must_use]
    pub fn constant(value: impl Into<ArgValue>) -> Self {
        Self {
            producer: Producer::Const(value.into()),
            repeat: Repeat::Once,
            when: None,
        }
    }

    /// Create a unit computing its value from the access arguments
    #[must_use]
    pub fn factory<F>(factory: F) -> Self
    where
        F: Fn(&[NamedArg]) -> ArgValue + Send + Sync + 'static,
    {
        Self {
            producer: Producer::Factory(Arc::new(factory)),
            repeat: Repeat::Once,
            when: None,
        }
    }

    /// Create a unit that raises an error
    #[must_use]
    pub fn raising<F>(factory: F) -> Self
    where
        F: Fn(&[NamedArg]) -> FingirError + Send + Sync + 'static,
    {
        Self {
            producer: Producer::Raising(Arc::new(factory)),
            repeat: Repeat::Once,
            when: None,
        }
    }

    /// Set the repeat bound
    #[must_use]
    pub fn with_repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    /// Set an activation predicate; a rejecting unit makes the access fall
    /// through as unmatched
    #[must_use]
    pub fn with_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(u64, &[NamedArg]) -> bool + Send + Sync + 'static,
    {
        self.when = Some(Arc::new(predicate));
        self
    }

    pub(crate) fn set_repeat(&mut self, repeat: Repeat) {
        self.repeat = repeat;
    }

    pub(crate) fn set_when(&mut self, predicate: ActivationPredicate) {
        self.when = Some(predicate);
    }
}

/// Outcome of asking the sequence for the next value
#[derive(Debug)]
pub enum SequenceOutcome {
    /// The current unit produced a value
    Value(ArgValue),
    /// The current unit raised
    Raise(FingirError),
    /// No eligible unit; the access falls through like "no setup matched"
    Unmatched,
}

/// Ordered value/exception sequence with cyclic advancement.
///
/// Advancement wraps modulo the sequence length unless the current unit is
/// pinned with [`Repeat::Forever`]. Capped units are skipped permanently
/// once their lifetime budget is spent; when every unit is exhausted the
/// access is unmatched. Callers serialize access (the owning setup holds
/// the sequence behind its lock), which makes each advance atomic per
/// access.
#[derive(Debug, Default)]
pub struct ValueSequence {
    units: Vec<ValueUnit>,
    cursor: usize,
    consecutive: u32,
    lifetime: Vec<u32>,
}

impl ValueSequence {
    /// Create an empty sequence
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a unit to the end of the sequence
    pub fn push(&mut self, unit: ValueUnit) {
        self.units.push(unit);
        self.lifetime.push(0);
    }

    /// Number of units
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether no units have been registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub(crate) fn last_unit_mut(&mut self) -> Option<&mut ValueUnit> {
        self.units.last_mut()
    }

    fn exhausted(&self, idx: usize) -> bool {
        match self.units[idx].repeat {
            Repeat::Capped(cap) => self.lifetime[idx] >= cap,
            // "for 0" serves zero times
            Repeat::Times(0) => true,
            _ => false,
        }
    }

    fn advance(&mut self) {
        self.cursor = (self.cursor + 1) % self.units.len();
        self.consecutive = 0;
    }

    /// Produce the next value for a consuming access.
    ///
    /// `usage_count` is the owning setup's match count before this access,
    /// passed to activation predicates.
    pub fn next(&mut self, usage_count: u64, args: &[NamedArg]) -> SequenceOutcome {
        if self.units.is_empty() {
            return SequenceOutcome::Unmatched;
        }
        let n = self.units.len();

        // Skip permanently exhausted units, wrapping at most once
        let mut idx = self.cursor % n;
        let mut eligible = None;
        for _ in 0..n {
            if !self.exhausted(idx) {
                eligible = Some(idx);
                break;
            }
            idx = (idx + 1) % n;
        }
        let Some(idx) = eligible else {
            return SequenceOutcome::Unmatched;
        };
        if idx != self.cursor {
            self.cursor = idx;
            self.consecutive = 0;
        }

        // A rejecting predicate does not advance: the access simply falls
        // through for this call
        if let Some(when) = &self.units[idx].when {
            if !when(usage_count, args) {
                return SequenceOutcome::Unmatched;
            }
        }

        let outcome = match &self.units[idx].producer {
            Producer::Const(value) => SequenceOutcome::Value(value.clone()),
            Producer::Factory(factory) => SequenceOutcome::Value(factory(args)),
            Producer::Raising(factory) => SequenceOutcome::Raise(factory(args)),
        };

        self.lifetime[idx] += 1;
        match self.units[idx].repeat {
            Repeat::Forever => {}
            Repeat::Once | Repeat::Capped(_) => self.advance(),
            Repeat::Times(per_turn) => {
                self.consecutive += 1;
                if self.consecutive >= per_turn {
                    self.advance();
                }
            }
        }
        outcome
    }
}

// =============================================================================
// CALLBACK CHAIN
// =============================================================================

/// One link in a side-effect callback chain
#[derive(Clone)]
pub struct ChainLink {
    action: ChainAction,
    /// Expected argument count; a mismatching access skips the link silently
    arity: Option<usize>,
    repeat: Repeat,
    when: Option<ActivationPredicate>,
    parallel: bool,
}

impl fmt::Debug for ChainLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainLink")
            .field("arity", &self.arity)
            .field("repeat", &self.repeat)
            .field("parallel", &self.parallel)
            .field("conditional", &self.when.is_some())
            .finish()
    }
}

impl ChainLink {
    /// Create a link runnable for any argument shape
    #[must_use]
    pub fn new<F>(action: F) -> Self
    where
        F: Fn(&[NamedArg]) + Send + Sync + 'static,
    {
        Self {
            action: Arc::new(action),
            arity: None,
            repeat: Repeat::Once,
            when: None,
            parallel: false,
        }
    }

    /// Require a specific argument count; other shapes skip the link
    #[must_use]
    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = Some(arity);
        self
    }

    /// Set the repeat bound
    #[must_use]
    pub fn with_repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    /// Set an activation predicate
    #[must_use]
    pub fn with_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(u64, &[NamedArg]) -> bool + Send + Sync + 'static,
    {
        self.when = Some(Arc::new(predicate));
        self
    }

    /// Run this link on every access instead of consuming a sequential turn
    #[must_use]
    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    pub(crate) fn set_repeat(&mut self, repeat: Repeat) {
        self.repeat = repeat;
    }

    pub(crate) fn set_when(&mut self, predicate: ActivationPredicate) {
        self.when = Some(predicate);
    }

    pub(crate) fn set_parallel(&mut self) {
        self.parallel = true;
    }

    fn shape_matches(&self, args: &[NamedArg]) -> bool {
        self.arity.map_or(true, |arity| args.len() == arity)
    }
}

/// Ordered chain of side-effect callbacks.
///
/// Sequential links execute strictly in registration order, one per access;
/// parallel links execute on every access alongside whichever sequential
/// link is current. Callers serialize access through the owning setup's
/// lock.
#[derive(Debug, Default)]
pub struct CallbackChain {
    links: Vec<ChainLink>,
    seq_cursor: usize,
    consecutive: u32,
    lifetime: Vec<u32>,
}

impl CallbackChain {
    /// Create an empty chain
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a link in registration order
    pub fn push(&mut self, link: ChainLink) {
        self.links.push(link);
        self.lifetime.push(0);
    }

    /// Number of links
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether no links have been registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub(crate) fn last_link_mut(&mut self) -> Option<&mut ChainLink> {
        self.links.last_mut()
    }

    fn exhausted(&self, idx: usize) -> bool {
        match self.links[idx].repeat {
            Repeat::Capped(cap) => self.lifetime[idx] >= cap,
            Repeat::Times(0) => true,
            _ => false,
        }
    }

    /// Fire the chain for one access.
    ///
    /// Every eligible parallel link runs; exactly one sequential link
    /// consumes its turn. Argument-shape mismatch skips the link's action
    /// but still consumes the sequential turn, so a stale generic callback
    /// never wedges the chain.
    pub fn fire(&mut self, usage_count: u64, args: &[NamedArg]) {
        // Parallel links: no ordering guarantee, every access
        for idx in 0..self.links.len() {
            if !self.links[idx].parallel || self.exhausted(idx) {
                continue;
            }
            if let Some(when) = &self.links[idx].when {
                if !when(usage_count, args) {
                    continue;
                }
            }
            if self.links[idx].shape_matches(args) {
                (self.links[idx].action)(args);
                self.lifetime[idx] += 1;
            }
        }

        // Sequential links: one turn per access
        let sequential: Vec<usize> = self
            .links
            .iter()
            .enumerate()
            .filter(|(_, link)| !link.parallel)
            .map(|(idx, _)| idx)
            .collect();
        if sequential.is_empty() {
            return;
        }
        let m = sequential.len();

        let mut pos = self.seq_cursor % m;
        let mut eligible = None;
        for _ in 0..m {
            if !self.exhausted(sequential[pos]) {
                eligible = Some(pos);
                break;
            }
            pos = (pos + 1) % m;
        }
        let Some(pos) = eligible else {
            return;
        };
        if pos != self.seq_cursor {
            self.seq_cursor = pos;
            self.consecutive = 0;
        }
        let idx = sequential[pos];

        if let Some(when) = &self.links[idx].when {
            if !when(usage_count, args) {
                return;
            }
        }
        // A shape mismatch consumes the turn but not the lifetime budget
        if self.links[idx].shape_matches(args) {
            (self.links[idx].action)(args);
            self.lifetime[idx] += 1;
        }

        match self.links[idx].repeat {
            Repeat::Forever => {}
            Repeat::Once | Repeat::Capped(_) => {
                self.seq_cursor = (pos + 1) % m;
                self.consecutive = 0;
            }
            Repeat::Times(per_turn) => {
                self.consecutive += 1;
                if self.consecutive >= per_turn {
                    self.seq_cursor = (pos + 1) % m;
                    self.consecutive = 0;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::positional_args;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn drain(seq: &mut ValueSequence, calls: usize) -> Vec<String> {
        (0..calls)
            .map(|i| match seq.next(i as u64, &[]) {
                SequenceOutcome::Value(v) => {
                    v.as_str().map_or_else(|| v.to_string(), String::from)
                }
                SequenceOutcome::Raise(e) => format!("raise:{e}"),
                SequenceOutcome::Unmatched => String::new(),
            })
            .collect()
    }

    mod value_sequence_tests {
        use super::*;

        #[test]
        fn test_cycles_modulo_length() {
            let mut seq = ValueSequence::new();
            for v in ["a", "b", "c"] {
                seq.push(ValueUnit::constant(v));
            }
            assert_eq!(drain(&mut seq, 5), vec!["a", "b", "c", "a", "b"]);
        }

        #[test]
        fn test_forever_pins_last_unit() {
            let mut seq = ValueSequence::new();
            seq.push(ValueUnit::constant("a"));
            seq.push(ValueUnit::constant("b"));
            seq.push(ValueUnit::constant("c").with_repeat(Repeat::Forever));
            assert_eq!(drain(&mut seq, 6), vec!["a", "b", "c", "c", "c", "c"]);
        }

        #[test]
        fn test_for_semantics_over_ten_calls() {
            let mut seq = ValueSequence::new();
            seq.push(ValueUnit::constant("foo").with_repeat(Repeat::Times(2)));
            seq.push(ValueUnit::constant("bar").with_repeat(Repeat::Times(3)));
            assert_eq!(
                drain(&mut seq, 10),
                vec!["foo", "foo", "bar", "bar", "bar", "foo", "foo", "bar", "bar", "bar"]
            );
        }

        #[test]
        fn test_only_semantics_over_ten_calls() {
            let mut seq = ValueSequence::new();
            seq.push(ValueUnit::constant("foo").with_repeat(Repeat::Capped(2)));
            seq.push(ValueUnit::constant("bar").with_repeat(Repeat::Capped(3)));
            assert_eq!(
                drain(&mut seq, 10),
                vec!["foo", "bar", "foo", "bar", "bar", "", "", "", "", ""]
            );
        }

        #[test]
        fn test_single_value_repeats() {
            let mut seq = ValueSequence::new();
            seq.push(ValueUnit::constant(42));
            assert_eq!(drain(&mut seq, 3), vec!["42", "42", "42"]);
        }

        #[test]
        fn test_empty_sequence_unmatched() {
            let mut seq = ValueSequence::new();
            assert!(matches!(seq.next(0, &[]), SequenceOutcome::Unmatched));
        }

        #[test]
        fn test_factory_sees_arguments() {
            let mut seq = ValueSequence::new();
            seq.push(ValueUnit::factory(|args| {
                json!(args[0].value.as_i64().unwrap_or(0) * 2)
            }));
            let args = positional_args(vec![json!(21)]);
            match seq.next(0, &args) {
                SequenceOutcome::Value(v) => assert_eq!(v, json!(42)),
                other => panic!("expected value, got {other:?}"),
            }
        }

        #[test]
        fn test_raising_unit() {
            let mut seq = ValueSequence::new();
            seq.push(ValueUnit::raising(|_| FingirError::raised("boom")));
            seq.push(ValueUnit::constant("ok"));
            assert!(matches!(seq.next(0, &[]), SequenceOutcome::Raise(_)));
            assert!(matches!(seq.next(1, &[]), SequenceOutcome::Value(_)));
        }

        #[test]
        fn test_rejecting_when_falls_through_without_advancing() {
            let mut seq = ValueSequence::new();
            seq.push(ValueUnit::constant("gated").with_when(|count, _| count >= 2));
            seq.push(ValueUnit::constant("after"));

            // usage counts 0 and 1 are rejected; the unit stays current
            assert!(matches!(seq.next(0, &[]), SequenceOutcome::Unmatched));
            assert!(matches!(seq.next(1, &[]), SequenceOutcome::Unmatched));
            match seq.next(2, &[]) {
                SequenceOutcome::Value(v) => assert_eq!(v, json!("gated")),
                other => panic!("expected gated value, got {other:?}"),
            }
            match seq.next(3, &[]) {
                SequenceOutcome::Value(v) => assert_eq!(v, json!("after")),
                other => panic!("expected after value, got {other:?}"),
            }
        }

        #[test]
        fn test_when_sees_arguments() {
            let mut seq = ValueSequence::new();
            seq.push(
                ValueUnit::constant("big").with_when(|_, args| {
                    args.first().is_some_and(|a| a.value.as_i64().unwrap_or(0) > 10)
                }),
            );
            assert!(matches!(
                seq.next(0, &positional_args(vec![json!(5)])),
                SequenceOutcome::Unmatched
            ));
            assert!(matches!(
                seq.next(0, &positional_args(vec![json!(50)])),
                SequenceOutcome::Value(_)
            ));
        }

        #[test]
        fn test_times_zero_never_serves() {
            let mut seq = ValueSequence::new();
            seq.push(ValueUnit::constant("skipped").with_repeat(Repeat::Times(0)));
            seq.push(ValueUnit::constant("served"));
            assert_eq!(drain(&mut seq, 3), vec!["served", "served", "served"]);
        }

        #[test]
        fn test_all_units_times_zero_unmatched() {
            let mut seq = ValueSequence::new();
            seq.push(ValueUnit::constant("a").with_repeat(Repeat::Times(0)));
            assert!(matches!(seq.next(0, &[]), SequenceOutcome::Unmatched));
        }

        #[test]
        fn test_capped_then_forever_tail() {
            let mut seq = ValueSequence::new();
            seq.push(ValueUnit::constant("first").with_repeat(Repeat::Capped(1)));
            seq.push(ValueUnit::constant("rest").with_repeat(Repeat::Forever));
            assert_eq!(drain(&mut seq, 4), vec!["first", "rest", "rest", "rest"]);
        }
    }

    mod callback_chain_tests {
        use super::*;

        fn recording_link(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> ChainLink {
            let log = log.clone();
            ChainLink::new(move |_| log.lock().unwrap().push(tag))
        }

        #[test]
        fn test_sequential_links_one_per_access() {
            let log = Arc::new(Mutex::new(Vec::new()));
            let mut chain = CallbackChain::new();
            chain.push(recording_link(&log, "a"));
            chain.push(recording_link(&log, "b"));

            chain.fire(0, &[]);
            chain.fire(1, &[]);
            chain.fire(2, &[]);
            assert_eq!(*log.lock().unwrap(), vec!["a", "b", "a"]);
        }

        #[test]
        fn test_parallel_link_fires_every_access() {
            let log = Arc::new(Mutex::new(Vec::new()));
            let mut chain = CallbackChain::new();
            chain.push(recording_link(&log, "seq1"));
            chain.push(recording_link(&log, "par").parallel());
            chain.push(recording_link(&log, "seq2"));

            chain.fire(0, &[]);
            chain.fire(1, &[]);
            assert_eq!(*log.lock().unwrap(), vec!["par", "seq1", "par", "seq2"]);
        }

        #[test]
        fn test_times_serves_consecutively() {
            let log = Arc::new(Mutex::new(Vec::new()));
            let mut chain = CallbackChain::new();
            chain.push(recording_link(&log, "a").with_repeat(Repeat::Times(2)));
            chain.push(recording_link(&log, "b"));

            for i in 0..4 {
                chain.fire(i, &[]);
            }
            assert_eq!(*log.lock().unwrap(), vec!["a", "a", "b", "a"]);
        }

        #[test]
        fn test_capped_link_permanently_skipped() {
            let log = Arc::new(Mutex::new(Vec::new()));
            let mut chain = CallbackChain::new();
            chain.push(recording_link(&log, "once").with_repeat(Repeat::Capped(1)));
            chain.push(recording_link(&log, "steady").with_repeat(Repeat::Forever));

            for i in 0..4 {
                chain.fire(i, &[]);
            }
            assert_eq!(
                *log.lock().unwrap(),
                vec!["once", "steady", "steady", "steady"]
            );
        }

        #[test]
        fn test_arity_mismatch_skips_silently_but_consumes_turn() {
            let ran = Arc::new(AtomicUsize::new(0));
            let ran_clone = ran.clone();
            let log = Arc::new(Mutex::new(Vec::new()));

            let mut chain = CallbackChain::new();
            chain.push(
                ChainLink::new(move |_| {
                    ran_clone.fetch_add(1, Ordering::SeqCst);
                })
                .with_arity(2),
            );
            chain.push(recording_link(&log, "b"));

            // One-argument access: the two-argument link is skipped, its
            // turn is consumed, the chain stays live
            let args = positional_args(vec![json!(1)]);
            chain.fire(0, &args);
            chain.fire(1, &args);
            assert_eq!(ran.load(Ordering::SeqCst), 0);
            assert_eq!(*log.lock().unwrap(), vec!["b"]);

            // Matching shape executes
            let args2 = positional_args(vec![json!(1), json!(2)]);
            chain.fire(2, &args2);
            assert_eq!(ran.load(Ordering::SeqCst), 1);
        }

        #[test]
        fn test_arity_skip_preserves_capped_budget() {
            let ran = Arc::new(AtomicUsize::new(0));
            let ran_clone = ran.clone();
            let mut chain = CallbackChain::new();
            chain.push(
                ChainLink::new(move |_| {
                    ran_clone.fetch_add(1, Ordering::SeqCst);
                })
                .with_arity(2)
                .with_repeat(Repeat::Capped(1)),
            );

            // Mismatching accesses consume turns but never the "only 1"
            // budget
            let one_arg = positional_args(vec![json!(1)]);
            chain.fire(0, &one_arg);
            chain.fire(1, &one_arg);
            assert_eq!(ran.load(Ordering::SeqCst), 0);

            let two_args = positional_args(vec![json!(1), json!(2)]);
            chain.fire(2, &two_args);
            assert_eq!(ran.load(Ordering::SeqCst), 1);
            chain.fire(3, &two_args);
            assert_eq!(ran.load(Ordering::SeqCst), 1);
        }

        #[test]
        fn test_times_zero_link_skipped() {
            let log = Arc::new(Mutex::new(Vec::new()));
            let mut chain = CallbackChain::new();
            chain.push(recording_link(&log, "zero").with_repeat(Repeat::Times(0)));
            chain.push(recording_link(&log, "live"));

            chain.fire(0, &[]);
            chain.fire(1, &[]);
            assert_eq!(*log.lock().unwrap(), vec!["live", "live"]);
        }

        #[test]
        fn test_rejecting_when_holds_position() {
            let log = Arc::new(Mutex::new(Vec::new()));
            let mut chain = CallbackChain::new();
            {
                let log = log.clone();
                chain.push(
                    ChainLink::new(move |_| log.lock().unwrap().push("gated"))
                        .with_when(|count, _| count >= 1),
                );
            }
            chain.push(recording_link(&log, "after"));

            chain.fire(0, &[]); // rejected, no advance
            chain.fire(1, &[]); // serves "gated"
            chain.fire(2, &[]); // serves "after"
            assert_eq!(*log.lock().unwrap(), vec!["gated", "after"]);
        }

        #[test]
        fn test_empty_chain_is_noop() {
            let mut chain = CallbackChain::new();
            chain.fire(0, &[]); // must not panic
            assert!(chain.is_empty());
        }

        #[test]
        fn test_parallel_only_chain() {
            let ran = Arc::new(AtomicUsize::new(0));
            let ran_clone = ran.clone();
            let mut chain = CallbackChain::new();
            chain.push(
                ChainLink::new(move |_| {
                    ran_clone.fetch_add(1, Ordering::SeqCst);
                })
                .parallel(),
            );
            for i in 0..3 {
                chain.fire(i, &[]);
            }
            assert_eq!(ran.load(Ordering::SeqCst), 3);
        }

        #[test]
        fn test_parallel_capped_stops_at_budget() {
            let ran = Arc::new(AtomicUsize::new(0));
            let ran_clone = ran.clone();
            let mut chain = CallbackChain::new();
            chain.push(
                ChainLink::new(move |_| {
                    ran_clone.fetch_add(1, Ordering::SeqCst);
                })
                .parallel()
                .with_repeat(Repeat::Capped(2)),
            );
            for i in 0..5 {
                chain.fire(i, &[]);
            }
            assert_eq!(ran.load(Ordering::SeqCst), 2);
        }
    }
}
