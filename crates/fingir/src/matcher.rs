//! Parameter matchers.
//!
//! A matcher is a predicate over a single argument value. Setups and
//! verifications carry one matcher per parameter; composite matching over a
//! full argument list fails closed when arities differ, which keeps
//! overloaded indexers with different key counts from colliding in the same
//! registry bucket.

use crate::value::{ArgValue, NamedArg};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Boxed predicate used by [`Matcher::Satisfies`]
pub type ValuePredicate = Arc<dyn Fn(&ArgValue) -> bool + Send + Sync>;

// =============================================================================
// CAPTURE SINK
// =============================================================================

/// Shared sink that records argument values matched by a capturing matcher.
///
/// The sink is owned by the test; the matcher only holds a handle to it.
#[derive(Clone, Default)]
pub struct Captured {
    values: Arc<Mutex<Vec<ArgValue>>>,
}

impl fmt::Debug for Captured {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Captured")
            .field("len", &self.len())
            .finish()
    }
}

impl Captured {
    /// Create an empty capture sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a matcher that records into this sink
    #[must_use]
    pub fn matcher(&self) -> Matcher {
        Matcher::CapturesInto(self.clone())
    }

    /// Snapshot of all values captured so far
    #[must_use]
    pub fn values(&self) -> Vec<ArgValue> {
        self.values.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Most recently captured value, if any
    #[must_use]
    pub fn last(&self) -> Option<ArgValue> {
        self.values
            .lock()
            .ok()
            .and_then(|v| v.last().cloned())
    }

    /// Number of captured values
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.lock().map(|v| v.len()).unwrap_or(0)
    }

    /// Whether nothing has been captured yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&self, value: &ArgValue) {
        if let Ok(mut sink) = self.values.lock() {
            sink.push(value.clone());
        }
    }
}

// =============================================================================
// MATCHER
// =============================================================================

/// Predicate over a single argument value
#[derive(Clone)]
pub enum Matcher {
    /// Match any value, including null
    Any,
    /// Match by structural value equality
    Equals(ArgValue),
    /// Match only the null value
    IsNull,
    /// Match values accepted by a custom predicate
    Satisfies {
        /// The predicate
        predicate: ValuePredicate,
        /// Description used in expectation text
        description: String,
    },
    /// Match any value and record it into the sink as a side effect
    CapturesInto(Captured),
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "Any"),
            Self::Equals(v) => write!(f, "Equals({v})"),
            Self::IsNull => write!(f, "IsNull"),
            Self::Satisfies { description, .. } => write!(f, "Satisfies({description})"),
            Self::CapturesInto(sink) => write!(f, "CapturesInto({sink:?})"),
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Equals(v) => write!(f, "== {v}"),
            Self::IsNull => write!(f, "null"),
            Self::Satisfies { description, .. } => write!(f, "satisfies({description})"),
            Self::CapturesInto(_) => write!(f, "capture"),
        }
    }
}

impl Matcher {
    /// Build an equality matcher from any JSON-convertible value
    #[must_use]
    pub fn equals(value: impl Into<ArgValue>) -> Self {
        Self::Equals(value.into())
    }

    /// Build a predicate matcher with a description for failure messages
    #[must_use]
    pub fn satisfies<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&ArgValue) -> bool + Send + Sync + 'static,
    {
        Self::Satisfies {
            predicate: Arc::new(predicate),
            description: description.into(),
        }
    }

    /// Check whether a value qualifies, without side effects.
    ///
    /// Capturing matchers accept everything here; recording happens in
    /// [`Matcher::observe`] only after the full argument list has matched,
    /// so a failed candidate scan never pollutes the sink.
    #[must_use]
    pub fn accepts(&self, value: &ArgValue) -> bool {
        match self {
            Self::Any | Self::CapturesInto(_) => true,
            Self::Equals(expected) => value == expected,
            Self::IsNull => value.is_null(),
            Self::Satisfies { predicate, .. } => predicate(value),
        }
    }

    /// Perform the capture side effect for an accepted value
    pub fn observe(&self, value: &ArgValue) {
        if let Self::CapturesInto(sink) = self {
            sink.record(value);
        }
    }
}

// =============================================================================
// MATCHER LIST
// =============================================================================

/// Ordered list of per-parameter matchers.
///
/// One variable-length list serves every arity; an interaction whose
/// argument count differs from the matcher count never matches.
#[derive(Debug, Clone, Default)]
pub struct MatcherList {
    matchers: Vec<Matcher>,
}

impl MatcherList {
    /// Create from an ordered matcher list
    #[must_use]
    pub fn new(matchers: Vec<Matcher>) -> Self {
        Self { matchers }
    }

    /// An empty list (matches zero-argument accesses only)
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A list of `arity` any-matchers
    #[must_use]
    pub fn any_of_arity(arity: usize) -> Self {
        Self {
            matchers: vec![Matcher::Any; arity],
        }
    }

    /// Number of parameter positions
    #[must_use]
    pub fn arity(&self) -> usize {
        self.matchers.len()
    }

    /// Check a full argument list without side effects. Fails closed on
    /// arity mismatch.
    #[must_use]
    pub fn accepts_all(&self, args: &[NamedArg]) -> bool {
        args.len() == self.matchers.len()
            && self
                .matchers
                .iter()
                .zip(args)
                .all(|(m, a)| m.accepts(&a.value))
    }

    /// Run the capture side effects for an accepted argument list
    pub fn observe_all(&self, args: &[NamedArg]) {
        for (m, a) in self.matchers.iter().zip(args) {
            m.observe(&a.value);
        }
    }

    /// Check a full argument list. Fails closed on arity mismatch.
    ///
    /// Capture side effects run only after every position has accepted.
    /// Callers that re-evaluate the same interaction (verification views)
    /// use [`MatcherList::accepts_all`] and observe separately, exactly
    /// once per interaction.
    #[must_use]
    pub fn matches_all(&self, args: &[NamedArg]) -> bool {
        let accepted = self.accepts_all(args);
        if accepted {
            self.observe_all(args);
        }
        accepted
    }

    /// Render the list for expectation text
    #[must_use]
    pub fn describe(&self) -> String {
        let parts: Vec<String> = self.matchers.iter().map(|m| m.to_string()).collect();
        format!("({})", parts.join(", "))
    }
}

impl From<Vec<Matcher>> for MatcherList {
    fn from(matchers: Vec<Matcher>) -> Self {
        Self::new(matchers)
    }
}
