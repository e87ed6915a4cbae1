//! Recorded interactions.

use crate::value::{ArgValue, NamedArg};
use serde::{Deserialize, Serialize};

/// Kind of member access an interaction records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionKind {
    /// Method invocation
    MethodCall,
    /// Property read
    PropertyGet,
    /// Property write
    PropertySet,
    /// Indexer read
    IndexerGet,
    /// Indexer write
    IndexerSet,
    /// Event handler attached
    EventSubscribe,
    /// Event handler detached
    EventUnsubscribe,
}

/// Member category a setup targets; each kind maps to exactly one target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberTarget {
    /// Plain method
    Method,
    /// Property (get and set)
    Property,
    /// Indexer (get and set, keyed)
    Indexer,
    /// Event (subscribe and unsubscribe)
    Event,
}

impl InteractionKind {
    /// Get the interaction kind name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MethodCall => "method-call",
            Self::PropertyGet => "property-get",
            Self::PropertySet => "property-set",
            Self::IndexerGet => "indexer-get",
            Self::IndexerSet => "indexer-set",
            Self::EventSubscribe => "event-subscribe",
            Self::EventUnsubscribe => "event-unsubscribe",
        }
    }

    /// Which member category this kind belongs to
    #[must_use]
    pub const fn target(&self) -> MemberTarget {
        match self {
            Self::MethodCall => MemberTarget::Method,
            Self::PropertyGet | Self::PropertySet => MemberTarget::Property,
            Self::IndexerGet | Self::IndexerSet => MemberTarget::Indexer,
            Self::EventSubscribe | Self::EventUnsubscribe => MemberTarget::Event,
        }
    }

    /// Whether this access produces a value from the setup sequence
    #[must_use]
    pub const fn is_get_style(&self) -> bool {
        matches!(
            self,
            Self::MethodCall | Self::PropertyGet | Self::IndexerGet
        )
    }

    /// Whether this access carries an assigned/attached value
    #[must_use]
    pub const fn is_set_style(&self) -> bool {
        matches!(
            self,
            Self::PropertySet | Self::IndexerSet | Self::EventSubscribe | Self::EventUnsubscribe
        )
    }
}

impl std::fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One recorded occurrence of a member access on a mocked subject.
///
/// Immutable once appended to the ledger; the verified marker lives in the
/// ledger alongside the entry, not in the record itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    /// Strictly increasing index assigned at append time
    pub index: u64,
    /// Kind of access
    pub kind: InteractionKind,
    /// Qualified member name
    pub member_name: String,
    /// Ordered named arguments (method args or indexer keys)
    pub arguments: Vec<NamedArg>,
    /// Assigned value for setters, handler identity for events
    pub result_value: Option<ArgValue>,
}
