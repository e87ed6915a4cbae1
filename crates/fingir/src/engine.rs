//! Mock engine: the in-process call contract.
//!
//! The generated adapter layer turns a typed call into a member name plus an
//! ordered argument list and hands it to the engine. The engine appends an
//! interaction to its ledger, resolves a setup, runs the sequencer/chains,
//! and returns an invocation result the adapter maps back to a typed value.
//! Each engine owns its own ledger and registry; nothing is shared across
//! mock instances.

use crate::interaction::{Interaction, InteractionKind, MemberTarget};
use crate::ledger::InteractionLedger;
use crate::matcher::{Matcher, MatcherList};
use crate::result::{FingirError, FingirResult};
use crate::sequencer::{ActivationPredicate, ChainLink, Repeat, SequenceOutcome, ValueUnit};
use crate::setup::{Accessibility, Setup, SetupRegistry};
use crate::value::{positional_args, render_args, ArgValue, NamedArg};
use crate::verify::{InteractionPredicate, OrderedVerification, VerificationResult};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

// =============================================================================
// OPTIONS
// =============================================================================

/// Base-class delegation mode for unmatched accesses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BaseCallMode {
    /// Unmatched accesses fall back to the base implementation
    UseBaseClassAsDefault,
    /// Never call the base; unmatched accesses yield a type default
    #[default]
    DoNotCallBase,
    /// Call the base on every access, matched or not
    AlwaysCallBase,
}

/// Configuration surface for a mock engine
#[derive(Debug, Clone, Default)]
pub struct MockOptions {
    /// Escalate unmatched accesses as errors instead of returning defaults
    pub throw_when_not_setup: bool,
    /// Base-class delegation mode
    pub base_call_mode: BaseCallMode,
}

impl MockOptions {
    /// Create default options (silent defaults, no base calls)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Escalate unmatched accesses as [`FingirError::NotSetup`]
    #[must_use]
    pub const fn throwing_when_not_setup(mut self) -> Self {
        self.throw_when_not_setup = true;
        self
    }

    /// Set the base-class delegation mode
    #[must_use]
    pub const fn with_base_call_mode(mut self, mode: BaseCallMode) -> Self {
        self.base_call_mode = mode;
        self
    }
}

// =============================================================================
// INVOCATION RESULT
// =============================================================================

/// What the engine produced for one recorded access
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A setup's sequencer produced this value
    Produced(ArgValue),
    /// A setup matched a set-style access; there is no value to produce
    Handled,
    /// No setup governed the access; the adapter uses a type default
    Unmatched,
}

/// Typed result wrapper returned to the adapter for each access
#[derive(Debug, Clone)]
pub struct InvocationResult {
    index: u64,
    outcome: Outcome,
    call_base: bool,
    out_values: Vec<(usize, ArgValue)>,
}

impl InvocationResult {
    /// Ledger index assigned to the recorded interaction
    #[must_use]
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Value produced by the setup sequence, if any
    #[must_use]
    pub fn value(&self) -> Option<&ArgValue> {
        match &self.outcome {
            Outcome::Produced(value) => Some(value),
            Outcome::Handled | Outcome::Unmatched => None,
        }
    }

    /// Whether no setup governed the access
    #[must_use]
    pub fn is_unmatched(&self) -> bool {
        self.outcome == Outcome::Unmatched
    }

    /// Whether the adapter should delegate to the base implementation
    #[must_use]
    pub fn should_call_base(&self) -> bool {
        self.call_base
    }

    /// Configured ref/out-style value for a parameter position
    #[must_use]
    pub fn out_value(&self, position: usize) -> Option<&ArgValue> {
        self.out_values
            .iter()
            .find(|(pos, _)| *pos == position)
            .map(|(_, value)| value)
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// Runtime engine backing one mocked subject.
///
/// Cheap to clone; clones share the same ledger and registry.
#[derive(Debug, Clone)]
pub struct MockEngine {
    id: Uuid,
    ledger: InteractionLedger,
    registry: Arc<SetupRegistry>,
    options: MockOptions,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    /// Create an engine with default options
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(MockOptions::default())
    }

    /// Create an engine with explicit options
    #[must_use]
    pub fn with_options(options: MockOptions) -> Self {
        let id = Uuid::new_v4();
        debug!(mock = %id, "mock engine created");
        Self {
            id,
            ledger: InteractionLedger::new(),
            registry: Arc::new(SetupRegistry::new()),
            options,
        }
    }

    /// Unique identifier of this mock instance
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The engine's interaction ledger
    #[must_use]
    pub fn ledger(&self) -> &InteractionLedger {
        &self.ledger
    }

    /// The engine's setup registry
    #[must_use]
    pub fn registry(&self) -> &SetupRegistry {
        &self.registry
    }

    // -------------------------------------------------------------------------
    // Recording
    // -------------------------------------------------------------------------

    /// General recording entry point; the `record_*` wrappers cover the
    /// public scope.
    pub fn record_scoped(
        &self,
        kind: InteractionKind,
        scope: Accessibility,
        member: &str,
        args: Vec<NamedArg>,
        assigned: Option<ArgValue>,
    ) -> FingirResult<InvocationResult> {
        let index = self
            .ledger
            .append(kind, member, args.clone(), assigned.clone());

        let setup = self
            .registry
            .resolve(kind, scope, member, &args, assigned.as_ref());

        let (outcome, out_values, matched) = match setup {
            Some(setup) => {
                if kind.is_get_style() {
                    match setup.consume_get(&args) {
                        SequenceOutcome::Value(value) => {
                            (Outcome::Produced(value), setup.out_values(), true)
                        }
                        SequenceOutcome::Raise(error) => return Err(error),
                        // Exhausted or rejected sequence: exactly like no
                        // setup matched
                        SequenceOutcome::Unmatched => {
                            (Outcome::Unmatched, Vec::new(), false)
                        }
                    }
                } else {
                    setup.consume_set(&args, assigned.as_ref());
                    (Outcome::Handled, setup.out_values(), true)
                }
            }
            None => (Outcome::Unmatched, Vec::new(), false),
        };

        if !matched && self.options.throw_when_not_setup {
            let arguments = render_args(&args);
            warn!(
                mock = %self.id,
                member,
                arguments = %arguments,
                "unmatched access escalated"
            );
            return Err(FingirError::NotSetup {
                member: member.to_string(),
                arguments,
            });
        }

        let call_base = match self.options.base_call_mode {
            BaseCallMode::AlwaysCallBase => true,
            BaseCallMode::UseBaseClassAsDefault => !matched,
            BaseCallMode::DoNotCallBase => false,
        };

        Ok(InvocationResult {
            index,
            outcome,
            call_base,
            out_values,
        })
    }

    /// Record a method call with positionally named arguments
    pub fn record_method_call(
        &self,
        member: &str,
        args: Vec<ArgValue>,
    ) -> FingirResult<InvocationResult> {
        self.record_scoped(
            InteractionKind::MethodCall,
            Accessibility::Public,
            member,
            positional_args(args),
            None,
        )
    }

    /// Record a property read
    pub fn record_property_get(&self, member: &str) -> FingirResult<InvocationResult> {
        self.record_scoped(
            InteractionKind::PropertyGet,
            Accessibility::Public,
            member,
            Vec::new(),
            None,
        )
    }

    /// Record a property write
    pub fn record_property_set(
        &self,
        member: &str,
        value: ArgValue,
    ) -> FingirResult<InvocationResult> {
        self.record_scoped(
            InteractionKind::PropertySet,
            Accessibility::Public,
            member,
            Vec::new(),
            Some(value),
        )
    }

    /// Record an indexer read, keyed by the ordered key arguments
    pub fn record_indexer_get(
        &self,
        member: &str,
        keys: Vec<ArgValue>,
    ) -> FingirResult<InvocationResult> {
        self.record_scoped(
            InteractionKind::IndexerGet,
            Accessibility::Public,
            member,
            positional_args(keys),
            None,
        )
    }

    /// Record an indexer write
    pub fn record_indexer_set(
        &self,
        member: &str,
        keys: Vec<ArgValue>,
        value: ArgValue,
    ) -> FingirResult<InvocationResult> {
        self.record_scoped(
            InteractionKind::IndexerSet,
            Accessibility::Public,
            member,
            positional_args(keys),
            Some(value),
        )
    }

    /// Record an event subscription; the handler identity is the recorded
    /// value
    pub fn record_event_subscribe(
        &self,
        member: &str,
        handler_identity: ArgValue,
    ) -> FingirResult<InvocationResult> {
        self.record_scoped(
            InteractionKind::EventSubscribe,
            Accessibility::Public,
            member,
            Vec::new(),
            Some(handler_identity),
        )
    }

    /// Record an event unsubscription
    pub fn record_event_unsubscribe(
        &self,
        member: &str,
        handler_identity: ArgValue,
    ) -> FingirResult<InvocationResult> {
        self.record_scoped(
            InteractionKind::EventUnsubscribe,
            Accessibility::Public,
            member,
            Vec::new(),
            Some(handler_identity),
        )
    }

    // -------------------------------------------------------------------------
    // Setup registration
    // -------------------------------------------------------------------------

    fn register(&self, setup: Setup) -> SetupHandle {
        let setup = self.registry.register(setup);
        SetupHandle {
            setup,
            last: LastAdded::None,
        }
    }

    /// Register a method setup
    pub fn setup_method(&self, member: &str, matchers: Vec<Matcher>) -> SetupHandle {
        self.register(Setup::new(
            member,
            MemberTarget::Method,
            MatcherList::new(matchers),
        ))
    }

    /// Register a property setup (governs both get and set)
    pub fn setup_property(&self, member: &str) -> SetupHandle {
        self.register(Setup::new(
            member,
            MemberTarget::Property,
            MatcherList::empty(),
        ))
    }

    /// Register a property setup filtered by the assigned value
    pub fn setup_property_set(&self, member: &str, value_matcher: Matcher) -> SetupHandle {
        self.register(
            Setup::new(member, MemberTarget::Property, MatcherList::empty())
                .with_value_matcher(value_matcher),
        )
    }

    /// Register an indexer setup keyed by the ordered key matchers
    pub fn setup_indexer(&self, member: &str, key_matchers: Vec<Matcher>) -> SetupHandle {
        self.register(Setup::new(
            member,
            MemberTarget::Indexer,
            MatcherList::new(key_matchers),
        ))
    }

    /// Register an indexer setup filtered by keys and assigned value
    pub fn setup_indexer_set(
        &self,
        member: &str,
        key_matchers: Vec<Matcher>,
        value_matcher: Matcher,
    ) -> SetupHandle {
        self.register(
            Setup::new(member, MemberTarget::Indexer, MatcherList::new(key_matchers))
                .with_value_matcher(value_matcher),
        )
    }

    /// Register an event setup
    pub fn setup_event(&self, member: &str) -> SetupHandle {
        self.register(Setup::new(
            member,
            MemberTarget::Event,
            MatcherList::empty(),
        ))
    }

    /// Adapter-facing bulk registration: member, matchers, and a pre-built
    /// value sequence in one call
    pub fn register_setup(
        &self,
        member: &str,
        target: MemberTarget,
        matchers: MatcherList,
        units: Vec<ValueUnit>,
    ) -> FingirResult<SetupHandle> {
        let handle = self.register(Setup::new(member, target, matchers));
        handle.setup.install_sequence(units)?;
        Ok(handle)
    }

    // -------------------------------------------------------------------------
    // Verification
    // -------------------------------------------------------------------------

    /// Verification view for an arbitrary predicate
    #[must_use]
    pub fn verify(&self, predicate: InteractionPredicate) -> VerificationResult {
        VerificationResult::new(self.ledger.clone(), predicate)
    }

    /// Verify method calls on a member with matching arguments
    #[must_use]
    pub fn verify_method(&self, member: &str, matchers: Vec<Matcher>) -> VerificationResult {
        self.verify(
            InteractionPredicate::member(member)
                .with_kind(InteractionKind::MethodCall)
                .with_matchers(matchers),
        )
    }

    /// Verify property reads
    #[must_use]
    pub fn verify_property_get(&self, member: &str) -> VerificationResult {
        self.verify(
            InteractionPredicate::member(member).with_kind(InteractionKind::PropertyGet),
        )
    }

    /// Verify property writes with a matching assigned value
    #[must_use]
    pub fn verify_property_set(&self, member: &str, value: Matcher) -> VerificationResult {
        self.verify(
            InteractionPredicate::member(member)
                .with_kind(InteractionKind::PropertySet)
                .with_value(value),
        )
    }

    /// Verify indexer reads keyed by matching key arguments
    #[must_use]
    pub fn verify_indexer_get(
        &self,
        member: &str,
        key_matchers: Vec<Matcher>,
    ) -> VerificationResult {
        self.verify(
            InteractionPredicate::member(member)
                .with_kind(InteractionKind::IndexerGet)
                .with_matchers(key_matchers),
        )
    }

    /// Verify indexer writes, compared per key position
    #[must_use]
    pub fn verify_indexer_set(
        &self,
        member: &str,
        key_matchers: Vec<Matcher>,
        value: Matcher,
    ) -> VerificationResult {
        self.verify(
            InteractionPredicate::member(member)
                .with_kind(InteractionKind::IndexerSet)
                .with_matchers(key_matchers)
                .with_value(value),
        )
    }

    /// Verify event subscriptions
    #[must_use]
    pub fn verify_event_subscribe(&self, member: &str) -> VerificationResult {
        self.verify(
            InteractionPredicate::member(member).with_kind(InteractionKind::EventSubscribe),
        )
    }

    /// Verify event unsubscriptions
    #[must_use]
    pub fn verify_event_unsubscribe(&self, member: &str) -> VerificationResult {
        self.verify(
            InteractionPredicate::member(member).with_kind(InteractionKind::EventUnsubscribe),
        )
    }

    /// Ordered chain over the engine's ledger
    #[must_use]
    pub fn verify_in_order(&self, steps: Vec<InteractionPredicate>) -> OrderedVerification {
        OrderedVerification::new(self.ledger.clone(), steps)
    }

    /// Interactions never included in a successful verification
    #[must_use]
    pub fn unverified_interactions(&self) -> Vec<Interaction> {
        self.ledger.unverified()
    }

    /// Whether every recorded interaction has been verified
    #[must_use]
    pub fn all_interactions_verified(&self) -> bool {
        self.ledger.unverified().is_empty()
    }

    /// Snapshot of every recorded interaction
    #[must_use]
    pub fn interactions(&self) -> Vec<Interaction> {
        self.ledger.all()
    }

    /// Remove all setups, keeping recorded history
    pub fn clear_setups(&self) {
        self.registry.clear();
    }

    /// Reset the engine: drop history, marks, and setups
    pub fn reset(&self) {
        self.ledger.clear();
        self.registry.clear();
        debug!(mock = %self.id, "engine reset");
    }
}

// =============================================================================
// SETUP HANDLE (chaining DSL)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LastAdded {
    None,
    Unit,
    GetLink,
    SetLink,
}

/// Handle returned by setup registration; the test DSL chains further
/// configuration onto it.
///
/// Repeat modifiers (`for_times`, `only`, `forever`, `when`, `parallel`)
/// apply to the most recently added unit or chain link.
#[derive(Debug)]
pub struct SetupHandle {
    setup: Arc<Setup>,
    last: LastAdded,
}

impl SetupHandle {
    /// The underlying shared setup
    #[must_use]
    pub fn setup(&self) -> &Arc<Setup> {
        &self.setup
    }

    /// Append a fixed return value to the sequence
    #[must_use]
    pub fn returns(mut self, value: impl Into<ArgValue>) -> Self {
        self.setup.add_unit(ValueUnit::constant(value));
        self.last = LastAdded::Unit;
        self
    }

    /// Append a computed return value to the sequence
    #[must_use]
    pub fn returns_with<F>(mut self, factory: F) -> Self
    where
        F: Fn(&[NamedArg]) -> ArgValue + Send + Sync + 'static,
    {
        self.setup.add_unit(ValueUnit::factory(factory));
        self.last = LastAdded::Unit;
        self
    }

    /// Append a raising unit with a fixed message
    #[must_use]
    pub fn raises(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.setup
            .add_unit(ValueUnit::raising(move |_| FingirError::raised(message.clone())));
        self.last = LastAdded::Unit;
        self
    }

    /// Append a raising unit with a computed error
    #[must_use]
    pub fn raises_with<F>(mut self, factory: F) -> Self
    where
        F: Fn(&[NamedArg]) -> FingirError + Send + Sync + 'static,
    {
        self.setup.add_unit(ValueUnit::raising(factory));
        self.last = LastAdded::Unit;
        self
    }

    /// Initialize the property backing value. Fails on a second call.
    pub fn initial_value(self, value: impl Into<ArgValue>) -> FingirResult<Self> {
        self.setup.set_initial_value(value.into())?;
        Ok(self)
    }

    /// Configure a ref/out-style value for a parameter position
    #[must_use]
    pub fn sets_arg(self, position: usize, value: impl Into<ArgValue>) -> Self {
        self.setup.add_out_value(position, value.into());
        self
    }

    /// Append a side-effect callback fired on get-style accesses
    #[must_use]
    pub fn on_get<F>(mut self, action: F) -> Self
    where
        F: Fn(&[NamedArg]) + Send + Sync + 'static,
    {
        self.setup.add_get_link(ChainLink::new(action));
        self.last = LastAdded::GetLink;
        self
    }

    /// Append a get callback that only runs for the given argument count
    #[must_use]
    pub fn on_get_with_arity<F>(mut self, arity: usize, action: F) -> Self
    where
        F: Fn(&[NamedArg]) + Send + Sync + 'static,
    {
        self.setup
            .add_get_link(ChainLink::new(action).with_arity(arity));
        self.last = LastAdded::GetLink;
        self
    }

    /// Append a side-effect callback fired on set-style accesses
    #[must_use]
    pub fn on_set<F>(mut self, action: F) -> Self
    where
        F: Fn(&[NamedArg]) + Send + Sync + 'static,
    {
        self.setup.add_set_link(ChainLink::new(action));
        self.last = LastAdded::SetLink;
        self
    }

    /// Append a set callback that only runs for the given argument count
    #[must_use]
    pub fn on_set_with_arity<F>(mut self, arity: usize, action: F) -> Self
    where
        F: Fn(&[NamedArg]) + Send + Sync + 'static,
    {
        self.setup
            .add_set_link(ChainLink::new(action).with_arity(arity));
        self.last = LastAdded::SetLink;
        self
    }

    fn tune_repeat(self, repeat: Repeat) -> Self {
        match self.last {
            LastAdded::Unit => self.setup.update_last_unit(|u| u.set_repeat(repeat)),
            LastAdded::GetLink => self.setup.update_last_get_link(|l| l.set_repeat(repeat)),
            LastAdded::SetLink => self.setup.update_last_set_link(|l| l.set_repeat(repeat)),
            LastAdded::None => {}
        }
        self
    }

    /// Serve the last unit/link for n consecutive accesses ("for n")
    #[must_use]
    pub fn for_times(self, n: u32) -> Self {
        self.tune_repeat(Repeat::Times(n))
    }

    /// Cap the last unit/link at n lifetime serves ("only n")
    #[must_use]
    pub fn only(self, n: u32) -> Self {
        self.tune_repeat(Repeat::Capped(n))
    }

    /// Pin the sequencer on the last unit/link
    #[must_use]
    pub fn forever(self) -> Self {
        self.tune_repeat(Repeat::Forever)
    }

    /// Gate the last unit/link behind an activation predicate over
    /// (usage count, arguments)
    #[must_use]
    pub fn when<F>(self, predicate: F) -> Self
    where
        F: Fn(u64, &[NamedArg]) -> bool + Send + Sync + 'static,
    {
        let predicate: ActivationPredicate = Arc::new(predicate);
        match self.last {
            LastAdded::Unit => self.setup.update_last_unit(move |u| u.set_when(predicate)),
            LastAdded::GetLink => self
                .setup
                .update_last_get_link(move |l| l.set_when(predicate)),
            LastAdded::SetLink => self
                .setup
                .update_last_set_link(move |l| l.set_when(predicate)),
            LastAdded::None => {}
        }
        self
    }

    /// Run the last chain link on every access instead of in sequence.
    /// Has no effect on value units.
    #[must_use]
    pub fn parallel(self) -> Self {
        match self.last {
            LastAdded::GetLink => self.setup.update_last_get_link(ChainLink::set_parallel),
            LastAdded::SetLink => self.setup.update_last_set_link(ChainLink::set_parallel),
            LastAdded::Unit | LastAdded::None => {}
        }
        self
    }
}
