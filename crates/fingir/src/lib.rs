//! Fingir: Runtime Engine for Generated Test Doubles
//!
//! Fingir (Spanish: "to fake/feign") is the runtime half of a mocking
//! stack: a generated adapter layer reduces typed member accesses to
//! member names plus dynamic argument lists, and this crate records them,
//! resolves configured behaviors, sequences return values, and answers
//! verification queries, including blocking waits for interactions that
//! have not happened yet.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     FINGIR Architecture                          │
//! ├──────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────────┐         │
//! │   │ Generated  │    │ Mock       │    │ Setup Registry │         │
//! │   │ Adapter    │───►│ Engine     │───►│ (recency wins) │         │
//! │   │ (typed)    │    │            │    └───────┬────────┘         │
//! │   └────────────┘    └─────┬──────┘            │                  │
//! │                          ▼                   ▼                   │
//! │   ┌────────────┐    ┌────────────┐    ┌────────────────┐         │
//! │   │ Verify /   │◄───│ Interaction│    │ Value Sequencer│         │
//! │   │ Wait       │    │ Ledger     │    │ + Callbacks    │         │
//! │   └────────────┘    └────────────┘    └────────────────┘         │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use fingir::{Matcher, MockEngine};
//! use serde_json::json;
//!
//! let engine = MockEngine::new();
//! let _setup = engine
//!     .setup_method("ICalc.Add", vec![Matcher::equals(1), Matcher::Any])
//!     .returns(42)
//!     .forever();
//!
//! let result = engine
//!     .record_method_call("ICalc.Add", vec![json!(1), json!(7)])
//!     .unwrap();
//! assert_eq!(result.value(), Some(&json!(42)));
//!
//! assert!(engine
//!     .verify_method("ICalc.Add", vec![Matcher::equals(1), Matcher::Any])
//!     .occurred());
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

mod engine;
mod interaction;
mod ledger;
mod matcher;
mod result;
mod sequencer;
mod setup;
mod value;
mod verify;
mod wait;

// =============================================================================
// PUBLIC API RE-EXPORTS
// =============================================================================

pub use engine::{BaseCallMode, InvocationResult, MockEngine, MockOptions, Outcome, SetupHandle};
pub use interaction::{Interaction, InteractionKind, MemberTarget};
pub use ledger::InteractionLedger;
pub use matcher::{Captured, Matcher, MatcherList, ValuePredicate};
pub use result::{FingirError, FingirResult};
pub use sequencer::{
    ActivationPredicate, CallbackChain, ChainAction, ChainLink, ErrorFactory, Producer, Repeat,
    SequenceOutcome, ValueFactory, ValueSequence, ValueUnit,
};
pub use setup::{Accessibility, Setup, SetupRegistry};
pub use value::{positional_args, render_args, ArgValue, NamedArg};
pub use verify::{
    InteractionPredicate, OrderOutcome, OrderedVerification, VerificationResult,
};
pub use wait::{
    CancellationToken, WaitOptions, Waker, WakerGuard, DEFAULT_VERIFY_TIMEOUT_MS,
};
