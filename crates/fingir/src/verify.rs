//! Verification engine.
//!
//! Verification builds filtered views of the ledger. The engine only
//! returns booleans, snapshots, and expectation text; turning a false
//! result into a raised test failure belongs to the assertion layer
//! consuming it. Successful checks mark their matched interactions
//! verified, which is where "everything has been verified" bookkeeping
//! comes from.

use crate::interaction::{Interaction, InteractionKind};
use crate::ledger::InteractionLedger;
use crate::matcher::{Matcher, MatcherList};
use crate::result::FingirResult;
use crate::value::render_args;
use crate::wait::{CancellationToken, WaitOptions};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use tracing::debug;

// =============================================================================
// INTERACTION PREDICATE
// =============================================================================

/// Filter over recorded interactions
#[derive(Debug, Clone, Default)]
pub struct InteractionPredicate {
    member_name: Option<String>,
    kind: Option<InteractionKind>,
    matchers: Option<MatcherList>,
    value_matcher: Option<Matcher>,
}

impl InteractionPredicate {
    /// Match any interaction
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Match interactions on a member
    #[must_use]
    pub fn member(member_name: impl Into<String>) -> Self {
        Self {
            member_name: Some(member_name.into()),
            ..Self::default()
        }
    }

    /// Restrict to one interaction kind
    #[must_use]
    pub fn with_kind(mut self, kind: InteractionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Require the argument list to match (arity guard applies)
    #[must_use]
    pub fn with_matchers(mut self, matchers: impl Into<MatcherList>) -> Self {
        self.matchers = Some(matchers.into());
        self
    }

    /// Require the set/attached value to match
    #[must_use]
    pub fn with_value(mut self, matcher: Matcher) -> Self {
        self.value_matcher = Some(matcher);
        self
    }

    /// Whether an interaction qualifies. Free of side effects, so a view
    /// may re-evaluate the same interaction on every query.
    #[must_use]
    pub fn matches(&self, interaction: &Interaction) -> bool {
        if let Some(member) = &self.member_name {
            if interaction.member_name != *member {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if interaction.kind != kind {
                return false;
            }
        }
        if let Some(matchers) = &self.matchers {
            if !matchers.accepts_all(&interaction.arguments) {
                return false;
            }
        }
        if let Some(value_matcher) = &self.value_matcher {
            match &interaction.result_value {
                Some(value) if value_matcher.accepts(value) => {}
                _ => return false,
            }
        }
        true
    }

    /// Run the capture side effects for a matched interaction
    pub fn observe(&self, interaction: &Interaction) {
        if let Some(matchers) = &self.matchers {
            matchers.observe_all(&interaction.arguments);
        }
        if let (Some(value_matcher), Some(value)) =
            (&self.value_matcher, &interaction.result_value)
        {
            value_matcher.observe(value);
        }
    }

    /// Human-readable expectation text
    #[must_use]
    pub fn describe(&self) -> String {
        let member = self.member_name.as_deref().unwrap_or("<any member>");
        let kind = self
            .kind
            .map_or(String::new(), |k| format!(" [{k}]"));
        let args = self
            .matchers
            .as_ref()
            .map_or(String::new(), |m| m.describe());
        let value = self
            .value_matcher
            .as_ref()
            .map_or(String::new(), |m| format!(" = {m}"));
        format!("{member}{args}{kind}{value}")
    }
}

// =============================================================================
// VERIFICATION RESULT
// =============================================================================

/// A live view over the ledger for one predicate.
///
/// Matches are recomputed on every query, so a result created before the
/// interactions occurred still observes them.
#[derive(Debug, Clone)]
pub struct VerificationResult {
    ledger: InteractionLedger,
    predicate: InteractionPredicate,
    expectation: String,
    /// Ledger indices whose capture side effects have already run
    observed: Arc<Mutex<BTreeSet<u64>>>,
}

impl VerificationResult {
    /// Create a verification view over a ledger
    #[must_use]
    pub fn new(ledger: InteractionLedger, predicate: InteractionPredicate) -> Self {
        let expectation = predicate.describe();
        Self {
            ledger,
            predicate,
            expectation,
            observed: Arc::new(Mutex::new(BTreeSet::new())),
        }
    }

    /// Expectation text for failure messages
    #[must_use]
    pub fn expectation(&self) -> &str {
        &self.expectation
    }

    /// Current matching interactions, ascending by index.
    ///
    /// Matching itself is pure; capture side effects run exactly once per
    /// matched interaction no matter how often the view is queried.
    #[must_use]
    pub fn matching_interactions(&self) -> Vec<Interaction> {
        let matches: Vec<Interaction> = self
            .ledger
            .all()
            .into_iter()
            .filter(|i| self.predicate.matches(i))
            .collect();
        let mut observed = self
            .observed
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        for interaction in &matches {
            if observed.insert(interaction.index) {
                self.predicate.observe(interaction);
            }
        }
        matches
    }

    /// Number of matching interactions right now
    #[must_use]
    pub fn count(&self) -> usize {
        self.matching_interactions().len()
    }

    fn mark_matches_verified(&self, matches: &[Interaction]) {
        let indices: Vec<u64> = matches.iter().map(|i| i.index).collect();
        self.ledger.mark_verified(&indices);
    }

    /// At least one matching interaction occurred
    pub fn occurred(&self) -> bool {
        self.occurred_at_least(1)
    }

    /// Exactly `expected` matching interactions occurred
    pub fn occurred_times(&self, expected: usize) -> bool {
        let matches = self.matching_interactions();
        let passed = matches.len() == expected;
        if passed {
            self.mark_matches_verified(&matches);
        }
        debug!(
            expectation = %self.expectation,
            expected,
            actual = matches.len(),
            passed,
            "verify occurred_times"
        );
        passed
    }

    /// At least `minimum` matching interactions occurred
    pub fn occurred_at_least(&self, minimum: usize) -> bool {
        let matches = self.matching_interactions();
        let passed = matches.len() >= minimum;
        if passed {
            self.mark_matches_verified(&matches);
        }
        passed
    }

    /// At most `maximum` matching interactions occurred
    pub fn occurred_at_most(&self, maximum: usize) -> bool {
        let matches = self.matching_interactions();
        let passed = matches.len() <= maximum;
        if passed {
            self.mark_matches_verified(&matches);
        }
        passed
    }

    /// No matching interaction occurred
    #[must_use]
    pub fn never_occurred(&self) -> bool {
        self.matching_interactions().is_empty()
    }

    /// Failure message describing the expectation and the observed history
    #[must_use]
    pub fn failure_message(&self) -> String {
        let matches = self.matching_interactions();
        format!(
            "expected {}, observed {} matching interaction(s): {}",
            self.expectation,
            matches.len(),
            matches
                .iter()
                .map(|i| format!("#{} {}{}", i.index, i.member_name, render_args(&i.arguments)))
                .collect::<Vec<_>>()
                .join("; ")
        )
    }

    /// Block until at least one matching interaction exists.
    ///
    /// Evaluates immediately first; if nothing matches yet, suspends on the
    /// ledger's append notification and re-evaluates per append until the
    /// predicate holds, the timeout elapses, or the token is cancelled.
    /// Successful waits mark their matches verified.
    pub fn occurred_within(
        &self,
        options: &WaitOptions,
        cancel: Option<&CancellationToken>,
    ) -> FingirResult<()> {
        let predicate = self.predicate.clone();
        self.ledger.wait_for(
            move |entries| entries.iter().any(|i| predicate.matches(i)),
            options,
            cancel,
        )?;
        self.mark_matches_verified(&self.matching_interactions());
        Ok(())
    }

    /// Start an ordered chain: this step, then the next
    #[must_use]
    pub fn then(&self, next: InteractionPredicate) -> OrderedVerification {
        OrderedVerification {
            ledger: self.ledger.clone(),
            steps: vec![self.predicate.clone(), next],
        }
    }
}

// =============================================================================
// ORDERED VERIFICATION
// =============================================================================

/// Outcome of an ordered-chain check
#[derive(Debug, Clone, PartialEq)]
pub enum OrderOutcome {
    /// Every step matched at a strictly increasing index
    Satisfied {
        /// One matched index per step, in step order
        matched_indices: Vec<u64>,
    },
    /// The step only matched interactions before the required position
    TooEarly {
        /// Zero-based step position in the chain
        step: usize,
        /// Expectation text of the failing step
        expectation: String,
        /// Latest matching index, which is still too early
        index: u64,
        /// Smallest index the step would have needed
        min_required: u64,
    },
    /// The step matched nothing at all
    NotAtAll {
        /// Zero-based step position in the chain
        step: usize,
        /// Expectation text of the failing step
        expectation: String,
    },
}

impl OrderOutcome {
    /// Whether the chain held
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied { .. })
    }
}

/// A chain of predicates that must match at strictly increasing indices.
///
/// A minimum-index cursor threads through the steps: each step must match
/// an interaction with index strictly greater than the previous step's
/// matched index.
#[derive(Debug, Clone)]
pub struct OrderedVerification {
    ledger: InteractionLedger,
    steps: Vec<InteractionPredicate>,
}

impl OrderedVerification {
    /// Create a chain from ordered steps
    #[must_use]
    pub fn new(ledger: InteractionLedger, steps: Vec<InteractionPredicate>) -> Self {
        Self { ledger, steps }
    }

    /// Extend the chain with another step
    #[must_use]
    pub fn then(mut self, next: InteractionPredicate) -> Self {
        self.steps.push(next);
        self
    }

    /// Evaluate the chain against the current ledger.
    ///
    /// On success every matched interaction is marked verified.
    pub fn check(&self) -> OrderOutcome {
        let entries = self.ledger.all();
        let mut cursor: Option<u64> = None;
        let mut matched_indices = Vec::with_capacity(self.steps.len());

        for (step, predicate) in self.steps.iter().enumerate() {
            let matching: Vec<u64> = entries
                .iter()
                .filter(|i| predicate.matches(i))
                .map(|i| i.index)
                .collect();
            if matching.is_empty() {
                return OrderOutcome::NotAtAll {
                    step,
                    expectation: predicate.describe(),
                };
            }
            let min_required = cursor.map_or(0, |c| c + 1);
            match matching.iter().copied().find(|&i| i >= min_required) {
                Some(index) => {
                    matched_indices.push(index);
                    cursor = Some(index);
                }
                None => {
                    // Everything this step matched happened before the
                    // previous step's interaction
                    let index = matching.into_iter().max().unwrap_or(0);
                    return OrderOutcome::TooEarly {
                        step,
                        expectation: predicate.describe(),
                        index,
                        min_required,
                    };
                }
            }
        }

        self.ledger.mark_verified(&matched_indices);
        OrderOutcome::Satisfied { matched_indices }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::FingirError;
    use crate::value::positional_args;
    use serde_json::json;
    use std::thread;
    use std::time::Duration;

    fn call(ledger: &InteractionLedger, member: &str, args: Vec<serde_json::Value>) -> u64 {
        ledger.append(
            InteractionKind::MethodCall,
            member,
            positional_args(args),
            None,
        )
    }

    mod predicate_tests {
        use super::*;

        #[test]
        fn test_member_filter() {
            let interaction = Interaction {
                index: 0,
                kind: InteractionKind::MethodCall,
                member_name: "IFoo.Bar".into(),
                arguments: Vec::new(),
                result_value: None,
            };
            assert!(InteractionPredicate::member("IFoo.Bar").matches(&interaction));
            assert!(!InteractionPredicate::member("IFoo.Baz").matches(&interaction));
            assert!(InteractionPredicate::any().matches(&interaction));
        }

        #[test]
        fn test_kind_filter() {
            let interaction = Interaction {
                index: 0,
                kind: InteractionKind::PropertyGet,
                member_name: "IFoo.Size".into(),
                arguments: Vec::new(),
                result_value: None,
            };
            let get = InteractionPredicate::member("IFoo.Size")
                .with_kind(InteractionKind::PropertyGet);
            let set = InteractionPredicate::member("IFoo.Size")
                .with_kind(InteractionKind::PropertySet);
            assert!(get.matches(&interaction));
            assert!(!set.matches(&interaction));
        }

        #[test]
        fn test_matcher_arity_guard_applies() {
            let interaction = Interaction {
                index: 0,
                kind: InteractionKind::MethodCall,
                member_name: "IFoo.Bar".into(),
                arguments: positional_args(vec![json!(1), json!(2)]),
                result_value: None,
            };
            let one_arg = InteractionPredicate::member("IFoo.Bar")
                .with_matchers(vec![Matcher::Any]);
            let two_args = InteractionPredicate::member("IFoo.Bar")
                .with_matchers(vec![Matcher::Any, Matcher::Any]);
            assert!(!one_arg.matches(&interaction));
            assert!(two_args.matches(&interaction));
        }

        #[test]
        fn test_value_filter_on_sets() {
            let interaction = Interaction {
                index: 0,
                kind: InteractionKind::PropertySet,
                member_name: "IFoo.Size".into(),
                arguments: Vec::new(),
                result_value: Some(json!(10)),
            };
            let right = InteractionPredicate::member("IFoo.Size")
                .with_value(Matcher::equals(10));
            let wrong = InteractionPredicate::member("IFoo.Size")
                .with_value(Matcher::equals(11));
            assert!(right.matches(&interaction));
            assert!(!wrong.matches(&interaction));
        }

        #[test]
        fn test_describe() {
            let predicate = InteractionPredicate::member("IFoo.Bar")
                .with_kind(InteractionKind::MethodCall)
                .with_matchers(vec![Matcher::equals(1)]);
            let text = predicate.describe();
            assert!(text.contains("IFoo.Bar"));
            assert!(text.contains("== 1"));
            assert!(text.contains("method-call"));
        }
    }

    mod count_check_tests {
        use super::*;

        #[test]
        fn test_occurred_and_marking() {
            let ledger = InteractionLedger::new();
            let idx = call(&ledger, "IFoo.Bar", vec![]);
            call(&ledger, "IFoo.Baz", vec![]);

            let result =
                VerificationResult::new(ledger.clone(), InteractionPredicate::member("IFoo.Bar"));
            assert!(result.occurred());
            assert!(ledger.is_verified(idx));
            // The non-matching interaction stays unverified
            assert_eq!(ledger.unverified().len(), 1);
        }

        #[test]
        fn test_occurred_times() {
            let ledger = InteractionLedger::new();
            call(&ledger, "IFoo.Bar", vec![]);
            call(&ledger, "IFoo.Bar", vec![]);

            let result =
                VerificationResult::new(ledger.clone(), InteractionPredicate::member("IFoo.Bar"));
            assert!(!result.occurred_times(1));
            assert!(result.occurred_times(2));
            assert!(!result.occurred_times(3));
        }

        #[test]
        fn test_failed_check_marks_nothing() {
            let ledger = InteractionLedger::new();
            call(&ledger, "IFoo.Bar", vec![]);

            let result =
                VerificationResult::new(ledger.clone(), InteractionPredicate::member("IFoo.Bar"));
            assert!(!result.occurred_times(5));
            assert_eq!(ledger.unverified().len(), 1);
        }

        #[test]
        fn test_never_occurred() {
            let ledger = InteractionLedger::new();
            call(&ledger, "IFoo.Bar", vec![]);
            let absent =
                VerificationResult::new(ledger.clone(), InteractionPredicate::member("IFoo.Baz"));
            assert!(absent.never_occurred());
            let present =
                VerificationResult::new(ledger, InteractionPredicate::member("IFoo.Bar"));
            assert!(!present.never_occurred());
        }

        #[test]
        fn test_view_is_live() {
            let ledger = InteractionLedger::new();
            let result =
                VerificationResult::new(ledger.clone(), InteractionPredicate::member("IFoo.Bar"));
            assert_eq!(result.count(), 0);
            call(&ledger, "IFoo.Bar", vec![]);
            assert_eq!(result.count(), 1);
        }

        #[test]
        fn test_argument_filtered_count() {
            let ledger = InteractionLedger::new();
            call(&ledger, "IFoo.Bar", vec![json!(1)]);
            call(&ledger, "IFoo.Bar", vec![json!(2)]);
            call(&ledger, "IFoo.Bar", vec![json!(1)]);

            let result = VerificationResult::new(
                ledger,
                InteractionPredicate::member("IFoo.Bar")
                    .with_matchers(vec![Matcher::equals(1)]),
            );
            assert_eq!(result.count(), 2);
        }

        #[test]
        fn test_failure_message_lists_observations() {
            let ledger = InteractionLedger::new();
            call(&ledger, "IFoo.Bar", vec![json!(7)]);
            let result =
                VerificationResult::new(ledger, InteractionPredicate::member("IFoo.Bar"));
            let message = result.failure_message();
            assert!(message.contains("IFoo.Bar"));
            assert!(message.contains("#0"));
            assert!(message.contains("7"));
        }
    }

    mod capture_tests {
        use super::*;
        use crate::matcher::Captured;

        #[test]
        fn test_repeated_checks_capture_once_per_interaction() {
            let ledger = InteractionLedger::new();
            call(&ledger, "ICalc.Add", vec![json!(7)]);

            let sink = Captured::new();
            let result = VerificationResult::new(
                ledger,
                InteractionPredicate::member("ICalc.Add")
                    .with_matchers(vec![sink.matcher()]),
            );
            assert!(result.occurred());
            assert!(result.occurred());
            assert_eq!(result.count(), 1);
            assert_eq!(sink.values(), vec![json!(7)]);
        }

        #[test]
        fn test_new_interactions_still_captured() {
            let ledger = InteractionLedger::new();
            call(&ledger, "ICalc.Add", vec![json!(7)]);

            let sink = Captured::new();
            let result = VerificationResult::new(
                ledger.clone(),
                InteractionPredicate::member("ICalc.Add")
                    .with_matchers(vec![sink.matcher()]),
            );
            assert!(result.occurred());
            call(&ledger, "ICalc.Add", vec![json!(8)]);
            assert!(result.occurred_times(2));
            assert_eq!(sink.values(), vec![json!(7), json!(8)]);
        }

        #[test]
        fn test_occurred_within_captures_once() {
            let ledger = InteractionLedger::new();
            call(&ledger, "ICalc.Add", vec![json!(9)]);

            let sink = Captured::new();
            let result = VerificationResult::new(
                ledger,
                InteractionPredicate::member("ICalc.Add")
                    .with_matchers(vec![sink.matcher()]),
            );
            let options = WaitOptions::new().with_timeout(100);
            assert!(result.occurred_within(&options, None).is_ok());
            assert_eq!(sink.values(), vec![json!(9)]);
        }

        #[test]
        fn test_value_matcher_capture_not_duplicated() {
            let ledger = InteractionLedger::new();
            ledger.append(
                InteractionKind::PropertySet,
                "IStore.Capacity",
                Vec::new(),
                Some(json!(42)),
            );

            let sink = Captured::new();
            let result = VerificationResult::new(
                ledger,
                InteractionPredicate::member("IStore.Capacity")
                    .with_kind(InteractionKind::PropertySet)
                    .with_value(sink.matcher()),
            );
            assert!(result.occurred());
            assert!(result.occurred_times(1));
            assert_eq!(sink.values(), vec![json!(42)]);
        }
    }

    mod ordered_tests {
        use super::*;

        #[test]
        fn test_increasing_chain_satisfied() {
            let ledger = InteractionLedger::new();
            call(&ledger, "IFoo.First", vec![]);
            call(&ledger, "IFoo.Second", vec![]);
            call(&ledger, "IFoo.Third", vec![]);

            let outcome = OrderedVerification::new(
                ledger,
                vec![
                    InteractionPredicate::member("IFoo.First"),
                    InteractionPredicate::member("IFoo.Second"),
                    InteractionPredicate::member("IFoo.Third"),
                ],
            )
            .check();
            assert_eq!(
                outcome,
                OrderOutcome::Satisfied {
                    matched_indices: vec![0, 1, 2]
                }
            );
        }

        #[test]
        fn test_too_early_step_reported() {
            let ledger = InteractionLedger::new();
            call(&ledger, "IFoo.Second", vec![]); // index 0
            call(&ledger, "IFoo.First", vec![]); // index 1

            let outcome = OrderedVerification::new(
                ledger,
                vec![
                    InteractionPredicate::member("IFoo.First"),
                    InteractionPredicate::member("IFoo.Second"),
                ],
            )
            .check();
            match outcome {
                OrderOutcome::TooEarly {
                    step,
                    index,
                    min_required,
                    ..
                } => {
                    assert_eq!(step, 1);
                    assert_eq!(index, 0);
                    assert_eq!(min_required, 2);
                }
                other => panic!("expected TooEarly, got {other:?}"),
            }
        }

        #[test]
        fn test_missing_step_reported() {
            let ledger = InteractionLedger::new();
            call(&ledger, "IFoo.First", vec![]);

            let outcome = OrderedVerification::new(
                ledger,
                vec![
                    InteractionPredicate::member("IFoo.First"),
                    InteractionPredicate::member("IFoo.Second"),
                ],
            )
            .check();
            match outcome {
                OrderOutcome::NotAtAll { step, expectation } => {
                    assert_eq!(step, 1);
                    assert!(expectation.contains("IFoo.Second"));
                }
                other => panic!("expected NotAtAll, got {other:?}"),
            }
        }

        #[test]
        fn test_chain_picks_later_occurrence() {
            // First matches at 0 and 2; second at 1. The chain can still
            // fail only if no First precedes Second; here 0 < 1 works.
            let ledger = InteractionLedger::new();
            call(&ledger, "IFoo.First", vec![]); // 0
            call(&ledger, "IFoo.Second", vec![]); // 1
            call(&ledger, "IFoo.First", vec![]); // 2

            let outcome = OrderedVerification::new(
                ledger,
                vec![
                    InteractionPredicate::member("IFoo.First"),
                    InteractionPredicate::member("IFoo.Second"),
                ],
            )
            .check();
            assert_eq!(
                outcome,
                OrderOutcome::Satisfied {
                    matched_indices: vec![0, 1]
                }
            );
        }

        #[test]
        fn test_then_builder_from_result() {
            let ledger = InteractionLedger::new();
            call(&ledger, "IFoo.A", vec![]);
            call(&ledger, "IFoo.B", vec![]);
            call(&ledger, "IFoo.C", vec![]);

            let result =
                VerificationResult::new(ledger, InteractionPredicate::member("IFoo.A"));
            let outcome = result
                .then(InteractionPredicate::member("IFoo.B"))
                .then(InteractionPredicate::member("IFoo.C"))
                .check();
            assert!(outcome.is_satisfied());
        }

        #[test]
        fn test_satisfied_chain_marks_verified() {
            let ledger = InteractionLedger::new();
            call(&ledger, "IFoo.A", vec![]);
            call(&ledger, "IFoo.B", vec![]);

            let outcome = OrderedVerification::new(
                ledger.clone(),
                vec![
                    InteractionPredicate::member("IFoo.A"),
                    InteractionPredicate::member("IFoo.B"),
                ],
            )
            .check();
            assert!(outcome.is_satisfied());
            assert!(ledger.unverified().is_empty());
        }
    }

    mod async_tests {
        use super::*;

        #[test]
        fn test_immediate_success_no_wait() {
            let ledger = InteractionLedger::new();
            call(&ledger, "IFoo.Bar", vec![]);
            let result =
                VerificationResult::new(ledger, InteractionPredicate::member("IFoo.Bar"));
            let options = WaitOptions::new().with_timeout(10);
            assert!(result.occurred_within(&options, None).is_ok());
        }

        #[test]
        fn test_wakes_on_qualifying_append() {
            let ledger = InteractionLedger::new();
            let result = VerificationResult::new(
                ledger.clone(),
                InteractionPredicate::member("IFoo.Bar"),
            );

            let appender = ledger.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                call(&appender, "IFoo.Other", vec![]); // non-qualifying
                thread::sleep(Duration::from_millis(20));
                call(&appender, "IFoo.Bar", vec![]);
            });

            let options = WaitOptions::new().with_timeout(2_000);
            assert!(result.occurred_within(&options, None).is_ok());
            // The qualifying interaction got marked verified by the wait
            assert_eq!(ledger.unverified().len(), 1);
        }

        #[test]
        fn test_times_out_when_nothing_qualifies() {
            let ledger = InteractionLedger::new();
            call(&ledger, "IFoo.Other", vec![]);
            let result =
                VerificationResult::new(ledger, InteractionPredicate::member("IFoo.Bar"));
            let options = WaitOptions::new().with_timeout(50);
            match result.occurred_within(&options, None) {
                Err(FingirError::Timeout { ms }) => assert_eq!(ms, 50),
                other => panic!("expected Timeout, got {other:?}"),
            }
        }

        #[test]
        fn test_cancellation_surfaces_as_cancelled() {
            let ledger = InteractionLedger::new();
            let result =
                VerificationResult::new(ledger, InteractionPredicate::member("IFoo.Bar"));
            let token = CancellationToken::new();
            let canceller = token.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                canceller.cancel();
            });
            let options = WaitOptions::new().unbounded();
            assert!(matches!(
                result.occurred_within(&options, Some(&token)),
                Err(FingirError::Cancelled)
            ));
        }
    }
}
