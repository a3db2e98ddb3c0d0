//! Fuzzy matching of expected values against actual ones.
//!
//! Expected values may nest sequences and mappings and may contain
//! [`Pattern`]s or predicates anywhere a plain value could appear.
//!
//! ```
//! use rspec_support::{Value, fuzzy};
//!
//! let expected = Value::array([Value::Int(1), fuzzy::anything()]);
//! assert!(fuzzy::values_match(&expected, &Value::array([Value::Int(1), Value::from("x")])));
//! ```

use std::fmt;
use std::sync::Arc;

use error_set::error_set;

use crate::value::Value;

error_set! {
    /// Errors raised while evaluating a pattern or predicate
    MatchError := {
        #[display("wrong number of arguments (given {given}, expected {expected})")]
        ArityMismatch { given: usize, expected: usize },
        #[display("{message}")]
        Failed { message: String },
    }
}

/// An expected value that decides matches itself.
pub trait Pattern: fmt::Debug + Send + Sync {
    fn matches(&self, actual: &Value) -> Result<bool, MatchError>;

    fn description(&self) -> String;

    /// A consumer used when this pattern appears inside an expected
    /// sequence. `None` falls back to matching exactly one element.
    fn consumer(&self) -> Option<Box<dyn Consumer + '_>> {
        None
    }
}

/// Drains actual sequence elements on behalf of one expected element.
pub trait Consumer {
    fn can_consume_more(&self) -> bool;

    fn consume(&mut self, actual: &Value);

    /// Whether everything consumed so far satisfied the expectation.
    fn accepting(&self) -> bool;
}

/// Consumes exactly one element and accepts it if it fuzzy-matches.
#[derive(Debug)]
pub struct MatchExpectationConsumer<'a> {
    expected: &'a Value,
    can_consume_more: bool,
    accepting: bool,
}

impl<'a> MatchExpectationConsumer<'a> {
    pub fn new(expected: &'a Value) -> Self {
        Self {
            expected,
            can_consume_more: true,
            accepting: false,
        }
    }
}

impl Consumer for MatchExpectationConsumer<'_> {
    fn can_consume_more(&self) -> bool {
        self.can_consume_more
    }

    fn consume(&mut self, actual: &Value) {
        self.can_consume_more = false;
        self.accepting = values_match(self.expected, actual);
    }

    fn accepting(&self) -> bool {
        self.accepting
    }
}

/// Whether `actual` satisfies `expected`.
pub fn values_match(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Array(expected), Value::Array(actual)) => return arrays_match(expected, actual),
        (Value::Array(expected), Value::Hash(entries)) => {
            let pairs: Vec<Value> = entries
                .iter()
                .map(|(k, v)| Value::array([k.clone(), v.clone()]))
                .collect();
            return arrays_match(expected, &pairs);
        }
        (Value::Hash(_), Value::Hash(_)) => return hashes_match(expected, actual),
        _ => {}
    }
    if actual == expected {
        return true;
    }

    let outcome = match expected {
        Value::Matcher(pattern) => pattern.matches(actual),
        Value::Proc(callable) => callable.call(std::slice::from_ref(actual)),
        _ => Ok(false),
    };
    outcome.unwrap_or_else(|err| {
        tracing::debug!(expected = ?expected, actual = ?actual, %err, "predicate raised, treating as no match");
        false
    })
}

fn arrays_match(expected: &[Value], actual: &[Value]) -> bool {
    if expected.is_empty() {
        return actual.is_empty();
    }

    let mut consumers: Vec<Box<dyn Consumer + '_>> = expected.iter().map(consumer_for).collect();

    let mut remaining = actual.iter();
    let mut exhausted = false;
    'consumers: for consumer in consumers.iter_mut() {
        while consumer.can_consume_more() {
            match remaining.next() {
                Some(arg) => consumer.consume(arg),
                None => {
                    exhausted = true;
                    break 'consumers;
                }
            }
        }
    }

    let all_accepting = consumers.iter().all(|c| c.accepting());
    all_accepting && (exhausted || remaining.next().is_none())
}

fn consumer_for(value: &Value) -> Box<dyn Consumer + '_> {
    if let Value::Matcher(pattern) = value {
        if let Some(consumer) = pattern.consumer() {
            return consumer;
        }
    }
    Box::new(MatchExpectationConsumer::new(value))
}

fn hashes_match(expected: &Value, actual: &Value) -> bool {
    let (Value::Hash(expected_entries), Value::Hash(actual_entries)) = (expected, actual) else {
        return false;
    };
    if expected_entries.len() != actual_entries.len() {
        return false;
    }
    expected_entries.iter().all(|(key, expected_value)| {
        actual
            .fetch(key)
            .is_some_and(|actual_value| values_match(expected_value, actual_value))
    })
}

/// Matches any single value.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anything;

impl Pattern for Anything {
    fn matches(&self, _actual: &Value) -> Result<bool, MatchError> {
        Ok(true)
    }

    fn description(&self) -> String {
        "anything".to_string()
    }
}

/// Matches any number of elements, including none, when used in a sequence.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyArgs;

impl Pattern for AnyArgs {
    fn matches(&self, _actual: &Value) -> Result<bool, MatchError> {
        Ok(true)
    }

    fn description(&self) -> String {
        "*(any args)".to_string()
    }

    fn consumer(&self) -> Option<Box<dyn Consumer + '_>> {
        Some(Box::new(AnyArgsConsumer))
    }
}

struct AnyArgsConsumer;

impl Consumer for AnyArgsConsumer {
    fn can_consume_more(&self) -> bool {
        true
    }

    fn consume(&mut self, _actual: &Value) {}

    fn accepting(&self) -> bool {
        true
    }
}

type Predicate = dyn Fn(&Value) -> bool + Send + Sync;

/// Matches values accepted by a closure.
#[derive(Clone)]
pub struct Satisfy {
    description: String,
    predicate: Arc<Predicate>,
}

impl Satisfy {
    pub fn new<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }
}

impl fmt::Debug for Satisfy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Satisfy")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl Pattern for Satisfy {
    fn matches(&self, actual: &Value) -> Result<bool, MatchError> {
        Ok((self.predicate)(actual))
    }

    fn description(&self) -> String {
        format!("satisfying {}", self.description)
    }
}

pub fn anything() -> Value {
    Value::matcher(Anything)
}

pub fn any_args() -> Value {
    Value::matcher(AnyArgs)
}

pub fn satisfy<F>(description: impl Into<String>, predicate: F) -> Value
where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
{
    Value::matcher(Satisfy::new(description, predicate))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::value::Callable;

    fn ints(items: &[i64]) -> Value {
        Value::array(items.iter().map(|i| Value::Int(*i)))
    }

    fn sym_hash(entries: &[(&str, i64)]) -> Value {
        Value::hash(entries.iter().map(|(k, v)| (Value::sym(*k), Value::Int(*v))))
    }

    #[test]
    fn equal_scalars_match() {
        assert!(values_match(&Value::Int(1), &Value::Int(1)));
        assert!(values_match(&Value::Int(1), &Value::Float(1.0)));
        assert!(!values_match(&Value::from("a"), &Value::from("b")));
    }

    #[test]
    fn empty_expected_sequence_matches_only_empty() {
        assert!(values_match(&ints(&[]), &ints(&[])));
        assert!(!values_match(&ints(&[]), &ints(&[1])));
    }

    #[test]
    fn sequences_match_elementwise() {
        assert!(values_match(&ints(&[1, 2, 3]), &ints(&[1, 2, 3])));
        assert!(!values_match(&ints(&[1, 2, 3]), &ints(&[1, 2, 4])));
        assert!(!values_match(&ints(&[1, 2]), &ints(&[1, 2, 3])));
        assert!(!values_match(&ints(&[1, 2, 3]), &ints(&[1, 2])));
    }

    #[test]
    fn sequences_with_patterns() {
        let expected = Value::array([Value::Int(1), anything(), Value::Int(3)]);
        assert!(values_match(&expected, &ints(&[1, 99, 3])));
        assert!(!values_match(&expected, &ints(&[1, 99])));
    }

    #[test]
    fn any_args_consumes_the_rest() {
        let expected = Value::array([Value::Int(1), any_args()]);
        assert!(values_match(&expected, &ints(&[1])));
        assert!(values_match(&expected, &ints(&[1, 2, 3])));
        assert!(!values_match(&expected, &ints(&[2, 3])));
    }

    #[test]
    fn nested_structures() {
        let expected = Value::array([
            Value::hash([(Value::sym("a"), satisfy("even", |v| matches!(v, Value::Int(i) if i % 2 == 0)))]),
            ints(&[1, 2]),
        ]);
        let actual = Value::array([sym_hash(&[("a", 4)]), ints(&[1, 2])]);
        assert!(values_match(&expected, &actual));
        let odd = Value::array([sym_hash(&[("a", 3)]), ints(&[1, 2])]);
        assert!(!values_match(&expected, &odd));
    }

    #[test]
    fn mappings_require_same_size() {
        let both = sym_hash(&[("a", 1), ("b", 2)]);
        assert!(values_match(&both, &sym_hash(&[("b", 2), ("a", 1)])));
        assert!(!values_match(&sym_hash(&[("a", 1)]), &both));
        assert!(!values_match(&both, &sym_hash(&[("a", 1), ("b", 3)])));
    }

    #[test]
    fn mapping_size_mismatch_skips_value_checks() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let counting = satisfy("counted", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });
        let expected = Value::hash([(Value::sym("a"), counting)]);

        assert!(!values_match(&expected, &sym_hash(&[("a", 1), ("b", 2)])));
        assert!(!values_match(&expected, &sym_hash(&[])));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert!(values_match(&expected, &sym_hash(&[("a", 1)])));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn mapping_keys_compare_strictly() {
        let expected = Value::hash([(Value::Int(1), Value::from("x"))]);
        let actual = Value::hash([(Value::Float(1.0), Value::from("x"))]);
        assert!(!values_match(&expected, &actual));
    }

    #[test]
    fn mapping_is_iterable_as_pairs() {
        let expected = Value::array([Value::array([Value::sym("a"), anything()])]);
        assert!(values_match(&expected, &sym_hash(&[("a", 1)])));
    }

    #[test]
    fn record_is_not_treated_as_sequence() {
        let record = Value::record("Point", [("x".to_string(), Value::Int(1))]);
        assert!(!values_match(&ints(&[1]), &record));
    }

    #[test]
    fn predicate_is_called_with_actual() {
        let positive = Value::from(Callable::predicate(|v| matches!(v, Value::Int(i) if *i > 0)));
        assert!(values_match(&positive, &Value::Int(5)));
        assert!(!values_match(&positive, &Value::Int(-5)));
    }

    #[test]
    fn predicate_arity_error_is_no_match() {
        let nullary = Value::from(Callable::nullary(|| true));
        assert!(!values_match(&nullary, &Value::Int(1)));
    }

    #[test]
    fn pattern_matches_itself() {
        let pattern = satisfy("never", |_| false);
        assert!(values_match(&pattern, &pattern.clone()));
    }
}
