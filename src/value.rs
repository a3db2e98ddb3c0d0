//! Dynamic values compared, diffed and passed around by the test helpers.
//!
//! A [`Value`] models what a test framework hands to its matchers: scalars,
//! strings (plain UTF-8 or explicitly encoded bytes), symbols, ordered
//! sequences, key/value mappings, records, callables and pattern objects.
//!
//! # Examples
//!
//! ```
//! use rspec_support::Value;
//!
//! let value = Value::hash([(Value::sym("name"), Value::from("bob"))]);
//! assert_eq!(value.inspect(), r#"{:name=>"bob"}"#);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::encoding::EncodedString;
use crate::fuzzy::{MatchError, Pattern};

/// A dynamically typed value.
#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// UTF-8 text
    Str(String),
    /// Text stored as bytes in an explicit encoding
    Bytes(EncodedString),
    Symbol(String),
    Array(Vec<Value>),
    /// Insertion-ordered key/value pairs
    Hash(Vec<(Value, Value)>),
    /// A record with named fields; never treated as a sequence
    Struct(Record),
    Proc(Callable),
    Matcher(Arc<dyn Pattern>),
    /// An arbitrary object that only knows how to describe itself
    Object(Arc<dyn Inspect>),
}

/// Objects carried by [`Value::Object`].
pub trait Inspect: fmt::Debug + Send + Sync {
    fn inspect(&self) -> String;
}

/// A named record, rendered as `#<struct Name a=1, b=2>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub name: String,
    pub fields: Vec<(String, Value)>,
}

type Body = dyn Fn(&[Value]) -> bool + Send + Sync;

/// A callable used as a predicate.
///
/// Strict callables reject invocations whose argument count differs from
/// their arity, the way lambdas do.
#[derive(Clone)]
pub struct Callable {
    arity: usize,
    strict: bool,
    body: Arc<Body>,
}

impl Callable {
    /// A one-argument lambda.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self {
            arity: 1,
            strict: true,
            body: Arc::new(move |args| args.first().is_some_and(&f)),
        }
    }

    /// A zero-argument lambda. Invoking it with an argument fails.
    pub fn nullary<F>(f: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            arity: 0,
            strict: true,
            body: Arc::new(move |_| f()),
        }
    }

    /// A lenient proc that ignores surplus arguments.
    pub fn lenient<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> bool + Send + Sync + 'static,
    {
        Self {
            arity: 1,
            strict: false,
            body: Arc::new(f),
        }
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn call(&self, args: &[Value]) -> Result<bool, MatchError> {
        if self.strict && args.len() != self.arity {
            return Err(MatchError::ArityMismatch {
                given: args.len(),
                expected: self.arity,
            });
        }
        Ok((self.body)(args))
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("arity", &self.arity)
            .field("strict", &self.strict)
            .finish_non_exhaustive()
    }
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn sym(s: impl Into<String>) -> Self {
        Value::Symbol(s.into())
    }

    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(items.into_iter().collect())
    }

    pub fn hash(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        Value::Hash(entries.into_iter().collect())
    }

    pub fn record(name: impl Into<String>, fields: impl IntoIterator<Item = (String, Value)>) -> Self {
        Value::Struct(Record {
            name: name.into(),
            fields: fields.into_iter().collect(),
        })
    }

    pub fn matcher(pattern: impl Pattern + 'static) -> Self {
        Value::Matcher(Arc::new(pattern))
    }

    pub fn object(object: impl Inspect + 'static) -> Self {
        Value::Object(Arc::new(object))
    }

    /// Everything except `nil` and `false`.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::Str(_) | Value::Bytes(_))
    }

    pub fn is_proc(&self) -> bool {
        matches!(self, Value::Proc(_))
    }

    pub fn is_matcher(&self) -> bool {
        matches!(self, Value::Matcher(_))
    }

    /// Look up a key using strict (`eql`) key equality.
    pub fn fetch(&self, key: &Value) -> Option<&Value> {
        match self {
            Value::Hash(entries) => entries.iter().find(|(k, _)| k.eql(key)).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Recursively flatten nested arrays into their leaves.
    pub fn leaves(&self) -> Vec<&Value> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Value>) {
        match self {
            Value::Array(items) => items.iter().for_each(|item| item.collect_leaves(out)),
            other => out.push(other),
        }
    }

    /// Strict equality used for mapping keys: no numeric coercion.
    pub fn eql(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => false,
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.eql(y))
            }
            _ => self == other,
        }
    }

    /// The string form used for sorting keys and joining entries.
    pub fn to_s(&self) -> String {
        match self {
            Value::Nil => String::new(),
            Value::Str(s) => s.clone(),
            Value::Bytes(b) => b.to_string_lossy("?"),
            Value::Symbol(s) => s.clone(),
            _ => self.inspect(),
        }
    }

    /// A developer-facing rendering: strings quoted and escaped, symbols
    /// prefixed with `:`, mappings as `{key=>value}`.
    pub fn inspect(&self) -> String {
        match self {
            Value::Nil => "nil".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => inspect_float(*f),
            Value::Str(s) => inspect_str(s),
            Value::Bytes(b) => inspect_str(&b.to_string_lossy("?")),
            Value::Symbol(s) => inspect_symbol(s),
            Value::Array(items) => {
                let inner: Vec<String> = items.iter().map(Value::inspect).collect();
                format!("[{}]", inner.join(", "))
            }
            Value::Hash(entries) => {
                let inner: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}=>{}", k.inspect(), v.inspect()))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
            Value::Struct(record) => {
                if record.fields.is_empty() {
                    return format!("#<struct {}>", record.name);
                }
                let inner: Vec<String> = record
                    .fields
                    .iter()
                    .map(|(name, v)| format!("{}={}", name, v.inspect()))
                    .collect();
                format!("#<struct {} {}>", record.name, inner.join(", "))
            }
            Value::Proc(c) => format!("#<Proc (lambda)/{}>", c.arity),
            Value::Matcher(p) => p.description(),
            Value::Object(o) => o.inspect(),
        }
    }
}

/// Equality in the loose sense: `1 == 1.0`, mappings compare without regard
/// to insertion order, callables and patterns by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => (*a as f64) == *b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Str(a), Value::Bytes(b)) | (Value::Bytes(b), Value::Str(a)) => {
                b.encoding().is_ascii_compatible() && b.as_bytes() == a.as_bytes()
            }
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Hash(a), Value::Hash(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, v)| {
                        b.iter().any(|(other_k, other_v)| k.eql(other_k) && v == other_v)
                    })
            }
            (Value::Struct(a), Value::Struct(b)) => a == b,
            (Value::Proc(a), Value::Proc(b)) => Arc::ptr_eq(&a.body, &b.body),
            (Value::Matcher(a), Value::Matcher(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inspect())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_s())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<EncodedString> for Value {
    fn from(s: EncodedString) -> Self {
        Value::Bytes(s)
    }
}

impl From<Callable> for Value {
    fn from(c: Callable) -> Self {
        Value::Proc(c)
    }
}

fn inspect_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        let name = if f > 0.0 { "Infinity" } else { "-Infinity" };
        name.to_string()
    } else {
        format!("{f:?}")
    }
}

pub(crate) fn inspect_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\u{1b}' => out.push_str("\\e"),
            '\u{7}' => out.push_str("\\a"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\u{b}' => out.push_str("\\v"),
            '\u{7f}' => out.push_str("\\x7F"),
            '#' if matches!(chars.peek(), Some('{' | '$' | '@')) => out.push_str("\\#"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", u32::from(c))),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

const OPERATOR_SYMBOLS: &[&str] = &[
    "+", "-", "*", "/", "%", "**", "==", "===", "!=", "<=>", "<", "<=", ">", ">=", "<<", ">>",
    "!", "~", "+@", "-@", "[]", "[]=", "=~", "!~", "&", "|", "^", "`",
];

fn inspect_symbol(s: &str) -> String {
    if OPERATOR_SYMBOLS.contains(&s) {
        return format!(":{s}");
    }
    let mut chars = s.chars();
    let plain = match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            let body = s.trim_end_matches(['?', '!', '=']);
            let suffix = &s[body.len()..];
            suffix.len() <= 1 && body.chars().all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if plain {
        format!(":{s}")
    } else {
        format!(":{}", inspect_str(s))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn inspect_scalars() {
        assert_eq!(Value::Nil.inspect(), "nil");
        assert_eq!(Value::Bool(true).inspect(), "true");
        assert_eq!(Value::Int(-3).inspect(), "-3");
        assert_eq!(Value::Float(1.0).inspect(), "1.0");
        assert_eq!(Value::Float(f64::INFINITY).inspect(), "Infinity");
    }

    #[test]
    fn inspect_strings_escape_specials() {
        assert_eq!(Value::from("a\nb").inspect(), r#""a\nb""#);
        assert_eq!(Value::from("say \"hi\"").inspect(), r#""say \"hi\"""#);
        assert_eq!(Value::from("#{x}").inspect(), r##""\#{x}""##);
        assert_eq!(Value::from("한글").inspect(), "\"한글\"");
    }

    #[test]
    fn inspect_symbols() {
        assert_eq!(Value::sym("foo").inspect(), ":foo");
        assert_eq!(Value::sym("empty?").inspect(), ":empty?");
        assert_eq!(Value::sym("two words").inspect(), r#":"two words""#);
        assert_eq!(Value::sym("+").inspect(), ":+");
        assert_eq!(Value::sym("[]=").inspect(), ":[]=");
        assert_eq!(Value::sym("<=>").inspect(), ":<=>");
        assert_eq!(Value::sym("+-").inspect(), r#":"+-""#);
    }

    #[test]
    fn inspect_collections() {
        let value = Value::array([
            Value::sym("foo"),
            Value::from("bar"),
            Value::hash([(Value::sym("a"), Value::Int(1))]),
        ]);
        assert_eq!(value.inspect(), r#"[:foo, "bar", {:a=>1}]"#);
    }

    #[test]
    fn inspect_record() {
        let point = Value::record(
            "Point",
            [("x".to_string(), Value::Int(1)), ("y".to_string(), Value::Int(2))],
        );
        assert_eq!(point.inspect(), "#<struct Point x=1, y=2>");
    }

    #[test]
    fn numeric_equality_crosses_int_and_float() {
        assert_eq!(Value::Int(1), Value::Float(1.0));
        assert!(!Value::Int(1).eql(&Value::Float(1.0)));
    }

    #[test]
    fn hash_equality_ignores_order() {
        let a = Value::hash([(Value::sym("a"), Value::Int(1)), (Value::sym("b"), Value::Int(2))]);
        let b = Value::hash([(Value::sym("b"), Value::Int(2)), (Value::sym("a"), Value::Int(1))]);
        assert_eq!(a, b);
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Int(0).is_truthy());
        assert!(Value::from("").is_truthy());
    }

    #[test]
    fn leaves_flatten_nested_arrays() {
        let value = Value::array([
            Value::from("a"),
            Value::array([Value::from("b"), Value::array([Value::Int(1)])]),
        ]);
        let leaves = value.leaves();
        assert_eq!(leaves.len(), 3);
        assert!(leaves[2].is_numeric());
    }

    #[test]
    fn strict_callable_rejects_wrong_arity() {
        let nullary = Callable::nullary(|| true);
        assert!(matches!(
            nullary.call(&[Value::Int(1)]),
            Err(MatchError::ArityMismatch { given: 1, expected: 0 })
        ));
        let lenient = Callable::lenient(|args| args.len() == 2);
        assert!(lenient.call(&[Value::Nil, Value::Nil]).unwrap());
    }
}
