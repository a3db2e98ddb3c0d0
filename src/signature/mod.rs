//! Declared parameter shapes of callables and the checks run against them.
//!
//! A [`MethodSignature`] is derived once from a parameter list and answers
//! questions about positional arity and keyword arguments. The
//! [`SignatureVerifier`] combines a signature with a concrete argument list
//! (or a [`MethodSignatureExpectation`]) and reports whether they fit.
//!
//! # Examples
//!
//! ```
//! use rspec_support::{MethodSignature, SignatureVerifier, Value};
//!
//! let signature = MethodSignature::parse("x, y: 1, z:").unwrap();
//! assert_eq!(
//!     signature.description(),
//!     "arity of 1 and optional keyword args (:y) and required keyword args (:z)"
//! );
//!
//! let args = [Value::Int(1), Value::hash([(Value::sym("y"), Value::Int(2))])];
//! let verifier = SignatureVerifier::strict(&signature, &args);
//! assert_eq!(
//!     verifier.error_message().as_deref(),
//!     Some("Missing required keyword arguments: z")
//! );
//! ```

pub mod parse;
pub mod verifier;

use std::fmt;
use std::str::FromStr;

use crate::value::Value;
pub use parse::SignatureParseError;
pub use verifier::{MethodSignatureExpectation, SignatureVerifier, VerifierPolicy};

/// One entry of a declared parameter list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parameter {
    Required(String),
    Optional(String),
    /// `*rest`, possibly anonymous
    Rest(Option<String>),
    KeyRequired(String),
    Key(String),
    /// `**opts`, possibly anonymous
    KeyRest(Option<String>),
    Block(Option<String>),
}

impl Parameter {
    pub fn name(&self) -> Option<&str> {
        match self {
            Parameter::Required(name)
            | Parameter::Optional(name)
            | Parameter::KeyRequired(name)
            | Parameter::Key(name) => Some(name),
            Parameter::Rest(name) | Parameter::KeyRest(name) | Parameter::Block(name) => name.as_deref(),
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name().unwrap_or_default();
        match self {
            Parameter::Required(_) => write!(f, "{name}"),
            Parameter::Optional(_) => write!(f, "{name} = ..."),
            Parameter::Rest(_) => write!(f, "*{name}"),
            Parameter::KeyRequired(_) => write!(f, "{name}:"),
            Parameter::Key(_) => write!(f, "{name}: ..."),
            Parameter::KeyRest(_) => write!(f, "**{name}"),
            Parameter::Block(_) => write!(f, "&{name}"),
        }
    }
}

/// Positional argument count bounds; `max` is `None` when unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    pub max: Option<usize>,
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        self.min <= count && self.max.is_none_or(|max| count <= max)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{}", self.min),
            Some(max) => write!(f, "{} to {}", self.min, max),
            None => write!(f, "{} or more", self.min),
        }
    }
}

/// The argument shape a callable accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    min_non_kw_args: usize,
    max_non_kw_args: Option<usize>,
    optional_kw_args: Vec<String>,
    required_kw_args: Vec<String>,
    allows_any_kw_args: bool,
}

impl MethodSignature {
    pub fn from_parameters(parameters: &[Parameter]) -> Self {
        let mut signature = Self {
            min_non_kw_args: 0,
            max_non_kw_args: Some(0),
            optional_kw_args: Vec::new(),
            required_kw_args: Vec::new(),
            allows_any_kw_args: false,
        };

        for parameter in parameters {
            match parameter {
                Parameter::Required(_) => {
                    signature.min_non_kw_args += 1;
                    signature.max_non_kw_args = signature.max_non_kw_args.map(|max| max + 1);
                }
                Parameter::Optional(_) => {
                    signature.max_non_kw_args = signature.max_non_kw_args.map(|max| max + 1);
                }
                Parameter::Rest(_) => signature.max_non_kw_args = None,
                Parameter::KeyRequired(name) => signature.required_kw_args.push(name.clone()),
                Parameter::Key(name) => signature.optional_kw_args.push(name.clone()),
                Parameter::KeyRest(_) => signature.allows_any_kw_args = true,
                Parameter::Block(_) => {}
            }
        }

        signature
    }

    /// A signature for a block, whose callers may always omit arguments
    /// up to the declared count.
    pub fn block(parameters: &[Parameter]) -> Self {
        let mut signature = Self::from_parameters(parameters);
        if let Some(max) = signature.max_non_kw_args {
            signature.min_non_kw_args = max;
        }
        signature
    }

    /// Parse a parameter list such as `x, y = 1, *rest, a:, b: 2, **opts, &blk`.
    pub fn parse(parameters: &str) -> Result<Self, SignatureParseError> {
        Ok(Self::from_parameters(&parse::parse_parameters(parameters)?))
    }

    pub fn arity(&self) -> Arity {
        Arity {
            min: self.min_non_kw_args,
            max: self.max_non_kw_args,
        }
    }

    pub fn min_non_kw_args(&self) -> usize {
        self.min_non_kw_args
    }

    pub fn max_non_kw_args(&self) -> Option<usize> {
        self.max_non_kw_args
    }

    pub fn optional_kw_args(&self) -> &[String] {
        &self.optional_kw_args
    }

    pub fn required_kw_args(&self) -> &[String] {
        &self.required_kw_args
    }

    pub fn allows_any_kw_args(&self) -> bool {
        self.allows_any_kw_args
    }

    pub fn unlimited_args(&self) -> bool {
        self.max_non_kw_args.is_none()
    }

    fn has_keywords(&self) -> bool {
        self.allows_any_kw_args || !self.optional_kw_args.is_empty() || !self.required_kw_args.is_empty()
    }

    pub fn description(&self) -> String {
        let mut parts = Vec::new();

        let arity = self.arity().to_string();
        if arity != "0" {
            parts.push(format!("arity of {arity}"));
        }
        if !self.optional_kw_args.is_empty() {
            parts.push(format!("optional keyword args ({})", symbol_list(&self.optional_kw_args)));
        }
        if !self.required_kw_args.is_empty() {
            parts.push(format!("required keyword args ({})", symbol_list(&self.required_kw_args)));
        }
        if self.allows_any_kw_args {
            parts.push("any additional keyword args".to_string());
        }

        parts.join(" and ")
    }

    /// Whether more arguments than the positional minimum were given to a
    /// signature that takes keywords.
    pub fn could_contain_kw_args(&self, args: &[Value]) -> bool {
        args.len() > self.min_non_kw_args && self.has_keywords()
    }

    /// Whether the trailing argument should be read as keyword arguments.
    pub fn has_kw_args_in(&self, args: &[Value]) -> bool {
        let Some(Value::Hash(entries)) = args.last() else {
            return false;
        };
        self.could_contain_kw_args(args)
            && (entries.is_empty() || entries.iter().any(|(key, _)| matches!(key, Value::Symbol(_))))
    }

    pub fn missing_kw_args_from(&self, given: &[String]) -> Vec<String> {
        self.required_kw_args
            .iter()
            .filter(|name| !given.contains(name))
            .cloned()
            .collect()
    }

    pub fn invalid_kw_args_from(&self, given: &[String]) -> Vec<String> {
        if self.allows_any_kw_args {
            return Vec::new();
        }
        given
            .iter()
            .filter(|name| !self.optional_kw_args.contains(name) && !self.required_kw_args.contains(name))
            .cloned()
            .collect()
    }

    /// Whether a positional count (up to `max_count`, defaulting to `count`)
    /// fits. No count means nothing to check.
    pub fn valid_non_kw_args(&self, count: Option<usize>, max_count: Option<usize>) -> bool {
        let Some(count) = count else {
            return true;
        };
        let max_count = max_count.unwrap_or(count);
        self.min_non_kw_args <= count && self.max_non_kw_args.is_none_or(|max| max_count <= max)
    }
}

impl FromStr for MethodSignature {
    type Err = SignatureParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

fn symbol_list(names: &[String]) -> String {
    names
        .iter()
        .map(|name| Value::sym(name.as_str()).inspect())
        .collect::<Vec<_>>()
        .join(", ")
}
