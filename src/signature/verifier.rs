use crate::value::Value;

use super::MethodSignature;

/// An arity and keyword expectation checked in place of concrete arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodSignatureExpectation {
    pub min_count: Option<usize>,
    pub max_count: Option<usize>,
    pub keywords: Vec<String>,
    pub expect_unlimited_arguments: bool,
    pub expect_arbitrary_keywords: bool,
}

impl MethodSignatureExpectation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alias for `min_count`
    pub fn count(&self) -> Option<usize> {
        self.min_count
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.min_count = Some(count);
        self
    }

    pub fn with_max_count(mut self, max_count: usize) -> Self {
        self.max_count = Some(max_count);
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_unlimited_arguments(mut self) -> Self {
        self.expect_unlimited_arguments = true;
        self
    }

    pub fn with_arbitrary_keywords(mut self) -> Self {
        self.expect_arbitrary_keywords = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.min_count.is_none()
            && self.max_count.is_none()
            && self.keywords.is_empty()
            && !self.expect_unlimited_arguments
            && !self.expect_arbitrary_keywords
    }
}

/// How trailing arguments are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerifierPolicy {
    #[default]
    Strict,
    /// A trailing pattern object stands in for any keyword arguments
    Loose,
}

/// Checks call-site arguments against a [`MethodSignature`].
#[derive(Debug, Clone)]
pub struct SignatureVerifier<'a> {
    signature: &'a MethodSignature,
    policy: VerifierPolicy,
    skip_keyword_checks: bool,
    non_kw_args: Option<usize>,
    min_non_kw_args: Option<usize>,
    max_non_kw_args: Option<usize>,
    kw_args: Vec<String>,
    arbitrary_kw_args: bool,
    unlimited_args: bool,
}

impl<'a> SignatureVerifier<'a> {
    pub fn new(signature: &'a MethodSignature, args: &[Value], policy: VerifierPolicy) -> Self {
        let mut args = args.to_vec();
        let mut skip_keyword_checks = false;

        if policy == VerifierPolicy::Loose
            && args.last().is_some_and(Value::is_matcher)
            && signature.could_contain_kw_args(&args)
        {
            args.pop();
            skip_keyword_checks = true;
        }

        let kw_args = split_kw_args(signature, &mut args);
        let count = Some(args.len());
        tracing::trace!(
            positional = args.len(),
            keywords = kw_args.len(),
            ?policy,
            "split call arguments"
        );

        Self {
            signature,
            policy,
            skip_keyword_checks,
            non_kw_args: count,
            min_non_kw_args: count,
            max_non_kw_args: count,
            kw_args,
            arbitrary_kw_args: false,
            unlimited_args: false,
        }
    }

    pub fn strict(signature: &'a MethodSignature, args: &[Value]) -> Self {
        Self::new(signature, args, VerifierPolicy::Strict)
    }

    pub fn loose(signature: &'a MethodSignature, args: &[Value]) -> Self {
        Self::new(signature, args, VerifierPolicy::Loose)
    }

    pub fn policy(&self) -> VerifierPolicy {
        self.policy
    }

    /// Check an expectation instead of the arguments given at construction.
    pub fn with_expectation(mut self, expectation: &MethodSignatureExpectation) -> Self {
        if expectation.is_empty() {
            self.non_kw_args = None;
            self.min_non_kw_args = None;
            self.max_non_kw_args = None;
            self.kw_args = Vec::new();
            self.skip_keyword_checks = true;
        } else {
            self.non_kw_args = expectation.min_count;
            self.min_non_kw_args = expectation.min_count;
            self.max_non_kw_args = expectation.max_count.or(expectation.min_count);
            self.unlimited_args = expectation.expect_unlimited_arguments;
            self.kw_args = expectation.keywords.clone();
            self.arbitrary_kw_args = expectation.expect_arbitrary_keywords;
        }
        self
    }

    pub fn is_valid(&self) -> bool {
        self.valid_non_kw_args()
            && self.missing_kw_args().is_empty()
            && self.invalid_kw_args().is_empty()
            && self.arbitrary_kw_args_ok()
            && self.unlimited_args_ok()
    }

    /// The first failing check, or `None` when the arguments fit.
    pub fn error_message(&self) -> Option<String> {
        if !self.valid_non_kw_args() {
            return Some(format!(
                "Wrong number of arguments. Expected {}, got {}.",
                self.signature.arity(),
                self.non_kw_args.unwrap_or_default()
            ));
        }

        let missing = self.missing_kw_args();
        if !missing.is_empty() {
            return Some(format!("Missing required keyword arguments: {}", missing.join(", ")));
        }

        let invalid = self.invalid_kw_args();
        if !invalid.is_empty() {
            return Some(format!("Invalid keyword arguments provided: {}", invalid.join(", ")));
        }

        if !self.arbitrary_kw_args_ok() {
            return Some(format!(
                "Expected any additional keyword args to be accepted, but the signature has {}.",
                self.describe_signature()
            ));
        }

        if !self.unlimited_args_ok() {
            return Some(format!(
                "Expected an unlimited number of arguments to be accepted, but the signature has {}.",
                self.describe_signature()
            ));
        }

        None
    }

    fn describe_signature(&self) -> String {
        let description = self.signature.description();
        if description.is_empty() {
            "no arguments".to_string()
        } else {
            description
        }
    }

    fn valid_non_kw_args(&self) -> bool {
        self.signature
            .valid_non_kw_args(self.min_non_kw_args, self.max_non_kw_args)
    }

    fn missing_kw_args(&self) -> Vec<String> {
        if self.skip_keyword_checks {
            return Vec::new();
        }
        self.signature.missing_kw_args_from(&self.kw_args)
    }

    fn invalid_kw_args(&self) -> Vec<String> {
        if self.skip_keyword_checks {
            return Vec::new();
        }
        self.signature.invalid_kw_args_from(&self.kw_args)
    }

    fn arbitrary_kw_args_ok(&self) -> bool {
        !self.arbitrary_kw_args || self.signature.allows_any_kw_args()
    }

    fn unlimited_args_ok(&self) -> bool {
        !self.unlimited_args || self.signature.unlimited_args()
    }
}

/// Pop a trailing keyword mapping off `args`, returning its keyword names.
///
/// Entries without symbol keys stay behind as one positional mapping.
fn split_kw_args(signature: &MethodSignature, args: &mut Vec<Value>) -> Vec<String> {
    if !signature.has_kw_args_in(args) {
        return Vec::new();
    }
    let Some(Value::Hash(entries)) = args.pop() else {
        return Vec::new();
    };

    let (keywords, positional): (Vec<_>, Vec<_>) = entries
        .into_iter()
        .partition(|(key, _)| matches!(key, Value::Symbol(_)));
    if !positional.is_empty() {
        args.push(Value::Hash(positional));
    }

    keywords
        .into_iter()
        .filter_map(|(key, _)| match key {
            Value::Symbol(name) => Some(name),
            _ => None,
        })
        .collect()
}
