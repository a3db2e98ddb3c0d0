//! Unified diffs of strings and objects for failure messages.
//!
//! ```
//! use rspec_support::{DiffConfig, Differ, Value};
//!
//! let differ = Differ::new(DiffConfig::default());
//! let diff = differ.diff(&Value::from("foo\nbar\n"), &Value::from("foo\nbaz\n"));
//! assert_eq!(diff, "\n@@ -1,2 +1,2 @@\n foo\n-bar\n+baz\n");
//! ```

pub mod generator;
pub mod hunk;
pub mod patch;

use std::fmt;
use std::sync::Arc;

use anstyle::{AnsiColor, Style};

use crate::encoding::{EncodedString, Encoding, EncodingError, pick_encoding};
use crate::formatter::{ObjectPreparer, object_to_string};
use crate::value::Value;
pub use generator::HunkGenerator;
pub use hunk::{Hunk, HunkLine, LineRange, LineTag};
pub use patch::{PatchError, apply};

/// Options for producing diffs
#[derive(Clone)]
pub struct DiffConfig {
    pub color: bool,
    pub context_lines: usize,
    /// Substituted for characters the target encoding cannot hold
    pub replacement: String,
    /// Used when the two sides have no compatible encoding
    pub default_external: Encoding,
    pub object_preparer: Option<Arc<ObjectPreparer>>,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            color: false,
            context_lines: 3,
            replacement: "?".to_string(),
            default_external: Encoding::Utf8,
            object_preparer: None,
        }
    }
}

impl fmt::Debug for DiffConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiffConfig")
            .field("color", &self.color)
            .field("context_lines", &self.context_lines)
            .field("replacement", &self.replacement)
            .field("default_external", &self.default_external)
            .field("object_preparer", &self.object_preparer.is_some())
            .finish()
    }
}

impl DiffConfig {
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn with_context_lines(mut self, context_lines: usize) -> Self {
        self.context_lines = context_lines;
        self
    }

    pub fn with_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.replacement = replacement.into();
        self
    }

    pub fn with_default_external(mut self, encoding: Encoding) -> Self {
        self.default_external = encoding;
        self
    }

    pub fn with_object_preparer<F>(mut self, preparer: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.object_preparer = Some(Arc::new(preparer));
        self
    }
}

/// Produces the diff shown when an expectation on two values fails.
#[derive(Debug, Clone, Default)]
pub struct Differ {
    config: DiffConfig,
}

impl Differ {
    pub fn new(config: DiffConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    /// Diff `actual` against `expected`, or `""` when there is nothing
    /// useful to show.
    pub fn diff(&self, actual: &Value, expected: &Value) -> String {
        if !actual.is_truthy() || !expected.is_truthy() {
            return String::new();
        }

        let leaves: Vec<&Value> = actual.leaves().into_iter().chain(expected.leaves()).collect();
        if leaves.iter().all(|leaf| leaf.is_string()) {
            if !leaves.iter().any(|leaf| is_multiline(leaf)) {
                tracing::debug!("single-line strings, no diff");
                return String::new();
            }
            tracing::debug!("diffing as strings");
            return self.diff_as_string(&coerce_to_string(actual), &coerce_to_string(expected));
        }

        if leaves.iter().any(|leaf| leaf.is_proc() || leaf.is_numeric()) {
            tracing::debug!("values contain procs or numbers, no diff");
            return String::new();
        }

        tracing::debug!("diffing as objects");
        self.diff_as_object(actual, expected)
    }

    /// Line-diff two strings after reconciling their encodings.
    pub fn diff_as_string(&self, actual: &EncodedString, expected: &EncodedString) -> String {
        let target = pick_encoding(actual, expected, self.config.default_external);
        let (old, new) = match self.transcode_both(actual, expected, target) {
            Ok(pair) => pair,
            Err(err) => {
                tracing::warn!(%err, "could not reconcile string encodings");
                return encoding_error_message(actual, expected);
            }
        };

        let hunks = Hunk::coalesce(HunkGenerator::new(&old, &new, self.config.context_lines).hunks());
        if hunks.is_empty() {
            return String::new();
        }

        let mut output = String::from("\n");
        for hunk in &hunks {
            output.push_str(&hunk.to_string());
        }
        self.color_diff(&output)
    }

    /// Stringify both values through the pretty printer, then line-diff them.
    pub fn diff_as_object(&self, actual: &Value, expected: &Value) -> String {
        let preparer = self.config.object_preparer.as_deref();
        let actual = object_to_string(actual, preparer);
        let expected = object_to_string(expected, preparer);
        self.diff_as_string(&EncodedString::utf8(&actual), &EncodedString::utf8(&expected))
    }

    fn transcode_both(
        &self,
        actual: &EncodedString,
        expected: &EncodedString,
        target: Encoding,
    ) -> Result<(String, String), EncodingError> {
        let replacement = &self.config.replacement;
        Ok((
            actual.transcode(target, replacement)?,
            expected.transcode(target, replacement)?,
        ))
    }

    fn color_diff(&self, diff: &str) -> String {
        if !self.config.color {
            return diff.to_string();
        }

        diff.split_inclusive('\n')
            .map(|line| {
                let (text, newline) = match line.strip_suffix('\n') {
                    Some(text) => (text, "\n"),
                    None => (line, ""),
                };
                let style = line_style(text);
                format!("{}{text}{}{newline}", style.render(), style.render_reset())
            })
            .collect()
    }
}

/// Escapes are always emitted; whether to colour is the caller's decision.
fn line_style(line: &str) -> Style {
    let color = if line.starts_with('+') {
        AnsiColor::Green
    } else if line.starts_with('-') {
        AnsiColor::Red
    } else if line.starts_with("@@") {
        AnsiColor::Blue
    } else {
        return Style::new();
    };
    Style::new().fg_color(Some(color.into()))
}

fn is_multiline(value: &Value) -> bool {
    match value {
        Value::Str(s) => s.contains('\n'),
        Value::Bytes(b) => b.is_multiline(),
        _ => false,
    }
}

/// A string, or a sequence of strings joined one entry per line.
fn coerce_to_string(value: &Value) -> EncodedString {
    match value {
        Value::Bytes(bytes) => bytes.clone(),
        Value::Array(items) => {
            let lines: Vec<String> = items
                .iter()
                .map(|item| match item {
                    Value::Array(_) => item.inspect(),
                    other => other.to_s().replace('\n', "\\n"),
                })
                .collect();
            EncodedString::utf8(&lines.join("\n"))
        }
        other => EncodedString::utf8(&other.to_s()),
    }
}

fn encoding_error_message(actual: &EncodedString, expected: &EncodedString) -> String {
    if actual.encoding() != expected.encoding() {
        format!(
            "Could not produce a diff because the encoding of the actual string ({}) \
             differs from the encoding of the expected string ({})",
            actual.encoding(),
            expected.encoding()
        )
    } else {
        format!(
            "Could not produce a diff because of the encoding of the string ({})",
            expected.encoding()
        )
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_text() -> impl Strategy<Value = String> {
        prop::collection::vec(prop_oneof!["[a-c]{0,3}", Just(String::new())], 0..12)
            .prop_flat_map(|lines| {
                let joined = lines.join("\n");
                prop_oneof![Just(joined.clone()), Just(format!("{joined}\n"))]
            })
    }

    proptest! {
        #[test]
        fn diff_of_identical_strings_is_empty(text in arb_text()) {
            let differ = Differ::default();
            prop_assert_eq!(differ.diff(&Value::from(text.clone()), &Value::from(text)), "");
        }

        #[test]
        fn single_line_strings_never_diff(a in "[a-z ]{0,20}", b in "[a-z ]{0,20}") {
            let differ = Differ::default();
            prop_assert_eq!(differ.diff(&Value::from(a), &Value::from(b)), "");
        }

        #[test]
        fn applying_the_diff_to_actual_gives_expected(
            actual in arb_text(),
            expected in arb_text(),
            context in 0usize..4,
        ) {
            let differ = Differ::new(DiffConfig::default().with_context_lines(context));
            let diff = differ.diff_as_string(&EncodedString::utf8(&actual), &EncodedString::utf8(&expected));
            prop_assert_eq!(apply(&actual, &diff).unwrap(), expected);
        }
    }
}
