//! Support utilities for test frameworks: failure diffs, fuzzy value
//! matching, method signature verification and a reentrant mutex.
//!
//! # Examples
//!
//! ```
//! use rspec_support::{Differ, Value, fuzzy};
//!
//! let differ = Differ::default();
//! let diff = differ.diff(&Value::from("foo\nbar\n"), &Value::from("foo\nbaz\n"));
//! assert!(diff.contains("-bar\n+baz\n"));
//!
//! let expected = Value::array([Value::Int(1), fuzzy::any_args()]);
//! assert!(fuzzy::values_match(&expected, &Value::array([Value::Int(1), Value::Int(2)])));
//! ```

use error_set::error_set;
use std::path::Path;

pub mod diff;
pub mod encoding;
pub mod formatter;
pub mod fuzzy;
pub mod reentrant;
pub mod signature;
pub mod value;

pub use diff::{DiffConfig, Differ, PatchError};
pub use encoding::{EncodedString, Encoding, EncodingError};
pub use formatter::ObjectFormatter;
pub use fuzzy::{MatchError, Pattern, values_match};
pub use reentrant::{ExecutionContext, LockError, ReentrantMutex};
pub use signature::{
    Arity, MethodSignature, MethodSignatureExpectation, Parameter, SignatureParseError,
    SignatureVerifier, VerifierPolicy,
};
pub use value::{Callable, Inspect, Record, Value};

error_set! {
    /// Top-level error for rspec-support operations
    SupportError := {
        #[display("Failed to read {path}: {message}")]
        ReadFailed { path: String, message: String },
        #[display("Failed to write {target}: {message}")]
        WriteFailed { target: String, message: String },
        EncodingError(EncodingError),
        SignatureParseError(SignatureParseError),
        LockError(LockError),
        PatchError(PatchError),
    }
}

/// Read a file as bytes tagged with `encoding`
pub fn read_encoded(path: &Path, encoding: Encoding) -> Result<EncodedString, SupportError> {
    let bytes = std::fs::read(path).map_err(|e| SupportError::ReadFailed {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    tracing::debug!(path = %path.display(), %encoding, len = bytes.len(), "read input");
    Ok(EncodedString::new(bytes, encoding))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn read_encoded_tags_bytes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"caf\xe9\n").unwrap();
        let encoded = read_encoded(file.path(), Encoding::Latin1).unwrap();
        assert_eq!(encoded.encoding(), Encoding::Latin1);
        assert_eq!(encoded.transcode(Encoding::Utf8, "?").unwrap(), "caf\u{e9}\n");
    }

    #[test]
    fn read_missing_file_reports_path() {
        let err = read_encoded(Path::new("/nonexistent/actual.txt"), Encoding::Utf8).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read /nonexistent/actual.txt"));
    }

    #[test]
    fn wrapped_errors_convert() {
        let err: SupportError = "x, x".parse::<MethodSignature>().unwrap_err().into();
        assert!(matches!(err, SupportError::SignatureParseError(_)));
    }
}
