use error_set::error_set;

use super::hunk::{Hunk, LineTag};

error_set! {
    /// Errors from applying rendered hunks back onto a text
    PatchError := {
        #[display("Malformed hunk: {header}")]
        MalformedHunk { header: String },
        #[display("Hunk at line {line} does not match the original text")]
        ContextMismatch { line: usize },
        #[display("Hunk at line {line} overlaps the previous hunk")]
        OutOfOrder { line: usize },
    }
}

/// Split rendered diff text into its hunks
pub fn parse_hunks(diff: &str) -> Result<Vec<Hunk>, PatchError> {
    let mut chunks: Vec<String> = Vec::new();
    for line in diff.split_inclusive('\n') {
        if line.starts_with("@@ ") {
            chunks.push(String::new());
        }
        if let Some(chunk) = chunks.last_mut() {
            chunk.push_str(line);
        }
    }

    chunks
        .iter()
        .map(|chunk| {
            Hunk::parse(chunk).ok_or_else(|| PatchError::MalformedHunk {
                header: chunk.lines().next().unwrap_or_default().to_string(),
            })
        })
        .collect()
}

/// Apply a unified diff to the text it was computed from.
pub fn apply(original: &str, diff: &str) -> Result<String, PatchError> {
    let source: Vec<&str> = original.split_inclusive('\n').collect();
    let mut result = String::with_capacity(original.len());
    let mut cursor = 0;

    for hunk in parse_hunks(diff)? {
        if hunk.old.start < cursor || hunk.old.end() > source.len() {
            return Err(PatchError::OutOfOrder {
                line: hunk.old.start + 1,
            });
        }
        source[cursor..hunk.old.start].iter().for_each(|line| result.push_str(line));

        let mut position = hunk.old.start;
        for line in &hunk.lines {
            let raw = line.raw();
            match line.tag {
                LineTag::Context | LineTag::Delete => {
                    if source.get(position) != Some(&raw.as_str()) {
                        return Err(PatchError::ContextMismatch { line: position + 1 });
                    }
                    position += 1;
                    if line.tag == LineTag::Context {
                        result.push_str(&raw);
                    }
                }
                LineTag::Insert => result.push_str(&raw),
            }
        }
        cursor = hunk.old.end();
    }

    source[cursor..].iter().for_each(|line| result.push_str(line));
    Ok(result)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn apply_replacement() {
        let diff = "\n@@ -1,2 +1,2 @@\n foo\n-bar\n+baz\n";
        assert_eq!(apply("foo\nbar\n", diff).unwrap(), "foo\nbaz\n");
    }

    #[test]
    fn apply_insertion_after_line() {
        assert_eq!(apply("a\nc\n", "@@ -1,0 +2 @@\n+b\n").unwrap(), "a\nb\nc\n");
    }

    #[test]
    fn apply_insertion_at_start() {
        assert_eq!(apply("b\n", "@@ -0,0 +1 @@\n+a\n").unwrap(), "a\nb\n");
    }

    #[test]
    fn apply_restores_missing_newline() {
        let diff = "@@ -1 +1 @@\n-b\n\\ No newline at end of file\n+b\n";
        assert_eq!(apply("b", diff).unwrap(), "b\n");
    }

    #[test]
    fn apply_rejects_wrong_context() {
        let diff = "@@ -1,2 +1,2 @@\n foo\n-bar\n+baz\n";
        assert!(matches!(
            apply("foo\nqux\n", diff),
            Err(PatchError::ContextMismatch { line: 2 })
        ));
    }

    #[test]
    fn empty_diff_is_identity() {
        assert_eq!(apply("x\ny\n", "").unwrap(), "x\ny\n");
    }
}
