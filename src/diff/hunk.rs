use std::fmt;

/// A span of lines in the old or new text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    /// 0-based index of the first line
    pub start: usize,
    pub len: usize,
}

impl LineRange {
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// Parse a header range like "136,0" or "137"
    fn parse(range: &str) -> Option<Self> {
        let (start, len) = match range.split_once(',') {
            Some((start, len)) => (start.parse::<usize>().ok()?, len.parse::<usize>().ok()?),
            None => (range.parse::<usize>().ok()?, 1),
        };
        // An empty range names the line before it
        let start = if len == 0 { start } else { start.checked_sub(1)? };
        Some(Self { start, len })
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.len {
            0 => write!(f, "{},0", self.start),
            1 => write!(f, "{}", self.start + 1),
            n => write!(f, "{},{}", self.start + 1, n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTag {
    Context,
    Delete,
    Insert,
}

impl LineTag {
    fn prefix(self) -> char {
        match self {
            LineTag::Context => ' ',
            LineTag::Delete => '-',
            LineTag::Insert => '+',
        }
    }
}

/// One rendered line of a hunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkLine {
    pub tag: LineTag,
    /// Line content without its terminator
    pub text: String,
    /// The line is the last of its text and has no trailing newline
    pub missing_newline: bool,
}

impl HunkLine {
    pub fn new(tag: LineTag, raw: &str) -> Self {
        match raw.strip_suffix('\n') {
            Some(text) => Self {
                tag,
                text: text.to_string(),
                missing_newline: false,
            },
            None => Self {
                tag,
                text: raw.to_string(),
                missing_newline: true,
            },
        }
    }

    /// The line as it appears in its source text
    pub fn raw(&self) -> String {
        if self.missing_newline {
            self.text.clone()
        } else {
            format!("{}\n", self.text)
        }
    }

    pub fn in_old(&self) -> bool {
        self.tag != LineTag::Insert
    }

    pub fn in_new(&self) -> bool {
        self.tag != LineTag::Delete
    }
}

/// A group of changes with surrounding context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old: LineRange,
    pub new: LineRange,
    pub lines: Vec<HunkLine>,
}

impl Hunk {
    /// Parse a hunk from diff text (header + content lines)
    pub fn parse(text: &str) -> Option<Self> {
        let mut lines = text.split_terminator('\n');

        let (old, new) = Self::parse_header(lines.next()?)?;

        let mut parsed: Vec<HunkLine> = Vec::new();
        for line in lines {
            if line.starts_with("\\ No newline at end of file") {
                // The marker applies to the line just before it
                parsed.last_mut()?.missing_newline = true;
                continue;
            }
            let mut chars = line.chars();
            let tag = match chars.next() {
                Some(' ') => LineTag::Context,
                Some('-') => LineTag::Delete,
                Some('+') => LineTag::Insert,
                _ => return None,
            };
            parsed.push(HunkLine {
                tag,
                text: chars.as_str().to_string(),
                missing_newline: false,
            });
        }

        let hunk = Hunk { old, new, lines: parsed };
        let old_count = hunk.lines.iter().filter(|l| l.in_old()).count();
        let new_count = hunk.lines.iter().filter(|l| l.in_new()).count();
        (old_count == old.len && new_count == new.len).then_some(hunk)
    }

    /// Parse hunk header to extract old and new ranges
    fn parse_header(header: &str) -> Option<(LineRange, LineRange)> {
        let header = header.strip_prefix("@@ ")?;
        let end_idx = header.find(" @@")?;
        let (old, new) = header[..end_idx].split_once(' ')?;

        let old = LineRange::parse(old.strip_prefix('-')?)?;
        let new = LineRange::parse(new.strip_prefix('+')?)?;
        Some((old, new))
    }

    /// Whether `next` starts inside or directly after this hunk's old range
    pub fn overlaps(&self, next: &Hunk) -> bool {
        next.old.start <= self.old.end()
    }

    /// Absorb an overlapping `next` hunk, dropping the context lines both share.
    pub fn merge(&mut self, next: Hunk) {
        let shared = self.old.end().saturating_sub(next.old.start);
        tracing::trace!(
            old = %self.old,
            next = %next.old,
            shared,
            "merging overlapping hunks"
        );
        self.lines.extend(next.lines.into_iter().skip(shared));
        self.old.len = next.old.end() - self.old.start;
        self.new.len = next.new.end() - self.new.start;
    }

    /// Merge each hunk into its predecessor when their windows overlap or touch.
    pub fn coalesce(hunks: Vec<Hunk>) -> Vec<Hunk> {
        let mut merged: Vec<Hunk> = Vec::with_capacity(hunks.len());
        for hunk in hunks {
            match merged.last_mut() {
                Some(prev) if prev.overlaps(&hunk) => prev.merge(hunk),
                _ => merged.push(hunk),
            }
        }
        merged
    }
}

impl fmt::Display for Hunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "@@ -{} +{} @@", self.old, self.new)?;

        for line in &self.lines {
            writeln!(f, "{}{}", line.tag.prefix(), line.text)?;
            if line.missing_newline {
                writeln!(f, "\\ No newline at end of file")?;
            }
        }

        Ok(())
    }
}
