use similar::DiffTag;
use similar::algorithms::{Capture, myers};

use super::hunk::{Hunk, HunkLine, LineRange, LineTag};

/// Splits two texts into lines and groups their differences into hunks.
pub struct HunkGenerator<'a> {
    old: Vec<&'a str>,
    new: Vec<&'a str>,
    context_lines: usize,
}

/// A maximal run of changed lines
#[derive(Debug)]
struct ChangeBlock {
    old: std::ops::Range<usize>,
    new: std::ops::Range<usize>,
}

impl<'a> HunkGenerator<'a> {
    pub fn new(old: &'a str, new: &'a str, context_lines: usize) -> Self {
        Self {
            old: old.split_inclusive('\n').collect(),
            new: new.split_inclusive('\n').collect(),
            context_lines,
        }
    }

    /// Hunks in order, each with its own context window, not yet coalesced.
    pub fn hunks(&self) -> Vec<Hunk> {
        let blocks = self.change_blocks();
        let mut hunks = Vec::with_capacity(blocks.len());

        for (i, block) in blocks.iter().enumerate() {
            let prev_end = if i == 0 { 0 } else { blocks[i - 1].old.end };
            let next_start = blocks.get(i + 1).map_or(self.old.len(), |next| next.old.start);
            let leading = self.context_lines.min(block.old.start - prev_end);
            let trailing = self.context_lines.min(next_start - block.old.end);

            let mut lines = Vec::new();
            let context = |range: std::ops::Range<usize>| {
                self.old[range]
                    .iter()
                    .map(|raw| HunkLine::new(LineTag::Context, raw))
                    .collect::<Vec<_>>()
            };
            lines.extend(context(block.old.start - leading..block.old.start));
            lines.extend(self.old[block.old.clone()].iter().map(|raw| HunkLine::new(LineTag::Delete, raw)));
            lines.extend(self.new[block.new.clone()].iter().map(|raw| HunkLine::new(LineTag::Insert, raw)));
            lines.extend(context(block.old.end..block.old.end + trailing));

            hunks.push(Hunk {
                old: LineRange {
                    start: block.old.start - leading,
                    len: leading + block.old.len() + trailing,
                },
                new: LineRange {
                    start: block.new.start - leading,
                    len: leading + block.new.len() + trailing,
                },
                lines,
            });
        }

        hunks
    }

    fn change_blocks(&self) -> Vec<ChangeBlock> {
        // Uncompacted ops keep old and new indices monotonic
        let mut capture = Capture::new();
        let Ok(()) = myers::diff(
            &mut capture,
            self.old.as_slice(),
            0..self.old.len(),
            self.new.as_slice(),
            0..self.new.len(),
        );
        let ops = capture.into_ops();
        let mut blocks: Vec<ChangeBlock> = Vec::new();
        let mut in_block = false;

        for op in &ops {
            let (tag, old, new) = op.as_tag_tuple();
            if tag == DiffTag::Equal {
                in_block = false;
                continue;
            }
            match blocks.last_mut() {
                Some(block) if in_block => {
                    block.old.end = old.end;
                    block.new.end = new.end;
                }
                _ => blocks.push(ChangeBlock { old, new }),
            }
            in_block = true;
        }

        tracing::trace!(ops = ops.len(), blocks = blocks.len(), "aligned lines");
        blocks
    }
}
