//! Primitive document mutations.
//!
//! An [`Edit`] is a `(range, text)` pair classified purely by shape:
//!
//! - empty `text`, non-degenerate `range` — **delete**
//! - degenerate `range`, non-empty `text` — **insert**
//! - anything else — **replace**
//!
//! The splice functions in this module are the only code that creates,
//! merges, or destroys lines. They operate directly on the line array and
//! assert their preconditions: an out-of-bounds position or a malformed
//! range is a defect in the caller, and continuing would corrupt the
//! buffer, so they panic instead of returning an error.

use crate::{
  Tendril,
  position::{
    Position,
    Range,
  },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
  Insert,
  Delete,
  Replace,
}

/// A single edit: replace the contents of `range` with `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
  pub range: Range,
  pub text:  Tendril,
}

impl Edit {
  pub fn kind(&self) -> EditKind {
    if self.range.is_empty() && !self.text.is_empty() {
      EditKind::Insert
    } else if self.text.is_empty() && !self.range.is_empty() {
      EditKind::Delete
    } else {
      EditKind::Replace
    }
  }
}

/// Splice `text` into the line array at `pos`.
///
/// Text without a line break extends the line in place. Otherwise the
/// line is split at `pos.offset` into a head (kept) and a tail (saved
/// aside); each `\n`-separated segment extends the current line and opens
/// a fresh line below it, and the saved tail is re-attached after the
/// last segment.
///
/// Returns the position immediately after the inserted text, before the
/// re-attached tail.
///
/// # Panics
///
/// Panics if `pos.line` is out of bounds or `pos.offset` is past the end
/// of the line or not on a char boundary.
pub(crate) fn splice_insert(lines: &mut Vec<String>, pos: Position, text: &str) -> Position {
  assert!(
    pos.line < lines.len(),
    "insert line {} out of bounds ({} lines)",
    pos.line,
    lines.len()
  );
  let line = &mut lines[pos.line];
  assert!(
    pos.offset <= line.len() && line.is_char_boundary(pos.offset),
    "insert offset {} invalid for line of length {}",
    pos.offset,
    line.len()
  );

  if !text.contains('\n') {
    line.insert_str(pos.offset, text);
    return Position::new(pos.line, pos.offset + text.len());
  }

  let tail = line.split_off(pos.offset);
  let mut row = pos.line;
  let mut segments = text.split('\n');
  if let Some(first) = segments.next() {
    lines[row].push_str(first);
  }
  for segment in segments {
    row += 1;
    lines.insert(row, segment.to_owned());
  }
  let end = Position::new(row, lines[row].len());
  lines[row].push_str(&tail);
  end
}

/// Remove `[range.begin, range.end)` from the line array.
///
/// Lines are walked backward from `range.end` so indices stay stable
/// while removing. Fully covered lines vanish and contribute
/// `"\n" + line` to the removed text; a partially covered last line
/// leaves its tail past `end.offset` to be re-attached to what remains
/// of `begin.line` (the merge step). The removed text is accumulated by
/// prepending, so it reads in forward document order and is the exact
/// payload needed to undo the delete.
///
/// # Panics
///
/// Panics if the range is degenerate, out of bounds, or its offsets are
/// not on char boundaries.
pub(crate) fn splice_delete(lines: &mut Vec<String>, range: Range) -> String {
  let Range { begin, end } = range;
  assert!(begin < end, "degenerate delete range at {begin:?}");
  assert!(
    end.line < lines.len(),
    "delete end line {} out of bounds ({} lines)",
    end.line,
    lines.len()
  );
  assert!(
    begin.offset <= lines[begin.line].len() && lines[begin.line].is_char_boundary(begin.offset),
    "delete begin offset {} invalid for line of length {}",
    begin.offset,
    lines[begin.line].len()
  );
  assert!(
    end.offset <= lines[end.line].len() && lines[end.line].is_char_boundary(end.offset),
    "delete end offset {} invalid for line of length {}",
    end.offset,
    lines[end.line].len()
  );

  if begin.line == end.line {
    let line = &mut lines[begin.line];
    let removed = line[begin.offset..end.offset].to_owned();
    line.replace_range(begin.offset..end.offset, "");
    return removed;
  }

  let mut removed = String::new();
  let mut tail: Option<String> = None;

  for row in ((begin.line + 1)..=end.line).rev() {
    let line = lines.remove(row);
    if row == end.line && end.offset < line.len() {
      // The last line survives in part: keep everything past the
      // deleted span for re-attachment below.
      tail = Some(line[end.offset..].to_owned());
      removed.insert_str(0, &line[..end.offset]);
    } else {
      removed.insert_str(0, &line);
    }
    removed.insert_str(0, "\n");
  }

  let first = &mut lines[begin.line];
  removed.insert_str(0, &first[begin.offset..]);
  first.truncate(begin.offset);

  // Merge step: the split line is reassembled across the deleted span.
  if let Some(tail) = tail {
    lines[begin.line].push_str(&tail);
  }

  removed
}

/// Cumulative byte offsets of line starts under `\n` joining.
///
/// Only a prefix is ever valid: an edit touching line `l` truncates the
/// cache to `l + 1` entries (the start of `l` itself is unaffected by an
/// edit inside it), and queries lazily extend the prefix again. Keeps
/// descriptor generation from re-summing the whole document on every
/// keystroke.
#[derive(Debug, Default)]
pub(crate) struct LineOffsets {
  starts: Vec<usize>,
}

impl LineOffsets {
  pub(crate) fn clear(&mut self) {
    self.starts.clear();
  }

  /// Drop cached offsets past `line`: the lengths behind them changed.
  pub(crate) fn invalidate_from(&mut self, line: usize) {
    self.starts.truncate(line + 1);
  }

  /// Absolute byte offset of `pos` under `\n` joining.
  pub(crate) fn position_to_byte(&mut self, lines: &[String], pos: Position) -> usize {
    debug_assert!(pos.line < lines.len());
    if self.starts.is_empty() {
      self.starts.push(0);
    }
    while self.starts.len() <= pos.line {
      let prev = self.starts.len() - 1;
      let next = self.starts[prev] + lines[prev].len() + 1;
      self.starts.push(next);
    }
    self.starts[pos.line] + pos.offset
  }
}
