//! Utility functions to traverse the unicode graphemes of a single line
//! of text.
//!
//! Lines are stored without terminators, so unlike a whole-buffer
//! implementation these helpers never have to stitch chunks together:
//! every function takes a plain `&str` and byte indices into it.

use unicode_segmentation::GraphemeCursor;
use unicode_width::UnicodeWidthStr;

#[must_use]
pub fn grapheme_width(g: &str) -> usize {
  if g.is_ascii() {
    // Fast-path for pure ASCII: each byte renders with width 1.
    g.len()
  } else {
    // Ensure a minimum width of 1 for ill-formed clusters so
    // they remain editable.
    UnicodeWidthStr::width(g).max(1)
  }
}

/// Finds the next grapheme boundary after the given byte position.
#[must_use]
pub fn next_grapheme_boundary(line: &str, byte_idx: usize) -> usize {
  let byte_idx = floor_char_boundary(line, byte_idx);
  let mut gc = GraphemeCursor::new(byte_idx, line.len(), true);
  match gc.next_boundary(line, 0) {
    Ok(Some(n)) => n,
    _ => line.len(),
  }
}

/// Finds the previous grapheme boundary before the given byte position.
#[must_use]
pub fn prev_grapheme_boundary(line: &str, byte_idx: usize) -> usize {
  let byte_idx = floor_char_boundary(line, byte_idx.min(line.len()));
  let mut gc = GraphemeCursor::new(byte_idx, line.len(), true);
  match gc.prev_boundary(line, 0) {
    Ok(Some(n)) => n,
    _ => 0,
  }
}

/// Returns the passed byte index if it's already a grapheme boundary,
/// or the next grapheme boundary past it if not.
#[must_use]
#[inline]
pub fn ensure_grapheme_boundary_next(line: &str, byte_idx: usize) -> usize {
  let byte_idx = byte_idx.min(line.len());
  if byte_idx == 0 || is_grapheme_boundary(line, byte_idx) {
    byte_idx
  } else {
    next_grapheme_boundary(line, byte_idx)
  }
}

/// Returns the passed byte index if it's already a grapheme boundary,
/// or the prev grapheme boundary before it if not.
#[must_use]
#[inline]
pub fn ensure_grapheme_boundary_prev(line: &str, byte_idx: usize) -> usize {
  // Snapping to the nearest char boundary first keeps a mid-codepoint
  // index from overshooting a whole extra grapheme backward.
  let byte_idx = floor_char_boundary(line, byte_idx.min(line.len()));
  if byte_idx == line.len() || is_grapheme_boundary(line, byte_idx) {
    byte_idx
  } else {
    prev_grapheme_boundary(line, byte_idx)
  }
}

#[must_use]
pub fn is_grapheme_boundary(line: &str, byte_idx: usize) -> bool {
  if byte_idx == 0 || byte_idx >= line.len() {
    return true;
  }
  if !line.is_char_boundary(byte_idx) {
    return false;
  }
  GraphemeCursor::new(byte_idx, line.len(), true)
    .is_boundary(line, 0)
    .unwrap_or(false)
}

fn floor_char_boundary(line: &str, mut byte_idx: usize) -> usize {
  byte_idx = byte_idx.min(line.len());
  while !line.is_char_boundary(byte_idx) {
    byte_idx -= 1;
  }
  byte_idx
}
