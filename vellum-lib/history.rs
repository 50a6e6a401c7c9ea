//! Bounded, linear undo/redo log.

use std::collections::VecDeque;

use thiserror::Error;

use crate::{
  edit::{
    Edit,
    EditKind,
  },
  position::{
    Position,
    Range,
  },
};

pub type Result<T> = std::result::Result<T, HistoryError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryError {
  #[error("no history available")]
  NoHistory,
}

pub const DEFAULT_CAPACITY: usize = 1000;

/// One undo/redo unit: the edit as issued (`origin`, replayed on redo)
/// and the edit that reverses it (`reverse`, replayed on undo), plus the
/// cursor position to restore in each direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryItem {
  pub origin:        Edit,
  pub reverse:       Edit,
  /// Cursor restored when this item is undone.
  pub cursor_before: Position,
  /// Cursor restored when this item is redone.
  pub cursor_after:  Position,
}

/// A pending history move that has not been applied yet.
///
/// Returned by [`History::undo`] / [`History::redo`]. The caller replays
/// `edit` through the edit engine and only then commits the move with
/// [`History::apply_step`], so the log never diverges from the document
/// if the replay does not happen.
#[derive(Debug, Clone)]
pub struct HistoryStep {
  pub edit:   Edit,
  pub cursor: Position,
  target:     usize,
}

/// Bounded, cursor-addressed log of [`HistoryItem`]s.
///
/// The cursor points either at the logical end (nothing to redo) or at
/// the next redo target. The log is linear, not a tree: recording while
/// the cursor is not at the end discards everything from the cursor on,
/// and recording at capacity evicts the oldest item from the front.
#[derive(Debug)]
pub struct History {
  items:    VecDeque<HistoryItem>,
  cursor:   usize,
  capacity: usize,
}

impl Default for History {
  fn default() -> Self {
    Self::new(DEFAULT_CAPACITY)
  }
}

impl History {
  /// # Panics
  ///
  /// Panics if `capacity` is zero.
  pub fn new(capacity: usize) -> Self {
    assert!(capacity > 0, "history capacity must be positive");
    Self {
      items: VecDeque::new(),
      cursor: 0,
      capacity,
    }
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.items.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  #[inline]
  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Index of the next redo target; equals [`len`](Self::len) when there
  /// is nothing to redo.
  #[inline]
  pub fn cursor(&self) -> usize {
    self.cursor
  }

  #[inline]
  pub fn at_start(&self) -> bool {
    self.cursor == 0
  }

  #[inline]
  pub fn at_end(&self) -> bool {
    self.cursor == self.items.len()
  }

  /// Record a freshly applied edit.
  ///
  /// Any pending redo branch is discarded first. The new item is then
  /// either compacted into the last item (runs of typing, runs of
  /// single-step deletes) or appended, evicting the oldest item when the
  /// log is full.
  pub fn record(&mut self, item: HistoryItem) {
    // A fresh edit invalidates everything the cursor had undone.
    self.items.truncate(self.cursor);

    if let Some(last) = self.items.back_mut() {
      if try_merge(last, &item) {
        return;
      }
    }
    if self.items.len() == self.capacity {
      self.items.pop_front();
    }
    self.items.push_back(item);
    self.cursor = self.items.len();
  }

  /// Prepare an undo without mutating the log.
  pub fn undo(&self) -> Result<HistoryStep> {
    if self.cursor == 0 {
      return Err(HistoryError::NoHistory);
    }
    let item = &self.items[self.cursor - 1];
    Ok(HistoryStep {
      edit:   item.reverse.clone(),
      cursor: item.cursor_before,
      target: self.cursor - 1,
    })
  }

  /// Prepare a redo without mutating the log.
  pub fn redo(&self) -> Result<HistoryStep> {
    if self.cursor == self.items.len() {
      return Err(HistoryError::NoHistory);
    }
    let item = &self.items[self.cursor];
    Ok(HistoryStep {
      edit:   item.origin.clone(),
      cursor: item.cursor_after,
      target: self.cursor + 1,
    })
  }

  /// Commit a step after its edit was applied successfully.
  pub fn apply_step(&mut self, step: &HistoryStep) {
    debug_assert!(step.target <= self.items.len());
    self.cursor = step.target;
  }
}

/// Compaction heuristic, checked against the last item only.
///
/// Runs of typed characters collapse into one insert; single-step delete
/// chains collapse into one delete, whether they eat backward (backspace)
/// or repeatedly forward at the same boundary. Replaces never merge.
fn try_merge(last: &mut HistoryItem, next: &HistoryItem) -> bool {
  match (last.origin.kind(), next.origin.kind()) {
    (EditKind::Insert, EditKind::Insert)
      if last.reverse.range.end == next.reverse.range.begin =>
    {
      last.origin.text.push_str(&next.origin.text);
      last.reverse.range.end = next.reverse.range.end;
      last.cursor_after = next.cursor_after;
      true
    },
    (EditKind::Delete, EditKind::Delete)
      if next.origin.range.end == last.origin.range.begin =>
    {
      // Backspace chain: the new span sits immediately before the
      // previous one. The origin widens at its begin and the restored
      // text is prepended.
      last.origin.range.begin = next.origin.range.begin;
      last.reverse.range = next.reverse.range;
      let mut restored = next.reverse.text.clone();
      restored.push_str(&last.reverse.text);
      last.reverse.text = restored;
      last.cursor_after = next.cursor_after;
      true
    },
    (EditKind::Delete, EditKind::Delete)
      if next.origin.range.begin == last.origin.range.begin =>
    {
      // Forward-delete chain: repeated deletes at the same boundary.
      // The origin widens at its end and the restored text is appended.
      last.origin.range.end = advance(last.origin.range.end, next.origin.range);
      last.reverse.text.push_str(&next.reverse.text);
      true
    },
    _ => false,
  }
}

/// Advance `end` by the relative extent of `span`.
fn advance(end: Position, span: Range) -> Position {
  if span.line_span() == 0 {
    Position::new(end.line, end.offset + (span.end.offset - span.begin.offset))
  } else {
    Position::new(end.line + span.line_span(), span.end.offset)
  }
}
