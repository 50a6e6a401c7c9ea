//! Document core state and mutation API.
//!
//! This module owns the text buffer of one editing session: an ordered
//! array of terminator-free lines, the lifecycle state machine, the undo
//! history, and the load/save boundary.
//!
//! # Design
//!
//! - The store always holds at least one line; an empty document is one
//!   empty line, never zero lines.
//! - Mutators are all-or-nothing: a refused mutation (unloaded or
//!   readonly store) has no side effects, and the splice algorithms run
//!   to completion before returning, so observers never see a store
//!   mid-splice.
//! - Every successful mutation bumps `version`, records one
//!   [`HistoryItem`], and queues one [`InputEdit`] for the external
//!   syntax engine.
//! - Views and cursors hold [`Position`]s, not references, and
//!   revalidate them with [`Document::clamp_position`] after mutations.

use std::path::{
  Path,
  PathBuf,
};

use smallvec::SmallVec;
use thiserror::Error;
use vellum_core::{
  grapheme::ensure_grapheme_boundary_prev,
  line_ending::{
    LineEnding,
    NATIVE_LINE_ENDING,
  },
};

use crate::{
  Tendril,
  edit::{
    Edit,
    EditKind,
    LineOffsets,
    splice_delete,
    splice_insert,
  },
  fs,
  history::{
    History,
    HistoryError,
    HistoryItem,
  },
  position::{
    Position,
    Range,
  },
  syntax::{
    InputEdit,
    Point,
  },
};

pub type Result<T> = std::result::Result<T, DocumentError>;

/// Statuses and failures produced by the public document API.
///
/// The first three variants are expected control flow, reported as
/// values so a UI can message the user without unwinding; only `Io`
/// carries a genuine environment failure.
#[derive(Debug, Error)]
pub enum DocumentError {
  #[error("document is not loaded")]
  NotLoaded,
  #[error("document is readonly")]
  Readonly,
  #[error("document has no backing file")]
  NoBackingFile,
  #[error(transparent)]
  History(#[from] HistoryError),
  #[error(transparent)]
  Io(#[from] std::io::Error),
}

/// Coarse lifecycle of a [`Document`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
  /// Nothing has been loaded yet; mutation is refused.
  #[default]
  Unloaded,
  /// Loaded, byte-identical to the backing store (or a fresh scratch).
  NotModified,
  /// Loaded from a backing file this process may not write.
  ReadOnly,
  /// Loaded, with unsaved mutations.
  Modified,
}

/// The in-memory representation of one file's text.
#[derive(Debug)]
pub struct Document {
  lines:       Vec<String>,
  line_ending: LineEnding,
  path:        Option<PathBuf>,
  state:       DocumentState,
  readonly:    bool,
  version:     u64,
  history:     History,
  offsets:     LineOffsets,
  pending:     SmallVec<[InputEdit; 2]>,
}

impl Default for Document {
  fn default() -> Self {
    Self::new()
  }
}

impl Document {
  pub fn new() -> Self {
    Self {
      lines:       vec![String::new()],
      line_ending: NATIVE_LINE_ENDING,
      path:        None,
      state:       DocumentState::Unloaded,
      readonly:    false,
      version:     0,
      history:     History::default(),
      offsets:     LineOffsets::default(),
      pending:     SmallVec::new(),
    }
  }

  /// A document whose undo log keeps at most `capacity` items.
  ///
  /// # Panics
  ///
  /// Panics if `capacity` is zero.
  pub fn with_history_capacity(capacity: usize) -> Self {
    Self {
      history: History::new(capacity),
      ..Self::new()
    }
  }

  #[inline]
  pub fn line_count(&self) -> usize {
    self.lines.len()
  }

  /// # Panics
  ///
  /// Panics if `index` is out of bounds.
  #[inline]
  pub fn line(&self, index: usize) -> &str {
    &self.lines[index]
  }

  /// Byte length of the line at `index`.
  ///
  /// # Panics
  ///
  /// Panics if `index` is out of bounds.
  #[inline]
  pub fn line_len(&self, index: usize) -> usize {
    self.lines[index].len()
  }

  pub fn lines(&self) -> impl Iterator<Item = &str> {
    self.lines.iter().map(String::as_str)
  }

  pub fn path(&self) -> Option<&Path> {
    self.path.as_deref()
  }

  pub fn state(&self) -> DocumentState {
    self.state
  }

  pub fn line_ending(&self) -> LineEnding {
    self.line_ending
  }

  pub fn set_line_ending(&mut self, line_ending: LineEnding) {
    self.line_ending = line_ending;
  }

  pub fn version(&self) -> u64 {
    self.version
  }

  pub fn is_modified(&self) -> bool {
    self.state == DocumentState::Modified
  }

  pub fn readonly(&self) -> bool {
    self.readonly || self.state == DocumentState::ReadOnly
  }

  pub fn set_readonly(&mut self, readonly: bool) {
    self.readonly = readonly;
  }

  pub fn history(&self) -> &History {
    &self.history
  }

  /// Load the document from `path`, or reset to an empty scratch
  /// document when `path` is `None`.
  ///
  /// The line-ending style is detected from the first terminator in the
  /// file. A missing file is not an error: the path is kept and the
  /// store holds one empty line, to be created on first save. A file
  /// that exists but cannot be read propagates the I/O error and leaves
  /// the store unloaded with one empty line, never zero.
  pub fn load(&mut self, path: Option<PathBuf>) -> Result<()> {
    self.reset();
    if let Some(path) = path {
      match std::fs::File::open(&path) {
        Ok(file) => {
          let (lines, detected) = fs::read_lines(file).inspect_err(|err| {
            tracing::warn!(path = %path.display(), %err, "failed to read document");
          })?;
          self.lines = lines;
          if let Some(line_ending) = detected {
            self.line_ending = line_ending;
          }
          self.readonly = std::fs::metadata(&path)
            .map(|meta| meta.permissions().readonly())
            .unwrap_or(false);
          self.state = if self.readonly {
            DocumentState::ReadOnly
          } else {
            DocumentState::NotModified
          };
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
          // Create-if-absent: the file appears on first save.
          self.state = DocumentState::NotModified;
        },
        Err(err) => {
          tracing::warn!(path = %path.display(), %err, "failed to open document");
          return Err(err.into());
        },
      }
      self.path = Some(path);
    } else {
      self.state = DocumentState::NotModified;
    }
    self.version = self.version.saturating_add(1);
    Ok(())
  }

  /// Reset to a single empty line with no backing path.
  pub fn clear(&mut self) {
    self.reset();
    self.state = DocumentState::NotModified;
    self.version = self.version.saturating_add(1);
  }

  fn reset(&mut self) {
    self.lines = vec![String::new()];
    self.line_ending = NATIVE_LINE_ENDING;
    self.path = None;
    self.state = DocumentState::Unloaded;
    self.readonly = false;
    self.history = History::new(self.history.capacity());
    self.offsets.clear();
    self.pending.clear();
  }

  /// The exact text spanned by `range`, with internal line breaks
  /// represented as `\n`.
  ///
  /// # Panics
  ///
  /// Panics if `range` is out of bounds.
  pub fn content(&self, range: Range) -> String {
    let Range { begin, end } = range;
    assert!(
      end.line < self.lines.len(),
      "range end line {} out of bounds ({} lines)",
      end.line,
      self.lines.len()
    );
    if begin.line == end.line {
      return self.lines[begin.line][begin.offset..end.offset].to_owned();
    }
    let mut out = String::with_capacity(64);
    out.push_str(&self.lines[begin.line][begin.offset..]);
    for row in (begin.line + 1)..end.line {
      out.push('\n');
      out.push_str(&self.lines[row]);
    }
    out.push('\n');
    out.push_str(&self.lines[end.line][..end.offset]);
    out
  }

  /// The whole document joined with `\n`. Absolute byte offsets in
  /// [`InputEdit`] index into this serialization.
  pub fn text(&self) -> String {
    self.lines.join("\n")
  }

  /// Line-suffix byte slice at `point`: the read query an incremental
  /// parser issues while reparsing the changed region. A row past the
  /// end yields `None` so the reader can stop.
  pub fn chunk_at(&self, point: Point) -> Option<&str> {
    self.lines.get(point.row)?.get(point.column..)
  }

  /// Clamp a possibly-stale view position into the current document,
  /// snapping the offset back to a grapheme boundary.
  ///
  /// Views revalidate their cursors with this after every mutation
  /// instead of holding references into the store.
  pub fn clamp_position(&self, pos: Position) -> Position {
    let line = pos.line.min(self.lines.len() - 1);
    let text = &self.lines[line];
    let offset = ensure_grapheme_boundary_prev(text, pos.offset.min(text.len()));
    Position::new(line, offset)
  }

  /// Drain the incremental-edit descriptors accumulated since the last
  /// call, in application order.
  pub fn take_syntax_edits(&mut self) -> SmallVec<[InputEdit; 2]> {
    std::mem::take(&mut self.pending)
  }

  /// Insert `text` at `pos`, returning the position just past it.
  ///
  /// Empty text is a no-op. Fails without side effects when the store is
  /// unloaded or readonly.
  ///
  /// # Panics
  ///
  /// Panics if `pos` is out of bounds.
  pub fn insert(&mut self, pos: Position, text: impl Into<Tendril>) -> Result<Position> {
    self.ensure_writable()?;
    let text: Tendril = text.into();
    if text.is_empty() {
      return Ok(pos);
    }
    let origin = Edit {
      range: Range::point(pos),
      text,
    };
    let (cursor, reverse) = self.apply_edit(&origin);
    self.history.record(HistoryItem {
      origin,
      reverse,
      cursor_before: pos,
      cursor_after: cursor,
    });
    Ok(cursor)
  }

  /// Delete `[range.begin, range.end)`, returning the resulting cursor
  /// position (`range.begin`).
  ///
  /// A degenerate range is a no-op. Fails without side effects when the
  /// store is unloaded or readonly.
  ///
  /// # Panics
  ///
  /// Panics if `range` is out of bounds.
  pub fn delete(&mut self, range: Range) -> Result<Position> {
    self.ensure_writable()?;
    if range.is_empty() {
      // Zero-width deletes never reach the splice, whose precondition
      // is strict.
      return Ok(range.begin);
    }
    let origin = Edit {
      range,
      text: Tendril::new(),
    };
    let (cursor, reverse) = self.apply_edit(&origin);
    self.history.record(HistoryItem {
      origin,
      reverse,
      cursor_before: range.end,
      cursor_after: cursor,
    });
    Ok(cursor)
  }

  /// Replace `[range.begin, range.end)` with `text`: a delete followed
  /// by an insert at the resulting position, recorded as one history
  /// item with one composed syntax descriptor.
  ///
  /// Degenerate shapes fall through to the pure operation they are.
  ///
  /// # Panics
  ///
  /// Panics if `range` is out of bounds.
  pub fn replace(&mut self, range: Range, text: impl Into<Tendril>) -> Result<Position> {
    self.ensure_writable()?;
    let text: Tendril = text.into();
    if range.is_empty() {
      return self.insert(range.begin, text);
    }
    if text.is_empty() {
      return self.delete(range);
    }
    let origin = Edit { range, text };
    let (cursor, reverse) = self.apply_edit(&origin);
    self.history.record(HistoryItem {
      origin,
      reverse,
      cursor_before: range.end,
      cursor_after: cursor,
    });
    Ok(cursor)
  }

  /// Undo the item behind the history cursor, returning the cursor
  /// position to restore.
  pub fn undo(&mut self) -> Result<Position> {
    self.ensure_writable()?;
    let step = self.history.undo()?;
    self.apply_edit(&step.edit);
    self.history.apply_step(&step);
    Ok(step.cursor)
  }

  /// Redo the item at the history cursor, returning the cursor position
  /// to restore.
  pub fn redo(&mut self) -> Result<Position> {
    self.ensure_writable()?;
    let step = self.history.redo()?;
    self.apply_edit(&step.edit);
    self.history.apply_step(&step);
    Ok(step.cursor)
  }

  /// Serialize every line joined by the stored line ending and
  /// atomically swap the result over the backing path.
  ///
  /// Non-fatal conditions come back as statuses: [`NotLoaded`] for an
  /// unloaded store, [`Readonly`], and [`NoBackingFile`] when there is
  /// no path. A genuine I/O failure leaves the in-memory state — the
  /// modified flag and the history included — untouched.
  ///
  /// [`NotLoaded`]: DocumentError::NotLoaded
  /// [`Readonly`]: DocumentError::Readonly
  /// [`NoBackingFile`]: DocumentError::NoBackingFile
  pub fn write(&mut self) -> Result<()> {
    match self.state {
      DocumentState::Unloaded => return Err(DocumentError::NotLoaded),
      DocumentState::ReadOnly => return Err(DocumentError::Readonly),
      _ if self.readonly => return Err(DocumentError::Readonly),
      _ => {},
    }
    let Some(path) = self.path.as_deref() else {
      return Err(DocumentError::NoBackingFile);
    };

    let eol = self.line_ending.as_str();
    let mut buf =
      String::with_capacity(self.lines.iter().map(|line| line.len() + eol.len()).sum());
    for (i, line) in self.lines.iter().enumerate() {
      if i > 0 {
        buf.push_str(eol);
      }
      buf.push_str(line);
    }
    fs::write_atomic(path, buf.as_bytes())?;
    tracing::debug!(path = %path.display(), bytes = buf.len(), "document saved");
    self.state = DocumentState::NotModified;
    Ok(())
  }

  fn ensure_writable(&self) -> Result<()> {
    match self.state {
      DocumentState::Unloaded => Err(DocumentError::NotLoaded),
      DocumentState::ReadOnly => Err(DocumentError::Readonly),
      _ if self.readonly => Err(DocumentError::Readonly),
      _ => Ok(()),
    }
  }

  /// Apply `edit` to the store: splice the lines, refresh the offset
  /// cache, queue the syntax descriptor, bump the version. Returns the
  /// resulting cursor and the inverse edit.
  fn apply_edit(&mut self, edit: &Edit) -> (Position, Edit) {
    let begin = edit.range.begin;
    let start_byte = self.offsets.position_to_byte(&self.lines, begin);

    let (cursor, reverse, old_end_point, old_len, new_len) = match edit.kind() {
      EditKind::Insert => {
        let end = splice_insert(&mut self.lines, begin, &edit.text);
        let reverse = Edit {
          range: Range::new(begin, end),
          text:  Tendril::new(),
        };
        (end, reverse, Point::from(begin), 0, edit.text.len())
      },
      EditKind::Delete => {
        let removed = splice_delete(&mut self.lines, edit.range);
        let old_len = removed.len();
        let reverse = Edit {
          range: Range::point(begin),
          text:  removed.into(),
        };
        (begin, reverse, Point::from(edit.range.end), old_len, 0)
      },
      EditKind::Replace => {
        let removed = splice_delete(&mut self.lines, edit.range);
        let old_len = removed.len();
        let end = splice_insert(&mut self.lines, begin, &edit.text);
        let reverse = Edit {
          range: Range::new(begin, end),
          text:  removed.into(),
        };
        (end, reverse, Point::from(edit.range.end), old_len, edit.text.len())
      },
    };

    self.offsets.invalidate_from(begin.line);
    self.pending.push(InputEdit {
      start_byte,
      old_end_byte: start_byte + old_len,
      new_end_byte: start_byte + new_len,
      start_point: Point::from(begin),
      old_end_point,
      new_end_point: Point::from(cursor),
    });
    self.version = self.version.saturating_add(1);
    self.state = DocumentState::Modified;
    (cursor, reverse)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn loaded(content: &str) -> (Document, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.txt");
    std::fs::write(&path, content).unwrap();
    let mut doc = Document::new();
    doc.load(Some(path)).unwrap();
    (doc, dir)
  }

  #[test]
  fn new_scratch_document() {
    let mut doc = Document::new();
    assert_eq!(doc.state(), DocumentState::Unloaded);

    doc.load(None).unwrap();
    assert_eq!(doc.line_count(), 1);
    assert_eq!(doc.line(0), "");
    assert_eq!(doc.state(), DocumentState::NotModified);
    assert!(doc.path().is_none());
  }

  #[test]
  fn load_detects_lf() {
    let (doc, _dir) = loaded("a\nbb\nccc");
    assert_eq!(doc.lines().collect::<Vec<_>>(), vec!["a", "bb", "ccc"]);
    assert_eq!(doc.line_ending(), LineEnding::LF);
  }

  #[test]
  fn load_detects_crlf() {
    let (doc, _dir) = loaded("a\r\nb");
    assert_eq!(doc.lines().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(doc.line_ending(), LineEnding::Crlf);
  }

  #[test]
  fn load_keeps_trailing_empty_line() {
    let (doc, _dir) = loaded("a\nb\n");
    assert_eq!(doc.lines().collect::<Vec<_>>(), vec!["a", "b", ""]);
  }

  #[test]
  fn load_missing_file_creates_on_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("new.txt");
    let mut doc = Document::new();
    doc.load(Some(path.clone())).unwrap();

    assert_eq!(doc.state(), DocumentState::NotModified);
    assert_eq!(doc.line_count(), 1);
    assert!(!path.exists());

    doc.insert(Position::zero(), "hi").unwrap();
    doc.write().unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "hi");
  }

  #[test]
  fn load_unreadable_path_stays_unloaded() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = Document::new();
    // A directory opens but cannot be read as a file.
    let err = doc.load(Some(dir.path().to_path_buf())).unwrap_err();
    assert!(matches!(err, DocumentError::Io(_)));
    assert_eq!(doc.state(), DocumentState::Unloaded);
    assert_eq!(doc.line_count(), 1);
    assert_eq!(doc.line(0), "");
  }

  #[test]
  fn readonly_file_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ro.txt");
    std::fs::write(&path, "locked").unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_readonly(true);
    std::fs::set_permissions(&path, perms).unwrap();

    let mut doc = Document::new();
    doc.load(Some(path)).unwrap();
    assert_eq!(doc.state(), DocumentState::ReadOnly);
    assert!(doc.readonly());
    assert!(matches!(
      doc.insert(Position::zero(), "x"),
      Err(DocumentError::Readonly)
    ));
    assert!(matches!(doc.write(), Err(DocumentError::Readonly)));
  }

  #[test]
  fn mutation_requires_a_loaded_store() {
    let mut doc = Document::new();
    assert!(matches!(
      doc.insert(Position::zero(), "x"),
      Err(DocumentError::NotLoaded)
    ));
    assert!(matches!(doc.write(), Err(DocumentError::NotLoaded)));
  }

  #[test]
  fn readonly_flag_blocks_mutation() {
    let (mut doc, _dir) = loaded("text");
    doc.set_readonly(true);
    assert!(matches!(
      doc.delete(Range::new(Position::zero(), Position::new(0, 1))),
      Err(DocumentError::Readonly)
    ));
    doc.set_readonly(false);
    doc.delete(Range::new(Position::zero(), Position::new(0, 1)))
      .unwrap();
    assert_eq!(doc.text(), "ext");
  }

  #[test]
  fn insert_splits_line() {
    let (mut doc, _dir) = loaded("ab");
    let end = doc.insert(Position::new(0, 1), "x\ny").unwrap();
    assert_eq!(doc.lines().collect::<Vec<_>>(), vec!["ax", "yb"]);
    assert_eq!(end, Position::new(1, 1));
    assert!(doc.is_modified());
  }

  #[test]
  fn delete_across_lines_and_undo() {
    let (mut doc, _dir) = loaded("ab\ncd");
    let cursor = doc
      .delete(Range::new(Position::new(0, 1), Position::new(1, 1)))
      .unwrap();
    assert_eq!(doc.lines().collect::<Vec<_>>(), vec!["ad"]);
    assert_eq!(cursor, Position::new(0, 1));

    let cursor = doc.undo().unwrap();
    assert_eq!(doc.text(), "ab\ncd");
    assert_eq!(cursor, Position::new(1, 1));

    doc.redo().unwrap();
    assert_eq!(doc.text(), "ad");
  }

  #[test]
  fn write_without_backing_path() {
    let mut doc = Document::new();
    doc.load(None).unwrap();
    doc.insert(Position::zero(), "scratch").unwrap();
    assert!(matches!(doc.write(), Err(DocumentError::NoBackingFile)));
    assert!(doc.is_modified());
  }

  #[test]
  fn undo_on_fresh_document() {
    let (mut doc, _dir) = loaded("x");
    assert!(matches!(
      doc.undo(),
      Err(DocumentError::History(HistoryError::NoHistory))
    ));
  }

  #[test]
  fn zero_width_delete_is_a_no_op() {
    let (mut doc, _dir) = loaded("x");
    let version = doc.version();
    let cursor = doc.delete(Range::point(Position::new(0, 1))).unwrap();
    assert_eq!(cursor, Position::new(0, 1));
    assert_eq!(doc.version(), version);
    assert!(doc.history().is_empty());
  }

  #[test]
  fn eol_round_trips_through_save() {
    let (mut doc, dir) = loaded("x\r\ny");
    assert_eq!(doc.line_ending(), LineEnding::Crlf);

    doc
      .replace(
        Range::new(Position::new(1, 0), Position::new(1, 1)),
        "z",
      )
      .unwrap();
    doc.write().unwrap();
    let path = dir.path().join("doc.txt");
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "x\r\nz");

    doc.undo().unwrap();
    doc.write().unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "x\r\ny");
  }

  #[test]
  fn save_keeps_history_and_resets_state() {
    let (mut doc, _dir) = loaded("x");
    doc.insert(Position::new(0, 1), "y").unwrap();
    doc.write().unwrap();
    assert_eq!(doc.state(), DocumentState::NotModified);

    doc.undo().unwrap();
    assert_eq!(doc.text(), "x");
    assert!(doc.is_modified());
  }

  #[test]
  fn failed_write_leaves_state_untouched() {
    let (mut doc, dir) = loaded("x");
    doc.insert(Position::new(0, 1), "y").unwrap();
    drop(dir);

    assert!(matches!(doc.write(), Err(DocumentError::Io(_))));
    assert!(doc.is_modified());
    doc.undo().unwrap();
    assert_eq!(doc.text(), "x");
  }

  #[test]
  fn history_bound_evicts_oldest() {
    let mut doc = Document::with_history_capacity(2);
    doc.load(None).unwrap();
    // Three non-mergeable edits: each insert lands at the line start,
    // away from the previous insert's end.
    for _ in 0..3 {
      doc.insert(Position::zero(), "ab").unwrap();
    }
    assert_eq!(doc.history().len(), 2);

    doc.undo().unwrap();
    doc.undo().unwrap();
    assert!(matches!(
      doc.undo(),
      Err(DocumentError::History(HistoryError::NoHistory))
    ));
    // The first insert is beyond reach.
    assert_eq!(doc.text(), "ab");
  }

  #[test]
  fn new_edit_destroys_redo_branch() {
    let (mut doc, _dir) = loaded("base");
    doc.insert(Position::zero(), "1 ").unwrap();
    doc.insert(Position::zero(), "2 ").unwrap();
    doc.undo().unwrap();

    doc.insert(Position::new(0, 6), "!").unwrap();
    assert!(matches!(
      doc.redo(),
      Err(DocumentError::History(HistoryError::NoHistory))
    ));
  }

  #[test]
  fn typed_run_compacts_to_one_item() {
    let (mut doc, _dir) = loaded("");
    doc.insert(Position::zero(), "a").unwrap();
    doc.insert(Position::new(0, 1), "b").unwrap();
    doc.insert(Position::new(0, 2), "c").unwrap();

    assert_eq!(doc.history().len(), 1);
    doc.undo().unwrap();
    assert_eq!(doc.text(), "");
    doc.redo().unwrap();
    assert_eq!(doc.text(), "abc");
  }

  #[test]
  fn backspace_run_compacts_to_one_item() {
    let (mut doc, _dir) = loaded("abc");
    doc
      .delete(Range::new(Position::new(0, 2), Position::new(0, 3)))
      .unwrap();
    doc
      .delete(Range::new(Position::new(0, 1), Position::new(0, 2)))
      .unwrap();
    doc
      .delete(Range::new(Position::zero(), Position::new(0, 1)))
      .unwrap();

    assert_eq!(doc.text(), "");
    assert_eq!(doc.history().len(), 1);

    let cursor = doc.undo().unwrap();
    assert_eq!(doc.text(), "abc");
    assert_eq!(cursor, Position::new(0, 3));
  }

  #[test]
  fn forward_delete_run_compacts_to_one_item() {
    let (mut doc, _dir) = loaded("abc");
    for _ in 0..3 {
      doc
        .delete(Range::new(Position::zero(), Position::new(0, 1)))
        .unwrap();
    }
    assert_eq!(doc.text(), "");
    assert_eq!(doc.history().len(), 1);

    doc.undo().unwrap();
    assert_eq!(doc.text(), "abc");
  }

  #[test]
  fn backspace_across_a_line_break_merges() {
    let (mut doc, _dir) = loaded("ab\ncd");
    // Backspace eats "c", then the line break.
    doc
      .delete(Range::new(Position::new(1, 0), Position::new(1, 1)))
      .unwrap();
    doc
      .delete(Range::new(Position::new(0, 2), Position::new(1, 0)))
      .unwrap();

    assert_eq!(doc.text(), "abd");
    assert_eq!(doc.history().len(), 1);
    doc.undo().unwrap();
    assert_eq!(doc.text(), "ab\ncd");
  }

  #[test]
  fn replaces_are_their_own_items() {
    let (mut doc, _dir) = loaded("abcd");
    doc
      .replace(Range::new(Position::zero(), Position::new(0, 1)), "x")
      .unwrap();
    doc
      .replace(Range::new(Position::new(0, 1), Position::new(0, 2)), "y")
      .unwrap();
    assert_eq!(doc.history().len(), 2);
  }

  #[test]
  fn identity_replace_still_records_history() {
    let (mut doc, _dir) = loaded("hello\nworld");
    let range = Range::new(Position::new(0, 1), Position::new(1, 2));
    let snapshot = doc.content(range);
    assert_eq!(snapshot, "ello\nwo");

    doc.replace(range, snapshot).unwrap();
    assert_eq!(doc.text(), "hello\nworld");
    assert_eq!(doc.history().len(), 1);
  }

  #[test]
  fn line_count_never_drops_to_zero() {
    let (mut doc, _dir) = loaded("only");
    doc
      .delete(Range::new(Position::zero(), Position::new(0, 4)))
      .unwrap();
    assert_eq!(doc.line_count(), 1);
    assert_eq!(doc.line(0), "");

    let (mut doc, _dir) = loaded("a\nb\nc");
    doc
      .delete(Range::new(Position::zero(), Position::new(2, 1)))
      .unwrap();
    assert_eq!(doc.line_count(), 1);
    doc.undo().unwrap();
    assert_eq!(doc.text(), "a\nb\nc");
  }

  #[test]
  fn clear_resets_everything() {
    let (mut doc, _dir) = loaded("some\ntext");
    doc.insert(Position::zero(), "more ").unwrap();
    doc.clear();

    assert_eq!(doc.line_count(), 1);
    assert_eq!(doc.line(0), "");
    assert_eq!(doc.state(), DocumentState::NotModified);
    assert!(doc.path().is_none());
    assert!(matches!(
      doc.undo(),
      Err(DocumentError::History(HistoryError::NoHistory))
    ));
  }

  #[test]
  fn version_increases_on_every_mutation() {
    let (mut doc, _dir) = loaded("x");
    let v0 = doc.version();
    doc.insert(Position::zero(), "a").unwrap();
    let v1 = doc.version();
    doc.undo().unwrap();
    let v2 = doc.version();
    doc.redo().unwrap();
    let v3 = doc.version();
    assert!(v0 < v1 && v1 < v2 && v2 < v3);
  }

  #[test]
  fn insert_descriptor_marks_pure_insertion() {
    let (mut doc, _dir) = loaded("ab\ncd");
    doc.insert(Position::new(1, 1), "X").unwrap();

    let edits = doc.take_syntax_edits();
    assert_eq!(edits.len(), 1);
    let edit = edits[0];
    assert_eq!(edit.start_byte, 4);
    assert_eq!(edit.old_end_byte, 4);
    assert_eq!(edit.new_end_byte, 5);
    assert_eq!(edit.start_point, Point::new(1, 1));
    assert_eq!(edit.old_end_point, Point::new(1, 1));
    assert_eq!(edit.new_end_point, Point::new(1, 2));

    // Drained: a second take sees nothing.
    assert!(doc.take_syntax_edits().is_empty());
  }

  #[test]
  fn delete_descriptor_marks_pure_deletion() {
    let (mut doc, _dir) = loaded("ab\ncd");
    doc
      .delete(Range::new(Position::new(0, 1), Position::new(1, 1)))
      .unwrap();

    let edits = doc.take_syntax_edits();
    assert_eq!(edits.len(), 1);
    let edit = edits[0];
    assert_eq!(edit.start_byte, 1);
    assert_eq!(edit.old_end_byte, 4);
    assert_eq!(edit.new_end_byte, 1);
    assert_eq!(edit.start_point, Point::new(0, 1));
    assert_eq!(edit.old_end_point, Point::new(1, 1));
    assert_eq!(edit.new_end_point, Point::new(0, 1));
  }

  #[test]
  fn replace_descriptor_composes_both_ends() {
    let (mut doc, _dir) = loaded("abcd");
    doc
      .replace(Range::new(Position::zero(), Position::new(0, 2)), "q\nr")
      .unwrap();

    assert_eq!(doc.text(), "q\nrcd");
    let edits = doc.take_syntax_edits();
    assert_eq!(edits.len(), 1);
    let edit = edits[0];
    assert_eq!(edit.start_byte, 0);
    assert_eq!(edit.old_end_byte, 2);
    assert_eq!(edit.new_end_byte, 3);
    assert_eq!(edit.old_end_point, Point::new(0, 2));
    assert_eq!(edit.new_end_point, Point::new(1, 1));
  }

  #[test]
  fn undo_and_redo_also_feed_the_syntax_engine() {
    let (mut doc, _dir) = loaded("ab");
    doc.insert(Position::new(0, 2), "c").unwrap();
    doc.take_syntax_edits();

    doc.undo().unwrap();
    let edits = doc.take_syntax_edits();
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].old_end_byte, 3);
    assert_eq!(edits[0].new_end_byte, 2);
  }

  #[test]
  fn descriptor_offsets_survive_edits_on_earlier_lines() {
    let (mut doc, _dir) = loaded("aa\nbb\ncc");
    doc.insert(Position::new(2, 0), "X").unwrap();
    assert_eq!(doc.take_syntax_edits()[0].start_byte, 6);

    // Growing line 0 invalidates every cached offset after it.
    doc.insert(Position::zero(), "Y").unwrap();
    assert_eq!(doc.take_syntax_edits()[0].start_byte, 0);

    doc.insert(Position::new(2, 1), "Z").unwrap();
    assert_eq!(doc.take_syntax_edits()[0].start_byte, 8);
  }

  #[test]
  fn chunk_at_serves_line_suffixes() {
    let (doc, _dir) = loaded("ab\ncd");
    assert_eq!(doc.chunk_at(Point::new(0, 0)), Some("ab"));
    assert_eq!(doc.chunk_at(Point::new(1, 1)), Some("d"));
    assert_eq!(doc.chunk_at(Point::new(1, 2)), Some(""));
    assert_eq!(doc.chunk_at(Point::new(2, 0)), None);
  }

  #[test]
  fn clamp_position_revalidates_stale_cursors() {
    let (doc, _dir) = loaded("aéb");
    assert_eq!(doc.clamp_position(Position::new(5, 10)), Position::new(0, 4));
    // Offset 2 splits the two-byte "é"; snap back to its start.
    assert_eq!(doc.clamp_position(Position::new(0, 2)), Position::new(0, 1));
  }

  #[test]
  fn content_spans_multiple_lines() {
    let (doc, _dir) = loaded("one\ntwo\nthree");
    let range = Range::new(Position::new(0, 1), Position::new(2, 2));
    assert_eq!(doc.content(range), "ne\ntwo\nth");
    assert_eq!(doc.content(Range::point(Position::new(1, 1))), "");
  }

  quickcheck::quickcheck! {
    fn undo_all_restores_loaded_text(ops: Vec<(usize, usize, String)>) -> bool {
      let (mut doc, _dir) = loaded("alpha\nbeta\ngamma");
      let before = doc.text();

      for (a, b, text) in ops {
        let p1 = doc.clamp_position(Position::new(a % doc.line_count(), b));
        let p2 = doc.clamp_position(Position::new(b % doc.line_count(), a));
        let (begin, end) = if p1 <= p2 { (p1, p2) } else { (p2, p1) };
        let text: String = text
          .chars()
          .filter(|c| c.is_ascii_alphanumeric() || *c == '\n')
          .take(8)
          .collect();
        doc.replace(Range::new(begin, end), text).unwrap();
      }

      let after = doc.text();
      while doc.undo().is_ok() {}
      let restored = doc.text() == before;
      while doc.redo().is_ok() {}
      restored && doc.text() == after && doc.line_count() >= 1
    }
  }
}
