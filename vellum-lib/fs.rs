//! Persistence gateway: line-oriented reads and durable atomic writes.
//!
//! Writes go through a temporary sibling that is flushed, synced, and
//! then renamed over the target, so a crash or a failed write never
//! leaves the original file partially overwritten.

use std::{
  io::{
    self,
    BufRead,
    BufReader,
    Read,
    Write,
  },
  path::Path,
};

use tempfile::NamedTempFile;
use vellum_core::line_ending::LineEnding;

/// Read `file` into terminator-free lines, detecting the line-ending
/// style from the first terminator seen (a `\r` immediately before the
/// `\n` means CRLF, else LF).
///
/// N terminators yield N + 1 lines: a trailing terminator produces a
/// final empty line, so serializing the lines joined by the detected
/// ending round-trips byte for byte. An empty input yields one empty
/// line, never zero.
pub fn read_lines<R: Read>(file: R) -> io::Result<(Vec<String>, Option<LineEnding>)> {
  let mut reader = BufReader::new(file);
  let mut lines = Vec::new();
  let mut detected = None;
  let mut buf = Vec::new();
  // An empty input still yields one (empty) line.
  let mut ended_with_terminator = true;

  loop {
    buf.clear();
    if reader.read_until(b'\n', &mut buf)? == 0 {
      break;
    }
    ended_with_terminator = buf.last() == Some(&b'\n');
    if ended_with_terminator {
      buf.pop();
      let crlf = buf.last() == Some(&b'\r');
      if crlf {
        buf.pop();
      }
      if detected.is_none() {
        detected = Some(if crlf { LineEnding::Crlf } else { LineEnding::LF });
      }
    }
    let line = String::from_utf8(std::mem::take(&mut buf))
      .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    lines.push(line);
  }

  if ended_with_terminator {
    lines.push(String::new());
  }
  Ok((lines, detected))
}

/// Durably write `content` to `path`: write a temporary file in the
/// target's directory, flush it, sync it to stable storage, then
/// atomically rename it over the target.
pub fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
  let dir = match path.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent,
    _ => Path::new("."),
  };
  let mut tmp = NamedTempFile::new_in(dir)?;
  tmp.write_all(content)?;
  tmp.flush()?;
  tmp.as_file().sync_all()?;
  tmp.persist(path).map_err(|err| err.error)?;
  Ok(())
}
