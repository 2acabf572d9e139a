//! Byte-level decoding
//!
//!     The decoder is the only stage that sees raw bytes. It runs the whole-buffer checks up
//!     front (size ceiling, byte-order mark, UTF-8 validity, foreign line terminators) and then
//!     hands out a lazy iterator of [`Line`]s that borrow from the input. Nothing is copied: the
//!     grammar parser consumes the lines one at a time in a single forward pass.

use super::line_classification::{classify, LineKind};
use crate::soul::ast::{Abort, FatalKind};
use crate::soul::options::Mode;

/// Maximum characters per line, counting the terminating line feed
pub const MAX_LINE_CHARS: usize = 4096;

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Terminators other than `\n` that are rejected anywhere in the file
const FOREIGN_TERMINATORS: &[char] = &['\r', '\u{0085}', '\u{2028}', '\u{2029}'];

/// One decoded line, tagged with its 1-based number and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    pub number: usize,
    /// Line text without its terminator
    pub text: &'a str,
    pub terminated: bool,
    pub kind: LineKind,
}

impl<'a> Line<'a> {
    /// Length in characters, terminator included
    pub fn char_len(&self) -> usize {
        self.text.chars().count() + usize::from(self.terminated)
    }

    /// Comments and blank lines are passed through, never interpreted
    pub fn is_pass_through(&self) -> bool {
        matches!(self.kind, LineKind::Blank | LineKind::Comment)
    }
}

/// Validate the buffer and return its line stream.
pub fn decode(bytes: &[u8], mode: Mode) -> Result<Lines<'_>, Abort> {
    let limit = mode.size_ceiling();
    if bytes.len() > limit {
        return Err(FatalKind::Oversize {
            size: bytes.len(),
            limit,
        }
        .into());
    }

    if bytes.starts_with(BOM) {
        return Err(Abort::new(FatalKind::Encoding(
            "byte-order mark is not allowed".to_string(),
        ))
        .at_line(1));
    }

    let source = std::str::from_utf8(bytes).map_err(|e| {
        let offset = e.valid_up_to();
        let line = line_at(&bytes[..offset]);
        Abort::new(FatalKind::Encoding(format!(
            "invalid UTF-8 at byte offset {offset}"
        )))
        .at_line(line)
    })?;

    if let Some(offset) = source.find(FOREIGN_TERMINATORS) {
        let line = line_at(&bytes[..offset]);
        return Err(Abort::new(FatalKind::LineEnding { line }).at_line(line));
    }

    Ok(Lines {
        rest: source,
        number: 0,
    })
}

/// 1-based number of the line containing the end of `prefix`
fn line_at(prefix: &[u8]) -> usize {
    prefix.iter().filter(|&&b| b == b'\n').count() + 1
}

/// Lazy, borrowing iterator over the lines of a decoded buffer
#[derive(Debug, Clone)]
pub struct Lines<'a> {
    rest: &'a str,
    number: usize,
}

impl<'a> Iterator for Lines<'a> {
    type Item = Line<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let (text, terminated) = match self.rest.find('\n') {
            Some(end) => {
                let text = &self.rest[..end];
                self.rest = &self.rest[end + 1..];
                (text, true)
            }
            None => {
                let text = self.rest;
                self.rest = "";
                (text, false)
            }
        };
        self.number += 1;

        // Byte length bounds the char count, so only long lines pay for counting
        let overlong = text.len() + usize::from(terminated) > MAX_LINE_CHARS
            && text.chars().count() + usize::from(terminated) > MAX_LINE_CHARS;
        let kind = if overlong {
            LineKind::Overlong
        } else {
            classify(text)
        };

        Some(Line {
            number: self.number,
            text,
            terminated,
            kind,
        })
    }
}
