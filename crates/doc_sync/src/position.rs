//! Char offset to LSP position conversion over [`Rope`] text.

use lsp_types::{Position, Range};
use ropey::Rope;

use crate::OffsetEncoding;

/// Convert a char index in `text` to an LSP position in the given encoding.
///
/// Returns `None` if `char_idx` is past the end of the text.
pub fn char_to_lsp_position(text: &Rope, char_idx: usize, encoding: OffsetEncoding) -> Option<Position> {
	if char_idx > text.len_chars() {
		return None;
	}

	let line = text.char_to_line(char_idx);
	let line_start = text.line_to_char(line);
	let character: usize = text.slice(line_start..char_idx).chars().map(|ch| encoding.char_len(ch)).sum();

	Some(Position {
		line: u32::try_from(line).ok()?,
		character: u32::try_from(character).ok()?,
	})
}

/// Convert a char range in `text` to an LSP range in the given encoding.
///
/// Returns `None` if either end is out of bounds or `start > end`.
pub fn char_range_to_lsp_range(text: &Rope, start: usize, end: usize, encoding: OffsetEncoding) -> Option<Range> {
	if start > end {
		return None;
	}
	Some(Range {
		start: char_to_lsp_position(text, start, encoding)?,
		end: char_to_lsp_position(text, end, encoding)?,
	})
}
