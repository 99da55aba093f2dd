//! Host-side document handles and the edits they report.

use std::fmt;
use std::path::PathBuf;

use ropey::Rope;

use crate::{Listener, OffsetEncoding, Result, Subscription, char_to_lsp_position};

/// Host-assigned key identifying one document handle for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(pub u64);

impl fmt::Display for DocumentId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "doc#{}", self.0)
	}
}

/// A position in host coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextPoint {
	/// Zero-based row.
	pub row: u32,
	/// Zero-based column, in the negotiated offset encoding's units.
	pub column: u32,
}

impl TextPoint {
	/// Creates a new point.
	pub const fn new(row: u32, column: u32) -> Self {
		Self { row, column }
	}
}

/// A range in host coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextRange {
	/// Start point (inclusive).
	pub start: TextPoint,
	/// End point (exclusive).
	pub end: TextPoint,
}

impl TextRange {
	/// Creates a new range.
	pub const fn new(start: TextPoint, end: TextPoint) -> Self {
		Self { start, end }
	}

	/// Creates a zero-length range at a point.
	pub const fn point(point: TextPoint) -> Self {
		Self { start: point, end: point }
	}
}

impl From<TextPoint> for lsp_types::Position {
	fn from(point: TextPoint) -> Self {
		Self {
			line: point.row,
			character: point.column,
		}
	}
}

impl From<TextRange> for lsp_types::Range {
	fn from(range: TextRange) -> Self {
		Self {
			start: range.start.into(),
			end: range.end.into(),
		}
	}
}

/// One edit of a change batch, positioned against the text before the batch was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
	/// The replaced range (pre-change positions).
	pub old_range: TextRange,
	/// The text that used to occupy `old_range`.
	pub old_text: String,
	/// The text that replaced it.
	pub new_text: String,
}

impl TextEdit {
	/// Creates a new edit.
	pub fn new(old_range: TextRange, old_text: impl Into<String>, new_text: impl Into<String>) -> Self {
		Self {
			old_range,
			old_text: old_text.into(),
			new_text: new_text.into(),
		}
	}

	/// Build an edit replacing chars `start..end` of `before` with `new_text`.
	///
	/// Points are computed in `encoding`. Returns `None` if the range is out of bounds.
	pub fn from_char_range(before: &Rope, start: usize, end: usize, new_text: impl Into<String>, encoding: OffsetEncoding) -> Option<Self> {
		if start > end {
			return None;
		}
		let start_pos = char_to_lsp_position(before, start, encoding)?;
		let end_pos = char_to_lsp_position(before, end, encoding)?;
		Some(Self {
			old_range: TextRange::new(
				TextPoint::new(start_pos.line, start_pos.character),
				TextPoint::new(end_pos.line, end_pos.character),
			),
			old_text: before.slice(start..end).to_string(),
			new_text: new_text.into(),
		})
	}
}

/// The edits a host reports together in one change notification.
///
/// A batch maps to exactly one `textDocument/didChange`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChangeBatch {
	/// Edits in the order the host applied them.
	pub edits: Vec<TextEdit>,
}

impl ChangeBatch {
	/// Creates a batch from edits.
	pub fn new(edits: Vec<TextEdit>) -> Self {
		Self { edits }
	}

	/// Number of edits.
	pub fn len(&self) -> usize {
		self.edits.len()
	}

	/// Whether the batch carries no edits.
	pub fn is_empty(&self) -> bool {
		self.edits.is_empty()
	}

	/// Iterate over the edits in order.
	pub fn iter(&self) -> std::slice::Iter<'_, TextEdit> {
		self.edits.iter()
	}
}

impl From<Vec<TextEdit>> for ChangeBatch {
	fn from(edits: Vec<TextEdit>) -> Self {
		Self::new(edits)
	}
}

impl FromIterator<TextEdit> for ChangeBatch {
	fn from_iter<I: IntoIterator<Item = TextEdit>>(iter: I) -> Self {
		Self::new(iter.into_iter().collect())
	}
}

/// A host-owned mutable text buffer.
///
/// Handles are cheap to clone (typically an `Rc` around the host's buffer). The sync core
/// keeps a clone for the life of a session but never stores the text itself.
pub trait DocumentHandle: Clone + 'static {
	/// Stable key for this handle.
	fn id(&self) -> DocumentId;

	/// Current full text.
	fn text(&self) -> String;

	/// Persisted location, absent until the document is first saved.
	fn path(&self) -> Option<PathBuf>;

	/// Language or grammar name as the host knows it.
	fn grammar(&self) -> String;

	/// Subscribe to change batches.
	fn on_did_change(&self, listener: Listener<ChangeBatch>) -> Subscription;

	/// Subscribe to saves.
	fn on_did_save(&self, listener: Listener<()>) -> Subscription;

	/// Subscribe to destruction. Fires once, before the host releases the handle.
	fn on_did_destroy(&self, listener: Listener<()>) -> Subscription;
}

/// The host's stream of document handles.
pub trait DocumentHost {
	/// Handle type produced by this host.
	type Handle: DocumentHandle;

	/// Deliver every existing handle to `listener` now, then every new handle as it is created.
	///
	/// Errors from the immediate deliveries are returned; later ones surface through the
	/// host's own dispatch.
	fn observe_documents(&self, listener: Listener<Self::Handle>) -> Result<Subscription>;
}
