//! Record boundary detection and stream reassembly.
//!
//! The activity feed is a continuous run of `<entry ...>...</entry>`
//! payloads with no framing beyond the tags themselves. This module finds
//! those payloads in an arbitrarily chunked byte stream:
//!
//! - [`find_record`] / [`scan`]: pure boundary detection over a buffer
//! - [`Reassembler`]: owns the buffer, accepts chunks, yields complete records
//!
//! # Example
//!
//! ```rust
//! use edc_stream::parser::Reassembler;
//!
//! let mut reassembler = Reassembler::new();
//! assert!(reassembler.feed(b"<entry><id>1</").records.is_empty());
//!
//! let feed = reassembler.feed(b"id></entry><entry><id>2</id></entry>");
//! assert_eq!(feed.records.len(), 2);
//! assert_eq!(feed.records[0].text()?, "<entry><id>1</id></entry>");
//! assert_eq!(reassembler.buffered_len(), 0);
//! # Ok::<(), edc_stream::EdcError>(())
//! ```
//!
//! # Limitations
//!
//! Detection is a flat literal-substring scan, not an XML tokenizer. The
//! first open marker is paired with the first close marker after it, so a
//! nested `<entry>` element or a marker inside a CDATA section or comment
//! would split a record in the wrong place. The activity schema never nests
//! `entry` elements.

mod streaming;

pub use streaming::*;

use std::ops::Range;

use bstr::ByteSlice;

/// Literal that opens a record. Matches `<entry>` as well as `<entry xmlns=...>`.
pub const OPEN_MARKER: &[u8] = b"<entry";

/// Literal that closes a record.
pub const CLOSE_MARKER: &[u8] = b"</entry>";

/// Where to resume scanning a buffer that has only grown since the last scan.
///
/// A hint is only valid for the buffer it was produced from, extended at
/// the end. Any removal from the front invalidates it; use
/// [`ScanHint::default`] to scan from the beginning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanHint {
    open_from: usize,
    close_from: usize,
}

/// Find the first complete record in `buf`.
///
/// Returns the `[start, end)` span of the first open marker through the end
/// of the first close marker that follows it. Both markers are included, so
/// the span is directly parseable XML. A close marker with no open marker
/// before it is stray data and is ignored.
#[must_use]
pub fn find_record(buf: &[u8]) -> Option<Range<usize>> {
    scan(buf, ScanHint::default()).ok()
}

/// Incremental form of [`find_record`].
///
/// On failure returns the hint to pass on the next call once more bytes
/// have been appended, so bytes already searched are not searched again.
pub fn scan(buf: &[u8], hint: ScanHint) -> Result<Range<usize>, ScanHint> {
    let open_from = hint.open_from.min(buf.len());
    let Some(found) = buf[open_from..].find(OPEN_MARKER) else {
        return Err(ScanHint {
            open_from: resume_point(buf.len(), OPEN_MARKER),
            close_from: 0,
        });
    };

    let start = open_from + found;
    let body = start + OPEN_MARKER.len();
    let close_from = hint.close_from.max(body).min(buf.len());

    match buf[close_from..].find(CLOSE_MARKER) {
        Some(found) => Ok(start..close_from + found + CLOSE_MARKER.len()),
        None => Err(ScanHint {
            open_from: start,
            close_from: resume_point(buf.len(), CLOSE_MARKER).max(body),
        }),
    }
}

/// Earliest offset at which a marker could still complete once more bytes
/// arrive: the tail may hold a marker prefix.
fn resume_point(len: usize, marker: &[u8]) -> usize {
    len.saturating_sub(marker.len() - 1)
}
