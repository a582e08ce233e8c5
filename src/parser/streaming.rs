//! Chunk-at-a-time reassembly of activity records.

use bstr::ByteSlice;
use bytes::Bytes;
use tracing::trace;

use super::{scan, ScanHint, OPEN_MARKER};
use crate::model::Record;

/// How a received chunk was treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// Empty or whitespace-only keep-alive; not added to the buffer.
    Heartbeat,
    /// Payload bytes appended to the buffer.
    Data,
}

/// Result of feeding one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    /// Classification of the chunk.
    pub kind: ChunkKind,
    /// Records completed by this chunk, in arrival order.
    pub records: Vec<Record>,
}

impl Feed {
    fn heartbeat() -> Self {
        Self {
            kind: ChunkKind::Heartbeat,
            records: Vec::new(),
        }
    }

    /// Whether the chunk was a heartbeat.
    #[must_use]
    pub fn is_heartbeat(&self) -> bool {
        self.kind == ChunkKind::Heartbeat
    }
}

/// Counters describing everything a reassembler has seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReassemblerStats {
    /// Data chunks appended to the buffer.
    pub data_chunks: u64,
    /// Heartbeat chunks.
    pub heartbeats: u64,
    /// Bytes appended to the buffer.
    pub bytes_received: u64,
    /// Records emitted.
    pub records_emitted: u64,
    /// Bytes skipped because they preceded a record's open marker.
    pub noise_bytes: u64,
    /// Largest buffer size observed after a feed.
    pub peak_buffered: usize,
}

/// Stateful buffer that turns arbitrary chunks into complete records.
///
/// After every [`feed`](Self::feed) the buffer holds no complete record:
/// only a record prefix, noise that has not yet been followed by a record,
/// or nothing. The buffer is bounded by the largest gap between two
/// consecutive complete records; there is no cap.
#[derive(Debug, Default)]
pub struct Reassembler {
    buffer: Vec<u8>,
    hint: ScanHint,
    stats: ReassemblerStats,
}

impl Reassembler {
    /// Create an empty reassembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a reassembler with a pre-sized buffer.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Append a chunk and return every record it completes.
    ///
    /// Empty chunks are heartbeats. Whitespace-only chunks are heartbeats
    /// too, unless a record has been opened and not yet closed, in which
    /// case the whitespace belongs to that record and is kept.
    pub fn feed(&mut self, chunk: &[u8]) -> Feed {
        if self.is_heartbeat(chunk) {
            self.stats.heartbeats += 1;
            return Feed::heartbeat();
        }

        self.stats.data_chunks += 1;
        self.stats.bytes_received += chunk.len() as u64;
        self.buffer.extend_from_slice(chunk);

        let mut records = Vec::new();
        let mut consumed = 0;
        let mut hint = self.hint;
        loop {
            match scan(&self.buffer[consumed..], hint) {
                Ok(span) => {
                    let start = consumed + span.start;
                    let end = consumed + span.end;
                    trace!(bytes = end - start, "record complete");
                    records.push(Record::new(Bytes::copy_from_slice(
                        &self.buffer[start..end],
                    )));
                    self.stats.noise_bytes += span.start as u64;
                    consumed = end;
                    hint = ScanHint::default();
                }
                Err(next) => {
                    // The failed scan ran over exactly what remains after
                    // draining, so its hint stays valid.
                    hint = next;
                    break;
                }
            }
        }

        self.buffer.drain(..consumed);
        self.hint = hint;
        self.stats.records_emitted += records.len() as u64;
        self.stats.peak_buffered = self.stats.peak_buffered.max(self.buffer.len());

        Feed {
            kind: ChunkKind::Data,
            records,
        }
    }

    /// Bytes currently retained.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes currently retained, for inspection.
    #[must_use]
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Whether an open marker is waiting for its close marker.
    #[must_use]
    pub fn in_record(&self) -> bool {
        self.buffer.find(OPEN_MARKER).is_some()
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> ReassemblerStats {
        self.stats
    }

    /// Drop whatever is buffered and return how many bytes were discarded.
    ///
    /// Used at shutdown: a record still open when the stream ends can never
    /// complete.
    pub fn finish(&mut self) -> usize {
        let discarded = self.buffer.len();
        self.buffer.clear();
        self.hint = ScanHint::default();
        discarded
    }

    fn is_heartbeat(&self, chunk: &[u8]) -> bool {
        chunk.is_empty()
            || (chunk.iter().all(u8::is_ascii_whitespace) && !self.in_record())
    }
}
