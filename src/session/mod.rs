//! Stream sessions: network bytes → reassembler → decoder → sink.
//!
//! A [`StreamSession`] owns everything one configured stream needs: its
//! immutable [`SessionSettings`], a [`Reassembler`] and a sink. The receive
//! loop reassembles and decodes on the async task; decoded records go over
//! a bounded channel to a blocking worker that owns the sink, so slow
//! database or file I/O does not stall reading the next chunk. One worker
//! per session keeps records in arrival order.
//!
//! Sessions share no mutable state and may run concurrently.
//!
//! ```rust,no_run
//! use edc_stream::config::Config;
//! use edc_stream::session::{SessionSettings, StreamSession};
//! use edc_stream::sink::open_sink;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> edc_stream::Result<()> {
//! let config = Config::load(None)?;
//! config.validate()?;
//! let stream = config.stream(None)?;
//!
//! let session = StreamSession::new(
//!     SessionSettings::from_config(&config, stream)?,
//!     open_sink(&config, stream)?,
//! );
//! let report = session.run(CancellationToken::new()).await?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

mod http;

pub use http::StreamClient;

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::{Config, Credentials, StreamConfig};
use crate::decode::RecordDecoder;
use crate::error::{preview, EdcError, Result};
use crate::model::{DecodedRecord, Record, StorageMode};
use crate::parser::Reassembler;
use crate::sink::Sink;

/// Immutable per-session settings.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Publisher name written with every stored record.
    pub publisher: String,
    /// Storage mode, which also selects decoding depth.
    pub storage: StorageMode,
    /// Streaming endpoint URL.
    pub endpoint: String,
    /// Basic-auth credentials.
    pub credentials: Credentials,
    /// Maximum wait for the next chunk; `None` waits forever.
    pub idle_timeout: Option<Duration>,
    /// Capacity of the decoder → sink queue.
    pub channel_capacity: usize,
}

impl SessionSettings {
    /// Derive settings for one configured stream.
    pub fn from_config(config: &Config, stream: &StreamConfig) -> Result<Self> {
        Ok(Self {
            publisher: stream.publisher().to_string(),
            storage: config.edc.storage,
            endpoint: config.endpoint(stream)?,
            credentials: config.account.credentials()?,
            idle_timeout: config.edc.idle_timeout()?,
            channel_capacity: config.edc.channel_capacity.max(1),
        })
    }
}

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionEnd {
    /// The server (or byte source) ended the stream.
    #[default]
    Closed,
    /// The caller cancelled.
    Cancelled,
}

/// Counters for a finished session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// Why the session stopped.
    pub end: SessionEnd,
    /// Data chunks received.
    pub data_chunks: u64,
    /// Heartbeats received.
    pub heartbeats: u64,
    /// Payload bytes received.
    pub bytes_received: u64,
    /// Complete records reassembled.
    pub records: u64,
    /// Records that failed to decode.
    pub decode_failures: u64,
    /// Records stored by the sink.
    pub written: u64,
    /// Records the sink failed to store.
    pub write_failures: u64,
    /// Bytes of an incomplete record dropped at shutdown.
    pub discarded_bytes: u64,
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records ({} written, {} not written, {} malformed), {} chunks, {} heartbeats, {} bytes",
            self.records,
            self.written,
            self.write_failures,
            self.decode_failures,
            self.data_chunks,
            self.heartbeats,
            self.bytes_received
        )?;
        if self.discarded_bytes > 0 {
            write!(f, ", {} bytes of incomplete record discarded", self.discarded_bytes)?;
        }
        if self.end == SessionEnd::Cancelled {
            f.write_str(" (cancelled)")?;
        }
        Ok(())
    }
}

/// One configured stream, from connection to sink.
pub struct StreamSession {
    settings: SessionSettings,
    sink: Box<dyn Sink>,
}

impl StreamSession {
    /// Create a session writing to `sink`.
    pub fn new(settings: SessionSettings, sink: Box<dyn Sink>) -> Self {
        Self { settings, sink }
    }

    /// Session settings.
    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Connect to the endpoint and process the stream until it closes or
    /// `cancel` fires.
    ///
    /// Connection failures are returned to the caller; there is no
    /// reconnect.
    pub async fn run(self, cancel: CancellationToken) -> Result<SessionReport> {
        let client = StreamClient::new()?;
        info!(
            publisher = %self.settings.publisher,
            endpoint = %self.settings.endpoint,
            storage = %self.settings.storage,
            "connecting to stream"
        );

        let chunks = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return Ok(SessionReport {
                    end: SessionEnd::Cancelled,
                    ..SessionReport::default()
                });
            }
            opened = client.open(&self.settings.endpoint, &self.settings.credentials) => opened?,
        };

        info!(publisher = %self.settings.publisher, "stream connected");
        self.run_stream(chunks, cancel).await
    }

    /// Process an already-open chunk stream.
    ///
    /// Used by [`run`](Self::run) and for offline replay of captured
    /// streams. Malformed records and failed writes are logged and counted;
    /// only transport errors, the idle timeout, or a dead sink worker end
    /// the session with an error. Records decoded before such an error are
    /// still handed to the sink.
    pub async fn run_stream<S, E>(self, chunks: S, cancel: CancellationToken) -> Result<SessionReport>
    where
        S: Stream<Item = std::result::Result<Bytes, E>>,
        E: Into<EdcError>,
    {
        let Self { settings, sink } = self;
        let publisher = settings.publisher.clone();

        let (tx, rx) = mpsc::channel::<DecodedRecord>(settings.channel_capacity);
        let worker_publisher = publisher.clone();
        let worker = tokio::task::spawn_blocking(move || drain_into_sink(sink, rx, &worker_publisher));

        let mut chunks = std::pin::pin!(chunks);
        let mut reassembler = Reassembler::new();
        let decoder = RecordDecoder::new(settings.storage);
        let mut decode_failures = 0u64;

        let outcome: Result<SessionEnd> = loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => break Ok(SessionEnd::Cancelled),
                next = next_chunk(&mut chunks, settings.idle_timeout) => next,
            };

            let chunk = match next {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break Ok(SessionEnd::Closed),
                Err(e) => break Err(e),
            };

            let feed = reassembler.feed(&chunk);
            if feed.is_heartbeat() {
                info!(publisher = %publisher, at = %Utc::now().to_rfc3339(), "heartbeat received");
                continue;
            }
            trace!(
                bytes = chunk.len(),
                records = feed.records.len(),
                buffered = reassembler.buffered_len(),
                "data chunk"
            );

            let mut worker_gone = false;
            for record in feed.records {
                let Some(decoded) = decode_or_log(&decoder, &record, &publisher) else {
                    decode_failures += 1;
                    continue;
                };
                // Cancellation is only observed between chunks; every
                // complete record of this chunk reaches the sink.
                if tx.send(decoded).await.is_err() {
                    worker_gone = true;
                    break;
                }
            }
            if worker_gone {
                break Err(EdcError::sink(publisher.clone(), "sink worker stopped"));
            }
        };

        drop(tx);
        let tally = worker
            .await
            .map_err(|e| EdcError::internal(format!("sink worker for {publisher} failed: {e}")))?;

        let discarded = reassembler.finish();
        if discarded > 0 {
            debug!(publisher = %publisher, bytes = discarded, "discarding incomplete record at shutdown");
        }

        let stats = reassembler.stats();
        let report = SessionReport {
            end: SessionEnd::Closed,
            data_chunks: stats.data_chunks,
            heartbeats: stats.heartbeats,
            bytes_received: stats.bytes_received,
            records: stats.records_emitted,
            decode_failures,
            written: tally.written,
            write_failures: tally.failed,
            discarded_bytes: discarded as u64,
        };

        match outcome {
            Ok(end) => {
                let report = SessionReport { end, ..report };
                info!(publisher = %publisher, "session finished: {report}");
                Ok(report)
            }
            Err(e) => {
                warn!(publisher = %publisher, error = %e, "session failed: {report}");
                Err(e)
            }
        }
    }
}

impl fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSession")
            .field("settings", &self.settings)
            .field("sink", &self.sink.name())
            .finish()
    }
}

/// Lazily reassemble a chunk stream into records.
///
/// Heartbeats are skipped. A transport error is yielded once and ends the
/// sequence; an incomplete trailing record is dropped.
pub fn record_stream<S, E>(chunks: S) -> impl Stream<Item = Result<Record>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: Into<EdcError>,
{
    let state = (chunks, Reassembler::new(), VecDeque::new(), false);
    futures::stream::unfold(state, |(mut chunks, mut reassembler, mut pending, done)| async move {
        loop {
            if let Some(record) = pending.pop_front() {
                return Some((Ok(record), (chunks, reassembler, pending, done)));
            }
            if done {
                return None;
            }
            match chunks.next().await {
                Some(Ok(chunk)) => pending.extend(reassembler.feed(&chunk).records),
                Some(Err(e)) => return Some((Err(e.into()), (chunks, reassembler, pending, true))),
                None => return None,
            }
        }
    })
}

async fn next_chunk<S, E>(
    chunks: &mut std::pin::Pin<&mut S>,
    idle_timeout: Option<Duration>,
) -> Result<Option<Bytes>>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Into<EdcError>,
{
    let next = match idle_timeout {
        Some(limit) => tokio::time::timeout(limit, chunks.next())
            .await
            .map_err(|_| EdcError::Timeout {
                duration_ms: limit.as_millis() as u64,
            })?,
        None => chunks.next().await,
    };
    next.transpose().map_err(Into::into)
}

fn decode_or_log(decoder: &RecordDecoder, record: &Record, publisher: &str) -> Option<DecodedRecord> {
    match decoder.decode(record) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            let raw = String::from_utf8_lossy(record.as_bytes());
            warn!(publisher, record = %preview(&raw), error = %e, "dropping malformed record");
            debug!(publisher, raw = %raw, "malformed record text");
            None
        }
    }
}

#[derive(Debug, Default)]
struct SinkTally {
    written: u64,
    failed: u64,
}

fn drain_into_sink(
    mut sink: Box<dyn Sink>,
    mut rx: mpsc::Receiver<DecodedRecord>,
    publisher: &str,
) -> SinkTally {
    let mut tally = SinkTally::default();
    while let Some(record) = rx.blocking_recv() {
        match sink.store(&record) {
            Ok(()) => {
                tally.written += 1;
                info!(publisher, id = %record.label(), sink = sink.name(), "activity written");
            }
            Err(e) => {
                tally.failed += 1;
                warn!(publisher, id = %record.label(), sink = sink.name(), error = %e, "activity not written");
                debug!(publisher, raw = %record.raw_content(), "unwritten record text");
            }
        }
    }
    tally
}
