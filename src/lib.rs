//! edc-stream: streaming client for Enterprise Data Collector activity feeds.
//!
//! A collector delivers activities as one long-lived, chunked HTTP body of
//! `<entry>...</entry>` XML records. Network chunks split records
//! arbitrarily and are interleaved with empty keep-alive heartbeats. This
//! crate reassembles complete records from that byte stream, decodes them,
//! and stores them as one file per record or as rows in SQLite.
//!
//! # Quick Start
//!
//! ```rust
//! use edc_stream::parser::Reassembler;
//!
//! let mut reassembler = Reassembler::new();
//! assert!(reassembler.feed(b"<entry><id>1</").records.is_empty());
//! assert!(reassembler.feed(b"").is_heartbeat());
//!
//! let feed = reassembler.feed(b"id></entry>");
//! assert_eq!(feed.records[0].as_bytes(), b"<entry><id>1</id></entry>");
//! ```
//!
//! # Architecture
//!
//! - [`parser`]: record boundary detection and chunk reassembly
//! - [`decode`]: record decoding, depth chosen by storage mode
//! - [`sink`]: file and SQLite destinations
//! - [`session`]: HTTP connection and the receive → decode → store pipeline
//! - [`config`]: TOML configuration and credentials
//! - [`model`]: records, activities and storage modes
//! - [`cli`]: command-line interface
//! - [`error`]: error types and exit codes

#![doc(html_root_url = "https://docs.rs/edc-stream/0.1.0")]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod cli;
pub mod config;
pub mod decode;
pub mod error;
pub mod model;
pub mod parser;
pub mod session;
pub mod sink;
pub mod util;

// Re-export commonly used types at the crate root
pub use error::{EdcError, Result};
pub use model::{DecodedRecord, Record, StorageMode};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{Config, StreamConfig};
    pub use crate::decode::RecordDecoder;
    pub use crate::error::{EdcError, Result};
    pub use crate::model::{Activity, DecodedRecord, RawRecord, Record, StorageMode};
    pub use crate::parser::{Feed, Reassembler};
    pub use crate::session::{SessionReport, SessionSettings, StreamSession};
    pub use crate::sink::{open_sink, FileSink, Sink, SqliteSink};
}
