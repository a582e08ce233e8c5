//! Storage destinations for decoded records.
//!
//! Two sinks exist, selected by `edc.storage`:
//! - [`FileSink`]: one `<identifier>.xml` file per record, overwritten on repeat
//! - [`SqliteSink`]: one row per identifier, replaced on repeat
//!
//! A store either fully succeeds or leaves nothing behind: files are written
//! atomically and each row is a single statement.

mod file;
mod sqlite;

pub use file::FileSink;
pub use sqlite::{normalize_posted_time, SqliteSink};

use crate::config::{Config, StreamConfig};
use crate::error::{EdcError, Result};
use crate::model::{DecodedRecord, StorageMode};

/// A destination for decoded records.
///
/// Sinks run on a blocking worker thread, one per session, and see records
/// in arrival order.
pub trait Sink: Send {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Store one record. Failures are [`EdcError::SinkWrite`].
    fn store(&mut self, record: &DecodedRecord) -> Result<()>;
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn store(&mut self, record: &DecodedRecord) -> Result<()> {
        (**self).store(record)
    }
}

/// Open the sink configured for a stream.
pub fn open_sink(config: &Config, stream: &StreamConfig) -> Result<Box<dyn Sink>> {
    match config.edc.storage {
        StorageMode::Files => {
            let out_box = config
                .edc
                .out_box
                .as_ref()
                .ok_or_else(|| EdcError::config("edc.out_box is required for file storage"))?;
            Ok(Box::new(FileSink::new(out_box)?))
        }
        StorageMode::Database => {
            let database = config.database.as_ref().ok_or_else(|| {
                EdcError::config("[database] section is required for database storage")
            })?;
            let mut sink = SqliteSink::open(&database.path, stream.publisher())?;
            if let Some(timeout) = database.busy_timeout()? {
                sink.set_busy_timeout(timeout)?;
            }
            Ok(Box::new(sink))
        }
    }
}
