//! File-per-record sink.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::Sink;
use crate::error::{EdcError, Result};
use crate::model::DecodedRecord;
use crate::util::{atomic_write, file_stem_for};

/// Writes each record's raw content to `<out_box>/<identifier>.xml`.
#[derive(Debug, Clone)]
pub struct FileSink {
    out_box: PathBuf,
}

impl FileSink {
    /// Create a sink writing into `out_box`, creating the directory if needed.
    pub fn new(out_box: impl AsRef<Path>) -> Result<Self> {
        let out_box = out_box.as_ref().to_path_buf();
        std::fs::create_dir_all(&out_box).map_err(|e| {
            EdcError::io(format!("Failed to create out_box: {}", out_box.display()), e)
        })?;
        Ok(Self { out_box })
    }

    /// Output directory.
    #[must_use]
    pub fn out_box(&self) -> &Path {
        &self.out_box
    }

    /// Path a record with this identifier is written to.
    #[must_use]
    pub fn path_for(&self, id: &str) -> Option<PathBuf> {
        file_stem_for(id).map(|stem| self.out_box.join(format!("{stem}.xml")))
    }
}

impl Sink for FileSink {
    fn name(&self) -> &'static str {
        "files"
    }

    fn store(&mut self, record: &DecodedRecord) -> Result<()> {
        let path = record
            .id()
            .and_then(|id| self.path_for(id))
            .ok_or_else(|| EdcError::sink(record.label(), "record has no usable identifier"))?;

        atomic_write(&path, record.raw_content().as_bytes()).map_err(|e| {
            EdcError::sink_with_source(record.label(), format!("cannot write {}", path.display()), e)
        })?;

        debug!(path = %path.display(), "wrote activity file");
        Ok(())
    }
}
