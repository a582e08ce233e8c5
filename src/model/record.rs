//! Raw record spans sliced out of the stream buffer.

use bytes::Bytes;

use crate::error::{EdcError, Result};

/// One complete `<entry ...>...</entry>` payload, byte-identical to what
/// arrived on the wire.
///
/// Records own their bytes and hold no reference back into the reassembly
/// buffer they were cut from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    bytes: Bytes,
}

impl Record {
    /// Wrap an owned byte span.
    #[must_use]
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Raw bytes of the record.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the record is empty. Never true for records produced by the
    /// reassembler, which always contain both markers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Record text. Fails with [`EdcError::MalformedRecord`] when the span is
    /// not valid UTF-8.
    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.bytes).map_err(|e| {
            EdcError::malformed(
                format!("record is not valid UTF-8: {e}"),
                String::from_utf8_lossy(&self.bytes),
            )
        })
    }

    /// Consume the record, returning its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

impl From<&str> for Record {
    fn from(value: &str) -> Self {
        Self::new(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl From<String> for Record {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_text() {
        let record = Record::from("<entry><id>1</id></entry>");
        assert_eq!(record.text().unwrap(), "<entry><id>1</id></entry>");
        assert_eq!(record.len(), 25);
        assert!(!record.is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let record = Record::new(vec![b'<', 0xff, 0xfe, b'>']);
        let err = record.text().unwrap_err();
        assert!(matches!(err, EdcError::MalformedRecord { .. }));
    }
}
