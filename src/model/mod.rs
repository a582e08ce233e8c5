//! Data model for reassembled activity records.
//!
//! A [`Record`] is the exact byte span of one `<entry ...>...</entry>`
//! payload sliced out of the stream. The decoder turns it into a
//! [`DecodedRecord`]: either a [`RawRecord`] (file storage only needs the
//! identifier) or a fully promoted [`Activity`] (database storage).

pub mod activity;
pub mod record;

pub use activity::*;
pub use record::*;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EdcError;

/// Where decoded records are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// One `<identifier>.xml` file per record.
    #[default]
    Files,
    /// One upserted row per identifier.
    Database,
}

impl StorageMode {
    /// Configuration spelling of this mode.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Files => "files",
            Self::Database => "database",
        }
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageMode {
    type Err = EdcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "files" => Ok(Self::Files),
            "database" => Ok(Self::Database),
            other => Err(EdcError::config(format!(
                "unknown storage mode '{other}' (expected 'files' or 'database')"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_mode_parse() {
        assert_eq!("files".parse::<StorageMode>().unwrap(), StorageMode::Files);
        assert_eq!(" Database ".parse::<StorageMode>().unwrap(), StorageMode::Database);
        assert!("mysql".parse::<StorageMode>().is_err());
    }

    #[test]
    fn test_storage_mode_serde() {
        #[derive(Deserialize)]
        struct Wrapper {
            storage: StorageMode,
        }
        let parsed: Wrapper = toml::from_str("storage = \"database\"").unwrap();
        assert_eq!(parsed.storage, StorageMode::Database);
        assert_eq!(StorageMode::Files.to_string(), "files");
    }
}
