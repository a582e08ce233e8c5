//! Utility functions shared by the sinks and the CLI.
//!
//! - Atomic file writes, so a failed write never leaves a partial file
//! - File-name sanitising for record identifiers

use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{EdcError, Result};

/// Atomically write content to a file.
///
/// The content goes to a temporary file in the target directory, which is
/// flushed and then renamed over the target. If any step fails the target
/// is left as it was.
///
/// # Example
///
/// ```rust,no_run
/// use edc_stream::util::atomic_write;
///
/// atomic_write("out/1.xml", b"<entry><id>1</id></entry>").unwrap();
/// ```
pub fn atomic_write(path: impl AsRef<Path>, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    let parent = path.parent().ok_or_else(|| EdcError::IoError {
        context: format!("Cannot determine parent directory for: {}", path.display()),
        source: io::Error::new(io::ErrorKind::InvalidInput, "No parent directory"),
    })?;

    if !parent.as_os_str().is_empty() && !parent.exists() {
        std::fs::create_dir_all(parent).map_err(|e| {
            EdcError::io(format!("Failed to create directory: {}", parent.display()), e)
        })?;
    }

    // Same directory as the target so the rename stays on one filesystem
    let dir = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };
    let mut temp_file = NamedTempFile::new_in(dir).map_err(|e| {
        EdcError::io(
            format!("Failed to create temporary file in: {}", dir.display()),
            e,
        )
    })?;

    temp_file.write_all(content).map_err(|e| {
        EdcError::io(
            format!("Failed to write to temporary file for: {}", path.display()),
            e,
        )
    })?;

    temp_file.flush().map_err(|e| {
        EdcError::io(
            format!("Failed to flush temporary file for: {}", path.display()),
            e,
        )
    })?;

    temp_file.persist(path).map_err(|e| {
        EdcError::io(
            format!("Failed to atomically write file: {}", path.display()),
            e.error,
        )
    })?;

    Ok(())
}

/// Turn a record identifier into a safe file stem.
///
/// Identifiers are used verbatim except for characters that would escape
/// the output directory. Returns `None` for identifiers that cannot name a
/// file at all.
#[must_use]
pub fn file_stem_for(id: &str) -> Option<String> {
    let stem: String = id
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();

    match stem.as_str() {
        "." | ".." => None,
        s if s.trim().is_empty() => None,
        _ => Some(stem),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("1.xml");

        atomic_write(&path, b"<entry/>").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<entry/>");
    }

    #[test]
    fn test_atomic_write_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("1.xml");

        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("out").join("2.xml");

        atomic_write(&path, b"nested").unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_file_stem_for() {
        assert_eq!(
            file_stem_for("tag:search.twitter.com,2005:1").as_deref(),
            Some("tag:search.twitter.com,2005:1")
        );
        assert_eq!(file_stem_for("../etc/passwd").as_deref(), Some(".._etc_passwd"));
        assert_eq!(file_stem_for(".."), None);
        assert_eq!(file_stem_for("  "), None);
        assert_eq!(file_stem_for(" 1 ").as_deref(), Some(" 1 "));
    }
}
