//! SQLite upsert sink.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::Sink;
use crate::error::{EdcError, Result};
use crate::model::DecodedRecord;

/// Timestamp layout used for `posted_at`, `created_at` and `updated_at`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS activities (
        native_id TEXT PRIMARY KEY NOT NULL,
        posted_at TEXT,
        content TEXT,
        body TEXT,
        rule_value TEXT,
        rule_tag TEXT,
        publisher TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_activities_publisher ON activities(publisher);
    CREATE INDEX IF NOT EXISTS idx_activities_posted_at ON activities(posted_at);
"#;

const UPSERT: &str = "
    INSERT INTO activities
        (native_id, posted_at, content, body, rule_value, rule_tag, publisher, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
    ON CONFLICT(native_id) DO UPDATE SET
        posted_at = excluded.posted_at,
        content = excluded.content,
        body = excluded.body,
        rule_value = excluded.rule_value,
        rule_tag = excluded.rule_tag,
        publisher = excluded.publisher,
        updated_at = excluded.updated_at";

/// Upserts one `activities` row per identifier.
///
/// Re-delivering an identifier replaces the row's content and refreshes
/// `updated_at`; `created_at` keeps the first delivery time. Rule values and
/// tags are stored as JSON arrays.
#[derive(Debug)]
pub struct SqliteSink {
    conn: Connection,
    publisher: String,
}

impl SqliteSink {
    /// Open (or create) the database file and ensure the schema exists.
    pub fn open(path: impl AsRef<Path>, publisher: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                EdcError::io(format!("Failed to create directory: {}", parent.display()), e)
            })?;
        }

        let conn = Connection::open(path).map_err(|e| {
            EdcError::database(format!("Failed to open database: {}", path.display()), e)
        })?;
        Self::from_connection(conn, publisher)
    }

    /// Open an in-memory database.
    pub fn open_in_memory(publisher: impl Into<String>) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| EdcError::database("Failed to open in-memory database", e))?;
        Self::from_connection(conn, publisher)
    }

    fn from_connection(conn: Connection, publisher: impl Into<String>) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| EdcError::database("Failed to create activities table", e))?;
        Ok(Self {
            conn,
            publisher: publisher.into(),
        })
    }

    /// Set how long a write waits for a lock held by another connection.
    pub fn set_busy_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.conn
            .busy_timeout(timeout)
            .map_err(|e| EdcError::database("Failed to set busy timeout", e))
    }

    /// Publisher written with every row.
    #[must_use]
    pub fn publisher(&self) -> &str {
        &self.publisher
    }

    /// Number of stored activities.
    pub fn count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM activities", [], |row| row.get(0))
            .map_err(|e| EdcError::database("Failed to count activities", e))?;
        u64::try_from(count).map_err(|_| {
            EdcError::database(
                "Failed to count activities",
                rusqlite::Error::IntegralValueOutOfRange(0, count),
            )
        })
    }

    fn upsert(&self, record: &DecodedRecord) -> std::result::Result<(), UpsertError> {
        let (id, posted, body, values, tags) = match record {
            DecodedRecord::Activity(activity) => (
                activity.id.as_str(),
                normalize_posted_time(&activity.posted_time),
                activity.body.as_str(),
                serde_json::to_string(&activity.rule_values)?,
                serde_json::to_string(&activity.rule_tags)?,
            ),
            DecodedRecord::Raw(raw) => (
                raw.id.as_deref().ok_or(UpsertError::MissingId)?,
                String::new(),
                "",
                "[]".to_string(),
                "[]".to_string(),
            ),
        };

        let now = Utc::now().format(TIMESTAMP_FORMAT).to_string();
        self.conn.execute(
            UPSERT,
            params![
                id,
                posted,
                record.raw_content(),
                body,
                values,
                tags,
                self.publisher,
                now
            ],
        )?;
        Ok(())
    }
}

impl Sink for SqliteSink {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn store(&mut self, record: &DecodedRecord) -> Result<()> {
        self.upsert(record).map_err(|e| match e {
            UpsertError::MissingId => EdcError::sink(record.label(), "record has no identifier"),
            UpsertError::Encode(e) => EdcError::sink_with_source(record.label(), "cannot encode rules", e),
            UpsertError::Sql(e) => EdcError::sink_with_source(record.label(), "upsert failed", e),
        })
    }
}

#[derive(Debug)]
enum UpsertError {
    MissingId,
    Encode(serde_json::Error),
    Sql(rusqlite::Error),
}

impl From<serde_json::Error> for UpsertError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encode(err)
    }
}

impl From<rusqlite::Error> for UpsertError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Sql(err)
    }
}

/// Convert an RFC 3339 timestamp to UTC `YYYY-MM-DD HH:MM:SS`.
///
/// Values in any other format are returned unchanged.
#[must_use]
pub fn normalize_posted_time(value: &str) -> String {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc).format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Activity, RawRecord};
    use indexmap::IndexSet;
    use pretty_assertions::assert_eq;

    fn activity(id: &str, body: &str) -> DecodedRecord {
        DecodedRecord::Activity(Activity {
            id: id.to_string(),
            posted_time: "2012-05-04T09:55:00-07:00".to_string(),
            raw_content: format!("<entry><id>{id}</id><body>{body}</body></entry>"),
            body: body.to_string(),
            rule_values: vec!["it's".to_string(), "back\\slash".to_string()],
            rule_tags: IndexSet::from(["quotes".to_string()]),
        })
    }

    #[test]
    fn test_normalize_posted_time() {
        assert_eq!(normalize_posted_time("2012-05-04T09:55:00Z"), "2012-05-04 09:55:00");
        assert_eq!(normalize_posted_time("2012-05-04T09:55:00-07:00"), "2012-05-04 16:55:00");
        assert_eq!(normalize_posted_time("Fri May 04 2012"), "Fri May 04 2012");
    }

    #[test]
    fn test_upsert_stores_fields_verbatim() {
        let mut sink = SqliteSink::open_in_memory("Twitter").unwrap();
        sink.store(&activity("1", "O'Brien said \\o/")).unwrap();

        let (body, values, tags, publisher, posted): (String, String, String, String, String) = sink
            .conn
            .query_row(
                "SELECT body, rule_value, rule_tag, publisher, posted_at FROM activities WHERE native_id = '1'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )
            .unwrap();
        assert_eq!(body, "O'Brien said \\o/");
        assert_eq!(values, r#"["it's","back\\slash"]"#);
        assert_eq!(tags, r#"["quotes"]"#);
        assert_eq!(publisher, "Twitter");
        assert_eq!(posted, "2012-05-04 16:55:00");
    }

    #[test]
    fn test_count_tracks_distinct_rows() {
        let mut sink = SqliteSink::open_in_memory("Twitter").unwrap();
        assert_eq!(sink.count().unwrap(), 0);

        sink.store(&activity("1", "first")).unwrap();
        sink.store(&activity("2", "second")).unwrap();
        assert_eq!(sink.count().unwrap(), 2);
    }

    #[test]
    fn test_redelivery_replaces_row() {
        let mut sink = SqliteSink::open_in_memory("Twitter").unwrap();
        sink.store(&activity("1", "first")).unwrap();
        sink.store(&activity("1", "second")).unwrap();

        assert_eq!(sink.count().unwrap(), 1);
        let body: String = sink
            .conn
            .query_row("SELECT body FROM activities WHERE native_id = '1'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(body, "second");
    }

    #[test]
    fn test_raw_record_with_id_is_stored() {
        let mut sink = SqliteSink::open_in_memory("Reddit").unwrap();
        let raw = DecodedRecord::Raw(RawRecord {
            id: Some("r1".to_string()),
            raw_content: "<entry><id>r1</id></entry>".to_string(),
        });
        sink.store(&raw).unwrap();
        assert_eq!(sink.count().unwrap(), 1);
    }

    #[test]
    fn test_raw_record_without_id_fails() {
        let mut sink = SqliteSink::open_in_memory("Reddit").unwrap();
        let raw = DecodedRecord::Raw(RawRecord {
            id: None,
            raw_content: "<entry/>".to_string(),
        });
        assert!(matches!(sink.store(&raw).unwrap_err(), EdcError::SinkWrite { .. }));
        assert_eq!(sink.count().unwrap(), 0);
    }
}
