//! Decoding of reassembled records into activities.
//!
//! The depth of decoding follows the storage mode: file storage only needs
//! the record identifier, database storage promotes the posted time, body
//! text and matching rules into their own fields.
//!
//! Every record is parsed as a complete XML document first, so a record
//! that is not well-formed fails with [`EdcError::MalformedRecord`] in
//! either mode. The error carries the raw text; the session logs it and
//! moves on to the next record.

use indexmap::IndexSet;
use roxmltree::{Document, Node};
use tracing::debug;

use crate::error::{EdcError, Result};
use crate::model::{Activity, DecodedRecord, RawRecord, Record, StorageMode};

/// Local name of the record root element.
const ENTRY: &str = "entry";
const ID: &str = "id";
const CREATED: &str = "created";
const OBJECT: &str = "object";
const CONTENT: &str = "content";
const MATCHING_RULES: &str = "matching_rules";
const MATCHING_RULE: &str = "matching_rule";
const TAG_ATTR: &str = "tag";

/// Decode one record for the given storage mode.
pub fn decode(record: &Record, mode: StorageMode) -> Result<DecodedRecord> {
    RecordDecoder::new(mode).decode(record)
}

/// Record decoder bound to a storage mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordDecoder {
    mode: StorageMode,
}

impl RecordDecoder {
    /// Create a decoder for the given storage mode.
    #[must_use]
    pub fn new(mode: StorageMode) -> Self {
        Self { mode }
    }

    /// Storage mode this decoder produces output for.
    #[must_use]
    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    /// Decode one record.
    pub fn decode(&self, record: &Record) -> Result<DecodedRecord> {
        let text = record.text()?;
        let doc = Document::parse(text)
            .map_err(|e| EdcError::malformed(format!("invalid XML: {e}"), text))?;

        let root = doc.root_element();
        if root.tag_name().name() != ENTRY {
            return Err(EdcError::malformed(
                format!("unexpected root element <{}>", root.tag_name().name()),
                text,
            ));
        }

        let decoded = match self.mode {
            StorageMode::Files => DecodedRecord::Raw(decode_raw(root, text)),
            StorageMode::Database => DecodedRecord::Activity(decode_activity(root, text)?),
        };
        debug!(id = decoded.id().unwrap_or_default(), mode = %self.mode, "record decoded");
        Ok(decoded)
    }
}

fn decode_raw(root: Node<'_, '_>, text: &str) -> RawRecord {
    let id = child_elements(root)
        .find(|node| node.tag_name().name() == ID)
        .and_then(|node| non_empty(&inner_text(node)));

    RawRecord {
        id,
        raw_content: text.to_string(),
    }
}

fn decode_activity(root: Node<'_, '_>, text: &str) -> Result<Activity> {
    let mut id = None;
    let mut posted_time = None;
    let mut body = None;
    let mut rule_values = Vec::new();
    let mut rule_tags = IndexSet::new();

    for node in child_elements(root) {
        match node.tag_name().name() {
            ID if id.is_none() => id = non_empty(&inner_text(node)),
            CREATED if posted_time.is_none() => posted_time = Some(inner_text(node)),
            OBJECT => {
                if let Some(content) = child_elements(node).find(|n| n.tag_name().name() == CONTENT) {
                    body = Some(inner_text(content));
                }
            }
            MATCHING_RULES => {
                for rule in child_elements(node).filter(|n| n.tag_name().name() == MATCHING_RULE) {
                    rule_values.push(inner_text(rule));
                    if let Some(tag) = rule.attribute(TAG_ATTR) {
                        rule_tags.insert(tag.to_string());
                    }
                }
            }
            _ => {}
        }
    }

    let id = id.ok_or_else(|| EdcError::malformed("record has no <id> element", text))?;

    Ok(Activity {
        id,
        posted_time: posted_time.unwrap_or_default(),
        raw_content: text.to_string(),
        body: body.unwrap_or_default(),
        rule_values,
        rule_tags,
    })
}

fn child_elements<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(Node::is_element)
}

/// Concatenated text of all descendant text nodes.
fn inner_text(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect()
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ACTIVITY: &str = r#"<entry xmlns="http://www.w3.org/2005/Atom" xmlns:gnip="http://www.gnip.com/schemas/2010">
  <id>tag:search.twitter.com,2005:198308769506136064</id>
  <created>2012-05-04T09:55:00Z</created>
  <title>Posted a note</title>
  <object>
    <id>object-1</id>
    <content type="html">Hello &amp; welcome</content>
  </object>
  <gnip:matching_rules>
    <gnip:matching_rule rx="false" tag="greetings">hello</gnip:matching_rule>
    <gnip:matching_rule rx="false" tag="greetings">welcome</gnip:matching_rule>
    <gnip:matching_rule rx="false" tag="misc">note</gnip:matching_rule>
  </gnip:matching_rules>
</entry>"#;

    #[test]
    fn test_files_mode_extracts_id_only() {
        let decoded = decode(&Record::from(ACTIVITY), StorageMode::Files).unwrap();
        let DecodedRecord::Raw(raw) = decoded else {
            panic!("expected raw record");
        };
        assert_eq!(raw.id.as_deref(), Some("tag:search.twitter.com,2005:198308769506136064"));
        assert_eq!(raw.raw_content, ACTIVITY);
    }

    #[test]
    fn test_files_mode_missing_id_is_not_an_error() {
        let decoded = decode(&Record::from("<entry><title>x</title></entry>"), StorageMode::Files).unwrap();
        assert_eq!(decoded.id(), None);
    }

    #[test]
    fn test_identifier_text_is_kept_verbatim() {
        let record = Record::from("<entry><id> 1 </id><created> 2012 </created></entry>");

        assert_eq!(decode(&record, StorageMode::Files).unwrap().id(), Some(" 1 "));

        let DecodedRecord::Activity(activity) = decode(&record, StorageMode::Database).unwrap() else {
            panic!("expected activity");
        };
        assert_eq!(activity.id, " 1 ");
        assert_eq!(activity.posted_time, " 2012 ");
    }

    #[test]
    fn test_database_mode_promotes_fields() {
        let decoded = decode(&Record::from(ACTIVITY), StorageMode::Database).unwrap();
        let DecodedRecord::Activity(activity) = decoded else {
            panic!("expected activity");
        };
        assert_eq!(activity.id, "tag:search.twitter.com,2005:198308769506136064");
        assert_eq!(activity.posted_time, "2012-05-04T09:55:00Z");
        assert_eq!(activity.body, "Hello & welcome");
        assert_eq!(activity.rule_values, vec!["hello", "welcome", "note"]);
        assert_eq!(
            activity.rule_tags.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["greetings", "misc"]
        );
        assert_eq!(activity.raw_content, ACTIVITY);
    }

    #[test]
    fn test_duplicate_tags_deduplicated_values_kept() {
        let xml = r#"<entry><id>7</id><matching_rules><matching_rule tag="a">one</matching_rule><matching_rule tag="a">two</matching_rule></matching_rules></entry>"#;
        let DecodedRecord::Activity(activity) = decode(&Record::from(xml), StorageMode::Database).unwrap() else {
            panic!("expected activity");
        };
        assert_eq!(activity.rule_values, vec!["one", "two"]);
        assert_eq!(activity.rule_tags.len(), 1);
    }

    #[test]
    fn test_database_mode_requires_id() {
        let err = decode(&Record::from("<entry><created>now</created></entry>"), StorageMode::Database)
            .unwrap_err();
        assert!(matches!(err, EdcError::MalformedRecord { .. }));
    }

    #[test]
    fn test_database_mode_defaults_optional_fields() {
        let DecodedRecord::Activity(activity) =
            decode(&Record::from("<entry><id>1</id></entry>"), StorageMode::Database).unwrap()
        else {
            panic!("expected activity");
        };
        assert_eq!(activity.posted_time, "");
        assert_eq!(activity.body, "");
        assert!(activity.rule_values.is_empty());
        assert!(activity.rule_tags.is_empty());
    }

    #[test]
    fn test_unclosed_inner_tag_is_malformed() {
        let raw = "<entry><id>1</id><title>oops</entry>";
        for mode in [StorageMode::Files, StorageMode::Database] {
            match decode(&Record::from(raw), mode).unwrap_err() {
                EdcError::MalformedRecord { raw: kept, .. } => assert_eq!(kept, raw),
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_non_entry_root_is_malformed() {
        let err = decode(&Record::from("<entryset><id>1</id></entryset>"), StorageMode::Files).unwrap_err();
        assert!(matches!(err, EdcError::MalformedRecord { .. }));
    }
}
