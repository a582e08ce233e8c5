//! Decoded activity payloads.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::error::preview;

/// Identifier plus raw payload, enough for the file sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Text of the first `id` child, if present.
    pub id: Option<String>,
    /// The record exactly as received.
    pub raw_content: String,
}

/// An activity with its database-promoted fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    /// Text of the `id` child.
    pub id: String,
    /// Text of the `created` child, in the provider's format.
    pub posted_time: String,
    /// The record exactly as received.
    pub raw_content: String,
    /// Text of `object/content`.
    pub body: String,
    /// Text of every `matching_rules/matching_rule`, in document order.
    pub rule_values: Vec<String>,
    /// `tag` attributes of the matching rules, first occurrence order, no duplicates.
    pub rule_tags: IndexSet<String>,
}

/// Output of the record decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DecodedRecord {
    /// File mode output.
    Raw(RawRecord),
    /// Database mode output.
    Activity(Activity),
}

impl DecodedRecord {
    /// Record identifier, if one was found.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Raw(raw) => raw.id.as_deref(),
            Self::Activity(activity) => Some(activity.id.as_str()),
        }
    }

    /// The record exactly as received.
    #[must_use]
    pub fn raw_content(&self) -> &str {
        match self {
            Self::Raw(raw) => &raw.raw_content,
            Self::Activity(activity) => &activity.raw_content,
        }
    }

    /// Label used in logs: the identifier, or a raw-text preview when the
    /// record has none.
    #[must_use]
    pub fn label(&self) -> String {
        match self.id() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => preview(self.raw_content()),
        }
    }
}
