//! Synthetic activity stream generators.
//!
//! Builds `<entry>` records shaped like collector output and splits stream
//! bodies into chunks the way a network would.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Configuration for one synthetic activity.
#[derive(Debug, Clone)]
pub struct SyntheticActivity {
    /// Identifier text.
    pub id: String,
    /// Posted time.
    pub posted: DateTime<Utc>,
    /// Body text (escaped on output).
    pub body: String,
    /// `(tag, value)` matching rules.
    pub rules: Vec<(String, String)>,
}

impl SyntheticActivity {
    /// A plain activity with one rule.
    pub fn new(n: usize) -> Self {
        Self {
            id: format!("tag:search.twitter.com,2005:{}", 198_308_769_506_136_064_u64 + n as u64),
            posted: base_time() + Duration::seconds(n as i64),
            body: format!("activity number {n} & more"),
            rules: vec![("news".to_string(), format!("rule {n}"))],
        }
    }

    /// Render as collector XML.
    pub fn to_xml(&self) -> String {
        let rules: String = self
            .rules
            .iter()
            .map(|(tag, value)| {
                format!(
                    r#"<gnip:matching_rule rx="false" tag="{}">{}</gnip:matching_rule>"#,
                    escape(tag),
                    escape(value)
                )
            })
            .collect();
        format!(
            concat!(
                r#"<entry xmlns="http://www.w3.org/2005/Atom" xmlns:gnip="http://www.gnip.com/schemas/2010">"#,
                "\n  <id>{}</id>\n  <created>{}</created>\n",
                "  <object><content type=\"html\">{}</content></object>\n",
                "  <gnip:matching_rules>{}</gnip:matching_rules>\n</entry>"
            ),
            escape(&self.id),
            self.posted.to_rfc3339(),
            escape(&self.body),
            rules
        )
    }
}

/// Fixed start time for generated activities.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2012, 5, 4, 16, 55, 0).unwrap()
}

/// Escape XML text and attribute content.
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// `count` activities rendered back to back, as one stream body.
pub fn stream_body(count: usize) -> String {
    (0..count).map(|n| SyntheticActivity::new(n).to_xml()).collect()
}

/// Split `body` into chunks of at most `size` bytes.
pub fn fixed_chunks(body: &[u8], size: usize) -> Vec<Vec<u8>> {
    body.chunks(size.max(1)).map(<[u8]>::to_vec).collect()
}

/// Split `body` at the given offsets (clamped, sorted, deduplicated).
pub fn split_at(body: &[u8], cuts: &[usize]) -> Vec<Vec<u8>> {
    let mut cuts: Vec<usize> = cuts.iter().map(|c| (*c).min(body.len())).collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut chunks = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for cut in cuts {
        chunks.push(body[start..cut].to_vec());
        start = cut;
    }
    chunks.push(body[start..].to_vec());
    chunks
}
