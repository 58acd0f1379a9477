//! Rich-text envelope used for message bodies.
//!
//! The server stores message text in its editor's block format. A posted
//! body must serialize to exactly
//! `{"blocks":[{"key":"1blqq","text":…,"type":"unstyled","depth":0,"inlineStyleRanges":[],"entityRanges":[],"data":{}}],"entityMap":{}}`,
//! so field order below is significant.

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Block key the server's editor expects on single-block messages.
pub const DEFAULT_BLOCK_KEY: &str = "1blqq";

/// Top-level envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageEnvelope {
    /// Content blocks, in display order.
    pub blocks: Vec<Block>,
    /// Entity table referenced by block entity ranges.
    #[serde(rename = "entityMap", default)]
    pub entity_map: serde_json::Map<String, serde_json::Value>,
}

/// One paragraph of rich text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Block {
    /// Editor block key.
    pub key: String,
    /// Unescaped block text.
    pub text: String,
    /// Block type.
    #[serde(rename = "type")]
    pub block_type: String,
    /// Nesting depth.
    #[serde(default)]
    pub depth: u32,
    /// Inline style spans.
    #[serde(rename = "inlineStyleRanges", default)]
    pub inline_style_ranges: Vec<serde_json::Value>,
    /// Entity spans.
    #[serde(rename = "entityRanges", default)]
    pub entity_ranges: Vec<serde_json::Value>,
    /// Block metadata.
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl Block {
    /// Unstyled block holding `text`.
    #[must_use]
    pub fn unstyled(text: &str) -> Self {
        Self {
            key: DEFAULT_BLOCK_KEY.to_string(),
            text: text.to_string(),
            block_type: "unstyled".to_string(),
            depth: 0,
            inline_style_ranges: Vec::new(),
            entity_ranges: Vec::new(),
            data: serde_json::Map::new(),
        }
    }
}

impl MessageEnvelope {
    /// Single unstyled block carrying `text`.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self {
            blocks: vec![Block::unstyled(text)],
            entity_map: serde_json::Map::new(),
        }
    }

    /// Decode a serialized envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if `raw` is not an envelope.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        serde_json::from_str(raw)
            .map_err(|e| CoreError::Serialization(format!("parsing message envelope: {e}")))
    }

    /// Serialize to the compact wire form.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_wire(&self) -> Result<String, CoreError> {
        serde_json::to_string(self)
            .map_err(|e| CoreError::Serialization(format!("serializing message envelope: {e}")))
    }

    /// Block texts joined with newlines.
    #[must_use]
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Wrap plain text in the envelope the messages endpoint expects.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn format_message(text: &str) -> Result<String, CoreError> {
    MessageEnvelope::from_text(text).to_wire()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_matches_server_format_byte_for_byte() {
        let wire = format_message("hello").expect("format");
        assert_eq!(
            wire,
            r#"{"blocks":[{"key":"1blqq","text":"hello","type":"unstyled","depth":0,"inlineStyleRanges":[],"entityRanges":[],"data":{}}],"entityMap":{}}"#
        );
    }

    #[test]
    fn decodes_to_first_block_text() {
        let wire = format_message("hello").expect("format");
        let value: serde_json::Value = serde_json::from_str(&wire).expect("valid JSON");
        assert_eq!(value["blocks"][0]["text"], "hello");
    }

    #[test]
    fn special_characters_survive_round_trip() {
        for text in [
            r#"she said "hi""#,
            r"C:\temp\new",
            "line one\nline two\r\n\ttabbed",
            "\u{0007} bell and \u{1F600}",
            r#"","type":"header-one"#,
        ] {
            let wire = format_message(text).expect("format");
            let value: serde_json::Value = serde_json::from_str(&wire).expect("valid JSON");
            assert_eq!(value["blocks"][0]["text"], text);
            assert_eq!(value["blocks"][0]["type"], "unstyled");
            assert_eq!(value["blocks"].as_array().map(Vec::len), Some(1));
        }
    }

    #[test]
    fn multi_block_envelope_joins_lines() {
        let mut envelope = MessageEnvelope::from_text("first");
        envelope.blocks.push(Block::unstyled("second"));
        let parsed = MessageEnvelope::parse(&envelope.to_wire().expect("wire")).expect("parse");
        assert_eq!(parsed.plain_text(), "first\nsecond");
    }

    #[test]
    fn parse_rejects_plain_strings() {
        assert!(matches!(
            MessageEnvelope::parse("hello"),
            Err(CoreError::Serialization(_))
        ));
    }
}
