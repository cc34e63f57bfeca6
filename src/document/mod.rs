use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A retrieved document segment
///
/// Fields other than `title`, `content` and `metadata` are carried through
/// untouched in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,

    #[serde(default)]
    pub content: String,

    pub metadata: Metadata,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Position of this segment within its source document
    pub segment_position: u64,

    /// Score assigned by whichever stage produced this record
    pub score: f64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Document {
    pub fn new(title: impl Into<String>, content: impl Into<String>, segment_position: u64, score: f64) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            metadata: Metadata {
                segment_position,
                score,
                extra: Map::new(),
            },
            extra: Map::new(),
        }
    }

    /// Stable identifier of this segment: `{title}-{segment_position}`
    pub fn segment_id(&self) -> String {
        format!("{}-{}", self.title, self.metadata.segment_position)
    }

    pub fn score(&self) -> f64 {
        self.metadata.score
    }

    /// Copy this document with its metadata score replaced.
    ///
    /// The receiver is never touched, so callers may reuse their documents
    /// across queries.
    pub fn with_score(&self, score: f64) -> Self {
        let mut copy = self.clone();
        copy.metadata.score = score;
        copy
    }
}

/// Round to 6 decimal digits
pub fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_segment_id() {
        let doc = Document::new("guide-title-3", "body", 7, 0.4);
        assert_eq!(doc.segment_id(), "guide-title-3-7");
    }

    #[test]
    fn test_with_score_leaves_original_untouched() {
        let original = Document::new("t", "c", 0, 0.25);
        let scored = original.with_score(0.9);

        assert_eq!(original.score(), 0.25);
        assert_eq!(scored.score(), 0.9);
        assert_eq!(scored.segment_id(), original.segment_id());
    }

    #[test]
    fn test_unknown_fields_survive_json() {
        let raw = r#"{
            "title": "faq",
            "content": "text",
            "url": "https://example.com/faq",
            "metadata": {"segment_position": 2, "score": 0.5, "source": "kb"}
        }"#;
        let doc: Document = serde_json::from_str(raw).unwrap();
        assert_eq!(doc.extra["url"], "https://example.com/faq");
        assert_eq!(doc.metadata.extra["source"], "kb");

        let back = serde_json::to_value(&doc).unwrap();
        assert_eq!(back["metadata"]["source"], "kb");
        assert_eq!(back["url"], "https://example.com/faq");
    }

    #[test]
    fn test_round6() {
        assert_eq!(round6(0.123_456_789), 0.123_457);
        assert_eq!(round6(1.0), 1.0);
    }
}
