//! Domain Value Objects
//!
//! Documents, chunks and the points the index is made of. Corpus records are
//! deserialized leniently: a missing or `null` field becomes its empty value and
//! the indexing skip rules decide what happens to it.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Granularity an embedding vector represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    /// One point per document, embedded from its filename
    Filename,
    /// One point per chunk with a title, embedded from the title
    Title,
    /// One point per chunk, embedded from the chunk body
    Content,
}

impl Layer {
    pub const ALL: [Layer; 3] = [Layer::Filename, Layer::Title, Layer::Content];

    /// Payload tag stored alongside each point
    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Filename => "filename",
            Layer::Title => "title",
            Layer::Content => "content",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        Layer::ALL.into_iter().find(|layer| layer.as_str() == tag)
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One semantic section of a document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Document-local ordinal; defines natural order
    #[serde(default, deserialize_with = "null_as_default")]
    pub chunk_id: i64,
    #[serde(default, alias = "topicTitle", deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, alias = "topicContent", deserialize_with = "null_as_default")]
    pub content: String,
}

impl Chunk {
    pub fn new(chunk_id: i64, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            chunk_id,
            title: title.into(),
            content: content.into(),
        }
    }

    /// Trimmed title; empty when the chunk has none
    pub fn title_text(&self) -> &str {
        self.title.trim()
    }

    /// Trimmed body; empty chunks are never indexed
    pub fn content_text(&self) -> &str {
        self.content.trim()
    }

    pub fn is_indexable(&self) -> bool {
        !self.content_text().is_empty()
    }
}

/// A chunked source media item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub filename: String,
    #[serde(default, alias = "telegram_url", deserialize_with = "null_as_default")]
    pub external_link: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub chunks: Vec<Chunk>,
}

impl Document {
    pub fn new(id: i64, filename: impl Into<String>, external_link: impl Into<String>) -> Self {
        Self {
            id,
            filename: filename.into(),
            external_link: external_link.into(),
            chunks: Vec::new(),
        }
    }

    pub fn with_chunks(mut self, chunks: Vec<Chunk>) -> Self {
        self.chunks = chunks;
        self
    }

    /// Number of points a build emits for this document
    pub fn expected_points(&self) -> usize {
        if self.chunks.is_empty() {
            return 0;
        }
        1 + self
            .chunks
            .iter()
            .filter(|chunk| chunk.is_indexable())
            .map(|chunk| if chunk.title_text().is_empty() { 1 } else { 2 })
            .sum::<usize>()
    }
}

/// An un-chunked transcript waiting for the semantic splitter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub filename: String,
    #[serde(default, alias = "telegram_url", deserialize_with = "null_as_default")]
    pub external_link: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
}

impl RawDocument {
    pub fn into_document(self, chunks: Vec<Chunk>) -> Document {
        Document {
            id: self.id,
            filename: self.filename,
            external_link: self.external_link,
            chunks,
        }
    }
}

/// Metadata stored with every point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointPayload {
    pub layer: Layer,
    pub document_id: i64,
    pub filename: String,
    pub external_link: String,
    /// `None` only on filename points
    pub chunk_id: Option<i64>,
    pub title: String,
    pub content: String,
}

impl PointPayload {
    pub fn for_document(document: &Document) -> Self {
        Self {
            layer: Layer::Filename,
            document_id: document.id,
            filename: document.filename.clone(),
            external_link: document.external_link.clone(),
            chunk_id: None,
            title: String::new(),
            content: String::new(),
        }
    }

    pub fn for_chunk(document: &Document, chunk: &Chunk, layer: Layer) -> Self {
        Self {
            layer,
            document_id: document.id,
            filename: document.filename.clone(),
            external_link: document.external_link.clone(),
            chunk_id: Some(chunk.chunk_id),
            title: chunk.title_text().to_string(),
            content: chunk.content_text().to_string(),
        }
    }
}

/// One embedded vector plus its payload
#[derive(Debug, Clone, PartialEq)]
pub struct IndexPoint {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: PointPayload,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_round_trips_through_tag() {
        for layer in Layer::ALL {
            assert_eq!(Layer::parse(layer.as_str()), Some(layer));
        }
        assert_eq!(Layer::parse("video"), None);
    }

    #[test]
    fn test_document_accepts_original_field_names() {
        let json = r#"{
            "id": 7,
            "filename": "lecture on arrays",
            "telegram_url": "https://t.me/c/1/7",
            "chunks": [{"chunk_id": 1, "topicTitle": "intro", "topicContent": "arrays store elements"}]
        }"#;
        let document: Document = serde_json::from_str(json).unwrap();
        assert_eq!(document.external_link, "https://t.me/c/1/7");
        assert_eq!(document.chunks[0].title, "intro");
        assert_eq!(document.chunks[0].content, "arrays store elements");
    }

    #[test]
    fn test_document_tolerates_missing_and_null_fields() {
        let json = r#"{"id": 3, "filename": null, "chunks": [{"topicTitle": "only a title"}]}"#;
        let document: Document = serde_json::from_str(json).unwrap();
        assert_eq!(document.filename, "");
        assert_eq!(document.external_link, "");
        assert_eq!(document.chunks[0].chunk_id, 0);
        assert!(!document.chunks[0].is_indexable());
    }

    #[test]
    fn test_expected_points_follows_skip_rules() {
        let document = Document::new(7, "lecture on arrays", "").with_chunks(vec![
            Chunk::new(1, "intro", "arrays store elements"),
            Chunk::new(2, "", ""),
            Chunk::new(3, "title only", "   "),
            Chunk::new(4, "  ", "untitled body"),
        ]);
        assert_eq!(document.expected_points(), 4);
        assert_eq!(Document::new(8, "empty", "").expected_points(), 0);
    }

    #[test]
    fn test_chunk_payload_is_trimmed() {
        let document = Document::new(1, "file", "link");
        let chunk = Chunk::new(2, "  heading ", " body\n");
        let payload = PointPayload::for_chunk(&document, &chunk, Layer::Title);
        assert_eq!(payload.title, "heading");
        assert_eq!(payload.content, "body");
        assert_eq!(payload.chunk_id, Some(2));
    }
}
