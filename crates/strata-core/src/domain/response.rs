//! Retrieval response shapes
//!
//! Everything here serializes directly to the JSON handed back to callers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::PointPayload;

/// Strategy chosen by the threshold/priority policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RetrievalMode {
    /// Strong title match: best content chunks across the corpus
    #[serde(rename = "by_title")]
    Title,
    /// Strong filename match: the whole document in natural order
    #[serde(rename = "by_filename")]
    Filename,
    /// Precise content hit: that single chunk
    #[serde(rename = "by_content")]
    Content,
    /// Nothing cleared its threshold: ranked content chunks anyway
    #[serde(rename = "no_strong_match")]
    NoStrongMatch,
}

impl RetrievalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalMode::Title => "by_title",
            RetrievalMode::Filename => "by_filename",
            RetrievalMode::Content => "by_content",
            RetrievalMode::NoStrongMatch => "no_strong_match",
        }
    }
}

impl fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best similarity per layer; `0.0` when a layer had no match
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerScores {
    pub title: f32,
    pub filename: f32,
    pub content: f32,
}

impl LayerScores {
    pub fn new(title: f32, filename: f32, content: f32) -> Self {
        Self {
            title,
            filename,
            content,
        }
    }

    pub fn rounded(&self) -> Self {
        Self {
            title: round4(self.title),
            filename: round4(self.filename),
            content: round4(self.content),
        }
    }
}

/// One returned chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub document_id: i64,
    pub filename: String,
    pub external_link: String,
    pub chunk_id: Option<i64>,
    pub title: String,
    pub content: String,
    /// Absent for natural-order results
    pub similarity: Option<f32>,
}

impl ResultRecord {
    pub fn scored(payload: PointPayload, score: f32) -> Self {
        Self::build(payload, Some(round4(score)))
    }

    pub fn unscored(payload: PointPayload) -> Self {
        Self::build(payload, None)
    }

    fn build(payload: PointPayload, similarity: Option<f32>) -> Self {
        Self {
            document_id: payload.document_id,
            filename: payload.filename,
            external_link: payload.external_link,
            chunk_id: payload.chunk_id,
            title: payload.title,
            content: payload.content,
            similarity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub mode: RetrievalMode,
    pub scores: LayerScores,
    pub results: Vec<ResultRecord>,
}

/// Round to four decimal places
pub fn round4(value: f32) -> f32 {
    (value * 10_000.0).round() / 10_000.0
}
