//! Split Document Use Case
//!
//! Asks a language model to cut a raw transcript into topic-level chunks.
//! The model is unreliable, so every failure consumes an attempt and the
//! last resort is a single chunk holding the head of the transcript.

use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    application::ports::ChunkModel,
    domain::{Chunk, Document, RawDocument},
};

/// Title of the chunk produced when every attempt failed
pub const FALLBACK_TITLE: &str = "Unsplit transcript";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitterSettings {
    pub max_attempts: usize,
    /// Transcript characters sent to the model
    pub max_input_chars: usize,
    /// Transcript characters kept by the fallback chunk
    pub fallback_chars: usize,
}

impl Default for SplitterSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            max_input_chars: 30_000,
            fallback_chars: 10_000,
        }
    }
}

pub struct SemanticSplitter {
    model: Arc<dyn ChunkModel>,
    settings: SplitterSettings,
}

impl SemanticSplitter {
    pub fn new(model: Arc<dyn ChunkModel>) -> Self {
        Self {
            model,
            settings: SplitterSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: SplitterSettings) -> Self {
        self.settings = SplitterSettings {
            max_attempts: settings.max_attempts.max(1),
            ..settings
        };
        self
    }

    pub fn settings(&self) -> &SplitterSettings {
        &self.settings
    }

    /// Chunk `raw_text`; never returns an empty list.
    pub async fn split(&self, raw_text: &str, document_id: i64) -> Vec<Chunk> {
        let prompt = build_prompt(raw_text, document_id, self.settings.max_input_chars);
        let attempts = self.settings.max_attempts;

        for attempt in 1..=attempts {
            let reply = match self.model.complete(&prompt).await {
                Ok(reply) => reply,
                Err(err) => {
                    warn!(document_id, attempt, attempts, error = %err, "chunk model request failed");
                    continue;
                }
            };
            match parse_chunks(&reply) {
                Ok(chunks) => {
                    info!(document_id, attempt, chunks = chunks.len(), "transcript split");
                    return chunks;
                }
                Err(reason) => {
                    warn!(document_id, attempt, attempts, %reason, "unusable chunk model reply");
                }
            }
        }

        warn!(document_id, attempts, "all attempts failed, keeping transcript head");
        vec![Chunk::new(
            1,
            FALLBACK_TITLE,
            take_chars(raw_text, self.settings.fallback_chars),
        )]
    }

    pub async fn split_document(&self, raw: RawDocument) -> Document {
        let chunks = self.split(&raw.content, raw.id).await;
        raw.into_document(chunks)
    }
}

fn build_prompt(raw_text: &str, document_id: i64, max_chars: usize) -> String {
    format!(
        "You are an expert linguistic analyst.\n\
         Analyze the following transcript of a recording (ID: {document_id}).\n\
         Perform semantic chunking: split the text only where the speaker clearly changes topic.\n\
         \n\
         Rules:\n\
         1. Never split mid-thought.\n\
         2. For question and answer sessions, keep each question with its answer.\n\
         3. For lectures, split by main chapter or concept.\n\
         4. Give every chunk a short descriptive title in the transcript's language.\n\
         5. Return only a JSON array, without Markdown or any other text.\n\
         \n\
         Output format:\n\
         [{{\"chunk_id\": 1, \"topicTitle\": \"...\", \"topicContent\": \"...\"}}]\n\
         \n\
         Transcript:\n{}",
        take_chars(raw_text, max_chars)
    )
}

/// Parse a model reply into chunks, tolerating code fences and missing ids
fn parse_chunks(reply: &str) -> Result<Vec<Chunk>, String> {
    let json = strip_code_fences(reply);
    let mut chunks: Vec<Chunk> =
        serde_json::from_str(json).map_err(|err| format!("invalid JSON: {err}"))?;
    if chunks.is_empty() {
        return Err("model returned no chunks".to_string());
    }
    if !chunks.iter().any(Chunk::is_indexable) {
        return Err("model returned chunks without content".to_string());
    }
    for (position, chunk) in chunks.iter_mut().enumerate() {
        if chunk.chunk_id <= 0 {
            chunk.chunk_id = position as i64 + 1;
        }
    }
    Ok(chunks)
}

fn strip_code_fences(reply: &str) -> &str {
    let mut text = reply.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = rest.strip_prefix("json").unwrap_or(rest);
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

fn take_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::mocks::ScriptedChunkModel;

    fn splitter(model: ScriptedChunkModel) -> (SemanticSplitter, Arc<ScriptedChunkModel>) {
        let model = Arc::new(model);
        (SemanticSplitter::new(model.clone()), model)
    }

    #[tokio::test]
    async fn test_fenced_reply_is_parsed() {
        let reply = "```json\n[{\"chunk_id\": 1, \"topicTitle\": \"intro\", \"topicContent\": \"hello\"}]\n```";
        let (splitter, _) = splitter(ScriptedChunkModel::new().reply(reply));
        let chunks = splitter.split("hello", 3).await;
        assert_eq!(chunks, vec![Chunk::new(1, "intro", "hello")]);
    }

    #[tokio::test]
    async fn test_missing_ids_follow_position() {
        let reply = r#"[{"topicTitle": "a", "topicContent": "x"}, {"chunk_id": null, "topicTitle": "b", "topicContent": "y"}]"#;
        let (splitter, _) = splitter(ScriptedChunkModel::new().reply(reply));
        let ids: Vec<i64> = splitter
            .split("xy", 1)
            .await
            .iter()
            .map(|chunk| chunk.chunk_id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_retries_after_bad_json_and_model_error() {
        let model = ScriptedChunkModel::new()
            .reply("not json at all")
            .error("rate limited")
            .reply(r#"[{"chunk_id": 1, "topicTitle": "t", "topicContent": "c"}]"#);
        let (splitter, model) = splitter(model);
        let chunks = splitter.split("c", 9).await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(model.prompts().len(), 3);
    }

    #[tokio::test]
    async fn test_fallback_after_exhausted_attempts() {
        let model = ScriptedChunkModel::new().reply("[]").reply("{").reply("nope");
        let (splitter, model) = splitter(model);
        let splitter = splitter.with_settings(SplitterSettings {
            fallback_chars: 4,
            ..SplitterSettings::default()
        });
        let chunks = splitter.split("مرحبا بالعالم", 2).await;
        assert_eq!(chunks, vec![Chunk::new(1, FALLBACK_TITLE, "مرحب")]);
        assert_eq!(model.prompts().len(), 3);
    }

    #[tokio::test]
    async fn test_reply_without_content_is_retried() {
        let model = ScriptedChunkModel::new()
            .reply(r#"[{"chunk_id": 1, "title": "intro", "text": "wrong key"}]"#)
            .reply(r#"[{"chunk_id": 1, "topicTitle": "intro", "topicContent": "  "}]"#)
            .reply(r#"[{"chunk_id": 1, "topicTitle": "intro", "topicContent": "body"}]"#);
        let (splitter, model) = splitter(model);
        let chunks = splitter.split("body", 5).await;
        assert_eq!(chunks, vec![Chunk::new(1, "intro", "body")]);
        assert_eq!(model.prompts().len(), 3);
    }

    #[tokio::test]
    async fn test_contentless_replies_fall_back() {
        let reply = r#"[{"chunk_id": 1, "title": "intro", "text": "wrong key"}]"#;
        let model = ScriptedChunkModel::new().reply(reply).reply(reply).reply(reply);
        let (splitter, _) = splitter(model);
        let chunks = splitter.split("the transcript", 6).await;
        assert_eq!(chunks, vec![Chunk::new(1, FALLBACK_TITLE, "the transcript")]);
    }

    #[tokio::test]
    async fn test_prompt_truncates_transcript() {
        let (splitter, model) = splitter(ScriptedChunkModel::new());
        let splitter = splitter.with_settings(SplitterSettings {
            max_attempts: 1,
            max_input_chars: 5,
            fallback_chars: 100,
        });
        splitter.split("abcdefghij", 4).await;
        let prompt = &model.prompts()[0];
        assert!(prompt.contains("(ID: 4)"));
        assert!(prompt.ends_with("abcde"));
    }

    #[tokio::test]
    async fn test_split_document_keeps_metadata() {
        let reply = r#"[{"chunk_id": 1, "topicTitle": "t", "topicContent": "c"}]"#;
        let (splitter, _) = splitter(ScriptedChunkModel::new().reply(reply));
        let raw = RawDocument {
            id: 12,
            filename: "lecture.mp4".into(),
            external_link: "https://t.me/c/1/12".into(),
            content: "c".into(),
        };
        let document = splitter.split_document(raw).await;
        assert_eq!(document.id, 12);
        assert_eq!(document.filename, "lecture.mp4");
        assert_eq!(document.chunks.len(), 1);
    }

    #[test]
    fn test_strip_code_fences_variants() {
        assert_eq!(strip_code_fences("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("```\n[1]```"), "[1]");
        assert_eq!(strip_code_fences("  [1]  "), "[1]");
    }

    #[test]
    fn test_take_chars_respects_char_boundaries() {
        assert_eq!(take_chars("héllo", 2), "hé");
        assert_eq!(take_chars("abc", 10), "abc");
    }
}
