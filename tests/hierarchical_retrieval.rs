//! End-to-end: chunked corpus on disk -> index build -> layered retrieval

use std::{fs, sync::Arc};

use proptest::prelude::*;
use strata::{corpus, normalize::normalize_document};
use strata_core::{
    application::mocks::{
        axis, vector_with_similarity, InMemoryVectorStore, LookupEmbeddingProvider,
    },
    Chunk, Document, EmbeddingClient, IndexBuilder, Layer, RetrievalEngine, RetrievalMode,
};
use tempfile::TempDir;

const DIM: usize = 4;
const QUERY: &str = "how do arrays work";

struct Harness {
    store: Arc<InMemoryVectorStore>,
    provider: Arc<LookupEmbeddingProvider>,
}

impl Harness {
    /// `similarities` maps indexed texts to their cosine similarity with the query
    fn new(similarities: &[(&str, f32)]) -> Self {
        let provider = similarities.iter().fold(
            LookupEmbeddingProvider::new(DIM).with_text(QUERY, axis(0, DIM)),
            |provider, (text, similarity)| {
                provider.with_text(*text, vector_with_similarity(*similarity, DIM))
            },
        );
        Self {
            store: Arc::new(InMemoryVectorStore::new()),
            provider: Arc::new(provider),
        }
    }

    fn embeddings(&self) -> EmbeddingClient {
        EmbeddingClient::new(self.provider.clone(), DIM)
    }

    async fn index(&self, documents: &[Document]) -> u64 {
        IndexBuilder::new(self.embeddings(), self.store.clone())
            .with_batch_size(2)
            .rebuild(documents)
            .await
            .unwrap()
            .points
    }

    fn engine(&self) -> RetrievalEngine {
        RetrievalEngine::new(self.embeddings(), self.store.clone())
    }
}

fn lecture_corpus() -> Vec<Document> {
    vec![
        Document::new(7, "lecture on arrays", "https://t.me/c/1/7").with_chunks(vec![
            Chunk::new(2, "indexing", "indexes start at zero"),
            Chunk::new(1, "intro", "arrays store elements"),
        ]),
        Document::new(8, "lecture on pointers", "https://t.me/c/1/8").with_chunks(vec![
            Chunk::new(1, "addresses", "a pointer holds an address"),
        ]),
    ]
}

#[tokio::test]
async fn test_document_with_empty_chunk_emits_three_points() {
    let harness = Harness::new(&[]);
    let document = Document::new(7, "lecture on arrays", "").with_chunks(vec![
        Chunk::new(1, "intro", "arrays store elements"),
        Chunk::new(2, "", ""),
    ]);

    assert_eq!(harness.index(&[document]).await, 3);
    let layers: Vec<(u64, Layer)> = harness
        .store
        .points()
        .iter()
        .map(|point| (point.id, point.payload.layer))
        .collect();
    assert_eq!(
        layers,
        vec![(1, Layer::Filename), (2, Layer::Title), (3, Layer::Content)]
    );
}

#[tokio::test]
async fn test_strong_title_returns_ranked_content() {
    let harness = Harness::new(&[
        ("intro", 0.91),
        ("lecture on arrays", 0.5),
        ("arrays store elements", 0.6),
        ("indexes start at zero", 0.4),
        ("a pointer holds an address", 0.2),
    ]);
    harness.index(&lecture_corpus()).await;

    let response = harness.engine().search(QUERY, 2).await.unwrap();
    assert_eq!(response.mode, RetrievalMode::Title);
    assert_eq!(response.scores.title, 0.91);
    let contents: Vec<&str> = response.results.iter().map(|r| r.content.as_str()).collect();
    assert_eq!(contents, vec!["arrays store elements", "indexes start at zero"]);
    assert!(response.results.iter().all(|r| r.similarity.is_some()));
}

#[tokio::test]
async fn test_strong_filename_returns_whole_document_in_chunk_order() {
    let harness = Harness::new(&[
        ("lecture on arrays", 0.82),
        ("intro", 0.3),
        ("arrays store elements", 0.5),
        ("indexes start at zero", 0.45),
    ]);
    harness.index(&lecture_corpus()).await;

    let response = harness.engine().search(QUERY, 1).await.unwrap();
    assert_eq!(response.mode, RetrievalMode::Filename);
    let chunks: Vec<(i64, Option<i64>)> = response
        .results
        .iter()
        .map(|r| (r.document_id, r.chunk_id))
        .collect();
    assert_eq!(chunks, vec![(7, Some(1)), (7, Some(2))]);
    assert!(response.results.iter().all(|r| r.similarity.is_none()));
    assert_eq!(response.results[0].external_link, "https://t.me/c/1/7");
}

#[tokio::test]
async fn test_chain_prefers_content_when_it_beats_title_and_filename() {
    let harness = Harness::new(&[
        ("intro", 0.70),
        ("lecture on arrays", 0.68),
        ("arrays store elements", 0.72),
        ("indexes start at zero", 0.3),
    ]);
    harness.index(&lecture_corpus()).await;

    let response = harness.engine().search(QUERY, 5).await.unwrap();
    assert_eq!(response.mode, RetrievalMode::Content);
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].chunk_id, Some(1));
    assert_eq!(response.results[0].similarity, Some(0.72));
}

#[tokio::test]
async fn test_weak_scores_fall_back_to_top_k_content() {
    let harness = Harness::new(&[
        ("intro", 0.2),
        ("lecture on arrays", 0.3),
        ("arrays store elements", 0.4),
        ("indexes start at zero", 0.35),
        ("a pointer holds an address", 0.1),
    ]);
    harness.index(&lecture_corpus()).await;

    let response = harness.engine().search(QUERY, 2).await.unwrap();
    assert_eq!(response.mode, RetrievalMode::NoStrongMatch);
    let scores: Vec<Option<f32>> = response.results.iter().map(|r| r.similarity).collect();
    assert_eq!(scores.len(), 2);
    assert!(scores[0] >= scores[1]);
    assert_eq!(response.results[0].content, "arrays store elements");
}

#[tokio::test]
async fn test_json_response_shape() {
    let harness = Harness::new(&[("lecture on arrays", 0.9)]);
    harness.index(&lecture_corpus()).await;

    let response = harness.engine().search(QUERY, 3).await.unwrap();
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["mode"], "by_filename");
    assert_eq!(json["query"], QUERY);
    assert!(json["scores"]["filename"].as_f64().unwrap() > 0.89);
    assert_eq!(json["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_legacy_corpus_file_is_normalized_and_indexed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("chunked.json");
    fs::write(
        &path,
        r#"[
            {"id": 3, "filename": "محاضرة_المصفوفات", "telegram_url": "https://t.me/c/1/3",
             "chunks": [{"chunk_id": 1, "topicTitle": "  مقدمة  ", "topicContent": "أساسيات المصفوفات"}]},
            {"id": 4, "filename": "empty", "telegram_url": null, "chunks": []}
        ]"#,
    )
    .unwrap();

    let documents: Vec<Document> = corpus::load_documents(&path)
        .unwrap()
        .iter()
        .map(normalize_document)
        .collect();
    assert_eq!(documents[0].filename, "محاضرة المصفوفات");
    assert_eq!(documents[0].chunks[0].content, "اساسيات المصفوفات");
    assert_eq!(documents[1].external_link, "");

    let harness = Harness::new(&[("محاضرة المصفوفات", 0.95)]);
    assert_eq!(harness.index(&documents).await, 3);

    let response = harness.engine().search(QUERY, 5).await.unwrap();
    assert_eq!(response.mode, RetrievalMode::Filename);
    assert_eq!(response.results[0].title, "مقدمة");
    assert_eq!(response.results[0].external_link, "https://t.me/c/1/3");
}

#[tokio::test]
async fn test_rebuild_replaces_previous_points() {
    let harness = Harness::new(&[]);
    harness.index(&lecture_corpus()).await;
    let points = harness.index(&lecture_corpus()[1..]).await;

    assert_eq!(points, 3);
    assert_eq!(harness.store.recreated(), 2);
    let ids: Vec<u64> = harness.store.points().iter().map(|point| point.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

fn arb_chunk() -> impl Strategy<Value = Chunk> {
    (1i64..20, prop::bool::ANY, prop::bool::ANY).prop_map(|(id, titled, filled)| {
        Chunk::new(
            id,
            if titled { format!("title {id}") } else { String::new() },
            if filled { format!("content {id}") } else { String::new() },
        )
    })
}

fn arb_corpus() -> impl Strategy<Value = Vec<Document>> {
    prop::collection::vec(prop::collection::vec(arb_chunk(), 0..5), 0..5).prop_map(|docs| {
        docs.into_iter()
            .enumerate()
            .map(|(id, chunks)| {
                Document::new(id as i64, format!("file {id}"), "").with_chunks(chunks)
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_any_corpus_indexes_and_answers(documents in arb_corpus(), top_k in 1usize..6) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let harness = Harness::new(&[]);
            let expected: usize = documents.iter().map(Document::expected_points).sum();
            prop_assert_eq!(harness.index(&documents).await, expected as u64);

            let response = harness.engine().search(QUERY, top_k).await.unwrap();
            if response.mode != RetrievalMode::Filename {
                prop_assert!(response.results.len() <= top_k);
            }
            Ok(())
        })?;
    }
}
