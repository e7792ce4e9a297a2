//! HTTP embedding provider against a mock service

use std::sync::Arc;

use mockito::Matcher;
use serde_json::json;
use strata::{
    config::EmbeddingSettings, embedding::HttpEmbeddingProvider, vector::VectorTelemetry,
    StrataError,
};
use strata_core::{AppError, EmbeddingClient};

fn settings(url: String) -> EmbeddingSettings {
    EmbeddingSettings {
        url,
        dimension: 3,
        timeout_secs: 5,
    }
}

#[tokio::test]
async fn test_embed_posts_text_and_returns_vector() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/embed")
        .match_body(Matcher::Json(json!({"text": "arrays in c"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"embedding": [0.1, 0.2, 0.3]}"#)
        .create_async()
        .await;

    let telemetry = Arc::new(VectorTelemetry::default());
    let provider = HttpEmbeddingProvider::new(&settings(server.url()))
        .unwrap()
        .with_telemetry(telemetry.clone());
    let vector = provider.request_embedding("arrays in c").await.unwrap();

    assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    assert_eq!(telemetry.snapshot().embeddings_total, 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_base_path_is_preserved() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/models/e5/embed")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"embedding": [1.0, 0.0, 0.0]}"#)
        .create_async()
        .await;

    let provider =
        HttpEmbeddingProvider::new(&settings(format!("{}/models/e5", server.url()))).unwrap();
    assert!(provider.request_embedding("x").await.is_ok());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_error_is_reported_and_counted() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/embed")
        .with_status(500)
        .with_body("model not loaded")
        .create_async()
        .await;

    let telemetry = Arc::new(VectorTelemetry::default());
    let provider = HttpEmbeddingProvider::new(&settings(server.url()))
        .unwrap()
        .with_telemetry(telemetry.clone());
    let err = provider.request_embedding("x").await.unwrap_err();

    match &err {
        StrataError::HttpStatus { status, message } => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(message, "model not loaded");
        }
        other => panic!("unexpected error {other:?}"),
    }
    let snapshot = telemetry.snapshot();
    assert_eq!(snapshot.errors, 1);
    assert!(snapshot.last_error.is_some());
}

#[tokio::test]
async fn test_wrong_dimension_surfaces_through_client() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/embed")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"embedding": [0.5, 0.5]}"#)
        .create_async()
        .await;

    let provider = HttpEmbeddingProvider::new(&settings(server.url())).unwrap();
    let client = EmbeddingClient::new(Arc::new(provider), 3);
    let err = client.embed("query").await.unwrap_err();
    assert!(matches!(
        err,
        AppError::DimensionMismatch {
            expected: 3,
            actual: 2
        }
    ));
}

#[tokio::test]
async fn test_health_endpoint() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/health")
        .with_status(200)
        .with_body("ok")
        .create_async()
        .await;
    let provider = HttpEmbeddingProvider::new(&settings(server.url())).unwrap();
    assert!(provider.health().await.is_ok());
}

#[tokio::test]
async fn test_health_reports_unavailable_service() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/health")
        .with_status(503)
        .create_async()
        .await;
    let provider = HttpEmbeddingProvider::new(&settings(server.url())).unwrap();
    assert!(provider.health().await.is_err());
}
