use std::{
    collections::HashMap,
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use qdrant_client::{
    qdrant::{
        self, value::Kind, Condition, CreateCollection, Distance, Filter, PointId, PointStruct,
        ScrollPoints, SearchPoints, UpsertPoints, Value, VectorParams,
    },
    Qdrant,
};
use tracing::{debug, info, warn};

use strata_core::{
    application::{CollectionInfo, PointFilter, ScoredPayload, VectorStore},
    IndexPoint, Layer, PointPayload,
};

use crate::{
    config::QdrantSettings,
    vector::observability::{VectorError, VectorHealth, VectorHealthStatus, VectorTelemetry},
};

const LAYER: &str = "layer";
const DOCUMENT_ID: &str = "document_id";
const FILENAME: &str = "filename";
const EXTERNAL_LINK: &str = "external_link";
const CHUNK_ID: &str = "chunk_id";
const TITLE: &str = "title";
const CONTENT: &str = "content";

/// [`VectorStore`] backed by a single Qdrant collection
pub struct QdrantStore {
    client: Qdrant,
    settings: QdrantSettings,
    telemetry: Arc<VectorTelemetry>,
    health: Arc<VectorHealth>,
}

impl QdrantStore {
    pub fn new(settings: QdrantSettings) -> Result<Self> {
        Self::with_observability(
            settings,
            Arc::new(VectorTelemetry::default()),
            Arc::new(VectorHealth::default()),
        )
    }

    pub fn with_observability(
        settings: QdrantSettings,
        telemetry: Arc<VectorTelemetry>,
        health: Arc<VectorHealth>,
    ) -> Result<Self> {
        let client = Qdrant::from_url(&settings.uri)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            settings,
            telemetry,
            health,
        })
    }

    pub fn collection_name(&self) -> &str {
        &self.settings.collection_name
    }

    pub fn health_status(&self) -> VectorHealthStatus {
        self.health.status()
    }

    async fn call_with_retry<T, F, Fut>(&self, stage: &'static str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempts = 0;
        loop {
            let start = Instant::now();
            match operation().await {
                Ok(value) => {
                    self.telemetry.record_qdrant(start.elapsed());
                    self.health.record_success();
                    return Ok(value);
                }
                Err(err) => {
                    let message = format!("{err:#}");
                    self.telemetry
                        .record_error(&VectorError::qdrant(stage, message.clone()));
                    self.health.record_failure(message.clone());
                    attempts += 1;
                    if attempts > self.settings.retries {
                        return Err(err);
                    }
                    warn!(stage, reason = %message, "retrying after error");
                }
            }
        }
    }

    fn build_filter(filter: PointFilter) -> Option<Filter> {
        let mut conditions = Vec::new();
        if let Some(layer) = filter.layer {
            conditions.push(Condition::matches(LAYER, layer.as_str().to_string()));
        }
        if let Some(document_id) = filter.document_id {
            conditions.push(Condition::matches(DOCUMENT_ID, document_id));
        }
        if conditions.is_empty() {
            None
        } else {
            Some(Filter {
                must: conditions,
                ..Default::default()
            })
        }
    }

    fn with_payload() -> Option<qdrant::WithPayloadSelector> {
        Some(qdrant::WithPayloadSelector {
            selector_options: Some(qdrant::with_payload_selector::SelectorOptions::Enable(true)),
        })
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn recreate_collection(&self, dimension: usize) -> Result<()> {
        let name = self.settings.collection_name.clone();
        let exists = self
            .call_with_retry("collection_exists", || async {
                self.client.collection_exists(&name).await.map_err(Into::into)
            })
            .await?;
        if exists {
            info!(collection = %name, "deleting existing collection");
            self.call_with_retry("delete_collection", || async {
                self.client
                    .delete_collection(name.as_str())
                    .await
                    .map(|_| ())
                    .map_err(Into::into)
            })
            .await?;
        }

        self.call_with_retry("create_collection", || async {
            self.client
                .create_collection(CreateCollection {
                    collection_name: name.clone(),
                    vectors_config: Some(qdrant::VectorsConfig {
                        config: Some(qdrant::vectors_config::Config::Params(VectorParams {
                            size: dimension as u64,
                            distance: Distance::Cosine as i32,
                            ..Default::default()
                        })),
                    }),
                    ..Default::default()
                })
                .await
                .map(|_| ())
                .map_err(Into::into)
        })
        .await?;
        info!(collection = %name, dimension, "created collection");
        Ok(())
    }

    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let count = points.len() as u64;
        let points: Arc<Vec<PointStruct>> = Arc::new(points.into_iter().map(to_point).collect());
        self.call_with_retry("upsert", || {
            let points = points.clone();
            async move {
                self.client
                    .upsert_points(UpsertPoints {
                        collection_name: self.settings.collection_name.clone(),
                        wait: Some(true),
                        points: points.as_ref().clone(),
                        ..Default::default()
                    })
                    .await
                    .map(|_| ())
                    .map_err(Into::into)
            }
        })
        .await?;
        self.telemetry.record_points(count);
        debug!(points = count, "upserted batch");
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        filter: PointFilter,
        limit: usize,
    ) -> Result<Vec<ScoredPayload>> {
        let response = self
            .call_with_retry("search", || async {
                self.client
                    .search_points(SearchPoints {
                        collection_name: self.settings.collection_name.clone(),
                        vector: vector.to_vec(),
                        limit: limit as u64,
                        filter: Self::build_filter(filter),
                        with_payload: Self::with_payload(),
                        ..Default::default()
                    })
                    .await
                    .map_err(Into::into)
            })
            .await?;

        response
            .result
            .into_iter()
            .map(|point| {
                Ok(ScoredPayload {
                    id: point_id_to_u64(point.id.as_ref()),
                    score: point.score,
                    payload: payload_from_map(&point.payload)?,
                })
            })
            .collect()
    }

    async fn scroll(&self, filter: PointFilter, limit: usize) -> Result<Vec<PointPayload>> {
        let response = self
            .call_with_retry("scroll", || async {
                self.client
                    .scroll(ScrollPoints {
                        collection_name: self.settings.collection_name.clone(),
                        filter: Self::build_filter(filter),
                        limit: Some(scroll_page_limit(limit)),
                        with_payload: Self::with_payload(),
                        ..Default::default()
                    })
                    .await
                    .map_err(Into::into)
            })
            .await?;

        response
            .result
            .iter()
            .map(|point| payload_from_map(&point.payload))
            .collect()
    }

    async fn collection_info(&self) -> Result<CollectionInfo> {
        let name = self.settings.collection_name.clone();
        let response = self
            .call_with_retry("collection_info", || async {
                self.client
                    .collection_info(name.as_str())
                    .await
                    .map_err(Into::into)
            })
            .await?;
        let info = response
            .result
            .ok_or_else(|| anyhow!("collection {} returned no info", name))?;
        let dimension = info
            .config
            .and_then(|config| config.params)
            .and_then(|params| params.vectors_config)
            .and_then(|vectors| vectors.config)
            .and_then(|config| match config {
                qdrant::vectors_config::Config::Params(params) => Some(params.size),
                _ => None,
            });
        Ok(CollectionInfo {
            points_count: info.points_count.unwrap_or_default(),
            dimension,
        })
    }

    async fn health_check(&self) -> Result<()> {
        let name = self.settings.collection_name.clone();
        self.call_with_retry("health_check", || {
            let name = name.clone();
            async move {
                let exists = self.client.collection_exists(&name).await?;
                if exists {
                    Ok(())
                } else {
                    Err(anyhow!("collection {} missing", name))
                }
            }
        })
        .await
    }
}

fn to_point(point: IndexPoint) -> PointStruct {
    PointStruct::new(
        PointId::from(point.id),
        point.vector,
        payload_to_map(point.payload),
    )
}

pub(crate) fn payload_to_map(payload: PointPayload) -> HashMap<String, Value> {
    let mut map = HashMap::new();
    map.insert(LAYER.to_string(), Value::from(payload.layer.as_str().to_string()));
    map.insert(DOCUMENT_ID.to_string(), Value::from(payload.document_id));
    map.insert(FILENAME.to_string(), Value::from(payload.filename));
    map.insert(EXTERNAL_LINK.to_string(), Value::from(payload.external_link));
    map.insert(
        CHUNK_ID.to_string(),
        match payload.chunk_id {
            Some(chunk_id) => Value::from(chunk_id),
            None => Value {
                kind: Some(Kind::NullValue(0)),
            },
        },
    );
    map.insert(TITLE.to_string(), Value::from(payload.title));
    map.insert(CONTENT.to_string(), Value::from(payload.content));
    map
}

pub(crate) fn payload_from_map(map: &HashMap<String, Value>) -> Result<PointPayload> {
    let tag = payload_to_string(map.get(LAYER)).unwrap_or_default();
    let layer = Layer::parse(&tag).ok_or_else(|| anyhow!("point has unknown layer {:?}", tag))?;
    Ok(PointPayload {
        layer,
        document_id: payload_to_i64(map.get(DOCUMENT_ID))
            .ok_or_else(|| anyhow!("point has no document_id"))?,
        filename: payload_to_string(map.get(FILENAME)).unwrap_or_default(),
        external_link: payload_to_string(map.get(EXTERNAL_LINK)).unwrap_or_default(),
        chunk_id: payload_to_i64(map.get(CHUNK_ID)),
        title: payload_to_string(map.get(TITLE)).unwrap_or_default(),
        content: payload_to_string(map.get(CONTENT)).unwrap_or_default(),
    })
}

/// Qdrant pages are `u32`; larger limits saturate
fn scroll_page_limit(limit: usize) -> u32 {
    u32::try_from(limit).unwrap_or(u32::MAX)
}

fn point_id_to_u64(id: Option<&PointId>) -> u64 {
    id.and_then(|point_id| point_id.point_id_options.as_ref())
        .and_then(|inner| match inner {
            qdrant::point_id::PointIdOptions::Num(num) => Some(*num),
            _ => None,
        })
        .unwrap_or_default()
}

fn payload_to_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(|value| value.kind.as_ref())
        .and_then(|kind| match kind {
            Kind::StringValue(text) => Some(text.clone()),
            _ => None,
        })
}

fn payload_to_i64(value: Option<&Value>) -> Option<i64> {
    value
        .and_then(|value| value.kind.as_ref())
        .and_then(|kind| match kind {
            Kind::IntegerValue(val) => Some(*val),
            // JSON numbers written by other clients may arrive as doubles
            Kind::DoubleValue(val) if val.fract() == 0.0 => Some(*val as i64),
            _ => None,
        })
}
