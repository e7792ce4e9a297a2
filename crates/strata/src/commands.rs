//! Command handlers behind the `strata` binary

use std::{collections::HashSet, path::Path, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use prometheus::Registry;
use tracing::{info, warn};

use strata_core::{
    application::VectorStore, EmbeddingClient, IndexBuilder, RetrievalEngine, SemanticSplitter,
};

use crate::{
    args::Commands,
    chunking::OllamaChunkModel,
    config::StrataConfig,
    corpus,
    embedding::HttpEmbeddingProvider,
    normalize::normalize_document,
    output::{OutputFormat, OutputStyle},
    vector::{
        render_metrics, QdrantStore, VectorError, VectorHealth, VectorMetrics, VectorTelemetry,
    },
};

/// Adapters wired from configuration, sharing one telemetry sink
pub struct Services {
    pub config: StrataConfig,
    pub registry: Registry,
    pub telemetry: Arc<VectorTelemetry>,
    pub provider: Arc<HttpEmbeddingProvider>,
    pub store: Arc<QdrantStore>,
}

impl Services {
    pub fn from_config(config: StrataConfig) -> Result<Self> {
        let registry = Registry::new();
        let telemetry = Arc::new(VectorTelemetry::default());
        let metrics =
            VectorMetrics::register(&registry).context("registering vector metrics")?;
        telemetry.attach_metrics(metrics);

        let provider = HttpEmbeddingProvider::new(&config.embedding)
            .context("creating embedding client")?
            .with_telemetry(telemetry.clone());
        let store = QdrantStore::with_observability(
            config.qdrant.clone(),
            telemetry.clone(),
            Arc::new(VectorHealth::default()),
        )
        .context("creating Qdrant client")?;

        Ok(Self {
            config,
            registry,
            telemetry,
            provider: Arc::new(provider),
            store: Arc::new(store),
        })
    }

    pub fn embeddings(&self) -> EmbeddingClient {
        EmbeddingClient::new(self.provider.clone(), self.config.embedding.dimension)
    }

    pub fn index_builder(&self) -> IndexBuilder {
        IndexBuilder::new(self.embeddings(), self.store.clone())
            .with_batch_size(self.config.index.batch_size)
    }

    pub fn retrieval_engine(&self) -> RetrievalEngine {
        RetrievalEngine::new(self.embeddings(), self.store.clone())
            .with_thresholds(self.config.retrieval.thresholds())
            .with_scroll_limit(self.config.retrieval.scroll_limit)
    }
}

pub async fn run(command: Commands, config: StrataConfig, style: &OutputStyle) -> Result<()> {
    match command {
        Commands::Chunk {
            input,
            output,
            resume,
        } => chunk(&config, &input, &output, resume, style).await,
        Commands::Normalize { input, output } => normalize(&input, &output, style),
        Commands::Index {
            corpus,
            normalize,
            stats,
        } => {
            let services = Services::from_config(config)?;
            index(&services, &corpus, normalize, stats, style).await
        }
        Commands::Search {
            query,
            top_k,
            format,
        } => {
            let services = Services::from_config(config)?;
            search(&services, &query, top_k, format, style).await
        }
        Commands::Health { stats } => {
            let services = Services::from_config(config)?;
            let result = health(&services, style).await;
            if stats {
                print_stats(&services, style)?;
            }
            result
        }
        Commands::Config => {
            let rendered = toml::to_string_pretty(&config).context("rendering configuration")?;
            print!("{rendered}");
            Ok(())
        }
    }
}

async fn chunk(
    config: &StrataConfig,
    input: &Path,
    output: &Path,
    resume: bool,
    style: &OutputStyle,
) -> Result<()> {
    let raw_documents = corpus::load_raw_documents(input)?;
    let mut chunked = if resume && output.exists() {
        corpus::load_documents(output)?
    } else {
        Vec::new()
    };
    let done: HashSet<i64> = chunked.iter().map(|document| document.id).collect();
    if !chunked.is_empty() {
        info!(documents = done.len(), "resuming from existing output");
    }
    corpus::backup(output)?;

    let model = OllamaChunkModel::new(&config.chunking).context("creating chunk model")?;
    let splitter =
        SemanticSplitter::new(Arc::new(model)).with_settings(config.chunking.splitter());
    let delay = Duration::from_millis(config.chunking.request_delay_ms);
    let checkpoint_every = config.chunking.checkpoint_every.max(1);

    let pending: Vec<_> = raw_documents
        .into_iter()
        .filter(|raw| !done.contains(&raw.id))
        .collect();
    let total = pending.len();
    for (position, raw) in pending.into_iter().enumerate() {
        info!(document_id = raw.id, "[{}/{}] chunking transcript", position + 1, total);
        chunked.push(splitter.split_document(raw).await);

        if (position + 1) % checkpoint_every == 0 {
            corpus::save_documents(output, &chunked)?;
            info!(documents = chunked.len(), "progress saved");
        }
        if !delay.is_zero() && position + 1 < total {
            tokio::time::sleep(delay).await;
        }
    }
    corpus::save_documents(output, &chunked)?;
    println!(
        "{}",
        style.success(&format!(
            "chunked {} transcripts into {}",
            total,
            output.display()
        ))
    );
    Ok(())
}

fn normalize(input: &Path, output: &Path, style: &OutputStyle) -> Result<()> {
    let documents = corpus::load_documents(input)?;
    let normalized: Vec<_> = documents.iter().map(normalize_document).collect();
    corpus::save_documents(output, &normalized)?;
    println!(
        "{}",
        style.success(&format!(
            "normalized {} documents into {}",
            normalized.len(),
            output.display()
        ))
    );
    Ok(())
}

async fn index(
    services: &Services,
    path: &Path,
    normalize: bool,
    stats: bool,
    style: &OutputStyle,
) -> Result<()> {
    let mut documents = corpus::load_documents(path)?;
    if normalize || services.config.index.normalize {
        info!("normalizing corpus before indexing");
        documents = documents.iter().map(normalize_document).collect();
    }

    let mut builder = services.index_builder();
    let summary = builder
        .rebuild(&documents)
        .await
        .with_context(|| format!("indexing {}", path.display()))?;
    println!("{}", style.build_summary(&summary));
    if summary.documents_skipped > 0 {
        println!(
            "{}",
            style.warning(&format!(
                "{} documents had no chunks",
                summary.documents_skipped
            ))
        );
    }
    if stats {
        print_stats(services, style)?;
    }
    Ok(())
}

fn print_stats(services: &Services, style: &OutputStyle) -> Result<()> {
    print!("{}", style.telemetry(&services.telemetry.snapshot()));
    print!(
        "{}",
        render_metrics(&services.registry).context("rendering metrics")?
    );
    Ok(())
}

async fn search(
    services: &Services,
    query: &str,
    top_k: Option<usize>,
    format: OutputFormat,
    style: &OutputStyle,
) -> Result<()> {
    let top_k = top_k.unwrap_or(services.config.retrieval.top_k);
    let response = services
        .retrieval_engine()
        .search(query, top_k)
        .await
        .context("search failed")?;
    services.telemetry.record_search(response.mode);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
        OutputFormat::Text => print!("{}", style.search_response(&response)),
    }
    Ok(())
}

async fn health(services: &Services, style: &OutputStyle) -> Result<()> {
    let mut healthy = true;

    match services.provider.health().await {
        Ok(()) => println!("{}", style.success("embedding service reachable")),
        Err(err) => {
            healthy = false;
            let message = format!("embedding service: {err}");
            services
                .telemetry
                .record_error(&VectorError::health(message.clone()));
            println!("{}", style.error(&message));
        }
    }

    match services.store.health_check().await {
        Ok(()) => match services.store.collection_info().await {
            Ok(info) => {
                println!(
                    "{}",
                    style.success(&format!(
                        "collection {} holds {} points",
                        services.store.collection_name(),
                        info.points_count
                    ))
                );
                let expected = services.config.embedding.dimension as u64;
                if let Some(dimension) = info.dimension.filter(|size| *size != expected) {
                    warn!(dimension, expected, "collection dimension differs from config");
                    println!(
                        "{}",
                        style.warning(&format!(
                            "collection dimension {dimension} differs from configured {expected}"
                        ))
                    );
                }
            }
            Err(err) => {
                healthy = false;
                println!("{}", style.error(&format!("collection info: {err:#}")));
            }
        },
        Err(err) => {
            healthy = false;
            let status = services.store.health_status();
            let detail = status
                .last_failure_message
                .unwrap_or_else(|| format!("{err:#}"));
            let message = format!("vector store: {detail}");
            services
                .telemetry
                .record_error(&VectorError::health(message.clone()));
            println!("{}", style.error(&message));
        }
    }

    if healthy {
        Ok(())
    } else {
        anyhow::bail!("one or more dependencies are unavailable")
    }
}
