//! Output formatting and styling

use std::fmt::Write as _;

use clap::ValueEnum;
use colored::Colorize;

use strata_core::{application::BuildSummary, RetrievalMode, SearchResponse};

use crate::vector::VectorTelemetrySnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Output styling configuration
pub struct OutputStyle {
    pub use_colors: bool,
}

impl Default for OutputStyle {
    fn default() -> Self {
        Self {
            use_colors: atty::is(atty::Stream::Stdout),
        }
    }
}

impl OutputStyle {
    pub fn plain() -> Self {
        Self { use_colors: false }
    }

    pub fn success(&self, msg: &str) -> String {
        if self.use_colors {
            format!("{} {}", "✓".green().bold(), msg)
        } else {
            format!("✓ {}", msg)
        }
    }

    pub fn error(&self, msg: &str) -> String {
        if self.use_colors {
            format!("{} {}", "✗".red().bold(), msg)
        } else {
            format!("✗ {}", msg)
        }
    }

    pub fn warning(&self, msg: &str) -> String {
        if self.use_colors {
            format!("{} {}", "⚠".yellow(), msg)
        } else {
            format!("⚠ {}", msg)
        }
    }

    pub fn header(&self, title: &str) -> String {
        if self.use_colors {
            title.bold().to_string()
        } else {
            title.to_string()
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.use_colors {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }

    fn mode(&self, mode: RetrievalMode) -> String {
        if !self.use_colors {
            return mode.to_string();
        }
        match mode {
            RetrievalMode::Title => mode.as_str().green().bold().to_string(),
            RetrievalMode::Filename => mode.as_str().cyan().bold().to_string(),
            RetrievalMode::Content => mode.as_str().blue().bold().to_string(),
            RetrievalMode::NoStrongMatch => mode.as_str().yellow().to_string(),
        }
    }

    /// Human-readable rendering of a search response
    pub fn search_response(&self, response: &SearchResponse) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} {}",
            self.header("Mode:"),
            self.mode(response.mode)
        );
        let _ = writeln!(
            out,
            "{}",
            self.dim(&format!(
                "scores: title {:.4} | filename {:.4} | content {:.4}",
                response.scores.title, response.scores.filename, response.scores.content
            ))
        );
        if response.results.is_empty() {
            let _ = writeln!(out, "{}", self.warning("no results"));
            return out;
        }
        for (rank, record) in response.results.iter().enumerate() {
            let similarity = record
                .similarity
                .map(|score| format!(" ({score:.4})"))
                .unwrap_or_default();
            let chunk = record
                .chunk_id
                .map(|id| format!(" #{id}"))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "\n{}. {}{}{}",
                rank + 1,
                self.header(&record.filename),
                chunk,
                similarity
            );
            if !record.title.is_empty() {
                let _ = writeln!(out, "   {}", record.title);
            }
            if !record.external_link.is_empty() {
                let _ = writeln!(out, "   {}", self.dim(&record.external_link));
            }
            let _ = writeln!(out, "   {}", record.content);
        }
        out
    }

    pub fn build_summary(&self, summary: &BuildSummary) -> String {
        self.success(&format!(
            "indexed {} documents into {} points ({} batches); skipped {} documents and {} empty chunks",
            summary.documents_indexed,
            summary.points,
            summary.batches,
            summary.documents_skipped,
            summary.chunks_skipped
        ))
    }

    pub fn telemetry(&self, snapshot: &VectorTelemetrySnapshot) -> String {
        let average = |ns: Option<u64>| {
            ns.map(|ns| format!("{:.2} ms", ns as f64 / 1_000_000.0))
                .unwrap_or_else(|| "n/a".to_string())
        };
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.header("Telemetry"));
        let _ = writeln!(
            out,
            "  embeddings: {} (avg {})",
            snapshot.embeddings_total,
            average(snapshot.avg_embedding_latency_ns)
        );
        let _ = writeln!(
            out,
            "  qdrant calls: {} (avg {})",
            snapshot.qdrant_calls,
            average(snapshot.avg_qdrant_latency_ns)
        );
        let _ = writeln!(out, "  points indexed: {}", snapshot.points_indexed);
        let _ = writeln!(out, "  errors: {}", snapshot.errors);
        if let Some(error) = &snapshot.last_error {
            let _ = writeln!(out, "  last error: {}", error);
        }
        out
    }
}
