//! Destinations for committed batches.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::writer::GpsWriter;
use crate::models::{OutputMode, SinkPayload, WriteOutcome, WriteSummary};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{failed} of {total} image(s) could not be written")]
    Partial {
        failed: usize,
        total: usize,
        outcomes: Vec<WriteOutcome>,
    },
    #[error("sink rejected the batch: {0}")]
    Rejected(String),
    #[error("sink task failed: {0}")]
    Task(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SinkAck {
    pub sinks: Vec<String>,
    pub outcomes: Vec<WriteOutcome>,
    pub summary: WriteSummary,
}

impl SinkAck {
    pub fn named(sink: &str) -> Self {
        Self {
            sinks: vec![sink.to_string()],
            ..Self::default()
        }
    }

    fn absorb(&mut self, other: SinkAck) {
        self.sinks.extend(other.sinks);
        self.outcomes.extend(other.outcomes);
        self.summary = WriteSummary::from_outcomes(&self.outcomes);
    }
}

#[async_trait::async_trait]
pub trait PersistenceSink: Send + Sync {
    fn name(&self) -> &str;

    async fn save(&self, payload: &SinkPayload) -> Result<SinkAck, SinkError>;
}

/// Writes the payload as pretty-printed JSON to a fixed path.
#[derive(Clone, Debug)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait::async_trait]
impl PersistenceSink for JsonFileSink {
    fn name(&self) -> &str {
        "json"
    }

    async fn save(&self, payload: &SinkPayload) -> Result<SinkAck, SinkError> {
        let encoded = serde_json::to_string_pretty(payload)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, encoded)
        })
        .await
        .map_err(|err| SinkError::Task(err.to_string()))??;
        info!(
            "saved snapshot of {} image(s) to {}",
            payload.images.len(),
            self.path.display()
        );

        Ok(SinkAck::named(self.name()))
    }
}

/// Writes the committed location into each image file's GPS EXIF fields.
///
/// Images ingested from memory (no source path) are skipped, not failed.
#[derive(Clone, Debug, Default)]
pub struct ExifWriterSink {
    output_mode: OutputMode,
}

impl ExifWriterSink {
    pub fn new(output_mode: OutputMode) -> Self {
        Self { output_mode }
    }

    pub fn output_mode(&self) -> &OutputMode {
        &self.output_mode
    }
}

#[async_trait::async_trait]
impl PersistenceSink for ExifWriterSink {
    fn name(&self) -> &str {
        "exif"
    }

    async fn save(&self, payload: &SinkPayload) -> Result<SinkAck, SinkError> {
        let images = payload.images.clone();
        let output_mode = self.output_mode.clone();

        let outcomes =
            tokio::task::spawn_blocking(move || GpsWriter::write_all(&images, &output_mode))
                .await
                .map_err(|err| SinkError::Task(err.to_string()))?;

        let summary = WriteSummary::from_outcomes(&outcomes);
        info!(
            "exif writer ({}): {} written, {} failed, {} skipped",
            self.output_mode.label(),
            summary.succeeded,
            summary.failed,
            summary.skipped
        );

        if summary.failed > 0 {
            return Err(SinkError::Partial {
                failed: summary.failed,
                total: summary.total,
                outcomes,
            });
        }

        Ok(SinkAck {
            sinks: vec![self.name().to_string()],
            outcomes,
            summary,
        })
    }
}

/// Forwards the payload to each sink in turn and stops at the first failure.
#[derive(Clone, Default)]
pub struct SinkChain {
    sinks: Vec<Arc<dyn PersistenceSink>>,
}

impl SinkChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn PersistenceSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait::async_trait]
impl PersistenceSink for SinkChain {
    fn name(&self) -> &str {
        "chain"
    }

    async fn save(&self, payload: &SinkPayload) -> Result<SinkAck, SinkError> {
        let mut ack = SinkAck::default();

        for sink in &self.sinks {
            match sink.save(payload).await {
                Ok(next) => ack.absorb(next),
                Err(err) => {
                    warn!("sink {} failed: {err}", sink.name());
                    return Err(err);
                }
            }
        }

        Ok(ack)
    }
}
