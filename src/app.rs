use std::mem;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, LookupProvider};
use crate::core::batch::{
    BatchStore, CommitResult, Extracted, IngestReport, PreconditionError, Screened,
};
use crate::core::extract::GeoExtractor;
use crate::core::projection::MapProjection;
use crate::http::NominatimLookup;
use crate::lookup::{label_for, RegionTable, ReverseLookup};
use crate::models::{BatchExport, BatchStatus, Coordinate, ImageId, RawFile};
use crate::sink::{ExifWriterSink, JsonFileSink, PersistenceSink, SinkChain};

pub type SharedBatch = Arc<Mutex<BatchStore>>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl NoticeLevel {
    pub fn label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// A user-facing message about something the workbench did.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PickedLocation {
    pub coordinate: Coordinate,
    pub label: String,
}

/// Front door for a presentation layer.
///
/// Wraps one [`BatchStore`] behind an async lock so every mutation is
/// applied one at a time, runs metadata extraction off the lock, and hands
/// committed batches to the sink in the background.
pub struct Workbench {
    batch: SharedBatch,
    projection: MapProjection,
    lookup: Arc<dyn ReverseLookup>,
    sink: Arc<dyn PersistenceSink>,
    extraction_timeout: Option<Duration>,
    notices: mpsc::UnboundedSender<Notice>,
    pending_saves: Mutex<Vec<JoinHandle<()>>>,
}

impl Workbench {
    pub fn new(projection: MapProjection) -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (notices, receiver) = mpsc::unbounded_channel();

        let workbench = Self {
            batch: Arc::new(Mutex::new(BatchStore::new())),
            projection,
            lookup: Arc::new(RegionTable::default()),
            sink: Arc::new(SinkChain::new()),
            extraction_timeout: None,
            notices,
            pending_saves: Mutex::new(Vec::new()),
        };

        (workbench, receiver)
    }

    pub fn from_config(
        config: &AppConfig,
    ) -> anyhow::Result<(Self, mpsc::UnboundedReceiver<Notice>)> {
        let projection = config.map.projection()?;

        let lookup: Arc<dyn ReverseLookup> = match config.lookup.provider {
            LookupProvider::Regions => Arc::new(RegionTable::default()),
            LookupProvider::Nominatim => Arc::new(NominatimLookup::new(
                config.lookup.endpoint.clone(),
                &config.lookup.user_agent,
            )?),
        };

        let mut sinks =
            SinkChain::new().with(Arc::new(ExifWriterSink::new(config.output.output_mode()?)));
        if let Some(path) = &config.output.snapshot_path {
            sinks = sinks.with(Arc::new(JsonFileSink::new(path.clone())));
        }

        let (workbench, receiver) = Self::new(projection);
        Ok((
            workbench
                .with_lookup(lookup)
                .with_sink(Arc::new(sinks))
                .with_extraction_timeout(config.ingest.extraction_timeout()),
            receiver,
        ))
    }

    pub fn with_store(mut self, store: BatchStore) -> Self {
        self.batch = Arc::new(Mutex::new(store));
        self
    }

    pub fn with_lookup(mut self, lookup: Arc<dyn ReverseLookup>) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn PersistenceSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_extraction_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.extraction_timeout = timeout;
        self
    }

    pub fn batch(&self) -> SharedBatch {
        Arc::clone(&self.batch)
    }

    pub fn projection(&self) -> &MapProjection {
        &self.projection
    }

    /// Screens `files`, extracts their locations concurrently without holding
    /// the batch lock, then appends the survivors in input order in one step.
    ///
    /// Dropping the returned future before it finishes leaves the batch
    /// untouched.
    pub async fn ingest(&self, files: Vec<RawFile>) -> IngestReport {
        let (accepted, mut report, extractor) = {
            let store = self.batch.lock().await;
            let (accepted, report) = store.screen(files);
            (accepted, report, store.extractor())
        };

        let pending: Vec<(usize, Arc<RawFile>, JoinHandle<Option<Coordinate>>)> = accepted
            .into_iter()
            .map(|Screened { index, file }| {
                let file = Arc::new(file);
                let handle = tokio::spawn(extract_detached(
                    Arc::clone(&extractor),
                    Arc::clone(&file),
                    self.extraction_timeout,
                ));
                (index, file, handle)
            })
            .collect();

        // completion order does not matter, merge sorts by call index
        let mut extracted = Vec::with_capacity(pending.len());
        for (index, file, handle) in pending {
            let location = match handle.await {
                Ok(location) => location,
                Err(err) => {
                    warn!("{}: extraction task failed: {err}", file.name);
                    None
                }
            };
            // a timed-out reader may still hold its copy
            let file = Arc::try_unwrap(file).unwrap_or_else(|shared| (*shared).clone());
            extracted.push(Extracted {
                index,
                file,
                location,
            });
        }

        {
            let mut store = self.batch.lock().await;
            store.merge(extracted, &mut report);
        }

        for warning in &report.warnings {
            self.notify(NoticeLevel::Warning, warning.to_string());
        }
        if report.accepted > 0 {
            self.notify(
                NoticeLevel::Success,
                format!("Added {} image(s)", report.accepted),
            );
        }

        report
    }

    pub async fn remove(&self, id: ImageId) -> bool {
        let removed = self.batch.lock().await.remove(id);
        if removed {
            self.notify(NoticeLevel::Info, "Image removed");
        }
        removed
    }

    pub async fn clear_all(&self) {
        let mut store = self.batch.lock().await;
        if store.is_empty() {
            self.notify(NoticeLevel::Warning, "No images to clear");
        } else {
            self.notify(NoticeLevel::Info, "All images cleared");
        }
        store.clear_all();
    }

    /// Maps a pick on the map surface and makes it the pending location.
    pub async fn pick_location(
        &self,
        pick_x: f64,
        pick_y: f64,
        width: f64,
        height: f64,
    ) -> PickedLocation {
        let coordinate = self.projection.project(pick_x, pick_y, width, height);
        self.select_location(coordinate).await
    }

    pub async fn select_location(&self, coordinate: Coordinate) -> PickedLocation {
        self.batch.lock().await.select_location(coordinate.clone());
        self.notify(NoticeLevel::Success, format!("Location selected: {coordinate}"));

        let label = label_for(self.lookup.as_ref(), &coordinate).await;
        PickedLocation { coordinate, label }
    }

    pub async fn cancel_selection(&self) {
        self.batch.lock().await.cancel_pending_location();
    }

    pub async fn can_commit(&self) -> bool {
        self.batch.lock().await.can_commit()
    }

    /// Stamps the pending location onto the batch and queues the snapshot
    /// for the sink. The result does not wait for, or depend on, the sink.
    pub async fn commit(&self) -> CommitResult {
        let result = self.batch.lock().await.commit();

        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(err) => {
                let message = match err {
                    PreconditionError::NoImages => "Add images before applying a location",
                    PreconditionError::NoPendingLocation => {
                        "Select a location before applying it"
                    }
                };
                self.notify(NoticeLevel::Error, message);
                return Err(err);
            }
        };

        self.notify(
            NoticeLevel::Success,
            format!("Location applied to {} image(s)", snapshot.len()),
        );

        let payload = snapshot.payload();
        let sink = Arc::clone(&self.sink);
        let notices = self.notices.clone();
        let handle = tokio::spawn(async move {
            let notice = match sink.save(&payload).await {
                Ok(ack) => {
                    info!("batch saved by {}", ack.sinks.join(", "));
                    Notice::new(NoticeLevel::Info, "Batch saved")
                }
                Err(err) => {
                    warn!("saving batch failed: {err}");
                    Notice::new(NoticeLevel::Error, format!("Saving failed: {err}"))
                }
            };
            let _ = notices.send(notice);
        });
        let mut pending = self.pending_saves.lock().await;
        pending.retain(|save| !save.is_finished());
        pending.push(handle);

        Ok(snapshot)
    }

    /// Waits for every sink save queued so far.
    pub async fn flush(&self) {
        let handles = mem::take(&mut *self.pending_saves.lock().await);
        for handle in handles {
            if let Err(err) = handle.await {
                warn!("sink task ended abnormally: {err}");
            }
        }
    }

    /// Number of sink saves still running.
    pub async fn pending_saves(&self) -> usize {
        let mut pending = self.pending_saves.lock().await;
        pending.retain(|save| !save.is_finished());
        pending.len()
    }

    pub async fn status(&self) -> BatchStatus {
        self.batch.lock().await.status()
    }

    pub async fn export(&self) -> BatchExport {
        self.batch.lock().await.export()
    }

    fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        let _ = self.notices.send(Notice::new(level, message));
    }
}

async fn extract_detached(
    extractor: Arc<dyn GeoExtractor>,
    file: Arc<RawFile>,
    timeout: Option<Duration>,
) -> Option<Coordinate> {
    let task_file = Arc::clone(&file);
    let handle = tokio::task::spawn_blocking(move || extractor.extract(&task_file.bytes));

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, handle).await {
            Ok(joined) => joined,
            Err(_) => {
                debug!("{}: extraction timed out after {limit:?}", file.name);
                return None;
            }
        },
        None => handle.await,
    };

    joined.unwrap_or_else(|err| {
        warn!("{}: metadata reader failed: {err}", file.name);
        None
    })
}
