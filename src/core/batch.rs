use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::extract::{ExifGeoExtractor, GeoExtractor};
use crate::models::{
    BatchExport, BatchSnapshot, BatchStatus, Coordinate, ExportMetadata, ExportedImage, ImageId,
    ImageRecord, RawFile, SnapshotEntry, EXPORT_VERSION,
};

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ValidationError {
    #[error("{name} is not an image ({mime_type})")]
    NotAnImage { name: String, mime_type: String },
    #[error("an image named {name} is already in the batch")]
    DuplicateName { name: String },
}

impl ValidationError {
    pub fn name(&self) -> &str {
        match self {
            Self::NotAnImage { name, .. } | Self::DuplicateName { name } => name,
        }
    }
}

#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
pub enum PreconditionError {
    #[error("no images in the batch")]
    NoImages,
    #[error("no location has been selected")]
    NoPendingLocation,
}

#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
pub enum BatchError {
    #[error("ingest cancelled before any image was added")]
    Cancelled,
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
}

pub type CommitResult = Result<BatchSnapshot, PreconditionError>;

/// Per-call outcome of an ingest.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct IngestReport {
    pub accepted: usize,
    pub rejected: usize,
    pub duplicates: usize,
    pub located: usize,
    pub added: Vec<ImageId>,
    pub warnings: Vec<ValidationError>,
}

impl IngestReport {
    pub fn total(&self) -> usize {
        self.accepted + self.rejected + self.duplicates
    }

    fn reject(&mut self, error: ValidationError) {
        warn!("skipping file: {error}");
        match error {
            ValidationError::NotAnImage { .. } => self.rejected += 1,
            ValidationError::DuplicateName { .. } => self.duplicates += 1,
        }
        self.warnings.push(error);
    }
}

/// A file that passed screening, tagged with its position in the call.
pub(crate) struct Screened {
    pub(crate) index: usize,
    pub(crate) file: RawFile,
}

pub(crate) struct Extracted {
    pub(crate) index: usize,
    pub(crate) file: RawFile,
    pub(crate) location: Option<Coordinate>,
}

/// Owns the ingested images and the location picked for them.
///
/// Every mutation goes through `&mut self`, so one owner applies changes one
/// at a time. Share it behind a lock (see [`crate::app::Workbench`]) when
/// several tasks need it.
pub struct BatchStore {
    images: Vec<ImageRecord>,
    pending_location: Option<Coordinate>,
    extractor: Arc<dyn GeoExtractor>,
}

impl Default for BatchStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BatchStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchStore")
            .field("images", &self.images.len())
            .field("pending_location", &self.pending_location)
            .finish_non_exhaustive()
    }
}

impl BatchStore {
    pub fn new() -> Self {
        Self::with_extractor(Arc::new(ExifGeoExtractor))
    }

    pub fn with_extractor(extractor: Arc<dyn GeoExtractor>) -> Self {
        Self {
            images: Vec::new(),
            pending_location: None,
            extractor,
        }
    }

    pub fn extractor(&self) -> Arc<dyn GeoExtractor> {
        Arc::clone(&self.extractor)
    }

    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    pub fn get(&self, id: ImageId) -> Option<&ImageRecord> {
        self.images.iter().find(|record| record.id == id)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.images.iter().any(|record| record.name == name)
    }

    pub fn pending_location(&self) -> Option<&Coordinate> {
        self.pending_location.as_ref()
    }

    pub fn ingest(&mut self, files: Vec<RawFile>) -> IngestReport {
        let (accepted, mut report) = self.screen(files);
        let extracted = extract_all(self.extractor.as_ref(), accepted, None).unwrap_or_default();
        self.merge(extracted, &mut report);
        report
    }

    /// Like [`ingest`](Self::ingest), but gives up without touching the batch
    /// if `cancel` is raised before the extracted files are merged.
    pub fn ingest_with_cancel(
        &mut self,
        files: Vec<RawFile>,
        cancel: Option<&AtomicBool>,
    ) -> Result<IngestReport, BatchError> {
        let (accepted, mut report) = self.screen(files);
        let extracted =
            extract_all(self.extractor.as_ref(), accepted, cancel).ok_or(BatchError::Cancelled)?;
        self.merge(extracted, &mut report);
        Ok(report)
    }

    pub fn remove(&mut self, id: ImageId) -> bool {
        let Some(index) = self.images.iter().position(|record| record.id == id) else {
            debug!("remove: {id} not found");
            return false;
        };

        let removed = self.images.remove(index);
        info!("removed {} from batch", removed.name);
        true
    }

    pub fn clear_all(&mut self) {
        self.images.clear();
        self.pending_location = None;
    }

    pub fn select_location(&mut self, coordinate: Coordinate) {
        debug!("pending location set to {coordinate}");
        self.pending_location = Some(coordinate);
    }

    pub fn cancel_pending_location(&mut self) {
        self.pending_location = None;
    }

    pub fn can_commit(&self) -> bool {
        !self.images.is_empty() && self.pending_location.is_some()
    }

    /// Stamps the pending location onto every image and returns a snapshot.
    ///
    /// The pending location is kept so later ingests can be committed with it too.
    pub fn commit(&mut self) -> CommitResult {
        if self.images.is_empty() {
            return Err(PreconditionError::NoImages);
        }
        let Some(location) = self.pending_location.clone() else {
            return Err(PreconditionError::NoPendingLocation);
        };

        for record in &mut self.images {
            record.stamp(location.clone());
        }

        info!("stamped {location} onto {} image(s)", self.images.len());
        Ok(self.snapshot())
    }

    pub fn snapshot(&self) -> BatchSnapshot {
        BatchSnapshot {
            images: self
                .images
                .iter()
                .map(|record| SnapshotEntry {
                    id: record.id,
                    name: record.name.clone(),
                    location: record.location().cloned(),
                    ingested_at: record.ingested_at,
                    source_path: record.source_path.clone(),
                })
                .collect(),
            committed_at: Utc::now(),
        }
    }

    pub fn status(&self) -> BatchStatus {
        BatchStatus {
            images_count: self.images.len(),
            has_location: self.pending_location.is_some(),
            selected_location: self.pending_location.clone(),
        }
    }

    pub fn export(&self) -> BatchExport {
        BatchExport {
            metadata: ExportMetadata {
                export_time: Utc::now(),
                version: String::from(EXPORT_VERSION),
            },
            images: self
                .images
                .iter()
                .map(|record| ExportedImage {
                    id: record.id,
                    name: record.name.clone(),
                    size: record.size_bytes,
                    mime_type: record.mime_type.clone(),
                    location: record.location().cloned(),
                    location_source: record.location_source(),
                    timestamp: record.ingested_at,
                })
                .collect(),
        }
    }

    /// Drops non-images and names already taken (in the batch or earlier in `files`).
    pub(crate) fn screen(&self, files: Vec<RawFile>) -> (Vec<Screened>, IngestReport) {
        let mut report = IngestReport::default();
        let mut taken: HashSet<String> = self
            .images
            .iter()
            .map(|record| record.name.clone())
            .collect();
        let mut accepted = Vec::with_capacity(files.len());

        for (index, file) in files.into_iter().enumerate() {
            if !file.is_image() {
                report.reject(ValidationError::NotAnImage {
                    name: file.name,
                    mime_type: file.mime_type,
                });
                continue;
            }

            if !taken.insert(file.name.clone()) {
                report.reject(ValidationError::DuplicateName { name: file.name });
                continue;
            }

            accepted.push(Screened { index, file });
        }

        (accepted, report)
    }

    /// Appends extracted files in call order. Names are checked again because
    /// the batch may have changed while extraction ran without the lock.
    pub(crate) fn merge(&mut self, mut extracted: Vec<Extracted>, report: &mut IngestReport) {
        extracted.sort_by_key(|item| item.index);

        let mut taken: HashSet<String> = self
            .images
            .iter()
            .map(|record| record.name.clone())
            .collect();

        for item in extracted {
            if !taken.insert(item.file.name.clone()) {
                report.reject(ValidationError::DuplicateName {
                    name: item.file.name,
                });
                continue;
            }

            if item.location.is_some() {
                report.located += 1;
            }

            let record = ImageRecord::from_raw(item.file, item.location);
            report.accepted += 1;
            report.added.push(record.id);
            self.images.push(record);
        }

        info!(
            "ingest: {} added ({} located), {} rejected, {} duplicate(s)",
            report.accepted, report.located, report.rejected, report.duplicates
        );
    }
}

fn extract_one(extractor: &dyn GeoExtractor, item: Screened) -> Extracted {
    let location = extractor.extract(&item.file.bytes);
    match &location {
        Some(coordinate) => debug!("{}: embedded location {coordinate}", item.file.name),
        None => debug!("{}: no usable embedded location", item.file.name),
    }

    Extracted {
        index: item.index,
        file: item.file,
        location,
    }
}

/// Runs extraction in parallel. `None` means the call was cancelled.
fn extract_all(
    extractor: &dyn GeoExtractor,
    files: Vec<Screened>,
    cancel: Option<&AtomicBool>,
) -> Option<Vec<Extracted>> {
    let is_cancelled = || cancel.is_some_and(|flag| flag.load(Ordering::Relaxed));

    let mut extracted: Vec<Extracted> = files
        .into_par_iter()
        .filter_map(|item| {
            if is_cancelled() {
                return None;
            }
            Some(extract_one(extractor, item))
        })
        .collect();

    if is_cancelled() {
        debug!("ingest cancelled before merge");
        return None;
    }

    extracted.sort_by_key(|item| item.index);
    Some(extracted)
}
