//! Batch orchestration: one settings object, many sources, one artifact each.
//!
//! Sources are processed strictly in order and one at a time. Each source is
//! read, decoded, rendered and encoded, then its artifact goes to the
//! [`Exporter`] before the next source is read, so at most one source and one
//! artifact are alive at once.
//!
//! Failures are isolated per item: a source that cannot be read, decoded or
//! rendered is recorded in the [`BatchReport`] and the run moves on. Export
//! failures are recorded beside the artifact they concern.
//!
//! ## Progress events
//!
//! When a channel is supplied, a [`BatchEvent`] is sent as each item settles.
//! The CLI renders these with [`output::format_batch_event`](crate::output::format_batch_event).

use crate::export::{DirectoryExporter, ExportError, ExportReceipt, Exporter};
use crate::imaging::{
    BackendError, ImageBackend, ResizeSettings, SourceId, mime_from_file_name, produce_artifact,
};
use crate::types::ArtifactInfo;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{error, info, warn};

/// Failures that stop a whole run before any item is processed.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("No input images given")]
    NoSources,
}

/// Where a pending source's bytes come from.
#[derive(Debug, Clone)]
pub enum SourceData {
    /// Read lazily when the item's turn comes.
    Path(PathBuf),
    /// Already in memory, with a declared MIME type.
    Bytes { mime_type: String, bytes: Vec<u8> },
}

/// A source waiting to be processed.
#[derive(Debug, Clone)]
pub struct PendingSource {
    pub name: String,
    pub data: SourceData,
}

impl PendingSource {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            data: SourceData::Path(path),
        }
    }

    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            data: SourceData::Bytes {
                mime_type: mime_type.into(),
                bytes,
            },
        }
    }

    /// The source's bytes and MIME type. Files get a MIME type from their
    /// extension; the decoder sniffs the bytes either way.
    fn load(self) -> Result<(Vec<u8>, String), BackendError> {
        match self.data {
            SourceData::Path(path) => {
                let bytes = std::fs::read(&path)?;
                Ok((bytes, mime_from_file_name(&self.name).to_string()))
            }
            SourceData::Bytes { mime_type, bytes } => Ok((bytes, mime_type)),
        }
    }
}

/// Progress event, sent as each item settles.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Started {
        total: usize,
    },
    ItemDone {
        /// 1-based position in the batch.
        index: usize,
        total: usize,
        name: String,
        artifact: ArtifactInfo,
        /// `Err` carries the export failure message; the artifact is still valid.
        export: Result<PathBuf, String>,
    },
    ItemFailed {
        index: usize,
        total: usize,
        name: String,
        error: String,
    },
}

/// A successfully encoded item and what happened when it was exported.
#[derive(Debug)]
pub struct ProcessedItem {
    pub artifact: ArtifactInfo,
    pub export: Result<ExportReceipt, ExportError>,
}

/// One entry of a [`BatchReport`], in input order.
#[derive(Debug)]
pub struct BatchItem {
    /// 1-based position in the batch.
    pub index: usize,
    pub name: String,
    /// Known once the source decoded.
    pub source_id: Option<SourceId>,
    pub outcome: Result<ProcessedItem, BackendError>,
}

/// Per-item results of a run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.outcome.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    /// Items that encoded fine but could not be exported.
    pub fn export_failures(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(&i.outcome, Ok(p) if p.export.is_err()))
            .count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0 && self.export_failures() == 0
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} processed", self.succeeded(), self.total())
    }
}

fn emit(events: Option<&Sender<BatchEvent>>, event: BatchEvent) {
    if let Some(tx) = events {
        // The receiver going away only means nobody is watching.
        tx.send(event).ok();
    }
}

/// Process every source with the same settings.
///
/// Never fails as a whole: per-item errors are in the returned report.
pub fn process_all<B, E>(
    backend: &B,
    sources: impl IntoIterator<Item = PendingSource>,
    settings: &ResizeSettings,
    exporter: &E,
    events: Option<Sender<BatchEvent>>,
) -> BatchReport
where
    B: ImageBackend,
    E: Exporter + ?Sized,
{
    let sources: Vec<PendingSource> = sources.into_iter().collect();
    let total = sources.len();
    let events = events.as_ref();
    emit(events, BatchEvent::Started { total });
    info!(total, "batch started");

    let mut report = BatchReport::default();
    for (position, pending) in sources.into_iter().enumerate() {
        let index = position + 1;
        let name = pending.name.clone();
        let mut source_id = None;

        let outcome = pending.load().and_then(|(bytes, mime_type)| {
            let source = backend.decode(&bytes, &mime_type, &name)?;
            drop(bytes);
            source_id = Some(source.id());
            produce_artifact(backend, &source, settings)
        });

        let outcome = match outcome {
            Ok(artifact) => {
                let export = exporter.export(&artifact);
                let info = artifact.info();
                drop(artifact);

                if let Err(e) = &export {
                    warn!(source = %name, error = %e, "export failed");
                }
                emit(
                    events,
                    BatchEvent::ItemDone {
                        index,
                        total,
                        name: name.clone(),
                        artifact: info.clone(),
                        export: export
                            .as_ref()
                            .map(|r| r.destination.clone())
                            .map_err(|e| e.to_string()),
                    },
                );
                Ok(ProcessedItem {
                    artifact: info,
                    export,
                })
            }
            Err(e) => {
                error!(source = %name, error = %e, "item failed");
                emit(
                    events,
                    BatchEvent::ItemFailed {
                        index,
                        total,
                        name: name.clone(),
                        error: e.to_string(),
                    },
                );
                Err(e)
            }
        };

        report.items.push(BatchItem {
            index,
            name,
            source_id,
            outcome,
        });
    }

    info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        "batch finished"
    );
    report
}

/// Process every source into files under `out_dir`.
pub fn run_to_directory<B: ImageBackend>(
    backend: &B,
    sources: Vec<PendingSource>,
    settings: &ResizeSettings,
    out_dir: &Path,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchReport, BatchError> {
    if sources.is_empty() {
        return Err(BatchError::NoSources);
    }
    let exporter = DirectoryExporter::create(out_dir).map_err(|source| BatchError::OutputDir {
        path: out_dir.to_path_buf(),
        source,
    })?;
    Ok(process_all(backend, sources, settings, &exporter, events))
}
