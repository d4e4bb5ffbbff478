//! Export collaborators: where finished artifacts go.
//!
//! Export is the last step for every artifact. A failed export is reported
//! next to the artifact; it does not invalidate it and is not retried.

use crate::types::EncodedArtifact;
use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Export blocked: {0}")]
    Blocked(String),
}

/// Where an artifact ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReceipt {
    pub destination: PathBuf,
}

/// Receives finished artifacts, one at a time, in processing order.
pub trait Exporter {
    fn export(&self, artifact: &EncodedArtifact) -> Result<ExportReceipt, ExportError>;
}

/// Writes each artifact as `<dir>/<file_name>`.
///
/// Files left by earlier runs are replaced. Within one exporter's lifetime a
/// name is never written twice: a repeated name gets a `-2`, `-3`, ... suffix
/// before its extension.
#[derive(Debug)]
pub struct DirectoryExporter {
    dir: PathBuf,
    written: Mutex<HashSet<OsString>>,
}

impl DirectoryExporter {
    /// Export into `dir`, creating it if needed.
    pub fn create(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            written: Mutex::new(HashSet::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Exporter for DirectoryExporter {
    fn export(&self, artifact: &EncodedArtifact) -> Result<ExportReceipt, ExportError> {
        // Names come from user files; never let one escape the output directory.
        let name = Path::new(&artifact.file_name);
        let Some(file_name) = name.file_name().filter(|f| Path::new(f) == name) else {
            return Err(ExportError::Blocked(format!(
                "refusing to write outside {}: {}",
                self.dir.display(),
                artifact.file_name
            )));
        };

        let file_name = {
            let mut written = self.written.lock().unwrap_or_else(PoisonError::into_inner);
            let unique = unique_name(file_name, &written);
            written.insert(unique.clone());
            unique
        };
        if file_name.as_os_str() != name.as_os_str() {
            debug!(
                requested = %artifact.file_name,
                used = %file_name.to_string_lossy(),
                "name already written this run"
            );
        }

        let destination = self.dir.join(&file_name);
        std::fs::write(&destination, &artifact.bytes).map_err(|source| ExportError::Io {
            path: destination.clone(),
            source,
        })?;
        debug!(path = %destination.display(), bytes = artifact.byte_size(), "exported");
        Ok(ExportReceipt { destination })
    }
}

/// `name`, or `<stem>-<n>.<ext>` for the smallest `n >= 2` not yet taken.
fn unique_name(name: &OsStr, taken: &HashSet<OsString>) -> OsString {
    if !taken.contains(name) {
        return name.to_os_string();
    }
    let path = Path::new(name);
    let stem = path.file_stem().unwrap_or(name).to_string_lossy();
    let extension = path.extension().map(|e| e.to_string_lossy());
    (2u32..)
        .map(|n| match &extension {
            Some(ext) => OsString::from(format!("{stem}-{n}.{ext}")),
            None => OsString::from(format!("{stem}-{n}")),
        })
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| name.to_os_string())
}
