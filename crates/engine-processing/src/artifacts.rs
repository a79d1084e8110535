use crate::error::ArtifactError;
use chrono::Utc;
use model::{
    core::kind::RecordKind,
    execution::{failed_batch::FailedBatchArtifact, failed_record::FailedRecordEntry},
};
use serde::Serialize;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::{fs::OpenOptions, io::AsyncWriteExt};
use tracing::{debug, info};

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%3f";

/// Writes failed records and failed batches as pretty-printed JSON files
/// under a fixed directory.
///
/// Files are never overwritten: a name already taken gets a `_<n>` suffix.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
    kind: RecordKind,
}

impl ArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>, kind: RecordKind) -> Self {
        Self {
            dir: dir.into(),
            kind,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `failed_<label>_<timestamp>.json` holding every rejected record of a run.
    pub async fn write_failed_records(
        &self,
        entries: &[FailedRecordEntry],
    ) -> Result<PathBuf, ArtifactError> {
        let stem = format!(
            "failed_{}_{}",
            self.kind.artifact_label(),
            Utc::now().format(TIMESTAMP_FORMAT)
        );
        let path = self.write_json(&stem, entries).await?;

        info!(
            path = %path.display(),
            count = entries.len(),
            "Wrote failed records artifact"
        );
        Ok(path)
    }

    /// `failed_batch_<n>_<label>_<timestamp>.json` holding one batch that
    /// exhausted its retries.
    pub async fn write_failed_batch(
        &self,
        artifact: &FailedBatchArtifact,
    ) -> Result<PathBuf, ArtifactError> {
        let stem = format!(
            "failed_batch_{}_{}_{}",
            artifact.batch_number,
            self.kind.artifact_label(),
            artifact.failed_at.format(TIMESTAMP_FORMAT)
        );
        let path = self.write_json(&stem, artifact).await?;

        info!(
            path = %path.display(),
            batch_number = artifact.batch_number,
            records = artifact.records.len(),
            "Wrote failed batch artifact"
        );
        Ok(path)
    }

    async fn write_json<S: Serialize + ?Sized>(
        &self,
        stem: &str,
        value: &S,
    ) -> Result<PathBuf, ArtifactError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_vec_pretty(value)?;

        let mut suffix = 0u32;
        loop {
            let name = match suffix {
                0 => format!("{stem}.json"),
                n => format!("{stem}_{n}.json"),
            };
            let path = self.dir.join(name);

            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    file.write_all(&json).await?;
                    file.flush().await?;
                    debug!(path = %path.display(), "Artifact flushed");
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => suffix += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }
}
