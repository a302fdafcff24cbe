// Periodic-task table kept in a plain file
//
// Used when `scheduler.crontab_file` is configured, e.g. for a system-wide
// table installed by the deployment or for testing without a cron daemon.

use super::{CronTable, JobTable};
use crate::errors::StorageError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct FileCrontab {
    path: PathBuf,
}

impl FileCrontab {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl JobTable for FileCrontab {
    async fn read(&self) -> Result<CronTable, StorageError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(CronTable::parse(&text)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Job table file missing, starting empty");
                Ok(CronTable::new())
            }
            Err(e) => Err(StorageError::ReadFailed(format!(
                "{}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn write(&self, table: &CronTable) -> Result<(), StorageError> {
        let write_failed =
            |e: std::io::Error| StorageError::WriteFailed(format!("{}: {}", self.path.display(), e));

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
        }

        // Replace atomically so a reader never sees a half-written table
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, table.render())
            .await
            .map_err(write_failed)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(write_failed)?;

        debug!(path = %self.path.display(), "Job table written");
        Ok(())
    }
}
