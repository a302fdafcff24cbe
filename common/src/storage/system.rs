// The user's crontab, driven through the `crontab` program

use super::{CronTable, JobTable};
use crate::errors::StorageError;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// SystemCrontab reads with `crontab -l` and replaces with `crontab -`
pub struct SystemCrontab {
    program: String,
    user: Option<String>,
}

impl Default for SystemCrontab {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemCrontab {
    /// Table of the invoking user
    pub fn new() -> Self {
        Self {
            program: "crontab".to_string(),
            user: None,
        }
    }

    /// Table of another user (needs the privileges `crontab -u` requires)
    pub fn for_user(user: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            ..Self::new()
        }
    }

    /// Use a different program with the same interface as `crontab`
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn command(&self, action: &str) -> Command {
        let mut command = Command::new(&self.program);
        if let Some(user) = &self.user {
            command.arg("-u").arg(user);
        }
        command.arg(action);
        command
    }

    fn describe(&self, action: &str) -> String {
        format!("{} {}", self.program, action)
    }
}

#[async_trait]
impl JobTable for SystemCrontab {
    async fn read(&self) -> Result<CronTable, StorageError> {
        let output = self
            .command("-l")
            .output()
            .await
            .map_err(|e| StorageError::CommandFailed {
                command: self.describe("-l"),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("no crontab for") {
                debug!("No crontab installed yet, starting empty");
                return Ok(CronTable::new());
            }
            return Err(StorageError::CommandFailed {
                command: self.describe("-l"),
                reason: format!("{}: {}", output.status, stderr.trim()),
            });
        }

        let text = String::from_utf8(output.stdout)
            .map_err(|e| StorageError::ReadFailed(format!("crontab is not UTF-8: {}", e)))?;
        Ok(CronTable::parse(&text))
    }

    async fn write(&self, table: &CronTable) -> Result<(), StorageError> {
        let failed = |reason: String| StorageError::CommandFailed {
            command: self.describe("-"),
            reason,
        };

        let mut child = self
            .command("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| failed(e.to_string()))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| failed("stdin not captured".to_string()))?;
        stdin
            .write_all(table.render().as_bytes())
            .await
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        // Closing stdin lets crontab install the new table
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| failed(e.to_string()))?;
        if !output.status.success() {
            return Err(failed(format!(
                "{}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        debug!("Crontab installed");
        Ok(())
    }
}
