// Bootstrap utilities for binary initialization
// Shared by the recorder and scheduler binaries

use crate::config::Settings;
use crate::storage::{FileCrontab, JobTable, SystemCrontab};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Binary name of the recorder, looked up next to the running executable
pub const RECORDER_BINARY: &str = "recorder";

/// Load and validate settings from `config_dir`
///
/// # Errors
/// Returns error if a configuration source is malformed or a value is out of range
pub fn load_settings(config_dir: &Path) -> Result<Settings> {
    let settings = Settings::load_from_path(config_dir)
        .with_context(|| format!("Failed to load configuration from {}", config_dir.display()))?;
    settings
        .validate()
        .context("Configuration validation failed")?;
    Ok(settings)
}

/// Open the periodic-task table selected by the settings
/// Used by: Scheduler
///
/// A configured `scheduler.crontab_file` is used as a plain file; otherwise
/// the invoking user's crontab is driven through the `crontab` program.
pub fn init_job_table(settings: &Settings) -> Arc<dyn JobTable> {
    match &settings.scheduler.crontab_file {
        Some(path) => {
            info!(path = %path.display(), "Using file-backed job table");
            Arc::new(FileCrontab::new(path.clone()))
        }
        None => {
            info!("Using the user's crontab");
            Arc::new(SystemCrontab::new())
        }
    }
}

/// Create the recording directory if it doesn't exist
/// Used by: Recorder
///
/// # Errors
/// Returns error if the directory cannot be created
#[tracing::instrument(skip(settings))]
pub async fn init_recording_dir(settings: &Settings) -> Result<PathBuf> {
    let dir = settings.recording.dir.clone();
    if !dir.exists() {
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create recording directory {}", dir.display()))?;
        info!(path = %dir.display(), "Created recording directory");
    }
    Ok(dir)
}

/// Resolve the recorder binary that scheduled jobs invoke
/// Used by: Scheduler
///
/// An empty `scheduler.recorder_program` means the `recorder` binary installed
/// alongside the running executable.
///
/// # Errors
/// Returns error if the running executable cannot be located
pub fn resolve_recorder_program(settings: &Settings) -> Result<PathBuf> {
    if !settings.scheduler.recorder_program.is_empty() {
        return Ok(PathBuf::from(&settings.scheduler.recorder_program));
    }
    let exe = std::env::current_exe().context("Failed to locate the running executable")?;
    let dir = exe
        .parent()
        .context("Running executable has no parent directory")?;
    Ok(dir.join(RECORDER_BINARY))
}

/// Make a path absolute against the current directory
///
/// Scheduled jobs run from the user's home directory, so paths baked into a
/// job command must not be relative.
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to read the current directory")?;
    Ok(cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_settings_rejects_invalid_values() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("default.toml"), "[video]\nquality = 99\n").unwrap();
        let err = load_settings(dir.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("video.quality"));
    }

    #[test]
    fn test_load_settings_reads_local_overrides() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("default.toml"), "[recording]\nlabel = \"base\"\n").unwrap();
        std::fs::write(dir.path().join("local.toml"), "[recording]\nlabel = \"pilot\"\n").unwrap();
        let settings = load_settings(dir.path()).unwrap();
        assert_eq!(settings.recording.label, "pilot");
    }

    #[test]
    fn test_configured_recorder_program_wins() {
        let mut settings = Settings::default();
        settings.scheduler.recorder_program = "/usr/local/bin/recorder".to_string();
        assert_eq!(
            resolve_recorder_program(&settings).unwrap(),
            PathBuf::from("/usr/local/bin/recorder")
        );
    }

    #[test]
    fn test_default_recorder_program_sits_next_to_executable() {
        let program = resolve_recorder_program(&Settings::default()).unwrap();
        assert_eq!(program.file_name().unwrap(), RECORDER_BINARY);
    }

    #[test]
    fn test_absolute_path() {
        assert_eq!(absolute_path(Path::new("/tmp/x")).unwrap(), PathBuf::from("/tmp/x"));
        assert!(absolute_path(Path::new("logs")).unwrap().is_absolute());
    }

    #[tokio::test]
    async fn test_init_recording_dir_creates_directory() {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.recording.dir = dir.path().join("media");
        let created = init_recording_dir(&settings).await.unwrap();
        assert!(created.is_dir());
    }
}
