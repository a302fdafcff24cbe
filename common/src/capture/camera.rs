// Camera driven through an external capture program
//
// Each capture runs the configured argument template with the placeholders
// replaced, inside the recording directory.

use crate::capture::CaptureDevice;
use crate::errors::CaptureError;
use crate::models::CaptureResult;
use crate::naming::MediaNamer;
use async_trait::async_trait;
use chrono::Local;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// CommandCamera captures by spawning a still or video program
pub struct CommandCamera {
    command: Vec<String>,
    namer: MediaNamer,
    workdir: PathBuf,
    quality: u32,
    duration: Duration,
}

impl CommandCamera {
    pub fn new(
        command: Vec<String>,
        namer: MediaNamer,
        workdir: impl Into<PathBuf>,
        quality: u32,
        duration: Duration,
    ) -> Self {
        Self {
            command,
            namer,
            workdir: workdir.into(),
            quality,
            duration,
        }
    }

    fn render_args(&self, output: &str) -> Vec<String> {
        let duration_ms = self.duration.as_millis().to_string();
        let quality = self.quality.to_string();
        self.command
            .iter()
            .map(|arg| {
                arg.replace("{output}", output)
                    .replace("{quality}", &quality)
                    .replace("{duration_ms}", &duration_ms)
            })
            .collect()
    }
}

#[async_trait]
impl CaptureDevice for CommandCamera {
    async fn capture(&self, index: usize) -> Result<CaptureResult, CaptureError> {
        let output = self.namer.name(index, &Local::now());
        let args = self.render_args(&output);
        let (program, rest) = args.split_first().ok_or_else(|| CaptureError::CommandFailed {
            program: String::new(),
            reason: "capture command is empty".to_string(),
        })?;

        debug!(program = %program, args = ?rest, "Running capture command");

        let result = Command::new(program)
            .args(rest)
            .current_dir(&self.workdir)
            .output()
            .await
            .map_err(|e| CaptureError::CommandFailed {
                program: program.clone(),
                reason: e.to_string(),
            })?;

        if !result.status.success() {
            return Err(CaptureError::CommandFailed {
                program: program.clone(),
                reason: format!(
                    "{}: {}",
                    result.status,
                    String::from_utf8_lossy(&result.stderr).trim()
                ),
            });
        }

        Ok(CaptureResult {
            output,
            completed_at: Local::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordingKind;
    use tempfile::TempDir;

    fn namer(kind: RecordingKind) -> MediaNamer {
        MediaNamer::new("pilot", "pi01", kind, 10, false)
    }

    #[test]
    fn test_placeholders_are_replaced() {
        let camera = CommandCamera::new(
            vec![
                "libcamera-vid".to_string(),
                "-t".to_string(),
                "{duration_ms}".to_string(),
                "-q".to_string(),
                "{quality}".to_string(),
                "-o".to_string(),
                "{output}".to_string(),
            ],
            namer(RecordingKind::Video),
            ".",
            11,
            Duration::from_secs(20),
        );
        let args = camera.render_args("clip.h264");
        assert_eq!(
            args,
            vec!["libcamera-vid", "-t", "20000", "-q", "11", "-o", "clip.h264"]
        );
    }

    #[tokio::test]
    async fn test_capture_writes_into_workdir() {
        let dir = TempDir::new().unwrap();
        let camera = CommandCamera::new(
            vec![
                "sh".to_string(),
                "-c".to_string(),
                "touch \"$0\"".to_string(),
                "{output}".to_string(),
            ],
            namer(RecordingKind::ImageSequence),
            dir.path(),
            50,
            Duration::ZERO,
        );

        let result = camera.capture(0).await.unwrap();

        assert!(result.output.contains("_im001_"));
        assert!(dir.path().join(&result.output).exists());
    }

    #[tokio::test]
    async fn test_failing_command_is_reported() {
        let dir = TempDir::new().unwrap();
        let camera = CommandCamera::new(
            vec!["sh".to_string(), "-c".to_string(), "exit 3".to_string()],
            namer(RecordingKind::Image),
            dir.path(),
            50,
            Duration::ZERO,
        );

        let err = camera.capture(0).await.unwrap_err();
        assert!(matches!(err, CaptureError::CommandFailed { ref program, .. } if program == "sh"));
    }

    #[tokio::test]
    async fn test_missing_program_is_reported() {
        let camera = CommandCamera::new(
            vec!["definitely-not-a-camera-program".to_string()],
            namer(RecordingKind::Image),
            ".",
            50,
            Duration::ZERO,
        );
        assert!(camera.capture(0).await.is_err());
    }
}
