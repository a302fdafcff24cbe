// Recording orchestration
//
// Turns the recording settings into a bounded capture session, builds the
// camera that names its outputs, and produces the command line a scheduled job
// runs to invoke the recorder.

use crate::capture::{run_session, CaptureDevice, CommandCamera};
use crate::config::Settings;
use crate::errors::{SessionError, ValidationError};
use crate::models::{CaptureSession, IntervalFloorPolicy, RecordingKind, SessionReport};
use crate::naming::MediaNamer;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};

/// Recorder runs one recording with a fixed settings snapshot
pub struct Recorder {
    settings: Settings,
    single_video: bool,
}

impl Recorder {
    /// `single_video` limits a video recording to one unnumbered session,
    /// as used by scheduled runs
    pub fn new(settings: Settings, single_video: bool) -> Self {
        Self {
            settings,
            single_video,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Session bounds for the configured recording kind
    pub fn session(&self) -> Result<CaptureSession, ValidationError> {
        match self.settings.recording.kind {
            RecordingKind::Image => CaptureSession::new(0.0, 1, 1, 0.0, IntervalFloorPolicy::Clamp),
            RecordingKind::ImageSequence => {
                let image = &self.settings.image;
                CaptureSession::new(
                    image.wait_seconds,
                    image.max_count,
                    image.max_duration_seconds,
                    image.min_wait_seconds,
                    image.floor_policy,
                )
            }
            RecordingKind::Video => {
                // Sessions run back to back, each lasting the full recording time
                let sessions = self.video_sessions();
                let budget = self
                    .settings
                    .video
                    .recording_seconds()
                    .max(1)
                    .saturating_mul(u64::from(sessions));
                CaptureSession::new(0.0, sessions, budget, 0.0, IntervalFloorPolicy::Clamp)
            }
        }
    }

    fn video_sessions(&self) -> u32 {
        if self.single_video {
            1
        } else {
            self.settings.video.sessions.max(1)
        }
    }

    /// Camera writing into the recording directory, named for `planned` captures
    pub fn camera(&self, planned: usize) -> CommandCamera {
        let recording = &self.settings.recording;
        let namer = MediaNamer::new(
            recording.label.clone(),
            recording.host.clone(),
            recording.kind,
            planned,
            self.single_video || self.video_sessions() == 1,
        );

        match recording.kind {
            RecordingKind::Video => CommandCamera::new(
                self.settings.camera.video_command.clone(),
                namer,
                recording.dir.clone(),
                self.settings.video.quality,
                Duration::from_secs(self.settings.video.recording_seconds()),
            ),
            RecordingKind::Image | RecordingKind::ImageSequence => CommandCamera::new(
                self.settings.camera.still_command.clone(),
                namer,
                recording.dir.clone(),
                self.settings.image.quality,
                Duration::ZERO,
            ),
        }
    }

    /// Run the recording against `device`
    #[instrument(skip(self, device), fields(kind = %self.settings.recording.kind, label = %self.settings.recording.label))]
    pub async fn record<D>(&self, device: &D) -> Result<SessionReport, SessionError>
    where
        D: CaptureDevice + ?Sized,
    {
        let session = self.session()?;
        info!(
            planned = session.effective_count(),
            interval_seconds = session.interval_seconds(),
            "Starting recording"
        );
        run_session(&session, device).await
    }

    /// Run the recording with the configured capture command
    pub async fn record_with_camera(&self) -> Result<SessionReport, SessionError> {
        let session = self.session()?;
        let camera = self.camera(session.effective_count() as usize);
        self.record(&camera).await
    }
}

/// JobCommand builds the command line a scheduled job runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobCommand {
    recorder_program: PathBuf,
    config_dir: PathBuf,
    log_dir: PathBuf,
}

impl JobCommand {
    pub fn new(
        recorder_program: impl Into<PathBuf>,
        config_dir: impl Into<PathBuf>,
        log_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            recorder_program: recorder_program.into(),
            config_dir: config_dir.into(),
            log_dir: log_dir.into(),
        }
    }

    /// Command for the job with user-facing name `job_name`
    ///
    /// Output goes to a per-day, per-host log file in the log directory.
    pub fn build(&self, job_name: &str) -> String {
        format!(
            "{} run --single-video --config-dir {} >> {}/`date +\\%y\\%m\\%d_$HOSTNAME`_{}.log 2>&1",
            shell_quote(&self.recorder_program),
            shell_quote(&self.config_dir),
            shell_quote(&self.log_dir),
            cron_escape(job_name),
        )
    }
}

/// Quote a path for `sh`, leaving plain paths untouched
fn shell_quote(path: &Path) -> String {
    let text = path.to_string_lossy();
    let plain = !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+:,=@".contains(c));
    if plain {
        text.into_owned()
    } else {
        cron_escape(&format!("'{}'", text.replace('\'', r"'\''")))
    }
}

/// cron turns an unescaped `%` into a newline
fn cron_escape(text: &str) -> String {
    text.replace('%', r"\%")
}
