// Configuration management with layered configuration (defaults, file, env)

use crate::errors::ValidationError;
use crate::models::{IntervalFloorPolicy, RecordingKind};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main settings structure containing all configuration options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub recording: RecordingConfig,
    pub image: ImageConfig,
    pub video: VideoConfig,
    pub camera: CameraConfig,
    pub scheduler: SchedulerConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Directory the media files are written to
    pub dir: PathBuf,
    pub label: String,
    pub kind: RecordingKind,
    /// Host name embedded in file names
    pub host: String,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("recordings"),
            label: "test".to_string(),
            kind: RecordingKind::Video,
            host: default_host(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Requested delay between subsequent images
    pub wait_seconds: f64,
    pub max_count: u32,
    pub max_duration_seconds: u64,
    /// JPEG quality, 1-100
    pub quality: u32,
    /// Shortest interval the camera can sustain at full resolution
    pub min_wait_seconds: f64,
    pub floor_policy: IntervalFloorPolicy,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            wait_seconds: 5.0,
            max_count: 100,
            max_duration_seconds: 600,
            quality: 50,
            min_wait_seconds: 0.45,
            floor_policy: IntervalFloorPolicy::Clamp,
        }
    }
}

/// Longest single video, duration plus delay
pub const MAX_VIDEO_SECONDS: u64 = 24 * 60 * 60;
/// Session markers are two digits
pub const MAX_VIDEO_SESSIONS: u32 = 99;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub duration_seconds: u64,
    /// Extra acclimatisation time recorded on top of the duration
    pub delay_seconds: u64,
    /// H264 quality, 10 (best) to 40 (worst)
    pub quality: u32,
    pub sessions: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 10,
            delay_seconds: 10,
            quality: 11,
            sessions: 1,
        }
    }
}

impl VideoConfig {
    pub fn recording_seconds(&self) -> u64 {
        self.duration_seconds.saturating_add(self.delay_seconds)
    }
}

/// Command templates run for every capture.
///
/// Placeholders: `{output}`, `{quality}`, `{duration_ms}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub still_command: Vec<String>,
    pub video_command: Vec<String>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        let args = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            still_command: args(&["libcamera-still", "-n", "-q", "{quality}", "-o", "{output}"]),
            video_command: args(&[
                "libcamera-vid",
                "-n",
                "-t",
                "{duration_ms}",
                "-o",
                "{output}",
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Prefix marking table entries owned by this system
    pub job_prefix: String,
    /// Plain file holding the table; the user's crontab is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crontab_file: Option<PathBuf>,
    /// Recorder binary invoked by scheduled jobs; empty means next to the scheduler binary
    pub recorder_program: String,
    /// Directory receiving the output of scheduled runs
    pub log_dir: PathBuf,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            job_prefix: "AR_".to_string(),
            crontab_file: None,
            recorder_program: String::new(),
            log_dir: PathBuf::from("logs"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub json_logs: bool,
    /// When set, logs are also appended to a file in this directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            log_dir: None,
        }
    }
}

/// Sparse update: only fields that are `Some` overwrite the current settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SettingsUpdate {
    pub recording_dir: Option<PathBuf>,
    pub label: Option<String>,
    pub kind: Option<RecordingKind>,
    pub image_wait_seconds: Option<f64>,
    pub image_max_count: Option<u32>,
    pub image_max_duration_seconds: Option<u64>,
    pub image_quality: Option<u32>,
    pub video_duration_seconds: Option<u64>,
    pub video_delay_seconds: Option<u64>,
    pub video_quality: Option<u32>,
    pub video_sessions: Option<u32>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        *self == SettingsUpdate::default()
    }
}

fn default_host() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|host| host.trim().to_string())
        .filter(|host| !host.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn overwrite<T: PartialEq>(target: &mut T, value: Option<T>) -> bool {
    match value {
        Some(value) if *target != value => {
            *target = value;
            true
        }
        _ => false,
    }
}

impl Settings {
    /// Load configuration from the `config` directory
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config")
    }

    /// Load configuration with layered precedence: defaults → default.toml → local.toml → env
    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Values stored with `save_local`
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(
                Environment::with_prefix("RECORDER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Persist the current settings as `local.toml` inside the config directory
    pub fn save_local<P: AsRef<Path>>(&self, config_dir: P) -> anyhow::Result<PathBuf> {
        let config_dir = config_dir.as_ref();
        std::fs::create_dir_all(config_dir)?;
        let path = config_dir.join("local.toml");
        std::fs::write(&path, toml::to_string_pretty(self)?)?;
        tracing::info!(path = %path.display(), "Config settings stored");
        Ok(path)
    }

    /// Apply a sparse update, returning whether anything changed
    pub fn apply_updates(&mut self, update: SettingsUpdate) -> bool {
        let mut changed = false;
        changed |= overwrite(&mut self.recording.dir, update.recording_dir);
        changed |= overwrite(&mut self.recording.label, update.label);
        changed |= overwrite(&mut self.recording.kind, update.kind);
        changed |= overwrite(&mut self.image.wait_seconds, update.image_wait_seconds);
        changed |= overwrite(&mut self.image.max_count, update.image_max_count);
        changed |= overwrite(
            &mut self.image.max_duration_seconds,
            update.image_max_duration_seconds,
        );
        changed |= overwrite(&mut self.image.quality, update.image_quality);
        changed |= overwrite(&mut self.video.duration_seconds, update.video_duration_seconds);
        changed |= overwrite(&mut self.video.delay_seconds, update.video_delay_seconds);
        changed |= overwrite(&mut self.video.quality, update.video_quality);
        changed |= overwrite(&mut self.video.sessions, update.video_sessions);
        changed
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.recording.label.is_empty() {
            return Err(ValidationError::MissingField("recording.label".to_string()));
        }
        if self.recording.host.is_empty() {
            return Err(ValidationError::MissingField("recording.host".to_string()));
        }

        if !self.image.wait_seconds.is_finite() || self.image.wait_seconds < 0.0 {
            return Err(ValidationError::invalid(
                "image.wait_seconds",
                "must be a non-negative number",
            ));
        }
        if !self.image.min_wait_seconds.is_finite() || self.image.min_wait_seconds < 0.0 {
            return Err(ValidationError::invalid(
                "image.min_wait_seconds",
                "must be a non-negative number",
            ));
        }
        if self.image.max_count == 0 {
            return Err(ValidationError::invalid("image.max_count", "must be at least 1"));
        }
        if self.image.max_duration_seconds == 0 {
            return Err(ValidationError::invalid(
                "image.max_duration_seconds",
                "must be at least 1",
            ));
        }
        if !(1..=100).contains(&self.image.quality) {
            return Err(ValidationError::invalid(
                "image.quality",
                format!("{} is outside 1-100", self.image.quality),
            ));
        }

        if self.video.duration_seconds == 0 {
            return Err(ValidationError::invalid(
                "video.duration_seconds",
                "must be at least 1",
            ));
        }
        if !(10..=40).contains(&self.video.quality) {
            return Err(ValidationError::invalid(
                "video.quality",
                format!("{} is outside 10-40", self.video.quality),
            ));
        }
        if self.video.recording_seconds() > MAX_VIDEO_SECONDS {
            return Err(ValidationError::invalid(
                "video.duration_seconds",
                format!(
                    "duration plus delay of {}s exceeds {}s",
                    self.video.recording_seconds(),
                    MAX_VIDEO_SECONDS
                ),
            ));
        }
        if !(1..=MAX_VIDEO_SESSIONS).contains(&self.video.sessions) {
            return Err(ValidationError::invalid(
                "video.sessions",
                format!("{} is outside 1-{}", self.video.sessions, MAX_VIDEO_SESSIONS),
            ));
        }

        if self.camera.still_command.is_empty() {
            return Err(ValidationError::MissingField("camera.still_command".to_string()));
        }
        if self.camera.video_command.is_empty() {
            return Err(ValidationError::MissingField("camera.video_command".to_string()));
        }

        if self.scheduler.job_prefix.is_empty() {
            return Err(ValidationError::MissingField("scheduler.job_prefix".to_string()));
        }

        Ok(())
    }
}
