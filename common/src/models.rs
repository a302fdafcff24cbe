use crate::errors::ValidationError;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Recording Models
// ============================================================================

/// RecordingKind selects what a session produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordingKind {
    /// One still image
    #[serde(rename = "img")]
    Image,
    /// A bounded sequence of still images
    #[serde(rename = "imgseq")]
    ImageSequence,
    /// One or more video segments
    #[serde(rename = "vid")]
    Video,
}

impl RecordingKind {
    pub fn extension(&self) -> &'static str {
        match self {
            RecordingKind::Image | RecordingKind::ImageSequence => "jpg",
            RecordingKind::Video => "h264",
        }
    }
}

impl std::fmt::Display for RecordingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordingKind::Image => write!(f, "img"),
            RecordingKind::ImageSequence => write!(f, "imgseq"),
            RecordingKind::Video => write!(f, "vid"),
        }
    }
}

impl FromStr for RecordingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "img" => Ok(RecordingKind::Image),
            "imgseq" => Ok(RecordingKind::ImageSequence),
            "vid" => Ok(RecordingKind::Video),
            _ => Err(format!("Invalid recording kind: {}", s)),
        }
    }
}

/// What happens when the requested interval is shorter than the achievable floor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalFloorPolicy {
    /// Capture back to back without further notice
    #[default]
    Clamp,
    /// Capture back to back and log a warning
    Warn,
    /// Refuse to start the session
    Reject,
}

impl FromStr for IntervalFloorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clamp" => Ok(IntervalFloorPolicy::Clamp),
            "warn" => Ok(IntervalFloorPolicy::Warn),
            "reject" => Ok(IntervalFloorPolicy::Reject),
            _ => Err(format!("Invalid interval floor policy: {}", s)),
        }
    }
}

/// CaptureSession holds the bounds of one capture run.
///
/// The effective count is derived once, on construction:
/// `min(max_count, floor(max_duration / max(interval, floor)))`.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSession {
    interval_seconds: f64,
    max_count: u32,
    max_duration_seconds: u64,
    min_interval_seconds: f64,
    effective_count: u32,
}

impl CaptureSession {
    /// Build a session, rejecting malformed bounds
    pub fn new(
        interval_seconds: f64,
        max_count: u32,
        max_duration_seconds: u64,
        min_interval_seconds: f64,
        policy: IntervalFloorPolicy,
    ) -> Result<Self, ValidationError> {
        if !interval_seconds.is_finite() || interval_seconds < 0.0 {
            return Err(ValidationError::invalid(
                "interval_seconds",
                format!("must be a non-negative number, got {}", interval_seconds),
            ));
        }
        if !min_interval_seconds.is_finite() || min_interval_seconds < 0.0 {
            return Err(ValidationError::invalid(
                "min_interval_seconds",
                format!("must be a non-negative number, got {}", min_interval_seconds),
            ));
        }
        if max_count == 0 {
            return Err(ValidationError::invalid("max_count", "must be at least 1"));
        }
        if max_duration_seconds == 0 {
            return Err(ValidationError::invalid(
                "max_duration_seconds",
                "must be at least 1",
            ));
        }

        let below_floor = interval_seconds < min_interval_seconds;
        match policy {
            IntervalFloorPolicy::Reject if below_floor => {
                return Err(ValidationError::invalid(
                    "interval_seconds",
                    format!(
                        "{}s is below the minimum achievable interval of {}s",
                        interval_seconds, min_interval_seconds
                    ),
                ));
            }
            IntervalFloorPolicy::Warn if below_floor => {
                tracing::warn!(
                    interval_seconds = interval_seconds,
                    min_interval_seconds = min_interval_seconds,
                    "Requested interval is below the achievable minimum, capturing back to back"
                );
            }
            _ => {}
        }

        let effective_interval = interval_seconds.max(min_interval_seconds);
        let effective_count = if effective_interval > 0.0 {
            let by_duration = (max_duration_seconds as f64 / effective_interval).floor();
            (by_duration.min(u32::MAX as f64) as u32).min(max_count)
        } else {
            max_count
        };

        Ok(Self {
            interval_seconds,
            max_count,
            max_duration_seconds,
            min_interval_seconds,
            effective_count,
        })
    }

    /// Nominal interval as requested, used for naming and logging
    pub fn interval_seconds(&self) -> f64 {
        self.interval_seconds
    }

    pub fn max_count(&self) -> u32 {
        self.max_count
    }

    pub fn max_duration_seconds(&self) -> u64 {
        self.max_duration_seconds
    }

    pub fn min_interval_seconds(&self) -> f64 {
        self.min_interval_seconds
    }

    pub fn effective_count(&self) -> u32 {
        self.effective_count
    }

    /// Interval used for sleeping: zero when the request is below the floor
    pub fn pacing_interval(&self) -> Duration {
        if self.interval_seconds < self.min_interval_seconds {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(self.interval_seconds)
        }
    }

    /// Sleep needed before the next capture, given the time since the last one started
    pub fn delay_after(&self, elapsed: Duration) -> Duration {
        self.pacing_interval().saturating_sub(elapsed)
    }
}

/// CaptureResult is what one capture call reports back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureResult {
    /// File name or other identifier of the captured media
    pub output: String,
    pub completed_at: DateTime<Local>,
}

/// SessionReport summarizes a finished capture session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionReport {
    pub planned: usize,
    pub results: Vec<CaptureResult>,
    /// Every sleep the loop computed, in order
    pub delays: Vec<Duration>,
}

impl SessionReport {
    pub fn completed(&self) -> usize {
        self.results.len()
    }
}

// ============================================================================
// Scheduled Job Models
// ============================================================================

/// ScheduledJob is one entry of the periodic-task table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledJob {
    pub name: String,
    pub command: String,
    pub schedule: String,
    pub enabled: bool,
}

impl ScheduledJob {
    pub fn new(
        name: impl Into<String>,
        command: impl Into<String>,
        schedule: impl Into<String>,
        enabled: bool,
    ) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            schedule: schedule.into(),
            enabled,
        }
    }
}

/// JobListing is one row of the job overview
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobListing {
    /// Job name without the owning prefix
    pub name: String,
    pub schedule: String,
    pub enabled: bool,
    pub next_run: Option<DateTime<Local>>,
}

/// Result of creating or updating a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    Created,
    Updated { command_changed: bool },
}

/// Result of removing a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
}

/// Result of enabling or disabling a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Enabled,
    Disabled,
    NotFound,
}

/// Result of checking a time plan without touching the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleValidation {
    Valid { description: String },
    Invalid { reason: String },
}

impl ScheduleValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, ScheduleValidation::Valid { .. })
    }
}

/// Which jobs a clear request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClearSelector {
    #[default]
    None,
    Job,
    All,
}

impl FromStr for ClearSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(ClearSelector::None),
            "job" => Ok(ClearSelector::Job),
            "all" => Ok(ClearSelector::All),
            _ => Err(format!("Invalid clear selector: {}", s)),
        }
    }
}
