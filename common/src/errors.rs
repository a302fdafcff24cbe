// Error handling framework
// One enum per concern; binaries wrap these in anyhow with context.

use thiserror::Error;

/// Configuration errors, raised before any capture or table mutation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid field value for {field}: {reason}")]
    InvalidFieldValue { field: String, reason: String },
}

impl ValidationError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFieldValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Five-field time-plan errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    #[error("Invalid cron expression '{expression}': {reason}")]
    InvalidCronExpression { expression: String, reason: String },
}

/// A single capture invocation failed
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Capture {index} failed: {reason}")]
    DeviceFailed { index: usize, reason: String },

    #[error("Capture command '{program}' failed: {reason}")]
    CommandFailed { program: String, reason: String },
}

/// Capture session errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid session configuration: {0}")]
    Configuration(#[from] ValidationError),

    #[error("Session aborted after {completed} of {planned} captures: {source}")]
    Aborted {
        completed: usize,
        planned: usize,
        #[source]
        source: CaptureError,
    },
}

impl SessionError {
    /// Number of captures that completed before the session ended
    pub fn completed(&self) -> usize {
        match self {
            SessionError::Configuration(_) => 0,
            SessionError::Aborted { completed, .. } => *completed,
        }
    }
}

/// Periodic-task table read/write errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to read job table: {0}")]
    ReadFailed(String),

    #[error("Failed to write job table: {0}")]
    WriteFailed(String),

    #[error("Job table command '{command}' failed: {reason}")]
    CommandFailed { command: String, reason: String },
}

/// Job lifecycle errors
#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Found {count} entries named '{name}', expected at most one")]
    DuplicateJob { name: String, count: usize },

    #[error("No job name provided")]
    MissingJobName,

    #[error("Job name '{name}' lacks the '{prefix}' prefix")]
    ForeignJobName { name: String, prefix: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_error_display() {
        let err = ScheduleError::InvalidCronExpression {
            expression: "99 * * * *".to_string(),
            reason: "minute value 99 out of range 0-59".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("Invalid cron expression"));
        assert!(message.contains("minute"));
    }

    #[test]
    fn test_session_error_reports_completed_count() {
        let err = SessionError::Aborted {
            completed: 3,
            planned: 10,
            source: CaptureError::DeviceFailed {
                index: 3,
                reason: "camera busy".to_string(),
            },
        };
        assert_eq!(err.completed(), 3);
        assert!(err.to_string().contains("3 of 10"));
    }

    #[test]
    fn test_job_error_from_storage_error() {
        let err: JobError = StorageError::WriteFailed("disk full".to_string()).into();
        assert!(matches!(err, JobError::Storage(_)));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_validation_error_helper() {
        let err = ValidationError::invalid("image.wait_seconds", "must not be negative");
        assert_eq!(
            err.to_string(),
            "Invalid field value for image.wait_seconds: must not be negative"
        );
    }
}
