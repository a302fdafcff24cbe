// Media file naming
//
// {label}_{YYMMDD}_{host}[_{marker}]_{HHMMSS}.{ext}
// The marker is `imNNN` (or `imNNNNN` above 999 planned images) for image
// sequences and `SNN` for multi-session video.

use crate::models::RecordingKind;
use chrono::{DateTime, TimeZone};
use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaNamer {
    label: String,
    host: String,
    kind: RecordingKind,
    planned: usize,
    single_video: bool,
}

impl MediaNamer {
    pub fn new(
        label: impl Into<String>,
        host: impl Into<String>,
        kind: RecordingKind,
        planned: usize,
        single_video: bool,
    ) -> Self {
        Self {
            label: label.into(),
            host: host.into(),
            kind,
            planned,
            single_video,
        }
    }

    /// File name for the capture at zero-based `index`, taken at `at`
    pub fn name<Tz>(&self, index: usize, at: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let mut parts = vec![
            self.label.clone(),
            at.format("%y%m%d").to_string(),
            self.host.clone(),
        ];
        if let Some(marker) = self.marker(index) {
            parts.push(marker);
        }
        parts.push(at.format("%H%M%S").to_string());
        format!("{}.{}", parts.join("_"), self.kind.extension())
    }

    fn marker(&self, index: usize) -> Option<String> {
        let counter = index + 1;
        match self.kind {
            RecordingKind::Image => None,
            RecordingKind::ImageSequence if self.planned > 999 => Some(format!("im{:05}", counter)),
            RecordingKind::ImageSequence => Some(format!("im{:03}", counter)),
            RecordingKind::Video if self.single_video => None,
            RecordingKind::Video => Some(format!("S{:02}", counter)),
        }
    }
}
