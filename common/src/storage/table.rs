// Crontab text model
//
// Entry lines look like `<five fields> <command> # <name>`. A disabled entry is
// the same line commented out with `# `. Every other line (environment
// assignments, comments, `@reboot` entries) is kept verbatim.

use crate::errors::JobError;
use crate::models::ScheduledJob;
use crate::schedule::CronExpr;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Entry {
        job: ScheduledJob,
        /// Original text, dropped once the entry is modified
        raw: Option<String>,
    },
    Other(String),
}

/// Ordered snapshot of the periodic-task table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CronTable {
    lines: Vec<Line>,
}

impl CronTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse crontab text
    pub fn parse(text: &str) -> Self {
        let lines = text.lines().map(parse_line).collect();
        Self { lines }
    }

    /// Render the table back to crontab text
    pub fn render(&self) -> String {
        let mut text = String::new();
        for line in &self.lines {
            match line {
                Line::Entry { raw: Some(raw), .. } => text.push_str(raw),
                Line::Entry { job, raw: None } => text.push_str(&render_job(job)),
                Line::Other(raw) => text.push_str(raw),
            }
            text.push('\n');
        }
        text
    }

    /// All entries, in table order
    pub fn jobs(&self) -> impl Iterator<Item = &ScheduledJob> {
        self.lines.iter().filter_map(|line| match line {
            Line::Entry { job, .. } => Some(job),
            Line::Other(_) => None,
        })
    }

    /// Entries whose name carries `prefix`
    pub fn owned_jobs<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a ScheduledJob> {
        self.jobs().filter(move |job| job.name.starts_with(prefix))
    }

    /// Look up the single entry named exactly `name`
    ///
    /// More than one match means the table is corrupt and is reported as such.
    pub fn find(&self, name: &str) -> Result<Option<&ScheduledJob>, JobError> {
        Ok(self.position(name)?.and_then(|index| match &self.lines[index] {
            Line::Entry { job, .. } => Some(job),
            Line::Other(_) => None,
        }))
    }

    /// Apply `change` to the entry named `name`, returning whether it was found
    pub fn update<F>(&mut self, name: &str, change: F) -> Result<bool, JobError>
    where
        F: FnOnce(&mut ScheduledJob),
    {
        let Some(index) = self.position(name)? else {
            return Ok(false);
        };
        if let Line::Entry { job, raw } = &mut self.lines[index] {
            let before = job.clone();
            change(job);
            if *job != before {
                *raw = None;
            }
        }
        Ok(true)
    }

    /// Append a new entry
    pub fn push(&mut self, job: ScheduledJob) {
        self.lines.push(Line::Entry { job, raw: None });
    }

    /// Remove every entry matching `predicate`, returning how many were removed
    pub fn remove_where<F>(&mut self, predicate: F) -> usize
    where
        F: Fn(&ScheduledJob) -> bool,
    {
        let before = self.lines.len();
        self.lines.retain(|line| match line {
            Line::Entry { job, .. } => !predicate(job),
            Line::Other(_) => true,
        });
        before - self.lines.len()
    }

    fn position(&self, name: &str) -> Result<Option<usize>, JobError> {
        let matches: Vec<usize> = self
            .lines
            .iter()
            .enumerate()
            .filter_map(|(index, line)| match line {
                Line::Entry { job, .. } if job.name == name => Some(index),
                _ => None,
            })
            .collect();

        match matches.as_slice() {
            [] => Ok(None),
            [index] => Ok(Some(*index)),
            _ => Err(JobError::DuplicateJob {
                name: name.to_string(),
                count: matches.len(),
            }),
        }
    }
}

fn render_job(job: &ScheduledJob) -> String {
    let mut line = String::new();
    if !job.enabled {
        line.push_str("# ");
    }
    line.push_str(&job.schedule);
    line.push(' ');
    line.push_str(&job.command);
    if !job.name.is_empty() {
        line.push_str(" # ");
        line.push_str(&job.name);
    }
    line
}

fn parse_line(raw: &str) -> Line {
    let trimmed = raw.trim_start();

    let parsed = match trimmed.strip_prefix('#') {
        // Only named commented-out entries are treated as disabled jobs;
        // anything else starting with `#` is an ordinary comment.
        Some(rest) => parse_job(rest.trim_start(), false).filter(|job| !job.name.is_empty()),
        None => parse_job(trimmed, true),
    };

    match parsed {
        Some(job) => Line::Entry {
            job,
            raw: Some(raw.to_string()),
        },
        None => Line::Other(raw.to_string()),
    }
}

fn parse_job(text: &str, enabled: bool) -> Option<ScheduledJob> {
    let mut rest = text;
    let mut fields = Vec::with_capacity(5);
    for _ in 0..5 {
        rest = rest.trim_start();
        let end = rest.find(char::is_whitespace)?;
        fields.push(&rest[..end]);
        rest = &rest[end..];
    }

    let schedule = CronExpr::parse(&fields.join(" ")).ok()?;
    let rest = rest.trim();
    if rest.is_empty() {
        return None;
    }

    let (command, name) = match rest.rfind(" # ") {
        Some(at) => (rest[..at].trim_end(), rest[at + 3..].trim()),
        None => (rest, ""),
    };

    Some(ScheduledJob {
        name: name.to_string(),
        command: command.to_string(),
        schedule: schedule.to_string(),
        enabled,
    })
}
