// Job lifecycle engine over the periodic-task table
//
// Every operation reads a fresh snapshot, changes it locally and writes it back
// whole. Jobs are matched by exact name only; entries without the owning prefix
// are never listed or bulk-removed.

use crate::errors::JobError;
use crate::models::{
    EnsureOutcome, JobListing, RemoveOutcome, ScheduleValidation, ScheduledJob, ToggleOutcome,
};
use crate::schedule::CronExpr;
use crate::storage::JobTable;
use chrono::{DateTime, Local};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// JobScheduler manages the named entries owned by this system
pub struct JobScheduler {
    table: Arc<dyn JobTable>,
    prefix: String,
}

impl JobScheduler {
    pub fn new(table: Arc<dyn JobTable>, prefix: impl Into<String>) -> Self {
        Self {
            table,
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Full table name for a user-facing job name
    pub fn owned_name(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Check a time plan and describe it, without touching the table
    pub fn validate(schedule: &str) -> ScheduleValidation {
        match CronExpr::parse(schedule) {
            Ok(expr) => ScheduleValidation::Valid {
                description: expr.describe(),
            },
            Err(e) => ScheduleValidation::Invalid {
                reason: e.to_string(),
            },
        }
    }

    /// Create the job or bring an existing one in line with the arguments
    ///
    /// The command is replaced only when it differs; schedule and enable flag
    /// are always reapplied. Repeating the call is a no-op on the stored state.
    #[instrument(skip(self, name, command), fields(job_name = %name))]
    pub async fn ensure(
        &self,
        name: &str,
        command: &str,
        schedule: &str,
        enabled: bool,
    ) -> Result<EnsureOutcome, JobError> {
        match name.strip_prefix(self.prefix.as_str()) {
            Some(short) if !short.is_empty() => {}
            Some(_) => return Err(JobError::MissingJobName),
            None if name.is_empty() => return Err(JobError::MissingJobName),
            None => {
                return Err(JobError::ForeignJobName {
                    name: name.to_string(),
                    prefix: self.prefix.clone(),
                })
            }
        }
        // Validate before reading so a bad plan never reaches the table
        let schedule = CronExpr::parse(schedule)?.to_string();

        let mut table = self.table.read().await?;

        let outcome = match table.find(name)? {
            Some(existing) => {
                let command_changed = existing.command != command;
                table.update(name, |job| {
                    if command_changed {
                        job.command = command.to_string();
                    }
                    job.schedule = schedule.clone();
                    job.enabled = enabled;
                })?;
                EnsureOutcome::Updated { command_changed }
            }
            None => {
                table.push(ScheduledJob::new(name, command, schedule.clone(), enabled));
                EnsureOutcome::Created
            }
        };

        self.table.write(&table).await?;

        info!(
            schedule = %schedule,
            enabled = enabled,
            outcome = ?outcome,
            "Job successfully set"
        );
        Ok(outcome)
    }

    /// Remove the job named `name`
    #[instrument(skip(self, name), fields(job_name = %name))]
    pub async fn remove(&self, name: &str) -> Result<RemoveOutcome, JobError> {
        let mut table = self.table.read().await?;

        if table.find(name)?.is_none() {
            warn!("No fitting job found to remove");
            return Ok(RemoveOutcome::NotFound);
        }

        table.remove_where(|job| job.name == name);
        self.table.write(&table).await?;

        info!("Job removed");
        Ok(RemoveOutcome::Removed)
    }

    /// Remove every job carrying the owning prefix, with a single write
    #[instrument(skip(self), fields(prefix = %self.prefix))]
    pub async fn remove_all(&self) -> Result<usize, JobError> {
        let mut table = self.table.read().await?;

        let removed = table.remove_where(|job| job.name.starts_with(&self.prefix));
        if removed == 0 {
            debug!("No owned jobs to remove");
            return Ok(0);
        }

        self.table.write(&table).await?;
        info!(removed = removed, "All scheduled jobs removed");
        Ok(removed)
    }

    /// Enable or disable the job named `name`
    #[instrument(skip(self, name), fields(job_name = %name))]
    pub async fn set_enabled(&self, name: &str, enabled: bool) -> Result<ToggleOutcome, JobError> {
        let mut table = self.table.read().await?;

        if !table.update(name, |job| job.enabled = enabled)? {
            warn!("Nothing to enable or disable, job not found");
            return Ok(ToggleOutcome::NotFound);
        }

        self.table.write(&table).await?;

        if enabled {
            info!("Job enabled");
            Ok(ToggleOutcome::Enabled)
        } else {
            info!("Job disabled");
            Ok(ToggleOutcome::Disabled)
        }
    }

    /// Owned jobs in table order, with their next fire time after `now`
    pub async fn list(&self, now: DateTime<Local>) -> Result<Vec<JobListing>, JobError> {
        let table = self.table.read().await?;

        let listings = table
            .owned_jobs(&self.prefix)
            .map(|job| {
                let next_run = if job.enabled {
                    CronExpr::parse(&job.schedule)
                        .ok()
                        .and_then(|expr| expr.next_after(&now))
                } else {
                    None
                };
                JobListing {
                    name: job.name[self.prefix.len()..].to_string(),
                    schedule: job.schedule.clone(),
                    enabled: job.enabled,
                    next_run,
                }
            })
            .collect();

        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StorageError;
    use crate::storage::{CronTable, MockJobTable};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    /// Table held in memory, counting writes
    #[derive(Default)]
    struct MemoryTable {
        text: Mutex<String>,
        writes: Mutex<usize>,
    }

    impl MemoryTable {
        fn with_text(text: &str) -> Arc<Self> {
            Arc::new(Self {
                text: Mutex::new(text.to_string()),
                writes: Mutex::new(0),
            })
        }

        fn text(&self) -> String {
            self.text.lock().unwrap().clone()
        }

        fn writes(&self) -> usize {
            *self.writes.lock().unwrap()
        }
    }

    #[async_trait]
    impl JobTable for MemoryTable {
        async fn read(&self) -> Result<CronTable, StorageError> {
            Ok(CronTable::parse(&self.text()))
        }

        async fn write(&self, table: &CronTable) -> Result<(), StorageError> {
            *self.text.lock().unwrap() = table.render();
            *self.writes.lock().unwrap() += 1;
            Ok(())
        }
    }

    const FOREIGN: &str = "0 3 * * * /usr/local/bin/backup.sh\n";
    const CMD_A: &str = "/usr/bin/recorder run --single-video";
    const CMD_B: &str = "/opt/recorder/bin/recorder run --single-video";

    fn scheduler(table: &Arc<MemoryTable>) -> JobScheduler {
        JobScheduler::new(table.clone(), "AR_")
    }

    fn count_named(table: &MemoryTable, name: &str) -> usize {
        CronTable::parse(&table.text())
            .jobs()
            .filter(|job| job.name == name)
            .count()
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 6, 6, 0, 0).unwrap()
    }

    #[test]
    fn test_owned_name() {
        let table = MemoryTable::with_text("");
        assert_eq!(scheduler(&table).owned_name("pilot"), "AR_pilot");
    }

    #[test]
    fn test_validate_reports_description_and_reason() {
        match JobScheduler::validate("*/15 13-16 * * *") {
            ScheduleValidation::Valid { description } => {
                assert_eq!(description, "Every 15 minutes, between 13:00 and 16:59")
            }
            other => panic!("expected valid, got {:?}", other),
        }

        match JobScheduler::validate("99 * * * *") {
            ScheduleValidation::Invalid { reason } => assert!(reason.contains("minute")),
            other => panic!("expected invalid, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ensure_twice_keeps_single_entry() {
        let table = MemoryTable::with_text(FOREIGN);
        let scheduler = scheduler(&table);

        let first = scheduler.ensure("AR_test", CMD_A, "0 7 * * *", true).await.unwrap();
        let after_first = table.text();
        let second = scheduler.ensure("AR_test", CMD_A, "0 7 * * *", true).await.unwrap();

        assert_eq!(first, EnsureOutcome::Created);
        assert_eq!(second, EnsureOutcome::Updated { command_changed: false });
        assert_eq!(count_named(&table, "AR_test"), 1);
        assert_eq!(table.text(), after_first);
        assert!(table.text().starts_with(FOREIGN));
    }

    #[tokio::test]
    async fn test_ensure_updates_only_changed_command() {
        let table = MemoryTable::with_text("");
        let scheduler = scheduler(&table);

        scheduler.ensure("AR_test", CMD_A, "0 7 * * *", true).await.unwrap();
        let outcome = scheduler.ensure("AR_test", CMD_B, "0 7 * * *", true).await.unwrap();

        assert_eq!(outcome, EnsureOutcome::Updated { command_changed: true });
        let snapshot = CronTable::parse(&table.text());
        let job = snapshot.find("AR_test").unwrap().unwrap();
        assert_eq!(job.command, CMD_B);
        assert_eq!(job.schedule, "0 7 * * *");
        assert!(job.enabled);
    }

    #[tokio::test]
    async fn test_ensure_reapplies_enable_flag() {
        let table = MemoryTable::with_text("");
        let scheduler = scheduler(&table);

        scheduler.ensure("AR_test", CMD_A, "0 7 * * *", true).await.unwrap();
        scheduler.ensure("AR_test", CMD_A, "30 8 * * *", false).await.unwrap();

        assert_eq!(table.text(), format!("# 30 8 * * * {} # AR_test\n", CMD_A));
    }

    #[tokio::test]
    async fn test_ensure_rejects_invalid_plan_without_touching_table() {
        let mut mock = MockJobTable::new();
        mock.expect_read().never();
        mock.expect_write().never();
        let scheduler = JobScheduler::new(Arc::new(mock), "AR_");

        let err = scheduler.ensure("AR_test", CMD_A, "99 * * * *", true).await.unwrap_err();
        assert!(matches!(err, JobError::Schedule(_)));
    }

    #[tokio::test]
    async fn test_ensure_requires_name() {
        let table = MemoryTable::with_text("");
        let err = scheduler(&table).ensure("", CMD_A, "0 7 * * *", true).await.unwrap_err();
        assert!(matches!(err, JobError::MissingJobName));
        assert_eq!(table.writes(), 0);
    }

    #[tokio::test]
    async fn test_ensure_surfaces_duplicates() {
        let table = MemoryTable::with_text("0 7 * * * a # AR_test\n0 8 * * * b # AR_test\n");
        let err = scheduler(&table).ensure("AR_test", CMD_A, "0 7 * * *", true).await.unwrap_err();
        assert!(matches!(err, JobError::DuplicateJob { count: 2, .. }));
        assert_eq!(table.writes(), 0);
    }

    #[tokio::test]
    async fn test_set_enabled_on_missing_job_does_not_write() {
        let mut mock = MockJobTable::new();
        mock.expect_read()
            .times(1)
            .returning(|| Ok(CronTable::parse(FOREIGN)));
        mock.expect_write().never();
        let scheduler = JobScheduler::new(Arc::new(mock), "AR_");

        let outcome = scheduler.set_enabled("AR_missing", false).await.unwrap();
        assert_eq!(outcome, ToggleOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_set_enabled_toggles() {
        let table = MemoryTable::with_text("");
        let scheduler = scheduler(&table);
        scheduler.ensure("AR_test", CMD_A, "0 7 * * *", true).await.unwrap();

        assert_eq!(
            scheduler.set_enabled("AR_test", false).await.unwrap(),
            ToggleOutcome::Disabled
        );
        assert!(table.text().starts_with("# 0 7 * * *"));

        assert_eq!(
            scheduler.set_enabled("AR_test", true).await.unwrap(),
            ToggleOutcome::Enabled
        );
        assert!(table.text().starts_with("0 7 * * *"));
    }

    #[tokio::test]
    async fn test_remove_missing_job_is_reported_not_failed() {
        let mut mock = MockJobTable::new();
        mock.expect_read().returning(|| Ok(CronTable::new()));
        mock.expect_write().never();
        let scheduler = JobScheduler::new(Arc::new(mock), "AR_");

        assert_eq!(
            scheduler.remove("AR_missing").await.unwrap(),
            RemoveOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn test_ensure_rejects_names_outside_prefix() {
        let mut mock = MockJobTable::new();
        mock.expect_read().never();
        mock.expect_write().never();
        let scheduler = JobScheduler::new(Arc::new(mock), "AR_");

        let err = scheduler.ensure("OTHER_job", CMD_A, "0 9 * * *", true).await.unwrap_err();
        assert!(matches!(err, JobError::ForeignJobName { ref prefix, .. } if prefix == "AR_"));

        let err = scheduler.ensure("AR_", CMD_A, "0 9 * * *", true).await.unwrap_err();
        assert!(matches!(err, JobError::MissingJobName));
    }

    #[tokio::test]
    async fn test_remove_all_leaves_foreign_entries() {
        let other = format!("{}0 9 * * * {} # OTHER_job\n", FOREIGN, CMD_A);
        let table = MemoryTable::with_text(&other);
        let scheduler = scheduler(&table);
        scheduler.ensure("AR_one", CMD_A, "0 7 * * *", true).await.unwrap();
        scheduler.ensure("AR_two", CMD_A, "0 8 * * *", false).await.unwrap();
        let writes_before = table.writes();

        let removed = scheduler.remove_all().await.unwrap();

        assert_eq!(removed, 2);
        assert_eq!(table.writes(), writes_before + 1);
        assert_eq!(table.text(), other);
    }

    #[tokio::test]
    async fn test_persistence_failure_is_surfaced() {
        let mut mock = MockJobTable::new();
        mock.expect_read().returning(|| Ok(CronTable::new()));
        mock.expect_write()
            .times(1)
            .returning(|_| Err(StorageError::WriteFailed("disk full".to_string())));
        let scheduler = JobScheduler::new(Arc::new(mock), "AR_");

        let err = scheduler.ensure("AR_test", CMD_A, "0 7 * * *", true).await.unwrap_err();
        assert!(matches!(err, JobError::Storage(StorageError::WriteFailed(_))));
    }

    #[tokio::test]
    async fn test_list_strips_prefix_and_computes_next_run() {
        let table = MemoryTable::with_text(FOREIGN);
        let scheduler = scheduler(&table);
        scheduler.ensure("AR_morning", CMD_A, "0 7 * * *", true).await.unwrap();
        scheduler.ensure("AR_night", CMD_A, "0 22 * * 1-5", false).await.unwrap();

        let listings = scheduler.list(now()).await.unwrap();

        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].name, "morning");
        assert_eq!(
            listings[0].next_run.map(|t| t.format("%Y-%m-%d %H:%M").to_string()),
            Some("2024-05-06 07:00".to_string())
        );
        assert_eq!(listings[1].name, "night");
        assert!(!listings[1].enabled);
        assert_eq!(listings[1].next_run, None);
    }

    #[tokio::test]
    async fn test_list_after_ensure_then_remove() {
        let table = MemoryTable::with_text("");
        let scheduler = scheduler(&table);

        scheduler.ensure("AR_test", CMD_A, "0 7 * * *", true).await.unwrap();
        assert_eq!(scheduler.list(now()).await.unwrap().len(), 1);

        assert_eq!(scheduler.remove("AR_test").await.unwrap(), RemoveOutcome::Removed);
        assert!(scheduler.list(now()).await.unwrap().is_empty());
        assert_eq!(table.text(), "");
    }
}
