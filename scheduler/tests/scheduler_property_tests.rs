// Property-based tests for the job scheduler
// Run against a file-backed job table in a temporary directory

use chrono::{Local, TimeZone};
use common::models::{EnsureOutcome, ScheduleValidation};
use common::scheduler::{render_listing, JobScheduler};
use common::storage::{CronTable, FileCrontab, JobTable};
use proptest::prelude::*;
use std::sync::Arc;
use tempfile::TempDir;

const FOREIGN: &str = "MAILTO=\"\"\n0 3 * * * /usr/local/bin/backup.sh\n@reboot /usr/bin/startup.sh\n";

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn file_scheduler(dir: &TempDir, initial: &str) -> (JobScheduler, Arc<FileCrontab>) {
    let path = dir.path().join("crontab");
    std::fs::write(&path, initial).unwrap();
    let table = Arc::new(FileCrontab::new(path));
    (JobScheduler::new(table.clone(), "AR_"), table)
}

fn job_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,15}"
}

fn time_plan() -> impl Strategy<Value = String> {
    (0u32..60, 0u32..24, prop::option::of(0u32..8)).prop_map(|(minute, hour, dow)| match dow {
        Some(dow) => format!("{} {} * * {}", minute, hour, dow),
        None => format!("{} {} * * *", minute, hour),
    })
}

fn command() -> impl Strategy<Value = String> {
    "/usr/bin/[a-z]{1,10} run --single-video"
}

/// Ensuring the same job twice leaves one entry and an unchanged table
#[test]
fn property_ensure_is_idempotent() {
    let rt = runtime();
    proptest!(|(name in job_name(), plan in time_plan(), cmd in command(), enabled in any::<bool>())| {
        let dir = TempDir::new().unwrap();
        let (scheduler, table) = file_scheduler(&dir, FOREIGN);
        let full = scheduler.owned_name(&name);

        let (first, after_first, second, after_second) = rt.block_on(async {
            let first = scheduler.ensure(&full, &cmd, &plan, enabled).await.unwrap();
            let after_first = table.read().await.unwrap().render();
            let second = scheduler.ensure(&full, &cmd, &plan, enabled).await.unwrap();
            let after_second = table.read().await.unwrap().render();
            (first, after_first, second, after_second)
        });

        prop_assert_eq!(first, EnsureOutcome::Created);
        prop_assert_eq!(second, EnsureOutcome::Updated { command_changed: false });
        prop_assert_eq!(&after_first, &after_second);
        prop_assert!(after_second.starts_with(FOREIGN));

        let snapshot = CronTable::parse(&after_second);
        prop_assert_eq!(snapshot.jobs().filter(|job| job.name == full).count(), 1);
    });
}

/// Changing only the command keeps the plan and enable flag
#[test]
fn property_command_update_preserves_schedule() {
    let rt = runtime();
    proptest!(|(name in job_name(), plan in time_plan(), old in command(), new in command(), enabled in any::<bool>())| {
        let dir = TempDir::new().unwrap();
        let (scheduler, table) = file_scheduler(&dir, "");
        let full = scheduler.owned_name(&name);

        let (outcome, snapshot) = rt.block_on(async {
            scheduler.ensure(&full, &old, &plan, enabled).await.unwrap();
            let outcome = scheduler.ensure(&full, &new, &plan, enabled).await.unwrap();
            (outcome, table.read().await.unwrap())
        });

        prop_assert_eq!(outcome, EnsureOutcome::Updated { command_changed: old != new });
        let job = snapshot.find(&full).unwrap().unwrap();
        prop_assert_eq!(&job.command, &new);
        prop_assert_eq!(&job.schedule, &plan);
        prop_assert_eq!(job.enabled, enabled);
    });
}

/// Clearing all jobs removes every owned entry and nothing else
#[test]
fn property_remove_all_spares_foreign_entries() {
    let rt = runtime();
    proptest!(|(names in prop::collection::btree_set(job_name(), 0..6), plan in time_plan())| {
        let dir = TempDir::new().unwrap();
        let (scheduler, table) = file_scheduler(&dir, FOREIGN);

        let (removed, after) = rt.block_on(async {
            for name in &names {
                let full = scheduler.owned_name(name);
                scheduler.ensure(&full, "/usr/bin/recorder run", &plan, true).await.unwrap();
            }
            let removed = scheduler.remove_all().await.unwrap();
            (removed, table.read().await.unwrap().render())
        });

        prop_assert_eq!(removed, names.len());
        prop_assert_eq!(after, FOREIGN);
    });
}

/// Every listed row is aligned to the widest name and plan
#[test]
fn property_listing_columns_align() {
    let rt = runtime();
    let now = Local.with_ymd_and_hms(2024, 5, 6, 12, 0, 0).unwrap();
    proptest!(|(jobs in prop::collection::btree_map(job_name(), time_plan(), 1..6))| {
        let dir = TempDir::new().unwrap();
        let (scheduler, _table) = file_scheduler(&dir, FOREIGN);

        let listings = rt.block_on(async {
            for (name, plan) in &jobs {
                let full = scheduler.owned_name(name);
                scheduler.ensure(&full, "/usr/bin/recorder run", plan, true).await.unwrap();
            }
            scheduler.list(now).await.unwrap()
        });
        prop_assert_eq!(listings.len(), jobs.len());

        let name_width = jobs.keys().map(|n| n.len()).max().unwrap().max("Job".len());
        let plan_width = jobs.values().map(|p| p.len()).max().unwrap().max("Time plan".len());
        let rendered = render_listing(&listings);
        for line in rendered.lines().skip(2) {
            prop_assert_eq!(&line[name_width..name_width + 2], "  ");
            prop_assert_eq!(&line[name_width + 2 + plan_width..name_width + 4 + plan_width], "  ");
        }
        for listing in &listings {
            let next = listing.next_run.unwrap();
            prop_assert!(next > now);
        }
    });
}

/// Any in-range plan validates; a minute past 59 never does
#[test]
fn property_validate_checks_ranges() {
    proptest!(|(plan in time_plan(), minute in 60u32..1000)| {
        prop_assert!(JobScheduler::validate(&plan).is_valid());
        match JobScheduler::validate(&format!("{} * * * *", minute)) {
            ScheduleValidation::Invalid { reason } => prop_assert!(reason.contains("minute")),
            ScheduleValidation::Valid { .. } => prop_assert!(false, "minute {} accepted", minute),
        }
    });
}
