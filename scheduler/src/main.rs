// Scheduler binary entry point
// Creates, changes, lists and clears the scheduled recording jobs.

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::Parser;
use common::bootstrap::{absolute_path, init_job_table, load_settings, resolve_recorder_program};
use common::config::Settings;
use common::errors::JobError;
use common::models::{ClearSelector, EnsureOutcome, RemoveOutcome, ScheduleValidation, ToggleOutcome};
use common::recorder::JobCommand;
use common::scheduler::{render_listing, JobScheduler};
use common::telemetry::init_logging;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "scheduler", version, about = "Schedule recurring recordings")]
struct Cli {
    /// Directory holding default.toml and local.toml
    #[arg(long, default_value = "config")]
    config_dir: PathBuf,

    /// Name of the job to create, change or remove
    #[arg(long)]
    job: Option<String>,

    /// Five-field time plan, e.g. "0 22 * * 1-5"
    #[arg(long)]
    plan: Option<String>,

    /// Create or leave the job disabled
    #[arg(long)]
    disable: bool,

    /// Only check the time plan and describe it
    #[arg(long)]
    test: bool,

    /// Remove a job (`job`) or every scheduled job (`all`)
    #[arg(long, default_value = "none")]
    clear: ClearSelector,

    /// Do not print the job list afterwards
    #[arg(long)]
    no_show: bool,

    /// Print the job list as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(&cli.config_dir)?;
    let _logging = init_logging(&settings.observability, "scheduler.log")?;

    let scheduler = JobScheduler::new(init_job_table(&settings), &settings.scheduler.job_prefix);
    let job = cli.job.as_deref();

    if cli.test {
        test_plan(cli.plan.as_deref())?;
    } else if cli.clear != ClearSelector::None {
        clear(&scheduler, cli.clear, job).await?;
    } else if cli.plan.is_none() {
        let outcome = match job {
            Some(job) => {
                scheduler
                    .set_enabled(&scheduler.owned_name(job), !cli.disable)
                    .await?
            }
            None => ToggleOutcome::NotFound,
        };
        match (outcome, job) {
            (ToggleOutcome::Enabled, Some(job)) => println!("{} job enabled", job),
            (ToggleOutcome::Disabled, Some(job)) => println!("{} job disabled", job),
            _ => println!("No time plan provided or fitting job found"),
        }
    } else {
        let (Some(job), Some(plan)) = (job, cli.plan.as_deref()) else {
            return Err(JobError::MissingJobName.into());
        };
        set_job(&scheduler, &settings, &cli.config_dir, job, plan, !cli.disable).await?;
    }

    if !cli.no_show {
        let listings = scheduler.list(Local::now()).await?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&listings)?);
        } else {
            print!("{}", render_listing(&listings));
        }
    }

    Ok(())
}

fn test_plan(plan: Option<&str>) -> Result<()> {
    let Some(plan) = plan else {
        bail!("No time plan provided");
    };
    match JobScheduler::validate(plan) {
        ScheduleValidation::Valid { description } => {
            println!("Your time plan will run: {}", description);
            Ok(())
        }
        ScheduleValidation::Invalid { reason } => bail!("Time plan is not valid: {}", reason),
    }
}

async fn clear(scheduler: &JobScheduler, selector: ClearSelector, job: Option<&str>) -> Result<()> {
    match (selector, job) {
        (ClearSelector::All, _) => {
            let removed = scheduler.remove_all().await?;
            println!("All scheduled jobs removed ({})", removed);
        }
        (ClearSelector::Job, Some(job)) => match scheduler.remove(&scheduler.owned_name(job)).await? {
            RemoveOutcome::Removed => println!("{} job removed", job),
            RemoveOutcome::NotFound => println!("No fitting job found to remove"),
        },
        (ClearSelector::Job, None) => return Err(JobError::MissingJobName.into()),
        (ClearSelector::None, _) => {}
    }
    Ok(())
}

async fn set_job(
    scheduler: &JobScheduler,
    settings: &Settings,
    config_dir: &Path,
    job: &str,
    plan: &str,
    enabled: bool,
) -> Result<()> {
    let command = JobCommand::new(
        resolve_recorder_program(settings)?,
        absolute_path(config_dir)?,
        absolute_path(&settings.scheduler.log_dir)?,
    )
    .build(job);

    println!("Note: make sure the recording duration is shorter than the interval between scheduled recordings");

    let outcome = scheduler
        .ensure(&scheduler.owned_name(job), &command, plan, enabled)
        .await
        .with_context(|| format!("Failed to set job {}", job))?;
    info!(job_name = %job, outcome = ?outcome, "Job set");

    match outcome {
        EnsureOutcome::Created => println!("{} job successfully set", job),
        EnsureOutcome::Updated { .. } => println!("{} job successfully updated", job),
    }
    println!("{} job {}", job, if enabled { "enabled" } else { "disabled" });
    Ok(())
}
