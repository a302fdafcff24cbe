// Recorder binary entry point
// Runs one bounded recording with the stored configuration, optionally
// overridden from the command line.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use common::bootstrap::{init_recording_dir, load_settings};
use common::config::SettingsUpdate;
use common::models::RecordingKind;
use common::recorder::Recorder;
use common::telemetry::init_logging;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "recorder", version, about = "Periodic media capture")]
struct Cli {
    /// Directory holding default.toml and local.toml
    #[arg(long, global = true, default_value = "config")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one recording session
    Run(RunArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Recording kind: img, imgseq or vid
    #[arg(long)]
    kind: Option<RecordingKind>,

    /// Seconds between images of a sequence
    #[arg(long)]
    wait: Option<f64>,

    /// Maximum number of images in a sequence
    #[arg(long)]
    count: Option<u32>,

    /// Maximum duration of a sequence, in seconds
    #[arg(long)]
    duration: Option<u64>,

    /// Label at the start of every file name
    #[arg(long)]
    label: Option<String>,

    /// Record a single unnumbered video session
    #[arg(long)]
    single_video: bool,

    /// Store the overrides in local.toml for later runs
    #[arg(long)]
    save: bool,
}

impl RunArgs {
    fn updates(&self) -> SettingsUpdate {
        SettingsUpdate {
            kind: self.kind,
            image_wait_seconds: self.wait,
            image_max_count: self.count,
            image_max_duration_seconds: self.duration,
            label: self.label.clone(),
            ..Default::default()
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let Command::Run(args) = cli.command;

    let mut settings = load_settings(&cli.config_dir)?;
    let _logging = init_logging(&settings.observability, "recorder.log")?;

    let update = args.updates();
    if !update.is_empty() && settings.apply_updates(update) {
        settings
            .validate()
            .context("Command line overrides are invalid")?;
        if args.save {
            settings.save_local(&cli.config_dir)?;
        }
    }

    info!(
        kind = %settings.recording.kind,
        label = %settings.recording.label,
        dir = %settings.recording.dir.display(),
        "Configuration loaded"
    );

    init_recording_dir(&settings).await?;

    let recorder = Recorder::new(settings, args.single_video);
    match recorder.record_with_camera().await {
        Ok(report) => {
            info!(completed = report.completed(), "Recording finished");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, completed = e.completed(), "Recording failed");
            Err(e).context("Recording failed")
        }
    }
}
