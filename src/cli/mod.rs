use crate::bot::{
    timestamp_run_tag, ArtifactKind, ArtifactRetriever, BotApi, BotApiClient, BotError,
    BotRequest, BotWorkflow, PollOutcome, RetrievalReport, StatusPoller, WorkflowSettings,
};
use crate::config::Config;
use anyhow::{bail, Context, Result};
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub mod args;

pub use args::{
    ApiCliArgs, Cli, CliCommand, ConfigCliArgs, ConfigCommand, FetchCliArgs, OutputCliArgs,
    PollCliArgs, RunCliArgs, StatusCliArgs, WatchCliArgs,
};

/// Load the config from `path` if given, else from the default location.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn build_client(config: &Config, api: &ApiCliArgs) -> Result<BotApiClient> {
    let base_url = api.api_url.as_deref().unwrap_or(&config.api.base_url);
    info!("Using bot API at {}", base_url);

    BotApiClient::new(
        base_url,
        config.api.request_timeout(),
        config.api.download_timeout(),
    )
}

/// Merge config values with command-line overrides.
pub fn workflow_settings(
    config: &Config,
    polling: &PollCliArgs,
    output: &OutputCliArgs,
) -> WorkflowSettings {
    let poll_interval = polling
        .poll_interval
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.polling.interval());
    let max_duration = match polling.max_wait {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
        None => config.polling.max_duration(),
    };
    let output_dir = output
        .output_dir
        .clone()
        .unwrap_or_else(|| config.output.directory.clone());
    let run_tag = if output.unique_filenames || config.output.unique_filenames {
        Some(timestamp_run_tag())
    } else {
        None
    };

    WorkflowSettings {
        poll_interval,
        max_duration,
        output_dir,
        run_tag,
    }
}

pub fn bot_request(config: &Config, args: &RunCliArgs) -> Result<BotRequest> {
    let meeting_url = args.meeting_url.trim();
    if meeting_url.is_empty() {
        bail!("A meeting URL is required");
    }

    Ok(BotRequest::new(
        meeting_url,
        args.bot_name
            .clone()
            .unwrap_or_else(|| config.bot.name.clone()),
        transcription_enabled(config, args),
    ))
}

fn transcription_enabled(config: &Config, args: &RunCliArgs) -> bool {
    if args.no_transcription {
        return false;
    }
    args.transcription
        .unwrap_or(config.bot.transcription_enabled)
}

/// Cancel the returned token when the user presses Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping");
            trigger.cancel();
        }
    });
    cancel
}

pub async fn handle_run_command(args: RunCliArgs, config: &Config) -> Result<()> {
    let request = bot_request(config, &args)?;
    let settings = workflow_settings(config, &args.polling, &args.output);
    let client = build_client(config, &args.api)?;

    let report = BotWorkflow::new(&client, settings)
        .with_cancellation(cancel_on_ctrl_c())
        .run(&request)
        .await?;

    if let Ok(outcome) = &report.outcome {
        println!("Bot {} finished: {}", report.bot.bot_id, outcome.status());
    }
    print_retrieval(&report.retrieval);

    // Artifacts collected after a lost status check are kept, but the run
    // still fails.
    report.outcome?;
    Ok(())
}

pub async fn handle_status_command(args: StatusCliArgs, config: &Config) -> Result<()> {
    let client = build_client(config, &args.api)?;
    let snapshot = client
        .get_bot(&args.bot_id)
        .await
        .map_err(|source| BotError::StatusFetch {
            bot_id: args.bot_id.clone(),
            source,
        })?;

    println!("Bot ID: {}", snapshot.bot_id.as_deref().unwrap_or(&args.bot_id));
    println!("Status: {}", snapshot.status);
    println!("Recording: {}", snapshot.is_recording());
    if let Some(error) = &snapshot.error {
        println!("Error: {}", error);
    }
    if let Some(output) = &snapshot.output_file {
        println!("Output File: {}", output);
    }
    if let Some(transcript) = &snapshot.transcript_file {
        println!("Transcript File: {}", transcript);
    }

    Ok(())
}

pub async fn handle_watch_command(args: WatchCliArgs, config: &Config) -> Result<()> {
    let settings = workflow_settings(config, &args.polling, &OutputCliArgs::default());
    let client = build_client(config, &args.api)?;

    let outcome = StatusPoller::new(&client)
        .with_interval(settings.poll_interval)
        .with_max_duration(settings.max_duration)
        .with_cancellation(cancel_on_ctrl_c())
        .poll_until_terminal(&args.bot_id)
        .await?;

    if let PollOutcome::Failed { reason, .. } = &outcome {
        return Err(BotError::BotFailed {
            bot_id: args.bot_id,
            reason: reason.clone(),
        }
        .into());
    }

    println!("Bot {} finished: {}", args.bot_id, outcome.status());
    Ok(())
}

pub async fn handle_fetch_command(args: FetchCliArgs, config: &Config) -> Result<()> {
    let settings = workflow_settings(config, &PollCliArgs::default(), &args.output);
    let client = build_client(config, &args.api)?;

    let report = ArtifactRetriever::new(&client, settings.output_dir)
        .with_run_tag(settings.run_tag)
        .retrieve(&args.bot_id)
        .await;

    print_retrieval(&report);
    Ok(())
}

pub async fn handle_recordings_command(args: ApiCliArgs, config: &Config) -> Result<()> {
    let client = build_client(config, &args)?;
    let recordings = client
        .list_recordings()
        .await
        .context("Failed to list recordings")?;

    if recordings.is_empty() {
        println!("No recordings found.");
        return Ok(());
    }

    println!("Found {} recording(s):\n", recordings.len());
    for recording in recordings {
        println!("ID: {}", recording.recording_id);
        println!("File: {} ({} MB)", recording.filename, recording.size_mb);
        println!("Transcript: {}", if recording.has_transcript { "yes" } else { "no" });
        println!("---");
    }

    Ok(())
}

pub fn handle_config_command(args: ConfigCliArgs, config_file: Option<&Path>) -> Result<()> {
    match args.command {
        ConfigCommand::Path => {
            let path = match config_file {
                Some(path) => path.to_path_buf(),
                None => Config::config_path()?,
            };
            println!("{}", path.display());
        }
        ConfigCommand::Show => {
            let config = load_config(config_file)?;
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

fn print_retrieval(report: &RetrievalReport) {
    for kind in [ArtifactKind::Media, ArtifactKind::Transcript] {
        if let Some(artifact) = report.artifact(kind) {
            println!("Downloaded {}: {}", kind.as_str(), artifact.path.display());
        }
    }

    if !report.recording_found() {
        println!("No recording available yet.");
    }
    for warning in &report.warnings {
        eprintln!("Warning: {}", warning);
    }
}
