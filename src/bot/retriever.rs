//! Recording lookup and artifact download.
//!
//! Everything here is best-effort: the bot lifecycle has already concluded,
//! so failures become [`RetrievalWarning`]s instead of errors and never stop
//! a sibling step.

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::client::{ArtifactKind, BotApi, BotStatusSnapshot, RecordingDescriptor};

/// Non-fatal problems met while collecting artifacts.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalWarning {
    DetailsUnavailable(String),
    ListingFailed(String),
    RecordingNotFound { bot_id: String },
    DownloadFailed { kind: ArtifactKind, reason: String },
}

impl fmt::Display for RetrievalWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DetailsUnavailable(reason) => write!(f, "could not get bot details: {}", reason),
            Self::ListingFailed(reason) => write!(f, "could not list recordings: {}", reason),
            Self::RecordingNotFound { bot_id } => {
                write!(f, "no recording found for bot {} yet", bot_id)
            }
            Self::DownloadFailed { kind, reason } => {
                write!(f, "{} download failed: {}", kind.as_str(), reason)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SavedArtifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Default)]
pub struct RetrievalReport {
    pub details: Option<BotStatusSnapshot>,
    pub recording: Option<RecordingDescriptor>,
    pub artifacts: Vec<SavedArtifact>,
    pub warnings: Vec<RetrievalWarning>,
}

impl RetrievalReport {
    pub fn artifact(&self, kind: ArtifactKind) -> Option<&SavedArtifact> {
        self.artifacts.iter().find(|a| a.kind == kind)
    }

    pub fn recording_found(&self) -> bool {
        self.recording.is_some()
    }
}

/// Local file name for an artifact of `bot_id`.
///
/// `run_tag` distinguishes repeated runs against the same bot; without it the
/// name depends on the bot id alone.
pub fn artifact_file_name(bot_id: &str, kind: ArtifactKind, run_tag: Option<&str>) -> String {
    let id: String = bot_id
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    let stem = match run_tag {
        Some(tag) => format!("meeting_{}_{}", id, tag),
        None => format!("meeting_{}", id),
    };

    match kind {
        ArtifactKind::Media => format!("{}.webm", stem),
        ArtifactKind::Transcript => format!("{}_transcript.txt", stem),
    }
}

/// UTC timestamp used as a run tag, e.g. `20261019T142501Z`.
pub fn timestamp_run_tag() -> String {
    chrono::Utc::now().format("%Y%m%dT%H%M%SZ").to_string()
}

pub struct ArtifactRetriever<'a> {
    api: &'a dyn BotApi,
    output_dir: PathBuf,
    run_tag: Option<String>,
}

impl<'a> ArtifactRetriever<'a> {
    pub fn new(api: &'a dyn BotApi, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            api,
            output_dir: output_dir.into(),
            run_tag: None,
        }
    }

    pub fn with_run_tag(mut self, run_tag: Option<String>) -> Self {
        self.run_tag = run_tag;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn artifact_path(&self, bot_id: &str, kind: ArtifactKind) -> PathBuf {
        self.output_dir
            .join(artifact_file_name(bot_id, kind, self.run_tag.as_deref()))
    }

    /// Run both sub-operations: final details, then lookup and download.
    pub async fn retrieve(&self, bot_id: &str) -> RetrievalReport {
        let mut report = RetrievalReport::default();

        match self.fetch_details(bot_id).await {
            Ok(details) => report.details = Some(details),
            Err(warning) => report.warnings.push(warning),
        }

        self.collect_recording(bot_id, &mut report).await;
        report
    }

    /// Re-fetch the bot's final status for display.
    pub async fn fetch_details(&self, bot_id: &str) -> Result<BotStatusSnapshot, RetrievalWarning> {
        let details = self.api.get_bot(bot_id).await.map_err(|e| {
            warn!("Error getting details for bot {}: {}", bot_id, e);
            RetrievalWarning::DetailsUnavailable(e.to_string())
        })?;

        info!("Bot ID: {}", details.bot_id.as_deref().unwrap_or(bot_id));
        info!("Status: {}", details.status);
        info!(
            "Output file: {}",
            details.output_file.as_deref().unwrap_or("-")
        );
        if let Some(transcript) = &details.transcript_file {
            info!("Transcript file: {}", transcript);
        }

        Ok(details)
    }

    /// Find the recording whose `recording_id` is `bot_id`.
    pub async fn find_recording(
        &self,
        bot_id: &str,
    ) -> Result<Option<RecordingDescriptor>, RetrievalWarning> {
        info!("Checking for recordings of bot {}", bot_id);

        let recordings = self.api.list_recordings().await.map_err(|e| {
            warn!("Error listing recordings: {}", e);
            RetrievalWarning::ListingFailed(e.to_string())
        })?;

        Ok(recordings.into_iter().find(|r| r.recording_id == bot_id))
    }

    /// Look up the bot's recording and download its media and, when the server
    /// has one, its transcript.
    pub async fn collect_recording(&self, bot_id: &str, report: &mut RetrievalReport) {
        let recording = match self.find_recording(bot_id).await {
            Ok(Some(recording)) => recording,
            Ok(None) => {
                warn!(
                    "No recording found yet for bot {}. The meeting may not have started or recording failed.",
                    bot_id
                );
                report.warnings.push(RetrievalWarning::RecordingNotFound {
                    bot_id: bot_id.to_string(),
                });
                return;
            }
            Err(warning) => {
                report.warnings.push(warning);
                return;
            }
        };

        info!(
            "Found recording: {} ({} MB)",
            recording.filename, recording.size_mb
        );

        if let Err(e) = tokio::fs::create_dir_all(&self.output_dir).await {
            warn!(
                "Failed to create output directory {}: {}",
                self.output_dir.display(),
                e
            );
        }

        let mut kinds = vec![ArtifactKind::Media];
        if recording.has_transcript {
            kinds.push(ArtifactKind::Transcript);
        }

        for kind in kinds {
            match self.download(bot_id, kind).await {
                Ok(artifact) => report.artifacts.push(artifact),
                Err(warning) => report.warnings.push(warning),
            }
        }

        report.recording = Some(recording);
    }

    async fn download(
        &self,
        bot_id: &str,
        kind: ArtifactKind,
    ) -> Result<SavedArtifact, RetrievalWarning> {
        let path = self.artifact_path(bot_id, kind);
        info!("Downloading {}...", kind.as_str());

        match self.api.download_recording(bot_id, kind, &path).await {
            Ok(bytes) => {
                info!("Downloaded {} ({} bytes)", path.display(), bytes);
                Ok(SavedArtifact { kind, path, bytes })
            }
            Err(e) => {
                warn!("Failed to download {} for bot {}: {}", kind.as_str(), bot_id, e);
                Err(RetrievalWarning::DownloadFailed {
                    kind,
                    reason: e.to_string(),
                })
            }
        }
    }
}
