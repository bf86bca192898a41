//! HTTP client for the bot management API.
//!
//! Covers bot creation, status lookups, the recordings listing, and artifact
//! downloads. Every call has a bounded timeout.

use anyhow::{bail, Context};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::error::ApiError;

/// Bot status values reported by the server.
///
/// The server may report values not listed here; those are treated as
/// non-terminal.
pub mod status {
    pub const PENDING: &str = "pending";
    pub const JOINING: &str = "joining";
    pub const RECORDING: &str = "recording";
    pub const COMPLETED: &str = "completed";
    pub const FAILED: &str = "failed";
    pub const STOPPED: &str = "stopped";

    pub fn is_terminal(status: &str) -> bool {
        matches!(status, COMPLETED | FAILED | STOPPED)
    }
}

/// Parameters for creating a bot. Built once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotRequest {
    pub meeting_url: String,
    pub bot_name: String,
    pub transcription_enabled: bool,
}

impl BotRequest {
    pub fn new(
        meeting_url: impl Into<String>,
        bot_name: impl Into<String>,
        transcription_enabled: bool,
    ) -> Self {
        Self {
            meeting_url: meeting_url.into(),
            bot_name: bot_name.into(),
            transcription_enabled,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateBotPayload<'a> {
    meeting_url: &'a str,
    bot_name: &'a str,
    transcription: TranscriptionPayload,
}

#[derive(Debug, Serialize)]
struct TranscriptionPayload {
    enabled: bool,
}

impl<'a> From<&'a BotRequest> for CreateBotPayload<'a> {
    fn from(request: &'a BotRequest) -> Self {
        Self {
            meeting_url: &request.meeting_url,
            bot_name: &request.bot_name,
            transcription: TranscriptionPayload {
                enabled: request.transcription_enabled,
            },
        }
    }
}

/// Response from `POST /v1/bots`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBotResponse {
    pub bot_id: String,
    #[serde(default)]
    pub bot_name: Option<String>,
}

/// One status reading of a bot.
#[derive(Debug, Clone, Deserialize)]
pub struct BotStatusSnapshot {
    #[serde(default)]
    pub bot_id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub stats: BotStats,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub output_file: Option<String>,
    #[serde(default)]
    pub transcript_file: Option<String>,
}

impl BotStatusSnapshot {
    pub fn is_terminal(&self) -> bool {
        status::is_terminal(&self.status)
    }

    pub fn is_recording(&self) -> bool {
        self.stats.is_recording
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BotStats {
    #[serde(rename = "isRecording", default)]
    pub is_recording: bool,
}

/// Entry of the `GET /v1/recordings` collection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecordingDescriptor {
    pub recording_id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub size_mb: f64,
    #[serde(default)]
    pub has_transcript: bool,
}

#[derive(Debug, Default, Deserialize)]
struct RecordingsResponse {
    #[serde(default)]
    recordings: Vec<RecordingDescriptor>,
}

/// Downloadable artifact variants of a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Media,
    Transcript,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Media => "media",
            Self::Transcript => "transcript",
        }
    }

    /// Value of the `type` query parameter selecting this variant.
    pub fn query_type(&self) -> Option<&'static str> {
        match self {
            Self::Media => None,
            Self::Transcript => Some("transcript"),
        }
    }
}

/// Operations the lifecycle stages need from the bot management service.
#[async_trait]
pub trait BotApi: Send + Sync {
    async fn create_bot(&self, request: &BotRequest) -> Result<CreateBotResponse, ApiError>;

    async fn get_bot(&self, bot_id: &str) -> Result<BotStatusSnapshot, ApiError>;

    async fn list_recordings(&self) -> Result<Vec<RecordingDescriptor>, ApiError>;

    /// Stream an artifact to `dest`, returning the number of bytes written.
    async fn download_recording(
        &self,
        bot_id: &str,
        kind: ArtifactKind,
        dest: &Path,
    ) -> Result<u64, ApiError>;
}

/// reqwest-backed implementation of [`BotApi`].
pub struct BotApiClient {
    client: reqwest::Client,
    base_url: Url,
    download_timeout: Duration,
}

impl BotApiClient {
    pub fn new(
        base_url: &str,
        request_timeout: Duration,
        download_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid bot API URL: {}", base_url))?;
        if base_url.cannot_be_a_base() {
            bail!("Invalid bot API URL: {}", base_url);
        }

        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url,
            download_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Join path segments onto the base URL, percent-encoding each one so an
    /// id can never change the route or add a query.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        debug!("{}", endpoint);

        let response = request.send().await.map_err(|source| ApiError::Transport {
            endpoint: endpoint.to_string(),
            source,
        })?;

        if response.status() != StatusCode::OK {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                endpoint: endpoint.to_string(),
                status,
                body,
            });
        }

        Ok(response)
    }

    async fn read_json<T: DeserializeOwned>(
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let body = response.text().await.map_err(|source| ApiError::Transport {
            endpoint: endpoint.to_string(),
            source,
        })?;

        serde_json::from_str(&body).map_err(|source| ApiError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

#[async_trait]
impl BotApi for BotApiClient {
    async fn create_bot(&self, request: &BotRequest) -> Result<CreateBotResponse, ApiError> {
        let endpoint = "POST /v1/bots";
        let payload = CreateBotPayload::from(request);

        let response = self
            .send(
                endpoint,
                self.client.post(self.url(&["v1", "bots"])).json(&payload),
            )
            .await?;

        Self::read_json(endpoint, response).await
    }

    async fn get_bot(&self, bot_id: &str) -> Result<BotStatusSnapshot, ApiError> {
        let endpoint = format!("GET /v1/bots/{}", bot_id);

        let response = self
            .send(
                &endpoint,
                self.client.get(self.url(&["v1", "bots", bot_id])),
            )
            .await?;

        Self::read_json(&endpoint, response).await
    }

    async fn list_recordings(&self) -> Result<Vec<RecordingDescriptor>, ApiError> {
        let endpoint = "GET /v1/recordings";

        let response = self
            .send(endpoint, self.client.get(self.url(&["v1", "recordings"])))
            .await?;

        let listing: RecordingsResponse = Self::read_json(endpoint, response).await?;
        Ok(listing.recordings)
    }

    async fn download_recording(
        &self,
        bot_id: &str,
        kind: ArtifactKind,
        dest: &Path,
    ) -> Result<u64, ApiError> {
        let mut request = self
            .client
            .get(self.url(&["v1", "recordings", bot_id]))
            .timeout(self.download_timeout);
        let endpoint = match kind.query_type() {
            Some(variant) => {
                request = request.query(&[("type", variant)]);
                format!("GET /v1/recordings/{}?type={}", bot_id, variant)
            }
            None => format!("GET /v1/recordings/{}", bot_id),
        };

        let mut response = self.send(&endpoint, request).await?;

        // Stream into a sibling file so an interrupted download never leaves a
        // truncated artifact under the final name.
        let partial = partial_path(dest);
        let write_err = |source: std::io::Error| ApiError::Write {
            path: partial.clone(),
            source,
        };

        let file = tokio::fs::File::create(&partial).await.map_err(write_err)?;

        let result = async {
            let mut file = file;
            let mut written = 0u64;

            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|source| ApiError::Transport {
                    endpoint: endpoint.clone(),
                    source,
                })?
            {
                file.write_all(&chunk).await.map_err(write_err)?;
                written += chunk.len() as u64;
            }

            file.flush().await.map_err(write_err)?;
            drop(file);

            tokio::fs::rename(&partial, dest)
                .await
                .map_err(|source| ApiError::Write {
                    path: dest.to_path_buf(),
                    source,
                })?;

            Ok::<u64, ApiError>(written)
        }
        .await;

        if result.is_err() {
            let _ = tokio::fs::remove_file(&partial).await;
        }
        result
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}
