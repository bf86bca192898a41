//! In-memory `BotApi` with scripted responses, for unit tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use super::client::{
    ArtifactKind, BotApi, BotRequest, BotStats, BotStatusSnapshot, CreateBotResponse,
    RecordingDescriptor,
};
use super::error::ApiError;

#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    CreateBot(BotRequest),
    GetBot(String),
    ListRecordings,
    Download(String, ArtifactKind),
}

#[derive(Default)]
pub struct ScriptedApi {
    create: Mutex<Option<Result<CreateBotResponse, ApiError>>>,
    snapshots: Mutex<VecDeque<Result<BotStatusSnapshot, ApiError>>>,
    repeat_status: Option<BotStatusSnapshot>,
    status_delay: Option<Duration>,
    recordings: Option<Vec<RecordingDescriptor>>,
    downloads: HashMap<ArtifactKind, Vec<u8>>,
    calls: Mutex<Vec<ApiCall>>,
}

pub fn snapshot(status: &str) -> BotStatusSnapshot {
    BotStatusSnapshot {
        bot_id: None,
        status: status.to_string(),
        stats: BotStats {
            is_recording: status == "recording",
        },
        error: None,
        output_file: None,
        transcript_file: None,
    }
}

pub fn recording(recording_id: &str, has_transcript: bool) -> RecordingDescriptor {
    RecordingDescriptor {
        recording_id: recording_id.to_string(),
        filename: format!("{}.webm", recording_id),
        size_mb: 1.0,
        has_transcript,
    }
}

fn server_error(endpoint: &str) -> ApiError {
    ApiError::Status {
        endpoint: endpoint.to_string(),
        status: 500,
        body: "no scripted response".to_string(),
    }
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_created(self, bot_id: &str, bot_name: Option<&str>) -> Self {
        *self.create.lock().unwrap() = Some(Ok(CreateBotResponse {
            bot_id: bot_id.to_string(),
            bot_name: bot_name.map(str::to_string),
        }));
        self
    }

    pub fn with_create_error(self, err: ApiError) -> Self {
        *self.create.lock().unwrap() = Some(Err(err));
        self
    }

    pub fn with_snapshot(self, snapshot: BotStatusSnapshot) -> Self {
        self.snapshots.lock().unwrap().push_back(Ok(snapshot));
        self
    }

    pub fn with_statuses(self, statuses: &[&str]) -> Self {
        for status in statuses {
            self.snapshots.lock().unwrap().push_back(Ok(snapshot(status)));
        }
        self
    }

    /// Answer every status call past the scripted ones with `status`.
    pub fn with_repeating_status(mut self, status: &str) -> Self {
        self.repeat_status = Some(snapshot(status));
        self
    }

    /// Hold every status call for `delay` before answering.
    pub fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = Some(delay);
        self
    }

    pub fn with_status_error(self, err: ApiError) -> Self {
        self.snapshots.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn with_recordings(mut self, recordings: Vec<RecordingDescriptor>) -> Self {
        self.recordings = Some(recordings);
        self
    }

    pub fn with_download(mut self, kind: ArtifactKind, body: &[u8]) -> Self {
        self.downloads.insert(kind, body.to_vec());
        self
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ApiCall::GetBot(_)))
            .count()
    }

    pub fn download_calls(&self) -> Vec<ArtifactKind> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ApiCall::Download(_, kind) => Some(kind),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl BotApi for ScriptedApi {
    async fn create_bot(&self, request: &BotRequest) -> Result<CreateBotResponse, ApiError> {
        self.record(ApiCall::CreateBot(request.clone()));
        self.create
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(server_error("POST /v1/bots")))
    }

    async fn get_bot(&self, bot_id: &str) -> Result<BotStatusSnapshot, ApiError> {
        self.record(ApiCall::GetBot(bot_id.to_string()));
        if let Some(delay) = self.status_delay {
            tokio::time::sleep(delay).await;
        }
        self.snapshots
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.repeat_status.clone().map(Ok))
            .unwrap_or_else(|| Err(server_error("GET /v1/bots")))
    }

    async fn list_recordings(&self) -> Result<Vec<RecordingDescriptor>, ApiError> {
        self.record(ApiCall::ListRecordings);
        self.recordings
            .clone()
            .ok_or_else(|| server_error("GET /v1/recordings"))
    }

    async fn download_recording(
        &self,
        bot_id: &str,
        kind: ArtifactKind,
        dest: &Path,
    ) -> Result<u64, ApiError> {
        self.record(ApiCall::Download(bot_id.to_string(), kind));
        let body = self.downloads.get(&kind).ok_or_else(|| ApiError::Status {
            endpoint: format!("GET /v1/recordings/{}", bot_id),
            status: 404,
            body: "not found".to_string(),
        })?;
        std::fs::write(dest, body).map_err(|source| ApiError::Write {
            path: dest.to_path_buf(),
            source,
        })?;
        Ok(body.len() as u64)
    }
}
