//! Meeting bot lifecycle.
//!
//! Creates a bot through the management API, follows its status until it
//! reaches a terminal state, then downloads the recording and transcript.

pub mod client;
pub mod error;
pub mod launcher;
pub mod poller;
pub mod retriever;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use client::{
    status, ArtifactKind, BotApi, BotApiClient, BotRequest, BotStatusSnapshot, RecordingDescriptor,
};
pub use error::{ApiError, BotError};
pub use launcher::{BotLauncher, LaunchedBot};
pub use poller::{PollOutcome, StatusPoller, DEFAULT_POLL_INTERVAL};
pub use retriever::{
    artifact_file_name, timestamp_run_tag, ArtifactRetriever, RetrievalReport, RetrievalWarning,
    SavedArtifact,
};
pub use workflow::{BotWorkflow, MonitorResult, WorkflowReport, WorkflowSettings};
