//! Error taxonomy for the bot lifecycle.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single call against the bot management API.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{endpoint}: request failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint}: server returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("{endpoint}: unexpected response body: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    /// HTTP status code, if the server answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors that end a lifecycle stage.
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Failed to create bot: {0}")]
    Launch(#[source] ApiError),

    #[error("Failed to get status of bot {bot_id}: {source}")]
    StatusFetch {
        bot_id: String,
        #[source]
        source: ApiError,
    },

    #[error("Bot {bot_id} failed: {reason}")]
    BotFailed { bot_id: String, reason: String },

    #[error("Bot {bot_id} did not finish within {}s", elapsed.as_secs())]
    PollTimeout { bot_id: String, elapsed: Duration },

    #[error("Monitoring of bot {bot_id} was cancelled")]
    Cancelled { bot_id: String },
}
