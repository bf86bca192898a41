//! Bot creation.

use tracing::{info, warn};

use super::client::{BotApi, BotRequest};
use super::error::BotError;

/// A bot accepted by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchedBot {
    pub bot_id: String,
    pub bot_name: String,
}

pub struct BotLauncher<'a> {
    api: &'a dyn BotApi,
}

impl<'a> BotLauncher<'a> {
    pub fn new(api: &'a dyn BotApi) -> Self {
        Self { api }
    }

    /// Issue exactly one creation call. Creation is not idempotent, so a
    /// failed call is never retried.
    pub async fn launch(&self, request: &BotRequest) -> Result<LaunchedBot, BotError> {
        info!("Creating bot '{}' for {}", request.bot_name, request.meeting_url);

        let response = self
            .api
            .create_bot(request)
            .await
            .map_err(BotError::Launch)?;

        let bot = LaunchedBot {
            bot_id: response.bot_id,
            bot_name: response
                .bot_name
                .unwrap_or_else(|| request.bot_name.clone()),
        };

        info!("Bot created: {}", bot.bot_id);
        warn!(
            "Admit '{}' from the meeting's waiting room so it can start recording",
            bot.bot_name
        );

        Ok(bot)
    }
}
