//! End-to-end bot run: launch → poll → retrieve.
//!
//! The three stages share nothing but the bot id and the final snapshot.

use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::client::{BotApi, BotRequest};
use super::error::BotError;
use super::launcher::{BotLauncher, LaunchedBot};
use super::poller::{PollOutcome, StatusPoller, DEFAULT_POLL_INTERVAL};
use super::retriever::{ArtifactRetriever, RetrievalReport};

#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub poll_interval: Duration,
    pub max_duration: Option<Duration>,
    pub output_dir: PathBuf,
    pub run_tag: Option<String>,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_duration: None,
            output_dir: PathBuf::from("."),
            run_tag: None,
        }
    }
}

/// How monitoring ended: a terminal status, or the status error that cut it
/// short. Retrieval has been attempted in both cases.
pub type MonitorResult = Result<PollOutcome, BotError>;

/// Result of a run whose artifacts were looked for.
#[derive(Debug)]
pub struct WorkflowReport {
    pub bot: LaunchedBot,
    pub outcome: MonitorResult,
    pub retrieval: RetrievalReport,
}

pub struct BotWorkflow<'a> {
    api: &'a dyn BotApi,
    settings: WorkflowSettings,
    cancel: CancellationToken,
}

impl<'a> BotWorkflow<'a> {
    pub fn new(api: &'a dyn BotApi, settings: WorkflowSettings) -> Self {
        Self {
            api,
            settings,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn poller(&self) -> StatusPoller<'a> {
        StatusPoller::new(self.api)
            .with_interval(self.settings.poll_interval)
            .with_max_duration(self.settings.max_duration)
            .with_cancellation(self.cancel.clone())
    }

    pub fn retriever(&self) -> ArtifactRetriever<'a> {
        ArtifactRetriever::new(self.api, self.settings.output_dir.clone())
            .with_run_tag(self.settings.run_tag.clone())
    }

    /// Launch a bot and follow it through to its artifacts.
    ///
    /// A bot that ends in `failed` is returned as [`BotError::BotFailed`] and
    /// no retrieval is attempted. When a status check fails the bot may
    /// already have finished, so retrieval still runs and the status error is
    /// kept in [`WorkflowReport::outcome`].
    pub async fn run(&self, request: &BotRequest) -> Result<WorkflowReport, BotError> {
        let bot = BotLauncher::new(self.api).launch(request).await?;
        let (outcome, retrieval) = self.monitor_and_collect(&bot.bot_id).await?;

        Ok(WorkflowReport {
            bot,
            outcome,
            retrieval,
        })
    }

    /// Poll an existing bot to a terminal status, then collect its artifacts.
    pub async fn monitor_and_collect(
        &self,
        bot_id: &str,
    ) -> Result<(MonitorResult, RetrievalReport), BotError> {
        let outcome = match self.poller().poll_until_terminal(bot_id).await {
            Ok(PollOutcome::Failed { reason, .. }) => {
                error!("Bot {} failed, skipping recording retrieval", bot_id);
                return Err(BotError::BotFailed {
                    bot_id: bot_id.to_string(),
                    reason,
                });
            }
            Ok(outcome) => Ok(outcome),
            Err(err @ BotError::StatusFetch { .. }) => {
                warn!(
                    "Lost track of bot {}, looking for its recording anyway",
                    bot_id
                );
                Err(err)
            }
            Err(err) => return Err(err),
        };

        info!("Collecting artifacts for bot {}", bot_id);
        let retrieval = self.retriever().retrieve(bot_id).await;

        Ok((outcome, retrieval))
    }
}
