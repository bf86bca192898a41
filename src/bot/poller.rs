//! Status polling until the bot reaches a terminal status.

use std::time::{Duration, Instant};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::client::{status, BotApi, BotStatusSnapshot};
use super::error::BotError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Checks between "still waiting" warnings.
const STILL_WAITING_EVERY: u64 = 60;

/// How monitoring of a bot ended.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    Completed(BotStatusSnapshot),
    Failed {
        reason: String,
        snapshot: BotStatusSnapshot,
    },
    /// Halted by an operator or by the service.
    Stopped(BotStatusSnapshot),
}

impl PollOutcome {
    pub fn snapshot(&self) -> &BotStatusSnapshot {
        match self {
            Self::Completed(snapshot) | Self::Stopped(snapshot) => snapshot,
            Self::Failed { snapshot, .. } => snapshot,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Self::Completed(_) => status::COMPLETED,
            Self::Failed { .. } => status::FAILED,
            Self::Stopped(_) => status::STOPPED,
        }
    }
}

pub struct StatusPoller<'a> {
    api: &'a dyn BotApi,
    poll_interval: Duration,
    max_duration: Option<Duration>,
    cancel: CancellationToken,
}

impl<'a> StatusPoller<'a> {
    pub fn new(api: &'a dyn BotApi) -> Self {
        Self {
            api,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_duration: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Stop with [`BotError::PollTimeout`] once this much time has passed
    /// without a terminal status. `None` polls indefinitely.
    pub fn with_max_duration(mut self, max_duration: Option<Duration>) -> Self {
        self.max_duration = max_duration;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Poll `bot_id` until it reports `completed`, `failed` or `stopped`.
    ///
    /// A single failed status call ends monitoring. No request is issued after
    /// a terminal status has been observed. Cancellation is honoured both
    /// between checks and while a status request is in flight.
    pub async fn poll_until_terminal(&self, bot_id: &str) -> Result<PollOutcome, BotError> {
        info!("Monitoring bot {} status", bot_id);

        let started = Instant::now();
        let mut checks: u64 = 0;
        let mut last_status: Option<String> = None;

        loop {
            if self.cancel.is_cancelled() {
                return Err(BotError::Cancelled {
                    bot_id: bot_id.to_string(),
                });
            }

            let fetched = tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Stopped monitoring bot {} during a status check", bot_id);
                    return Err(BotError::Cancelled {
                        bot_id: bot_id.to_string(),
                    });
                }
                fetched = self.api.get_bot(bot_id) => fetched,
            };
            let snapshot = fetched.map_err(|source| {
                error!("Failed to get status of bot {}: {}", bot_id, source);
                BotError::StatusFetch {
                    bot_id: bot_id.to_string(),
                    source,
                }
            })?;
            checks += 1;

            info!(
                "[Check {}] Status: {}, Recording: {}",
                checks,
                snapshot.status,
                snapshot.is_recording()
            );
            if last_status.as_deref() != Some(snapshot.status.as_str()) {
                if let Some(previous) = &last_status {
                    info!(
                        "Bot {} status changed: {} -> {}",
                        bot_id, previous, snapshot.status
                    );
                }
                last_status = Some(snapshot.status.clone());
            }

            match snapshot.status.as_str() {
                status::COMPLETED => {
                    info!("Meeting ended, recording complete");
                    return Ok(PollOutcome::Completed(snapshot));
                }
                status::FAILED => {
                    let reason = snapshot
                        .error
                        .clone()
                        .unwrap_or_else(|| "Unknown error".to_string());
                    error!("Bot {} failed: {}", bot_id, reason);
                    return Ok(PollOutcome::Failed { reason, snapshot });
                }
                status::STOPPED => {
                    info!("Bot {} was stopped", bot_id);
                    return Ok(PollOutcome::Stopped(snapshot));
                }
                _ => {}
            }

            let elapsed = started.elapsed();
            let wait = match self.max_duration {
                Some(max) if elapsed >= max => {
                    warn!(
                        "Giving up on bot {} after {}s in status {}",
                        bot_id,
                        elapsed.as_secs(),
                        snapshot.status
                    );
                    return Err(BotError::PollTimeout {
                        bot_id: bot_id.to_string(),
                        elapsed,
                    });
                }
                Some(max) => self.poll_interval.min(max - elapsed),
                None => self.poll_interval,
            };

            if checks % STILL_WAITING_EVERY == 0 {
                warn!(
                    "Bot {} still {} after {}s",
                    bot_id,
                    snapshot.status,
                    elapsed.as_secs()
                );
            }

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Stopped monitoring bot {}", bot_id);
                    return Err(BotError::Cancelled {
                        bot_id: bot_id.to_string(),
                    });
                }
                _ = sleep(wait) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::error::ApiError;
    use crate::bot::testing::{snapshot, ScriptedApi};

    fn fast(api: &ScriptedApi) -> StatusPoller<'_> {
        StatusPoller::new(api).with_interval(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_completed_after_joining() {
        let api = ScriptedApi::new().with_statuses(&["joining", "joining", "completed"]);

        let outcome = fast(&api).poll_until_terminal("abc123").await.unwrap();

        assert!(matches!(outcome, PollOutcome::Completed(_)));
        assert_eq!(api.status_calls(), 3);
    }

    #[tokio::test]
    async fn test_no_poll_after_terminal_status() {
        for terminal in ["completed", "failed", "stopped"] {
            let api = ScriptedApi::new()
                .with_statuses(&["pending", "recording", terminal])
                .with_repeating_status("recording");

            let outcome = fast(&api).poll_until_terminal("abc123").await.unwrap();

            assert_eq!(outcome.status(), terminal);
            assert_eq!(api.status_calls(), 3, "extra poll after {}", terminal);
        }
    }

    #[tokio::test]
    async fn test_failed_carries_server_reason() {
        let mut failed = snapshot("failed");
        failed.error = Some("host left".to_string());
        let api = ScriptedApi::new().with_snapshot(failed);

        let outcome = fast(&api).poll_until_terminal("abc123").await.unwrap();

        match outcome {
            PollOutcome::Failed { reason, .. } => assert_eq!(reason, "host left"),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_without_reason() {
        let api = ScriptedApi::new().with_statuses(&["failed"]);

        let outcome = fast(&api).poll_until_terminal("abc123").await.unwrap();

        match outcome {
            PollOutcome::Failed { reason, .. } => assert_eq!(reason, "Unknown error"),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_status_keeps_polling() {
        let api = ScriptedApi::new().with_statuses(&["in_waiting_room", "joining", "stopped"]);

        let outcome = fast(&api).poll_until_terminal("abc123").await.unwrap();

        assert!(matches!(outcome, PollOutcome::Stopped(_)));
        assert_eq!(api.status_calls(), 3);
    }

    #[tokio::test]
    async fn test_fetch_error_ends_monitoring() {
        let api = ScriptedApi::new()
            .with_statuses(&["joining"])
            .with_status_error(ApiError::Status {
                endpoint: "GET /v1/bots/abc123".to_string(),
                status: 502,
                body: "bad gateway".to_string(),
            })
            .with_repeating_status("completed");

        let err = fast(&api).poll_until_terminal("abc123").await.unwrap_err();

        assert!(matches!(err, BotError::StatusFetch { .. }));
        assert_eq!(api.status_calls(), 2);
    }

    #[tokio::test]
    async fn test_non_terminal_runs_until_deadline() {
        let api = ScriptedApi::new().with_repeating_status("recording");

        let err = StatusPoller::new(&api)
            .with_interval(Duration::from_millis(5))
            .with_max_duration(Some(Duration::from_millis(60)))
            .poll_until_terminal("abc123")
            .await
            .unwrap_err();

        assert!(matches!(err, BotError::PollTimeout { .. }));
        assert!(api.status_calls() > 2);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_wait() {
        let api = ScriptedApi::new().with_repeating_status("joining");
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = StatusPoller::new(&api)
            .with_interval(Duration::from_secs(60))
            .with_cancellation(cancel)
            .poll_until_terminal("abc123")
            .await
            .unwrap_err();

        assert!(matches!(err, BotError::Cancelled { .. }));
        assert!(started.elapsed() < Duration::from_secs(30));
        assert_eq!(api.status_calls(), 1);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_status_request() {
        let api = ScriptedApi::new()
            .with_repeating_status("joining")
            .with_status_delay(Duration::from_secs(60));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = fast(&api)
            .with_cancellation(cancel)
            .poll_until_terminal("abc123")
            .await
            .unwrap_err();

        assert!(matches!(err, BotError::Cancelled { .. }));
        assert!(started.elapsed() < Duration::from_secs(30));
        assert_eq!(api.status_calls(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_issues_no_request() {
        let api = ScriptedApi::new().with_repeating_status("joining");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = fast(&api)
            .with_cancellation(cancel)
            .poll_until_terminal("abc123")
            .await
            .unwrap_err();

        assert!(matches!(err, BotError::Cancelled { .. }));
        assert_eq!(api.status_calls(), 0);
    }

    #[test]
    fn test_default_interval() {
        let api = ScriptedApi::new();
        let poller = StatusPoller::new(&api);
        assert_eq!(poller.poll_interval, Duration::from_secs(5));
        assert!(poller.max_duration.is_none());
    }
}
