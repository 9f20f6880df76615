//! Logging setup and a notifier that records every event it forwards.

use async_trait::async_trait;
use debate_coordination::{Notifier, NotifyError, SharedNotifier, StatusChanged, TurnCreated};
use tracing::info;

/// Initialise the global subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Logs each event, then hands it to the wrapped notifier.
pub struct LoggingNotifier {
    inner: SharedNotifier,
}

impl LoggingNotifier {
    pub fn new(inner: SharedNotifier) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn publish_turn(&self, event: &TurnCreated) -> Result<(), NotifyError> {
        info!(
            channel = %event.channel_id,
            session_id = %event.session_id,
            turn = event.turn_number,
            agent = %event.agent_id,
            complete = event.is_complete,
            "Turn created"
        );
        self.inner.publish_turn(event).await
    }

    async fn publish_status(&self, event: &StatusChanged) -> Result<(), NotifyError> {
        info!(
            channel = %event.channel_id,
            session_id = %event.session_id,
            status = %event.status,
            title = %event.title,
            "Status changed"
        );
        self.inner.publish_status(event).await
    }
}
