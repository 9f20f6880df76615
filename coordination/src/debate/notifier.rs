//! Notifier seam and the queue that delivers to it.
//!
//! The orchestrator never awaits a notifier on its critical path. Events go
//! into a bounded queue drained by one background task:
//!
//! ```text
//! advance / start / cancel ──submit──▶ [ mpsc queue ] ──▶ worker ──timeout──▶ Notifier
//!                                                           │
//!                                             failures: warn! and drop
//! ```
//!
//! One worker per dispatcher means events are delivered in submission order.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::events::{DebateEvent, SharedEventBus, StatusChanged, TurnCreated};

/// Error type for notification delivery
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Result type for notification delivery
pub type NotifyResult<T> = Result<T, NotifyError>;

/// Shared reference to a notifier
pub type SharedNotifier = Arc<dyn Notifier>;

/// Broadcasts debate progress to the channel a session belongs to.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish_turn(&self, event: &TurnCreated) -> NotifyResult<()>;

    async fn publish_status(&self, event: &StatusChanged) -> NotifyResult<()>;
}

/// Publishes onto an in-process [`EventBus`](crate::events::EventBus).
pub struct EventBusNotifier {
    bus: SharedEventBus,
}

impl EventBusNotifier {
    pub fn new(bus: SharedEventBus) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl Notifier for EventBusNotifier {
    async fn publish_turn(&self, event: &TurnCreated) -> NotifyResult<()> {
        self.bus.publish(DebateEvent::TurnCreated(event.clone()));
        Ok(())
    }

    async fn publish_status(&self, event: &StatusChanged) -> NotifyResult<()> {
        self.bus.publish(DebateEvent::StatusChanged(event.clone()));
        Ok(())
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn publish_turn(&self, _event: &TurnCreated) -> NotifyResult<()> {
        Ok(())
    }

    async fn publish_status(&self, _event: &StatusChanged) -> NotifyResult<()> {
        Ok(())
    }
}

enum Envelope {
    Event(DebateEvent),
    Flush(oneshot::Sender<()>),
}

/// Bounded, ordered, best-effort delivery to a [`Notifier`].
///
/// Delivery is at most once: an event submitted while the queue is full is
/// dropped with a warning rather than retried, and a failed or timed-out
/// delivery is not repeated. Operations never wait on notification.
///
/// Must be created inside a Tokio runtime. Dropping the dispatcher lets the
/// worker drain what is already queued and exit.
pub struct NotificationDispatcher {
    sender: mpsc::Sender<Envelope>,
}

impl NotificationDispatcher {
    pub fn new(notifier: SharedNotifier, capacity: usize, delivery_timeout: Duration) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        tokio::spawn(run_worker(notifier, receiver, delivery_timeout));
        Self { sender }
    }

    /// Queue an event without waiting. Returns false if it was dropped.
    pub fn submit(&self, event: DebateEvent) -> bool {
        match self.sender.try_send(Envelope::Event(event)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(Envelope::Event(event))) => {
                warn!(
                    event_type = event.event_type(),
                    session_id = event.session_id(),
                    "Notification queue full, dropping event"
                );
                false
            }
            Err(_) => {
                warn!("Notification worker stopped, dropping event");
                false
            }
        }
    }

    /// Wait until every event submitted before this call has been attempted.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.sender.send(Envelope::Flush(ack)).await.is_err() {
            return;
        }
        let _ = done.await;
    }
}

async fn run_worker(
    notifier: SharedNotifier,
    mut receiver: mpsc::Receiver<Envelope>,
    delivery_timeout: Duration,
) {
    while let Some(envelope) = receiver.recv().await {
        match envelope {
            Envelope::Event(event) => deliver(notifier.as_ref(), &event, delivery_timeout).await,
            Envelope::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    debug!("Notification worker exiting");
}

async fn deliver(notifier: &dyn Notifier, event: &DebateEvent, delivery_timeout: Duration) {
    let attempt = async {
        match event {
            DebateEvent::TurnCreated(e) => notifier.publish_turn(e).await,
            DebateEvent::StatusChanged(e) => notifier.publish_status(e).await,
        }
    };

    match tokio::time::timeout(delivery_timeout, attempt).await {
        Ok(Ok(())) => debug!(
            event_type = event.event_type(),
            session_id = event.session_id(),
            "Notification delivered"
        ),
        Ok(Err(e)) => warn!(
            event_type = event.event_type(),
            session_id = event.session_id(),
            error = %e,
            "Notification failed"
        ),
        Err(_) => warn!(
            event_type = event.event_type(),
            session_id = event.session_id(),
            timeout_ms = delivery_timeout.as_millis() as u64,
            "Notification timed out"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debate::state::DebateStatus;
    use crate::events::EventBus;
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        seen: Mutex<Vec<String>>,
        fail_turns: bool,
        stall_turns: bool,
    }

    impl RecordingNotifier {
        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn publish_turn(&self, event: &TurnCreated) -> NotifyResult<()> {
            if self.stall_turns {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if self.fail_turns {
                return Err(NotifyError::DeliveryFailed("socket closed".to_string()));
            }
            self.seen
                .lock()
                .unwrap()
                .push(format!("turn:{}", event.turn_number));
            Ok(())
        }

        async fn publish_status(&self, event: &StatusChanged) -> NotifyResult<()> {
            self.seen
                .lock()
                .unwrap()
                .push(format!("status:{}", event.status));
            Ok(())
        }
    }

    fn turn(n: u32) -> DebateEvent {
        DebateEvent::TurnCreated(TurnCreated {
            channel_id: "general".to_string(),
            session_id: "s-1".to_string(),
            turn_number: n,
            participant_id: "p-0".to_string(),
            agent_id: "a".to_string(),
            content: "c".to_string(),
            is_complete: false,
            timestamp: Utc::now(),
        })
    }

    fn status(status: DebateStatus) -> DebateEvent {
        DebateEvent::StatusChanged(StatusChanged {
            channel_id: "general".to_string(),
            session_id: "s-1".to_string(),
            status,
            title: "t".to_string(),
            timestamp: Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_delivery_preserves_order() {
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher =
            NotificationDispatcher::new(notifier.clone(), 16, Duration::from_secs(1));

        assert!(dispatcher.submit(status(DebateStatus::InProgress)));
        assert!(dispatcher.submit(turn(1)));
        assert!(dispatcher.submit(turn(2)));
        assert!(dispatcher.submit(status(DebateStatus::Completed)));
        dispatcher.flush().await;

        assert_eq!(
            notifier.seen(),
            vec!["status:in_progress", "turn:1", "turn:2", "status:completed"]
        );
    }

    #[tokio::test]
    async fn test_failures_are_swallowed() {
        let notifier = Arc::new(RecordingNotifier {
            fail_turns: true,
            ..Default::default()
        });
        let dispatcher =
            NotificationDispatcher::new(notifier.clone(), 16, Duration::from_secs(1));

        dispatcher.submit(turn(1));
        dispatcher.submit(status(DebateStatus::Cancelled));
        dispatcher.flush().await;

        assert_eq!(notifier.seen(), vec!["status:cancelled"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_delivery_times_out() {
        let notifier = Arc::new(RecordingNotifier {
            stall_turns: true,
            ..Default::default()
        });
        let dispatcher =
            NotificationDispatcher::new(notifier.clone(), 16, Duration::from_millis(50));

        dispatcher.submit(turn(1));
        dispatcher.submit(status(DebateStatus::Completed));
        dispatcher.flush().await;

        assert_eq!(notifier.seen(), vec!["status:completed"]);
    }

    #[tokio::test]
    async fn test_full_queue_drops_event() {
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher = NotificationDispatcher::new(notifier.clone(), 1, Duration::from_secs(1));

        // The worker has not been polled yet on the current-thread runtime.
        assert!(dispatcher.submit(turn(1)));
        assert!(!dispatcher.submit(turn(2)));
        dispatcher.flush().await;

        assert_eq!(notifier.seen(), vec!["turn:1"]);
    }

    #[tokio::test]
    async fn test_event_bus_notifier() {
        let bus = EventBus::new().shared();
        let mut rx = bus.subscribe();
        let notifier = EventBusNotifier::new(bus.clone());

        if let DebateEvent::TurnCreated(e) = turn(3) {
            notifier.publish_turn(&e).await.unwrap();
        }

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type(), "turn_created");
        assert_eq!(received.session_id(), "s-1");
    }
}
