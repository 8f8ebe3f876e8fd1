//! The event engine: connection lifecycle, buffering, and fan-out.
//!
//! One background task owns the live connection. It parses inbound frames,
//! appends them to the bounded buffer, fans them out to subscriptions, and
//! runs the reconnect state machine when the connection drops. All shared
//! state sits behind a single `RwLock`, so calls observe the buffer and
//! registry consistently.

use crate::buffer::EventBuffer;
use crate::connection::{ConnectionState, EventTransport, TransportFrame, WsTransport};
use crate::registry::SubscriptionRegistry;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use stbl_core::error::EventError;
use stbl_core::{ChainEvent, EngineNotification, EventFilter, NotificationBus, Subscription};
use tokio::sync::{RwLock, broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Exponential backoff policy for reconnection.
///
/// Attempt N (1-indexed) waits `base_delay * 2^(N-1)` before reopening.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            max_attempts: 5,
        }
    }
}

/// Engine settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// WebSocket URL of the event stream.
    pub url: String,
    /// Bounded buffer capacity.
    pub buffer_capacity: usize,
    /// Default `recent_events` limit.
    pub recent_limit: usize,
    /// Default `query_events` limit.
    pub query_limit: usize,
    pub reconnect: ReconnectPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: "wss://events.stabilityprotocol.com/ws".to_string(),
            buffer_capacity: 1000,
            recent_limit: 50,
            query_limit: 100,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// Point-in-time snapshot of the engine for status reporting.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub state: ConnectionState,
    pub connected: bool,
    pub subscriptions: usize,
    pub buffered_events: usize,
    pub reconnect_attempts: u32,
}

/// State shared between the engine handle and its background task.
struct EngineInner {
    state: ConnectionState,
    buffer: EventBuffer,
    registry: SubscriptionRegistry,
    attempts: u32,
    closer: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

/// The event subscription engine.
pub struct EventEngine {
    config: EngineConfig,
    transport: Arc<dyn EventTransport>,
    inner: Arc<RwLock<EngineInner>>,
    notifications: Arc<NotificationBus>,
}

impl EventEngine {
    /// An engine over the production WebSocket transport.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_transport(config, Arc::new(WsTransport))
    }

    /// An engine over a caller-supplied transport.
    pub fn with_transport(config: EngineConfig, transport: Arc<dyn EventTransport>) -> Self {
        let inner = EngineInner {
            state: ConnectionState::Disconnected,
            buffer: EventBuffer::new(config.buffer_capacity),
            registry: SubscriptionRegistry::new(),
            attempts: 0,
            closer: None,
            task: None,
        };
        Self {
            config,
            transport,
            inner: Arc::new(RwLock::new(inner)),
            notifications: Arc::new(NotificationBus::default()),
        }
    }

    /// Open the live connection and start the background task.
    ///
    /// A no-op when already connected or connecting. Resets the reconnect
    /// budget, so this is also the way back in after the engine gave up.
    pub async fn connect(&self) -> Result<(), EventError> {
        {
            let mut inner = self.inner.write().await;
            match inner.state {
                // The background task is alive in these states
                ConnectionState::Connecting
                | ConnectionState::Connected
                | ConnectionState::Closed
                | ConnectionState::Failed
                | ConnectionState::Reconnecting => return Ok(()),
                ConnectionState::Disconnected | ConnectionState::GivenUp => {}
            }
            inner.state = ConnectionState::Connecting;
            inner.attempts = 0;
        }

        let conn = match self.transport.open(&self.config.url).await {
            Ok(conn) => conn,
            Err(e) => {
                self.inner.write().await.state = ConnectionState::Disconnected;
                return Err(e);
            }
        };
        let (frames, closer) = conn.into_parts();

        let mut inner = self.inner.write().await;
        if inner.state != ConnectionState::Connecting {
            // disconnect() landed while the transport was opening; honor it
            drop(inner);
            drop(frames);
            if let Some(closer) = closer {
                let _ = closer.send(());
            }
            return Ok(());
        }
        inner.state = ConnectionState::Connected;
        inner.closer = closer;
        inner.task = Some(tokio::spawn(run(
            self.config.clone(),
            Arc::clone(&self.transport),
            Arc::clone(&self.inner),
            Arc::clone(&self.notifications),
            frames,
        )));
        info!(url = %self.config.url, "Event stream connected");
        self.notifications.publish(EngineNotification::Connected);
        Ok(())
    }

    /// Stop the background task and close the connection.
    ///
    /// Subscriptions and buffered events survive; a later `connect()`
    /// resumes delivery to them.
    pub async fn disconnect(&self) {
        let mut inner = self.inner.write().await;
        if let Some(task) = inner.task.take() {
            task.abort();
        }
        if let Some(closer) = inner.closer.take() {
            let _ = closer.send(());
        }
        inner.state = ConnectionState::Disconnected;
        inner.attempts = 0;
        info!("Event stream disconnected by request");
    }

    /// Register a subscription for `filter`.
    pub async fn subscribe(&self, filter: EventFilter) -> Subscription {
        self.inner.write().await.registry.subscribe(filter)
    }

    /// Remove a subscription. Returns false for unknown ids.
    pub async fn unsubscribe(&self, id: &str) -> bool {
        self.inner.write().await.registry.unsubscribe(id)
    }

    /// All subscriptions in creation order.
    pub async fn subscriptions(&self) -> Vec<Subscription> {
        self.inner.read().await.registry.list()
    }

    pub async fn subscription(&self, id: &str) -> Option<Subscription> {
        self.inner.read().await.registry.get(id).cloned()
    }

    /// Pause or resume delivery for one subscription.
    pub async fn set_subscription_active(&self, id: &str, active: bool) -> bool {
        self.inner.write().await.registry.set_active(id, active)
    }

    /// The newest buffered events, oldest first.
    pub async fn recent_events(&self, limit: Option<usize>) -> Vec<ChainEvent> {
        let limit = limit.unwrap_or(self.config.recent_limit);
        self.inner.read().await.buffer.recent(limit)
    }

    /// Buffered events matching `filter`, newest `limit` matches kept.
    pub async fn query_events(&self, filter: &EventFilter, limit: Option<usize>) -> Vec<ChainEvent> {
        let limit = limit.unwrap_or(self.config.query_limit);
        self.inner.read().await.buffer.query(filter, limit)
    }

    /// Drop all buffered events, returning how many were dropped.
    pub async fn clear_events(&self) -> usize {
        self.inner.write().await.buffer.clear()
    }

    pub async fn status(&self) -> EngineStatus {
        let inner = self.inner.read().await;
        EngineStatus {
            state: inner.state,
            connected: inner.state == ConnectionState::Connected,
            subscriptions: inner.registry.len(),
            buffered_events: inner.buffer.len(),
            reconnect_attempts: inner.attempts,
        }
    }

    /// Receive engine notifications (connection changes, matches, errors).
    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Arc<EngineNotification>> {
        self.notifications.subscribe()
    }
}

/// The background task: consume frames until the connection drops, then
/// run the reconnect loop; repeat until the budget is spent.
async fn run(
    config: EngineConfig,
    transport: Arc<dyn EventTransport>,
    inner: Arc<RwLock<EngineInner>>,
    notifications: Arc<NotificationBus>,
    mut frames: mpsc::Receiver<TransportFrame>,
) {
    loop {
        let mut failure: Option<String> = None;
        loop {
            match frames.recv().await {
                Some(TransportFrame::Message(text)) => {
                    deliver(&inner, &notifications, &text).await;
                }
                Some(TransportFrame::Error(detail)) => {
                    failure = Some(detail);
                    break;
                }
                Some(TransportFrame::Closed) | None => break,
            }
        }

        inner.write().await.state = if failure.is_some() {
            ConnectionState::Failed
        } else {
            ConnectionState::Closed
        };
        if let Some(detail) = failure {
            notifications.publish(EngineNotification::Error { detail });
        }
        notifications.publish(EngineNotification::Disconnected);
        info!("Event stream connection dropped");

        match reconnect(&config, transport.as_ref(), &inner, &notifications).await {
            Some(next) => frames = next,
            None => return,
        }
    }
}

/// Parse one frame and deliver it. Malformed frames are discarded with a
/// warning; the connection stays up.
async fn deliver(
    inner: &Arc<RwLock<EngineInner>>,
    notifications: &Arc<NotificationBus>,
    text: &str,
) {
    let event = match ChainEvent::parse(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Discarding malformed event frame");
            notifications.publish(EngineNotification::Error {
                detail: e.to_string(),
            });
            return;
        }
    };

    let matched = {
        let mut inner = inner.write().await;
        inner.buffer.push(event.clone());
        inner.registry.fan_out(&event)
    };

    for subscription_id in matched {
        notifications.publish(EngineNotification::SubscriptionMatched {
            subscription_id,
            event: event.clone(),
        });
    }
}

/// Back off and reopen until a connection sticks or the budget is spent.
/// Returns the new frame stream, or None after giving up.
async fn reconnect(
    config: &EngineConfig,
    transport: &dyn EventTransport,
    inner: &Arc<RwLock<EngineInner>>,
    notifications: &Arc<NotificationBus>,
) -> Option<mpsc::Receiver<TransportFrame>> {
    loop {
        let attempt = {
            let mut guard = inner.write().await;
            if guard.attempts >= config.reconnect.max_attempts {
                guard.state = ConnectionState::GivenUp;
                guard.closer = None;
                warn!(
                    attempts = guard.attempts,
                    "Reconnect budget exhausted, giving up"
                );
                notifications.publish(EngineNotification::MaxReconnectsReached);
                return None;
            }
            guard.attempts += 1;
            guard.state = ConnectionState::Reconnecting;
            guard.attempts
        };

        let delay = config.reconnect.delay_for(attempt);
        info!(attempt, delay_ms = delay.as_millis() as u64, "Scheduling reconnect");
        tokio::time::sleep(delay).await;

        match transport.open(&config.url).await {
            Ok(conn) => {
                let (frames, closer) = conn.into_parts();
                let mut guard = inner.write().await;
                guard.state = ConnectionState::Connected;
                guard.attempts = 0;
                guard.closer = closer;
                info!("Event stream reconnected");
                notifications.publish(EngineNotification::Connected);
                return Some(frames);
            }
            Err(e) => {
                warn!(attempt, error = %e, "Reconnect attempt failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = ReconnectPolicy {
            base_delay: Duration::from_millis(1000),
            max_attempts: 5,
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(5), Duration::from_millis(16000));
    }

    #[test]
    fn default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.buffer_capacity, 1000);
        assert_eq!(config.reconnect.max_attempts, 5);
        assert!(config.url.starts_with("wss://"));
    }
}
