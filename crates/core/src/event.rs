//! Chain event domain types and the engine notification bus.
//!
//! A [`ChainEvent`] is an immutable record of something that happened on the
//! Stability network. Events arrive as raw JSON frames over the live stream,
//! are timestamped on arrival when the source omits a timestamp, and are
//! never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::error::EventError;

/// An event observed on the chain.
///
/// Identity is positional (order of arrival); duplicates are accepted and
/// stored independently. `timestamp` is always present once the event has
/// been parsed: it is either source-supplied or assigned at arrival.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainEvent {
    /// Event kind tag, e.g. "contract_event" or "block".
    #[serde(rename = "type")]
    pub kind: String,

    /// Contract address the event originated from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,

    /// Contract event name, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,

    /// Open-ended event payload.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub data: serde_json::Map<String, serde_json::Value>,

    /// Source-supplied or arrival timestamp (unix milliseconds on the wire).
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
}

/// Wire shape of an inbound frame. The timestamp is optional here; the
/// public [`ChainEvent`] always carries one.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawChainEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    contract: Option<String>,
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    data: serde_json::Map<String, serde_json::Value>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    block_number: Option<u64>,
    #[serde(default)]
    transaction_hash: Option<String>,
}

impl ChainEvent {
    /// Create an event of the given kind, timestamped now.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            contract: None,
            event: None,
            data: serde_json::Map::new(),
            timestamp: Utc::now(),
            block_number: None,
            transaction_hash: None,
        }
    }

    pub fn with_contract(mut self, contract: impl Into<String>) -> Self {
        self.contract = Some(contract.into());
        self
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Parse a raw textual frame into a `ChainEvent`.
    ///
    /// Assigns the arrival timestamp when the source omitted one. Returns
    /// [`EventError::Parse`] for frames that are not a structured event
    /// record; the caller discards those without tearing down the stream.
    pub fn parse(raw: &str) -> Result<Self, EventError> {
        let raw: RawChainEvent =
            serde_json::from_str(raw).map_err(|e| EventError::Parse(e.to_string()))?;
        Ok(Self {
            kind: raw.kind,
            contract: raw.contract,
            event: raw.event,
            data: raw.data,
            timestamp: raw.timestamp.unwrap_or_else(Utc::now),
            block_number: raw.block_number,
            transaction_hash: raw.transaction_hash,
        })
    }
}

/// A set of field-value equality constraints selecting a subset of events.
///
/// Absent fields are wildcards; an empty filter matches every event. Keys
/// beyond the three top-level fields constrain entries of the event payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventFilter {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,

    /// Payload-key constraints (exact equality).
    #[serde(flatten)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_contract(mut self, contract: impl Into<String>) -> Self {
        self.contract = Some(contract.into());
        self
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// True when the filter has no constraining keys (matches everything).
    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.contract.is_none()
            && self.event.is_none()
            && self.data.values().all(|v| v.is_null())
    }
}

/// One consumer's standing interest in the event stream.
///
/// The filter is immutable after creation; changing interest means
/// unsubscribe + resubscribe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub filter: EventFilter,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub match_count: u64,
}

/// Notifications emitted by the event engine for external delivery
/// (webhook dispatchers, loggers, the serving loop).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineNotification {
    /// The live connection was established (or re-established).
    Connected,

    /// The live connection dropped; reconnection may follow.
    Disconnected,

    /// A transport or parse error occurred. The connection survives parse
    /// errors; transport errors trigger reconnection.
    Error { detail: String },

    /// An inbound event matched an active subscription's filter.
    SubscriptionMatched {
        subscription_id: String,
        event: ChainEvent,
    },

    /// The reconnect attempt budget is exhausted; no further automatic
    /// attempts occur until `connect()` is called again.
    MaxReconnectsReached,
}

/// A broadcast-based bus for engine notifications.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub. Publishing
/// with no subscribers is fine; slow subscribers lag and drop.
pub struct NotificationBus {
    sender: broadcast::Sender<Arc<EngineNotification>>,
}

impl NotificationBus {
    /// Create a new bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a notification to all subscribers.
    pub fn publish(&self, notification: EngineNotification) {
        // Ignore send errors (no subscribers = that's fine)
        let _ = self.sender.send(Arc::new(notification));
    }

    /// Subscribe to receive notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<EngineNotification>> {
        self.sender.subscribe()
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(256)
    }
}
