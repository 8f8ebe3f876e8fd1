//! The event subscription engine.
//!
//! Maintains a live WebSocket connection to the chain event stream, buffers
//! every parsed event in a bounded FIFO, and fans matching events out to
//! registered subscriptions. Dropped connections are retried with
//! exponential backoff up to a configured attempt budget.
//!
//! The [`EventEngine`] is the public entry point. The transport behind it is
//! a trait ([`EventTransport`]) so tests drive the engine with scripted
//! connections instead of a real socket.

pub mod buffer;
pub mod connection;
pub mod engine;
pub mod filter;
pub mod registry;

pub use buffer::EventBuffer;
pub use connection::{
    ConnectionState, EventTransport, TransportConn, TransportFrame, WsTransport,
};
pub use engine::{EngineConfig, EngineStatus, EventEngine, ReconnectPolicy};
pub use filter::matches;
pub use registry::SubscriptionRegistry;
