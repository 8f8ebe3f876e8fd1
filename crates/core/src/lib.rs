//! # stbl-core
//!
//! Domain types, traits, and error definitions for stbl-mcp, a tool server
//! for the Stability blockchain. This crate has **zero framework
//! dependencies** — it defines the domain model that all other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem is defined as a trait or plain data here. Implementations
//! live in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod event;
pub mod record;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{ChainError, Error, EventError, Result, StorageError, ToolError};
pub use event::{ChainEvent, EngineNotification, EventFilter, NotificationBus, Subscription};
pub use record::{
    AddressInfo, AddressKind, ContractDeployment, TransactionRecord, TxKind, TxStatus,
    is_valid_address,
};
pub use tool::{Tool, ToolCall, ToolDefinition, ToolRegistry, ToolResult};
