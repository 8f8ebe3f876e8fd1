//! Chain client for stbl-mcp.
//!
//! Defines the [`ChainClient`] trait covering the four chain interactions
//! (post a zero-gas message, read contract state, write contract state,
//! deploy a contract) plus the address discovery flow built on top of it.
//!
//! The bundled [`SimulatedClient`] fabricates receipts locally so the rest
//! of the server can be exercised without network access or a funded key.

pub mod client;
pub mod discovery;

pub use client::{
    ChainClient, ContractCall, ContractWrite, DeployReceipt, DeployRequest, MessageReceipt,
    ReadReceipt, SimulatedClient, WriteReceipt,
};
pub use discovery::{AddressDiscovery, DiscoveryResult};
