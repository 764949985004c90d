//! Node integration module for EVM chains
//!
//! This module provides the JSON-RPC client and the chain types used to talk to an EVM node.
//! Everything above it (contract calls, the ledger collaborators) goes through this client.

/// JSON-RPC client for interacting with an EVM node
mod client;
/// Type definitions for node data structures
mod types;

#[cfg(test)]
pub mod test_node;

pub use client::EthRpcClient;
pub use types::*;
