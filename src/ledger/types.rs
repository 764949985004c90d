use crate::contract::abi::AbiError;
use crate::contract::builder::TransactionError;
use crate::rpc::{Address, RpcError, U256};

use serde::{Deserialize, Serialize};

/// Lock state of one position in the legacy registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
	/// Legacy token id, starting at 1.
	pub entity_id: u64,
	/// Locked amount in the token's smallest unit.
	pub amount: U256,
	/// Unix timestamp at which the lock matures.
	pub lock_end: u64,
}

/// Result of a proxy deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployedContract {
	/// Proxy address, which is the address callers use.
	pub address: Address,
	/// Implementation behind the proxy.
	pub implementation: Address,
}

/// Errors raised by ledger collaborators
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
	#[error("RPC error: {0}")]
	Rpc(#[from] RpcError),

	#[error("ABI error: {0}")]
	Abi(#[from] AbiError),

	#[error("Call build error: {0}")]
	Call(#[from] TransactionError),

	#[error("Artifact error: {0}")]
	Artifact(String),

	#[error("Deployment error: {0}")]
	Deployment(String),
}
