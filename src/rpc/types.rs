//! Types for JSON-RPC integration with an EVM node

pub use ethereum_types::{Address, H256, U64, U256};
pub use web3::types::TransactionReceipt as TxReceipt;

/// Header fields of a block the migration cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
	pub number: u64,
	/// Seconds since the Unix epoch.
	pub timestamp: u64,
}

/// Receipt accessors used across the crate
pub trait ReceiptExt {
	/// `true` only for status `1`; pre-Byzantium receipts without a status count as failed.
	fn succeeded(&self) -> bool;
	fn block(&self) -> Option<u64>;
	fn gas(&self) -> Option<u64>;
}

impl ReceiptExt for TxReceipt {
	fn succeeded(&self) -> bool {
		self.status == Some(U64::one())
	}

	fn block(&self) -> Option<u64> {
		self.block_number.map(|n| n.as_u64())
	}

	fn gas(&self) -> Option<u64> {
		self.gas_used
			.filter(|g| *g <= U256::from(u64::MAX))
			.map(|g| g.as_u64())
	}
}

/// Errors talking to the node
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
	#[error("Node error: {0}")]
	Node(#[from] web3::Error),

	#[error("Transaction {hash:?} failed")]
	TransactionFailed { hash: H256 },

	#[error("Timed out: {0}")]
	Timeout(String),

	#[error("Unexpected response: {0}")]
	Decode(String),
}

impl RpcError {
	/// Whether the same request may succeed if sent again.
	///
	/// Transport failures, timeouts and the server-error code range are transient; reverts and
	/// every other JSON-RPC error are answered the same way on retry.
	pub fn is_transient(&self) -> bool {
		match self {
			RpcError::Node(web3::Error::Unreachable) | RpcError::Node(web3::Error::Transport(_)) => {
				true
			}
			RpcError::Node(web3::Error::Rpc(error)) => {
				(-32099..=-32000).contains(&error.code.code()) && !self.is_revert()
			}
			RpcError::Timeout(_) => true,
			_ => false,
		}
	}

	/// Whether the node reported an EVM revert.
	pub fn is_revert(&self) -> bool {
		match self {
			RpcError::Node(web3::Error::Rpc(error)) => {
				error.code.code() == 3 || error.message.to_lowercase().contains("revert")
			}
			_ => false,
		}
	}
}
