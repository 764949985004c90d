//!
//! JSON-RPC client for an EVM node.
//!
//! This module wraps a `web3` HTTP transport with the read policy the migration needs:
//! every read carries its own request timeout and transient failures are retried with
//! exponential backoff inside a bounded window. Writes go through [`crate::contract::sender`].

use super::types::*;
use backoff::{ExponentialBackoff, future::retry};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};
use web3::{
	Web3,
	transports::Http,
	types::{BlockId, BlockNumber, Bytes, CallRequest},
};

/// EVM JSON-RPC client
pub struct EthRpcClient {
	/// The underlying web3 handle.
	web3: Web3<Http>,
	/// Timeout for a single round-trip.
	request_timeout: Duration,
	/// Upper bound on the total time spent retrying a single read.
	read_retry_window: Duration,
}

impl EthRpcClient {
	/// Create a new client.
	///
	/// # Arguments
	/// * `rpc_url` - The node's HTTP JSON-RPC endpoint.
	/// * `request_timeout` - Timeout for a single round-trip.
	/// * `read_retry_window` - Total time a read may spend retrying transient failures.
	pub fn new(
		rpc_url: &str,
		request_timeout: Duration,
		read_retry_window: Duration,
	) -> Result<Self, RpcError> {
		let transport = Http::new(rpc_url)?;

		Ok(Self {
			web3: Web3::new(transport),
			request_timeout,
			read_retry_window,
		})
	}

	/// The transport, for helpers that drive their own request sequence.
	pub fn transport(&self) -> &Http {
		self.web3.transport()
	}

	/// Run one read, retrying transient failures within the read window.
	async fn read<T, F, Fut>(&self, what: &str, op: F) -> Result<T, RpcError>
	where
		F: Fn() -> Fut,
		Fut: Future<Output = web3::Result<T>>,
	{
		let policy = ExponentialBackoff {
			max_elapsed_time: Some(self.read_retry_window),
			..ExponentialBackoff::default()
		};

		retry(policy, || {
			let attempt = op();
			async move {
				let result = match tokio::time::timeout(self.request_timeout, attempt).await {
					Ok(result) => result.map_err(RpcError::from),
					Err(_) => Err(RpcError::Timeout(what.to_string())),
				};
				result.map_err(|e| {
					if e.is_transient() {
						warn!("Transient error on {}, retrying: {}", what, e);
						backoff::Error::transient(e)
					} else {
						backoff::Error::permanent(e)
					}
				})
			}
		})
		.await
	}

	/// Execute `eth_call` against the latest block and return the raw return data.
	pub async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, RpcError> {
		debug!("eth_call {:?} 0x{}", to, hex::encode(&data));
		let request = CallRequest {
			to: Some(to),
			data: Some(Bytes(data)),
			..Default::default()
		};

		let eth = self.web3.eth();
		let output = self
			.read("eth_call", || eth.call(request.clone(), None))
			.await?;
		Ok(output.0)
	}

	/// Fetch the header of the latest block.
	pub async fn latest_block(&self) -> Result<BlockHeader, RpcError> {
		let eth = self.web3.eth();
		let block = self
			.read("eth_getBlockByNumber", || {
				eth.block(BlockId::Number(BlockNumber::Latest))
			})
			.await?
			.ok_or_else(|| RpcError::Decode("node returned no latest block".to_string()))?;

		let number = block
			.number
			.ok_or_else(|| RpcError::Decode("latest block has no number".to_string()))?;
		if block.timestamp > U256::from(u64::MAX) {
			return Err(RpcError::Decode(format!(
				"block timestamp {} out of range",
				block.timestamp
			)));
		}

		Ok(BlockHeader {
			number: number.as_u64(),
			timestamp: block.timestamp.as_u64(),
		})
	}

	/// Current chain height.
	pub async fn block_number(&self) -> Result<u64, RpcError> {
		let eth = self.web3.eth();
		let number = self.read("eth_blockNumber", || eth.block_number()).await?;
		Ok(number.as_u64())
	}
}
