//!
//! Transaction sender for EVM chains.
//!
//! Provides a sender that submits contract calls from the operator identity and blocks until
//! each transaction is included and buried under the configured number of confirmations.

use crate::contract::builder::ContractCall;
use crate::rpc::{Address, EthRpcClient, ReceiptExt, RpcError, TxReceipt};

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info};
use web3::{
	confirm::send_transaction_with_confirmation,
	types::{Bytes, TransactionRequest},
};

/// Confirmation policy for submitted transactions
#[derive(Debug, Clone)]
pub struct ConfirmationPolicy {
	/// Blocks mined on top of the inclusion block; at least one.
	pub confirmations: usize,
	/// Ceiling on the total wait for one transaction.
	pub timeout: Duration,
	/// Delay between new-block polls.
	pub poll_interval: Duration,
}

impl Default for ConfirmationPolicy {
	fn default() -> Self {
		Self {
			confirmations: 1,
			timeout: Duration::from_secs(300),
			poll_interval: Duration::from_secs(2),
		}
	}
}

/// Transaction sender bound to a single submitting identity
pub struct Sender {
	client: Arc<EthRpcClient>,
	from: Address,
	policy: ConfirmationPolicy,
}

impl Sender {
	/// Creates a new transaction sender
	pub fn new(client: Arc<EthRpcClient>, from: Address, policy: ConfirmationPolicy) -> Self {
		Self {
			client,
			from,
			policy,
		}
	}

	/// Runs a read-only call and returns the raw return data
	pub async fn call(&self, call: &ContractCall) -> Result<Vec<u8>, RpcError> {
		let to = call.to.ok_or_else(|| {
			RpcError::Decode("read-only call requires a target contract".to_string())
		})?;
		self.client.call(to, call.data.clone()).await
	}

	/// Sends a transaction and waits for it to be confirmed
	pub async fn send(&self, call: &ContractCall) -> Result<TxReceipt, RpcError> {
		self.send_from(self.from, call).await
	}

	/// Sends a transaction from an explicit identity and waits for it to be confirmed
	///
	/// Submission is never retried: a resend could land twice under a fresh nonce.
	pub async fn send_from(
		&self,
		from: Address,
		call: &ContractCall,
	) -> Result<TxReceipt, RpcError> {
		let tx = TransactionRequest {
			from,
			to: call.to,
			data: Some(Bytes(call.data.clone())),
			..Default::default()
		};
		info!("Submitting {} from {:?}", call.description, from);

		let confirming = send_transaction_with_confirmation(
			self.client.transport().clone(),
			tx,
			self.policy.poll_interval,
			self.policy.confirmations.max(1),
		);
		let receipt = timeout(self.policy.timeout, confirming)
			.await
			.map_err(|_| {
				error!(
					"{} not confirmed within {:?}",
					call.description, self.policy.timeout
				);
				RpcError::Timeout(format!(
					"{} not confirmed within {:?}",
					call.description, self.policy.timeout
				))
			})??;

		let hash = receipt.transaction_hash;
		if !receipt.succeeded() {
			error!("Transaction {:?} reverted", hash);
			return Err(RpcError::TransactionFailed { hash });
		}

		info!(
			"Transaction {:?} confirmed in block {}",
			hash,
			receipt
				.block()
				.map(|n| n.to_string())
				.unwrap_or_else(|| "?".to_string())
		);
		Ok(receipt)
	}
}
