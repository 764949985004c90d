//! Batch writer for the new registry's bulk import.

use crate::ledger::{LedgerError, NewRegistry};
use crate::migration::types::{Confirmation, MigrationBatch};
use crate::contract::TOKEN_DECIMALS;
use crate::rpc::{ReceiptExt, RpcError};
use crate::utils::{format_token_amount, sum_token_amounts};

use std::sync::Arc;
use tracing::{error, info};

/// Submits batches to `migrateLocks`, one confirmed transaction at a time
pub struct BatchWriter {
	registry: Arc<dyn NewRegistry>,
}

impl BatchWriter {
	pub fn new(registry: Arc<dyn NewRegistry>) -> Self {
		Self { registry }
	}

	/// Submit one batch and wait for its confirmation.
	///
	/// Returns only once the transaction is confirmed. Failures are returned as-is and never
	/// retried, since a resubmission could import the same positions twice.
	pub async fn write(&self, batch: &MigrationBatch) -> Result<Confirmation, LedgerError> {
		let arrays = batch.to_call_arrays();
		let total = sum_token_amounts(&arrays.amounts);
		let first = batch.units.first().map(|u| u.entity_id()).unwrap_or_default();
		let last = batch.units.last().map(|u| u.entity_id()).unwrap_or_default();
		info!(
			"Submitting {} positions, tokens {} to {} ({} tokens, {} staked) to {:?}",
			batch.len(),
			first,
			last,
			format_token_amount(total, TOKEN_DECIMALS),
			arrays.stake_flags.iter().filter(|s| **s).count(),
			self.registry.address()
		);

		let receipt = self
			.registry
			.bulk_import(
				&arrays.amounts,
				&arrays.durations,
				&arrays.owners,
				&arrays.stake_flags,
			)
			.await?;

		if !receipt.succeeded() {
			error!(
				"Batch {} transaction {:?} did not succeed",
				batch.index + 1,
				receipt.transaction_hash
			);
			return Err(RpcError::TransactionFailed {
				hash: receipt.transaction_hash,
			}
			.into());
		}

		Ok(Confirmation {
			batch_index: batch.index,
			block_number: receipt.block(),
			gas_used: receipt.gas(),
			tx_hash: receipt.transaction_hash,
		})
	}
}
