//! Ownership reconciliation for legacy positions.
//!
//! The legacy registry records custodied positions as owned by the staking contract. This
//! module joins each lock with its holder and, for custodied positions, follows the staking
//! contract's reverse index to the real beneficiary.

use crate::ledger::{LegacyRegistry, StakingContract};
use crate::migration::types::{Owner, ReconciledPosition, Skip, SkipReason};

use std::sync::Arc;
use tracing::debug;

/// Reads and reconciles one legacy position at a time
pub struct Reconciler {
	legacy: Arc<dyn LegacyRegistry>,
	staking: Arc<dyn StakingContract>,
}

impl Reconciler {
	pub fn new(legacy: Arc<dyn LegacyRegistry>, staking: Arc<dyn StakingContract>) -> Self {
		Self { legacy, staking }
	}

	/// Resolve the lock and effective owner of `entity_id`.
	///
	/// Every failure is a `Skip`: a missing or unreadable id must not stop the scan.
	pub async fn reconcile(&self, entity_id: u64) -> Result<ReconciledPosition, Skip> {
		let lock = self
			.legacy
			.get_lock(entity_id)
			.await
			.map_err(|e| Skip::with_detail(entity_id, SkipReason::LookupFailed, e))?;

		if lock.amount.is_zero() {
			return Err(Skip::new(entity_id, SkipReason::NoPosition));
		}

		let holder = self
			.legacy
			.get_holder(entity_id)
			.await
			.map_err(|e| Skip::with_detail(entity_id, SkipReason::LookupFailed, e))?;

		let owner = if holder == self.staking.address() {
			let beneficiary = self
				.staking
				.get_beneficiary(entity_id)
				.await
				.map_err(|e| Skip::with_detail(entity_id, SkipReason::LookupFailed, e))?;
			debug!(
				"Token {} is staked, beneficiary {:?}",
				entity_id, beneficiary
			);
			Owner::Custodied { beneficiary }
		} else {
			Owner::Direct(holder)
		};

		if owner.address().is_zero() {
			return Err(Skip::new(entity_id, SkipReason::NoOwner));
		}

		Ok(ReconciledPosition { lock, owner })
	}
}
