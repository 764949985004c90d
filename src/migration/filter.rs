//! Expiry filter turning reconciled positions into migration units.

use crate::migration::types::{MigrationUnit, ReconciledPosition, Skip, SkipReason};

/// Validate a position against the run's snapshot time.
///
/// A lock ending at or before `now` has nothing left to preserve and is skipped. Zero
/// amounts and zero owners never reach a unit either, even if a caller bypasses the
/// reconciler.
pub fn filter(position: ReconciledPosition, now: u64) -> Result<MigrationUnit, Skip> {
	let lock = position.lock;

	if lock.amount.is_zero() {
		return Err(Skip::new(lock.entity_id, SkipReason::NoPosition));
	}
	if position.owner.address().is_zero() {
		return Err(Skip::new(lock.entity_id, SkipReason::NoOwner));
	}
	if lock.lock_end <= now {
		return Err(Skip::with_detail(
			lock.entity_id,
			SkipReason::Expired,
			format!("ended at {}, snapshot {}", lock.lock_end, now),
		));
	}

	Ok(MigrationUnit::new(
		lock.entity_id,
		lock.amount,
		lock.lock_end - now,
		position.owner,
		lock.lock_end,
	))
}
