use crate::ledger::{LedgerError, LockRecord};
use crate::rpc::{Address, H256, U256};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Who a migrated position belongs to.
///
/// Custodied positions are held by the staking contract on the legacy registry; the real
/// owner is its beneficiary, and the position must be re-staked on import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Owner {
	Direct(Address),
	Custodied { beneficiary: Address },
}

impl Owner {
	/// The effective owner.
	pub fn address(&self) -> Address {
		match self {
			Owner::Direct(address) => *address,
			Owner::Custodied { beneficiary } => *beneficiary,
		}
	}

	/// Stake flag replayed into the new registry.
	pub fn is_custodied(&self) -> bool {
		matches!(self, Owner::Custodied { .. })
	}
}

/// Lock state joined with its resolved owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconciledPosition {
	pub lock: LockRecord,
	pub owner: Owner,
}

/// A validated position, ready to be replayed.
///
/// Only the filter builds these, which keeps `amount > 0`, `duration > 0` and a non-zero
/// owner true for every value in existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationUnit {
	entity_id: u64,
	amount: U256,
	duration: u64,
	owner: Owner,
	lock_end: u64,
}

impl MigrationUnit {
	pub(super) fn new(
		entity_id: u64,
		amount: U256,
		duration: u64,
		owner: Owner,
		lock_end: u64,
	) -> Self {
		debug_assert!(!amount.is_zero() && duration > 0 && !owner.address().is_zero());
		Self {
			entity_id,
			amount,
			duration,
			owner,
			lock_end,
		}
	}

	pub fn entity_id(&self) -> u64 {
		self.entity_id
	}

	pub fn amount(&self) -> U256 {
		self.amount
	}

	/// Seconds left on the lock at the snapshot time.
	pub fn duration(&self) -> u64 {
		self.duration
	}

	pub fn owner(&self) -> Address {
		self.owner.address()
	}

	pub fn stake_flag(&self) -> bool {
		self.owner.is_custodied()
	}

	/// The position this unit was derived from, for re-filtering against a later snapshot.
	pub fn position(&self) -> ReconciledPosition {
		ReconciledPosition {
			lock: LockRecord {
				entity_id: self.entity_id,
				amount: self.amount,
				lock_end: self.lock_end,
			},
			owner: self.owner,
		}
	}
}

/// Parallel arrays in the shape `migrateLocks` expects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallArrays {
	pub amounts: Vec<U256>,
	pub durations: Vec<u64>,
	pub owners: Vec<Address>,
	pub stake_flags: Vec<bool>,
}

/// A contiguous, size-bounded run of units submitted as one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationBatch {
	/// Zero-based position among the run's batches.
	pub index: usize,
	pub units: Vec<MigrationUnit>,
}

impl MigrationBatch {
	pub fn len(&self) -> usize {
		self.units.len()
	}

	/// Flatten into four index-aligned arrays.
	pub fn to_call_arrays(&self) -> CallArrays {
		let mut arrays = CallArrays {
			amounts: Vec::with_capacity(self.units.len()),
			durations: Vec::with_capacity(self.units.len()),
			owners: Vec::with_capacity(self.units.len()),
			stake_flags: Vec::with_capacity(self.units.len()),
		};
		for unit in &self.units {
			arrays.amounts.push(unit.amount());
			arrays.durations.push(unit.duration());
			arrays.owners.push(unit.owner());
			arrays.stake_flags.push(unit.stake_flag());
		}
		arrays
	}
}

/// Why an entity was left out of the migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SkipReason {
	/// Zero amount: never minted or already withdrawn.
	NoPosition,
	/// A read failed, typically `ownerOf` reverting for a burned id.
	LookupFailed,
	/// The resolved owner is the zero address.
	NoOwner,
	/// The lock ends at or before the snapshot time.
	Expired,
}

impl fmt::Display for SkipReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let label = match self {
			SkipReason::NoPosition => "no position",
			SkipReason::LookupFailed => "lookup failed",
			SkipReason::NoOwner => "no owner",
			SkipReason::Expired => "lock expired",
		};
		f.write_str(label)
	}
}

/// A non-fatal, per-entity exclusion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skip {
	pub entity_id: u64,
	pub reason: SkipReason,
	pub detail: Option<String>,
}

impl Skip {
	pub fn new(entity_id: u64, reason: SkipReason) -> Self {
		Self {
			entity_id,
			reason,
			detail: None,
		}
	}

	pub fn with_detail(entity_id: u64, reason: SkipReason, detail: impl fmt::Display) -> Self {
		Self {
			entity_id,
			reason,
			detail: Some(detail.to_string()),
		}
	}
}

impl fmt::Display for Skip {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.detail {
			Some(detail) => write!(f, "token {}: {} ({})", self.entity_id, self.reason, detail),
			None => write!(f, "token {}: {}", self.entity_id, self.reason),
		}
	}
}

/// Proof that a batch landed on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
	pub batch_index: usize,
	pub tx_hash: H256,
	pub block_number: Option<u64>,
	pub gas_used: Option<u64>,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	Migrated,
	NothingToMigrate,
	DryRun,
	AlreadyComplete,
}

/// Final report of a run.
#[derive(Debug, Clone)]
pub struct MigrationReport {
	pub outcome: Outcome,
	pub total_entities: u64,
	pub prepared: usize,
	pub skipped: BTreeMap<SkipReason, usize>,
	pub batches_confirmed: usize,
	pub units_applied: usize,
	pub new_registry: Option<Address>,
}

impl MigrationReport {
	/// Get a human-readable summary of the run
	pub fn summary(&self) -> String {
		let skipped = if self.skipped.is_empty() {
			"none".to_string()
		} else {
			self.skipped
				.iter()
				.map(|(reason, count)| format!("{} {}", count, reason))
				.collect::<Vec<_>>()
				.join(", ")
		};
		format!(
			"{:?}: {} of {} tokens prepared, {} applied in {} batches; skipped: {}",
			self.outcome,
			self.prepared,
			self.total_entities,
			self.units_applied,
			self.batches_confirmed,
			skipped
		)
	}
}

/// Run-halting errors
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
	#[error("Configuration error: {0}")]
	Config(String),

	#[error("Failed to deploy new locker: {0}")]
	Deploy(LedgerError),

	#[error("Failed to upgrade staking contract: {0}")]
	Upgrade(LedgerError),

	#[error("Failed to point staking at new locker: {0}")]
	Repoint(LedgerError),

	#[error("Failed to read snapshot time: {0}")]
	Snapshot(LedgerError),

	#[error("Failed to resolve or approve underlying token: {0}")]
	Approval(LedgerError),

	#[error(
		"Batch {} of {total} failed after {applied} units were applied: {error}",
		.batch + 1
	)]
	WriteFailed {
		batch: usize,
		total: usize,
		applied: usize,
		error: LedgerError,
	},

	#[error("Checkpoint error: {0}")]
	Persistence(String),
}
