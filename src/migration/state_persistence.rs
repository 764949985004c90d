//! Checkpoint persistence for the migration.
//!
//! This module provides the `StatePersistenceService`, which saves the accepted unit list once
//! the scan finishes and advances a cursor after every confirmed batch. A later run reads the
//! plan back and continues from the cursor instead of re-deploying and re-scanning.

use crate::migration::repositories::{FilePlanRepository, MigrationPlan, PlanRepository};
use crate::migration::types::{MigrationError, MigrationUnit};
use crate::rpc::Address;

use std::path::PathBuf;
use tracing::info;

/// Service for managing plan persistence operations.
pub struct StatePersistenceService {
	plan_repo: Box<dyn PlanRepository + Send + Sync>,
}

impl StatePersistenceService {
	/// Create a new state persistence service for the given data directory.
	pub fn new(data_dir: PathBuf) -> Self {
		Self {
			plan_repo: Box::new(FilePlanRepository::new(data_dir)),
		}
	}

	/// Load the plan for `old_locker`, if one was saved.
	pub async fn load_plan(
		&self,
		old_locker: &Address,
	) -> Result<Option<MigrationPlan>, MigrationError> {
		self.plan_repo.load(old_locker).await
	}

	/// Persist a freshly scanned plan with nothing applied yet.
	pub async fn start_plan(
		&self,
		old_locker: Address,
		new_registry: Address,
		snapshot_time: u64,
		units: Vec<MigrationUnit>,
	) -> Result<MigrationPlan, MigrationError> {
		let plan = MigrationPlan {
			old_locker,
			new_registry,
			snapshot_time,
			units,
			applied: 0,
			updated_at: chrono::Utc::now().to_rfc3339(),
		};
		self.plan_repo.save(&plan).await?;
		info!(
			"Checkpointed plan of {} units for {:?}",
			plan.units.len(),
			new_registry
		);
		Ok(plan)
	}

	/// Advance the cursor by `count` confirmed units and persist it.
	pub async fn record_applied(
		&self,
		plan: &mut MigrationPlan,
		count: usize,
	) -> Result<(), MigrationError> {
		plan.applied = (plan.applied + count).min(plan.units.len());
		plan.updated_at = chrono::Utc::now().to_rfc3339();
		self.plan_repo.save(plan).await
	}

	/// Replace the unit list of a resumed plan.
	///
	/// On resume the remaining units are re-filtered against a new snapshot; expired ones drop
	/// out, so the stored list is rewritten as the applied prefix followed by the survivors.
	pub async fn rebase_plan(
		&self,
		plan: &mut MigrationPlan,
		snapshot_time: u64,
		remaining: Vec<MigrationUnit>,
	) -> Result<(), MigrationError> {
		plan.units.truncate(plan.applied);
		plan.units.extend(remaining);
		plan.snapshot_time = snapshot_time;
		plan.updated_at = chrono::Utc::now().to_rfc3339();
		self.plan_repo.save(plan).await
	}
}
