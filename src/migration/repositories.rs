use crate::migration::types::{MigrationError, MigrationUnit};
use crate::rpc::Address;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Everything needed to continue a migration in a later process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationPlan {
	/// Legacy registry the units were read from.
	pub old_locker: Address,
	/// Registry the units are replayed into.
	pub new_registry: Address,
	/// Block timestamp the durations were computed against.
	pub snapshot_time: u64,
	/// Accepted units in replay order.
	pub units: Vec<MigrationUnit>,
	/// Units already confirmed on chain; always a prefix of `units`.
	pub applied: usize,
	/// RFC 3339 time of the last save.
	pub updated_at: String,
}

impl MigrationPlan {
	pub fn is_complete(&self) -> bool {
		self.applied >= self.units.len()
	}

	pub fn remaining(&self) -> &[MigrationUnit] {
		&self.units[self.applied.min(self.units.len())..]
	}
}

/// Repository for migration plan persistence
#[async_trait::async_trait]
pub trait PlanRepository {
	async fn save(&self, plan: &MigrationPlan) -> Result<(), MigrationError>;
	async fn load(&self, old_locker: &Address) -> Result<Option<MigrationPlan>, MigrationError>;
}

/// File-based implementation of PlanRepository
pub struct FilePlanRepository {
	data_dir: PathBuf,
}

impl FilePlanRepository {
	pub fn new(data_dir: PathBuf) -> Self {
		Self { data_dir }
	}

	fn get_plan_filename(&self, old_locker: &Address) -> PathBuf {
		self.data_dir
			.join(format!("migration_plan_{:?}.json", old_locker))
	}
}

#[async_trait::async_trait]
impl PlanRepository for FilePlanRepository {
	async fn save(&self, plan: &MigrationPlan) -> Result<(), MigrationError> {
		tokio::fs::create_dir_all(&self.data_dir).await.map_err(|e| {
			MigrationError::Persistence(format!(
				"Failed to create {}: {}",
				self.data_dir.display(),
				e
			))
		})?;

		let contents = serde_json::to_string_pretty(plan).map_err(|e| {
			MigrationError::Persistence(format!("Failed to serialize migration plan: {}", e))
		})?;

		// Write then rename so a crash never leaves a truncated plan behind.
		let filename = self.get_plan_filename(&plan.old_locker);
		let tmp = filename.with_extension("json.tmp");
		tokio::fs::write(&tmp, contents).await.map_err(|e| {
			MigrationError::Persistence(format!("Failed to write migration plan: {}", e))
		})?;
		tokio::fs::rename(&tmp, &filename).await.map_err(|e| {
			MigrationError::Persistence(format!("Failed to replace migration plan: {}", e))
		})?;

		info!(
			"Saved migration plan to {:?} ({}/{} units applied)",
			filename,
			plan.applied,
			plan.units.len()
		);
		Ok(())
	}

	async fn load(&self, old_locker: &Address) -> Result<Option<MigrationPlan>, MigrationError> {
		let filename = self.get_plan_filename(old_locker);
		if !filename.exists() {
			return Ok(None);
		}

		let contents = tokio::fs::read_to_string(&filename).await.map_err(|e| {
			MigrationError::Persistence(format!("Failed to read {:?}: {}", filename, e))
		})?;
		let plan: MigrationPlan = serde_json::from_str(&contents).map_err(|e| {
			MigrationError::Persistence(format!("Failed to parse {:?}: {}", filename, e))
		})?;

		if plan.applied > plan.units.len() {
			return Err(MigrationError::Persistence(format!(
				"{:?} claims {} applied units but holds only {}",
				filename,
				plan.applied,
				plan.units.len()
			)));
		}

		info!(
			"Loaded migration plan from {:?} ({}/{} units applied)",
			filename,
			plan.applied,
			plan.units.len()
		);
		Ok(Some(plan))
	}
}
