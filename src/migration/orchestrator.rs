//! Migration orchestrator and integration point for all pipeline stages.
//!
//! This module defines the `MigrationOrchestrator`, which walks the migration through its
//! states: deploy the new locker, upgrade staking, point staking at the new locker, scan the
//! legacy registry, and replay the accepted positions batch by batch.
//!
//! The orchestrator is responsible for:
//! - Sequencing the external collaborators (deployment, upgrade, re-pointing, approval)
//! - Taking one time snapshot and driving the reconciler and filter over the id range
//! - Batching accepted units and writing them strictly one confirmed batch at a time
//! - Checkpointing the plan and cursor when persistence is enabled, and resuming from it
//!
//! Every step is awaited before the next begins; the first fatal error ends the run.

use crate::contract::{TOKEN_DECIMALS, abi::Token};
use crate::ledger::{
	Clock, ContractFactory, DeploymentService, LegacyRegistry, StakingContract,
	UpgradeService,
};
use crate::migration::{
	batcher::batch,
	filter::filter,
	progress_tracker::ScanProgressTracker,
	reconciler::Reconciler,
	repositories::MigrationPlan,
	state_persistence::StatePersistenceService,
	types::{MigrationError, MigrationReport, MigrationUnit, Outcome},
	writer::BatchWriter,
};
use crate::rpc::Address;
use crate::utils::{format_token_amount, sum_token_amounts};

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Implementation deployed behind the new locker proxy.
pub const LOCKER_IMPLEMENTATION: &str = "LockerToken";
/// Implementation the staking proxy is upgraded to.
pub const STAKING_IMPLEMENTATION: &str = "OmnichainStakingToken";

/// Addresses and knobs for one run
#[derive(Debug, Clone)]
pub struct MigrationSettings {
	pub old_locker: Address,
	pub staking: Address,
	pub token: Address,
	pub proxy_admin: Address,
	pub deployer: Address,
	/// Legacy ids are scanned from 1 through this value.
	pub total_entities: u64,
	pub batch_size: NonZeroUsize,
	/// Use an already deployed new locker instead of deploying one.
	pub new_locker: Option<Address>,
	pub skip_upgrade: bool,
	/// Scan and report only; issue no transactions.
	pub dry_run: bool,
}

/// The collaborators a run talks to
#[derive(Clone)]
pub struct Collaborators {
	pub legacy: Arc<dyn LegacyRegistry>,
	pub staking: Arc<dyn StakingContract>,
	pub contracts: Arc<dyn ContractFactory>,
	pub clock: Arc<dyn Clock>,
	pub deployer: Arc<dyn DeploymentService>,
	pub upgrader: Arc<dyn UpgradeService>,
}

/// Where a run currently stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationState {
	Init,
	Deploying,
	Upgrading,
	Repointed,
	Scanning,
	Migrating { batch: usize, total: usize },
	Done,
}

/// Main migration orchestrator that coordinates all pipeline stages.
pub struct MigrationOrchestrator {
	settings: MigrationSettings,
	collaborators: Collaborators,
	persistence: Option<Arc<StatePersistenceService>>,
	state: MigrationState,
}

/// Counters produced by the write phase
struct WriteProgress {
	batches_confirmed: usize,
	units_applied: usize,
}

/// Reconcile and filter every id in `1..=total` against one snapshot time.
///
/// Skips are counted and logged by the tracker and never stop the scan. The result keeps
/// ascending id order.
pub async fn scan_positions(
	reconciler: &Reconciler,
	total: u64,
	now: u64,
	tracker: &mut ScanProgressTracker,
) -> Vec<MigrationUnit> {
	let mut units = Vec::new();
	for entity_id in 1..=total {
		match reconciler
			.reconcile(entity_id)
			.await
			.and_then(|position| filter(position, now))
		{
			Ok(unit) => {
				tracker.record_accepted(entity_id);
				units.push(unit);
			}
			Err(skip) => tracker.record_skip(&skip),
		}
	}
	units
}

impl MigrationOrchestrator {
	/// Create an orchestrator. `persistence` enables checkpointing and resume.
	pub fn new(
		settings: MigrationSettings,
		collaborators: Collaborators,
		persistence: Option<StatePersistenceService>,
	) -> Self {
		Self {
			settings,
			collaborators,
			persistence: persistence.map(Arc::new),
			state: MigrationState::Init,
		}
	}

	pub fn state(&self) -> &MigrationState {
		&self.state
	}

	fn transition(&mut self, next: MigrationState) {
		info!("Migration state: {:?} -> {:?}", self.state, next);
		self.state = next;
	}

	fn report(&self, outcome: Outcome) -> MigrationReport {
		MigrationReport {
			outcome,
			total_entities: self.settings.total_entities,
			prepared: 0,
			skipped: BTreeMap::new(),
			batches_confirmed: 0,
			units_applied: 0,
			new_registry: None,
		}
	}

	/// Run the migration to completion.
	pub async fn run(&mut self) -> Result<MigrationReport, MigrationError> {
		if self.settings.dry_run {
			return self.dry_run().await;
		}

		if let Some(persistence) = self.persistence.clone() {
			if let Some(plan) = persistence.load_plan(&self.settings.old_locker).await? {
				return self.resume(plan, persistence).await;
			}
		}

		let new_registry = self.deploy().await?;
		self.upgrade().await?;
		self.repoint(new_registry).await?;

		let (now, units, mut report) = self.scan().await?;
		report.new_registry = Some(new_registry);

		if units.is_empty() {
			info!("No tokens to migrate!");
			report.outcome = Outcome::NothingToMigrate;
			self.transition(MigrationState::Done);
			return Ok(report);
		}

		let plan = match &self.persistence {
			Some(persistence) => Some(
				persistence
					.start_plan(self.settings.old_locker, new_registry, now, units.clone())
					.await?,
			),
			None => None,
		};

		let progress = self.migrate(new_registry, units, plan, 0).await?;
		report.batches_confirmed = progress.batches_confirmed;
		report.units_applied = progress.units_applied;

		self.transition(MigrationState::Done);
		info!("Migration completed successfully!");
		Ok(report)
	}

	async fn dry_run(&mut self) -> Result<MigrationReport, MigrationError> {
		info!("Dry run: scanning legacy locker only, no transactions will be sent");
		let (_, units, mut report) = self.scan().await?;
		report.outcome = Outcome::DryRun;

		if units.is_empty() {
			info!("No tokens to migrate!");
		} else {
			let batches = units.len().div_ceil(self.settings.batch_size.get());
			let amounts: Vec<_> = units.iter().map(MigrationUnit::amount).collect();
			let total = sum_token_amounts(&amounts);
			info!(
				"Would migrate {} positions ({} tokens) in {} batches",
				units.len(),
				format_token_amount(total, TOKEN_DECIMALS),
				batches
			);
		}

		self.transition(MigrationState::Done);
		Ok(report)
	}

	async fn deploy(&mut self) -> Result<Address, MigrationError> {
		if let Some(existing) = self.settings.new_locker {
			info!("Using existing new locker at {:?}", existing);
			return Ok(existing);
		}

		self.transition(MigrationState::Deploying);
		let deployed = self
			.collaborators
			.deployer
			.deploy_upgradable_contract(
				LOCKER_IMPLEMENTATION,
				&[
					Token::Address(self.settings.token),
					Token::Address(self.settings.staking),
				],
				self.settings.proxy_admin,
				LOCKER_IMPLEMENTATION,
				self.settings.deployer,
			)
			.await
			.map_err(MigrationError::Deploy)?;

		info!("New locker deployed at {:?}", deployed.address);
		Ok(deployed.address)
	}

	async fn upgrade(&mut self) -> Result<(), MigrationError> {
		if self.settings.skip_upgrade {
			info!("Skipping staking upgrade");
			return Ok(());
		}

		self.transition(MigrationState::Upgrading);
		self.collaborators
			.upgrader
			.upgrade_upgradable_contract(
				self.settings.staking,
				STAKING_IMPLEMENTATION,
				self.settings.proxy_admin,
				self.settings.deployer,
			)
			.await
			.map_err(MigrationError::Upgrade)?;
		info!("Staking contract upgraded");
		Ok(())
	}

	async fn repoint(&mut self, new_registry: Address) -> Result<(), MigrationError> {
		self.collaborators
			.staking
			.set_locker_pointer(new_registry)
			.await
			.map_err(MigrationError::Repoint)?;
		self.transition(MigrationState::Repointed);
		info!("Staking now points at locker {:?}", new_registry);
		Ok(())
	}

	async fn scan(&mut self) -> Result<(u64, Vec<MigrationUnit>, MigrationReport), MigrationError> {
		self.transition(MigrationState::Scanning);

		let now = self
			.collaborators
			.clock
			.snapshot_time()
			.await
			.map_err(MigrationError::Snapshot)?;

		let total = self.settings.total_entities;
		info!(
			"Gathering token data for {} tokens from old locker {:?} (snapshot time {})",
			total, self.settings.old_locker, now
		);

		let reconciler = Reconciler::new(
			self.collaborators.legacy.clone(),
			self.collaborators.staking.clone(),
		);
		let mut tracker = ScanProgressTracker::new(total);
		let units = scan_positions(&reconciler, total, now, &mut tracker).await;

		let stats = tracker.get_stats();
		info!("{}", stats.summary());
		info!("Prepared {} tokens for migration", units.len());

		let mut report = self.report(Outcome::Migrated);
		report.prepared = units.len();
		report.skipped = stats.skipped;
		Ok((now, units, report))
	}

	async fn resume(
		&mut self,
		mut plan: MigrationPlan,
		persistence: Arc<StatePersistenceService>,
	) -> Result<MigrationReport, MigrationError> {
		let mut report = self.report(Outcome::AlreadyComplete);
		report.new_registry = Some(plan.new_registry);
		report.prepared = plan.units.len();
		report.units_applied = plan.applied;

		if let Some(configured) = self.settings.new_locker {
			if configured != plan.new_registry {
				return Err(MigrationError::Config(format!(
					"checkpoint targets new locker {:?} but {:?} was configured",
					plan.new_registry, configured
				)));
			}
		}

		if plan.is_complete() {
			info!(
				"Migration already complete: {} units applied to {:?}",
				plan.applied, plan.new_registry
			);
			self.transition(MigrationState::Done);
			return Ok(report);
		}

		info!(
			"Resuming migration into {:?} at unit {}/{} (planned at snapshot {})",
			plan.new_registry,
			plan.applied,
			plan.units.len(),
			plan.snapshot_time
		);

		self.transition(MigrationState::Scanning);
		let now = self
			.collaborators
			.clock
			.snapshot_time()
			.await
			.map_err(MigrationError::Snapshot)?;

		let mut remaining = Vec::with_capacity(plan.remaining().len());
		for unit in plan.remaining() {
			match filter(unit.position(), now) {
				Ok(refreshed) => remaining.push(refreshed),
				Err(skip) => {
					info!("Skipping {}", skip);
					*report.skipped.entry(skip.reason).or_insert(0) += 1;
				}
			}
		}
		persistence
			.rebase_plan(&mut plan, now, remaining.clone())
			.await?;

		if remaining.is_empty() {
			info!("No tokens to migrate!");
			report.outcome = Outcome::NothingToMigrate;
			self.transition(MigrationState::Done);
			return Ok(report);
		}

		let already_applied = plan.applied;
		let progress = self
			.migrate(plan.new_registry, remaining, Some(plan), already_applied)
			.await?;

		report.outcome = Outcome::Migrated;
		report.prepared = already_applied + progress.units_applied;
		report.batches_confirmed = progress.batches_confirmed;
		report.units_applied = already_applied + progress.units_applied;

		self.transition(MigrationState::Done);
		info!("Migration completed successfully!");
		Ok(report)
	}

	/// Approve the new locker and replay `units` batch by batch.
	async fn migrate(
		&mut self,
		new_registry: Address,
		units: Vec<MigrationUnit>,
		mut plan: Option<MigrationPlan>,
		already_applied: usize,
	) -> Result<WriteProgress, MigrationError> {
		let registry = self.collaborators.contracts.new_registry(new_registry);

		let token_address = registry
			.underlying_token_address()
			.await
			.map_err(MigrationError::Approval)?;
		if token_address != self.settings.token {
			warn!(
				"New locker pulls {:?} but {:?} was configured as the token",
				token_address, self.settings.token
			);
		}
		let token = self.collaborators.contracts.underlying_token(token_address);
		token
			.approve(new_registry)
			.await
			.map_err(MigrationError::Approval)?;
		info!("Approved {:?} to pull {:?}", new_registry, token_address);

		let batches = batch(units, self.settings.batch_size);
		let total = batches.len();
		let writer = BatchWriter::new(registry);
		let mut progress = WriteProgress {
			batches_confirmed: 0,
			units_applied: 0,
		};

		for current in &batches {
			self.transition(MigrationState::Migrating {
				batch: current.index,
				total,
			});
			info!(
				"Processing batch {} of {} ({} positions)",
				current.index + 1,
				total,
				current.len()
			);

			let confirmation = writer.write(current).await.map_err(|error| {
				error!(
					"Batch {} of {} failed; {} units are on chain, later batches were not sent",
					current.index + 1,
					total,
					already_applied + progress.units_applied
				);
				MigrationError::WriteFailed {
					batch: current.index,
					total,
					applied: already_applied + progress.units_applied,
					error,
				}
			})?;

			progress.batches_confirmed += 1;
			progress.units_applied += current.len();
			info!(
				"Batch {} of {} confirmed in {:?} (block {:?}, gas {:?})",
				current.index + 1,
				total,
				confirmation.tx_hash,
				confirmation.block_number,
				confirmation.gas_used
			);

			if let (Some(persistence), Some(plan)) = (&self.persistence, plan.as_mut()) {
				persistence
					.record_applied(plan, current.len())
					.await
					.inspect_err(|_| {
						error!(
							"Batch {} is on chain but the checkpoint was not updated; fix the cursor before resuming",
							current.index + 1
						)
					})?;
			}
		}

		Ok(progress)
	}
}
