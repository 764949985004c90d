//! Command-line configuration.
//!
//! Every option can also be supplied through a `MIGRATE_*` environment variable.

use crate::contract::sender::ConfirmationPolicy;
use crate::migration::{MigrationSettings, batcher::DEFAULT_BATCH_SIZE};
use crate::rpc::Address;

use clap::Parser;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

/// Migrate live locks from the legacy locker into a freshly deployed one.
#[derive(Parser, Debug, Clone)]
#[command(name = "locker-migration", version)]
pub struct Config {
	/// HTTP JSON-RPC endpoint of the node
	#[arg(long, env = "MIGRATE_RPC_URL")]
	pub rpc_url: String,

	/// Legacy locker the positions are read from
	#[arg(long, env = "MIGRATE_OLD_LOCKER")]
	pub old_locker: Address,

	/// Staking contract (proxy) that custodies staked positions
	#[arg(long, env = "MIGRATE_STAKING")]
	pub staking: Address,

	/// Token locked in both lockers
	#[arg(long, env = "MIGRATE_TOKEN")]
	pub token: Address,

	/// ProxyAdmin owning the staking and new locker proxies
	#[arg(long, env = "MIGRATE_PROXY_ADMIN")]
	pub proxy_admin: Address,

	/// Node-managed account that signs every transaction
	#[arg(long, env = "MIGRATE_DEPLOYER")]
	pub deployer: Address,

	/// Highest legacy token id; ids 1 through this value are scanned
	#[arg(long, env = "MIGRATE_TOTAL_ENTITIES")]
	pub total_entities: u64,

	/// Positions per migrateLocks transaction
	#[arg(long, env = "MIGRATE_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
	pub batch_size: NonZeroUsize,

	/// Directory holding compiled contract artifacts (<Name>.json)
	#[arg(long, env = "MIGRATE_ARTIFACTS_DIR", default_value = "artifacts")]
	pub artifacts_dir: PathBuf,

	/// Blocks mined on top of a transaction's block before it counts as confirmed (at least 1)
	#[arg(long, env = "MIGRATE_CONFIRMATIONS", default_value_t = 1)]
	pub confirmations: usize,

	/// Longest wait for one transaction to confirm
	#[arg(long, env = "MIGRATE_CONFIRMATION_TIMEOUT_SECS", default_value_t = 300)]
	pub confirmation_timeout_secs: u64,

	/// Total time a read may spend retrying transient failures
	#[arg(long, env = "MIGRATE_READ_RETRY_SECS", default_value_t = 30)]
	pub read_retry_secs: u64,

	/// Timeout of a single HTTP request to the node
	#[arg(long, env = "MIGRATE_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
	pub request_timeout_secs: u64,

	/// Use an already deployed new locker instead of deploying one
	#[arg(long, env = "MIGRATE_NEW_LOCKER")]
	pub new_locker: Option<Address>,

	/// Do not upgrade the staking contract
	#[arg(long, env = "MIGRATE_SKIP_UPGRADE")]
	pub skip_upgrade: bool,

	/// Scan and report only; send no transactions
	#[arg(long, env = "MIGRATE_DRY_RUN")]
	pub dry_run: bool,

	/// Directory for the resumable migration checkpoint
	#[arg(long, env = "MIGRATE_STATE_DIR")]
	pub state_dir: Option<PathBuf>,
}

impl Config {
	pub fn settings(&self) -> MigrationSettings {
		MigrationSettings {
			old_locker: self.old_locker,
			staking: self.staking,
			token: self.token,
			proxy_admin: self.proxy_admin,
			deployer: self.deployer,
			total_entities: self.total_entities,
			batch_size: self.batch_size,
			new_locker: self.new_locker,
			skip_upgrade: self.skip_upgrade,
			dry_run: self.dry_run,
		}
	}

	pub fn confirmation_policy(&self) -> ConfirmationPolicy {
		ConfirmationPolicy {
			confirmations: self.confirmations.max(1),
			timeout: Duration::from_secs(self.confirmation_timeout_secs),
			..ConfirmationPolicy::default()
		}
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs)
	}

	pub fn read_retry_window(&self) -> Duration {
		Duration::from_secs(self.read_retry_secs)
	}
}
