//! Ledger collaborators for the migration
//!
//! Every contract the migration touches is reached through one of the traits below. The
//! pipeline only ever sees the traits; `contracts` and `deploy` provide the JSON-RPC
//! implementations used by the binary.

/// JSON-RPC backed contract clients
mod contracts;
/// Proxy deployment and upgrade through compiled artifacts
mod deploy;
/// Shared ledger types
mod types;

#[cfg(test)]
pub mod mock;

pub use contracts::{RpcClock, RpcContractFactory, RpcLegacyRegistry, RpcStakingContract};
pub use deploy::ArtifactDeployer;
pub use types::*;

use crate::contract::abi::Token;
use crate::rpc::{Address, TxReceipt, U256};

use async_trait::async_trait;
use std::sync::Arc;

/// Read access to the legacy locker registry
#[async_trait]
pub trait LegacyRegistry: Send + Sync {
	/// Lock amount and end for `entity_id`. Unknown ids read as a zero amount.
	async fn get_lock(&self, entity_id: u64) -> Result<LockRecord, LedgerError>;

	/// Current holder of `entity_id`. Fails if the id was never minted or was burned.
	async fn get_holder(&self, entity_id: u64) -> Result<Address, LedgerError>;
}

/// The staking contract that custodies positions on behalf of beneficiaries
#[async_trait]
pub trait StakingContract: Send + Sync {
	fn address(&self) -> Address;

	/// Real owner of a position the staking contract holds in custody.
	async fn get_beneficiary(&self, entity_id: u64) -> Result<Address, LedgerError>;

	/// Point staking at a new locker registry.
	async fn set_locker_pointer(&self, locker: Address) -> Result<TxReceipt, LedgerError>;
}

/// Write access to the new locker registry
#[async_trait]
pub trait NewRegistry: Send + Sync {
	fn address(&self) -> Address;

	/// Token the registry pulls when importing positions.
	async fn underlying_token_address(&self) -> Result<Address, LedgerError>;

	/// Import many positions in one transaction. The four slices are aligned by index.
	async fn bulk_import(
		&self,
		amounts: &[U256],
		durations: &[u64],
		owners: &[Address],
		stake_flags: &[bool],
	) -> Result<TxReceipt, LedgerError>;
}

/// The ERC-20 token locked in both registries
#[async_trait]
pub trait UnderlyingToken: Send + Sync {
	/// Grant `spender` an allowance of `type(uint256).max`, which the token never decrements.
	async fn approve(&self, spender: Address) -> Result<TxReceipt, LedgerError>;
}

/// Binds contract clients to addresses only known at run time
pub trait ContractFactory: Send + Sync {
	fn new_registry(&self, address: Address) -> Arc<dyn NewRegistry>;

	fn underlying_token(&self, address: Address) -> Arc<dyn UnderlyingToken>;
}

/// Source of the run's single time snapshot
#[async_trait]
pub trait Clock: Send + Sync {
	/// Timestamp of the latest block.
	async fn snapshot_time(&self) -> Result<u64, LedgerError>;
}

/// Deploys upgradeable contracts behind a proxy
#[async_trait]
pub trait DeploymentService: Send + Sync {
	async fn deploy_upgradable_contract(
		&self,
		implementation_name: &str,
		constructor_args: &[Token],
		proxy_admin: Address,
		label: &str,
		deployer: Address,
	) -> Result<DeployedContract, LedgerError>;
}

/// Upgrades the implementation behind an existing proxy
#[async_trait]
pub trait UpgradeService: Send + Sync {
	async fn upgrade_upgradable_contract(
		&self,
		proxy: Address,
		new_implementation_name: &str,
		proxy_admin: Address,
		deployer: Address,
	) -> Result<TxReceipt, LedgerError>;
}
