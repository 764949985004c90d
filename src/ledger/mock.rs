//! In-memory chain used by tests.
//!
//! One `FakeChain` plays every collaborator: legacy registry, staking contract, new registry,
//! token, clock, deployer and upgrader. Calls are recorded in order so tests can assert what
//! was issued and in which sequence.

use super::{
	Clock, ContractFactory, DeployedContract, DeploymentService, LedgerError,
	LegacyRegistry, LockRecord, NewRegistry, StakingContract, UnderlyingToken, UpgradeService,
};
use crate::contract::abi::Token;
use crate::migration::filter::filter;
use crate::migration::types::{MigrationUnit, Owner, ReconciledPosition};
use crate::rpc::{Address, H256, RpcError, TxReceipt, U64, U256};

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

/// Address whose last byte is `n`.
pub fn addr(n: u8) -> Address {
	Address::from_low_u64_be(n.into())
}

/// Error a node returns for a reverted call.
pub fn reverted(reason: &str) -> RpcError {
	RpcError::Node(web3::Error::Rpc(jsonrpc_core::Error {
		code: jsonrpc_core::ErrorCode::ServerError(3),
		message: format!("execution reverted: {}", reason),
		data: None,
	}))
}

pub const NOW: u64 = 1_000;

/// `n` valid units with distinct ids, alternating direct and custodied owners.
pub fn sample_units(n: usize) -> Vec<MigrationUnit> {
	(1..=n as u64)
		.map(|id| {
			let owner = if id % 2 == 0 {
				Owner::Custodied {
					beneficiary: addr((id % 200) as u8 + 1),
				}
			} else {
				Owner::Direct(addr((id % 200) as u8 + 1))
			};
			filter(
				ReconciledPosition {
					lock: LockRecord {
						entity_id: id,
						amount: U256::from(id * 10),
						lock_end: NOW + id,
					},
					owner,
				},
				NOW,
			)
			.expect("sample unit is valid")
		})
		.collect()
}

/// A recorded collaborator call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainCall {
	Snapshot,
	Deploy { name: String, label: String },
	Upgrade { proxy: Address, name: String },
	SetLocker(Address),
	Approve { token: Address, spender: Address },
	BulkImport { registry: Address, size: usize },
}

/// Arguments of one successful `bulk_import`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
	pub amounts: Vec<U256>,
	pub durations: Vec<u64>,
	pub owners: Vec<Address>,
	pub stake_flags: Vec<bool>,
	pub block: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
	Deploy,
	Upgrade,
	SetLocker,
	Approve,
}

struct FakeState {
	now: u64,
	block: u64,
	tx_count: u64,
	locks: BTreeMap<u64, (U256, u64)>,
	holders: HashMap<u64, Address>,
	beneficiaries: HashMap<u64, Address>,
	calls: Vec<ChainCall>,
	imports: Vec<ImportRecord>,
	failing: Vec<Step>,
	revert_import_at: Option<usize>,
	fail_import_at: Option<usize>,
	import_attempts: usize,
	locker_pointer: Option<Address>,
}

#[derive(Clone)]
pub struct FakeChain {
	state: Arc<Mutex<FakeState>>,
}

impl FakeChain {
	pub const STAKING: u8 = 0x5a;
	pub const TOKEN: u8 = 0x70;
	pub const NEW_REGISTRY: u8 = 0x99;

	pub fn new() -> Self {
		Self {
			state: Arc::new(Mutex::new(FakeState {
				now: NOW,
				block: 100,
				tx_count: 0,
				locks: BTreeMap::new(),
				holders: HashMap::new(),
				beneficiaries: HashMap::new(),
				calls: Vec::new(),
				imports: Vec::new(),
				failing: Vec::new(),
				revert_import_at: None,
				fail_import_at: None,
				import_attempts: 0,
				locker_pointer: None,
			})),
		}
	}

	pub fn staking_address(&self) -> Address {
		addr(Self::STAKING)
	}

	pub fn new_registry_address(&self) -> Address {
		addr(Self::NEW_REGISTRY)
	}

	pub fn add_lock(&self, id: u64, amount: impl Into<U256>, lock_end: u64, holder: Address) {
		let mut state = self.state.lock().unwrap();
		state.locks.insert(id, (amount.into(), lock_end));
		state.holders.insert(id, holder);
	}

	/// A lock whose `ownerOf` reverts.
	pub fn add_orphan_lock(&self, id: u64, amount: impl Into<U256>, lock_end: u64) {
		self.state
			.lock()
			.unwrap()
			.locks
			.insert(id, (amount.into(), lock_end));
	}

	pub fn set_beneficiary(&self, id: u64, beneficiary: Address) {
		self.state
			.lock()
			.unwrap()
			.beneficiaries
			.insert(id, beneficiary);
	}

	pub fn set_now(&self, now: u64) {
		self.state.lock().unwrap().now = now;
	}

	pub fn fail(&self, step: Step) {
		self.state.lock().unwrap().failing.push(step);
	}

	/// The `n`-th import (zero-based) is mined but reverts.
	pub fn revert_import_at(&self, n: usize) {
		self.state.lock().unwrap().revert_import_at = Some(n);
	}

	/// The `n`-th import (zero-based) never confirms.
	pub fn fail_import_at(&self, n: usize) {
		self.state.lock().unwrap().fail_import_at = Some(n);
	}

	pub fn calls(&self) -> Vec<ChainCall> {
		self.state.lock().unwrap().calls.clone()
	}

	pub fn imports(&self) -> Vec<ImportRecord> {
		self.state.lock().unwrap().imports.clone()
	}

	pub fn locker_pointer(&self) -> Option<Address> {
		self.state.lock().unwrap().locker_pointer
	}

	pub fn legacy(&self) -> Arc<dyn LegacyRegistry> {
		Arc::new(self.clone())
	}

	pub fn staking(&self) -> Arc<dyn StakingContract> {
		Arc::new(self.clone())
	}

	pub fn new_registry_client(&self) -> Arc<dyn NewRegistry> {
		self.new_registry(self.new_registry_address())
	}

	fn check(&self, step: Step) -> Result<(), LedgerError> {
		if self.state.lock().unwrap().failing.contains(&step) {
			return Err(reverted(&format!("{:?} rejected", step)).into());
		}
		Ok(())
	}

	fn mine(state: &mut FakeState, succeeded: bool) -> TxReceipt {
		state.block += 1;
		state.tx_count += 1;
		TxReceipt {
			transaction_hash: H256::from_low_u64_be(state.tx_count),
			block_number: Some(U64::from(state.block)),
			status: Some(U64::from(succeeded as u64)),
			gas_used: Some(U256::from(21_000)),
			..Default::default()
		}
	}

	fn record(&self, call: ChainCall) -> TxReceipt {
		let mut state = self.state.lock().unwrap();
		state.calls.push(call);
		Self::mine(&mut state, true)
	}
}

#[async_trait]
impl LegacyRegistry for FakeChain {
	async fn get_lock(&self, entity_id: u64) -> Result<LockRecord, LedgerError> {
		let state = self.state.lock().unwrap();
		let (amount, lock_end) = state.locks.get(&entity_id).copied().unwrap_or((U256::zero(), 0));
		Ok(LockRecord {
			entity_id,
			amount,
			lock_end,
		})
	}

	async fn get_holder(&self, entity_id: u64) -> Result<Address, LedgerError> {
		let state = self.state.lock().unwrap();
		state.holders.get(&entity_id).copied().ok_or_else(|| {
			reverted("ERC721NonexistentToken").into()
		})
	}
}

#[async_trait]
impl StakingContract for FakeChain {
	fn address(&self) -> Address {
		self.staking_address()
	}

	async fn get_beneficiary(&self, entity_id: u64) -> Result<Address, LedgerError> {
		let state = self.state.lock().unwrap();
		Ok(state
			.beneficiaries
			.get(&entity_id)
			.copied()
			.unwrap_or_default())
	}

	async fn set_locker_pointer(&self, locker: Address) -> Result<TxReceipt, LedgerError> {
		self.check(Step::SetLocker)?;
		self.state.lock().unwrap().locker_pointer = Some(locker);
		Ok(self.record(ChainCall::SetLocker(locker)))
	}
}

struct FakeRegistry {
	chain: FakeChain,
	address: Address,
}

#[async_trait]
impl NewRegistry for FakeRegistry {
	fn address(&self) -> Address {
		self.address
	}

	async fn underlying_token_address(&self) -> Result<Address, LedgerError> {
		Ok(addr(FakeChain::TOKEN))
	}

	async fn bulk_import(
		&self,
		amounts: &[U256],
		durations: &[u64],
		owners: &[Address],
		stake_flags: &[bool],
	) -> Result<TxReceipt, LedgerError> {
		assert_eq!(amounts.len(), durations.len());
		assert_eq!(amounts.len(), owners.len());
		assert_eq!(amounts.len(), stake_flags.len());

		let mut state = self.chain.state.lock().unwrap();
		let attempt = state.import_attempts;
		state.import_attempts += 1;
		state.calls.push(ChainCall::BulkImport {
			registry: self.address,
			size: amounts.len(),
		});

		if state.fail_import_at == Some(attempt) {
			return Err(RpcError::Timeout("not confirmed".to_string()).into());
		}

		let succeeded = state.revert_import_at != Some(attempt);
		let receipt = FakeChain::mine(&mut state, succeeded);
		if succeeded {
			let block = state.block;
			state.imports.push(ImportRecord {
				amounts: amounts.to_vec(),
				durations: durations.to_vec(),
				owners: owners.to_vec(),
				stake_flags: stake_flags.to_vec(),
				block,
			});
		}
		Ok(receipt)
	}
}

struct FakeToken {
	chain: FakeChain,
	address: Address,
}

#[async_trait]
impl UnderlyingToken for FakeToken {
	async fn approve(&self, spender: Address) -> Result<TxReceipt, LedgerError> {
		self.chain.check(Step::Approve)?;
		Ok(self.chain.record(ChainCall::Approve {
			token: self.address,
			spender,
		}))
	}
}

impl ContractFactory for FakeChain {
	fn new_registry(&self, address: Address) -> Arc<dyn NewRegistry> {
		Arc::new(FakeRegistry {
			chain: self.clone(),
			address,
		})
	}

	fn underlying_token(&self, address: Address) -> Arc<dyn UnderlyingToken> {
		Arc::new(FakeToken {
			chain: self.clone(),
			address,
		})
	}
}

#[async_trait]
impl Clock for FakeChain {
	async fn snapshot_time(&self) -> Result<u64, LedgerError> {
		let mut state = self.state.lock().unwrap();
		state.calls.push(ChainCall::Snapshot);
		Ok(state.now)
	}
}

#[async_trait]
impl DeploymentService for FakeChain {
	async fn deploy_upgradable_contract(
		&self,
		implementation_name: &str,
		_constructor_args: &[Token],
		_proxy_admin: Address,
		label: &str,
		_deployer: Address,
	) -> Result<DeployedContract, LedgerError> {
		self.check(Step::Deploy)?;
		self.record(ChainCall::Deploy {
			name: implementation_name.to_string(),
			label: label.to_string(),
		});
		Ok(DeployedContract {
			address: self.new_registry_address(),
			implementation: addr(0x98),
		})
	}
}

#[async_trait]
impl UpgradeService for FakeChain {
	async fn upgrade_upgradable_contract(
		&self,
		proxy: Address,
		new_implementation_name: &str,
		_proxy_admin: Address,
		_deployer: Address,
	) -> Result<TxReceipt, LedgerError> {
		self.check(Step::Upgrade)?;
		Ok(self.record(ChainCall::Upgrade {
			proxy,
			name: new_implementation_name.to_string(),
		}))
	}
}
