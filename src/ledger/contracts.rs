//!
//! JSON-RPC clients for the locker, staking and token contracts.
//!
//! Each client owns the address it talks to and shares one `Sender`, so every write in a run
//! goes out from the same identity, one at a time.

use super::{
	Clock, ContractFactory, LedgerError, LegacyRegistry, LockRecord, NewRegistry,
	StakingContract, UnderlyingToken,
};
use crate::contract::abi::{self, AbiError, ParamType, Token};
use crate::contract::builder::ContractCallBuilder;
use crate::contract::sender::Sender;
use crate::rpc::{Address, EthRpcClient, TxReceipt, U256};

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Legacy locker registry (`LockerToken`, an ERC-721 of locks)
pub struct RpcLegacyRegistry {
	address: Address,
	sender: Arc<Sender>,
}

impl RpcLegacyRegistry {
	pub fn new(address: Address, sender: Arc<Sender>) -> Self {
		Self { address, sender }
	}
}

#[async_trait]
impl LegacyRegistry for RpcLegacyRegistry {
	async fn get_lock(&self, entity_id: u64) -> Result<LockRecord, LedgerError> {
		let call = ContractCallBuilder::new()
			.to(self.address)
			.function("locked(uint256)")
			.arg(Token::Uint(entity_id.into()))
			.build()?;
		let data = self.sender.call(&call).await?;

		// LockedBalance { int128 amount, uint256 end, ... }
		let words = abi::decode(&[ParamType::Uint(256), ParamType::Uint(256)], &data)?;
		let amount = abi::uint_at(&words, 0)?;
		if amount.bit(255) {
			return Err(AbiError::InvalidValue {
				index: 0,
				kind: "non-negative int128",
			}
			.into());
		}
		let lock_end = abi::u64_at(&words, 1)?;
		debug!(
			"locked({}) = amount {}, end {}",
			entity_id, amount, lock_end
		);

		Ok(LockRecord {
			entity_id,
			amount,
			lock_end,
		})
	}

	async fn get_holder(&self, entity_id: u64) -> Result<Address, LedgerError> {
		let call = ContractCallBuilder::new()
			.to(self.address)
			.function("ownerOf(uint256)")
			.arg(Token::Uint(entity_id.into()))
			.build()?;
		let data = self.sender.call(&call).await?;
		let words = abi::decode(&[ParamType::Address], &data)?;
		Ok(abi::address_at(&words, 0)?)
	}
}

/// Omnichain staking contract
pub struct RpcStakingContract {
	address: Address,
	sender: Arc<Sender>,
}

impl RpcStakingContract {
	pub fn new(address: Address, sender: Arc<Sender>) -> Self {
		Self { address, sender }
	}
}

#[async_trait]
impl StakingContract for RpcStakingContract {
	fn address(&self) -> Address {
		self.address
	}

	async fn get_beneficiary(&self, entity_id: u64) -> Result<Address, LedgerError> {
		let call = ContractCallBuilder::new()
			.to(self.address)
			.function("lockedByToken(uint256)")
			.arg(Token::Uint(entity_id.into()))
			.build()?;
		let data = self.sender.call(&call).await?;
		let words = abi::decode(&[ParamType::Address], &data)?;
		Ok(abi::address_at(&words, 0)?)
	}

	async fn set_locker_pointer(&self, locker: Address) -> Result<TxReceipt, LedgerError> {
		let call = ContractCallBuilder::new()
			.to(self.address)
			.function("setLocker(address)")
			.arg(Token::Address(locker))
			.build()?;
		Ok(self.sender.send(&call).await?)
	}
}

/// New locker registry
pub struct RpcNewRegistry {
	address: Address,
	sender: Arc<Sender>,
}

#[async_trait]
impl NewRegistry for RpcNewRegistry {
	fn address(&self) -> Address {
		self.address
	}

	async fn underlying_token_address(&self) -> Result<Address, LedgerError> {
		let call = ContractCallBuilder::new()
			.to(self.address)
			.function("underlying()")
			.build()?;
		let data = self.sender.call(&call).await?;
		let words = abi::decode(&[ParamType::Address], &data)?;
		Ok(abi::address_at(&words, 0)?)
	}

	async fn bulk_import(
		&self,
		amounts: &[U256],
		durations: &[u64],
		owners: &[Address],
		stake_flags: &[bool],
	) -> Result<TxReceipt, LedgerError> {
		let call = ContractCallBuilder::new()
			.to(self.address)
			.function("migrateLocks(uint256[],uint256[],address[],bool[])")
			.args([
				Token::Array(amounts.iter().copied().map(Token::Uint).collect()),
				Token::Array(durations.iter().map(|d| Token::Uint((*d).into())).collect()),
				Token::Array(owners.iter().copied().map(Token::Address).collect()),
				Token::Array(stake_flags.iter().copied().map(Token::Bool).collect()),
			])
			.build()?;
		Ok(self.sender.send(&call).await?)
	}
}

/// ERC-20 token client
pub struct RpcUnderlyingToken {
	address: Address,
	sender: Arc<Sender>,
}

#[async_trait]
impl UnderlyingToken for RpcUnderlyingToken {
	async fn approve(&self, spender: Address) -> Result<TxReceipt, LedgerError> {
		let call = ContractCallBuilder::new()
			.to(self.address)
			.function("approve(address,uint256)")
			.args([Token::Address(spender), Token::Uint(U256::MAX)])
			.build()?;
		Ok(self.sender.send(&call).await?)
	}
}

/// Creates RPC clients for addresses discovered during the run
pub struct RpcContractFactory {
	sender: Arc<Sender>,
}

impl RpcContractFactory {
	pub fn new(sender: Arc<Sender>) -> Self {
		Self { sender }
	}
}

impl ContractFactory for RpcContractFactory {
	fn new_registry(&self, address: Address) -> Arc<dyn NewRegistry> {
		Arc::new(RpcNewRegistry {
			address,
			sender: self.sender.clone(),
		})
	}

	fn underlying_token(&self, address: Address) -> Arc<dyn UnderlyingToken> {
		Arc::new(RpcUnderlyingToken {
			address,
			sender: self.sender.clone(),
		})
	}
}

/// Reads the latest block's timestamp
pub struct RpcClock {
	client: Arc<EthRpcClient>,
}

impl RpcClock {
	pub fn new(client: Arc<EthRpcClient>) -> Self {
		Self { client }
	}
}

#[async_trait]
impl Clock for RpcClock {
	async fn snapshot_time(&self) -> Result<u64, LedgerError> {
		let block = self.client.latest_block().await?;
		debug!("Snapshot at block {}: {}", block.number, block.timestamp);
		Ok(block.timestamp)
	}
}
