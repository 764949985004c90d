//!
//! Proxy deployment and upgrade from compiled artifacts.
//!
//! Implementations are deployed from Hardhat-style artifact files (`<Name>.json` with a
//! `bytecode` field and, optionally, the contract `abi`). A new contract is placed behind a
//! `TransparentUpgradeableProxy` that is initialised in its constructor; an upgrade deploys the
//! new implementation and points the existing proxy at it through the `ProxyAdmin`.

use super::{DeployedContract, DeploymentService, LedgerError, UpgradeService};
use crate::contract::abi::{AbiError, Signature, Token};
use crate::contract::builder::ContractCallBuilder;
use crate::contract::sender::Sender;
use crate::rpc::{Address, TxReceipt};

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use web3::ethabi::Contract;

const PROXY_ARTIFACT: &str = "TransparentUpgradeableProxy";

#[derive(Debug, Deserialize)]
struct Artifact {
	#[serde(rename = "contractName")]
	contract_name: Option<String>,
	#[serde(default)]
	abi: Option<Contract>,
	bytecode: String,
}

/// Creation bytecode and interface of one compiled contract
struct CompiledContract {
	bytecode: Vec<u8>,
	abi: Option<Contract>,
}

impl CompiledContract {
	/// Calldata of `initialize(args)` and the signature it was encoded against.
	///
	/// Uses the artifact's ABI when it declares `initialize`, otherwise infers the signature
	/// from the argument values.
	fn initializer(&self, args: &[Token]) -> Result<(String, Vec<u8>), LedgerError> {
		if let Some(function) = self.abi.as_ref().and_then(|abi| abi.function("initialize").ok()) {
			let data = function.encode_input(args).map_err(AbiError::from)?;
			return Ok((function.signature(), data));
		}

		let signature = Signature::infer("initialize", args)?;
		Ok((signature.to_string(), signature.encode_call(args)))
	}
}

/// Decode an artifact's creation bytecode and ABI.
fn parse_artifact(name: &str, contents: &str) -> Result<CompiledContract, LedgerError> {
	let artifact: Artifact = serde_json::from_str(contents)
		.map_err(|e| LedgerError::Artifact(format!("{}: {}", name, e)))?;

	if let Some(contract_name) = &artifact.contract_name {
		if contract_name != name {
			return Err(LedgerError::Artifact(format!(
				"artifact for {} declares contract {}",
				name, contract_name
			)));
		}
	}

	let encoded = artifact.bytecode.trim_start_matches("0x");
	let bytecode = hex::decode(encoded)
		.map_err(|e| LedgerError::Artifact(format!("{}: {}", name, e)))?;
	if bytecode.is_empty() {
		return Err(LedgerError::Artifact(format!(
			"{} has no creation bytecode (abstract contract or interface?)",
			name
		)));
	}
	Ok(CompiledContract {
		bytecode,
		abi: artifact.abi,
	})
}

/// Deploys and upgrades proxies using artifacts from a build directory
pub struct ArtifactDeployer {
	artifacts_dir: PathBuf,
	sender: Arc<Sender>,
}

impl ArtifactDeployer {
	pub fn new(artifacts_dir: PathBuf, sender: Arc<Sender>) -> Self {
		Self {
			artifacts_dir,
			sender,
		}
	}

	async fn load(&self, name: &str) -> Result<CompiledContract, LedgerError> {
		let path = self.artifacts_dir.join(format!("{}.json", name));
		let contents = tokio::fs::read_to_string(&path).await.map_err(|e| {
			LedgerError::Artifact(format!("failed to read {}: {}", path.display(), e))
		})?;
		parse_artifact(name, &contents)
	}

	async fn deploy_raw(
		&self,
		name: &str,
		bytecode: Vec<u8>,
		args: Vec<Token>,
		deployer: Address,
	) -> Result<Address, LedgerError> {
		let call = ContractCallBuilder::new().deploy(bytecode).args(args).build()?;
		let receipt = self.sender.send_from(deployer, &call).await?;

		receipt.contract_address.ok_or_else(|| {
			LedgerError::Deployment(format!(
				"receipt {:?} for {} has no contract address",
				receipt.transaction_hash, name
			))
		})
	}
}

#[async_trait]
impl DeploymentService for ArtifactDeployer {
	async fn deploy_upgradable_contract(
		&self,
		implementation_name: &str,
		constructor_args: &[Token],
		proxy_admin: Address,
		label: &str,
		deployer: Address,
	) -> Result<DeployedContract, LedgerError> {
		let compiled = self.load(implementation_name).await?;
		let (init_signature, init_data) = compiled.initializer(constructor_args)?;
		let implementation = self
			.deploy_raw(implementation_name, compiled.bytecode, Vec::new(), deployer)
			.await?;
		info!(
			"Deployed {} implementation at {:?}",
			implementation_name, implementation
		);

		let proxy_code = self.load(PROXY_ARTIFACT).await?;
		let proxy = self
			.deploy_raw(
				PROXY_ARTIFACT,
				proxy_code.bytecode,
				vec![
					Token::Address(implementation),
					Token::Address(proxy_admin),
					Token::Bytes(init_data),
				],
				deployer,
			)
			.await?;
		info!(
			"Deployed {} proxy at {:?} (admin {:?}, initialised with {})",
			label, proxy, proxy_admin, init_signature
		);

		Ok(DeployedContract {
			address: proxy,
			implementation,
		})
	}
}

#[async_trait]
impl UpgradeService for ArtifactDeployer {
	async fn upgrade_upgradable_contract(
		&self,
		proxy: Address,
		new_implementation_name: &str,
		proxy_admin: Address,
		deployer: Address,
	) -> Result<TxReceipt, LedgerError> {
		let compiled = self.load(new_implementation_name).await?;
		let implementation = self
			.deploy_raw(new_implementation_name, compiled.bytecode, Vec::new(), deployer)
			.await?;
		info!(
			"Deployed {} implementation at {:?}",
			new_implementation_name, implementation
		);

		let call = ContractCallBuilder::new()
			.to(proxy_admin)
			.function("upgradeAndCall(address,address,bytes)")
			.args([
				Token::Address(proxy),
				Token::Address(implementation),
				Token::Bytes(Vec::new()),
			])
			.build()?;
		let receipt = self.sender.send_from(deployer, &call).await?;
		info!(
			"Upgraded proxy {:?} to {} implementation {:?}",
			proxy, new_implementation_name, implementation
		);
		Ok(receipt)
	}
}
