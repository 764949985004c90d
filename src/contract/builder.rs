//! Contract call builder
//!
//! This module provides a builder pattern for constructing contract calls and contract
//! creations before they are handed to the node.

use crate::contract::abi::{Signature, Token};
use crate::rpc::Address;

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Serialize)]
pub enum TransactionError {
	#[error("Transaction validation error: {0}")]
	ValidationError(String),
}

/// A fully encoded call, ready for `eth_call` or `eth_sendTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
	/// Target contract; `None` creates a new contract.
	pub to: Option<Address>,
	/// Calldata (selector + arguments) or init code (bytecode + constructor arguments).
	pub data: Vec<u8>,
	/// Human-readable description for logs, e.g. `setLocker(address)`.
	pub description: String,
}

/// Builder for constructing contract calls
pub struct ContractCallBuilder {
	/// The contract being called
	to: Option<Address>,
	/// Function signature, e.g. `locked(uint256)`
	function: Option<String>,
	/// Creation bytecode, mutually exclusive with `to`/`function`
	bytecode: Option<Vec<u8>>,
	/// Arguments in declaration order
	args: Vec<Token>,
}

impl ContractCallBuilder {
	/// Creates a new call builder
	pub fn new() -> Self {
		Self {
			to: None,
			function: None,
			bytecode: None,
			args: Vec::new(),
		}
	}

	/// Sets the target contract
	pub fn to(mut self, address: Address) -> Self {
		self.to = Some(address);
		self
	}

	/// Sets the function signature
	pub fn function(mut self, signature: impl Into<String>) -> Self {
		self.function = Some(signature.into());
		self
	}

	/// Switches the builder to contract creation with the given bytecode
	pub fn deploy(mut self, bytecode: Vec<u8>) -> Self {
		self.bytecode = Some(bytecode);
		self
	}

	/// Appends one argument
	pub fn arg(mut self, token: Token) -> Self {
		self.args.push(token);
		self
	}

	/// Appends several arguments
	pub fn args(mut self, tokens: impl IntoIterator<Item = Token>) -> Self {
		self.args.extend(tokens);
		self
	}

	/// Builds the final call
	pub fn build(self) -> Result<ContractCall, TransactionError> {
		match (self.to, self.function, self.bytecode) {
			(None, None, Some(bytecode)) => {
				if bytecode.is_empty() {
					return Err(TransactionError::ValidationError(
						"Contract creation requires non-empty bytecode".to_string(),
					));
				}
				let mut data = bytecode;
				data.extend(web3::ethabi::encode(&self.args));
				log::debug!(
					"Built contract creation with {} constructor arguments ({} bytes)",
					self.args.len(),
					data.len()
				);
				Ok(ContractCall {
					to: None,
					data,
					description: "contract creation".to_string(),
				})
			}
			(Some(to), Some(function), None) => {
				let signature = Signature::parse(&function)
					.map_err(|e| TransactionError::ValidationError(e.to_string()))?;
				if !signature.accepts(&self.args) {
					return Err(TransactionError::ValidationError(format!(
						"{} called with {} incompatible arguments",
						signature,
						self.args.len()
					)));
				}

				let data = signature.encode_call(&self.args);
				log::debug!("Built call {} on {:?} ({} bytes)", signature, to, data.len());
				Ok(ContractCall {
					to: Some(to),
					data,
					description: signature.to_string(),
				})
			}
			(_, _, Some(_)) => Err(TransactionError::ValidationError(
				"Contract creation cannot target an address or function".to_string(),
			)),
			(None, _, None) => Err(TransactionError::ValidationError(
				"Call is missing a target address".to_string(),
			)),
			(Some(_), None, None) => Err(TransactionError::ValidationError(
				"Call is missing a function signature".to_string(),
			)),
		}
	}
}

impl Default for ContractCallBuilder {
	fn default() -> Self {
		Self::new()
	}
}
