//! Function signatures and return-value decoding on top of `ethabi`.
//!
//! Calls are described by their Solidity signature, e.g. `migrateLocks(uint256[],uint256[],address[],bool[])`.
//! The signature yields the selector and the parameter types arguments are checked against.

use crate::rpc::{Address, U256};

use std::fmt;
use thiserror::Error;
use web3::ethabi::{self, param_type::Reader, short_signature};

pub use web3::ethabi::{ParamType, Token};

#[derive(Error, Debug)]
pub enum AbiError {
	#[error("malformed function signature: {0}")]
	Signature(String),

	#[error("cannot infer the ABI type of argument {0}")]
	UntypedArgument(usize),

	#[error(transparent)]
	Codec(#[from] ethabi::Error),

	#[error("return value {index} is not a {kind}")]
	InvalidValue { index: usize, kind: &'static str },

	#[error("return value {index} does not fit in {target}")]
	Overflow { index: usize, target: &'static str },
}

/// A parsed function signature
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
	pub name: String,
	pub params: Vec<ParamType>,
}

impl Signature {
	/// Parses `name(type,...)`.
	pub fn parse(signature: &str) -> Result<Self, AbiError> {
		let malformed = || AbiError::Signature(signature.to_string());
		let (name, rest) = signature.split_once('(').ok_or_else(malformed)?;
		let inner = rest.strip_suffix(')').ok_or_else(malformed)?;
		if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
			return Err(malformed());
		}

		let params = split_params(inner)
			.into_iter()
			.map(|param| Reader::read(param.trim()).map_err(|_| malformed()))
			.collect::<Result<Vec<_>, _>>()?;

		Ok(Self {
			name: name.to_string(),
			params,
		})
	}

	/// Signature of `name` called with `args`, with types inferred from the values.
	pub fn infer(name: &str, args: &[Token]) -> Result<Self, AbiError> {
		let params = args
			.iter()
			.enumerate()
			.map(|(i, token)| param_type(token).ok_or(AbiError::UntypedArgument(i)))
			.collect::<Result<Vec<_>, _>>()?;
		Ok(Self {
			name: name.to_string(),
			params,
		})
	}

	pub fn selector(&self) -> [u8; 4] {
		short_signature(&self.name, &self.params)
	}

	/// Whether `args` match the declared parameters one for one.
	pub fn accepts(&self, args: &[Token]) -> bool {
		self.params.len() == args.len()
			&& args
				.iter()
				.zip(&self.params)
				.all(|(token, param)| token.type_check(param))
	}

	/// Selector followed by the encoded arguments.
	pub fn encode_call(&self, args: &[Token]) -> Vec<u8> {
		let mut data = self.selector().to_vec();
		data.extend(ethabi::encode(args));
		data
	}
}

impl fmt::Display for Signature {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let params: Vec<String> = self.params.iter().map(ToString::to_string).collect();
		write!(f, "{}({})", self.name, params.join(","))
	}
}

/// Splits a parameter list on top-level commas, leaving tuple members intact.
fn split_params(inner: &str) -> Vec<&str> {
	if inner.trim().is_empty() {
		return Vec::new();
	}

	let mut parts = Vec::new();
	let mut depth = 0usize;
	let mut start = 0;
	for (i, c) in inner.char_indices() {
		match c {
			'(' => depth += 1,
			')' => depth = depth.saturating_sub(1),
			',' if depth == 0 => {
				parts.push(&inner[start..i]);
				start = i + 1;
			}
			_ => {}
		}
	}
	parts.push(&inner[start..]);
	parts
}

/// ABI type of a value; `None` for empty arrays, whose element type is unknown.
fn param_type(token: &Token) -> Option<ParamType> {
	Some(match token {
		Token::Address(_) => ParamType::Address,
		Token::Uint(_) => ParamType::Uint(256),
		Token::Int(_) => ParamType::Int(256),
		Token::Bool(_) => ParamType::Bool,
		Token::Bytes(_) => ParamType::Bytes,
		Token::String(_) => ParamType::String,
		Token::FixedBytes(bytes) => ParamType::FixedBytes(bytes.len()),
		Token::Array(items) => ParamType::Array(Box::new(param_type(items.first()?)?)),
		Token::FixedArray(items) => {
			ParamType::FixedArray(Box::new(param_type(items.first()?)?), items.len())
		}
		Token::Tuple(items) => {
			ParamType::Tuple(items.iter().map(param_type).collect::<Option<Vec<_>>>()?)
		}
	})
}

/// Decodes return data into tokens of the given types.
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, AbiError> {
	Ok(ethabi::decode(types, data)?)
}

pub fn uint_at(tokens: &[Token], index: usize) -> Result<U256, AbiError> {
	match tokens.get(index) {
		Some(Token::Uint(value)) => Ok(*value),
		_ => Err(AbiError::InvalidValue {
			index,
			kind: "uint256",
		}),
	}
}

pub fn u64_at(tokens: &[Token], index: usize) -> Result<u64, AbiError> {
	let value = uint_at(tokens, index)?;
	if value > U256::from(u64::MAX) {
		return Err(AbiError::Overflow {
			index,
			target: "u64",
		});
	}
	Ok(value.as_u64())
}

pub fn address_at(tokens: &[Token], index: usize) -> Result<Address, AbiError> {
	match tokens.get(index) {
		Some(Token::Address(address)) => Ok(*address),
		_ => Err(AbiError::InvalidValue {
			index,
			kind: "address",
		}),
	}
}
