//! Check-in targets and their call specifications.
//!
//! A target pairs a contract address with an explicit [`CallSpec`]. Call
//! specifications are resolved to calldata once, when the target is
//! constructed, so nothing is looked up or guessed at call time.

use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{keccak256, Address, Bytes};
use std::fmt;
use thiserror::Error;

/// Length of a function selector in bytes.
pub const SELECTOR_LEN: usize = 4;

/// Errors that can occur while resolving a call specification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallSpecError {
	#[error("Raw calldata must be at least {SELECTOR_LEN} bytes, got {0}")]
	PayloadTooShort(usize),
	#[error("Invalid function signature '{0}'")]
	InvalidSignature(String),
	#[error("Invalid parameter type '{ty}' in '{signature}': {message}")]
	InvalidType {
		signature: String,
		ty: String,
		message: String,
	},
	#[error("Function '{signature}' expects {expected} arguments, got {actual}")]
	ArgumentCount {
		signature: String,
		expected: usize,
		actual: usize,
	},
	#[error("Invalid argument #{index} for '{signature}': {message}")]
	InvalidArgument {
		signature: String,
		index: usize,
		message: String,
	},
}

/// What to call on a target contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallSpec {
	/// Pre-encoded calldata, either a bare selector or a full payload.
	Raw(Bytes),
	/// A Solidity function signature such as `checkIn()` or `claim(uint256)`
	/// with its arguments in string form.
	Function { signature: String, args: Vec<String> },
}

impl CallSpec {
	/// Encodes this call specification into calldata.
	pub fn encode(&self) -> Result<Bytes, CallSpecError> {
		match self {
			CallSpec::Raw(data) => {
				if data.len() < SELECTOR_LEN {
					return Err(CallSpecError::PayloadTooShort(data.len()));
				}
				Ok(data.clone())
			}
			CallSpec::Function { signature, args } => encode_function_call(signature, args),
		}
	}
}

impl fmt::Display for CallSpec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CallSpec::Raw(data) if data.len() <= SELECTOR_LEN => write!(f, "{}", data),
			CallSpec::Raw(data) => write!(f, "{}..", Bytes::copy_from_slice(&data[..SELECTOR_LEN])),
			CallSpec::Function { signature, .. } => write!(f, "{}", signature),
		}
	}
}

/// Splits `name(type,type)` into its name and the canonical parameter types.
fn parse_signature(signature: &str) -> Result<(String, Vec<DynSolType>), CallSpecError> {
	let invalid = || CallSpecError::InvalidSignature(signature.to_string());

	let trimmed = signature.trim();
	let open = trimmed.find('(').ok_or_else(invalid)?;
	let inner = trimmed
		.strip_suffix(')')
		.map(|s| &s[open + 1..])
		.ok_or_else(invalid)?;
	let name = &trimmed[..open];

	let valid_name = name
		.chars()
		.next()
		.is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
		&& name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
	if !valid_name {
		return Err(invalid());
	}

	let mut types = Vec::new();
	for raw in split_top_level(inner) {
		let raw = raw.trim();
		if raw.is_empty() {
			return Err(invalid());
		}
		let ty = DynSolType::parse(raw).map_err(|e| CallSpecError::InvalidType {
			signature: signature.to_string(),
			ty: raw.to_string(),
			message: e.to_string(),
		})?;
		types.push(ty);
	}

	Ok((name.to_string(), types))
}

/// Splits a parameter list on commas that are not nested in tuples.
fn split_top_level(params: &str) -> Vec<&str> {
	if params.trim().is_empty() {
		return Vec::new();
	}

	let mut parts = Vec::new();
	let mut depth = 0usize;
	let mut start = 0;
	for (i, c) in params.char_indices() {
		match c {
			'(' => depth += 1,
			')' => depth = depth.saturating_sub(1),
			',' if depth == 0 => {
				parts.push(&params[start..i]);
				start = i + 1;
			}
			_ => {}
		}
	}
	parts.push(&params[start..]);
	parts
}

fn encode_function_call(signature: &str, args: &[String]) -> Result<Bytes, CallSpecError> {
	let (name, types) = parse_signature(signature)?;

	if types.len() != args.len() {
		return Err(CallSpecError::ArgumentCount {
			signature: signature.to_string(),
			expected: types.len(),
			actual: args.len(),
		});
	}

	let canonical = format!(
		"{}({})",
		name,
		types
			.iter()
			.map(|ty| ty.sol_type_name().into_owned())
			.collect::<Vec<_>>()
			.join(",")
	);
	let selector = keccak256(canonical.as_bytes());

	let mut values = Vec::with_capacity(args.len());
	for (index, (ty, arg)) in types.iter().zip(args).enumerate() {
		let value = ty
			.coerce_str(arg)
			.map_err(|e| CallSpecError::InvalidArgument {
				signature: signature.to_string(),
				index,
				message: e.to_string(),
			})?;
		values.push(value);
	}

	let mut calldata = selector[..SELECTOR_LEN].to_vec();
	calldata.extend_from_slice(&DynSolValue::Tuple(values).abi_encode_params());
	Ok(calldata.into())
}

/// One candidate check-in action: a contract and the call to make on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
	/// Label used in logs and in the final outcome.
	pub name: String,
	/// Contract address the call is sent to.
	pub address: Address,
	/// The call as configured.
	pub call: CallSpec,
	/// Calldata resolved from `call`.
	pub calldata: Bytes,
}

impl Target {
	/// Creates a target, resolving its calldata eagerly.
	pub fn new(
		name: impl Into<String>,
		address: Address,
		call: CallSpec,
	) -> Result<Self, CallSpecError> {
		let calldata = call.encode()?;
		Ok(Self {
			name: name.into(),
			address,
			call,
			calldata,
		})
	}
}

impl fmt::Display for Target {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} ({})", self.name, self.address)
	}
}
