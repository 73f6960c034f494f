//! Target list deserialization.
//!
//! Each `[[targets]]` entry names a contract and exactly one call: either raw
//! `calldata` or a `function` signature with `args`. Optional `alternates`
//! describe further calls on the same contract; each one is expanded into its
//! own target directly after its primary, in listed order.

use checkin_types::{Address, Bytes, CallSpec, Target};
use serde::{Deserialize, Deserializer};
use std::str::FromStr;

/// One call description as written in the configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallEntry {
	/// Hex-encoded calldata or bare selector.
	#[serde(default)]
	pub calldata: Option<String>,
	/// Solidity function signature, e.g. `checkIn()`.
	#[serde(default)]
	pub function: Option<String>,
	/// Arguments for `function`, in string form.
	#[serde(default)]
	pub args: Vec<String>,
}

impl CallEntry {
	fn into_call_spec(self, target: &str) -> Result<CallSpec, String> {
		match (self.calldata, self.function) {
			(Some(calldata), None) => {
				if !self.args.is_empty() {
					return Err(format!(
						"Target '{}': args are only allowed with 'function'",
						target
					));
				}
				let data = Bytes::from_str(calldata.trim())
					.map_err(|e| format!("Target '{}': invalid calldata: {}", target, e))?;
				Ok(CallSpec::Raw(data))
			}
			(None, Some(signature)) => Ok(CallSpec::Function {
				signature,
				args: self.args,
			}),
			(Some(_), Some(_)) => Err(format!(
				"Target '{}' must set either 'calldata' or 'function', not both",
				target
			)),
			(None, None) => Err(format!(
				"Target '{}' must set 'calldata' or 'function'",
				target
			)),
		}
	}
}

/// One `[[targets]]` entry as written in the configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetEntry {
	pub name: String,
	pub address: Address,
	#[serde(flatten)]
	pub call: CallEntry,
	#[serde(default)]
	pub alternates: Vec<CallEntry>,
}

impl TargetEntry {
	/// Expands this entry into its primary target followed by its alternates.
	fn into_targets(self) -> Result<Vec<Target>, String> {
		let name = self.name.trim().to_string();
		if name.is_empty() {
			return Err("Target name cannot be empty".to_string());
		}

		let mut targets = Vec::with_capacity(1 + self.alternates.len());
		let calls = std::iter::once((name.clone(), self.call)).chain(
			self.alternates
				.into_iter()
				.enumerate()
				.map(|(i, call)| (format!("{}.alt{}", name, i + 1), call)),
		);

		for (target_name, call) in calls {
			let spec = call.into_call_spec(&target_name)?;
			let target = Target::new(target_name.clone(), self.address, spec)
				.map_err(|e| format!("Target '{}': {}", target_name, e))?;
			targets.push(target);
		}

		Ok(targets)
	}
}

/// Deserializes the ordered target list, resolving every call to calldata.
pub(crate) fn deserialize_targets<'de, D>(deserializer: D) -> Result<Vec<Target>, D::Error>
where
	D: Deserializer<'de>,
{
	let entries: Vec<TargetEntry> = Vec::deserialize(deserializer)?;
	let mut targets = Vec::new();

	for entry in entries {
		let expanded = entry.into_targets().map_err(serde::de::Error::custom)?;
		targets.extend(expanded);
	}

	Ok(targets)
}
