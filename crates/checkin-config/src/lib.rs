//! Configuration module for the check-in system.
//!
//! This module provides the immutable configuration that drives a run. It is
//! loaded from TOML once at startup and handed to the engine by reference;
//! components never read the environment themselves.
//!
//! ## Environment variables
//!
//! Values can be drawn from the environment with `${VAR_NAME}` or
//! `${VAR_NAME:-default}` anywhere in the TOML text. Interpolation happens
//! before parsing, so secrets such as the private key never need to be
//! written to disk.

mod targets;

use checkin_types::{GasMultiplier, SecretString, Target};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for a check-in run.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	/// Identity and cosmetic settings of the run.
	pub checkin: CheckinConfig,
	/// RPC endpoint candidates and network timeouts.
	pub network: NetworkConfig,
	/// Signing credentials.
	#[serde(default)]
	pub account: AccountConfig,
	/// Transaction construction settings.
	#[serde(default)]
	pub submission: SubmissionConfig,
	/// Receipt polling settings.
	#[serde(default)]
	pub confirmation: ConfirmationConfig,
	/// Targets in priority order, with alternates already expanded.
	#[serde(deserialize_with = "targets::deserialize_targets")]
	pub targets: Vec<Target>,
}

/// Identity and cosmetic settings of the run.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckinConfig {
	/// Label for this check-in job, used in logs.
	pub id: String,
	/// Explorer prefix that transaction hashes are appended to in logs.
	#[serde(default)]
	pub explorer_url: Option<String>,
	/// Chain the run must execute on. Endpoints reporting a different
	/// chain are treated as unusable.
	#[serde(default)]
	pub chain_id: Option<u64>,
}

/// RPC endpoint candidates and network timeouts.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
	/// Endpoint candidates in fallback order. Empty entries are skipped, which
	/// allows an optional endpoint to come from an unset environment variable.
	pub rpc_urls: Vec<String>,
	/// Timeout applied to every individual RPC call.
	#[serde(default = "default_request_timeout_seconds")]
	pub request_timeout_seconds: u64,
	/// Timeout for the liveness check made against each endpoint candidate.
	#[serde(default = "default_connect_timeout_seconds")]
	pub connect_timeout_seconds: u64,
}

fn default_request_timeout_seconds() -> u64 {
	30
}

fn default_connect_timeout_seconds() -> u64 {
	10
}

impl NetworkConfig {
	/// Returns the non-empty endpoint candidates in configured order.
	pub fn usable_rpc_urls(&self) -> Vec<String> {
		self.rpc_urls
			.iter()
			.map(|url| url.trim())
			.filter(|url| !url.is_empty())
			.map(str::to_string)
			.collect()
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_seconds)
	}

	pub fn connect_timeout(&self) -> Duration {
		Duration::from_secs(self.connect_timeout_seconds)
	}
}

/// Signing credentials.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountConfig {
	/// Hex-encoded private key. A blank value counts as missing.
	#[serde(default, deserialize_with = "deserialize_optional_secret")]
	pub private_key: Option<SecretString>,
}

fn deserialize_optional_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
	D: Deserializer<'de>,
{
	let secret = Option::<SecretString>::deserialize(deserializer)?;
	Ok(secret.filter(|s| !s.is_blank()))
}

/// Transaction construction settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionConfig {
	/// Multiplier applied to the gas estimate; must be at least 1.0.
	#[serde(default, deserialize_with = "deserialize_gas_multiplier")]
	pub gas_multiplier: GasMultiplier,
}

fn deserialize_gas_multiplier<'de, D>(deserializer: D) -> Result<GasMultiplier, D::Error>
where
	D: Deserializer<'de>,
{
	let value = f64::deserialize(deserializer)?;
	GasMultiplier::new(value).map_err(serde::de::Error::custom)
}

/// Receipt polling settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmationConfig {
	/// Maximum time to wait for a receipt after broadcast.
	#[serde(default = "default_confirmation_timeout_seconds")]
	pub timeout_seconds: u64,
	/// Fixed wait between receipt queries.
	#[serde(default = "default_poll_interval_seconds")]
	pub poll_interval_seconds: u64,
}

fn default_confirmation_timeout_seconds() -> u64 {
	300
}

fn default_poll_interval_seconds() -> u64 {
	5
}

impl Default for ConfirmationConfig {
	fn default() -> Self {
		Self {
			timeout_seconds: default_confirmation_timeout_seconds(),
			poll_interval_seconds: default_poll_interval_seconds(),
		}
	}
}

impl ConfirmationConfig {
	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_seconds)
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_secs(self.poll_interval_seconds)
	}
}

/// Largest configuration text accepted for interpolation.
const MAX_CONFIG_BYTES: usize = 1024 * 1024;

/// Expands `${NAME}` and `${NAME:-fallback}` placeholders from the process
/// environment.
///
/// A set variable always wins over its fallback, even when empty. Every
/// placeholder without a value or fallback is collected, so a single error
/// names all of them.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	if input.len() > MAX_CONFIG_BYTES {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_CONFIG_BYTES
		)));
	}

	let placeholder =
		Regex::new(r"\$\{(?P<name>[A-Z_][A-Z0-9_]{0,127})(?::-(?P<fallback>[^}]{0,256}))?\}")
			.map_err(|e| ConfigError::Parse(format!("Invalid placeholder pattern: {}", e)))?;

	let mut unset: Vec<String> = Vec::new();
	let expanded = placeholder.replace_all(input, |caps: &regex::Captures| {
		let name = &caps["name"];
		match (std::env::var(name), caps.name("fallback")) {
			(Ok(value), _) => value,
			(Err(_), Some(fallback)) => fallback.as_str().to_string(),
			(Err(_), None) => {
				if !unset.iter().any(|n| n == name) {
					unset.push(name.to_string());
				}
				String::new()
			}
		}
	});

	if !unset.is_empty() {
		return Err(ConfigError::Validation(format!(
			"Environment variable(s) not set and without default: {}",
			unset.join(", ")
		)));
	}

	Ok(expanded.into_owned())
}

impl Config {
	/// Loads configuration from a TOML file, resolving environment variables.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let content = tokio::fs::read_to_string(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				e.kind(),
				format!("Cannot read {}: {}", path.display(), e),
			))
		})?;
		content.parse()
	}

	/// Validates the configuration.
	///
	/// Credentials are deliberately not required here: a missing key is
	/// reported by the engine as an aborted run.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.checkin.id.trim().is_empty() {
			return Err(ConfigError::Validation("Check-in id cannot be empty".into()));
		}
		if self.checkin.chain_id == Some(0) {
			return Err(ConfigError::Validation("chain_id must be non-zero".into()));
		}

		// Validate network config
		if self.network.usable_rpc_urls().is_empty() {
			return Err(ConfigError::Validation(
				"At least one non-empty RPC URL must be configured".into(),
			));
		}
		if self.network.request_timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"request_timeout_seconds must be greater than 0".into(),
			));
		}
		if self.network.connect_timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"connect_timeout_seconds must be greater than 0".into(),
			));
		}

		// Validate confirmation config
		if self.confirmation.timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"Confirmation timeout_seconds must be greater than 0".into(),
			));
		}
		if self.confirmation.poll_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"poll_interval_seconds must be greater than 0".into(),
			));
		}
		if self.confirmation.poll_interval_seconds > self.confirmation.timeout_seconds {
			return Err(ConfigError::Validation(format!(
				"poll_interval_seconds ({}) cannot exceed timeout_seconds ({})",
				self.confirmation.poll_interval_seconds, self.confirmation.timeout_seconds
			)));
		}

		// Validate targets
		if self.targets.is_empty() {
			return Err(ConfigError::Validation(
				"At least one target must be configured".into(),
			));
		}
		let mut names = HashSet::new();
		for target in &self.targets {
			if !names.insert(target.name.as_str()) {
				return Err(ConfigError::Validation(format!(
					"Duplicate target name '{}'",
					target.name
				)));
			}
		}

		Ok(())
	}
}

/// Parses configuration from TOML text.
///
/// Environment variables are resolved first and the result is validated.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
