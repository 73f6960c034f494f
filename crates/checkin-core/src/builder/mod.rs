//! Builder for constructing check-in engines.
//!
//! Wires the configuration into the run components and plugs in the account
//! and chain client implementations through factories, so the binary and the
//! tests can choose their own.

use crate::engine::CheckinEngine;
use crate::monitoring::ConfirmationPoller;
use crate::prober::ClaimabilityProber;
use crate::submitter::TransactionSubmitter;
use checkin_account::{AccountError, AccountInterface};
use checkin_config::Config;
use checkin_delivery::{Connector, EndpointPool};
use checkin_types::SecretString;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
}

/// Implementations plugged into the engine.
pub struct CheckinFactories<AF> {
	/// Turns the configured private key into a signing account.
	pub account_factory: AF,
	/// Creates chain clients for endpoint candidates.
	pub connector: Arc<dyn Connector>,
}

/// Builder for constructing a CheckinEngine.
pub struct CheckinBuilder {
	config: Config,
}

impl CheckinBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the engine. Makes no network calls and does not touch the key.
	pub fn build<AF>(self, factories: CheckinFactories<AF>) -> Result<CheckinEngine, BuilderError>
	where
		AF: Fn(&SecretString) -> Result<Box<dyn AccountInterface>, AccountError>
			+ Send
			+ Sync
			+ 'static,
	{
		let config = self.config;

		if config.targets.is_empty() {
			return Err(BuilderError::Config(
				"At least one target is required".into(),
			));
		}

		let pool = EndpointPool::new(
			config.network.usable_rpc_urls(),
			config.network.connect_timeout(),
		)
		.map_err(|e| BuilderError::Config(e.to_string()))?
		.with_expected_chain_id(config.checkin.chain_id);

		let submitter = TransactionSubmitter::new(config.submission.gas_multiplier);
		let poller = ConfirmationPoller::new(
			config.confirmation.poll_interval(),
			config.confirmation.timeout(),
			config.network.request_timeout(),
		);

		tracing::info!(
			component = "engine",
			endpoints = pool.candidates().len(),
			targets = config.targets.len(),
			gas_multiplier = submitter.gas_multiplier().as_f64(),
			confirmation_timeout_secs = config.confirmation.timeout_seconds,
			"Loaded"
		);

		Ok(CheckinEngine {
			config,
			account_loader: Box::new(factories.account_factory),
			connector: factories.connector,
			pool,
			prober: ClaimabilityProber::new(),
			submitter,
			poller,
		})
	}
}
