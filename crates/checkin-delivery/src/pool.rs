//! Endpoint selection with ordered fallback.
//!
//! Candidates are tried strictly in configured order and the first one that
//! answers a chain id query within the liveness timeout wins, even when later
//! candidates would also answer. Selection happens once per run and is not
//! retried here.

use crate::{Connector, DeliveryError, DeliveryInterface};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A chain client bound to the selected endpoint.
#[derive(Clone)]
pub struct ConnectedEndpoint {
	/// URL of the selected endpoint.
	pub url: String,
	/// Chain id reported by the endpoint; transactions are bound to it.
	pub chain_id: u64,
	/// Client for all further calls of the run.
	pub client: Arc<dyn DeliveryInterface>,
}

impl fmt::Debug for ConnectedEndpoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ConnectedEndpoint")
			.field("url", &self.url)
			.field("chain_id", &self.chain_id)
			.finish_non_exhaustive()
	}
}

/// Ordered list of RPC endpoint candidates.
#[derive(Debug, Clone)]
pub struct EndpointPool {
	candidates: Vec<String>,
	liveness_timeout: Duration,
	expected_chain_id: Option<u64>,
}

impl EndpointPool {
	/// Creates a pool from candidates in priority order.
	///
	/// Blank entries are dropped; a list with no usable entry is a
	/// configuration error.
	pub fn new<I, S>(candidates: I, liveness_timeout: Duration) -> Result<Self, DeliveryError>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let candidates: Vec<String> = candidates
			.into_iter()
			.map(|url| url.as_ref().trim().to_string())
			.filter(|url| !url.is_empty())
			.collect();

		if candidates.is_empty() {
			return Err(DeliveryError::Configuration(
				"At least one non-empty RPC URL is required".to_string(),
			));
		}

		Ok(Self {
			candidates,
			liveness_timeout,
			expected_chain_id: None,
		})
	}

	/// Requires the selected endpoint to report the given chain id.
	pub fn with_expected_chain_id(mut self, chain_id: Option<u64>) -> Self {
		self.expected_chain_id = chain_id;
		self
	}

	pub fn candidates(&self) -> &[String] {
		&self.candidates
	}

	/// Returns the first candidate that answers the liveness check.
	pub async fn select(&self, connector: &dyn Connector) -> Result<ConnectedEndpoint, DeliveryError> {
		for url in &self.candidates {
			let client = match connector.connect(url) {
				Ok(client) => client,
				Err(e) => {
					tracing::warn!(endpoint = %url, error = %e, "RPC not reachable");
					continue;
				}
			};

			match tokio::time::timeout(self.liveness_timeout, client.chain_id()).await {
				Ok(Ok(chain_id)) => {
					if let Some(expected) = self.expected_chain_id {
						if chain_id != expected {
							tracing::warn!(
								endpoint = %url,
								chain_id,
								expected,
								"RPC serves a different chain"
							);
							continue;
						}
					}

					tracing::info!(endpoint = %url, chain_id, "RPC connected");
					return Ok(ConnectedEndpoint {
						url: url.clone(),
						chain_id,
						client,
					});
				}
				Ok(Err(e)) => {
					tracing::warn!(endpoint = %url, error = %e, "RPC not reachable");
				}
				Err(_) => {
					tracing::warn!(
						endpoint = %url,
						timeout_secs = self.liveness_timeout.as_secs(),
						"RPC not reachable: liveness check timed out"
					);
				}
			}
		}

		tracing::error!(candidates = self.candidates.len(), "No RPC reachable");
		Err(DeliveryError::NoReachableEndpoint)
	}
}
