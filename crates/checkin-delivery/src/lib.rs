//! Transaction delivery module for the check-in system.
//!
//! This module wraps the chain client behind the [`DeliveryInterface`] trait:
//! gas estimation, gas price and nonce lookups, raw transaction broadcast and
//! receipt queries. It also owns endpoint selection, which turns an ordered
//! list of RPC candidates into one connected client.

use async_trait::async_trait;
use checkin_types::{Address, CallRequest, SignedTransaction, TransactionHash, TransactionReceipt};
use std::sync::Arc;
use thiserror::Error;

mod pool;

pub use pool::{ConnectedEndpoint, EndpointPool};

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

/// Errors that can occur during transaction delivery operations.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// A single call did not complete within its timeout.
	#[error("Timed out: {0}")]
	Timeout(String),
	/// The node rejected a simulated call, e.g. because it reverted.
	#[error("Call reverted: {0}")]
	Reverted(String),
	/// The node refused a broadcast transaction.
	#[error("Transaction rejected: {0}")]
	Rejected(String),
	/// Error caused by invalid endpoint configuration.
	#[error("Configuration error: {0}")]
	Configuration(String),
	/// No endpoint candidate answered the liveness check.
	#[error("No reachable endpoint")]
	NoReachableEndpoint,
}

impl DeliveryError {
	/// Returns true for failures of the transport rather than of the call itself.
	pub fn is_transient(&self) -> bool {
		matches!(self, DeliveryError::Network(_) | DeliveryError::Timeout(_))
	}
}

/// Trait defining the interface for a chain client bound to one endpoint.
///
/// Every method is a single network call and is expected to respect the
/// client's per-call timeout.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DeliveryInterface: Send + Sync {
	/// Returns the chain id reported by the endpoint. Also serves as the
	/// liveness check during endpoint selection.
	async fn chain_id(&self) -> Result<u64, DeliveryError>;

	/// Estimates gas for a call without broadcasting it.
	///
	/// A call that would revert yields `DeliveryError::Reverted`.
	async fn estimate_gas(&self, call: &CallRequest) -> Result<u64, DeliveryError>;

	/// Gets the current gas price in wei.
	async fn gas_price(&self) -> Result<u128, DeliveryError>;

	/// Gets the next nonce for an address, counting its pending transactions.
	async fn nonce(&self, address: Address) -> Result<u64, DeliveryError>;

	/// Broadcasts a signed transaction and returns its hash.
	async fn send_raw_transaction(
		&self,
		tx: &SignedTransaction,
	) -> Result<TransactionHash, DeliveryError>;

	/// Retrieves the receipt for a transaction.
	///
	/// Returns `Ok(None)` while the transaction is not yet mined or indexed.
	async fn get_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<Option<TransactionReceipt>, DeliveryError>;
}

/// Creates chain clients for endpoint URLs.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait Connector: Send + Sync {
	/// Builds a client for the given endpoint without contacting it.
	fn connect(&self, url: &str) -> Result<Arc<dyn DeliveryInterface>, DeliveryError>;
}
