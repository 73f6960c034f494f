//! Account management module for the check-in system.
//!
//! This module provides the signing seam of a run. The engine only needs the
//! sender address and the ability to turn a pending transaction into signed,
//! encoded bytes; how the key is held is up to the implementation.

use async_trait::async_trait;
use checkin_types::{Address, PendingTransaction, SignedTransaction};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// Error that occurs when signing operations fail.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// Error that occurs when a cryptographic key is invalid or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
}

/// Trait defining the interface for account implementations.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AccountInterface: Send + Sync {
	/// Retrieves the address associated with this account.
	async fn address(&self) -> Result<Address, AccountError>;

	/// Signs a transaction and returns its broadcast-ready encoding.
	///
	/// The transaction must be sent from this account's address.
	async fn sign_transaction(
		&self,
		tx: &PendingTransaction,
	) -> Result<SignedTransaction, AccountError>;
}

/// Service that manages account operations.
///
/// Wraps an underlying account implementation.
pub struct AccountService {
	implementation: Box<dyn AccountInterface>,
}

impl AccountService {
	/// Creates a new AccountService with the specified implementation.
	pub fn new(implementation: Box<dyn AccountInterface>) -> Self {
		Self { implementation }
	}

	/// Retrieves the address associated with the managed account.
	pub async fn get_address(&self) -> Result<Address, AccountError> {
		self.implementation.address().await
	}

	/// Signs a transaction using the managed account.
	pub async fn sign(&self, tx: &PendingTransaction) -> Result<SignedTransaction, AccountError> {
		self.implementation.sign_transaction(tx).await
	}
}
