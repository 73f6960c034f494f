//! Local private key account.
//!
//! Holds the key in memory and signs legacy (gas price) transactions bound to
//! the transaction's chain id.

use crate::{AccountError, AccountInterface};
use alloy_consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_eips::eip2718::Encodable2718;
use alloy_network::TxSignerSync;
use alloy_primitives::TxKind;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use checkin_types::{
	Address, PendingTransaction, SecretString, SignedTransaction, TransactionHash,
};

/// Account backed by a private key held in process memory.
pub struct LocalAccount {
	signer: PrivateKeySigner,
}

impl LocalAccount {
	/// Creates an account from a hex-encoded private key, with or without 0x prefix.
	pub fn new(private_key: &SecretString) -> Result<Self, AccountError> {
		let signer = private_key
			.with_exposed(|key| key.trim().parse::<PrivateKeySigner>())
			.map_err(|_| AccountError::InvalidKey("Invalid private key format".to_string()))?;

		Ok(Self { signer })
	}
}

#[async_trait]
impl AccountInterface for LocalAccount {
	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.signer.address())
	}

	async fn sign_transaction(
		&self,
		pending: &PendingTransaction,
	) -> Result<SignedTransaction, AccountError> {
		if pending.from != self.signer.address() {
			return Err(AccountError::SigningFailed(format!(
				"Transaction sender {} does not match account {}",
				pending.from,
				self.signer.address()
			)));
		}

		let mut tx = TxLegacy {
			chain_id: Some(pending.chain_id),
			nonce: pending.nonce,
			gas_price: pending.gas_price,
			gas_limit: pending.gas_limit,
			to: TxKind::Call(pending.to),
			value: pending.value,
			input: pending.data.clone(),
		};

		let signature = TxSignerSync::sign_transaction_sync(&self.signer, &mut tx)
			.map_err(|e| AccountError::SigningFailed(e.to_string()))?;
		let envelope: TxEnvelope = tx.into_signed(signature).into();

		Ok(SignedTransaction {
			raw: envelope.encoded_2718().into(),
			hash: TransactionHash(*envelope.tx_hash()),
		})
	}
}

/// Factory function to create a local account from a private key.
pub fn create_account(private_key: &SecretString) -> Result<Box<dyn AccountInterface>, AccountError> {
	let account = LocalAccount::new(private_key)?;
	tracing::debug!(address = %account.signer.address(), "Loaded local account");
	Ok(Box::new(account))
}
