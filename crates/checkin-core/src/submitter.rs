//! Transaction construction, signing and broadcast.

use checkin_account::{AccountError, AccountService};
use checkin_delivery::{DeliveryError, DeliveryInterface};
use checkin_types::{
	truncate_id, Address, GasMultiplier, PendingTransaction, Target, TransactionHash, U256,
};
use thiserror::Error;

/// Errors that can occur while submitting a target's transaction.
#[derive(Debug, Error)]
pub enum SubmitError {
	/// The account could not sign. Fatal for the run.
	#[error("Signing failed: {0}")]
	Signing(#[from] AccountError),
	/// The node refused the signed transaction. Fatal for this target only.
	#[error("Broadcast failed: {0}")]
	Broadcast(DeliveryError),
	/// Gas price or nonce could not be fetched. Fatal for this target only.
	#[error("Chain query failed: {0}")]
	Chain(DeliveryError),
}

impl SubmitError {
	pub fn is_fatal(&self) -> bool {
		matches!(self, SubmitError::Signing(_))
	}
}

/// Builds, signs and broadcasts one transaction per call.
#[derive(Debug, Clone)]
pub struct TransactionSubmitter {
	gas_multiplier: GasMultiplier,
}

impl TransactionSubmitter {
	pub fn new(gas_multiplier: GasMultiplier) -> Self {
		Self { gas_multiplier }
	}

	pub fn gas_multiplier(&self) -> GasMultiplier {
		self.gas_multiplier
	}

	/// Submits the target's call and returns the broadcast hash.
	///
	/// Gas price and nonce are fetched right before the transaction is built,
	/// so every attempt uses the account's current nonce. The signed payload
	/// is broadcast exactly once; a refused broadcast is not retried.
	pub async fn submit(
		&self,
		client: &dyn DeliveryInterface,
		chain_id: u64,
		account: &AccountService,
		sender: Address,
		target: &Target,
		gas_estimate: u64,
	) -> Result<TransactionHash, SubmitError> {
		let gas_price = client.gas_price().await.map_err(SubmitError::Chain)?;
		let nonce = client.nonce(sender).await.map_err(SubmitError::Chain)?;
		let gas_limit = self.gas_multiplier.apply(gas_estimate);

		let pending = PendingTransaction {
			from: sender,
			to: target.address,
			data: target.calldata.clone(),
			value: U256::ZERO,
			nonce,
			gas_limit,
			gas_price,
			chain_id,
		};

		tracing::debug!(
			target = %target.name,
			nonce,
			gas_estimate,
			gas_limit,
			gas_price,
			"Built transaction"
		);

		let signed = account.sign(&pending).await?;

		let hash = client
			.send_raw_transaction(&signed)
			.await
			.map_err(SubmitError::Broadcast)?;

		if hash != signed.hash {
			tracing::warn!(
				target = %target.name,
				local = %truncate_id(&signed.hash.to_string()),
				remote = %truncate_id(&hash.to_string()),
				"Node returned a different transaction hash"
			);
		}

		Ok(signed.hash)
	}
}
