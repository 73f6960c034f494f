//! Receipt polling with a hard deadline.
//!
//! The poller queries for a receipt at a fixed interval until one shows up or
//! the deadline passes. Transport failures before the deadline are expected
//! (the node may not have indexed the transaction yet) and only logged at
//! debug; any other query error is logged at warn. Neither stops the polling.

use checkin_delivery::DeliveryInterface;
use checkin_types::{truncate_id, TransactionHash, TransactionReceipt};
use std::time::Duration;

/// Result of waiting for a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationOutcome {
	/// A receipt was found; its status says whether execution succeeded.
	Confirmed(TransactionReceipt),
	/// No receipt before the deadline. The transaction may still land later.
	TimedOut,
}

impl ConfirmationOutcome {
	/// True only for a receipt with success status.
	pub fn is_success(&self) -> bool {
		matches!(self, ConfirmationOutcome::Confirmed(receipt) if receipt.status.is_success())
	}
}

/// Polls for receipts at a fixed interval up to a deadline.
#[derive(Debug, Clone)]
pub struct ConfirmationPoller {
	interval: Duration,
	deadline: Duration,
	request_timeout: Duration,
}

impl ConfirmationPoller {
	pub fn new(interval: Duration, deadline: Duration, request_timeout: Duration) -> Self {
		Self {
			interval,
			deadline,
			request_timeout,
		}
	}

	pub fn deadline(&self) -> Duration {
		self.deadline
	}

	/// Waits for the receipt of `hash`. Never runs longer than the deadline.
	pub async fn wait(
		&self,
		client: &dyn DeliveryInterface,
		hash: &TransactionHash,
	) -> ConfirmationOutcome {
		match tokio::time::timeout(self.deadline, self.poll(client, hash)).await {
			Ok(receipt) => ConfirmationOutcome::Confirmed(receipt),
			Err(_) => {
				tracing::warn!(
					tx_hash = %truncate_id(&hash.to_string()),
					deadline_secs = self.deadline.as_secs(),
					"No receipt before deadline"
				);
				ConfirmationOutcome::TimedOut
			}
		}
	}

	async fn poll(
		&self,
		client: &dyn DeliveryInterface,
		hash: &TransactionHash,
	) -> TransactionReceipt {
		let tx_hash = truncate_id(&hash.to_string());
		let mut attempt: u32 = 0;
		loop {
			attempt += 1;
			match tokio::time::timeout(self.request_timeout, client.get_receipt(hash)).await {
				Ok(Ok(Some(receipt))) => return receipt,
				Ok(Ok(None)) => {
					tracing::debug!(tx_hash = %tx_hash, attempt, "Receipt not available yet");
				}
				Ok(Err(e)) if e.is_transient() => {
					tracing::debug!(tx_hash = %tx_hash, attempt, error = %e, "Receipt query failed");
				}
				Ok(Err(e)) => {
					tracing::warn!(tx_hash = %tx_hash, attempt, error = %e, "Unexpected receipt query error");
				}
				Err(_) => {
					tracing::debug!(tx_hash = %tx_hash, attempt, "Receipt query timed out");
				}
			}
			tokio::time::sleep(self.interval).await;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use checkin_delivery::{DeliveryError, MockDeliveryInterface};
	use checkin_types::{Address, CallRequest, ReceiptStatus, SignedTransaction, B256};
	use mockall::Sequence;
	use tokio::time::Instant;

	const INTERVAL: Duration = Duration::from_secs(5);
	const DEADLINE: Duration = Duration::from_secs(60);
	const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

	fn hash() -> TransactionHash {
		TransactionHash(B256::repeat_byte(0x42))
	}

	fn receipt(status: ReceiptStatus) -> TransactionReceipt {
		TransactionReceipt {
			hash: hash(),
			status,
			block_number: Some(1_234),
		}
	}

	fn poller() -> ConfirmationPoller {
		ConfirmationPoller::new(INTERVAL, DEADLINE, REQUEST_TIMEOUT)
	}

	/// Client whose receipt queries never answer.
	struct StalledClient;

	#[async_trait]
	impl DeliveryInterface for StalledClient {
		async fn chain_id(&self) -> Result<u64, DeliveryError> {
			unreachable!()
		}
		async fn estimate_gas(&self, _call: &CallRequest) -> Result<u64, DeliveryError> {
			unreachable!()
		}
		async fn gas_price(&self) -> Result<u128, DeliveryError> {
			unreachable!()
		}
		async fn nonce(&self, _address: Address) -> Result<u64, DeliveryError> {
			unreachable!()
		}
		async fn send_raw_transaction(
			&self,
			_tx: &SignedTransaction,
		) -> Result<TransactionHash, DeliveryError> {
			unreachable!()
		}
		async fn get_receipt(
			&self,
			_hash: &TransactionHash,
		) -> Result<Option<TransactionReceipt>, DeliveryError> {
			std::future::pending().await
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_confirms_after_transient_errors() {
		let mut client = MockDeliveryInterface::new();
		let mut seq = Sequence::new();
		client
			.expect_get_receipt()
			.times(2)
			.in_sequence(&mut seq)
			.returning(|_| Err(DeliveryError::Network("transaction not indexed".into())));
		client
			.expect_get_receipt()
			.times(1)
			.in_sequence(&mut seq)
			.returning(|_| Ok(None));
		client
			.expect_get_receipt()
			.times(1)
			.in_sequence(&mut seq)
			.returning(|_| Ok(Some(receipt(ReceiptStatus::Success))));

		let started = Instant::now();
		let outcome = poller().wait(&client, &hash()).await;

		assert_eq!(outcome, ConfirmationOutcome::Confirmed(receipt(ReceiptStatus::Success)));
		assert!(outcome.is_success());
		// Three waits between four queries
		let elapsed = started.elapsed();
		assert!(elapsed >= INTERVAL * 3 && elapsed < INTERVAL * 4);
	}

	#[tokio::test(start_paused = true)]
	async fn test_keeps_polling_after_non_transient_error() {
		let mut client = MockDeliveryInterface::new();
		let mut seq = Sequence::new();
		client
			.expect_get_receipt()
			.times(1)
			.in_sequence(&mut seq)
			.returning(|_| Err(DeliveryError::Rejected("malformed response".into())));
		client
			.expect_get_receipt()
			.times(1)
			.in_sequence(&mut seq)
			.returning(|_| Ok(Some(receipt(ReceiptStatus::Success))));

		let outcome = poller().wait(&client, &hash()).await;
		assert!(outcome.is_success());
	}

	#[tokio::test(start_paused = true)]
	async fn test_failed_receipt_is_not_success() {
		let mut client = MockDeliveryInterface::new();
		client
			.expect_get_receipt()
			.times(1)
			.returning(|_| Ok(Some(receipt(ReceiptStatus::Failure))));

		let outcome = poller().wait(&client, &hash()).await;
		assert!(matches!(outcome, ConfirmationOutcome::Confirmed(_)));
		assert!(!outcome.is_success());
	}

	#[tokio::test(start_paused = true)]
	async fn test_times_out_at_deadline() {
		let mut client = MockDeliveryInterface::new();
		client.expect_get_receipt().returning(|_| Ok(None));

		let started = Instant::now();
		let outcome = poller().wait(&client, &hash()).await;

		assert_eq!(outcome, ConfirmationOutcome::TimedOut);
		assert!(!outcome.is_success());
		let elapsed = started.elapsed();
		assert!(elapsed >= DEADLINE);
		assert!(elapsed < DEADLINE + Duration::from_millis(10));
	}

	#[tokio::test(start_paused = true)]
	async fn test_stalled_query_cannot_outlive_deadline() {
		// Per-call timeout longer than the deadline: the deadline still wins
		let poller = ConfirmationPoller::new(INTERVAL, DEADLINE, DEADLINE * 10);

		let started = Instant::now();
		let outcome = poller.wait(&StalledClient, &hash()).await;

		assert_eq!(outcome, ConfirmationOutcome::TimedOut);
		assert!(started.elapsed() < DEADLINE + Duration::from_millis(10));
	}
}
