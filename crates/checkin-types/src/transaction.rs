//! Transaction lifecycle types for the check-in system.
//!
//! A check-in attempt moves through these types in order: a [`CallRequest`]
//! is simulated to probe claimability, a [`PendingTransaction`] is built and
//! signed into a [`SignedTransaction`], and after broadcast the
//! [`TransactionHash`] is polled until a [`TransactionReceipt`] appears.

use alloy_primitives::{Address, Bytes, B256, U256};
use std::fmt;

/// Blockchain transaction hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionHash(pub B256);

impl fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<B256> for TransactionHash {
	fn from(hash: B256) -> Self {
		Self(hash)
	}
}

/// A contract call to be simulated without broadcasting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
	pub from: Address,
	pub to: Address,
	pub data: Bytes,
	pub value: U256,
}

/// A fully specified, unsigned transaction.
///
/// Built fresh for every attempt and consumed by signing. The nonce is
/// fetched immediately before construction, so a pending transaction must
/// never be reused for a later attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
	pub from: Address,
	pub to: Address,
	pub data: Bytes,
	pub value: U256,
	pub nonce: u64,
	pub gas_limit: u64,
	/// Gas price in wei.
	pub gas_price: u128,
	/// Chain the transaction is bound to (EIP-155 replay protection).
	pub chain_id: u64,
}

/// Signed, encoded transaction ready for broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
	/// EIP-2718 encoded transaction bytes.
	pub raw: Bytes,
	/// Hash the network will assign to the transaction.
	pub hash: TransactionHash,
}

/// On-chain execution status reported by a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
	Success,
	Failure,
}

impl ReceiptStatus {
	pub fn is_success(&self) -> bool {
		matches!(self, ReceiptStatus::Success)
	}
}

impl From<bool> for ReceiptStatus {
	fn from(success: bool) -> Self {
		if success {
			ReceiptStatus::Success
		} else {
			ReceiptStatus::Failure
		}
	}
}

/// Transaction receipt containing execution details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
	/// The hash of the transaction.
	pub hash: TransactionHash,
	/// Whether the transaction executed successfully.
	pub status: ReceiptStatus,
	/// The block number where the transaction was included, if reported.
	pub block_number: Option<u64>,
}
