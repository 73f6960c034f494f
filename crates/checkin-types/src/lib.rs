//! Common types module for the check-in system.
//!
//! This module defines the data types shared by the configuration, account,
//! delivery and core crates: targets and their call specifications, the
//! transaction lifecycle types, and the final run outcome.

/// Gas limit scaling.
pub mod gas;
/// Final outcome of an orchestrator run.
pub mod outcome;
/// Secret string wrapper for private key material.
pub mod secret_string;
/// Check-in targets and call specifications.
pub mod target;
/// Transaction lifecycle types from simulated call to receipt.
pub mod transaction;
/// Utility functions for display formatting.
pub mod utils;

// Re-export all types for convenient access
pub use alloy_primitives::{Address, Bytes, B256, U256};
pub use gas::{GasMultiplier, GasMultiplierError};
pub use outcome::{AbortReason, RunOutcome};
pub use secret_string::SecretString;
pub use target::{CallSpec, CallSpecError, Target};
pub use transaction::{
	CallRequest, PendingTransaction, ReceiptStatus, SignedTransaction, TransactionHash,
	TransactionReceipt,
};
pub use utils::{explorer_link, truncate_id};
